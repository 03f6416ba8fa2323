//! # Error Types
//!
//! This module defines all error types for the playback subsystem.
//!
//! Two very different kinds of failure live here:
//!
//! - **Input errors** (`PartNotFound`, `ConfigError`, `YamlError`, `SemanticError`)
//!   are recoverable. The host asked for something the score or configuration
//!   cannot provide, and can report it to the user.
//! - **Invariant violations** (`LocatorCoverage`) mean a Sequence does not tile
//!   its own time range. That is a bug in sequence construction, never bad
//!   user input, and [`PlaybackError::is_invariant_violation`] tells the two apart.
//!
//! Malformed musical data (a `backup` longer than the voice so far, a zero
//! tempo) is *not* an error at all: playback is an enhancement over the visual
//! score, so such data is clamped and logged with `log::warn!` instead.
//!
//! ## Usage
//! ```rust
//! use gen_playback::{build_playback, PlaybackError, Score};
//!
//! let playback = build_playback(&Score::default());
//! match playback.add_cursor(Some(3)) {
//!     Ok(_cursor) => {}
//!     Err(PlaybackError::PartNotFound { part_index, part_count }) => {
//!         eprintln!("No part {} (score has {})", part_index, part_count);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    /// A cursor was requested for a part the score does not have.
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::PartNotFound { part_index: 2, part_count: 1 };
    /// assert_eq!(err.to_string(), "Part 2 not found: score has 1 part(s)");
    /// ```
    #[error("Part {part_index} not found: score has {part_count} part(s)")]
    PartNotFound { part_index: usize, part_count: usize },

    /// Invalid configuration value.
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::ConfigError("default-tempo must be positive".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: default-tempo must be positive");
    /// ```
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Malformed YAML for a configuration or score document.
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Structural problem found by [`crate::validate`].
    ///
    /// # Example
    /// ```
    /// # use gen_playback::PlaybackError;
    /// let err = PlaybackError::SemanticError {
    ///     measure: 3,
    ///     message: "Repeat start found without closing the previous repeat".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Semantic error at measure 3: Repeat start found without closing the previous repeat"
    /// );
    /// ```
    #[error("Semantic error at measure {measure}: {message}")]
    SemanticError { measure: usize, message: String },

    /// Neither locator resolved a time inside the Sequence's own bounds.
    ///
    /// Sequence entries must tile `[0, duration]` without gaps, so this can
    /// only happen when that invariant is broken upstream.
    #[error(
        "Locator coverage failure: no entry covers {time_ms}ms in a sequence of {length} entries lasting {duration_ms}ms"
    )]
    LocatorCoverage {
        time_ms: f64,
        duration_ms: f64,
        length: usize,
    },
}

impl PlaybackError {
    /// True for errors that indicate a bug in this crate rather than bad input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, PlaybackError::LocatorCoverage { .. })
    }
}
