pub mod clock;
pub mod config;
pub mod error;
pub mod fraction;
pub mod playback;
pub mod score;
pub mod validate;

pub use clock::{ManualTimeSource, PlaybackClock, SystemTimeSource, TimeSource};
pub use config::{PlaybackConfig, DEFAULT_TEMPO};
pub use error::*;
pub use fraction::Fraction;
pub use playback::{
    Cursor, CursorFrame, CursorHint, CursorState, DiscreteCursor, PlaybackElement, ScorePlayback, Sequence,
    SubscriptionId, Timeline, TimelineEvent,
};
pub use score::*;
pub use validate::validate;

/// Build playback for a laid-out score with the default configuration.
/// This is the main entry point for the library.
pub fn build_playback(score: &Score) -> ScorePlayback {
    ScorePlayback::new(score, &PlaybackConfig::default())
}

/// Build playback with an explicit configuration (tempo fallback, playback rate)
pub fn build_playback_with_config(score: &Score, config: &PlaybackConfig) -> ScorePlayback {
    ScorePlayback::new(score, config)
}
