//! # Playback Clock
//!
//! Elapsed-time bookkeeping for a host that animates a cursor.
//!
//! Nothing in this crate ticks on its own. The host owns the animation loop:
//! once per frame it reads [`PlaybackClock::elapsed_ms`] and hands the value to
//! [`crate::Cursor::seek`]. The clock reads wall-clock time only through a
//! [`TimeSource`], so tests drive it with a [`ManualTimeSource`].
//!
//! ```rust
//! use gen_playback::{ManualTimeSource, PlaybackClock};
//!
//! let source = ManualTimeSource::new();
//! let mut clock = PlaybackClock::new(&source);
//! clock.start();
//! source.advance(250.0);
//! assert_eq!(clock.elapsed_ms(), 250.0);
//! ```

use std::cell::Cell;
use std::time::Instant;

/// Something that knows the current time in milliseconds.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

/// Monotonic wall-clock time, measured from construction
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Time that only moves when told to
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: Cell<f64>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Start/pause/seek bookkeeping over a [`TimeSource`]
#[derive(Debug)]
pub struct PlaybackClock<T: TimeSource> {
    source: T,
    /// Elapsed time accumulated before the current run
    offset_ms: f64,
    /// Source time when the current run started, `None` while paused
    started_at: Option<f64>,
}

impl<T: TimeSource> PlaybackClock<T> {
    pub fn new(source: T) -> Self {
        Self {
            source,
            offset_ms: 0.0,
            started_at: None,
        }
    }

    /// Start from zero.
    pub fn start(&mut self) {
        self.offset_ms = 0.0;
        self.started_at = Some(self.source.now_ms());
    }

    pub fn pause(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.offset_ms += self.source.now_ms() - started_at;
        }
    }

    pub fn resume(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(self.source.now_ms());
        }
    }

    /// Jump to an absolute elapsed time, keeping the running state.
    pub fn seek(&mut self, elapsed_ms: f64) {
        self.offset_ms = elapsed_ms.max(0.0);
        if self.started_at.is_some() {
            self.started_at = Some(self.source.now_ms());
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed_ms(&self) -> f64 {
        match self.started_at {
            Some(started_at) => self.offset_ms + (self.source.now_ms() - started_at),
            None => self.offset_ms,
        }
    }
}
