//! # Playback
//!
//! Turns a laid-out [`Score`] into a deterministic, seekable playback model.
//!
//! ## Pipeline
//!
//! ```text
//! Score ──► MeasureSequenceIterator ──► MeasureSchedule ──► SequenceFactory ──► Sequence (per part)
//!            (repeats → play order)      (beats → ms)                               │
//!                                                                                   ├──► Timeline (merged events)
//!                                                                                   └──► Cursor (locators, frames)
//! ```
//!
//! 1. **Play order**: repeat and ending jumps are expanded into the linear
//!    order measures are played in ([`MeasureSequenceIterator`]).
//! 2. **Schedule**: each played measure gets a start and end beat, and the
//!    [`TempoMap`] converts beats to milliseconds ([`MeasureSchedule`]).
//! 3. **Sequences**: per part, elements that start together collapse into one
//!    entry. Entries tile `[0, duration]` with no gaps ([`Sequence`]).
//! 4. **Timeline**: every Sequence's starts and stops, plus jump and system-end
//!    instants, merged into one ordered log ([`Timeline`]).
//! 5. **Cursors**: a [`Cursor`] walks one Sequence, by step or by time, and
//!    exposes [`CursorFrame`]s for highlight animation.
//!
//! Everything is built once and is immutable afterwards, except the cursors'
//! own positions. There are no threads and no timers: the host calls
//! [`Cursor::seek`] or [`Cursor::next`] whenever it wants to.
//!
//! ## Usage
//! ```rust
//! use gen_playback::{build_playback, Score};
//!
//! let score = Score::from_yaml(r#"
//! parts:
//!   - id: P1
//! measures:
//!   - index: 0
//!     system-index: 0
//!     fragments:
//!       - parts:
//!           - part-index: 0
//!             staves:
//!               - voices:
//!                   - entries:
//!                       - { type: note, id: 1, duration: "1" }
//!                       - { type: note, id: 2, duration: "1" }
//! "#).unwrap();
//!
//! let playback = build_playback(&score);
//! let mut cursor = playback.add_cursor(None).unwrap();
//! cursor.seek(600.0).unwrap();
//! assert_eq!(cursor.current_index(), 1);
//! ```

pub mod cursor;
pub mod deferred;
pub mod frame;
pub mod locator;
pub mod measures;
pub mod schedule;
pub mod sequence;
pub mod subscribers;
pub mod tempo;
pub mod timeline;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use cursor::{Cursor, DiscreteCursor};
pub use deferred::Deferred;
pub use frame::{CursorFrame, CursorHint, FrameBounds};
pub use locator::{CheapLocator, ExpensiveLocator, Locator};
pub use measures::{MeasureJumps, MeasureSequenceIterator};
pub use schedule::{MeasureLayout, MeasureSchedule, PlacedElement, ScheduledMeasure};
pub use sequence::{PartSelection, Sequence, SequenceFactory};
pub use subscribers::{SubscriptionId, Subscribers};
pub use tempo::{TempoMap, TempoSegment};
pub use timeline::{Timeline, TimelineEvent, Transition, TransitionKind};
pub use types::{CursorState, Interactable, PlaybackElement, SequenceEntry, Span, TickRange};

use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::score::Score;
use log::debug;
use std::sync::Arc;

/// Everything playback needs for one rendered score
#[derive(Debug, Clone)]
pub struct ScorePlayback {
    schedule: MeasureSchedule,
    sequences: Vec<Arc<Sequence>>,
    timeline: Timeline,
}

impl ScorePlayback {
    pub fn new(score: &Score, config: &PlaybackConfig) -> Self {
        let schedule = MeasureSchedule::new(score, config);
        let sequences = SequenceFactory::new(score, &schedule).create(&PartSelection::All);
        let timeline = Timeline::new(&sequences, &schedule);
        debug!(
            "Built playback: {} played measures, {} sequences, {}ms",
            schedule.measures().len(),
            sequences.len(),
            timeline.duration_ms()
        );

        Self {
            schedule,
            sequences: sequences.into_iter().map(Arc::new).collect(),
            timeline,
        }
    }

    /// Measure indexes in the order they are played.
    pub fn play_order(&self) -> Vec<usize> {
        self.schedule.measures().iter().map(|m| m.measure_index).collect()
    }

    pub fn schedule(&self) -> &MeasureSchedule {
        &self.schedule
    }

    pub fn sequences(&self) -> &[Arc<Sequence>] {
        &self.sequences
    }

    pub fn sequence(&self, part_index: usize) -> Option<&Arc<Sequence>> {
        self.sequences.get(part_index)
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn duration_ms(&self) -> f64 {
        self.schedule.duration_ms()
    }

    /// A seekable cursor over one part, part 0 by default.
    pub fn add_cursor(&self, part_index: Option<usize>) -> Result<Cursor, PlaybackError> {
        self.part_sequence(part_index).map(Cursor::new)
    }

    /// A step-only cursor over one part, part 0 by default.
    pub fn add_discrete_cursor(&self, part_index: Option<usize>) -> Result<DiscreteCursor, PlaybackError> {
        self.part_sequence(part_index).map(DiscreteCursor::new)
    }

    fn part_sequence(&self, part_index: Option<usize>) -> Result<Arc<Sequence>, PlaybackError> {
        let part_index = part_index.unwrap_or(0);
        match self.sequences.get(part_index) {
            Some(sequence) => Ok(sequence.clone()),
            // A score with no parts still gets a cursor over nothing
            None if part_index == 0 && self.sequences.is_empty() => {
                Ok(Arc::new(Sequence::new(0, Vec::new(), 0.0)))
            }
            None => Err(PlaybackError::PartNotFound {
                part_index,
                part_count: self.sequences.len(),
            }),
        }
    }
}
