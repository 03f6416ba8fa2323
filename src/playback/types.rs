//! Playback type definitions
//!
//! Plain data shared by sequences, the timeline, cursors and frames.

use crate::score::{ElementId, ElementKind, Rect};
use serde::Serialize;

/// Half-open time interval `[start, end)` in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TickRange {
    pub start: f64,
    pub end: f64,
}

impl TickRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time_ms: f64) -> bool {
        self.start <= time_ms && time_ms < self.end
    }
}

/// Closed spatial interval along one axis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn size(&self) -> f64 {
        self.end - self.start
    }
}

/// A renderable, playable unit: note, rest or chord.
///
/// Carries everything needed to highlight it without going back to the score.
/// Equality is identity: two elements are equal when their ids are.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub part_index: usize,
    pub measure_index: usize,
    pub system_index: usize,
    /// The element's own bounding box
    pub rect: Rect,
    /// The measure's horizontal extent over this part's staves
    pub part_rect: Rect,
}

impl PartialEq for PlaybackElement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlaybackElement {}

/// One element sounding within a Sequence entry, with its own sounding time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactable {
    pub element: PlaybackElement,
    /// When the element actually starts and stops sounding on this pass
    pub time_range: TickRange,
}

/// One step of a Sequence
///
/// `tick_range` is the cursor's range: ranges of consecutive entries touch,
/// so every instant of the Sequence belongs to exactly one entry. The sounding
/// times of the elements live on each [`Interactable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceEntry {
    /// First element (in score order) starting at this instant
    pub element: PlaybackElement,
    pub tick_range: TickRange,
    /// Every element starting at this instant, `element` included
    pub interactables: Vec<Interactable>,
    /// Position of the owning measure in play order
    pub play_index: usize,
}

/// Snapshot of a cursor, also the payload of change notifications
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    pub index: usize,
    pub length: usize,
    pub element: Option<PlaybackElement>,
}
