//! Sequences
//!
//! A [`Sequence`] is the time-indexed form of one part: an ordered array of
//! entries whose tick ranges tile `[0, duration)` without gaps. It is built
//! once per render by the [`SequenceFactory`] and never changes afterwards.

use super::schedule::{MeasureSchedule, PlacedElement};
use super::types::{Interactable, SequenceEntry, TickRange};
use crate::score::Score;
use log::{debug, warn};
use std::ops::Range;

/// Ordered, immutable playable entries of one part
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    part_index: usize,
    entries: Vec<SequenceEntry>,
    duration_ms: f64,
}

impl Sequence {
    pub fn new(part_index: usize, entries: Vec<SequenceEntry>, duration_ms: f64) -> Self {
        Self {
            part_index,
            entries,
            duration_ms,
        }
    }

    pub fn part_index(&self) -> usize {
        self.part_index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total duration; zero for an empty Sequence.
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn entry(&self, index: usize) -> Option<&SequenceEntry> {
        self.entries.get(index)
    }

    /// Entry lookup where negative indexes count back from the end (`-1` is the last entry).
    pub fn at(&self, index: isize) -> Option<&SequenceEntry> {
        let resolved = if index < 0 {
            self.entries.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.entries.get(resolved)
    }

    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SequenceEntry> {
        self.entries.iter()
    }

    /// Whether the entry at `index` owns `time_ms`.
    ///
    /// Ranges are half-open, except that the last entry also owns the
    /// Sequence's end so that a seek to the very end lands somewhere.
    pub fn covers(&self, index: usize, time_ms: f64) -> bool {
        match self.entries.get(index) {
            Some(entry) => {
                entry.tick_range.contains(time_ms)
                    || (index + 1 == self.entries.len() && time_ms == self.duration_ms)
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a SequenceEntry;
    type IntoIter = std::slice::Iter<'a, SequenceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Which parts to build Sequences for
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PartSelection {
    #[default]
    All,
    Part(usize),
    Range(Range<usize>),
}

/// Builds Sequences from a score and its measure schedule.
#[derive(Debug, Clone, Copy)]
pub struct SequenceFactory<'a> {
    score: &'a Score,
    schedule: &'a MeasureSchedule,
}

impl<'a> SequenceFactory<'a> {
    pub fn new(score: &'a Score, schedule: &'a MeasureSchedule) -> Self {
        Self { score, schedule }
    }

    /// One Sequence per selected part, in part order. Parts the score does
    /// not have are left out.
    pub fn create(&self, selection: &PartSelection) -> Vec<Sequence> {
        let part_count = self.score.part_count();
        let parts = match selection {
            PartSelection::All => 0..part_count,
            PartSelection::Part(index) => *index..(*index + 1).min(part_count),
            PartSelection::Range(range) => range.start..range.end.min(part_count),
        };
        parts.map(|part_index| self.create_for_part(part_index)).collect()
    }

    /// Walk the play order and build the Sequence of one part.
    ///
    /// Elements starting at the same instant (chord members across voices,
    /// notes on several staves) collapse into one entry. Each entry's tick
    /// range runs until the next entry starts; the first entry starts at zero
    /// and the last ends at the schedule's end, so the ranges tile the whole
    /// Sequence even across empty measures.
    pub fn create_for_part(&self, part_index: usize) -> Sequence {
        let mut entries: Vec<SequenceEntry> = Vec::new();

        for scheduled in self.schedule.measures() {
            let Some(layout) = self.schedule.layout(scheduled.position) else {
                continue;
            };
            let elements: Vec<&PlacedElement> = layout
                .elements
                .iter()
                .filter(|p| p.element.part_index == part_index)
                .collect();

            for group in elements.chunk_by(|a, b| a.offset == b.offset) {
                let Some(start_beat) = scheduled.start_beat.checked_add(group[0].offset) else {
                    warn!(
                        "Dropping {} element(s) of part {} in measure {}: start overflows the beat range",
                        group.len(),
                        part_index,
                        scheduled.measure_index
                    );
                    continue;
                };
                let start_ms = self.schedule.ms_at(start_beat);

                if let Some(previous) = entries.last_mut() {
                    previous.tick_range.end = start_ms;
                }
                let tick_start = if entries.is_empty() { 0.0 } else { start_ms };

                let interactables: Vec<Interactable> = group
                    .iter()
                    .map(|placed| Interactable {
                        element: placed.element,
                        time_range: TickRange::new(
                            start_ms,
                            self.schedule.ms_at(
                                start_beat
                                    .checked_add(placed.duration)
                                    .unwrap_or(scheduled.end_beat),
                            ),
                        ),
                    })
                    .collect();

                entries.push(SequenceEntry {
                    element: group[0].element,
                    tick_range: TickRange::new(tick_start, start_ms),
                    interactables,
                    play_index: scheduled.play_index,
                });
            }
        }

        let duration_ms = if entries.is_empty() {
            0.0
        } else {
            self.schedule.duration_ms()
        };
        if let Some(last) = entries.last_mut() {
            last.tick_range.end = duration_ms;
        }

        debug!(
            "Built sequence for part {} with {} entries over {}ms",
            part_index,
            entries.len(),
            duration_ms
        );

        Sequence::new(part_index, entries, duration_ms)
    }
}
