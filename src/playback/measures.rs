//! Measure play order
//!
//! Expands repeat structure into the linear order measures are actually played.

use crate::score::{Jump, Score};
use std::collections::HashMap;

/// A rendered measure as seen by the play-order expansion
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureJumps {
    pub index: usize,
    pub jumps: Vec<Jump>,
}

impl Score {
    /// One `{ index, jumps }` per measure, parts merged with [`crate::Measure::merged_jumps`].
    pub fn measure_jumps(&self) -> Vec<MeasureJumps> {
        self.measures
            .iter()
            .map(|m| MeasureJumps {
                index: m.index,
                jumps: m.merged_jumps(),
            })
            .collect()
    }
}

/// Iterator over measure indices in play order.
///
/// Repeats are modelled as follows:
/// - A repeat boundary starts at the first measure (an implicit `||:`).
/// - `RepeatStart` moves the boundary to its own measure.
/// - `RepeatEnd { times }` sends playback back to the boundary `times` more
///   times, then moves the boundary past itself.
/// - `RepeatEnding { times }` does the same, except that the ending measure is
///   skipped on the final pass, so playback continues right after it.
///
/// Every backward jump consumes one unit of a finite counter, so the iterator
/// always terminates.
///
/// ```rust
/// use gen_playback::playback::{MeasureJumps, MeasureSequenceIterator};
/// use gen_playback::Jump;
///
/// let measures = vec![
///     MeasureJumps { index: 0, jumps: vec![] },
///     MeasureJumps { index: 1, jumps: vec![Jump::RepeatEnd { times: 1 }] },
/// ];
/// let order: Vec<usize> = MeasureSequenceIterator::new(measures).collect();
/// assert_eq!(order, vec![0, 1, 0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct MeasureSequenceIterator {
    measures: Vec<MeasureJumps>,
    /// List position of the next measure to consider
    cursor: usize,
    /// List position playback returns to on a backward repeat
    boundary: usize,
    /// Backward jumps left, keyed by list position of the closing measure
    remaining: HashMap<usize, u32>,
}

impl MeasureSequenceIterator {
    pub fn new(measures: Vec<MeasureJumps>) -> Self {
        Self {
            measures,
            cursor: 0,
            boundary: 0,
            remaining: HashMap::new(),
        }
    }

    pub fn from_score(score: &Score) -> Self {
        Self::new(score.measure_jumps())
    }

    /// Like [`Iterator::next`], but also yields the measure's list position.
    pub fn next_position(&mut self) -> Option<(usize, usize)> {
        // Endings whose passes are used up are stepped over
        while self.cursor < self.measures.len() && self.is_exhausted_ending(self.cursor) {
            self.cursor += 1;
            self.boundary = self.cursor;
        }

        let position = self.cursor;
        let measure = self.measures.get(position)?;

        if measure.jumps.iter().any(|j| matches!(j, Jump::RepeatStart)) {
            self.boundary = position;
        }

        let mut next = position + 1;
        if let Some(times) = closing_repeat_times(&measure.jumps) {
            let remaining = self.remaining.entry(position).or_insert(times);
            if *remaining > 0 {
                *remaining -= 1;
                next = self.boundary;
            } else {
                self.boundary = position + 1;
            }
        }

        self.cursor = next;
        Some((measure.index, position))
    }

    fn is_exhausted_ending(&self, position: usize) -> bool {
        let is_ending = self.measures[position]
            .jumps
            .iter()
            .any(|j| matches!(j, Jump::RepeatEnding { .. }));
        is_ending && self.remaining.get(&position) == Some(&0)
    }
}

impl Iterator for MeasureSequenceIterator {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_position().map(|(index, _)| index)
    }
}

/// Repeat count of the measure's closing jump. An ending takes precedence.
fn closing_repeat_times(jumps: &[Jump]) -> Option<u32> {
    jumps
        .iter()
        .find_map(|j| match j {
            Jump::RepeatEnding { times, .. } => Some(*times),
            _ => None,
        })
        .or_else(|| {
            jumps.iter().find_map(|j| match j {
                Jump::RepeatEnd { times } => Some(*times),
                _ => None,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::BracketType;

    fn m(index: usize, jumps: Vec<Jump>) -> MeasureJumps {
        MeasureJumps { index, jumps }
    }

    fn order(measures: Vec<MeasureJumps>) -> Vec<usize> {
        MeasureSequenceIterator::new(measures).collect()
    }

    fn ending(times: u32) -> Jump {
        Jump::RepeatEnding {
            times,
            label: "1.".to_string(),
            bracket_type: BracketType::BeginEnd,
        }
    }

    #[test]
    fn test_no_repeats_is_identity() {
        let measures = (0..5).map(|i| m(i, vec![])).collect();
        assert_eq!(order(measures), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_score_has_empty_order() {
        assert_eq!(order(vec![]), Vec::<usize>::new());
    }

    #[test]
    fn test_single_measure_repeat() {
        let measures = vec![m(0, vec![Jump::RepeatStart, Jump::RepeatEnd { times: 1 }])];
        assert_eq!(order(measures), vec![0, 0]);
    }

    #[test]
    fn test_implicit_repeat_start() {
        let measures = vec![m(0, vec![]), m(1, vec![Jump::RepeatEnd { times: 1 }])];
        assert_eq!(order(measures), vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_repeat_twice() {
        let measures = vec![
            m(0, vec![Jump::RepeatStart]),
            m(1, vec![Jump::RepeatEnd { times: 2 }]),
        ];
        assert_eq!(order(measures), vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_repeat_ending_skipped_on_last_pass() {
        let measures = vec![m(0, vec![]), m(1, vec![ending(1)]), m(2, vec![])];
        assert_eq!(order(measures), vec![0, 1, 0, 2]);
    }

    #[test]
    fn test_repeat_ending_played_on_every_pass_but_last() {
        let measures = vec![m(0, vec![]), m(1, vec![ending(2)]), m(2, vec![])];
        assert_eq!(order(measures), vec![0, 1, 0, 1, 0, 2]);
    }

    #[test]
    fn test_back_to_back_endings() {
        // Skipping the used-up first ending moves the boundary onto the second
        let measures = vec![m(0, vec![]), m(1, vec![ending(1)]), m(2, vec![ending(1)]), m(3, vec![])];
        assert_eq!(order(measures), vec![0, 1, 0, 2, 3]);
    }

    #[test]
    fn test_intro_then_repeat() {
        let measures = vec![
            m(0, vec![]),
            m(1, vec![Jump::RepeatStart]),
            m(2, vec![Jump::RepeatEnd { times: 1 }]),
            m(3, vec![]),
        ];
        assert_eq!(order(measures), vec![0, 1, 2, 1, 2, 3]);
    }

    #[test]
    fn test_consecutive_repeats_use_advanced_boundary() {
        // The second repeat has no explicit start; it returns to just after the first
        let measures = vec![
            m(0, vec![Jump::RepeatEnd { times: 1 }]),
            m(1, vec![]),
            m(2, vec![Jump::RepeatEnd { times: 1 }]),
        ];
        assert_eq!(order(measures), vec![0, 0, 1, 2, 1, 2]);
    }

    #[test]
    fn test_zero_times_plays_once() {
        let measures = vec![m(0, vec![]), m(1, vec![Jump::RepeatEnd { times: 0 }])];
        assert_eq!(order(measures), vec![0, 1]);
    }

    #[test]
    fn test_positions_follow_list_not_index() {
        let mut iter = MeasureSequenceIterator::new(vec![
            m(10, vec![]),
            m(11, vec![Jump::RepeatEnd { times: 1 }]),
        ]);
        assert_eq!(iter.next_position(), Some((10, 0)));
        assert_eq!(iter.next_position(), Some((11, 1)));
        assert_eq!(iter.next_position(), Some((10, 0)));
        assert_eq!(iter.next_position(), Some((11, 1)));
        assert_eq!(iter.next_position(), None);
    }
}
