//! # Structural Validation
//!
//! Optional checks a host can run on a [`Score`] before building playback.
//!
//! Playback itself never calls this: it tolerates odd input by clamping and
//! logging. Validation is for hosts that would rather reject a score produced
//! by a misbehaving layout stage.
//!
//! ## Rules
//! - Each measure's `index` equals its position in the measure list
//! - When the score declares systems, every measure's system exists
//! - When the score declares parts, every fragment names only declared parts
//! - Within one part, a `RepeatStart` may not open while another repeat is
//!   still open (a `RepeatEnd` or `RepeatEnding` closes it)
//!
//! Errors carry 1-based measure numbers.
//!
//! ## Example
//! ```rust
//! use gen_playback::{validate, Score};
//!
//! let score = Score::from_yaml("measures: [{ index: 0, system-index: 0 }]").unwrap();
//! assert!(validate(&score).is_ok());
//! ```

use crate::error::PlaybackError;
use crate::score::{Jump, Score};
use std::collections::HashMap;

/// Validate a score's structure
pub fn validate(score: &Score) -> Result<(), PlaybackError> {
    validate_indexes(score)?;
    validate_parts(score)?;
    validate_repeats(score)?;
    Ok(())
}

fn validate_indexes(score: &Score) -> Result<(), PlaybackError> {
    for (i, measure) in score.measures.iter().enumerate() {
        if measure.index != i {
            return Err(PlaybackError::SemanticError {
                measure: i + 1,
                message: format!("Measure index {} does not match its position {}", measure.index, i),
            });
        }
        if !score.systems.is_empty() && score.system(measure.system_index).is_none() {
            return Err(PlaybackError::SemanticError {
                measure: i + 1,
                message: format!("Measure refers to missing system {}", measure.system_index),
            });
        }
    }
    Ok(())
}

fn validate_parts(score: &Score) -> Result<(), PlaybackError> {
    if score.parts.is_empty() {
        return Ok(());
    }
    for (i, measure) in score.measures.iter().enumerate() {
        let undeclared = measure
            .fragments
            .iter()
            .flat_map(|f| f.parts.iter())
            .find(|p| p.part_index >= score.parts.len());
        if let Some(part) = undeclared {
            return Err(PlaybackError::SemanticError {
                measure: i + 1,
                message: format!(
                    "Part {} is not declared (score has {} part(s))",
                    part.part_index,
                    score.parts.len()
                ),
            });
        }
    }
    Ok(())
}

fn validate_repeats(score: &Score) -> Result<(), PlaybackError> {
    // Part index -> measure number of the repeat currently open
    let mut open: HashMap<usize, usize> = HashMap::new();

    for (i, measure) in score.measures.iter().enumerate() {
        let measure_number = i + 1;
        for part in measure.fragments.iter().flat_map(|f| f.parts.iter()) {
            for jump in &part.jumps {
                match jump {
                    Jump::RepeatStart => {
                        if let Some(started) = open.insert(part.part_index, measure_number) {
                            return Err(PlaybackError::SemanticError {
                                measure: measure_number,
                                message: format!(
                                    "Repeat start in part {} found without closing the repeat opened at measure {}",
                                    part.part_index, started
                                ),
                            });
                        }
                    }
                    Jump::RepeatEnd { .. } | Jump::RepeatEnding { .. } => {
                        open.remove(&part.part_index);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Fragment, Measure, MeasurePart, PartInfo, Rect, System};

    fn measure(index: usize, jumps: Vec<Jump>) -> Measure {
        Measure {
            index,
            system_index: 0,
            rect: Rect::default(),
            fragments: vec![Fragment {
                parts: vec![MeasurePart {
                    part_index: 0,
                    rect: Rect::default(),
                    jumps,
                    staves: vec![],
                }],
            }],
        }
    }

    fn score(measures: Vec<Measure>) -> Score {
        Score {
            parts: vec![PartInfo {
                id: "P1".to_string(),
                name: None,
            }],
            systems: vec![System {
                index: 0,
                rect: Rect::default(),
            }],
            measures,
            ..Score::default()
        }
    }

    #[test]
    fn test_valid_repeat() {
        let score = score(vec![
            measure(0, vec![Jump::RepeatStart]),
            measure(1, vec![Jump::RepeatEnd { times: 1 }]),
            measure(2, vec![Jump::RepeatStart, Jump::RepeatEnd { times: 1 }]),
        ]);
        assert!(validate(&score).is_ok());
    }

    #[test]
    fn test_nested_repeat_start() {
        let score = score(vec![
            measure(0, vec![Jump::RepeatStart]),
            measure(1, vec![Jump::RepeatStart]),
        ]);
        match validate(&score) {
            Err(PlaybackError::SemanticError { measure, message }) => {
                assert_eq!(measure, 2);
                assert!(message.contains("measure 1"));
            }
            other => panic!("Expected SemanticError, got {:?}", other),
        }
    }

    #[test]
    fn test_repeat_end_without_start_is_allowed() {
        // Playback treats the first measure as an implicit start
        let score = score(vec![measure(0, vec![]), measure(1, vec![Jump::RepeatEnd { times: 1 }])]);
        assert!(validate(&score).is_ok());
    }

    #[test]
    fn test_index_mismatch() {
        let score = score(vec![measure(0, vec![]), measure(5, vec![])]);
        assert!(matches!(
            validate(&score),
            Err(PlaybackError::SemanticError { measure: 2, .. })
        ));
    }

    #[test]
    fn test_missing_system() {
        let mut m = measure(0, vec![]);
        m.system_index = 3;
        let score = score(vec![m]);
        assert!(matches!(
            validate(&score),
            Err(PlaybackError::SemanticError { measure: 1, .. })
        ));
    }

    #[test]
    fn test_undeclared_part() {
        let mut m = measure(0, vec![]);
        m.fragments[0].parts[0].part_index = 1;
        let score = score(vec![m]);
        let err = validate(&score).unwrap_err();
        assert!(err.to_string().contains("Part 1 is not declared"));
    }

    #[test]
    fn test_empty_score_is_valid() {
        assert!(validate(&Score::default()).is_ok());
    }
}
