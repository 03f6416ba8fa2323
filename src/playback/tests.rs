use super::*;
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::score::{ElementId, Jump, Score};
use fixtures::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Score builders shared by the playback unit tests
pub(crate) mod fixtures {
    use crate::fraction::Fraction;
    use crate::score::{
        ElementId, Fragment, Jump, Measure, MeasurePart, PartInfo, Playable, Rect, Score, Stave, System, Voice,
        VoiceEntry,
    };

    pub const MEASURE_WIDTH: f64 = 400.0;
    pub const SYSTEM_HEIGHT: f64 = 200.0;
    pub const PART_SPACING: f64 = 70.0;
    pub const PART_HEIGHT: f64 = 60.0;
    const BEAT_WIDTH: f64 = 80.0;
    const MEASURE_PADDING: f64 = 20.0;

    /// Builds laid-out scores with predictable geometry.
    ///
    /// Measures sit side by side within a system, systems stack downwards,
    /// parts stack within a system, and each element's x follows its beat.
    pub struct ScoreBuilder {
        part_count: usize,
        measures: Vec<Measure>,
        tempo: Option<f64>,
    }

    impl ScoreBuilder {
        pub fn new(part_count: usize) -> Self {
            Self {
                part_count,
                measures: Vec::new(),
                tempo: None,
            }
        }

        pub fn measure(self, system_index: usize, parts: Vec<MeasurePart>) -> Self {
            self.measure_with_jumps(system_index, parts, Vec::new())
        }

        /// Like [`ScoreBuilder::measure`], with `jumps` on the first part.
        pub fn measure_with_jumps(mut self, system_index: usize, mut parts: Vec<MeasurePart>, jumps: Vec<Jump>) -> Self {
            let slot = self.measures.iter().filter(|m| m.system_index == system_index).count();
            let x = slot as f64 * MEASURE_WIDTH;
            let y = system_index as f64 * SYSTEM_HEIGHT;

            if let Some(first) = parts.first_mut() {
                first.jumps = jumps;
            }
            for part in &mut parts {
                part.rect = Rect::new(x, y + part.part_index as f64 * PART_SPACING, MEASURE_WIDTH, PART_HEIGHT);
                for voice in part.staves.iter_mut().flat_map(|s| s.voices.iter_mut()) {
                    place(voice, x, part.rect.y);
                }
            }

            self.measures.push(Measure {
                index: self.measures.len(),
                system_index,
                rect: Rect::new(x, y, MEASURE_WIDTH, self.part_count as f64 * PART_SPACING),
                fragments: vec![Fragment { parts }],
            });
            self
        }

        pub fn tempo(mut self, bpm: f64) -> Self {
            self.tempo = Some(bpm);
            self
        }

        pub fn build(self) -> Score {
            let mut score = Score::default();
            score.metadata.tempo = self.tempo;
            score.parts = (0..self.part_count)
                .map(|i| PartInfo {
                    id: format!("P{}", i + 1),
                    name: None,
                })
                .collect();
            let system_count = self.measures.iter().map(|m| m.system_index + 1).max().unwrap_or(0);
            score.systems = (0..system_count)
                .map(|index| {
                    let width = self.measures.iter().filter(|m| m.system_index == index).count() as f64 * MEASURE_WIDTH;
                    System {
                        index,
                        rect: Rect::new(0.0, index as f64 * SYSTEM_HEIGHT, width, SYSTEM_HEIGHT),
                    }
                })
                .collect();
            score.measures = self.measures;
            score
        }
    }

    /// Give every playable in a voice a rectangle at its beat position.
    fn place(voice: &mut Voice, measure_x: f64, part_y: f64) {
        let mut beat = Fraction::zero();
        for entry in &mut voice.entries {
            match entry {
                VoiceEntry::Note(p) | VoiceEntry::Rest(p) | VoiceEntry::Chord(p) => {
                    let x = measure_x + MEASURE_PADDING + beat.to_f64() * BEAT_WIDTH;
                    p.rect = Rect::new(x, part_y + 20.0, 10.0, 20.0);
                    beat = beat.checked_add(p.duration).unwrap_or(beat);
                }
                VoiceEntry::Backup { duration } => {
                    beat = beat.checked_sub(*duration).unwrap_or_default().clamp_non_negative()
                }
                VoiceEntry::Forward { duration } => beat = beat.checked_add(*duration).unwrap_or(beat),
                VoiceEntry::Tempo { .. } => {}
            }
        }
    }

    /// One part's slice of a measure, all voices on one stave
    pub fn part(part_index: usize, voices: Vec<Voice>) -> MeasurePart {
        MeasurePart {
            part_index,
            rect: Rect::default(),
            jumps: Vec::new(),
            staves: if voices.is_empty() {
                Vec::new()
            } else {
                vec![Stave { voices }]
            },
        }
    }

    pub fn note(id: u64, duration: Fraction) -> VoiceEntry {
        VoiceEntry::Note(Playable {
            id: ElementId(id),
            duration,
            rect: Rect::default(),
        })
    }

    pub fn rest(id: u64, duration: Fraction) -> VoiceEntry {
        VoiceEntry::Rest(Playable {
            id: ElementId(id),
            duration,
            rect: Rect::default(),
        })
    }

    fn notes(first_id: u64, count: u64, duration: Fraction) -> Voice {
        Voice {
            entries: (0..count).map(|i| note(first_id + i, duration)).collect(),
        }
    }

    pub fn quarter_notes(first_id: u64, count: u64) -> Voice {
        notes(first_id, count, Fraction::from_integer(1))
    }

    pub fn half_notes(first_id: u64, count: u64) -> Voice {
        notes(first_id, count, Fraction::from_integer(2))
    }

    pub fn eighth_notes(first_id: u64, count: u64) -> Voice {
        notes(first_id, count, Fraction::new(1, 2))
    }

    pub fn whole_note(id: u64) -> Voice {
        notes(id, 1, Fraction::from_integer(4))
    }
}

fn playback(score: &Score) -> ScorePlayback {
    ScorePlayback::new(score, &PlaybackConfig::default())
}

fn ids(sequence: &Sequence) -> Vec<u64> {
    sequence.iter().map(|e| e.element.id.0).collect()
}

#[test]
fn test_play_order_with_volta_endings() {
    let ending = |times| Jump::RepeatEnding {
        times,
        label: "1.".to_string(),
        bracket_type: crate::score::BracketType::BeginEnd,
    };
    let score = ScoreBuilder::new(1)
        .measure(0, vec![part(0, vec![whole_note(1)])])
        .measure_with_jumps(0, vec![part(0, vec![whole_note(2)])], vec![ending(1)])
        .measure(0, vec![part(0, vec![whole_note(3)])])
        .build();
    let playback = playback(&score);

    assert_eq!(playback.play_order(), vec![0, 1, 0, 2]);
    assert_eq!(ids(playback.sequence(0).unwrap()), vec![1, 2, 1, 3]);
    assert_eq!(playback.duration_ms(), 8000.0);
}

#[test]
fn test_cursor_defaults_to_first_part() {
    let score = ScoreBuilder::new(2)
        .measure(0, vec![part(0, vec![quarter_notes(1, 4)]), part(1, vec![whole_note(9)])])
        .build();
    let playback = playback(&score);

    let cursor = playback.add_cursor(None).unwrap();
    assert_eq!(cursor.sequence().part_index(), 0);
    assert_eq!(cursor.state().length, 4);

    let second = playback.add_discrete_cursor(Some(1)).unwrap();
    assert_eq!(second.current_element().map(|e| e.id), Some(ElementId(9)));

    match playback.add_cursor(Some(2)) {
        Err(PlaybackError::PartNotFound { part_index, part_count }) => {
            assert_eq!(part_index, 2);
            assert_eq!(part_count, 2);
        }
        other => panic!("Expected PartNotFound, got {:?}", other.map(|c| c.state())),
    }
}

#[test]
fn test_cursors_share_sequence_but_not_position() {
    let score = ScoreBuilder::new(1)
        .measure(0, vec![part(0, vec![quarter_notes(1, 4)])])
        .build();
    let playback = playback(&score);

    let mut a = playback.add_cursor(None).unwrap();
    let b = playback.add_cursor(None).unwrap();
    a.seek(1600.0).unwrap();

    assert_eq!(a.current_index(), 3);
    assert_eq!(b.current_index(), 0);
    assert!(std::sync::Arc::ptr_eq(a.sequence(), b.sequence()));
}

#[test]
fn test_seek_walks_whole_score_with_repeats() {
    let score = ScoreBuilder::new(1)
        .measure_with_jumps(
            0,
            vec![part(0, vec![quarter_notes(1, 4)])],
            vec![Jump::RepeatStart],
        )
        .measure_with_jumps(
            0,
            vec![part(0, vec![half_notes(5, 2)])],
            vec![Jump::RepeatEnd { times: 2 }],
        )
        .tempo(100.0)
        .build();
    let playback = playback(&score);
    let sequence = playback.sequence(0).unwrap().clone();
    let mut cursor = playback.add_cursor(None).unwrap();

    let mut t = 0.0;
    while t <= playback.duration_ms() {
        cursor.seek(t).unwrap();
        let entry = cursor.current_entry().unwrap();
        assert!(sequence.covers(cursor.current_index(), t), "{}ms landed on {:?}", t, entry.tick_range);
        t += 125.0;
    }
    // Backwards scrubbing too
    while t >= 0.0 {
        cursor.seek(t).unwrap();
        t -= 333.0;
    }
    assert_eq!(cursor.current_index(), 0);
}

#[test]
fn test_seek_notifies_subscribers_once_per_change() {
    let score = ScoreBuilder::new(1)
        .measure(0, vec![part(0, vec![quarter_notes(1, 4)])])
        .tempo(100.0)
        .build();
    let playback = playback(&score);
    let mut cursor = playback.add_cursor(None).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    cursor.subscribe(move |state| log.borrow_mut().push(state.element.map(|e| e.id.0)));

    for t in [0.0, 100.0, 599.0, 600.0, 700.0, 1250.0, 1250.0, 2400.0] {
        cursor.seek(t).unwrap();
    }
    assert_eq!(*seen.borrow(), vec![Some(2), Some(3), Some(4)]);
}

#[test]
fn test_frame_geometry_through_facade() {
    let score = ScoreBuilder::new(2)
        .measure(0, vec![part(0, vec![half_notes(1, 2)]), part(1, vec![whole_note(9)])])
        .build();
    let playback = playback(&score);
    let cursor = playback.add_cursor(Some(1)).unwrap();

    let frame = cursor.frame();
    let bounds = frame.bounds().unwrap();
    assert_eq!(bounds.y_range, Span::new(PART_SPACING, PART_SPACING + PART_HEIGHT));
    assert_eq!(bounds.x_range.end, MEASURE_WIDTH);
    assert_eq!(bounds.time_range, TickRange::new(0.0, 2000.0));
}

#[test]
fn test_hints_follow_cursor_steps() {
    let score = ScoreBuilder::new(1)
        .measure(0, vec![part(0, vec![quarter_notes(1, 4), half_notes(10, 2)])])
        .build();
    let playback = playback(&score);
    let mut cursor = playback.add_cursor(None).unwrap();

    // Nothing before the first step: everything sounding starts
    let first = cursor.hints();
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|h| matches!(h, CursorHint::Start(_))));

    cursor.next();
    let hints = cursor.hints();
    assert!(hints.iter().any(|h| matches!(h, CursorHint::Stop(e) if e.id == ElementId(1))));
    assert!(hints.iter().any(|h| matches!(h, CursorHint::Start(e) if e.id == ElementId(2))));
    assert!(hints.iter().any(|h| matches!(h, CursorHint::Sustain(e) if e.id == ElementId(10))));
}

#[test]
fn test_timeline_and_sequences_agree() {
    let score = ScoreBuilder::new(2)
        .measure(0, vec![part(0, vec![quarter_notes(1, 4)]), part(1, vec![eighth_notes(20, 8)])])
        .measure(1, vec![part(0, vec![whole_note(5)]), part(1, vec![half_notes(30, 2)])])
        .build();
    let playback = playback(&score);

    let starts: usize = playback
        .timeline()
        .events()
        .iter()
        .map(|e| match e {
            TimelineEvent::Transition { transitions, .. } => transitions
                .iter()
                .filter(|t| t.kind == TransitionKind::Start)
                .count(),
            _ => 0,
        })
        .sum();
    let interactables: usize = playback
        .sequences()
        .iter()
        .flat_map(|s| s.iter())
        .map(|e| e.interactables.len())
        .sum();
    assert_eq!(starts, interactables);
    assert_eq!(playback.timeline().duration_ms(), 4000);
}

#[test]
fn test_empty_score_playback() {
    let playback = playback(&Score::default());
    assert!(playback.play_order().is_empty());
    assert!(playback.sequences().is_empty());
    assert!(playback.timeline().is_empty());

    let mut cursor = playback.add_cursor(None).unwrap();
    assert!(!cursor.has_next());
    assert!(!cursor.has_previous());
    assert!(cursor.seek(500.0).is_ok());
    assert!(cursor.frame().is_empty());
    assert!(matches!(playback.add_cursor(Some(1)), Err(PlaybackError::PartNotFound { .. })));
}

#[test]
fn test_playback_rate_scales_time() {
    let score = ScoreBuilder::new(1)
        .measure(0, vec![part(0, vec![quarter_notes(1, 4)])])
        .tempo(100.0)
        .build();
    let config = PlaybackConfig {
        playback_rate: 2.0,
        ..PlaybackConfig::default()
    };
    let playback = ScorePlayback::new(&score, &config);
    assert_eq!(playback.duration_ms(), 1200.0);
    assert_eq!(playback.sequence(0).unwrap().entry(1).unwrap().tick_range.start, 300.0);
}

#[test]
fn test_rests_are_cursor_stops() {
    let voice = crate::score::Voice {
        entries: vec![
            note(1, crate::fraction::Fraction::from_integer(2)),
            rest(2, crate::fraction::Fraction::from_integer(2)),
        ],
    };
    let score = ScoreBuilder::new(1).measure(0, vec![part(0, vec![voice])]).build();
    let playback = playback(&score);
    let mut cursor = playback.add_cursor(None).unwrap();

    cursor.seek(1500.0).unwrap();
    let element = cursor.current_element().unwrap();
    assert_eq!(element.id, ElementId(2));
    assert_eq!(element.kind, crate::score::ElementKind::Rest);
}
