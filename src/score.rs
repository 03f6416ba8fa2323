//! # Score Model
//!
//! The finalized, laid-out score handed to the playback subsystem.
//!
//! Parsing and layout happen elsewhere. By the time a [`Score`] reaches this
//! crate every measure knows its system, every part knows its box on the page,
//! and every playable entry carries its exact duration and bounding rectangle.
//! Nothing here is mutated by playback.
//!
//! ## Type Hierarchy
//! ```text
//! Score
//!   ├── Metadata (title, initial tempo)
//!   ├── Vec<PartInfo>
//!   ├── Vec<System> (index, rect)
//!   └── Vec<Measure>
//!         ├── index, system_index, rect
//!         └── Vec<Fragment>            (consecutive in time)
//!               └── Vec<MeasurePart>
//!                     ├── part_index, rect
//!                     ├── jumps: Vec<Jump>
//!                     └── Vec<Stave>
//!                           └── Vec<Voice>
//!                                 └── Vec<VoiceEntry>
//!
//! VoiceEntry (enum)
//!   ├── Note / Rest / Chord   (id, duration, rect)  playable
//!   ├── Tempo { bpm }                               direction
//!   └── Backup / Forward { duration }               voice cursor moves
//! ```
//!
//! ## Key Concepts
//!
//! ### Durations
//! Every duration is a [`Fraction`] of a quarter note, so a dotted half is `3`
//! and a triplet eighth is `1/3`.
//!
//! ### Fragments
//! A measure is split into fragments wherever its attributes change. Fragments
//! play one after another; the parts inside one fragment play simultaneously.
//!
//! ### Jumps
//! Repeat structure is attached per part, because that is where the source
//! format puts barlines. Playback needs one answer per measure, so
//! [`Measure::merged_jumps`] merges the parts: a jump is present when any part
//! states it.
//!
//! ## Serialization
//! All types derive serde, so a score can be handed over as YAML:
//! ```rust
//! use gen_playback::Score;
//!
//! let score = Score::from_yaml(r#"
//! parts: [{ id: P1 }]
//! systems: [{ index: 0, rect: { x: 0, y: 0, w: 400, h: 100 } }]
//! measures:
//!   - index: 0
//!     system-index: 0
//!     rect: { x: 0, y: 0, w: 400, h: 100 }
//!     fragments:
//!       - parts:
//!           - part-index: 0
//!             rect: { x: 0, y: 0, w: 400, h: 100 }
//!             staves:
//!               - voices:
//!                   - entries:
//!                       - { type: note, id: 1, duration: "4", rect: { x: 10, y: 20, w: 10, h: 10 } }
//! "#).unwrap();
//!
//! assert_eq!(score.measures.len(), 1);
//! ```

use crate::error::PlaybackError;
use crate::fraction::Fraction;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in layout coordinates (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// Stable identity of a playable entry, assigned by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

/// Score-level metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    pub title: Option<String>,
    /// Initial tempo in quarter-note BPM. Falls back to the configured default.
    pub tempo: Option<f64>,
}

/// A part declared by the score (one independent concurrent stream)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PartInfo {
    pub id: String,
    pub name: Option<String>,
}

/// A rendered system (one line of music across the page)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct System {
    pub index: usize,
    pub rect: Rect,
}

/// Bracket drawn above a volta ending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BracketType {
    Begin,
    End,
    BeginEnd,
}

/// Repeat annotation on a measure boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Jump {
    /// `||:` on the left barline
    #[serde(rename = "repeatstart")]
    RepeatStart,
    /// `:||` on the right barline; the span plays `times + 1` times in total
    #[serde(rename = "repeatend")]
    RepeatEnd { times: u32 },
    /// A volta ending closed by a backward repeat
    #[serde(rename = "repeatending", rename_all = "camelCase")]
    RepeatEnding {
        times: u32,
        label: String,
        bracket_type: BracketType,
    },
}

/// Payload shared by every playable voice entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Playable {
    pub id: ElementId,
    pub duration: Fraction,
    #[serde(default)]
    pub rect: Rect,
}

/// One entry in a voice, in score order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VoiceEntry {
    Note(Playable),
    Rest(Playable),
    /// A chord is a single playable element however many heads it has.
    Chord(Playable),
    /// Tempo direction, effective from this point in play order onwards
    Tempo { bpm: f64 },
    /// Move the voice cursor backwards
    Backup { duration: Fraction },
    /// Move the voice cursor forwards without sounding anything
    Forward { duration: Fraction },
}

impl VoiceEntry {
    /// The playable payload and its kind, if this entry sounds.
    pub fn playable(&self) -> Option<(ElementKind, &Playable)> {
        match self {
            VoiceEntry::Note(p) => Some((ElementKind::Note, p)),
            VoiceEntry::Rest(p) => Some((ElementKind::Rest, p)),
            VoiceEntry::Chord(p) => Some((ElementKind::Chord, p)),
            VoiceEntry::Tempo { .. } | VoiceEntry::Backup { .. } | VoiceEntry::Forward { .. } => None,
        }
    }
}

/// What kind of playable element an entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Note,
    Rest,
    Chord,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Voice {
    pub entries: Vec<VoiceEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stave {
    pub voices: Vec<Voice>,
}

/// One part's slice of a fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MeasurePart {
    pub part_index: usize,
    /// Horizontal extent of the measure, vertical extent of this part's staves
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub jumps: Vec<Jump>,
    #[serde(default)]
    pub staves: Vec<Stave>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fragment {
    pub parts: Vec<MeasurePart>,
}

/// A single rendered measure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Measure {
    pub index: usize,
    pub system_index: usize,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub fragments: Vec<Fragment>,
}

impl Measure {
    /// Jumps of every part merged into one list.
    ///
    /// A jump counts as present when any part states it. When several parts
    /// disagree on a repeat count, the largest count wins. The result is
    /// ordered start-repeat first, then the closing jump.
    pub fn merged_jumps(&self) -> Vec<Jump> {
        let mut repeat_start = false;
        let mut repeat_end: Option<u32> = None;
        let mut repeat_ending: Option<Jump> = None;

        for part in self.fragments.iter().flat_map(|f| f.parts.iter()) {
            for jump in &part.jumps {
                match jump {
                    Jump::RepeatStart => repeat_start = true,
                    Jump::RepeatEnd { times } => {
                        repeat_end = Some(repeat_end.map_or(*times, |t| t.max(*times)));
                    }
                    Jump::RepeatEnding { times, .. } => {
                        if let Some(Jump::RepeatEnding { times: kept, .. }) = repeat_ending.as_mut() {
                            *kept = (*kept).max(*times);
                        } else {
                            repeat_ending = Some(jump.clone());
                        }
                    }
                }
            }
        }

        let mut jumps = Vec::new();
        if repeat_start {
            jumps.push(Jump::RepeatStart);
        }
        if let Some(ending) = repeat_ending {
            jumps.push(ending);
        }
        if let Some(times) = repeat_end {
            jumps.push(Jump::RepeatEnd { times });
        }
        jumps
    }

    /// This measure's slices for one part, in fragment order.
    pub fn parts_for(&self, part_index: usize) -> impl Iterator<Item = (usize, &MeasurePart)> + '_ {
        self.fragments.iter().enumerate().flat_map(move |(fragment_index, fragment)| {
            fragment
                .parts
                .iter()
                .filter(move |p| p.part_index == part_index)
                .map(move |p| (fragment_index, p))
        })
    }
}

/// A complete, laid-out score
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Score {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub parts: Vec<PartInfo>,
    #[serde(default)]
    pub systems: Vec<System>,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

impl Score {
    /// Deserialize a laid-out score from YAML.
    pub fn from_yaml(source: &str) -> Result<Self, PlaybackError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Declared parts, or the highest part index used by any measure when
    /// the score declares none.
    pub fn part_count(&self) -> usize {
        let used = self
            .measures
            .iter()
            .flat_map(|m| m.fragments.iter())
            .flat_map(|f| f.parts.iter())
            .map(|p| p.part_index + 1)
            .max()
            .unwrap_or(0);
        self.parts.len().max(used)
    }

    pub fn system(&self, index: usize) -> Option<&System> {
        self.systems.iter().find(|s| s.index == index)
    }
}
