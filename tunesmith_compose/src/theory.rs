// Music theory tables: note names, scales, chords, and roman-numeral
// progressions.
//
// Everything here is pure and table-driven. Pitches use MIDI numbering
// (C4 = 60, octave -1 starts at 0); note names are rendered with sharp
// spellings. Parsing is case-sensitive and accepts the 12 sharp/natural
// names plus the 5 flat spellings.
//
// This module provides:
// - `Note`: a concrete pitch with a "<name><octave>" string form
// - `ScaleType` / `ScaleSpec`: scale parsing and scale-note derivation
// - `ChordType` / `Chord`: chord parsing and chord-tone derivation
// - Per-genre roman-numeral progressions and their resolution to chords
//
// Used by every generator: markov.rs and rules.rs read scale notes and chord
// pitch classes, compose.rs seeds the harmony from the genre progression.

use crate::error::{ComposeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semitone index on the MIDI scale. Signed so octave -1 and out-of-range
/// arithmetic stay representable.
pub type Pitch = i16;

pub const NOTES_PER_OCTAVE: i16 = 12;

/// Octave used when rendering scale notes and chord tones.
pub const DEFAULT_OCTAVE: i16 = 4;

const SHARP_NAMES: [&str; NOTES_PER_OCTAVE as usize] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Accepted spellings and their pitch classes.
const NOTE_SPELLINGS: [(&str, i16); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

/// Look up the table entry for a note name, returning its canonical static
/// spelling and pitch class.
fn spelling(name: &str) -> Option<(&'static str, i16)> {
    NOTE_SPELLINGS.iter().find(|(n, _)| *n == name).copied()
}

/// Pitch class (0-11) of a note name.
pub fn pitch_class_of(name: &str) -> Result<i16> {
    spelling(name)
        .map(|(_, pc)| pc)
        .ok_or_else(|| ComposeError::InvalidNote(name.to_string()))
}

/// Highest representable pitch (G9).
pub const MAX_PITCH: Pitch = 127;

/// MIDI pitch of a note name in a given octave. Fails with `InvalidNote`
/// unless the result lies in 0..=127.
pub fn pitch_of(name: &str, octave: i16) -> Result<Pitch> {
    let pc = pitch_class_of(name)?;
    octave
        .checked_add(1)
        .and_then(|o| o.checked_mul(NOTES_PER_OCTAVE))
        .and_then(|base| base.checked_add(pc))
        .filter(|pitch| (0..=MAX_PITCH).contains(pitch))
        .ok_or_else(|| ComposeError::InvalidNote(format!("{name}{octave}")))
}

/// Sharp-spelled note name and octave of a pitch. Total.
pub fn note_of(pitch: Pitch) -> (&'static str, i16) {
    let octave = pitch.div_euclid(NOTES_PER_OCTAVE) - 1;
    (SHARP_NAMES[pitch_class(pitch) as usize], octave)
}

/// Pitch class (0-11) of a pitch.
pub fn pitch_class(pitch: Pitch) -> i16 {
    pitch.rem_euclid(NOTES_PER_OCTAVE)
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// A concrete pitch, written as a sharp-spelled name plus octave ("F#3").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Note {
    pitch: Pitch,
}

impl Note {
    pub fn from_pitch(pitch: Pitch) -> Self {
        Note { pitch }
    }

    pub fn new(name: &str, octave: i16) -> Result<Self> {
        Ok(Note::from_pitch(pitch_of(name, octave)?))
    }

    pub fn pitch(self) -> Pitch {
        self.pitch
    }

    pub fn pitch_class(self) -> i16 {
        pitch_class(self.pitch)
    }

    pub fn name(self) -> &'static str {
        note_of(self.pitch).0
    }

    pub fn octave(self) -> i16 {
        note_of(self.pitch).1
    }

    pub fn transpose(self, semitones: i16) -> Self {
        Note::from_pitch(self.pitch.saturating_add(semitones))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, octave) = note_of(self.pitch);
        write!(f, "{name}{octave}")
    }
}

impl FromStr for Note {
    type Err = ComposeError;

    /// Parse "<name><octave>", e.g. "C4", "Bb2", "G#-1".
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ComposeError::InvalidNote(s.to_string());
        let split = s
            .char_indices()
            .skip(1)
            .find(|(_, c)| c.is_ascii_digit() || *c == '-')
            .map(|(i, _)| i)
            .ok_or_else(invalid)?;
        let (name, octave) = s.split_at(split);
        let octave: i16 = octave.parse().map_err(|_| invalid())?;
        Note::new(name, octave)
    }
}

impl From<Note> for String {
    fn from(note: Note) -> String {
        note.to_string()
    }
}

impl TryFrom<String> for Note {
    type Error = ComposeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Scales
// ---------------------------------------------------------------------------

/// Supported scale types, each an ascending offset pattern from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleType {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    Blues,
    PentatonicMajor,
    PentatonicMinor,
}

impl ScaleType {
    pub const ALL: [ScaleType; 10] = [
        ScaleType::Major,
        ScaleType::Minor,
        ScaleType::Dorian,
        ScaleType::Phrygian,
        ScaleType::Lydian,
        ScaleType::Mixolydian,
        ScaleType::Locrian,
        ScaleType::Blues,
        ScaleType::PentatonicMajor,
        ScaleType::PentatonicMinor,
    ];

    /// Semitone offsets from the root, strictly increasing from 0.
    pub fn intervals(self) -> &'static [i16] {
        match self {
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleType::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScaleType::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::PentatonicMajor => &[0, 2, 4, 7, 9],
            ScaleType::PentatonicMinor => &[0, 3, 5, 7, 10],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
            ScaleType::Dorian => "Dorian",
            ScaleType::Phrygian => "Phrygian",
            ScaleType::Lydian => "Lydian",
            ScaleType::Mixolydian => "Mixolydian",
            ScaleType::Locrian => "Locrian",
            ScaleType::Blues => "Blues",
            ScaleType::PentatonicMajor => "Pentatonic Major",
            ScaleType::PentatonicMinor => "Pentatonic Minor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ScaleType::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Number of distinct degrees in one octave.
    pub fn degree_count(self) -> usize {
        self.intervals().len()
    }
}

/// A parsed key: root spelling plus scale type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleSpec {
    pub root: &'static str,
    pub scale_type: ScaleType,
}

impl ScaleSpec {
    /// Only the plain Major scale reads roman numerals against the major
    /// degree table; every other scale type uses the minor table.
    pub fn is_major(&self) -> bool {
        self.scale_type == ScaleType::Major
    }

    /// Scale notes from the root at `octave`, one per degree, tonic first.
    pub fn notes(&self, octave: i16) -> Vec<Note> {
        let (_, root_pc) = spelling(self.root).unwrap_or((self.root, 0));
        let root = Note::from_pitch(root_pc + (octave + 1) * NOTES_PER_OCTAVE);
        self.scale_type
            .intervals()
            .iter()
            .map(|&offset| root.transpose(offset))
            .collect()
    }
}

impl fmt::Display for ScaleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.scale_type.name())
    }
}

/// Parse "<root> <scale type>", e.g. "C Major" or "F# Pentatonic Minor".
pub fn parse_scale(scale: &str) -> Result<ScaleSpec> {
    let invalid = || ComposeError::InvalidScale(scale.to_string());
    let mut parts = scale.split_whitespace();
    let root = parts.next().ok_or_else(invalid)?;
    let type_name = parts.collect::<Vec<_>>().join(" ");
    let (root, _) = spelling(root).ok_or_else(invalid)?;
    let scale_type = ScaleType::from_name(&type_name).ok_or_else(invalid)?;
    Ok(ScaleSpec { root, scale_type })
}

/// Notes of `scale` starting at `base_octave`.
pub fn scale_notes(scale: &str, base_octave: i16) -> Result<Vec<Note>> {
    Ok(parse_scale(scale)?.notes(base_octave))
}

// ---------------------------------------------------------------------------
// Chords
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordType {
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Major7,
    Minor7,
    Dominant7,
    Diminished7,
    HalfDiminished7,
    Augmented7,
}

impl ChordType {
    pub const ALL: [ChordType; 12] = [
        ChordType::Major,
        ChordType::Minor,
        ChordType::Diminished,
        ChordType::Augmented,
        ChordType::Sus2,
        ChordType::Sus4,
        ChordType::Major7,
        ChordType::Minor7,
        ChordType::Dominant7,
        ChordType::Diminished7,
        ChordType::HalfDiminished7,
        ChordType::Augmented7,
    ];

    /// Semitone offsets from the chord root.
    pub fn intervals(self) -> &'static [i16] {
        match self {
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Diminished => &[0, 3, 6],
            ChordType::Augmented => &[0, 4, 8],
            ChordType::Sus2 => &[0, 2, 7],
            ChordType::Sus4 => &[0, 5, 7],
            ChordType::Major7 => &[0, 4, 7, 11],
            ChordType::Minor7 => &[0, 3, 7, 10],
            ChordType::Dominant7 => &[0, 4, 7, 10],
            ChordType::Diminished7 => &[0, 3, 6, 9],
            ChordType::HalfDiminished7 => &[0, 3, 6, 10],
            ChordType::Augmented7 => &[0, 4, 8, 10],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChordType::Major => "Major",
            ChordType::Minor => "Minor",
            ChordType::Diminished => "Diminished",
            ChordType::Augmented => "Augmented",
            ChordType::Sus2 => "Sus2",
            ChordType::Sus4 => "Sus4",
            ChordType::Major7 => "Major 7",
            ChordType::Minor7 => "Minor 7",
            ChordType::Dominant7 => "Dominant 7",
            ChordType::Diminished7 => "Diminished 7",
            ChordType::HalfDiminished7 => "Half Diminished 7",
            ChordType::Augmented7 => "Augmented 7",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ChordType::ALL.into_iter().find(|t| t.name() == name)
    }

    /// The seventh-chord counterpart used when a roman numeral carries a
    /// "7" modifier. Only the three triad qualities a numeral can produce
    /// have one.
    fn with_seventh(self) -> Self {
        match self {
            ChordType::Major => ChordType::Dominant7,
            ChordType::Minor => ChordType::Minor7,
            ChordType::Diminished => ChordType::Diminished7,
            other => other,
        }
    }
}

/// A named chord, e.g. "A Minor" or "G Dominant 7".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct Chord {
    pub root: &'static str,
    pub kind: ChordType,
}

impl Chord {
    fn root_pc(self) -> i16 {
        spelling(self.root).map(|(_, pc)| pc).unwrap_or(0)
    }

    /// Chord tones built upward from the root in octave 4.
    pub fn notes(self) -> Vec<Note> {
        let root = Note::from_pitch(self.root_pc() + (DEFAULT_OCTAVE + 1) * NOTES_PER_OCTAVE);
        self.kind
            .intervals()
            .iter()
            .map(|&offset| root.transpose(offset))
            .collect()
    }

    /// Membership table of the chord's pitch classes, indexed 0-11.
    pub fn pitch_classes(self) -> [bool; 12] {
        let mut pcs = [false; 12];
        for note in self.notes() {
            pcs[note.pitch_class() as usize] = true;
        }
        pcs
    }

    pub fn contains_pitch_class(self, pc: i16) -> bool {
        self.pitch_classes()[pitch_class(pc) as usize]
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.root, self.kind.name())
    }
}

impl FromStr for Chord {
    type Err = ComposeError;

    /// Parse "<root> <chord type>", e.g. "Bb Major 7".
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ComposeError::InvalidChord(s.to_string());
        let mut parts = s.split_whitespace();
        let root = parts.next().ok_or_else(invalid)?;
        let type_name = parts.collect::<Vec<_>>().join(" ");
        let (root, _) = spelling(root).ok_or_else(invalid)?;
        let kind = ChordType::from_name(&type_name).ok_or_else(invalid)?;
        Ok(Chord { root, kind })
    }
}

impl From<Chord> for String {
    fn from(chord: Chord) -> String {
        chord.to_string()
    }
}

impl TryFrom<String> for Chord {
    type Error = ComposeError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// Equivalent to `#[serde(try_from = "String")]`; written by hand because the
// derive would require `'de: 'static` due to the `&'static str` field.
impl<'de> Deserialize<'de> for Chord {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Chord::try_from(s).map_err(serde::de::Error::custom)
    }
}

/// Chord tones of a chord name in octave 4.
pub fn chord_notes(chord_name: &str) -> Result<Vec<Note>> {
    Ok(chord_name.parse::<Chord>()?.notes())
}

// ---------------------------------------------------------------------------
// Roman-numeral progressions
// ---------------------------------------------------------------------------

/// Semitone offset of each roman-numeral core in a major key.
const MAJOR_DEGREES: [(&str, i16); 19] = [
    ("I", 0),
    ("II", 2),
    ("III", 4),
    ("IV", 5),
    ("V", 7),
    ("VI", 9),
    ("VII", 11),
    ("i", 0),
    ("ii", 2),
    ("iii", 4),
    ("iv", 5),
    ("v", 7),
    ("vi", 9),
    ("vii", 11),
    ("bII", 1),
    ("bIII", 3),
    ("bV", 6),
    ("bVI", 8),
    ("bVII", 10),
];

/// Semitone offset of each roman-numeral core in a minor key.
const MINOR_DEGREES: [(&str, i16); 19] = [
    ("I", 0),
    ("II", 2),
    ("III", 3),
    ("IV", 5),
    ("V", 7),
    ("VI", 8),
    ("VII", 10),
    ("i", 0),
    ("ii", 2),
    ("iii", 3),
    ("iv", 5),
    ("v", 7),
    ("vi", 8),
    ("vii", 10),
    ("bII", 1),
    ("bIII", 2),
    ("bV", 6),
    ("bVI", 7),
    ("bVII", 9),
];

/// Roman-numeral progressions per genre. The first entry is canonical.
const GENRE_PROGRESSIONS: &[(&str, &[&[&str]])] = &[
    (
        "Pop",
        &[&["I", "V", "vi", "IV"], &["I", "IV", "V"], &["vi", "IV", "I", "V"]],
    ),
    (
        "Rock",
        &[
            &["I", "IV", "V"],
            &["I", "V", "IV"],
            &["I", "bVII", "IV"],
            &["i", "bVI", "bVII"],
        ],
    ),
    (
        "Jazz",
        &[
            &["ii", "V", "I"],
            &["I", "vi", "ii", "V"],
            &["iii", "VI", "ii", "V"],
        ],
    ),
    (
        "Classical",
        &[
            &["I", "IV", "V", "I"],
            &["I", "ii", "V", "I"],
            &["vi", "ii", "V", "I"],
        ],
    ),
    ("Blues", &[&["I", "IV", "I", "V", "IV", "I"]]),
];

/// Progression variants for a genre; unknown genres get Pop's.
pub fn genre_progressions(genre: &str) -> &'static [&'static [&'static str]] {
    GENRE_PROGRESSIONS
        .iter()
        .find(|(g, _)| *g == genre)
        .or_else(|| GENRE_PROGRESSIONS.first())
        .map(|(_, progressions)| *progressions)
        .unwrap_or(&[])
}

/// Split a symbol such as "bVII7" into its core ("bVII") and modifier ("7").
fn split_symbol(symbol: &str) -> (&str, &str) {
    let numeral_start = usize::from(symbol.starts_with('b'));
    let numeral_len = symbol[numeral_start..]
        .find(|c| !matches!(c, 'I' | 'V' | 'i' | 'v'))
        .unwrap_or(symbol.len() - numeral_start);
    symbol.split_at(numeral_start + numeral_len)
}

/// Resolve one roman-numeral symbol against a key.
///
/// A leading `b` is part of the numeral and selects the flat entry of the
/// degree table, so `bVII` in C major is A# Major (a whole step below the
/// tonic) and not B Diminished. Quality is decided from the numeral with the
/// flat removed.
pub fn resolve_symbol(symbol: &str, key: &ScaleSpec) -> Chord {
    let (core, modifiers) = split_symbol(symbol);
    let degrees: &[(&str, i16)] = if key.is_major() {
        &MAJOR_DEGREES
    } else {
        &MINOR_DEGREES
    };
    let offset = degrees
        .iter()
        .find(|(c, _)| *c == core)
        .map(|(_, o)| *o)
        .unwrap_or(0);

    let root_pc = spelling(key.root).map(|(_, pc)| pc).unwrap_or(0);
    let (root, _) = note_of(root_pc + offset);

    let numeral = core.trim_start_matches('b');
    let mut kind = if !numeral.is_empty() && numeral.chars().all(|c| c.is_ascii_lowercase()) {
        ChordType::Minor
    } else if core == "VII" && key.is_major() {
        ChordType::Diminished
    } else {
        ChordType::Major
    };
    if modifiers.contains('7') {
        kind = kind.with_seventh();
    }
    Chord { root, kind }
}

/// Resolve the `variant`-th progression of `genre` in `scale`. The index
/// wraps around the genre's variant list.
pub fn chord_progression_variant(genre: &str, scale: &str, variant: usize) -> Result<Vec<Chord>> {
    let key = parse_scale(scale)?;
    let variants = genre_progressions(genre);
    let Some(symbols) = variants.get(variant % variants.len().max(1)) else {
        return Ok(Vec::new());
    };
    Ok(symbols.iter().map(|s| resolve_symbol(s, &key)).collect())
}

/// Canonical progression for `genre` in `scale`.
pub fn chord_progression_for_genre(genre: &str, scale: &str) -> Result<Vec<Chord>> {
    chord_progression_variant(genre, scale, 0)
}
