// User-facing composition parameters and their defaults.
//
// `CompositionParameters` is the loose, JSON-shaped request: every field is a
// plain optional string so that unknown values survive deserialization.
// `resolve()` turns it into `ResolvedParameters`, where tempo, length,
// complexity and mode are closed enums. Only a missing genre is an error;
// every other unrecognized value falls back with a warning. Enum names match
// ignoring ASCII case and surrounding whitespace, so "fast" is Fast and
// "Markov" is markov.
//
// Defaults when a field is omitted: instruments [Piano], scale "C Major",
// mood "Neutral", tempo Medium, length Medium (32 bars), complexity Simple,
// mode hybrid. A complexity that is present but unrecognized is kept as
// `Complexity::Unrecognized` rather than Simple: the generators each have
// their own fallback for it (see `Complexity`).

use crate::error::{ComposeError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SCALE: &str = "C Major";
pub const DEFAULT_MOOD: &str = "Neutral";
pub const DEFAULT_INSTRUMENT: &str = "Piano";

/// Case-insensitive lookup of `value` among `(name, variant)` pairs,
/// falling back to `fallback` with a warning.
fn lookup<T: Copy + std::fmt::Debug>(kind: &str, value: &str, table: &[(&str, T)], fallback: T) -> T {
    match table.iter().find(|(name, _)| name.eq_ignore_ascii_case(value.trim())) {
        Some(&(_, v)) => v,
        None => {
            warn!("unrecognized {kind} {value:?}, falling back to {fallback:?}");
            fallback
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tempo {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl Tempo {
    pub fn parse_lenient(value: &str) -> Self {
        lookup(
            "tempo",
            value,
            &[("Slow", Tempo::Slow), ("Medium", Tempo::Medium), ("Fast", Tempo::Fast)],
            Tempo::default(),
        )
    }

    pub fn bpm(self) -> u16 {
        match self {
            Tempo::Slow => 70,
            Tempo::Medium => 100,
            Tempo::Fast => 130,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LengthClass {
    Short,
    #[default]
    Medium,
    Long,
}

impl LengthClass {
    pub fn parse_lenient(value: &str) -> Self {
        lookup(
            "length",
            value,
            &[
                ("Short", LengthClass::Short),
                ("Medium", LengthClass::Medium),
                ("Long", LengthClass::Long),
            ],
            LengthClass::default(),
        )
    }

    pub fn bars(self) -> usize {
        match self {
            LengthClass::Short => 16,
            LengthClass::Medium => 32,
            LengthClass::Long => 64,
        }
    }
}

/// Melodic complexity.
///
/// `Unrecognized` stands for a value outside the three names. The matrix is
/// left unadjusted for it, note counts and durations use the Complex rows,
/// and the rule composer uses the Simple rhythms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Complexity {
    #[default]
    Simple,
    Intermediate,
    Complex,
    Unrecognized,
}

impl Complexity {
    pub fn parse_lenient(value: &str) -> Self {
        lookup(
            "complexity",
            value,
            &[
                ("Simple", Complexity::Simple),
                ("Intermediate", Complexity::Intermediate),
                ("Complex", Complexity::Complex),
            ],
            Complexity::Unrecognized,
        )
    }
}

/// Which generator(s) produce the melody and harmony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Markov melody over the plain genre progression.
    Markov,
    /// Rule-based melody and harmony.
    Rule,
    /// Rule-based harmony, Markov melody biased toward it.
    #[default]
    Hybrid,
}

impl GenerationMode {
    pub fn parse_lenient(value: &str) -> Self {
        lookup(
            "mode",
            value,
            &[
                ("markov", GenerationMode::Markov),
                ("rule", GenerationMode::Rule),
                ("hybrid", GenerationMode::Hybrid),
            ],
            GenerationMode::default(),
        )
    }
}

/// Vocal settings. Accepted and carried through, but nothing renders them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocals {
    #[serde(default)]
    pub enabled: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A composition request as received from a caller or a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionParameters {
    pub genre: Option<String>,
    pub instruments: Vec<String>,
    pub scale: Option<String>,
    pub mood: Option<String>,
    pub tempo: Option<String>,
    pub length: Option<String>,
    pub vocals: Vocals,
    pub complexity: Option<String>,
    pub mode: Option<String>,
    /// Seed for the random source. Callers that omit it pick their own.
    pub seed: Option<u64>,
    /// Index into the genre's progression variants (0 = canonical).
    pub progression: Option<usize>,
}

impl CompositionParameters {
    pub fn for_genre(genre: impl Into<String>) -> Self {
        CompositionParameters {
            genre: Some(genre.into()),
            ..Default::default()
        }
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Apply defaults and lenient enum parsing. Fails only when the genre
    /// is absent or blank.
    pub fn resolve(&self) -> Result<ResolvedParameters> {
        let genre = self
            .genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .ok_or(ComposeError::MissingParameter("genre"))?;

        let instruments = if self.instruments.is_empty() {
            vec![DEFAULT_INSTRUMENT.to_string()]
        } else {
            self.instruments.clone()
        };

        Ok(ResolvedParameters {
            genre: genre.to_string(),
            instruments,
            scale: self.scale.clone().unwrap_or_else(|| DEFAULT_SCALE.to_string()),
            mood: self.mood.clone().unwrap_or_else(|| DEFAULT_MOOD.to_string()),
            tempo: self.tempo.as_deref().map(Tempo::parse_lenient).unwrap_or_default(),
            length: self
                .length
                .as_deref()
                .map(LengthClass::parse_lenient)
                .unwrap_or_default(),
            complexity: self
                .complexity
                .as_deref()
                .map(Complexity::parse_lenient)
                .unwrap_or_default(),
            mode: self
                .mode
                .as_deref()
                .map(GenerationMode::parse_lenient)
                .unwrap_or_default(),
            vocals: self.vocals.clone(),
            progression: self.progression.unwrap_or(0),
        })
    }
}

/// Parameters after defaults are applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParameters {
    pub genre: String,
    pub instruments: Vec<String>,
    pub scale: String,
    pub mood: String,
    pub tempo: Tempo,
    pub length: LengthClass,
    pub complexity: Complexity,
    pub mode: GenerationMode,
    pub vocals: Vocals,
    pub progression: usize,
}

impl ResolvedParameters {
    pub fn bar_count(&self) -> usize {
        self.length.bars()
    }

    pub fn bpm(&self) -> u16 {
        self.tempo.bpm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let resolved = CompositionParameters::for_genre("Pop").resolve().unwrap();
        assert_eq!(resolved.instruments, vec!["Piano".to_string()]);
        assert_eq!(resolved.scale, "C Major");
        assert_eq!(resolved.mood, "Neutral");
        assert_eq!(resolved.tempo, Tempo::Medium);
        assert_eq!(resolved.length, LengthClass::Medium);
        assert_eq!(resolved.bar_count(), 32);
        assert_eq!(resolved.complexity, Complexity::Simple);
        assert_eq!(resolved.mode, GenerationMode::Hybrid);
        assert!(!resolved.vocals.enabled);
        assert_eq!(resolved.bpm(), 100);
    }

    #[test]
    fn test_missing_genre() {
        let err = CompositionParameters::default().resolve().unwrap_err();
        assert!(matches!(err, ComposeError::MissingParameter("genre")));

        let blank = CompositionParameters::for_genre("  ").resolve();
        assert!(matches!(blank, Err(ComposeError::MissingParameter(_))));
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let params = CompositionParameters {
            tempo: Some("Presto".into()),
            length: Some("Epic".into()),
            complexity: Some("Baroque".into()),
            mode: Some("neural".into()),
            ..CompositionParameters::for_genre("Rock")
        };
        let resolved = params.resolve().unwrap();
        assert_eq!(resolved.tempo, Tempo::Medium);
        assert_eq!(resolved.length, LengthClass::Medium);
        assert_eq!(resolved.complexity, Complexity::Unrecognized);
        assert_eq!(resolved.mode, GenerationMode::Hybrid);
    }

    #[test]
    fn test_omitted_and_unrecognized_complexity_differ() {
        assert_eq!(Complexity::parse_lenient("Baroque"), Complexity::Unrecognized);
        let omitted = CompositionParameters::for_genre("Pop").resolve().unwrap();
        assert_eq!(omitted.complexity, Complexity::Simple);
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Tempo::parse_lenient("fast"), Tempo::Fast);
        assert_eq!(GenerationMode::parse_lenient("Markov"), GenerationMode::Markov);
        assert_eq!(LengthClass::parse_lenient("LONG").bars(), 64);
        assert_eq!(Complexity::parse_lenient(" Complex "), Complexity::Complex);
    }

    #[test]
    fn test_from_json_surface() {
        let json = r#"{
            "genre": "Jazz",
            "instruments": ["Piano", "Bass"],
            "scale": "D Minor",
            "tempo": "Slow",
            "length": "Short",
            "vocals": {"enabled": true, "type": "Choir"},
            "mode": "markov",
            "seed": 9
        }"#;
        let params = CompositionParameters::from_json(json).unwrap();
        let resolved = params.resolve().unwrap();
        assert_eq!(resolved.genre, "Jazz");
        assert_eq!(resolved.instruments.len(), 2);
        assert_eq!(resolved.bar_count(), 16);
        assert_eq!(resolved.tempo.bpm(), 70);
        assert_eq!(resolved.vocals.kind.as_deref(), Some("Choir"));
        assert_eq!(resolved.mode, GenerationMode::Markov);
        assert_eq!(params.seed, Some(9));
    }
}
