// Rule-based composer: melody from authored rhythm and contour patterns.
//
// The harmony is the seed progression repeated to cover every bar. Each bar
// then draws, independently:
// - a rhythm pattern: the tempo-specific set for Slow/Fast, otherwise the
//   complexity set for Medium
// - a contour: signed scale-index offsets, chosen from the mood's set
//   (unknown moods use Neutral)
// - a starting scale index, preferring scale notes that are chord tones
//
// The contour is laid over the scale from that start (wrapping by octave),
// and the rhythm is cycled or truncated to one duration per contour note.

use crate::error::{ComposeError, Result};
use crate::params::{Complexity, Tempo};
use crate::score::{Harmony, Melody, MelodyEvent, cycle_to_length};
use crate::theory::{Chord, DEFAULT_OCTAVE, NOTES_PER_OCTAVE, Note, scale_notes};
use log::debug;
use tunesmith_prng::ComposeRng;

type Rhythm = &'static [f64];
type Contour = &'static [i16];

/// Rhythms by complexity, used at Medium tempo. An unrecognized complexity
/// gets the Simple set.
fn complexity_rhythms(complexity: Complexity) -> &'static [Rhythm] {
    match complexity {
        Complexity::Simple | Complexity::Unrecognized => &[
            &[0.25, 0.25, 0.25, 0.25],
            &[0.5, 0.25, 0.25],
            &[0.25, 0.25, 0.5],
        ],
        Complexity::Intermediate => &[
            &[0.125, 0.125, 0.25, 0.125, 0.125, 0.25],
            &[0.25, 0.125, 0.125, 0.25, 0.25],
            &[0.125, 0.125, 0.125, 0.125, 0.25, 0.25],
        ],
        Complexity::Complex => &[
            &[0.0625, 0.0625, 0.0625, 0.0625, 0.125, 0.125, 0.25],
            &[0.125, 0.0625, 0.0625, 0.125, 0.125, 0.125, 0.125, 0.125],
            &[0.0625, 0.0625, 0.125, 0.0625, 0.0625, 0.125, 0.25],
        ],
    }
}

/// Rhythms with a dedicated set for this tempo, if any. Slow leans on half
/// notes, Fast on eighths and sixteenths.
fn tempo_rhythms(tempo: Tempo, complexity: Complexity) -> Option<&'static [Rhythm]> {
    let patterns: &'static [Rhythm] = match (tempo, complexity) {
        (Tempo::Slow, Complexity::Simple) => &[&[0.5, 0.5], &[0.75, 0.25], &[0.5, 0.25, 0.25]],
        (Tempo::Slow, Complexity::Intermediate) => &[
            &[0.5, 0.25, 0.25, 0.5],
            &[0.25, 0.5, 0.25, 0.5],
            &[0.5, 0.5, 0.25, 0.25],
        ],
        (Tempo::Slow, Complexity::Complex) => &[
            &[0.25, 0.25, 0.5, 0.25, 0.25, 0.5],
            &[0.5, 0.125, 0.125, 0.25, 0.5, 0.25],
            &[0.375, 0.125, 0.25, 0.25, 0.5, 0.25],
        ],
        (Tempo::Fast, Complexity::Simple) => &[
            &[0.125, 0.125, 0.125, 0.125, 0.125, 0.125, 0.125, 0.125],
            &[0.125, 0.125, 0.25, 0.125, 0.125, 0.25],
            &[0.25, 0.125, 0.125, 0.25, 0.25],
        ],
        (Tempo::Fast, Complexity::Intermediate) => &[
            &[0.0625, 0.0625, 0.125, 0.125, 0.0625, 0.0625, 0.125, 0.125, 0.25],
            &[0.125, 0.0625, 0.0625, 0.125, 0.125, 0.125, 0.125, 0.125, 0.125],
            &[0.0625, 0.0625, 0.0625, 0.0625, 0.125, 0.125, 0.125, 0.125, 0.125],
        ],
        (Tempo::Fast, Complexity::Complex) => &[
            &[
                0.0625, 0.0625, 0.0625, 0.0625, 0.0625, 0.0625, 0.0625, 0.0625, 0.125, 0.125,
                0.125, 0.125,
            ],
            &[
                0.0625, 0.03125, 0.03125, 0.0625, 0.0625, 0.125, 0.0625, 0.0625, 0.125, 0.125,
                0.125,
            ],
            &[0.125, 0.0625, 0.0625, 0.0625, 0.0625, 0.125, 0.0625, 0.0625, 0.125, 0.125],
        ],
        (Tempo::Medium, _) | (_, Complexity::Unrecognized) => return None,
    };
    Some(patterns)
}

/// Rhythm patterns to draw from for a bar.
pub fn rhythm_patterns(tempo: Tempo, complexity: Complexity) -> &'static [Rhythm] {
    tempo_rhythms(tempo, complexity).unwrap_or_else(|| complexity_rhythms(complexity))
}

const MOOD_CONTOURS: &[(&str, &[Contour])] = &[
    ("Happy", &[&[0, 2, 4, 7], &[0, 4, 7, 4, 0], &[0, 2, 4, 5, 7]]),
    ("Sad", &[&[0, 3, 7, 10], &[0, -2, -3, -5], &[0, 3, 2, 0]]),
    (
        "Energetic",
        &[&[0, 7, 12, 7], &[0, 4, 7, 11], &[0, 2, 4, 7, 9, 12]],
    ),
    ("Calm", &[&[0, 5, 7, 12], &[0, 2, 0, -3], &[0, 4, 7, 5, 4, 0]]),
    (
        "Neutral",
        &[&[0, 4, 7], &[0, 3, 7], &[0, 2, 4, 5, 7, 9, 11, 12]],
    ),
];

const FALLBACK_MOOD: &str = "Neutral";

/// Contour patterns for a mood; unknown moods use Neutral's.
pub fn contour_patterns(mood: &str) -> &'static [Contour] {
    let find = |m: &str| MOOD_CONTOURS.iter().find(|(name, _)| *name == m);
    find(mood)
        .or_else(|| find(FALLBACK_MOOD))
        .map(|(_, contours)| *contours)
        .unwrap_or(&[])
}

/// Inputs to one rule-based run.
#[derive(Debug, Clone, Copy)]
pub struct RuleRequest<'a> {
    pub scale: &'a str,
    /// Seed progression, one chord per bar before cycling.
    pub progression: &'a [Chord],
    pub bar_count: usize,
    pub complexity: Complexity,
    pub mood: &'a str,
    pub tempo: Tempo,
}

/// Rule-based melody and harmony generator. Stateless; all pattern tables
/// are constants.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedComposer;

impl RuleBasedComposer {
    pub fn new() -> Self {
        RuleBasedComposer
    }

    /// Compose a melody and a harmony of exactly `bar_count` chords.
    pub fn compose(&self, request: &RuleRequest<'_>, rng: &mut ComposeRng) -> Result<(Melody, Harmony)> {
        if request.progression.is_empty() {
            return Err(ComposeError::InvalidChord("empty progression".to_string()));
        }
        let scale = scale_notes(request.scale, DEFAULT_OCTAVE)?;
        let harmony = cycle_to_length(request.progression, request.bar_count);
        let rhythms = rhythm_patterns(request.tempo, request.complexity);
        let contours = contour_patterns(request.mood);

        let mut melody = Vec::new();
        for &chord in &harmony {
            melody.extend(compose_bar(&scale, chord, rhythms, contours, rng));
        }
        debug!(
            "rule-based: {} bars, {} events in {}",
            harmony.len(),
            melody.len(),
            request.scale
        );
        Ok((melody, harmony))
    }
}

/// One bar of melody over `chord`. Empty only if a pattern set is empty.
fn compose_bar(
    scale: &[Note],
    chord: Chord,
    rhythms: &[Rhythm],
    contours: &[Contour],
    rng: &mut ComposeRng,
) -> Vec<MelodyEvent> {
    let (Some(rhythm), Some(contour)) = (rng.choose(rhythms), rng.choose(contours)) else {
        return Vec::new();
    };
    let start = starting_index(scale, chord, rng);
    let notes = apply_contour(contour, scale, start);
    let durations = cycle_to_length(rhythm, notes.len());
    notes
        .into_iter()
        .zip(durations)
        .map(|(note, duration)| MelodyEvent::new(note, duration))
        .collect()
}

/// Scale indices whose note is a tone of `chord`.
fn chord_tone_indices(scale: &[Note], chord: Chord) -> Vec<usize> {
    let tones = chord.pitch_classes();
    scale
        .iter()
        .enumerate()
        .filter(|(_, note)| tones[note.pitch_class() as usize])
        .map(|(i, _)| i)
        .collect()
}

/// Pick where the contour starts: a chord tone if the scale has one.
fn starting_index(scale: &[Note], chord: Chord, rng: &mut ComposeRng) -> usize {
    let candidates = chord_tone_indices(scale, chord);
    match rng.choose(&candidates) {
        Some(&i) => i,
        None => rng.range_usize(0, scale.len()),
    }
}

/// Lay `contour` over the scale from `start`, one note per offset.
fn apply_contour(contour: &[i16], scale: &[Note], start: usize) -> Vec<Note> {
    let len = scale.len() as i16;
    contour
        .iter()
        .map(|&offset| {
            let position = start as i16 + offset;
            let octave_shift = position.div_euclid(len);
            scale[position.rem_euclid(len) as usize].transpose(octave_shift * NOTES_PER_OCTAVE)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::chord_progression_for_genre;

    fn request<'a>(progression: &'a [Chord], tempo: Tempo, complexity: Complexity) -> RuleRequest<'a> {
        RuleRequest {
            scale: "C Major",
            progression,
            bar_count: 16,
            complexity,
            mood: "Happy",
            tempo,
        }
    }

    #[test]
    fn test_rhythm_selection_prefers_tempo_sets() {
        assert_eq!(rhythm_patterns(Tempo::Slow, Complexity::Simple)[0], &[0.5, 0.5]);
        assert_eq!(rhythm_patterns(Tempo::Medium, Complexity::Simple)[0], &[0.25; 4]);
        assert_eq!(rhythm_patterns(Tempo::Fast, Complexity::Simple)[0], &[0.125; 8]);
        // No tempo set exists for an unrecognized complexity, so every tempo
        // falls through to the Simple complexity set.
        for tempo in [Tempo::Slow, Tempo::Medium, Tempo::Fast] {
            assert_eq!(
                rhythm_patterns(tempo, Complexity::Unrecognized),
                complexity_rhythms(Complexity::Simple)
            );
        }
    }

    #[test]
    fn test_unknown_mood_uses_neutral() {
        assert_eq!(contour_patterns("Melancholic"), contour_patterns("Neutral"));
        assert_ne!(contour_patterns("Sad"), contour_patterns("Neutral"));
    }

    #[test]
    fn test_apply_contour_wraps_octaves() {
        let scale = scale_notes("C Major", 4).unwrap();
        let notes: Vec<String> = apply_contour(&[0, 2, 7, -1], &scale, 0)
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(notes, ["C4", "E4", "C5", "B3"]);
    }

    #[test]
    fn test_chord_tone_indices() {
        let scale = scale_notes("C Major", 4).unwrap();
        let chord: Chord = "A Minor".parse().unwrap();
        assert_eq!(chord_tone_indices(&scale, chord), vec![0, 2, 5]);
        let foreign: Chord = "C# Major".parse().unwrap();
        assert_eq!(chord_tone_indices(&scale, foreign), vec![3]);
        let outside: Chord = "F# Diminished".parse().unwrap();
        // F#, A, C: A and C are in C major.
        assert_eq!(chord_tone_indices(&scale, outside), vec![0, 5]);
    }

    #[test]
    fn test_harmony_covers_every_bar() {
        let progression = chord_progression_for_genre("Rock", "C Major").unwrap();
        let composer = RuleBasedComposer::new();
        let mut rng = ComposeRng::new(8);
        for bars in [1, 3, 16, 17, 64] {
            let mut req = request(&progression, Tempo::Medium, Complexity::Simple);
            req.bar_count = bars;
            let (_, harmony) = composer.compose(&req, &mut rng).unwrap();
            assert_eq!(harmony.len(), bars);
            assert_eq!(harmony[..3.min(bars)], progression[..3.min(bars)]);
        }
    }

    #[test]
    fn test_melody_durations_come_from_selected_rhythms() {
        let progression = chord_progression_for_genre("Pop", "C Major").unwrap();
        let composer = RuleBasedComposer::new();
        let mut rng = ComposeRng::new(21);
        let req = request(&progression, Tempo::Slow, Complexity::Intermediate);
        let (melody, _) = composer.compose(&req, &mut rng).unwrap();
        assert!(!melody.is_empty());
        assert!(melody.iter().all(|e| e.duration == 0.25 || e.duration == 0.5));
    }

    #[test]
    fn test_bars_start_on_chord_tones() {
        // Every authored contour begins at offset 0, so the first note of a
        // bar is the chosen starting index.
        let scale = scale_notes("C Major", 4).unwrap();
        let rhythms = rhythm_patterns(Tempo::Medium, Complexity::Simple);
        let mut rng = ComposeRng::new(4);
        for (mood, _) in MOOD_CONTOURS {
            for chord in chord_progression_for_genre("Classical", "C Major").unwrap() {
                for _ in 0..20 {
                    let bar = compose_bar(&scale, chord, rhythms, contour_patterns(mood), &mut rng);
                    let first = bar[0].note;
                    assert!(chord.contains_pitch_class(first.pitch_class()), "{first} not in {chord}");
                }
            }
        }
    }

    #[test]
    fn test_bar_length_matches_contour() {
        let scale = scale_notes("A Minor", 4).unwrap();
        let chord: Chord = "A Minor".parse().unwrap();
        let contours: &[Contour] = &[&[0, 2, 4, 5, 7, 9, 11, 12]];
        let rhythms: &[Rhythm] = &[&[0.5, 0.25, 0.25]];
        let mut rng = ComposeRng::new(10);
        let bar = compose_bar(&scale, chord, rhythms, contours, &mut rng);
        assert_eq!(bar.len(), 8);
        let durations: Vec<f64> = bar.iter().map(|e| e.duration).collect();
        assert_eq!(durations, [0.5, 0.25, 0.25, 0.5, 0.25, 0.25, 0.5, 0.25]);
    }

    #[test]
    fn test_empty_progression_is_rejected() {
        let composer = RuleBasedComposer::new();
        let mut rng = ComposeRng::new(1);
        let req = request(&[], Tempo::Medium, Complexity::Simple);
        assert!(matches!(
            composer.compose(&req, &mut rng),
            Err(ComposeError::InvalidChord(_))
        ));
    }

    #[test]
    fn test_bad_scale_is_rejected() {
        let progression = chord_progression_for_genre("Pop", "C Major").unwrap();
        let composer = RuleBasedComposer::new();
        let mut rng = ComposeRng::new(1);
        let mut req = request(&progression, Tempo::Medium, Complexity::Simple);
        req.scale = "C Chromatic";
        assert!(matches!(
            composer.compose(&req, &mut rng),
            Err(ComposeError::InvalidScale(_))
        ));
    }
}
