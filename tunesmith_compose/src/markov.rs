// Markov melody generator.
//
// Walks the 8-state scale-degree chain from degree 0, one step per note.
// The matrix is resolved from the (genre, mood) table, then adjusted for
// complexity and for tempo. When a harmony is supplied, each bar gets its
// own working copy in which columns landing on a chord tone are boosted, so
// the walk leans toward the chord sounding in that bar.
//
// Degrees map to notes as `scale[d % len]` raised by `d / len` octaves. The
// state itself advances modulo 8 even for 5- and 6-note scales, so on a
// pentatonic scale degrees 5-7 fold back onto the lower notes an octave up
// while still selecting their own matrix rows.

use crate::matrix::{DEGREES, TransitionMatrix, TransitionMatrixTable};
use crate::params::{Complexity, Tempo};
use crate::score::{Melody, MelodyEvent};
use crate::theory::{Chord, NOTES_PER_OCTAVE, Note};
use tunesmith_prng::ComposeRng;

/// Notes generated per bar for each tempo and complexity. An unrecognized
/// complexity takes the Complex row.
pub fn notes_per_bar(tempo: Tempo, complexity: Complexity) -> usize {
    match (tempo, complexity) {
        (Tempo::Slow, Complexity::Simple) => 2,
        (Tempo::Slow, Complexity::Intermediate) => 4,
        (Tempo::Slow, Complexity::Complex | Complexity::Unrecognized) => 8,
        (Tempo::Medium, Complexity::Simple) => 4,
        (Tempo::Medium, Complexity::Intermediate) => 8,
        (Tempo::Medium, Complexity::Complex | Complexity::Unrecognized) => 12,
        (Tempo::Fast, Complexity::Simple) => 8,
        (Tempo::Fast, Complexity::Intermediate) => 12,
        (Tempo::Fast, Complexity::Complex | Complexity::Unrecognized) => 16,
    }
}

/// Candidate note durations (fractions of a whole note) for each tempo and
/// complexity. One is drawn uniformly per note. An unrecognized complexity
/// takes the Complex row.
pub fn duration_menu(tempo: Tempo, complexity: Complexity) -> &'static [f64] {
    match (tempo, complexity) {
        (Tempo::Slow, Complexity::Simple) => &[0.5, 0.25],
        (Tempo::Slow, Complexity::Intermediate) => &[0.25, 0.5],
        (Tempo::Slow, Complexity::Complex | Complexity::Unrecognized) => &[0.125, 0.25, 0.5],
        (Tempo::Medium, Complexity::Simple) => &[0.25],
        (Tempo::Medium, Complexity::Intermediate) => &[0.125, 0.25],
        (Tempo::Medium, Complexity::Complex | Complexity::Unrecognized) => {
            &[0.0625, 0.125, 0.25]
        }
        (Tempo::Fast, Complexity::Simple) => &[0.125, 0.25],
        (Tempo::Fast, Complexity::Intermediate) => &[0.0625, 0.125, 0.25],
        (Tempo::Fast, Complexity::Complex | Complexity::Unrecognized) => &[0.0625, 0.125],
    }
}

/// Everything one Markov run needs besides the matrix table and the RNG.
#[derive(Debug, Clone, Copy)]
pub struct MelodyRequest<'a> {
    pub scale_notes: &'a [Note],
    pub bar_count: usize,
    pub complexity: Complexity,
    pub mood: &'a str,
    pub genre: &'a str,
    /// One chord per bar. Bars beyond its length are unbiased.
    pub harmony: Option<&'a [Chord]>,
    pub tempo: Tempo,
}

/// Markov generator bound to a shared, read-only matrix table.
#[derive(Debug, Clone, Copy)]
pub struct MarkovMelodyGenerator<'t> {
    table: &'t TransitionMatrixTable,
}

impl<'t> MarkovMelodyGenerator<'t> {
    pub fn new(table: &'t TransitionMatrixTable) -> Self {
        MarkovMelodyGenerator { table }
    }

    /// The matrix after complexity and tempo adjustment, before any
    /// per-bar chord bias.
    pub fn adjusted_matrix(&self, request: &MelodyRequest<'_>) -> TransitionMatrix {
        self.table
            .resolve(request.genre, request.mood)
            .adjust_for_complexity(request.complexity)
            .adjust_for_tempo(request.tempo)
    }

    /// Generate `bar_count * notes_per_bar` events. An empty scale yields an
    /// empty melody.
    pub fn generate(&self, request: &MelodyRequest<'_>, rng: &mut ComposeRng) -> Melody {
        if request.scale_notes.is_empty() {
            return Vec::new();
        }
        let matrix = self.adjusted_matrix(request);
        let per_bar = notes_per_bar(request.tempo, request.complexity);
        let durations = duration_menu(request.tempo, request.complexity);

        let mut melody = Vec::with_capacity(request.bar_count * per_bar);
        let mut current = 0usize;
        for bar in 0..request.bar_count {
            let chord = request.harmony.and_then(|h| h.get(bar));
            let bar_matrix = match chord {
                Some(&chord) => chord_biased(&matrix, request.scale_notes, chord),
                None => matrix,
            };

            for _ in 0..per_bar {
                let next = rng.weighted_index(&bar_matrix.sampling_row(current));
                let note = degree_to_note(request.scale_notes, next);
                let duration = rng.choose(durations).copied().unwrap_or(0.25);
                melody.push(MelodyEvent::new(note, duration));
                current = next % DEGREES;
            }
        }
        melody
    }
}

/// Boost columns whose scale note is a tone of `chord`.
fn chord_biased(matrix: &TransitionMatrix, scale_notes: &[Note], chord: Chord) -> TransitionMatrix {
    let tones = chord.pitch_classes();
    matrix.bias_columns(|column| {
        scale_notes
            .get(column)
            .is_some_and(|note| tones[note.pitch_class() as usize])
    })
}

/// Note for a Markov degree: wrap into the scale, carrying whole octaves.
fn degree_to_note(scale_notes: &[Note], degree: usize) -> Note {
    let len = scale_notes.len();
    let octaves = (degree / len) as i16;
    scale_notes[degree % len].transpose(octaves * NOTES_PER_OCTAVE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::scale_notes;

    fn request<'a>(notes: &'a [Note], tempo: Tempo, complexity: Complexity) -> MelodyRequest<'a> {
        MelodyRequest {
            scale_notes: notes,
            bar_count: 8,
            complexity,
            mood: "Happy",
            genre: "Pop",
            harmony: None,
            tempo,
        }
    }

    #[test]
    fn test_notes_per_bar_extremes() {
        assert_eq!(notes_per_bar(Tempo::Slow, Complexity::Simple), 2);
        assert_eq!(notes_per_bar(Tempo::Fast, Complexity::Complex), 16);
    }

    #[test]
    fn test_unrecognized_complexity_uses_complex_rows() {
        for tempo in [Tempo::Slow, Tempo::Medium, Tempo::Fast] {
            assert_eq!(
                notes_per_bar(tempo, Complexity::Unrecognized),
                notes_per_bar(tempo, Complexity::Complex)
            );
            assert_eq!(
                duration_menu(tempo, Complexity::Unrecognized),
                duration_menu(tempo, Complexity::Complex)
            );
        }
    }

    #[test]
    fn test_length_for_every_combination() {
        let table = TransitionMatrixTable::builtin();
        let generator = MarkovMelodyGenerator::new(&table);
        let notes = scale_notes("C Major", 4).unwrap();
        let mut rng = ComposeRng::new(3);
        for tempo in [Tempo::Slow, Tempo::Medium, Tempo::Fast] {
            for complexity in [Complexity::Simple, Complexity::Intermediate, Complexity::Complex] {
                let req = request(&notes, tempo, complexity);
                let melody = generator.generate(&req, &mut rng);
                assert_eq!(melody.len(), 8 * notes_per_bar(tempo, complexity));
                let menu = duration_menu(tempo, complexity);
                assert!(melody.iter().all(|e| menu.contains(&e.duration)));
            }
        }
    }

    #[test]
    fn test_notes_stay_in_scale() {
        let table = TransitionMatrixTable::builtin();
        let generator = MarkovMelodyGenerator::new(&table);
        let notes = scale_notes("Eb Pentatonic Minor", 4).unwrap();
        let scale_pcs: Vec<i16> = notes.iter().map(|n| n.pitch_class()).collect();
        let mut rng = ComposeRng::new(11);
        let melody = generator.generate(&request(&notes, Tempo::Fast, Complexity::Complex), &mut rng);
        for event in &melody {
            assert!(scale_pcs.contains(&event.note.pitch_class()), "{}", event.note);
            // Degree 7 on a 5-note scale lands one octave above degree 2.
            assert!(event.note.pitch() < notes[0].pitch() + 2 * NOTES_PER_OCTAVE);
        }
    }

    #[test]
    fn test_same_seed_same_melody() {
        let table = TransitionMatrixTable::builtin();
        let generator = MarkovMelodyGenerator::new(&table);
        let notes = scale_notes("G Mixolydian", 4).unwrap();
        let req = request(&notes, Tempo::Medium, Complexity::Intermediate);
        let a = generator.generate(&req, &mut ComposeRng::new(77));
        let b = generator.generate(&req, &mut ComposeRng::new(77));
        assert_eq!(a, b);
    }

    #[test]
    fn test_degree_to_note_wraps_octaves() {
        let notes = scale_notes("C Pentatonic Major", 4).unwrap();
        assert_eq!(degree_to_note(&notes, 0).to_string(), "C4");
        assert_eq!(degree_to_note(&notes, 5).to_string(), "C5");
        assert_eq!(degree_to_note(&notes, 7).to_string(), "E5");
        let major = scale_notes("C Major", 4).unwrap();
        assert_eq!(degree_to_note(&major, 7).to_string(), "C5");
    }

    #[test]
    fn test_chord_bias_boosts_chord_tones() {
        let notes = scale_notes("C Major", 4).unwrap();
        let uniform = TransitionMatrix::uniform();
        let chord: Chord = "G Major".parse().unwrap();
        let biased = chord_biased(&uniform, &notes, chord);
        let row = biased.row(0);
        // G, B, D are degrees 4, 6, 1. Column 7 has no scale note.
        assert!(row[4] > row[0]);
        assert!(row[6] > row[5]);
        assert!(row[1] > row[2]);
        assert!((row[7] - row[0]).abs() < 1e-12);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_harmony_shifts_distribution_toward_chord() {
        let table = TransitionMatrixTable::builtin();
        let generator = MarkovMelodyGenerator::new(&table);
        let notes = scale_notes("C Major", 4).unwrap();
        let chord: Chord = "D Minor".parse().unwrap();
        let harmony = vec![chord; 200];
        let mut req = request(&notes, Tempo::Medium, Complexity::Intermediate);
        req.bar_count = 200;

        let count_tones = |melody: &Melody| {
            melody
                .iter()
                .filter(|e| chord.contains_pitch_class(e.note.pitch_class()))
                .count()
        };
        let plain = generator.generate(&req, &mut ComposeRng::new(5));
        req.harmony = Some(harmony.as_slice());
        let biased = generator.generate(&req, &mut ComposeRng::new(5));
        assert!(count_tones(&biased) > count_tones(&plain));
    }
}
