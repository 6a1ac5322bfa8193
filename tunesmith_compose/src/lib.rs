// Tunesmith procedural composer
//
// Turns a small set of high-level parameters (genre, scale, mood, tempo,
// length, complexity, instruments) into a melody plus a one-chord-per-bar
// harmony, and renders the result to a multi-track MIDI file. Two
// generators exist: a first-order Markov chain over scale degrees with
// genre/mood transition tables, and a rule-based composer driven by rhythm
// and contour patterns over a genre chord progression. A hybrid mode takes
// the rule-based harmony and a Markov melody biased toward it.
//
// Architecture:
// - theory.rs: Notes, scales, chords, roman-numeral progressions per genre
// - params.rs: Composition parameters, defaults, lenient enum parsing
// - matrix.rs: 8x8 degree transition matrices, the (genre, mood) table and
//   complexity/tempo/chord adjustments
// - score.rs: Melody events and harmony lists shared by the generators
// - markov.rs: Markov melody generator
// - rules.rs: Rule-based melody + harmony composer
// - compose.rs: Orchestrator dispatching markov / rule / hybrid strategies
// - midi.rs: SMF output with per-instrument figures and harmony voicing
// - error.rs: Error type shared by the library
//
// All randomness comes from a caller-supplied `ComposeRng`, so output is
// deterministic given a seed.

pub mod compose;
pub mod error;
pub mod markov;
pub mod matrix;
pub mod midi;
pub mod params;
pub mod rules;
pub mod score;
pub mod theory;

pub use compose::{Composer, Composition};
pub use error::{ComposeError, Result};
pub use params::CompositionParameters;
