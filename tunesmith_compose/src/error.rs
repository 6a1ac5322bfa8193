// Error taxonomy for the composition engine.
//
// Only malformed theory input and a missing genre are errors. Unknown
// tempo/length/complexity/mood/genre values are not: they resolve through
// the fallback chains in `params.rs`, `matrix.rs` and `rules.rs`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    /// A required parameter (only `genre`) was absent or empty.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A note name outside the 17 accepted spellings, or a malformed note
    /// string such as `"H4"` or `"C"` with no octave.
    #[error("invalid note: {0}")]
    InvalidNote(String),

    /// A scale string whose root or scale type is unknown.
    #[error("invalid scale: {0}")]
    InvalidScale(String),

    /// A chord name whose root or chord type is unknown.
    #[error("invalid chord: {0}")]
    InvalidChord(String),

    /// A transition matrix table loaded from disk failed validation.
    #[error("invalid transition matrix: {0}")]
    InvalidMatrix(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ComposeError>;
