// Scale-degree transition matrices for the Markov melody generator.
//
// A `TransitionMatrix` is an 8x8 row-stochastic table over scale degrees
// 0-7, where degree 7 is the octave of degree 0. It is a plain `Copy` value:
// every adjustment returns a new matrix and never touches the table entry it
// started from, so one `TransitionMatrixTable` can be shared by reference
// across any number of concurrent generation calls.
//
// The table holds authored (genre, mood) "personalities" plus a default.
// Resolution order is fixed:
//   1. exact (genre, mood) match
//   2. first entry with a matching genre, whatever its mood
//   3. the default matrix
//
// The built-in table can be replaced by a JSON file loaded at startup
// (`TransitionMatrixTable::load`), validated before use.

use crate::error::{ComposeError, Result};
use crate::params::{Complexity, Tempo};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of Markov states (scale degrees including the octave).
pub const DEGREES: usize = 8;

/// Columns that Simple complexity favors: tonic, third, fifth.
const CHORD_TONE_DEGREES: [usize; 3] = [0, 2, 4];

/// Mass moved into each favored column per row for Simple complexity.
const SIMPLE_BOOST: f64 = 0.1;

/// Share of the authored distribution kept when Complex flattens a row.
const COMPLEX_KEEP: f64 = 0.7;

/// Multiplier for favored cells in tempo and chord biasing.
const BIAS_FACTOR: f64 = 1.5;

type Row = [f64; DEGREES];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionMatrix {
    rows: [Row; DEGREES],
}

impl TransitionMatrix {
    pub const fn from_rows(rows: [Row; DEGREES]) -> Self {
        TransitionMatrix { rows }
    }

    pub fn uniform() -> Self {
        TransitionMatrix::from_rows([[1.0 / DEGREES as f64; DEGREES]; DEGREES])
    }

    pub fn rows(&self) -> &[Row; DEGREES] {
        &self.rows
    }

    pub fn row(&self, degree: usize) -> &Row {
        &self.rows[degree % DEGREES]
    }

    /// Divide every row by its sum. Rows summing to zero or less are left
    /// as they are; `sampling_row` deals with them.
    pub fn normalized(&self) -> Self {
        let mut rows = self.rows;
        for row in rows.iter_mut() {
            normalize_row(row);
        }
        TransitionMatrix { rows }
    }

    /// Apply the complexity policy.
    ///
    /// - Simple: each row gains up to 0.1 in columns 0, 2 and 4 (never past
    ///   1.0), the other columns give up the same total in proportion to
    ///   their weight, then the row is renormalized.
    /// - Complex: each cell becomes 70% authored + 30% uniform, renormalized.
    /// - Intermediate or unrecognized: unchanged.
    pub fn adjust_for_complexity(&self, complexity: Complexity) -> Self {
        match complexity {
            Complexity::Simple => {
                let mut rows = self.rows;
                for row in rows.iter_mut() {
                    let mut total_increase = 0.0;
                    for &j in &CHORD_TONE_DEGREES {
                        let increase = SIMPLE_BOOST.min(1.0 - row[j]);
                        row[j] += increase;
                        total_increase += increase;
                    }
                    if total_increase > 0.0 {
                        let others: Vec<usize> = (0..DEGREES)
                            .filter(|j| !CHORD_TONE_DEGREES.contains(j))
                            .collect();
                        let total_other: f64 = others.iter().map(|&j| row[j]).sum();
                        if total_other > 0.0 {
                            for &j in &others {
                                row[j] -= row[j] / total_other * total_increase;
                            }
                        }
                    }
                }
                TransitionMatrix { rows }.normalized()
            }
            Complexity::Complex => {
                let uniform = 1.0 / DEGREES as f64;
                let mut rows = self.rows;
                for cell in rows.iter_mut().flatten() {
                    *cell = COMPLEX_KEEP * *cell + (1.0 - COMPLEX_KEEP) * uniform;
                }
                TransitionMatrix { rows }.normalized()
            }
            Complexity::Intermediate | Complexity::Unrecognized => *self,
        }
    }

    /// Apply the tempo policy: Fast boosts jumps of 3+ degrees, Slow boosts
    /// moves of 2 or fewer, Medium is unchanged.
    pub fn adjust_for_tempo(&self, tempo: Tempo) -> Self {
        let favored: fn(usize) -> bool = match tempo {
            Tempo::Fast => |jump| jump >= 3,
            Tempo::Slow => |jump| jump <= 2,
            Tempo::Medium => return *self,
        };
        let mut rows = self.rows;
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                if favored(i.abs_diff(j)) {
                    *cell *= BIAS_FACTOR;
                }
            }
        }
        TransitionMatrix { rows }.normalized()
    }

    /// Multiply every column for which `favored(column)` holds by 1.5 and
    /// renormalize each row.
    pub fn bias_columns(&self, favored: impl Fn(usize) -> bool) -> Self {
        let mut rows = self.rows;
        for row in rows.iter_mut() {
            for (j, cell) in row.iter_mut().enumerate() {
                if favored(j) {
                    *cell *= BIAS_FACTOR;
                }
            }
        }
        TransitionMatrix { rows }.normalized()
    }

    /// The distribution actually sampled from degree `degree`: negatives
    /// clipped to zero and the row renormalized, or uniform when nothing
    /// positive is left.
    pub fn sampling_row(&self, degree: usize) -> Row {
        let mut row = *self.row(degree);
        for cell in row.iter_mut() {
            if !cell.is_finite() || *cell < 0.0 {
                *cell = 0.0;
            }
        }
        let total: f64 = row.iter().sum();
        if total <= 0.0 {
            return [1.0 / DEGREES as f64; DEGREES];
        }
        row.map(|cell| cell / total)
    }

    /// Reject matrices with negative or non-finite cells, or an all-zero row.
    pub fn validate(&self) -> Result<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(cell) = row.iter().find(|c| !c.is_finite() || **c < 0.0) {
                return Err(ComposeError::InvalidMatrix(format!(
                    "row {i} has invalid cell {cell}"
                )));
            }
            if row.iter().sum::<f64>() <= 0.0 {
                return Err(ComposeError::InvalidMatrix(format!("row {i} sums to zero")));
            }
        }
        Ok(())
    }
}

fn normalize_row(row: &mut Row) {
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        for cell in row.iter_mut() {
            *cell /= total;
        }
    }
}

/// Which tier of the fallback chain produced a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    GenreOnly,
    Default,
}

/// One authored matrix and the (genre, mood) it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub genre: String,
    pub mood: String,
    pub matrix: TransitionMatrix,
}

/// Authored matrices in lookup order, plus the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionMatrixTable {
    pub entries: Vec<MatrixEntry>,
    pub default: TransitionMatrix,
}

impl TransitionMatrixTable {
    /// Load from a JSON file and validate every matrix.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let table: TransitionMatrixTable = serde_json::from_str(data)?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            entry.matrix.validate().map_err(|e| {
                ComposeError::InvalidMatrix(format!("{} / {}: {e}", entry.genre, entry.mood))
            })?;
        }
        self.default.validate()
    }

    /// Resolve a matrix for (genre, mood) and report which tier matched.
    pub fn resolve_with_tier(&self, genre: &str, mood: &str) -> (&TransitionMatrix, MatchTier) {
        if let Some(entry) = self.entries.iter().find(|e| e.genre == genre && e.mood == mood) {
            return (&entry.matrix, MatchTier::Exact);
        }
        if let Some(entry) = self.entries.iter().find(|e| e.genre == genre) {
            return (&entry.matrix, MatchTier::GenreOnly);
        }
        (&self.default, MatchTier::Default)
    }

    pub fn resolve(&self, genre: &str, mood: &str) -> &TransitionMatrix {
        let (matrix, tier) = self.resolve_with_tier(genre, mood);
        debug!("transition matrix for ({genre}, {mood}): {tier:?}");
        matrix
    }

    /// The authored matrices shipped with the engine.
    pub fn builtin() -> Self {
        let entry = |genre: &str, mood: &str, matrix: TransitionMatrix| MatrixEntry {
            genre: genre.to_string(),
            mood: mood.to_string(),
            matrix,
        };
        TransitionMatrixTable {
            entries: vec![
                entry("Pop", "Happy", POP_HAPPY),
                entry("Pop", "Sad", POP_SAD),
                entry("Classical", "Calm", CLASSICAL_CALM),
                entry("Rock", "Energetic", ROCK_ENERGETIC),
            ],
            default: DEFAULT_MATRIX,
        }
    }
}

impl Default for TransitionMatrixTable {
    fn default() -> Self {
        Self::builtin()
    }
}

// Rows are "from" degrees, columns "to" degrees; index 7 is the octave.

const POP_HAPPY: TransitionMatrix = TransitionMatrix::from_rows([
    [0.10, 0.15, 0.30, 0.00, 0.25, 0.00, 0.00, 0.20],
    [0.20, 0.05, 0.40, 0.10, 0.15, 0.05, 0.05, 0.00],
    [0.15, 0.10, 0.05, 0.25, 0.30, 0.10, 0.05, 0.00],
    [0.05, 0.15, 0.20, 0.05, 0.40, 0.15, 0.00, 0.00],
    [0.30, 0.05, 0.15, 0.10, 0.05, 0.20, 0.05, 0.10],
    [0.10, 0.20, 0.10, 0.15, 0.25, 0.05, 0.15, 0.00],
    [0.40, 0.05, 0.05, 0.10, 0.10, 0.10, 0.05, 0.15],
    [0.50, 0.10, 0.10, 0.05, 0.15, 0.05, 0.05, 0.00],
]);

const POP_SAD: TransitionMatrix = TransitionMatrix::from_rows([
    [0.15, 0.10, 0.05, 0.25, 0.10, 0.20, 0.10, 0.05],
    [0.20, 0.10, 0.15, 0.30, 0.05, 0.15, 0.05, 0.00],
    [0.10, 0.20, 0.10, 0.15, 0.10, 0.25, 0.10, 0.00],
    [0.15, 0.10, 0.20, 0.10, 0.15, 0.20, 0.10, 0.00],
    [0.20, 0.05, 0.10, 0.15, 0.10, 0.25, 0.15, 0.00],
    [0.15, 0.20, 0.10, 0.10, 0.15, 0.10, 0.20, 0.00],
    [0.30, 0.10, 0.05, 0.15, 0.10, 0.20, 0.05, 0.05],
    [0.40, 0.15, 0.10, 0.10, 0.15, 0.05, 0.05, 0.00],
]);

const CLASSICAL_CALM: TransitionMatrix = TransitionMatrix::from_rows([
    [0.15, 0.25, 0.15, 0.10, 0.20, 0.05, 0.05, 0.05],
    [0.20, 0.10, 0.25, 0.15, 0.10, 0.15, 0.05, 0.00],
    [0.15, 0.20, 0.10, 0.25, 0.15, 0.10, 0.05, 0.00],
    [0.10, 0.15, 0.20, 0.05, 0.30, 0.15, 0.05, 0.00],
    [0.25, 0.10, 0.15, 0.10, 0.05, 0.25, 0.05, 0.05],
    [0.15, 0.25, 0.15, 0.10, 0.20, 0.05, 0.10, 0.00],
    [0.30, 0.15, 0.05, 0.10, 0.15, 0.15, 0.05, 0.05],
    [0.35, 0.20, 0.15, 0.05, 0.15, 0.05, 0.05, 0.00],
]);

const ROCK_ENERGETIC: TransitionMatrix = TransitionMatrix::from_rows([
    [0.05, 0.10, 0.15, 0.05, 0.35, 0.05, 0.15, 0.10],
    [0.15, 0.05, 0.20, 0.15, 0.25, 0.10, 0.10, 0.00],
    [0.10, 0.15, 0.05, 0.10, 0.30, 0.15, 0.15, 0.00],
    [0.05, 0.20, 0.25, 0.05, 0.20, 0.15, 0.10, 0.00],
    [0.25, 0.05, 0.15, 0.10, 0.05, 0.15, 0.15, 0.10],
    [0.10, 0.15, 0.20, 0.15, 0.20, 0.05, 0.15, 0.00],
    [0.35, 0.10, 0.10, 0.05, 0.20, 0.10, 0.05, 0.05],
    [0.40, 0.15, 0.10, 0.05, 0.20, 0.05, 0.05, 0.00],
]);

const DEFAULT_MATRIX: TransitionMatrix = TransitionMatrix::from_rows([
    [0.10, 0.15, 0.20, 0.10, 0.20, 0.10, 0.05, 0.10],
    [0.20, 0.05, 0.25, 0.15, 0.15, 0.15, 0.05, 0.00],
    [0.15, 0.15, 0.05, 0.20, 0.25, 0.15, 0.05, 0.00],
    [0.10, 0.15, 0.20, 0.05, 0.30, 0.15, 0.05, 0.00],
    [0.25, 0.05, 0.15, 0.15, 0.05, 0.20, 0.10, 0.05],
    [0.15, 0.20, 0.15, 0.15, 0.20, 0.05, 0.10, 0.00],
    [0.35, 0.10, 0.05, 0.10, 0.15, 0.15, 0.05, 0.05],
    [0.40, 0.15, 0.15, 0.05, 0.15, 0.05, 0.05, 0.00],
]);
