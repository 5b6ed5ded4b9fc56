use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::interval::ParseError;

pub type Result<T> = std::result::Result<T, HilbertError>;

/// Errors raised while mapping intervals onto a Hilbert matrix.
///
/// None of these are retryable: every failure aborts the current build.
#[derive(Debug, Error)]
pub enum HilbertError {
    #[error("matrix dimension must be a power of two and at least 2, got {0}")]
    InvalidDimension(u64),

    #[error("distance {d} is out of range for a {n}x{n} Hilbert curve")]
    DistanceOutOfRange { n: u64, d: u64 },

    #[error("coordinate ({x}, {y}) is out of range for a {n}x{n} Hilbert curve")]
    CoordOutOfRange { n: u64, x: u64, y: u64 },

    #[error("chromosome length {chrom_len} is smaller than the number of cells ({cells})")]
    DegenerateNormFactor { chrom_len: u64, cells: u64 },

    #[error("unknown genome: {0}")]
    UnknownGenome(String),

    #[error("chromosome '{chrom}' not found in {genome}")]
    UnknownChromosome { genome: String, chrom: String },

    #[error("not implemented: {0}")]
    Unsupported(String),

    #[error("interval end ({end}) is smaller than its start ({start})")]
    InvalidInterval { start: u64, end: u64 },

    #[error("interval has no field at column {0}")]
    MissingField(usize),

    #[error("field '{value}' at column {column} is not a number")]
    InvalidField { column: usize, value: String },

    #[error("the matrix has already been built")]
    AlreadyBuilt,

    #[error("the matrix has not been built yet")]
    NotBuilt,

    #[error("failed to parse record at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("failed to read {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HilbertError {
    /// Violations of the indexer or builder preconditions.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            HilbertError::InvalidDimension(_)
                | HilbertError::DistanceOutOfRange { .. }
                | HilbertError::CoordOutOfRange { .. }
                | HilbertError::DegenerateNormFactor { .. }
        )
    }

    /// Unknown genome or chromosome names.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HilbertError::UnknownGenome(_) | HilbertError::UnknownChromosome { .. }
        )
    }
}
