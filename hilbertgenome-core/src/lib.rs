pub mod error;
pub mod genome;
pub mod hilbert;
pub mod interval;
pub mod matrix;

pub use error::{HilbertError, Result};
pub use genome::{chrom_length, ChromSizes};
pub use hilbert::{coord_to_distance, distance_to_coord, rotate};
pub use interval::{open_intervals, Interval, IntervalFormat, IntervalRecord};
pub use matrix::{BuildState, IncrementMode, MatrixBuilder};
