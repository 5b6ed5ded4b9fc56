//! # Hilbert matrix builder
//!
//! A chromosome of length `L` is laid out along an order-`n` Hilbert curve.
//! Each of the `n * n` cells covers `L / (n * n)` bases (the normalization
//! factor), so a genomic position `p` falls into the cell at distance
//! `p / factor`. Intervals add their increment to every cell they span, which
//! keeps long intervals from being under-counted.
//!
//! A builder fills exactly one matrix. It moves through
//! `Created -> Building -> Built -> Masked`, and a second call to
//! [`MatrixBuilder::build`] is rejected.
use indicatif::{style::ProgressStyle, ProgressBar, ProgressDrawTarget, ProgressIterator};
use log::{debug, info, warn};
use ndarray::Array2;

use crate::error::{HilbertError, Result};
use crate::genome::ChromSizes;
use crate::hilbert::{check_dimension, d2xy};
use crate::interval::Interval;

/// How much an interval adds to each cell it spans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncrementMode {
    /// Add one per interval.
    #[default]
    Count,
    /// Add the numeric value found at this 0-based column of the record.
    Field(usize),
}

impl IncrementMode {
    fn increment<B: Interval>(&self, interval: &B) -> Result<f64> {
        match self {
            IncrementMode::Count => Ok(1.0),
            IncrementMode::Field(column) => {
                let value = interval
                    .field(*column)
                    .ok_or(HilbertError::MissingField(*column))?;
                value
                    .trim()
                    .parse()
                    .map_err(|_| HilbertError::InvalidField {
                        column: *column,
                        value: value.to_string(),
                    })
            }
        }
    }
}

impl From<Option<usize>> for IncrementMode {
    fn from(column: Option<usize>) -> Self {
        column.map_or(IncrementMode::Count, IncrementMode::Field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Created,
    Building,
    Built,
    Masked,
}

#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    dim: usize,
    cells: u64,
    norm_factor: u64,
    matrix: Array2<f64>,
    state: BuildState,
}

impl MatrixBuilder {
    /// Create a builder for an `dim x dim` matrix covering a chromosome of
    /// length `chrom_len`.
    pub fn new(chrom_len: u64, dim: usize) -> Result<Self> {
        let cells = check_dimension(dim as u64)?;
        // The dense grid must be addressable in memory.
        cells
            .checked_mul(std::mem::size_of::<f64>() as u64)
            .filter(|bytes| *bytes <= isize::MAX as u64)
            .ok_or(HilbertError::InvalidDimension(dim as u64))?;
        let norm_factor = chrom_len / cells;
        if norm_factor == 0 {
            return Err(HilbertError::DegenerateNormFactor { chrom_len, cells });
        }
        info!(
            "Creating {}x{} Hilbert matrix with {} bases per cell",
            dim, dim, norm_factor
        );
        Ok(Self {
            dim,
            cells,
            norm_factor,
            matrix: Array2::zeros((dim, dim)),
            state: BuildState::Created,
        })
    }

    /// Create a builder for `chrom` of the given genome.
    pub fn from_genome(chrom_sizes: &ChromSizes, chrom: &str, dim: usize) -> Result<Self> {
        Self::new(chrom_sizes.length_of(chrom)?, dim)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn cells(&self) -> u64 {
        self.cells
    }

    pub fn norm_factor(&self) -> u64 {
        self.norm_factor
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// The grid. It is only complete once [`MatrixBuilder::state`] is
    /// `Built` or `Masked`; after a failed build it holds the partial sums
    /// accumulated before the error.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Consume the builder and return the grid. See [`MatrixBuilder::matrix`]
    /// for when it is complete.
    pub fn into_matrix(self) -> Array2<f64> {
        self.matrix
    }

    /// Map a genomic position to its distance along the curve. Positions past
    /// the last cell, which occur at the end of the chromosome because of
    /// rounding, are clamped to the last cell.
    pub fn position_to_distance(&self, pos: u64) -> u64 {
        let d = pos / self.norm_factor;
        if d >= self.cells {
            debug!("Clamping position {} to the last cell", pos);
            self.cells - 1
        } else {
            d
        }
    }

    /// Grid coordinates of the cell containing a genomic position.
    pub fn position_to_coord(&self, pos: u64) -> (usize, usize) {
        let (x, y) = d2xy(self.dim as u64, self.position_to_distance(pos));
        (x as usize, y as usize)
    }

    /// Populate the matrix from a sequence of intervals.
    pub fn build<I, B>(&mut self, intervals: I, mode: IncrementMode) -> Result<&Array2<f64>>
    where
        I: IntoIterator<Item = B>,
        B: Interval,
    {
        self.try_build(intervals.into_iter().map(Ok::<B, HilbertError>), mode)
    }

    /// Populate the matrix from a fallible sequence of intervals, such as the
    /// records of a [`crate::interval::Reader`]. The first error aborts the
    /// build.
    pub fn try_build<I, B, E>(&mut self, intervals: I, mode: IncrementMode) -> Result<&Array2<f64>>
    where
        I: IntoIterator<Item = std::result::Result<B, E>>,
        B: Interval,
        HilbertError: From<E>,
    {
        if self.state != BuildState::Created {
            return Err(HilbertError::AlreadyBuilt);
        }
        self.state = BuildState::Building;

        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(1))
            .with_style(
                ProgressStyle::with_template(
                    "{spinner} Processed {human_pos} intervals in {elapsed} ({per_sec}) ...",
                )
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
        let mut num_intervals = 0u64;
        let mut num_increments = 0u64;
        for interval in intervals.into_iter().progress_with(spinner) {
            let interval = interval?;
            num_increments += self.add(&interval, mode)?;
            num_intervals += 1;
        }

        if num_intervals == 0 {
            warn!("No intervals were found. The matrix is empty.");
        }
        info!(
            "Mapped {} intervals to {} cell increments",
            num_intervals, num_increments
        );
        self.state = BuildState::Built;
        Ok(&self.matrix)
    }

    // Add one interval to every cell in its normalized span. Returns the
    // number of cells touched.
    fn add<B: Interval>(&mut self, interval: &B, mode: IncrementMode) -> Result<u64> {
        let (start, end) = (interval.start(), interval.end());
        if end < start {
            return Err(HilbertError::InvalidInterval { start, end });
        }
        let value = mode.increment(interval)?;
        let start_dist = self.position_to_distance(start);
        let end_dist = self.position_to_distance(end);
        let n = self.dim as u64;
        for dist in start_dist..=end_dist {
            let (x, y) = d2xy(n, dist);
            self.matrix[[x as usize, y as usize]] += value;
        }
        Ok(end_dist - start_dist + 1)
    }

    /// Replace cells that are exactly zero with NaN so that empty cells can
    /// be told apart when plotting. Returns the number of masked cells.
    ///
    /// Must be called after [`MatrixBuilder::build`]. Masking twice is a
    /// no-op.
    pub fn mask_zeros(&mut self) -> Result<usize> {
        match self.state {
            BuildState::Created | BuildState::Building => Err(HilbertError::NotBuilt),
            BuildState::Masked => Ok(0),
            BuildState::Built => {
                let mut n = 0;
                self.matrix.iter_mut().filter(|x| **x == 0.0).for_each(|x| {
                    *x = f64::NAN;
                    n += 1;
                });
                debug!("Masked {} empty cells", n);
                self.state = BuildState::Masked;
                Ok(n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hilbert::distance_to_coord;
    use crate::interval::IntervalRecord;
    use bed_utils::bed::GenomicRange;
    use ndarray::array;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn record(start: u64, end: u64) -> IntervalRecord {
        IntervalRecord::new("chr1", start, end)
    }

    #[test]
    fn test_single_cell() {
        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        assert_eq!(builder.norm_factor(), 1);
        assert_eq!(builder.cells(), 4);
        let mat = builder.build([record(0, 0)], IncrementMode::Count).unwrap();
        assert_eq!(mat, &array![[1.0, 0.0], [0.0, 0.0]]);
        assert_eq!(builder.state(), BuildState::Built);
    }

    #[test]
    fn test_full_span() {
        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        let mat = builder.build([record(0, 3)], IncrementMode::Count).unwrap();
        assert_eq!(mat, &Array2::from_elem((2, 2), 1.0));
    }

    #[test]
    fn test_normalization() {
        let mut builder = MatrixBuilder::new(64, 4).unwrap();
        assert_eq!(builder.norm_factor(), 4);
        builder.build([record(4, 7)], IncrementMode::Count).unwrap();
        let (x, y) = distance_to_coord(4, 1).unwrap();
        let mut expected = Array2::zeros((4, 4));
        expected[[x as usize, y as usize]] = 1.0;
        assert_eq!(builder.into_matrix(), expected);
    }

    #[test]
    fn test_mask_zeros() {
        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        // Distance 1 is (0, 1) and distance 2 is (1, 1).
        builder
            .build(
                [record(1, 1).with_field("1"), record(2, 2).with_field("2")],
                IncrementMode::Field(3),
            )
            .unwrap();
        assert_eq!(builder.matrix(), &array![[0.0, 1.0], [0.0, 2.0]]);

        assert_eq!(builder.mask_zeros().unwrap(), 2);
        assert_eq!(builder.state(), BuildState::Masked);
        let mat = builder.matrix();
        assert!(mat[[0, 0]].is_nan());
        assert!(mat[[1, 0]].is_nan());
        assert_eq!(mat[[0, 1]], 1.0);
        assert_eq!(mat[[1, 1]], 2.0);

        let before = mat.clone();
        assert_eq!(builder.mask_zeros().unwrap(), 0);
        builder
            .matrix()
            .iter()
            .zip(before.iter())
            .for_each(|(a, b)| assert!(a == b || (a.is_nan() && b.is_nan())));
    }

    #[test]
    fn test_weighted() {
        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        let intervals = [
            record(0, 1).with_field("a").with_field("2.5"),
            record(1, 1).with_field("b").with_field("-1"),
        ];
        let mat = builder.build(&intervals, IncrementMode::Field(4)).unwrap();
        assert_eq!(mat, &array![[2.5, 1.5], [0.0, 0.0]]);
    }

    #[test]
    fn test_weighted_errors() {
        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        let err = builder
            .build([record(0, 1)], IncrementMode::Field(3))
            .unwrap_err();
        assert!(matches!(err, HilbertError::MissingField(3)));

        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        let err = builder
            .build([record(0, 1).with_field("x")], IncrementMode::Field(3))
            .unwrap_err();
        assert!(matches!(err, HilbertError::InvalidField { column: 3, .. }));
        assert_eq!(builder.state(), BuildState::Building);
        assert!(builder.mask_zeros().is_err());
    }

    #[test]
    fn test_clamp() {
        // 10 bases over 4 cells: factor 2, positions 8 and 9 fall past the
        // last cell.
        let mut builder = MatrixBuilder::new(10, 2).unwrap();
        assert_eq!(builder.position_to_distance(9), 3);
        assert_eq!(builder.position_to_distance(100), 3);
        builder.build([record(6, 10)], IncrementMode::Count).unwrap();
        assert_eq!(builder.matrix().sum(), 1.0);
        assert_eq!(builder.matrix()[[1, 0]], 1.0);
    }

    #[test]
    fn test_coverage_sum() {
        let chrom_len = 1_000_000;
        let mut rng = StdRng::seed_from_u64(7);
        let mut builder = MatrixBuilder::new(chrom_len, 16).unwrap();
        let intervals: Vec<_> = (0..500)
            .map(|_| {
                let start = rng.gen_range(0..chrom_len);
                let end = (start + rng.gen_range(0..20_000)).min(chrom_len);
                GenomicRange::new("chr1", start, end)
            })
            .collect();
        let expected: u64 = intervals
            .iter()
            .map(|x| {
                builder.position_to_distance(x.end()) - builder.position_to_distance(x.start()) + 1
            })
            .sum();
        builder.build(&intervals, IncrementMode::Count).unwrap();
        assert_eq!(builder.matrix().sum(), expected as f64);
        assert!(builder.matrix().iter().all(|x| *x >= 0.0));
    }

    #[test]
    fn test_position_to_coord() {
        let builder = MatrixBuilder::new(64, 4).unwrap();
        assert_eq!(builder.position_to_coord(0), (0, 0));
        assert_eq!(builder.position_to_coord(5), (1, 0));
        assert_eq!(builder.position_to_coord(63), (3, 0));
    }

    #[test]
    fn test_oversized_dimension() {
        let err = MatrixBuilder::new(u64::MAX, 1 << 31).unwrap_err();
        assert!(matches!(err, HilbertError::InvalidDimension(n) if n == 1 << 31));
        assert!(err.is_precondition());
        assert!(matches!(
            MatrixBuilder::new(u64::MAX, 1 << 30),
            Err(HilbertError::InvalidDimension(_))
        ));
    }

    #[test]
    fn test_failed_build_is_partial() {
        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        let intervals = [record(0, 0), record(2, 1), record(3, 3)];
        assert!(builder.build(&intervals, IncrementMode::Count).is_err());
        assert_eq!(builder.state(), BuildState::Building);
        assert_eq!(builder.matrix().sum(), 1.0);
        assert!(matches!(
            builder.build(&intervals, IncrementMode::Count),
            Err(HilbertError::AlreadyBuilt)
        ));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            MatrixBuilder::new(3, 2),
            Err(HilbertError::DegenerateNormFactor { chrom_len: 3, cells: 4 })
        ));
        assert!(MatrixBuilder::new(1000, 3).unwrap_err().is_precondition());

        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        assert!(matches!(builder.mask_zeros(), Err(HilbertError::NotBuilt)));
        assert!(matches!(
            builder.build([record(3, 1)], IncrementMode::Count),
            Err(HilbertError::InvalidInterval { start: 3, end: 1 })
        ));

        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        builder.build(Vec::<IntervalRecord>::new(), IncrementMode::Count).unwrap();
        assert_eq!(builder.matrix().sum(), 0.0);
        assert!(matches!(
            builder.build([record(0, 0)], IncrementMode::Count),
            Err(HilbertError::AlreadyBuilt)
        ));
        builder.mask_zeros().unwrap();
        assert!(matches!(
            builder.build([record(0, 0)], IncrementMode::Count),
            Err(HilbertError::AlreadyBuilt)
        ));
    }

    #[test]
    fn test_try_build() {
        let data = b"chr1\t0\t0\nchr1\t3\t3\nchr1\tx\t3\n" as &[u8];
        let mut builder = MatrixBuilder::new(4, 2).unwrap();
        let err = builder
            .try_build(crate::interval::Reader::new(data).into_records(), IncrementMode::Count)
            .unwrap_err();
        assert!(matches!(err, HilbertError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_from_file() {
        use crate::interval::{filter_chrom, open_intervals};
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".bedgraph").tempfile().unwrap();
        write!(file, "track type=bedGraph\nchr1\t0\t4\t0.5\nchr2\t0\t64\t9\nchr1\t60\t63\t2\n").unwrap();

        let sizes: ChromSizes = vec![("chr1", 64), ("chr2", 64)].into_iter().collect();
        let mut builder = MatrixBuilder::from_genome(&sizes, "chr1", 4).unwrap();
        let records = open_intervals(file.path()).unwrap().into_records();
        builder
            .try_build(filter_chrom(records, "chr1"), IncrementMode::Field(3))
            .unwrap();
        // Distances 0 and 1 get 0.5, distance 15 gets 2.
        let mat = builder.matrix();
        assert_eq!(mat[[0, 0]], 0.5);
        assert_eq!(mat[[1, 0]], 0.5);
        assert_eq!(mat[[3, 0]], 2.0);
        assert_eq!(mat.sum(), 3.0);
    }

    #[test]
    fn test_increment_mode() {
        assert_eq!(IncrementMode::from(None), IncrementMode::Count);
        assert_eq!(IncrementMode::from(Some(4)), IncrementMode::Field(4));
        assert_eq!(IncrementMode::default(), IncrementMode::Count);
    }
}
