use anyhow::Result;
use hilbertgenome_core::{
    coord_to_distance, distance_to_coord, interval::filter_chrom, open_intervals, ChromSizes,
    IncrementMode, MatrixBuilder,
};
use numpy::{IntoPyArray, PyArray2};
use pyo3::{prelude::*, PyResult, Python};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Map the intervals of one chromosome onto a Hilbert curve matrix.
///
/// Parameters
/// ----------
/// file
///     BED-like interval file, optionally gzip or zstd compressed.
/// genome
///     Name of a built-in assembly (hg19, hg38, mm10). Ignored when
///     `chrom_sizes` is given.
/// chrom
///     Chromosome to map.
/// matrix_dim
///     Width and height of the matrix, a power of two.
/// incr_column
///     0-based column whose value is added for each interval. Intervals are
///     counted when None.
/// mask_zeros
///     Replace empty cells with NaN.
/// chrom_sizes
///     Path to a chrom.sizes file.
#[pyfunction]
#[pyo3(signature = (file, genome, chrom, matrix_dim, incr_column=None, mask_zeros=false, chrom_sizes=None))]
fn hilbert_matrix<'py>(
    py: Python<'py>,
    file: &str,
    genome: &str,
    chrom: &str,
    matrix_dim: usize,
    incr_column: Option<usize>,
    mask_zeros: bool,
    chrom_sizes: Option<&str>,
) -> Result<Bound<'py, PyArray2<f64>>> {
    let chrom_sizes = match chrom_sizes {
        Some(path) => ChromSizes::from_file(path)?,
        None => ChromSizes::builtin(genome)?,
    };
    let mut builder = MatrixBuilder::from_genome(&chrom_sizes, chrom, matrix_dim)?;
    let records = open_intervals(file)?.into_records();
    builder.try_build(filter_chrom(records, chrom), IncrementMode::from(incr_column))?;
    if mask_zeros {
        builder.mask_zeros()?;
    }
    Ok(builder.into_matrix().into_pyarray_bound(py))
}

/// Convert a distance along an order-`n` Hilbert curve to `(x, y)`.
#[pyfunction]
fn d2xy(n: u64, d: u64) -> Result<(u64, u64)> {
    Ok(distance_to_coord(n, d)?)
}

/// Convert `(x, y)` to its distance along an order-`n` Hilbert curve.
#[pyfunction]
fn xy2d(n: u64, x: u64, y: u64) -> Result<u64> {
    Ok(coord_to_distance(n, x, y)?)
}

#[pymodule]
fn _hilbertgenome(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(hilbert_matrix, m)?)?;
    m.add_function(wrap_pyfunction!(d2xy, m)?)?;
    m.add_function(wrap_pyfunction!(xy2d, m)?)?;
    Ok(())
}
