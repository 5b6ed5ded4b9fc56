use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hilbertgenome_core::{
    interval::filter_chrom, open_intervals, ChromSizes, IncrementMode, MatrixBuilder,
};
use itertools::Itertools;
use log::info;

#[derive(Parser)]
#[command(name = "hilbert-matrix")]
#[command(about = "Map the intervals of one chromosome onto a Hilbert curve matrix.", long_about = None)]
struct Args {
    /// Interval file (BED-like, optionally gzip or zstd compressed).
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Name of a built-in genome assembly (hg19, hg38, mm10).
    #[arg(short = 'g', long = "genome", default_value = "hg19")]
    genome: String,

    /// Read chromosome sizes from this file instead of a built-in genome.
    #[arg(short = 's', long = "chrom-sizes", value_name = "FILE")]
    chrom_sizes: Option<PathBuf>,

    /// Chromosome to map.
    #[arg(short = 'c', long = "chrom")]
    chrom: String,

    /// Width and height of the matrix. Must be a power of two.
    #[arg(short = 'd', long = "dim", value_name = "N", default_value_t = 256)]
    dim: usize,

    /// 0-based column holding the value added for each interval. Intervals
    /// are counted when omitted.
    #[arg(short = 'i', long = "incr-column", value_name = "N")]
    incr_column: Option<usize>,

    /// Write empty cells as NaN.
    #[arg(short = 'm', long = "mask-zeros")]
    mask_zeros: bool,

    /// Increase verbosity (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let chrom_sizes = match &args.chrom_sizes {
        Some(path) => ChromSizes::from_file(path)?,
        None => ChromSizes::builtin(&args.genome)?,
    };
    let mut builder = MatrixBuilder::from_genome(&chrom_sizes, &args.chrom, args.dim)?;
    let records = open_intervals(&args.input)?.into_records();
    builder
        .try_build(filter_chrom(records, &args.chrom), IncrementMode::from(args.incr_column))
        .with_context(|| format!("failed to build matrix from {}", args.input.display()))?;
    if args.mask_zeros {
        let n = builder.mask_zeros()?;
        info!("{} cells have no data", n);
    }

    let mut writer = BufWriter::new(io::stdout().lock());
    for row in builder.matrix().rows() {
        writeln!(writer, "{}", row.iter().join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}
