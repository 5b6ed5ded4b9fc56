//! Interval records consumed by the matrix builder.
//!
//! The builder only needs the start and end of each interval, plus one numeric
//! column when intervals are weighted. Any type implementing [`Interval`] can
//! be fed to it; [`IntervalRecord`] and [`Reader`] cover tab-delimited text
//! files such as BED or bedGraph.
use std::{
    fmt::{self, Write},
    fs::File,
    io::{self, BufRead, BufReader},
    num,
    path::Path,
    str::FromStr,
};

use bed_utils::bed::{BEDLike, GenomicRange};
use thiserror::Error;

use crate::error::{HilbertError, Result};

const DELIMITER: char = '\t';

/// A genomic interval with 0-based, end-exclusive coordinates.
pub trait Interval {
    /// Return the 0-based start position of the interval.
    fn start(&self) -> u64;

    /// Return the end position of the interval.
    fn end(&self) -> u64;

    /// Return the raw field at a 0-based column of the record. Column 0 is
    /// the chromosome, 1 the start and 2 the end.
    fn field(&self, _column: usize) -> Option<&str> {
        None
    }
}

impl Interval for GenomicRange {
    fn start(&self) -> u64 {
        BEDLike::start(self)
    }

    fn end(&self) -> u64 {
        BEDLike::end(self)
    }
}

impl<T: Interval + ?Sized> Interval for &T {
    fn start(&self) -> u64 {
        (**self).start()
    }

    fn end(&self) -> u64 {
        (**self).end()
    }

    fn field(&self, column: usize) -> Option<&str> {
        (**self).field(column)
    }
}

/// A tab-delimited interval record. All columns are kept so that any of them
/// can be used as the increment value.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalRecord {
    chrom: String,
    start: u64,
    end: u64,
    fields: Vec<String>,
}

impl IntervalRecord {
    pub fn new<C>(chrom: C, start: u64, end: u64) -> Self
    where
        C: Into<String>,
    {
        let chrom = chrom.into();
        let fields = vec![chrom.clone(), start.to_string(), end.to_string()];
        Self { chrom, start, end, fields }
    }

    /// Append an extra column, e.g. a score.
    pub fn with_field<S: Into<String>>(mut self, value: S) -> Self {
        self.fields.push(value.into());
        self
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }
}

impl Interval for IntervalRecord {
    fn start(&self) -> u64 {
        self.start
    }

    fn end(&self) -> u64 {
        self.end
    }

    fn field(&self, column: usize) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

impl fmt::Display for IntervalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_char(DELIMITER)?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}

impl FromStr for IntervalRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let fields: Vec<String> = s.split(DELIMITER).map(str::to_string).collect();
        let mut iter = fields.iter().map(String::as_str);
        let chrom = iter
            .next()
            .filter(|x| !x.is_empty())
            .ok_or(ParseError::MissingReferenceSequenceName)?
            .to_string();
        let start = iter
            .next()
            .ok_or(ParseError::MissingStartPosition)
            .and_then(|x| x.parse().map_err(ParseError::InvalidStartPosition))?;
        let end = iter
            .next()
            .ok_or(ParseError::MissingEndPosition)
            .and_then(|x| x.parse().map_err(ParseError::InvalidEndPosition))?;
        Ok(Self { chrom, start, end, fields })
    }
}

/// An error returned when a raw interval record fails to parse.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseError {
    #[error("missing reference sequence name")]
    MissingReferenceSequenceName,
    #[error("missing start position")]
    MissingStartPosition,
    #[error("invalid start position: {0}")]
    InvalidStartPosition(num::ParseIntError),
    #[error("missing end position")]
    MissingEndPosition,
    #[error("invalid end position: {0}")]
    InvalidEndPosition(num::ParseIntError),
}

/// Input formats recognized from the file name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IntervalFormat {
    Plain,
    Gzip,
    Zstd,
    /// Alignments. These would need to be converted to coverage first.
    Bam,
}

impl IntervalFormat {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|x| x.to_str()) {
            Some("bam") => IntervalFormat::Bam,
            Some("gz") | Some("bgz") => IntervalFormat::Gzip,
            Some("zst") => IntervalFormat::Zstd,
            _ => IntervalFormat::Plain,
        }
    }
}

/// Open an interval file, possibly compressed. Supports gzip and zstd.
/// BAM files are rejected.
pub fn open_intervals<P: AsRef<Path>>(path: P) -> Result<Reader<Box<dyn BufRead>>> {
    let path = path.as_ref();
    let open = || {
        File::open(path).map_err(|source| HilbertError::Open {
            path: path.to_path_buf(),
            source,
        })
    };
    let inner: Box<dyn BufRead> = match IntervalFormat::from_path(path) {
        IntervalFormat::Bam => {
            return Err(HilbertError::Unsupported(format!(
                "BAM input requires coverage conversion: {}",
                path.display()
            )))
        }
        IntervalFormat::Gzip => Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(
            open()?,
        ))),
        IntervalFormat::Zstd => Box::new(BufReader::new(zstd::stream::read::Decoder::new(
            open()?,
        )?)),
        IntervalFormat::Plain => Box::new(BufReader::new(open()?)),
    };
    Ok(Reader::new(inner))
}

/// An iterator over records of an interval reader.
///
/// This is created by calling [`Reader::into_records`].
pub struct Records<R> {
    inner: Reader<R>,
    buf: String,
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<IntervalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_record(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    if is_header(&self.buf) {
                        continue;
                    }
                    let line = self.inner.line;
                    return Some(
                        self.buf
                            .parse()
                            .map_err(|source| HilbertError::Parse { line, source }),
                    );
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// A tab-delimited interval reader.
pub struct Reader<R> {
    inner: R,
    line: usize,
}

impl<R: BufRead> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, line: 0 }
    }

    /// Reads a single raw record. Returns the number of bytes read.
    pub fn read_record(&mut self, buf: &mut String) -> io::Result<usize> {
        let n = read_line(&mut self.inner, buf)?;
        if n > 0 {
            self.line += 1;
        }
        Ok(n)
    }

    /// Returns an iterator over records starting from the current stream
    /// position. Blank lines, comments and track/browser lines are skipped.
    pub fn into_records(self) -> Records<R> {
        Records {
            inner: self,
            buf: String::new(),
        }
    }
}

fn is_header(line: &str) -> bool {
    line.trim().is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

fn read_line<R>(reader: &mut R, buf: &mut String) -> io::Result<usize>
where
    R: BufRead,
{
    const LINE_FEED: char = '\n';
    const CARRIAGE_RETURN: char = '\r';

    let n = reader.read_line(buf)?;
    if buf.ends_with(LINE_FEED) {
        buf.pop();
        if buf.ends_with(CARRIAGE_RETURN) {
            buf.pop();
        }
    }
    Ok(n)
}

/// Keep only the records on `chrom`. Errors are passed through.
pub fn filter_chrom<'a, I>(
    records: I,
    chrom: &'a str,
) -> impl Iterator<Item = Result<IntervalRecord>> + 'a
where
    I: IntoIterator<Item = Result<IntervalRecord>>,
    I::IntoIter: 'a,
{
    records.into_iter().filter(move |x| match x {
        Ok(rec) => rec.chrom() == chrom,
        Err(_) => true,
    })
}
