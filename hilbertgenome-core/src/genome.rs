//! Chromosome sizes of reference genomes.
//!
//! A few common assemblies are built in. Others can be loaded from UCSC style
//! `chrom.sizes` files, i.e. two tab separated columns holding the chromosome
//! name and its length.
use std::{fs::File, io::BufRead, io::BufReader, path::Path};

use indexmap::map::IndexMap;
use log::debug;

use crate::error::{HilbertError, Result};

const HG19: &[(&str, u64)] = &[
    ("chr1", 249250621),
    ("chr2", 243199373),
    ("chr3", 198022430),
    ("chr4", 191154276),
    ("chr5", 180915260),
    ("chr6", 171115067),
    ("chr7", 159138663),
    ("chr8", 146364022),
    ("chr9", 141213431),
    ("chr10", 135534747),
    ("chr11", 135006516),
    ("chr12", 133851895),
    ("chr13", 115169878),
    ("chr14", 107349540),
    ("chr15", 102531392),
    ("chr16", 90354753),
    ("chr17", 81195210),
    ("chr18", 78077248),
    ("chr19", 59128983),
    ("chr20", 63025520),
    ("chr21", 48129895),
    ("chr22", 51304566),
    ("chrX", 155270560),
    ("chrY", 59373566),
    ("chrM", 16571),
];

const HG38: &[(&str, u64)] = &[
    ("chr1", 248956422),
    ("chr2", 242193529),
    ("chr3", 198295559),
    ("chr4", 190214555),
    ("chr5", 181538259),
    ("chr6", 170805979),
    ("chr7", 159345973),
    ("chr8", 145138636),
    ("chr9", 138394717),
    ("chr10", 133797422),
    ("chr11", 135086622),
    ("chr12", 133275309),
    ("chr13", 114364328),
    ("chr14", 107043718),
    ("chr15", 101991189),
    ("chr16", 90338345),
    ("chr17", 83257441),
    ("chr18", 80373285),
    ("chr19", 58617616),
    ("chr20", 64444167),
    ("chr21", 46709983),
    ("chr22", 50818468),
    ("chrX", 156040895),
    ("chrY", 57227415),
    ("chrM", 16569),
];

const MM10: &[(&str, u64)] = &[
    ("chr1", 195471971),
    ("chr2", 182113224),
    ("chr3", 160039680),
    ("chr4", 156508116),
    ("chr5", 151834684),
    ("chr6", 149736546),
    ("chr7", 145441459),
    ("chr8", 129401213),
    ("chr9", 124595110),
    ("chr10", 130694993),
    ("chr11", 122082543),
    ("chr12", 120129022),
    ("chr13", 120421639),
    ("chr14", 124902244),
    ("chr15", 104043685),
    ("chr16", 98207768),
    ("chr17", 94987271),
    ("chr18", 90702639),
    ("chr19", 61431566),
    ("chrX", 171031299),
    ("chrY", 91744698),
    ("chrM", 16299),
];

/// Chromosome names and lengths of a genome, in their original order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChromSizes {
    name: String,
    sizes: IndexMap<String, u64>,
}

impl ChromSizes {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            sizes: IndexMap::new(),
        }
    }

    /// Look up one of the built-in assemblies: hg19, hg38 or mm10.
    pub fn builtin(genome: &str) -> Result<Self> {
        let table = match genome {
            "hg19" | "GRCh37" => HG19,
            "hg38" | "GRCh38" => HG38,
            "mm10" | "GRCm38" => MM10,
            _ => return Err(HilbertError::UnknownGenome(genome.to_string())),
        };
        Ok(table.iter().map(|(chr, len)| (*chr, *len)).collect::<Self>().with_name(genome))
    }

    /// Read a `chrom.sizes` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| HilbertError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file))?.with_name(path.display().to_string()))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut sizes = IndexMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let chrom = fields.next().unwrap_or_default();
            let len = fields
                .next()
                .and_then(|x| x.parse::<u64>().ok())
                .ok_or_else(|| HilbertError::InvalidField {
                    column: 1,
                    value: format!("line {}: {}", i + 1, line),
                })?;
            sizes.insert(chrom.to_string(), len);
        }
        debug!("Read sizes of {} chromosomes", sizes.len());
        Ok(Self {
            name: String::new(),
            sizes,
        })
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, chrom: &str) -> Option<u64> {
        self.sizes.get(chrom).copied()
    }

    /// Length of `chrom`, failing if the chromosome is not part of the genome.
    pub fn length_of(&self, chrom: &str) -> Result<u64> {
        self.get(chrom).ok_or_else(|| HilbertError::UnknownChromosome {
            genome: self.name.clone(),
            chrom: chrom.to_string(),
        })
    }

    pub fn total_size(&self) -> u64 {
        self.sizes.values().sum()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl<S> FromIterator<(S, u64)> for ChromSizes
where
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        ChromSizes {
            name: String::new(),
            sizes: iter.into_iter().map(|(s, l)| (s.into(), l)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ChromSizes {
    type Item = (&'a String, &'a u64);
    type IntoIter = indexmap::map::Iter<'a, String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.sizes.iter()
    }
}

/// Length of `chrom` in the built-in assembly `genome`.
pub fn chrom_length(genome: &str, chrom: &str) -> Result<u64> {
    ChromSizes::builtin(genome)?.length_of(chrom)
}
