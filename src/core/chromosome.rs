use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Chromosome naming convention used when writing files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// UCSC style: chr1, chr2, ..., chrX, chrY, chrM
    #[default]
    Ucsc,
    /// NCBI/Ensembl style: 1, 2, ..., X, Y, MT
    Ncbi,
}

/// A chromosome in canonical (UCSC) form.
///
/// Only the primary assembly and the mitochondrion are representable; patch,
/// alt and unplaced contigs do not belong in a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chromosome {
    Autosome(u8),
    X,
    Y,
    M,
}

impl Chromosome {
    /// Canonicalize a chromosome name.
    ///
    /// Accepts `chr17`, `17`, `CHR17`, `MT`, `chrM` and RefSeq chromosome
    /// accessions such as `NC_000017.11` or `NC_012920.1`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if let Some(accession) = trimmed.strip_prefix("NC_") {
            return Self::from_refseq_accession(accession);
        }

        let lower = trimmed.to_lowercase();
        let bare = lower.strip_prefix("chr").unwrap_or(&lower);
        match bare {
            "x" => Some(Self::X),
            "y" => Some(Self::Y),
            "m" | "mt" => Some(Self::M),
            digits => {
                // Reject leading zeros and signs so "chr01" never aliases "chr1"
                if digits.is_empty()
                    || digits.starts_with('0')
                    || !digits.chars().all(|c| c.is_ascii_digit())
                {
                    return None;
                }
                match digits.parse::<u8>() {
                    Ok(n) if (1..=22).contains(&n) => Some(Self::Autosome(n)),
                    _ => None,
                }
            }
        }
    }

    fn from_refseq_accession(accession: &str) -> Option<Self> {
        let number = accession.split('.').next()?;
        if number == "012920" {
            return Some(Self::M);
        }
        let n: u32 = number.strip_prefix("0000")?.parse().ok()?;
        match n {
            1..=22 => u8::try_from(n).ok().map(Self::Autosome),
            23 => Some(Self::X),
            24 => Some(Self::Y),
            _ => None,
        }
    }

    /// Karyotypic rank: 1..22, X, Y, M
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Autosome(n) => *n,
            Self::X => 23,
            Self::Y => 24,
            Self::M => 25,
        }
    }

    /// Render the chromosome in the given naming convention
    #[must_use]
    pub fn render(&self, convention: NamingConvention) -> String {
        match (convention, self) {
            (NamingConvention::Ucsc, Self::Autosome(n)) => format!("chr{n}"),
            (NamingConvention::Ucsc, Self::X) => "chrX".to_string(),
            (NamingConvention::Ucsc, Self::Y) => "chrY".to_string(),
            (NamingConvention::Ucsc, Self::M) => "chrM".to_string(),
            (NamingConvention::Ncbi, Self::Autosome(n)) => n.to_string(),
            (NamingConvention::Ncbi, Self::X) => "X".to_string(),
            (NamingConvention::Ncbi, Self::Y) => "Y".to_string(),
            (NamingConvention::Ncbi, Self::M) => "MT".to_string(),
        }
    }
}

impl std::fmt::Display for Chromosome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(NamingConvention::Ucsc))
    }
}

impl Ord for Chromosome {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Chromosome {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Normalize a chromosome name to canonical UCSC form
#[must_use]
pub fn normalize_chromosome(name: &str) -> Option<String> {
    Chromosome::parse(name).map(|c| c.to_string())
}

/// Compare two canonical chromosome names karyotypically.
///
/// Names that fail to parse sort after every canonical chromosome, by name.
#[must_use]
pub fn compare_chromosomes(a: &str, b: &str) -> Ordering {
    match (Chromosome::parse(a), Chromosome::parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_common_spellings() {
        assert_eq!(normalize_chromosome("chr17").as_deref(), Some("chr17"));
        assert_eq!(normalize_chromosome("17").as_deref(), Some("chr17"));
        assert_eq!(normalize_chromosome("CHR17").as_deref(), Some("chr17"));
        assert_eq!(normalize_chromosome("x").as_deref(), Some("chrX"));
        assert_eq!(normalize_chromosome("MT").as_deref(), Some("chrM"));
        assert_eq!(normalize_chromosome("chrM").as_deref(), Some("chrM"));
    }

    #[test]
    fn test_normalize_refseq_accessions() {
        assert_eq!(
            normalize_chromosome("NC_000017.11").as_deref(),
            Some("chr17")
        );
        assert_eq!(normalize_chromosome("NC_000023.11").as_deref(), Some("chrX"));
        assert_eq!(normalize_chromosome("NC_000024.10").as_deref(), Some("chrY"));
        assert_eq!(normalize_chromosome("NC_012920.1").as_deref(), Some("chrM"));
        assert_eq!(normalize_chromosome("NC_000025.1"), None);
    }

    #[test]
    fn test_reject_non_canonical() {
        assert_eq!(normalize_chromosome("chr23"), None);
        assert_eq!(normalize_chromosome("chr0"), None);
        assert_eq!(normalize_chromosome("chr01"), None);
        assert_eq!(normalize_chromosome("chr1_KI270706v1_random"), None);
        assert_eq!(normalize_chromosome("HG1_PATCH"), None);
        assert_eq!(normalize_chromosome(""), None);
    }

    #[test]
    fn test_karyotypic_order() {
        let mut names = vec!["chrM", "chr10", "chrX", "chr2", "chr1", "chrY"];
        names.sort_by(|a, b| compare_chromosomes(a, b));
        assert_eq!(names, vec!["chr1", "chr2", "chr10", "chrX", "chrY", "chrM"]);
    }

    #[test]
    fn test_render_conventions() {
        let chr = Chromosome::parse("chrM").unwrap();
        assert_eq!(chr.render(NamingConvention::Ncbi), "MT");
        assert_eq!(chr.render(NamingConvention::Ucsc), "chrM");
        let chr = Chromosome::parse("7").unwrap();
        assert_eq!(chr.render(NamingConvention::Ncbi), "7");
    }
}
