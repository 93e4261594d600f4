use serde::{Deserialize, Serialize};

/// Identifier namespace of a transcript accession
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierNamespace {
    /// NCBI RefSeq: NM_, NR_, XM_, XR_
    #[value(name = "refseq")]
    RefSeq,
    /// Ensembl: ENST
    Ensembl,
}

impl IdentifierNamespace {
    /// Infer the namespace from the format of an accession.
    ///
    /// Returns `None` for anything that is not a transcript accession in
    /// either namespace (e.g. protein accessions such as `NP_000050`).
    #[must_use]
    pub fn from_format(identifier: &str) -> Option<Self> {
        if identifier.starts_with("ENST") {
            Some(Self::Ensembl)
        } else if ["NM_", "NR_", "XM_", "XR_"]
            .iter()
            .any(|prefix| identifier.starts_with(prefix))
        {
            Some(Self::RefSeq)
        } else {
            None
        }
    }
}

impl std::fmt::Display for IdentifierNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RefSeq => write!(f, "RefSeq"),
            Self::Ensembl => write!(f, "Ensembl"),
        }
    }
}

/// A stable identifier whose namespace has been settled at the resolver boundary.
///
/// The annotation service hands back a bare accession whose namespace depends on
/// the query. It is tagged exactly once, when it enters the crate, and never
/// re-inspected downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StableId {
    pub namespace: IdentifierNamespace,
    /// Accession without version (e.g. `NM_007294`)
    pub accession: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl StableId {
    pub fn new(namespace: IdentifierNamespace, accession: impl Into<String>) -> Self {
        Self {
            namespace,
            accession: accession.into(),
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: Option<u32>) -> Self {
        self.version = version;
        self
    }
}

impl std::fmt::Display for StableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}.{v}", self.accession),
            None => write!(f, "{}", self.accession),
        }
    }
}

/// Which resolver produced a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Transcript,
    Coordinate,
    Gene,
    Snp,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transcript => write!(f, "transcript"),
            Self::Coordinate => write!(f, "coordinate"),
            Self::Gene => write!(f, "gene"),
            Self::Snp => write!(f, "snp"),
        }
    }
}

/// Strand of a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
    #[serde(rename = ".")]
    Unknown,
}

impl Strand {
    /// Parse a strand from BED/CSV notation or the numeric form used by annotation services
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "+" | "1" | "+1" => Some(Self::Forward),
            "-" | "-1" => Some(Self::Reverse),
            "." | "0" => Some(Self::Unknown),
            _ => None,
        }
    }

    #[must_use]
    pub fn from_i8(value: i8) -> Self {
        match value {
            1 => Self::Forward,
            -1 => Self::Reverse,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "+",
            Self::Reverse => "-",
            Self::Unknown => ".",
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// MANE designation of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManeType {
    #[serde(rename = "MANE Select")]
    Select,
    #[serde(rename = "MANE Plus Clinical")]
    PlusClinical,
}

impl ManeType {
    /// Parse the label used by the transcript archive (case-insensitive)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mane select" => Some(Self::Select),
            "mane plus clinical" => Some(Self::PlusClinical),
            _ => None,
        }
    }
}

impl std::fmt::Display for ManeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Select => write!(f, "MANE Select"),
            Self::PlusClinical => write!(f, "MANE Plus Clinical"),
        }
    }
}

/// Assembly version (e.g., `GRCh37`, `GRCh38`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum Assembly {
    #[serde(rename = "GRCh37")]
    #[value(name = "GRCh37", alias = "grch37")]
    Grch37,
    #[default]
    #[serde(rename = "GRCh38")]
    #[value(name = "GRCh38", alias = "grch38")]
    Grch38,
}

impl Assembly {
    /// Match an assembly label such as `GRCh38` or `GRCh38.p14`
    #[must_use]
    pub fn matches_label(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        match self {
            Self::Grch37 => label.starts_with("grch37") || label == "hg19",
            Self::Grch38 => label.starts_with("grch38") || label == "hg38",
        }
    }
}

impl std::fmt::Display for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grch37 => write!(f, "GRCh37"),
            Self::Grch38 => write!(f, "GRCh38"),
        }
    }
}
