use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::chromosome::{Chromosome, NamingConvention};
use crate::core::region::GenomicRegion;
use crate::core::types::Strand;
use crate::error::Error;
use crate::utils::validation::md5_hex;

use super::PolicyStamp;

/// Largest score allowed by the BED format
pub const MAX_SCORE: u16 = 1000;

/// Column layout of an emitted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BedColumns {
    /// chrom, start, end, name
    Bed4,
    /// BED4 + score, strand
    Bed6,
    /// BED6 + thickStart, thickEnd (unpadded extent of padded regions)
    Bed8,
}

impl BedColumns {
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Bed4 => 4,
            Self::Bed6 => 6,
            Self::Bed8 => 8,
        }
    }
}

/// Fields a name template can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    RegionId,
    Chromosome,
    Start,
    Stop,
    Strand,
    SourceKind,
    SourceIdentifier,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "region_id" => Some(Self::RegionId),
            "chromosome" => Some(Self::Chromosome),
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "strand" => Some(Self::Strand),
            "source_kind" => Some(Self::SourceKind),
            "source_identifier" => Some(Self::SourceIdentifier),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// How a panel is rendered into a BED file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FormattingPolicy {
    /// Identifier recorded in the file header and the audit log
    pub id: String,

    /// Template for the name column
    pub name_template: String,

    pub chromosome_style: NamingConvention,

    /// Score column value; requesting a score switches to BED6
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u16>,

    /// Strand used for regions that carry none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_strand: Option<Strand>,

    /// Emit the strand column (BED6)
    pub include_strand: bool,

    /// Bases added on each side of single-position regions (BED8 when non-zero)
    pub point_padding: u64,

    /// Let the validator tolerate extras that lie inside padded expected regions
    pub allow_padding_extras: bool,

    /// Write the `#bedmaker` header line
    pub header: bool,
}

impl Default for FormattingPolicy {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name_template: "{region_id}".to_string(),
            chromosome_style: NamingConvention::Ucsc,
            score: None,
            default_strand: None,
            include_strand: false,
            point_padding: 0,
            allow_padding_extras: false,
            header: true,
        }
    }
}

impl FormattingPolicy {
    /// Parse a policy from JSON.
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedPolicy` for unknown fields, bad values, or a policy
    /// that fails [`FormattingPolicy::validate`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let policy: Self = serde_json::from_str(json).map_err(|e| Error::UnsupportedPolicy {
            policy_id: "<unparsed>".to_string(),
            reason: e.to_string(),
        })?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy file
    ///
    /// # Errors
    ///
    /// I/O errors, or any error from [`FormattingPolicy::from_json`].
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|e| match e {
            Error::UnsupportedPolicy { policy_id, reason } if policy_id == "<unparsed>" => {
                Error::UnsupportedPolicy {
                    policy_id: path.display().to_string(),
                    reason,
                }
            }
            other => other,
        })
    }

    /// Check everything that can be checked without a panel.
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedPolicy` describing the first problem.
    pub fn validate(&self) -> Result<(), Error> {
        if self.id.is_empty() || self.id.chars().any(char::is_whitespace) {
            return Err(self.unsupported("policy id must be non-empty and contain no whitespace"));
        }
        if let Some(score) = self.score {
            if score > MAX_SCORE {
                return Err(self.unsupported(format!("score {score} exceeds {MAX_SCORE}")));
            }
        }
        self.segments()?;
        Ok(())
    }

    /// Stable digest of every field, recorded in the header
    #[must_use]
    pub fn digest(&self) -> String {
        let canonical = format!(
            "id={}\nname_template={}\nchromosome_style={:?}\nscore={:?}\ndefault_strand={:?}\ninclude_strand={}\npoint_padding={}\nallow_padding_extras={}\nheader={}",
            self.id,
            self.name_template,
            self.chromosome_style,
            self.score,
            self.default_strand.map(|s| s.as_str()),
            self.include_strand,
            self.point_padding,
            self.allow_padding_extras,
            self.header,
        );
        md5_hex(canonical.as_bytes())
    }

    #[must_use]
    pub fn stamp(&self) -> PolicyStamp {
        PolicyStamp {
            policy_id: self.id.clone(),
            policy_digest: self.digest(),
            point_padding: self.point_padding,
        }
    }

    #[must_use]
    pub fn columns(&self) -> BedColumns {
        if self.point_padding > 0 {
            BedColumns::Bed8
        } else if self.score.is_some() || self.include_strand {
            BedColumns::Bed6
        } else {
            BedColumns::Bed4
        }
    }

    /// Render a canonical chromosome name in the policy's naming convention
    ///
    /// # Errors
    ///
    /// `Error::InvalidCoordinate` if the name is not a canonical chromosome.
    pub fn render_chromosome(&self, region: &GenomicRegion) -> Result<String, Error> {
        Chromosome::parse(&region.chromosome)
            .map(|c| c.render(self.chromosome_style))
            .ok_or_else(|| Error::InvalidCoordinate {
                region_id: region.region_id.clone(),
                reason: format!("unrecognised chromosome '{}'", region.chromosome),
            })
    }

    /// Strand for the strand column, `None` when the column is not requested
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedPolicy` when the strand is requested but the region
    /// has none and no default is configured.
    pub fn strand_for(&self, region: &GenomicRegion) -> Result<Option<Strand>, Error> {
        if self.include_strand {
            self.region_strand(region).map(Some)
        } else {
            Ok(None)
        }
    }

    fn region_strand(&self, region: &GenomicRegion) -> Result<Strand, Error> {
        region.strand.or(self.default_strand).ok_or_else(|| {
            self.unsupported(format!(
                "region '{}' has no strand and no default_strand is set",
                region.region_id
            ))
        })
    }

    /// Render the name column for a region.
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedPolicy` when the template references a field the
    /// region cannot supply or the result is not a valid BED name.
    pub fn render_name(&self, region: &GenomicRegion) -> Result<String, Error> {
        let mut name = String::new();
        for segment in self.segments()? {
            match segment {
                Segment::Literal(text) => name.push_str(&text),
                Segment::Field(field) => match field {
                    Placeholder::RegionId => name.push_str(&region.region_id),
                    Placeholder::Chromosome => name.push_str(&self.render_chromosome(region)?),
                    Placeholder::Start => name.push_str(&region.start.to_string()),
                    Placeholder::Stop => name.push_str(&region.stop.to_string()),
                    Placeholder::Strand => name.push_str(self.region_strand(region)?.as_str()),
                    Placeholder::SourceKind => name.push_str(&region.source_kind.to_string()),
                    Placeholder::SourceIdentifier => name.push_str(&region.source_identifier),
                },
            }
        }

        if name.is_empty() || name.contains(['\t', '\n', '\r']) {
            return Err(self.unsupported(format!(
                "template renders an invalid name {name:?} for region '{}'",
                region.region_id
            )));
        }
        Ok(name)
    }

    fn segments(&self) -> Result<Vec<Segment>, Error> {
        if self.name_template.is_empty() {
            return Err(self.unsupported("name_template is empty"));
        }

        let mut segments = Vec::new();
        let mut rest = self.name_template.as_str();
        while !rest.is_empty() {
            match rest.find(['{', '}']) {
                None => {
                    segments.push(Segment::Literal(rest.to_string()));
                    break;
                }
                Some(pos) if rest[pos..].starts_with('}') => {
                    return Err(self.unsupported("unmatched '}' in name_template"));
                }
                Some(pos) => {
                    if pos > 0 {
                        segments.push(Segment::Literal(rest[..pos].to_string()));
                    }
                    let after = &rest[pos + 1..];
                    let close = after
                        .find('}')
                        .ok_or_else(|| self.unsupported("unterminated '{' in name_template"))?;
                    let field = &after[..close];
                    let placeholder = Placeholder::parse(field).ok_or_else(|| {
                        self.unsupported(format!("unknown placeholder '{{{field}}}' in name_template"))
                    })?;
                    segments.push(Segment::Field(placeholder));
                    rest = &after[close + 1..];
                }
            }
        }
        Ok(segments)
    }

    fn unsupported(&self, reason: impl Into<String>) -> Error {
        Error::UnsupportedPolicy {
            policy_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SourceKind;

    fn region(strand: Option<Strand>) -> GenomicRegion {
        GenomicRegion::new("NM_007294.4", "chr17", 43_044_295, 43_125_483, SourceKind::Gene, "BRCA1")
            .unwrap()
            .with_strand(strand)
    }

    #[test]
    fn test_default_policy() {
        let policy = FormattingPolicy::default();
        policy.validate().unwrap();
        assert_eq!(policy.columns(), BedColumns::Bed4);
        assert_eq!(policy.render_name(&region(None)).unwrap(), "NM_007294.4");
    }

    #[test]
    fn test_template_rendering() {
        let policy = FormattingPolicy {
            name_template: "{source_identifier}|{region_id}|{chromosome}:{start}-{stop}({strand})".to_string(),
            chromosome_style: NamingConvention::Ncbi,
            ..FormattingPolicy::default()
        };
        assert_eq!(
            policy.render_name(&region(Some(Strand::Reverse))).unwrap(),
            "BRCA1|NM_007294.4|17:43044295-43125483(-)"
        );
    }

    #[test]
    fn test_strand_requires_a_value() {
        let policy = FormattingPolicy {
            include_strand: true,
            ..FormattingPolicy::default()
        };
        assert_eq!(policy.columns(), BedColumns::Bed6);
        assert!(matches!(
            policy.strand_for(&region(None)),
            Err(Error::UnsupportedPolicy { .. })
        ));
        assert_eq!(policy.strand_for(&region(Some(Strand::Forward))).unwrap(), Some(Strand::Forward));

        let with_default = FormattingPolicy {
            default_strand: Some(Strand::Unknown),
            ..policy
        };
        assert_eq!(with_default.strand_for(&region(None)).unwrap(), Some(Strand::Unknown));
    }

    #[test]
    fn test_invalid_policies() {
        for template in ["", "{gene}", "{region_id", "x}"] {
            let policy = FormattingPolicy {
                name_template: template.to_string(),
                ..FormattingPolicy::default()
            };
            assert!(
                matches!(policy.validate(), Err(Error::UnsupportedPolicy { .. })),
                "{template}"
            );
        }
        let policy = FormattingPolicy {
            score: Some(1001),
            ..FormattingPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = FormattingPolicy::from_json(r#"{"id": "p1", "colour": "red"}"#).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPolicy { .. }));
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let policy = FormattingPolicy::from_json(r#"{"id": "snp-padded", "point_padding": 5}"#).unwrap();
        assert_eq!(policy.name_template, "{region_id}");
        assert_eq!(policy.columns(), BedColumns::Bed8);
        assert!(policy.header);
    }

    #[test]
    fn test_digest_tracks_every_field() {
        let base = FormattingPolicy::default();
        assert_eq!(base.digest(), FormattingPolicy::default().digest());
        let padded = FormattingPolicy {
            point_padding: 1,
            ..FormattingPolicy::default()
        };
        assert_ne!(base.digest(), padded.digest());
    }
}
