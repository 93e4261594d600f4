//! Round-trip validation of an emitted BED file.
//!
//! The file is re-parsed from disk, any point padding is inverted with the
//! recorded expansion rule, and the result is compared with the regions the
//! original inputs resolve to. A failing comparison is a [`ValidationReport`]
//! with `passed == false`, not an error: errors are reserved for files or
//! policies that cannot be compared at all.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::bedfiles::writer::padded_extent;
use crate::bedfiles::{BedFile, FormattingPolicy};
use crate::core::chromosome::normalize_chromosome;
use crate::core::panel::Panel;
use crate::core::region::{from_half_open, GenomicRegion, Locus};
use crate::error::Error;
use crate::panels::consolidate;
use crate::resolve::source::ReferenceRegion;
use crate::resolve::{InputRecords, Resolvers};

/// Where an expected region came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingOrigin {
    /// Resolved from the original inputs
    Input,
    /// Listed by the external reference panel
    ExternalReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingRegion {
    pub region_id: String,
    pub origin: MissingOrigin,
}

/// A region present on both sides at different loci (`None` = absent on that side)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub region_id: String,
    pub expected: Option<Locus>,
    pub actual: Option<Locus>,
}

/// A difference between a recorded panel and what its inputs resolve to today
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drift {
    pub region_id: String,
    pub recorded: Option<Locus>,
    pub current: Option<Locus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub missing: Vec<MissingRegion>,
    /// Names of emitted records nothing expected
    pub extra: Vec<String>,
    pub mismatched: Vec<Mismatch>,
    /// Extras inside padded expected regions, accepted by policy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerated: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drift: Vec<Drift>,
    /// Number of expected regions
    pub expected: usize,
    /// Number of records in the file
    pub emitted: usize,
    pub passed: bool,
}

impl ValidationReport {
    fn finish(mut self) -> Self {
        self.passed = self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty();
        self
    }

    /// Turn a failing report into `Error::ValidationFailure`
    ///
    /// # Errors
    ///
    /// When the report did not pass.
    pub fn into_result(self) -> Result<Self, Error> {
        if self.passed {
            Ok(self)
        } else {
            Err(Error::ValidationFailure {
                missing: self.missing.len(),
                extra: self.extra.len(),
                mismatched: self.mismatched.len(),
            })
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let locus = |l: &Option<Locus>| l.as_ref().map_or("absent".to_string(), ToString::to_string);

        writeln!(f, "Validation: {}", if self.passed { "PASSED" } else { "FAILED" })?;
        writeln!(f, "  Expected regions: {}", self.expected)?;
        writeln!(f, "  Emitted records:  {}", self.emitted)?;
        for m in &self.missing {
            let origin = match m.origin {
                MissingOrigin::Input => "input",
                MissingOrigin::ExternalReference => "external-reference",
            };
            writeln!(f, "  missing     {} ({origin})", m.region_id)?;
        }
        for name in &self.extra {
            writeln!(f, "  extra       {name}")?;
        }
        for m in &self.mismatched {
            writeln!(f, "  mismatched  {}: expected {}, found {}", m.region_id, locus(&m.expected), locus(&m.actual))?;
        }
        for name in &self.tolerated {
            writeln!(f, "  tolerated   {name}")?;
        }
        for d in &self.drift {
            writeln!(f, "  drift       {}: recorded {}, now {}", d.region_id, locus(&d.recorded), locus(&d.current))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Report drift without counting it as a mismatch
    pub allow_source_drift: bool,
}

/// An emitted record after padding inversion
#[derive(Debug, Clone)]
struct Emitted {
    name: String,
    locus: Option<Locus>,
    /// `chromStart`/`chromEnd` as written, padding included
    outer: Option<Locus>,
}

/// A region the file should contain
#[derive(Debug, Clone)]
struct Expected {
    region_id: String,
    name: String,
    locus: Locus,
    padded: Locus,
}

/// Compares BED files with the regions they should contain
pub struct Validator<'a> {
    policy: &'a FormattingPolicy,
    options: ValidationOptions,
    reference: Option<Vec<ReferenceRegion>>,
}

impl<'a> Validator<'a> {
    pub fn new(policy: &'a FormattingPolicy) -> Self {
        Self {
            policy,
            options: ValidationOptions::default(),
            reference: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Also check coverage against an external reference panel
    #[must_use]
    pub fn with_reference(mut self, reference: Vec<ReferenceRegion>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Validate against the original inputs, re-resolving them.
    ///
    /// # Errors
    ///
    /// Resolution or consolidation errors, or any error from [`Validator::validate_panel`].
    pub fn validate_inputs(
        &self,
        bed: &BedFile,
        inputs: &InputRecords,
        resolvers: &Resolvers<'_>,
    ) -> Result<ValidationReport, Error> {
        let expected = consolidate(resolvers.resolve(inputs)?)?;
        self.validate_panel(bed, &expected)
    }

    /// Validate against a recorded panel, re-resolving its inputs to detect drift.
    ///
    /// Drift is always reported. Unless `allow_source_drift` is set every
    /// drifted region is also a mismatch.
    ///
    /// # Errors
    ///
    /// Resolution or consolidation errors, or any error from [`Validator::validate_panel`].
    pub fn validate_recorded_panel(
        &self,
        bed: &BedFile,
        panel: &Panel,
        resolvers: &Resolvers<'_>,
    ) -> Result<ValidationReport, Error> {
        let current = consolidate(resolvers.resolve(&InputRecords::from_panel(panel))?)?;
        let drift = drift_between(panel, &current);
        if !drift.is_empty() {
            warn!("{} region(s) drifted since the panel was recorded", drift.len());
        }

        let mut report = self.validate_panel(bed, panel)?;
        if !self.options.allow_source_drift {
            report.mismatched.extend(drift.iter().map(|d| Mismatch {
                region_id: d.region_id.clone(),
                expected: d.current.clone(),
                actual: d.recorded.clone(),
            }));
        }
        report.drift = drift;
        Ok(report.finish())
    }

    /// Validate a file against the panel it should represent.
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedPolicy` when the file header records a different
    /// policy or the policy cannot render an expected region.
    pub fn validate_panel(&self, bed: &BedFile, panel: &Panel) -> Result<ValidationReport, Error> {
        self.check_stamp(bed)?;

        let expected = panel
            .regions
            .iter()
            .map(|r| self.expected(r))
            .collect::<Result<Vec<_>, _>>()?;
        let emitted: Vec<Emitted> = bed.records.iter().map(|r| self.emitted(r)).collect();

        let mut report = ValidationReport {
            expected: expected.len(),
            emitted: emitted.len(),
            ..ValidationReport::default()
        };
        let mut used = vec![false; emitted.len()];
        let mut unmatched: Vec<&Expected> = Vec::new();

        // Exact matches first so that a renamed or moved record cannot steal another's match
        for exp in &expected {
            let hit = emitted
                .iter()
                .enumerate()
                .position(|(i, e)| !used[i] && e.name == exp.name && e.locus.as_ref() == Some(&exp.locus));
            match hit {
                Some(i) => {
                    used[i] = true;
                    // The thick columns alone do not pin the record: its outer
                    // extent must be exactly the padded region
                    if emitted[i].outer.as_ref() != Some(&exp.padded) {
                        report.mismatched.push(Mismatch {
                            region_id: exp.region_id.clone(),
                            expected: Some(exp.padded.clone()),
                            actual: emitted[i].outer.clone(),
                        });
                    }
                }
                None => unmatched.push(exp),
            }
        }

        for exp in unmatched {
            let hit = emitted
                .iter()
                .enumerate()
                .position(|(i, e)| !used[i] && e.name == exp.name);
            match hit {
                Some(i) => {
                    used[i] = true;
                    report.mismatched.push(Mismatch {
                        region_id: exp.region_id.clone(),
                        expected: Some(exp.locus.clone()),
                        actual: emitted[i].locus.clone(),
                    });
                }
                None => report.missing.push(MissingRegion {
                    region_id: exp.region_id.clone(),
                    origin: MissingOrigin::Input,
                }),
            }
        }

        for (e, _) in emitted.iter().zip(&used).filter(|(_, used)| !**used) {
            let inside_padding = self.policy.allow_padding_extras
                && e.locus
                    .as_ref()
                    .is_some_and(|l| expected.iter().any(|exp| exp.padded.contains(l)));
            if inside_padding {
                report.tolerated.push(e.name.clone());
            } else {
                report.extra.push(e.name.clone());
            }
        }

        if let Some(reference) = &self.reference {
            self.check_reference(reference, &emitted, &mut report);
        }

        let report = report.finish();
        info!(
            "Validation {}: {} missing, {} extra, {} mismatched",
            if report.passed { "passed" } else { "failed" },
            report.missing.len(),
            report.extra.len(),
            report.mismatched.len()
        );
        Ok(report)
    }

    fn check_stamp(&self, bed: &BedFile) -> Result<(), Error> {
        let Some(stamp) = &bed.stamp else {
            debug!("File has no header; assuming policy '{}'", self.policy.id);
            return Ok(());
        };
        let digest = self.policy.digest();
        if stamp.policy_digest != digest {
            return Err(Error::UnsupportedPolicy {
                policy_id: self.policy.id.clone(),
                reason: format!(
                    "file was written with policy '{}' (digest {}), supplied policy has digest {digest}",
                    stamp.policy_id, stamp.policy_digest
                ),
            });
        }
        Ok(())
    }

    fn expected(&self, region: &GenomicRegion) -> Result<Expected, Error> {
        let (start, stop) = padded_extent(region, self.policy.point_padding);
        Ok(Expected {
            region_id: region.region_id.clone(),
            name: self.policy.render_name(region)?,
            locus: region.locus(),
            padded: Locus::new(region.chromosome.clone(), start, stop),
        })
    }

    fn emitted(&self, record: &crate::bedfiles::BedRecord) -> Emitted {
        let chromosome = normalize_chromosome(&record.chromosome);
        let to_locus = |(start, end): (u64, u64)| {
            chromosome
                .clone()
                .zip(from_half_open(start, end))
                .map(|(chromosome, (start, stop))| Locus::new(chromosome, start, stop))
        };
        let outer = to_locus((record.start, record.end));
        let locus = if self.policy.point_padding > 0 {
            to_locus(record.unpadded_extent())
        } else {
            outer.clone()
        };
        Emitted {
            name: record.name.clone().unwrap_or_else(|| {
                format!("{}:{}-{}", record.chromosome, record.start, record.end)
            }),
            locus,
            outer,
        }
    }

    fn check_reference(
        &self,
        reference: &[ReferenceRegion],
        emitted: &[Emitted],
        report: &mut ValidationReport,
    ) {
        let coverage: Vec<&Locus> = emitted.iter().filter_map(|e| e.locus.as_ref()).collect();
        let mut checked = 0;

        for region in reference {
            let Some(chromosome) = normalize_chromosome(&region.chromosome) else {
                debug!("Skipping reference region {} on {}", region.identifier, region.chromosome);
                continue;
            };
            let locus = Locus::new(chromosome, region.start, region.stop);
            if !coverage.iter().any(|c| c.overlaps(&locus)) {
                continue;
            }
            checked += 1;
            if !coverage.iter().any(|c| c.contains(&locus)) {
                report.missing.push(MissingRegion {
                    region_id: region.identifier.clone(),
                    origin: MissingOrigin::ExternalReference,
                });
            }
        }
        debug!("{checked} reference region(s) overlap the emitted coverage");
    }
}

/// Regions whose locus changed, appeared, or vanished between two panels
fn drift_between(recorded: &Panel, current: &Panel) -> Vec<Drift> {
    let mut drift = Vec::new();
    for region in &recorded.regions {
        match current.get(&region.region_id) {
            Some(now) if now.locus() == region.locus() => {}
            now => drift.push(Drift {
                region_id: region.region_id.clone(),
                recorded: Some(region.locus()),
                current: now.map(GenomicRegion::locus),
            }),
        }
    }
    for region in &current.regions {
        if recorded.get(&region.region_id).is_none() {
            drift.push(Drift {
                region_id: region.region_id.clone(),
                recorded: None,
                current: Some(region.locus()),
            });
        }
    }
    drift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedfiles::reader::parse_bed;
    use crate::bedfiles::writer::write;
    use crate::core::panel::Provenance;
    use crate::core::types::SourceKind;

    fn panel(regions: Vec<GenomicRegion>) -> Panel {
        Panel {
            regions,
            provenance: Provenance::now(),
        }
    }

    fn coordinate(id: &str, chr: &str, start: u64, stop: u64) -> GenomicRegion {
        GenomicRegion::new(id, chr, start, stop, SourceKind::Coordinate, id).unwrap()
    }

    fn round_trip(panel: &Panel, policy: &FormattingPolicy) -> BedFile {
        parse_bed(&write(panel, policy).unwrap().render()).unwrap()
    }

    #[test]
    fn test_round_trip_passes() {
        let p = panel(vec![
            coordinate("TP53_hotspot", "chr17", 7_565_097, 7_565_097),
            coordinate("exon", "chrX", 100, 250),
        ]);
        for policy in [
            FormattingPolicy::default(),
            FormattingPolicy {
                point_padding: 10,
                score: Some(1000),
                ..FormattingPolicy::default()
            },
            FormattingPolicy {
                chromosome_style: crate::core::chromosome::NamingConvention::Ncbi,
                name_template: "{region_id}_{chromosome}".to_string(),
                header: false,
                ..FormattingPolicy::default()
            },
        ] {
            let report = Validator::new(&policy).validate_panel(&round_trip(&p, &policy), &p).unwrap();
            assert!(report.passed, "{policy:?}: {report}");
            assert_eq!(report.expected, 2);
        }
    }

    #[test]
    fn test_dropped_line_is_missing() {
        let p = panel(vec![coordinate("TP53_hotspot", "chr17", 7_565_097, 7_565_097)]);
        let policy = FormattingPolicy::default();
        let bed = parse_bed("").unwrap();
        let report = Validator::new(&policy).validate_panel(&bed, &p).unwrap();
        assert!(!report.passed);
        assert_eq!(
            report.missing,
            vec![MissingRegion {
                region_id: "TP53_hotspot".to_string(),
                origin: MissingOrigin::Input
            }]
        );
        assert!(matches!(report.into_result(), Err(Error::ValidationFailure { missing: 1, .. })));
    }

    #[test]
    fn test_off_by_one_is_mismatched() {
        let p = panel(vec![coordinate("TP53_hotspot", "chr17", 7_565_097, 7_565_097)]);
        let policy = FormattingPolicy {
            header: false,
            ..FormattingPolicy::default()
        };
        // Written as if the 1-based position were 0-based
        let bed = parse_bed("chr17\t7565097\t7565098\tTP53_hotspot\n").unwrap();
        let report = Validator::new(&policy).validate_panel(&bed, &p).unwrap();
        assert!(!report.passed);
        assert_eq!(report.mismatched.len(), 1);
        assert_eq!(report.mismatched[0].actual, Some(Locus::new("chr17", 7_565_098, 7_565_098)));
    }

    #[test]
    fn test_extra_and_tolerated() {
        let p = panel(vec![coordinate("snp", "chr1", 1_000, 1_000)]);
        let text = "chr1\t989\t1010\tsnp\t0\t.\t999\t1000\nchr1\t995\t996\tneighbour\t0\t.\t995\t996\nchr2\t1\t2\tstray\t0\t.\t1\t2\n";

        let strict = FormattingPolicy {
            point_padding: 10,
            header: false,
            ..FormattingPolicy::default()
        };
        let report = Validator::new(&strict).validate_panel(&parse_bed(text).unwrap(), &p).unwrap();
        assert_eq!(report.extra, vec!["neighbour", "stray"]);

        let lenient = FormattingPolicy {
            allow_padding_extras: true,
            ..strict
        };
        let report = Validator::new(&lenient).validate_panel(&parse_bed(text).unwrap(), &p).unwrap();
        assert_eq!(report.tolerated, vec!["neighbour"]);
        assert_eq!(report.extra, vec!["stray"]);
        assert!(report.mismatched.is_empty());
        assert!(!report.passed);
    }

    #[test]
    fn test_widened_padding_is_mismatched() {
        let p = panel(vec![coordinate("snp", "chr1", 1_000, 1_000)]);
        let policy = FormattingPolicy {
            point_padding: 10,
            header: false,
            ..FormattingPolicy::default()
        };
        let validator = Validator::new(&policy);

        let faithful = parse_bed("chr1\t989\t1010\tsnp\t0\t.\t999\t1000\n").unwrap();
        assert!(validator.validate_panel(&faithful, &p).unwrap().passed);

        // Thick columns untouched, outer extent stretched to a megabase
        let widened = parse_bed("chr1\t0\t1000000\tsnp\t0\t.\t999\t1000\n").unwrap();
        let report = validator.validate_panel(&widened, &p).unwrap();
        assert!(!report.passed);
        assert_eq!(
            report.mismatched,
            vec![Mismatch {
                region_id: "snp".to_string(),
                expected: Some(Locus::new("chr1", 990, 1_010)),
                actual: Some(Locus::new("chr1", 1, 1_000_000)),
            }]
        );
    }

    #[test]
    fn test_thick_extent_must_cover_unpadded_region() {
        let p = panel(vec![coordinate("exon", "chrX", 100, 250)]);
        let policy = FormattingPolicy {
            point_padding: 5,
            header: false,
            ..FormattingPolicy::default()
        };
        let validator = Validator::new(&policy);

        // A multi-base region is never padded, so outer and thick must agree
        let shifted_outer = parse_bed("chrX\t90\t260\texon\t0\t.\t99\t250\n").unwrap();
        let report = validator.validate_panel(&shifted_outer, &p).unwrap();
        assert_eq!(report.mismatched.len(), 1);
        assert_eq!(report.mismatched[0].actual, Some(Locus::new("chrX", 91, 260)));

        let shifted_thick = parse_bed("chrX\t99\t250\texon\t0\t.\t100\t250\n").unwrap();
        let report = validator.validate_panel(&shifted_thick, &p).unwrap();
        assert_eq!(report.mismatched.len(), 1);
        assert_eq!(report.mismatched[0].actual, Some(Locus::new("chrX", 101, 250)));
        assert!(!report.passed);
    }

    #[test]
    fn test_padded_point_without_thick_columns_is_mismatched() {
        let p = panel(vec![coordinate("snp", "chr1", 1_000, 1_000)]);
        let policy = FormattingPolicy {
            point_padding: 10,
            header: false,
            ..FormattingPolicy::default()
        };
        let bed = parse_bed("chr1\t999\t1000\tsnp\n").unwrap();
        let report = Validator::new(&policy).validate_panel(&bed, &p).unwrap();
        assert_eq!(report.mismatched[0].expected, Some(Locus::new("chr1", 990, 1_010)));
        assert!(!report.passed);
    }

    #[test]
    fn test_policy_digest_must_match() {
        let p = panel(vec![coordinate("a", "chr1", 1, 5)]);
        let written_with = FormattingPolicy {
            point_padding: 2,
            ..FormattingPolicy::default()
        };
        let bed = round_trip(&p, &written_with);
        assert!(matches!(
            Validator::new(&FormattingPolicy::default()).validate_panel(&bed, &p),
            Err(Error::UnsupportedPolicy { .. })
        ));
    }

    #[test]
    fn test_reference_panel_coverage() {
        let p = panel(vec![coordinate("BRCA1_region", "chr17", 43_044_295, 43_125_483)]);
        let policy = FormattingPolicy::default();
        let bed = round_trip(&p, &policy);
        let reference = vec![
            ReferenceRegion {
                identifier: "BRCA1".to_string(),
                chromosome: "17".to_string(),
                start: 43_044_295,
                stop: 43_125_483,
            },
            ReferenceRegion {
                identifier: "NBR2".to_string(),
                chromosome: "17".to_string(),
                start: 43_125_000,
                stop: 43_150_000,
            },
            ReferenceRegion {
                identifier: "TP53".to_string(),
                chromosome: "17".to_string(),
                start: 7_661_779,
                stop: 7_687_538,
            },
        ];

        let report = Validator::new(&policy)
            .with_reference(reference)
            .validate_panel(&bed, &p)
            .unwrap();
        assert_eq!(
            report.missing,
            vec![MissingRegion {
                region_id: "NBR2".to_string(),
                origin: MissingOrigin::ExternalReference
            }]
        );
        assert!(!report.passed);
    }

    #[test]
    fn test_drift_between_panels() {
        let recorded = panel(vec![coordinate("a", "chr1", 1, 5), coordinate("b", "chr1", 10, 20)]);
        let current = panel(vec![coordinate("a", "chr1", 1, 6), coordinate("c", "chr1", 30, 40)]);
        let drift = drift_between(&recorded, &current);
        let ids: Vec<&str> = drift.iter().map(|d| d.region_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(drift[1].current, None);
        assert_eq!(drift[2].recorded, None);
    }
}
