use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::core::panel::Panel;
use crate::core::region::{to_half_open, GenomicRegion};
use crate::core::types::Strand;
use crate::error::Error;

use super::{BedColumns, BedFile, BedRecord, FormattingPolicy};

/// Render a panel under a policy.
///
/// Pure and deterministic: the same panel and policy always give the same
/// file, byte for byte.
///
/// # Errors
///
/// `Error::UnsupportedPolicy` when the policy asks for something a region
/// cannot supply.
pub fn write(panel: &Panel, policy: &FormattingPolicy) -> Result<BedFile, Error> {
    policy.validate()?;
    let records = panel
        .regions
        .iter()
        .map(|region| record_for(region, policy))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        "Rendered {} region(s) as {:?} under policy '{}'",
        records.len(),
        policy.columns(),
        policy.id
    );
    Ok(BedFile {
        policy_id: Some(policy.id.clone()),
        stamp: policy.header.then(|| policy.stamp()),
        records,
    })
}

/// Padded 1-based closed extent of a region
#[must_use]
pub fn padded_extent(region: &GenomicRegion, padding: u64) -> (u64, u64) {
    if padding > 0 && region.is_single_position() {
        (
            region.start.saturating_sub(padding).max(1),
            region.stop.saturating_add(padding),
        )
    } else {
        (region.start, region.stop)
    }
}

fn record_for(region: &GenomicRegion, policy: &FormattingPolicy) -> Result<BedRecord, Error> {
    let columns = policy.columns();
    let name = policy.render_name(region)?;
    let chromosome = policy.render_chromosome(region)?;
    let strand = policy.strand_for(region)?;

    let (start, end) = {
        let (s, e) = padded_extent(region, policy.point_padding);
        to_half_open(s, e)
    };
    let (thick_start, thick_end) = to_half_open(region.start, region.stop);

    let (score, strand) = if columns >= BedColumns::Bed6 {
        (
            Some(policy.score.unwrap_or(0)),
            Some(strand.unwrap_or(Strand::Unknown)),
        )
    } else {
        (None, None)
    };
    let (thick_start, thick_end) = if columns == BedColumns::Bed8 {
        (Some(thick_start), Some(thick_end))
    } else {
        (None, None)
    };

    Ok(BedRecord {
        chromosome,
        start,
        end,
        name: Some(name),
        score,
        strand,
        thick_start,
        thick_end,
    })
}

/// Write a BED file, gzip-compressed when the path ends in `.gz`.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// reader never sees a partial file. Returns the artifact hash.
///
/// # Errors
///
/// I/O errors.
pub fn write_to_path(bed: &BedFile, path: &Path) -> Result<String, Error> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let content = bed.render();
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    if is_gzip_path(path) {
        let mut encoder = GzEncoder::new(&mut tmp, Compression::default());
        encoder.write_all(content.as_bytes())?;
        encoder.finish()?;
    } else {
        tmp.write_all(content.as_bytes())?;
    }
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    let hash = bed.artifact_hash();
    info!("Wrote {} record(s) to {} ({hash})", bed.len(), path.display());
    Ok(hash)
}

pub(crate) fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::panel::Provenance;
    use crate::core::types::SourceKind;
    use tempfile::TempDir;

    fn panel() -> Panel {
        let snp = GenomicRegion::new(
            "TP53_hotspot",
            "chr17",
            7_565_097,
            7_565_097,
            SourceKind::Coordinate,
            "TP53_hotspot",
        )
        .unwrap();
        let span = GenomicRegion::new("NM_007294.4", "chr17", 43_044_295, 43_125_483, SourceKind::Transcript, "NM_007294")
            .unwrap()
            .with_strand(Some(Strand::Reverse));
        Panel {
            regions: vec![snp, span],
            provenance: Provenance::now(),
        }
    }

    #[test]
    fn test_snp_written_half_open() {
        let policy = FormattingPolicy {
            header: false,
            ..FormattingPolicy::default()
        };
        let bed = write(&panel(), &policy).unwrap();
        assert_eq!(
            bed.render(),
            "chr17\t7565096\t7565097\tTP53_hotspot\nchr17\t43044294\t43125483\tNM_007294.4\n"
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let policy = FormattingPolicy::default();
        let mut later = panel();
        later.provenance.created_at = "2030-01-01T00:00:00+00:00".to_string();
        assert_eq!(write(&panel(), &policy).unwrap().render(), write(&later, &policy).unwrap().render());
    }

    #[test]
    fn test_point_padding_records_unpadded_extent() {
        let policy = FormattingPolicy {
            point_padding: 5,
            header: false,
            ..FormattingPolicy::default()
        };
        let bed = write(&panel(), &policy).unwrap();
        let snp = &bed.records[0];
        assert_eq!((snp.start, snp.end), (7_565_091, 7_565_102));
        assert_eq!((snp.thick_start, snp.thick_end), (Some(7_565_096), Some(7_565_097)));
        // Multi-base regions are not padded
        let span = &bed.records[1];
        assert_eq!((span.start, span.end), (43_044_294, 43_125_483));
        assert_eq!(span.strand, Some(Strand::Unknown));
    }

    #[test]
    fn test_padding_clamps_at_first_base() {
        let region = GenomicRegion::new("edge", "chr1", 2, 2, SourceKind::Coordinate, "edge").unwrap();
        assert_eq!(padded_extent(&region, 10), (1, 12));
    }

    #[test]
    fn test_strand_column_without_strand_fails() {
        let policy = FormattingPolicy {
            include_strand: true,
            ..FormattingPolicy::default()
        };
        assert!(matches!(
            write(&panel(), &policy),
            Err(Error::UnsupportedPolicy { .. })
        ));
    }

    #[test]
    fn test_written_file_is_independent_of_panel() {
        let mut source = panel();
        let bed = write(&source, &FormattingPolicy::default()).unwrap();
        let before = bed.render();
        source.regions.clear();
        assert_eq!(bed.render(), before);
    }

    #[test]
    fn test_write_plain_and_gzip() {
        let dir = TempDir::new().unwrap();
        let bed = write(&panel(), &FormattingPolicy::default()).unwrap();

        let plain = dir.path().join("out.bed");
        let hash = write_to_path(&bed, &plain).unwrap();
        assert_eq!(std::fs::read_to_string(&plain).unwrap(), bed.render());

        let gz = dir.path().join("out.bed.gz");
        assert_eq!(write_to_path(&bed, &gz).unwrap(), hash);
        let bytes = std::fs::read(&gz).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }
}
