//! Explicit coordinate input: format validation only, no external lookup.
//!
//! CSV columns are `chromosome,start,stop,region_id[,strand]` in 1-based
//! closed coordinates. A header row and `#` comment lines are skipped.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::chromosome::normalize_chromosome;
use crate::core::region::{derived_region_id, GenomicRegion};
use crate::core::types::{SourceKind, Strand};
use crate::error::Error;
use crate::utils::validation::check_record_limit;

/// Header names recognised in the first column
const HEADER_NAMES: &[&str] = &["chromosome", "chrom", "chr", "contig"];

/// One user-supplied coordinate row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateInput {
    pub chromosome: String,

    /// Signed so that negative input is reported rather than rejected by the parser
    pub start: i64,
    pub stop: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strand: Option<Strand>,
}

impl CoordinateInput {
    pub fn new(chromosome: impl Into<String>, start: i64, stop: i64, region_id: Option<&str>) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            stop,
            region_id: region_id.map(str::to_string),
            strand: None,
        }
    }

    /// The input that reproduces a coordinate region exactly
    #[must_use]
    pub fn from_region(region: &GenomicRegion) -> Self {
        Self {
            chromosome: region.chromosome.clone(),
            start: i64::try_from(region.start).unwrap_or(i64::MAX),
            stop: i64::try_from(region.stop).unwrap_or(i64::MAX),
            region_id: Some(region.region_id.clone()),
            strand: region.strand,
        }
    }
}

/// Parse coordinate rows from CSV text.
///
/// # Errors
///
/// Returns `Error::InvalidCoordinate` naming the 1-based line of the first
/// malformed row, or `Error::InvalidInput` when the row limit is exceeded.
pub fn parse_coordinates_csv(text: &str) -> Result<Vec<CoordinateInput>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut inputs = Vec::new();
    let mut first_row = true;

    for (row_idx, result) in reader.records().enumerate() {
        let line = |position: Option<&csv::Position>| position.map_or(row_idx as u64 + 1, csv::Position::line);
        let record = result.map_err(|e| Error::InvalidCoordinate {
            region_id: format!("line {}", line(e.position())),
            reason: e.to_string(),
        })?;
        let line_num = line(record.position());

        let fields: Vec<&str> = record.iter().collect();
        if fields.iter().all(|f| f.is_empty()) || fields[0].starts_with('#') {
            continue;
        }
        if first_row {
            first_row = false;
            if HEADER_NAMES.contains(&fields[0].to_lowercase().as_str()) {
                continue;
            }
        }

        if let Some(msg) = check_record_limit(inputs.len()) {
            return Err(Error::InvalidInput(msg));
        }

        let invalid = |reason: String| Error::InvalidCoordinate {
            region_id: format!("line {line_num}"),
            reason,
        };

        if fields.len() < 3 || fields.len() > 5 {
            return Err(invalid(format!(
                "expected 3 to 5 comma-separated fields, found {}",
                fields.len()
            )));
        }

        let start = fields[1]
            .parse::<i64>()
            .map_err(|_| invalid(format!("start '{}' is not an integer", fields[1])))?;
        let stop = fields[2]
            .parse::<i64>()
            .map_err(|_| invalid(format!("stop '{}' is not an integer", fields[2])))?;
        let region_id = fields
            .get(3)
            .filter(|id| !id.is_empty())
            .map(|id| (*id).to_string());
        let strand = match fields.get(4).filter(|s| !s.is_empty()) {
            Some(s) => Some(Strand::parse(s).ok_or_else(|| invalid(format!("invalid strand '{s}'")))?),
            None => None,
        };

        inputs.push(CoordinateInput {
            chromosome: fields[0].to_string(),
            start,
            stop,
            region_id,
            strand,
        });
    }

    Ok(inputs)
}

/// Read and parse a coordinates CSV file
///
/// # Errors
///
/// I/O errors, or any error from [`parse_coordinates_csv`].
pub fn parse_coordinates_file(path: &Path) -> Result<Vec<CoordinateInput>, Error> {
    let text = std::fs::read_to_string(path)?;
    parse_coordinates_csv(&text)
}

/// Validate one coordinate input and turn it into a region.
///
/// # Errors
///
/// `Error::InvalidCoordinate` for negative or zero positions, an inverted
/// range, or a chromosome name that cannot be canonicalized.
pub fn resolve_coordinate(input: &CoordinateInput) -> Result<GenomicRegion, Error> {
    let label = input.region_id.clone().unwrap_or_else(|| {
        format!("{}:{}-{}", input.chromosome, input.start, input.stop)
    });
    let invalid = |reason: String| Error::InvalidCoordinate {
        region_id: label.clone(),
        reason,
    };

    let start = u64::try_from(input.start)
        .map_err(|_| invalid(format!("start {} is negative", input.start)))?;
    let stop = u64::try_from(input.stop)
        .map_err(|_| invalid(format!("stop {} is negative", input.stop)))?;
    let chromosome = normalize_chromosome(&input.chromosome)
        .ok_or_else(|| invalid(format!("unrecognised chromosome '{}'", input.chromosome)))?;

    let region_id = match &input.region_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => derived_region_id(&chromosome, start, stop),
    };

    let region = GenomicRegion::new(
        region_id.clone(),
        &chromosome,
        start,
        stop,
        SourceKind::Coordinate,
        region_id,
    )?;
    Ok(region.with_strand(input.strand))
}

/// Validate a batch of coordinate inputs, all or nothing
///
/// # Errors
///
/// The first invalid input.
pub fn resolve_coordinates(inputs: &[CoordinateInput]) -> Result<Vec<GenomicRegion>, Error> {
    inputs.iter().map(resolve_coordinate).collect()
}
