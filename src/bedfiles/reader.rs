use flate2::read::MultiGzDecoder;
use std::io::Read;
use std::path::Path;

use crate::core::types::Strand;
use crate::error::Error;
use crate::utils::validation::{check_record_limit, is_valid_md5};

use super::policy::MAX_SCORE;
use super::writer::is_gzip_path;
use super::{BedFile, BedRecord, PolicyStamp, HEADER_MARKER};

/// Read a BED file from disk, decompressing `.gz` files
///
/// # Errors
///
/// I/O errors, or any error from [`parse_bed`].
pub fn read_bed(path: &Path) -> Result<BedFile, Error> {
    let bytes = std::fs::read(path)?;
    let text = if is_gzip_path(path) || bytes.starts_with(&[0x1f, 0x8b]) {
        let mut text = String::new();
        MultiGzDecoder::new(bytes.as_slice()).read_to_string(&mut text)?;
        text
    } else {
        String::from_utf8(bytes).map_err(|e| Error::MalformedBed {
            line: 0,
            reason: format!("file is not UTF-8: {e}"),
        })?
    };
    parse_bed(&text)
}

/// Parse BED text without assuming anything about how it was written.
///
/// `track`/`browser` lines and `#` comments are skipped; a `#bedmaker` header
/// line is parsed into the file's [`PolicyStamp`]. Columns beyond the eighth
/// are ignored.
///
/// # Errors
///
/// `Error::MalformedBed` naming the 1-based line of the first bad record.
pub fn parse_bed(text: &str) -> Result<BedFile, Error> {
    let mut stamp = None;
    let mut records = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_no = line_num + 1;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(HEADER_MARKER) {
            if stamp.is_some() {
                return Err(malformed(line_no, "more than one header line"));
            }
            stamp = Some(parse_header(line, line_no)?);
            continue;
        }
        if line.starts_with('#') || line.starts_with("track") || line.starts_with("browser") {
            continue;
        }

        if let Some(msg) = check_record_limit(records.len()) {
            return Err(malformed(line_no, msg));
        }
        records.push(parse_record(line, line_no)?);
    }

    Ok(BedFile {
        policy_id: stamp.as_ref().map(|s: &PolicyStamp| s.policy_id.clone()),
        stamp,
        records,
    })
}

fn malformed(line: usize, reason: impl Into<String>) -> Error {
    Error::MalformedBed {
        line,
        reason: reason.into(),
    }
}

fn parse_header(line: &str, line_no: usize) -> Result<PolicyStamp, Error> {
    let mut policy_id = None;
    let mut policy_digest = None;
    let mut point_padding = 0;

    for field in line.split('\t').skip(1) {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| malformed(line_no, format!("header field '{field}' is not key=value")))?;
        match key {
            "policy" => policy_id = Some(value.to_string()),
            "policy_digest" => {
                if !is_valid_md5(value) {
                    return Err(malformed(line_no, format!("invalid policy digest '{value}'")));
                }
                policy_digest = Some(value.to_string());
            }
            "point_padding" => {
                point_padding = value
                    .parse()
                    .map_err(|_| malformed(line_no, format!("invalid point_padding '{value}'")))?;
            }
            // Later versions may add fields
            _ => {}
        }
    }

    match (policy_id, policy_digest) {
        (Some(policy_id), Some(policy_digest)) => Ok(PolicyStamp {
            policy_id,
            policy_digest,
            point_padding,
        }),
        _ => Err(malformed(line_no, "header must carry policy and policy_digest")),
    }
}

fn parse_record(line: &str, line_no: usize) -> Result<BedRecord, Error> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(malformed(
            line_no,
            format!("expected at least 3 tab-separated columns, found {}", fields.len()),
        ));
    }

    let position = |idx: usize, what: &str| -> Result<u64, Error> {
        fields[idx]
            .parse::<u64>()
            .map_err(|_| malformed(line_no, format!("{what} '{}' is not a non-negative integer", fields[idx])))
    };

    let start = position(1, "chromStart")?;
    let end = position(2, "chromEnd")?;
    if end <= start {
        return Err(malformed(
            line_no,
            format!("chromEnd {end} must be greater than chromStart {start}"),
        ));
    }

    let name = fields.get(3).map(|s| (*s).to_string());
    let score = match fields.get(4) {
        None | Some(&".") => None,
        Some(s) => match s.parse::<u16>() {
            Ok(score) if score <= MAX_SCORE => Some(score),
            _ => return Err(malformed(line_no, format!("invalid score '{s}' (0-{MAX_SCORE})"))),
        },
    };
    let strand = match fields.get(5) {
        None => None,
        Some(s) => Some(Strand::parse(s).ok_or_else(|| malformed(line_no, format!("invalid strand '{s}'")))?),
    };
    let (thick_start, thick_end) = if fields.len() >= 8 {
        let thick_start = position(6, "thickStart")?;
        let thick_end = position(7, "thickEnd")?;
        if thick_start < start || thick_end > end || thick_end <= thick_start {
            return Err(malformed(
                line_no,
                format!("thick extent {thick_start}-{thick_end} is not inside {start}-{end}"),
            ));
        }
        (Some(thick_start), Some(thick_end))
    } else {
        (None, None)
    };

    Ok(BedRecord {
        chromosome: fields[0].to_string(),
        start,
        end,
        name,
        score,
        strand,
        thick_start,
        thick_end,
    })
}
