//! Intermediate pipe format used between `bedmaker` subcommands.
//!
//! A pipe is JSON Lines: one header object naming the format, schema version
//! and record kind, then one record per line.
//!
//! ```text
//! {"format":"bedmaker","schema_version":1,"kind":"regions"}
//! {"region_id":"TP53_hotspot","chromosome":"chr17","start":7565097,...}
//! ```
//!
//! A `panel` pipe carries exactly one record, the whole [`Panel`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use tracing::debug;

use crate::core::panel::Panel;
use crate::core::region::GenomicRegion;
use crate::core::transcript::Transcript;
use crate::error::Error;
use crate::utils::validation::check_record_limit;

pub const FORMAT_NAME: &str = "bedmaker";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeKind {
    Regions,
    Transcripts,
    Panel,
}

impl std::fmt::Display for PipeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regions => write!(f, "regions"),
            Self::Transcripts => write!(f, "transcripts"),
            Self::Panel => write!(f, "panel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeHeader {
    pub format: String,
    pub schema_version: u32,
    pub kind: PipeKind,
}

impl PipeHeader {
    #[must_use]
    pub fn new(kind: PipeKind) -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            schema_version: SCHEMA_VERSION,
            kind,
        }
    }
}

/// Parsed contents of a pipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeContent {
    Regions(Vec<GenomicRegion>),
    Transcripts(Vec<Transcript>),
    Panel(Panel),
}

impl PipeContent {
    #[must_use]
    pub fn kind(&self) -> PipeKind {
        match self {
            Self::Regions(_) => PipeKind::Regions,
            Self::Transcripts(_) => PipeKind::Transcripts,
            Self::Panel(_) => PipeKind::Panel,
        }
    }

    /// Every region the pipe carries, whatever its kind
    #[must_use]
    pub fn into_regions(self) -> Vec<GenomicRegion> {
        match self {
            Self::Regions(regions) => regions,
            Self::Transcripts(transcripts) => transcripts.into_iter().flat_map(|t| t.regions).collect(),
            Self::Panel(panel) => panel.regions,
        }
    }
}

fn write_records<W: Write, T: Serialize>(mut writer: W, kind: PipeKind, records: &[T]) -> Result<(), Error> {
    serde_json::to_writer(&mut writer, &PipeHeader::new(kind))?;
    writer.write_all(b"\n")?;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    debug!("Wrote {} pipe with {} record(s)", kind, records.len());
    Ok(())
}

/// Write a `regions` pipe
///
/// # Errors
///
/// I/O or serialization errors.
pub fn write_regions<W: Write>(writer: W, regions: &[GenomicRegion]) -> Result<(), Error> {
    write_records(writer, PipeKind::Regions, regions)
}

/// Write a `transcripts` pipe
///
/// # Errors
///
/// I/O or serialization errors.
pub fn write_transcripts<W: Write>(writer: W, transcripts: &[Transcript]) -> Result<(), Error> {
    write_records(writer, PipeKind::Transcripts, transcripts)
}

/// Write a `panel` pipe
///
/// # Errors
///
/// I/O or serialization errors.
pub fn write_panel<W: Write>(writer: W, panel: &Panel) -> Result<(), Error> {
    write_records(writer, PipeKind::Panel, std::slice::from_ref(panel))
}

fn pipe_error(line: usize, reason: impl std::fmt::Display) -> Error {
    Error::Pipe(format!("line {line}: {reason}"))
}

fn check_header(header: &PipeHeader, line: usize) -> Result<(), Error> {
    if header.format != FORMAT_NAME {
        return Err(pipe_error(
            line,
            format!("unknown format '{}', expected '{FORMAT_NAME}'", header.format),
        ));
    }
    if header.schema_version > SCHEMA_VERSION {
        return Err(pipe_error(
            line,
            format!(
                "schema version {} is newer than supported version {SCHEMA_VERSION}",
                header.schema_version
            ),
        ));
    }
    Ok(())
}

fn parse_records<T: DeserializeOwned>(lines: &[(usize, String)]) -> Result<Vec<T>, Error> {
    let mut records = Vec::with_capacity(lines.len());
    for (line_no, line) in lines {
        if let Some(msg) = check_record_limit(records.len()) {
            return Err(pipe_error(*line_no, msg));
        }
        records.push(serde_json::from_str(line).map_err(|e| pipe_error(*line_no, e))?);
    }
    Ok(records)
}

/// Read any pipe
///
/// # Errors
///
/// `Error::Pipe` naming the line of a missing or unsupported header or an
/// unparseable record; I/O errors.
pub fn read_pipe<R: BufRead>(reader: R) -> Result<PipeContent, Error> {
    let mut header: Option<(usize, PipeHeader)> = None;
    let mut body = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = line_num + 1;
        if line.trim().is_empty() {
            continue;
        }
        if header.is_none() {
            let parsed: PipeHeader = serde_json::from_str(&line)
                .map_err(|e| pipe_error(line_no, format!("expected a pipe header: {e}")))?;
            check_header(&parsed, line_no)?;
            header = Some((line_no, parsed));
        } else {
            body.push((line_no, line));
        }
    }

    let Some((header_line, header)) = header else {
        return Err(Error::Pipe("empty input: no pipe header".to_string()));
    };

    match header.kind {
        PipeKind::Regions => Ok(PipeContent::Regions(parse_records(&body)?)),
        PipeKind::Transcripts => Ok(PipeContent::Transcripts(parse_records(&body)?)),
        PipeKind::Panel => {
            let mut panels: Vec<Panel> = parse_records(&body)?;
            match (panels.pop(), panels.is_empty()) {
                (Some(panel), true) => Ok(PipeContent::Panel(panel)),
                _ => Err(pipe_error(
                    header_line,
                    format!("a panel pipe must carry exactly one record, found {}", body.len()),
                )),
            }
        }
    }
}

/// Read regions from a pipe of any kind
///
/// # Errors
///
/// As for [`read_pipe`].
pub fn read_regions<R: BufRead>(reader: R) -> Result<Vec<GenomicRegion>, Error> {
    Ok(read_pipe(reader)?.into_regions())
}

/// Read a `panel` pipe
///
/// # Errors
///
/// As for [`read_pipe`], plus `Error::Pipe` when the pipe holds another kind.
pub fn read_panel<R: BufRead>(reader: R) -> Result<Panel, Error> {
    match read_pipe(reader)? {
        PipeContent::Panel(panel) => Ok(panel),
        other => Err(Error::Pipe(format!("expected a panel pipe, found {}", other.kind()))),
    }
}
