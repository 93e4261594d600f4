use crate::core::types::{IdentifierNamespace, StableId};
use crate::error::Error;

/// A transcript identifier whose format has been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptQuery {
    /// The identifier as supplied (trimmed)
    pub raw: String,
    pub namespace: IdentifierNamespace,
    pub accession: String,
    pub version: Option<u32>,
}

/// Split an optional `.version` suffix off an accession.
///
/// # Errors
///
/// Returns a reason string when there is more than one dot or the version is not numeric.
pub fn split_version(identifier: &str) -> Result<(&str, Option<u32>), String> {
    let mut parts = identifier.split('.');
    let accession = parts.next().unwrap_or_default();
    let version = parts.next();
    if parts.next().is_some() {
        return Err("at most one version suffix is allowed".to_string());
    }
    if accession.is_empty() {
        return Err("empty accession".to_string());
    }
    match version {
        None => Ok((accession, None)),
        Some(v) => v
            .parse::<u32>()
            .map(|n| (accession, Some(n)))
            .map_err(|_| format!("version '{v}' is not a number")),
    }
}

/// Check the format of a user-supplied transcript identifier.
///
/// # Errors
///
/// Returns `Error::UnresolvedIdentifier` for anything that is not a RefSeq
/// (`NM_`, `NR_`, `XM_`, `XR_`) or Ensembl (`ENST`) transcript accession with
/// at most one numeric version.
pub fn parse_transcript_query(identifier: &str) -> Result<TranscriptQuery, Error> {
    let raw = identifier.trim();
    let (accession, version) =
        split_version(raw).map_err(|reason| Error::unresolved(raw, reason))?;
    let namespace = IdentifierNamespace::from_format(accession).ok_or_else(|| {
        Error::unresolved(
            raw,
            "unsupported identifier format (expected ENST, NM_, NR_, XM_ or XR_)",
        )
    })?;

    Ok(TranscriptQuery {
        raw: raw.to_string(),
        namespace,
        accession: accession.to_string(),
        version,
    })
}

/// Tag an identifier returned by the annotation service.
///
/// The namespace is inferred by matching the returned accession's format to
/// the query's namespace. Accessions whose format matches neither namespace,
/// or matches a different one than the query, yield `None`. An explicit
/// version field wins over a version embedded in the accession.
#[must_use]
pub fn tag_stable_id(
    query_namespace: IdentifierNamespace,
    stable_id: &str,
    version: Option<u32>,
) -> Option<StableId> {
    let (accession, embedded) = split_version(stable_id.trim()).ok()?;
    let namespace = IdentifierNamespace::from_format(accession)?;
    if namespace != query_namespace {
        return None;
    }
    Some(StableId::new(namespace, accession).with_version(version.or(embedded)))
}
