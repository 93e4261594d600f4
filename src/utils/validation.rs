//! Centralized hashing and input-limit helpers.

/// Maximum number of records accepted from a single input file (DOS protection)
pub const MAX_INPUT_RECORDS: usize = 100_000;

/// Lowercase hex MD5 of a byte slice.
///
/// # Examples
///
/// ```
/// use bedmaker::utils::validation::md5_hex;
///
/// assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Validate that a string is a valid MD5 checksum (32 hex characters).
#[must_use]
pub fn is_valid_md5(s: &str) -> bool {
    s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Cache key for an external lookup: `<operation>:<assembly>:<md5(input)>`.
///
/// Inputs are hashed so that arbitrary identifiers never leak into the key
/// syntax and the key length stays bounded. Collaborators answer per
/// assembly, so the assembly is part of the key.
#[must_use]
pub fn lookup_key(operation: &str, assembly: &str, input: &str) -> String {
    format!("{operation}:{assembly}:{}", md5_hex(input.trim().as_bytes()))
}

/// Check if adding another record would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new record.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_record_limit(count: usize) -> Option<String> {
    if count >= MAX_INPUT_RECORDS {
        Some(format!(
            "Too many records: adding another would exceed maximum of {MAX_INPUT_RECORDS}"
        ))
    } else {
        None
    }
}

/// Validate a dbSNP RefSNP identifier (`rs` followed by digits).
#[must_use]
pub fn is_valid_rsid(s: &str) -> bool {
    match (s.get(..2), s.get(2..)) {
        (Some(prefix), Some(digits)) => {
            prefix.eq_ignore_ascii_case("rs")
                && !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_hex() {
        let digest = md5_hex(b"chr17\t7565096\t7565097\tTP53_hotspot\n");
        assert!(is_valid_md5(&digest));
        assert_eq!(digest, md5_hex(b"chr17\t7565096\t7565097\tTP53_hotspot\n"));
        assert_ne!(digest, md5_hex(b"chr17\t7565096\t7565098\tTP53_hotspot\n"));
    }

    #[test]
    fn test_lookup_key() {
        let key = lookup_key("resolve_transcript", "GRCh38", "NM_007294");
        assert!(key.starts_with("resolve_transcript:GRCh38:"));
        assert_eq!(key, lookup_key("resolve_transcript", "GRCh38", " NM_007294 "));
        assert_ne!(key, lookup_key("resolve_gene", "GRCh38", "NM_007294"));
        assert_ne!(key, lookup_key("resolve_transcript", "GRCh37", "NM_007294"));
    }

    #[test]
    fn test_check_record_limit() {
        assert!(check_record_limit(100).is_none());
        assert!(check_record_limit(MAX_INPUT_RECORDS - 1).is_none());
        assert!(check_record_limit(MAX_INPUT_RECORDS).is_some());
    }

    #[test]
    fn test_is_valid_rsid() {
        assert!(is_valid_rsid("rs121913529"));
        assert!(is_valid_rsid("RS28934578"));
        assert!(!is_valid_rsid("rs"));
        assert!(!is_valid_rsid("rs12a"));
        assert!(!is_valid_rsid("121913529"));
    }
}
