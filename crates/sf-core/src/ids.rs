//! ID prefixes, ID generation, and storage path helpers.
//!
//! IDs have the form `{prefix}-{8 hex chars}` (e.g. `stu-a3f8b2c1`). Uploaded
//! file IDs additionally carry a millisecond timestamp so that two uploads of
//! the same file name never collide: `fil-{millis}-{8 hex chars}`.

use chrono::{DateTime, Utc};

pub const PREFIX_STUDY: &str = "stu";
pub const PREFIX_FILE: &str = "fil";
pub const PREFIX_JOB: &str = "job";

/// Maximum length of a sanitized path segment.
const MAX_SEGMENT_LEN: usize = 128;

/// Four random bytes as lowercase hex.
fn random_hex() -> String {
    let mut buf = [0u8; 4];
    // A zeroed buffer still yields a well-formed ID; the timestamp in file IDs
    // keeps those unique even then.
    let _ = getrandom::fill(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a prefixed ID, e.g. `stu-a3f8b2c1`.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", random_hex())
}

/// Generate an uploaded-file ID from a timestamp and a random component.
#[must_use]
pub fn generate_file_id(now: DateTime<Utc>) -> String {
    format!("{PREFIX_FILE}-{}-{}", now.timestamp_millis(), random_hex())
}

/// Reduce an arbitrary name to a storage-safe path segment.
///
/// Keeps ASCII alphanumerics, `.`, `-`, and `_`; runs of anything else become
/// a single `_`. Empty results become `_`.
#[must_use]
pub fn sanitize_segment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_underscore = false;

    for ch in input.chars() {
        let keep = ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' || ch == '_';
        if keep {
            out.push(ch);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }

    let sanitized = out.trim_matches('_');
    if sanitized.is_empty() {
        return "_".to_string();
    }

    let mut capped = sanitized.to_string();
    capped.truncate(MAX_SEGMENT_LEN);
    capped
}

/// Deterministic storage path for an uploaded file.
///
/// `studies/{owner}/{study}/{file_id}-{name}`
#[must_use]
pub fn storage_path(owner_id: &str, study_id: &str, file_id: &str, file_name: &str) -> String {
    format!(
        "studies/{}/{}/{}-{}",
        sanitize_segment(owner_id),
        sanitize_segment(study_id),
        file_id,
        sanitize_segment(file_name)
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_ids_carry_prefix() {
        let id = generate_id(PREFIX_STUDY);
        assert!(id.starts_with("stu-"));
        assert_eq!(id.len(), "stu-".len() + 8);
    }

    #[test]
    fn file_ids_are_unique() {
        let now = Utc::now();
        let ids: HashSet<String> = (0..100).map(|_| generate_file_id(now)).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn file_id_embeds_timestamp() {
        let now = Utc::now();
        let id = generate_file_id(now);
        assert!(id.contains(&now.timestamp_millis().to_string()));
    }

    #[test]
    fn sanitize_collapses_separators() {
        assert_eq!(sanitize_segment("kitchen photo (1).jpg"), "kitchen_photo_1_.jpg");
        assert_eq!(sanitize_segment("///"), "_");
        assert_eq!(sanitize_segment("a/b"), "a_b");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_segment(&long).len(), MAX_SEGMENT_LEN);
    }

    #[test]
    fn storage_path_is_deterministic() {
        let path = storage_path("usr-1", "stu-2", "fil-3", "plan.pdf");
        assert_eq!(path, "studies/usr-1/stu-2/fil-3-plan.pdf");
        assert_eq!(path, storage_path("usr-1", "stu-2", "fil-3", "plan.pdf"));
    }
}
