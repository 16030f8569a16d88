//! Opaque ids and the finding fingerprint.
//!
//! Ids are 128-bit, monotonic per process, and lexicographically sortable:
//! the high 64 bits are `(unix_millis << 16) | sequence`, bumped through an
//! atomic so two ids issued in the same millisecond still order correctly;
//! the low 64 bits are random. Rendered as 32 lowercase hex characters.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use crate::finding::{DebtType, Span};

static LAST_HIGH: AtomicU64 = AtomicU64::new(0);

/// Issue the next process-wide id.
pub fn next_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let candidate = millis << 16;
    let mut prev = LAST_HIGH.load(Ordering::Relaxed);
    let high = loop {
        let next = candidate.max(prev + 1);
        match LAST_HIGH.compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => break next,
            Err(observed) => prev = observed,
        }
    };
    let low = uuid::Uuid::new_v4().as_u128() as u64;
    format!("{high:016x}{low:016x}")
}

/// Stable content hash identifying the "same debt" across scans.
///
/// Hashes `(debt_type, file_path, normalized span text)`; when no span text
/// is available the title stands in for the span. Non-identity fields
/// (description, evidence, severity) never participate.
pub fn fingerprint(
    debt_type: DebtType,
    file_path: &str,
    span_text: Option<&str>,
    title: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(debt_type.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(file_path.as_bytes());
    hasher.update(b"\n");
    match span_text {
        Some(text) => hasher.update(normalize_span_text(text).as_bytes()),
        None => hasher.update(title.as_bytes()),
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Strip trailing whitespace per line and join with a single LF.
fn normalize_span_text(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the 1-indexed inclusive span from file content, for fingerprint
/// computation. Lines past the end of the file are simply absent.
pub fn span_text(content: &str, span: Span) -> String {
    content
        .lines()
        .skip(span.start.saturating_sub(1) as usize)
        .take(span.len() as usize)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_sortable() {
        let mut prev = next_id();
        for _ in 0..1000 {
            let id = next_id();
            assert_eq!(id.len(), 32);
            assert!(id > prev, "{id} should sort after {prev}");
            prev = id;
        }
    }

    #[test]
    fn fingerprint_ignores_trailing_whitespace() {
        let a = fingerprint(DebtType::CodeSmell, "a.ts", Some("let x = 1;   \nreturn x;"), "t");
        let b = fingerprint(DebtType::CodeSmell, "a.ts", Some("let x = 1;\nreturn x;"), "t");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_distinguishes_identity_fields() {
        let base = fingerprint(DebtType::CodeSmell, "a.ts", Some("x"), "t");
        assert_ne!(base, fingerprint(DebtType::Complexity, "a.ts", Some("x"), "t"));
        assert_ne!(base, fingerprint(DebtType::CodeSmell, "b.ts", Some("x"), "t"));
        assert_ne!(base, fingerprint(DebtType::CodeSmell, "a.ts", Some("y"), "t"));
    }

    #[test]
    fn fingerprint_falls_back_to_title() {
        let a = fingerprint(DebtType::MissingTests, "a.ts", None, "no tests for parser");
        let b = fingerprint(DebtType::MissingTests, "a.ts", None, "no tests for parser");
        let c = fingerprint(DebtType::MissingTests, "a.ts", None, "different");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn span_text_selects_inclusive_lines() {
        let content = "one\ntwo\nthree\nfour";
        let span = Span::new(2, 3).unwrap();
        assert_eq!(span_text(content, span), "two\nthree");
        let beyond = Span::new(3, 10).unwrap();
        assert_eq!(span_text(content, beyond), "three\nfour");
    }
}
