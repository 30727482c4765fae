//! Fixed predicates for the named semantic formats.
//!
//! Each format is a single anchored regex, compiled lazily once per process
//! and reused by every validator. Dates go through chrono instead of a
//! regex so impossible calendar dates are rejected too.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::FormatKind;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap());

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ().-]{5,}[0-9]$").unwrap());

static IP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$")
        .unwrap()
});

static BASE64: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{4})$")
        .unwrap()
});

static JWT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*$").unwrap());

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|[1-9]\d*)\.(?:0|[1-9]\d*)\.(?:0|[1-9]\d*)(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$")
        .unwrap()
});

static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

pub fn matches(kind: FormatKind, s: &str) -> bool {
    match kind {
        FormatKind::Email => EMAIL.is_match(s),
        FormatKind::Url => URL.is_match(s),
        FormatKind::Uuid => UUID.is_match(s),
        FormatKind::Phone => PHONE.is_match(s),
        FormatKind::Ip => IP.is_match(s),
        FormatKind::Base64 => BASE64.is_match(s),
        FormatKind::Jwt => JWT.is_match(s),
        FormatKind::Semver => SEMVER.is_match(s),
        FormatKind::Slug => SLUG.is_match(s),
    }
}

/// `date` primitive: RFC 3339 timestamp or plain `YYYY-MM-DD`.
pub fn date_valid(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_predicates_accept_and_reject() {
        let cases: &[(FormatKind, &str, &str)] = &[
            (FormatKind::Email, "a.b@example.com", "not-an-email"),
            (FormatKind::Url, "https://example.com/x?q=1", "example.com"),
            (
                FormatKind::Uuid,
                "550e8400-e29b-41d4-a716-446655440000",
                "550e8400",
            ),
            (FormatKind::Phone, "+1 (555) 123-4567", "call me"),
            (FormatKind::Ip, "192.168.0.1", "999.1.1.1"),
            (FormatKind::Base64, "aGVsbG8=", "not base64!"),
            (
                FormatKind::Jwt,
                "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiIxIn0.dBjftJeZ",
                "one.part",
            ),
            (FormatKind::Semver, "1.2.3-beta.1+build5", "1.2"),
            (FormatKind::Slug, "my-first-post", "Not A Slug"),
        ];
        for (kind, ok, bad) in cases {
            assert!(matches(*kind, ok), "{kind:?} should accept {ok}");
            assert!(!matches(*kind, bad), "{kind:?} should reject {bad}");
        }
    }

    #[test]
    fn dates_go_through_the_calendar() {
        assert!(date_valid("2024-02-29"));
        assert!(date_valid("2024-06-01T12:30:00Z"));
        assert!(!date_valid("2023-02-29")); // not a leap year
        assert!(!date_valid("yesterday"));
    }
}
