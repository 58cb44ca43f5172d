//! Text and email sanitization for uploaded CSV fields.
//!
//! # Invariants
//! - `sanitize_text_field` output never contains tags, line breaks, tabs or
//!   percent-encoded octets, and is trimmed.
//! - `sanitize_email` returns either an address accepted by `is_email` or
//!   an empty string.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*?>.*?</(script|style)>").expect("valid block regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static OCTET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("valid octet regex"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n\t ]+").expect("valid whitespace regex"));
static LOCAL_PART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]+$").expect("valid local part regex")
});
static LOCAL_PART_STRIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]").expect("valid local part strip regex")
});
static DOMAIN_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9-]+$").expect("valid domain label regex"));
static DOMAIN_LABEL_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[^a-z0-9-]").expect("valid domain label strip regex"));
static DOT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").expect("valid dot regex"));

const MIN_EMAIL_LEN: usize = 6;
const EDGE_WHITESPACE: &[char] = &[' ', '\t', '\n', '\r', '\0', '\x0B'];

/// Cleans a free-text field: drops markup, percent-encoded octets and
/// line breaks, collapses whitespace runs and trims.
pub fn sanitize_text_field(value: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(value, "");
    let without_tags = TAG_RE.replace_all(&without_blocks, "");
    let without_octets = OCTET_RE.replace_all(&without_tags, "");
    let collapsed = WHITESPACE_RE.replace_all(&without_octets, " ");
    collapsed.trim().to_string()
}

/// Strips characters that cannot appear in an address and returns the
/// cleaned address, or an empty string when nothing valid remains.
pub fn sanitize_email(value: &str) -> String {
    let email = value.trim();
    if email.len() < MIN_EMAIL_LEN {
        return String::new();
    }
    let Some((local, domain)) = split_address(email) else {
        return String::new();
    };

    let local = LOCAL_PART_STRIP_RE.replace_all(local, "");
    if local.is_empty() {
        return String::new();
    }

    let domain = DOT_RUN_RE.replace_all(domain, "");
    let domain = domain.trim_matches(|c: char| EDGE_WHITESPACE.contains(&c) || c == '.');
    if domain.is_empty() {
        return String::new();
    }

    let labels: Vec<String> = domain
        .split('.')
        .map(|label| {
            let label = label.trim_matches(|c: char| EDGE_WHITESPACE.contains(&c) || c == '-');
            DOMAIN_LABEL_STRIP_RE.replace_all(label, "").into_owned()
        })
        .filter(|label| !label.is_empty())
        .collect();
    if labels.len() < 2 {
        return String::new();
    }

    let sanitized = format!("{local}@{}", labels.join("."));
    if is_email(&sanitized) {
        sanitized
    } else {
        String::new()
    }
}

/// Syntactic address check.
///
/// Accepts `local@domain` where the local part uses the RFC 5322 atom
/// characters plus `.`, and the domain has at least two labels made of
/// letters, digits and inner hyphens.
pub fn is_email(value: &str) -> bool {
    if value.len() < MIN_EMAIL_LEN {
        return false;
    }
    let Some((local, domain)) = split_address(value) else {
        return false;
    };

    if !LOCAL_PART_RE.is_match(local) {
        return false;
    }
    if domain.contains("..") {
        return false;
    }
    if domain.trim_matches(|c: char| EDGE_WHITESPACE.contains(&c) || c == '.') != domain {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        label.trim_matches(|c: char| EDGE_WHITESPACE.contains(&c) || c == '-') == *label
            && DOMAIN_LABEL_RE.is_match(label)
    })
}

/// Splits on the first `@`, which must not be the first character.
fn split_address(value: &str) -> Option<(&str, &str)> {
    match value.find('@') {
        Some(0) | None => None,
        Some(index) => Some((&value[..index], &value[index + 1..])),
    }
}
