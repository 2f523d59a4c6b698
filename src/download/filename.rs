//! Filename resolution for downloaded payloads.
//!
//! The server may suggest a name in `Content-Disposition`; otherwise the
//! deterministic `{identifier}.{extension}` is used. Whether a suggested name
//! is trusted as-is or sanitized is controlled by [`FilenamePolicy`].

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap};

use crate::input::Identifier;

#[allow(clippy::expect_used)]
static QUOTED_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bfilename\s*=\s*"([^"]+)""#).expect("quoted filename pattern is valid")
});

#[allow(clippy::expect_used)]
static EXTENDED_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfilename\*\s*=\s*([A-Za-z0-9_-]+)'[^']*'([^;\s]+)")
        .expect("extended filename pattern is valid")
});

#[allow(clippy::expect_used)]
static TOKEN_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfilename\s*=\s*([^;\s]+)").expect("token filename pattern is valid")
});

/// How server-suggested filenames are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenamePolicy {
    /// Replace separators and reserved characters; reject traversal-only names.
    #[default]
    Sanitize,
    /// Use the header value exactly as sent. A hostile server can then write
    /// outside the destination directory.
    Verbatim,
}

/// Resolves the local filename for a successful response.
///
/// Never returns an empty string.
#[must_use]
pub fn resolve_filename(
    headers: &HeaderMap,
    identifier: &Identifier,
    extension: &str,
    policy: FilenamePolicy,
) -> String {
    let suggested = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_disposition);

    let chosen = match (suggested, policy) {
        (Some(name), FilenamePolicy::Verbatim) => Some(name),
        (Some(name), FilenamePolicy::Sanitize) => sanitize_filename(&name),
        (None, _) => None,
    };

    chosen.unwrap_or_else(|| fallback_filename(identifier, extension))
}

/// Deterministic name used when the server does not suggest one.
#[must_use]
pub fn fallback_filename(identifier: &Identifier, extension: &str) -> String {
    format!("{identifier}.{extension}")
}

/// Extracts a filename from a Content-Disposition value.
///
/// Precedence:
/// - `filename*=UTF-8''percent%20encoded` (RFC 5987)
/// - `filename="quoted value"`
/// - `filename=token`
///
/// Percent-encoded sequences in the plain forms are decoded as well; some
/// mirrors encode spaces and non-ASCII titles there.
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(caps) = EXTENDED_FILENAME.captures(header)
        && let Ok(decoded) = urlencoding::decode(&caps[2])
        && !decoded.trim().is_empty()
    {
        return Some(decoded.into_owned());
    }

    let raw = QUOTED_FILENAME
        .captures(header)
        .or_else(|| TOKEN_FILENAME.captures(header))
        .map(|caps| caps[1].trim().trim_matches('"').to_string())?;

    if raw.is_empty() {
        return None;
    }

    Some(urlencoding::decode(&raw).map_or_else(|_| raw.clone(), std::borrow::Cow::into_owned))
}

/// Makes a header-supplied name safe to join onto the destination directory.
///
/// Returns `None` when nothing usable remains.
pub(crate) fn sanitize_filename(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let sanitized = sanitized.trim();

    if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
        return None;
    }
    if !is_single_normal_component(sanitized) {
        return None;
    }
    Some(sanitized.to_string())
}

fn is_single_normal_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
