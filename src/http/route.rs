//! Route normalization and cardinality estimation.
//!
//! Raw request paths carry identifiers (`/users/123`,
//! `/orders/550e8400-...`) that explode time-series cardinality if used as
//! tags verbatim. The normalizer collapses identifier-shaped segments into
//! low-cardinality placeholders; the estimator flags routes that would
//! still be expensive.

use crate::core::RouteConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});
static OBJECT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").unwrap());
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+){2,}$").unwrap());
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{16,}$").unwrap());
static CUID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^c[a-z0-9]{20,}$").unwrap());
static BASE64_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]{16,}={0,2}$").unwrap());

/// How a path segment was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Static,
    Integer,
    Uuid,
    ObjectId,
    Slug,
    Token,
    Base64,
}

fn classify(segment: &str) -> SegmentKind {
    if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
        return SegmentKind::Integer;
    }
    if UUID_RE.is_match(segment) {
        return SegmentKind::Uuid;
    }
    if OBJECT_ID_RE.is_match(segment) {
        return SegmentKind::ObjectId;
    }
    if SLUG_RE.is_match(segment) {
        return SegmentKind::Slug;
    }
    if CUID_RE.is_match(segment) {
        return SegmentKind::Token;
    }
    // Base64 needs a charset marker (+, / or padding) to tell it apart from
    // a nanoid-style token.
    if BASE64_RE.is_match(segment)
        && segment.bytes().any(|b| b.is_ascii_digit())
        && (segment.contains('+') || segment.contains('/') || segment.ends_with('='))
    {
        return SegmentKind::Base64;
    }
    // Long alphanumeric tokens must carry a digit, otherwise ordinary words
    // like "administration" would be swallowed.
    if TOKEN_RE.is_match(segment) && segment.bytes().any(|b| b.is_ascii_digit()) {
        return SegmentKind::Token;
    }
    SegmentKind::Static
}

/// Options controlling [`normalize_route`].
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Derive placeholder names from the preceding static segment
    /// (`/users/123` becomes `/users/:userId`). When disabled every
    /// identifier collapses to a generic typed placeholder.
    pub context_aware: bool,
    /// Keep a trailing slash instead of stripping it.
    pub preserve_trailing_slash: bool,
    /// Forced placeholders by zero-based segment index, e.g.
    /// `{1: ":tenantId"}`. Overrides win over classification.
    pub overrides: HashMap<usize, String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            context_aware: true,
            preserve_trailing_slash: false,
            overrides: HashMap::new(),
        }
    }
}

impl From<&RouteConfig> for NormalizeOptions {
    fn from(config: &RouteConfig) -> Self {
        Self {
            context_aware: config.context_aware_placeholders,
            preserve_trailing_slash: config.preserve_trailing_slash,
            overrides: HashMap::new(),
        }
    }
}

/// Collapse identifier-shaped segments of `path` into placeholders.
///
/// Query strings and fragments are stripped first; the trailing slash is
/// stripped unless the options preserve it.
pub fn normalize_route(path: &str, options: &NormalizeOptions) -> String {
    let path = match path.find(|c| c == '?' || c == '#') {
        Some(i) => &path[..i],
        None => path,
    };

    let had_trailing_slash = path.len() > 1 && path.ends_with('/');
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    if trimmed.is_empty() || trimmed == "/" {
        return "/".to_string();
    }

    let mut out = String::new();
    let mut last_static: Option<&str> = None;
    for (index, segment) in trimmed.trim_start_matches('/').split('/').enumerate() {
        out.push('/');
        if let Some(placeholder) = options.overrides.get(&index) {
            out.push_str(placeholder);
            last_static = None;
            continue;
        }
        match classify(segment) {
            SegmentKind::Static => {
                out.push_str(segment);
                last_static = Some(segment);
            },
            kind => {
                out.push_str(&placeholder_for(kind, last_static, options.context_aware));
                last_static = None;
            },
        }
    }

    if options.preserve_trailing_slash && had_trailing_slash {
        out.push('/');
    }
    out
}

fn placeholder_for(kind: SegmentKind, context: Option<&str>, context_aware: bool) -> String {
    if context_aware {
        return match context {
            Some(segment) => format!(":{}Id", camel_singular(segment)),
            None => ":id".to_string(),
        };
    }
    match kind {
        SegmentKind::Integer => ":id",
        SegmentKind::Uuid => ":uuid",
        SegmentKind::ObjectId => ":objectId",
        SegmentKind::Slug => ":slug",
        SegmentKind::Token => ":token",
        SegmentKind::Base64 => ":base64",
        SegmentKind::Static => unreachable!("static segments are never replaced"),
    }
    .to_string()
}

/// Singularize a path segment and camel-case it for a placeholder name:
/// `users` -> `user`, `line-items` -> `lineItem`, `categories` -> `category`.
fn camel_singular(segment: &str) -> String {
    let mut out = String::new();
    for (i, word) in segment.split(['-', '_']).enumerate() {
        if word.is_empty() {
            continue;
        }
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(&chars.as_str().to_lowercase());
            }
        }
    }
    if let Some(stem) = out.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if out.ends_with('s') && !out.ends_with("ss") {
        out.pop();
    }
    out
}

/// Per-segment cardinality guesses used by [`estimate_route_cardinality`].
const PLACEHOLDER_CARDINALITY: u64 = 1000;
const WILDCARD_CARDINALITY: u64 = 100;

/// Estimate how many distinct label values a route template can produce.
///
/// Multiplies a per-segment guess across the route: static segments count
/// 1, typed placeholders roughly 1000, wildcards roughly 100. Useful for
/// flagging routes that were left unnormalized.
pub fn estimate_route_cardinality(route: &str) -> u64 {
    route
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if segment.starts_with(':') {
                PLACEHOLDER_CARDINALITY
            } else if segment == "*" || segment == "**" {
                WILDCARD_CARDINALITY
            } else if classify(segment) == SegmentKind::Static {
                1
            } else {
                // A raw identifier that survived normalization is exactly
                // what the estimator exists to catch.
                PLACEHOLDER_CARDINALITY
            }
        })
        .fold(1u64, u64::saturating_mul)
}

/// True when the estimated cardinality crosses `threshold`.
pub fn is_high_cardinality(route: &str, threshold: u64) -> bool {
    estimate_route_cardinality(route) >= threshold
}
