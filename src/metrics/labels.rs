//! Canonical label encoding.
//!
//! A label set is semantically unordered: two sets with the same key/value
//! pairs must land in the same series no matter the insertion order. The
//! canonical encoding sorts keys lexicographically and joins them as
//! `k1=v1,k2=v2`, which is used as the internal map key everywhere.

use std::collections::BTreeMap;

/// A set of string dimensions attached to one observation.
///
/// Backed by a `BTreeMap` so iteration order is always the canonical
/// lexicographic key order.
pub type LabelSet = BTreeMap<String, String>;

/// Build a [`LabelSet`] from key/value pairs.
pub fn labels(pairs: &[(&str, &str)]) -> LabelSet {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Encode a label set as its canonical `k1=v1,k2=v2` key.
///
/// The separator characters `=` and `,` (and the escape character `\`) are
/// backslash-escaped inside keys and values, so label content containing
/// them survives the round trip — commas are legal in URL paths, for
/// instance. The empty set encodes as the empty string, which addresses the
/// implicit unlabeled series.
pub fn label_key(labels: &LabelSet) -> String {
    let mut out = String::new();
    for (i, (key, value)) in labels.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_escaped(&mut out, key);
        out.push('=');
        push_escaped(&mut out, value);
    }
    out
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        if matches!(c, '\\' | ',' | '=') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Decode a canonical label key back into the original label set.
///
/// Exact inverse of [`label_key`]; used at export time to reconstruct the
/// `tags` object.
pub fn parse_label_key(key: &str) -> LabelSet {
    let mut set = LabelSet::new();
    if key.is_empty() {
        return set;
    }
    let mut current_key = String::new();
    let mut current_value = String::new();
    let mut in_value = false;
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let target = if in_value { &mut current_value } else { &mut current_key };
                if let Some(escaped) = chars.next() {
                    target.push(escaped);
                }
            },
            '=' if !in_value => in_value = true,
            ',' => {
                set.insert(
                    std::mem::take(&mut current_key),
                    std::mem::take(&mut current_value),
                );
                in_value = false;
            },
            c => {
                if in_value {
                    current_value.push(c);
                } else {
                    current_key.push(c);
                }
            },
        }
    }
    // A trailing bare token maps to an empty value rather than being dropped.
    set.insert(current_key, current_value);
    set
}
