//! Slug derivation and per-author collision numbering.

use regex::Regex;

const MAX_SLUG_LEN: usize = 80;

/// Lower-cases, drops punctuation, and turns whitespace runs into single
/// hyphens. The result is truncated to a reasonable length.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_hyphen = true; // suppress leading hyphen
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_hyphen = false;
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
        // other punctuation is dropped entirely
    }
    while out.len() > MAX_SLUG_LEN {
        out.pop();
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Matcher for slugs conflicting with `base`: `^{base}(-\d+)?$`,
/// case-insensitive.
pub fn conflict_pattern(base: &str) -> Regex {
    // base is already slugified, but escape anyway
    Regex::new(&format!(r"(?i)^{}(-\d+)?$", regex::escape(base))).expect("escaped pattern")
}

/// Picks a slug for `base` that does not collide with `existing` slugs by the
/// same author. The first collision yields `{base}-2`; afterwards the counter
/// is one past the most specific conflicting suffix.
pub fn dedupe<'a, I>(base: &str, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let pattern = conflict_pattern(base);
    let mut most_specific: Option<u32> = None;
    let mut conflicted = false;
    for slug in existing {
        if !pattern.is_match(slug) {
            continue;
        }
        conflicted = true;
        if let Some(n) = trailing_counter(slug) {
            most_specific = Some(most_specific.map_or(n, |m| m.max(n)));
        }
    }
    if !conflicted {
        return base.to_string();
    }
    let counter = most_specific.map_or(2, |n| n + 1);
    format!("{base}-{counter}")
}

/// Extracts a trailing `-N` counter, if present.
fn trailing_counter(slug: &str) -> Option<u32> {
    let (_, suffix) = slug.rsplit_once('-')?;
    suffix.parse().ok()
}
