use std::cmp::Ordering;
use std::fmt;

/// A parsed software version.
///
/// Ordering uses semver when both sides are valid semver and otherwise
/// compares dotted components, so Windows-style four-part versions such as
/// `105.0.5195.102` order as expected.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    parts: Vec<Part>,
    semver: Option<semver::Version>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Numeric(u64),
    Alpha(String),
}

/// Parses a version string, returning `None` for values such as `unknown`.
///
/// A version must start with a digit once an optional `v` prefix is
/// stripped, and may only contain alphanumerics and `.`, `-`, `_`, `+`.
pub fn parse_version(input: &str) -> Option<Version> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if !trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
    {
        return None;
    }

    Some(Version {
        raw: trimmed.to_string(),
        parts: split_parts(trimmed),
        semver: semver::Version::parse(trimmed).ok(),
    })
}

fn split_parts(version: &str) -> Vec<Part> {
    let mut parts = Vec::new();
    let mut digits = String::new();
    let mut letters = String::new();

    for c in version.chars() {
        if c.is_ascii_digit() {
            if !letters.is_empty() {
                parts.push(Part::Alpha(std::mem::take(&mut letters)));
            }
            digits.push(c);
        } else if c.is_ascii_alphabetic() {
            if !digits.is_empty() {
                parts.push(numeric(&std::mem::take(&mut digits)));
            }
            letters.push(c.to_ascii_lowercase());
        } else {
            if !digits.is_empty() {
                parts.push(numeric(&std::mem::take(&mut digits)));
            }
            if !letters.is_empty() {
                parts.push(Part::Alpha(std::mem::take(&mut letters)));
            }
        }
    }

    if !digits.is_empty() {
        parts.push(numeric(&digits));
    }
    if !letters.is_empty() {
        parts.push(Part::Alpha(letters));
    }

    parts
}

fn numeric(digits: &str) -> Part {
    // Runs too long for u64 saturate rather than being dropped.
    Part::Numeric(digits.parse().unwrap_or(u64::MAX))
}

fn compare_parts(a: &[Part], b: &[Part]) -> Ordering {
    let len = a.len().max(b.len());

    for i in 0..len {
        let ord = match (a.get(i), b.get(i)) {
            (Some(Part::Numeric(x)), Some(Part::Numeric(y))) => x.cmp(y),
            (Some(Part::Alpha(x)), Some(Part::Alpha(y))) => x.cmp(y),
            (Some(Part::Numeric(_)), Some(Part::Alpha(_))) => Ordering::Greater,
            (Some(Part::Alpha(_)), Some(Part::Numeric(_))) => Ordering::Less,
            // A trailing label such as `rc1` is a pre-release of the shorter version.
            (Some(Part::Alpha(_)), None) => Ordering::Less,
            (None, Some(Part::Alpha(_))) => Ordering::Greater,
            (Some(Part::Numeric(x)), None) => x.cmp(&0),
            (None, Some(Part::Numeric(y))) => 0.cmp(y),
            (None, None) => Ordering::Equal,
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

impl Version {
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (&self.semver, &other.semver) {
            return a.cmp(b);
        }
        compare_parts(&self.parts, &other.parts)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Checks `version` against an inclusive range.
///
/// Empty or missing bounds are open. Returns `None` when a present bound
/// cannot be parsed.
pub fn version_in_range(version: &Version, start: Option<&str>, end: Option<&str>) -> Option<bool> {
    let bound = |value: Option<&str>| -> Option<Option<Version>> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => parse_version(v).map(Some),
            None => Some(None),
        }
    };

    let start = bound(start)?;
    let end = bound(end)?;

    let above_start = start.map_or(true, |s| *version >= s);
    let below_end = end.map_or(true, |e| *version <= e);

    Some(above_start && below_end)
}
