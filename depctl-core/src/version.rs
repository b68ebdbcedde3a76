//! Lenient package version parsing and ordering.
//!
//! Package managers disagree on version syntax (`7.4.0`, `2.0.0rc1`,
//! `1:2.34-1ubuntu1`, `3.12.1_1`), so versions are normalized into a numeric
//! release, an optional pre-release tag and an optional post-release number.
//! Release components are compared numerically with missing components treated
//! as zero: `1.10.0 > 1.9.0` and `7.4 == 7.4.0`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+:)?[vV]?(\d+(?:\.\d+)*)(.*)$").expect("valid version regex")
});

static BREW_REVISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_\d+$").expect("valid revision regex"));

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PreRelease {
    rank: u8,
    label: String,
    number: u64,
}

fn pre_rank(label: &str) -> (u8, &str) {
    match label {
        "dev" => (0, "dev"),
        "a" | "alpha" => (1, "a"),
        "b" | "beta" => (2, "b"),
        "c" | "rc" | "pre" | "preview" => (3, "rc"),
        other => (4, other),
    }
}

#[derive(Debug, Clone)]
pub struct PackageVersion {
    release: Vec<u64>,
    pre: Option<PreRelease>,
    post: Option<u64>,
    raw: String,
}

impl PackageVersion {
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }
        let without_local = raw.split_once('+').map(|(v, _)| v).unwrap_or(raw);
        let normalized = BREW_REVISION_RE.replace(without_local, "");

        let caps = VERSION_RE.captures(&normalized)?;
        let release = caps[1]
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let (pre, post) = parse_suffix(&caps[2])?;

        Some(Self {
            release,
            pre,
            post,
            raw: raw.to_string(),
        })
    }

    /// The string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    fn release_cmp(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            let a = self.release.get(i).copied().unwrap_or(0);
            let b = other.release.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        Ordering::Equal
    }
}

fn split_leading_digits(s: &str) -> (Option<u64>, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return (None, s);
    }
    (s[..end].parse().ok(), &s[end..])
}

fn parse_post(s: &str) -> Option<Option<u64>> {
    if let Some(rest) = s.strip_prefix("post") {
        let (number, _) = split_leading_digits(rest.trim_start_matches(['.', '-', '_']));
        return Some(Some(number.unwrap_or(0)));
    }
    // `rev3` / `r3` only count with a number attached, so `rc1` stays a pre-release.
    for marker in ["rev", "r"] {
        if let Some(rest) = s.strip_prefix(marker) {
            if let (Some(number), _) = split_leading_digits(rest) {
                return Some(Some(number));
            }
        }
    }
    None
}

/// Parses whatever follows the numeric release. `None` means unparseable.
fn parse_suffix(rest: &str) -> Option<(Option<PreRelease>, Option<u64>)> {
    if rest.is_empty() {
        return Some((None, None));
    }
    let separator = rest.chars().next()?;
    let body = rest.trim_start_matches(['.', '-', '_']).to_ascii_lowercase();
    if body.is_empty() {
        return Some((None, None));
    }

    // Distro package revisions: `-1ubuntu1`, `-3.fc39`.
    if separator == '-' && body.starts_with(|c: char| c.is_ascii_digit()) {
        let (number, _) = split_leading_digits(&body);
        return Some((None, number));
    }

    if let Some(post) = parse_post(&body) {
        return Some((None, post));
    }

    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let label_end = body
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(body.len());
    let (rank, label) = pre_rank(&body[..label_end]);
    let after_label = body[label_end..].trim_start_matches(['.', '-', '_']);
    let (number, tail) = split_leading_digits(after_label);
    let tail = tail.trim_start_matches(['.', '-', '_']);
    let post = parse_post(tail).flatten();

    Some((
        Some(PreRelease {
            rank,
            label: label.to_string(),
            number: number.unwrap_or(0),
        }),
        post,
    ))
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release_cmp(other)
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
            .then_with(|| self.post.cmp(&other.post))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compares two version strings; `None` when either cannot be parsed.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    Some(PackageVersion::parse(a)?.cmp(&PackageVersion::parse(b)?))
}
