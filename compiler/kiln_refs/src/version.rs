//! Framework version directories.
//!
//! Installed frameworks live in one directory per version (`6.0.5`,
//! `7.0.0-preview.3`, ...). A request selects among them by major.minor
//! prefix; among the matches the greatest version wins, where numeric
//! components compare numerically and a release sorts *after* any prerelease
//! carrying the same numbers.

use std::cmp::Ordering;
use std::fmt;

/// A parsed version directory name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameworkVersion {
    numbers: Vec<u64>,
    prerelease: Option<String>,
    raw: String,
}

impl FrameworkVersion {
    /// Parse `Major[.Minor[.Patch...]][-suffix]`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (core, prerelease) = match raw.split_once('-') {
            Some((core, suffix)) if !suffix.is_empty() => (core, Some(suffix.to_string())),
            Some(_) => return None,
            None => (raw, None),
        };
        let numbers = core
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        if numbers.is_empty() {
            return None;
        }
        Some(FrameworkVersion {
            numbers,
            prerelease,
            raw: raw.to_string(),
        })
    }

    pub fn major(&self) -> u64 {
        self.numbers[0]
    }

    pub fn minor(&self) -> Option<u64> {
        self.numbers.get(1).copied()
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The `Major.Minor` prefix used for matching.
    pub fn major_minor(&self) -> String {
        match self.minor() {
            Some(minor) => format!("{}.{minor}", self.major()),
            None => self.major().to_string(),
        }
    }

    /// Whether this version satisfies a request's major.minor prefix.
    pub fn matches_prefix_of(&self, requested: &FrameworkVersion) -> bool {
        if self.major() != requested.major() {
            return false;
        }
        match requested.minor() {
            Some(minor) => self.minor() == Some(minor),
            None => true,
        }
    }
}

impl Ord for FrameworkVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        for i in 0..len {
            let a = self.numbers.get(i).copied().unwrap_or(0);
            let b = other.numbers.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        match (&self.prerelease, &other.prerelease) {
            (None, None) => self.raw.cmp(&other.raw),
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b).then_with(|| self.raw.cmp(&other.raw)),
        }
    }
}

impl PartialOrd for FrameworkVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Pick the best version directory name for a request.
///
/// With no request the greatest parseable version wins. With a request, only
/// candidates sharing its major.minor prefix are considered. Unparseable
/// directory names are ignored.
pub fn select_version<'a, I>(candidates: I, requested: Option<&FrameworkVersion>) -> Option<FrameworkVersion>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter_map(FrameworkVersion::parse)
        .filter(|v| requested.map_or(true, |r| v.matches_prefix_of(r)))
        .max()
}

#[cfg(test)]
mod tests;
