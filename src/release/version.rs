use std::cmp::Ordering;
use std::fmt;

/// Sortable release version label such as "9", "9.5" or "24.04".
///
/// Ordering is numeric by (major, minor), never lexical: "9.10" sorts above
/// "9.3", which a plain string sort gets wrong. The label text is kept
/// verbatim for display and for composing filenames ("24.04" must not
/// degrade to "24.4").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLabel {
    raw: String,
    major: u32,
    minor: Option<u32>,
}

impl VersionLabel {
    /// Parse a `major` or `major.minor` label. Anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (major_part, minor_part) = match raw.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (raw, None),
        };

        let major: u32 = major_part.parse().ok()?;
        let minor = match minor_part {
            Some(m) => Some(m.parse().ok()?),
            None => None,
        };

        Some(Self {
            raw: raw.to_string(),
            major,
            minor,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> Option<u32> {
        self.minor
    }

    /// The minor component as it was written, e.g. "04" for "24.04".
    pub fn minor_str(&self) -> Option<&str> {
        self.minor?;
        self.raw.split_once('.').map(|(_, minor)| minor)
    }
}

impl Ord for VersionLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for VersionLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
