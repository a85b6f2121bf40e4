use std::fmt;

/// The fixed set of distribution families the resolver knows how to scrape.
///
/// Each family owns a release-listing source, a parsing rule for that
/// source, and a derivation rule from a selected release to the final
/// image URL / filename / template name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistributionFamily {
    Ubuntu,
    AlmaLinux,
    RockyLinux,
    OracleLinux,
    CentosStream,
}

impl DistributionFamily {
    pub const ALL: [DistributionFamily; 5] = [
        DistributionFamily::Ubuntu,
        DistributionFamily::AlmaLinux,
        DistributionFamily::RockyLinux,
        DistributionFamily::OracleLinux,
        DistributionFamily::CentosStream,
    ];

    /// Human-facing name, used in menus and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionFamily::Ubuntu => "Ubuntu",
            DistributionFamily::AlmaLinux => "AlmaLinux",
            DistributionFamily::RockyLinux => "Rocky Linux",
            DistributionFamily::OracleLinux => "Oracle Linux",
            DistributionFamily::CentosStream => "CentOS Stream",
        }
    }

    /// Key under which the family's listing endpoint is configured.
    pub fn source_key(&self) -> &'static str {
        match self {
            DistributionFamily::Ubuntu => "ubuntu",
            DistributionFamily::AlmaLinux => "almalinux",
            DistributionFamily::RockyLinux => "rocky",
            DistributionFamily::OracleLinux => "oracle",
            DistributionFamily::CentosStream => "centos-stream",
        }
    }

    /// Parse a user- or config-supplied family name.
    ///
    /// Accepts both the display name and the source key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name) || f.source_key() == name)
    }
}

impl fmt::Display for DistributionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::DistributionFamily;

    #[test]
    fn from_name_accepts_display_name_and_key() {
        assert_eq!(
            DistributionFamily::from_name("Rocky Linux"),
            Some(DistributionFamily::RockyLinux)
        );
        assert_eq!(
            DistributionFamily::from_name("centos-stream"),
            Some(DistributionFamily::CentosStream)
        );
        assert_eq!(
            DistributionFamily::from_name("ubuntu"),
            Some(DistributionFamily::Ubuntu)
        );
    }

    #[test]
    fn from_name_rejects_unknown_family() {
        assert_eq!(DistributionFamily::from_name("Gentoo"), None);
    }
}
