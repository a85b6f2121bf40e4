use super::{DistributionFamily, VersionLabel};

/// One published release of a distribution's cloud image line, as discovered
/// from that family's listing source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    family: DistributionFamily,
    version: VersionLabel,
    point_release: Option<String>,
    codename: Option<String>,
}

impl ReleaseCandidate {
    pub fn new(
        family: DistributionFamily,
        version: VersionLabel,
        point_release: Option<String>,
        codename: Option<String>,
    ) -> Self {
        Self {
            family,
            version,
            point_release,
            codename,
        }
    }

    pub fn family(&self) -> DistributionFamily {
        self.family
    }

    pub fn version(&self) -> &VersionLabel {
        &self.version
    }

    pub fn point_release(&self) -> Option<&str> {
        self.point_release.as_deref()
    }

    pub fn codename(&self) -> Option<&str> {
        self.codename.as_deref()
    }

    /// Label shown in the release picker, e.g. "24.04 Noble Numbat" or
    /// "9-stream".
    pub fn menu_label(&self) -> String {
        match (self.family, self.codename.as_deref()) {
            (DistributionFamily::CentosStream, _) => format!("{}-stream", self.version),
            (_, Some(codename)) => format!("{} {}", self.version, codename),
            (_, None) => self.version.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReleaseCandidate;
    use crate::release::{DistributionFamily, VersionLabel};

    #[test]
    fn menu_label_includes_codename_when_present() {
        let candidate = ReleaseCandidate::new(
            DistributionFamily::Ubuntu,
            VersionLabel::parse("24.04").unwrap(),
            None,
            Some("Noble Numbat".to_string()),
        );
        assert_eq!(candidate.menu_label(), "24.04 Noble Numbat");
    }

    #[test]
    fn menu_label_marks_stream_releases() {
        let candidate = ReleaseCandidate::new(
            DistributionFamily::CentosStream,
            VersionLabel::parse("9").unwrap(),
            None,
            None,
        );
        assert_eq!(candidate.menu_label(), "9-stream");
    }
}
