use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use super::{FamilyStrategy, ResolverError, fetch_text, listing_url, newest_unique};
use crate::release::{DistributionFamily, ReleaseCandidate, ResolvedTemplate, VersionLabel};

const PUB_BASE: &str = "https://dl.rockylinux.org/pub/rocky";

fn version_dir_regex() -> &'static Regex {
    static DIR_RE: OnceLock<Regex> = OnceLock::new();
    DIR_RE.get_or_init(|| {
        Regex::new(r#"href="(?P<version>\d+\.\d+)/""#)
            .expect("invalid Rocky version directory regex")
    })
}

/// Version directories from the pub listing, one entry per major keeping the
/// highest minor seen, newest major first.
fn parse_version_dirs(html: &str) -> Vec<VersionLabel> {
    let mut best_per_major: BTreeMap<u32, VersionLabel> = BTreeMap::new();

    for caps in version_dir_regex().captures_iter(html) {
        let Some(version) = VersionLabel::parse(&caps["version"]) else {
            continue;
        };
        best_per_major
            .entry(version.major())
            .and_modify(|current| {
                if version > *current {
                    *current = version.clone();
                }
            })
            .or_insert(version);
    }

    best_per_major.into_values().rev().collect()
}

fn derive(release: &ReleaseCandidate) -> Result<ResolvedTemplate, ResolverError> {
    let family = DistributionFamily::RockyLinux;
    let version = release.version();
    let minor = version.minor_str().ok_or_else(|| {
        ResolverError::malformed(family, "release is missing its minor version component")
    })?;
    let major = version.major();

    let filename = format!("Rocky-{major}-GenericCloud-Base.latest.x86_64.qcow2");
    let url = format!("{PUB_BASE}/{major}/images/x86_64/{filename}");
    let template_name = format!("rockylinux-{major}.{minor}");

    Ok(ResolvedTemplate::new(family, url, filename, template_name))
}

pub(super) struct RockyStrategy;

#[async_trait]
impl FamilyStrategy for RockyStrategy {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::RockyLinux
    }

    async fn list_releases(
        &self,
        client: &Client,
        limit: usize,
    ) -> Result<Vec<ReleaseCandidate>, ResolverError> {
        let family = self.family();
        let url = listing_url(family)?;
        let html = fetch_text(client, family, url).await?;

        let candidates = parse_version_dirs(&html)
            .into_iter()
            .map(|version| {
                let minor = version.minor_str().map(str::to_string);
                ReleaseCandidate::new(family, version, minor, None)
            })
            .collect();

        Ok(newest_unique(candidates, limit))
    }

    async fn derive_params(
        &self,
        _client: &Client,
        release: &ReleaseCandidate,
    ) -> Result<ResolvedTemplate, ResolverError> {
        derive(release)
    }
}

#[cfg(test)]
mod tests {
    use super::{derive, parse_version_dirs};
    use crate::release::{DistributionFamily, ReleaseCandidate, VersionLabel};
    use crate::resolver::ResolverError;

    const LISTING_FIXTURE: &str = r#"
<a href="8.9/">8.9/</a>
<a href="8.10/">8.10/</a>
<a href="9.4/">9.4/</a>
<a href="9.5/">9.5/</a>
<a href="10.0/">10.0/</a>
<a href="sig/">sig/</a>
<a href="RELEASE-NOTES/">RELEASE-NOTES/</a>
"#;

    #[test]
    fn keeps_the_highest_minor_per_major_newest_major_first() {
        let versions: Vec<String> = parse_version_dirs(LISTING_FIXTURE)
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(versions, vec!["10.0", "9.5", "8.10"]);
    }

    #[test]
    fn minor_comparison_is_numeric() {
        // "8.10" must beat "8.9" even though it sorts lower lexically.
        let versions = parse_version_dirs(r#"<a href="8.9/">x</a><a href="8.10/">x</a>"#);
        assert_eq!(versions[0].as_str(), "8.10");
    }

    #[test]
    fn drifted_listing_format_yields_no_versions() {
        let html = r#"<a href="sig/">sig/</a><a href="RELEASE-NOTES/">notes</a>"#;
        assert!(parse_version_dirs(html).is_empty());
    }

    #[test]
    fn derives_rocky_ten_parameters() {
        let release = ReleaseCandidate::new(
            DistributionFamily::RockyLinux,
            VersionLabel::parse("10.0").unwrap(),
            Some("0".to_string()),
            None,
        );

        let template = derive(&release).unwrap();
        assert_eq!(
            template.local_filename(),
            "Rocky-10-GenericCloud-Base.latest.x86_64.qcow2"
        );
        assert_eq!(
            template.cloud_image_url(),
            "https://dl.rockylinux.org/pub/rocky/10/images/x86_64/Rocky-10-GenericCloud-Base.latest.x86_64.qcow2"
        );
        assert_eq!(template.default_template_name(), "rockylinux-10.0");
    }

    #[test]
    fn major_only_release_is_malformed() {
        let release = ReleaseCandidate::new(
            DistributionFamily::RockyLinux,
            VersionLabel::parse("10").unwrap(),
            None,
            None,
        );
        assert!(matches!(
            derive(&release).unwrap_err(),
            ResolverError::MalformedRelease { .. }
        ));
    }
}
