use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use super::{FamilyStrategy, ResolverError, fetch_text, listing_url, newest_unique};
use crate::release::{DistributionFamily, ReleaseCandidate, ResolvedTemplate, VersionLabel};

const CLOUD_BASE: &str = "https://cloud.centos.org/centos";

fn stream_dir_regex() -> &'static Regex {
    static DIR_RE: OnceLock<Regex> = OnceLock::new();
    DIR_RE.get_or_init(|| {
        Regex::new(r#"href="(?P<major>\d+)-stream/""#)
            .expect("invalid CentOS Stream directory regex")
    })
}

/// Row-level deprecation markers used on the listing page.
fn is_retired_row(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.contains("danger") || lower.contains("deprecated")
}

/// Stream majors from the directory listing, newest first, skipping rows the
/// page flags as retired.
fn parse_stream_listing(html: &str) -> Vec<u32> {
    let mut majors: Vec<u32> = html
        .lines()
        .filter(|line| !is_retired_row(line))
        .flat_map(|line| stream_dir_regex().captures_iter(line))
        .filter_map(|caps| caps["major"].parse().ok())
        .collect();

    majors.sort_unstable();
    majors.dedup();
    majors.reverse();
    majors
}

fn derive(release: &ReleaseCandidate) -> Result<ResolvedTemplate, ResolverError> {
    let family = DistributionFamily::CentosStream;
    if release.version().minor().is_some() {
        return Err(ResolverError::malformed(
            family,
            "stream releases are identified by bare major version",
        ));
    }
    let major = release.version().major();

    let filename = format!("CentOS-Stream-GenericCloud-{major}-latest.x86_64.qcow2");
    let url = format!("{CLOUD_BASE}/{major}-stream/x86_64/images/{filename}");
    let template_name = format!("centos-{major}-stream");

    Ok(ResolvedTemplate::new(family, url, filename, template_name))
}

pub(super) struct CentosStreamStrategy;

#[async_trait]
impl FamilyStrategy for CentosStreamStrategy {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::CentosStream
    }

    async fn list_releases(
        &self,
        client: &Client,
        limit: usize,
    ) -> Result<Vec<ReleaseCandidate>, ResolverError> {
        let family = self.family();
        let url = listing_url(family)?;
        let html = fetch_text(client, family, url).await?;

        let candidates = parse_stream_listing(&html)
            .into_iter()
            .filter_map(|major| VersionLabel::parse(&major.to_string()))
            .map(|version| ReleaseCandidate::new(family, version, None, None))
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
    use super::{derive, parse_stream_listing};
    use crate::release::{DistributionFamily, ReleaseCandidate, VersionLabel};
    use crate::resolver::ResolverError;

    const LISTING_FIXTURE: &str = r#"
<tr><td><a href="10-stream/">10-stream/</a></td></tr>
<tr><td><a href="9-stream/">9-stream/</a></td></tr>
<tr class="danger"><td><a href="8-stream/">8-stream/</a> (EOL)</td></tr>
<tr><td><a href="7/">7/</a></td></tr>
"#;

    #[test]
    fn lists_stream_majors_newest_first() {
        assert_eq!(parse_stream_listing(LISTING_FIXTURE), vec![10, 9]);
    }

    #[test]
    fn skips_rows_flagged_as_retired() {
        assert!(!parse_stream_listing(LISTING_FIXTURE).contains(&8));
    }

    #[test]
    fn ignores_non_stream_directories() {
        assert!(!parse_stream_listing(LISTING_FIXTURE).contains(&7));
    }

    #[test]
    fn drifted_listing_format_yields_no_majors() {
        let html = "<html><body><h1>CentOS cloud images</h1></body></html>";
        assert!(parse_stream_listing(html).is_empty());
    }

    #[test]
    fn derives_nine_stream_parameters() {
        let release = ReleaseCandidate::new(
            DistributionFamily::CentosStream,
            VersionLabel::parse("9").unwrap(),
            None,
            None,
        );

        let template = derive(&release).unwrap();
        assert_eq!(
            template.local_filename(),
            "CentOS-Stream-GenericCloud-9-latest.x86_64.qcow2"
        );
        assert_eq!(
            template.cloud_image_url(),
            "https://cloud.centos.org/centos/9-stream/x86_64/images/CentOS-Stream-GenericCloud-9-latest.x86_64.qcow2"
        );
        assert_eq!(template.default_template_name(), "centos-9-stream");
    }

    #[test]
    fn dotted_label_is_malformed_for_streams() {
        let release = ReleaseCandidate::new(
            DistributionFamily::CentosStream,
            VersionLabel::parse("9.1").unwrap(),
            None,
            None,
        );
        assert!(matches!(
            derive(&release).unwrap_err(),
            ResolverError::MalformedRelease { .. }
        ));
    }
}
