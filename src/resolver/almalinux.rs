use std::sync::OnceLock;

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use reqwest::Client;

use super::{FamilyStrategy, ResolverError, fetch_text, listing_url, newest_unique};
use crate::release::{DistributionFamily, ReleaseCandidate, ResolvedTemplate, VersionLabel};

const REPO_BASE: &str = "https://repo.almalinux.org/almalinux";

fn images_dir_url(major: u32) -> String {
    format!("{REPO_BASE}/{major}/cloud/x86_64/images/")
}

fn wiki_major_regex() -> &'static Regex {
    static MAJOR_RE: OnceLock<Regex> = OnceLock::new();
    MAJOR_RE.get_or_init(|| {
        Regex::new(r"AlmaLinux (?:OS )?(?P<major>\d{1,2})\b")
            .expect("invalid AlmaLinux wiki major regex")
    })
}

fn generic_cloud_regex() -> &'static Regex {
    static FILE_RE: OnceLock<Regex> = OnceLock::new();
    FILE_RE.get_or_init(|| {
        Regex::new(r"AlmaLinux-(?P<major>\d+)-GenericCloud-(?P<version>\d+\.\d+)-")
            .expect("invalid AlmaLinux GenericCloud filename regex")
    })
}

/// Major versions advertised on the wiki page, newest first.
fn parse_wiki_majors(html: &str) -> Vec<u32> {
    let mut majors: Vec<u32> = wiki_major_regex()
        .captures_iter(html)
        .filter_map(|caps| caps["major"].parse().ok())
        .collect();

    majors.sort_unstable();
    majors.dedup();
    majors.reverse();
    majors
}

/// The newest GenericCloud point release named in one major's image
/// directory listing.
fn parse_latest_point(html: &str, major: u32) -> Option<VersionLabel> {
    generic_cloud_regex()
        .captures_iter(html)
        .filter(|caps| caps["major"].parse() == Ok(major))
        .filter_map(|caps| VersionLabel::parse(&caps["version"]))
        .max()
}

fn derive(release: &ReleaseCandidate) -> Result<ResolvedTemplate, ResolverError> {
    let family = DistributionFamily::AlmaLinux;
    let version = release.version();
    let minor = version.minor_str().ok_or_else(|| {
        ResolverError::malformed(family, "release is missing its point-release component")
    })?;
    let major = version.major();

    let filename = format!("AlmaLinux-{major}-GenericCloud-latest.x86_64.qcow2");
    let url = format!("{REPO_BASE}/{major}/cloud/x86_64/images/{filename}");
    let template_name = format!("almalinux-{major}.{minor}");

    Ok(ResolvedTemplate::new(family, url, filename, template_name))
}

pub(super) struct AlmaLinuxStrategy;

#[async_trait]
impl FamilyStrategy for AlmaLinuxStrategy {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::AlmaLinux
    }

    async fn list_releases(
        &self,
        client: &Client,
        limit: usize,
    ) -> Result<Vec<ReleaseCandidate>, ResolverError> {
        let family = self.family();
        let wiki_url = listing_url(family)?;
        let wiki_html = fetch_text(client, family, wiki_url).await?;

        let mut majors = parse_wiki_majors(&wiki_html);
        majors.truncate(limit);

        // One listing fetch per advertised major; a failed or empty listing
        // drops that major only.
        let listings = join_all(majors.iter().map(|&major| async move {
            let html = fetch_text(client, family, &images_dir_url(major)).await.ok()?;
            parse_latest_point(&html, major)
        }))
        .await;

        let candidates = listings
            .into_iter()
            .flatten()
            .map(|version| {
                let point = version.minor_str().map(str::to_string);
                ReleaseCandidate::new(family, version, point, None)
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
