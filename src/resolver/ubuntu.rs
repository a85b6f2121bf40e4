use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;

use super::{FamilyStrategy, ResolverError, fetch_text, listing_url, newest_unique};
use crate::release::{DistributionFamily, ReleaseCandidate, ResolvedTemplate, VersionLabel};

const CLOUD_IMAGES_BASE: &str = "https://cloud-images.ubuntu.com";

fn lts_line_regex() -> &'static Regex {
    static LINE_RE: OnceLock<Regex> = OnceLock::new();
    LINE_RE.get_or_init(|| {
        Regex::new(
            r"Ubuntu (?P<version>\d+\.\d+)(?:\.\d+)? LTS \((?P<codename>[A-Z][a-z]+ [A-Z][a-z]+)\)",
        )
        .expect("invalid Ubuntu LTS line regex")
    })
}

/// Extract LTS releases from the releases index page.
///
/// The page repeats each release several times (point releases, torrent
/// links); candidates are deduplicated by version label. Daily-build
/// marketing rows are dropped before matching.
fn parse_release_index(html: &str) -> Vec<ReleaseCandidate> {
    let mut by_version: BTreeMap<VersionLabel, String> = BTreeMap::new();

    for line in html.lines() {
        if line.to_ascii_lowercase().contains("daily") {
            continue;
        }
        for caps in lts_line_regex().captures_iter(line) {
            let Some(version) = VersionLabel::parse(&caps["version"]) else {
                continue;
            };
            by_version
                .entry(version)
                .or_insert_with(|| caps["codename"].to_string());
        }
    }

    by_version
        .into_iter()
        .rev()
        .map(|(version, codename)| {
            ReleaseCandidate::new(DistributionFamily::Ubuntu, version, None, Some(codename))
        })
        .collect()
}

fn derive(release: &ReleaseCandidate) -> Result<ResolvedTemplate, ResolverError> {
    let family = DistributionFamily::Ubuntu;

    let codename = release
        .codename()
        .ok_or_else(|| ResolverError::malformed(family, "release is missing its code name"))?;
    let shortcode = codename
        .split_whitespace()
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ResolverError::malformed(family, "release code name is empty"))?
        .to_ascii_lowercase();

    let filename = format!("{shortcode}-server-cloudimg-amd64.img");
    let url = format!("{CLOUD_IMAGES_BASE}/{shortcode}/current/{filename}");
    let template_name = format!("ubuntu-{}-{}", release.version(), shortcode);

    Ok(ResolvedTemplate::new(family, url, filename, template_name))
}

pub(super) struct UbuntuStrategy;

#[async_trait]
impl FamilyStrategy for UbuntuStrategy {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::Ubuntu
    }

    async fn list_releases(
        &self,
        client: &Client,
        limit: usize,
    ) -> Result<Vec<ReleaseCandidate>, ResolverError> {
        let url = listing_url(self.family())?;
        let html = fetch_text(client, self.family(), url).await?;

        Ok(newest_unique(parse_release_index(&html), limit))
    }

    async fn derive_params(
        &self,
        _client: &Client,
        release: &ReleaseCandidate,
    ) -> Result<ResolvedTemplate, ResolverError> {
        derive(release)
    }
}
