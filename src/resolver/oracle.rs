use std::sync::OnceLock;

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{FamilyStrategy, ResolverError, fetch_text, listing_url, newest_unique};
use crate::release::{DistributionFamily, ReleaseCandidate, ResolvedTemplate, VersionLabel};

const YUM_BASE: &str = "https://yum.oracle.com";

/// Per-major template descriptor published next to the images.
#[derive(Debug, Clone, Deserialize)]
struct TemplateDescriptor {
    version: String,
    release: String,
    base_url: String,
    qcow2: String,
}

fn descriptor_href_regex() -> &'static Regex {
    static HREF_RE: OnceLock<Regex> = OnceLock::new();
    HREF_RE.get_or_init(|| {
        Regex::new(r#"href="(?P<path>[^"]*OL(?P<major>\d+)[^"]*x86_64[^"]*\.json)""#)
            .expect("invalid Oracle descriptor href regex")
    })
}

/// Descriptor links from the templates page, in page order, one per major.
/// The x86_64 requirement in the pattern drops the aarch64 variants.
fn parse_descriptor_paths(html: &str) -> Vec<(u32, String)> {
    let mut seen_majors = Vec::new();
    let mut paths = Vec::new();

    for caps in descriptor_href_regex().captures_iter(html) {
        let Ok(major) = caps["major"].parse::<u32>() else {
            continue;
        };
        if seen_majors.contains(&major) {
            continue;
        }
        seen_majors.push(major);
        paths.push((major, caps["path"].to_string()));
    }

    paths
}

fn descriptor_url(page_url: &str, path: &str) -> Result<String, ResolverError> {
    Url::parse(page_url)
        .and_then(|page| page.join(path))
        .map(Url::into)
        .map_err(|err| {
            ResolverError::discovery(
                DistributionFamily::OracleLinux,
                anyhow::Error::new(err).context(format!("resolve descriptor link '{path}'")),
            )
        })
}

async fn fetch_descriptor(
    client: &Client,
    url: &str,
) -> Result<TemplateDescriptor, ResolverError> {
    let family = DistributionFamily::OracleLinux;
    let body = fetch_text(client, family, url).await?;
    serde_json::from_str(&body).map_err(|err| {
        ResolverError::discovery(
            family,
            anyhow::Error::new(err).context(format!("parse descriptor JSON from {url}")),
        )
    })
}

fn candidate_from_descriptor(descriptor: &TemplateDescriptor) -> Option<ReleaseCandidate> {
    let label = format!("{}.{}", descriptor.version, descriptor.release);
    let version = VersionLabel::parse(&label)?;
    Some(ReleaseCandidate::new(
        DistributionFamily::OracleLinux,
        version,
        Some(descriptor.release.clone()),
        None,
    ))
}

/// Compose the final parameters from a fetched descriptor. Pure, so the
/// derivation stays deterministic for a fixed descriptor document.
fn resolve_from_descriptor(
    descriptor: &TemplateDescriptor,
) -> Result<ResolvedTemplate, ResolverError> {
    let family = DistributionFamily::OracleLinux;

    // The qcow2 field is a filename, but tolerate a path.
    let filename = descriptor
        .qcow2
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ResolverError::malformed(family, "descriptor has an empty qcow2 field"))?
        .to_string();

    let base = descriptor.base_url.trim_end_matches('/');
    let url = if base.starts_with('/') {
        format!("{YUM_BASE}{base}/{filename}")
    } else {
        format!("{YUM_BASE}/{base}/{filename}")
    };
    let template_name = format!("oraclelinux-{}.{}", descriptor.version, descriptor.release);

    Ok(ResolvedTemplate::new(family, url, filename, template_name))
}

pub(super) struct OracleStrategy;

#[async_trait]
impl FamilyStrategy for OracleStrategy {
    fn family(&self) -> DistributionFamily {
        DistributionFamily::OracleLinux
    }

    async fn list_releases(
        &self,
        client: &Client,
        limit: usize,
    ) -> Result<Vec<ReleaseCandidate>, ResolverError> {
        let family = self.family();
        let page_url = listing_url(family)?;
        let html = fetch_text(client, family, page_url).await?;

        let mut paths = parse_descriptor_paths(&html);
        paths.truncate(limit);

        // One descriptor fetch per major; a failed fetch drops that major only.
        let descriptors = join_all(paths.iter().map(|(_, path)| async move {
            let url = descriptor_url(page_url, path).ok()?;
            fetch_descriptor(client, &url).await.ok()
        }))
        .await;

        let candidates = descriptors
            .into_iter()
            .flatten()
            .filter_map(|descriptor| candidate_from_descriptor(&descriptor))
            .collect();

        Ok(newest_unique(candidates, limit))
    }

    async fn derive_params(
        &self,
        client: &Client,
        release: &ReleaseCandidate,
    ) -> Result<ResolvedTemplate, ResolverError> {
        let family = self.family();
        if release.version().minor().is_none() {
            return Err(ResolverError::malformed(
                family,
                "release label must have the version.release shape",
            ));
        }
        let major = release.version().major();

        let page_url = listing_url(family)?;
        let html = fetch_text(client, family, page_url).await?;

        let path = parse_descriptor_paths(&html)
            .into_iter()
            .find(|(descriptor_major, _)| *descriptor_major == major)
            .map(|(_, path)| path)
            .ok_or_else(|| {
                ResolverError::discovery(
                    family,
                    anyhow::anyhow!("no x86_64 template descriptor for major {major}"),
                )
            })?;

        let url = descriptor_url(page_url, &path)?;
        let descriptor = fetch_descriptor(client, &url).await?;
        resolve_from_descriptor(&descriptor)
    }
}
