mod almalinux;
mod centos;
mod oracle;
mod rocky;
mod ubuntu;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::release::{DistributionFamily, ReleaseCandidate, ResolvedTemplate};
use crate::sources;

pub const DEFAULT_RELEASE_LIMIT: usize = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const FAMILY_DEADLINE: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("pve-template-resolver/", env!("CARGO_PKG_VERSION"));

#[derive(thiserror::Error, Debug)]
pub enum ResolverError {
    /// Network failure, timeout, or an unusable source document for one
    /// family. Scoped: callers may skip the family and keep the rest.
    #[error("discovery failed for {family}: {cause:#}")]
    Discovery {
        family: DistributionFamily,
        cause: anyhow::Error,
    },

    /// A family name outside the supported enumeration.
    #[error("unsupported distribution family '{0}'")]
    UnsupportedFamily(String),

    /// A release candidate that does not fit its family's expected shape;
    /// deriving from it would produce a wrong URL, so it is a hard stop for
    /// that derivation only.
    #[error("malformed release for {family}: {reason}")]
    MalformedRelease {
        family: DistributionFamily,
        reason: String,
    },
}

impl ResolverError {
    pub(crate) fn discovery(family: DistributionFamily, cause: impl Into<anyhow::Error>) -> Self {
        ResolverError::Discovery {
            family,
            cause: cause.into(),
        }
    }

    pub(crate) fn malformed(family: DistributionFamily, reason: impl Into<String>) -> Self {
        ResolverError::MalformedRelease {
            family,
            reason: reason.into(),
        }
    }
}

/// One scraping/derivation strategy per distribution family.
///
/// `list_releases` turns the family's listing source into candidates;
/// `derive_params` turns one selected candidate into build parameters.
/// Derivation is pure except for Oracle Linux, which must refetch its JSON
/// descriptor to learn the exact artifact filename.
#[async_trait]
pub trait FamilyStrategy: Send + Sync {
    fn family(&self) -> DistributionFamily;

    async fn list_releases(
        &self,
        client: &Client,
        limit: usize,
    ) -> Result<Vec<ReleaseCandidate>, ResolverError>;

    async fn derive_params(
        &self,
        client: &Client,
        release: &ReleaseCandidate,
    ) -> Result<ResolvedTemplate, ResolverError>;
}

pub fn strategy_for(family: DistributionFamily) -> &'static dyn FamilyStrategy {
    match family {
        DistributionFamily::Ubuntu => &ubuntu::UbuntuStrategy,
        DistributionFamily::AlmaLinux => &almalinux::AlmaLinuxStrategy,
        DistributionFamily::RockyLinux => &rocky::RockyStrategy,
        DistributionFamily::OracleLinux => &oracle::OracleStrategy,
        DistributionFamily::CentosStream => &centos::CentosStreamStrategy,
    }
}

/// Resolve a user- or config-supplied family name against the enumeration.
pub fn family_from_name(name: &str) -> Result<DistributionFamily, ResolverError> {
    DistributionFamily::from_name(name)
        .ok_or_else(|| ResolverError::UnsupportedFamily(name.to_string()))
}

/// The most recent `limit` releases for one family, newest first.
pub async fn list_recent_releases(
    client: &Client,
    family: DistributionFamily,
    limit: usize,
) -> Result<Vec<ReleaseCandidate>, ResolverError> {
    strategy_for(family).list_releases(client, limit.max(1)).await
}

/// Derive download/template parameters for one selected release.
pub async fn derive_template_params(
    client: &Client,
    family: DistributionFamily,
    release: &ReleaseCandidate,
) -> Result<ResolvedTemplate, ResolverError> {
    if release.family() != family {
        return Err(ResolverError::malformed(
            family,
            format!("release candidate belongs to {}", release.family()),
        ));
    }
    strategy_for(family).derive_params(client, release).await
}

/// Discovery outcome for one family; failures stay in their own slot.
#[derive(Debug)]
pub struct FamilyDiscovery {
    pub family: DistributionFamily,
    pub outcome: Result<Vec<ReleaseCandidate>, ResolverError>,
}

/// Run discovery for every supported family concurrently.
///
/// Each family gets its own deadline and its own result slot; a failure or
/// timeout in one never suppresses the results of the others.
pub async fn discover_all(client: &Client, limit: usize) -> Vec<FamilyDiscovery> {
    let strategies: Vec<&'static dyn FamilyStrategy> = DistributionFamily::ALL
        .iter()
        .map(|&family| strategy_for(family))
        .collect();
    discover_with(&strategies, client, limit).await
}

async fn discover_with(
    strategies: &[&dyn FamilyStrategy],
    client: &Client,
    limit: usize,
) -> Vec<FamilyDiscovery> {
    let limit = limit.max(1);
    let tasks = strategies.iter().map(|strategy| async move {
        let family = strategy.family();
        let outcome =
            match tokio::time::timeout(FAMILY_DEADLINE, strategy.list_releases(client, limit))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ResolverError::discovery(
                    family,
                    anyhow::anyhow!("discovery timed out after {}s", FAMILY_DEADLINE.as_secs()),
                )),
            };
        FamilyDiscovery { family, outcome }
    });

    futures::future::join_all(tasks).await
}

/// Final candidate assembly shared by every strategy: newest first, equal
/// version labels collapsed, at most `limit` entries.
pub(crate) fn newest_unique(
    mut candidates: Vec<ReleaseCandidate>,
    limit: usize,
) -> Vec<ReleaseCandidate> {
    candidates.sort_by(|a, b| b.version().cmp(a.version()));
    candidates.dedup_by(|a, b| a.version() == b.version());
    candidates.truncate(limit.max(1));
    candidates
}

/// Shared HTTP client for all resolver traffic.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
}

/// The configured listing URL for a family.
pub(crate) fn listing_url(family: DistributionFamily) -> Result<&'static str, ResolverError> {
    sources::url_for(family.source_key()).map_err(|err| ResolverError::discovery(family, err))
}

/// GET a text document, retrying once on transient (connect/timeout)
/// failures before surfacing a scoped discovery error.
pub(crate) async fn fetch_text(
    client: &Client,
    family: DistributionFamily,
    url: &str,
) -> Result<String, ResolverError> {
    match try_fetch(client, url).await {
        Ok(body) => Ok(body),
        Err(err) if is_transient(&err) => try_fetch(client, url)
            .await
            .map_err(|retry_err| fetch_error(family, url, retry_err)),
        Err(err) => Err(fetch_error(family, url, err)),
    }
}

async fn try_fetch(client: &Client, url: &str) -> Result<String, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.text().await
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn fetch_error(family: DistributionFamily, url: &str, err: reqwest::Error) -> ResolverError {
    ResolverError::Discovery {
        family,
        cause: anyhow::Error::new(err).context(format!("GET {url}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::VersionLabel;

    struct FailingStrategy;

    #[async_trait]
    impl FamilyStrategy for FailingStrategy {
        fn family(&self) -> DistributionFamily {
            DistributionFamily::AlmaLinux
        }

        async fn list_releases(
            &self,
            _client: &Client,
            _limit: usize,
        ) -> Result<Vec<ReleaseCandidate>, ResolverError> {
            Err(ResolverError::discovery(
                DistributionFamily::AlmaLinux,
                anyhow::anyhow!("listing source unreachable"),
            ))
        }

        async fn derive_params(
            &self,
            _client: &Client,
            release: &ReleaseCandidate,
        ) -> Result<ResolvedTemplate, ResolverError> {
            Err(ResolverError::malformed(release.family(), "stub"))
        }
    }

    struct FixedStrategy;

    #[async_trait]
    impl FamilyStrategy for FixedStrategy {
        fn family(&self) -> DistributionFamily {
            DistributionFamily::Ubuntu
        }

        async fn list_releases(
            &self,
            _client: &Client,
            _limit: usize,
        ) -> Result<Vec<ReleaseCandidate>, ResolverError> {
            Ok(vec![ReleaseCandidate::new(
                DistributionFamily::Ubuntu,
                VersionLabel::parse("24.04").unwrap(),
                None,
                Some("Noble Numbat".to_string()),
            )])
        }

        async fn derive_params(
            &self,
            _client: &Client,
            release: &ReleaseCandidate,
        ) -> Result<ResolvedTemplate, ResolverError> {
            Err(ResolverError::malformed(release.family(), "stub"))
        }
    }

    #[tokio::test]
    async fn one_failed_family_does_not_suppress_the_others() {
        let client = Client::new();
        let strategies: Vec<&dyn FamilyStrategy> = vec![&FailingStrategy, &FixedStrategy];

        let results = discover_with(&strategies, &client, 3).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].family, DistributionFamily::AlmaLinux);
        assert!(results[0].outcome.is_err());
        assert_eq!(results[1].family, DistributionFamily::Ubuntu);
        let releases = results[1].outcome.as_ref().expect("ubuntu slot should succeed");
        assert_eq!(releases.len(), 1);
    }

    #[test]
    fn family_from_name_rejects_unknown_families() {
        let err = family_from_name("Slackware").unwrap_err();
        assert!(matches!(err, ResolverError::UnsupportedFamily(name) if name == "Slackware"));
    }

    fn rocky_candidate(label: &str) -> ReleaseCandidate {
        let version = VersionLabel::parse(label).unwrap();
        let minor = version.minor_str().map(str::to_string);
        ReleaseCandidate::new(DistributionFamily::RockyLinux, version, minor, None)
    }

    #[test]
    fn newest_unique_returns_at_most_limit_entries_newest_first() {
        let candidates = vec![
            rocky_candidate("8.10"),
            rocky_candidate("10.0"),
            rocky_candidate("9.5"),
            rocky_candidate("7.9"),
        ];

        let assembled = newest_unique(candidates, 3);

        let labels: Vec<&str> = assembled.iter().map(|c| c.version().as_str()).collect();
        assert_eq!(labels, vec!["10.0", "9.5", "8.10"]);
    }

    #[test]
    fn newest_unique_collapses_duplicate_version_labels() {
        let candidates = vec![
            rocky_candidate("9.5"),
            rocky_candidate("9.4"),
            rocky_candidate("9.5"),
        ];

        let assembled = newest_unique(candidates, 3);

        let labels: Vec<&str> = assembled.iter().map(|c| c.version().as_str()).collect();
        assert_eq!(labels, vec!["9.5", "9.4"]);
    }

    #[test]
    fn newest_unique_keeps_at_least_one_entry_for_zero_limit() {
        let assembled = newest_unique(vec![rocky_candidate("9.5")], 0);
        assert_eq!(assembled.len(), 1);
    }

    #[tokio::test]
    async fn derive_rejects_family_mismatch() {
        let client = Client::new();
        let release = ReleaseCandidate::new(
            DistributionFamily::Ubuntu,
            VersionLabel::parse("24.04").unwrap(),
            None,
            Some("Noble Numbat".to_string()),
        );

        let err = derive_template_params(&client, DistributionFamily::RockyLinux, &release)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::MalformedRelease { .. }));
    }
}
