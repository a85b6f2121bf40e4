mod helpers;
mod release;
mod resolver;
mod sources;

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};

use helpers::{choose_one, confirm, download::download_image};
use release::{DistributionFamily, ReleaseCandidate, ResolvedTemplate};
use resolver::FamilyDiscovery;

const ENDPOINTS_ENV: &str = "PVE_RESOLVER_ENDPOINTS";
const LIMIT_ENV: &str = "PVE_RESOLVER_LIMIT";

fn endpoints_file_path() -> PathBuf {
    if let Ok(path) = env::var(ENDPOINTS_ENV) {
        return PathBuf::from(path);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources").join("endpoints.json")
}

/// Menu depth: explicit env override, otherwise the hard default.
fn release_limit() -> usize {
    env::var(LIMIT_ENV)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(resolver::DEFAULT_RELEASE_LIMIT)
        .max(1)
}

fn print_selection(template: &ResolvedTemplate) {
    println!("\n=== Resolved template ===");
    println!("Family:    {}", template.family());
    println!("Image URL: {}", template.cloud_image_url());
    println!("Filename:  {}", template.local_filename());
    println!("Template:  {}", template.default_template_name());
}

/// Split the discovery outcome into selectable families, reporting failed
/// and empty families on stderr instead of hiding them.
fn selectable_families(
    discoveries: &[FamilyDiscovery],
) -> Vec<(DistributionFamily, Vec<ReleaseCandidate>)> {
    let mut selectable = Vec::new();
    for discovery in discoveries {
        match &discovery.outcome {
            Ok(releases) if releases.is_empty() => {
                eprintln!(
                    "warning: no releases discovered for {} (source format may have changed)",
                    discovery.family
                );
            }
            Ok(releases) => selectable.push((discovery.family, releases.clone())),
            Err(err) => eprintln!("warning: skipping {}: {err:#}", discovery.family),
        }
    }
    selectable
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = endpoints_file_path();
    sources::init_from_file(&path)
        .with_context(|| format!("load endpoint config {}", path.display()))?;

    let client = resolver::build_client().context("build HTTP client")?;
    let limit = release_limit();

    println!(
        "Discovering the {limit} most recent releases across {} families...",
        DistributionFamily::ALL.len()
    );
    let discoveries = resolver::discover_all(&client, limit).await;
    let selectable = selectable_families(&discoveries);
    ensure!(!selectable.is_empty(), "no distribution family produced any releases");

    let family_name = choose_one(
        "Select Distribution",
        selectable.iter().map(|(family, _)| family.as_str()).collect(),
    )?;
    let family = resolver::family_from_name(&family_name)?;

    let (_, mut releases) = selectable
        .into_iter()
        .find(|(f, _)| *f == family)
        .context("selected family vanished from the discovery set")?;

    // Oldest first in the menu; the set itself is the most recent `limit`.
    releases.sort_by(|a, b| a.version().cmp(b.version()));

    let release_label = choose_one(
        &format!("Select {family} Release"),
        releases.iter().map(|r| r.menu_label()).collect(),
    )?;
    let release = releases
        .iter()
        .find(|r| r.menu_label() == release_label)
        .context("selected release vanished from the menu set")?;

    let template = resolver::derive_template_params(&client, family, release).await?;
    print_selection(&template);

    if confirm("Download the cloud image now?")? {
        let saved = download_image(template.cloud_image_url(), template.local_filename()).await?;
        println!("Image saved to {}", saved.display());
    } else {
        println!(
            "Skipping download; fetch {} to {} when ready.",
            template.cloud_image_url(),
            template.local_filename()
        );
    }

    Ok(())
}
