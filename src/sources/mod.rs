mod models;

use std::{fs, path::Path, sync::OnceLock};

pub use models::Source;

/// Single, module-private registry of listing endpoints (set exactly once).
static CACHE: OnceLock<Vec<Source>> = OnceLock::new();

/// Initialize the registry from a JSON file path.
pub fn init_from_file(path: impl AsRef<Path>) -> Result<(), SourcesError> {
    let data = fs::read_to_string(path).map_err(SourcesError::Io)?;
    init_from_json_str(&data)
}

/// Initialize the registry from a JSON string.
pub fn init_from_json_str(json: &str) -> Result<(), SourcesError> {
    let parsed: Vec<Source> = serde_json::from_str(json).map_err(SourcesError::Json)?;
    CACHE
        .set(parsed)
        .map_err(|_| SourcesError::AlreadyInitialized)?;
    Ok(())
}

/// Find a configured source by its family key without cloning.
pub fn by_name(name: &str) -> Result<Option<&'static Source>, SourcesError> {
    let sources = CACHE.get().ok_or(SourcesError::NotInitialized)?;
    Ok(sources.iter().find(|s| s.name() == name))
}

/// The listing URL for a family key; errors when the key is not configured.
pub fn url_for(name: &str) -> Result<&'static str, SourcesError> {
    by_name(name)?
        .map(|s| s.url())
        .ok_or_else(|| SourcesError::MissingSource(name.to_string()))
}

#[derive(thiserror::Error, Debug)]
pub enum SourcesError {
    #[error("endpoint sources are not initialized")]
    NotInitialized,
    #[error("endpoint sources already initialized")]
    AlreadyInitialized,
    #[error("no endpoint configured for '{0}'")]
    MissingSource(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
pub(crate) fn init_for_tests() {
    let json = r#"[
        { "name": "ubuntu", "url": "https://releases.ubuntu.com/" },
        { "name": "almalinux", "url": "https://wiki.almalinux.org/cloud/Generic-cloud.html" },
        { "name": "rocky", "url": "https://dl.rockylinux.org/pub/rocky/" },
        { "name": "oracle", "url": "https://yum.oracle.com/oracle-linux-templates.html" },
        { "name": "centos-stream", "url": "https://cloud.centos.org/centos/" }
    ]"#;
    // Several tests may race to initialize; the first one wins.
    let _ = init_from_json_str(json);
}

#[cfg(test)]
mod tests {
    use super::{init_for_tests, url_for};

    #[test]
    fn url_for_returns_configured_endpoint() {
        init_for_tests();
        assert_eq!(url_for("rocky").unwrap(), "https://dl.rockylinux.org/pub/rocky/");
    }

    #[test]
    fn url_for_rejects_unknown_key() {
        init_for_tests();
        assert!(url_for("gentoo").is_err());
    }
}
