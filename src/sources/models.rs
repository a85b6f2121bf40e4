use serde::Deserialize;

/// One configured release-listing endpoint; serde stays confined to this
/// module tree.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub(crate) name: String,
    pub(crate) url: String,
}

impl Source {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}
