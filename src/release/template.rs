use super::DistributionFamily;

/// Fully derived build parameters for one selected release: everything the
/// downstream download / customize / provision steps need.
///
/// Derivation from (family, release) is deterministic, so two resolutions of
/// the same selection compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    family: DistributionFamily,
    cloud_image_url: String,
    local_filename: String,
    default_template_name: String,
}

impl ResolvedTemplate {
    pub fn new(
        family: DistributionFamily,
        cloud_image_url: String,
        local_filename: String,
        default_template_name: String,
    ) -> Self {
        Self {
            family,
            cloud_image_url,
            local_filename,
            default_template_name,
        }
    }

    pub fn family(&self) -> DistributionFamily {
        self.family
    }

    pub fn cloud_image_url(&self) -> &str {
        &self.cloud_image_url
    }

    pub fn local_filename(&self) -> &str {
        &self.local_filename
    }

    pub fn default_template_name(&self) -> &str {
        &self.default_template_name
    }
}
