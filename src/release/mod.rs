mod candidate;
mod family;
mod template;
mod version;

pub use candidate::ReleaseCandidate;
pub use family::DistributionFamily;
pub use template::ResolvedTemplate;
pub use version::VersionLabel;
