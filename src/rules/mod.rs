use tracing::warn;

use crate::core::{PublicAccessBlock, RiskAssessment};
use crate::provider::ProviderError;

/// Collapse the public-access-block fetch outcome into the exposure flag.
///
/// A bucket is at risk unless all four block flags are enabled. An absent
/// configuration means public access is not denied by this control, so it is
/// at risk. An unreadable configuration is unverified-safe and is flagged for
/// human review rather than silently cleared.
pub fn assess(
    bucket_name: &str,
    fetched: Result<PublicAccessBlock, ProviderError>,
) -> RiskAssessment {
    let is_public = match fetched {
        Ok(config) => !config.fully_enabled(),
        Err(ProviderError::ConfigurationAbsent) => true,
        Err(err) => {
            warn!(bucket = bucket_name, error = %err, "public access block unreadable; flagging for review");
            true
        }
    };

    RiskAssessment {
        bucket_name: bucket_name.to_string(),
        is_public,
    }
}
