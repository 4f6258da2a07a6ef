mod aws;

pub use aws::AwsProvider;

use crate::core::{BucketSummary, PublicAccessBlock};

/// Failure taxonomy at the cloud seam. `ConfigurationAbsent` is the provider's
/// distinguished "no such configuration" answer; policy for it differs per
/// caller (the classifier flags it, the website check treats it as disabled),
/// so the distinction must survive to the call site.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("configuration not present")]
    ConfigurationAbsent,
    #[error("{0}")]
    Request(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account_id: String,
    pub arn: String,
}

impl CallerIdentity {
    pub fn principal_name(&self) -> String {
        principal_from_arn(&self.arn)
    }
}

/// The storage API surface the audit needs. Implementations must traverse all
/// pages of every listing; callers never see continuation tokens.
#[allow(async_fn_in_trait)]
pub trait StorageProvider {
    async fn caller_identity(&self) -> Result<CallerIdentity, ProviderError>;
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ProviderError>;
    async fn public_access_block(
        &self,
        bucket: &str,
    ) -> Result<PublicAccessBlock, ProviderError>;
    async fn bucket_website(&self, bucket: &str) -> Result<bool, ProviderError>;
    async fn list_object_keys(&self, bucket: &str) -> Result<Vec<String>, ProviderError>;
}

/// Last path segment of the ARN's resource part: `user/alice` is `alice`,
/// `assumed-role/Admin/session` is `session`, the account root is `root`.
pub fn principal_from_arn(arn: &str) -> String {
    let resource = arn.split(':').nth(5).unwrap_or_default();
    let name = resource.rsplit('/').next().unwrap_or(resource);
    if name.is_empty() {
        "unknown".to_string()
    } else {
        name.to_string()
    }
}
