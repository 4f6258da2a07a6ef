use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub name: String,
}

/// The four account-level controls S3 exposes per bucket. Public access is
/// considered blocked only when all four are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub const fn fully_enabled(self) -> bool {
        self.block_public_acls
            && self.ignore_public_acls
            && self.block_public_policy
            && self.restrict_public_buckets
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub bucket_name: String,
    pub is_public: bool,
}

/// Supplementary facts gathered for a bucket flagged at risk.
/// `object_count` always equals `object_keys.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDetail {
    pub bucket_name: String,
    pub public_access: bool,
    pub static_website: bool,
    pub object_count: u64,
    pub object_keys: Vec<String>,
}
