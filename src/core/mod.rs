mod bucket;
mod identity;
mod report;

pub use bucket::{BucketDetail, BucketSummary, PublicAccessBlock, RiskAssessment};
pub use identity::Identity;
pub use report::{Report, ReportSummary};
