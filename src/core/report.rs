use serde::{Deserialize, Serialize};

use crate::core::{BucketDetail, Identity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub buckets_scanned: u64,
    pub public_buckets_found: u64,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub tool_version: String,
    pub generated_at: String,
    pub account: Identity,
    pub summary: ReportSummary,
    pub vulnerable_buckets: Vec<String>,
    pub details: Vec<BucketDetail>,
}

impl Report {
    /// Profile-scoped runs keep the historical per-profile file name so
    /// reports from different accounts never collide in one directory.
    pub fn file_name(&self) -> String {
        match &self.account.profile_name {
            Some(profile) => {
                format!("s3_audit_report_{profile}_{}.json", self.account.account_id)
            }
            None => "audit_report.json".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_for(profile: Option<&str>) -> Report {
        Report {
            schema_version: "1.0".to_string(),
            tool_version: "0.1.0".to_string(),
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            account: Identity {
                account_id: "111122223333".to_string(),
                principal_name: "alice".to_string(),
                profile_name: profile.map(ToOwned::to_owned),
            },
            summary: ReportSummary {
                buckets_scanned: 0,
                public_buckets_found: 0,
                notes: vec![],
            },
            vulnerable_buckets: vec![],
            details: vec![],
        }
    }

    #[test]
    fn file_name_is_fixed_without_a_profile() {
        assert_eq!(report_for(None).file_name(), "audit_report.json");
    }

    #[test]
    fn file_name_includes_profile_and_account() {
        assert_eq!(
            report_for(Some("staging")).file_name(),
            "s3_audit_report_staging_111122223333.json"
        );
    }
}
