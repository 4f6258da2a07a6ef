use std::time::Duration;

use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::core::{BucketDetail, BucketSummary, Identity, Report, ReportSummary, RiskAssessment};
use crate::provider::{ProviderError, StorageProvider};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub show_progress: bool,
}

#[derive(Clone)]
pub struct Engine {
    opts: EngineOptions,
}

/// Per-run audit state. Constructed fresh for every audited identity so
/// nothing leaks between profile runs.
struct AuditContext {
    identity: Identity,
    buckets: Vec<BucketSummary>,
    assessments: Vec<RiskAssessment>,
    details: Vec<BucketDetail>,
    notes: Vec<String>,
}

impl AuditContext {
    fn new(identity: Identity) -> Self {
        Self {
            identity,
            buckets: Vec::new(),
            assessments: Vec::new(),
            details: Vec::new(),
            notes: Vec::new(),
        }
    }

    fn vulnerable_names(&self) -> Vec<String> {
        self.assessments
            .iter()
            .filter(|a| a.is_public)
            .map(|a| a.bucket_name.clone())
            .collect()
    }
}

pub struct ProfileFailure {
    pub profile: String,
    pub error: anyhow::Error,
}

pub struct ProfileRun {
    pub reports: Vec<Report>,
    pub failures: Vec<ProfileFailure>,
}

impl Engine {
    pub fn new(opts: EngineOptions) -> Self {
        Self { opts }
    }

    /// Run the full pipeline for one identity: resolve, enumerate, classify,
    /// collect details, assemble. Identity resolution failure aborts this
    /// audit; every later stage degrades instead of aborting.
    pub async fn audit<P: StorageProvider>(
        &self,
        provider: &P,
        profile_name: Option<&str>,
    ) -> Result<Report> {
        let identity = self.resolve_identity(provider, profile_name).await?;
        let mut ctx = AuditContext::new(identity);

        self.enumerate_buckets(provider, &mut ctx).await;
        self.classify_buckets(provider, &mut ctx).await;
        self.collect_details(provider, &mut ctx).await;

        Ok(self.assemble_report(ctx))
    }

    /// Audit each profile serially with a fresh provider and context. A
    /// failed profile is recorded and the run moves on to the next one.
    pub async fn audit_profiles<P, F, Fut>(
        &self,
        profiles: &[String],
        make_provider: F,
    ) -> ProfileRun
    where
        P: StorageProvider,
        F: Fn(String) -> Fut,
        Fut: Future<Output = P>,
    {
        let mut run = ProfileRun {
            reports: Vec::new(),
            failures: Vec::new(),
        };

        for profile in profiles {
            let provider = make_provider(profile.clone()).await;
            match self.audit(&provider, Some(profile)).await {
                Ok(report) => run.reports.push(report),
                Err(error) => {
                    warn!(profile = %profile, "audit failed for profile: {error:#}");
                    run.failures.push(ProfileFailure {
                        profile: profile.clone(),
                        error,
                    });
                }
            }
        }

        run
    }

    async fn resolve_identity<P: StorageProvider>(
        &self,
        provider: &P,
        profile_name: Option<&str>,
    ) -> Result<Identity> {
        let caller = provider
            .caller_identity()
            .await
            .context("identity resolution failed")?;

        Ok(Identity {
            principal_name: caller.principal_name(),
            account_id: caller.account_id,
            profile_name: profile_name.map(ToOwned::to_owned),
        })
    }

    async fn enumerate_buckets<P: StorageProvider>(&self, provider: &P, ctx: &mut AuditContext) {
        match provider.list_buckets().await {
            Ok(buckets) => ctx.buckets = buckets,
            Err(err) => {
                warn!(error = %err, "bucket listing failed; auditing zero buckets");
                ctx.notes.push(format!("bucket listing failed: {err}"));
            }
        }
    }

    async fn classify_buckets<P: StorageProvider>(&self, provider: &P, ctx: &mut AuditContext) {
        let names: Vec<String> = ctx.buckets.iter().map(|b| b.name.clone()).collect();
        for name in names {
            let fetched = provider.public_access_block(&name).await;
            ctx.assessments.push(crate::rules::assess(&name, fetched));
        }
    }

    async fn collect_details<P: StorageProvider>(&self, provider: &P, ctx: &mut AuditContext) {
        use std::io::IsTerminal;

        let vulnerable = ctx.vulnerable_names();
        if vulnerable.is_empty() {
            return;
        }

        let progress_enabled = self.opts.show_progress && std::io::stderr().is_terminal();
        let pb = if progress_enabled {
            let pb = indicatif::ProgressBar::new_spinner();
            pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        for bucket_name in vulnerable {
            if let Some(pb) = &pb {
                pb.set_message(format!("analyzing bucket {bucket_name}"));
            }

            let static_website = match provider.bucket_website(&bucket_name).await {
                Ok(enabled) => enabled,
                Err(ProviderError::ConfigurationAbsent) => false,
                Err(err) => {
                    // Unlike the classifier, an unreadable website config is
                    // not a risk signal, only an absent feature.
                    warn!(bucket = %bucket_name, error = %err, "website check failed; treating as not enabled");
                    false
                }
            };

            let object_keys = match provider.list_object_keys(&bucket_name).await {
                Ok(keys) => keys,
                Err(err) => {
                    warn!(bucket = %bucket_name, error = %err, "object listing failed; recording an empty inventory");
                    ctx.notes
                        .push(format!("object listing failed for '{bucket_name}': {err}"));
                    Vec::new()
                }
            };

            ctx.details.push(BucketDetail {
                bucket_name,
                public_access: true,
                static_website,
                object_count: object_keys.len() as u64,
                object_keys,
            });
        }

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
    }

    fn assemble_report(&self, ctx: AuditContext) -> Report {
        let vulnerable_buckets = ctx.vulnerable_names();

        let mut notes = ctx.notes;
        notes.sort();
        notes.dedup();

        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        Report {
            schema_version: "1.0".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at,
            account: ctx.identity,
            summary: ReportSummary {
                buckets_scanned: ctx.buckets.len() as u64,
                public_buckets_found: vulnerable_buckets.len() as u64,
                notes,
            },
            vulnerable_buckets,
            details: ctx.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::core::PublicAccessBlock;
    use crate::provider::CallerIdentity;

    #[derive(Default)]
    struct MockProvider {
        identity: Option<Result<CallerIdentity, ProviderError>>,
        buckets: Option<Result<Vec<BucketSummary>, ProviderError>>,
        access_blocks: HashMap<String, Result<PublicAccessBlock, ProviderError>>,
        websites: HashMap<String, Result<bool, ProviderError>>,
        objects: HashMap<String, Result<Vec<String>, ProviderError>>,
    }

    impl MockProvider {
        fn for_alice() -> Self {
            Self {
                identity: Some(Ok(CallerIdentity {
                    account_id: "111122223333".to_string(),
                    arn: "arn:aws:iam::111122223333:user/alice".to_string(),
                })),
                ..Self::default()
            }
        }

        fn with_buckets(mut self, names: &[&str]) -> Self {
            self.buckets = Some(Ok(names
                .iter()
                .map(|n| BucketSummary {
                    name: (*n).to_string(),
                })
                .collect()));
            self
        }
    }

    impl StorageProvider for MockProvider {
        async fn caller_identity(&self) -> Result<CallerIdentity, ProviderError> {
            self.identity
                .clone()
                .unwrap_or_else(|| Err(ProviderError::Request("no identity".to_string())))
        }

        async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ProviderError> {
            self.buckets.clone().unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn public_access_block(
            &self,
            bucket: &str,
        ) -> Result<PublicAccessBlock, ProviderError> {
            self.access_blocks
                .get(bucket)
                .cloned()
                .unwrap_or(Err(ProviderError::ConfigurationAbsent))
        }

        async fn bucket_website(&self, bucket: &str) -> Result<bool, ProviderError> {
            self.websites
                .get(bucket)
                .cloned()
                .unwrap_or(Err(ProviderError::ConfigurationAbsent))
        }

        async fn list_object_keys(&self, bucket: &str) -> Result<Vec<String>, ProviderError> {
            self.objects.get(bucket).cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn engine() -> Engine {
        Engine::new(EngineOptions {
            show_progress: false,
        })
    }

    fn fully_blocked() -> PublicAccessBlock {
        PublicAccessBlock {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }
    }

    #[tokio::test]
    async fn flags_unconfigured_bucket_and_counts_its_objects() {
        let mut provider = MockProvider::for_alice().with_buckets(&["b1", "b2"]);
        provider
            .access_blocks
            .insert("b2".to_string(), Ok(fully_blocked()));
        provider.objects.insert(
            "b1".to_string(),
            Ok(vec!["k1".to_string(), "k2".to_string()]),
        );

        let report = engine().audit(&provider, None).await.expect("audit");

        assert_eq!(report.account.account_id, "111122223333");
        assert_eq!(report.account.principal_name, "alice");
        assert_eq!(report.summary.buckets_scanned, 2);
        assert_eq!(report.summary.public_buckets_found, 1);
        assert_eq!(report.vulnerable_buckets, vec!["b1"]);
        assert_eq!(report.details.len(), 1);
        assert_eq!(report.details[0].bucket_name, "b1");
        assert_eq!(report.details[0].object_count, 2);
        assert_eq!(report.details[0].object_keys, vec!["k1", "k2"]);
    }

    #[tokio::test]
    async fn zero_buckets_yields_an_empty_report() {
        let provider = MockProvider::for_alice();
        let report = engine().audit(&provider, None).await.expect("audit");

        assert_eq!(report.summary.buckets_scanned, 0);
        assert_eq!(report.summary.public_buckets_found, 0);
        assert!(report.vulnerable_buckets.is_empty());
        assert!(report.details.is_empty());
    }

    #[tokio::test]
    async fn bucket_listing_failure_degrades_to_zero_buckets() {
        let mut provider = MockProvider::for_alice();
        provider.buckets = Some(Err(ProviderError::Request("access denied".to_string())));

        let report = engine().audit(&provider, None).await.expect("audit");

        assert_eq!(report.summary.public_buckets_found, 0);
        assert!(report.details.is_empty());
        assert!(
            report
                .summary
                .notes
                .iter()
                .any(|n| n.starts_with("bucket listing failed"))
        );
    }

    #[tokio::test]
    async fn identity_failure_aborts_the_audit() {
        let mut provider = MockProvider::for_alice().with_buckets(&["b1"]);
        provider.identity = Some(Err(ProviderError::Request("expired token".to_string())));

        assert!(engine().audit(&provider, None).await.is_err());
    }

    #[tokio::test]
    async fn website_check_error_never_flips_the_risk_flag() {
        let mut provider = MockProvider::for_alice().with_buckets(&["b1"]);
        provider.websites.insert(
            "b1".to_string(),
            Err(ProviderError::Request("throttled".to_string())),
        );

        let report = engine().audit(&provider, None).await.expect("audit");

        assert_eq!(report.vulnerable_buckets, vec!["b1"]);
        assert!(report.details[0].public_access);
        assert!(!report.details[0].static_website);
    }

    #[tokio::test]
    async fn website_presence_is_recorded() {
        let mut provider = MockProvider::for_alice().with_buckets(&["b1"]);
        provider.websites.insert("b1".to_string(), Ok(true));

        let report = engine().audit(&provider, None).await.expect("audit");
        assert!(report.details[0].static_website);
    }

    #[tokio::test]
    async fn object_listing_failure_records_an_empty_inventory() {
        let mut provider = MockProvider::for_alice().with_buckets(&["b1"]);
        provider.objects.insert(
            "b1".to_string(),
            Err(ProviderError::Request("timeout".to_string())),
        );

        let report = engine().audit(&provider, None).await.expect("audit");

        assert_eq!(report.vulnerable_buckets, vec!["b1"]);
        assert_eq!(report.details[0].object_count, 0);
        assert!(report.details[0].object_keys.is_empty());
        assert!(
            report
                .summary
                .notes
                .iter()
                .any(|n| n.contains("object listing failed for 'b1'"))
        );
    }

    #[tokio::test]
    async fn counts_and_lists_stay_consistent_with_many_buckets() {
        let mut provider =
            MockProvider::for_alice().with_buckets(&["open-a", "safe", "open-b", "open-c"]);
        provider
            .access_blocks
            .insert("safe".to_string(), Ok(fully_blocked()));

        let report = engine().audit(&provider, None).await.expect("audit");

        assert_eq!(report.summary.public_buckets_found, 3);
        assert_eq!(
            report.summary.public_buckets_found as usize,
            report.vulnerable_buckets.len()
        );
        assert_eq!(report.vulnerable_buckets.len(), report.details.len());
        // Enumeration order is preserved end to end.
        assert_eq!(report.vulnerable_buckets, vec!["open-a", "open-b", "open-c"]);
        for (name, detail) in report.vulnerable_buckets.iter().zip(&report.details) {
            assert_eq!(name, &detail.bucket_name);
            assert_eq!(detail.object_count as usize, detail.object_keys.len());
        }
    }

    #[tokio::test]
    async fn profile_runs_share_no_state() {
        let first = MockProvider::for_alice().with_buckets(&["leaky"]);
        let second = MockProvider::for_alice();

        let engine = engine();
        let report = engine.audit(&first, Some("one")).await.expect("audit");
        assert_eq!(report.vulnerable_buckets, vec!["leaky"]);

        let report = engine.audit(&second, Some("two")).await.expect("audit");
        assert!(report.vulnerable_buckets.is_empty());
        assert!(report.details.is_empty());
    }

    #[tokio::test]
    async fn failed_profile_is_skipped_and_the_run_continues() {
        let profiles = vec!["alpha".to_string(), "beta".to_string()];

        let run = engine()
            .audit_profiles(&profiles, |profile: String| async move {
                if profile == "alpha" {
                    let mut provider = MockProvider::for_alice();
                    provider.identity =
                        Some(Err(ProviderError::Request("invalid credentials".to_string())));
                    provider
                } else {
                    MockProvider::for_alice().with_buckets(&["b1"])
                }
            })
            .await;

        assert_eq!(run.reports.len(), 1);
        assert_eq!(run.reports[0].account.profile_name.as_deref(), Some("beta"));
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].profile, "alpha");
    }
}
