use std::io::{self, Write};
use std::path::Path;

use anyhow::Error;

use crate::core::Report;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
    pub verbose: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(
        stderr,
        "  - re-run with `--verbose` for request-level detail"
    );
    let _ = writeln!(
        stderr,
        "  - see `s3audit --help` for available commands and options"
    );
}

pub fn print_audit_banner(target: Option<&str>, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let target = target.unwrap_or("current credentials");
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{}", "=".repeat(64));
    let _ = writeln!(out, "S3 public-access audit: {target}");
    let _ = writeln!(out, "{}", "=".repeat(64));
}

pub fn print_summary(report: &Report, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }

    let mut out = io::stdout().lock();

    let profile = report.account.profile_name.as_deref().unwrap_or("-");
    let _ = writeln!(
        out,
        "account={}  principal={}  profile={}",
        report.account.account_id, report.account.principal_name, profile
    );
    let _ = writeln!(
        out,
        "buckets scanned={}  public={}",
        report.summary.buckets_scanned, report.summary.public_buckets_found
    );
    for note in &report.summary.notes {
        let _ = writeln!(out, "- {note}");
    }

    if report.vulnerable_buckets.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No buckets with potential public access.");
        return;
    }

    let total = report.details.len();
    let rows = cfg.max_table_rows.max(1).min(total);

    let _ = writeln!(out);
    if total > rows {
        let _ = writeln!(out, "Buckets at risk (showing {rows} of {total}):");
    } else {
        let _ = writeln!(out, "Buckets at risk ({total}):");
    }
    for detail in report.details.iter().take(rows) {
        let _ = writeln!(
            out,
            "- {} [{}] website={} objects={}",
            detail.bucket_name,
            format_exposure(cfg.color),
            if detail.static_website { "yes" } else { "no" },
            detail.object_count
        );
    }
    if total > rows {
        let _ = writeln!(out, "- ... ({} more)", total - rows);
    }
}

pub fn print_saved(path: &Path, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "Report saved to '{}'", path.display());
}

pub fn print_skipped_profile(profile: &str, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "Skipping profile '{profile}'.");
}

pub fn print_no_profiles(path: &Path, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let _ = writeln!(
        out,
        "No eligible profiles in '{}'; nothing to audit.",
        path.display()
    );
}

pub fn print_profile_failure(profile: &str, err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "audit failed for profile '{profile}': {err:#}");
}

fn format_exposure(color: bool) -> String {
    if color {
        "\x1b[31mPUBLIC\x1b[0m".to_string()
    } else {
        "PUBLIC".to_string()
    }
}
