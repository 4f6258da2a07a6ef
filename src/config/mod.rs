use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub audit: AuditConfig,
    pub report: ReportConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditConfig {
    pub skip_profiles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub output_dir: String,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 20,
            },
            audit: AuditConfig {
                skip_profiles: vec!["default".to_string()],
                credentials_file: None,
            },
            report: ReportConfig {
                output_dir: ".".to_string(),
            },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    audit: Option<RawAuditConfig>,
    report: Option<RawReportConfig>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawAuditConfig {
    skip_profiles: Option<Vec<String>>,
    credentials_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReportConfig {
    output_dir: Option<String>,
}

pub fn effective_home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("HOME is not set"))
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/s3audit/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(audit) = raw.audit {
        if let Some(skip_profiles) = audit.skip_profiles {
            cfg.audit.skip_profiles = skip_profiles;
        }
        if let Some(credentials_file) = audit.credentials_file {
            cfg.audit.credentials_file = Some(credentials_file);
        }
    }

    if let Some(report) = raw.report {
        if let Some(output_dir) = report.output_dir {
            cfg.report.output_dir = output_dir;
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("S3AUDIT_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "S3AUDIT_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("S3AUDIT_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "S3AUDIT_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("S3AUDIT_AUDIT_SKIP_PROFILES") {
        let parts: Vec<String> = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        cfg.audit.skip_profiles = parts;
    }
    if let Ok(v) = std::env::var("S3AUDIT_AUDIT_CREDENTIALS_FILE") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.audit.credentials_file = Some(v.to_string());
        }
    }
    if let Ok(v) = std::env::var("S3AUDIT_REPORT_OUTPUT_DIR") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.report.output_dir = v.to_string();
        }
    }

    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
