use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::config::EffectiveConfig;
use crate::core::Report;
use crate::engine::{Engine, EngineOptions};
use crate::provider::AwsProvider;
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "s3audit",
    version,
    about = "Audit S3 buckets for public-access exposure and write a JSON report per account"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Audit the account behind the ambient credentials or one named profile.
    Audit(AuditArgs),
    /// Audit every profile configured in the shared credentials file.
    Profiles(ProfilesArgs),
    Config(ConfigArgs),
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub profile: Option<String>,
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ProfilesArgs {
    #[arg(long)]
    pub credentials_file: Option<PathBuf>,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::config::effective_home_dir()?;
    let env_config_path = std::env::var_os("S3AUDIT_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;
    let ui_cfg = UiConfig {
        color,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let engine = Engine::new(EngineOptions {
        show_progress: stderr_is_tty && !cli.quiet && !cli.json,
    });

    match cli.command {
        Commands::Audit(args) => run_audit(&engine, &cfg, &ui_cfg, cli.json, args).await,
        Commands::Profiles(args) => {
            run_profiles(&engine, &cfg, &ui_cfg, cli.json, args, &home_dir).await
        }
        Commands::Config(args) => {
            if args.show {
                write_json(&cfg)
            } else {
                Err(crate::exit::invalid_args("config: specify --show"))
            }
        }
        Commands::Completion(args) => completion(&args.shell),
    }
}

async fn run_audit(
    engine: &Engine,
    cfg: &EffectiveConfig,
    ui_cfg: &UiConfig,
    json: bool,
    args: AuditArgs,
) -> Result<()> {
    crate::ui::print_audit_banner(args.profile.as_deref(), ui_cfg);

    let provider = match &args.profile {
        Some(profile) => AwsProvider::for_profile(profile).await,
        None => AwsProvider::from_env().await,
    };
    let report = engine.audit(&provider, args.profile.as_deref()).await?;

    let path = args
        .output
        .unwrap_or_else(|| Path::new(&cfg.report.output_dir).join(report.file_name()));
    write_report_file(&report, &path)?;

    if json {
        write_json(&report)?;
    } else {
        crate::ui::print_summary(&report, ui_cfg);
        crate::ui::print_saved(&path, ui_cfg);
    }
    Ok(())
}

async fn run_profiles(
    engine: &Engine,
    cfg: &EffectiveConfig,
    ui_cfg: &UiConfig,
    json: bool,
    args: ProfilesArgs,
    home_dir: &Path,
) -> Result<()> {
    let override_path = args
        .credentials_file
        .or_else(|| cfg.audit.credentials_file.as_ref().map(PathBuf::from));
    let credentials_file = crate::profiles::credentials_path(home_dir, override_path.as_deref());

    let all = crate::profiles::list_profiles(&credentials_file)
        .map_err(crate::exit::invalid_args_err)?;

    let mut eligible = Vec::new();
    for profile in all {
        if cfg.audit.skip_profiles.contains(&profile) {
            crate::ui::print_skipped_profile(&profile, ui_cfg);
        } else {
            eligible.push(profile);
        }
    }

    if eligible.is_empty() {
        crate::ui::print_no_profiles(&credentials_file, ui_cfg);
        return Ok(());
    }

    let run = engine
        .audit_profiles(&eligible, |profile: String| async move {
            AwsProvider::for_profile(&profile).await
        })
        .await;

    for failure in &run.failures {
        crate::ui::print_profile_failure(&failure.profile, &failure.error);
    }

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&cfg.report.output_dir));
    for report in &run.reports {
        let path = output_dir.join(report.file_name());
        write_report_file(report, &path)?;
        if json {
            write_json(report)?;
        } else {
            crate::ui::print_summary(report, ui_cfg);
            crate::ui::print_saved(&path, ui_cfg);
        }
    }

    Ok(())
}

fn write_report_file(report: &Report, path: &Path) -> Result<()> {
    let write = || -> Result<()> {
        let buf = serde_json::to_vec_pretty(report)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, buf)?;
        Ok(())
    };
    write().map_err(|err| {
        crate::exit::report_write_err(
            err.context(format!("failed to write report file: {}", path.display())),
        )
    })
}

fn write_json<T: serde::Serialize>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn completion(shell: &str) -> Result<()> {
    use clap_complete::{Shell, generate};

    let shell: Shell = shell
        .parse()
        .map_err(|_| crate::exit::invalid_args(format!("unsupported shell: {shell}")))?;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_directive = if verbose {
        "s3audit=debug,warn"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn audit_accepts_profile_and_output() {
        let cli = Cli::parse_from([
            "s3audit", "audit", "--profile", "staging", "--output", "out.json",
        ]);
        match cli.command {
            Commands::Audit(args) => {
                assert_eq!(args.profile.as_deref(), Some("staging"));
                assert_eq!(args.output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::parse_from(["s3audit", "profiles", "--json", "--quiet"]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Profiles(_)));
    }
}
