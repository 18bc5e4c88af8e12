mod collectors;
mod config;
mod dispatch;
mod error;
mod models;
mod parsers;
mod status;
mod util;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use collectors::identity::{self, GroupEntry, Identity};
use crossterm::style::Stylize;
use logforth::{
    append,
    filter::{env_filter::EnvFilterBuilder, EnvFilter},
};
use parsers::EntityKind;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quota-report", about = "Quota usage for a user and their groups across quota, Lustre, GPFS, BeeGFS and NFS4", version)]
struct Cli {
    /// No colors or other terminal escapes
    #[arg(short, long)]
    plain_text: bool,

    /// Report all space values in tebibytes
    #[arg(short, long)]
    tebibytes: bool,

    /// Only report these groups (repeatable); non-member groups are looked up by name
    #[arg(short, long = "group", value_name = "NAME")]
    groups: Vec<String>,

    /// Report for another account instead of the invoking user
    #[arg(long, value_name = "NAME")]
    user: Option<String>,

    /// Print a JSON snapshot of all records and exit
    #[arg(long)]
    json: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Print config file path and current values, then exit
    #[arg(long)]
    print_config: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(Debug)]
struct LogLayout;

impl logforth::layout::Layout for LogLayout {
    fn format(
        &self,
        record: &log::Record,
        _diagnostics: &[Box<dyn logforth::Diagnostic>],
    ) -> anyhow::Result<Vec<u8>> {
        let level = match record.level() {
            log::Level::Error => "ERROR".red().bold(),
            log::Level::Warn  => "WARN".yellow().bold(),
            log::Level::Info  => "INFO".green().bold(),
            log::Level::Debug => "DEBUG".blue().bold(),
            log::Level::Trace => "TRACE".magenta().bold(),
        };
        Ok(format!("[{}] {}", level, record.args()).into_bytes())
    }
}

fn init_logging() {
    let filter = EnvFilterBuilder::try_from_env("QUOTA_REPORT_LOG").unwrap_or_else(|| {
        let default_level = if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        };
        EnvFilterBuilder::new().filter_level(default_level)
    });

    logforth::builder()
        .dispatch(|d| {
            d.filter(EnvFilter::new(filter))
                .append(append::Stderr::default().with_layout(LogLayout))
        })
        .apply();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if let Some(shell) = cli.completions {
        clap_complete::generate(shell, &mut Cli::command(), "quota-report", &mut std::io::stdout());
        return Ok(());
    }

    let mut cfg = match &cli.config_file {
        Some(path) => config::Config::load_from(path)?,
        None => config::Config::load(),
    };
    cfg.validate().context("invalid configuration")?;
    cfg.general.plain_text |= cli.plain_text;
    cfg.general.tebibytes |= cli.tebibytes;

    if cli.print_config {
        return run_print_config(&cfg, cli.config_file.as_deref());
    }

    let who = match &cli.user {
        Some(name) => identity::lookup(name)?,
        None => identity::current()?,
    };
    log::debug!("reporting for {} ({} groups)", who.user, who.groups.len());

    let groups = select_groups(&who, &cli.groups, cfg.groups.private_gid_max)?;
    let mounts = collectors::mounts::read_mounts()?;
    let sub_group = cfg.sub_group_regex()?;

    let planner = dispatch::Planner { cfg: &cfg, mounts: &mounts, sub_group: &sub_group };
    let jobs = planner.plan(&who.user, &groups, &dispatch::list_group_dirs)?;
    let records = dispatch::run(&jobs, &who.user, &cfg, &sub_group, &collectors::tools::run);

    if cli.json {
        let snapshot = serde_json::json!({
            "quota_report_version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Local::now().to_rfc3339(),
            "user":      who.user,
            "records":   records,
        });
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let opts = util::report::ReportOptions {
        plain_text:             cfg.general.plain_text,
        normalize_to_tebibytes: cfg.general.tebibytes,
    };
    for line in util::report::render(&records, &opts) {
        println!("{}", line);
    }
    Ok(())
}

/// The user's own groups, or just the ones named with `-g`.
fn select_groups(who: &Identity, wanted: &[String], private_gid_max: u32) -> Result<Vec<(GroupEntry, EntityKind)>> {
    let hint = |g: &GroupEntry| identity::classify(g, &who.user, private_gid_max);

    if wanted.is_empty() {
        return Ok(who.groups.iter().map(|g| (g.clone(), hint(g))).collect());
    }

    let mut out = Vec::with_capacity(wanted.len());
    for name in wanted {
        if let Some(g) = who.groups.iter().find(|g| &g.name == name) {
            out.push((g.clone(), hint(g)));
            continue;
        }
        match identity::group(name)? {
            Some(g) => out.push((g, EntityKind::AdminGroup)),
            None => log::warn!("unknown group {}", name),
        }
    }
    Ok(out)
}

fn run_print_config(cfg: &config::Config, explicit: Option<&std::path::Path>) -> Result<()> {
    let path = explicit
        .map(|p| p.to_path_buf())
        .or_else(config::Config::config_path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
