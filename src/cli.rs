//! CLI definition and dispatch.
//!
//! Stands in for the browser front end: one refresh per invocation, with
//! the dashboard view printed as text or JSON.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::analysis::alignment::TableView;
use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::indicators::{INDICATOR_REGISTRY, Indicator, find_indicator};
use crate::ingest::fred::FredClient;
use crate::logging::{self, Component};
use crate::model::EconError;
use crate::regions::{REGION_REGISTRY, find_region};
use crate::session::{DashboardView, PipelineState, Session};
use crate::verify::{self, VerificationReport};

#[derive(Parser, Debug)]
#[command(name = "econmon", about = "Metro economic indicators from FRED")]
pub struct Cli {
    /// Path to econmon.toml
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List registered indicators and regions
    List,
    /// Fetch one indicator for a set of regions and print the view
    Show {
        #[arg(short, long)]
        indicator: String,
        /// CBSA code; repeat for several regions, order is kept
        #[arg(short, long = "region", required = true)]
        regions: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// Check every region of an indicator against the live API
    Verify {
        #[arg(short, long)]
        indicator: String,
        #[arg(long)]
        json: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = execute(cli);
    if let Err(e) = &result {
        eprintln!("Error: {}", e);
    }
    ExitCode::from(exit_status(&result))
}

/// 0 on success, 2 on configuration errors, 1 on any other failure.
pub fn exit_status(result: &Result<(), EconError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(EconError::Configuration(_)) => 2,
        Err(_) => 1,
    }
}

/// Runs one command, printing its output to stdout.
pub fn execute(cli: Cli) -> Result<(), EconError> {
    if let Command::List = cli.command {
        print!("{}", render_listing());
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    logging::init_logger(
        config.log_level(),
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    match cli.command {
        Command::List => Ok(()),
        Command::Show { indicator, regions, json } => show(&config, &indicator, &regions, json),
        Command::Verify { indicator, json } => run_verify(&config, &indicator, json),
    }
}

fn show(config: &Config, indicator_key: &str, codes: &[String], json: bool) -> Result<(), EconError> {
    let mut session = Session::new(indicator_key, config.fred.search_limit)?;
    let codes: Vec<&str> = codes.iter().map(String::as_str).collect();
    session.set_regions(&codes)?;

    let state = match FredClient::from_config(config) {
        Ok(client) => session.refresh(&client),
        Err(e) => {
            session.mark_unconfigured(&e);
            session.state()
        }
    };
    logging::debug(Component::Session, None, &format!("refresh finished: {:?}", state));

    let view = session.view();
    if json {
        let text = serde_json::to_string_pretty(&view)?;
        println!("{}", text);
    } else {
        print!("{}", render_view(&view, session.indicator()));
    }

    refresh_outcome(&session)
}

/// The command result for a session after its refresh. The view is
/// printed either way; partial data still counts as a failed run.
pub fn refresh_outcome(session: &Session) -> Result<(), EconError> {
    let message = || session.error_message().unwrap_or("unknown failure").to_string();
    match session.state() {
        PipelineState::Unconfigured => Err(EconError::Configuration(message())),
        PipelineState::Error => Err(EconError::Incomplete(message())),
        _ => Ok(()),
    }
}

fn run_verify(config: &Config, indicator_key: &str, json: bool) -> Result<(), EconError> {
    let client = FredClient::from_config(config)?;
    let report = verify::run_full_verification(&client, indicator_key, config.fred.search_limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&report));
    }
    verification_outcome(&report)
}

/// Any failed region fails the command. Partial successes do not.
pub fn verification_outcome(report: &VerificationReport) -> Result<(), EconError> {
    let s = &report.summary;
    if s.failed > 0 {
        return Err(EconError::Incomplete(format!(
            "{} of {} regions failed verification",
            s.failed, s.total
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

pub fn render_listing() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Indicators:");
    for indicator in INDICATOR_REGISTRY {
        let how = if indicator.needs_discovery { "discovery" } else { "pattern" };
        let _ = writeln!(out, "  {:<16} {} ({})", indicator.key, indicator.label, how);
    }
    let _ = writeln!(out, "\nRegions:");
    for region in REGION_REGISTRY {
        let _ = writeln!(out, "  {}  {}", region.code, region.name);
    }
    out
}

pub fn render_view(view: &DashboardView, indicator: &Indicator) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", view.indicator_label, view.indicator_key);
    if let Some(err) = &view.error {
        let _ = writeln!(out, "⚠ {}", err);
    }

    let _ = writeln!(out, "\nLatest:");
    for latest in &view.latest {
        let (value, date) = match &latest.latest {
            Some(obs) => (indicator.format(obs.value), obs.date.to_string()),
            None => (indicator.format_cell(None), "no data".to_string()),
        };
        let _ = writeln!(out, "  {:<48} {:>14}  {}", latest.region_name, value, date);
    }

    match &view.table {
        TableView::Empty => {}
        TableView::Single { region_code, rows } => {
            let name = find_region(region_code).map(|r| r.name).unwrap_or(region_code.as_str());
            let _ = writeln!(out, "\n{}:", name);
            for obs in rows.iter().rev() {
                let _ = writeln!(out, "  {}  {:>14}", obs.date, indicator.format(obs.value));
            }
        }
        TableView::Multi { region_codes, rows } => {
            let _ = write!(out, "\n  {:<10}", "date");
            for code in region_codes {
                let _ = write!(out, " {:>14}", code);
            }
            let _ = writeln!(out);
            for row in rows.iter().rev() {
                let _ = write!(out, "  {:<10}", row.date.to_string());
                for value in &row.values {
                    let _ = write!(out, " {:>14}", indicator.format_cell(*value));
                }
                let _ = writeln!(out);
            }
        }
    }
    out
}

pub fn render_report(report: &VerificationReport) -> String {
    let mut out = String::new();
    let indicator = find_indicator(&report.indicator_key);
    let label = indicator.map(|i| i.label).unwrap_or(report.indicator_key.as_str());
    let _ = writeln!(out, "Verification of {} at {}", label, report.timestamp);
    for result in &report.results {
        let _ = writeln!(out, "\n{} ({})", result.name, result.region_code);
        let _ = writeln!(out, "  Status: {:?}", result.status);
        if let Some(via) = result.resolution {
            let _ = writeln!(
                out,
                "  Series: {} via {:?}",
                result.series_id.as_deref().unwrap_or("-"),
                via
            );
        }
        let _ = writeln!(out, "  Observations: {}", result.observation_count);
        if let Some(date) = result.latest_date {
            let _ = writeln!(out, "  Latest: {}", date);
        }
        if let Some(err) = &result.error_message {
            let _ = writeln!(out, "  Error: {}", err);
        }
    }
    let s = &report.summary;
    let _ = writeln!(
        out,
        "\nSummary: {}/{} working, {} partial, {} failed",
        s.working, s.total, s.partial, s.failed
    );
    out
}
