use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

use crate::api::ExportFormat;
use crate::dashboard::Filters;

pub const USAGE: &str = "\
usage: brentdash [COMMAND] [OPTIONS]

commands:
  dashboard                 full dashboard (default)
  health [--watch]          backend health; --watch polls every HEALTH_POLL_SECS
  summary                   analysis summary and key insights
  changepoint               change point detection results
  correlation               event correlation results
  events                    major events (honours filters)
  prices                    oil price summary (honours date filters)
  price-analysis            raw price analysis JSON
  export <csv|json|pdf>     request an export [--out PATH to download it]

options:
  --start YYYY-MM-DD        start date filter
  --end YYYY-MM-DD          end date filter
  --category NAME           event category filter (repeatable)
  --retries N               retry each request up to N attempts with backoff
  --json                    print raw JSON instead of cards
  -h, --help                show this message

environment:
  API_URL                   backend base url (default http://localhost:5000/api)
  LOG_LEVEL, LOG_DOMAINS    structured log filtering (logs go to stderr)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Dashboard,
    Health { watch: bool },
    Summary,
    ChangePoint,
    Correlation,
    Events,
    Prices,
    PriceAnalysis,
    Export { format: ExportFormat, out: Option<PathBuf> },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: Command,
    pub filters: Filters,
    pub retries: Option<u32>,
    pub json: bool,
}

pub fn parse_args<I>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = String>,
{
    let mut it = args.into_iter();
    let mut command: Option<String> = None;
    let mut export_format: Option<String> = None;
    let mut filters = Filters::default();
    let mut retries = None;
    let mut json = false;
    let mut watch = false;
    let mut out = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => command = Some("help".to_string()),
            "--json" => json = true,
            "--watch" => watch = true,
            "--start" => filters.set_start_date(Some(&value_for(&arg, it.next())?))?,
            "--end" => filters.set_end_date(Some(&value_for(&arg, it.next())?))?,
            "--category" => {
                let cat = value_for(&arg, it.next())?;
                if !filters.categories.iter().any(|c| c.eq_ignore_ascii_case(&cat)) {
                    filters.toggle_category(&cat)?;
                }
            }
            "--retries" => {
                let raw = value_for(&arg, it.next())?;
                let n: u32 = raw
                    .parse()
                    .map_err(|_| anyhow!("--retries expects a positive integer, got '{}'", raw))?;
                if n == 0 {
                    bail!("--retries must be at least 1");
                }
                retries = Some(n);
            }
            "--out" => out = Some(PathBuf::from(value_for(&arg, it.next())?)),
            flag if flag.starts_with('-') => bail!("unknown option '{}'", flag),
            word if command.is_none() => command = Some(word.to_string()),
            word if command.as_deref() == Some("export") && export_format.is_none() => {
                export_format = Some(word.to_string())
            }
            word => bail!("unexpected argument '{}'", word),
        }
    }

    let command = match command.as_deref().unwrap_or("dashboard") {
        "dashboard" => Command::Dashboard,
        "health" => Command::Health { watch },
        "summary" => Command::Summary,
        "changepoint" => Command::ChangePoint,
        "correlation" => Command::Correlation,
        "events" => Command::Events,
        "prices" => Command::Prices,
        "price-analysis" => Command::PriceAnalysis,
        "export" => {
            let raw = export_format.unwrap_or_else(|| ExportFormat::default().as_str().to_string());
            let format = ExportFormat::parse(&raw)
                .ok_or_else(|| anyhow!("unsupported export format '{}' (csv, json or pdf)", raw))?;
            Command::Export { format, out }
        }
        "help" => Command::Help,
        other => bail!("unknown command '{}'", other),
    };

    if watch && !matches!(command, Command::Health { .. }) {
        bail!("--watch only applies to the health command");
    }

    Ok(CliArgs {
        command,
        filters,
        retries,
        json,
    })
}

fn value_for(flag: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.starts_with("--") => Ok(v),
        _ => bail!("{} expects a value", flag),
    }
}
