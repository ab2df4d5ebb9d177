use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::future::Future;
use std::process;
use tokio::time::{interval, Duration};

use brentdash::api::retry::{retry_async, RetryPolicy};
use brentdash::api::{AnalysisApi, HttpApi};
use brentdash::cli::{parse_args, CliArgs, Command, USAGE};
use brentdash::config::ClientConfig;
use brentdash::dashboard::{request_export, Dashboard, ExportStatus, LoadState, ServerStatus};
use brentdash::error::ApiResult;
use brentdash::logging::{log, obj, v_str, Domain, Level};
use brentdash::render::{self, Card};

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            process::exit(2);
        }
    };
    if args.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let cfg = ClientConfig::from_env();
    let api = HttpApi::new(&cfg)?;
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("url", v_str(api.base_url())), ("msg", v_str(&format!("{:?}", args.command)))]),
    );

    let code = run(&api, &cfg, args).await?;
    if code != 0 {
        process::exit(code);
    }
    Ok(())
}

/// Runs one command; returns the process exit code.
async fn run(api: &HttpApi, cfg: &ClientConfig, args: CliArgs) -> Result<i32> {
    let policy = args.retries.map(|n| RetryPolicy {
        max_attempts: n,
        ..RetryPolicy::from_config(cfg)
    });
    let policy = policy.as_ref();
    let start = args.filters.start_date.as_deref();
    let end = args.filters.end_date.as_deref();

    match args.command {
        Command::Help => Ok(0),
        Command::Dashboard => {
            let status = ServerStatus::probe(api).await;
            let mut dash = Dashboard::new(args.filters.clone());
            if let Some(p) = policy {
                dash = dash.with_retry(p.clone());
            }
            dash.load(api).await;
            match &dash.state {
                LoadState::Loaded(data) if args.json => print_json(&**data)?,
                _ => print_cards(&dash.render(&status)),
            }
            Ok(if matches!(dash.state, LoadState::Failed(_)) { 1 } else { 0 })
        }
        Command::Health { watch: false } => {
            let status = ServerStatus::probe(api).await;
            if args.json {
                print_json(&json!({ "status": status.label(), "updated": status.last_updated() }))?;
            } else {
                print_cards(&[render::header_card(&status, None)]);
            }
            Ok(if status == ServerStatus::Offline { 1 } else { 0 })
        }
        Command::Health { watch: true } => {
            let mut ticker = interval(Duration::from_secs(cfg.health_poll_secs.max(1)));
            loop {
                ticker.tick().await;
                let status = ServerStatus::probe(api).await;
                println!(
                    "{} Server: {} | Updated: {}",
                    brentdash::logging::ts_now(),
                    status.label(),
                    status.last_updated().unwrap_or("Unknown")
                );
            }
        }
        Command::Summary => report(
            fetch(policy, "analysis_summary", move || api.fetch_analysis_summary()).await,
            args.json,
            |s| {
                vec![
                    render::key_insights_card(Some(s), None),
                    render::change_point_card(s.changepoint.as_ref()),
                ]
            },
        ),
        Command::ChangePoint => report(
            fetch(policy, "changepoint", move || api.fetch_change_point()).await,
            args.json,
            |cp| vec![render::change_point_card(Some(cp))],
        ),
        Command::Correlation => report(
            fetch(policy, "event_correlation", move || api.fetch_event_correlation()).await,
            args.json,
            |c| vec![render::event_correlation_card(Some(c))],
        ),
        Command::Events => {
            let category = args.filters.category_param();
            let category = category.as_deref();
            report(
                fetch(policy, "events", move || api.fetch_events(category, start, end)).await,
                args.json,
                |events| vec![render::events_card(events, &args.filters)],
            )
        }
        Command::Prices => report(
            fetch(policy, "oil_prices", move || api.fetch_oil_prices(start, end)).await,
            args.json,
            |oil| {
                vec![
                    render::price_chart_card(Some(oil), None),
                    render::data_summary_card(Some(oil), None, None),
                ]
            },
        ),
        Command::PriceAnalysis => match fetch(policy, "price_analysis", move || api.fetch_price_analysis()).await {
            Ok(v) => {
                print_json(&v)?;
                Ok(0)
            }
            Err(e) => {
                print_cards(&[render::error_card("Error", &e.to_string())]);
                Ok(1)
            }
        },
        Command::Export { format, out } => {
            println!("{}", ExportStatus::Preparing.message());
            let status = request_export(api, format).await;
            print_cards(&[render::export_card(Some(&status))]);
            match (&status, out) {
                (ExportStatus::Failed, _) => Ok(1),
                (ExportStatus::Ready { download_url, filename }, Some(dest)) => {
                    let dest = if dest.is_dir() { dest.join(filename) } else { dest };
                    match api.download(download_url, &dest).await {
                        Ok(n) => {
                            println!("Saved {} bytes to {}", n, dest.display());
                            Ok(0)
                        }
                        Err(e) => {
                            print_cards(&[render::error_card("Download Failed", &e.to_string())]);
                            Ok(1)
                        }
                    }
                }
                (ExportStatus::Ready { download_url, filename }, None) => {
                    println!("{} -> {}", filename, download_url);
                    Ok(0)
                }
                _ => Ok(0),
            }
        }
    }
}

async fn fetch<T, F, Fut>(policy: Option<&RetryPolicy>, name: &str, mut op: F) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    match policy {
        Some(p) => retry_async(p, name, op).await,
        None => op().await,
    }
}

fn report<T: Serialize>(result: ApiResult<T>, json: bool, cards: impl FnOnce(&T) -> Vec<Card>) -> Result<i32> {
    match result {
        Ok(v) if json => {
            print_json(&v)?;
            Ok(0)
        }
        Ok(v) => {
            print_cards(&cards(&v));
            Ok(0)
        }
        Err(e) => {
            print_cards(&[render::error_card("Error", &e.to_string())]);
            Ok(1)
        }
    }
}

fn print_cards(cards: &[Card]) {
    for card in cards {
        println!("{}", card);
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
