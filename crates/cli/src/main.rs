use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use djerba_flights_core::aggregate::Aggregator;
use djerba_flights_core::time::window::DateWindow;
use djerba_flights_core::upstream::OacaClient;

#[derive(Debug, Parser)]
#[command(name = "djerba_flights_cli")]
struct Args {
    /// Center date of the window (YYYY-MM-DD). Defaults to today at WINDOW_UTC_OFFSET_HOURS.
    #[arg(long)]
    date: Option<String>,

    /// Airport id sent upstream. Defaults to AIRPORT or `djerba`.
    #[arg(long)]
    airport: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = djerba_flights_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let window = resolve_window(args.date.as_deref(), &settings)?;
    let airport = args.airport.unwrap_or_else(|| settings.airport.clone());

    let client = OacaClient::from_settings(&settings)?;
    let aggregation = Aggregator::new(Arc::new(client), airport)
        .aggregate(&window)
        .await;

    if let Some(report) = aggregation.failure_report() {
        let err = anyhow::anyhow!(
            "{} ({} upstream errors)",
            report.message,
            report.errors.len()
        );
        sentry_anyhow::capture_anyhow(&err);
        return Err(err);
    }

    let out = serde_json::to_string_pretty(&aggregation.flights)
        .context("failed to serialize flights")?;
    println!("{out}");

    Ok(())
}

fn resolve_window(
    date_arg: Option<&str>,
    settings: &djerba_flights_core::config::Settings,
) -> anyhow::Result<DateWindow> {
    if let Some(s) = date_arg {
        let today = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --date {s:?}, expected YYYY-MM-DD"))?;
        return DateWindow::around(today);
    }

    DateWindow::current(settings.window_offset()?)
}

fn init_sentry(
    settings: &djerba_flights_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
