use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use djerba_flights_core::aggregate::{Aggregation, Aggregator};
use djerba_flights_core::domain::flight::FailureReport;
use djerba_flights_core::time::window::DateWindow;
use djerba_flights_core::upstream::OacaClient;

/// Number of upstream fetches that failed while building a 200 response.
const UPSTREAM_ERRORS_HEADER: &str = "x-upstream-errors";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = djerba_flights_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let client = OacaClient::from_settings(&settings)?;
    let state = AppState {
        aggregator: Aggregator::new(Arc::new(client), settings.airport.clone()),
        offset: settings.window_offset()?,
        clock: Utc::now,
    };

    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, airport = %settings.airport, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    aggregator: Aggregator,
    offset: FixedOffset,
    clock: fn() -> DateTime<Utc>,
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let flights_path = format!("/flights/{}", state.aggregator.airport());

    Router::new()
        .route("/healthz", get(healthz))
        .route(&flights_path, get(get_flights))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_flights(State(state): State<AppState>) -> Response {
    let window = match DateWindow::at((state.clock)(), state.offset) {
        Ok(window) => window,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to compute date window");
            let report = FailureReport {
                message: "Unable to compute date window".to_string(),
                errors: Vec::new(),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(report)).into_response();
        }
    };

    let aggregation = state.aggregator.aggregate(&window).await;
    render(aggregation)
}

fn render(aggregation: Aggregation) -> Response {
    if let Some(report) = aggregation.failure_report() {
        tracing::error!(
            errors = report.errors.len(),
            "all upstream fetches failed"
        );
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(report)).into_response();
    }

    let error_count = aggregation.errors.len();
    let mut res = Json(aggregation.flights).into_response();
    res.headers_mut()
        .insert(UPSTREAM_ERRORS_HEADER, HeaderValue::from(error_count));
    res
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use djerba_flights_core::domain::flight::{FlightDetails, Movement};
    use djerba_flights_core::upstream::{FlightSource, UpstreamError};
    use serde_json::{json, Value};

    struct FakeSource {
        fail_all: bool,
    }

    #[async_trait::async_trait]
    impl FlightSource for FakeSource {
        async fn fetch(
            &self,
            _airport: &str,
            date: NaiveDate,
            movement: Movement,
        ) -> Result<Vec<FlightDetails>, UpstreamError> {
            if self.fail_all {
                return Err(UpstreamError::Status {
                    status: 500,
                    body: "down".to_string(),
                });
            }
            if date == NaiveDate::from_ymd_opt(2026, 10, 19).unwrap() {
                return match movement {
                    Movement::Departures => Ok(vec![FlightDetails {
                        destination: "TUN".to_string(),
                        time: "14:30".to_string(),
                        company: "Nouvelair".to_string(),
                        fnumber: "BJ101".to_string(),
                        comment: None,
                    }]),
                    Movement::Arrivals => Err(UpstreamError::UnexpectedFormat),
                };
            }
            Ok(Vec::new())
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    async fn spawn(fail_all: bool) -> String {
        let state = AppState {
            aggregator: Aggregator::new(Arc::new(FakeSource { fail_all }), "djerba"),
            offset: FixedOffset::east_opt(3600).unwrap(),
            clock: fixed_now,
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn serves_three_dates_with_partial_data() {
        let base = spawn(false).await;
        let res = reqwest::get(format!("{base}/flights/djerba")).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::OK);
        assert_eq!(res.headers()[UPSTREAM_ERRORS_HEADER], "1");

        let body: Value = res.json().await.unwrap();
        let dates = body.as_object().unwrap();
        assert_eq!(dates.len(), 3);
        for key in ["18-10-2026", "19-10-2026", "20-10-2026"] {
            assert!(dates.contains_key(key), "missing {key}");
        }
        assert_eq!(
            body["19-10-2026"],
            json!({
                "departures": [{
                    "destination": "TUN",
                    "time": "14:30",
                    "company": "Nouvelair",
                    "fnumber": "BJ101",
                    "comment": null
                }],
                "arrivals": []
            })
        );
        assert_eq!(body["18-10-2026"], json!({"departures": [], "arrivals": []}));
    }

    #[tokio::test]
    async fn total_failure_is_500_with_all_errors() {
        let base = spawn(true).await;
        let res = reqwest::get(format!("{base}/flights/djerba")).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Unable to fetch flights");
        let errors = body["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 6);
        assert_eq!(
            errors[0],
            json!({
                "date": "18-10-2026",
                "movement": "departures",
                "error": "API error 500: down"
            })
        );
    }

    #[tokio::test]
    async fn allows_any_origin() {
        let base = spawn(false).await;
        let res = reqwest::Client::new()
            .get(format!("{base}/flights/djerba"))
            .header("Origin", "https://example.org")
            .send()
            .await
            .unwrap();
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn healthz_and_unknown_airport() {
        let base = spawn(false).await;
        let res = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(res.text().await.unwrap(), "ok");

        let res = reqwest::get(format!("{base}/flights/tabarka")).await.unwrap();
        assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
