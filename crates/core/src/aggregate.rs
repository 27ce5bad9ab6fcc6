use crate::domain::flight::{FailureReport, FetchError, FlightDetails, FlightsByDate, Movement};
use crate::time::window::{date_key, DateWindow};
use crate::upstream::{FlightSource, UpstreamError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{Id, JoinSet};

pub const TOTAL_FAILURE_MESSAGE: &str = "Unable to fetch flights";

/// Fans out one upstream fetch per (window date, movement) and folds the results.
#[derive(Clone)]
pub struct Aggregator {
    source: Arc<dyn FlightSource>,
    airport: String,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub flights: FlightsByDate,
    pub errors: Vec<FetchError>,
    /// Number of fetches that returned a usable list.
    pub succeeded: usize,
}

impl Aggregation {
    /// No date got any data back while at least one fetch failed.
    pub fn is_total_failure(&self) -> bool {
        (self.flights.is_empty() || self.succeeded == 0) && !self.errors.is_empty()
    }

    pub fn failure_report(&self) -> Option<FailureReport> {
        self.is_total_failure().then(|| FailureReport {
            message: TOTAL_FAILURE_MESSAGE.to_string(),
            errors: self.errors.clone(),
        })
    }
}

type FetchResult = Result<Vec<FlightDetails>, UpstreamError>;

struct PendingFetch {
    key: String,
    movement: Movement,
    result: Option<FetchResult>,
}

impl Aggregator {
    pub fn new(source: Arc<dyn FlightSource>, airport: impl Into<String>) -> Self {
        Self {
            source,
            airport: airport.into(),
        }
    }

    pub fn airport(&self) -> &str {
        &self.airport
    }

    pub async fn aggregate(&self, window: &DateWindow) -> Aggregation {
        let mut out = Aggregation::default();
        let mut pending = Vec::with_capacity(window.dates().len() * Movement::ALL.len());
        let mut slots: HashMap<Id, usize> = HashMap::new();
        // Dropping the set aborts fetches still in flight.
        let mut tasks = JoinSet::new();

        for date in window.dates() {
            let key = date_key(date);
            out.flights.ensure(&key);

            for movement in Movement::ALL {
                let source = Arc::clone(&self.source);
                let airport = self.airport.clone();
                let abort =
                    tasks.spawn(async move { source.fetch(&airport, date, movement).await });
                slots.insert(abort.id(), pending.len());
                pending.push(PendingFetch {
                    key: key.clone(),
                    movement,
                    result: None,
                });
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(join_err) => (
                    join_err.id(),
                    Err(UpstreamError::Unexpected(join_err.to_string())),
                ),
            };
            if let Some(&slot) = slots.get(&id) {
                pending[slot].result = Some(result);
            }
        }

        // Fold in window order so errors are reported deterministically.
        for PendingFetch {
            key,
            movement,
            result,
        } in pending
        {
            let result = result
                .unwrap_or_else(|| Err(UpstreamError::Unexpected("fetch task lost".to_string())));

            match result {
                Ok(flights) => {
                    out.succeeded += 1;
                    tracing::debug!(date = %key, %movement, count = flights.len(), "upstream fetch ok");
                    if let Some(bucket) = out.flights.get_mut(&key) {
                        bucket.bucket_mut(movement).extend(flights);
                    }
                }
                Err(err) => {
                    tracing::warn!(date = %key, %movement, error = %err, "upstream fetch failed");
                    out.errors.push(FetchError {
                        date: key,
                        movement,
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            airport = %self.airport,
            today = %window.today(),
            succeeded = out.succeeded,
            failed = out.errors.len(),
            flights = out.flights.flight_count(),
            "flight aggregation finished"
        );

        out
    }
}
