use crate::config::Settings;
use crate::domain::flight::{FlightDetails, Movement};
use crate::time::window::DateParts;
use crate::upstream::error::UpstreamError;
use crate::upstream::types::UpstreamFlight;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::time::Duration;

// Filter parameters the endpoint requires but we never narrow on.
const ANY_CITY: &str = "-1";
const ANY_FLIGHT_NUMBER: &str = "";
const FROM_MIDNIGHT: &str = "0";

#[async_trait::async_trait]
pub trait FlightSource: Send + Sync {
    async fn fetch(
        &self,
        airport: &str,
        date: NaiveDate,
        movement: Movement,
    ) -> Result<Vec<FlightDetails>, UpstreamError>;
}

/// Client for the OACA flight filter endpoint.
///
/// Holds one pooled `reqwest::Client` for the process lifetime.
#[derive(Debug, Clone)]
pub struct OacaClient {
    http: reqwest::Client,
    url: String,
}

impl OacaClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.upstream_url,
            settings.upstream_timeout,
            settings.accept_invalid_certs,
        )
    }

    pub fn new(url: &str, timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        if accept_invalid_certs {
            tracing::warn!(%url, "upstream TLS certificate verification disabled");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            // A redirect (e.g. to a maintenance page) is an upstream error, not data.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("failed to build upstream http client")?;

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    fn request(
        &self,
        airport: &str,
        date: NaiveDate,
        movement: Movement,
    ) -> reqwest::RequestBuilder {
        let DateParts { day, month, year } = DateParts::from(date);
        self.http.get(&self.url).query(&[
            ("frmmvtCod", movement.code()),
            ("frmaeropVil", ANY_CITY),
            ("frmnumVol", ANY_FLIGHT_NUMBER),
            ("frmairport", airport),
            ("frmday", day.as_str()),
            ("frmmonth", month.as_str()),
            // The endpoint takes the year as `frmacty`.
            ("frmacty", year.as_str()),
            ("frmhour", FROM_MIDNIGHT),
        ])
    }
}

#[async_trait::async_trait]
impl FlightSource for OacaClient {
    async fn fetch(
        &self,
        airport: &str,
        date: NaiveDate,
        movement: Movement,
    ) -> Result<Vec<FlightDetails>, UpstreamError> {
        let res = self
            .request(airport, date, movement)
            .send()
            .await
            .map_err(UpstreamError::Network)?;

        let status = res.status();
        let body = res.text().await.map_err(UpstreamError::Network)?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_flights(&body)
    }
}

/// Parses a filter response body, preserving upstream order.
pub fn parse_flights(body: &str) -> Result<Vec<FlightDetails>, UpstreamError> {
    let raw = serde_json::from_str::<Value>(body)
        .map_err(|e| UpstreamError::Unexpected(format!("response is not valid JSON: {e}")))?;

    let Value::Array(items) = raw else {
        return Err(UpstreamError::UnexpectedFormat);
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<UpstreamFlight>(item)
                .map(FlightDetails::from)
                .map_err(|e| UpstreamError::Unexpected(format!("invalid flight record: {e}")))
        })
        .collect()
}
