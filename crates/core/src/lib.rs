pub mod aggregate;
pub mod domain;
pub mod time;
pub mod upstream;

pub mod config {
    use anyhow::Context;
    use chrono::FixedOffset;
    use std::str::FromStr;
    use std::time::Duration;

    pub const DEFAULT_UPSTREAM_URL: &str = "https://www.oaca.nat.tn/vols/api/flight/filter";
    pub const DEFAULT_AIRPORT: &str = "djerba";
    const DEFAULT_TIMEOUT_SECS: u64 = 10;
    // Africa/Tunis, no DST.
    const DEFAULT_UTC_OFFSET_HOURS: i32 = 1;
    const DEFAULT_PORT: u16 = 8000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub upstream_url: String,
        pub upstream_timeout: Duration,
        /// The upstream serves a certificate that cannot be validated; verification is off
        /// unless `UPSTREAM_ACCEPT_INVALID_CERTS=false`.
        pub accept_invalid_certs: bool,
        pub airport: String,
        pub window_utc_offset_hours: i32,
        pub port: u16,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

            Ok(Self {
                upstream_url: non_empty("UPSTREAM_URL")
                    .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
                upstream_timeout: Duration::from_secs(parse_or(
                    non_empty("UPSTREAM_TIMEOUT_SECS"),
                    "UPSTREAM_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                )?),
                accept_invalid_certs: parse_or(
                    non_empty("UPSTREAM_ACCEPT_INVALID_CERTS"),
                    "UPSTREAM_ACCEPT_INVALID_CERTS",
                    true,
                )?,
                airport: non_empty("AIRPORT")
                    .map(|v| v.trim().to_string())
                    .unwrap_or_else(|| DEFAULT_AIRPORT.to_string()),
                window_utc_offset_hours: parse_or(
                    non_empty("WINDOW_UTC_OFFSET_HOURS"),
                    "WINDOW_UTC_OFFSET_HOURS",
                    DEFAULT_UTC_OFFSET_HOURS,
                )?,
                port: parse_or(non_empty("PORT"), "PORT", DEFAULT_PORT)?,
                sentry_dsn: non_empty("SENTRY_DSN"),
            })
        }

        pub fn window_offset(&self) -> anyhow::Result<FixedOffset> {
            self.window_utc_offset_hours
                .checked_mul(3600)
                .and_then(FixedOffset::east_opt)
                .with_context(|| {
                    format!(
                        "invalid WINDOW_UTC_OFFSET_HOURS: {}",
                        self.window_utc_offset_hours
                    )
                })
        }
    }

    fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match raw {
            Some(v) => v
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid {key}: {v:?}")),
            None => Ok(default),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn settings(vars: &[(&str, &str)]) -> anyhow::Result<Settings> {
            let vars: HashMap<String, String> = vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|key| vars.get(key).cloned())
        }

        #[test]
        fn defaults_when_unset() {
            let s = settings(&[]).unwrap();
            assert_eq!(s.upstream_url, DEFAULT_UPSTREAM_URL);
            assert_eq!(s.upstream_timeout, Duration::from_secs(10));
            assert!(s.accept_invalid_certs);
            assert_eq!(s.airport, "djerba");
            assert_eq!(s.port, 8000);
            assert!(s.sentry_dsn.is_none());
            assert_eq!(s.window_offset().unwrap().local_minus_utc(), 3600);
        }

        #[test]
        fn reads_overrides() {
            let s = settings(&[
                ("UPSTREAM_URL", "http://127.0.0.1:9000/filter"),
                ("UPSTREAM_TIMEOUT_SECS", "3"),
                ("UPSTREAM_ACCEPT_INVALID_CERTS", "false"),
                ("AIRPORT", " monastir "),
                ("PORT", "8080"),
                ("SENTRY_DSN", ""),
            ])
            .unwrap();
            assert_eq!(s.upstream_url, "http://127.0.0.1:9000/filter");
            assert_eq!(s.upstream_timeout, Duration::from_secs(3));
            assert!(!s.accept_invalid_certs);
            assert_eq!(s.airport, "monastir");
            assert_eq!(s.port, 8080);
            assert!(s.sentry_dsn.is_none());
        }

        #[test]
        fn rejects_malformed_numbers() {
            let err = settings(&[("UPSTREAM_TIMEOUT_SECS", "ten")]).unwrap_err();
            assert!(format!("{err:#}").contains("UPSTREAM_TIMEOUT_SECS"));
        }

        #[test]
        fn rejects_out_of_range_offset() {
            let s = settings(&[("WINDOW_UTC_OFFSET_HOURS", "30")]).unwrap();
            assert!(s.window_offset().is_err());

            let s = settings(&[("WINDOW_UTC_OFFSET_HOURS", "1000000000")]).unwrap();
            assert!(s.window_offset().is_err());
        }
    }
}
