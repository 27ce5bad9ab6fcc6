pub mod client;
pub mod error;
pub mod types;

pub use client::{FlightSource, OacaClient};
pub use error::UpstreamError;
