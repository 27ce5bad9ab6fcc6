use crate::domain::flight::FlightDetails;
use serde::{Deserialize, Serialize};

/// One element of the upstream filter response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamFlight {
    pub direction: String,
    pub heure: String,
    pub compagnie: String,
    #[serde(rename = "numVol")]
    pub num_vol: String,
    /// Always present upstream, possibly `null`.
    #[serde(deserialize_with = "Option::deserialize")]
    pub commentaire: Option<String>,
}

impl From<UpstreamFlight> for FlightDetails {
    fn from(item: UpstreamFlight) -> Self {
        Self {
            destination: item.direction,
            time: item.heure,
            company: item.compagnie.trim().to_string(),
            fnumber: item.num_vol,
            comment: item.commentaire,
        }
    }
}
