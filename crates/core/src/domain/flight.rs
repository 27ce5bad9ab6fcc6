use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetails {
    pub destination: String,
    /// As published upstream (usually `HH:MM`), not validated.
    pub time: String,
    pub company: String,
    pub fnumber: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFlights {
    pub departures: Vec<FlightDetails>,
    pub arrivals: Vec<FlightDetails>,
}

impl DateFlights {
    pub fn bucket(&self, movement: Movement) -> &[FlightDetails] {
        match movement {
            Movement::Departures => &self.departures,
            Movement::Arrivals => &self.arrivals,
        }
    }

    pub fn bucket_mut(&mut self, movement: Movement) -> &mut Vec<FlightDetails> {
        match movement {
            Movement::Departures => &mut self.departures,
            Movement::Arrivals => &mut self.arrivals,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Departures,
    Arrivals,
}

impl Movement {
    pub const ALL: [Movement; 2] = [Movement::Departures, Movement::Arrivals];

    /// Value of the upstream `frmmvtCod` parameter.
    pub fn code(self) -> &'static str {
        match self {
            Movement::Departures => "D",
            Movement::Arrivals => "A",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Movement::Departures => "departures",
            Movement::Arrivals => "arrivals",
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date-keyed flights, kept in window order (yesterday, today, tomorrow).
///
/// Serializes as a JSON object keyed by `DD-MM-YYYY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightsByDate {
    entries: Vec<(String, DateFlights)>,
}

impl FlightsByDate {
    /// Inserts an empty entry for `key` unless one already exists.
    pub fn ensure(&mut self, key: &str) -> &mut DateFlights {
        let idx = match self.entries.iter().position(|(k, _)| k.as_str() == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((key.to_string(), DateFlights::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    pub fn get(&self, key: &str) -> Option<&DateFlights> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k.as_str() == key).then_some(v))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut DateFlights> {
        self.entries
            .iter_mut()
            .find_map(|(k, v)| (k.as_str() == key).then_some(v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DateFlights)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flight_count(&self) -> usize {
        self.iter()
            .map(|(_, v)| v.departures.len() + v.arrivals.len())
            .sum()
    }
}

impl Serialize for FlightsByDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, flights) in &self.entries {
            map.serialize_entry(key, flights)?;
        }
        map.end()
    }
}

/// One failed upstream fetch, scoped to its (date, movement) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchError {
    pub date: String,
    pub movement: Movement,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub message: String,
    pub errors: Vec<FetchError>,
}
