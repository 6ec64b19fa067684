use serde::{Deserialize, Serialize};

/// Geographic position of a stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A bus stop as returned by the stop listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub coordinates: Coordinates,
    pub zone_id: String,
}

impl Stop {
    /// Latitude/longitude pair in the order map widgets expect.
    pub fn position(&self) -> (f64, f64) {
        (self.coordinates.latitude, self.coordinates.longitude)
    }

    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stop() {
        let json = r#"{"id":"BLM1","name":"Bolhão","coordinates":{"latitude":41.1496,"longitude":-8.6063},"zone_id":"PRT1"}"#;
        let stop: Stop = serde_json::from_str(json).expect("Failed to parse stop JSON");
        assert_eq!(stop.id, "BLM1");
        assert_eq!(stop.zone_id, "PRT1");
        assert_eq!(stop.position(), (41.1496, -8.6063));
        assert_eq!(stop.display_name(), "Bolhão (BLM1)");
    }

    #[test]
    fn test_parse_stop_missing_coordinates_fails() {
        let json = r#"{"id":"BLM1","name":"Bolhão","zone_id":"PRT1"}"#;
        assert!(serde_json::from_str::<Stop>(json).is_err());
    }
}
