//! Snapshot data model.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Largest integer an f64 holds exactly; integral balances up to this are emitted as JSON integers.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// The two tracked balances. Both are finite and `>= 0` once validated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    #[serde(rename = "VCU", serialize_with = "serialize_amount")]
    pub vcu: f64,
    #[serde(rename = "DIEM", serialize_with = "serialize_amount")]
    pub diem: f64,
}

/// A validated write that has not been stamped by the store yet.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateSnapshot {
    pub balances: Balances,
    /// Source-side time, kept exactly as the caller sent it.
    pub timestamp: String,
}

/// The stored record served to viewers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub balances: Balances,
    pub timestamp: String,
    #[serde(serialize_with = "serialize_iso_millis")]
    pub last_updated: DateTime<Utc>,
}

impl Snapshot {
    pub fn from_candidate(candidate: CandidateSnapshot, last_updated: DateTime<Utc>) -> Self {
        Self {
            balances: candidate.balances,
            timestamp: candidate.timestamp,
            last_updated,
        }
    }
}

/// Render a time as `2024-01-01T00:00:00.000Z`.
pub fn iso_millis(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_iso_millis<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&iso_millis(*at))
}

fn serialize_amount<S: Serializer>(amount: &f64, s: S) -> Result<S::Ok, S::Error> {
    if amount.fract() == 0.0 && *amount >= 0.0 && *amount <= MAX_EXACT_INTEGER {
        return s.serialize_u64(*amount as u64);
    }
    s.serialize_f64(*amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snapshot_serializes_with_wire_field_names() {
        let snapshot = Snapshot {
            balances: Balances {
                vcu: 100.0,
                diem: 12.5,
            },
            timestamp: "2024-01-01T00:00:00Z".into(),
            last_updated: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "balances": { "VCU": 100, "DIEM": 12.5 },
                "timestamp": "2024-01-01T00:00:00Z",
                "lastUpdated": "2024-01-02T03:04:05.000Z",
            })
        );
    }

    #[test]
    fn huge_integral_amounts_stay_floats() {
        let balances = Balances {
            vcu: 1e20,
            diem: 0.0,
        };
        let json = serde_json::to_value(balances).unwrap();
        assert!(json["VCU"].is_f64());
        assert_eq!(json["DIEM"], serde_json::json!(0));
    }
}
