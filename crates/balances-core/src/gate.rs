//! Validation gate applied to every write before it reaches the store.
//!
//! Two checks, in order: the caller's credentials against the configured pair, then the shape
//! of the payload. Both are pure; the gate never touches the store.

use std::fmt;

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::snapshot::{iso_millis, Balances, CandidateSnapshot};

/// Why a payload was refused. `Display` is the detail string returned to the caller.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PayloadRejection {
    #[error("request body must be valid JSON")]
    MalformedJson,
    #[error("missing or invalid balances object")]
    MissingBalances,
    #[error("balances must contain VCU and DIEM fields")]
    MissingFields,
    #[error("VCU and DIEM must be non-negative numbers")]
    InvalidAmount,
    #[error("timestamp must be a valid ISO 8601 string")]
    InvalidTimestamp,
}

/// A username/secret pair, either configured or supplied by a caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }

    /// Decode an `Authorization: Basic <base64(name:secret)>` header value.
    ///
    /// The secret is everything after the first `:`, so it may itself contain colons.
    pub fn from_basic_auth(header: &str) -> Option<Self> {
        let (scheme, encoded) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (name, secret) = decoded.split_once(':')?;
        Some(Self::new(name, secret))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("secret", &"***")
            .finish()
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Exact match of both fields. Missing credentials always fail.
///
/// Callers must not reveal which field mismatched.
pub fn check_credentials(provided: Option<&Credentials>, expected: &Credentials) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    // Evaluate both sides so timing does not depend on which field is wrong.
    let name_ok = constant_time_eq(&provided.name, &expected.name);
    let secret_ok = constant_time_eq(&provided.secret, &expected.secret);
    name_ok & secret_ok
}

/// Parse a JS-style numeric literal: decimal, exponent, or a `0x`/`0o`/`0b` prefixed integer.
fn parse_numeric_str(raw: &str) -> Option<f64> {
    let prefixed = |prefix: &str, radix: u32| -> Option<Option<f64>> {
        let lower = raw.get(..2)?.to_ascii_lowercase();
        if lower != prefix {
            return None;
        }
        let digits = &raw[2..];
        if !digits.chars().next().is_some_and(|c| c.is_digit(radix)) {
            return Some(None);
        }
        Some(u64::from_str_radix(digits, radix).ok().map(|v| v as f64))
    };
    if let Some(parsed) = prefixed("0x", 16)
        .or_else(|| prefixed("0o", 8))
        .or_else(|| prefixed("0b", 2))
    {
        return parsed;
    }
    raw.parse::<f64>().ok()
}

/// Coerce one balance value. `None` means rejected.
fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            parse_numeric_str(trimmed)?
        }
        _ => return None,
    };
    (amount.is_finite() && amount >= 0.0).then_some(amount)
}

/// Year-only (`2024`) and year-month (`2024-01`) dates, both at midnight UTC on the first day.
fn parse_reduced_date(raw: &str) -> Option<NaiveDate> {
    let (year, month) = match raw.split_once('-') {
        Some((year, month)) if month.len() == 2 => (year, month.parse::<u32>().ok()?),
        Some(_) => return None,
        None => (raw, 1),
    };
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

/// Parse a calendar date/time in any of the accepted layouts.
///
/// Zone-less forms are taken as UTC.
pub fn parse_calendar_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // `Z` is spelled as an explicit offset so one layout covers both.
    let zoned = match raw.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => raw.to_string(),
    };
    for layout in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_reduced_date(raw))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn resolve_timestamp(
    payload: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<String, PayloadRejection> {
    match payload.get("timestamp") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(iso_millis(now)),
        Some(Value::String(s)) if s.is_empty() => Ok(iso_millis(now)),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(iso_millis(now)),
        Some(Value::String(s)) => parse_calendar_time(s)
            .map(|_| s.clone())
            .ok_or(PayloadRejection::InvalidTimestamp),
        Some(_) => Err(PayloadRejection::InvalidTimestamp),
    }
}

/// Validate and normalize a write payload.
///
/// `now` fills in `timestamp` when the caller leaves it out.
pub fn check_payload_shape(
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<CandidateSnapshot, PayloadRejection> {
    let Some(payload) = payload.as_object() else {
        return Err(PayloadRejection::MissingBalances);
    };
    let Some(balances) = payload.get("balances").and_then(Value::as_object) else {
        return Err(PayloadRejection::MissingBalances);
    };
    let (Some(vcu), Some(diem)) = (balances.get("VCU"), balances.get("DIEM")) else {
        return Err(PayloadRejection::MissingFields);
    };
    let (Some(vcu), Some(diem)) = (coerce_amount(vcu), coerce_amount(diem)) else {
        return Err(PayloadRejection::InvalidAmount);
    };

    let timestamp = resolve_timestamp(payload, now)?;

    Ok(CandidateSnapshot {
        balances: Balances { vcu, diem },
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn expected() -> Credentials {
        Credentials::new("updater", "s3cret")
    }

    #[test]
    fn credentials_require_both_fields() {
        assert!(check_credentials(Some(&expected()), &expected()));
        assert!(!check_credentials(None, &expected()));
        assert!(!check_credentials(
            Some(&Credentials::new("updater", "wrong")),
            &expected()
        ));
        assert!(!check_credentials(
            Some(&Credentials::new("other", "s3cret")),
            &expected()
        ));
        assert!(!check_credentials(
            Some(&Credentials::new("updater", "s3cret ")),
            &expected()
        ));
    }

    #[test]
    fn basic_auth_header_decodes() {
        // base64("updater:s3cret:with:colons")
        let creds = Credentials::from_basic_auth("Basic dXBkYXRlcjpzM2NyZXQ6d2l0aDpjb2xvbnM=")
            .expect("decodes");
        assert_eq!(creds.name, "updater");
        assert_eq!(creds.secret, "s3cret:with:colons");

        assert!(Credentials::from_basic_auth("basic dXBkYXRlcjpzM2NyZXQ=").is_some());
    }

    #[test]
    fn basic_auth_header_rejects_garbage() {
        assert!(Credentials::from_basic_auth("Bearer dXBkYXRlcjpzM2NyZXQ=").is_none());
        assert!(Credentials::from_basic_auth("Basic !!!").is_none());
        // base64("nocolon")
        assert!(Credentials::from_basic_auth("Basic bm9jb2xvbg==").is_none());
        assert!(Credentials::from_basic_auth("Basic").is_none());
    }

    #[test]
    fn debug_output_masks_secret() {
        let rendered = format!("{:?}", expected());
        assert!(rendered.contains("updater"));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let candidate = check_payload_shape(
            &json!({ "balances": { "VCU": 100, "DIEM": " 50.5 " } }),
            now(),
        )
        .expect("valid");
        assert_eq!(candidate.balances, Balances { vcu: 100.0, diem: 50.5 });
        assert_eq!(candidate.timestamp, "2024-06-01T12:00:00.000Z");
    }

    #[test]
    fn accepts_prefixed_and_exponent_strings() {
        let candidate = check_payload_shape(
            &json!({ "balances": { "VCU": "0x10", "DIEM": "1e3" } }),
            now(),
        )
        .expect("valid");
        assert_eq!(candidate.balances, Balances { vcu: 16.0, diem: 1000.0 });
    }

    #[test]
    fn prefixed_strings_need_a_digit_after_the_prefix() {
        for bad in ["0x+1f", "0x", "0b-1", "0o 7", "0xg"] {
            let payload = json!({ "balances": { "VCU": bad, "DIEM": 1 } });
            assert_eq!(
                check_payload_shape(&payload, now()),
                Err(PayloadRejection::InvalidAmount),
                "{payload}"
            );
        }
        let candidate = check_payload_shape(
            &json!({ "balances": { "VCU": "0b101", "DIEM": "0O17" } }),
            now(),
        )
        .expect("valid");
        assert_eq!(candidate.balances, Balances { vcu: 5.0, diem: 15.0 });
    }

    #[test]
    fn rejects_missing_balances_object() {
        for payload in [
            json!({}),
            json!([]),
            json!("balances"),
            json!({ "balances": 5 }),
            json!({ "balances": null }),
        ] {
            assert_eq!(
                check_payload_shape(&payload, now()),
                Err(PayloadRejection::MissingBalances),
                "{payload}"
            );
        }
    }

    #[test]
    fn rejects_missing_fields() {
        let err = check_payload_shape(&json!({ "balances": { "VCU": 1 } }), now()).unwrap_err();
        assert_eq!(err, PayloadRejection::MissingFields);
    }

    #[test]
    fn rejects_bad_amounts() {
        for bad in [
            json!(-5),
            json!("-1"),
            json!(""),
            json!("   "),
            json!("abc"),
            json!("Infinity"),
            json!("NaN"),
            json!(null),
            json!(true),
            json!([1]),
            json!({ "v": 1 }),
        ] {
            let payload = json!({ "balances": { "VCU": bad, "DIEM": 1 } });
            assert_eq!(
                check_payload_shape(&payload, now()),
                Err(PayloadRejection::InvalidAmount),
                "{payload}"
            );
        }
    }

    #[test]
    fn negative_detail_mentions_non_negative() {
        let err = check_payload_shape(&json!({ "balances": { "VCU": -5, "DIEM": 50 } }), now())
            .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn caller_timestamp_is_kept_verbatim() {
        let candidate = check_payload_shape(
            &json!({ "balances": { "VCU": 1, "DIEM": 2 }, "timestamp": "2024-01-01T00:00:00Z" }),
            now(),
        )
        .expect("valid");
        assert_eq!(candidate.timestamp, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn short_iso_forms_are_accepted_verbatim() {
        for ts in ["2024-01-01T00:00Z", "2024-01-01T05:30+05:30", "2024", "2024-01"] {
            let candidate = check_payload_shape(
                &json!({ "balances": { "VCU": 1, "DIEM": 2 }, "timestamp": ts }),
                now(),
            )
            .expect("valid");
            assert_eq!(candidate.timestamp, ts);
        }
    }

    #[test]
    fn falsy_timestamp_defaults_to_now() {
        for ts in [json!(null), json!(""), json!(0), json!(0.0), json!(false)] {
            let candidate = check_payload_shape(
                &json!({ "balances": { "VCU": 1, "DIEM": 2 }, "timestamp": ts }),
                now(),
            )
            .expect("valid");
            assert_eq!(candidate.timestamp, "2024-06-01T12:00:00.000Z", "{ts}");
        }
    }

    #[test]
    fn rejects_invalid_timestamps() {
        for ts in [json!("yesterday"), json!("2024-13-45"), json!(1_700_000_000), json!(true), json!("2024-13")] {
            let payload = json!({ "balances": { "VCU": 1, "DIEM": 2 }, "timestamp": ts });
            assert_eq!(
                check_payload_shape(&payload, now()),
                Err(PayloadRejection::InvalidTimestamp),
                "{payload}"
            );
        }
    }

    #[test]
    fn calendar_time_layouts() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_calendar_time("2024-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-01-01T01:00:00+01:00"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-01-01T00:00:00.000"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-01-01 00:00:00"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-01-01"), Some(midnight));
        assert_eq!(parse_calendar_time("Mon, 01 Jan 2024 00:00:00 +0000"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-01-01T00:00Z"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-01-01T02:00+02:00"), Some(midnight));
        assert_eq!(parse_calendar_time("2023-12-31T19:00-05:00"), Some(midnight));
        assert_eq!(
            parse_calendar_time("2024-01-01T00:01:00.250-00:00"),
            Some(midnight + chrono::Duration::milliseconds(60_250))
        );
        assert_eq!(parse_calendar_time("2024-01-01T00:00"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-01"), Some(midnight));
        assert_eq!(parse_calendar_time("2024"), Some(midnight));
        assert_eq!(parse_calendar_time("2024-1"), None);
        assert_eq!(parse_calendar_time("24"), None);
        assert_eq!(parse_calendar_time("not a date"), None);
    }

    proptest! {
        #[test]
        fn non_negative_finite_pairs_pass_through(
            vcu in 0.0f64..1e15,
            diem in 0.0f64..1e15,
        ) {
            let payload = json!({ "balances": { "VCU": vcu, "DIEM": diem } });
            let candidate = check_payload_shape(&payload, now()).expect("valid");
            prop_assert_eq!(candidate.balances, Balances { vcu, diem });
        }

        #[test]
        fn any_negative_amount_is_rejected(
            negative in -1e15f64..-1e-9,
            other in 0.0f64..1e6,
            as_string in any::<bool>(),
        ) {
            let bad = if as_string { json!(negative.to_string()) } else { json!(negative) };
            let payload = json!({ "balances": { "VCU": other, "DIEM": bad } });
            prop_assert_eq!(
                check_payload_shape(&payload, now()),
                Err(PayloadRejection::InvalidAmount)
            );
        }
    }
}
