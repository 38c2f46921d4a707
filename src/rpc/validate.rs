//! Request schema and validation.
//!
//! Everything past [`validate`] works with a fully-populated
//! [`ValidatedRequest`]; optional fields are defaulted here and nowhere else.

use std::fmt::Display;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::RpcError;
use crate::ephemeris::{Body, ZodiacSystem};

/// Upper bound on the number of bodies in one request.
pub const MAX_BODIES: usize = 5;

static UTC_ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(\.[0-9]{3})?Z$")
        .expect("UTC timestamp pattern compiles")
});

/// The `data` payload as sent by clients.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ProEphemerisRequest {
    #[serde(rename = "utcISO")]
    pub utc_iso: String,
    #[serde(rename = "zodiacSystem")]
    pub zodiac_system: ZodiacSystem,
    pub bodies: Vec<Body>,
    #[serde(rename = "wantSpeed", default)]
    pub want_speed: Option<bool>,
    #[serde(default)]
    pub debug: Option<bool>,
}

/// A request that passed validation, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    /// The timestamp exactly as the client sent it.
    pub utc_iso: String,
    pub instant: DateTime<Utc>,
    pub zodiac_system: ZodiacSystem,
    /// Distinct bodies in first-seen order.
    pub bodies: Vec<Body>,
    pub want_speed: bool,
    pub debug: bool,
}

fn invalid(reason: impl Display) -> RpcError {
    RpcError::invalid_argument(format!("Invalid request: {reason}"))
}

impl TryFrom<ProEphemerisRequest> for ValidatedRequest {
    type Error = RpcError;

    fn try_from(raw: ProEphemerisRequest) -> Result<Self, Self::Error> {
        if !UTC_ISO.is_match(&raw.utc_iso) {
            return Err(invalid("utcISO must be ISO 8601 format with Z timezone"));
        }
        let instant = DateTime::parse_from_rfc3339(&raw.utc_iso)
            .map_err(|e| invalid(format!("utcISO is not a valid instant: {e}")))?
            .with_timezone(&Utc);

        if raw.bodies.is_empty() {
            return Err(invalid("At least one body required"));
        }
        if raw.bodies.len() > MAX_BODIES {
            return Err(invalid(format!("Maximum {MAX_BODIES} bodies allowed")));
        }

        let mut bodies = Vec::with_capacity(raw.bodies.len());
        for body in raw.bodies {
            if !bodies.contains(&body) {
                bodies.push(body);
            }
        }

        Ok(Self {
            utc_iso: raw.utc_iso,
            instant,
            zodiac_system: raw.zodiac_system,
            bodies,
            want_speed: raw.want_speed.unwrap_or(true),
            debug: raw.debug.unwrap_or(false),
        })
    }
}

/// Parses and constrains a raw `data` payload.
///
/// # Errors
///
/// Any schema violation yields an `invalid-argument` [`RpcError`] whose
/// message carries the reason.
pub fn validate(data: Value) -> Result<ValidatedRequest, RpcError> {
    let raw: ProEphemerisRequest = serde_json::from_value(data).map_err(invalid)?;
    raw.try_into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ErrorKind;
    use chrono::TimeZone;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "utcISO": "1992-03-30T08:30:00.000Z",
            "zodiacSystem": "tropical",
            "bodies": ["Chiron", "Ceres"],
        })
    }

    fn rejected(data: Value) -> RpcError {
        let err = validate(data).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
        assert!(err.message.starts_with("Invalid request: "), "{}", err.message);
        err
    }

    #[test]
    fn applies_defaults() {
        let req = validate(base()).unwrap();
        assert_eq!(req.utc_iso, "1992-03-30T08:30:00.000Z");
        assert_eq!(req.instant, Utc.with_ymd_and_hms(1992, 3, 30, 8, 30, 0).unwrap());
        assert_eq!(req.zodiac_system, ZodiacSystem::Tropical);
        assert_eq!(req.bodies, vec![Body::Chiron, Body::Ceres]);
        assert!(req.want_speed);
        assert!(!req.debug);
    }

    #[test]
    fn explicit_flags_and_sidereal() {
        let mut data = base();
        data["zodiacSystem"] = json!("sidereal_lahiri");
        data["wantSpeed"] = json!(false);
        data["debug"] = json!(true);
        data["extra"] = json!("ignored");
        let req = validate(data).unwrap();
        assert_eq!(req.zodiac_system, ZodiacSystem::SiderealLahiri);
        assert!(!req.want_speed);
        assert!(req.debug);
    }

    #[test]
    fn milliseconds_are_optional() {
        let mut data = base();
        data["utcISO"] = json!("2024-01-01T00:00:00Z");
        assert!(validate(data).is_ok());
    }

    #[test]
    fn date_only_rejected() {
        let mut data = base();
        data["utcISO"] = json!("1992-03-30");
        let err = rejected(data);
        assert!(err.message.contains("utcISO"));
    }

    #[test]
    fn offset_other_than_z_rejected() {
        let mut data = base();
        data["utcISO"] = json!("1992-03-30T08:30:00+02:00");
        rejected(data);
    }

    #[test]
    fn impossible_calendar_date_rejected() {
        let mut data = base();
        data["utcISO"] = json!("2023-02-30T00:00:00Z");
        rejected(data);
    }

    #[test]
    fn empty_bodies_rejected() {
        let mut data = base();
        data["bodies"] = json!([]);
        let err = rejected(data);
        assert!(err.message.contains("At least one body"));
    }

    #[test]
    fn six_bodies_rejected() {
        let mut data = base();
        data["bodies"] = json!(["Chiron", "Ceres", "Pallas", "Juno", "Vesta", "Ceres"]);
        let err = rejected(data);
        assert!(err.message.contains("Maximum 5"));
    }

    #[test]
    fn unknown_body_rejected() {
        let mut data = base();
        data["bodies"] = json!(["Chiron", "Pluto"]);
        let err = rejected(data);
        assert!(err.message.contains("Pluto"));
    }

    #[test]
    fn unknown_zodiac_rejected() {
        let mut data = base();
        data["zodiacSystem"] = json!("sidereal_fagan");
        rejected(data);
    }

    #[test]
    fn missing_field_rejected() {
        let err = rejected(json!({ "zodiacSystem": "tropical", "bodies": ["Ceres"] }));
        assert!(err.message.contains("utcISO"));
    }

    #[test]
    fn duplicates_collapse() {
        let mut data = base();
        data["bodies"] = json!(["Ceres", "Chiron", "Ceres"]);
        let req = validate(data).unwrap();
        assert_eq!(req.bodies, vec![Body::Ceres, Body::Chiron]);
    }
}
