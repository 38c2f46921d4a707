//! Ephemeris domain types and the computation provider contract.
//!
//! The numeric engine is an external collaborator: the orchestrator only
//! needs [`EphemerisProvider::compute`]. The production engine is the Swiss
//! Ephemeris, in [`swiss`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::angle;
use crate::rpc::RpcError;

pub mod swiss;

pub use swiss::SwissEphemerisProvider;

/// One of the supported minor bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Body {
    Chiron,
    Ceres,
    Pallas,
    Juno,
    Vesta,
}

impl Body {
    pub const ALL: [Body; 5] = [
        Body::Chiron,
        Body::Ceres,
        Body::Pallas,
        Body::Juno,
        Body::Vesta,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chiron => "Chiron",
            Self::Ceres => "Ceres",
            Self::Pallas => "Pallas",
            Self::Juno => "Juno",
            Self::Vesta => "Vesta",
        }
    }

    /// Swiss Ephemeris body number (`SE_CHIRON`, `SE_CERES`, ...).
    pub fn constant(self) -> i32 {
        match self {
            Self::Chiron => 15,
            Self::Ceres => 4,
            Self::Pallas => 5,
            Self::Juno => 6,
            Self::Vesta => 7,
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Body {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Body::ALL
            .into_iter()
            .find(|body| body.as_str() == s)
            .ok_or_else(|| ProviderError::UnknownBody(s.to_owned()))
    }
}

/// Reference frame in which longitudes are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZodiacSystem {
    Tropical,
    SiderealLahiri,
}

impl ZodiacSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tropical => "tropical",
            Self::SiderealLahiri => "sidereal_lahiri",
        }
    }
}

impl fmt::Display for ZodiacSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a single body at the requested instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPosition {
    /// Ecliptic longitude, always in `[0, 360)`.
    pub longitude_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_deg_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrograde: Option<bool>,
}

impl BodyPosition {
    /// Builds a position from a raw longitude and optional speed.
    ///
    /// The longitude is normalized. `retrograde` is present exactly when a
    /// speed is, and is `true` only for strictly negative speeds; a body at
    /// its station (speed `0`) counts as direct.
    pub fn new(longitude_deg: f64, speed_deg_per_day: Option<f64>) -> Self {
        Self {
            longitude_deg: angle::normalize(longitude_deg),
            speed_deg_per_day,
            retrograde: speed_deg_per_day.map(|speed| speed < 0.0),
        }
    }
}

/// Computed positions keyed by body.
pub type Extras = BTreeMap<Body, BodyPosition>;

/// Failures raised by an [`EphemerisProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown body name: {0}")]
    UnknownBody(String),

    #[error("instant {0} is outside the ephemeris range")]
    InvalidInstant(DateTime<Utc>),

    #[error("computation failed: {0}")]
    Computation(String),

    /// A failure that already carries a caller-visible kind.
    #[error(transparent)]
    Rejected(RpcError),
}

/// Produces ecliptic positions for a set of bodies.
#[async_trait]
pub trait EphemerisProvider: Send + Sync {
    async fn compute(
        &self,
        instant: DateTime<Utc>,
        bodies: &[Body],
        zodiac: ZodiacSystem,
        want_speed: bool,
    ) -> Result<Extras, ProviderError>;
}

/// Julian Day number (UT) of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Converts a UTC instant to a Julian Day in Universal Time.
pub fn julian_day_ut(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JD
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn body_constants() {
        let constant = |name: &str| name.parse::<Body>().unwrap().constant();
        assert_eq!(constant("Chiron"), 15);
        assert_eq!(constant("Ceres"), 4);
        assert_eq!(constant("Pallas"), 5);
        assert_eq!(constant("Juno"), 6);
        assert_eq!(constant("Vesta"), 7);
    }

    #[test]
    fn unknown_body() {
        let err = "Pluto".parse::<Body>().unwrap_err();
        assert!(matches!(err, ProviderError::UnknownBody(name) if name == "Pluto"));
        assert!("chiron".parse::<Body>().is_err());
    }

    #[test]
    fn zodiac_wire_names() {
        assert_eq!(
            serde_json::to_value(ZodiacSystem::SiderealLahiri).unwrap(),
            "sidereal_lahiri"
        );
        let z: ZodiacSystem = serde_json::from_str("\"tropical\"").unwrap();
        assert_eq!(z, ZodiacSystem::Tropical);
    }

    #[test]
    fn julian_day_epochs() {
        let unix = Utc.timestamp_opt(0, 0).unwrap();
        assert_eq!(julian_day_ut(unix), 2_440_587.5);

        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(julian_day_ut(j2000), 2_451_545.0);
    }

    #[test]
    fn retrograde_follows_speed_sign() {
        assert_eq!(BodyPosition::new(10.0, Some(-0.01)).retrograde, Some(true));
        assert_eq!(BodyPosition::new(10.0, Some(0.02)).retrograde, Some(false));
        assert_eq!(BodyPosition::new(10.0, None).retrograde, None);
    }

    #[test]
    fn stationary_counts_as_direct() {
        assert_eq!(BodyPosition::new(10.0, Some(0.0)).retrograde, Some(false));
        assert_eq!(BodyPosition::new(10.0, Some(-0.0)).retrograde, Some(false));
    }

    #[test]
    fn position_normalizes_longitude() {
        assert_eq!(BodyPosition::new(-30.0, None).longitude_deg, 330.0);
    }

    #[test]
    fn extras_wire_shape() {
        let mut extras = Extras::new();
        extras.insert(Body::Chiron, BodyPosition::new(12.5, None));
        extras.insert(Body::Ceres, BodyPosition::new(200.0, Some(-0.25)));

        let value = serde_json::to_value(&extras).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "Chiron": { "longitudeDeg": 12.5 },
                "Ceres": { "longitudeDeg": 200.0, "speedDegPerDay": -0.25, "retrograde": true },
            })
        );

        let back: Extras = serde_json::from_value(value).unwrap();
        assert_eq!(back, extras);
    }
}
