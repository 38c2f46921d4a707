//! Collaborators shared by the integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use proephem::ephemeris::{
    Body, BodyPosition, EphemerisProvider, Extras, ProviderError, ZodiacSystem, julian_day_ut,
};

/// Deterministic stand-in for the ephemeris engine.
///
/// Longitudes move linearly with time; Juno always moves backwards so that
/// responses carry both motion directions.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearProvider;

impl LinearProvider {
    pub fn position(body: Body, instant: DateTime<Utc>, zodiac: ZodiacSystem) -> f64 {
        let days = julian_day_ut(instant) - 2_451_545.0;
        let offset = match zodiac {
            ZodiacSystem::Tropical => 0.0,
            ZodiacSystem::SiderealLahiri => -23.85,
        };
        f64::from(body.constant()) * 30.0 + Self::speed(body) * days + offset
    }

    pub fn speed(body: Body) -> f64 {
        match body {
            Body::Juno => -0.1,
            _ => 0.05 * f64::from(body.constant()),
        }
    }
}

#[async_trait]
impl EphemerisProvider for LinearProvider {
    async fn compute(
        &self,
        instant: DateTime<Utc>,
        bodies: &[Body],
        zodiac: ZodiacSystem,
        want_speed: bool,
    ) -> Result<Extras, ProviderError> {
        Ok(bodies
            .iter()
            .map(|&body| {
                let speed = want_speed.then(|| Self::speed(body));
                (body, BodyPosition::new(Self::position(body, instant, zodiac), speed))
            })
            .collect())
    }
}
