//! [`EphemerisProvider`] backed by the Swiss Ephemeris C library.
//!
//! Asteroid positions need the `seas_*.se1` data files under the configured
//! ephemeris path; without them every computation fails and the caller sees
//! `unavailable`.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libswisseph_sys as raw;
use parking_lot::{Mutex, const_mutex};
use swisseph::swe;
use tracing::{debug, warn};

use super::{
    Body, BodyPosition, EphemerisProvider, Extras, ProviderError, ZodiacSystem, julian_day_ut,
};

/// Default location of the ephemeris data files.
pub const DEFAULT_EPHE_PATH: &str = "/usr/local/share/swisseph";

// The library keeps its settings in thread-local globals and shares open
// file handles per thread; calls are serialized and each worker thread is
// pointed at the data files before its first computation.
static ENGINE: Mutex<()> = const_mutex(());

thread_local! {
    static CONFIGURED_PATH: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Maps a body's service constant onto the engine's planet number.
///
/// Chiron shares its number; the four asteroids are numbered consecutively
/// from `SE_CERES` in the engine.
fn engine_body(constant: i32) -> Result<u32, ProviderError> {
    match constant {
        15 => Ok(raw::SE_CHIRON),
        4..=7 => Ok(raw::SE_CERES + (constant - 4) as u32),
        other => Err(ProviderError::UnknownBody(other.to_string())),
    }
}

fn calc_flags(zodiac: ZodiacSystem, want_speed: bool) -> u32 {
    let mut flags = raw::SEFLG_SWIEPH;
    if want_speed {
        flags |= raw::SEFLG_SPEED;
    }
    if zodiac == ZodiacSystem::SiderealLahiri {
        flags |= raw::SEFLG_SIDEREAL;
    }
    flags
}

/// Swiss Ephemeris provider.
#[derive(Debug, Clone)]
pub struct SwissEphemerisProvider {
    ephe_path: String,
}

impl SwissEphemerisProvider {
    /// Creates a provider reading data files from `ephe_path`.
    ///
    /// # Errors
    ///
    /// Fails if the path is not valid UTF-8 or contains a NUL byte. A
    /// missing directory is only logged; computations report it.
    pub fn new(ephe_path: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let path = ephe_path.into();
        if !path.exists() {
            warn!(
                path = %path.display(),
                "ephemeris path does not exist, computations will fail until data files are installed"
            );
        }
        let ephe_path = path
            .to_str()
            .filter(|s| !s.contains('\0'))
            .ok_or_else(|| {
                ProviderError::Computation(format!(
                    "unusable ephemeris path {}",
                    path.display()
                ))
            })?
            .to_owned();
        Ok(Self { ephe_path })
    }

    pub fn ephe_path(&self) -> &Path {
        Path::new(&self.ephe_path)
    }

    fn configure_thread(&self) {
        CONFIGURED_PATH.with(|configured| {
            let mut configured = configured.borrow_mut();
            if configured.as_deref() != Some(self.ephe_path.as_str()) {
                debug!(path = %self.ephe_path, "pointing ephemeris engine at data files");
                swe::set_ephe_path(&self.ephe_path);
                *configured = Some(self.ephe_path.clone());
            }
        });
    }

    fn compute_blocking(
        &self,
        instant: DateTime<Utc>,
        bodies: &[Body],
        zodiac: ZodiacSystem,
        want_speed: bool,
    ) -> Result<Extras, ProviderError> {
        let jd = julian_day_ut(instant);
        let flags = calc_flags(zodiac, want_speed);

        let _engine = ENGINE.lock();
        self.configure_thread();
        if zodiac == ZodiacSystem::SiderealLahiri {
            // SAFETY: plain value arguments; the call only updates the
            // calling thread's library settings.
            unsafe { raw::swe_set_sid_mode(raw::SE_SIDM_LAHIRI as raw::int32, 0.0, 0.0) };
        }

        bodies
            .iter()
            .map(|&body| {
                let ipl = engine_body(body.constant())?;
                let out = swe::calc_ut(jd, ipl, flags)
                    .map_err(|e| ProviderError::Computation(format!("{body}: {}", e.trim())))?
                    .out;
                let speed = want_speed.then_some(out[3]);
                Ok::<_, ProviderError>((body, BodyPosition::new(out[0], speed)))
            })
            .collect()
    }
}

#[async_trait]
impl EphemerisProvider for SwissEphemerisProvider {
    async fn compute(
        &self,
        instant: DateTime<Utc>,
        bodies: &[Body],
        zodiac: ZodiacSystem,
        want_speed: bool,
    ) -> Result<Extras, ProviderError> {
        let provider = self.clone();
        let bodies = bodies.to_vec();
        tokio::task::spawn_blocking(move || {
            provider.compute_blocking(instant, &bodies, zodiac, want_speed)
        })
        .await
        .map_err(|e| ProviderError::Computation(format!("ephemeris worker failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn asteroids_follow_engine_numbering() {
        assert_eq!(engine_body(Body::Chiron.constant()).unwrap(), 15);
        assert_eq!(engine_body(Body::Ceres.constant()).unwrap(), 17);
        assert_eq!(engine_body(Body::Pallas.constant()).unwrap(), 18);
        assert_eq!(engine_body(Body::Juno.constant()).unwrap(), 19);
        assert_eq!(engine_body(Body::Vesta.constant()).unwrap(), 20);
        assert!(matches!(engine_body(3), Err(ProviderError::UnknownBody(_))));
    }

    #[test]
    fn flags_per_request() {
        let plain = calc_flags(ZodiacSystem::Tropical, false);
        assert_eq!(plain, raw::SEFLG_SWIEPH);

        let full = calc_flags(ZodiacSystem::SiderealLahiri, true);
        assert_ne!(full & raw::SEFLG_SPEED, 0);
        assert_ne!(full & raw::SEFLG_SIDEREAL, 0);
        assert_eq!(calc_flags(ZodiacSystem::Tropical, true) & raw::SEFLG_SIDEREAL, 0);
    }

    #[test]
    fn rejects_nul_in_path() {
        assert!(SwissEphemerisProvider::new("/tmp/ephe\0").is_err());
    }

    #[tokio::test]
    async fn missing_data_files_fail_the_computation() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SwissEphemerisProvider::new(dir.path()).unwrap();
        let instant = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();

        let err = provider
            .compute(instant, &[Body::Ceres], ZodiacSystem::Tropical, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Computation(_)), "{err}");
    }

    /// Needs the asteroid files; point `SWISS_EPHEMERIS_PATH` at them.
    #[tokio::test]
    #[ignore = "requires Swiss Ephemeris data files"]
    async fn computes_all_bodies_with_data_files() {
        let path = std::env::var("SWISS_EPHEMERIS_PATH")
            .unwrap_or_else(|_| DEFAULT_EPHE_PATH.to_owned());
        let provider = SwissEphemerisProvider::new(path).unwrap();
        let instant = Utc.with_ymd_and_hms(1992, 3, 30, 8, 30, 0).unwrap();

        let tropical = provider
            .compute(instant, &Body::ALL, ZodiacSystem::Tropical, true)
            .await
            .unwrap();
        let sidereal = provider
            .compute(instant, &Body::ALL, ZodiacSystem::SiderealLahiri, false)
            .await
            .unwrap();

        assert_eq!(tropical.len(), 5);
        for body in Body::ALL {
            let t = tropical[&body];
            let s = sidereal[&body];
            assert!((0.0..360.0).contains(&t.longitude_deg));
            assert!(t.speed_deg_per_day.is_some());
            assert_eq!(s.speed_deg_per_day, None);
            // Lahiri ayanamsa in 1992 is about 23.7 degrees.
            let ayanamsa = crate::angle::shortest_delta(s.longitude_deg, t.longitude_deg);
            assert!((ayanamsa - 23.7).abs() < 0.2, "{body}: {ayanamsa}");
        }
    }
}
