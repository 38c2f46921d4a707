//! Angle arithmetic on the ecliptic circle.
//!
//! Longitudes handed to clients are always canonical, i.e. in `[0, 360)`.
//! [`shortest_delta`] gives circular-distance semantics and is what the
//! reference provider uses to difference two longitudes into a speed.

/// Maps any finite angle in degrees onto `[0, 360)`.
///
/// # Examples
///
/// ```
/// use proephem::angle::normalize;
///
/// assert_eq!(normalize(-10.0), 350.0);
/// assert_eq!(normalize(725.0), 5.0);
/// ```
pub fn normalize(degrees: f64) -> f64 {
    let n = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if n >= 360.0 { 0.0 } else { n }
}

/// Signed minimal angular difference `b - a`, in `[-180, 180)`.
///
/// # Examples
///
/// ```
/// use proephem::angle::shortest_delta;
///
/// assert_eq!(shortest_delta(350.0, 10.0), 20.0);
/// assert_eq!(shortest_delta(10.0, 350.0), -20.0);
/// ```
pub fn shortest_delta(a: f64, b: f64) -> f64 {
    let delta = normalize(b) - normalize(a);
    (delta + 540.0).rem_euclid(360.0) - 180.0
}
