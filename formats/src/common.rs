//! Common code and conversions.
//!

/// Convert a Base Station altitude (feet) into meters
///
#[inline]
pub fn to_meters(ft: f64) -> f64 {
    ft * 0.3048
}

/// Convert meters into feet
///
#[inline]
pub fn to_feet(m: f64) -> f64 {
    m / 0.3048
}
