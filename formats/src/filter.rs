//! Admission predicates applied to decoded messages.
//!
//! The filter answers true when all implemented sub-tests pass.  Only the
//! altitude band is implemented for now, the other criteria of the original
//! design (radius, speed, climb) never made it into production.
//!

use thiserror::Error;
use tracing::trace;

use crate::AdsbEvent;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("'below' altitude bound ({below}) must be higher than 'above' ({above})")]
    InvertedBounds { below: i32, above: i32 },
}

/// Altitude band filter.
///
/// In strict mode (the default) a message without an altitude is rejected,
/// otherwise it passes.
///
#[derive(Clone, Copy, Debug)]
pub struct AdsbMessageFilter {
    /// Upper bound in feet, exclusive
    pub below: i32,
    /// Lower bound in feet, exclusive
    pub above: i32,
    /// Reject messages missing the tested field
    pub strict: bool,
}

impl AdsbMessageFilter {
    /// Build a filter for the given altitude band.  The band must be
    /// non-empty, an inverted one is a configuration error.
    ///
    pub fn new(below: i32, above: i32) -> Result<Self, FilterError> {
        if below <= above {
            return Err(FilterError::InvertedBounds { below, above });
        }
        Ok(AdsbMessageFilter {
            below,
            above,
            strict: true,
        })
    }

    /// Lenient variant, messages without an altitude pass.
    ///
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// True iff the reported altitude lies inside the band.
    ///
    pub fn altitude(&self, event: &AdsbEvent) -> bool {
        match event.altitude {
            Some(alt) => self.above < alt && alt < self.below,
            None => !self.strict,
        }
    }

    /// Conjunction of all sub-tests.
    ///
    pub fn filter(&self, event: &AdsbEvent) -> bool {
        trace!("filtering {}", event.hexident);
        self.altitude(event)
    }
}

impl Default for AdsbMessageFilter {
    fn default() -> Self {
        AdsbMessageFilter {
            below: 100_000,
            above: -1_000,
            strict: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    fn event_at(altitude: Option<i32>) -> AdsbEvent {
        let mut event = AdsbEvent::from_line(
            "MSG,3,1,1,A04424,1,2019/10/20,11:33:40.311,2019/10/20,11:33:40.311,,3000,,,46.65470,-2.77776,,,,,,0",
        )
        .unwrap();
        event.altitude = altitude;
        event
    }

    #[rstest]
    #[case(Some(3000), true)]
    #[case(Some(10_000), false)]
    #[case(Some(9_999), true)]
    #[case(Some(-1_000), false)]
    #[case(Some(-999), true)]
    #[case(None, false)]
    fn test_altitude_band(#[case] altitude: Option<i32>, #[case] expected: bool) {
        let filter = AdsbMessageFilter::new(10_000, -1_000).unwrap();
        assert_eq!(expected, filter.altitude(&event_at(altitude)));
    }

    #[test]
    fn test_altitude_missing_lenient() {
        let filter = AdsbMessageFilter::new(10_000, -1_000).unwrap().lenient();
        assert!(filter.altitude(&event_at(None)));
    }

    #[test]
    fn test_inverted_bounds() {
        assert!(AdsbMessageFilter::new(-1_000, 10_000).is_err());
        assert!(AdsbMessageFilter::new(500, 500).is_err());
    }

    #[test]
    fn test_filter_is_conjunction() {
        let filter = AdsbMessageFilter::new(10_000, -1_000).unwrap();
        assert!(filter.filter(&event_at(Some(500))));
        assert!(!filter.filter(&event_at(Some(20_000))));
    }
}
