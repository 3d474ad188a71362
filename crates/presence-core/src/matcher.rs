//! Classification of an observation against the place catalog.
//!
//! The reported accuracy widens every place: an observation matches a place
//! when its distance to the center is strictly less than
//! `radius + accuracy`. Places are tried in catalog order and the first
//! hit wins, even when a later, overlapping place has a closer center.

use presence_types::{Observation, Place, WORLD};

use crate::geo::distance_m;

/// Return the name of the first place containing the observation, or
/// [`WORLD`] when none does.
pub fn match_location<'a>(observation: &Observation, places: &'a [Place]) -> &'a str {
    places
        .iter()
        .find(|place| contains(place, observation))
        .map_or(WORLD, |place| place.name.as_str())
}

/// Whether the observation falls inside the place's accuracy-widened circle.
#[allow(clippy::arithmetic_side_effects)]
fn contains(place: &Place, observation: &Observation) -> bool {
    distance_m(place.center, observation.position) < place.radius + observation.accuracy
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{DateTime, Utc};
    use presence_types::Coordinate;

    use super::*;

    fn place(name: &str, lat: f64, lon: f64, radius: f64) -> Place {
        Place {
            name: name.to_owned(),
            center: Coordinate::new(lat, lon),
            radius,
        }
    }

    fn observe(lat: f64, lon: f64, accuracy: f64) -> Observation {
        Observation {
            position: Coordinate::new(lat, lon),
            accuracy,
            timestamp: DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn matches_home_within_widened_radius() {
        let places = vec![place("Home", 10.0, 10.0, 50.0)];
        // ~33m away: inside 50 + 20.
        assert_eq!(match_location(&observe(10.0003, 10.0, 20.0), &places), "Home");
    }

    #[test]
    fn accuracy_expands_the_region() {
        let places = vec![place("Home", 10.0, 10.0, 20.0)];
        let obs_precise = observe(10.0003, 10.0, 5.0);
        let obs_fuzzy = observe(10.0003, 10.0, 15.0);
        assert_eq!(match_location(&obs_precise, &places), WORLD);
        assert_eq!(match_location(&obs_fuzzy, &places), "Home");
    }

    #[test]
    fn falls_back_to_world() {
        let places = vec![place("Home", 10.0, 10.0, 50.0)];
        assert_eq!(match_location(&observe(11.0, 10.0, 20.0), &places), WORLD);
    }

    #[test]
    fn empty_catalog_is_world() {
        assert_eq!(match_location(&observe(10.0, 10.0, 0.0), &[]), WORLD);
    }

    #[test]
    fn first_place_in_catalog_order_wins_overlap() {
        // The observation sits on Office's center but Park is listed first
        // and its large circle also contains it.
        let places = vec![
            place("Park", 10.0, 10.0, 500.0),
            place("Office", 10.001, 10.0, 50.0),
        ];
        assert_eq!(match_location(&observe(10.001, 10.0, 0.0), &places), "Park");

        let reversed = vec![
            place("Office", 10.001, 10.0, 50.0),
            place("Park", 10.0, 10.0, 500.0),
        ];
        assert_eq!(match_location(&observe(10.001, 10.0, 0.0), &reversed), "Office");
    }

    #[test]
    fn boundary_is_exclusive() {
        // Zero radius and zero accuracy: even the exact center does not match.
        let places = vec![place("Pin", 10.0, 10.0, 0.0)];
        assert_eq!(match_location(&observe(10.0, 10.0, 0.0), &places), WORLD);
    }
}
