use geo::Point;
use serde::{Deserialize, Serialize};

/// Search radius, in meters, for locations that do not set one.
pub const DEFAULT_RADIUS_M: u32 = 5000;

/// One of the three data categories shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Accidents,
    RoadClosures,
    Vehicles,
}

impl Filter {
    /// Canonical clause order in built queries.
    pub const ALL: [Filter; 3] = [Filter::Accidents, Filter::Vehicles, Filter::RoadClosures];

    pub fn label(self) -> &'static str {
        match self {
            Filter::Accidents => "Accidents",
            Filter::RoadClosures => "Road Closures",
            Filter::Vehicles => "Vehicles",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    pub accidents: bool,
    pub road_closures: bool,
    pub vehicles: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            accidents: true,
            road_closures: true,
            vehicles: true,
        }
    }
}

impl FilterSet {
    pub fn none() -> Self {
        Self {
            accidents: false,
            road_closures: false,
            vehicles: false,
        }
    }

    fn slot(&mut self, filter: Filter) -> &mut bool {
        match filter {
            Filter::Accidents => &mut self.accidents,
            Filter::RoadClosures => &mut self.road_closures,
            Filter::Vehicles => &mut self.vehicles,
        }
    }

    pub fn is_enabled(&self, filter: Filter) -> bool {
        match filter {
            Filter::Accidents => self.accidents,
            Filter::RoadClosures => self.road_closures,
            Filter::Vehicles => self.vehicles,
        }
    }

    pub fn set(&mut self, filter: Filter, enabled: bool) {
        *self.slot(filter) = enabled;
    }

    pub fn toggle(&mut self, filter: Filter) {
        let slot = self.slot(filter);
        *slot = !*slot;
    }

    /// Enabled filters in canonical order.
    pub fn enabled(&self) -> impl Iterator<Item = Filter> + '_ {
        Filter::ALL.into_iter().filter(|f| self.is_enabled(*f))
    }

    pub fn active_count(&self) -> usize {
        self.enabled().count()
    }
}

/// A named place used to centre the map and scope queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<u32>,
}

impl Location {
    pub fn radius_or_default(&self) -> u32 {
        self.radius.unwrap_or(DEFAULT_RADIUS_M)
    }

    /// Map centre as a (lng, lat) point.
    pub fn center(&self) -> Point<f64> {
        Point::new(self.lng, self.lat)
    }
}

/// A single fetched coordinate. Only valid WGS84 positions can be built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointRecord(Point<f64>);

impl PointRecord {
    pub fn new(lon: f64, lat: f64) -> Option<Self> {
        let valid = lon.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lon)
            && (-90.0..=90.0).contains(&lat);
        valid.then(|| Self(Point::new(lon, lat)))
    }

    pub fn lon(&self) -> f64 {
        self.0.x()
    }

    pub fn lat(&self) -> f64 {
        self.0.y()
    }

    pub fn as_point(&self) -> &Point<f64> {
        &self.0
    }
}

/// Points from one fetch, replaced wholesale on every refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCollection {
    points: Vec<PointRecord>,
}

impl PointCollection {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointRecord> {
        self.points.iter()
    }
}

impl FromIterator<PointRecord> for PointCollection {
    fn from_iter<I: IntoIterator<Item = PointRecord>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_flips_only_the_named_filter() {
        let mut filters = FilterSet::default();
        assert_eq!(filters.active_count(), 3);

        filters.toggle(Filter::Vehicles);
        assert!(!filters.vehicles);
        assert!(filters.accidents && filters.road_closures);
        assert_eq!(filters.active_count(), 2);

        filters.toggle(Filter::Vehicles);
        assert_eq!(filters, FilterSet::default());
    }

    #[test]
    fn enabled_follows_canonical_order() {
        let filters = FilterSet::default();
        let order: Vec<_> = filters.enabled().collect();
        assert_eq!(order, vec![Filter::Accidents, Filter::Vehicles, Filter::RoadClosures]);
        assert_eq!(FilterSet::none().enabled().count(), 0);
    }

    #[test]
    fn point_record_rejects_invalid_coordinates() {
        assert!(PointRecord::new(-58.3816, -34.6037).is_some());
        assert!(PointRecord::new(180.0, -90.0).is_some());
        assert!(PointRecord::new(f64::NAN, 0.0).is_none());
        assert!(PointRecord::new(0.0, f64::INFINITY).is_none());
        assert!(PointRecord::new(181.0, 0.0).is_none());
        assert!(PointRecord::new(0.0, -90.5).is_none());
    }

    #[test]
    fn radius_defaults_to_five_kilometres() {
        let mut place = Location {
            id: "x",
            name: "X",
            country: "Y",
            lat: 1.0,
            lng: 2.0,
            radius: None,
        };
        assert_eq!(place.radius_or_default(), 5000);
        place.radius = Some(1200);
        assert_eq!(place.radius_or_default(), 1200);
    }
}
