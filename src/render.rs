use crate::cities::CITIES;
use crate::fetch::FetchError;
use crate::heat::{to_feature_collection, HeatLayer, HEAT_LAYER_ID, HEAT_SOURCE_ID};
use crate::query::{build_query, OverpassQuery};
use crate::types::{FilterSet, Location, PointCollection};
use geo::Point;
use geojson::FeatureCollection;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Zoom used when the map is created and whenever it re-centres.
pub const DEFAULT_ZOOM: f64 = 12.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapInit {
    /// `[lng, lat]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lng: f64,
    pub lat: f64,
    pub popup: String,
}

impl Marker {
    pub fn for_location(location: &Location) -> Self {
        Self {
            lng: location.lng,
            lat: location.lat,
            popup: format!("{}, {}", location.name, location.country),
        }
    }
}

/// Operations the renderer needs from a map widget.
pub trait MapWidget {
    fn add_marker(&mut self, marker: Marker);
    fn has_source(&self, id: &str) -> bool;
    fn add_source(&mut self, id: &str, data: FeatureCollection);
    fn set_source_data(&mut self, id: &str, data: FeatureCollection);
    fn add_heat_layer(&mut self, layer: HeatLayer);
    fn fly_to(&mut self, center: Point<f64>, zoom: f64);
    fn set_style(&mut self, style_url: &str);
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("map is not mounted yet")]
    NotMounted,
    #[error("map is already mounted")]
    AlreadyMounted,
}

/// A refresh in flight: the query to run and the sequence it was issued at.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTicket {
    seq: u64,
    pub query: OverpassQuery,
    pub location_id: &'static str,
}

impl RefreshTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Applied { points: usize },
    /// A newer refresh was issued before this one completed.
    Stale,
    /// The fetch failed; the previous heat data is still shown.
    Failed,
}

struct Mounted<W> {
    widget: W,
    location_id: &'static str,
    latest_seq: u64,
    last_points: Option<PointCollection>,
}

enum RendererState<W> {
    Uninitialized,
    Ready(Mounted<W>),
}

/// Only the latest issued refresh may touch the map.
pub struct MapRenderer<W> {
    state: RendererState<W>,
    zoom: f64,
}

impl<W: MapWidget> MapRenderer<W> {
    pub fn new(zoom: f64) -> Self {
        Self {
            state: RendererState::Uninitialized,
            zoom,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Creates the widget centred on `location` and places a marker for
    /// every registry city. Only valid once.
    pub fn mount<F>(
        &mut self,
        location: &'static Location,
        style_url: &str,
        make_widget: F,
    ) -> Result<(), RenderError>
    where
        F: FnOnce(MapInit) -> W,
    {
        if self.is_ready() {
            return Err(RenderError::AlreadyMounted);
        }

        let mut widget = make_widget(MapInit {
            center: [location.lng, location.lat],
            zoom: self.zoom,
            style: style_url.to_string(),
        });
        for city in CITIES {
            widget.add_marker(Marker::for_location(city));
        }
        info!(city = location.id, markers = CITIES.len(), "map mounted");

        self.state = RendererState::Ready(Mounted {
            widget,
            location_id: location.id,
            latest_seq: 0,
            last_points: None,
        });
        Ok(())
    }

    fn mounted(&mut self) -> Result<&mut Mounted<W>, RenderError> {
        match &mut self.state {
            RendererState::Ready(m) => Ok(m),
            RendererState::Uninitialized => Err(RenderError::NotMounted),
        }
    }

    /// Starts a refresh cycle for the given state. Re-centres the camera
    /// right away if the location changed since the last refresh.
    pub fn begin_refresh(
        &mut self,
        filters: &FilterSet,
        location: &'static Location,
    ) -> Result<RefreshTicket, RenderError> {
        let zoom = self.zoom;
        let mounted = self.mounted()?;

        if mounted.location_id != location.id {
            debug!(from = mounted.location_id, to = location.id, "re-centring map");
            mounted.widget.fly_to(location.center(), zoom);
            mounted.location_id = location.id;
        }

        mounted.latest_seq += 1;
        Ok(RefreshTicket {
            seq: mounted.latest_seq,
            query: build_query(filters, location),
            location_id: location.id,
        })
    }

    pub fn complete_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<PointCollection, FetchError>,
    ) -> Result<RefreshOutcome, RenderError> {
        let mounted = self.mounted()?;

        if ticket.seq != mounted.latest_seq {
            debug!(seq = ticket.seq, latest = mounted.latest_seq, "discarding stale response");
            return Ok(RefreshOutcome::Stale);
        }

        let points = match result {
            Ok(points) => points,
            Err(e) => {
                warn!(error = %e, seq = ticket.seq, "error fetching Overpass data");
                return Ok(RefreshOutcome::Failed);
            }
        };

        draw(&mut mounted.widget, &points);
        let count = points.len();
        mounted.last_points = Some(points);
        Ok(RefreshOutcome::Applied { points: count })
    }

    /// Swaps the basemap and restores the heat layer on top of it.
    pub fn set_style(&mut self, style_url: &str) -> Result<(), RenderError> {
        let mounted = self.mounted()?;
        mounted.widget.set_style(style_url);
        if let Some(points) = &mounted.last_points {
            draw(&mut mounted.widget, points);
        }
        Ok(())
    }
}

fn draw<W: MapWidget>(widget: &mut W, points: &PointCollection) {
    let data = to_feature_collection(points);
    if widget.has_source(HEAT_SOURCE_ID) {
        widget.set_source_data(HEAT_SOURCE_ID, data);
    } else {
        widget.add_source(HEAT_SOURCE_ID, data);
        widget.add_heat_layer(HeatLayer::new(HEAT_LAYER_ID, HEAT_SOURCE_ID));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cities;
    use crate::types::{Filter, PointRecord};
    use reqwest::StatusCode;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeWidget {
        init: Option<MapInit>,
        markers: usize,
        sources: HashMap<String, usize>,
        layers: Vec<String>,
        calls: Vec<String>,
        camera: Option<([f64; 2], f64)>,
    }

    impl MapWidget for FakeWidget {
        fn add_marker(&mut self, _marker: Marker) {
            self.markers += 1;
        }
        fn has_source(&self, id: &str) -> bool {
            self.sources.contains_key(id)
        }
        fn add_source(&mut self, id: &str, data: FeatureCollection) {
            self.calls.push(format!("add_source:{id}"));
            self.sources.insert(id.to_string(), data.features.len());
        }
        fn set_source_data(&mut self, id: &str, data: FeatureCollection) {
            self.calls.push(format!("set_data:{id}"));
            self.sources.insert(id.to_string(), data.features.len());
        }
        fn add_heat_layer(&mut self, layer: HeatLayer) {
            self.calls.push(format!("add_layer:{}", layer.id));
            self.layers.push(layer.id);
        }
        fn fly_to(&mut self, center: Point<f64>, zoom: f64) {
            self.calls.push("fly_to".to_string());
            self.camera = Some(([center.x(), center.y()], zoom));
        }
        fn set_style(&mut self, _style_url: &str) {
            self.calls.push("set_style".to_string());
            self.sources.clear();
            self.layers.clear();
        }
    }

    fn points(n: usize) -> PointCollection {
        (0..n)
            .filter_map(|i| PointRecord::new(-58.38 + i as f64 * 0.001, -34.60))
            .collect()
    }

    fn widget(r: &MapRenderer<FakeWidget>) -> &FakeWidget {
        match &r.state {
            RendererState::Ready(m) => &m.widget,
            RendererState::Uninitialized => panic!("not mounted"),
        }
    }

    fn mounted_on(id: &str) -> MapRenderer<FakeWidget> {
        let mut r = MapRenderer::new(DEFAULT_ZOOM);
        r.mount(cities::find(id).unwrap(), "style://dark", |init| FakeWidget {
            init: Some(init),
            ..Default::default()
        })
        .unwrap();
        r
    }

    #[test]
    fn mount_centres_and_places_markers_once() {
        let mut r = mounted_on("buenos-aires");
        let w = widget(&r);
        let init = w.init.as_ref().unwrap();
        assert_eq!(init.center, [-58.3816, -34.6037]);
        assert_eq!(init.zoom, 12.0);
        assert_eq!(init.style, "style://dark");
        assert_eq!(w.markers, CITIES.len());

        let again = r.mount(cities::find("lima").unwrap(), "style://dark", |_| FakeWidget::default());
        assert_eq!(again, Err(RenderError::AlreadyMounted));
    }

    #[test]
    fn refresh_before_mount_is_rejected() {
        let mut r: MapRenderer<FakeWidget> = MapRenderer::new(DEFAULT_ZOOM);
        let ba = cities::find("buenos-aires").unwrap();
        assert_eq!(r.begin_refresh(&FilterSet::default(), ba), Err(RenderError::NotMounted));
        assert_eq!(r.set_style("x"), Err(RenderError::NotMounted));
    }

    #[test]
    fn first_refresh_creates_layer_then_updates_in_place() {
        let mut r = mounted_on("buenos-aires");
        let ba = cities::find("buenos-aires").unwrap();

        let t1 = r.begin_refresh(&FilterSet::default(), ba).unwrap();
        assert_eq!(r.complete_refresh(t1, Ok(points(3))), Ok(RefreshOutcome::Applied { points: 3 }));

        let mut filters = FilterSet::default();
        filters.toggle(Filter::Vehicles);
        let t2 = r.begin_refresh(&filters, ba).unwrap();
        assert_eq!(t2.query.clauses().len(), 2);
        assert_eq!(r.complete_refresh(t2, Ok(points(1))), Ok(RefreshOutcome::Applied { points: 1 }));

        let w = widget(&r);
        assert_eq!(w.calls, vec!["add_source:traffic", "add_layer:traffic-heat", "set_data:traffic"]);
        assert_eq!(w.sources["traffic"], 1);
        assert_eq!(w.layers, vec!["traffic-heat"]);
    }

    #[test]
    fn failed_fetch_keeps_previous_data() {
        let mut r = mounted_on("buenos-aires");
        let ba = cities::find("buenos-aires").unwrap();

        let t1 = r.begin_refresh(&FilterSet::default(), ba).unwrap();
        r.complete_refresh(t1, Ok(points(4))).unwrap();

        let t2 = r.begin_refresh(&FilterSet::default(), ba).unwrap();
        let outcome = r
            .complete_refresh(t2, Err(FetchError::Status(StatusCode::GATEWAY_TIMEOUT)))
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Failed);
        assert_eq!(widget(&r).sources["traffic"], 4);
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut r = mounted_on("buenos-aires");
        let ba = cities::find("buenos-aires").unwrap();

        let older = r.begin_refresh(&FilterSet::default(), ba).unwrap();
        let newer = r.begin_refresh(&FilterSet::none(), ba).unwrap();
        assert!(newer.seq() > older.seq());

        assert_eq!(r.complete_refresh(newer, Ok(points(0))), Ok(RefreshOutcome::Applied { points: 0 }));
        assert_eq!(r.complete_refresh(older, Ok(points(9))), Ok(RefreshOutcome::Stale));
        assert_eq!(widget(&r).sources["traffic"], 0);
    }

    #[test]
    fn location_change_recentres_at_fixed_zoom() {
        let mut r = mounted_on("buenos-aires");
        let tokyo = cities::find("tokyo").unwrap();

        let ticket = r.begin_refresh(&FilterSet::none(), tokyo).unwrap();
        assert_eq!(ticket.location_id, "tokyo");
        assert_eq!(widget(&r).camera, Some(([139.6503, 35.6762], DEFAULT_ZOOM)));

        // same location again: no camera move
        r.begin_refresh(&FilterSet::default(), tokyo).unwrap();
        let flights = widget(&r).calls.iter().filter(|c| *c == "fly_to").count();
        assert_eq!(flights, 1);
    }

    #[test]
    fn style_change_restores_heat_layer() {
        let mut r = mounted_on("buenos-aires");
        let ba = cities::find("buenos-aires").unwrap();
        let t = r.begin_refresh(&FilterSet::default(), ba).unwrap();
        r.complete_refresh(t, Ok(points(2))).unwrap();

        r.set_style("style://light").unwrap();
        let w = widget(&r);
        assert_eq!(
            w.calls,
            vec![
                "add_source:traffic",
                "add_layer:traffic-heat",
                "set_style",
                "add_source:traffic",
                "add_layer:traffic-heat"
            ]
        );
        assert_eq!(w.sources["traffic"], 2);
    }
}
