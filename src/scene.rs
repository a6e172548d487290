use crate::heat::HeatLayer;
use crate::render::{MapInit, MapWidget, Marker};
use geo::Point;
use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapCommand {
    Create(MapInit),
    SetStyle { style: String },
    AddMarker(Marker),
    AddSource { id: String, data: FeatureCollection },
    SetData { id: String, data: FeatureCollection },
    AddHeatLayer { layer: HeatLayer },
    FlyTo { center: [f64; 2], zoom: f64 },
}

#[derive(Debug, Default)]
struct Scene {
    pending: Vec<MapCommand>,
    init: Option<MapInit>,
    markers: Vec<Marker>,
    sources: BTreeMap<String, FeatureCollection>,
    layers: Vec<HeatLayer>,
}

impl Scene {
    fn record(&mut self, command: MapCommand) {
        self.pending.push(command);
    }
}

/// Shared view of a [`SceneWidget`]'s state.
#[derive(Debug, Clone, Default)]
pub struct SceneHandle(Arc<Mutex<Scene>>);

impl SceneHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Scene> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes every command recorded since the last drain. Callers hold the
    /// dashboard lock, so these are only the commands their own call made.
    pub fn drain(&self) -> Vec<MapCommand> {
        std::mem::take(&mut self.lock().pending)
    }

    /// Commands rebuilding the current scene from scratch, for a page that
    /// reconnects to an already mounted map. Pending commands are untouched.
    pub fn replay(&self) -> Vec<MapCommand> {
        let scene = self.lock();

        let Some(init) = scene.init.clone() else {
            return Vec::new();
        };
        let mut commands = vec![MapCommand::Create(init)];
        commands.extend(scene.markers.iter().cloned().map(MapCommand::AddMarker));
        commands.extend(scene.sources.iter().map(|(id, data)| MapCommand::AddSource {
            id: id.clone(),
            data: data.clone(),
        }));
        commands.extend(
            scene
                .layers
                .iter()
                .cloned()
                .map(|layer| MapCommand::AddHeatLayer { layer }),
        );
        commands
    }

    pub fn source_data(&self, id: &str) -> Option<FeatureCollection> {
        self.lock().sources.get(id).cloned()
    }
}

pub struct SceneWidget {
    scene: SceneHandle,
}

impl SceneWidget {
    pub fn new(init: MapInit, scene: SceneHandle) -> Self {
        {
            let mut s = scene.lock();
            s.init = Some(init.clone());
            s.record(MapCommand::Create(init));
        }
        Self { scene }
    }
}

impl MapWidget for SceneWidget {
    fn add_marker(&mut self, marker: Marker) {
        let mut s = self.scene.lock();
        s.markers.push(marker.clone());
        s.record(MapCommand::AddMarker(marker));
    }

    fn has_source(&self, id: &str) -> bool {
        self.scene.lock().sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, data: FeatureCollection) {
        let mut s = self.scene.lock();
        s.sources.insert(id.to_string(), data.clone());
        s.record(MapCommand::AddSource { id: id.to_string(), data });
    }

    fn set_source_data(&mut self, id: &str, data: FeatureCollection) {
        let mut s = self.scene.lock();
        s.sources.insert(id.to_string(), data.clone());
        s.record(MapCommand::SetData { id: id.to_string(), data });
    }

    fn add_heat_layer(&mut self, layer: HeatLayer) {
        let mut s = self.scene.lock();
        s.layers.push(layer.clone());
        s.record(MapCommand::AddHeatLayer { layer });
    }

    fn fly_to(&mut self, center: Point<f64>, zoom: f64) {
        let center = [center.x(), center.y()];
        let mut s = self.scene.lock();
        if let Some(init) = s.init.as_mut() {
            init.center = center;
            init.zoom = zoom;
        }
        s.record(MapCommand::FlyTo { center, zoom });
    }

    // A style swap drops every source and layer on the MapLibre side.
    fn set_style(&mut self, style_url: &str) {
        let mut s = self.scene.lock();
        if let Some(init) = s.init.as_mut() {
            init.style = style_url.to_string();
        }
        s.sources.clear();
        s.layers.clear();
        s.record(MapCommand::SetStyle {
            style: style_url.to_string(),
        });
    }
}
