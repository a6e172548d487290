use crate::types::PointCollection;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

pub const HEAT_SOURCE_ID: &str = "traffic";
pub const HEAT_LAYER_ID: &str = "traffic-heat";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorStop {
    pub density: f64,
    pub color: &'static str,
}

/// Transparent at zero density, then green, yellow, orange, red.
pub const COLOR_RAMP: [ColorStop; 5] = [
    ColorStop { density: 0.0, color: "rgba(0, 0, 0, 0)" },
    ColorStop { density: 0.2, color: "green" },
    ColorStop { density: 0.4, color: "yellow" },
    ColorStop { density: 0.6, color: "orange" },
    ColorStop { density: 0.8, color: "red" },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatPaint {
    #[serde(rename = "heatmap-weight")]
    pub weight: f64,
    #[serde(rename = "heatmap-intensity")]
    pub intensity: f64,
    #[serde(rename = "heatmap-radius")]
    pub radius: f64,
    #[serde(rename = "heatmap-color", serialize_with = "interpolate_density")]
    pub ramp: &'static [ColorStop],
}

impl Default for HeatPaint {
    fn default() -> Self {
        Self {
            weight: 1.0,
            intensity: 1.0,
            radius: 20.0,
            ramp: &COLOR_RAMP,
        }
    }
}

/// Writes the ramp as `["interpolate", ["linear"], ["heatmap-density"], d0, c0, ...]`.
fn interpolate_density<S: Serializer>(ramp: &&'static [ColorStop], ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(3 + ramp.len() * 2))?;
    seq.serialize_element("interpolate")?;
    seq.serialize_element(&["linear"])?;
    seq.serialize_element(&["heatmap-density"])?;
    for stop in ramp.iter() {
        seq.serialize_element(&stop.density)?;
        seq.serialize_element(stop.color)?;
    }
    seq.end()
}

/// A heatmap style layer, serialized in the shape `map.addLayer` expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatLayer {
    pub id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    pub source: String,
    pub paint: HeatPaint,
}

impl HeatLayer {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "heatmap",
            source: source.into(),
            paint: HeatPaint::default(),
        }
    }
}

pub fn to_feature_collection(points: &PointCollection) -> FeatureCollection {
    let features = points
        .iter()
        .map(|p| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::from(p.as_point()))),
            id: None,
            properties: None,
            foreign_members: None,
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointRecord;
    use serde_json::json;

    #[test]
    fn layer_serializes_as_maplibre_heatmap() {
        let layer = serde_json::to_value(HeatLayer::new(HEAT_LAYER_ID, HEAT_SOURCE_ID)).unwrap();
        assert_eq!(
            layer,
            json!({
                "id": "traffic-heat",
                "type": "heatmap",
                "source": "traffic",
                "paint": {
                    "heatmap-weight": 1.0,
                    "heatmap-intensity": 1.0,
                    "heatmap-radius": 20.0,
                    "heatmap-color": [
                        "interpolate", ["linear"], ["heatmap-density"],
                        0.0, "rgba(0, 0, 0, 0)",
                        0.2, "green",
                        0.4, "yellow",
                        0.6, "orange",
                        0.8, "red"
                    ]
                }
            })
        );
    }

    #[test]
    fn points_become_lng_lat_features() {
        let points: PointCollection = [(-58.38, -34.60), (-58.39, -34.61)]
            .into_iter()
            .filter_map(|(lon, lat)| PointRecord::new(lon, lat))
            .collect();
        let fc = to_feature_collection(&points);
        assert_eq!(fc.features.len(), 2);

        let value = serde_json::to_value(&fc).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"][0]["geometry"]["type"], "Point");
        assert_eq!(value["features"][0]["geometry"]["coordinates"], json!([-58.38, -34.60]));
    }

    #[test]
    fn empty_collection_is_valid_geojson() {
        let fc = to_feature_collection(&PointCollection::default());
        assert!(fc.features.is_empty());
    }
}
