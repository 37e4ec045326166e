//! The clustered artist source and the three layers drawn from it.
//!
//! Layer stacking is fixed by [`artist_layer_stack`]: cluster circles at
//! the bottom, their count labels above, unclustered avatar icons on top.
//! Layers are added in that order and removed in reverse.

use crate::config::{
    CLUSTER_MAX_ZOOM, CLUSTER_RADIUS, MAP_ICON_DISPLAY_SIZE, PLACEHOLDER_ICON_ID,
};
use crate::engine::{LayerBindings, MapEngine, MapError};
use crate::geo::{LngLat, LngLatBounds};
use crate::icons::IconRegistry;
use crate::ArtistRecord;
use log::{debug, info, warn};
use serde_json::{json, Value};
use std::cell::Cell;
use std::collections::HashMap;

pub const ARTIST_SOURCE_ID: &str = "artist-locations";
pub const CLUSTER_CIRCLE_LAYER_ID: &str = "artist-clusters-circle";
pub const CLUSTER_COUNT_LAYER_ID: &str = "artist-clusters-count";
pub const ARTIST_ICON_LAYER_ID: &str = "unclustered-artists-icon";

/// One located artist on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub artist_id: String,
    pub name: String,
    pub icon_id: String,
    pub rank: u32,
    pub position: LngLat,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<PointFeature>,
}

impl FeatureCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn bounds(&self) -> Option<LngLatBounds> {
        LngLatBounds::from_points(self.features.iter().map(|f| f.position))
    }

    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .features
            .iter()
            .map(|f| {
                json!({
                    "type": "Feature",
                    "id": f.artist_id,
                    "geometry": { "type": "Point", "coordinates": f.position.to_array() },
                    "properties": {
                        "id": f.artist_id,
                        "artistId": f.artist_id,
                        "name": f.name,
                        "iconId": f.icon_id,
                        "rank": f.rank,
                    }
                })
            })
            .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }
}

/// Build one feature per located record. Records whose avatar was not
/// registered (or that have none) get the placeholder icon.
pub fn build_feature_collection(
    records: &[ArtistRecord],
    icon_for_url: &HashMap<String, String>,
) -> FeatureCollection {
    let features = records
        .iter()
        .filter_map(|r| {
            let position = r.position?;
            let icon_id = r
                .image_url
                .as_ref()
                .and_then(|url| icon_for_url.get(url))
                .cloned()
                .unwrap_or_else(|| PLACEHOLDER_ICON_ID.to_string());
            Some(PointFeature {
                artist_id: r.id.clone(),
                name: r.name.clone(),
                icon_id,
                rank: r.rank,
                position,
            })
        })
        .collect();
    FeatureCollection { features }
}

/// Clustered GeoJSON source settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub id: &'static str,
    pub cluster_max_zoom: f64,
    pub cluster_radius: u32,
    pub promote_id: &'static str,
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            id: ARTIST_SOURCE_ID,
            cluster_max_zoom: CLUSTER_MAX_ZOOM,
            cluster_radius: CLUSTER_RADIUS,
            promote_id: "id",
        }
    }
}

impl SourceSpec {
    pub fn to_json(&self, data: &FeatureCollection) -> Value {
        json!({
            "type": "geojson",
            "data": data.to_geojson(),
            "cluster": true,
            "clusterMaxZoom": self.cluster_max_zoom,
            "clusterRadius": self.cluster_radius,
            "promoteId": self.promote_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: &'static str,
    pub definition: Value,
}

/// The artist layers, bottom to top.
pub fn artist_layer_stack() -> [LayerSpec; 3] {
    [
        LayerSpec {
            id: CLUSTER_CIRCLE_LAYER_ID,
            definition: json!({
                "id": CLUSTER_CIRCLE_LAYER_ID,
                "type": "circle",
                "source": ARTIST_SOURCE_ID,
                "filter": ["has", "point_count"],
                "paint": {
                    // small (2-5), medium (6-15), large (16+)
                    "circle-color": ["step", ["get", "point_count"], "#4ddc7c", 6, "#1DB954", 16, "#147b38"],
                    "circle-radius": ["step", ["get", "point_count"], 20, 6, 25, 16, 30],
                    "circle-stroke-width": 2.5,
                    "circle-stroke-color": "rgba(255, 255, 255, 0.5)",
                    "circle-opacity": 0.9
                }
            }),
        },
        LayerSpec {
            id: CLUSTER_COUNT_LAYER_ID,
            definition: json!({
                "id": CLUSTER_COUNT_LAYER_ID,
                "type": "symbol",
                "source": ARTIST_SOURCE_ID,
                "filter": ["has", "point_count"],
                "layout": {
                    "text-field": "{point_count_abbreviated}",
                    "text-font": ["DIN Offc Pro Medium", "Arial Unicode MS Bold"],
                    "text-size": 12,
                    "text-allow-overlap": true
                },
                "paint": { "text-color": "#ffffff" }
            }),
        },
        LayerSpec {
            id: ARTIST_ICON_LAYER_ID,
            definition: json!({
                "id": ARTIST_ICON_LAYER_ID,
                "type": "symbol",
                "source": ARTIST_SOURCE_ID,
                "filter": ["!", ["has", "point_count"]],
                "layout": {
                    "icon-image": ["coalesce", ["get", "iconId"], PLACEHOLDER_ICON_ID],
                    "icon-size": [
                        "interpolate", ["linear"], ["zoom"],
                        0, MAP_ICON_DISPLAY_SIZE * 0.8,
                        5, MAP_ICON_DISPLAY_SIZE
                    ],
                    "icon-allow-overlap": true,
                    "icon-ignore-placement": false
                },
                "paint": { "icon-opacity": 0.95 }
            }),
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    /// Nothing to draw; no source or layers were touched.
    Empty,
    Created,
    Updated,
}

/// Owns the lifecycle of the artist source, its layers and their handlers.
#[derive(Debug, Default)]
pub struct LayerManager {
    handlers_bound: Cell<bool>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handlers_bound(&self) -> bool {
        self.handlers_bound.get()
    }

    /// Create or refresh the source, ensure each layer exists once, and
    /// (re)attach `bindings`.
    pub fn setup<M: MapEngine>(
        &self,
        map: &M,
        icons: &IconRegistry,
        features: &FeatureCollection,
        bindings: LayerBindings,
    ) -> Result<SetupOutcome, MapError> {
        if !map.is_style_loaded() {
            return Err(MapError::StyleNotLoaded);
        }
        if !icons.has_placeholder() || !map.has_image(PLACEHOLDER_ICON_ID) {
            return Err(MapError::PlaceholderMissing);
        }
        if features.is_empty() {
            info!("No artist features to add to map");
            return Ok(SetupOutcome::Empty);
        }

        let source = SourceSpec::default();
        let outcome = if map.has_source(source.id) {
            map.set_source_data(source.id, features)?;
            debug!("Updated existing artist source data");
            SetupOutcome::Updated
        } else {
            map.add_source(&source, features)?;
            debug!("Added new artist source");
            SetupOutcome::Created
        };

        for layer in artist_layer_stack() {
            if !map.has_layer(layer.id) {
                map.add_layer(&layer)?;
            }
        }

        if self.handlers_bound.get() {
            map.unbind_layer_events();
        }
        map.bind_layer_events(bindings);
        self.handlers_bound.set(true);
        Ok(outcome)
    }

    /// Detach handlers, then remove layers (top first) and the source.
    /// Removal failures are logged, never propagated.
    pub fn teardown<M: MapEngine>(&self, map: &M) {
        if self.handlers_bound.replace(false) {
            map.unbind_layer_events();
        }
        map.set_pointer_cursor(false);

        for layer in artist_layer_stack().iter().rev() {
            if map.has_layer(layer.id) {
                if let Err(e) = map.remove_layer(layer.id) {
                    warn!("Error removing layer {}: {}", layer.id, e);
                }
            }
        }
        if map.has_source(ARTIST_SOURCE_ID) {
            if let Err(e) = map.remove_source(ARTIST_SOURCE_ID) {
                warn!("Error removing source {}: {}", ARTIST_SOURCE_ID, e);
            }
        }
        debug!("Finished removing artist layers and source");
    }
}
