//! The boundary between the session and the map renderer.
//!
//! [`MapEngine`] is everything the session needs from the map: image
//! registration, the clustered source and its layers, cluster queries,
//! camera moves, popups and layer event bindings. The browser build
//! implements it over Mapbox GL JS; tests use an in-memory fake.

use crate::geo::{LngLat, LngLatBounds, Padding};
use crate::icons::IconRaster;
use crate::layers::{FeatureCollection, LayerSpec, SourceSpec};
use futures::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Failures reported by the map renderer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("Map style is not loaded")]
    StyleNotLoaded,
    #[error("Placeholder icon is not registered")]
    PlaceholderMissing,
    #[error("Map source '{0}' does not exist")]
    MissingSource(String),
    #[error("Map layer '{0}' does not exist")]
    MissingLayer(String),
    #[error("Map error: {0}")]
    Engine(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    /// `t * (2 - t)`
    EaseOutQuad,
    EngineDefault,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        match self {
            Easing::EaseOutQuad => t * (2.0 - t),
            Easing::EngineDefault => t,
        }
    }
}

/// Target for `ease_to`/`fly_to`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraMove {
    pub center: LngLat,
    pub zoom: f64,
    pub duration_ms: Option<u32>,
    pub speed: Option<f64>,
    pub easing: Easing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitBounds {
    pub bounds: LngLatBounds,
    pub padding: Padding,
    pub max_zoom: f64,
    pub duration_ms: u32,
}

/// Clicks on rows inside a cluster popup, keyed by artist identifier.
pub type RowHandler = Rc<dyn Fn(String) -> LocalBoxFuture<'static, ()>>;

pub struct PopupSpec {
    pub at: LngLat,
    pub html: String,
    pub offset: f64,
    pub close_button: bool,
    pub close_on_click: bool,
    pub max_width: Option<&'static str>,
    pub class_name: Option<&'static str>,
    pub on_row_click: Option<RowHandler>,
}

impl fmt::Debug for PopupSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopupSpec")
            .field("at", &self.at)
            .field("offset", &self.offset)
            .field("class_name", &self.class_name)
            .field("has_rows", &self.on_row_click.is_some())
            .finish()
    }
}

/// An open popup; removing it twice is harmless.
pub trait PopupHandle {
    fn remove(&self);
}

/// A rendered feature under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureHit {
    Cluster {
        cluster_id: u64,
        point_count: usize,
        position: LngLat,
    },
    Artist {
        artist_id: Option<String>,
        name: Option<String>,
        position: LngLat,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub lng_lat: LngLat,
    pub hits: Vec<FeatureHit>,
}

impl PointerEvent {
    pub fn first_cluster(&self) -> Option<(u64, usize, LngLat)> {
        self.hits.iter().find_map(|h| match h {
            FeatureHit::Cluster {
                cluster_id,
                point_count,
                position,
            } => Some((*cluster_id, *point_count, *position)),
            _ => None,
        })
    }

    pub fn first_artist(&self) -> Option<(Option<&str>, Option<&str>, LngLat)> {
        self.hits.iter().find_map(|h| match h {
            FeatureHit::Artist {
                artist_id,
                name,
                position,
            } => Some((artist_id.as_deref(), name.as_deref(), *position)),
            _ => None,
        })
    }
}

/// A cluster member as returned by leaf enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafFeature {
    pub artist_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerEventKind {
    Click,
    MouseEnter,
    MouseLeave,
}

impl LayerEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerEventKind::Click => "click",
            LayerEventKind::MouseEnter => "mouseenter",
            LayerEventKind::MouseLeave => "mouseleave",
        }
    }
}

pub type LayerHandler = Rc<dyn Fn(PointerEvent) -> LocalBoxFuture<'static, ()>>;

/// Handlers to attach to the artist layers. The engine spawns the returned
/// futures on its event loop.
#[derive(Clone, Default)]
pub struct LayerBindings {
    pub handlers: Vec<(LayerEventKind, &'static str, LayerHandler)>,
}

impl LayerBindings {
    pub fn on(mut self, kind: LayerEventKind, layer: &'static str, handler: LayerHandler) -> Self {
        self.handlers.push((kind, layer, handler));
        self
    }
}

#[allow(async_fn_in_trait)]
pub trait MapEngine: 'static {
    type Popup: PopupHandle;

    fn is_style_loaded(&self) -> bool;

    fn has_image(&self, id: &str) -> bool;
    fn add_image(&self, id: &str, raster: &IconRaster) -> Result<(), MapError>;

    fn has_source(&self, id: &str) -> bool;
    fn add_source(&self, spec: &SourceSpec, data: &FeatureCollection) -> Result<(), MapError>;
    fn set_source_data(&self, id: &str, data: &FeatureCollection) -> Result<(), MapError>;
    fn remove_source(&self, id: &str) -> Result<(), MapError>;

    fn has_layer(&self, id: &str) -> bool;
    fn add_layer(&self, spec: &LayerSpec) -> Result<(), MapError>;
    fn remove_layer(&self, id: &str) -> Result<(), MapError>;

    async fn cluster_expansion_zoom(&self, source: &str, cluster_id: u64) -> Result<f64, MapError>;
    async fn cluster_leaves(
        &self,
        source: &str,
        cluster_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LeafFeature>, MapError>;

    fn zoom(&self) -> f64;
    fn max_zoom(&self) -> f64;
    fn is_moving(&self) -> bool;
    fn ease_to(&self, camera: CameraMove);
    fn fly_to(&self, camera: CameraMove);
    fn fit_bounds(&self, fit: FitBounds);

    fn open_popup(&self, spec: PopupSpec) -> Self::Popup;
    fn set_pointer_cursor(&self, pointer: bool);

    fn bind_layer_events(&self, bindings: LayerBindings);
    fn unbind_layer_events(&self);

    /// Cosmetic delay used to let an animation progress.
    async fn pause(&self, ms: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_out_quad_curve() {
        assert_eq!(Easing::EaseOutQuad.apply(0.0), 0.0);
        assert_eq!(Easing::EaseOutQuad.apply(0.5), 0.75);
        assert_eq!(Easing::EaseOutQuad.apply(1.0), 1.0);
    }

    #[test]
    fn picks_first_hit_of_each_kind() {
        let ev = PointerEvent {
            lng_lat: LngLat::new(0.0, 0.0),
            hits: vec![
                FeatureHit::Artist {
                    artist_id: Some("a".into()),
                    name: Some("A".into()),
                    position: LngLat::new(1.0, 1.0),
                },
                FeatureHit::Cluster {
                    cluster_id: 7,
                    point_count: 3,
                    position: LngLat::new(2.0, 2.0),
                },
            ],
        };
        assert_eq!(ev.first_cluster(), Some((7, 3, LngLat::new(2.0, 2.0))));
        assert_eq!(ev.first_artist().unwrap().0, Some("a"));
    }
}
