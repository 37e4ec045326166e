//! JavaScript interop for Mapbox GL JS, loaded globally by the page as
//! `mapboxgl`, and the [`MapEngine`] implementation on top of it.

use futures::channel::oneshot;
use gloo_utils::format::JsValueSerdeExt;
use js_sys::{Array, Function, Object, Reflect, Uint8Array};
use log::{debug, warn};
use music_map::config::{MapConfig, INITIAL_CENTER, INITIAL_ZOOM};
use music_map::engine::{
    CameraMove, Easing, FeatureHit, FitBounds, LayerBindings, LayerEventKind, LeafFeature,
    MapEngine, MapError, PointerEvent, PopupHandle, PopupSpec, RowHandler,
};
use music_map::geo::LngLat;
use music_map::icons::IconRaster;
use music_map::layers::{FeatureCollection, LayerSpec, SourceSpec};
use music_map::popup::{ARTIST_ID_ATTR, CLUSTER_ROW_CLASS};
use serde::Deserialize;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, HtmlCanvasElement, HtmlElement};

#[wasm_bindgen(js_namespace = mapboxgl)]
extern "C" {
    pub type Map;

    #[wasm_bindgen(constructor, catch, js_class = "Map")]
    fn new(options: &JsValue) -> Result<Map, JsValue>;

    #[wasm_bindgen(method)]
    fn on(this: &Map, event: &str, handler: &Function);

    #[wasm_bindgen(method)]
    fn once(this: &Map, event: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = on)]
    fn on_layer(this: &Map, event: &str, layer: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = off)]
    fn off_layer(this: &Map, event: &str, layer: &str, handler: &Function);

    #[wasm_bindgen(method, js_name = addControl)]
    fn add_control(this: &Map, control: &JsValue, position: Option<&str>);

    #[wasm_bindgen(method, js_name = setFog)]
    fn set_fog(this: &Map, fog: &JsValue);

    #[wasm_bindgen(method, js_name = isStyleLoaded)]
    fn style_loaded(this: &Map) -> bool;

    #[wasm_bindgen(method, js_name = hasImage)]
    fn has_image_js(this: &Map, id: &str) -> bool;

    #[wasm_bindgen(method, catch, js_name = addImage)]
    fn add_image_js(this: &Map, id: &str, image: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = getSource)]
    fn get_source(this: &Map, id: &str) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = addSource)]
    fn add_source_js(this: &Map, id: &str, source: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeSource)]
    fn remove_source_js(this: &Map, id: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = getLayer)]
    fn get_layer(this: &Map, id: &str) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = addLayer)]
    fn add_layer_js(this: &Map, layer: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeLayer)]
    fn remove_layer_js(this: &Map, id: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, js_name = getZoom)]
    fn get_zoom(this: &Map) -> f64;

    #[wasm_bindgen(method, js_name = getMaxZoom)]
    fn get_max_zoom(this: &Map) -> f64;

    #[wasm_bindgen(method, js_name = isMoving)]
    fn moving(this: &Map) -> bool;

    #[wasm_bindgen(method, js_name = easeTo)]
    fn ease_to_js(this: &Map, options: &JsValue);

    #[wasm_bindgen(method, js_name = flyTo)]
    fn fly_to_js(this: &Map, options: &JsValue);

    #[wasm_bindgen(method, js_name = fitBounds)]
    fn fit_bounds_js(this: &Map, bounds: &JsValue, options: &JsValue);

    #[wasm_bindgen(method, js_name = getCanvas)]
    fn get_canvas(this: &Map) -> HtmlCanvasElement;

    pub type GeoJSONSource;

    #[wasm_bindgen(method, js_name = setData)]
    fn set_data(this: &GeoJSONSource, data: &JsValue);

    #[wasm_bindgen(method, js_name = getClusterExpansionZoom)]
    fn get_cluster_expansion_zoom(this: &GeoJSONSource, cluster_id: f64, callback: &Function);

    #[wasm_bindgen(method, js_name = getClusterLeaves)]
    fn get_cluster_leaves(
        this: &GeoJSONSource,
        cluster_id: f64,
        limit: f64,
        offset: f64,
        callback: &Function,
    );

    pub type Popup;

    #[wasm_bindgen(constructor, js_class = "Popup")]
    fn new(options: &JsValue) -> Popup;

    #[wasm_bindgen(method, js_name = setLngLat)]
    fn set_lng_lat(this: &Popup, lng_lat: &JsValue) -> Popup;

    #[wasm_bindgen(method, js_name = setHTML)]
    fn set_html(this: &Popup, html: &str) -> Popup;

    #[wasm_bindgen(method, js_name = addTo)]
    fn add_to(this: &Popup, map: &Map) -> Popup;

    #[wasm_bindgen(method, js_name = remove)]
    fn remove_js(this: &Popup) -> Popup;

    #[wasm_bindgen(method, js_name = getElement)]
    fn get_element(this: &Popup) -> Option<HtmlElement>;

    pub type NavigationControl;

    #[wasm_bindgen(constructor, js_class = "NavigationControl")]
    fn new() -> NavigationControl;

    pub type ScaleControl;

    #[wasm_bindgen(constructor, js_class = "ScaleControl")]
    fn new() -> ScaleControl;
}

/// Properties Mapbox attaches to rendered features and cluster leaves.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeatureProps {
    #[serde(rename = "artistId")]
    artist_id: Option<String>,
    name: Option<String>,
    cluster_id: Option<u64>,
    point_count: Option<usize>,
}

fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
}

fn js_error_message(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| get(err, "message").as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}

fn engine_error(err: JsValue) -> MapError {
    MapError::Engine(js_error_message(&err))
}

fn to_js(value: &Value) -> Result<JsValue, MapError> {
    JsValue::from_serde(value).map_err(|e| MapError::Engine(e.to_string()))
}

fn lng_lat_of(value: &JsValue) -> Option<LngLat> {
    Some(LngLat::new(get(value, "lng").as_f64()?, get(value, "lat").as_f64()?))
}

fn point_of(feature: &JsValue) -> Option<LngLat> {
    let coords: Array = get(&get(feature, "geometry"), "coordinates").dyn_into().ok()?;
    Some(LngLat::new(coords.get(0).as_f64()?, coords.get(1).as_f64()?))
}

fn props_of(feature: &JsValue) -> FeatureProps {
    serde_wasm_bindgen::from_value(get(feature, "properties")).unwrap_or_default()
}

fn hit_of(feature: &JsValue) -> Option<FeatureHit> {
    let position = point_of(feature)?;
    let props = props_of(feature);
    Some(match props.cluster_id {
        Some(cluster_id) => FeatureHit::Cluster {
            cluster_id,
            point_count: props.point_count.unwrap_or(0),
            position,
        },
        None => FeatureHit::Artist {
            artist_id: props.artist_id,
            name: props.name,
            position,
        },
    })
}

fn pointer_event(ev: &JsValue) -> PointerEvent {
    let hits = get(ev, "features")
        .dyn_into::<Array>()
        .map(|features| features.iter().filter_map(|f| hit_of(&f)).collect())
        .unwrap_or_default();
    PointerEvent {
        lng_lat: lng_lat_of(&get(ev, "lngLat")).unwrap_or(LngLat::new(0.0, 0.0)),
        hits,
    }
}

/// An open Mapbox popup plus the listeners attached to its rows.
pub struct MapboxPopup {
    popup: Popup,
    _row_listeners: Vec<Closure<dyn FnMut(web_sys::Event)>>,
}

impl PopupHandle for MapboxPopup {
    fn remove(&self) {
        self.popup.remove_js();
    }
}

type LayerListener = (LayerEventKind, &'static str, Closure<dyn FnMut(JsValue)>);

pub struct MapboxEngine {
    map: Map,
    loaded: Cell<bool>,
    layer_listeners: RefCell<Vec<LayerListener>>,
    map_listeners: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
    ease_out_quad: Closure<dyn Fn(f64) -> f64>,
}

impl MapboxEngine {
    /// Set the access token on the global `mapboxgl` and create the map.
    pub fn new(config: &MapConfig) -> Result<Self, MapError> {
        let mapboxgl = Reflect::get(&js_sys::global(), &JsValue::from_str("mapboxgl"))
            .map_err(engine_error)?;
        if mapboxgl.is_undefined() {
            return Err(MapError::Engine("Mapbox GL JS is not loaded".to_string()));
        }
        Reflect::set(
            &mapboxgl,
            &JsValue::from_str("accessToken"),
            &JsValue::from_str(&config.access_token),
        )
        .map_err(engine_error)?;

        let options = to_js(&json!({
            "container": config.container_id,
            "style": config.style_url,
            "center": [INITIAL_CENTER.0, INITIAL_CENTER.1],
            "zoom": INITIAL_ZOOM,
            "projection": "mercator",
            "antialias": true,
        }))?;
        let map = Map::new(&options).map_err(engine_error)?;
        debug!("Mapbox map created in #{}", config.container_id);

        Ok(Self {
            map,
            loaded: Cell::new(false),
            layer_listeners: RefCell::new(Vec::new()),
            map_listeners: RefCell::new(Vec::new()),
            ease_out_quad: Closure::new(|t: f64| Easing::EaseOutQuad.apply(t)),
        })
    }

    /// Run `f` once, when the style has loaded.
    pub fn once_load(&self, f: impl FnOnce() + 'static) {
        let cb = Closure::once_into_js(f);
        self.map.once("load", cb.unchecked_ref());
    }

    pub fn once_idle(&self, f: impl FnOnce() + 'static) {
        let cb = Closure::once_into_js(f);
        self.map.once("idle", cb.unchecked_ref());
    }

    /// Call `f` with the message of every map error event.
    pub fn on_error(&self, mut f: impl FnMut(String) + 'static) {
        let cb = Closure::<dyn FnMut(JsValue)>::new(move |ev: JsValue| {
            let err = get(&ev, "error");
            f(js_error_message(if err.is_undefined() { &ev } else { &err }));
        });
        self.map.on("error", cb.as_ref().unchecked_ref());
        self.map_listeners.borrow_mut().push(cb);
    }

    pub fn mark_loaded(&self) {
        self.loaded.set(true);
    }

    /// Navigation and scale controls plus atmospheric fog.
    pub fn add_chrome(&self) {
        let nav: JsValue = NavigationControl::new().into();
        self.map.add_control(&nav, Some("top-left"));
        let scale: JsValue = ScaleControl::new().into();
        self.map.add_control(&scale, None);

        match to_js(&json!({
            "color": "#1a1f2a",
            "high-color": "#000510",
            "horizon-blend": 0.15,
            "space-color": "#0b0b19",
            "star-intensity": 0.15,
        })) {
            Ok(fog) => self.map.set_fog(&fog),
            Err(e) => warn!("Could not set fog: {}", e),
        }
    }

    fn source(&self, id: &str) -> Result<GeoJSONSource, MapError> {
        let source = self.map.get_source(id);
        if source.is_undefined() || source.is_null() {
            return Err(MapError::MissingSource(id.to_string()));
        }
        Ok(source.unchecked_into())
    }

    fn camera_options(&self, camera: &CameraMove) -> Result<JsValue, MapError> {
        let mut options = json!({
            "center": camera.center.to_array(),
            "zoom": camera.zoom,
            "essential": true,
        });
        if let Some(duration) = camera.duration_ms {
            options["duration"] = json!(duration);
        }
        if let Some(speed) = camera.speed {
            options["speed"] = json!(speed);
        }
        let options = to_js(&options)?;
        if camera.easing == Easing::EaseOutQuad {
            Reflect::set(
                &options,
                &JsValue::from_str("easing"),
                self.ease_out_quad.as_ref(),
            )
            .map_err(engine_error)?;
        }
        Ok(options)
    }

    /// Attach `on_row_click` to every member row of a cluster popup.
    fn bind_rows(
        &self,
        popup: &Popup,
        on_row_click: &RowHandler,
    ) -> Vec<Closure<dyn FnMut(web_sys::Event)>> {
        let Some(element) = popup.get_element() else {
            return Vec::new();
        };
        let Ok(rows) = element.query_selector_all(&format!(".{}", CLUSTER_ROW_CLASS)) else {
            return Vec::new();
        };
        let mut listeners = Vec::new();
        for i in 0..rows.length() {
            let Some(row) = rows.get(i).and_then(|n| n.dyn_into::<Element>().ok()) else {
                continue;
            };
            let Some(artist_id) = row.get_attribute(ARTIST_ID_ATTR) else {
                continue;
            };
            let handler = on_row_click.clone();
            let cb = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
                debug!("Cluster popup row clicked: {}", artist_id);
                spawn_local(handler(artist_id.clone()));
            });
            if row
                .add_event_listener_with_callback("click", cb.as_ref().unchecked_ref())
                .is_ok()
            {
                listeners.push(cb);
            }
        }
        listeners
    }
}

impl MapEngine for MapboxEngine {
    type Popup = MapboxPopup;

    fn is_style_loaded(&self) -> bool {
        self.loaded.get() && self.map.style_loaded()
    }

    fn has_image(&self, id: &str) -> bool {
        self.map.has_image_js(id)
    }

    fn add_image(&self, id: &str, raster: &IconRaster) -> Result<(), MapError> {
        let image = Object::new();
        let set = |key: &str, value: &JsValue| {
            Reflect::set(&image, &JsValue::from_str(key), value).map_err(engine_error)
        };
        set("width", &JsValue::from(raster.width))?;
        set("height", &JsValue::from(raster.height))?;
        set("data", &Uint8Array::from(raster.pixels.as_slice()).into())?;
        self.map.add_image_js(id, &image).map_err(engine_error)
    }

    fn has_source(&self, id: &str) -> bool {
        self.source(id).is_ok()
    }

    fn add_source(&self, spec: &SourceSpec, data: &FeatureCollection) -> Result<(), MapError> {
        let source = to_js(&spec.to_json(data))?;
        self.map.add_source_js(spec.id, &source).map_err(engine_error)
    }

    fn set_source_data(&self, id: &str, data: &FeatureCollection) -> Result<(), MapError> {
        let source = self.source(id)?;
        source.set_data(&to_js(&data.to_geojson())?);
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<(), MapError> {
        self.map.remove_source_js(id).map_err(engine_error)
    }

    fn has_layer(&self, id: &str) -> bool {
        let layer = self.map.get_layer(id);
        !(layer.is_undefined() || layer.is_null())
    }

    fn add_layer(&self, spec: &LayerSpec) -> Result<(), MapError> {
        self.map
            .add_layer_js(&to_js(&spec.definition)?)
            .map_err(engine_error)
    }

    fn remove_layer(&self, id: &str) -> Result<(), MapError> {
        self.map.remove_layer_js(id).map_err(engine_error)
    }

    async fn cluster_expansion_zoom(&self, source: &str, cluster_id: u64) -> Result<f64, MapError> {
        let (tx, rx) = oneshot::channel::<Result<f64, MapError>>();
        let cb = Closure::once_into_js(move |err: JsValue, zoom: JsValue| {
            let result = if err.is_null() || err.is_undefined() {
                zoom.as_f64()
                    .ok_or_else(|| MapError::Engine("expansion zoom is not a number".to_string()))
            } else {
                Err(engine_error(err))
            };
            let _ = tx.send(result);
        });
        self.source(source)?
            .get_cluster_expansion_zoom(cluster_id as f64, cb.unchecked_ref());
        rx.await
            .map_err(|_| MapError::Engine("cluster expansion query was dropped".to_string()))?
    }

    async fn cluster_leaves(
        &self,
        source: &str,
        cluster_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LeafFeature>, MapError> {
        let (tx, rx) = oneshot::channel::<Result<Vec<LeafFeature>, MapError>>();
        let cb = Closure::once_into_js(move |err: JsValue, features: JsValue| {
            let result = if err.is_null() || err.is_undefined() {
                features
                    .dyn_into::<Array>()
                    .map(|leaves| {
                        leaves
                            .iter()
                            .map(|leaf| LeafFeature {
                                artist_id: props_of(&leaf).artist_id,
                            })
                            .collect()
                    })
                    .map_err(|_| MapError::Engine("cluster leaves are not an array".to_string()))
            } else {
                Err(engine_error(err))
            };
            let _ = tx.send(result);
        });
        self.source(source)?.get_cluster_leaves(
            cluster_id as f64,
            limit as f64,
            offset as f64,
            cb.unchecked_ref(),
        );
        rx.await
            .map_err(|_| MapError::Engine("cluster leaves query was dropped".to_string()))?
    }

    fn zoom(&self) -> f64 {
        self.map.get_zoom()
    }

    fn max_zoom(&self) -> f64 {
        self.map.get_max_zoom()
    }

    fn is_moving(&self) -> bool {
        self.map.moving()
    }

    fn ease_to(&self, camera: CameraMove) {
        match self.camera_options(&camera) {
            Ok(options) => self.map.ease_to_js(&options),
            Err(e) => warn!("easeTo skipped: {}", e),
        }
    }

    fn fly_to(&self, camera: CameraMove) {
        match self.camera_options(&camera) {
            Ok(options) => self.map.fly_to_js(&options),
            Err(e) => warn!("flyTo skipped: {}", e),
        }
    }

    fn fit_bounds(&self, fit: FitBounds) {
        let bounds = to_js(&json!(fit.bounds.to_array()));
        let options = to_js(&json!({
            "padding": fit.padding,
            "maxZoom": fit.max_zoom,
            "duration": fit.duration_ms,
        }));
        match (bounds, options) {
            (Ok(bounds), Ok(options)) => self.map.fit_bounds_js(&bounds, &options),
            (Err(e), _) | (_, Err(e)) => warn!("fitBounds skipped: {}", e),
        }
    }

    fn open_popup(&self, spec: PopupSpec) -> MapboxPopup {
        let mut options = json!({
            "offset": spec.offset,
            "closeButton": spec.close_button,
            "closeOnClick": spec.close_on_click,
        });
        if let Some(max_width) = spec.max_width {
            options["maxWidth"] = json!(max_width);
        }
        if let Some(class_name) = spec.class_name {
            options["className"] = json!(class_name);
        }
        let options = to_js(&options).unwrap_or_else(|e| {
            warn!("Popup options fell back to defaults: {}", e);
            JsValue::UNDEFINED
        });
        let at = Array::of2(&JsValue::from(spec.at.lng), &JsValue::from(spec.at.lat));

        let popup = Popup::new(&options);
        popup.set_lng_lat(&at);
        popup.set_html(&spec.html);
        popup.add_to(&self.map);

        let row_listeners = spec
            .on_row_click
            .as_ref()
            .map(|handler| self.bind_rows(&popup, handler))
            .unwrap_or_default();
        MapboxPopup {
            popup,
            _row_listeners: row_listeners,
        }
    }

    fn set_pointer_cursor(&self, pointer: bool) {
        let cursor = if pointer { "pointer" } else { "" };
        if let Err(e) = self.map.get_canvas().style().set_property("cursor", cursor) {
            debug!("Could not set cursor: {}", js_error_message(&e));
        }
    }

    fn bind_layer_events(&self, bindings: LayerBindings) {
        let mut listeners = self.layer_listeners.borrow_mut();
        for (kind, layer, handler) in bindings.handlers {
            let cb = Closure::<dyn FnMut(JsValue)>::new(move |ev: JsValue| {
                spawn_local(handler(pointer_event(&ev)));
            });
            self.map
                .on_layer(kind.as_str(), layer, cb.as_ref().unchecked_ref());
            listeners.push((kind, layer, cb));
        }
    }

    fn unbind_layer_events(&self) {
        let listeners: Vec<LayerListener> = self.layer_listeners.borrow_mut().drain(..).collect();
        for (kind, layer, cb) in listeners {
            self.map
                .off_layer(kind.as_str(), layer, cb.as_ref().unchecked_ref());
        }
    }

    async fn pause(&self, ms: u32) {
        gloo_timers::future::TimeoutFuture::new(ms).await;
    }
}
