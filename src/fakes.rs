//! In-memory stand-ins for the map, the endpoint, image hosting and the page.

use crate::api::{ArtistSource, FetchError, ImageFetcher};
use crate::engine::{
    CameraMove, FitBounds, LayerBindings, LayerEventKind, LeafFeature, MapEngine, MapError,
    PointerEvent, PopupHandle, PopupSpec, RowHandler,
};
use crate::geo::{LngLat, PanelLayout};
use crate::icons::IconRaster;
use crate::layers::{FeatureCollection, LayerSpec, SourceSpec};
use crate::list::{ListRow, ListState};
use crate::session::{Flash, MapSession, UiSurface};
use crate::{ArtistRecord, RawArtist, TimeRange};
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Cursor;
use std::rc::Rc;

pub(crate) type TestSession = Rc<MapSession<FakeMap, FakeArtists, FakeImages, FakeUi>>;

pub(crate) fn test_session(artists: FakeArtists) -> TestSession {
    MapSession::new(
        FakeMap::ready(),
        artists,
        FakeImages::default(),
        FakeUi::default(),
    )
}

pub(crate) fn record_at(
    id: &str,
    name: &str,
    rank: u32,
    lng_lat: Option<(f64, f64)>,
    image_url: Option<&str>,
) -> ArtistRecord {
    ArtistRecord {
        id: id.to_string(),
        name: name.to_string(),
        position: lng_lat.map(|(lng, lat)| LngLat::new(lng, lat)),
        image_url: image_url.map(str::to_string),
        origin: None,
        genres: Vec::new(),
        external_url: None,
        uri: None,
        rank,
    }
}

pub(crate) fn raw_artists(payload: Value) -> Vec<RawArtist> {
    serde_json::from_value(payload).unwrap()
}

/// A small valid PNG.
pub(crate) fn png_bytes() -> Vec<u8> {
    let image = RgbaImage::from_pixel(4, 4, Rgba([10, 200, 30, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub(crate) struct FakePopupRecord {
    pub at: LngLat,
    pub html: String,
    pub offset: f64,
    pub class_name: Option<&'static str>,
    pub on_row_click: Option<RowHandler>,
    open: Cell<bool>,
}

pub(crate) struct FakePopup(Rc<FakePopupRecord>);

impl PopupHandle for FakePopup {
    fn remove(&self) {
        self.0.open.set(false);
    }
}

struct FakeMapState {
    style_loaded: bool,
    image_adds: HashMap<String, usize>,
    sources: HashMap<String, Vec<Value>>,
    layers: Vec<&'static str>,
    failing_layers: HashSet<String>,
    zoom: f64,
    max_zoom: f64,
    moving: bool,
    expansion_zoom: Option<f64>,
    leaves: Vec<LeafFeature>,
    eases: Vec<CameraMove>,
    flights: Vec<CameraMove>,
    fits: Vec<FitBounds>,
    pauses: Vec<u32>,
    popups: Vec<Rc<FakePopupRecord>>,
    pointer_cursor: bool,
    bindings: Option<LayerBindings>,
    binds: usize,
    unbinds: usize,
}

pub(crate) struct FakeMap {
    state: RefCell<FakeMapState>,
    pause_hook: RefCell<Option<Box<dyn FnOnce(&FakeMap)>>>,
}

impl FakeMap {
    fn with_style(style_loaded: bool) -> Self {
        Self {
            state: RefCell::new(FakeMapState {
                style_loaded,
                image_adds: HashMap::new(),
                sources: HashMap::new(),
                layers: Vec::new(),
                failing_layers: HashSet::new(),
                zoom: 1.5,
                max_zoom: 22.0,
                moving: false,
                expansion_zoom: Some(10.0),
                leaves: Vec::new(),
                eases: Vec::new(),
                flights: Vec::new(),
                fits: Vec::new(),
                pauses: Vec::new(),
                popups: Vec::new(),
                pointer_cursor: false,
                bindings: None,
                binds: 0,
                unbinds: 0,
            }),
            pause_hook: RefCell::new(None),
        }
    }

    pub fn ready() -> Self {
        Self::with_style(true)
    }

    pub fn loading() -> Self {
        Self::with_style(false)
    }

    pub fn set_zoom(&self, zoom: f64) {
        self.state.borrow_mut().zoom = zoom;
    }

    pub fn set_moving(&self, moving: bool) {
        self.state.borrow_mut().moving = moving;
    }

    /// `None` makes the expansion query fail.
    pub fn set_expansion_zoom(&self, zoom: Option<f64>) {
        self.state.borrow_mut().expansion_zoom = zoom;
    }

    pub fn set_leaves(&self, ids: &[&str]) {
        self.set_leaf_features(
            ids.iter()
                .map(|id| LeafFeature {
                    artist_id: Some(id.to_string()),
                })
                .collect(),
        );
    }

    pub fn set_leaf_features(&self, leaves: Vec<LeafFeature>) {
        self.state.borrow_mut().leaves = leaves;
    }

    /// Make `add_layer` reject this id.
    pub fn fail_layer(&self, id: &str) {
        self.state.borrow_mut().failing_layers.insert(id.to_string());
    }

    /// Run `hook` during the next `pause`.
    pub fn on_pause(&self, hook: impl FnOnce(&FakeMap) + 'static) {
        *self.pause_hook.borrow_mut() = Some(Box::new(hook));
    }

    pub fn drop_source(&self, id: &str) {
        self.state.borrow_mut().sources.remove(id);
    }

    pub fn layer_ids(&self) -> Vec<&'static str> {
        self.state.borrow().layers.clone()
    }

    pub fn source_features(&self, id: &str) -> Option<Vec<Value>> {
        self.state.borrow().sources.get(id).cloned()
    }

    pub fn source_feature_count(&self, id: &str) -> Option<usize> {
        self.state.borrow().sources.get(id).map(Vec::len)
    }

    pub fn image_add_count(&self, id: &str) -> usize {
        self.state.borrow().image_adds.get(id).copied().unwrap_or(0)
    }

    pub fn bind_count(&self) -> usize {
        self.state.borrow().binds
    }

    pub fn unbind_count(&self) -> usize {
        self.state.borrow().unbinds
    }

    pub fn eases(&self) -> Vec<CameraMove> {
        self.state.borrow().eases.clone()
    }

    pub fn flights(&self) -> Vec<CameraMove> {
        self.state.borrow().flights.clone()
    }

    pub fn fits(&self) -> Vec<FitBounds> {
        self.state.borrow().fits.clone()
    }

    pub fn pauses(&self) -> Vec<u32> {
        self.state.borrow().pauses.clone()
    }

    pub fn pointer_cursor(&self) -> bool {
        self.state.borrow().pointer_cursor
    }

    pub fn open_popups(&self) -> Vec<Rc<FakePopupRecord>> {
        self.state
            .borrow()
            .popups
            .iter()
            .filter(|p| p.open.get())
            .cloned()
            .collect()
    }

    /// Dispatch a layer event to whatever handler is currently bound.
    pub fn fire(
        &self,
        kind: LayerEventKind,
        layer: &str,
        ev: PointerEvent,
    ) -> Option<LocalBoxFuture<'static, ()>> {
        let handler = self
            .state
            .borrow()
            .bindings
            .as_ref()?
            .handlers
            .iter()
            .find(|(k, l, _)| *k == kind && *l == layer)
            .map(|(_, _, h)| h.clone())?;
        Some(handler(ev))
    }

    fn features_of(data: &FeatureCollection) -> Vec<Value> {
        data.to_geojson()["features"]
            .as_array()
            .cloned()
            .unwrap_or_default()
    }
}

impl MapEngine for FakeMap {
    type Popup = FakePopup;

    fn is_style_loaded(&self) -> bool {
        self.state.borrow().style_loaded
    }

    fn has_image(&self, id: &str) -> bool {
        self.state.borrow().image_adds.contains_key(id)
    }

    fn add_image(&self, id: &str, raster: &IconRaster) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        if !state.style_loaded {
            return Err(MapError::StyleNotLoaded);
        }
        assert_eq!(raster.pixels.len(), (raster.width * raster.height * 4) as usize);
        *state.image_adds.entry(id.to_string()).or_default() += 1;
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.state.borrow().sources.contains_key(id)
    }

    fn add_source(&self, spec: &SourceSpec, data: &FeatureCollection) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        if state.sources.contains_key(spec.id) {
            return Err(MapError::Engine(format!("source {} already exists", spec.id)));
        }
        state.sources.insert(spec.id.to_string(), Self::features_of(data));
        Ok(())
    }

    fn set_source_data(&self, id: &str, data: &FeatureCollection) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        match state.sources.get_mut(id) {
            Some(features) => {
                *features = Self::features_of(data);
                Ok(())
            }
            None => Err(MapError::MissingSource(id.to_string())),
        }
    }

    fn remove_source(&self, id: &str) -> Result<(), MapError> {
        self.state
            .borrow_mut()
            .sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MapError::MissingSource(id.to_string()))
    }

    fn has_layer(&self, id: &str) -> bool {
        self.state.borrow().layers.iter().any(|l| *l == id)
    }

    fn add_layer(&self, spec: &LayerSpec) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        if state.failing_layers.contains(spec.id) {
            return Err(MapError::Engine(format!("layer {} rejected", spec.id)));
        }
        if state.layers.contains(&spec.id) {
            return Err(MapError::Engine(format!("layer {} already exists", spec.id)));
        }
        state.layers.push(spec.id);
        Ok(())
    }

    fn remove_layer(&self, id: &str) -> Result<(), MapError> {
        let mut state = self.state.borrow_mut();
        let before = state.layers.len();
        state.layers.retain(|l| *l != id);
        if state.layers.len() == before {
            return Err(MapError::MissingLayer(id.to_string()));
        }
        Ok(())
    }

    async fn cluster_expansion_zoom(&self, _source: &str, _cluster_id: u64) -> Result<f64, MapError> {
        self.state
            .borrow()
            .expansion_zoom
            .ok_or_else(|| MapError::Engine("expansion zoom unavailable".to_string()))
    }

    async fn cluster_leaves(
        &self,
        _source: &str,
        _cluster_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LeafFeature>, MapError> {
        Ok(self
            .state
            .borrow()
            .leaves
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn zoom(&self) -> f64 {
        self.state.borrow().zoom
    }

    fn max_zoom(&self) -> f64 {
        self.state.borrow().max_zoom
    }

    fn is_moving(&self) -> bool {
        self.state.borrow().moving
    }

    fn ease_to(&self, camera: CameraMove) {
        self.state.borrow_mut().eases.push(camera);
    }

    fn fly_to(&self, camera: CameraMove) {
        self.state.borrow_mut().flights.push(camera);
    }

    fn fit_bounds(&self, fit: FitBounds) {
        self.state.borrow_mut().fits.push(fit);
    }

    fn open_popup(&self, spec: PopupSpec) -> FakePopup {
        let record = Rc::new(FakePopupRecord {
            at: spec.at,
            html: spec.html,
            offset: spec.offset,
            class_name: spec.class_name,
            on_row_click: spec.on_row_click,
            open: Cell::new(true),
        });
        self.state.borrow_mut().popups.push(record.clone());
        FakePopup(record)
    }

    fn set_pointer_cursor(&self, pointer: bool) {
        self.state.borrow_mut().pointer_cursor = pointer;
    }

    fn bind_layer_events(&self, bindings: LayerBindings) {
        let mut state = self.state.borrow_mut();
        state.bindings = Some(bindings);
        state.binds += 1;
    }

    fn unbind_layer_events(&self) {
        let mut state = self.state.borrow_mut();
        state.bindings = None;
        state.unbinds += 1;
    }

    async fn pause(&self, ms: u32) {
        self.state.borrow_mut().pauses.push(ms);
        let hook = self.pause_hook.borrow_mut().take();
        if let Some(hook) = hook {
            hook(self);
        }
    }
}

/// Serves canned bytes per URL and counts requests.
#[derive(Default)]
pub(crate) struct FakeImages {
    responses: RefCell<HashMap<String, Result<Vec<u8>, u16>>>,
    fetches: RefCell<HashMap<String, usize>>,
}

impl FakeImages {
    /// `Err(status)` answers with that HTTP status.
    pub fn with(self, url: &str, response: Result<Vec<u8>, u16>) -> Self {
        self.add(url, response);
        self
    }

    pub fn add(&self, url: &str, response: Result<Vec<u8>, u16>) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), response);
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.borrow().get(url).copied().unwrap_or(0)
    }
}

impl ImageFetcher for FakeImages {
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        *self.fetches.borrow_mut().entry(url.to_string()).or_default() += 1;
        match self.responses.borrow().get(url) {
            Some(Ok(bytes)) => Ok(bytes.clone()),
            Some(Err(status)) => Err(FetchError::Status {
                status: *status,
                message: format!("HTTP error {}", status),
            }),
            None => Err(FetchError::Network(format!("no route to {}", url))),
        }
    }
}

type ArtistResponse = Result<Vec<RawArtist>, FetchError>;

/// Answers every request with the same response, unless a gate is queued;
/// gated requests wait for their channel.
pub(crate) struct FakeArtists {
    response: RefCell<ArtistResponse>,
    gates: RefCell<VecDeque<oneshot::Receiver<ArtistResponse>>>,
    calls: Cell<usize>,
}

impl FakeArtists {
    pub fn returning(payload: Value) -> Self {
        Self {
            response: RefCell::new(Ok(raw_artists(payload))),
            gates: RefCell::new(VecDeque::new()),
            calls: Cell::new(0),
        }
    }

    pub fn set(&self, response: ArtistResponse) {
        *self.response.borrow_mut() = response;
    }

    pub fn gate(&self, rx: oneshot::Receiver<ArtistResponse>) {
        self.gates.borrow_mut().push_back(rx);
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ArtistSource for FakeArtists {
    async fn top_artists(&self, _range: TimeRange) -> ArtistResponse {
        self.calls.set(self.calls.get() + 1);
        let gate = self.gates.borrow_mut().pop_front();
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Network("request dropped".to_string()))),
            None => self.response.borrow().clone(),
        }
    }
}

/// Records everything the session asks of the page.
#[derive(Default)]
pub(crate) struct FakeUi {
    loading: RefCell<Vec<bool>>,
    ranges: RefCell<Vec<TimeRange>>,
    lists: RefCell<Vec<ListState>>,
    highlights: RefCell<Vec<String>>,
    flashes: RefCell<Vec<Flash>>,
}

impl FakeUi {
    pub fn loading_history(&self) -> Vec<bool> {
        self.loading.borrow().clone()
    }

    pub fn ranges(&self) -> Vec<TimeRange> {
        self.ranges.borrow().clone()
    }

    pub fn last_list(&self) -> Option<ListState> {
        self.lists.borrow().last().cloned()
    }

    pub fn last_rows(&self) -> Option<Vec<ListRow>> {
        match self.last_list()? {
            ListState::Artists(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn highlights(&self) -> Vec<String> {
        self.highlights.borrow().clone()
    }

    pub fn flashes(&self) -> Vec<Flash> {
        self.flashes.borrow().clone()
    }

    pub fn last_flash(&self) -> Option<Flash> {
        self.flashes.borrow().last().cloned()
    }
}

impl UiSurface for FakeUi {
    fn set_loading(&self, loading: bool) {
        self.loading.borrow_mut().push(loading);
    }

    fn set_active_range(&self, range: TimeRange) {
        self.ranges.borrow_mut().push(range);
    }

    fn show_list(&self, list: ListState) {
        self.lists.borrow_mut().push(list);
    }

    fn highlight(&self, artist_id: &str) {
        self.highlights.borrow_mut().push(artist_id.to_string());
    }

    fn flash(&self, flash: Flash) {
        self.flashes.borrow_mut().push(flash);
    }

    fn layout(&self) -> PanelLayout {
        PanelLayout {
            panel_width: 350.0,
            viewport_width: 1280.0,
        }
    }
}
