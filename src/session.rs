//! The map view session: one owner for the artist store, the icon registry,
//! open popups and the layer lifecycle, plus the fetch/render cycle that
//! drives them.
//!
//! # Fetch cycle
//! `Idle -> Loading -> (Populated | Empty | Failed) -> Idle`
//!
//! Each cycle takes the next sequence number. A cycle that finds a newer
//! number after an await stops without touching the UI again, so a slow
//! response can never overwrite a newer one.

use crate::api::{ArtistSource, FetchError, ImageFetcher};
use crate::config::{
    CLUSTER_FIT_BOUNDS_MAX_ZOOM, FIT_BOUNDS_DURATION_MS, FLASH_DEFAULT_MS, FLASH_ERROR_MS,
};
use crate::engine::{
    FitBounds, LayerBindings, LayerEventKind, LayerHandler, MapEngine, MapError, PointerEvent,
};
use crate::geo::{compute_padding, PanelLayout};
use crate::icons::{build_icon, register_placeholder, IconError, IconRegistry};
use crate::interaction::PopupState;
use crate::layers::{
    build_feature_collection, LayerManager, ARTIST_ICON_LAYER_ID, CLUSTER_CIRCLE_LAYER_ID,
};
use crate::list::{rows_for, ListState};
use crate::store::ArtistStore;
use crate::utils::generate_icon_id;
use crate::{records_from_payload, ArtistRecord, TimeRange};
use futures::future::{join_all, ready, LocalBoxFuture};
use futures::FutureExt;
use log::{debug, error, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use thiserror::Error;

/// A transient message for the flash region.
#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub message: String,
    pub duration_ms: u32,
    pub is_error: bool,
}

impl Flash {
    pub fn info(message: impl Into<String>, duration_ms: u32) -> Self {
        Self {
            message: message.into(),
            duration_ms,
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            duration_ms: FLASH_ERROR_MS,
            is_error: true,
        }
    }
}

/// The page around the map: sidebar, controls, flash region.
pub trait UiSurface: 'static {
    /// Toggle the loading overlay and disable/enable range and logout controls.
    fn set_loading(&self, loading: bool);
    fn set_active_range(&self, range: TimeRange);
    fn show_list(&self, list: ListState);
    fn highlight(&self, artist_id: &str);
    fn flash(&self, flash: Flash);
    fn layout(&self) -> PanelLayout;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Map(#[from] MapError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    NotReady,
    Empty,
    Populated { total: usize, located: usize },
    Failed(String),
    /// A newer cycle started before this one finished.
    Superseded,
}

pub struct MapSession<M: MapEngine, A, I, U> {
    pub(crate) map: M,
    pub(crate) artists: A,
    pub(crate) images: I,
    pub(crate) ui: U,
    pub(crate) store: RefCell<ArtistStore>,
    pub(crate) icons: RefCell<IconRegistry>,
    pub(crate) popups: RefCell<PopupState<M::Popup>>,
    pub(crate) layers: LayerManager,
    active_range: Cell<Option<TimeRange>>,
    loading: Cell<bool>,
    cycle: Cell<u64>,
    pub(crate) weak: Weak<Self>,
}

impl<M, A, I, U> MapSession<M, A, I, U>
where
    M: MapEngine,
    A: ArtistSource,
    I: ImageFetcher,
    U: UiSurface,
{
    pub fn new(map: M, artists: A, images: I, ui: U) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            map,
            artists,
            images,
            ui,
            store: RefCell::new(ArtistStore::new()),
            icons: RefCell::new(IconRegistry::new()),
            popups: RefCell::new(PopupState::new()),
            layers: LayerManager::new(),
            active_range: Cell::new(None),
            loading: Cell::new(false),
            cycle: Cell::new(0),
            weak: weak.clone(),
        })
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn artist(&self, id: &str) -> Option<ArtistRecord> {
        self.store.borrow().get(id).cloned()
    }

    pub fn artist_count(&self) -> usize {
        self.store.borrow().len()
    }

    /// Register the placeholder icon. Call once the map style has loaded.
    pub fn prepare(&self) -> Result<(), IconError> {
        register_placeholder(&self.map, &self.icons)
    }

    pub fn is_ready(&self) -> bool {
        self.map.is_style_loaded() && self.icons.borrow().has_placeholder()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    pub fn active_range(&self) -> Option<TimeRange> {
        self.active_range.get()
    }

    /// Whether a range button click should start a fetch.
    pub fn should_fetch(&self, range: TimeRange) -> bool {
        if self.loading.get() {
            debug!("Ignoring range click while loading");
            return false;
        }
        if self.active_range.get() == Some(range) {
            debug!("Clicked already active time range {}", range);
            return false;
        }
        true
    }

    fn is_current(&self, cycle: u64) -> bool {
        self.cycle.get() == cycle
    }

    fn set_loading(&self, loading: bool) {
        self.loading.set(loading);
        self.ui.set_loading(loading);
    }

    /// Close popups, detach handlers and remove the artist layers and source.
    pub fn clear_artist_layers(&self) {
        self.popups.borrow_mut().close_all();
        self.layers.teardown(&self.map);
    }

    /// Run one fetch/render cycle for `range`.
    pub async fn fetch_and_display(&self, range: TimeRange) -> FetchOutcome {
        if !self.is_ready() {
            warn!("Map or resources not ready. Aborting fetch.");
            self.ui
                .flash(Flash::info("Map not ready. Please wait...", FLASH_DEFAULT_MS));
            return FetchOutcome::NotReady;
        }

        let cycle = self.cycle.get() + 1;
        self.cycle.set(cycle);
        info!("Fetching top artists for time range {} (cycle {})", range, cycle);

        self.set_loading(true);
        self.ui.flash(Flash::info(
            format!("Fetching your top artists ({})...", range.label()),
            FLASH_DEFAULT_MS,
        ));
        self.active_range.set(Some(range));
        self.ui.set_active_range(range);
        self.clear_artist_layers();
        self.ui.show_list(ListState::Loading);
        self.store.borrow_mut().clear();

        let outcome = match self.populate(cycle, range).await {
            Ok(outcome) => outcome,
            Err(e) if self.is_current(cycle) => {
                error!("Error fetching or processing artists: {}", e);
                let message = e.to_string();
                self.store.borrow_mut().clear();
                self.ui.show_list(ListState::Error(message.clone()));
                self.ui.flash(Flash::error(format!("Error: {}", message)));
                self.clear_artist_layers();
                FetchOutcome::Failed(message)
            }
            Err(e) => {
                debug!("Dropping error from superseded cycle {}: {}", cycle, e);
                FetchOutcome::Superseded
            }
        };

        if self.is_current(cycle) {
            self.set_loading(false);
        }
        outcome
    }

    async fn populate(&self, cycle: u64, range: TimeRange) -> Result<FetchOutcome, SessionError> {
        let raw = self.artists.top_artists(range).await?;
        if !self.is_current(cycle) {
            return Ok(FetchOutcome::Superseded);
        }
        info!("Received {} artists", raw.len());

        if raw.is_empty() {
            self.ui.show_list(ListState::Empty);
            self.ui.flash(Flash::info(
                format!("No top artists found for {}.", range.label()),
                FLASH_DEFAULT_MS,
            ));
            return Ok(FetchOutcome::Empty);
        }

        let records = records_from_payload(raw);
        self.store.borrow_mut().replace_all(records.iter().cloned());
        self.ui.show_list(ListState::Artists(rows_for(&records)));
        let located = records.iter().filter(|r| r.is_located()).count();

        let icon_for_url = self.build_icons(&records).await;
        if !self.is_current(cycle) {
            return Ok(FetchOutcome::Superseded);
        }

        let features = build_feature_collection(&records, &icon_for_url);
        self.layers.setup(
            &self.map,
            &self.icons.borrow(),
            &features,
            self.layer_bindings(),
        )?;

        self.ui.flash(Flash::info(
            format!(
                "Displaying {} artists. {} located on the map.",
                records.len(),
                located
            ),
            FLASH_DEFAULT_MS,
        ));

        if let Some(bounds) = features.bounds() {
            self.map.fit_bounds(FitBounds {
                bounds,
                padding: compute_padding(self.ui.layout(), false),
                max_zoom: CLUSTER_FIT_BOUNDS_MAX_ZOOM,
                duration_ms: FIT_BOUNDS_DURATION_MS,
            });
        }

        Ok(FetchOutcome::Populated {
            total: records.len(),
            located,
        })
    }

    /// Build one icon per distinct avatar URL among located records, all
    /// concurrently. Failures are logged and left out of the returned
    /// URL → icon id map.
    async fn build_icons(&self, records: &[ArtistRecord]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let jobs: Vec<(String, String)> = records
            .iter()
            .filter(|r| r.is_located())
            .filter_map(|r| {
                let url = r.image_url.as_ref()?;
                seen.insert(url.clone())
                    .then(|| (url.clone(), generate_icon_id(r.uri.as_deref(), &r.name, &r.id)))
            })
            .collect();
        debug!("Attempting to load {} unique artist images", jobs.len());

        let results = join_all(
            jobs.iter()
                .map(|(url, id)| build_icon(&self.map, &self.images, &self.icons, url, id)),
        )
        .await;

        let mut loaded = HashMap::new();
        for ((url, icon_id), result) in jobs.iter().zip(results) {
            match result {
                Ok(id) if id == *icon_id => {
                    loaded.insert(url.clone(), id);
                }
                Ok(other) => warn!("Icon for {} registered under unexpected id {}", url, other),
                Err(e) => warn!("Failed to load image for {} (URL: {}): {}", icon_id, url, e),
            }
        }
        info!(
            "Successfully loaded {} / {} unique artist images",
            loaded.len(),
            jobs.len()
        );
        loaded
    }

    /// Wrap a session method as a layer handler holding only a weak
    /// reference back to the session.
    fn handler<F>(&self, f: F) -> LayerHandler
    where
        F: Fn(Rc<Self>, PointerEvent) -> LocalBoxFuture<'static, ()> + 'static,
    {
        let weak = self.weak.clone();
        Rc::new(move |ev: PointerEvent| match weak.upgrade() {
            Some(session) => f(session, ev),
            None => ready(()).boxed_local(),
        })
    }

    fn layer_bindings(&self) -> LayerBindings {
        LayerBindings::default()
            .on(
                LayerEventKind::Click,
                CLUSTER_CIRCLE_LAYER_ID,
                self.handler(|s, ev| {
                    async move {
                        s.on_cluster_click(ev).await;
                    }
                    .boxed_local()
                }),
            )
            .on(
                LayerEventKind::Click,
                ARTIST_ICON_LAYER_ID,
                self.handler(|s, ev| {
                    s.on_point_click(&ev);
                    ready(()).boxed_local()
                }),
            )
            .on(
                LayerEventKind::MouseEnter,
                ARTIST_ICON_LAYER_ID,
                self.handler(|s, ev| {
                    s.on_point_enter(&ev);
                    ready(()).boxed_local()
                }),
            )
            .on(
                LayerEventKind::MouseLeave,
                ARTIST_ICON_LAYER_ID,
                self.handler(|s, _| {
                    s.on_point_leave();
                    ready(()).boxed_local()
                }),
            )
            .on(
                LayerEventKind::MouseEnter,
                CLUSTER_CIRCLE_LAYER_ID,
                self.handler(|s, ev| {
                    s.on_cluster_enter(&ev);
                    ready(()).boxed_local()
                }),
            )
            .on(
                LayerEventKind::MouseLeave,
                CLUSTER_CIRCLE_LAYER_ID,
                self.handler(|s, _| {
                    s.on_cluster_leave();
                    ready(()).boxed_local()
                }),
            )
    }
}
