//! Pointer handling on the artist layers and the list/popup selection flows.
//!
//! At most one click popup and one hover popup are open at any time. Every
//! path that opens a click popup closes the previous one first.

use crate::api::{ArtistSource, ImageFetcher};
use crate::config::{
    CLUSTER_EASE_DURATION_MS, CLUSTER_FALLBACK_ZOOM_STEP, CLUSTER_MAX_ZOOM,
    CLUSTER_POPUP_DELAY_MS, FLASH_SHORT_MS, FLY_POPUP_DELAY_MS, FLY_TO_SPEED,
    FLY_TO_ZOOM_UNCLUSTERED, HOVER_POPUP_OFFSET, POPUP_MAX_WIDTH, POPUP_OFFSET_CLUSTER,
    POPUP_OFFSET_POINT,
};
use crate::engine::{CameraMove, Easing, MapEngine, PointerEvent, PopupHandle, PopupSpec, RowHandler};
use crate::geo::{wrap_longitude_near, LngLat};
use crate::layers::ARTIST_SOURCE_ID;
use crate::popup::{artist_popup_html, cluster_popup_html, hover_artist_html, hover_cluster_html};
use crate::session::{Flash, MapSession, UiSurface};
use crate::ArtistRecord;
use futures::future::ready;
use futures::FutureExt;
use log::{debug, error, info, warn};
use std::rc::Rc;

pub const CLUSTER_POPUP_CLASS: &str = "cluster-popup";
pub const HOVER_POPUP_CLASS: &str = "mapboxgl-popup-hover";

/// A terminal click lands at least this far past the clustering threshold.
const TERMINAL_ZOOM_MARGIN: f64 = 0.5;

/// The popups currently on screen.
pub struct PopupState<P: PopupHandle> {
    click: Option<P>,
    hover: Option<P>,
    hovered_artist: Option<String>,
}

impl<P: PopupHandle> Default for PopupState<P> {
    fn default() -> Self {
        Self {
            click: None,
            hover: None,
            hovered_artist: None,
        }
    }
}

impl<P: PopupHandle> PopupState<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_click_popup(&self) -> bool {
        self.click.is_some()
    }

    pub fn hovered_artist(&self) -> Option<&str> {
        self.hovered_artist.as_deref()
    }

    pub fn close_click(&mut self) {
        if let Some(popup) = self.click.take() {
            popup.remove();
        }
    }

    pub fn replace_click(&mut self, popup: P) {
        self.close_click();
        self.click = Some(popup);
    }

    pub fn close_hover(&mut self) {
        if let Some(popup) = self.hover.take() {
            popup.remove();
        }
    }

    pub fn replace_hover(&mut self, popup: P) {
        self.close_hover();
        self.hover = Some(popup);
    }

    pub fn close_all(&mut self) {
        self.close_click();
        self.close_hover();
        self.hovered_artist = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterClickKind {
    /// Expanding would break the cluster into unclustered points; list the
    /// members instead.
    Terminal,
    Intermediate,
}

pub fn classify_expansion(expansion_zoom: f64) -> ClusterClickKind {
    if expansion_zoom > CLUSTER_MAX_ZOOM {
        ClusterClickKind::Terminal
    } else {
        ClusterClickKind::Intermediate
    }
}

/// How far to zoom in on a terminal cluster, by member count.
pub fn terminal_zoom_increment(point_count: usize) -> f64 {
    if point_count > 15 {
        1.5
    } else if point_count > 5 {
        2.0
    } else {
        2.5
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterZoomPlan {
    pub kind: ClusterClickKind,
    pub target_zoom: f64,
}

/// Decide where a cluster click takes the camera.
pub fn plan_cluster_zoom(
    current_zoom: f64,
    point_count: usize,
    expansion_zoom: f64,
    map_max_zoom: f64,
) -> ClusterZoomPlan {
    let cap = map_max_zoom.min(CLUSTER_MAX_ZOOM + 2.0);
    let kind = classify_expansion(expansion_zoom);
    let target_zoom = match kind {
        ClusterClickKind::Terminal => (current_zoom + terminal_zoom_increment(point_count))
            .max(CLUSTER_MAX_ZOOM + TERMINAL_ZOOM_MARGIN)
            .min(cap),
        ClusterClickKind::Intermediate => {
            expansion_zoom.max(current_zoom + 0.1).min(cap)
        }
    };
    ClusterZoomPlan { kind, target_zoom }
}

/// Target when the expansion zoom could not be determined.
pub fn fallback_cluster_zoom(current_zoom: f64, map_max_zoom: f64) -> f64 {
    (current_zoom + CLUSTER_FALLBACK_ZOOM_STEP).min(map_max_zoom)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClusterClickOutcome {
    Ignored,
    Fallback { target_zoom: f64 },
    Zoomed { target_zoom: f64 },
    Listed { target_zoom: f64, members: usize },
}

impl<M, A, I, U> MapSession<M, A, I, U>
where
    M: MapEngine,
    A: ArtistSource,
    I: ImageFetcher,
    U: UiSurface,
{
    pub async fn on_cluster_click(&self, ev: PointerEvent) -> ClusterClickOutcome {
        let Some((cluster_id, point_count, center)) = ev.first_cluster() else {
            return ClusterClickOutcome::Ignored;
        };
        self.popups.borrow_mut().close_click();

        let current = self.map.zoom();
        let max_zoom = self.map.max_zoom();
        let expansion = match self
            .map
            .cluster_expansion_zoom(ARTIST_SOURCE_ID, cluster_id)
            .await
        {
            Ok(zoom) => zoom,
            Err(e) => {
                error!("Error getting cluster expansion zoom: {}", e);
                let target_zoom = fallback_cluster_zoom(current, max_zoom);
                self.map.ease_to(CameraMove {
                    center,
                    zoom: target_zoom,
                    duration_ms: Some(CLUSTER_EASE_DURATION_MS),
                    speed: None,
                    easing: Easing::EaseOutQuad,
                });
                return ClusterClickOutcome::Fallback { target_zoom };
            }
        };

        let plan = plan_cluster_zoom(current, point_count, expansion, max_zoom);
        debug!(
            "Cluster {} ({} artists) expansion zoom {} -> {:?}",
            cluster_id, point_count, expansion, plan
        );
        self.map.ease_to(CameraMove {
            center,
            zoom: plan.target_zoom,
            duration_ms: Some(CLUSTER_EASE_DURATION_MS),
            speed: None,
            easing: Easing::EaseOutQuad,
        });

        if plan.kind == ClusterClickKind::Intermediate {
            return ClusterClickOutcome::Zoomed {
                target_zoom: plan.target_zoom,
            };
        }

        let members = self.list_cluster(cluster_id, point_count, center).await;
        ClusterClickOutcome::Listed {
            target_zoom: plan.target_zoom,
            members,
        }
    }

    /// Open the member list popup for a terminal cluster. Returns how many
    /// members were listed.
    async fn list_cluster(&self, cluster_id: u64, point_count: usize, center: LngLat) -> usize {
        let leaves = match self
            .map
            .cluster_leaves(ARTIST_SOURCE_ID, cluster_id, point_count, 0)
            .await
        {
            Ok(leaves) => leaves,
            Err(e) => {
                error!("Error getting cluster leaves: {}", e);
                return 0;
            }
        };
        let members = self
            .store
            .borrow()
            .resolve_ranked(leaves.iter().filter_map(|l| l.artist_id.as_deref()));
        if members.is_empty() {
            warn!("No artist data found for cluster {} leaves", cluster_id);
            return 0;
        }

        self.map.pause(CLUSTER_POPUP_DELAY_MS).await;
        if !self.map.has_source(ARTIST_SOURCE_ID) {
            debug!("Artist source removed before cluster popup could open");
            return 0;
        }

        let popup = self.map.open_popup(PopupSpec {
            at: center,
            html: cluster_popup_html(&members, point_count),
            offset: POPUP_OFFSET_CLUSTER,
            close_button: true,
            close_on_click: true,
            max_width: Some(POPUP_MAX_WIDTH),
            class_name: Some(CLUSTER_POPUP_CLASS),
            on_row_click: Some(self.row_handler()),
        });
        self.popups.borrow_mut().replace_click(popup);
        members.len()
    }

    fn row_handler(&self) -> RowHandler {
        let weak = self.weak.clone();
        Rc::new(move |artist_id: String| match weak.upgrade() {
            Some(session) => async move {
                session.select_from_cluster_popup(&artist_id).await;
            }
            .boxed_local(),
            None => ready(()).boxed_local(),
        })
    }

    fn open_artist_popup(&self, record: &ArtistRecord, at: LngLat) {
        let mut popups = self.popups.borrow_mut();
        popups.close_click();
        let popup = self.map.open_popup(PopupSpec {
            at,
            html: artist_popup_html(record),
            offset: POPUP_OFFSET_POINT,
            close_button: true,
            close_on_click: true,
            max_width: Some(POPUP_MAX_WIDTH),
            class_name: None,
            on_row_click: None,
        });
        popups.replace_click(popup);
    }

    fn fly_to_artist(&self, center: LngLat, zoom: f64) {
        self.map.fly_to(CameraMove {
            center,
            zoom,
            duration_ms: None,
            speed: Some(FLY_TO_SPEED),
            easing: Easing::EngineDefault,
        });
    }

    pub fn on_point_click(&self, ev: &PointerEvent) {
        let Some((artist_id, _, position)) = ev.first_artist() else {
            return;
        };
        let Some(artist_id) = artist_id else {
            warn!("Clicked artist point without an artistId property");
            return;
        };
        let Some(record) = self.artist(artist_id) else {
            warn!("No stored record for clicked artist {}", artist_id);
            self.ui
                .flash(Flash::info("Artist details not available.", FLASH_SHORT_MS));
            return;
        };

        let center = LngLat::new(wrap_longitude_near(position.lng, ev.lng_lat.lng), position.lat);
        self.fly_to_artist(center, self.map.zoom().max(FLY_TO_ZOOM_UNCLUSTERED));
        self.open_artist_popup(&record, center);
        self.ui.highlight(&record.id);
    }

    pub fn on_point_enter(&self, ev: &PointerEvent) {
        if self.map.is_moving() {
            return;
        }
        let Some((artist_id, name, position)) = ev.first_artist() else {
            return;
        };
        self.map.set_pointer_cursor(true);

        let mut popups = self.popups.borrow_mut();
        popups.close_hover();
        popups.hovered_artist = artist_id.map(str::to_string);
        if let Some(name) = name {
            let at = LngLat::new(wrap_longitude_near(position.lng, ev.lng_lat.lng), position.lat);
            let popup = self.map.open_popup(hover_spec(at, hover_artist_html(name)));
            popups.replace_hover(popup);
        }
    }

    pub fn on_point_leave(&self) {
        self.map.set_pointer_cursor(false);
        let mut popups = self.popups.borrow_mut();
        popups.hovered_artist = None;
        popups.close_hover();
    }

    pub fn on_cluster_enter(&self, ev: &PointerEvent) {
        if self.map.is_moving() {
            return;
        }
        let Some((_, point_count, center)) = ev.first_cluster() else {
            return;
        };
        self.map.set_pointer_cursor(true);
        let popup = self
            .map
            .open_popup(hover_spec(center, hover_cluster_html(point_count)));
        self.popups.borrow_mut().replace_hover(popup);
    }

    pub fn on_cluster_leave(&self) {
        self.map.set_pointer_cursor(false);
        self.popups.borrow_mut().close_hover();
    }

    /// A row in the sidebar was clicked.
    pub async fn select_from_list(&self, artist_id: &str) {
        self.ui.highlight(artist_id);
        let located = self
            .artist(artist_id)
            .and_then(|r| r.position.map(|p| (r, p)));
        let Some((record, center)) = located else {
            info!("Artist {} has no map location", artist_id);
            self.ui.flash(Flash::info(
                "Artist location not available on the map.",
                FLASH_SHORT_MS,
            ));
            self.popups.borrow_mut().close_click();
            return;
        };

        self.fly_to_artist(center, self.map.zoom().max(FLY_TO_ZOOM_UNCLUSTERED));
        self.map.pause(FLY_POPUP_DELAY_MS).await;
        if self.map.has_source(ARTIST_SOURCE_ID) {
            self.open_artist_popup(&record, center);
        }
    }

    /// A member row inside a cluster popup was clicked.
    pub async fn select_from_cluster_popup(&self, artist_id: &str) {
        let located = self
            .artist(artist_id)
            .and_then(|r| r.position.map(|p| (r, p)));
        let Some((record, center)) = located else {
            warn!("Cluster member {} has no record or location", artist_id);
            self.ui.flash(Flash::info(
                "Selected artist location not available.",
                FLASH_SHORT_MS,
            ));
            return;
        };

        self.popups.borrow_mut().close_click();
        self.fly_to_artist(center, FLY_TO_ZOOM_UNCLUSTERED + 1.0);
        self.map.pause(FLY_POPUP_DELAY_MS).await;
        if self.map.has_source(ARTIST_SOURCE_ID) {
            self.open_artist_popup(&record, center);
            self.ui.highlight(&record.id);
        }
    }
}

fn hover_spec(at: LngLat, html: String) -> PopupSpec {
    PopupSpec {
        at,
        html,
        offset: HOVER_POPUP_OFFSET,
        close_button: false,
        close_on_click: false,
        max_width: None,
        class_name: Some(HOVER_POPUP_CLASS),
        on_row_click: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FeatureHit, LeafFeature};
    use crate::fakes::{test_session, FakeArtists, TestSession};
    use crate::TimeRange;
    use futures::executor::block_on;
    use serde_json::json;

    fn populated() -> TestSession {
        let session = test_session(FakeArtists::returning(json!([
            { "id": "a", "name": "Alpha", "lat": 51.5, "lon": -0.12 },
            { "id": "b", "name": "Bravo", "lat": 51.5, "lon": -0.13 },
            { "id": "c", "name": "Charlie", "lat": 51.6, "lon": -0.12 },
            { "id": "d", "name": "Delta", "lat": null, "lon": null },
            { "id": "e", "name": "Echo", "lat": -33.9, "lon": 179.0 }
        ])));
        session.prepare().unwrap();
        block_on(session.fetch_and_display(TimeRange::MediumTerm));
        session
    }

    fn cluster_event(count: usize) -> PointerEvent {
        PointerEvent {
            lng_lat: LngLat::new(-0.12, 51.5),
            hits: vec![FeatureHit::Cluster {
                cluster_id: 9,
                point_count: count,
                position: LngLat::new(-0.125, 51.55),
            }],
        }
    }

    fn artist_event(id: &str, name: &str, position: LngLat, clicked: LngLat) -> PointerEvent {
        PointerEvent {
            lng_lat: clicked,
            hits: vec![FeatureHit::Artist {
                artist_id: Some(id.into()),
                name: Some(name.into()),
                position,
            }],
        }
    }

    #[test]
    fn classifies_by_expansion_zoom() {
        assert_eq!(classify_expansion(15.0), ClusterClickKind::Terminal);
        assert_eq!(classify_expansion(12.0), ClusterClickKind::Intermediate);
        assert_eq!(classify_expansion(14.0), ClusterClickKind::Intermediate);
    }

    #[test]
    fn terminal_plan_is_raised_past_the_cluster_threshold() {
        let plan = plan_cluster_zoom(10.0, 20, 15.0, 22.0);
        assert_eq!(plan.kind, ClusterClickKind::Terminal);
        assert_eq!(plan.target_zoom, 14.5);

        assert_eq!(plan_cluster_zoom(10.0, 6, 15.0, 22.0).target_zoom, 14.5);
        assert_eq!(plan_cluster_zoom(10.0, 3, 15.0, 22.0).target_zoom, 14.5);
    }

    #[test]
    fn terminal_plan_uses_count_increment_above_the_threshold() {
        assert_eq!(plan_cluster_zoom(13.5, 20, 15.0, 22.0).target_zoom, 15.0);
        assert_eq!(plan_cluster_zoom(13.5, 6, 15.0, 22.0).target_zoom, 15.5);
        assert_eq!(plan_cluster_zoom(13.0, 3, 15.0, 22.0).target_zoom, 15.5);
    }

    #[test]
    fn terminal_plan_is_capped() {
        // min(map max, cluster max + 2)
        assert_eq!(plan_cluster_zoom(15.0, 3, 15.0, 22.0).target_zoom, 16.0);
        assert_eq!(plan_cluster_zoom(15.0, 3, 15.0, 15.5).target_zoom, 15.5);
        // a map max below the raised floor wins
        assert_eq!(plan_cluster_zoom(10.0, 20, 15.0, 14.0).target_zoom, 14.0);
    }

    #[test]
    fn terminal_click_from_low_zoom_crosses_the_threshold() {
        let session = populated();
        session.map.set_zoom(3.0);
        session.map.set_expansion_zoom(Some(15.0));
        session.map.set_leaves(&["a", "b"]);

        let outcome = block_on(session.on_cluster_click(cluster_event(2)));
        assert_eq!(
            outcome,
            ClusterClickOutcome::Listed {
                target_zoom: 14.5,
                members: 2
            }
        );
        assert_eq!(session.map.eases().pop().unwrap().zoom, 14.5);
    }

    #[test]
    fn intermediate_plan_always_zooms_in() {
        assert_eq!(plan_cluster_zoom(10.0, 4, 12.0, 22.0).target_zoom, 12.0);
        assert_eq!(plan_cluster_zoom(10.0, 4, 9.0, 22.0).target_zoom, 10.1);
        assert_eq!(plan_cluster_zoom(10.0, 4, 12.0, 11.0).target_zoom, 11.0);
    }

    #[test]
    fn fallback_steps_two_levels() {
        assert_eq!(fallback_cluster_zoom(5.0, 22.0), 7.0);
        assert_eq!(fallback_cluster_zoom(21.0, 22.0), 22.0);
    }

    #[test]
    fn terminal_cluster_lists_ranked_members() {
        let session = populated();
        session.map.set_zoom(13.0);
        session.map.set_expansion_zoom(Some(15.0));
        session.map.set_leaves(&["c", "a", "unknown", "b"]);

        let outcome = block_on(session.on_cluster_click(cluster_event(3)));
        assert_eq!(
            outcome,
            ClusterClickOutcome::Listed {
                target_zoom: 15.5,
                members: 3
            }
        );

        let ease = session.map.eases().pop().unwrap();
        assert_eq!(ease.duration_ms, Some(800));
        assert_eq!(ease.easing, Easing::EaseOutQuad);
        assert_eq!(session.map.pauses(), [400]);

        let popups = session.map.open_popups();
        assert_eq!(popups.len(), 1);
        assert_eq!(popups[0].class_name, Some(CLUSTER_POPUP_CLASS));
        let html = &popups[0].html;
        let a = html.find(r#"data-artist-id="a""#).unwrap();
        let b = html.find(r#"data-artist-id="b""#).unwrap();
        let c = html.find(r#"data-artist-id="c""#).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn intermediate_cluster_only_zooms() {
        let session = populated();
        session.map.set_zoom(10.0);
        session.map.set_expansion_zoom(Some(12.0));

        let outcome = block_on(session.on_cluster_click(cluster_event(3)));
        assert_eq!(outcome, ClusterClickOutcome::Zoomed { target_zoom: 12.0 });
        assert!(session.map.open_popups().is_empty());
        assert!(session.map.pauses().is_empty());
    }

    #[test]
    fn expansion_failure_falls_back() {
        let session = populated();
        session.map.set_zoom(5.0);
        session.map.set_expansion_zoom(None);

        let outcome = block_on(session.on_cluster_click(cluster_event(3)));
        assert_eq!(outcome, ClusterClickOutcome::Fallback { target_zoom: 7.0 });
        let ease = session.map.eases().pop().unwrap();
        assert_eq!(ease.zoom, 7.0);
        assert_eq!(ease.duration_ms, Some(800));
        assert_eq!(ease.easing, Easing::EaseOutQuad);
    }

    #[test]
    fn cluster_popup_is_skipped_when_layers_vanish() {
        let session = populated();
        session.map.set_expansion_zoom(Some(16.0));
        session.map.set_leaves(&["a", "b"]);
        session.map.on_pause(|map| {
            map.drop_source(ARTIST_SOURCE_ID);
        });

        let outcome = block_on(session.on_cluster_click(cluster_event(2)));
        assert!(matches!(outcome, ClusterClickOutcome::Listed { members: 0, .. }));
        assert!(session.map.open_popups().is_empty());
    }

    #[test]
    fn cluster_row_click_flies_and_opens_detail() {
        let session = populated();
        session.map.set_expansion_zoom(Some(15.0));
        session.map.set_leaves(&["a", "b"]);
        block_on(session.on_cluster_click(cluster_event(2)));

        let handler = session.map.open_popups()[0].on_row_click.clone().unwrap();
        block_on(handler("b".to_string()));

        let flight = session.map.flights().pop().unwrap();
        assert_eq!(flight.zoom, 11.0);
        assert_eq!(flight.center, LngLat::new(-0.13, 51.5));
        assert_eq!(session.ui.highlights(), ["b"]);

        let open = session.map.open_popups();
        assert_eq!(open.len(), 1);
        assert!(open[0].html.contains("Bravo"));
        assert_eq!(open[0].class_name, None);
    }

    #[test]
    fn point_click_wraps_across_the_antimeridian() {
        let session = populated();
        session.map.set_zoom(3.0);
        let ev = artist_event(
            "e",
            "Echo",
            LngLat::new(179.0, -33.9),
            LngLat::new(-179.0, -33.9),
        );
        session.on_point_click(&ev);

        let flight = session.map.flights().pop().unwrap();
        assert_eq!(flight.center, LngLat::new(-181.0, -33.9));
        assert_eq!(flight.zoom, 10.0);
        assert_eq!(flight.speed, Some(0.8));
        assert_eq!(session.map.open_popups()[0].at.lng, -181.0);
        assert_eq!(session.ui.highlights(), ["e"]);
    }

    #[test]
    fn only_one_click_popup_at_a_time() {
        let session = populated();
        let here = LngLat::new(-0.12, 51.5);
        session.on_point_click(&artist_event("a", "Alpha", here, here));
        session.on_point_click(&artist_event("b", "Bravo", LngLat::new(-0.13, 51.5), here));
        let open = session.map.open_popups();
        assert_eq!(open.len(), 1);
        assert!(open[0].html.contains("Bravo"));
    }

    #[test]
    fn unknown_point_flashes() {
        let session = populated();
        let here = LngLat::new(0.0, 0.0);
        session.on_point_click(&artist_event("zzz", "Ghost", here, here));
        assert_eq!(
            session.ui.last_flash().unwrap().message,
            "Artist details not available."
        );
        assert!(session.map.open_popups().is_empty());
    }

    #[test]
    fn hover_tracks_one_popup_and_skips_while_moving() {
        let session = populated();
        let here = LngLat::new(-0.12, 51.5);

        session.map.set_moving(true);
        session.on_point_enter(&artist_event("a", "Alpha", here, here));
        assert!(session.map.open_popups().is_empty());
        assert!(!session.map.pointer_cursor());

        session.map.set_moving(false);
        session.on_point_enter(&artist_event("a", "Alpha", here, here));
        session.on_point_enter(&artist_event("b", "Bravo", here, here));
        let open = session.map.open_popups();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].html, "<strong>Bravo</strong>");
        assert_eq!(session.popups.borrow().hovered_artist(), Some("b"));
        assert!(session.map.pointer_cursor());

        session.on_point_leave();
        assert!(session.map.open_popups().is_empty());
        assert!(!session.map.pointer_cursor());
        assert_eq!(session.popups.borrow().hovered_artist(), None);

        session.on_cluster_enter(&cluster_event(1234));
        assert_eq!(
            session.map.open_popups()[0].html,
            "<strong>1.2k artists</strong>"
        );
        session.on_cluster_leave();
        assert!(session.map.open_popups().is_empty());
    }

    #[test]
    fn list_click_on_located_artist_opens_popup_after_flight() {
        let session = populated();
        session.map.set_zoom(12.0);
        block_on(session.select_from_list("c"));

        let flight = session.map.flights().pop().unwrap();
        assert_eq!(flight.zoom, 12.0);
        assert_eq!(session.map.pauses(), [600]);
        assert!(session.map.open_popups()[0].html.contains("Charlie"));
        assert_eq!(session.ui.highlights(), ["c"]);
    }

    #[test]
    fn list_click_on_unlocated_artist_flashes() {
        let session = populated();
        let here = LngLat::new(-0.12, 51.5);
        session.on_point_click(&artist_event("a", "Alpha", here, here));

        block_on(session.select_from_list("d"));
        assert_eq!(
            session.ui.last_flash().unwrap().message,
            "Artist location not available on the map."
        );
        assert!(session.map.open_popups().is_empty());
        assert_eq!(session.ui.highlights(), ["a", "d"]);
    }

    #[test]
    fn leaves_without_ids_are_dropped() {
        let session = populated();
        session.map.set_expansion_zoom(Some(15.0));
        session.map.set_leaf_features(vec![LeafFeature { artist_id: None }]);
        let outcome = block_on(session.on_cluster_click(cluster_event(1)));
        assert!(matches!(outcome, ClusterClickOutcome::Listed { members: 0, .. }));
        assert!(session.map.open_popups().is_empty());
    }
}
