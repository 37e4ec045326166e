//! Page state shown around the map, and the `UiSurface` the session drives
//! it through.

use music_map::config::ARTIST_PANEL_ID;
use music_map::geo::PanelLayout;
use music_map::list::ListState;
use music_map::session::{Flash, UiSurface};
use music_map::TimeRange;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;
use yew::prelude::*;

/// A flash message tagged with its sequence number, so an expiry timer
/// only clears the message it was started for.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownFlash {
    pub seq: u64,
    pub flash: Flash,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewState {
    pub loading: bool,
    pub active_range: TimeRange,
    pub list: ListState,
    pub highlighted: Option<String>,
    pub flash: Option<ShownFlash>,
    flash_seq: u64,
}

pub enum ViewAction {
    SetLoading(bool),
    SetRange(TimeRange),
    ShowList(ListState),
    Highlight(String),
    Flash(Flash),
    ExpireFlash(u64),
}

impl Reducible for ViewState {
    type Action = ViewAction;

    fn reduce(self: Rc<Self>, action: ViewAction) -> Rc<Self> {
        let mut next = (*self).clone();
        match action {
            ViewAction::SetLoading(loading) => next.loading = loading,
            ViewAction::SetRange(range) => next.active_range = range,
            ViewAction::ShowList(list) => {
                next.list = list;
                next.highlighted = None;
            }
            ViewAction::Highlight(id) => next.highlighted = Some(id),
            ViewAction::Flash(flash) => {
                next.flash_seq += 1;
                next.flash = Some(ShownFlash {
                    seq: next.flash_seq,
                    flash,
                });
            }
            ViewAction::ExpireFlash(seq) => {
                if next.flash.as_ref().map(|f| f.seq) != Some(seq) {
                    return self;
                }
                next.flash = None;
            }
        }
        Rc::new(next)
    }
}

/// Forwards session updates into the app's reducer.
#[derive(Clone)]
pub struct YewSurface {
    dispatcher: UseReducerDispatcher<ViewState>,
}

impl YewSurface {
    pub fn new(dispatcher: UseReducerDispatcher<ViewState>) -> Self {
        Self { dispatcher }
    }
}

impl UiSurface for YewSurface {
    fn set_loading(&self, loading: bool) {
        self.dispatcher.dispatch(ViewAction::SetLoading(loading));
    }

    fn set_active_range(&self, range: TimeRange) {
        self.dispatcher.dispatch(ViewAction::SetRange(range));
    }

    fn show_list(&self, list: ListState) {
        self.dispatcher.dispatch(ViewAction::ShowList(list));
    }

    fn highlight(&self, artist_id: &str) {
        self.dispatcher
            .dispatch(ViewAction::Highlight(artist_id.to_string()));
    }

    fn flash(&self, flash: Flash) {
        self.dispatcher.dispatch(ViewAction::Flash(flash));
    }

    fn layout(&self) -> PanelLayout {
        let viewport_width = web_sys::window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let panel_width = gloo_utils::document()
            .get_element_by_id(ARTIST_PANEL_ID)
            .and_then(|e| e.dyn_into::<HtmlElement>().ok())
            .map(|e| e.offset_width() as f64)
            .unwrap_or(0.0);
        PanelLayout {
            panel_width,
            viewport_width,
        }
    }
}
