//! Browser entry point: mounts the page, creates the Mapbox map and wires the
//! session to the sidebar and the time-range buttons.

use log::{error, info, warn};
use music_map::api::{HttpArtistSource, HttpImageFetcher};
use music_map::config::{ConfigError, MapConfig, MAP_CONTAINER_ID};
use music_map::session::{Flash, MapSession, UiSurface};
use music_map::TimeRange;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

mod components;
mod hooks;
mod mapbox;
mod surface;

use components::{render_account, render_flash, render_loading_overlay, ArtistList, TimeRangeSelector};
use hooks::use_flash_expiry;
use mapbox::MapboxEngine;
use surface::{ViewAction, ViewState, YewSurface};

type Session = MapSession<MapboxEngine, HttpArtistSource, HttpImageFetcher, YewSurface>;
type SessionSlot = Rc<RefCell<Option<Rc<Session>>>>;

// ──────────────────────────────────────────────────────────────────────────────
// Startup

/// The server marks signed-in pages with `<body data-authenticated="true">`.
fn is_authenticated() -> bool {
    gloo_utils::document()
        .body()
        .and_then(|b| b.get_attribute("data-authenticated"))
        .is_some_and(|v| v == "true")
}

fn container_present(config: &MapConfig) -> Result<(), ConfigError> {
    gloo_utils::document()
        .get_element_by_id(&config.container_id)
        .map(|_| ())
        .ok_or_else(|| ConfigError::MissingContainer(config.container_id.clone()))
}

/// Hook the map lifecycle up to the session. Listeners only hold a weak
/// reference, so dropping the session tears nothing down twice.
fn start_session(session: &Rc<Session>, authenticated: bool, initial: TimeRange) {
    let weak: Weak<Session> = Rc::downgrade(session);

    let on_error = weak.clone();
    session.map().on_error(move |message| {
        error!("Map error: {}", message);
        if let Some(session) = on_error.upgrade() {
            session
                .ui()
                .flash(Flash::error("Map error occurred. Please try refreshing."));
        }
    });

    session.map().once_load(move || {
        let Some(session) = weak.upgrade() else {
            return;
        };
        session.map().mark_loaded();
        session.map().add_chrome();
        if let Err(e) = session.prepare() {
            error!("Placeholder icon failed: {}", e);
            session.ui().flash(Flash::error(
                "Error loading essential map resources. Please refresh.",
            ));
            return;
        }
        info!("Map ready");
        if !authenticated {
            return;
        }
        let weak = Rc::downgrade(&session);
        session.map().once_idle(move || {
            if let Some(session) = weak.upgrade() {
                spawn_local(async move {
                    session.fetch_and_display(initial).await;
                });
            }
        });
    });
}

// ──────────────────────────────────────────────────────────────────────────────
// App

#[function_component]
fn App() -> Html {
    let view = use_reducer(ViewState::default);
    let session: SessionSlot = use_mut_ref(|| None);
    let config_error = use_state(|| None::<String>);
    let authenticated = use_memo((), |_| is_authenticated());
    let authenticated = *authenticated;

    // Create the map once the container is in the DOM.
    {
        let session = session.clone();
        let dispatcher = view.dispatcher();
        let config_error = config_error.clone();
        use_effect_with((), move |_| {
            let surface = YewSurface::new(dispatcher.clone());
            match MapConfig::from_build_env().and_then(|c| container_present(&c).map(|_| c)) {
                Err(e) => {
                    error!("Map configuration error: {}", e);
                    dispatcher.dispatch(ViewAction::Flash(Flash::error(
                        "Map configuration error. Please check console.",
                    )));
                    config_error.set(Some(e.to_string()));
                }
                Ok(config) => match MapboxEngine::new(&config) {
                    Err(e) => {
                        error!("Map initialization failed: {}", e);
                        dispatcher.dispatch(ViewAction::Flash(Flash::error(
                            "Could not initialize map. Check console.",
                        )));
                        config_error.set(Some(e.to_string()));
                    }
                    Ok(engine) => {
                        let created = MapSession::new(
                            engine,
                            HttpArtistSource::default(),
                            HttpImageFetcher,
                            surface,
                        );
                        start_session(&created, authenticated, TimeRange::default());
                        *session.borrow_mut() = Some(created);
                    }
                },
            }
            let session = session.clone();
            move || {
                session.borrow_mut().take();
            }
        });
    }

    let on_range = {
        let session = session.clone();
        Callback::from(move |range: TimeRange| {
            let Some(session) = session.borrow().clone() else {
                warn!("Time range picked before the map exists");
                return;
            };
            if !session.should_fetch(range) {
                return;
            }
            spawn_local(async move {
                session.fetch_and_display(range).await;
            });
        })
    };

    let on_artist = {
        let session = session.clone();
        Callback::from(move |artist_id: String| {
            if let Some(session) = session.borrow().clone() {
                spawn_local(async move {
                    session.select_from_list(&artist_id).await;
                });
            }
        })
    };

    let on_expire = {
        let dispatcher = view.dispatcher();
        Callback::from(move |seq: u64| dispatcher.dispatch(ViewAction::ExpireFlash(seq)))
    };
    use_flash_expiry(
        view.flash.as_ref().map(|f| (f.seq, f.flash.duration_ms)),
        on_expire,
    );

    html! {
        <div class="app">
            <header class="app-header">
                <h1><i class="fas fa-globe-americas"></i>{ " Music Map" }</h1>
                { render_account(authenticated, view.loading) }
            </header>
            <main class="app-body">
                <aside id="artist-panel" class="artist-panel">
                    if authenticated {
                        <TimeRangeSelector
                            active={view.active_range}
                            loading={view.loading}
                            on_select={on_range}
                        />
                    }
                    <ArtistList
                        list={view.list.clone()}
                        highlighted={view.highlighted.clone()}
                        on_select={on_artist}
                    />
                </aside>
                <section class="map-wrapper">
                    <div id={MAP_CONTAINER_ID} class="map"></div>
                    if let Some(message) = &*config_error {
                        <div class="map-error">
                            <i class="fas fa-exclamation-triangle"></i>
                            <p>{ message }</p>
                        </div>
                    }
                    { render_loading_overlay(view.loading) }
                </section>
            </main>
            { render_flash(view.flash.as_ref().map(|f| &f.flash)) }
        </div>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    music_map::logging::init();
    yew::Renderer::<App>::new().render();
}
