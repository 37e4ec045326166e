//! Yew view components for the page around the map.

use crate::hooks::use_scroll_into_view;
use music_map::list::{ListRow, ListState};
use music_map::session::Flash;
use music_map::TimeRange;
use yew::prelude::*;

/// DOM id of a sidebar row.
pub fn row_element_id(artist_id: &str) -> String {
    format!("artist-row-{}", artist_id)
}

#[derive(Properties, PartialEq)]
pub struct TimeRangeSelectorProps {
    pub active: TimeRange,
    pub loading: bool,
    pub on_select: Callback<TimeRange>,
}

#[function_component]
pub fn TimeRangeSelector(props: &TimeRangeSelectorProps) -> Html {
    html! {
        <div class="time-range-selector" role="group" aria-label="Time range">
            { for TimeRange::ALL.iter().map(|&range| {
                let on_select = props.on_select.clone();
                html! {
                    <button
                        class={classes!("time-range-btn", (range == props.active).then_some("active"))}
                        data-range={range.as_query()}
                        disabled={props.loading}
                        onclick={Callback::from(move |_| on_select.emit(range))}
                    >
                        { range.button_text() }
                    </button>
                }
            }) }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ArtistListProps {
    pub list: ListState,
    pub highlighted: Option<String>,
    pub on_select: Callback<String>,
}

#[function_component]
pub fn ArtistList(props: &ArtistListProps) -> Html {
    use_scroll_into_view(props.highlighted.as_deref().map(row_element_id));

    let body = match &props.list {
        ListState::Idle => empty_state("fas fa-music", "Log in with Spotify to map your top artists."),
        ListState::Loading => empty_state("fas fa-spinner fa-spin", "Loading artists..."),
        ListState::Empty => empty_state("fas fa-compact-disc", "No top artists found for this period."),
        ListState::Error(message) => empty_state(
            "fas fa-exclamation-triangle",
            &format!("Error loading artists: {}", message),
        ),
        ListState::Artists(rows) => rows
            .iter()
            .map(|row| {
                let active = props.highlighted.as_deref() == Some(row.artist_id.as_str());
                render_row(row, active, &props.on_select)
            })
            .collect::<Html>(),
    };

    html! {
        <div id="artist-list" class="artist-list" role="list">
            { body }
        </div>
    }
}

fn empty_state(icon: &'static str, message: &str) -> Html {
    html! {
        <div class="empty-state">
            <i class={icon}></i>
            <p>{ message }</p>
        </div>
    }
}

fn render_row(row: &ListRow, active: bool, on_select: &Callback<String>) -> Html {
    let onclick = {
        let on_select = on_select.clone();
        let artist_id = row.artist_id.clone();
        Callback::from(move |_| on_select.emit(artist_id.clone()))
    };

    html! {
        <div
            id={row_element_id(&row.artist_id)}
            class={classes!("artist-list-item", active.then_some("active"), (!row.located).then_some("unlocated"))}
            data-artist-id={row.artist_id.clone()}
            role="listitem"
            tabindex="0"
            aria-label={format!("Artist: {}, Rank {}", row.name, row.rank)}
            {onclick}
        >
            <div class="artist-rank" aria-hidden="true">{ row.rank }</div>
            <img src={row.image_url.clone()} class="artist-list-image" alt={format!("Image of {}", row.name)} loading="lazy" />
            <div class="artist-info">
                <span class="artist-name">{ &row.name }</span>
                <span class="artist-origin" title={row.origin_title.clone()}>
                    <i class="fas fa-map-marker-alt" aria-hidden="true"></i>
                    { format!(" {}", row.origin_text) }
                </span>
                <span class="artist-genres" title={row.genres_title.clone()}>
                    <i class="fas fa-tag" aria-hidden="true"></i>
                    { format!(" {}", row.genres_text) }
                </span>
            </div>
            <div class="artist-actions">
                if let Some(url) = &row.external_url {
                    <a
                        href={url.clone()}
                        target="_blank"
                        class="spotify-play-icon"
                        title={format!("Open {} on Spotify", row.name)}
                        onclick={Callback::from(|e: MouseEvent| e.stop_propagation())}
                    >
                        <i class="fab fa-spotify" aria-hidden="true"></i>
                    </a>
                }
            </div>
        </div>
    }
}

pub fn render_flash(flash: Option<&Flash>) -> Html {
    let (message, is_error) = flash
        .map(|f| (f.message.clone(), f.is_error))
        .unwrap_or_default();
    html! {
        <div
            id="flash-message"
            class={classes!("flash-message", flash.is_some().then_some("show"), is_error.then_some("error"))}
            role="status"
            aria-live="polite"
        >
            { message }
        </div>
    }
}

pub fn render_loading_overlay(loading: bool) -> Html {
    html! {
        <div class="loading-overlay" aria-hidden={(!loading).to_string()}>
            <div class="spinner"><i class="fas fa-spinner fa-spin"></i></div>
        </div>
    }
}

/// Logout while signed in (disabled during a fetch), login otherwise.
pub fn render_account(authenticated: bool, loading: bool) -> Html {
    if authenticated {
        html! {
            <a
                id="logout-button"
                href={if loading { None } else { Some("/logout") }}
                class={classes!("account-btn", loading.then_some("disabled"))}
                aria-disabled={loading.to_string()}
            >
                { "Log out" }
            </a>
        }
    } else {
        html! {
            <a id="login-button" href="/login" class="account-btn">{ "Log in with Spotify" }</a>
        }
    }
}
