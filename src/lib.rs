//! Core of the music map: artist records, the map view session and its
//! collaborators. Everything browser-specific sits behind the traits in
//! [`engine`], [`api`] and [`session`], so the orchestration can run against
//! fakes in native tests.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub mod api;
pub mod config;
pub mod engine;
pub mod geo;
pub mod icons;
pub mod interaction;
pub mod layers;
pub mod list;
pub mod logging;
pub mod popup;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod fakes;

use geo::{position_from, LngLat};

/// Listening-history window offered by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeRange {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub const ALL: [TimeRange; 3] = [
        TimeRange::ShortTerm,
        TimeRange::MediumTerm,
        TimeRange::LongTerm,
    ];

    /// Value of the `time_range` query parameter.
    pub fn as_query(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    /// Human wording used in messages ("medium term").
    pub fn label(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short term",
            TimeRange::MediumTerm => "medium term",
            TimeRange::LongTerm => "long term",
        }
    }

    /// Button caption.
    pub fn button_text(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "Last Month",
            TimeRange::MediumTerm => "Last 6 Months",
            TimeRange::LongTerm => "All Time",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "short_term" => Ok(TimeRange::ShortTerm),
            "medium_term" => Ok(TimeRange::MediumTerm),
            "long_term" => Ok(TimeRange::LongTerm),
            other => Err(format!("Unknown time range: {}", other)),
        }
    }
}

/// Artist object as the endpoint sends it. Every field is optional and
/// coordinates may be numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub spotify_url: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// One artist as the rest of the application sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    pub position: Option<LngLat>,
    pub image_url: Option<String>,
    pub origin: Option<String>,
    pub genres: Vec<String>,
    pub external_url: Option<String>,
    pub uri: Option<String>,
    /// 1-based position in the fetched list.
    pub rank: u32,
}

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

impl ArtistRecord {
    pub fn is_located(&self) -> bool {
        self.position.is_some()
    }
}

/// Stable string identifier: provider id, else the URI tail, else a
/// fallback built from the name and list position.
pub fn assign_artist_id(raw: &RawArtist, index: usize) -> String {
    let provided = match &raw.id {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    provided
        .or_else(|| {
            raw.uri
                .as_deref()
                .and_then(utils::uri_tail)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            format!(
                "generated-{}-{}",
                raw.name.as_deref().unwrap_or_default(),
                index
            )
        })
}

impl ArtistRecord {
    pub fn from_raw(raw: RawArtist, index: usize) -> Self {
        let id = assign_artist_id(&raw, index);
        let position = position_from(raw.lat.as_ref(), raw.lon.as_ref());
        let external_url = utils::external_url(raw.spotify_url.as_deref(), raw.uri.as_deref());
        Self {
            id,
            name: raw
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            position,
            image_url: utils::non_null(raw.image_url.as_deref()).map(str::to_string),
            origin: utils::non_null(raw.origin.as_deref()).map(str::to_string),
            genres: raw.genres.unwrap_or_default(),
            external_url,
            uri: raw.uri,
            rank: index as u32 + 1,
        }
    }
}

/// Turn the endpoint payload into records ranked by list position.
pub fn records_from_payload(artists: Vec<RawArtist>) -> Vec<ArtistRecord> {
    artists
        .into_iter()
        .enumerate()
        .map(|(i, raw)| ArtistRecord::from_raw(raw, i))
        .collect()
}
