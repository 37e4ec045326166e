//! Sidebar list contents.

use crate::config::PLACEHOLDER_IMG_URL;
use crate::utils::summarize_genres;
use crate::ArtistRecord;

const ORIGIN_UNKNOWN: &str = "Origin Unknown";
const NO_GENRES: &str = "No genre data";
const GENRES_SHOWN: usize = 3;

/// What the sidebar currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ListState {
    #[default]
    Idle,
    Loading,
    Empty,
    Error(String),
    Artists(Vec<ListRow>),
}

/// One sidebar row, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub artist_id: String,
    pub rank: u32,
    pub name: String,
    pub image_url: String,
    pub origin_title: String,
    pub origin_text: String,
    pub genres_text: String,
    pub genres_title: String,
    pub external_url: Option<String>,
    pub located: bool,
}

impl ListRow {
    pub fn from_record(record: &ArtistRecord) -> Self {
        let origin = record.origin.as_deref().unwrap_or(ORIGIN_UNKNOWN);
        let origin_text = if record.is_located() {
            origin.to_string()
        } else {
            format!("{} (Location unavailable)", origin)
        };
        Self {
            artist_id: record.id.clone(),
            rank: record.rank,
            name: record.name.clone(),
            image_url: record
                .image_url
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_IMG_URL.to_string()),
            origin_title: origin.to_string(),
            origin_text,
            genres_text: summarize_genres(&record.genres, GENRES_SHOWN)
                .unwrap_or_else(|| NO_GENRES.to_string()),
            genres_title: record.genres.join(", "),
            external_url: record.external_url.clone(),
            located: record.is_located(),
        }
    }
}

/// Rows in fetch order.
pub fn rows_for(records: &[ArtistRecord]) -> Vec<ListRow> {
    records.iter().map(ListRow::from_record).collect()
}
