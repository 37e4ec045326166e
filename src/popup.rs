//! Popup markup. Every artist-supplied string goes through `escape_html`.

use crate::config::PLACEHOLDER_IMG_URL;
use crate::utils::{abbreviate_count, embed_url, escape_html};
use crate::ArtistRecord;

/// Class of clickable member rows inside a cluster popup.
pub const CLUSTER_ROW_CLASS: &str = "cluster-artist-item";
/// Attribute on each row carrying the artist identifier.
pub const ARTIST_ID_ATTR: &str = "data-artist-id";

fn image_or_placeholder(record: &ArtistRecord) -> String {
    escape_html(record.image_url.as_deref().unwrap_or(PLACEHOLDER_IMG_URL))
}

/// Detail popup for a single artist.
pub fn artist_popup_html(record: &ArtistRecord) -> String {
    let name = escape_html(&record.name);
    let origin = escape_html(record.origin.as_deref().unwrap_or("Origin unknown"));
    let genres = if record.genres.is_empty() {
        "N/A".to_string()
    } else {
        escape_html(&record.genres.join(", "))
    };

    let link = match embed_url(record.uri.as_deref()) {
        Some(src) => format!(
            r#"<div class="spotify-embed-container"><iframe style="border-radius:12px" src="{}" width="100%" height="80" frameBorder="0" allow="autoplay; clipboard-write; encrypted-media; fullscreen; picture-in-picture" loading="lazy" title="Spotify Embed for {}"></iframe></div>"#,
            escape_html(&src),
            name
        ),
        None => match &record.external_url {
            Some(url) => format!(
                r#"<a href="{}" target="_blank" class="popup-spotify-link"><i class="fab fa-spotify" aria-hidden="true"></i> Listen on Spotify</a>"#,
                escape_html(url)
            ),
            None => String::new(),
        },
    };

    format!(
        r#"<div class="popup-header"><img src="{img}" class="popup-artist-image" alt="{name}"></div><div class="popup-content"><h3 class="popup-artist-name">{name}</h3><div class="popup-artist-origin"><i class="fas fa-map-marker-alt" aria-hidden="true"></i> {origin}</div><div class="popup-artist-genres"><i class="fas fa-tag" aria-hidden="true"></i> Genres: <small>{genres}</small></div>{link}</div>"#,
        img = image_or_placeholder(record),
        name = name,
        origin = origin,
        genres = genres,
        link = link,
    )
}

/// Member list for a terminal cluster click. `records` are already ranked.
pub fn cluster_popup_html(records: &[ArtistRecord], total: usize) -> String {
    let mut rows = String::new();
    for record in records {
        let name = escape_html(&record.name);
        let link = record
            .external_url
            .as_deref()
            .map(|url| {
                format!(
                    r#"<a href="{}" target="_blank" class="cluster-spotify-link" title="Open {} on Spotify" onclick="event.stopPropagation();"><i class="fab fa-spotify"></i></a>"#,
                    escape_html(url),
                    name
                )
            })
            .unwrap_or_default();
        rows.push_str(&format!(
            r#"<div class="{cls}" {attr}="{id}" role="button" tabindex="0"><span class="cluster-artist-rank">{rank}</span><img src="{img}" class="cluster-artist-img" alt="{name}"><div class="cluster-artist-info"><span class="cluster-artist-name">{name}</span>{link}</div></div>"#,
            cls = CLUSTER_ROW_CLASS,
            attr = ARTIST_ID_ATTR,
            id = escape_html(&record.id),
            rank = record.rank,
            img = image_or_placeholder(record),
            name = name,
            link = link,
        ));
    }
    format!(
        r#"<div class="popup-title">{} Artists</div><div class="artist-cluster-list">{}</div>"#,
        total, rows
    )
}

pub fn hover_artist_html(name: &str) -> String {
    format!("<strong>{}</strong>", escape_html(name))
}

pub fn hover_cluster_html(point_count: usize) -> String {
    format!("<strong>{} artists</strong>", abbreviate_count(point_count))
}
