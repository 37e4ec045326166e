use once_cell::sync::Lazy;
use regex::Regex;

// Three-part external references such as `spotify:artist:4Z8W4fKeB5YxbusRsdQVPb`
static THREE_PART_URI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^:]+:([^:]+):([^:]+)$").unwrap());
static UNSAFE_ID_CHARS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());

const EXTERNAL_BASE: &str = "https://open.spotify.com";
const EMBEDDABLE_KINDS: [&str; 3] = ["artist", "track", "album"];

/// Last colon-delimited segment of a URI, if non-empty.
pub fn uri_tail(uri: &str) -> Option<&str> {
    uri.rsplit(':').next().filter(|s| !s.is_empty())
}

/// Split a `scheme:kind:id` URI into `(kind, id)`.
pub fn uri_kind_and_id(uri: &str) -> Option<(&str, &str)> {
    let caps = THREE_PART_URI_REGEX.captures(uri)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Treat empty strings and the literal `"null"` as missing.
pub fn non_null(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty() && *s != "null")
}

/// Link to the artist's page: the explicit URL, else one derived from the URI.
pub fn external_url(explicit: Option<&str>, uri: Option<&str>) -> Option<String> {
    if let Some(url) = non_null(explicit) {
        return Some(url.to_string());
    }
    let (kind, id) = uri_kind_and_id(uri?)?;
    Some(format!("{}/{}/{}", EXTERNAL_BASE, kind, id))
}

/// Embedded player URL for artist, track and album URIs.
pub fn embed_url(uri: Option<&str>) -> Option<String> {
    let (kind, id) = uri_kind_and_id(uri?)?;
    if !EMBEDDABLE_KINDS.contains(&kind) {
        return None;
    }
    Some(format!(
        "{}/embed/{}/{}?utm_source=generator&theme=0",
        EXTERNAL_BASE, kind, id
    ))
}

/// Icon identifier for an artist avatar.
///
/// Prefers the provider id from the URI; otherwise combines a sanitized
/// name with the record identifier.
pub fn generate_icon_id(uri: Option<&str>, name: &str, artist_id: &str) -> String {
    if let Some(tail) = uri.and_then(uri_tail) {
        return format!("artist-icon-{}", tail);
    }
    let name = if name.is_empty() { "unknown" } else { name };
    let safe = UNSAFE_ID_CHARS_REGEX.replace_all(name, "_").to_lowercase();
    format!("artist-icon-{}-{}", safe, artist_id)
}

/// Escape text for insertion into popup HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Cluster sizes as the map labels them: `950`, `1.2k`, `12k`.
pub fn abbreviate_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        let tenths = (count as f64 / 100.0).round() / 10.0;
        if tenths.fract() == 0.0 {
            format!("{}k", tenths as u64)
        } else {
            format!("{:.1}k", tenths)
        }
    } else {
        count.to_string()
    }
}

/// First `limit` genres joined, with an ellipsis when truncated.
pub fn summarize_genres(genres: &[String], limit: usize) -> Option<String> {
    if genres.is_empty() {
        return None;
    }
    let mut text = genres
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if genres.len() > limit {
        text.push_str("...");
    }
    Some(text)
}
