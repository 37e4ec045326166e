//! Application-level configuration constants and deployment settings.

use thiserror::Error;

// Endpoint
pub const TOP_ARTISTS_ENDPOINT: &str = "/top-artists";

// Map setup
pub const MAP_CONTAINER_ID: &str = "map";
pub const ARTIST_PANEL_ID: &str = "artist-panel";
pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/dark-v11";
pub const INITIAL_CENTER: (f64, f64) = (0.0, 20.0);
pub const INITIAL_ZOOM: f64 = 1.5;

// Icons
pub const PLACEHOLDER_ICON_ID: &str = "placeholder-artist-icon";
pub const ICON_SIZE_PX: u32 = 140;
pub const ICON_BORDER_WIDTH_PX: u32 = 10;
pub const MAP_ICON_DISPLAY_SIZE: f64 = 0.35;
/// Transparent 1x1 PNG used wherever an avatar is missing in the sidebar.
pub const PLACEHOLDER_IMG_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

// Clustering
pub const CLUSTER_RADIUS: u32 = 45;
pub const CLUSTER_MAX_ZOOM: f64 = 14.0;
pub const CLUSTER_FIT_BOUNDS_MAX_ZOOM: f64 = CLUSTER_MAX_ZOOM + 1.0;

// Camera
pub const FLY_TO_ZOOM_UNCLUSTERED: f64 = 10.0;
pub const FLY_TO_SPEED: f64 = 0.8;
pub const CLUSTER_EASE_DURATION_MS: u32 = 800;
pub const CLUSTER_FALLBACK_ZOOM_STEP: f64 = 2.0;
pub const FIT_BOUNDS_DURATION_MS: u32 = 1000;

// Popup sequencing
pub const CLUSTER_POPUP_DELAY_MS: u32 = 400;
pub const FLY_POPUP_DELAY_MS: u32 = 600;

// Popups
pub const POPUP_OFFSET_POINT: f64 = 15.0;
pub const POPUP_OFFSET_CLUSTER: f64 = 25.0;
pub const HOVER_POPUP_OFFSET: f64 = 10.0;
pub const POPUP_MAX_WIDTH: &str = "300px";

// Flash messages
pub const FLASH_DEFAULT_MS: u32 = 3000;
pub const FLASH_SHORT_MS: u32 = 2000;
pub const FLASH_ERROR_MS: u32 = 5000;

// Layout
pub const DEFAULT_PADDING_PX: f64 = 50.0;
pub const PANEL_GUTTER_PX: f64 = 20.0;
pub const MOBILE_BREAKPOINT_PX: f64 = 992.0;

// Token sanity
const TOKEN_PLACEHOLDER: &str = "YOUR_MAPBOX_ACCESS_TOKEN";
const MIN_TOKEN_LEN: usize = 10;

/// Configuration problems that disable the map entirely.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Mapbox access token is not set")]
    MissingToken,
    #[error("Mapbox access token is still the placeholder value")]
    PlaceholderToken,
    #[error("Mapbox access token looks invalid ({0} characters)")]
    MalformedToken(usize),
    #[error("Map container element (#{0}) not found")]
    MissingContainer(String),
}

/// Deployment settings baked in at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub access_token: String,
    pub style_url: String,
    pub container_id: String,
}

impl MapConfig {
    /// Read `MAPBOX_ACCESS_TOKEN` and `MUSIC_MAP_STYLE` from the build environment.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        Self::new(
            option_env!("MAPBOX_ACCESS_TOKEN"),
            option_env!("MUSIC_MAP_STYLE"),
        )
    }

    pub fn new(token: Option<&str>, style: Option<&str>) -> Result<Self, ConfigError> {
        let access_token = validate_token(token)?;
        let style_url = style
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_MAP_STYLE)
            .to_string();
        Ok(Self {
            access_token,
            style_url,
            container_id: MAP_CONTAINER_ID.to_string(),
        })
    }
}

fn validate_token(token: Option<&str>) -> Result<String, ConfigError> {
    let token = token.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(ConfigError::MissingToken);
    }
    if token.contains(TOKEN_PLACEHOLDER) {
        return Err(ConfigError::PlaceholderToken);
    }
    if token.len() < MIN_TOKEN_LEN {
        return Err(ConfigError::MalformedToken(token.len()));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_read_as_messages() {
        assert_eq!(
            ConfigError::MalformedToken(4).to_string(),
            "Mapbox access token looks invalid (4 characters)"
        );
        assert_eq!(
            ConfigError::MissingContainer("map".into()).to_string(),
            "Map container element (#map) not found"
        );
    }

    #[test]
    fn rejects_missing_and_placeholder_tokens() {
        assert_eq!(MapConfig::new(None, None), Err(ConfigError::MissingToken));
        assert_eq!(MapConfig::new(Some("   "), None), Err(ConfigError::MissingToken));
        assert_eq!(
            MapConfig::new(Some("pk.YOUR_MAPBOX_ACCESS_TOKEN"), None),
            Err(ConfigError::PlaceholderToken)
        );
        assert_eq!(
            MapConfig::new(Some("pk.abc"), None),
            Err(ConfigError::MalformedToken(6))
        );
    }

    #[test]
    fn falls_back_to_default_style() {
        let cfg = MapConfig::new(Some("pk.0123456789abcdef"), Some("")).unwrap();
        assert_eq!(cfg.style_url, DEFAULT_MAP_STYLE);
        assert_eq!(cfg.container_id, MAP_CONTAINER_ID);

        let cfg = MapConfig::new(Some("pk.0123456789abcdef"), Some("mapbox://styles/me/custom"))
            .unwrap();
        assert_eq!(cfg.style_url, "mapbox://styles/me/custom");
    }
}
