//! Coordinate validation and small geometry helpers.

use crate::config::{DEFAULT_PADDING_PX, MOBILE_BREAKPOINT_PX, PANEL_GUTTER_PX};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Leading decimal number of a string; trailing text is ignored.
static LEADING_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap());

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// GeoJSON ordering: `[lng, lat]`.
    pub fn to_array(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// Parse a coordinate that may arrive as a JSON number or a numeric string.
///
/// Strings are read by their leading number, so `"12.5abc"` is 12.5.
/// Returns `None` for null, text without a leading number, NaN and
/// infinities.
pub fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => LEADING_NUMBER_REGEX
            .find(s.trim())?
            .as_str()
            .parse::<f64>()
            .ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

pub fn is_valid_coordinate(value: Option<&Value>) -> bool {
    parse_coordinate(value).is_some()
}

/// Build a position only when both halves validate.
pub fn position_from(lat: Option<&Value>, lon: Option<&Value>) -> Option<LngLat> {
    Some(LngLat::new(parse_coordinate(lon)?, parse_coordinate(lat)?))
}

/// Shift `lng` by whole turns until it lies within 180° of `reference`.
///
/// Keeps popups and camera targets on the copy of the world the user
/// actually clicked on.
pub fn wrap_longitude_near(lng: f64, reference: f64) -> f64 {
    let mut lng = lng;
    while (reference - lng).abs() > 180.0 {
        lng += if reference > lng { 360.0 } else { -360.0 };
    }
    lng
}

/// Axis-aligned bounds in longitude/latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLatBounds {
    pub south_west: LngLat,
    pub north_east: LngLat,
}

impl LngLatBounds {
    pub fn from_points<I: IntoIterator<Item = LngLat>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            south_west: first,
            north_east: first,
        };
        for p in iter {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: LngLat) {
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
    }

    /// `[[west, south], [east, north]]`, the shape `fitBounds` expects.
    pub fn to_array(self) -> [[f64; 2]; 2] {
        [self.south_west.to_array(), self.north_east.to_array()]
    }
}

/// Screen padding applied when fitting the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Padding {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Sizes of the page around the map that influence padding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PanelLayout {
    pub panel_width: f64,
    pub viewport_width: f64,
}

/// Compute fit padding that keeps points clear of the sidebar.
///
/// On narrow (mobile) viewports the sidebar stacks below the map, so only
/// the default padding applies. An open popup claims extra room top/right.
pub fn compute_padding(layout: PanelLayout, popup_open: bool) -> Padding {
    let is_mobile = layout.viewport_width <= MOBILE_BREAKPOINT_PX;
    let left = if is_mobile {
        DEFAULT_PADDING_PX
    } else {
        DEFAULT_PADDING_PX.max(layout.panel_width + PANEL_GUTTER_PX)
    };
    let popup_extra = if popup_open { 30.0 } else { 0.0 };
    Padding {
        top: DEFAULT_PADDING_PX + popup_extra,
        bottom: DEFAULT_PADDING_PX + 30.0,
        left,
        right: DEFAULT_PADDING_PX + popup_extra,
    }
}
