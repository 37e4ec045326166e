//! Circular avatar icons registered with the map renderer.
//!
//! An avatar is fetched once, scaled onto a square canvas, clipped to a
//! disc and ringed with a white border before registration. Registered ids
//! are immutable: a second build for the same id is a no-op success.

use crate::api::ImageFetcher;
use crate::config::{ICON_BORDER_WIDTH_PX, ICON_SIZE_PX, PLACEHOLDER_ICON_ID};
use crate::engine::{MapEngine, MapError};
use image::imageops::FilterType;
use image::{DynamicImage, Rgba, RgbaImage};
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashSet;
use thiserror::Error;

const BORDER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLACEHOLDER_FILL: Rgba<u8> = Rgba([42, 47, 58, 255]);

/// Straight RGBA pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct IconRaster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl IconRaster {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.into_raw(),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IconError {
    #[error("Image load failed for {url}: {reason}")]
    ImageLoadFailed { url: String, reason: String },
    #[error("Could not decode image {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("Could not register icon: {0}")]
    Register(#[from] MapError),
}

/// Ids already handed to the renderer.
#[derive(Debug, Default)]
pub struct IconRegistry {
    registered: HashSet<String>,
}

impl IconRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registered.contains(id)
    }

    pub fn has_placeholder(&self) -> bool {
        self.contains(PLACEHOLDER_ICON_ID)
    }

    /// Returns `false` when the id was already present.
    pub fn mark_registered(&mut self, id: &str) -> bool {
        self.registered.insert(id.to_string())
    }
}

/// Scale `source` to `size`², clip it to a disc and draw a `border`-wide
/// white ring on the rim. The outer edge is anti-aliased.
pub fn rasterize_circular(source: &DynamicImage, size: u32, border: u32) -> IconRaster {
    let scaled = source
        .resize_exact(size, size, FilterType::Triangle)
        .into_rgba8();
    let center = size as f64 / 2.0;
    let radius = center;
    let ring_inner = radius - border as f64;

    let mut out = RgbaImage::new(size, size);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - center;
        let dy = y as f64 + 0.5 - center;
        let dist = (dx * dx + dy * dy).sqrt();
        let coverage = (radius - dist + 0.5).clamp(0.0, 1.0);
        if coverage <= 0.0 {
            continue;
        }
        let base = if border > 0 && dist >= ring_inner {
            BORDER_COLOR
        } else {
            *scaled.get_pixel(x, y)
        };
        let alpha = (base[3] as f64 * coverage).round() as u8;
        *px = Rgba([base[0], base[1], base[2], alpha]);
    }
    IconRaster::from_rgba(out)
}

/// The reserved fallback icon: a dark disc with the standard ring.
pub fn placeholder_raster() -> IconRaster {
    let fill = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, PLACEHOLDER_FILL));
    rasterize_circular(&fill, ICON_SIZE_PX, ICON_BORDER_WIDTH_PX)
}

/// Register the placeholder icon. Idempotent.
pub fn register_placeholder<M: MapEngine>(
    map: &M,
    registry: &RefCell<IconRegistry>,
) -> Result<(), IconError> {
    if registry.borrow().has_placeholder() || map.has_image(PLACEHOLDER_ICON_ID) {
        registry.borrow_mut().mark_registered(PLACEHOLDER_ICON_ID);
        return Ok(());
    }
    map.add_image(PLACEHOLDER_ICON_ID, &placeholder_raster())?;
    registry.borrow_mut().mark_registered(PLACEHOLDER_ICON_ID);
    debug!("Circular placeholder image registered");
    Ok(())
}

/// Fetch `url`, build its circular icon and register it as `icon_id`.
///
/// Returns the icon id on success. Concurrent builds of the same id end up
/// with a single registration: the registry is re-checked after the fetch.
pub async fn build_icon<M, F>(
    map: &M,
    fetcher: &F,
    registry: &RefCell<IconRegistry>,
    url: &str,
    icon_id: &str,
) -> Result<String, IconError>
where
    M: MapEngine,
    F: ImageFetcher,
{
    if registry.borrow().contains(icon_id) || map.has_image(icon_id) {
        return Ok(icon_id.to_string());
    }

    let bytes = fetcher
        .fetch_image(url)
        .await
        .map_err(|e| IconError::ImageLoadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| IconError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let raster = rasterize_circular(&decoded, ICON_SIZE_PX, ICON_BORDER_WIDTH_PX);

    if registry.borrow().contains(icon_id) || map.has_image(icon_id) {
        debug!("Icon {} was registered while {} loaded", icon_id, url);
        return Ok(icon_id.to_string());
    }
    if !map.is_style_loaded() {
        warn!("Map not ready when trying to add image {}", icon_id);
        return Err(IconError::Register(MapError::StyleNotLoaded));
    }
    map.add_image(icon_id, &raster)?;
    registry.borrow_mut().mark_registered(icon_id);
    Ok(icon_id.to_string())
}
