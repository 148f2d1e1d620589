use std::io::Cursor;
use std::sync::Arc;

use huebot_contracts::events::EventLog;
use huebot_contracts::store::{ColorMap, ColorStore};
use huebot_contracts::{HueError, Result};
use image::{ImageFormat, Rgba, RgbImage, RgbaImage};

use crate::blob::BlobStore;
use crate::receipt::RenderReceipt;
use crate::segment::{decode_template, segment};

/// A flattened, fully opaque render of one template.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub image_id: String,
    pub image: RgbaImage,
    pub region_count: usize,
    pub colored_regions: usize,
    /// Stored indices that do not name a region of this template.
    pub skipped_regions: Vec<u32>,
}

impl RenderedImage {
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.image
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|err| HueError::blob(&self.image_id, format!("png encode failed: {err}")))?;
        Ok(bytes.into_inner())
    }
}

/// Recomputes regions for `template`, paints every in-range assignment from `colors`, and lays
/// the template back over the result.
pub fn render_template(image_id: &str, template: &RgbaImage, colors: &ColorMap) -> RenderedImage {
    let mut segmentation = segment(template);
    let region_count = segmentation.region_count();
    let mut colored_regions = 0;
    let mut skipped_regions = Vec::new();

    for (&region, &color) in colors {
        match segmentation.fill_region(region, color) {
            Some(_) => colored_regions += 1,
            None => {
                tracing::warn!(
                    image = image_id,
                    region,
                    region_count,
                    "skipping color for region outside template"
                );
                skipped_regions.push(region);
            }
        }
    }

    RenderedImage {
        image_id: image_id.to_string(),
        image: composite(&segmentation.into_surface(), template),
        region_count,
        colored_regions,
        skipped_regions,
    }
}

/// Template over surface, using the template alpha as the mask. Output alpha is always 255.
fn composite(surface: &RgbImage, template: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(template.width(), template.height(), |x, y| {
        let fg = template.get_pixel(x, y);
        let bg = surface.get_pixel(x, y);
        let alpha = u32::from(fg[3]);
        let blend = |front: u8, back: u8| {
            ((u32::from(front) * alpha + u32::from(back) * (255 - alpha) + 127) / 255) as u8
        };
        Rgba([
            blend(fg[0], bg[0]),
            blend(fg[1], bg[1]),
            blend(fg[2], bg[2]),
            255,
        ])
    })
}

/// Ties the color store and the template blobs together. Cheap to clone and safe to run on a
/// scheduler thread while commands are being applied.
#[derive(Clone)]
pub struct Renderer {
    store: Arc<dyn ColorStore>,
    blobs: Arc<dyn BlobStore>,
    events: Option<EventLog>,
}

impl Renderer {
    pub fn new(store: Arc<dyn ColorStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Renders the active image from one snapshot of its color map.
    pub fn render(&self) -> Result<RenderedImage> {
        let image_id = self.store.get_active_image()?;
        self.render_image(&image_id)
    }

    /// Renders a specific image, active or not.
    pub fn render_image(&self, image_id: &str) -> Result<RenderedImage> {
        let colors = self.store.get_color_map(image_id)?;
        let bytes = self.blobs.read_template(image_id)?;
        let template = decode_template(image_id, &bytes)?;
        Ok(render_template(image_id, &template, &colors))
    }

    /// Renders the active image and publishes the PNG plus its receipt under the same id.
    pub fn render_to_sink(&self) -> Result<RenderReceipt> {
        let rendered = self.render()?;
        let encoded = rendered.encode_png()?;
        let receipt = RenderReceipt::build(&rendered, &encoded);
        self.blobs.write_output(&rendered.image_id, &encoded)?;

        let sidecar = serde_json::to_vec_pretty(&receipt)
            .map_err(|err| HueError::blob(&rendered.image_id, err))?;
        self.blobs
            .write_output(&RenderReceipt::sidecar_id(&rendered.image_id), &sidecar)?;

        tracing::info!(
            image = %receipt.image,
            regions = receipt.region_count,
            colored = receipt.colored_regions,
            "render published"
        );
        if let Some(events) = &self.events {
            events.record_quiet(receipt.to_event());
        }
        Ok(receipt)
    }
}
