use chrono::{SecondsFormat, Utc};
use huebot_contracts::events::Event;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::render::RenderedImage;

/// JSON sidecar written next to every rendered image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderReceipt {
    pub render_id: String,
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub region_count: usize,
    pub colored_regions: usize,
    pub skipped_regions: Vec<u32>,
    pub output_sha256: String,
    pub rendered_at: String,
}

impl RenderReceipt {
    pub fn build(rendered: &RenderedImage, encoded: &[u8]) -> Self {
        let (width, height) = rendered.image.dimensions();
        Self {
            render_id: Uuid::new_v4().to_string(),
            image: rendered.image_id.clone(),
            width,
            height,
            region_count: rendered.region_count,
            colored_regions: rendered.colored_regions,
            skipped_regions: rendered.skipped_regions.clone(),
            output_sha256: sha256_hex(encoded),
            rendered_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }

    /// Sidecar id for an output id: `cat.png` → `cat.png.json`.
    pub fn sidecar_id(output: &str) -> String {
        format!("{output}.json")
    }

    pub fn to_event(&self) -> Event {
        Event::RenderFinished {
            render_id: self.render_id.clone(),
            image: self.image.clone(),
            region_count: self.region_count,
            colored_regions: self.colored_regions,
            skipped_regions: self.skipped_regions.clone(),
            output_sha256: self.output_sha256.clone(),
        }
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use huebot_contracts::events::Event;
    use image::RgbaImage;

    use super::{sha256_hex, RenderReceipt};
    use crate::render::RenderedImage;

    #[test]
    fn receipt_summarises_render() -> anyhow::Result<()> {
        let rendered = RenderedImage {
            image_id: "cat.png".to_string(),
            image: RgbaImage::new(4, 2),
            region_count: 3,
            colored_regions: 2,
            skipped_regions: vec![9],
        };
        let receipt = RenderReceipt::build(&rendered, b"abc");
        assert_eq!((receipt.width, receipt.height), (4, 2));
        assert_eq!(receipt.skipped_regions, vec![9]);
        assert_eq!(
            receipt.output_sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(RenderReceipt::sidecar_id("cat.png"), "cat.png.json");

        assert!(matches!(
            receipt.to_event(),
            Event::RenderFinished { ref image, region_count: 3, .. } if image == "cat.png"
        ));
        let decoded: RenderReceipt = serde_json::from_value(serde_json::to_value(&receipt)?)?;
        assert_eq!(decoded, receipt);
        assert_eq!(sha256_hex(b"").len(), 64);
        Ok(())
    }
}
