//! Synthetic templates shared by the engine tests.

use std::ops::Range;

use image::{ImageFormat, Rgba, RgbaImage};

pub const LINE_ART: Rgba<u8> = Rgba([20, 30, 40, 255]);

/// A fully opaque canvas of line-art ink.
pub fn opaque_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, LINE_ART)
}

/// Makes a rectangle fully transparent.
pub fn punch(image: &mut RgbaImage, xs: Range<u32>, ys: Range<u32>) {
    for x in xs {
        for y in ys.clone() {
            image.put_pixel(x, y, Rgba([0, 0, 0, 0]));
        }
    }
}

pub fn png_bytes(image: &RgbaImage) -> anyhow::Result<Vec<u8>> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

/// Two disjoint transparent blobs; the left one is region 0.
pub fn two_blob_template() -> RgbaImage {
    let mut template = opaque_canvas(10, 6);
    punch(&mut template, 1..4, 1..5);
    punch(&mut template, 6..9, 1..5);
    template
}
