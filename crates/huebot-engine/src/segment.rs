//! Region discovery over a template's transparency mask.
//!
//! A region is a maximal 4-connected set of pixels whose alpha is below 255. Pixels are
//! scanned column-major (`x` outer, `y` inner) and regions are numbered in the order their
//! first pixel is reached. Stored color assignments are keyed by that number, so changing the
//! scan order or the connectivity remaps every saved index.

use std::collections::VecDeque;

use huebot_contracts::{HueError, Result};
use image::{Rgb, RgbImage, RgbaImage};

const FULLY_OPAQUE: u8 = 255;
const SURFACE_FOREGROUND: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub index: u32,
    /// First pixel visited inside the region; the render fill starts here.
    pub seed: (u32, u32),
    pub pixel_count: u64,
}

/// Result of one `segment` call: the ordered regions plus the working drawing surface.
///
/// The label buffer doubles as the visited set during discovery and is owned by this value
/// alone, so nothing leaks between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    width: u32,
    height: u32,
    regions: Vec<Region>,
    labels: Vec<Option<u32>>,
    surface: RgbImage,
}

impl Segmentation {
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region(&self, index: u32) -> Option<&Region> {
        self.regions.get(index as usize)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Region under pixel `(x, y)`, or `None` for opaque foreground and out-of-bounds pixels.
    pub fn region_at(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.labels[pixel_offset(self.width, x, y)]
    }

    /// Opaque foreground is black, every region starts out in the unset fill.
    pub fn surface(&self) -> &RgbImage {
        &self.surface
    }

    pub fn into_surface(self) -> RgbImage {
        self.surface
    }

    /// Flood-fills region `index` on the surface, starting at its seed. Returns the number of
    /// pixels painted, or `None` when no such region exists.
    pub fn fill_region(&mut self, index: u32, color: huebot_contracts::Rgb) -> Option<u64> {
        let region = *self.region(index)?;
        let paint = Rgb(color.to_array());
        let labels = &self.labels;
        let surface = &mut self.surface;
        let width = self.width;
        let mut painted = vec![false; labels.len()];
        let count = flood_fill(self.width, self.height, region.seed, |offset| {
            if painted[offset] || labels[offset] != Some(index) {
                return false;
            }
            painted[offset] = true;
            let x = (offset % width as usize) as u32;
            let y = (offset / width as usize) as u32;
            surface.put_pixel(x, y, paint);
            true
        });
        Some(count)
    }
}

/// Decodes template bytes in any format the `image` crate understands.
pub fn decode_template(image_id: &str, bytes: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory(bytes)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|err| HueError::segmentation(image_id, err))
}

pub fn segment(template: &RgbaImage) -> Segmentation {
    let (width, height) = template.dimensions();
    let marker: Vec<bool> = template
        .pixels()
        .map(|pixel| pixel[3] < FULLY_OPAQUE)
        .collect();
    let mut labels: Vec<Option<u32>> = vec![None; marker.len()];
    let mut regions: Vec<Region> = Vec::new();

    for x in 0..width {
        for y in 0..height {
            let offset = pixel_offset(width, x, y);
            if !marker[offset] || labels[offset].is_some() {
                continue;
            }
            let index = u32::try_from(regions.len()).unwrap_or(u32::MAX);
            let pixel_count = flood_fill(width, height, (x, y), |candidate| {
                if !marker[candidate] || labels[candidate].is_some() {
                    return false;
                }
                labels[candidate] = Some(index);
                true
            });
            regions.push(Region {
                index,
                seed: (x, y),
                pixel_count,
            });
        }
    }

    let unset = Rgb(huebot_contracts::Rgb::UNSET_FILL.to_array());
    let surface = RgbImage::from_fn(width, height, |x, y| {
        if labels[pixel_offset(width, x, y)].is_some() {
            unset
        } else {
            SURFACE_FOREGROUND
        }
    });

    tracing::debug!(width, height, regions = regions.len(), "segmented template");
    Segmentation {
        width,
        height,
        regions,
        labels,
        surface,
    }
}

fn pixel_offset(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// Breadth-first 4-connected fill bounded by the image extents. `claim` decides whether a
/// pixel joins the fill and must mark it so it is never claimed twice.
fn flood_fill(
    width: u32,
    height: u32,
    seed: (u32, u32),
    mut claim: impl FnMut(usize) -> bool,
) -> u64 {
    if seed.0 >= width || seed.1 >= height || !claim(pixel_offset(width, seed.0, seed.1)) {
        return 0;
    }
    let mut queue = VecDeque::new();
    queue.push_back(seed);
    let mut count = 0u64;

    while let Some((x, y)) = queue.pop_front() {
        count += 1;
        let neighbors = [
            (x.wrapping_sub(1), y),
            (x.saturating_add(1), y),
            (x, y.wrapping_sub(1)),
            (x, y.saturating_add(1)),
        ];
        for (nx, ny) in neighbors {
            if nx >= width || ny >= height || (nx, ny) == (x, y) {
                continue;
            }
            if claim(pixel_offset(width, nx, ny)) {
                queue.push_back((nx, ny));
            }
        }
    }
    count
}
