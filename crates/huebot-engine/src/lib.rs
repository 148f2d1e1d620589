pub mod blob;
pub mod interpreter;
pub mod receipt;
pub mod render;
pub mod segment;

pub use blob::{BlobStore, DirBlobStore};
pub use interpreter::{CommandInterpreter, Outcome, RegionCheck};
pub use receipt::RenderReceipt;
pub use render::{render_template, RenderedImage, Renderer};
pub use segment::{decode_template, segment, Region, Segmentation};

#[cfg(test)]
pub(crate) mod fixtures;
