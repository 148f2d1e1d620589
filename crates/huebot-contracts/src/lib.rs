pub mod chat;
pub mod color;
pub mod error;
pub mod events;
pub mod store;

pub use color::Rgb;
pub use error::{HueError, Result};
