//! Persistent color assignments and the active image pointer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::Result;

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Region index → assigned color for one image. Missing keys are unset regions.
pub type ColorMap = BTreeMap<u32, Rgb>;

/// One stored assignment, as persisted by [`JsonFileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorAssignment {
    pub image: String,
    pub region: u32,
    pub color: Rgb,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The single record naming the image chat is currently coloring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveImageRecord {
    pub current_image_name: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Storage seam for the color model.
///
/// Every call is one independent, immediately durable operation. Implementations must be
/// safe to share between the chat loop and the render thread; concurrent `set_color` calls on
/// different regions never interfere, and calls on the same region resolve last-write-wins.
pub trait ColorStore: Send + Sync {
    /// Fails with [`crate::HueError::NotConfigured`] until an image has been activated.
    fn get_active_image(&self) -> Result<String>;

    /// Points the store at `image`, creating an empty map only if it has none yet.
    fn activate(&self, image: &str) -> Result<()>;

    /// Upserts one entry. The region count is unknown here, so nothing is bounds-checked.
    fn set_color(&self, image: &str, region: u32, color: Rgb) -> Result<()>;

    /// One snapshot of every assignment for `image`.
    fn get_color_map(&self, image: &str) -> Result<ColorMap>;

    /// Every image that has ever been activated, sorted by name.
    fn list_images(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::{ColorStore, JsonFileStore, MemoryStore};
    use crate::color::Rgb;
    use crate::error::HueError;

    fn stores(dir: &std::path::Path) -> Vec<(&'static str, Arc<dyn ColorStore>)> {
        let memory: Arc<dyn ColorStore> = Arc::new(MemoryStore::new());
        let json: Arc<dyn ColorStore> = Arc::new(JsonFileStore::new(dir.join("colors.json")));
        vec![("memory", memory), ("json", json)]
    }

    #[test]
    fn active_image_starts_unconfigured() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        for (name, store) in stores(temp.path()) {
            assert!(
                matches!(store.get_active_image(), Err(HueError::NotConfigured)),
                "{name}"
            );
        }
        Ok(())
    }

    #[test]
    fn set_color_round_trips() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        for (name, store) in stores(temp.path()) {
            store.activate("test1.png")?;
            store.set_color("test1.png", 3, Rgb(1, 2, 3))?;
            let map = store.get_color_map("test1.png")?;
            assert_eq!(map.get(&3), Some(&Rgb(1, 2, 3)), "{name}");
            assert_eq!(map.len(), 1, "{name}");
        }
        Ok(())
    }

    #[test]
    fn activation_is_idempotent() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        for (name, store) in stores(temp.path()) {
            store.activate("cat.png")?;
            store.set_color("cat.png", 0, Rgb(9, 9, 9))?;
            let before = store.get_color_map("cat.png")?;
            store.activate("cat.png")?;
            store.activate("cat.png")?;
            assert_eq!(store.get_color_map("cat.png")?, before, "{name}");
            assert_eq!(store.get_active_image()?, "cat.png", "{name}");
        }
        Ok(())
    }

    #[test]
    fn switching_images_keeps_old_map() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        for (name, store) in stores(temp.path()) {
            store.activate("oldtemplate.png")?;
            store.set_color("oldtemplate.png", 1, Rgb(10, 20, 30))?;
            store.activate("newtemplate.png")?;
            store.set_color("newtemplate.png", 1, Rgb(40, 50, 60))?;

            assert_eq!(store.get_active_image()?, "newtemplate.png", "{name}");
            assert_eq!(
                store.get_color_map("oldtemplate.png")?.get(&1),
                Some(&Rgb(10, 20, 30)),
                "{name}"
            );

            store.activate("oldtemplate.png")?;
            assert_eq!(
                store.get_color_map("oldtemplate.png")?.get(&1),
                Some(&Rgb(10, 20, 30)),
                "{name}"
            );
            assert_eq!(
                store.list_images()?,
                vec!["newtemplate.png".to_string(), "oldtemplate.png".to_string()],
                "{name}"
            );
        }
        Ok(())
    }

    #[test]
    fn same_region_is_last_write_wins() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        for (name, store) in stores(temp.path()) {
            store.set_color("a.png", 7, Rgb(1, 1, 1))?;
            store.set_color("a.png", 7, Rgb(2, 2, 2))?;
            assert_eq!(
                store.get_color_map("a.png")?.get(&7),
                Some(&Rgb(2, 2, 2)),
                "{name}"
            );
        }
        Ok(())
    }

    #[test]
    fn concurrent_writers_to_different_regions_all_land() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        for (name, store) in stores(temp.path()) {
            store.activate("busy.png")?;
            let handles: Vec<_> = (0..8u32)
                .map(|region| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        store.set_color("busy.png", region, Rgb(region as u8, 0, 0))
                    })
                })
                .collect();
            for handle in handles {
                handle
                    .join()
                    .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
            }
            let map = store.get_color_map("busy.png")?;
            assert_eq!(map.len(), 8, "{name}");
            for region in 0..8u32 {
                assert_eq!(map.get(&region), Some(&Rgb(region as u8, 0, 0)), "{name}");
            }
        }
        Ok(())
    }
}
