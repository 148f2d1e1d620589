use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{ColorMap, ColorStore};
use crate::color::Rgb;
use crate::error::{HueError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    active: Option<String>,
    maps: BTreeMap<String, ColorMap>,
}

/// In-process store. State lives as long as the value; used in tests and by embedders that
/// bring their own persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| HueError::store("memory store lock poisoned"))
    }
}

impl ColorStore for MemoryStore {
    fn get_active_image(&self) -> Result<String> {
        self.state()?.active.clone().ok_or(HueError::NotConfigured)
    }

    fn activate(&self, image: &str) -> Result<()> {
        let mut state = self.state()?;
        state.active = Some(image.to_string());
        state.maps.entry(image.to_string()).or_default();
        Ok(())
    }

    fn set_color(&self, image: &str, region: u32, color: Rgb) -> Result<()> {
        self.state()?
            .maps
            .entry(image.to_string())
            .or_default()
            .insert(region, color);
        Ok(())
    }

    fn get_color_map(&self, image: &str) -> Result<ColorMap> {
        Ok(self.state()?.maps.get(image).cloned().unwrap_or_default())
    }

    fn list_images(&self) -> Result<Vec<String>> {
        Ok(self.state()?.maps.keys().cloned().collect())
    }
}
