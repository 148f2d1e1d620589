use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};

use super::{ActiveImageRecord, ColorAssignment, ColorMap, ColorStore};
use crate::color::Rgb;
use crate::error::{HueError, Result};
use crate::events::now_utc_iso;

const CONTROL_KEY: &str = "__control";
const IMAGE_KEY_PREFIX: &str = "image/";
const COLOR_KEY_PREFIX: &str = "color/";

/// Color store backed by one pretty-printed JSON object on disk.
///
/// Keys mirror a composite (image, region) table key: `__control` holds the active image,
/// `image/<name>` registers a map, `color/<name>/<region>` holds one assignment. Every write
/// re-reads the file, replaces only the key it owns, and swaps the file in atomically while
/// holding an exclusive lock on `<file>.lock`, so other store instances and other processes
/// pointed at the same path keep their sibling entries.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");
        Self {
            lock_path: path.with_file_name(lock_name),
            path,
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<Map<String, Value>> {
        read_json_object(&self.path)
    }

    /// Read-modify-write under both the in-process lock and the sidecar file lock. `apply`
    /// returns false when nothing changed, in which case the file is left alone.
    fn update(&self, apply: impl FnOnce(&mut Map<String, Value>) -> Result<bool>) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| HueError::store("color store lock poisoned"))?;
        let _file_lock = self.lock_file()?;
        let mut on_disk = self.read()?;
        if apply(&mut on_disk)? {
            write_json_object(&self.path, &on_disk)?;
        }
        Ok(())
    }

    /// Blocks until this process holds the exclusive lock. Released when the handle drops.
    fn lock_file(&self) -> Result<File> {
        if let Some(parent) = self.lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(HueError::store)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(HueError::store)?;
        fs4::fs_std::FileExt::lock_exclusive(&file).map_err(HueError::store)?;
        Ok(file)
    }
}

fn image_key(image: &str) -> String {
    format!("{IMAGE_KEY_PREFIX}{image}")
}

fn color_key(image: &str, region: u32) -> String {
    format!("{COLOR_KEY_PREFIX}{image}/{region}")
}

fn to_value<T: serde::Serialize>(record: &T) -> Result<Value> {
    serde_json::to_value(record).map_err(HueError::store)
}

impl ColorStore for JsonFileStore {
    fn get_active_image(&self) -> Result<String> {
        let payload = self.read()?;
        let Some(control) = payload.get(CONTROL_KEY) else {
            return Err(HueError::NotConfigured);
        };
        let record: ActiveImageRecord =
            serde_json::from_value(control.clone()).map_err(HueError::store)?;
        Ok(record.current_image_name)
    }

    fn activate(&self, image: &str) -> Result<()> {
        let now = now_utc_iso();
        let control = to_value(&ActiveImageRecord {
            current_image_name: image.to_string(),
            updated_at: Some(now.clone()),
        })?;
        let mut registration = Map::new();
        registration.insert("image".to_string(), Value::String(image.to_string()));
        registration.insert("created_at".to_string(), Value::String(now));

        self.update(|payload| {
            payload.insert(CONTROL_KEY.to_string(), control);
            payload
                .entry(image_key(image))
                .or_insert(Value::Object(registration));
            Ok(true)
        })
    }

    fn set_color(&self, image: &str, region: u32, color: Rgb) -> Result<()> {
        let record = to_value(&ColorAssignment {
            image: image.to_string(),
            region,
            color,
            updated_at: Some(now_utc_iso()),
        })?;
        self.update(|payload| {
            payload.insert(color_key(image, region), record);
            Ok(true)
        })
    }

    fn get_color_map(&self, image: &str) -> Result<ColorMap> {
        let payload = self.read()?;
        let prefix = format!("{COLOR_KEY_PREFIX}{image}/");
        let mut map = ColorMap::new();
        for (key, value) in payload.iter() {
            if !key.starts_with(&prefix) {
                continue;
            }
            match serde_json::from_value::<ColorAssignment>(value.clone()) {
                Ok(record) if record.image == image => {
                    map.insert(record.region, record.color);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(key = %key, error = %err, "skipping unreadable color record");
                }
            }
        }
        Ok(map)
    }

    fn list_images(&self) -> Result<Vec<String>> {
        let payload = self.read()?;
        let mut images = BTreeSet::new();
        for (key, value) in payload.iter() {
            if let Some(image) = key.strip_prefix(IMAGE_KEY_PREFIX) {
                images.insert(image.to_string());
            } else if key.starts_with(COLOR_KEY_PREFIX) {
                if let Ok(record) = serde_json::from_value::<ColorAssignment>(value.clone()) {
                    images.insert(record.image);
                }
            }
        }
        Ok(images.into_iter().collect())
    }
}

/// A missing file is an empty store; a file that exists but does not parse is an error, so a
/// write can never silently replace it.
fn read_json_object(path: &Path) -> Result<Map<String, Value>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
        Err(err) => return Err(HueError::store(format!("{}: {err}", path.display()))),
    };
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    let parsed: Value = serde_json::from_str(&raw)
        .map_err(|err| HueError::store(format!("{}: {err}", path.display())))?;
    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(HueError::store(format!(
            "{}: expected a JSON object",
            path.display()
        ))),
    }
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(HueError::store)?;
    let raw = serde_json::to_string_pretty(&Value::Object(payload.clone()))
        .map_err(HueError::store)?;
    let mut staged = tempfile::NamedTempFile::new_in(&parent).map_err(HueError::store)?;
    staged.write_all(raw.as_bytes()).map_err(HueError::store)?;
    staged.as_file().sync_all().map_err(HueError::store)?;
    staged
        .persist(path)
        .map_err(|err| HueError::store(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::JsonFileStore;
    use crate::color::Rgb;
    use crate::error::HueError;
    use crate::store::ColorStore;

    #[test]
    fn writes_merge_with_other_instances() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("colors.json");
        let store_a = JsonFileStore::new(&path);
        let store_b = JsonFileStore::new(&path);

        store_a.activate("test1.png")?;
        store_a.set_color("test1.png", 0, Rgb(1, 0, 0))?;
        store_b.set_color("test1.png", 1, Rgb(0, 1, 0))?;
        store_a.set_color("test1.png", 2, Rgb(0, 0, 1))?;

        let reloaded = JsonFileStore::new(&path);
        let map = reloaded.get_color_map("test1.png")?;
        assert_eq!(map.len(), 3);
        assert_eq!(store_b.get_active_image()?, "test1.png");
        Ok(())
    }

    #[test]
    fn separate_instances_on_threads_keep_every_write() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("colors.json");

        let writers: Vec<_> = (0..2u32)
            .map(|writer| {
                let store = JsonFileStore::new(&path);
                std::thread::spawn(move || -> crate::Result<()> {
                    for step in 0..100u32 {
                        store.set_color("x.png", writer * 100 + step, Rgb(writer as u8, 0, 0))?;
                    }
                    Ok(())
                })
            })
            .collect();
        for writer in writers {
            writer
                .join()
                .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
        }

        let map = JsonFileStore::new(&path).get_color_map("x.png")?;
        assert_eq!(map.len(), 200);
        assert_eq!(map.get(&150), Some(&Rgb(1, 0, 0)));
        assert!(path.with_file_name("colors.json.lock").exists());
        Ok(())
    }

    #[test]
    fn reads_refresh_between_instances() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("colors.json");
        let store_a = JsonFileStore::new(&path);
        let store_b = JsonFileStore::new(&path);

        store_a.activate("one.png")?;
        assert_eq!(store_b.get_active_image()?, "one.png");
        store_b.activate("two.png")?;
        assert_eq!(store_a.get_active_image()?, "two.png");
        Ok(())
    }

    #[test]
    fn on_disk_layout_uses_hex_colors() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("state").join("colors.json");
        let store = JsonFileStore::new(&path);
        store.activate("test1.png")?;
        store.set_color("test1.png", 12, Rgb(0xff, 0x88, 0x00))?;

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(raw["__control"]["current_image_name"], "test1.png");
        assert_eq!(raw["color/test1.png/12"]["color"], "#FF8800");
        assert_eq!(raw["color/test1.png/12"]["region"], 12);
        assert!(raw.get("image/test1.png").is_some());
        Ok(())
    }

    #[test]
    fn corrupt_file_is_store_unavailable_and_untouched() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("colors.json");
        std::fs::write(&path, "{not json")?;
        let store = JsonFileStore::new(&path);

        assert!(matches!(
            store.get_active_image(),
            Err(HueError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.set_color("x.png", 0, Rgb(0, 0, 0)),
            Err(HueError::StoreUnavailable(_))
        ));
        assert_eq!(std::fs::read_to_string(&path)?, "{not json");
        Ok(())
    }

    #[test]
    fn similar_image_names_do_not_share_maps() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = JsonFileStore::new(temp.path().join("colors.json"));
        store.set_color("a", 1, Rgb(1, 1, 1))?;
        store.set_color("a/b", 2, Rgb(2, 2, 2))?;

        let map = store.get_color_map("a")?;
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&Rgb(1, 1, 1)));
        Ok(())
    }
}
