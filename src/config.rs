//! Configuration sources and the merged configuration map.
//!
//! Sources produce flat string key/value pairs; nested structures flatten
//! into `:`-delimited keys. Sources merge in registration order with later
//! sources winning. Within a single source a duplicate key is logged and
//! ignored, keeping the first value.

use std::collections::HashMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ConfigResult;

/// Key delimiter for nested configuration values.
pub const KEY_DELIMITER: &str = ":";

/// A provider of flat configuration key/value pairs.
pub trait ConfigurationSource: Send + Sync {
    /// Loads the source's key/value pairs, in declaration order.
    fn load(&self) -> ConfigResult<Vec<(String, String)>>;
}

/// Collects configuration sources before the host builds.
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a source. Later sources override earlier ones key by key.
    pub fn add_source(&mut self, source: impl ConfigurationSource + 'static) -> &mut Self {
        self.sources.push(Box::new(source));
        self
    }

    /// Loads every source and merges the results.
    pub fn build(&self) -> ConfigResult<Configuration> {
        let mut values = HashMap::new();
        for source in &self.sources {
            let mut seen_in_source: HashMap<&str, ()> = HashMap::new();
            let pairs = source.load()?;
            for (key, value) in &pairs {
                if seen_in_source.contains_key(key.as_str()) {
                    log::warn!("Duplicate configuration key '{}' ignored", key);
                    continue;
                }
                values.insert(key.clone(), value.clone());
                seen_in_source.insert(key.as_str(), ());
            }
        }
        Ok(Configuration { values })
    }
}

/// The merged, read-only configuration map.
///
/// # Examples
///
/// ```
/// use scene_host::{Configuration, ConfigurationBuilder, ConfigurationSource};
/// use scene_host::ConfigResult;
///
/// struct Inline(Vec<(String, String)>);
/// impl ConfigurationSource for Inline {
///     fn load(&self) -> ConfigResult<Vec<(String, String)>> {
///         Ok(self.0.clone())
///     }
/// }
///
/// let mut builder = ConfigurationBuilder::new();
/// builder.add_source(Inline(vec![("Audio:Volume".into(), "0.5".into())]));
/// builder.add_source(Inline(vec![("Audio:Volume".into(), "0.8".into())]));
///
/// let config = builder.build().unwrap();
/// assert_eq!(config.get("Audio:Volume"), Some("0.8"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    values: HashMap<String, String>,
}

impl Configuration {
    /// Looks up a value by its flattened key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// All keys present in the merged configuration.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn flatten_value(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                let child = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}{}{}", prefix, KEY_DELIMITER, key)
                };
                flatten_value(&child, value, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let child = format!("{}{}{}", prefix, KEY_DELIMITER, index);
                flatten_value(&child, value, out);
            }
        }
        serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        serde_json::Value::Null => out.push((prefix.to_string(), String::new())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

/// JSON-backed settings document at `<base>/Config/<name>.json`.
///
/// On first load the file does not exist yet; `T::default()` is serialized
/// and written so users find an editable file after the first run. As a
/// [`ConfigurationSource`] the document flattens into delimited keys.
///
/// # Examples
///
/// ```no_run
/// use scene_host::JsonSettings;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Default)]
/// struct AppSettings {
///     tick_rate: u32,
/// }
///
/// let settings = JsonSettings::<AppSettings>::new(".", "appsettings");
/// let loaded = settings.load_or_create().unwrap();
/// assert_eq!(loaded.tick_rate, 0);
/// ```
pub struct JsonSettings<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSettings<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Creates a settings document named `<name>.json` under `<base>/Config/`.
    pub fn new(base: impl AsRef<Path>, name: &str) -> Self {
        let path = base
            .as_ref()
            .join("Config")
            .join(format!("{}.json", name));
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// The full path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document, writing defaults first if the file is missing.
    pub fn load_or_create(&self) -> ConfigResult<T> {
        if !self.path.exists() {
            let defaults = T::default();
            self.save(&defaults)?;
            return Ok(defaults);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Serializes and writes the document, creating parent directories.
    pub fn save(&self, value: &T) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(value)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

impl<T> ConfigurationSource for JsonSettings<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    fn load(&self) -> ConfigResult<Vec<(String, String)>> {
        let document = self.load_or_create()?;
        let value = serde_json::to_value(&document)?;
        let mut out = Vec::new();
        flatten_value("", &value, &mut out);
        Ok(out)
    }
}

/// A structured settings object that enumerates its configuration entries
/// explicitly.
///
/// The entries are flattened key/value pairs, declared in code rather than
/// discovered by scanning fields.
pub trait SettingsAsset: Send + Sync {
    fn configuration_entries(&self) -> Vec<(String, String)>;
}

/// Configuration source backed by a [`SettingsAsset`].
pub struct AssetConfigurationSource<T> {
    asset: Arc<T>,
}

impl<T: SettingsAsset> AssetConfigurationSource<T> {
    pub fn new(asset: Arc<T>) -> Self {
        Self { asset }
    }
}

impl<T: SettingsAsset> ConfigurationSource for AssetConfigurationSource<T> {
    fn load(&self) -> ConfigResult<Vec<(String, String)>> {
        Ok(self.asset.configuration_entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Default, PartialEq, Debug)]
    struct Audio {
        volume: f64,
        muted: bool,
    }

    #[derive(Serialize, Deserialize, Default, PartialEq, Debug)]
    struct Settings {
        audio: Audio,
        title: String,
    }

    #[test]
    fn first_run_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonSettings::<Settings>::new(dir.path(), "appsettings");

        assert!(!settings.path().exists());
        let loaded = settings.load_or_create().unwrap();
        assert_eq!(loaded, Settings::default());
        assert!(settings.path().exists());
    }

    #[test]
    fn saved_values_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonSettings::<Settings>::new(dir.path(), "appsettings");

        settings
            .save(&Settings {
                audio: Audio {
                    volume: 0.7,
                    muted: true,
                },
                title: "demo".to_string(),
            })
            .unwrap();

        let loaded = settings.load_or_create().unwrap();
        assert_eq!(loaded.audio.volume, 0.7);
        assert!(loaded.audio.muted);
    }

    #[test]
    fn json_source_flattens_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let settings = JsonSettings::<Settings>::new(dir.path(), "appsettings");
        settings
            .save(&Settings {
                audio: Audio {
                    volume: 0.25,
                    muted: false,
                },
                title: "demo".to_string(),
            })
            .unwrap();

        let mut builder = ConfigurationBuilder::new();
        builder.add_source(settings);
        let config = builder.build().unwrap();

        assert_eq!(config.get("audio:volume"), Some("0.25"));
        assert_eq!(config.get("audio:muted"), Some("false"));
        assert_eq!(config.get("title"), Some("demo"));
    }

    struct Doubled;
    impl SettingsAsset for Doubled {
        fn configuration_entries(&self) -> Vec<(String, String)> {
            vec![
                ("Net:Port".into(), "7777".into()),
                ("Net:Port".into(), "8888".into()),
            ]
        }
    }

    #[test]
    fn duplicate_keys_within_source_keep_first() {
        let mut builder = ConfigurationBuilder::new();
        builder.add_source(AssetConfigurationSource::new(Arc::new(Doubled)));
        let config = builder.build().unwrap();
        assert_eq!(config.get("Net:Port"), Some("7777"));
    }

    struct Inline(Vec<(String, String)>);
    impl ConfigurationSource for Inline {
        fn load(&self) -> ConfigResult<Vec<(String, String)>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn later_source_wins() {
        let mut builder = ConfigurationBuilder::new();
        builder.add_source(Inline(vec![("A".into(), "1".into())]));
        builder.add_source(Inline(vec![("A".into(), "2".into())]));
        let config = builder.build().unwrap();
        assert_eq!(config.get("A"), Some("2"));
    }
}
