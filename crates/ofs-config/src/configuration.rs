use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Flat key/value configuration.
///
/// Keys are dotted paths (`fs.ofs.systems`). Values are kept as strings and
/// parsed on access, so a malformed value only fails the component that
/// reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    entries: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, flattening nested tables into dotted keys.
    ///
    /// `[fs.ofs] systems = "..."` and `"fs.ofs.systems" = "..."` produce the
    /// same entry. Arrays are joined with commas.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = content.parse()?;
        let mut conf = Self::new();
        flatten_into(&mut conf.entries, "", &toml::Value::Table(table));
        Ok(conf)
    }

    /// Load a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let conf = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), entries = conf.len(), "loaded configuration");
        Ok(conf)
    }

    /// Render as TOML with one quoted dotted key per entry.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        let table: toml::Table = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), toml::Value::String(v.clone())))
            .collect();
        Ok(toml::to_string(&table)?)
    }

    /// Write the configuration to `path` as TOML.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: &Configuration) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Value of a key that must be present and non-empty.
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get(key).map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(ConfigError::Missing(key.to_string())),
        }
    }

    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).trim().to_string()
    }

    pub fn get_u32(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        self.parse_or(key, default, "unsigned 32-bit integer")
    }

    /// A duration written as (fractional) seconds.
    pub fn get_duration(&self, key: &str, default_secs: f64) -> Result<Duration, ConfigError> {
        let secs: f64 = self.parse_or(key, default_secs, "seconds")?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: key.to_string(),
                message: format!("{} is not a valid non-negative duration", secs),
            });
        }
        Ok(Duration::from_secs_f64(secs))
    }

    /// Comma-separated list; blank items are dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Entries whose key starts with `prefix`, with the prefix stripped.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(move |(k, v)| (&k[prefix.len()..], v.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn parse_or<T: std::str::FromStr>(
        &self,
        key: &str,
        default: T,
        expected: &str,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::TypeMismatch {
                field: key.to_string(),
                expected: expected.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: &str, value: &toml::Value) {
    match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{}.{}", prefix, k)
                };
                flatten_into(out, &key, v);
            }
        }
        toml::Value::Array(items) => {
            let joined = items.iter().map(scalar_to_string).collect::<Vec<_>>().join(",");
            out.insert(prefix.to_string(), joined);
        }
        other => {
            out.insert(prefix.to_string(), scalar_to_string(other));
        }
    }
}

fn scalar_to_string(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}
