use crate::store::{Baseline, Correction};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::glob;
use serde::Deserialize;
use std::collections::BTreeMap;
use stylepack_types::{Category, ConfigValue, OsBuild};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LoadedBaseline {
    pub path: Utf8PathBuf,
    pub baseline: Result<Baseline, BaselineLoadError>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BaselineLoadError {
    #[error("io error: {message}")]
    Io { message: String },

    #[error("json parse error: {message}")]
    Json { message: String },

    #[error("invalid baseline: {message}")]
    Invalid { message: String },
}

/// On-disk shape. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct BaselineFile {
    #[serde(default)]
    schema: Option<String>,
    os_build: OsBuild,
    #[serde(default)]
    revision: u32,
    #[serde(default)]
    defaults: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    corrections: Vec<CorrectionFile>,
}

#[derive(Debug, Deserialize)]
struct CorrectionFile {
    category: Category,
    key: String,
    old_default: serde_json::Value,
    new_default: serde_json::Value,
}

/// Loads every `*.json` file directly under `dir`, sorted by path.
pub fn load_baselines(dir: &Utf8Path) -> anyhow::Result<Vec<LoadedBaseline>> {
    let pattern = dir.join("*.json");
    let pattern_str = pattern.as_str();

    debug!(pattern = %pattern_str, "scanning for baseline files");

    let mut out = Vec::new();
    for entry in glob(pattern_str).context("glob baselines/*.json")? {
        let path = entry
            .map_err(|e| anyhow::anyhow!("glob error: {e}"))?
            .to_string_lossy()
            .to_string();
        let path = Utf8PathBuf::from(path);

        let baseline = match fs::read_to_string(&path) {
            Ok(s) => parse_baseline(&s),
            Err(e) => Err(BaselineLoadError::Io {
                message: e.to_string(),
            }),
        };

        out.push(LoadedBaseline { path, baseline });
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

pub fn parse_baseline(text: &str) -> Result<Baseline, BaselineLoadError> {
    let file: BaselineFile = serde_json::from_str(text).map_err(|e| BaselineLoadError::Json {
        message: e.to_string(),
    })?;

    if let Some(schema) = &file.schema
        && schema != stylepack_types::schema::STYLEPACK_BASELINE_V1
    {
        return Err(BaselineLoadError::Invalid {
            message: format!("unsupported schema '{schema}'"),
        });
    }

    let mut values: BTreeMap<Category, BTreeMap<String, ConfigValue>> = BTreeMap::new();
    for (name, section) in &file.defaults {
        let Ok(category) = name.parse::<Category>() else {
            debug!(section = %name, "ignoring baseline section for unknown category");
            continue;
        };
        let out = values.entry(category).or_default();
        match section {
            serde_json::Value::Object(map) => {
                for (k, v) in map {
                    flatten_into(out, &qualify(category, k), v);
                }
            }
            other => {
                return Err(BaselineLoadError::Invalid {
                    message: format!(
                        "section '{name}' must be an object, found {}",
                        json_kind(other)
                    ),
                });
            }
        }
    }

    let mut corrections = Vec::with_capacity(file.corrections.len());
    for c in file.corrections {
        let (Some(old_default), Some(new_default)) = (
            ConfigValue::from_json(&c.old_default),
            ConfigValue::from_json(&c.new_default),
        ) else {
            return Err(BaselineLoadError::Invalid {
                message: format!("correction for '{}' has a non-scalar value", c.key),
            });
        };
        corrections.push(Correction {
            category: c.category,
            key: qualify(c.category, &c.key),
            old_default,
            new_default,
        });
    }

    Ok(Baseline {
        os_build: file.os_build,
        revision: file.revision,
        values,
        corrections,
    })
}

/// Prefixes `key` with `<category>.` unless it already carries it.
fn qualify(category: Category, key: &str) -> String {
    let prefix = category.as_str();
    match key.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('.') => key.to_string(),
        _ => format!("{prefix}.{key}"),
    }
}

fn flatten_into(out: &mut BTreeMap<String, ConfigValue>, key: &str, value: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                flatten_into(out, &format!("{key}.{k}"), v);
            }
        }
        other => {
            if let Some(v) = ConfigValue::from_json(other) {
                out.insert(key.to_string(), v);
            }
        }
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
