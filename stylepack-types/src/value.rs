use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration domains tracked by stylepack.
///
/// Variants are declared in name order, so the derived `Ord` matches the
/// ordering of [`Category::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cursor,
    Editor,
    Fonts,
    Terminal,
    Theme,
    Wallpaper,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Cursor,
        Category::Editor,
        Category::Fonts,
        Category::Terminal,
        Category::Theme,
        Category::Wallpaper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cursor => "cursor",
            Category::Editor => "editor",
            Category::Fonts => "fonts",
            Category::Terminal => "terminal",
            Category::Theme => "theme",
            Category::Wallpaper => "wallpaper",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected one of: cursor, editor, fonts, terminal, theme, wallpaper)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A configuration value as observed on a machine or recorded in a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::String(_) => "string",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Bytes(_) => "bytes",
            ConfigValue::List(_) => "list",
        }
    }

    /// String form of a scalar value. `None` for bytes and lists.
    pub fn scalar_form(&self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Integer(i) => Some(i.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            ConfigValue::Bytes(_) | ConfigValue::List(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Converts a plain JSON value (as found in baseline files) into a
    /// `ConfigValue`. Objects and nulls have no scalar form and yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<ConfigValue> {
        use serde_json::Value;
        match value {
            Value::String(s) => Some(ConfigValue::String(s.clone())),
            Value::Bool(b) => Some(ConfigValue::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::String(n.to_string()),
            }),
            Value::Array(items) => Some(ConfigValue::List(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Integer(i) => write!(f, "{i}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            ConfigValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// Classification of a live value against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Default,
    Modified,
    Added,
    Removed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Default => "default",
            ChangeType::Modified => "modified",
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
        }
    }

    /// Anything other than `default` counts as a user customization.
    pub fn is_customized(&self) -> bool {
        !matches!(self, ChangeType::Default)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_order_matches_name_order() {
        let mut by_name = Category::ALL.to_vec();
        by_name.sort_by_key(|c| c.as_str());
        assert_eq!(by_name, Category::ALL.to_vec());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Theme".parse::<Category>().unwrap(), Category::Theme);
        assert!("sounds".parse::<Category>().is_err());
    }

    #[test]
    fn config_value_serializes_adjacently_tagged() {
        let v = serde_json::to_value(ConfigValue::Bool(true)).unwrap();
        assert_eq!(v, json!({"kind": "bool", "value": true}));
    }

    #[test]
    fn from_json_maps_plain_values() {
        assert_eq!(
            ConfigValue::from_json(&json!(42)),
            Some(ConfigValue::Integer(42))
        );
        assert_eq!(
            ConfigValue::from_json(&json!(["a", 1])),
            Some(ConfigValue::List(vec!["a".into(), "1".into()]))
        );
        assert_eq!(ConfigValue::from_json(&json!({"x": 1})), None);
        assert_eq!(ConfigValue::from_json(&json!(null)), None);
    }

    #[test]
    fn bytes_display_as_hex() {
        assert_eq!(ConfigValue::Bytes(vec![0x0a, 0xff]).to_string(), "0aff");
    }
}
