use crate::value::{Category, ChangeType, ConfigValue};
use serde::{Deserialize, Serialize};

/// One difference between two packages.
///
/// `change_type` reads from the left package's point of view: `added` means
/// only the right side has the item, `removed` means only the left side has
/// it, `modified` means both have it with different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDelta {
    pub category: Category,
    pub key: String,
    pub change_type: ChangeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<ConfigValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<ConfigValue>,
}
