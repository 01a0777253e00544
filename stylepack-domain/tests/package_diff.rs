mod common;

use common::{StaticCapability, clock};
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use stylepack_domain::{CapabilityRegistry, diff_scans};
use stylepack_types::diff::ItemDelta;
use stylepack_types::{Category, ChangeType, ConfigValue, OsBuild, ScanResult, ScannedItem, schema};

fn scan(items: Vec<(Category, &str, ConfigValue)>) -> ScanResult {
    let items: Vec<ScannedItem> = items
        .into_iter()
        .map(|(category, key, value)| ScannedItem {
            key: key.to_string(),
            category,
            current_value: Some(value),
            default_value: None,
            change_type: ChangeType::Added,
            associated_files: BTreeSet::new(),
            source: None,
            metadata: BTreeMap::new(),
        })
        .collect();
    ScanResult {
        schema: schema::STYLEPACK_SCAN_V1.to_string(),
        scan_id: "s".into(),
        os_build: OsBuild(1),
        created_at: clock(),
        summary: ScanResult::count_by_category(&items),
        items,
        errors: vec![],
        warnings: vec![],
    }
}

#[test]
fn pairwise_diff_reports_changes_from_left_side() {
    let left = scan(vec![
        (Category::Theme, "theme.darkMode", ConfigValue::Bool(false)),
        (Category::Cursor, "cursor.arrow", ConfigValue::String(r"C:\Cursors\A.cur".into())),
        (Category::Fonts, "fonts.old", ConfigValue::String("x".into())),
    ]);
    let right = scan(vec![
        (Category::Theme, "theme.darkMode", ConfigValue::Bool(true)),
        (Category::Cursor, "cursor.arrow", ConfigValue::String("c:/cursors/a.cur".into())),
        (Category::Terminal, "terminal.font", ConfigValue::String("Cascadia".into())),
    ]);

    let mut cursor = StaticCapability::new("cursor", Category::Cursor, vec![]);
    cursor.fold_paths = true;
    let registry = CapabilityRegistry::new().with(cursor);

    let deltas = diff_scans(&left, &right, &registry);
    assert_eq!(
        deltas,
        vec![
            ItemDelta {
                category: Category::Fonts,
                key: "fonts.old".into(),
                change_type: ChangeType::Removed,
                left: Some(ConfigValue::String("x".into())),
                right: None,
            },
            ItemDelta {
                category: Category::Terminal,
                key: "terminal.font".into(),
                change_type: ChangeType::Added,
                left: None,
                right: Some(ConfigValue::String("Cascadia".into())),
            },
            ItemDelta {
                category: Category::Theme,
                key: "theme.darkMode".into(),
                change_type: ChangeType::Modified,
                left: Some(ConfigValue::Bool(false)),
                right: Some(ConfigValue::Bool(true)),
            },
        ]
    );
}

#[test]
fn identical_scans_have_no_delta() {
    let s = scan(vec![(Category::Theme, "theme.darkMode", ConfigValue::Bool(true))]);
    assert!(diff_scans(&s, &s, &CapabilityRegistry::new()).is_empty());
}
