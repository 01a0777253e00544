mod common;

use common::{StaticCapability, clock};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeSet;
use stylepack_baseline::{Baseline, BaselineStore, Correction};
use stylepack_domain::{CancelToken, CapabilityRegistry, ScanContext, ScanOrchestrator, ScanRequest};
use stylepack_types::item::ScanWarning;
use stylepack_types::{Category, ChangeType, ConfigValue, OsBuild, RawObservation};

const BUILD: OsBuild = OsBuild(22631);

fn ctx() -> ScanContext {
    ScanContext {
        os_build: BUILD,
        created_at: clock(),
        cancel: CancelToken::new(),
    }
}

fn baseline() -> BaselineStore {
    let mut b = Baseline::new(BUILD)
        .with_value(Category::Theme, "theme.darkMode", ConfigValue::Bool(false))
        .with_value(Category::Theme, "theme.accentColor", ConfigValue::String("#0078D4".into()))
        .with_value(Category::Cursor, "cursor.scheme", ConfigValue::String("Windows Default".into()))
        .with_value(Category::Wallpaper, "wallpaper.style", ConfigValue::Integer(10));
    b.corrections.push(Correction {
        category: Category::Cursor,
        key: "cursor.scheme".into(),
        old_default: ConfigValue::String("Windows Aero".into()),
        new_default: ConfigValue::String("Windows Default".into()),
    });
    BaselineStore::new([b])
}

fn registry() -> CapabilityRegistry {
    CapabilityRegistry::new()
        .with(StaticCapability::new(
            "theme",
            Category::Theme,
            vec![
                RawObservation::new("theme.darkMode", ConfigValue::Bool(true)),
                RawObservation::new("theme.accentColor", ConfigValue::String("#0078D4".into())),
            ],
        ))
        .with(StaticCapability::new(
            "terminal",
            Category::Terminal,
            vec![RawObservation::new("terminal.ohMyPosh.installed", ConfigValue::Bool(true))],
        ))
        .with(StaticCapability::new(
            "cursor",
            Category::Cursor,
            vec![RawObservation::new(
                "cursor.scheme",
                ConfigValue::String("Windows Aero".into()),
            )],
        ))
}

#[test]
fn classifies_against_baseline() {
    let store = baseline();
    let reg = registry();
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&ctx(), &ScanRequest::default())
        .unwrap();

    let change = |c, k| result.find(c, k).map(|i| i.change_type);
    assert_eq!(change(Category::Theme, "theme.darkMode"), Some(ChangeType::Modified));
    assert_eq!(
        change(Category::Terminal, "terminal.ohMyPosh.installed"),
        Some(ChangeType::Added)
    );
    assert_eq!(change(Category::Theme, "theme.accentColor"), Some(ChangeType::Default));
    // Historical baseline value is not reported as a user change.
    assert_eq!(change(Category::Cursor, "cursor.scheme"), Some(ChangeType::Default));

    let dark = result.find(Category::Theme, "theme.darkMode").unwrap();
    assert_eq!(dark.default_value, Some(ConfigValue::Bool(false)));
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn items_are_sorted_by_category_then_key() {
    let store = baseline();
    let reg = registry();
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&ctx(), &ScanRequest::default())
        .unwrap();
    let order: Vec<(Category, &str)> = result.items.iter().map(|i| i.sort_key()).collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
    assert_eq!(order.first(), Some(&(Category::Cursor, "cursor.scheme")));
}

#[test]
fn failing_capability_is_isolated() {
    let store = baseline();
    let reg = registry().with(StaticCapability::failing(
        "wallpaper",
        Category::Wallpaper,
        "registry hive unavailable",
    ));
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&ctx(), &ScanRequest::default())
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].category, Category::Wallpaper);
    assert_eq!(result.errors[0].capability_id, "wallpaper");
    assert!(result.errors[0].message.contains("registry hive unavailable"));
    assert!(result.find(Category::Theme, "theme.darkMode").is_some());
    assert!(result.items.iter().all(|i| i.category != Category::Wallpaper));
}

#[test]
fn modified_only_filters_after_classification() {
    let store = baseline();
    let reg = registry();
    let req = ScanRequest {
        categories: BTreeSet::new(),
        modified_only: true,
    };
    let result = ScanOrchestrator::new(&reg, &store).scan(&ctx(), &req).unwrap();
    assert!(result.items.iter().all(|i| i.change_type != ChangeType::Default));
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.modified_count(), 2);
}

#[test]
fn requested_categories_limit_capabilities() {
    let store = baseline();
    let reg = registry();
    let req = ScanRequest {
        categories: BTreeSet::from([Category::Terminal]),
        modified_only: false,
    };
    let result = ScanOrchestrator::new(&reg, &store).scan(&ctx(), &req).unwrap();
    assert_eq!(result.summary.keys().copied().collect::<Vec<_>>(), vec![Category::Terminal]);
}

#[test]
fn missing_baseline_degrades_to_added() {
    let store = BaselineStore::empty();
    let reg = registry();
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&ctx(), &ScanRequest::default())
        .unwrap();
    assert!(result.items.iter().all(|i| i.change_type == ChangeType::Added));
    assert_eq!(
        result.warnings,
        vec![ScanWarning::BaselineMissing { os_build: BUILD }]
    );
}

#[test]
fn nearest_build_is_used_with_warning() {
    let store = baseline();
    let reg = registry();
    let mut c = ctx();
    c.os_build = OsBuild(22635);
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&c, &ScanRequest::default())
        .unwrap();
    assert_eq!(
        result.find(Category::Theme, "theme.darkMode").map(|i| i.change_type),
        Some(ChangeType::Modified)
    );
    assert_eq!(
        result.warnings,
        vec![ScanWarning::BaselineFallback {
            requested: OsBuild(22635),
            used: BUILD,
        }]
    );
}

#[test]
fn absent_live_value_with_baseline_is_removed() {
    let store = baseline();
    let mut absent = RawObservation::new("wallpaper.style", ConfigValue::Integer(0));
    absent.value = None;
    let mut unknown = RawObservation::new("wallpaper.unknown", ConfigValue::Integer(0));
    unknown.value = None;
    let reg = CapabilityRegistry::new().with(StaticCapability::new(
        "wallpaper",
        Category::Wallpaper,
        vec![absent, unknown],
    ));
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&ctx(), &ScanRequest::default())
        .unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].change_type, ChangeType::Removed);
    assert_eq!(result.items[0].default_value, Some(ConfigValue::Integer(10)));
}

#[test]
fn duplicate_keys_keep_first_capability() {
    let store = baseline();
    let reg = CapabilityRegistry::new()
        .with(StaticCapability::new(
            "theme_a",
            Category::Theme,
            vec![RawObservation::new("theme.darkMode", ConfigValue::Bool(true))],
        ))
        .with(StaticCapability::new(
            "theme_b",
            Category::Theme,
            vec![RawObservation::new("theme.darkMode", ConfigValue::Bool(false))],
        ));
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&ctx(), &ScanRequest::default())
        .unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].current_value, Some(ConfigValue::Bool(true)));
    assert!(matches!(
        &result.warnings[..],
        [ScanWarning::DuplicateItem { capability_id, .. }] if capability_id == "theme_b"
    ));
}

#[test]
fn metadata_travels_with_items() {
    let store = baseline();
    let reg = CapabilityRegistry::new().with(StaticCapability::new(
        "fonts",
        Category::Fonts,
        vec![
            RawObservation::new("fonts.substitutes.MS Shell Dlg", ConfigValue::String("Tahoma".into()))
                .with_metadata("readonly", json!(true)),
        ],
    ));
    let result = ScanOrchestrator::new(&reg, &store)
        .scan(&ctx(), &ScanRequest::default())
        .unwrap();
    assert!(result.items[0].is_readonly());
}

#[test]
fn repeated_scans_serialize_identically() {
    let store = baseline();
    let reg = registry();
    let orch = ScanOrchestrator::new(&reg, &store);
    let a = serde_json::to_string_pretty(&orch.scan(&ctx(), &ScanRequest::default()).unwrap()).unwrap();
    let b = serde_json::to_string_pretty(&orch.scan(&ctx(), &ScanRequest::default()).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn cancelled_scan_stops() {
    let store = baseline();
    let reg = registry();
    let c = ctx();
    c.cancel.cancel();
    assert!(ScanOrchestrator::new(&reg, &store)
        .scan(&c, &ScanRequest::default())
        .is_err());
}
