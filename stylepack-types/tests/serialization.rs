use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use stylepack_types::apply::{ApplyPhase, RestorePointStatus, StepOutcome};
use stylepack_types::item::{ScanWarning, ScannedItem};
use stylepack_types::manifest::{AssetEntry, Manifest, PACKAGE_FORMAT_VERSION};
use stylepack_types::plan::{PlanAction, PlanSummary, PlannedAction, RiskLevel};
use stylepack_types::{Category, ChangeType, ConfigValue, OsBuild, ScanResult, schema};

fn item(category: Category, key: &str, change: ChangeType) -> ScannedItem {
    ScannedItem {
        key: key.to_string(),
        category,
        current_value: Some(ConfigValue::String("x".into())),
        default_value: None,
        change_type: change,
        associated_files: BTreeSet::new(),
        source: None,
        metadata: BTreeMap::new(),
    }
}

#[test]
fn enums_serialize_snake_case() {
    assert_eq!(
        serde_json::to_value(StepOutcome::NotAttempted).expect("serialize"),
        json!("not_attempted")
    );
    assert_eq!(
        serde_json::to_value(RiskLevel::High).expect("serialize"),
        json!("high")
    );
    assert_eq!(
        serde_json::to_value(ChangeType::Removed).expect("serialize"),
        json!("removed")
    );
    assert_eq!(
        serde_json::to_value(ApplyPhase::Executing { step: 2 }).expect("serialize"),
        json!({"state": "executing", "step": 2})
    );
}

#[test]
fn restore_point_status_is_tagged() {
    let v = serde_json::to_value(RestorePointStatus::Unavailable {
        reason: "service disabled".into(),
    })
    .expect("serialize");
    assert_eq!(v, json!({"status": "unavailable", "reason": "service disabled"}));
}

#[test]
fn scan_result_summary_uses_category_names_as_keys() {
    let items = vec![
        item(Category::Fonts, "fonts.a", ChangeType::Added),
        item(Category::Fonts, "fonts.b", ChangeType::Default),
        item(Category::Theme, "theme.darkMode", ChangeType::Modified),
    ];
    let result = ScanResult {
        schema: schema::STYLEPACK_SCAN_V1.to_string(),
        scan_id: "id".into(),
        os_build: OsBuild(22631),
        created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        summary: ScanResult::count_by_category(&items),
        items,
        errors: vec![],
        warnings: vec![ScanWarning::BaselineMissing {
            os_build: OsBuild(22631),
        }],
    };

    let v = serde_json::to_value(&result).expect("serialize");
    assert_eq!(v["summary"], json!({"fonts": 2, "theme": 1}));
    assert_eq!(v["os_build"], json!(22631));
    assert!(v.get("errors").is_none());
    assert_eq!(v["warnings"][0]["kind"], json!("baseline_missing"));
    assert_eq!(result.modified_count(), 2);

    let back: ScanResult = serde_json::from_value(v).expect("deserialize");
    assert_eq!(back, result);
    assert!(back.find(Category::Theme, "theme.darkMode").is_some());
    assert!(back.find(Category::Theme, "theme.missing").is_none());
}

#[test]
fn manifest_omits_hash_for_unstored_assets() {
    let manifest = Manifest {
        schema: schema::STYLEPACK_MANIFEST_V1.to_string(),
        format_version: PACKAGE_FORMAT_VERSION,
        package_id: "p".into(),
        scan_id: "s".into(),
        os_build: OsBuild(19045),
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        include_defaults: false,
        include_binary_assets: false,
        items_by_category: BTreeMap::from([(Category::Wallpaper, 1)]),
        assets: vec![AssetEntry {
            category: Category::Wallpaper,
            original_path: "/home/u/Pictures/sky.jpg".into(),
            rel_path: None,
            sha256: None,
            size_bytes: None,
        }],
    };

    let v = serde_json::to_value(&manifest).expect("serialize");
    assert_eq!(
        v["assets"][0],
        json!({"category": "wallpaper", "original_path": "/home/u/Pictures/sky.jpg"})
    );
    assert_eq!(manifest.item_count(), 1);
    assert_eq!(manifest.stored_assets().count(), 0);
}

#[test]
fn plan_summary_counts_only_eligible_risk() {
    let action = |action, risk| PlannedAction {
        action,
        target_key: "k".into(),
        category: Category::Theme,
        risk_level: risk,
        reason: String::new(),
        reason_token: None,
        capability_id: None,
        item: item(Category::Theme, "k", ChangeType::Modified),
    };
    let actions = vec![
        action(PlanAction::Set, RiskLevel::Low),
        action(PlanAction::Remove, RiskLevel::High),
        action(PlanAction::Skip, RiskLevel::High),
    ];
    let s = PlanSummary::from_actions(&actions);
    assert_eq!(
        s,
        PlanSummary {
            total: 3,
            eligible: 2,
            skipped: 1,
            low: 1,
            medium: 0,
            high: 1,
        }
    );
}
