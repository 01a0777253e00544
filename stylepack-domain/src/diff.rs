use crate::capability::CapabilityRegistry;
use crate::classify::classify;
use std::collections::{BTreeMap, BTreeSet};
use stylepack_baseline::Correction;
use stylepack_package::Package;
use stylepack_types::diff::ItemDelta;
use stylepack_types::{Category, ChangeType, ScanResult, ScannedItem};

/// Compares two packages item by item.
pub fn diff_packages(left: &Package, right: &Package, registry: &CapabilityRegistry) -> Vec<ItemDelta> {
    diff_scans(left.scan(), right.scan(), registry)
}

/// Pairwise classification with `left` in the role of the baseline. Items
/// that compare equal are omitted; the output is ordered by
/// `(category, key)`.
pub fn diff_scans(left: &ScanResult, right: &ScanResult, registry: &CapabilityRegistry) -> Vec<ItemDelta> {
    let index = |scan: &ScanResult| -> BTreeMap<(Category, String), ScannedItem> {
        scan.items
            .iter()
            .map(|i| ((i.category, i.key.clone()), i.clone()))
            .collect()
    };
    let l = index(left);
    let r = index(right);
    let keys: BTreeSet<&(Category, String)> = l.keys().chain(r.keys()).collect();

    let mut out = Vec::new();
    for key in keys {
        let left_value = l.get(key).and_then(|i| i.current_value.clone());
        let right_value = r.get(key).and_then(|i| i.current_value.clone());

        let normalizer = registry.normalizer(key.0);
        let normalize = |s: &str| match normalizer {
            Some(cap) => cap.normalize(s),
            None => s.to_string(),
        };
        let change_type = classify(
            right_value.as_ref(),
            left_value.as_ref(),
            std::iter::empty::<&Correction>(),
            &normalize,
        );
        if change_type == ChangeType::Default {
            continue;
        }
        out.push(ItemDelta {
            category: key.0,
            key: key.1.clone(),
            change_type,
            left: left_value,
            right: right_value,
        });
    }
    out
}
