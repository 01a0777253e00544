use stylepack_baseline::Correction;
use stylepack_types::{ChangeType, ConfigValue};

/// Classifies a live value against its baseline value.
///
/// Corrections are consulted before equality: when the baseline now holds a
/// correction's `new_default` and the live value is its `old_default`, the
/// value is the stock value of an earlier baseline revision, not a user
/// change.
pub fn classify<'c>(
    live: Option<&ConfigValue>,
    baseline: Option<&ConfigValue>,
    corrections: impl IntoIterator<Item = &'c Correction>,
    normalize: &dyn Fn(&str) -> String,
) -> ChangeType {
    match (live, baseline) {
        (Some(_), None) => ChangeType::Added,
        (None, Some(_)) => ChangeType::Removed,
        (None, None) => ChangeType::Default,
        (Some(live), Some(base)) => {
            let corrected = corrections.into_iter().any(|c| {
                values_equal(base, &c.new_default, normalize)
                    && values_equal(live, &c.old_default, normalize)
            });
            if corrected || values_equal(live, base, normalize) {
                ChangeType::Default
            } else {
                ChangeType::Modified
            }
        }
    }
}

/// Value-kind-aware equality.
///
/// Bytes compare exactly (or against a hex string), lists compare
/// element-wise after normalization, scalars compare by normalized string
/// form, so `Integer(1)` equals `String("1")`.
pub fn values_equal(a: &ConfigValue, b: &ConfigValue, normalize: &dyn Fn(&str) -> String) -> bool {
    use ConfigValue::*;
    match (a, b) {
        (Bytes(x), Bytes(y)) => x == y,
        (Bytes(bytes), String(s)) | (String(s), Bytes(bytes)) => {
            let hex = bytes_hex(bytes);
            let s = s.trim();
            let s = s.strip_prefix("0x").unwrap_or(s);
            hex.eq_ignore_ascii_case(s)
        }
        (Bytes(_), _) | (_, Bytes(_)) => false,
        (List(x), List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| normalize(l) == normalize(r))
        }
        (List(_), _) | (_, List(_)) => false,
        _ => match (a.scalar_form(), b.scalar_form()) {
            (Some(l), Some(r)) => normalize(&l) == normalize(&r),
            _ => false,
        },
    }
}

fn bytes_hex(bytes: &[u8]) -> std::string::String {
    ConfigValue::Bytes(bytes.to_vec()).to_string()
}

/// Path normalizer: case-folds, unifies separators, strips trailing
/// separators.
pub fn fold_path(text: &str) -> String {
    let unified = text.trim().replace('\\', "/").to_lowercase();
    let trimmed = unified.trim_end_matches('/');
    if trimmed.is_empty() && !unified.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
