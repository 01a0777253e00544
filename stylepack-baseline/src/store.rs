use crate::load::LoadedBaseline;
use std::collections::BTreeMap;
use stylepack_types::{Category, ConfigValue, OsBuild};
use tracing::{debug, warn};

/// A historical baseline fix: `old_default` was once recorded as stock for
/// `key` but the real stock value is `new_default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub category: Category,
    pub key: String,
    pub old_default: ConfigValue,
    pub new_default: ConfigValue,
}

/// Stock values for one OS build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub os_build: OsBuild,
    pub revision: u32,
    pub values: BTreeMap<Category, BTreeMap<String, ConfigValue>>,
    pub corrections: Vec<Correction>,
}

impl Baseline {
    pub fn new(os_build: OsBuild) -> Self {
        Self {
            os_build,
            revision: 0,
            values: BTreeMap::new(),
            corrections: Vec::new(),
        }
    }

    pub fn with_value(mut self, category: Category, key: &str, value: ConfigValue) -> Self {
        self.values
            .entry(category)
            .or_default()
            .insert(key.to_string(), value);
        self
    }

    pub fn get(&self, category: Category, key: &str) -> Option<&ConfigValue> {
        self.values.get(&category).and_then(|m| m.get(key))
    }

    pub fn entries(&self, category: Category) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values
            .get(&category)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

/// Outcome of matching a live OS build against the store.
#[derive(Debug, Clone, Copy)]
pub enum Resolution<'a> {
    Exact(&'a Baseline),
    Nearest {
        requested: OsBuild,
        baseline: &'a Baseline,
    },
    Missing,
}

impl<'a> Resolution<'a> {
    pub fn baseline(&self) -> Option<&'a Baseline> {
        match *self {
            Resolution::Exact(b) | Resolution::Nearest { baseline: b, .. } => Some(b),
            Resolution::Missing => None,
        }
    }
}

/// Immutable table of baselines keyed by OS build, plus the correction list
/// gathered from every loaded baseline.
#[derive(Debug, Clone, Default)]
pub struct BaselineStore {
    builds: BTreeMap<OsBuild, Baseline>,
    corrections: Vec<Correction>,
}

impl BaselineStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// For a repeated build the highest revision wins.
    pub fn new(baselines: impl IntoIterator<Item = Baseline>) -> Self {
        let mut builds: BTreeMap<OsBuild, Baseline> = BTreeMap::new();
        let mut corrections = Vec::new();
        for b in baselines {
            corrections.extend(b.corrections.iter().cloned());
            match builds.get(&b.os_build) {
                Some(existing) if existing.revision >= b.revision => {
                    debug!(os_build = %b.os_build, revision = b.revision, "older baseline revision ignored");
                }
                _ => {
                    builds.insert(b.os_build, b);
                }
            }
        }
        corrections.sort_by(|a, b| (a.category, &a.key).cmp(&(b.category, &b.key)));
        corrections.dedup();
        Self {
            builds,
            corrections,
        }
    }

    /// Builds a store from loader output, skipping files that failed to load.
    pub fn from_loaded(loaded: Vec<LoadedBaseline>) -> Self {
        let mut ok = Vec::new();
        for l in loaded {
            match l.baseline {
                Ok(b) => ok.push(b),
                Err(e) => warn!(path = %l.path, error = %e, "skipping unreadable baseline"),
            }
        }
        Self::new(ok)
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty()
    }

    pub fn builds(&self) -> impl Iterator<Item = OsBuild> + '_ {
        self.builds.keys().copied()
    }

    /// Exact match, else the build with the smallest numeric distance.
    /// Ties go to the lower build.
    pub fn resolve(&self, os_build: OsBuild) -> Resolution<'_> {
        if let Some(b) = self.builds.get(&os_build) {
            return Resolution::Exact(b);
        }
        // BTreeMap iterates ascending, and min_by_key keeps the first minimum.
        match self.builds.values().min_by_key(|b| b.os_build.distance(os_build)) {
            Some(baseline) => Resolution::Nearest {
                requested: os_build,
                baseline,
            },
            None => Resolution::Missing,
        }
    }

    pub fn lookup(&self, os_build: OsBuild, category: Category, key: &str) -> Option<&ConfigValue> {
        self.resolve(os_build).baseline()?.get(category, key)
    }

    pub fn corrections(&self) -> &[Correction] {
        &self.corrections
    }

    pub fn corrections_for<'a>(
        &'a self,
        category: Category,
        key: &'a str,
    ) -> impl Iterator<Item = &'a Correction> + 'a {
        self.corrections
            .iter()
            .filter(move |c| c.category == category && c.key == key)
    }
}
