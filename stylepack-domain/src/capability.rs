use std::collections::{BTreeMap, BTreeSet};
use stylepack_types::{Category, RawObservation, ScannedItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInfo {
    pub id: String,
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WriteScope {
    #[default]
    User,
    Machine,
}

/// What writing one item involves on this machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WriteTraits {
    pub requires_elevation: bool,
    pub scope: WriteScope,
    pub requires_restart: bool,
}

/// One pluggable unit of scan/apply logic for a configuration domain.
///
/// `scan` must be read-only. Capabilities may run concurrently during a
/// scan, so implementations hold no mutable state shared with others.
pub trait ScannerCapability: Send + Sync {
    fn identify(&self) -> CapabilityInfo;

    fn scan(&self) -> anyhow::Result<Vec<RawObservation>>;

    /// Writes one item. `Ok(false)` means the capability declined or could
    /// not complete the write without raising.
    fn apply(&self, item: &ScannedItem) -> anyhow::Result<bool>;

    /// Canonical text form used when comparing values of this category.
    fn normalize(&self, text: &str) -> String {
        text.to_string()
    }

    fn supports_item(&self, item: &ScannedItem) -> bool {
        let _ = item;
        true
    }

    /// Read-only metadata query used for risk assignment.
    fn write_traits(&self, item: &ScannedItem) -> WriteTraits {
        let _ = item;
        WriteTraits::default()
    }
}

/// Registered capabilities, grouped by category in registration order.
#[derive(Default)]
pub struct CapabilityRegistry {
    by_category: BTreeMap<Category, Vec<Box<dyn ScannerCapability>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Box<dyn ScannerCapability>) {
        let category = capability.identify().category;
        self.by_category.entry(category).or_default().push(capability);
    }

    pub fn with(mut self, capability: impl ScannerCapability + 'static) -> Self {
        self.register(Box::new(capability));
        self
    }

    pub fn categories(&self) -> BTreeSet<Category> {
        self.by_category.keys().copied().collect()
    }

    pub fn is_registered(&self, category: Category) -> bool {
        self.by_category
            .get(&category)
            .is_some_and(|caps| !caps.is_empty())
    }

    pub fn capabilities(&self, category: Category) -> &[Box<dyn ScannerCapability>] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Capabilities for `requested` (all when empty), ordered by category
    /// then registration.
    pub fn select(&self, requested: &BTreeSet<Category>) -> Vec<&dyn ScannerCapability> {
        self.by_category
            .iter()
            .filter(|(c, _)| requested.is_empty() || requested.contains(c))
            .flat_map(|(_, caps)| caps.iter().map(|c| c.as_ref()))
            .collect()
    }

    /// First capability of the item's category that accepts it.
    pub fn route(&self, item: &ScannedItem) -> Option<&dyn ScannerCapability> {
        self.capabilities(item.category)
            .iter()
            .find(|c| c.supports_item(item))
            .map(|c| c.as_ref())
    }

    /// Normalizer for a category: its first capability, if any.
    pub fn normalizer(&self, category: Category) -> Option<&dyn ScannerCapability> {
        self.capabilities(category).first().map(|c| c.as_ref())
    }

    pub fn find(&self, capability_id: &str) -> Option<&dyn ScannerCapability> {
        self.by_category
            .values()
            .flatten()
            .find(|c| c.identify().id == capability_id)
            .map(|c| c.as_ref())
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self
            .by_category
            .values()
            .flatten()
            .map(|c| c.identify().id)
            .collect();
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &ids)
            .finish()
    }
}
