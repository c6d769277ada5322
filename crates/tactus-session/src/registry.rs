//! Registry of known simulation kinds.
//!
//! Maps a kind name to a factory that builds a fresh force field for each
//! session. Populated at configuration time and read-only afterwards; the
//! supervisor owns the only instance.

use std::collections::HashMap;

use tactus_fields::{ForceField, SceneField, SphereField, TrackingField, WallField};

/// Builds a fresh force field instance for a new session.
pub type FieldFactory = Box<dyn Fn() -> Box<dyn ForceField> + Send + Sync>;

/// Name → force-field factory map.
#[derive(Default)]
pub struct SimulationRegistry {
    entries: HashMap<String, FieldFactory>,
}

impl SimulationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in simulation kinds.
    #[must_use]
    pub fn standard() -> Self {
        let mut entries: HashMap<String, FieldFactory> = HashMap::new();
        entries.insert(
            "sphere".to_string(),
            Box::new(|| Box::new(SphereField::default())),
        );
        entries.insert(
            "wall".to_string(),
            Box::new(|| Box::new(WallField::default())),
        );
        entries.insert(
            "tracking".to_string(),
            Box::new(|| Box::new(TrackingField::default())),
        );
        entries.insert(
            "scene".to_string(),
            Box::new(|| Box::new(SceneField::default())),
        );
        Self { entries }
    }

    /// Replace the registry contents wholesale.
    pub fn register(&mut self, entries: HashMap<String, FieldFactory>) {
        self.entries = entries;
    }

    /// Names of the registered kinds, in no particular order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Whether a kind is registered.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Instantiate a fresh field for a kind, if registered.
    #[must_use]
    pub fn resolve(&self, kind: &str) -> Option<Box<dyn ForceField>> {
        self.entries.get(kind).map(|factory| factory())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tactus_core::Vec3;

    #[test]
    fn test_standard_kinds() {
        let registry = SimulationRegistry::standard();
        let mut kinds = registry.list();
        kinds.sort();
        assert_eq!(kinds, ["scene", "sphere", "tracking", "wall"]);
    }

    #[test]
    fn test_resolve_builds_fresh_instances() {
        let registry = SimulationRegistry::standard();
        let mut first = registry.resolve("wall").unwrap();
        let mut second = registry.resolve("wall").unwrap();

        let probe = Vec3::new(0.0, 0.0, -0.01);
        assert_eq!(first.update(probe), second.update(probe));
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_register_replaces_wholesale() {
        let mut registry = SimulationRegistry::standard();

        let mut entries: HashMap<String, FieldFactory> = HashMap::new();
        entries.insert(
            "wall-only".to_string(),
            Box::new(|| Box::new(WallField::default())),
        );
        registry.register(entries);

        assert_eq!(registry.list(), ["wall-only"]);
        assert!(!registry.contains("sphere"));
    }
}
