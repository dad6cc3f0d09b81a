//! Explicit test registry.
//!
//! Test groups and their methods are registered by hand (or loaded from a
//! JSON manifest) instead of being discovered by introspecting fixture types,
//! so static and generic fixture shapes need no special treatment.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use svmgold_core::{ExplorationMode, MethodDescriptor};

use crate::error::{HarnessError, Result};

/// A method plus the exploration modes it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredMethod {
    #[serde(flatten)]
    pub descriptor: MethodDescriptor,
    /// Empty means "run in every mode".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<ExplorationMode>,
}

impl RegisteredMethod {
    pub fn new(descriptor: MethodDescriptor) -> Self {
        Self {
            descriptor,
            modes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_modes(mut self, modes: impl IntoIterator<Item = ExplorationMode>) -> Self {
        self.modes = modes.into_iter().collect();
        self
    }

    /// Whether this method runs under `mode`.
    #[must_use]
    pub fn accepts(&self, mode: ExplorationMode) -> bool {
        self.modes.is_empty() || self.modes.contains(&mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestGroup {
    pub name: String,
    #[serde(default)]
    pub methods: Vec<RegisteredMethod>,
}

impl TestGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }
}

/// Ordered groups of ordered methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRegistry {
    groups: Vec<TestGroup>,
}

impl TestRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method` under `group`, creating the group on first use.
    ///
    /// A descriptor may appear only once across the registry: two entries
    /// would share a gold file.
    pub fn register(&mut self, group: &str, method: RegisteredMethod) -> Result<()> {
        if let Some(existing) = self.group_of(&method.descriptor) {
            return Err(HarnessError::DuplicateMethod {
                method: method.descriptor.signature_text(),
                first: existing.to_string(),
                second: group.to_string(),
            });
        }
        match self.groups.iter_mut().find(|g| g.name == group) {
            Some(g) => g.methods.push(method),
            None => {
                let mut g = TestGroup::new(group);
                g.methods.push(method);
                self.groups.push(g);
            }
        }
        Ok(())
    }

    /// Shorthand for registering a descriptor with explicit modes.
    pub fn register_method(
        &mut self,
        group: &str,
        descriptor: MethodDescriptor,
        modes: &[ExplorationMode],
    ) -> Result<()> {
        self.register(
            group,
            RegisteredMethod::new(descriptor).with_modes(modes.iter().copied()),
        )
    }

    pub fn groups(&self) -> &[TestGroup] {
        &self.groups
    }

    /// All methods in registration order with their group name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisteredMethod)> {
        self.groups
            .iter()
            .flat_map(|g| g.methods.iter().map(move |m| (g.name.as_str(), m)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.methods.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only groups whose name contains `filter` or methods whose
    /// qualified name contains it.
    #[must_use]
    pub fn filtered(&self, filter: &str) -> Self {
        let groups = self
            .groups
            .iter()
            .filter_map(|g| {
                let methods: Vec<RegisteredMethod> = if g.name.contains(filter) {
                    g.methods.clone()
                } else {
                    g.methods
                        .iter()
                        .filter(|m| m.descriptor.qualified_name().contains(filter))
                        .cloned()
                        .collect()
                };
                (!methods.is_empty()).then(|| TestGroup {
                    name: g.name.clone(),
                    methods,
                })
            })
            .collect();
        Self { groups }
    }

    /// Parse a JSON manifest:
    ///
    /// ```json
    /// {"groups": [{"name": "Lists", "methods": [
    ///   {"type": "Demo.Lists", "method": "Length", "parameters": ["Demo.ListNode"],
    ///    "return": "System.Int32", "modes": ["SmartUnrolling"]}
    /// ]}]}
    /// ```
    pub fn from_manifest_str(json: &str, origin: &Path) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json).map_err(|source| HarnessError::Manifest {
            path: origin.to_path_buf(),
            source,
        })?;
        let mut registry = Self::new();
        for group in parsed.groups {
            for method in group.methods {
                registry.register(&group.name, method)?;
            }
        }
        Ok(registry)
    }

    pub fn load_manifest(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_manifest_str(&json, path)
    }

    /// Serialize as a manifest.
    pub fn to_manifest_string(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    fn group_of(&self, descriptor: &MethodDescriptor) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.methods.iter().any(|m| &m.descriptor == descriptor))
            .map(|g| g.name.as_str())
    }
}
