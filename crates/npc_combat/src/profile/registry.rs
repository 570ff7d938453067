//! Static archetype registry, looked up by kind at spawn.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use bevy::prelude::Resource;
use once_cell::sync::Lazy;
use serde::Deserialize;

use super::{ArchetypeKind, ArchetypeProfile, ProfileError};

/// Built-in table, shared process-wide.
pub static BUILTIN_ARCHETYPES: Lazy<ArchetypeRegistry> = Lazy::new(ArchetypeRegistry::builtin);

#[derive(Resource, Debug, Clone)]
pub struct ArchetypeRegistry {
    profiles: BTreeMap<ArchetypeKind, Arc<ArchetypeProfile>>,
}

#[derive(Debug, Deserialize)]
struct ArchetypeTable {
    #[serde(rename = "archetype", default)]
    archetypes: Vec<ArchetypeProfile>,
}

impl Default for ArchetypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ArchetypeRegistry {
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in ArchetypeKind::ALL {
            registry.insert_or_fallback(ArchetypeProfile::builtin(kind));
        }
        registry
    }

    /// Builtin table overridden by the `[[archetype]]` entries of a TOML document.
    ///
    /// Parse errors are returned; an entry that parses but fails validation is
    /// replaced by the conservative profile for its kind.
    pub fn from_toml_str(source: &str) -> Result<Self, ProfileError> {
        let table: ArchetypeTable = toml::from_str(source)?;
        let mut registry = Self::builtin();
        for profile in table.archetypes {
            registry.insert_or_fallback(profile);
        }
        Ok(registry)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Strict insert: rejects invalid profiles.
    pub fn insert(&mut self, profile: ArchetypeProfile) -> Result<(), ProfileError> {
        profile.validate()?;
        self.profiles.insert(profile.kind, Arc::new(profile));
        Ok(())
    }

    /// Insert, substituting the conservative profile when validation fails.
    pub fn insert_or_fallback(&mut self, profile: ArchetypeProfile) {
        let kind = profile.kind;
        if let Err(err) = self.insert(profile) {
            crate::log_warning(&format!("⚠️ Archetype {}: {} (using conservative profile)", kind.as_str(), err));
            self.profiles
                .insert(kind, Arc::new(ArchetypeProfile::conservative(kind)));
        }
    }

    pub fn get(&self, kind: ArchetypeKind) -> Result<Arc<ArchetypeProfile>, ProfileError> {
        self.profiles
            .get(&kind)
            .cloned()
            .ok_or(ProfileError::Missing(kind))
    }

    /// Lookup that never fails: a missing kind yields the conservative profile.
    pub fn resolve(&self, kind: ArchetypeKind) -> Arc<ArchetypeProfile> {
        match self.get(kind) {
            Ok(profile) => profile,
            Err(err) => {
                crate::log_warning(&format!("⚠️ {} (using conservative profile)", err));
                Arc::new(ArchetypeProfile::conservative(kind))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
