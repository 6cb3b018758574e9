//! The conflict-checked type registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;

use super::mapping::TypeMapping;
use super::native::{normalize_name, NativeType};
use crate::db::ColumnSpec;
use crate::errors::{ModlitError, Result};
use crate::geometry::{GeometryInfo, GeometrySubtype};

static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::with_defaults);

/// Registry key: a normalized native type name, optionally parameterized by
/// a geometry subtype.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TypeKey {
    pub native: String,
    pub subtype: Option<GeometrySubtype>,
}

impl TypeKey {
    pub fn plain(native: &str) -> Self {
        Self {
            native: normalize_key(native),
            subtype: None,
        }
    }

    pub fn geometry(native: &str, subtype: GeometrySubtype) -> Self {
        Self {
            native: normalize_key(native),
            subtype: Some(subtype),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.subtype {
            Some(subtype) => write!(f, "{}({})", self.native, subtype),
            None => f.write_str(&self.native),
        }
    }
}

fn normalize_key(native: &str) -> String {
    // Registration accepts the same spellings a catalog may report.
    let parsed = NativeType::parse(native);
    if parsed.is_empty() {
        normalize_name(native)
    } else {
        parsed.name
    }
}

fn check_conflict(key: &TypeKey, existing: &TypeMapping, attempted: &TypeMapping) -> Result<()> {
    if existing == attempted {
        return Ok(());
    }
    Err(ModlitError::DuplicateTypeMapping {
        native_type: key.to_string(),
        existing: existing.clone(),
        attempted: attempted.clone(),
    })
}

/// Maps native type identifiers to shared [`TypeMapping`]s.
///
/// Reads (`resolve*`) take a shared lock and may run concurrently from
/// independent synthesis runs; `register*` takes the exclusive lock, so a
/// registration never races an in-flight resolution.
///
/// # Example
///
/// ```ignore
/// use modlit::types::{PrimitiveKind, TypeMapping, TypeRegistry};
///
/// let registry = TypeRegistry::with_defaults();
/// registry.register("citext", TypeMapping::primitive(PrimitiveKind::Text))?;
/// let mapping = registry.resolve("CITEXT")?;
/// ```
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<TypeKey, Arc<TypeMapping>>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry preloaded with the built-in type vocabulary.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        super::defaults::install(&registry);
        registry
    }

    /// The process-wide registry, initialized with defaults on first use.
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeKey, Arc<TypeMapping>>> {
        // Writers never leave the map half-updated, so a poisoned lock is safe to reuse.
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeKey, Arc<TypeMapping>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a mapping for a native type.
    ///
    /// Re-registering an identical mapping succeeds and returns the existing
    /// shared entry. A different mapping fails with `DuplicateTypeMapping`.
    pub fn register(&self, native: &str, mapping: TypeMapping) -> Result<Arc<TypeMapping>> {
        self.insert(TypeKey::plain(native), mapping)
    }

    /// Register a mapping for a `(native type, geometry subtype)` pair.
    pub fn register_geometry(
        &self,
        native: &str,
        subtype: GeometrySubtype,
        mapping: TypeMapping,
    ) -> Result<Arc<TypeMapping>> {
        self.insert(TypeKey::geometry(native, subtype), mapping)
    }

    fn insert(&self, key: TypeKey, mapping: TypeMapping) -> Result<Arc<TypeMapping>> {
        let mut entries = self.write();
        if let Some(existing) = entries.get(&key) {
            check_conflict(&key, existing, &mapping)?;
            return Ok(Arc::clone(existing));
        }
        debug!(key = %key, mapping = %mapping, "registered type mapping");
        let shared = Arc::new(mapping);
        entries.insert(key, Arc::clone(&shared));
        Ok(shared)
    }

    /// Register a batch of mappings under a single lock.
    ///
    /// `fallbacks` are only registered where their key is still vacant after
    /// `mappings`. Either the whole batch is applied or, when any entry
    /// conflicts with the registry or with another entry of the batch,
    /// nothing is.
    pub fn register_all(
        &self,
        mappings: Vec<(TypeKey, TypeMapping)>,
        fallbacks: Vec<(TypeKey, TypeMapping)>,
    ) -> Result<()> {
        let mut entries = self.write();
        let mut staged: Vec<(TypeKey, TypeMapping)> = Vec::new();

        for (key, mapping) in mappings {
            let existing = entries
                .get(&key)
                .map(|m| &**m)
                .or_else(|| staged.iter().find(|(k, _)| *k == key).map(|(_, m)| m));
            match existing {
                Some(existing) => check_conflict(&key, existing, &mapping)?,
                None => staged.push((key, mapping)),
            }
        }
        for (key, mapping) in fallbacks {
            if !entries.contains_key(&key) && !staged.iter().any(|(k, _)| *k == key) {
                staged.push((key, mapping));
            }
        }

        for (key, mapping) in staged {
            debug!(key = %key, mapping = %mapping, "registered type mapping");
            entries.insert(key, Arc::new(mapping));
        }
        Ok(())
    }

    /// Resolve a native type identifier.
    pub fn resolve(&self, native: &str) -> Result<Arc<TypeMapping>> {
        self.resolve_native(&NativeType::parse(native), None)
    }

    /// Resolve a parsed native type, using geometry metadata when present.
    ///
    /// For geometry columns the `(native, subtype)` entry wins. When the
    /// subtype is absent from the catalog, or not registered for this native
    /// type, the generic entry for the native type is used instead. Subtype
    /// names with dimension suffixes or an `ST_` prefix resolve like the bare
    /// subtype name.
    pub fn resolve_native(
        &self,
        native: &NativeType,
        geometry: Option<&GeometryInfo>,
    ) -> Result<Arc<TypeMapping>> {
        let entries = self.read();

        if let Some(subtype) = geometry.and_then(|g| g.subtype) {
            if let Some(mapping) = entries.get(&TypeKey::geometry(&native.name, subtype)) {
                return Ok(Arc::clone(mapping));
            }
            debug!(
                native = %native.name,
                subtype = %subtype,
                "no subtype-specific mapping, falling back to generic entry"
            );
        }

        if let Some(mapping) = entries.get(&TypeKey::plain(&native.name)) {
            return Ok(Arc::clone(mapping));
        }

        // `MULTIPOLYGONZ`, `ST_PointM`: other spellings of a subtype name.
        if let Some(subtype) = GeometrySubtype::from_name(&native.name) {
            if let Some(mapping) = entries.get(&TypeKey::plain(subtype.as_str())) {
                debug!(native = %native.name, subtype = %subtype, "matched subtype spelling");
                return Ok(Arc::clone(mapping));
            }
        }

        Err(ModlitError::UnknownNativeType {
            native_type: native.declared.clone(),
            table: None,
            column: None,
        })
    }

    /// Resolve the mapping for a snapshot column.
    ///
    /// A miss names the column; the caller knows the table.
    pub fn resolve_column(&self, column: &ColumnSpec) -> Result<Arc<TypeMapping>> {
        self.resolve_native(&column.native_type, column.geometry.as_ref())
            .map_err(|err| match err {
                ModlitError::UnknownNativeType {
                    native_type, table, ..
                } => ModlitError::UnknownNativeType {
                    native_type,
                    table,
                    column: Some(column.name.clone()),
                },
                other => other,
            })
    }

    /// Check if a plain entry exists for a native type.
    pub fn contains(&self, native: &str) -> bool {
        self.read().contains_key(&TypeKey::plain(native))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All registered entries, sorted by key.
    pub fn mappings(&self) -> Vec<(TypeKey, Arc<TypeMapping>)> {
        let mut all: Vec<_> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
