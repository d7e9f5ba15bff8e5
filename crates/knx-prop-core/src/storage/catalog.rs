//! Property definition catalog.
//!
//! Definitions are loaded once from a JSON file, merged into the catalog at
//! session start and only read afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::LoadError;
use crate::protocol::pdt::Pdt;
use crate::types::{ObjectScope, PropertyDefinition, PropertyKey};

/// On-disk definitions document.
#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    definitions: Vec<DefinitionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionEntry {
    /// Absent for definitions valid in any object type
    #[serde(default)]
    object_type: Option<u16>,
    pid: u16,
    name: String,
    #[serde(default)]
    pid_name: Option<String>,
    /// -1 for unknown
    #[serde(default = "unknown_pdt")]
    pdt: i16,
}

fn unknown_pdt() -> i16 {
    -1
}

impl From<DefinitionEntry> for PropertyDefinition {
    fn from(entry: DefinitionEntry) -> Self {
        let object_scope = match entry.object_type {
            Some(t) => ObjectScope::Type(t),
            None => ObjectScope::Global,
        };
        PropertyDefinition {
            key: PropertyKey {
                object_scope,
                pid: entry.pid,
            },
            name: entry.name,
            pid_name: entry.pid_name,
            pdt: u8::try_from(entry.pdt).ok().map(Pdt),
        }
    }
}

/// Load property definitions from a JSON file.
pub fn load(path: &Path) -> Result<Vec<PropertyDefinition>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content).map_err(|source| LoadError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(content: &str) -> Result<Vec<PropertyDefinition>, serde_json::Error> {
    let file: DefinitionsFile = serde_json::from_str(content)?;
    Ok(file.definitions.into_iter().map(Into::into).collect())
}

/// Mapping from property key to definition.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: HashMap<PropertyKey, PropertyDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert definitions, replacing existing ones with the same key.
    pub fn merge(&mut self, definitions: impl IntoIterator<Item = PropertyDefinition>) {
        for def in definitions {
            self.definitions.insert(def.key, def);
        }
    }

    /// Find the definition for a property of an object type.
    ///
    /// The exact object type wins; a global definition for the same pid is
    /// only used when no exact one exists.
    pub fn lookup(&self, object_type: u16, pid: u16) -> Option<&PropertyDefinition> {
        self.definitions
            .get(&PropertyKey::new(object_type, pid))
            .or_else(|| self.definitions.get(&PropertyKey::global(pid)))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn def(scope: ObjectScope, pid: u16, name: &str, pdt: Option<u8>) -> PropertyDefinition {
        PropertyDefinition {
            key: PropertyKey {
                object_scope: scope,
                pid,
            },
            name: name.to_string(),
            pid_name: None,
            pdt: pdt.map(Pdt),
        }
    }

    #[test]
    fn test_lookup_prefers_exact_match() {
        let mut catalog = Catalog::new();
        catalog.merge([
            def(ObjectScope::Global, 11, "Serial Number", Some(0x16)),
            def(ObjectScope::Type(0), 11, "Device Serial Number", Some(0x16)),
        ]);

        assert_eq!(catalog.lookup(0, 11).unwrap().name, "Device Serial Number");
    }

    #[test]
    fn test_lookup_falls_back_to_global() {
        let mut catalog = Catalog::new();
        catalog.merge([def(ObjectScope::Global, 1, "Interface Object Type", Some(0x04))]);

        let found = catalog.lookup(9, 1).unwrap();
        assert_eq!(found.key, PropertyKey::global(1));
        assert!(catalog.lookup(9, 2).is_none());
    }

    #[test]
    fn test_lookup_exact_only() {
        let mut catalog = Catalog::new();
        catalog.merge([def(ObjectScope::Type(11), 52, "Buffer", None)]);

        assert!(catalog.lookup(11, 52).is_some());
        assert!(catalog.lookup(0, 52).is_none());
    }

    #[test]
    fn test_merge_last_write_wins() {
        let mut catalog = Catalog::new();
        catalog.merge([def(ObjectScope::Type(0), 56, "old", None)]);
        catalog.merge([def(ObjectScope::Type(0), 56, "new", Some(4))]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup(0, 56).unwrap().name, "new");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"definitions": [
                {{"pid": 1, "name": "Interface Object Type", "pidName": "OBJECT_TYPE", "pdt": 4}},
                {{"objectType": 0, "pid": 56, "name": "Max. APDU Length"}}
            ]}}"#
        )
        .unwrap();

        let defs = load(file.path()).unwrap();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].key, PropertyKey::global(1));
        assert_eq!(defs[0].pid_name.as_deref(), Some("OBJECT_TYPE"));
        assert_eq!(defs[0].pdt, Some(Pdt::UNSIGNED_INT));
        assert_eq!(defs[1].key, PropertyKey::new(0, 56));
        assert_eq!(defs[1].pdt, None);
    }

    #[test]
    fn test_load_errors() {
        let missing = load(Path::new("/nonexistent/properties.json"));
        assert!(matches!(missing, Err(LoadError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<definitions/>").unwrap();
        assert!(matches!(load(file.path()), Err(LoadError::Malformed { .. })));
    }
}
