//! Class mapping registry.
//!
//! Maps class identifiers to display names and persists them as
//! `{ "class_mapping": { "<id>": "<name>", ... } }`. Purely numeric ids are
//! normalized to integers, so `"007"`, `"7"` and a label token `7` all refer
//! to the same entry. Entries are never removed because annotations still
//! reference them; an unmapped id simply displays as itself.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notice::Notice;

/// A normalized class identifier.
///
/// Integer keys sort before named keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClassKey {
    Index(u64),
    Name(String),
}

impl ClassKey {
    /// Normalize a raw id: all-ASCII-digit strings become [`ClassKey::Index`].
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = raw.parse() {
                return ClassKey::Index(index);
            }
        }
        ClassKey::Name(raw.to_string())
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKey::Index(index) => write!(f, "{}", index),
            ClassKey::Name(name) => f.write_str(name),
        }
    }
}

/// On-disk shape of the mapping file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingFile {
    #[serde(default)]
    class_mapping: BTreeMap<String, String>,
}

/// Errors from class registry operations.
#[derive(Error, Debug)]
pub enum ClassRegistryError {
    #[error("Class id must not be empty")]
    EmptyId,

    #[error("Class name must not be empty")]
    EmptyName,

    #[error("Class '{0}' already exists")]
    AlreadyExists(String),

    #[error("Class '{0}' is not in the mapping")]
    UnknownClass(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid class mapping file {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path:?} has no \"class_mapping\" object")]
    MissingMapping { path: PathBuf },
}

/// Class id → display name mapping with a persistent backing file.
#[derive(Debug)]
pub struct ClassRegistry {
    path: PathBuf,
    mapping: BTreeMap<ClassKey, String>,
    colors: RefCell<HashMap<String, [u8; 3]>>,
}

/// Mapping written when no mapping file exists yet.
pub fn default_mapping() -> BTreeMap<ClassKey, String> {
    (0..3)
        .map(|i| (ClassKey::Index(i), format!("Class_{}", i)))
        .collect()
}

impl ClassRegistry {
    /// Create a registry backed by `path` with an explicit mapping. Nothing is
    /// written until the first mutation or [`save`](Self::save).
    pub fn with_mapping(path: impl Into<PathBuf>, mapping: BTreeMap<ClassKey, String>) -> Self {
        Self {
            path: path.into(),
            mapping,
            colors: RefCell::new(HashMap::new()),
        }
    }

    /// Load the mapping from `path`.
    ///
    /// A missing file is seeded with [`default_mapping`] and persisted. An
    /// unreadable or invalid file leaves the registry empty. Either failure is
    /// returned as a notice rather than an error.
    pub fn open(path: impl Into<PathBuf>) -> (Self, Option<Notice>) {
        let path = path.into();
        match read_mapping_file(&path) {
            Ok(mapping) => {
                log::info!("Loaded {} class(es) from {:?}", mapping.len(), path);
                (Self::with_mapping(path, mapping), None)
            }
            Err(ClassRegistryError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                log::info!("No class mapping at {:?}, writing defaults", path);
                let registry = Self::with_mapping(path, default_mapping());
                let notice = registry.persist();
                (registry, notice)
            }
            Err(e) => {
                let notice = Notice::warning(format!("Failed to load class mapping: {}", e))
                    .with_path(&path);
                notice.log();
                (Self::with_mapping(path, BTreeMap::new()), Some(notice))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&ClassKey, &str)> {
        self.mapping.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Ids in key order, as label tokens.
    pub fn ids(&self) -> Vec<String> {
        self.mapping.keys().map(ClassKey::to_string).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.mapping.contains_key(&ClassKey::parse(id))
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn resolve(&self, id: &str) -> String {
        self.mapping
            .get(&ClassKey::parse(id))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Deterministic display colour for `id`, memoized for the process.
    pub fn color_for(&self, id: &str) -> [u8; 3] {
        *self
            .colors
            .borrow_mut()
            .entry(id.to_string())
            .or_insert_with(|| class_color(id))
    }

    /// Add a new class. Fails if the id is already mapped; use
    /// [`edit`](Self::edit) to rename.
    pub fn add(&mut self, id: &str, name: &str) -> Result<Option<Notice>, ClassRegistryError> {
        let (key, name) = validate(id, name)?;
        if self.mapping.contains_key(&key) {
            return Err(ClassRegistryError::AlreadyExists(key.to_string()));
        }
        log::debug!("Adding class {} = {}", key, name);
        self.mapping.insert(key, name);
        Ok(self.persist())
    }

    /// Rename an existing class.
    pub fn edit(&mut self, id: &str, name: &str) -> Result<Option<Notice>, ClassRegistryError> {
        let (key, name) = validate(id, name)?;
        let slot = self
            .mapping
            .get_mut(&key)
            .ok_or_else(|| ClassRegistryError::UnknownClass(id.to_string()))?;
        log::debug!("Renaming class {}: {} -> {}", key, slot, name);
        *slot = name;
        Ok(self.persist())
    }

    /// Remove a class from the mapping. Annotations using it keep their id.
    pub fn delete(&mut self, id: &str) -> Result<Option<Notice>, ClassRegistryError> {
        let key = ClassKey::parse(id.trim());
        if self.mapping.remove(&key).is_none() {
            return Err(ClassRegistryError::UnknownClass(id.to_string()));
        }
        log::debug!("Deleted class {}", key);
        Ok(self.persist())
    }

    /// Replace the whole mapping with the one in `path`.
    pub fn import(&mut self, path: &Path) -> Result<Option<Notice>, ClassRegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| ClassRegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| ClassRegistryError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let Some(raw) = value.get("class_mapping") else {
            return Err(ClassRegistryError::MissingMapping {
                path: path.to_path_buf(),
            });
        };
        let raw: BTreeMap<String, String> = serde_json::from_value(raw.clone()).map_err(|source| {
            ClassRegistryError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;

        self.mapping = normalize(raw);
        log::info!("Imported {} class(es) from {:?}", self.mapping.len(), path);
        Ok(self.persist())
    }

    /// Write the mapping to an arbitrary file.
    pub fn export(&self, path: &Path) -> Result<(), ClassRegistryError> {
        write_mapping_file(path, &self.mapping)?;
        log::info!("Exported {} class(es) to {:?}", self.mapping.len(), path);
        Ok(())
    }

    /// Write the mapping to the backing file.
    pub fn save(&self) -> Result<(), ClassRegistryError> {
        write_mapping_file(&self.path, &self.mapping)
    }

    /// Save, turning a failure into a warning; the in-memory mapping stays
    /// authoritative either way.
    fn persist(&self) -> Option<Notice> {
        self.save().err().map(|e| {
            let notice = Notice::warning(format!("Failed to save class mapping: {}", e))
                .with_path(&self.path);
            notice.log();
            notice
        })
    }
}

fn validate(id: &str, name: &str) -> Result<(ClassKey, String), ClassRegistryError> {
    let id = id.trim();
    let name = name.trim();
    if id.is_empty() {
        return Err(ClassRegistryError::EmptyId);
    }
    if name.is_empty() {
        return Err(ClassRegistryError::EmptyName);
    }
    Ok((ClassKey::parse(id), name.to_string()))
}

fn normalize(raw: BTreeMap<String, String>) -> BTreeMap<ClassKey, String> {
    raw.into_iter()
        .map(|(k, v)| (ClassKey::parse(&k), v))
        .collect()
}

fn read_mapping_file(path: &Path) -> Result<BTreeMap<ClassKey, String>, ClassRegistryError> {
    let content = std::fs::read_to_string(path).map_err(|source| ClassRegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: MappingFile =
        serde_json::from_str(&content).map_err(|source| ClassRegistryError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(normalize(file.class_mapping))
}

fn write_mapping_file(
    path: &Path,
    mapping: &BTreeMap<ClassKey, String>,
) -> Result<(), ClassRegistryError> {
    let file = MappingFile {
        class_mapping: mapping
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    };
    let json = serde_json::to_string_pretty(&file).map_err(|source| ClassRegistryError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ClassRegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, json).map_err(|source| ClassRegistryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// 64-bit FNV-1a, stable across runs and platforms.
fn fnv1a(bytes: impl IntoIterator<Item = u8>) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .into_iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}

/// Per-channel hash of the id, offset into `[50, 250)` so labels stay legible.
pub fn class_color(id: &str) -> [u8; 3] {
    let channel = |suffix: u8| {
        let hash = fnv1a(id.bytes().chain(std::iter::once(suffix)));
        (hash % 200) as u8 + 50
    };
    [channel(b'r'), channel(b'g'), channel(b'b')]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_in(dir: &Path) -> ClassRegistry {
        ClassRegistry::with_mapping(dir.join("classes.json"), default_mapping())
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(ClassKey::parse("0"), ClassKey::Index(0));
        assert_eq!(ClassKey::parse("007"), ClassKey::Index(7));
        assert_eq!(ClassKey::parse("b1"), ClassKey::Name("b1".into()));
        assert_eq!(ClassKey::parse("-1"), ClassKey::Name("-1".into()));
        assert_eq!(ClassKey::parse(""), ClassKey::Name(String::new()));
        assert!(ClassKey::Index(100) < ClassKey::Name("a".into()));
    }

    #[test]
    fn test_open_missing_seeds_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotation_editor_config.json");

        let (registry, notice) = ClassRegistry::open(&path);
        assert!(notice.is_none());
        assert_eq!(registry.ids(), vec!["0", "1", "2"]);
        assert_eq!(registry.resolve("1"), "Class_1");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["class_mapping"]["2"], "Class_2");
    }

    #[test]
    fn test_open_invalid_file_is_empty_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ nope").unwrap();

        let (registry, notice) = ClassRegistry::open(&path);
        assert!(registry.is_empty());
        assert_eq!(notice.unwrap().severity, crate::notice::Severity::Warning);
    }

    #[test]
    fn test_resolve_falls_back_to_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(dir.path());
        assert_eq!(registry.resolve("0"), "Class_0");
        assert_eq!(registry.resolve("00"), "Class_0");
        assert_eq!(registry.resolve("42"), "42");
        assert_eq!(registry.resolve("car"), "car");
    }

    #[test]
    fn test_crud_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(dir.path());

        assert!(registry.add("car", "Car").unwrap().is_none());
        assert!(matches!(
            registry.add("car", "Other"),
            Err(ClassRegistryError::AlreadyExists(_))
        ));
        registry.edit("0", "Person").unwrap();
        registry.delete("2").unwrap();
        assert!(matches!(
            registry.delete("2"),
            Err(ClassRegistryError::UnknownClass(_))
        ));
        assert!(matches!(registry.add(" ", "x"), Err(ClassRegistryError::EmptyId)));
        assert!(matches!(registry.edit("1", ""), Err(ClassRegistryError::EmptyName)));

        let (reloaded, _) = ClassRegistry::open(registry.path());
        assert_eq!(reloaded.ids(), vec!["0", "1", "car"]);
        assert_eq!(reloaded.resolve("0"), "Person");
        assert_eq!(reloaded.resolve("car"), "Car");
    }

    #[test]
    fn test_import_replaces_and_export_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = registry_in(dir.path());

        let import_path = dir.path().join("import.json");
        std::fs::write(
            &import_path,
            r#"{ "class_mapping": { "05": "bina", "tree": "Tree" } }"#,
        )
        .unwrap();
        registry.import(&import_path).unwrap();
        assert_eq!(registry.ids(), vec!["5", "tree"]);
        assert_eq!(registry.resolve("5"), "bina");
        assert_eq!(registry.resolve("0"), "0");

        let export_path = dir.path().join("out").join("export.json");
        registry.export(&export_path).unwrap();
        let (exported, _) = ClassRegistry::open(&export_path);
        assert_eq!(exported.ids(), registry.ids());

        std::fs::write(&import_path, r#"{ "other": {} }"#).unwrap();
        assert!(matches!(
            registry.import(&import_path),
            Err(ClassRegistryError::MissingMapping { .. })
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_save_failure_is_warning_not_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        let mut registry = ClassRegistry::with_mapping(&path, BTreeMap::new());

        let notice = registry.add("7", "seven").unwrap();
        assert!(notice.is_some());
        assert_eq!(registry.resolve("7"), "seven");
    }

    #[test]
    fn test_color_is_stable_and_bright() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(dir.path());

        let c = registry.color_for("car");
        assert_eq!(c, registry.color_for("car"));
        assert_eq!(c, class_color("car"));
        for channel in c {
            assert!((50..250).contains(&channel));
        }
        assert_ne!(class_color("0"), class_color("1"));
    }
}
