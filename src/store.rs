//! Report definition store.
//!
//! CRUD persistence for user-authored report definitions. The engine only
//! sees the [`DefinitionStore`] trait; two implementations are provided:
//! the REST resource exposed by the backend, and a local JSON file for
//! offline use.

use crate::api::ApiClient;
use crate::catalog;
use crate::columns;
use crate::error::{PersistenceError, ValidationError};
use crate::filter;
use crate::types::ReportDefinition;
use chrono::Utc;
use fs2::FileExt;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path of the saved-reports resource on the backend
pub const DEFINITIONS_ENDPOINT: &str = "relatorios-personalizados";

/// Persistence contract for saved report definitions
pub trait DefinitionStore {
    fn list(&self) -> Result<Vec<ReportDefinition>, PersistenceError>;
    fn create(&self, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError>;
    fn update(&self, id: u64, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError>;
    fn delete(&self, id: u64) -> Result<(), PersistenceError>;
}

/// Shape checks a definition must pass before it is saved.
pub fn validate_shape(definition: &ReportDefinition) -> Result<(), ValidationError> {
    if definition.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if definition.fields.is_empty() {
        return Err(ValidationError::EmptyFieldSelection);
    }
    if let Some(unknown) = definition.fields.iter().find(|f| catalog::get_field(f).is_none()) {
        return Err(ValidationError::UnknownField(unknown.clone()));
    }
    filter::validate_clauses(&definition.filters)?;
    if !definition.column_order.is_empty() {
        columns::validate(&definition.column_order, &definition.fields)?;
    }
    Ok(())
}

/// [`DefinitionStore`] over the backend's REST resource
pub struct HttpDefinitionStore {
    client: ApiClient,
}

impl HttpDefinitionStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl DefinitionStore for HttpDefinitionStore {
    fn list(&self) -> Result<Vec<ReportDefinition>, PersistenceError> {
        Ok(self.client.get_json(DEFINITIONS_ENDPOINT, &[])?)
    }

    fn create(&self, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError> {
        validate_shape(definition)?;
        Ok(self.client.send_json("POST", DEFINITIONS_ENDPOINT, definition)?)
    }

    fn update(&self, id: u64, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError> {
        validate_shape(definition)?;
        Ok(self.client.send_json("PUT", &format!("{}/{}", DEFINITIONS_ENDPOINT, id), definition)?)
    }

    fn delete(&self, id: u64) -> Result<(), PersistenceError> {
        Ok(self.client.delete(&format!("{}/{}", DEFINITIONS_ENDPOINT, id))?)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    reports: Vec<ReportDefinition>,
}

/// [`DefinitionStore`] backed by a JSON file.
///
/// Assigns ids and timestamps the way the backend would. Every operation
/// holds an exclusive lock on a sidecar `.lock` file and replaces the data
/// file atomically.
pub struct FileDefinitionStore {
    path: PathBuf,
}

impl FileDefinitionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read(&self) -> Result<StoreFile, PersistenceError> {
        if !self.path.exists() {
            return Ok(StoreFile::default());
        }
        let file = File::open(&self.path)?;
        Ok(serde_json::from_reader(file)?)
    }

    fn write(&self, data: &StoreFile) -> Result<(), PersistenceError> {
        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, data)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| PersistenceError::Io(e.error))?;
        Ok(())
    }

    /// Run `f` under the store lock. `f` returns whether it changed the data.
    fn locked<T>(&self, f: impl FnOnce(&mut StoreFile) -> Result<(T, bool), PersistenceError>) -> Result<T, PersistenceError> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let lock = OpenOptions::new().create(true).truncate(false).write(true).open(self.lock_path())?;
        lock.lock_exclusive()?;

        let mut data = self.read()?;
        let (out, changed) = f(&mut data)?;
        if changed {
            self.write(&data)?;
        }

        // Unlock is automatic when the lock file goes out of scope
        Ok(out)
    }
}

impl DefinitionStore for FileDefinitionStore {
    fn list(&self) -> Result<Vec<ReportDefinition>, PersistenceError> {
        self.locked(|data| Ok((data.reports.clone(), false)))
    }

    fn create(&self, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError> {
        validate_shape(definition)?;
        self.locked(|data| {
            let id = data.next_id.max(data.reports.iter().filter_map(|r| r.id).max().unwrap_or(0)) + 1;
            data.next_id = id;

            let now = Utc::now();
            let mut saved = definition.clone();
            saved.id = Some(id);
            saved.created_at = Some(now);
            saved.updated_at = Some(now);
            saved.column_order = columns::normalize(&saved.column_order);
            data.reports.push(saved.clone());

            info!("saved report {} '{}' to {}", id, saved.name, self.path.display());
            Ok((saved, true))
        })
    }

    fn update(&self, id: u64, definition: &ReportDefinition) -> Result<ReportDefinition, PersistenceError> {
        validate_shape(definition)?;
        self.locked(|data| {
            let slot = data.reports.iter_mut().find(|r| r.id == Some(id)).ok_or(PersistenceError::NotFound(id))?;

            let mut saved = definition.clone();
            saved.id = Some(id);
            saved.created_at = slot.created_at;
            saved.updated_at = Some(Utc::now());
            saved.column_order = columns::normalize(&saved.column_order);
            *slot = saved.clone();

            debug!("updated report {}", id);
            Ok((saved, true))
        })
    }

    fn delete(&self, id: u64) -> Result<(), PersistenceError> {
        self.locked(|data| {
            let before = data.reports.len();
            data.reports.retain(|r| r.id != Some(id));
            if data.reports.len() == before {
                return Err(PersistenceError::NotFound(id));
            }
            info!("deleted report {}", id);
            Ok(((), true))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FilterValue;
    use tempfile::TempDir;

    fn draft(name: &str) -> ReportDefinition {
        let mut def = ReportDefinition::blank();
        def.name = name.to_string();
        def.fields = vec!["nup".into(), "valor_estimado".into()];
        def.column_order = columns::from_field_selection(&def.fields);
        def
    }

    #[test]
    fn test_validate_shape() {
        assert!(validate_shape(&draft("ok")).is_ok());

        assert_eq!(validate_shape(&draft("  ")), Err(ValidationError::MissingName));

        let mut empty = draft("x");
        empty.fields.clear();
        empty.column_order.clear();
        assert_eq!(validate_shape(&empty), Err(ValidationError::EmptyFieldSelection));

        let mut unknown = draft("x");
        unknown.fields.push("bogus".into());
        assert_eq!(validate_shape(&unknown), Err(ValidationError::UnknownField("bogus".into())));

        let mut stray = draft("x");
        stray.column_order = columns::from_field_selection(&["nup", "objeto"]);
        assert!(matches!(validate_shape(&stray), Err(ValidationError::InvalidColumnOrder(_))));
    }

    #[test]
    fn test_file_store_crud() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDefinitionStore::new(temp_dir.path().join("nested").join("relatorios.json"));
        assert!(store.list().unwrap().is_empty());

        let first = store.create(&draft("Primeiro")).unwrap();
        let second = store.create(&draft("Segundo")).unwrap();
        assert_eq!(first.id, Some(1));
        assert_eq!(second.id, Some(2));
        assert!(first.created_at.is_some());

        let mut edited = first.clone();
        edited.filters = filter::add_or_replace(&[], "ano", FilterValue::Number(2024.0)).unwrap();
        let updated = store.update(1, &edited).unwrap();
        assert_eq!(updated.created_at, first.created_at);
        assert_eq!(updated.filters.len(), 1);

        store.delete(2).unwrap();
        let remaining = store.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].filters.len(), 1);

        // ids are never reused
        let third = store.create(&draft("Terceiro")).unwrap();
        assert_eq!(third.id, Some(3));
    }

    #[test]
    fn test_file_store_missing_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDefinitionStore::new(temp_dir.path().join("relatorios.json"));
        assert!(matches!(store.delete(7), Err(PersistenceError::NotFound(7))));
        assert!(matches!(store.update(7, &draft("x")), Err(PersistenceError::NotFound(7))));
    }

    #[test]
    fn test_file_store_rejects_invalid_definition() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileDefinitionStore::new(temp_dir.path().join("relatorios.json"));
        let result = store.create(&draft(""));
        assert!(matches!(result, Err(PersistenceError::Invalid(ValidationError::MissingName))));
        assert!(!store.path().exists());
    }
}
