//! Local memory notes shown in the memory panel.
//!
//! Notes are plain facts the user wants close at hand between sessions.
//! They live in a JSON file in the platform data directory; the remote
//! service never sees them.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryNote {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MemoryStore {
    path: PathBuf,
    notes: Vec<MemoryNote>,
}

impl MemoryStore {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from_path(Self::default_path())
    }

    pub fn load_from_path(path: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let notes = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Vec::new()
        };
        Ok(Self { path, notes })
    }

    fn default_path() -> PathBuf {
        match ProjectDirs::from("org", "permacommons", "ultron-console") {
            Some(proj_dirs) => proj_dirs.data_dir().join("memory.json"),
            None => PathBuf::from("memory.json"),
        }
    }

    pub fn notes(&self) -> &[MemoryNote] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn add(&mut self, text: impl Into<String>) -> Result<(), Box<dyn std::error::Error>> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err("Memory note cannot be empty".into());
        }
        self.notes.push(MemoryNote {
            text: trimmed.to_string(),
            created_at: Utc::now(),
        });
        self.persist()
    }

    pub fn remove(&mut self, index: usize) -> Result<(), Box<dyn std::error::Error>> {
        if index >= self.notes.len() {
            return Err(format!("No memory note at index {index}").into());
        }
        self.notes.remove(index);
        self.persist()
    }

    fn persist(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.notes)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_persist_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let mut store = MemoryStore::load_from_path(path.clone()).unwrap();
        assert!(store.is_empty());
        store.add("prefers concise answers").unwrap();
        store.add("working on a rust project").unwrap();

        let reloaded = MemoryStore::load_from_path(path).unwrap();
        assert_eq!(reloaded.notes().len(), 2);
        assert_eq!(reloaded.notes()[0].text, "prefers concise answers");
    }

    #[test]
    fn empty_notes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::load_from_path(dir.path().join("memory.json")).unwrap();
        assert!(store.add("   ").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn remove_checks_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::load_from_path(dir.path().join("memory.json")).unwrap();
        store.add("one").unwrap();
        assert!(store.remove(3).is_err());
        store.remove(0).unwrap();
        assert!(store.is_empty());
    }
}
