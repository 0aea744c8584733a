//! Symbol Table
//!
//! Exported name → resolved address cache, populated only by explicit resolution.

use std::collections::HashMap;

use super::types::Word;

/// Resolved function addresses of one loaded module
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Word>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a resolved address
    pub fn insert(&mut self, name: impl Into<String>, addr: Word) {
        self.entries.insert(name.into(), addr);
    }

    pub fn get(&self, name: &str) -> Option<Word> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resolved names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Normalize a requested function name (surrounding whitespace is ignored)
pub fn normalize_name(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
