//! Dependency tracking and memoization for incremental rebuilds.
//!
//! Every computed artifact records the set of keys it transitively depends
//! on. File-scoped purging then only has to filter stored entries by key
//! membership, never walk a graph.
use crate::artifact::ArtifactKind;
use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepKey {
    File(String),
    Fragment(String),
    /// Which fragments a computation transitively spread. Kept in its own
    /// namespace so "uses fragment X" queries never conflate with the
    /// fragment's artifact key.
    FragmentUse(String),
    SchemaType(String),
    Artifact(ArtifactKind, String),
}

impl DepKey {
    pub fn file(path: impl Into<String>) -> Self {
        DepKey::File(path.into())
    }
}

pub type DepSet = BTreeSet<DepKey>;

/// A stack of dependency-key scopes. `start`/`end` must stay strictly
/// balanced across a build pass; imbalance is fatal for incremental
/// correctness and surfaces as DependencyTrackingError, never silently.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    scopes: Vec<DepSet>,
    files: Vec<Option<String>>,
}

impl DependencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, file: Option<&str>) {
        let mut scope = DepSet::new();
        if let Some(path) = file {
            scope.insert(DepKey::file(path));
        }
        self.scopes.push(scope);
        self.files.push(file.map(str::to_string));
    }

    /// The innermost file registered by any open scope.
    pub fn current_file(&self) -> Option<&str> {
        self.files
            .iter()
            .rev()
            .find_map(|file| file.as_deref())
    }

    pub fn add(&mut self, key: DepKey) -> Result<()> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| Error::logic("dependency recorded outside of any tracking scope"))?;
        scope.insert(key);
        Ok(())
    }

    pub fn add_fragment_use(&mut self, name: &str) -> Result<()> {
        self.add(DepKey::FragmentUse(name.to_string()))
    }

    /// Re-attribute an already-recorded dependency set (typically from a
    /// cache hit) to every currently open scope in one call.
    pub fn merge(&mut self, dependencies: &DepSet, file: Option<&str>) -> Result<()> {
        if self.scopes.is_empty() {
            return Err(Error::logic(
                "dependency merge outside of any tracking scope",
            ));
        }
        for scope in &mut self.scopes {
            if let Some(path) = file {
                scope.insert(DepKey::file(path));
            }
            scope.extend(dependencies.iter().cloned());
        }
        Ok(())
    }

    pub fn end(&mut self) -> Result<DepSet> {
        let current_file = self.current_file().map(str::to_string);
        let mut scope = self
            .scopes
            .pop()
            .ok_or_else(|| Error::logic("ended a tracking scope that was never started"))?;
        self.files.pop();
        if let Some(path) = &current_file {
            scope.insert(DepKey::file(path.as_str()));
        }
        if let Some(parent) = self.scopes.last_mut() {
            parent.extend(scope.iter().cloned());
        }
        Ok(scope)
    }

    pub fn open_scopes(&self) -> usize {
        self.scopes.len()
    }

    /// A build pass must end here with zero open scopes.
    pub fn assert_balanced(&self) -> Result<()> {
        if self.scopes.is_empty() {
            Ok(())
        } else {
            Err(Error::tracking(format!(
                "{} dependency scope(s) left open at end of build pass",
                self.scopes.len()
            )))
        }
    }

    pub fn reset(&mut self) {
        self.scopes.clear();
        self.files.clear();
    }
}

#[derive(Debug, Clone)]
pub struct MemoEntry<V> {
    pub value: V,
    pub dependencies: DepSet,
    pub file: Option<String>,
}

/// Memoize-by-key store for pure computations. Lookups count as use of the
/// cached dependency set, which the caller re-attributes to the active
/// tracking scope; with the cache disabled every lookup misses and nothing
/// is stored, so output is byte-identical either way.
#[derive(Debug)]
pub struct MemoCache<V> {
    entries: HashMap<String, MemoEntry<V>>,
    enabled: bool,
    pub hits: u64,
    pub misses: u64,
}

impl<V: Clone> MemoCache<V> {
    pub fn new(enabled: bool) -> Self {
        MemoCache {
            entries: HashMap::new(),
            enabled,
            hits: 0,
            misses: 0,
        }
    }

    pub fn lookup(&mut self, key: &str) -> Option<&MemoEntry<V>> {
        if !self.enabled {
            self.misses += 1;
            return None;
        }
        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn store(&mut self, key: String, value: V, dependencies: DepSet, file: Option<String>) {
        if !self.enabled {
            return;
        }
        self.entries.insert(
            key,
            MemoEntry {
                value,
                dependencies,
                file,
            },
        );
    }

    /// Evict every entry computed from `file` or depending on it.
    pub fn purge_file(&mut self, file: &str) {
        let file_key = DepKey::file(file);
        self.entries.retain(|_, entry| {
            entry.file.as_deref() != Some(file) && !entry.dependencies.contains(&file_key)
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
