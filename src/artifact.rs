//! Deduplicated registry of generated units and their dependency sets.
use crate::deps::{DepKey, DepSet};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    Enum,
    InputType,
    Fragment,
    Operation,
    OperationVariables,
    DiscriminantLiteral,
    DiscriminantUnion,
    TypeHelper,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Enum => "enum",
            ArtifactKind::InputType => "input-type",
            ArtifactKind::Fragment => "fragment",
            ArtifactKind::Operation => "operation",
            ArtifactKind::OperationVariables => "operation-variables",
            ArtifactKind::DiscriminantLiteral => "discriminant-literal",
            ArtifactKind::DiscriminantUnion => "discriminant-union",
            ArtifactKind::TypeHelper => "type-helper",
        }
    }

    /// Kinds whose text is a pure function of (name, schema). These are
    /// re-derived on every build from the live artifacts' dependency keys.
    pub fn is_global(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Enum
                | ArtifactKind::InputType
                | ArtifactKind::DiscriminantLiteral
                | ArtifactKind::DiscriminantUnion
                | ArtifactKind::TypeHelper
        )
    }
}

pub type ArtifactId = (ArtifactKind, String);

#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub name: String,
    pub text: String,
    pub source_file: Option<String>,
    pub source_snippet: Option<String>,
    pub dependencies: DepSet,
}

impl Artifact {
    pub fn id(&self) -> ArtifactId {
        (self.kind, self.name.clone())
    }

    /// Identifier used by external dependency queries.
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.name)
    }
}

#[derive(Debug, Default)]
pub struct ArtifactStore {
    entries: BTreeMap<ArtifactId, Artifact>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same (kind, name) replaces: artifact text is deterministic, so the
    /// latest computation is as good as the first.
    pub fn insert(&mut self, artifact: Artifact) {
        self.entries.insert(artifact.id(), artifact);
    }

    pub fn get(&self, kind: ArtifactKind, name: &str) -> Option<&Artifact> {
        self.entries.get(&(kind, name.to_string()))
    }

    pub fn contains(&self, kind: ArtifactKind, name: &str) -> bool {
        self.get(kind, name).is_some()
    }

    pub fn dependencies_of(&self, kind: ArtifactKind, name: &str) -> Option<&DepSet> {
        self.get(kind, name).map(|artifact| &artifact.dependencies)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.values()
    }

    /// Remove every artifact originating from `file` or depending on it.
    pub fn purge_file(&mut self, file: &str) -> Vec<ArtifactId> {
        let file_key = DepKey::file(file);
        let doomed: Vec<ArtifactId> = self
            .entries
            .values()
            .filter(|artifact| {
                artifact.source_file.as_deref() == Some(file)
                    || artifact.dependencies.contains(&file_key)
            })
            .map(Artifact::id)
            .collect();
        for id in &doomed {
            self.entries.remove(id);
        }
        doomed
    }

    pub fn purge_globals(&mut self) {
        self.entries.retain(|(kind, _), _| !kind.is_global());
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
