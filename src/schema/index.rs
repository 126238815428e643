//! Precomputed lookups over the schema for the selection compiler.
use super::{Schema, TypeDefinition};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

/// Built once per schema and rebuilt wholesale when the schema is replaced.
/// Answers the two polymorphism questions the compiler asks constantly:
/// which concrete types can hide behind an abstract one, and does a given
/// concrete type implement a given abstract one.
#[derive(Debug)]
pub struct TypeIndex {
    possible: HashMap<String, Vec<String>>,
    implements: HashSet<String>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

fn implements_key(abstract_name: &str, concrete_name: &str) -> String {
    format!("{abstract_name}---{concrete_name}")
}

impl TypeIndex {
    pub fn new(schema: &Schema) -> Self {
        let mut possible = HashMap::new();
        let mut implements = HashSet::new();
        for schema_type in schema.iter_types() {
            let possible_types = match &schema_type.definition {
                TypeDefinition::Interface(interface_type) => &interface_type.possible_types,
                TypeDefinition::Union(union_type) => &union_type.possible_types,
                _ => continue,
            };
            for concrete_name in possible_types {
                implements.insert(implements_key(&schema_type.name, concrete_name));
            }
            possible.insert(schema_type.name.clone(), possible_types.clone());
        }
        TypeIndex {
            possible,
            implements,
            query_type: schema.query_root().map(str::to_string),
            mutation_type: schema.mutation_root().map(str::to_string),
            subscription_type: schema.subscription_root().map(str::to_string),
        }
    }

    /// Sorted concrete type names behind `abstract_name`; empty when the
    /// name is unknown or not abstract.
    pub fn possible_concrete_names(&self, abstract_name: &str) -> &[String] {
        self.possible
            .get(abstract_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// False when either name is unknown.
    pub fn object_implements(&self, concrete_name: &str, abstract_name: &str) -> bool {
        self.implements
            .contains(&implements_key(abstract_name, concrete_name))
    }

    pub fn root_type(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }
}
