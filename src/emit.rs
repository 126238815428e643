//! Rendering of shape IR and global schema types to TypeScript text.
use std::collections::BTreeSet;

pub mod globals;
pub mod shape;

pub const HEADER: &str = "/* tslint:disable */
/* eslint-disable */
// This file was automatically generated and should not be edited.

";

/// Everything a rendered declaration referenced beyond itself. The
/// generator turns these into artifact dependencies and import lines.
#[derive(Debug, Default)]
pub struct EmittedRefs {
    /// Names importable from the global types file: enums, input types,
    /// typename aliases, the Omit helper.
    pub globals: BTreeSet<String>,
    /// Fragment artifacts referenced by name.
    pub fragments: BTreeSet<String>,
    pub discriminant_unions: BTreeSet<String>,
    pub discriminant_literals: BTreeSet<String>,
    pub uses_omit: bool,
}

impl EmittedRefs {
    pub fn absorb(&mut self, other: EmittedRefs) {
        self.globals.extend(other.globals);
        self.fragments.extend(other.fragments);
        self.discriminant_unions.extend(other.discriminant_unions);
        self.discriminant_literals.extend(other.discriminant_literals);
        self.uses_omit |= other.uses_omit;
    }

    pub fn global_import_names(&self) -> Vec<&str> {
        self.globals.iter().map(String::as_str).collect()
    }
}

#[derive(Debug)]
pub struct EmittedDefinition {
    pub text: String,
    pub refs: EmittedRefs,
}
