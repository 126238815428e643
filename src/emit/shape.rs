//! Shape-tree rendering: nested interfaces child-first, `{parent}_{alias}`
//! naming, aliases for unions and intersections.
use super::{EmittedDefinition, EmittedRefs};
use crate::generator::GeneratorConfig;
use crate::ir::variable::Variable;
use crate::ir::{
    DiscriminantShape, FieldShape, FragmentRefShape, IntersectionShape, ObjectShape, Shape,
    UnionShape,
};
use crate::schema::Documentation;
use std::collections::BTreeSet;

pub fn emit_definition(config: &GeneratorConfig, name: &str, shape: &Shape) -> EmittedDefinition {
    let mut emitter = ShapeEmitter::new(config);
    emitter.emit_named(name, shape);
    emitter.finish()
}

pub fn emit_variables(
    config: &GeneratorConfig,
    operation_name: &str,
    variables: &[Variable],
) -> EmittedDefinition {
    let mut emitter = ShapeEmitter::new(config);
    let interface_name = format!("{operation_name}Variables");
    let mut lines = Vec::with_capacity(variables.len());
    for variable in variables {
        let expr = emitter.field_expr(&interface_name, &variable.name, &variable.value);
        let line = if variable.value.nullable {
            format!("  {}?: {expr};", variable.name)
        } else {
            format!("  {}: {expr};", variable.name)
        };
        lines.push(line);
    }
    emitter.decls.push(format!(
        "export interface {interface_name} {{\n{}\n}}",
        lines.join("\n")
    ));
    emitter.finish()
}

pub fn doc_comment(docs: &Documentation, tab_width: usize) -> String {
    match docs {
        Some(docs) => {
            let tab = " ".repeat(tab_width);
            let processed = docs
                .lines()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(&format!("\n {tab}* "))
                .replace("*/", "");
            format!("/**\n {tab}* {processed}\n {tab}*/\n{tab}")
        }
        None => String::new(),
    }
}

fn quoted_list(names: &BTreeSet<String>) -> String {
    names
        .iter()
        .map(|name| format!("\"{name}\""))
        .collect::<Vec<_>>()
        .join(" | ")
}

struct ShapeEmitter<'a> {
    config: &'a GeneratorConfig,
    decls: Vec<String>,
    refs: EmittedRefs,
}

impl<'a> ShapeEmitter<'a> {
    fn new(config: &'a GeneratorConfig) -> Self {
        ShapeEmitter {
            config,
            decls: Vec::new(),
            refs: EmittedRefs::default(),
        }
    }

    fn finish(self) -> EmittedDefinition {
        EmittedDefinition {
            text: self.decls.join("\n\n"),
            refs: self.refs,
        }
    }

    fn emit_named(&mut self, name: &str, shape: &Shape) {
        match shape {
            Shape::Object(object) => self.emit_object_interface(name, object),
            Shape::Union(union) => self.emit_union_alias(name, union),
            Shape::Intersection(intersection) => self.emit_intersection_alias(name, intersection),
            Shape::FragmentRef(reference) => {
                let expr = self.fragment_ref_expr(reference);
                self.decls.push(format!("export type {name} = {expr};"));
            }
            other => {
                let expr = self.value_expr(name, "value", other);
                self.decls.push(format!("export type {name} = {expr};"));
            }
        }
    }

    fn emit_object_interface(&mut self, name: &str, object: &ObjectShape) {
        let lines = self.object_lines(name, object);
        let declaration = if lines.is_empty() {
            format!("export interface {name} {{}}")
        } else {
            format!("export interface {name} {{\n{}\n}}", lines.join("\n"))
        };
        self.decls.push(declaration);
    }

    fn object_lines(&mut self, parent: &str, object: &ObjectShape) -> Vec<String> {
        object
            .fields
            .iter()
            .map(|(alias, field)| {
                let doc = doc_comment(&field.doc, 2);
                let expr = self.field_expr(parent, alias, field);
                format!("  {doc}{alias}: {expr};")
            })
            .collect()
    }

    fn field_expr(&mut self, parent: &str, alias: &str, field: &FieldShape) -> String {
        let expr = self.value_expr(parent, alias, &field.shape);
        if field.nullable {
            format!("{expr} | null")
        } else {
            expr
        }
    }

    fn value_expr(&mut self, parent: &str, alias: &str, shape: &Shape) -> String {
        match shape {
            Shape::Scalar(scalar) => {
                if scalar.global_ref {
                    self.refs.globals.insert(scalar.type_expr.clone());
                }
                scalar.type_expr.clone()
            }
            Shape::Discriminant(discriminant) => self.discriminant_expr(discriminant),
            Shape::Array(array) => {
                let inner = self.field_expr(parent, alias, &array.element);
                self.config.list_expr(&inner)
            }
            Shape::Object(object) => {
                let child = format!("{parent}_{alias}");
                self.emit_object_interface(&child, object);
                child
            }
            Shape::Union(union) => {
                if union
                    .branches
                    .iter()
                    .all(|branch| matches!(branch, Shape::Scalar(_) | Shape::Discriminant(_)))
                {
                    // Literal unions stay inline
                    union
                        .branches
                        .iter()
                        .map(|branch| self.value_expr(parent, alias, branch))
                        .collect::<Vec<_>>()
                        .join(" | ")
                } else {
                    let child = format!("{parent}_{alias}");
                    self.emit_union_alias(&child, union);
                    child
                }
            }
            Shape::Intersection(intersection) => {
                let child = format!("{parent}_{alias}");
                self.emit_intersection_alias(&child, intersection);
                child
            }
            Shape::FragmentRef(reference) => self.fragment_ref_expr(reference),
        }
    }

    fn emit_union_alias(&mut self, name: &str, union: &UnionShape) {
        let mut branch_exprs = Vec::with_capacity(union.branches.len());
        for branch in &union.branches {
            match branch {
                Shape::Object(object) => {
                    let branch_name = self.branch_name(name, object);
                    self.emit_object_interface(&branch_name, object);
                    branch_exprs.push(branch_name);
                }
                Shape::Intersection(intersection) => {
                    let branch_name = self.intersection_branch_name(name, intersection);
                    self.emit_intersection_alias(&branch_name, intersection);
                    branch_exprs.push(branch_name);
                }
                Shape::FragmentRef(reference) => {
                    branch_exprs.push(self.fragment_ref_expr(reference));
                }
                other => branch_exprs.push(self.value_expr(name, "value", other)),
            }
        }
        self.decls
            .push(format!("export type {name} = {};", branch_exprs.join(" | ")));
    }

    /// Branches carrying an exclusion discriminant display under the
    /// abstract type's name; everything else under its concrete type.
    fn branch_name(&self, parent: &str, object: &ObjectShape) -> String {
        for field in object.fields.values() {
            if let Shape::Discriminant(discriminant) = &field.shape {
                if let Some(abstract_name) = &discriminant.exclude_from {
                    return format!("{parent}_{abstract_name}");
                }
            }
        }
        format!("{parent}_{}", object.concrete_type)
    }

    fn intersection_branch_name(&self, parent: &str, intersection: &IntersectionShape) -> String {
        let key = intersection
            .parts
            .iter()
            .find_map(|part| match part {
                Shape::Object(object) => Some(object.concrete_type.as_str()),
                _ => None,
            })
            .or_else(|| {
                intersection.parts.iter().find_map(|part| match part {
                    Shape::FragmentRef(reference) => Some(reference.parent_type.as_str()),
                    _ => None,
                })
            })
            .unwrap_or("Branch");
        format!("{parent}_{key}")
    }

    fn emit_intersection_alias(&mut self, name: &str, intersection: &IntersectionShape) {
        let mut parts = Vec::with_capacity(intersection.parts.len());
        let mut literal = None;
        for part in &intersection.parts {
            match part {
                Shape::FragmentRef(reference) => parts.push(self.fragment_ref_expr(reference)),
                Shape::Object(object) => literal = Some(self.object_literal(name, object)),
                other => parts.push(self.value_expr(name, "value", other)),
            }
        }
        if let Some(literal) = literal {
            parts.push(literal);
        }
        self.decls
            .push(format!("export type {name} = {};", parts.join(" & ")));
    }

    fn object_literal(&mut self, parent: &str, object: &ObjectShape) -> String {
        let lines = self.object_lines(parent, object);
        if lines.is_empty() {
            "{}".to_string()
        } else {
            format!("{{\n{}\n}}", lines.join("\n"))
        }
    }

    fn discriminant_expr(&mut self, discriminant: &DiscriminantShape) -> String {
        if let Some(abstract_name) = &discriminant.exclude_from {
            self.refs
                .discriminant_unions
                .insert(abstract_name.clone());
            self.refs.globals.insert(format!("{abstract_name}Typename"));
            if discriminant.names.is_empty() {
                format!("{abstract_name}Typename")
            } else {
                format!(
                    "Exclude<{abstract_name}Typename, {}>",
                    quoted_list(&discriminant.names)
                )
            }
        } else if discriminant.synthesized && discriminant.names.len() == 1 {
            let name = discriminant.names.iter().next().unwrap();
            self.refs.discriminant_literals.insert(name.clone());
            self.refs.globals.insert(format!("{name}Typename"));
            format!("{name}Typename")
        } else if discriminant.names.is_empty() {
            "never".to_string()
        } else {
            quoted_list(&discriminant.names)
        }
    }

    fn fragment_ref_expr(&mut self, reference: &FragmentRefShape) -> String {
        self.refs.fragments.insert(reference.artifact.clone());
        if reference.omitted.is_empty() {
            reference.artifact.clone()
        } else {
            self.refs.uses_omit = true;
            self.refs.globals.insert("Omit".to_string());
            format!(
                "Omit<{}, {}>",
                reference.artifact,
                quoted_list(&reference.omitted)
            )
        }
    }
}
