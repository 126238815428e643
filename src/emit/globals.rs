//! Declarations whose text is a pure function of (name, schema): enums,
//! input objects, typename aliases, and the Omit helper. Re-derived every
//! build from the live artifacts' dependency keys.
use super::shape::doc_comment;
use crate::error::{Error, ErrorKind, Result};
use crate::generator::GeneratorConfig;
use crate::schema::field::FieldType;
use crate::schema::index::TypeIndex;
use crate::schema::{EnumType, InputObjectType, Schema, Type, TypeDefinition};
use std::collections::BTreeSet;

pub const OMIT_HELPER_NAME: &str = "Omit";

pub fn omit_helper_declaration() -> String {
    "export type Omit<T, K extends keyof T> = Pick<T, Exclude<keyof T, K>>;".to_string()
}

pub fn enum_declaration(schema_type: &Type, enum_type: &EnumType) -> String {
    let doc = doc_comment(&schema_type.documentation, 0);
    let values = enum_type
        .possible_values
        .iter()
        .map(|value| format!("  {value} = \"{value}\","))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{doc}export enum {} {{\n{values}\n}}",
        schema_type.name
    )
}

pub fn input_declaration(
    config: &GeneratorConfig,
    name: &str,
    input_type: &InputObjectType,
) -> Result<String> {
    let mut sorted = input_type.fields.iter().collect::<Vec<_>>();
    sorted.sort_unstable_by_key(|(field_name, _)| *field_name);
    let mut lines = Vec::with_capacity(sorted.len());
    for (field_name, field) in sorted {
        let doc = doc_comment(&field.documentation, 2);
        let expr = input_field_expr(config, &field.type_description)?;
        let line = if field.type_description.nullable {
            format!("  {doc}{field_name}?: {expr};")
        } else {
            format!("  {doc}{field_name}: {expr};")
        };
        lines.push(line);
    }
    Ok(format!(
        "export interface {name} {{\n{}\n}}",
        lines.join("\n")
    ))
}

fn input_field_expr(config: &GeneratorConfig, field_type: &FieldType) -> Result<String> {
    use crate::schema::field::FieldTypeDefinition;
    let base = match &field_type.definition {
        FieldTypeDefinition::List(inner) => config.list_expr(&input_field_expr(config, inner)?),
        FieldTypeDefinition::Scalar(scalar) => config.scalar_type_expr(scalar),
        FieldTypeDefinition::Enum(enum_name) => enum_name.clone(),
        FieldTypeDefinition::InputObject(input_name) => input_name.clone(),
        other => {
            return Err(Error::logic(format!(
                "output type `{other:?}` in input position"
            )))
        }
    };
    if field_type.nullable {
        Ok(format!("{base} | null"))
    } else {
        Ok(base)
    }
}

pub fn discriminant_union_declaration(index: &TypeIndex, abstract_name: &str) -> String {
    let names = index.possible_concrete_names(abstract_name);
    let list = if names.is_empty() {
        "never".to_string()
    } else {
        names
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    format!("export type {abstract_name}Typename = {list};")
}

pub fn discriminant_literal_declaration(concrete_name: &str) -> String {
    format!("export type {concrete_name}Typename = \"{concrete_name}\";")
}

/// Input objects pull in the enums and input objects their fields mention,
/// recursively. The visited set doubles as cycle protection.
pub fn collect_input_references(
    schema: &Schema,
    name: &str,
    inputs: &mut BTreeSet<String>,
    enums: &mut BTreeSet<String>,
) -> Result<()> {
    if !inputs.insert(name.to_string()) {
        return Ok(());
    }
    let schema_type = schema.get_type(name).ok_or_else(|| {
        Error::new(ErrorKind::TypeNotFound {
            name: name.to_string(),
        })
    })?;
    let input_type = match &schema_type.definition {
        TypeDefinition::InputObject(input_type) => input_type,
        _ => {
            return Err(Error::logic(format!(
                "`{name}` referenced as an input object but is not one"
            )))
        }
    };
    for field in input_type.fields.values() {
        walk_input_field(schema, &field.type_description, inputs, enums)?;
    }
    Ok(())
}

fn walk_input_field(
    schema: &Schema,
    field_type: &FieldType,
    inputs: &mut BTreeSet<String>,
    enums: &mut BTreeSet<String>,
) -> Result<()> {
    use crate::schema::field::FieldTypeDefinition;
    match &field_type.definition {
        FieldTypeDefinition::List(inner) => walk_input_field(schema, inner, inputs, enums),
        FieldTypeDefinition::Enum(enum_name) => {
            enums.insert(enum_name.clone());
            Ok(())
        }
        FieldTypeDefinition::InputObject(input_name) => {
            collect_input_references(schema, input_name, inputs, enums)
        }
        FieldTypeDefinition::Scalar(_) => Ok(()),
        other => Err(Error::logic(format!(
            "output type `{other:?}` in input position"
        ))),
    }
}
