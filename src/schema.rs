//! Consumable schema model built from introspection JSON.
use std::collections::HashMap;
use std::io::Read;

pub mod field;
pub mod index;
mod json;

pub type Documentation = Option<String>;
pub type FieldsLookup = HashMap<String, field::Field>;

#[derive(Debug)]
pub enum Error {
    MissingOfTypeForList,
    MissingOfTypeForNonNull,
    MissingNameForType,
    UnknownTypeKind { name: String, kind: String },
    EnumMissingValues(String),
    JsonParse(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingOfTypeForList => write!(f, "missing `ofType` for LIST wrapper"),
            Error::MissingOfTypeForNonNull => write!(f, "missing `ofType` for NON_NULL wrapper"),
            Error::MissingNameForType => write!(f, "missing name for named type"),
            Error::UnknownTypeKind { name, kind } => {
                write!(f, "unknown kind `{kind}` for type `{name}`")
            }
            Error::EnumMissingValues(name) => write!(f, "enum `{name}` is missing values"),
            Error::JsonParse(inner) => write!(f, "JSON parse error: {inner}"),
        }
    }
}

#[derive(Debug)]
pub struct ObjectType {
    pub fields: FieldsLookup,
    pub interfaces: Vec<String>,
}

#[derive(Debug)]
pub struct InterfaceType {
    pub fields: FieldsLookup,
    pub possible_types: Vec<String>,
}

#[derive(Debug)]
pub struct UnionType {
    /// Only `__typename` is selectable directly on a union.
    pub fields: FieldsLookup,
    pub possible_types: Vec<String>,
}

#[derive(Debug)]
pub struct EnumType {
    pub possible_values: Vec<String>,
}

#[derive(Debug)]
pub struct InputObjectType {
    pub fields: FieldsLookup,
}

#[derive(Debug)]
pub enum TypeDefinition {
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
    Scalar(String),
}

impl TypeDefinition {
    pub fn fields_lookup(&self) -> Option<&FieldsLookup> {
        match self {
            TypeDefinition::Object(object_type) => Some(&object_type.fields),
            TypeDefinition::Interface(interface_type) => Some(&interface_type.fields),
            TypeDefinition::Union(union_type) => Some(&union_type.fields),
            TypeDefinition::InputObject(input_type) => Some(&input_type.fields),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Interface(_) | TypeDefinition::Union(_)
        )
    }
}

#[derive(Debug)]
pub struct Type {
    pub name: String,
    pub documentation: Documentation,
    pub definition: TypeDefinition,
}

impl TryFrom<json::Type> for Type {
    type Error = Error;
    fn try_from(json: json::Type) -> Result<Self, Error> {
        let definition = match json.kind.as_ref() {
            "OBJECT" => TypeDefinition::Object(ObjectType {
                fields: fields_lookup_from_json(json.fields)?,
                interfaces: named_refs(json.interfaces),
            }),
            "INTERFACE" => TypeDefinition::Interface(InterfaceType {
                fields: fields_lookup_from_json(json.fields)?,
                possible_types: named_refs(json.possible_types),
            }),
            "UNION" => {
                let mut fields = HashMap::with_capacity(1);
                let type_name_field = field::Field::new_type_name();
                fields.insert(type_name_field.name.clone(), type_name_field);
                TypeDefinition::Union(UnionType {
                    fields,
                    possible_types: named_refs(json.possible_types),
                })
            }
            "ENUM" => {
                let possible_values = json
                    .enum_values
                    .ok_or_else(|| Error::EnumMissingValues(json.name.clone()))?
                    .into_iter()
                    .map(|value| value.name)
                    .collect();
                TypeDefinition::Enum(EnumType { possible_values })
            }
            "INPUT_OBJECT" => {
                let mut fields = HashMap::new();
                for field_json in json.input_fields.unwrap_or_default() {
                    let field = field::Field::try_from(field_json)?;
                    fields.insert(field.name.clone(), field);
                }
                TypeDefinition::InputObject(InputObjectType { fields })
            }
            "SCALAR" => TypeDefinition::Scalar(json.name.clone()),
            _ => {
                return Err(Error::UnknownTypeKind {
                    name: json.name,
                    kind: json.kind,
                })
            }
        };
        Ok(Type {
            name: json.name,
            documentation: normalize_type_documentation(json.description),
            definition,
        })
    }
}

fn named_refs(refs: Option<Vec<json::NamedTypeRef>>) -> Vec<String> {
    let mut names: Vec<String> = refs
        .unwrap_or_default()
        .into_iter()
        .map(|named| named.name)
        .collect();
    names.sort_unstable();
    names
}

fn fields_lookup_from_json(fields: Option<Vec<json::Field>>) -> Result<FieldsLookup, Error> {
    let fields_json = fields.unwrap_or_default();
    let mut fields = HashMap::with_capacity(fields_json.len() + 1);
    for field_json in fields_json {
        let field = field::Field::try_from(field_json)?;
        fields.insert(field.name.clone(), field);
    }
    // Selectable on every output composite type
    let type_name_field = field::Field::new_type_name();
    fields.insert(type_name_field.name.clone(), type_name_field);
    Ok(fields)
}

fn normalize_type_documentation(description: Option<String>) -> Documentation {
    let docs = description?;
    let joined = docs
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[derive(Debug)]
pub struct Schema {
    types: HashMap<String, Type>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl Schema {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let parsed: json::RawSchema = serde_json::from_reader(reader).map_err(Error::JsonParse)?;
        let root = parsed.data.schema;
        let mut types = HashMap::with_capacity(root.types.len());
        for type_json in root.types {
            let processed = Type::try_from(type_json)?;
            types.insert(processed.name.clone(), processed);
        }
        Ok(Schema {
            types,
            query_type: root.query_type.map(|named| named.name),
            mutation_type: root.mutation_type.map(|named| named.name),
            subscription_type: root.subscription_type.map(|named| named.name),
        })
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn query_root(&self) -> Option<&str> {
        self.query_type.as_deref()
    }

    pub fn mutation_root(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn subscription_root(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    pub fn iter_types(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }
}
