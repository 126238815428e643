use super::{json, Documentation, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    Custom(String),
    Boolean,
    String,
    Float,
    Int,
    ID,
}

impl From<&str> for ScalarType {
    fn from(name: &str) -> Self {
        match name {
            "Boolean" => ScalarType::Boolean,
            "String" => ScalarType::String,
            "Float" => ScalarType::Float,
            "Int" => ScalarType::Int,
            "ID" => ScalarType::ID,
            _ => ScalarType::Custom(name.to_string()),
        }
    }
}

/// One level of a field's declared output type. Nullability is recorded per
/// wrapper level; list nesting recurses.
#[derive(Debug, Clone)]
pub struct FieldType {
    pub nullable: bool,
    pub definition: FieldTypeDefinition,
}

#[derive(Debug, Clone)]
pub enum FieldTypeDefinition {
    List(Box<FieldType>),
    Object(String),
    Interface(String),
    Union(String),
    Enum(String),
    InputObject(String),
    Scalar(ScalarType),
    /// The `__typename` meta field.
    TypeName,
}

impl FieldType {
    fn new_type_name() -> Self {
        FieldType {
            nullable: false,
            definition: FieldTypeDefinition::TypeName,
        }
    }
}

impl TryFrom<json::FieldType> for FieldType {
    type Error = Error;
    fn try_from(json: json::FieldType) -> Result<Self, Error> {
        let mut nullable = true;
        let mut iter = json;
        loop {
            match iter.kind.as_ref() {
                "NON_NULL" => {
                    nullable = false;
                    iter = *iter.of_type.ok_or(Error::MissingOfTypeForNonNull)?;
                }
                "LIST" => {
                    let inner = (*iter.of_type.ok_or(Error::MissingOfTypeForList)?).try_into()?;
                    return Ok(FieldType {
                        nullable,
                        definition: FieldTypeDefinition::List(Box::new(inner)),
                    });
                }
                kind => {
                    let name = iter.name.ok_or(Error::MissingNameForType)?;
                    let definition = match kind {
                        "OBJECT" => FieldTypeDefinition::Object(name),
                        "INTERFACE" => FieldTypeDefinition::Interface(name),
                        "UNION" => FieldTypeDefinition::Union(name),
                        "ENUM" => FieldTypeDefinition::Enum(name),
                        "INPUT_OBJECT" => FieldTypeDefinition::InputObject(name),
                        "SCALAR" => FieldTypeDefinition::Scalar(ScalarType::from(name.as_ref())),
                        _ => {
                            return Err(Error::UnknownTypeKind {
                                name,
                                kind: kind.to_string(),
                            })
                        }
                    };
                    return Ok(FieldType {
                        nullable,
                        definition,
                    });
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub documentation: Documentation,
    pub deprecated: bool,
    pub type_description: FieldType,
}

impl Field {
    pub(super) fn new_type_name() -> Self {
        Field {
            name: "__typename".to_string(),
            documentation: None,
            deprecated: false,
            type_description: FieldType::new_type_name(),
        }
    }
}

impl TryFrom<json::Field> for Field {
    type Error = Error;
    fn try_from(json: json::Field) -> Result<Self, Error> {
        let json::Field {
            name,
            description,
            type_information,
            is_deprecated,
        } = json;
        Ok(Field {
            name,
            documentation: normalize_documentation(description),
            deprecated: is_deprecated,
            type_description: type_information.try_into()?,
        })
    }
}

fn normalize_documentation(description: Option<String>) -> Documentation {
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
