//! Serde shapes for the introspection query result.
use serde::Deserialize;

#[derive(Deserialize)]
pub struct FieldType {
    pub kind: String,
    pub name: Option<String>,
    #[serde(rename = "ofType")]
    pub of_type: Option<Box<FieldType>>,
}

#[derive(Deserialize)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_information: FieldType,
    #[serde(default, rename = "isDeprecated")]
    pub is_deprecated: bool,
}

#[derive(Deserialize)]
pub struct EnumValue {
    pub name: String,
}

#[derive(Deserialize)]
pub struct NamedTypeRef {
    pub name: String,
}

#[derive(Deserialize)]
pub struct Type {
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    pub fields: Option<Vec<Field>>,
    #[serde(rename = "inputFields")]
    pub input_fields: Option<Vec<Field>>,
    #[serde(rename = "enumValues")]
    pub enum_values: Option<Vec<EnumValue>>,
    #[serde(rename = "possibleTypes")]
    pub possible_types: Option<Vec<NamedTypeRef>>,
    pub interfaces: Option<Vec<NamedTypeRef>>,
}

#[derive(Deserialize)]
pub struct SchemaRoot {
    #[serde(rename = "queryType")]
    pub query_type: Option<NamedTypeRef>,
    #[serde(rename = "mutationType")]
    pub mutation_type: Option<NamedTypeRef>,
    #[serde(rename = "subscriptionType")]
    pub subscription_type: Option<NamedTypeRef>,
    pub types: Vec<Type>,
}

#[derive(Deserialize)]
pub struct Data {
    #[serde(rename = "__schema")]
    pub schema: SchemaRoot,
}

#[derive(Deserialize)]
pub struct RawSchema {
    pub data: Data,
}
