//! Operation variable definitions compiled into the same field-shape IR as
//! selections, so emission shares one rendering path.
use super::compile::{ParsedText, SelectionCompiler};
use super::{ArrayShape, FieldShape, ScalarShape, Shape};
use crate::artifact::ArtifactKind;
use crate::deps::DepKey;
use crate::error::{ErrorKind, Result};
use crate::schema::field::ScalarType;
use crate::schema::TypeDefinition;
use graphql_parser::query as parsed_query;

#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub value: FieldShape,
}

impl<'a> SelectionCompiler<'a> {
    pub fn compile_variables(
        &mut self,
        definitions: &'a [parsed_query::VariableDefinition<'a, ParsedText>],
    ) -> Result<Vec<Variable>> {
        definitions
            .iter()
            .map(|definition| {
                Ok(Variable {
                    name: definition.name.clone(),
                    value: self.variable_shape(&definition.var_type)?,
                })
            })
            .collect()
    }

    fn variable_shape(
        &mut self,
        var_type: &'a parsed_query::Type<'a, ParsedText>,
    ) -> Result<FieldShape> {
        match var_type {
            parsed_query::Type::NonNullType(inner) => match inner.as_ref() {
                parsed_query::Type::NonNullType(_) => Err(self.variable_error(
                    "doubly non-null variable type".to_string(),
                )),
                nullable => {
                    let mut value = self.nullable_variable_shape(nullable)?;
                    value.nullable = false;
                    Ok(value)
                }
            },
            nullable => self.nullable_variable_shape(nullable),
        }
    }

    fn nullable_variable_shape(
        &mut self,
        var_type: &'a parsed_query::Type<'a, ParsedText>,
    ) -> Result<FieldShape> {
        let shape = match var_type {
            parsed_query::Type::NamedType(name) => self.named_variable_shape(name)?,
            parsed_query::Type::ListType(element) => Shape::Array(ArrayShape {
                element: Box::new(self.variable_shape(element)?),
            }),
            parsed_query::Type::NonNullType(_) => {
                return Err(self.variable_error(
                    "non-null wrapper in nullable variable position".to_string(),
                ))
            }
        };
        Ok(FieldShape::nullable(shape))
    }

    fn named_variable_shape(&mut self, name: &str) -> Result<Shape> {
        let schema_type = self.lookup_type(name)?;
        let shape = match &schema_type.definition {
            TypeDefinition::Enum(_) => {
                self.record_dep(DepKey::Artifact(ArtifactKind::Enum, name.to_string()))?;
                Shape::Scalar(ScalarShape::global(name))
            }
            TypeDefinition::InputObject(_) => {
                self.record_dep(DepKey::Artifact(
                    ArtifactKind::InputType,
                    name.to_string(),
                ))?;
                Shape::Scalar(ScalarShape::global(name))
            }
            TypeDefinition::Scalar(_) => {
                Shape::Scalar(ScalarShape::new(self.scalar_expr(&ScalarType::from(name))))
            }
            _ => {
                return Err(self.variable_error(format!(
                    "output type `{name}` used in variable position"
                )))
            }
        };
        Ok(shape)
    }

    fn variable_error(&self, message: String) -> crate::error::Error {
        self.compile_error(ErrorKind::Logic { message })
    }
}
