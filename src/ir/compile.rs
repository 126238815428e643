//! The selection compiler: walks selection sets against the schema and
//! builds shape IR, resolving fragments and polymorphism.
use super::conflict;
use super::{
    is_spread_key, postprocess, spread_key, ArrayShape, DiscriminantShape, FieldMap, FieldShape,
    FragmentRefShape, ObjectShape, ScalarShape, Shape, UnionShape,
};
use crate::artifact::ArtifactKind;
use crate::deps::{DepKey, DepSet, DependencyTracker, MemoCache};
use crate::error::{Error, ErrorKind, Result};
use crate::generator::GeneratorConfig;
use crate::ir::variable::Variable;
use crate::schema::field::{FieldType, FieldTypeDefinition};
use crate::schema::index::{OperationKind, TypeIndex};
use crate::schema::{self, Schema, TypeDefinition};
use graphql_parser::query as parsed_query;
use graphql_parser::Pos;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Text type the parsed documents carry.
pub type ParsedText = String;

/// Below this many untargeted types an explicit literal list stays shorter
/// and easier to read than an exclusion; past it the exclusion wins. Tunable.
const EXCLUSION_MIN_FALLBACKS: usize = 3;

#[derive(Debug)]
pub enum Warning {
    FragmentNarrowing {
        position: Pos,
        possible_types: Vec<String>,
        spread_type_name: String,
    },
    DeprecatedFieldUse {
        position: Pos,
        field_name: String,
        parent_type_name: String,
    },
}

#[derive(Debug)]
pub struct FileWarning {
    pub file: String,
    pub warning: Warning,
}

/// A fragment definition as registered in the generator, prior to
/// compilation.
#[derive(Debug, Clone, Copy)]
pub struct FragmentSource<'a> {
    pub definition: &'a parsed_query::FragmentDefinition<'a, ParsedText>,
    pub file: &'a str,
}

/// A fragment's finalized compilation: the shape for its own artifact and
/// the fully inlined field map per possible concrete type, which is what
/// spread sites resolve conflicts against.
#[derive(Debug, Clone)]
pub struct CachedFragment {
    pub shape: Shape,
    pub flats: BTreeMap<String, FieldMap>,
    pub condition_type: String,
    pub file: String,
    pub dependencies: DepSet,
}

#[derive(Debug, Default)]
pub struct FragmentShapeCache {
    done: HashMap<String, CachedFragment>,
    in_progress: HashSet<String>,
}

impl FragmentShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&CachedFragment> {
        self.done.get(name)
    }

    pub fn purge_file(&mut self, file: &str) {
        let file_key = DepKey::file(file);
        self.done.retain(|_, cached| {
            cached.file != file && !cached.dependencies.contains(&file_key)
        });
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.in_progress.clear();
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}

#[derive(Debug)]
pub struct CompiledOperation {
    pub name: String,
    pub shape: Shape,
    pub variables: Vec<Variable>,
}

pub(crate) struct RootCompile {
    pub shape: Shape,
    pub flats: BTreeMap<String, FieldMap>,
}

/// Selections on an abstract type, split into what applies to every branch
/// and what applies per concrete type.
#[derive(Default)]
struct AbstractParts<'a> {
    base_fields: Vec<&'a parsed_query::Field<'a, ParsedText>>,
    base_spreads: Vec<(String, Pos)>,
    overlays: BTreeMap<String, Overlay<'a>>,
    has_inline: bool,
}

#[derive(Default)]
struct Overlay<'a> {
    inline_sets: Vec<&'a parsed_query::SelectionSet<'a, ParsedText>>,
    spreads: Vec<(String, Pos)>,
}

pub struct SelectionCompiler<'a> {
    schema: &'a Schema,
    index: &'a TypeIndex,
    config: &'a GeneratorConfig,
    fragments: &'a HashMap<String, FragmentSource<'a>>,
    tracker: &'a mut DependencyTracker,
    memo: &'a mut MemoCache<Shape>,
    fragment_shapes: &'a mut FragmentShapeCache,
    warnings: Vec<FileWarning>,
}

pub fn operation_name(
    operation: &parsed_query::OperationDefinition<'_, ParsedText>,
) -> Option<String> {
    let (name, fallback) = match operation {
        parsed_query::OperationDefinition::Query(query) => (&query.name, "Query"),
        parsed_query::OperationDefinition::Mutation(mutation) => (&mutation.name, "Mutation"),
        parsed_query::OperationDefinition::Subscription(subscription) => {
            (&subscription.name, "Subscription")
        }
        parsed_query::OperationDefinition::SelectionSet(_) => return None,
    };
    Some(name.clone().unwrap_or_else(|| fallback.to_string()))
}

fn has_conditional_directive(directives: &[parsed_query::Directive<'_, ParsedText>]) -> bool {
    directives
        .iter()
        .any(|directive| directive.name == "skip" || directive.name == "include")
}

impl<'a> SelectionCompiler<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schema: &'a Schema,
        index: &'a TypeIndex,
        config: &'a GeneratorConfig,
        fragments: &'a HashMap<String, FragmentSource<'a>>,
        tracker: &'a mut DependencyTracker,
        memo: &'a mut MemoCache<Shape>,
        fragment_shapes: &'a mut FragmentShapeCache,
    ) -> Self {
        SelectionCompiler {
            schema,
            index,
            config,
            fragments,
            tracker,
            memo,
            fragment_shapes,
            warnings: Vec::new(),
        }
    }

    pub fn take_warnings(&mut self) -> Vec<FileWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn err(&self, kind: ErrorKind) -> Error {
        Error::new(kind).with_file(self.tracker.current_file())
    }

    pub(crate) fn compile_error(&self, kind: ErrorKind) -> Error {
        self.err(kind)
    }

    pub(crate) fn lookup_type(&mut self, name: &str) -> Result<&'a schema::Type> {
        self.get_type(name)
    }

    pub(crate) fn record_dep(&mut self, key: DepKey) -> Result<()> {
        self.tracker.add(key)
    }

    pub(crate) fn scalar_expr(&self, scalar: &crate::schema::field::ScalarType) -> String {
        self.config.scalar_type_expr(scalar)
    }

    fn push_warning(&mut self, warning: Warning) {
        let file = self.tracker.current_file().unwrap_or_default().to_string();
        self.warnings.push(FileWarning { file, warning });
    }

    /// Every type consulted becomes a dependency of the artifact being
    /// computed.
    fn get_type(&mut self, name: &str) -> Result<&'a schema::Type> {
        self.tracker.add(DepKey::SchemaType(name.to_string()))?;
        let schema = self.schema;
        schema.get_type(name).ok_or_else(|| {
            self.err(ErrorKind::TypeNotFound {
                name: name.to_string(),
            })
        })
    }

    fn fields_lookup(&mut self, type_name: &str) -> Result<&'a schema::FieldsLookup> {
        let schema_type = self.get_type(type_name)?;
        schema_type.definition.fields_lookup().ok_or_else(|| {
            self.err(ErrorKind::Logic {
                message: format!("selection set on non-composite type `{type_name}`"),
            })
        })
    }

    /// Compile one operation definition into its final shape plus variable
    /// IR. The caller owns scope bracketing.
    pub fn compile_operation(
        &mut self,
        operation: &'a parsed_query::OperationDefinition<'a, ParsedText>,
    ) -> Result<CompiledOperation> {
        let (kind, selection_set, variable_definitions) = match operation {
            parsed_query::OperationDefinition::Query(query) => (
                OperationKind::Query,
                &query.selection_set,
                &query.variable_definitions,
            ),
            parsed_query::OperationDefinition::Mutation(mutation) => (
                OperationKind::Mutation,
                &mutation.selection_set,
                &mutation.variable_definitions,
            ),
            parsed_query::OperationDefinition::Subscription(subscription) => (
                OperationKind::Subscription,
                &subscription.selection_set,
                &subscription.variable_definitions,
            ),
            parsed_query::OperationDefinition::SelectionSet(_) => {
                return Err(self.err(ErrorKind::Logic {
                    message: "plain selection sets are not supported as operations".to_string(),
                }));
            }
        };
        let name = operation_name(operation).unwrap_or_default();
        let root_name = self
            .index
            .root_type(kind)
            .ok_or_else(|| {
                self.err(ErrorKind::MissingRootType {
                    operation_kind: kind.as_str().to_string(),
                })
            })?
            .to_string();
        let root = self.compile_root(&root_name, selection_set)?;
        let variables = self.compile_variables(variable_definitions)?;
        Ok(CompiledOperation {
            name,
            shape: postprocess(root.shape),
            variables,
        })
    }

    /// Compile (or fetch) a fragment for artifact emission, capturing the
    /// dependency set attributable to the artifact.
    pub fn compile_fragment_artifact(
        &mut self,
        name: &str,
        position: Pos,
    ) -> Result<(Shape, DepSet)> {
        self.tracker.start(None);
        let ensured = self.ensure_fragment(name, position);
        let scope = self.tracker.end();
        ensured?;
        let cached = self.fragment_shapes.get(name).ok_or_else(|| {
            self.err(ErrorKind::Logic {
                message: format!("fragment `{name}` missing from shape cache after compile"),
            })
        })?;
        Ok((postprocess(cached.shape.clone()), scope?))
    }

    /// Compile one operation as a tracked unit: opens a file scope, ends it
    /// even on failure, and returns the captured dependency set.
    pub fn compile_operation_artifact(
        &mut self,
        file: &str,
        operation: &'a parsed_query::OperationDefinition<'a, ParsedText>,
    ) -> Result<(CompiledOperation, DepSet)> {
        self.tracker.start(Some(file));
        let compiled = self.compile_operation(operation);
        let scope = self.tracker.end();
        let compiled = compiled.map_err(|error| error.with_file(Some(file)))?;
        Ok((compiled, scope?))
    }

    fn compile_root(
        &mut self,
        type_name: &str,
        selection_set: &'a parsed_query::SelectionSet<'a, ParsedText>,
    ) -> Result<RootCompile> {
        let schema_type = self.get_type(type_name)?;
        match &schema_type.definition {
            TypeDefinition::Object(_) => {
                let fields = self.concrete_field_map(type_name, selection_set)?;
                let mut flats = BTreeMap::new();
                flats.insert(type_name.to_string(), self.flatten_map(&fields, type_name)?);
                let shape = self.finalize_concrete(type_name, fields)?;
                Ok(RootCompile { shape, flats })
            }
            TypeDefinition::Interface(_) | TypeDefinition::Union(_) => {
                self.compile_abstract(type_name, selection_set)
            }
            _ => Err(self.err(ErrorKind::Logic {
                message: format!("selection set on non-composite type `{type_name}`"),
            })),
        }
    }

    /// Memoized by (type name, selection-set identity). A hit re-attributes
    /// the recorded dependency set to the active scope; output is identical
    /// with the cache disabled.
    fn compile_selection_set(
        &mut self,
        type_name: &str,
        selection_set: &'a parsed_query::SelectionSet<'a, ParsedText>,
    ) -> Result<Shape> {
        let position = selection_set.span.0;
        let key = format!(
            "selection:{type_name}:{}:{}:{}",
            self.tracker.current_file().unwrap_or_default(),
            position.line,
            position.column
        );
        if let Some(hit) = self.memo.lookup(&key) {
            let value = hit.value.clone();
            let dependencies = hit.dependencies.clone();
            let file = hit.file.clone();
            self.tracker.merge(&dependencies, file.as_deref())?;
            return Ok(value);
        }
        self.tracker.start(None);
        let computed = self.compile_selection_set_uncached(type_name, selection_set);
        let scope = self.tracker.end();
        let value = computed?;
        let dependencies = scope?;
        let file = self.tracker.current_file().map(str::to_string);
        self.memo.store(key, value.clone(), dependencies, file);
        Ok(value)
    }

    fn compile_selection_set_uncached(
        &mut self,
        type_name: &str,
        selection_set: &'a parsed_query::SelectionSet<'a, ParsedText>,
    ) -> Result<Shape> {
        let schema_type = self.get_type(type_name)?;
        match &schema_type.definition {
            TypeDefinition::Object(_) => {
                let fields = self.concrete_field_map(type_name, selection_set)?;
                self.finalize_concrete(type_name, fields)
            }
            TypeDefinition::Interface(_) | TypeDefinition::Union(_) => self
                .compile_abstract(type_name, selection_set)
                .map(|root| root.shape),
            _ => Err(self.err(ErrorKind::Logic {
                message: format!("selection set on non-composite type `{type_name}`"),
            })),
        }
    }

    // ---- concrete types ----

    fn concrete_field_map(
        &mut self,
        type_name: &str,
        selection_set: &'a parsed_query::SelectionSet<'a, ParsedText>,
    ) -> Result<FieldMap> {
        let mut object = ObjectShape::new(type_name);
        self.collect_concrete(&mut object, type_name, selection_set)?;
        Ok(object.fields)
    }

    fn finalize_concrete(&mut self, type_name: &str, fields: FieldMap) -> Result<Shape> {
        let mut object = ObjectShape {
            concrete_type: type_name.to_string(),
            fields,
        };
        if self.config.always_emit_typename && !object.has_discriminant() {
            self.tracker.add(DepKey::Artifact(
                ArtifactKind::DiscriminantLiteral,
                type_name.to_string(),
            ))?;
            object.insert_field(
                "__typename".to_string(),
                FieldShape::new(Shape::Discriminant(
                    DiscriminantShape::single(type_name).mark_synthesized(),
                )),
            )?;
        }
        self.resolve_object(object)
    }

    fn resolve_object(&mut self, object: ObjectShape) -> Result<Shape> {
        conflict::resolve(self.fragment_shapes, object)
            .map_err(|error| error.with_file(self.tracker.current_file()))
    }

    fn collect_concrete(
        &mut self,
        object: &mut ObjectShape,
        type_name: &str,
        selection_set: &'a parsed_query::SelectionSet<'a, ParsedText>,
    ) -> Result<()> {
        for selection in &selection_set.items {
            match selection {
                parsed_query::Selection::Field(selection_field) => {
                    self.insert_concrete_field(object, type_name, selection_field)?;
                }
                parsed_query::Selection::InlineFragment(inline) => {
                    let condition = match &inline.type_condition {
                        Some(parsed_query::TypeCondition::On(condition)) => condition.as_str(),
                        // Directive-only inline fragments keep the parent type
                        None => type_name,
                    };
                    if self.condition_applies(type_name, condition) {
                        self.collect_concrete(object, type_name, &inline.selection_set)?;
                    } else {
                        self.push_warning(Warning::FragmentNarrowing {
                            position: inline.position,
                            possible_types: vec![type_name.to_string()],
                            spread_type_name: condition.to_string(),
                        });
                    }
                }
                parsed_query::Selection::FragmentSpread(spread) => {
                    let fragment_name = spread.fragment_name.as_str();
                    self.tracker.add_fragment_use(fragment_name)?;
                    let source = self.fragments.get(fragment_name).copied().ok_or_else(|| {
                        self.err(ErrorKind::FragmentNotFound {
                            name: fragment_name.to_string(),
                            position: Some(spread.position),
                            available: self.known_fragment_names(),
                        })
                    })?;
                    let parsed_query::TypeCondition::On(condition) =
                        &source.definition.type_condition;
                    if self.condition_applies(type_name, condition) {
                        self.insert_spread(object, fragment_name, condition, spread.position)?;
                    } else {
                        self.push_warning(Warning::FragmentNarrowing {
                            position: spread.position,
                            possible_types: vec![type_name.to_string()],
                            spread_type_name: condition.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether a type condition matches a concrete type: the type itself or
    /// any abstract type it implements.
    fn condition_applies(&self, concrete_type: &str, condition: &str) -> bool {
        condition == concrete_type || self.index.object_implements(concrete_type, condition)
    }

    fn known_fragment_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fragments.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn insert_spread(
        &mut self,
        object: &mut ObjectShape,
        fragment_name: &str,
        condition: &str,
        position: Pos,
    ) -> Result<()> {
        self.ensure_fragment(fragment_name, position)?;
        let reference = FragmentRefShape::new(fragment_name, condition, &object.concrete_type);
        object.insert_field(
            spread_key(fragment_name),
            FieldShape::new(Shape::FragmentRef(reference)),
        )
    }

    fn insert_concrete_field(
        &mut self,
        object: &mut ObjectShape,
        type_name: &str,
        selection_field: &'a parsed_query::Field<'a, ParsedText>,
    ) -> Result<()> {
        let lookup = self.fields_lookup(type_name)?;
        let name = selection_field.name.as_str();
        let field = lookup.get(name).ok_or_else(|| {
            let mut available: Vec<String> = lookup.keys().cloned().collect();
            available.sort_unstable();
            self.err(ErrorKind::FieldNotFound {
                parent_type_name: type_name.to_string(),
                field_name: name.to_string(),
                position: Some(selection_field.position),
                available,
            })
        })?;
        if field.deprecated && self.config.show_deprecation_warnings {
            self.push_warning(Warning::DeprecatedFieldUse {
                position: selection_field.position,
                field_name: field.name.clone(),
                parent_type_name: type_name.to_string(),
            });
        }
        let alias = selection_field
            .alias
            .as_ref()
            .unwrap_or(&selection_field.name)
            .clone();
        let mut value = self.shape_from_field_type(
            &field.type_description,
            selection_field,
            type_name,
        )?;
        value.doc = field.documentation.clone();
        // skip/include make the field absent-capable regardless of schema
        // nullability
        value.nullable |= has_conditional_directive(&selection_field.directives);
        object.insert_field(alias, value)
    }

    fn shape_from_field_type(
        &mut self,
        field_type: &FieldType,
        selection_field: &'a parsed_query::Field<'a, ParsedText>,
        parent_type_name: &str,
    ) -> Result<FieldShape> {
        let nullable = field_type.nullable;
        let shape = match &field_type.definition {
            FieldTypeDefinition::List(inner) => {
                let element =
                    self.shape_from_field_type(inner, selection_field, parent_type_name)?;
                Shape::Array(ArrayShape {
                    element: Box::new(element),
                })
            }
            FieldTypeDefinition::Scalar(scalar) => {
                Shape::Scalar(ScalarShape::new(self.config.scalar_type_expr(scalar)))
            }
            FieldTypeDefinition::Enum(enum_name) => {
                self.tracker
                    .add(DepKey::SchemaType(enum_name.to_string()))?;
                self.tracker.add(DepKey::Artifact(
                    ArtifactKind::Enum,
                    enum_name.to_string(),
                ))?;
                Shape::Scalar(ScalarShape::global(enum_name.clone()))
            }
            // The parent type is known by construction; no schema lookup
            FieldTypeDefinition::TypeName => {
                Shape::Discriminant(DiscriminantShape::single(parent_type_name))
            }
            FieldTypeDefinition::Object(name)
            | FieldTypeDefinition::Interface(name)
            | FieldTypeDefinition::Union(name) => {
                if selection_field.selection_set.items.is_empty() {
                    return Err(self.err(ErrorKind::Logic {
                        message: format!("missing sub selection on composite type `{name}`"),
                    }));
                }
                self.compile_selection_set(name, &selection_field.selection_set)?
            }
            FieldTypeDefinition::InputObject(name) => {
                return Err(self.err(ErrorKind::Logic {
                    message: format!("input object type `{name}` traversed in a selection"),
                }));
            }
        };
        Ok(FieldShape {
            nullable,
            doc: None,
            shape,
        })
    }

    // ---- abstract types ----

    fn compile_abstract(
        &mut self,
        abstract_name: &str,
        selection_set: &'a parsed_query::SelectionSet<'a, ParsedText>,
    ) -> Result<RootCompile> {
        let possible: Vec<String> = self.index.possible_concrete_names(abstract_name).to_vec();
        for concrete_name in &possible {
            self.tracker
                .add(DepKey::SchemaType(concrete_name.clone()))?;
        }
        let mut parts = AbstractParts::default();
        self.classify_abstract(abstract_name, selection_set, &possible, &mut parts)?;

        // Fast path: a lone spread of the whole abstract type passes the
        // fragment shape through by reference.
        if parts.base_fields.is_empty()
            && parts.overlays.is_empty()
            && parts.base_spreads.len() == 1
        {
            let (fragment_name, position) = parts.base_spreads[0].clone();
            self.ensure_fragment(&fragment_name, position)?;
            let flats = self
                .fragment_shapes
                .get(&fragment_name)
                .map(|cached| cached.flats.clone())
                .unwrap_or_default();
            let reference =
                FragmentRefShape::new(&fragment_name, abstract_name, abstract_name);
            return Ok(RootCompile {
                shape: Shape::FragmentRef(reference),
                flats,
            });
        }

        // Fast path: exactly one spread per distinct concrete type and
        // nothing else becomes a union of fragment references plus a
        // catch-all empty branch.
        if parts.base_fields.is_empty()
            && parts.base_spreads.is_empty()
            && !parts.has_inline
            && !parts.overlays.is_empty()
            && parts
                .overlays
                .values()
                .all(|overlay| overlay.spreads.len() == 1 && overlay.inline_sets.is_empty())
        {
            return self.compile_spread_union(abstract_name, &possible, &parts);
        }

        self.compile_abstract_general(abstract_name, &possible, &parts)
    }

    fn classify_abstract(
        &mut self,
        abstract_name: &str,
        selection_set: &'a parsed_query::SelectionSet<'a, ParsedText>,
        possible: &[String],
        parts: &mut AbstractParts<'a>,
    ) -> Result<()> {
        for selection in &selection_set.items {
            match selection {
                parsed_query::Selection::Field(selection_field) => {
                    parts.base_fields.push(selection_field);
                }
                parsed_query::Selection::InlineFragment(inline) => {
                    let condition = match &inline.type_condition {
                        Some(parsed_query::TypeCondition::On(condition)) => condition.as_str(),
                        None => abstract_name,
                    };
                    if condition == abstract_name {
                        self.classify_abstract(
                            abstract_name,
                            &inline.selection_set,
                            possible,
                            parts,
                        )?;
                        continue;
                    }
                    let targets = self.condition_targets(condition, possible, inline.position)?;
                    for target in targets {
                        parts
                            .overlays
                            .entry(target)
                            .or_default()
                            .inline_sets
                            .push(&inline.selection_set);
                        parts.has_inline = true;
                    }
                }
                parsed_query::Selection::FragmentSpread(spread) => {
                    let fragment_name = spread.fragment_name.as_str();
                    self.tracker.add_fragment_use(fragment_name)?;
                    let source = self.fragments.get(fragment_name).copied().ok_or_else(|| {
                        self.err(ErrorKind::FragmentNotFound {
                            name: fragment_name.to_string(),
                            position: Some(spread.position),
                            available: self.known_fragment_names(),
                        })
                    })?;
                    let parsed_query::TypeCondition::On(condition) =
                        &source.definition.type_condition;
                    if condition == abstract_name {
                        parts
                            .base_spreads
                            .push((fragment_name.to_string(), spread.position));
                        continue;
                    }
                    let targets = self.condition_targets(condition, possible, spread.position)?;
                    for target in targets {
                        parts
                            .overlays
                            .entry(target)
                            .or_default()
                            .spreads
                            .push((fragment_name.to_string(), spread.position));
                    }
                }
            }
        }
        Ok(())
    }

    /// Concrete types of `possible` that a type condition narrows to,
    /// following transitively-implied implements relations. An empty result
    /// warns: the condition can never match here.
    fn condition_targets(
        &mut self,
        condition: &str,
        possible: &[String],
        position: Pos,
    ) -> Result<Vec<String>> {
        let condition_type = self.get_type(condition)?;
        let targets: Vec<String> = if condition_type.definition.is_abstract() {
            possible
                .iter()
                .filter(|concrete| self.index.object_implements(concrete, condition))
                .cloned()
                .collect()
        } else {
            possible
                .iter()
                .filter(|concrete| concrete.as_str() == condition)
                .cloned()
                .collect()
        };
        if targets.is_empty() {
            self.push_warning(Warning::FragmentNarrowing {
                position,
                possible_types: possible.to_vec(),
                spread_type_name: condition.to_string(),
            });
        }
        Ok(targets)
    }

    fn compile_spread_union(
        &mut self,
        abstract_name: &str,
        possible: &[String],
        parts: &AbstractParts<'a>,
    ) -> Result<RootCompile> {
        let mut branches = Vec::with_capacity(parts.overlays.len() + 1);
        let mut flats = BTreeMap::new();
        for (concrete_name, overlay) in &parts.overlays {
            let (fragment_name, position) = overlay.spreads[0].clone();
            self.ensure_fragment(&fragment_name, position)?;
            let fragment_flat = self
                .fragment_shapes
                .get(&fragment_name)
                .and_then(|cached| cached.flats.get(concrete_name))
                .cloned()
                .unwrap_or_default();
            flats.insert(concrete_name.clone(), fragment_flat);
            let reference = FragmentRefShape::new(&fragment_name, concrete_name, concrete_name);
            branches.push(Shape::FragmentRef(reference));
        }
        let untargeted: Vec<&String> = possible
            .iter()
            .filter(|concrete| !parts.overlays.contains_key(*concrete))
            .collect();
        if !untargeted.is_empty() {
            // Catch-all for any type no spread narrowed to
            branches.push(Shape::Object(ObjectShape::new(abstract_name)));
            for concrete in untargeted {
                flats.insert(concrete.clone(), FieldMap::new());
            }
        }
        let shape = collapse_branches(abstract_name, branches);
        Ok(RootCompile { shape, flats })
    }

    fn compile_abstract_general(
        &mut self,
        abstract_name: &str,
        possible: &[String],
        parts: &AbstractParts<'a>,
    ) -> Result<RootCompile> {
        let base_map = self.abstract_base_map(abstract_name, parts)?;

        if possible.is_empty() {
            // No concrete implementors registered: an empty object over the
            // abstract type itself
            let shape = self.resolve_object(ObjectShape {
                concrete_type: abstract_name.to_string(),
                fields: base_map,
            })?;
            return Ok(RootCompile {
                shape,
                flats: BTreeMap::new(),
            });
        }

        let targeted: BTreeSet<String> = parts
            .overlays
            .keys()
            .filter(|name| possible.contains(name))
            .cloned()
            .collect();
        let fallback: Vec<String> = possible
            .iter()
            .filter(|name| !targeted.contains(*name))
            .cloned()
            .collect();
        let base_has_discriminant = base_map
            .values()
            .any(|field| matches!(field.shape, Shape::Discriminant(_)));
        let needs_discriminant = base_has_discriminant || self.config.always_emit_typename;
        let fallback_discriminant = if needs_discriminant && !fallback.is_empty() {
            Some(self.fallback_discriminant(abstract_name, &targeted, &fallback)?)
        } else {
            None
        };

        let mut branches = Vec::with_capacity(possible.len());
        let mut flats = BTreeMap::new();
        for concrete_name in possible {
            let mut object = ObjectShape {
                concrete_type: concrete_name.clone(),
                fields: base_map.clone(),
            };
            for field in object.fields.values_mut() {
                if let Shape::FragmentRef(reference) = &mut field.shape {
                    reference.parent_type = concrete_name.clone();
                }
            }
            let branch_discriminant = if targeted.contains(concrete_name) {
                DiscriminantShape::single(concrete_name.clone())
            } else {
                fallback_discriminant
                    .clone()
                    .unwrap_or_else(|| DiscriminantShape::single(concrete_name.clone()))
            };
            for field in object.fields.values_mut() {
                if let Shape::Discriminant(existing) = &mut field.shape {
                    *existing = branch_discriminant.clone();
                }
            }
            if let Some(overlay) = parts.overlays.get(concrete_name) {
                for inline_set in &overlay.inline_sets {
                    self.collect_concrete(&mut object, concrete_name, inline_set)?;
                }
                for (fragment_name, position) in &overlay.spreads {
                    let source = self.fragments.get(fragment_name).copied().ok_or_else(|| {
                        self.err(ErrorKind::FragmentNotFound {
                            name: fragment_name.clone(),
                            position: Some(*position),
                            available: self.known_fragment_names(),
                        })
                    })?;
                    let parsed_query::TypeCondition::On(condition) =
                        &source.definition.type_condition;
                    let condition = condition.clone();
                    self.insert_spread(&mut object, fragment_name, &condition, *position)?;
                }
            }
            if self.config.always_emit_typename && !object.has_discriminant() {
                object.insert_field(
                    "__typename".to_string(),
                    FieldShape::new(Shape::Discriminant(
                        branch_discriminant.clone().mark_synthesized(),
                    )),
                )?;
                self.add_discriminant_deps(&branch_discriminant, true)?;
            } else if object.has_discriminant() {
                self.add_discriminant_deps(&branch_discriminant, false)?;
            }
            flats.insert(
                concrete_name.clone(),
                self.flatten_map(&object.fields, concrete_name)?,
            );
            branches.push(self.resolve_object(object)?);
        }
        let shape = collapse_branches(abstract_name, branches);
        Ok(RootCompile { shape, flats })
    }

    /// The shared discriminant for every untargeted type: an exclusion
    /// literal once enough types fall through, else the explicit list of
    /// just the fallback names.
    fn fallback_discriminant(
        &mut self,
        abstract_name: &str,
        targeted: &BTreeSet<String>,
        fallback: &[String],
    ) -> Result<DiscriminantShape> {
        if fallback.len() >= EXCLUSION_MIN_FALLBACKS && fallback.len() > targeted.len() {
            Ok(DiscriminantShape::excluding(
                abstract_name,
                targeted.iter().cloned(),
            ))
        } else {
            Ok(DiscriminantShape::of_names(fallback.iter().cloned()))
        }
    }

    fn add_discriminant_deps(
        &mut self,
        discriminant: &DiscriminantShape,
        synthesized: bool,
    ) -> Result<()> {
        if let Some(abstract_name) = &discriminant.exclude_from {
            self.tracker.add(DepKey::Artifact(
                ArtifactKind::DiscriminantUnion,
                abstract_name.clone(),
            ))?;
        } else if synthesized && discriminant.names.len() == 1 {
            let name = discriminant.names.iter().next().unwrap().clone();
            self.tracker
                .add(DepKey::Artifact(ArtifactKind::DiscriminantLiteral, name))?;
        }
        Ok(())
    }

    /// Interface-level fields plus spreads conditioned on the abstract type
    /// itself. Discriminant values are cleared here; every branch assigns
    /// its own.
    fn abstract_base_map(
        &mut self,
        abstract_name: &str,
        parts: &AbstractParts<'a>,
    ) -> Result<FieldMap> {
        let mut object = ObjectShape::new(abstract_name);
        for selection_field in &parts.base_fields {
            self.insert_concrete_field(&mut object, abstract_name, selection_field)?;
        }
        for field in object.fields.values_mut() {
            if let Shape::Discriminant(discriminant) = &mut field.shape {
                discriminant.names.clear();
            }
        }
        for (fragment_name, position) in &parts.base_spreads {
            self.insert_spread(&mut object, fragment_name, abstract_name, *position)?;
        }
        Ok(object.fields)
    }

    // ---- fragments ----

    /// Lazy generate-on-first-use with an in-flight marker: re-entering a
    /// fragment still being compiled is a self-referential spread chain and
    /// fails fast instead of recursing.
    fn ensure_fragment(&mut self, name: &str, position: Pos) -> Result<()> {
        if let Some(cached) = self.fragment_shapes.done.get(name) {
            let dependencies = cached.dependencies.clone();
            let file = cached.file.clone();
            self.tracker.merge(&dependencies, Some(&file))?;
            self.add_fragment_keys(name)?;
            return Ok(());
        }
        if self.fragment_shapes.in_progress.contains(name) {
            return Err(self.err(ErrorKind::Logic {
                message: format!("circular fragment reference involving `{name}`"),
            }));
        }
        let source = self.fragments.get(name).copied().ok_or_else(|| {
            self.err(ErrorKind::FragmentNotFound {
                name: name.to_string(),
                position: Some(position),
                available: self.known_fragment_names(),
            })
        })?;
        self.fragment_shapes.in_progress.insert(name.to_string());
        let file = source.file.to_string();
        self.tracker.start(Some(&file));
        let compiled = self.compile_fragment_source(source);
        let scope = self.tracker.end();
        self.fragment_shapes.in_progress.remove(name);
        let (shape, flats, condition_type) = compiled?;
        let dependencies = scope?;
        self.fragment_shapes.done.insert(
            name.to_string(),
            CachedFragment {
                shape,
                flats,
                condition_type,
                file,
                dependencies,
            },
        );
        self.add_fragment_keys(name)
    }

    fn add_fragment_keys(&mut self, name: &str) -> Result<()> {
        self.tracker.add(DepKey::Fragment(name.to_string()))?;
        self.tracker.add(DepKey::Artifact(
            ArtifactKind::Fragment,
            name.to_string(),
        ))
    }

    fn compile_fragment_source(
        &mut self,
        source: FragmentSource<'a>,
    ) -> Result<(Shape, BTreeMap<String, FieldMap>, String)> {
        let parsed_query::TypeCondition::On(condition) = &source.definition.type_condition;
        let root = self.compile_root(condition, &source.definition.selection_set)?;
        Ok((root.shape, root.flats, condition.clone()))
    }

    /// Fully inline a field map for one concrete type: synthetic spread
    /// keys are replaced by the spread fragment's own flat map.
    fn flatten_map(&mut self, fields: &FieldMap, concrete_type: &str) -> Result<FieldMap> {
        let mut flat = FieldMap::new();
        for (key, field) in fields {
            if is_spread_key(key) {
                let reference = match &field.shape {
                    Shape::FragmentRef(reference) => reference,
                    other => {
                        return Err(self.err(ErrorKind::Logic {
                            message: format!(
                                "synthetic spread key held a {} shape",
                                other.kind_name()
                            ),
                        }));
                    }
                };
                let fragment_fields = self
                    .fragment_shapes
                    .get(&reference.fragment)
                    .and_then(|cached| cached.flats.get(concrete_type))
                    .cloned()
                    .unwrap_or_default();
                for (fragment_key, fragment_field) in fragment_fields {
                    merge_into_map(&mut flat, fragment_key, fragment_field)?;
                }
            } else {
                merge_into_map(&mut flat, key.clone(), field.clone())?;
            }
        }
        Ok(flat)
    }
}

fn merge_into_map(map: &mut FieldMap, key: String, field: FieldShape) -> Result<()> {
    match map.remove(&key) {
        Some(existing) => {
            let merged = existing.merge(field)?;
            map.insert(key, merged);
        }
        None => {
            map.insert(key, field);
        }
    }
    Ok(())
}

fn collapse_branches(abstract_name: &str, branches: Vec<Shape>) -> Shape {
    match branches.len() {
        0 => Shape::Object(ObjectShape::new(abstract_name)),
        1 => branches.into_iter().next().unwrap(),
        _ => Shape::Union(UnionShape { branches }),
    }
}
