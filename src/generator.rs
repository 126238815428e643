//! The incremental generator: owns the input documents, the derived caches
//! and the artifact registry, and keeps them consistent across
//! add/update/remove/build.
use crate::artifact::{Artifact, ArtifactKind, ArtifactStore};
use crate::deps::{DepKey, DepSet, DependencyTracker, MemoCache};
use crate::emit::{self, EmittedRefs};
use crate::error::{Error, ErrorKind, Result};
use crate::ir::compile::{
    self, FileWarning, FragmentShapeCache, FragmentSource, ParsedText, SelectionCompiler,
};
use crate::ir::Shape;
use crate::schema::field::ScalarType;
use crate::schema::index::TypeIndex;
use crate::schema::{Schema, TypeDefinition};
use graphql_parser::query as parsed_query;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub enum BottomTypeConfig {
    UseBottomType,
    UseRealName,
    UseRealNameWithPrefix(String),
}

/// Naming and mapping hooks, resolved once at construction.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub bottom_type_config: BottomTypeConfig,
    pub always_emit_typename: bool,
    pub show_deprecation_warnings: bool,
    /// Template for list types, e.g. `ReadonlyArray<{}>`. `{}` marks where
    /// the element type goes.
    pub list_type_template: Option<String>,
    pub memoize: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            bottom_type_config: BottomTypeConfig::UseBottomType,
            always_emit_typename: false,
            show_deprecation_warnings: false,
            list_type_template: None,
            memoize: true,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(template) = &self.list_type_template {
            if !template.contains("{}") {
                return Err(Error::invalid_option(format!(
                    "list type template `{template}` is missing its `{{}}` substitution point"
                )));
            }
        }
        Ok(())
    }

    pub fn scalar_type_expr(&self, scalar: &ScalarType) -> String {
        match scalar {
            ScalarType::Boolean => "boolean".to_string(),
            ScalarType::String | ScalarType::ID => "string".to_string(),
            ScalarType::Float | ScalarType::Int => "number".to_string(),
            ScalarType::Custom(name) => match &self.bottom_type_config {
                BottomTypeConfig::UseBottomType => "any".to_string(),
                BottomTypeConfig::UseRealName => name.clone(),
                BottomTypeConfig::UseRealNameWithPrefix(prefix) => format!("{prefix}{name}"),
            },
        }
    }

    pub fn list_expr(&self, inner: &str) -> String {
        match &self.list_type_template {
            Some(template) => template.replace("{}", inner),
            None => format!("({inner})[]"),
        }
    }
}

#[derive(Debug)]
pub struct BuildReport {
    pub warnings: Vec<FileWarning>,
}

#[derive(Debug)]
struct InputFile {
    source: String,
}

#[derive(Debug)]
pub struct Generator {
    schema: Schema,
    index: TypeIndex,
    config: GeneratorConfig,
    files: BTreeMap<String, InputFile>,
    artifacts: ArtifactStore,
    memo: MemoCache<Shape>,
    fragment_shapes: FragmentShapeCache,
    tracker: DependencyTracker,
}

impl Generator {
    pub fn new(schema: Schema, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let index = TypeIndex::new(&schema);
        let memoize = config.memoize;
        Ok(Generator {
            schema,
            index,
            config,
            files: BTreeMap::new(),
            artifacts: ArtifactStore::new(),
            memo: MemoCache::new(memoize),
            fragment_shapes: FragmentShapeCache::new(),
            tracker: DependencyTracker::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Replacing the schema invalidates everything derived; the index is
    /// rebuilt wholesale.
    pub fn replace_schema(&mut self, schema: Schema) {
        self.index = TypeIndex::new(&schema);
        self.schema = schema;
        self.reset_derived_state();
    }

    pub fn add(&mut self, file_id: &str, source: &str) -> Result<()> {
        if self.files.contains_key(file_id) {
            return Err(Error::new(ErrorKind::DuplicateInputDocument {
                file: file_id.to_string(),
            })
            .with_file(Some(file_id)));
        }
        Self::check_parses(file_id, source)?;
        self.files.insert(
            file_id.to_string(),
            InputFile {
                source: source.to_string(),
            },
        );
        Ok(())
    }

    pub fn update(&mut self, file_id: &str, source: &str) -> Result<()> {
        Self::check_parses(file_id, source)?;
        self.purge_file(file_id);
        self.files.insert(
            file_id.to_string(),
            InputFile {
                source: source.to_string(),
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, file_id: &str) -> Result<()> {
        self.purge_file(file_id);
        self.files.remove(file_id);
        Ok(())
    }

    fn check_parses(file_id: &str, source: &str) -> Result<()> {
        graphql_parser::parse_query::<ParsedText>(source)
            .map(|_| ())
            .map_err(|error| {
                Error::new(ErrorKind::DocumentParse {
                    message: error.to_string(),
                })
                .with_file(Some(file_id))
            })
    }

    /// Evict every derived entry originating from the file or depending on
    /// it; raw input documents stay.
    fn purge_file(&mut self, file_id: &str) {
        self.artifacts.purge_file(file_id);
        self.memo.purge_file(file_id);
        self.fragment_shapes.purge_file(file_id);
    }

    fn reset_derived_state(&mut self) {
        self.artifacts.clear();
        self.memo.clear();
        self.fragment_shapes.clear();
        self.tracker.reset();
    }

    /// Compile every registered document into artifacts. Any error leaves
    /// the generator with its derived state purged but its inputs intact,
    /// so a retry after a fix starts clean.
    pub fn build(&mut self) -> Result<BuildReport> {
        match self.build_inner() {
            Ok(report) => Ok(report),
            Err(error) => {
                self.reset_derived_state();
                Err(error)
            }
        }
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn artifact(&self, kind: ArtifactKind, name: &str) -> Option<&Artifact> {
        self.artifacts.get(kind, name)
    }

    pub fn dependencies_of(&self, kind: ArtifactKind, name: &str) -> Option<&DepSet> {
        self.artifacts.dependencies_of(kind, name)
    }

    /// The source text behind an artifact. Only this view requires location
    /// metadata; compilation never does.
    pub fn artifact_source(&self, kind: ArtifactKind, name: &str) -> Result<String> {
        let artifact = self.artifacts.get(kind, name).ok_or_else(|| {
            Error::logic(format!("no artifact `{}:{name}`", kind.as_str()))
        })?;
        match &artifact.source_snippet {
            Some(snippet) => Ok(snippet.clone()),
            None => Err(Error::new(ErrorKind::NodeLocMissing {
                name: artifact.identifier(),
            })),
        }
    }

    fn build_inner(&mut self) -> Result<BuildReport> {
        let Generator {
            schema,
            index,
            config,
            files,
            artifacts,
            memo,
            fragment_shapes,
            tracker,
        } = self;
        let schema: &Schema = schema;
        let index: &TypeIndex = index;
        let config: &GeneratorConfig = config;
        let files: &BTreeMap<String, InputFile> = files;

        let mut documents = Vec::with_capacity(files.len());
        for (file_id, input) in files.iter() {
            let document =
                graphql_parser::parse_query::<ParsedText>(&input.source).map_err(|error| {
                    Error::new(ErrorKind::DocumentParse {
                        message: error.to_string(),
                    })
                    .with_file(Some(file_id))
                })?;
            documents.push((file_id.as_str(), document));
        }

        let mut fragment_sources: HashMap<String, FragmentSource<'_>> = HashMap::new();
        for &(file_id, ref document) in &documents {
            for definition in &document.definitions {
                if let parsed_query::Definition::Fragment(fragment) = definition {
                    fragment_sources.insert(
                        fragment.name.clone(),
                        FragmentSource {
                            definition: fragment,
                            file: file_id,
                        },
                    );
                }
            }
        }

        let mut compiler = SelectionCompiler::new(
            schema,
            index,
            config,
            &fragment_sources,
            tracker,
            memo,
            fragment_shapes,
        );

        for &(file_id, ref document) in &documents {
            let snippet = files
                .get(file_id)
                .map(|input| input.source.trim().to_string());
            for definition in &document.definitions {
                match definition {
                    parsed_query::Definition::Operation(operation) => {
                        let name = compile::operation_name(operation).ok_or_else(|| {
                            Error::logic("plain selection sets are not supported as operations")
                                .with_file(Some(file_id))
                        })?;
                        if artifacts.contains(ArtifactKind::Operation, &name) {
                            continue;
                        }
                        let (compiled, mut dependencies) =
                            compiler.compile_operation_artifact(file_id, operation)?;
                        let emitted =
                            emit::shape::emit_definition(config, &compiled.name, &compiled.shape);
                        let mut refs = emitted.refs;
                        let mut variables_text = None;
                        if !compiled.variables.is_empty() {
                            let variables_emitted = emit::shape::emit_variables(
                                config,
                                &compiled.name,
                                &compiled.variables,
                            );
                            refs.absorb(variables_emitted.refs);
                            variables_text = Some(variables_emitted.text);
                        }
                        extend_emission_deps(&mut dependencies, &refs);
                        let text = format!(
                            "{}{}",
                            import_block(&refs, None),
                            emitted.text
                        );
                        artifacts.insert(Artifact {
                            kind: ArtifactKind::Operation,
                            name: name.clone(),
                            text,
                            source_file: Some(file_id.to_string()),
                            source_snippet: snippet.clone(),
                            dependencies: dependencies.clone(),
                        });
                        if let Some(text) = variables_text {
                            artifacts.insert(Artifact {
                                kind: ArtifactKind::OperationVariables,
                                name: format!("{name}Variables"),
                                text,
                                source_file: Some(file_id.to_string()),
                                source_snippet: snippet.clone(),
                                dependencies,
                            });
                        }
                    }
                    parsed_query::Definition::Fragment(fragment) => {
                        if artifacts.contains(ArtifactKind::Fragment, &fragment.name) {
                            continue;
                        }
                        let (shape, mut dependencies) = compiler
                            .compile_fragment_artifact(&fragment.name, fragment.position)
                            .map_err(|error| error.with_file(Some(file_id)))?;
                        let emitted =
                            emit::shape::emit_definition(config, &fragment.name, &shape);
                        extend_emission_deps(&mut dependencies, &emitted.refs);
                        let text = format!(
                            "{}{}",
                            import_block(&emitted.refs, Some(&fragment.name)),
                            emitted.text
                        );
                        artifacts.insert(Artifact {
                            kind: ArtifactKind::Fragment,
                            name: fragment.name.clone(),
                            text,
                            source_file: Some(file_id.to_string()),
                            source_snippet: snippet.clone(),
                            dependencies,
                        });
                    }
                }
            }
        }

        let warnings = compiler.take_warnings();
        drop(compiler);
        tracker.assert_balanced()?;
        rebuild_globals(schema, index, config, artifacts)?;
        Ok(BuildReport { warnings })
    }
}

fn extend_emission_deps(dependencies: &mut DepSet, refs: &EmittedRefs) {
    for abstract_name in &refs.discriminant_unions {
        dependencies.insert(DepKey::Artifact(
            ArtifactKind::DiscriminantUnion,
            abstract_name.clone(),
        ));
    }
    for concrete_name in &refs.discriminant_literals {
        dependencies.insert(DepKey::Artifact(
            ArtifactKind::DiscriminantLiteral,
            concrete_name.clone(),
        ));
    }
    if refs.uses_omit {
        dependencies.insert(DepKey::Artifact(
            ArtifactKind::TypeHelper,
            emit::globals::OMIT_HELPER_NAME.to_string(),
        ));
    }
}

fn import_block(refs: &EmittedRefs, own_fragment: Option<&str>) -> String {
    let mut lines = Vec::new();
    let global_names = refs.global_import_names();
    if !global_names.is_empty() {
        lines.push(format!(
            "import {{ {} }} from \"__generated__/globalTypes\";",
            global_names.join(", ")
        ));
    }
    for fragment in &refs.fragments {
        if own_fragment == Some(fragment.as_str()) {
            continue;
        }
        lines.push(format!(
            "import {{ {fragment} }} from \"__generated__/{fragment}\";"
        ));
    }
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n\n", lines.join("\n"))
    }
}

/// Re-derive every global-kind artifact from the union of the live
/// artifacts' dependency keys. Their text is a pure function of (kind,
/// name, schema), which is what makes skipping cached operations sound.
fn rebuild_globals(
    schema: &Schema,
    index: &TypeIndex,
    config: &GeneratorConfig,
    artifacts: &mut ArtifactStore,
) -> Result<()> {
    artifacts.purge_globals();
    let mut enums: BTreeSet<String> = BTreeSet::new();
    let mut inputs: BTreeSet<String> = BTreeSet::new();
    let mut unions: BTreeSet<String> = BTreeSet::new();
    let mut literals: BTreeSet<String> = BTreeSet::new();
    let mut need_omit = false;
    for artifact in artifacts.iter() {
        for dependency in &artifact.dependencies {
            if let DepKey::Artifact(kind, name) = dependency {
                match kind {
                    ArtifactKind::Enum => {
                        enums.insert(name.clone());
                    }
                    ArtifactKind::InputType => {
                        inputs.insert(name.clone());
                    }
                    ArtifactKind::DiscriminantUnion => {
                        unions.insert(name.clone());
                    }
                    ArtifactKind::DiscriminantLiteral => {
                        literals.insert(name.clone());
                    }
                    ArtifactKind::TypeHelper => {
                        need_omit = true;
                    }
                    _ => {}
                }
            }
        }
    }

    let mut all_inputs: BTreeSet<String> = BTreeSet::new();
    let mut all_enums = enums;
    for name in &inputs {
        emit::globals::collect_input_references(schema, name, &mut all_inputs, &mut all_enums)?;
    }

    for name in all_enums {
        let schema_type = schema.get_type(&name).ok_or_else(|| {
            Error::new(ErrorKind::TypeNotFound { name: name.clone() })
        })?;
        let enum_type = match &schema_type.definition {
            TypeDefinition::Enum(enum_type) => enum_type,
            _ => {
                return Err(Error::logic(format!(
                    "`{name}` referenced as an enum but is not one"
                )))
            }
        };
        let text = emit::globals::enum_declaration(schema_type, enum_type);
        artifacts.insert(global_artifact(ArtifactKind::Enum, name, text));
    }
    for name in all_inputs {
        let schema_type = schema.get_type(&name).ok_or_else(|| {
            Error::new(ErrorKind::TypeNotFound { name: name.clone() })
        })?;
        let input_type = match &schema_type.definition {
            TypeDefinition::InputObject(input_type) => input_type,
            _ => {
                return Err(Error::logic(format!(
                    "`{name}` referenced as an input object but is not one"
                )))
            }
        };
        let text = emit::globals::input_declaration(config, &name, input_type)?;
        artifacts.insert(global_artifact(ArtifactKind::InputType, name, text));
    }
    for name in unions {
        let text = emit::globals::discriminant_union_declaration(index, &name);
        artifacts.insert(global_artifact(ArtifactKind::DiscriminantUnion, name, text));
    }
    for name in literals {
        let text = emit::globals::discriminant_literal_declaration(&name);
        artifacts.insert(global_artifact(
            ArtifactKind::DiscriminantLiteral,
            name,
            text,
        ));
    }
    if need_omit {
        artifacts.insert(global_artifact(
            ArtifactKind::TypeHelper,
            emit::globals::OMIT_HELPER_NAME.to_string(),
            emit::globals::omit_helper_declaration(),
        ));
    }
    Ok(())
}

fn global_artifact(kind: ArtifactKind, name: String, text: String) -> Artifact {
    let mut dependencies = DepSet::new();
    dependencies.insert(DepKey::SchemaType(name.clone()));
    Artifact {
        kind,
        name,
        text,
        source_file: None,
        source_snippet: None,
        dependencies,
    }
}
