//! Batch harness: walk a directory, feed every document into one
//! generator, build, and write the generated files.
use crate::artifact::{Artifact, ArtifactKind};
use crate::cli::{self, PrintableMessage, RuntimeConfig};
use crate::emit;
use crate::generator::Generator;
use crate::ir::compile::{FileWarning, Warning};
use crate::schema::Schema;
use crate::worker_pool::WorkerPool;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub fn run(config: &RuntimeConfig) -> i32 {
    let schema_path = config.schema_file_path();
    let file = match File::open(&schema_path) {
        Ok(file) => file,
        Err(io_error) => {
            eprintln!(
                "{}",
                PrintableMessage::new_compile_error_from_read_io_error(&io_error, &schema_path)
            );
            return 1;
        }
    };
    let schema = match Schema::from_reader(BufReader::new(file)) {
        Ok(schema) => schema,
        Err(schema_error) => {
            eprintln!("error: malformed schema: {schema_error}");
            return 1;
        }
    };
    let mut generator = match Generator::new(schema, config.generator_config()) {
        Ok(generator) => generator,
        Err(error) => {
            eprintln!("{}", PrintableMessage::new_simple_program_error(&error.to_string()));
            return 1;
        }
    };

    let pool = WorkerPool::new(config.thread_count() as usize);
    let (sources, mut messages) = pool.work(&config.root_dir_path());

    let mut file_table: BTreeMap<String, (PathBuf, String)> = BTreeMap::new();
    for (path, contents) in sources {
        let file_id = path.display().to_string();
        if let Err(error) = generator.add(&file_id, &contents) {
            messages.push(cli::printable_from_compile_error(&error, |id| {
                file_table
                    .get(id)
                    .cloned()
                    .or_else(|| Some((path.clone(), contents.clone())))
            }));
            continue;
        }
        file_table.insert(file_id, (path, contents));
    }

    match generator.build() {
        Ok(report) => {
            for file_warning in &report.warnings {
                messages.push(printable_from_warning(file_warning, &file_table));
            }
            messages.extend(write_artifacts(&generator, &file_table, config));
        }
        Err(error) => {
            let lookup = |id: &str| file_table.get(id).cloned();
            messages.push(cli::printable_from_compile_error(&error, lookup));
        }
    }

    cli::print_messages(&messages)
}

fn printable_from_warning(
    file_warning: &FileWarning,
    file_table: &BTreeMap<String, (PathBuf, String)>,
) -> PrintableMessage {
    let source = file_table.get(&file_warning.file);
    match &file_warning.warning {
        Warning::FragmentNarrowing {
            position,
            possible_types,
            spread_type_name,
        } => {
            let summary = format!("fragment over narrowing with type `{spread_type_name}`");
            let help = format!(
                "The parent types of this spread are limited to `{}`, making spreading `{spread_type_name}` unneeded.",
                possible_types.join("`, `"),
            );
            match source {
                Some((path, contents)) => PrintableMessage::new_compile_warning(
                    &summary,
                    path,
                    contents,
                    position,
                    Some(&help),
                ),
                None => PrintableMessage::new_simple_compile_error(&summary),
            }
        }
        Warning::DeprecatedFieldUse {
            position,
            field_name,
            parent_type_name,
        } => {
            let summary = format!(
                "use of deprecated field `{field_name}` on type `{parent_type_name}`"
            );
            match source {
                Some((path, contents)) => {
                    PrintableMessage::new_compile_warning(&summary, path, contents, position, None)
                }
                None => PrintableMessage::new_simple_compile_error(&summary),
            }
        }
    }
}

fn makedir_p(path: &Path) -> Result<(), PrintableMessage> {
    match std::fs::create_dir(path) {
        Ok(_) => Ok(()),
        Err(ref io_error) if io_error.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(io_error) => Err(PrintableMessage::new_compile_error_from_write_io_error(
            &io_error, path,
        )),
    }
}

fn generated_dir_for(source_path: &Path) -> PathBuf {
    let mut dir = source_path.to_path_buf();
    dir.pop();
    dir.push("__generated__");
    dir
}

fn write_generated_file(dir: &Path, name: &str, body: &str) -> Result<(), PrintableMessage> {
    makedir_p(dir)?;
    let mut path = dir.to_path_buf();
    path.push(format!("{name}.ts"));
    let contents = format!("{}{}\n", emit::HEADER, body);
    std::fs::write(&path, contents)
        .map_err(|io_error| PrintableMessage::new_compile_error_from_write_io_error(&io_error, &path))
}

fn write_artifacts(
    generator: &Generator,
    file_table: &BTreeMap<String, (PathBuf, String)>,
    config: &RuntimeConfig,
) -> Vec<PrintableMessage> {
    let mut messages = Vec::new();
    let mut globals: Vec<&Artifact> = Vec::new();
    for artifact in generator.artifacts() {
        match artifact.kind {
            ArtifactKind::Operation | ArtifactKind::Fragment => {
                let source_path = artifact
                    .source_file
                    .as_ref()
                    .and_then(|file_id| file_table.get(file_id))
                    .map(|(path, _)| path.clone());
                let Some(source_path) = source_path else {
                    continue;
                };
                let mut body = artifact.text.clone();
                if artifact.kind == ArtifactKind::Operation {
                    if let Some(variables) = generator
                        .artifact(
                            ArtifactKind::OperationVariables,
                            &format!("{}Variables", artifact.name),
                        )
                    {
                        body.push_str("\n\n");
                        body.push_str(&variables.text);
                    }
                }
                let dir = generated_dir_for(&source_path);
                if let Err(message) = write_generated_file(&dir, &artifact.name, &body) {
                    messages.push(message);
                }
            }
            _ => {
                if artifact.kind.is_global() {
                    globals.push(artifact);
                }
            }
        }
    }
    if !globals.is_empty() {
        globals.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        let body = globals
            .iter()
            .map(|artifact| artifact.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let root_dir = config.root_dir_path().join("__generated__");
        if let Err(message) = write_generated_file(&root_dir, "globalTypes", &body) {
            messages.push(message);
        }
    }
    messages
}
