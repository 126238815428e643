//! CLI surface: argument/config-file resolution and colored, source-located
//! message rendering.
use crate::error::{Error as CompileError, ErrorKind};
use crate::generator::{BottomTypeConfig, GeneratorConfig};
use clap::Parser;
use colored::Colorize;
use graphql_parser::Pos;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

const RC_FILE_NAME: &str = ".qtcrc.json";

#[derive(Parser, Debug)]
#[command(
    name = "qtc",
    version,
    about = "\nQuery Type Compiler (qtc) generates TypeScript type declarations from GraphQL documents and schema introspection JSON."
)]
struct CliArgs {
    /// Directory to recursively compile
    #[arg(value_name = "DIR", default_value = ".")]
    root_dir: PathBuf,
    /// Path of schema introspection JSON file (defaults to DIR/schema.json)
    #[arg(short = 's', long = "schema-file", value_name = "FILE")]
    schema_file: Option<PathBuf>,
    /// Use schema-defined names for custom scalars instead of `any`
    #[arg(long)]
    use_custom_scalars: bool,
    /// Prefix custom scalar names to keep them unique
    #[arg(long, value_name = "PREFIX", requires = "use_custom_scalars")]
    custom_scalar_prefix: Option<String>,
    /// Emit a `__typename` field even where none was selected
    #[arg(long)]
    always_emit_typename: bool,
    /// Warn on use of deprecated schema fields
    #[arg(long)]
    show_deprecation_warnings: bool,
    /// Disable the selection memoization cache
    #[arg(long)]
    no_cache: bool,
    /// Sets the number of threads (defaults to number of CPU cores)
    #[arg(long = "num-threads", value_name = "NUMBER")]
    num_threads: Option<u8>,
}

/// Project-level defaults; CLI flags override.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RcFile {
    schema_file: Option<PathBuf>,
    use_custom_scalars: Option<bool>,
    custom_scalar_prefix: Option<String>,
    always_emit_typename: Option<bool>,
    show_deprecation_warnings: Option<bool>,
    list_type_template: Option<String>,
    num_threads: Option<u8>,
}

/// User configured runtime configuration
#[derive(Debug)]
pub struct RuntimeConfig {
    root_dir: PathBuf,
    schema_path: PathBuf,
    number_threads: u8,
    generator: GeneratorConfig,
}

impl RuntimeConfig {
    pub fn from_cli() -> Result<Self, PrintableMessage> {
        let args = CliArgs::parse();
        let rc_path = args.root_dir.join(RC_FILE_NAME);
        let rc_file = match std::fs::read(&rc_path) {
            Ok(contents) => serde_json::from_slice::<RcFile>(&contents).map_err(|_| {
                PrintableMessage::new_simple_program_error(&format!(
                    "error in config file `{}`",
                    rc_path.display()
                ))
            })?,
            Err(_) => RcFile::default(),
        };

        let schema_path = args
            .schema_file
            .or(rc_file.schema_file)
            .unwrap_or_else(|| args.root_dir.join("schema.json"));
        let use_custom_scalars =
            args.use_custom_scalars || rc_file.use_custom_scalars.unwrap_or(false);
        let custom_scalar_prefix = args.custom_scalar_prefix.or(rc_file.custom_scalar_prefix);
        let bottom_type_config = match (use_custom_scalars, custom_scalar_prefix) {
            (false, _) => BottomTypeConfig::UseBottomType,
            (true, None) => BottomTypeConfig::UseRealName,
            (true, Some(prefix)) => BottomTypeConfig::UseRealNameWithPrefix(prefix),
        };
        let generator = GeneratorConfig {
            bottom_type_config,
            always_emit_typename: args.always_emit_typename
                || rc_file.always_emit_typename.unwrap_or(false),
            show_deprecation_warnings: args.show_deprecation_warnings
                || rc_file.show_deprecation_warnings.unwrap_or(false),
            list_type_template: rc_file.list_type_template,
            memoize: !args.no_cache,
        };
        Ok(RuntimeConfig {
            root_dir: args.root_dir,
            schema_path,
            number_threads: args
                .num_threads
                .or(rc_file.num_threads)
                .or_else(|| u8::try_from(num_cpus::get()).ok())
                .unwrap_or(4),
            generator,
        })
    }

    pub fn root_dir_path(&self) -> PathBuf {
        self.root_dir.clone()
    }

    pub fn schema_file_path(&self) -> PathBuf {
        self.schema_path.clone()
    }

    pub fn thread_count(&self) -> u8 {
        self.number_threads
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        self.generator.clone()
    }
}

/// Ranked fuzzy matches against the user's spelling, for error help text.
pub fn similar_help_suggestions(
    target: &str,
    possibilities: impl Iterator<Item = String>,
) -> Option<String> {
    let mut scored: Vec<(f64, String)> = possibilities
        .filter(|possibility| !possibility.starts_with("__"))
        .map(|possibility| (strsim::jaro_winkler(target, &possibility), possibility))
        .filter(|(score, _)| *score > 0.72)
        .collect();
    if scored.is_empty() {
        return None;
    }
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let names = scored
        .into_iter()
        .take(3)
        .map(|(_, name)| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!(" Did you mean {names}?"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

#[derive(Debug)]
pub struct LocationInformation {
    line: usize,
    column: usize,
    source_line: String,
    help_text: Option<String>,
}

impl LocationInformation {
    pub fn new_from_contents_and_position(contents: &str, position: &Pos) -> Self {
        let source_line = contents
            .lines()
            .nth(position.line.saturating_sub(1))
            .unwrap_or_default()
            .to_string();
        LocationInformation {
            line: position.line,
            column: position.column,
            source_line,
            help_text: None,
        }
    }

    pub fn new_from_line_and_column(line: usize, source_line: &str, column: usize) -> Self {
        LocationInformation {
            line,
            column,
            source_line: source_line.to_string(),
            help_text: None,
        }
    }

    pub fn with_help_text(&mut self, text: &str) {
        self.help_text = Some(text.to_string());
    }
}

/// One renderable compiler message: severity, summary, and optionally the
/// offending source excerpt plus help text.
#[derive(Debug)]
pub struct PrintableMessage {
    severity: Severity,
    summary: String,
    file_path: Option<PathBuf>,
    location: Option<LocationInformation>,
}

impl PrintableMessage {
    pub fn new_simple_compile_error(summary: &str) -> Self {
        PrintableMessage {
            severity: Severity::Error,
            summary: summary.to_string(),
            file_path: None,
            location: None,
        }
    }

    pub fn new_simple_program_error(summary: &str) -> Self {
        PrintableMessage {
            severity: Severity::Error,
            summary: format!("program error: {summary}"),
            file_path: None,
            location: None,
        }
    }

    pub fn new_compile_error(
        summary: &str,
        file_path: &Path,
        contents: &str,
        position: &Pos,
        help: Option<&str>,
    ) -> Self {
        let mut location = LocationInformation::new_from_contents_and_position(contents, position);
        if let Some(help) = help {
            location.with_help_text(help);
        }
        PrintableMessage {
            severity: Severity::Error,
            summary: summary.to_string(),
            file_path: Some(file_path.to_path_buf()),
            location: Some(location),
        }
    }

    pub fn new_compile_warning(
        summary: &str,
        file_path: &Path,
        contents: &str,
        position: &Pos,
        help: Option<&str>,
    ) -> Self {
        let mut message =
            PrintableMessage::new_compile_error(summary, file_path, contents, position, help);
        message.severity = Severity::Warning;
        message
    }

    pub fn new_compile_error_from_read_io_error(error: &std::io::Error, path: &Path) -> Self {
        PrintableMessage::new_simple_compile_error(&format!(
            "could not read `{}`: {error}",
            path.display()
        ))
    }

    pub fn new_compile_error_from_write_io_error(error: &std::io::Error, path: &Path) -> Self {
        PrintableMessage::new_simple_compile_error(&format!(
            "could not write `{}`: {error}",
            path.display()
        ))
    }

    pub fn with_source_information(
        &mut self,
        file_path: &Path,
        location: Option<LocationInformation>,
    ) {
        self.file_path = Some(file_path.to_path_buf());
        if location.is_some() {
            self.location = location;
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for PrintableMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        write!(f, "{tag}: {}", self.summary)?;
        let path = match &self.file_path {
            Some(path) => path,
            None => return Ok(()),
        };
        match &self.location {
            Some(location) => {
                writeln!(
                    f,
                    "\n  --> {}:{}:{}",
                    path.display(),
                    location.line,
                    location.column
                )?;
                writeln!(f, "   |")?;
                writeln!(f, "{:>2} | {}", location.line, location.source_line)?;
                write!(f, "   | {}^", " ".repeat(location.column.saturating_sub(1)))?;
                if let Some(help) = &location.help_text {
                    write!(f, "\n   = help: {help}")?;
                }
                Ok(())
            }
            None => write!(f, "\n  --> {}", path.display()),
        }
    }
}

/// Render a compile error against the source it came from.
pub fn printable_from_compile_error(
    error: &CompileError,
    lookup_source: impl Fn(&str) -> Option<(PathBuf, String)>,
) -> PrintableMessage {
    let source = error.file.as_deref().and_then(&lookup_source);
    let (summary, help) = match &error.kind {
        ErrorKind::FragmentNotFound {
            name, available, ..
        } => {
            let extra = similar_help_suggestions(name, available.iter().cloned())
                .unwrap_or_else(|| " Did you forget to add the file defining it?".to_string());
            (
                format!("unknown spread fragment name `{name}`"),
                Some(format!(
                    "This fragment name doesn't appear to be in scope.{extra}"
                )),
            )
        }
        ErrorKind::FieldNotFound {
            parent_type_name,
            field_name,
            available,
            ..
        } => {
            let extra = similar_help_suggestions(field_name, available.iter().cloned())
                .unwrap_or_default();
            (
                format!("unknown field `{field_name}`"),
                Some(format!("Check the fields of `{parent_type_name}`.{extra}")),
            )
        }
        _ => (error.to_string(), None),
    };
    match (source, error.position()) {
        (Some((path, contents)), Some(position)) => {
            PrintableMessage::new_compile_error(&summary, &path, &contents, &position, help.as_deref())
        }
        (Some((path, _)), None) => {
            let mut message = PrintableMessage::new_simple_compile_error(&summary);
            message.with_source_information(&path, None);
            message
        }
        _ => PrintableMessage::new_simple_compile_error(&summary),
    }
}

/// Prints the result of the program run and picks the exit code.
pub fn print_messages(messages: &[PrintableMessage]) -> i32 {
    let mut code = 0;
    for message in messages {
        println!("{message}");
        if message.is_error() {
            code = 1;
        }
    }
    code
}
