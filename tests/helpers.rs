use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use qtc::generator::{Generator, GeneratorConfig};
use qtc::schema::Schema;
use std::path::Path;
use std::process::Command;

pub const HEADER: &str = "/* tslint:disable */\n/* eslint-disable */\n// This file was automatically generated and should not be edited.\n\n";

pub fn fixture_schema() -> Schema {
    let file = std::fs::File::open("tests/schema.json").unwrap();
    Schema::from_reader(std::io::BufReader::new(file)).unwrap()
}

pub fn new_generator(config: GeneratorConfig) -> Generator {
    Generator::new(fixture_schema(), config).unwrap()
}

pub fn default_generator() -> Generator {
    new_generator(GeneratorConfig::default())
}

pub fn qtc_command_with_fake_dir() -> (Command, TempDir) {
    let mut cmd = Command::cargo_bin("qtc").unwrap();
    let temp_dir = TempDir::new().unwrap();
    cmd.arg(temp_dir.path());
    cmd.arg("--num-threads=2");
    (cmd, temp_dir)
}

pub fn qtc_command_with_fake_dir_and_schema() -> (Command, TempDir) {
    let (cmd, temp_dir) = qtc_command_with_fake_dir();
    let schema_file_copy = Path::new("tests/schema.json");
    temp_dir
        .child("schema.json")
        .write_file(schema_file_copy)
        .unwrap();
    (cmd, temp_dir)
}

pub fn assert_generated(dir: &TempDir, expected_file_name: &str, expected_content: &str) {
    let output = dir.child("__generated__").child(expected_file_name);
    let actual = std::fs::read_to_string(output.path())
        .unwrap_or_else(|_| panic!("missing generated file `{expected_file_name}`"));
    assert_eq!(actual, format!("{HEADER}{}\n", expected_content.trim()));
}

/// The basic outline of a successful compile:
///  * Make a fake dir
///  * Shove in the schema
///  * Write in a single file
///  * Expect a compiled output
pub fn basic_success_assert(
    graphql_content: &str,
    expected_file_name: &str,
    expected_content: &str,
) {
    let (mut cmd, temp_dir) = qtc_command_with_fake_dir_and_schema();
    temp_dir
        .child("file.graphql")
        .write_str(graphql_content)
        .unwrap();
    cmd.assert().success();
    assert_generated(&temp_dir, expected_file_name, expected_content);
}

/// Same as `basic_success_assert` but asserts the global types file as well
pub fn basic_success_with_global_types_assert(
    graphql_content: &str,
    expected_file_name: &str,
    expected_content: &str,
    expected_global_types_content: &str,
) {
    let (mut cmd, temp_dir) = qtc_command_with_fake_dir_and_schema();
    temp_dir
        .child("file.graphql")
        .write_str(graphql_content)
        .unwrap();
    cmd.assert().success();
    assert_generated(&temp_dir, expected_file_name, expected_content);
    assert_generated(&temp_dir, "globalTypes.ts", expected_global_types_content);
}

/// Write several named documents and assert several generated outputs.
pub fn multi_file_success_assert(
    files: &[(&str, &str)],
    expected: &[(&str, &str)],
) {
    let (mut cmd, temp_dir) = qtc_command_with_fake_dir_and_schema();
    for (file_name, contents) in files {
        temp_dir.child(file_name).write_str(contents).unwrap();
    }
    cmd.assert().success();
    for (expected_file_name, expected_content) in expected {
        assert_generated(&temp_dir, expected_file_name, expected_content);
    }
}
