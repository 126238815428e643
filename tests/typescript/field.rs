use crate::helpers::{assert_generated, basic_success_assert, qtc_command_with_fake_dir_and_schema};
use assert_cmd::prelude::*;
use assert_fs::prelude::*;

#[test]
fn compile_custom_scalar_as_any() {
    basic_success_assert(
        "
query ScalarQuery {
  user {
    id
    created_at
  }
}
    ",
        "ScalarQuery.ts",
        "
export interface ScalarQuery_user {
  created_at: any;
  id: string;
}

export interface ScalarQuery {
  user: ScalarQuery_user | null;
}
    ",
    );
}

#[test]
fn compile_custom_scalar_with_real_name() {
    let (mut cmd, temp_dir) = qtc_command_with_fake_dir_and_schema();
    cmd.arg("--use-custom-scalars");
    temp_dir
        .child("file.graphql")
        .write_str(
            "
query ScalarNameQuery {
  user {
    created_at
  }
}
    ",
        )
        .unwrap();
    cmd.assert().success();
    assert_generated(
        &temp_dir,
        "ScalarNameQuery.ts",
        "
export interface ScalarNameQuery_user {
  created_at: DateTime;
}

export interface ScalarNameQuery {
  user: ScalarNameQuery_user | null;
}
    ",
    );
}

#[test]
fn compile_custom_scalar_with_prefix() {
    let (mut cmd, temp_dir) = qtc_command_with_fake_dir_and_schema();
    cmd.arg("--use-custom-scalars");
    cmd.arg("--custom-scalar-prefix=GQL");
    temp_dir
        .child("file.graphql")
        .write_str(
            "
query ScalarPrefixQuery {
  user {
    created_at
  }
}
    ",
        )
        .unwrap();
    cmd.assert().success();
    assert_generated(
        &temp_dir,
        "ScalarPrefixQuery.ts",
        "
export interface ScalarPrefixQuery_user {
  created_at: GQLDateTime;
}

export interface ScalarPrefixQuery {
  user: ScalarPrefixQuery_user | null;
}
    ",
    );
}

#[test]
fn compile_field_aliases() {
    basic_success_assert(
        "
query AliasQuery {
  viewer {
    small: user {
      id
    }
    big: user {
      id
      name
    }
  }
}
    ",
        "AliasQuery.ts",
        "
export interface AliasQuery_viewer_big {
  id: string;
  name: string;
}

export interface AliasQuery_viewer_small {
  id: string;
}

export interface AliasQuery_viewer {
  /**
   * The user associated with the current viewer.
   */
  big: AliasQuery_viewer_big | null;
  /**
   * The user associated with the current viewer.
   */
  small: AliasQuery_viewer_small | null;
}

export interface AliasQuery {
  /**
   * Access to fields relevant to a consumer of the application
   */
  viewer: AliasQuery_viewer;
}
    ",
    );
}

#[test]
fn compile_conditional_directive_makes_field_nullable() {
    basic_success_assert(
        "
query SkipQuery($show: Boolean!) {
  viewer {
    id
    maybe_id: id @include(if: $show)
  }
}
    ",
        "SkipQuery.ts",
        "
export interface SkipQuery_viewer {
  id: string;
  maybe_id: string | null;
}

export interface SkipQuery {
  /**
   * Access to fields relevant to a consumer of the application
   */
  viewer: SkipQuery_viewer;
}

export interface SkipQueryVariables {
  show: boolean;
}
    ",
    );
}
