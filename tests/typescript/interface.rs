use crate::helpers::{basic_success_assert, basic_success_with_global_types_assert};

#[test]
fn compile_interface_without_type_conditions() {
    basic_success_assert(
        "
query PlainNodeQuery {
  node {
    id
  }
}
    ",
        "PlainNodeQuery.ts",
        "
export interface PlainNodeQuery_node {
  /**
   * ID of the object.
   */
  id: string;
}

export interface PlainNodeQuery {
  /**
   * Fetches an object given its ID.
   */
  node: PlainNodeQuery_node | null;
}
    ",
    );
}

#[test]
fn compile_interface_with_narrowed_branch() {
    basic_success_assert(
        "
query EntityQuery {
  getRandomEntity {
    id
    __typename
    ... on User {
      name
    }
  }
}
    ",
        "EntityQuery.ts",
        "
export interface EntityQuery_getRandomEntity_Comment {
  __typename: \"Comment\";
  id: string;
}

export interface EntityQuery_getRandomEntity_User {
  __typename: \"User\";
  id: string;
  name: string;
}

export type EntityQuery_getRandomEntity = EntityQuery_getRandomEntity_Comment | EntityQuery_getRandomEntity_User;

export interface EntityQuery {
  getRandomEntity: EntityQuery_getRandomEntity | null;
}
    ",
    );
}

#[test]
fn compile_interface_with_exclusion_discriminant() {
    basic_success_with_global_types_assert(
        "
query NodeQuery {
  node {
    id
    __typename
    ... on User {
      name
    }
  }
}
    ",
        "NodeQuery.ts",
        "
import { NodeTypename } from \"__generated__/globalTypes\";

export interface NodeQuery_node_Node {
  __typename: Exclude<NodeTypename, \"User\">;
  /**
   * ID of the object.
   */
  id: string;
}

export interface NodeQuery_node_User {
  __typename: \"User\";
  /**
   * ID of the object.
   */
  id: string;
  name: string;
}

export type NodeQuery_node = NodeQuery_node_Node | NodeQuery_node_User;

export interface NodeQuery {
  /**
   * Fetches an object given its ID.
   */
  node: NodeQuery_node | null;
}
    ",
        "
export type NodeTypename = \"Comment\" | \"Gadget\" | \"Gizmo\" | \"User\" | \"Widget\";
    ",
    );
}

#[test]
fn compile_interface_branches_collapse_when_shapes_match() {
    basic_success_assert(
        "
query LabelQuery {
  node {
    __typename
    ... on Widget {
      label
    }
    ... on Gadget {
      label
    }
  }
}
    ",
        "LabelQuery.ts",
        "
import { NodeTypename } from \"__generated__/globalTypes\";

export interface LabelQuery_node_Node {
  __typename: Exclude<NodeTypename, \"Gadget\" | \"Widget\">;
}

export interface LabelQuery_node_Gadget {
  __typename: \"Gadget\" | \"Widget\";
  label: string;
}

export type LabelQuery_node = LabelQuery_node_Node | LabelQuery_node_Gadget;

export interface LabelQuery {
  /**
   * Fetches an object given its ID.
   */
  node: LabelQuery_node | null;
}
    ",
    );
}
