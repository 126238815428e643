use crate::helpers::basic_success_with_global_types_assert;

#[test]
fn compile_operation_variables_with_input_object() {
    basic_success_with_global_types_assert(
        "
mutation CreateUser($input: CreateUserInput!, $note: String) {
  createUser {
    id
  }
}
    ",
        "CreateUser.ts",
        "
import { CreateUserInput } from \"__generated__/globalTypes\";

export interface CreateUser_createUser {
  id: string;
}

export interface CreateUser {
  createUser: CreateUser_createUser | null;
}

export interface CreateUserVariables {
  input: CreateUserInput;
  note?: string | null;
}
    ",
        "
export interface CreateUserInput {
  email?: string | null;
  invited_by?: string | null;
  name: string;
  role?: Role | null;
}

/**
 * The role of a user.
 */
export enum Role {
  ADMIN = \"ADMIN\",
  MEMBER = \"MEMBER\",
}
    ",
    );
}

#[test]
fn compile_list_variables() {
    crate::helpers::basic_success_assert(
        "
query ManyUsers($ids: [ID!]!, $limit: Int) {
  viewer {
    id
  }
}
    ",
        "ManyUsers.ts",
        "
export interface ManyUsers_viewer {
  id: string;
}

export interface ManyUsers {
  /**
   * Access to fields relevant to a consumer of the application
   */
  viewer: ManyUsers_viewer;
}

export interface ManyUsersVariables {
  ids: (string)[];
  limit?: number | null;
}
    ",
    );
}
