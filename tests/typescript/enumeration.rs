use crate::helpers::basic_success_with_global_types_assert;

#[test]
fn compile_enum_field_with_global_types() {
    basic_success_with_global_types_assert(
        "
query RoleQuery {
  viewer {
    id
    role
  }
}
    ",
        "RoleQuery.ts",
        "
import { Role } from \"__generated__/globalTypes\";

export interface RoleQuery_viewer {
  id: string;
  role: Role;
}

export interface RoleQuery {
  /**
   * Access to fields relevant to a consumer of the application
   */
  viewer: RoleQuery_viewer;
}
    ",
        "
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
