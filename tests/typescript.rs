use crate::helpers::basic_success_assert;

mod enumeration;
mod field;
mod fragment;
mod interface;
mod union;
mod variable;

#[test]
fn compile_simple_query() {
    basic_success_assert(
        "
query TestQuery {
  viewer {
    id
    me: user {
      id
    }
  }
}
    ",
        "TestQuery.ts",
        "
export interface TestQuery_viewer_me {
  id: string;
}

export interface TestQuery_viewer {
  id: string;
  /**
   * The user associated with the current viewer.
   */
  me: TestQuery_viewer_me | null;
}

export interface TestQuery {
  /**
   * Access to fields relevant to a consumer of the application
   */
  viewer: TestQuery_viewer;
}
    ",
    );
}

#[test]
fn compile_simple_fragment() {
    basic_success_assert(
        "
fragment viewerParts on Viewer {
  id
  user {
    id
  }
}
    ",
        "viewerParts.ts",
        "
export interface viewerParts_user {
  id: string;
}

export interface viewerParts {
  id: string;
  /**
   * The user associated with the current viewer.
   */
  user: viewerParts_user | null;
}
    ",
    );
}

#[test]
fn compile_nested_objects() {
    basic_success_assert(
        "
query NestedQuery {
  viewer {
    user {
      avatar {
        url
      }
    }
  }
}
    ",
        "NestedQuery.ts",
        "
export interface NestedQuery_viewer_user_avatar {
  url: string;
}

export interface NestedQuery_viewer_user {
  avatar: NestedQuery_viewer_user_avatar | null;
}

export interface NestedQuery_viewer {
  /**
   * The user associated with the current viewer.
   */
  user: NestedQuery_viewer_user | null;
}

export interface NestedQuery {
  /**
   * Access to fields relevant to a consumer of the application
   */
  viewer: NestedQuery_viewer;
}
    ",
    );
}
