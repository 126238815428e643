use crate::helpers::basic_success_assert;

#[test]
fn compile_union_with_branches() {
    basic_success_assert(
        "
query SearchQuery {
  search {
    __typename
    ... on User {
      name
    }
    ... on Comment {
      content
    }
  }
}
    ",
        "SearchQuery.ts",
        "
export interface SearchQuery_search_Comment {
  __typename: \"Comment\";
  content: string;
}

export interface SearchQuery_search_User {
  __typename: \"User\";
  name: string;
}

export type SearchQuery_search = SearchQuery_search_Comment | SearchQuery_search_User;

export interface SearchQuery {
  search: (SearchQuery_search)[] | null;
}
    ",
    );
}

#[test]
fn compile_union_typename_only_collapses() {
    basic_success_assert(
        "
query TypenameQuery {
  search {
    __typename
  }
}
    ",
        "TypenameQuery.ts",
        "
export interface TypenameQuery_search {
  __typename: \"Comment\" | \"User\";
}

export interface TypenameQuery {
  search: (TypenameQuery_search)[] | null;
}
    ",
    );
}

#[test]
fn compile_union_with_aliased_typename() {
    basic_success_assert(
        "
query AliasedTypenameQuery {
  search {
    kind: __typename
    ... on User {
      name
    }
  }
}
    ",
        "AliasedTypenameQuery.ts",
        "
export interface AliasedTypenameQuery_search_Comment {
  kind: \"Comment\";
}

export interface AliasedTypenameQuery_search_User {
  kind: \"User\";
  name: string;
}

export type AliasedTypenameQuery_search = AliasedTypenameQuery_search_Comment | AliasedTypenameQuery_search_User;

export interface AliasedTypenameQuery {
  search: (AliasedTypenameQuery_search)[] | null;
}
    ",
    );
}
