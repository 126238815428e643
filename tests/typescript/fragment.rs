use crate::helpers::multi_file_success_assert;

#[test]
fn compile_fragment_spread_by_reference() {
    multi_file_success_assert(
        &[
            (
                "user_parts.graphql",
                "
fragment UserParts on User {
  id
  name
}
    ",
            ),
            (
                "user_query.graphql",
                "
query UserQuery {
  user {
    ...UserParts
    email
  }
}
    ",
            ),
        ],
        &[
            (
                "UserParts.ts",
                "
export interface UserParts {
  id: string;
  name: string;
}
    ",
            ),
            (
                "UserQuery.ts",
                "
import { UserParts } from \"__generated__/UserParts\";

export type UserQuery_user = UserParts & {
  email: string | null;
};

export interface UserQuery {
  user: UserQuery_user | null;
}
    ",
            ),
        ],
    );
}

#[test]
fn compile_fully_conflicting_fragments_collapse_to_merged_object() {
    multi_file_success_assert(
        &[
            (
                "avatar_url.graphql",
                "
fragment AvatarUrl on User {
  avatar {
    url
  }
}
    ",
            ),
            (
                "avatar_size.graphql",
                "
fragment AvatarSize on User {
  avatar {
    size
  }
}
    ",
            ),
            (
                "avatar_query.graphql",
                "
query AvatarQuery {
  user {
    ...AvatarUrl
    ...AvatarSize
  }
}
    ",
            ),
        ],
        &[(
            "AvatarQuery.ts",
            "
export interface AvatarQuery_user_avatar {
  size: number;
  url: string;
}

export interface AvatarQuery_user {
  avatar: AvatarQuery_user_avatar | null;
}

export interface AvatarQuery {
  user: AvatarQuery_user | null;
}
    ",
        )],
    );
}

#[test]
fn compile_partially_conflicting_fragments_use_omit() {
    multi_file_success_assert(
        &[
            (
                "avatar_url.graphql",
                "
fragment AvatarUrl on User {
  id
  avatar {
    url
  }
}
    ",
            ),
            (
                "avatar_size.graphql",
                "
fragment AvatarSize on User {
  name
  avatar {
    size
  }
}
    ",
            ),
            (
                "conflict_query.graphql",
                "
query ConflictQuery {
  user {
    ...AvatarUrl
    ...AvatarSize
  }
}
    ",
            ),
        ],
        &[
            (
                "ConflictQuery.ts",
                "
import { Omit } from \"__generated__/globalTypes\";
import { AvatarSize } from \"__generated__/AvatarSize\";
import { AvatarUrl } from \"__generated__/AvatarUrl\";

export interface ConflictQuery_user_avatar {
  size: number;
  url: string;
}

export type ConflictQuery_user = Omit<AvatarSize, \"avatar\"> & Omit<AvatarUrl, \"avatar\"> & {
  avatar: ConflictQuery_user_avatar | null;
};

export interface ConflictQuery {
  user: ConflictQuery_user | null;
}
    ",
            ),
            (
                "globalTypes.ts",
                "
export type Omit<T, K extends keyof T> = Pick<T, Exclude<keyof T, K>>;
    ",
            ),
        ],
    );
}

#[test]
fn compile_lone_spread_of_abstract_type_passes_through() {
    multi_file_success_assert(
        &[
            (
                "entity_parts.graphql",
                "
fragment EntityParts on Entity {
  id
  __typename
  ... on User {
    name
  }
}
    ",
            ),
            (
                "pass_through.graphql",
                "
query PassThrough {
  getRandomEntity {
    ...EntityParts
  }
}
    ",
            ),
        ],
        &[
            (
                "EntityParts.ts",
                "
export interface EntityParts_Comment {
  __typename: \"Comment\";
  id: string;
}

export interface EntityParts_User {
  __typename: \"User\";
  id: string;
  name: string;
}

export type EntityParts = EntityParts_Comment | EntityParts_User;
    ",
            ),
            (
                "PassThrough.ts",
                "
import { EntityParts } from \"__generated__/EntityParts\";

export interface PassThrough {
  getRandomEntity: EntityParts | null;
}
    ",
            ),
        ],
    );
}

#[test]
fn compile_one_spread_per_union_member() {
    multi_file_success_assert(
        &[
            (
                "user_bits.graphql",
                "
fragment UserBits on User {
  name
}
    ",
            ),
            (
                "comment_bits.graphql",
                "
fragment CommentBits on Comment {
  content
}
    ",
            ),
            (
                "spread_union.graphql",
                "
query SpreadUnion {
  search {
    ...UserBits
    ...CommentBits
  }
}
    ",
            ),
        ],
        &[(
            "SpreadUnion.ts",
            "
import { CommentBits } from \"__generated__/CommentBits\";
import { UserBits } from \"__generated__/UserBits\";

export type SpreadUnion_search = CommentBits | UserBits;

export interface SpreadUnion {
  search: (SpreadUnion_search)[] | null;
}
    ",
        )],
    );
}

#[test]
fn compile_spread_union_with_catch_all_branch() {
    multi_file_success_assert(
        &[
            (
                "user_bits.graphql",
                "
fragment UserBits on User {
  name
}
    ",
            ),
            (
                "spread_node.graphql",
                "
query SpreadNode {
  node {
    ...UserBits
  }
}
    ",
            ),
        ],
        &[(
            "SpreadNode.ts",
            "
import { UserBits } from \"__generated__/UserBits\";

export interface SpreadNode_node_Node {}

export type SpreadNode_node = UserBits | SpreadNode_node_Node;

export interface SpreadNode {
  /**
   * Fetches an object given its ID.
   */
  node: SpreadNode_node | null;
}
    ",
        )],
    );
}
