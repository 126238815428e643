use crate::helpers::{default_generator, new_generator};
use qtc::artifact::ArtifactKind;
use qtc::deps::DepKey;
use qtc::generator::GeneratorConfig;
use qtc::ErrorKind;

const ENTITY_QUERY: &str = "
query EntityQuery {
  getRandomEntity {
    id
    __typename
    ... on User {
      name
    }
  }
}
";

const USER_PARTS: &str = "
fragment UserParts on User {
  id
  name
}
";

const USER_QUERY: &str = "
query UserQuery {
  user {
    ...UserParts
    email
  }
}
";

fn artifact_snapshot(generator: &qtc::Generator) -> Vec<(ArtifactKind, String, String)> {
    let mut snapshot: Vec<(ArtifactKind, String, String)> = generator
        .artifacts()
        .map(|artifact| (artifact.kind, artifact.name.clone(), artifact.text.clone()))
        .collect();
    snapshot.sort();
    snapshot
}

#[test]
fn worked_interface_example_produces_two_branches() {
    let mut generator = default_generator();
    generator.add("entity.graphql", ENTITY_QUERY).unwrap();
    generator.build().unwrap();
    let artifact = generator
        .artifact(ArtifactKind::Operation, "EntityQuery")
        .expect("operation artifact");
    assert_eq!(
        artifact.text,
        "export interface EntityQuery_getRandomEntity_Comment {
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
}"
    );
}

#[test]
fn cached_and_uncached_compilation_are_byte_identical() {
    let mut cached = new_generator(GeneratorConfig {
        memoize: true,
        ..GeneratorConfig::default()
    });
    let mut uncached = new_generator(GeneratorConfig {
        memoize: false,
        ..GeneratorConfig::default()
    });
    for generator in [&mut cached, &mut uncached] {
        generator.add("parts.graphql", USER_PARTS).unwrap();
        generator.add("query.graphql", USER_QUERY).unwrap();
        generator.add("entity.graphql", ENTITY_QUERY).unwrap();
        generator.build().unwrap();
    }
    assert_eq!(artifact_snapshot(&cached), artifact_snapshot(&uncached));
}

#[test]
fn repeated_builds_are_deterministic() {
    let mut generator = default_generator();
    generator.add("parts.graphql", USER_PARTS).unwrap();
    generator.add("query.graphql", USER_QUERY).unwrap();
    generator.build().unwrap();
    let first = artifact_snapshot(&generator);
    let first_deps = generator
        .dependencies_of(ArtifactKind::Operation, "UserQuery")
        .cloned();
    generator.build().unwrap();
    assert_eq!(first, artifact_snapshot(&generator));
    assert_eq!(
        first_deps,
        generator
            .dependencies_of(ArtifactKind::Operation, "UserQuery")
            .cloned()
    );
}

#[test]
fn incremental_sequence_matches_fresh_build() {
    let updated_query = "
query UserQuery {
  user {
    ...UserParts
  }
}
";
    let mut incremental = default_generator();
    incremental.add("parts.graphql", USER_PARTS).unwrap();
    incremental.add("query.graphql", USER_QUERY).unwrap();
    incremental.add("entity.graphql", ENTITY_QUERY).unwrap();
    incremental.build().unwrap();
    incremental.update("query.graphql", updated_query).unwrap();
    incremental.build().unwrap();
    incremental.remove("entity.graphql").unwrap();
    incremental.build().unwrap();

    let mut fresh = default_generator();
    fresh.add("parts.graphql", USER_PARTS).unwrap();
    fresh.add("query.graphql", updated_query).unwrap();
    fresh.build().unwrap();

    assert_eq!(artifact_snapshot(&incremental), artifact_snapshot(&fresh));
}

#[test]
fn removal_purges_every_dependent_artifact() {
    let mut generator = default_generator();
    generator.add("parts.graphql", USER_PARTS).unwrap();
    generator.add("query.graphql", USER_QUERY).unwrap();
    generator.build().unwrap();
    assert!(generator
        .artifact(ArtifactKind::Operation, "UserQuery")
        .is_some());

    generator.remove("parts.graphql").unwrap();
    let file_key = DepKey::file("parts.graphql");
    for artifact in generator.artifacts() {
        assert!(
            !artifact.dependencies.contains(&file_key),
            "artifact {} still depends on removed file",
            artifact.name
        );
        assert_ne!(artifact.source_file.as_deref(), Some("parts.graphql"));
    }
    // The dependent operation itself is gone, not just patched
    assert!(generator
        .artifact(ArtifactKind::Operation, "UserQuery")
        .is_none());
}

#[test]
fn operation_records_fragment_use_keys() {
    let mut generator = default_generator();
    generator.add("parts.graphql", USER_PARTS).unwrap();
    generator.add("query.graphql", USER_QUERY).unwrap();
    generator.build().unwrap();
    let dependencies = generator
        .dependencies_of(ArtifactKind::Operation, "UserQuery")
        .expect("operation dependencies");
    assert!(dependencies.contains(&DepKey::FragmentUse("UserParts".to_string())));
    assert!(dependencies.contains(&DepKey::Fragment("UserParts".to_string())));
    assert!(dependencies.contains(&DepKey::file("parts.graphql")));
    assert!(dependencies.contains(&DepKey::SchemaType("User".to_string())));
}

#[test]
fn circular_fragments_fail_fast() {
    let mut generator = default_generator();
    generator
        .add(
            "a.graphql",
            "
fragment FragA on User {
  id
  ...FragB
}
",
        )
        .unwrap();
    generator
        .add(
            "b.graphql",
            "
fragment FragB on User {
  name
  ...FragA
}
",
        )
        .unwrap();
    let error = generator.build().unwrap_err();
    match error.kind {
        ErrorKind::Logic { message } => assert!(message.contains("circular")),
        other => panic!("expected logic error, got {other:?}"),
    }
    // Failed builds leave no partial artifacts behind
    assert_eq!(generator.artifacts().count(), 0);
}

#[test]
fn failed_build_is_retryable_after_fix() {
    let mut generator = default_generator();
    generator.add("query.graphql", USER_QUERY).unwrap();
    let error = generator.build().unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::FragmentNotFound { .. }
    ));
    assert_eq!(generator.artifacts().count(), 0);

    generator.add("parts.graphql", USER_PARTS).unwrap();
    generator.build().unwrap();
    assert!(generator
        .artifact(ArtifactKind::Operation, "UserQuery")
        .is_some());
}

#[test]
fn duplicate_document_registration_is_rejected() {
    let mut generator = default_generator();
    generator.add("query.graphql", ENTITY_QUERY).unwrap();
    let error = generator.add("query.graphql", ENTITY_QUERY).unwrap_err();
    assert!(matches!(
        error.kind,
        ErrorKind::DuplicateInputDocument { .. }
    ));
}

#[test]
fn conflicting_fragment_fields_are_isolated_and_merged() {
    let mut generator = default_generator();
    generator
        .add(
            "url.graphql",
            "
fragment AvatarUrl on User {
  id
  avatar {
    url
  }
}
",
        )
        .unwrap();
    generator
        .add(
            "size.graphql",
            "
fragment AvatarSize on User {
  name
  avatar {
    size
  }
}
",
        )
        .unwrap();
    generator
        .add(
            "query.graphql",
            "
query ConflictQuery {
  user {
    ...AvatarUrl
    ...AvatarSize
  }
}
",
        )
        .unwrap();
    generator.build().unwrap();
    let artifact = generator
        .artifact(ArtifactKind::Operation, "ConflictQuery")
        .expect("operation artifact");
    // The colliding field appears exactly once, pre-merged, and both
    // fragment references omit it
    assert!(artifact.text.contains("Omit<AvatarSize, \"avatar\">"));
    assert!(artifact.text.contains("Omit<AvatarUrl, \"avatar\">"));
    assert!(artifact.text.contains("size: number;"));
    assert!(artifact.text.contains("url: string;"));
    assert_eq!(artifact.text.matches("avatar:").count(), 1);
}

#[test]
fn union_branches_collapse_by_shape() {
    let mut generator = default_generator();
    generator
        .add(
            "label.graphql",
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
        )
        .unwrap();
    generator.build().unwrap();
    let artifact = generator
        .artifact(ArtifactKind::Operation, "LabelQuery")
        .expect("operation artifact");
    // Widget and Gadget share a shape: one branch with a merged literal set
    assert!(artifact.text.contains("__typename: \"Gadget\" | \"Widget\";"));
    // Untargeted types share one exclusion branch
    assert!(artifact
        .text
        .contains("__typename: Exclude<NodeTypename, \"Gadget\" | \"Widget\">;"));
    let union_line = artifact
        .text
        .lines()
        .find(|line| line.starts_with("export type LabelQuery_node ="))
        .expect("union alias");
    assert_eq!(union_line.matches('|').count(), 1);
}

#[test]
fn artifact_source_requires_location_metadata() {
    let mut generator = default_generator();
    generator.add("entity.graphql", ENTITY_QUERY).unwrap();
    generator.add("role.graphql", "query RoleQuery { viewer { role } }").unwrap();
    generator.build().unwrap();
    let snippet = generator
        .artifact_source(ArtifactKind::Operation, "EntityQuery")
        .unwrap();
    assert_eq!(snippet, ENTITY_QUERY.trim());
    // Globals carry no source; asking for one is the only thing that fails
    let error = generator
        .artifact_source(ArtifactKind::Enum, "Role")
        .unwrap_err();
    assert!(matches!(error.kind, ErrorKind::NodeLocMissing { .. }));
}

#[test]
fn invalid_list_template_is_rejected_at_construction() {
    let config = GeneratorConfig {
        list_type_template: Some("ReadonlyArray<T>".to_string()),
        ..GeneratorConfig::default()
    };
    let error = qtc::Generator::new(crate::helpers::fixture_schema(), config).unwrap_err();
    assert!(matches!(error.kind, ErrorKind::InvalidOption { .. }));
}

#[test]
fn list_template_is_applied() {
    let mut generator = new_generator(GeneratorConfig {
        list_type_template: Some("ReadonlyArray<{}>".to_string()),
        ..GeneratorConfig::default()
    });
    generator
        .add(
            "search.graphql",
            "
query SearchQuery {
  search {
    __typename
  }
}
",
        )
        .unwrap();
    generator.build().unwrap();
    let artifact = generator
        .artifact(ArtifactKind::Operation, "SearchQuery")
        .expect("operation artifact");
    assert!(artifact
        .text
        .contains("search: ReadonlyArray<SearchQuery_search> | null;"));
}

#[test]
fn always_emit_typename_synthesizes_discriminant() {
    let mut generator = new_generator(GeneratorConfig {
        always_emit_typename: true,
        ..GeneratorConfig::default()
    });
    generator
        .add(
            "viewer.graphql",
            "
query ViewerQuery {
  viewer {
    id
  }
}
",
        )
        .unwrap();
    generator.build().unwrap();
    let artifact = generator
        .artifact(ArtifactKind::Operation, "ViewerQuery")
        .expect("operation artifact");
    // Synthesized discriminants reference the shared literal alias
    assert!(artifact.text.contains("__typename: ViewerTypename;"));
    let literal = generator
        .artifact(ArtifactKind::DiscriminantLiteral, "Viewer")
        .expect("literal artifact");
    assert_eq!(
        literal.text,
        "export type ViewerTypename = \"Viewer\";"
    );
}

#[test]
fn missing_subscription_root_errors() {
    let mut generator = default_generator();
    generator
        .add(
            "sub.graphql",
            "
subscription Watch {
  viewer {
    id
  }
}
",
        )
        .unwrap();
    let error = generator.build().unwrap_err();
    assert!(matches!(error.kind, ErrorKind::MissingRootType { .. }));
}
