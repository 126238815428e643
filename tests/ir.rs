use qtc::ir::{
    merge_shapes, postprocess, DiscriminantShape, FieldShape, ObjectShape, ScalarShape, Shape,
    UnionShape,
};

fn scalar_field(type_expr: &str) -> FieldShape {
    FieldShape::new(Shape::Scalar(ScalarShape::new(type_expr)))
}

fn discriminant_field(discriminant: DiscriminantShape) -> FieldShape {
    FieldShape::new(Shape::Discriminant(discriminant))
}

#[test]
fn equal_scalars_merge_to_one() {
    let merged = merge_shapes(
        Shape::Scalar(ScalarShape::new("string")),
        Shape::Scalar(ScalarShape::new("string")),
    )
    .unwrap();
    assert_eq!(merged, Shape::Scalar(ScalarShape::new("string")));
}

#[test]
fn differing_scalars_merge_to_a_literal_union() {
    let merged = merge_shapes(
        Shape::Scalar(ScalarShape::new("string")),
        Shape::Scalar(ScalarShape::new("number")),
    )
    .unwrap();
    match merged {
        Shape::Union(union) => assert_eq!(union.branches.len(), 2),
        other => panic!("expected union, got {other:?}"),
    }
}

#[test]
fn nullability_widens_across_merge() {
    let a = FieldShape::nullable(Shape::Scalar(ScalarShape::new("string")));
    let b = scalar_field("string");
    let merged = a.merge(b).unwrap();
    assert!(merged.nullable);
    let merged = scalar_field("string")
        .merge(scalar_field("string"))
        .unwrap();
    assert!(!merged.nullable);
}

#[test]
fn object_field_collisions_merge_instead_of_overwrite() {
    let mut object = ObjectShape::new("User");
    let mut inner_a = ObjectShape::new("Avatar");
    inner_a
        .insert_field("url".to_string(), scalar_field("string"))
        .unwrap();
    let mut inner_b = ObjectShape::new("Avatar");
    inner_b
        .insert_field("size".to_string(), scalar_field("number"))
        .unwrap();
    object
        .insert_field("avatar".to_string(), FieldShape::new(Shape::Object(inner_a)))
        .unwrap();
    object
        .insert_field("avatar".to_string(), FieldShape::new(Shape::Object(inner_b)))
        .unwrap();
    let avatar = &object.fields["avatar"];
    match &avatar.shape {
        Shape::Object(merged) => {
            assert!(merged.fields.contains_key("url"));
            assert!(merged.fields.contains_key("size"));
        }
        other => panic!("expected object, got {other:?}"),
    }
}

#[test]
fn discriminant_union_of_explicit_sets() {
    let merged = merge_shapes(
        Shape::Discriminant(DiscriminantShape::single("User")),
        Shape::Discriminant(DiscriminantShape::single("Comment")),
    )
    .unwrap();
    match merged {
        Shape::Discriminant(discriminant) => {
            assert_eq!(discriminant.names.len(), 2);
            assert!(discriminant.exclude_from.is_none());
        }
        other => panic!("expected discriminant, got {other:?}"),
    }
}

#[test]
fn discriminant_exclusion_absorbs_explicit_names() {
    // (all of Node except {User, Widget}) ∪ {User} = all except {Widget}
    let merged = merge_shapes(
        Shape::Discriminant(DiscriminantShape::excluding(
            "Node",
            ["User".to_string(), "Widget".to_string()],
        )),
        Shape::Discriminant(DiscriminantShape::single("User")),
    )
    .unwrap();
    match merged {
        Shape::Discriminant(discriminant) => {
            assert_eq!(discriminant.exclude_from.as_deref(), Some("Node"));
            assert_eq!(
                discriminant.names.iter().collect::<Vec<_>>(),
                vec!["Widget"]
            );
        }
        other => panic!("expected discriminant, got {other:?}"),
    }
}

#[test]
fn postprocess_groups_branches_differing_only_in_discriminant() {
    let mut widget = ObjectShape::new("Widget");
    widget
        .insert_field(
            "__typename".to_string(),
            discriminant_field(DiscriminantShape::single("Widget")),
        )
        .unwrap();
    widget
        .insert_field("label".to_string(), scalar_field("string"))
        .unwrap();
    let mut gadget = ObjectShape::new("Gadget");
    gadget
        .insert_field(
            "__typename".to_string(),
            discriminant_field(DiscriminantShape::single("Gadget")),
        )
        .unwrap();
    gadget
        .insert_field("label".to_string(), scalar_field("string"))
        .unwrap();
    let mut user = ObjectShape::new("User");
    user.insert_field(
        "__typename".to_string(),
        discriminant_field(DiscriminantShape::single("User")),
    )
    .unwrap();
    user.insert_field("name".to_string(), scalar_field("string"))
        .unwrap();

    let union = Shape::Union(UnionShape {
        branches: vec![
            Shape::Object(widget),
            Shape::Object(gadget),
            Shape::Object(user),
        ],
    });
    match postprocess(union) {
        Shape::Union(union) => {
            assert_eq!(union.branches.len(), 2);
            match &union.branches[0] {
                Shape::Object(merged) => match &merged.fields["__typename"].shape {
                    Shape::Discriminant(discriminant) => {
                        assert_eq!(
                            discriminant.names.iter().collect::<Vec<_>>(),
                            vec!["Gadget", "Widget"]
                        );
                    }
                    other => panic!("expected discriminant, got {other:?}"),
                },
                other => panic!("expected object branch, got {other:?}"),
            }
        }
        other => panic!("expected union, got {other:?}"),
    }
}

#[test]
fn postprocess_collapses_single_branch_unions() {
    let mut only = ObjectShape::new("User");
    only.insert_field("id".to_string(), scalar_field("string"))
        .unwrap();
    let union = Shape::Union(UnionShape {
        branches: vec![Shape::Object(only.clone())],
    });
    assert_eq!(postprocess(union), Shape::Object(only));
}

#[test]
fn mismatched_shape_merge_is_an_error() {
    let error = merge_shapes(
        Shape::Scalar(ScalarShape::new("string")),
        Shape::Object(ObjectShape::new("User")),
    )
    .unwrap_err();
    assert!(matches!(error.kind, qtc::ErrorKind::Logic { .. }));
}
