//! The shape IR: a closed tagged union describing the type of data a
//! selection produces, prior to text emission.
//!
//! Nullability attaches to the `FieldShape` wrapper holding a value, never
//! to the inner shape, so merging can tell "same shape, different
//! nullability" apart from "different shape". An array element is itself a
//! `FieldShape`; its `nullable` is the element nullability.
use crate::error::{Error, Result};
use crate::schema::Documentation;
use std::collections::{BTreeMap, BTreeSet};

pub mod compile;
pub mod conflict;
pub mod variable;

pub type FieldMap = BTreeMap<String, FieldShape>;

/// Prefix for synthetic fragment-spread keys. A `.` can never begin a
/// GraphQL response key, so these are disjoint from literal field keys and
/// can be isolated before emission.
pub const SPREAD_KEY_PREFIX: &str = "...";

pub fn spread_key(fragment_name: &str) -> String {
    format!("{SPREAD_KEY_PREFIX}{fragment_name}")
}

pub fn is_spread_key(key: &str) -> bool {
    key.starts_with(SPREAD_KEY_PREFIX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    pub nullable: bool,
    pub doc: Documentation,
    pub shape: Shape,
}

impl FieldShape {
    pub fn new(shape: Shape) -> Self {
        FieldShape {
            nullable: false,
            doc: None,
            shape,
        }
    }

    pub fn nullable(shape: Shape) -> Self {
        FieldShape {
            nullable: true,
            doc: None,
            shape,
        }
    }

    /// Structural merge. Nullability ORs: a selection made absent-capable
    /// by either contributor stays absent-capable.
    pub fn merge(self, other: FieldShape) -> Result<FieldShape> {
        Ok(FieldShape {
            nullable: self.nullable || other.nullable,
            doc: self.doc.or(other.doc),
            shape: merge_shapes(self.shape, other.shape)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar(ScalarShape),
    Discriminant(DiscriminantShape),
    Object(ObjectShape),
    Array(ArrayShape),
    Union(UnionShape),
    Intersection(IntersectionShape),
    FragmentRef(FragmentRefShape),
}

impl Shape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Scalar(_) => "scalar",
            Shape::Discriminant(_) => "discriminant",
            Shape::Object(_) => "object",
            Shape::Array(_) => "array",
            Shape::Union(_) => "union",
            Shape::Intersection(_) => "intersection",
            Shape::FragmentRef(_) => "fragment reference",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarShape {
    pub type_expr: String,
    /// True when `type_expr` names a generated global (enum or input type)
    /// that emission must import.
    pub global_ref: bool,
}

impl ScalarShape {
    pub fn new(type_expr: impl Into<String>) -> Self {
        ScalarShape {
            type_expr: type_expr.into(),
            global_ref: false,
        }
    }

    pub fn global(type_expr: impl Into<String>) -> Self {
        ScalarShape {
            type_expr: type_expr.into(),
            global_ref: true,
        }
    }
}

/// A `__typename` literal. With `exclude_from: None` this denotes exactly
/// `names`; with `exclude_from: Some(A)` it denotes every possible concrete
/// name of `A` except `names`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscriminantShape {
    pub names: BTreeSet<String>,
    pub exclude_from: Option<String>,
    /// True when the compiler added this discriminant because of the
    /// always-emit option rather than an explicit `__typename` selection.
    pub synthesized: bool,
}

impl DiscriminantShape {
    pub fn single(name: impl Into<String>) -> Self {
        let mut names = BTreeSet::new();
        names.insert(name.into());
        DiscriminantShape {
            names,
            exclude_from: None,
            synthesized: false,
        }
    }

    pub fn of_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        DiscriminantShape {
            names: names.into_iter().collect(),
            exclude_from: None,
            synthesized: false,
        }
    }

    pub fn excluding<I: IntoIterator<Item = String>>(abstract_name: &str, names: I) -> Self {
        DiscriminantShape {
            names: names.into_iter().collect(),
            exclude_from: Some(abstract_name.to_string()),
            synthesized: false,
        }
    }

    pub fn mark_synthesized(mut self) -> Self {
        self.synthesized = true;
        self
    }

    /// Union of the denoted name sets under the exclusion algebra.
    fn merge(self, other: DiscriminantShape) -> DiscriminantShape {
        let synthesized = self.synthesized && other.synthesized;
        match (self.exclude_from, other.exclude_from) {
            (None, None) => DiscriminantShape {
                names: self.names.union(&other.names).cloned().collect(),
                exclude_from: None,
                synthesized,
            },
            // (all of A except X) ∪ Y = all of A except (X − Y)
            (Some(abstract_name), None) => DiscriminantShape {
                names: self.names.difference(&other.names).cloned().collect(),
                exclude_from: Some(abstract_name),
                synthesized,
            },
            (None, Some(abstract_name)) => DiscriminantShape {
                names: other.names.difference(&self.names).cloned().collect(),
                exclude_from: Some(abstract_name),
                synthesized,
            },
            (Some(abstract_name), Some(_)) => DiscriminantShape {
                names: self.names.intersection(&other.names).cloned().collect(),
                exclude_from: Some(abstract_name),
                synthesized,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectShape {
    pub concrete_type: String,
    pub fields: FieldMap,
}

impl ObjectShape {
    pub fn new(concrete_type: impl Into<String>) -> Self {
        ObjectShape {
            concrete_type: concrete_type.into(),
            fields: FieldMap::new(),
        }
    }

    /// Field maps never silently overwrite: a colliding key always goes
    /// through merge.
    pub fn insert_field(&mut self, key: String, field: FieldShape) -> Result<()> {
        match self.fields.remove(&key) {
            Some(existing) => {
                let merged = existing.merge(field)?;
                self.fields.insert(key, merged);
            }
            None => {
                self.fields.insert(key, field);
            }
        }
        Ok(())
    }

    pub fn has_discriminant(&self) -> bool {
        self.fields
            .values()
            .any(|field| matches!(field.shape, Shape::Discriminant(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayShape {
    pub element: Box<FieldShape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionShape {
    pub branches: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionShape {
    pub parts: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRefShape {
    pub fragment: String,
    pub artifact: String,
    pub condition_type: String,
    pub parent_type: String,
    /// Field names removed from this reference because they were pulled
    /// into a pre-merged conflict object.
    pub omitted: BTreeSet<String>,
}

impl FragmentRefShape {
    pub fn new(fragment: &str, condition_type: &str, parent_type: &str) -> Self {
        FragmentRefShape {
            fragment: fragment.to_string(),
            artifact: fragment.to_string(),
            condition_type: condition_type.to_string(),
            parent_type: parent_type.to_string(),
            omitted: BTreeSet::new(),
        }
    }
}

pub fn merge_shapes(a: Shape, b: Shape) -> Result<Shape> {
    let merged = match (a, b) {
        (Shape::Scalar(x), Shape::Scalar(y)) => {
            if x.type_expr == y.type_expr {
                Shape::Scalar(ScalarShape {
                    type_expr: x.type_expr,
                    global_ref: x.global_ref || y.global_ref,
                })
            } else {
                // Differing scalars become a literal union
                Shape::Union(UnionShape {
                    branches: vec![Shape::Scalar(x), Shape::Scalar(y)],
                })
            }
        }
        (Shape::Discriminant(x), Shape::Discriminant(y)) => Shape::Discriminant(x.merge(y)),
        (Shape::Object(mut x), Shape::Object(y)) => {
            for (key, field) in y.fields {
                x.insert_field(key, field)?;
            }
            Shape::Object(x)
        }
        (Shape::Array(x), Shape::Array(y)) => Shape::Array(ArrayShape {
            element: Box::new(x.element.merge(*y.element)?),
        }),
        (Shape::Union(x), Shape::Union(y)) => merge_unions(x, y)?,
        (Shape::Union(x), other) | (other, Shape::Union(x)) => merge_union_branch(x, other)?,
        (Shape::FragmentRef(x), Shape::FragmentRef(y)) => merge_fragment_refs(x, y),
        (Shape::Intersection(x), Shape::Intersection(y)) => {
            let mut merged = x;
            for part in y.parts {
                merged = merge_into_intersection(merged, part)?;
            }
            Shape::Intersection(merged)
        }
        (Shape::Intersection(x), other @ (Shape::Object(_) | Shape::FragmentRef(_)))
        | (other @ (Shape::Object(_) | Shape::FragmentRef(_)), Shape::Intersection(x)) => {
            Shape::Intersection(merge_into_intersection(x, other)?)
        }
        (Shape::Object(x), Shape::FragmentRef(y)) | (Shape::FragmentRef(y), Shape::Object(x)) => {
            Shape::Intersection(IntersectionShape {
                parts: vec![Shape::FragmentRef(y), Shape::Object(x)],
            })
        }
        (a, b) => {
            return Err(Error::logic(format!(
                "cannot merge mismatched shapes `{}` and `{}`",
                a.kind_name(),
                b.kind_name()
            )))
        }
    };
    Ok(merged)
}

fn merge_fragment_refs(x: FragmentRefShape, y: FragmentRefShape) -> Shape {
    if x.fragment == y.fragment {
        // A field omitted from only one contributor is still present
        let omitted = x.omitted.intersection(&y.omitted).cloned().collect();
        Shape::FragmentRef(FragmentRefShape { omitted, ..x })
    } else {
        Shape::Intersection(IntersectionShape {
            parts: vec![Shape::FragmentRef(x), Shape::FragmentRef(y)],
        })
    }
}

fn merge_into_intersection(
    mut intersection: IntersectionShape,
    incoming: Shape,
) -> Result<IntersectionShape> {
    match incoming {
        Shape::FragmentRef(incoming_ref) => {
            for part in &mut intersection.parts {
                if let Shape::FragmentRef(existing) = part {
                    if existing.fragment == incoming_ref.fragment {
                        *part = merge_fragment_refs(existing.clone(), incoming_ref);
                        return Ok(intersection);
                    }
                }
            }
            intersection.parts.push(Shape::FragmentRef(incoming_ref));
            Ok(intersection)
        }
        Shape::Object(incoming_object) => {
            for part in &mut intersection.parts {
                if matches!(part, Shape::Object(_)) {
                    let existing = std::mem::replace(
                        part,
                        Shape::Object(ObjectShape::new(String::new())),
                    );
                    *part = merge_shapes(existing, Shape::Object(incoming_object))?;
                    return Ok(intersection);
                }
            }
            intersection.parts.push(Shape::Object(incoming_object));
            Ok(intersection)
        }
        other => Err(Error::logic(format!(
            "cannot intersect shape `{}`",
            other.kind_name()
        ))),
    }
}

/// Identity a union branch merges under: the concrete type it describes.
fn branch_key(branch: &Shape) -> Option<&str> {
    match branch {
        Shape::Object(object) => Some(&object.concrete_type),
        Shape::FragmentRef(fragment_ref) => Some(&fragment_ref.parent_type),
        Shape::Intersection(intersection) => {
            intersection.parts.iter().find_map(branch_key)
        }
        _ => None,
    }
}

fn merge_unions(mut x: UnionShape, y: UnionShape) -> Result<Shape> {
    for branch in y.branches {
        x = match merge_union_branch(x, branch)? {
            Shape::Union(merged) => merged,
            single => UnionShape {
                branches: vec![single],
            },
        };
    }
    Ok(Shape::Union(x))
}

/// Merge one incoming branch into a union, by concrete-type key when both
/// sides have one, by structural equality otherwise.
fn merge_union_branch(mut union: UnionShape, incoming: Shape) -> Result<Shape> {
    if let Some(incoming_key) = branch_key(&incoming).map(str::to_string) {
        for branch in &mut union.branches {
            if branch_key(branch) == Some(incoming_key.as_str()) {
                let existing = std::mem::replace(
                    branch,
                    Shape::Object(ObjectShape::new(String::new())),
                );
                *branch = merge_shapes(existing, incoming)?;
                return Ok(Shape::Union(union));
            }
        }
        union.branches.push(incoming);
        return Ok(Shape::Union(union));
    }
    if !union.branches.iter().any(|branch| *branch == incoming) {
        union.branches.push(incoming);
    }
    Ok(Shape::Union(union))
}

/// True when both objects have the same keys and identical fields, allowing
/// discriminant-valued keys to differ.
fn fields_equal_ignoring_discriminant(a: &ObjectShape, b: &ObjectShape) -> bool {
    if a.fields.len() != b.fields.len() {
        return false;
    }
    a.fields.iter().all(|(key, a_field)| {
        match b.fields.get(key) {
            Some(b_field) => match (&a_field.shape, &b_field.shape) {
                (Shape::Discriminant(_), Shape::Discriminant(_)) => {
                    a_field.nullable == b_field.nullable
                }
                _ => a_field == b_field,
            },
            None => false,
        }
    })
}

fn merge_discriminant_fields(into: &mut ObjectShape, from: ObjectShape) {
    for (key, from_field) in from.fields {
        if let Some(into_field) = into.fields.get_mut(&key) {
            let from_shape = from_field.shape;
            if let (Shape::Discriminant(existing), Shape::Discriminant(incoming)) =
                (&mut into_field.shape, from_shape)
            {
                let merged = existing.clone().merge(incoming);
                *existing = merged;
            }
        }
    }
}

/// Global postprocess pass: within every union, group object branches that
/// are structurally identical except for their discriminant and collapse
/// each group into one branch whose discriminant is the union of the
/// grouped literal sets. A union left with one branch becomes that branch.
pub fn postprocess(shape: Shape) -> Shape {
    match shape {
        Shape::Object(mut object) => {
            object.fields = object
                .fields
                .into_iter()
                .map(|(key, field)| {
                    (
                        key,
                        FieldShape {
                            shape: postprocess(field.shape),
                            ..field
                        },
                    )
                })
                .collect();
            Shape::Object(object)
        }
        Shape::Array(array) => {
            let element = *array.element;
            Shape::Array(ArrayShape {
                element: Box::new(FieldShape {
                    shape: postprocess(element.shape),
                    ..element
                }),
            })
        }
        Shape::Intersection(intersection) => Shape::Intersection(IntersectionShape {
            parts: intersection.parts.into_iter().map(postprocess).collect(),
        }),
        Shape::Union(union) => {
            let mut grouped: Vec<Shape> = Vec::with_capacity(union.branches.len());
            for branch in union.branches.into_iter().map(postprocess) {
                let incoming = match branch {
                    Shape::Object(object) => object,
                    other => {
                        if !grouped.iter().any(|existing| *existing == other) {
                            grouped.push(other);
                        }
                        continue;
                    }
                };
                let existing_group = grouped.iter_mut().find_map(|existing| match existing {
                    Shape::Object(object)
                        if fields_equal_ignoring_discriminant(object, &incoming) =>
                    {
                        Some(object)
                    }
                    _ => None,
                });
                match existing_group {
                    Some(group) => merge_discriminant_fields(group, incoming),
                    None => grouped.push(Shape::Object(incoming)),
                }
            }
            if grouped.len() == 1 {
                grouped.into_iter().next().unwrap()
            } else {
                Shape::Union(UnionShape { branches: grouped })
            }
        }
        leaf @ (Shape::Scalar(_) | Shape::Discriminant(_) | Shape::FragmentRef(_)) => leaf,
    }
}
