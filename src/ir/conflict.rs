//! Fragment-spread conflict resolution.
//!
//! An object whose field map mixes direct fields and fragment references is
//! resolved here: colliding field names are merged, and any collision whose
//! merge changes a contributor's shape is a conflict field. Conflict fields
//! are pulled out of the fragment references (field-omitted) and placed
//! once, pre-merged, in a sibling object intersected alongside them.
use super::compile::FragmentShapeCache;
use super::{is_spread_key, FieldMap, FieldShape, FragmentRefShape, IntersectionShape, ObjectShape, Shape};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

pub fn resolve(cache: &FragmentShapeCache, object: ObjectShape) -> Result<Shape> {
    let ObjectShape {
        concrete_type,
        fields,
    } = object;
    let mut references: Vec<FragmentRefShape> = Vec::new();
    let mut direct = FieldMap::new();
    for (key, field) in fields {
        if is_spread_key(&key) {
            match field.shape {
                Shape::FragmentRef(reference) => references.push(reference),
                other => {
                    return Err(Error::logic(format!(
                        "synthetic spread key held a {} shape",
                        other.kind_name()
                    )))
                }
            }
        } else {
            direct.insert(key, field);
        }
    }
    if references.is_empty() {
        return Ok(Shape::Object(ObjectShape {
            concrete_type,
            fields: direct,
        }));
    }

    // What each fragment actually contributes to this concrete type; a
    // fragment narrowed away contributes nothing and drops out.
    let mut contributions: Vec<(FragmentRefShape, FieldMap)> = Vec::new();
    for reference in references {
        let flat = cache
            .get(&reference.fragment)
            .and_then(|cached| cached.flats.get(&concrete_type))
            .cloned()
            .unwrap_or_default();
        if flat.is_empty() {
            continue;
        }
        contributions.push((reference, flat));
    }
    if contributions.is_empty() {
        return Ok(Shape::Object(ObjectShape {
            concrete_type,
            fields: direct,
        }));
    }

    let mut by_name: BTreeMap<&String, Vec<&FieldShape>> = BTreeMap::new();
    for (_, flat) in &contributions {
        for (key, field) in flat {
            by_name.entry(key).or_default().push(field);
        }
    }
    for (key, field) in &direct {
        by_name.entry(key).or_default().push(field);
    }

    let mut conflict_names: BTreeSet<String> = BTreeSet::new();
    let mut merged_conflicts: FieldMap = FieldMap::new();
    for (name, contributors) in by_name {
        if contributors.len() < 2 {
            continue;
        }
        let mut iter = contributors.iter();
        let mut merged = (*iter.next().unwrap()).clone();
        for contributor in iter {
            merged = merged.merge((*contributor).clone())?;
        }
        let identity = contributors
            .iter()
            .all(|contributor| **contributor == merged);
        if !identity {
            conflict_names.insert(name.clone());
            merged_conflicts.insert(name.clone(), merged);
        }
    }

    if conflict_names.is_empty() {
        // Plain intersection by reference is the cheapest output
        let mut parts: Vec<Shape> = contributions
            .into_iter()
            .map(|(reference, _)| Shape::FragmentRef(reference))
            .collect();
        if !direct.is_empty() {
            parts.push(Shape::Object(ObjectShape {
                concrete_type,
                fields: direct,
            }));
        }
        if parts.len() == 1 {
            return Ok(parts.pop().unwrap());
        }
        return Ok(Shape::Intersection(IntersectionShape { parts }));
    }

    // Sibling object: remaining direct fields plus every conflict field,
    // pre-merged
    let mut sibling = direct;
    for (name, merged) in merged_conflicts {
        sibling.insert(name, merged);
    }
    let mut parts: Vec<Shape> = Vec::new();
    for (mut reference, flat) in contributions {
        let omitted: BTreeSet<String> = flat
            .keys()
            .filter(|key| conflict_names.contains(*key))
            .cloned()
            .collect();
        if omitted.len() == flat.len() {
            // Nothing non-conflicting left; the merged object fully
            // represents this fragment here
            continue;
        }
        reference.omitted = omitted;
        parts.push(Shape::FragmentRef(reference));
    }
    let sibling_object = Shape::Object(ObjectShape {
        concrete_type,
        fields: sibling,
    });
    if parts.is_empty() {
        return Ok(sibling_object);
    }
    parts.push(sibling_object);
    Ok(Shape::Intersection(IntersectionShape { parts }))
}
