//! Groups flat annotations by the image they belong to.

use std::collections::HashMap;

use crate::ir::{AnnotationGroup, RawAnnotation};

/// Groups annotations by `image_ref`.
///
/// Groups come out in the order their image was first seen, and members keep
/// their input order, so the same input always yields the same groups. No
/// validation happens here.
pub fn group_by_image(annotations: impl IntoIterator<Item = RawAnnotation>) -> Vec<AnnotationGroup> {
    let mut groups: Vec<AnnotationGroup> = Vec::new();
    let mut index_by_ref: HashMap<String, usize> = HashMap::new();

    for annotation in annotations {
        match index_by_ref.get(&annotation.image_ref) {
            Some(&idx) => groups[idx].push(annotation),
            None => {
                index_by_ref.insert(annotation.image_ref.clone(), groups.len());
                groups.push(AnnotationGroup::new(annotation));
            }
        }
    }

    groups
}
