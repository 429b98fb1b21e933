// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-detection predicates.

use crate::geometry::TransformSnapshot;
use crate::id::ElementId;
use crate::scene::SnapshotCache;

/// Whether a consumer's mask attribute changed to a usable value.
///
/// True when the value differs from the previous one and is not empty.
/// A cleared value is handled separately (the clip is removed).
#[must_use]
pub fn consumer_attribute_changed(old: Option<&str>, new: Option<&str>) -> bool {
    let new = new.unwrap_or("");
    old.unwrap_or("") != new && !new.is_empty()
}

/// Whether a source's live geometry differs from the snapshot its current
/// clip was generated from.
///
/// A source that has never been generated has no baseline and reports
/// `false`; its first generation is triggered by other paths.
#[must_use]
pub fn source_geometry_changed(
    cache: &SnapshotCache,
    source: &ElementId,
    live: &TransformSnapshot,
) -> bool {
    cache.get(source).is_some_and(|cached| cached != live)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(left: f64) -> TransformSnapshot {
        TransformSnapshot {
            left,
            top: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotate_z: 0.0,
        }
    }

    #[test]
    fn attribute_change_needs_new_nonempty_value() {
        assert!(consumer_attribute_changed(Some("#a"), Some("#b")));
        assert!(consumer_attribute_changed(None, Some("#a")));
        assert!(!consumer_attribute_changed(Some("#a"), Some("#a")));
        assert!(!consumer_attribute_changed(Some("#a"), Some("")));
        assert!(!consumer_attribute_changed(Some("#a"), None));
    }

    #[test]
    fn geometry_change_against_snapshot() {
        let mut cache = SnapshotCache::new();
        let id = ElementId::from("mask");
        // No baseline yet.
        assert!(!source_geometry_changed(&cache, &id, &snap(1.0)));

        cache.insert(id.clone(), snap(1.0));
        assert!(!source_geometry_changed(&cache, &id, &snap(1.0)));
        assert!(source_geometry_changed(&cache, &id, &snap(2.0)));
        assert!(source_geometry_changed(
            &cache,
            &id,
            &TransformSnapshot {
                rotate_z: 45.0,
                ..snap(1.0)
            }
        ));
    }
}
