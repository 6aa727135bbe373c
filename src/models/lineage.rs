//! Image identity and the parent-of lineage relation (spec.md §3, §4.3).

use serde::{Deserialize, Serialize};

/// A directed child->parent edge in the org's image lineage graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ImageLineageEdge {
    pub child_image_id: String,
    pub parent_image_id: String,
}

/// The identity of an image family/version, independent of lineage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub id: String,
    pub org_id: String,
    pub family: String,
    pub version: String,
}

/// A known coordinate identifier an asset's `image_ref` can match exactly
/// (spec.md §6's `image_coordinates` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ImageCoordinate {
    pub identifier: String,
    pub image_id: String,
}
