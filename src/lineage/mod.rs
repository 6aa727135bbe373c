//! The Image Lineage Graph (L3, spec.md §4.3) — an arena-backed DAG of
//! container image build relationships, queried for ancestors,
//! descendants, and lowest common ancestors during blast-radius
//! calculation.

use crate::config::AssetMatchPolicy;
use crate::error::{CoreError, CoreResult};
use crate::models::{Image, ImageCoordinate, ImageLineageEdge};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};

/// Traversal never looks deeper than this many hops, guarding against
/// pathological or cyclic lineage data (spec.md §4.3's edge cases).
pub const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Read-side port onto wherever image, coordinate, and lineage-edge
/// records actually live. The graph itself is built in memory from
/// whatever this source returns.
#[async_trait]
pub trait LineageSource: Send + Sync {
    async fn images(&self, org_id: &str) -> CoreResult<Vec<Image>>;
    async fn coordinates(&self, org_id: &str) -> CoreResult<Vec<ImageCoordinate>>;
    async fn edges(&self, org_id: &str) -> CoreResult<Vec<ImageLineageEdge>>;
}

/// One node's traversal-relevant state inside the arena.
#[derive(Debug, Clone)]
struct Node {
    image: Image,
    parents: Vec<usize>,
    children: Vec<usize>,
}

/// An arena-indexed lineage graph. Indices are stable for the lifetime
/// of the graph; nothing here uses `Rc<RefCell<_>>` — parent/child
/// links are plain `usize` indices into `nodes`.
#[derive(Debug, Clone)]
pub struct LineageGraph {
    nodes: Vec<Node>,
    index_by_coordinate: HashMap<String, usize>,
    index_by_id: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphInfo {
    pub image_count: usize,
    pub edge_count: usize,
    pub root_count: usize,
}

/// Per-image lineage summary (spec.md §4.3's `info(id)` operation).
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub parent_count: usize,
    pub direct_child_count: usize,
    pub total_descendants: usize,
    pub max_depth: usize,
    pub root_ancestor: Option<Image>,
}

impl LineageGraph {
    /// Builds a graph from a flat image list, coordinate table, and edge
    /// list. Edges and coordinates whose image id is unknown are dropped
    /// rather than rejected — lineage data is frequently incomplete in
    /// practice.
    pub fn build_graph(
        images: Vec<Image>,
        coordinates: Vec<ImageCoordinate>,
        edges: Vec<ImageLineageEdge>,
    ) -> Self {
        let mut nodes: Vec<Node> = images
            .into_iter()
            .map(|image| Node {
                image,
                parents: Vec::new(),
                children: Vec::new(),
            })
            .collect();

        let mut index_by_id = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index_by_id.insert(node.image.id.clone(), i);
        }

        let mut index_by_coordinate = HashMap::with_capacity(coordinates.len());
        for coordinate in coordinates {
            if let Some(&i) = index_by_id.get(&coordinate.image_id) {
                index_by_coordinate.insert(coordinate.identifier, i);
            }
        }

        for edge in edges {
            let (Some(&parent), Some(&child)) = (
                index_by_id.get(&edge.parent_image_id),
                index_by_id.get(&edge.child_image_id),
            ) else {
                continue;
            };
            // A self-referential edge is dropped rather than letting a
            // later traversal loop on it forever.
            if parent == child {
                continue;
            }
            nodes[parent].children.push(child);
            nodes[child].parents.push(parent);
        }

        Self {
            nodes,
            index_by_coordinate,
            index_by_id,
        }
    }

    pub fn info(&self) -> GraphInfo {
        let edge_count: usize = self.nodes.iter().map(|n| n.children.len()).sum();
        let root_count = self.nodes.iter().filter(|n| n.parents.is_empty()).count();
        GraphInfo {
            image_count: self.nodes.len(),
            edge_count,
            root_count,
        }
    }

    /// Per-image lineage summary: parent/child counts, the size and
    /// depth of the full descendant subtree, and the furthest root
    /// ancestor reachable from `id` (`None` when `id` is itself a root).
    pub fn image_info(&self, id: &str) -> CoreResult<ImageInfo> {
        let &idx = self
            .index_by_id
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("image {id} not found in lineage graph")))?;
        let node = &self.nodes[idx];

        // `depths_from` includes `id` itself at depth 0; exclude it from
        // both counts below, it is neither its own descendant nor ancestor.
        let descendant_depths = self.depths_from(id, true)?;
        let total_descendants = descendant_depths.len() - 1;
        let max_depth = descendant_depths.values().copied().filter(|&d| d > 0).max().unwrap_or(0);

        let ancestor_depths = self.depths_from(id, false)?;
        let root_ancestor = ancestor_depths
            .iter()
            .filter(|(&ancestor_idx, &depth)| depth > 0 && self.nodes[ancestor_idx].parents.is_empty())
            .max_by_key(|(_, &depth)| depth)
            .map(|(&ancestor_idx, _)| self.nodes[ancestor_idx].image.clone());

        Ok(ImageInfo {
            parent_count: node.parents.len(),
            direct_child_count: node.children.len(),
            total_descendants,
            max_depth,
            root_ancestor,
        })
    }

    pub fn image_by_id(&self, id: &str) -> Option<&Image> {
        self.index_by_id.get(id).map(|&i| &self.nodes[i].image)
    }

    pub fn image_by_coordinate_identifier(&self, identifier: &str) -> Option<&Image> {
        self.index_by_coordinate.get(identifier).map(|&i| &self.nodes[i].image)
    }

    /// Asset attribution (spec.md §4.4 step 4): an asset's `image_ref`
    /// matches an affected image when it hits a known coordinate
    /// identifier (exact, or substring when `policy` allows it) or
    /// simply contains the image's family or version string. Returns the
    /// first match found; an asset is only ever reported once regardless
    /// of how many images it would otherwise match.
    pub fn match_asset_image_ref(&self, image_ref: &str, policy: &AssetMatchPolicy) -> Option<&Image> {
        if let Some(&idx) = self.index_by_coordinate.get(image_ref) {
            return Some(&self.nodes[idx].image);
        }
        if policy.allow_substring_fallback {
            for (identifier, &idx) in &self.index_by_coordinate {
                if image_ref.contains(identifier.as_str()) || identifier.contains(image_ref) {
                    return Some(&self.nodes[idx].image);
                }
            }
        }
        self.nodes
            .iter()
            .find(|node| image_ref.contains(&node.image.family) || image_ref.contains(&node.image.version))
            .map(|node| &node.image)
    }

    /// The immediate children of `id`, not the full transitive set.
    pub fn children_of(&self, id: &str) -> CoreResult<Vec<Image>> {
        let &idx = self
            .index_by_id
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("image {id} not found in lineage graph")))?;
        Ok(self.nodes[idx].children.iter().map(|&c| self.nodes[c].image.clone()).collect())
    }

    /// Breadth-first walk over `children` edges, bounded by
    /// `MAX_TRAVERSAL_DEPTH` and guarded against cycles with a visited
    /// set. Returns images strictly below `id`, nearest first.
    pub fn descendants(&self, id: &str) -> CoreResult<Vec<Image>> {
        self.walk(id, true)
    }

    /// Same as `descendants` but over `parents` edges.
    pub fn ancestors(&self, id: &str) -> CoreResult<Vec<Image>> {
        self.walk(id, false)
    }

    fn walk(&self, id: &str, forward: bool) -> CoreResult<Vec<Image>> {
        let &start = self
            .index_by_id
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("image {id} not found in lineage graph")))?;

        let mut visited: HashSet<usize> = HashSet::new();
        visited.insert(start);
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        queue.push_back((start, 0));
        let mut result = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= MAX_TRAVERSAL_DEPTH {
                continue;
            }
            let neighbors = if forward {
                &self.nodes[current].children
            } else {
                &self.nodes[current].parents
            };
            for &next in neighbors {
                if visited.insert(next) {
                    result.push(self.nodes[next].image.clone());
                    queue.push_back((next, depth + 1));
                }
            }
        }

        Ok(result)
    }

    /// The lowest common ancestor of two images: the ancestor with the
    /// smallest combined hop distance from both. Returns `None` when the
    /// images share no ancestor.
    pub fn lowest_common_ancestor(&self, a: &str, b: &str) -> CoreResult<Option<Image>> {
        let ancestors_a = self.depths_from(a, false)?;
        let ancestors_b = self.depths_from(b, false)?;

        if let (Some(&idx_a), Some(&idx_b)) = (self.index_by_id.get(a), self.index_by_id.get(b)) {
            if idx_a == idx_b {
                return Ok(Some(self.nodes[idx_a].image.clone()));
            }
        }

        let mut best: Option<(usize, usize)> = None; // (node index, combined depth)
        for (&node, &depth_a) in &ancestors_a {
            if let Some(&depth_b) = ancestors_b.get(&node) {
                let combined = depth_a + depth_b;
                if best.map(|(_, d)| combined < d).unwrap_or(true) {
                    best = Some((node, combined));
                }
            }
        }

        Ok(best.map(|(node, _)| self.nodes[node].image.clone()))
    }

    /// BFS depth map over `parents` edges (`forward = false`) or
    /// `children` edges (`forward = true`), starting at `id` itself
    /// (depth 0, included in the map).
    fn depths_from(&self, id: &str, forward: bool) -> CoreResult<HashMap<usize, usize>> {
        let &start = self
            .index_by_id
            .get(id)
            .ok_or_else(|| CoreError::NotFound(format!("image {id} not found in lineage graph")))?;

        let mut depths = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back((start, 0));
        depths.insert(start, 0);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= MAX_TRAVERSAL_DEPTH {
                continue;
            }
            let neighbors = if forward {
                &self.nodes[current].children
            } else {
                &self.nodes[current].parents
            };
            for &next in neighbors {
                if !depths.contains_key(&next) {
                    depths.insert(next, depth + 1);
                    queue.push_back((next, depth + 1));
                }
            }
        }

        Ok(depths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, family: &str, version: &str) -> Image {
        Image {
            id: id.to_string(),
            org_id: "org-1".to_string(),
            family: family.to_string(),
            version: version.to_string(),
        }
    }

    fn coordinate(identifier: &str, image_id: &str) -> ImageCoordinate {
        ImageCoordinate {
            identifier: identifier.to_string(),
            image_id: image_id.to_string(),
        }
    }

    fn edge(parent: &str, child: &str) -> ImageLineageEdge {
        ImageLineageEdge {
            parent_image_id: parent.to_string(),
            child_image_id: child.to_string(),
        }
    }

    /// base -> intermediate -> leaf_a
    ///                      -> leaf_b
    fn diamond_graph() -> LineageGraph {
        let images = vec![
            image("base", "base", "v1"),
            image("intermediate", "app", "v1"),
            image("leaf_a", "app", "v1-a"),
            image("leaf_b", "app", "v1-b"),
        ];
        let coordinates = vec![coordinate("app:v1-a", "leaf_a")];
        let edges = vec![
            edge("base", "intermediate"),
            edge("intermediate", "leaf_a"),
            edge("intermediate", "leaf_b"),
        ];
        LineageGraph::build_graph(images, coordinates, edges)
    }

    #[test]
    fn descendants_returns_all_downstream_images() {
        let graph = diamond_graph();
        let descendants = graph.descendants("base").unwrap();
        assert_eq!(descendants.len(), 3);
    }

    #[test]
    fn ancestors_returns_all_upstream_images() {
        let graph = diamond_graph();
        let ancestors = graph.ancestors("leaf_a").unwrap();
        let ids: Vec<_> = ancestors.iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, vec!["intermediate".to_string(), "base".to_string()]);
    }

    #[test]
    fn lowest_common_ancestor_of_siblings_is_their_parent() {
        let graph = diamond_graph();
        let lca = graph.lowest_common_ancestor("leaf_a", "leaf_b").unwrap().unwrap();
        assert_eq!(lca.id, "intermediate");
    }

    #[test]
    fn lowest_common_ancestor_with_no_shared_ancestor_is_none() {
        let images = vec![image("x", "x", "v1"), image("y", "y", "v1")];
        let graph = LineageGraph::build_graph(images, vec![], vec![]);
        assert!(graph.lowest_common_ancestor("x", "y").unwrap().is_none());
    }

    #[test]
    fn unknown_image_id_is_not_found() {
        let graph = diamond_graph();
        let err = graph.descendants("nonexistent").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn coordinate_lookup_resolves_to_the_right_image() {
        let graph = diamond_graph();
        let image = graph.image_by_coordinate_identifier("app:v1-a").unwrap();
        assert_eq!(image.id, "leaf_a");
        assert!(graph.image_by_coordinate_identifier("missing").is_none());
    }

    #[test]
    fn self_referential_edge_is_dropped_without_panicking() {
        let images = vec![image("a", "a", "v1")];
        let edges = vec![edge("a", "a")];
        let graph = LineageGraph::build_graph(images, vec![], edges);
        assert_eq!(graph.descendants("a").unwrap().len(), 0);
    }

    #[test]
    fn cycle_does_not_cause_infinite_traversal() {
        // a -> b -> c -> a (a manufactured cycle; real lineage shouldn't
        // have one, but the graph must survive it).
        let images = vec![image("a", "a", "v1"), image("b", "b", "v1"), image("c", "c", "v1")];
        let edges = vec![edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let graph = LineageGraph::build_graph(images, vec![], edges);
        let descendants = graph.descendants("a").unwrap();
        assert_eq!(descendants.len(), 2);
    }

    #[test]
    fn traversal_depth_is_capped() {
        let mut images = Vec::new();
        let mut edges = Vec::new();
        for i in 0..(MAX_TRAVERSAL_DEPTH + 5) {
            images.push(image(&format!("n{i}"), "chain", "v1"));
            if i > 0 {
                edges.push(edge(&format!("n{}", i - 1), &format!("n{i}")));
            }
        }
        let graph = LineageGraph::build_graph(images, vec![], edges);
        let descendants = graph.descendants("n0").unwrap();
        assert_eq!(descendants.len(), MAX_TRAVERSAL_DEPTH);
    }

    #[test]
    fn match_asset_image_ref_falls_back_to_family_substring() {
        let graph = diamond_graph();
        let policy = AssetMatchPolicy {
            allow_substring_fallback: true,
        };
        let image = graph.match_asset_image_ref("registry.example.com/app:v1-a-prod", &policy).unwrap();
        assert_eq!(image.id, "leaf_a");
    }

    #[test]
    fn match_asset_image_ref_exact_coordinate_wins() {
        let graph = diamond_graph();
        let policy = AssetMatchPolicy {
            allow_substring_fallback: false,
        };
        let image = graph.match_asset_image_ref("app:v1-a", &policy).unwrap();
        assert_eq!(image.id, "leaf_a");
    }

    #[test]
    fn graph_info_reports_roots_and_edges() {
        let graph = diamond_graph();
        let info = graph.info();
        assert_eq!(info.image_count, 4);
        assert_eq!(info.edge_count, 3);
        assert_eq!(info.root_count, 1);
    }

    #[test]
    fn image_info_reports_intermediate_node_shape() {
        let graph = diamond_graph();
        let info = graph.image_info("intermediate").unwrap();
        assert_eq!(info.parent_count, 1);
        assert_eq!(info.direct_child_count, 2);
        assert_eq!(info.total_descendants, 2);
        assert_eq!(info.max_depth, 1);
        assert_eq!(info.root_ancestor.unwrap().id, "base");
    }

    #[test]
    fn image_info_for_a_root_has_no_root_ancestor() {
        let graph = diamond_graph();
        let info = graph.image_info("base").unwrap();
        assert_eq!(info.parent_count, 0);
        assert_eq!(info.direct_child_count, 1);
        assert_eq!(info.total_descendants, 3);
        assert_eq!(info.max_depth, 2);
        assert!(info.root_ancestor.is_none());
    }

    #[test]
    fn image_info_for_unknown_id_is_not_found() {
        let graph = diamond_graph();
        let err = graph.image_info("nonexistent").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
