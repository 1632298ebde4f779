//! Tag hierarchy projection and traversal.
//!
//! The store holds raw parent → child edges. This module turns an edge list
//! into the per-tag `{parents, children}` view and answers transitive
//! ancestor/descendant queries over it.
//!
//! [`build_hierarchy`] is a pure projection: it keeps duplicate edges and
//! tolerates cycles, so it is total over whatever the store returns. Write
//! paths use [`would_create_cycle`] to keep cycles out in the first place.

use std::collections::{HashSet, VecDeque};

use crate::tags::{HierarchyEdge, TagHierarchy, TagHierarchyNode};

/// Build the tag → `{parents, children}` mapping from an edge list.
///
/// Every tag appearing as parent or child becomes a key. Parents and
/// children keep edge-insertion order.
pub fn build_hierarchy<'a, I>(edges: I) -> TagHierarchy
where
    I: IntoIterator<Item = &'a HierarchyEdge>,
{
    let mut hierarchy = TagHierarchy::new();

    for edge in edges {
        hierarchy
            .entry(edge.parent_tag.clone())
            .or_default()
            .children
            .push(edge.child_tag.clone());
        hierarchy
            .entry(edge.child_tag.clone())
            .or_default()
            .parents
            .push(edge.parent_tag.clone());
    }

    hierarchy
}

/// Node for a tag, defaulting to empty when the tag has no edges.
pub fn node_for(hierarchy: &TagHierarchy, tag: &str) -> TagHierarchyNode {
    hierarchy.get(tag).cloned().unwrap_or_default()
}

/// All transitive parents of `tag`, nearest first.
pub fn ancestors(hierarchy: &TagHierarchy, tag: &str) -> Vec<String> {
    walk(hierarchy, tag, |node| &node.parents)
}

/// All transitive children of `tag`, nearest first.
pub fn descendants(hierarchy: &TagHierarchy, tag: &str) -> Vec<String> {
    walk(hierarchy, tag, |node| &node.children)
}

/// True if adding `parent → child` would make `parent` reachable from itself.
pub fn would_create_cycle(hierarchy: &TagHierarchy, parent: &str, child: &str) -> bool {
    if parent == child {
        return true;
    }
    descendants(hierarchy, child).iter().any(|t| t == parent)
}

/// Breadth-first walk; each tag is reported once and the start is excluded.
fn walk<F>(hierarchy: &TagHierarchy, start: &str, next: F) -> Vec<String>
where
    F: Fn(&TagHierarchyNode) -> &Vec<String>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    let mut out = Vec::new();

    seen.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let Some(node) = hierarchy.get(current) else {
            continue;
        };
        for neighbour in next(node) {
            if seen.insert(neighbour.as_str()) {
                out.push(neighbour.clone());
                queue.push_back(neighbour.as_str());
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, &str)]) -> Vec<HierarchyEdge> {
        pairs.iter().map(|(p, c)| HierarchyEdge::new(*p, *c)).collect()
    }

    #[test]
    fn test_every_tag_in_an_edge_is_a_key() {
        let e = edges(&[("music", "rock"), ("rock", "punk"), ("music", "jazz")]);
        let h = build_hierarchy(&e);

        for edge in &e {
            assert!(h.contains_key(&edge.parent_tag));
            assert!(h.contains_key(&edge.child_tag));
            assert!(h[&edge.parent_tag].children.contains(&edge.child_tag));
            assert!(h[&edge.child_tag].parents.contains(&edge.parent_tag));
        }
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let e = edges(&[("music", "rock"), ("music", "jazz"), ("music", "blues")]);
        let h = build_hierarchy(&e);
        assert_eq!(h["music"].children, vec!["rock", "jazz", "blues"]);
        assert!(h["music"].parents.is_empty());
    }

    #[test]
    fn test_multiple_parents() {
        let e = edges(&[("rock", "grunge"), ("alternative", "grunge")]);
        let h = build_hierarchy(&e);
        assert_eq!(h["grunge"].parents, vec!["rock", "alternative"]);
    }

    #[test]
    fn test_tag_without_edges_is_absent() {
        let h = build_hierarchy(&edges(&[("a", "b")]));
        assert!(!h.contains_key("c"));
        assert_eq!(node_for(&h, "c"), TagHierarchyNode::default());
    }

    #[test]
    fn test_duplicates_kept_by_projection() {
        let h = build_hierarchy(&edges(&[("a", "b"), ("a", "b")]));
        assert_eq!(h["a"].children, vec!["b", "b"]);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let h = build_hierarchy(&edges(&[
            ("music", "rock"),
            ("rock", "punk"),
            ("punk", "hardcore"),
            ("music", "jazz"),
        ]));

        assert_eq!(ancestors(&h, "hardcore"), vec!["punk", "rock", "music"]);
        assert_eq!(
            descendants(&h, "music"),
            vec!["rock", "jazz", "punk", "hardcore"]
        );
        assert!(ancestors(&h, "music").is_empty());
        assert!(descendants(&h, "unknown").is_empty());
    }

    #[test]
    fn test_diamond_reports_each_tag_once() {
        let h = build_hierarchy(&edges(&[
            ("top", "left"),
            ("top", "right"),
            ("left", "bottom"),
            ("right", "bottom"),
        ]));
        assert_eq!(descendants(&h, "top"), vec!["left", "right", "bottom"]);
        assert_eq!(ancestors(&h, "bottom"), vec!["left", "right", "top"]);
    }

    #[test]
    fn test_walk_terminates_on_cycle() {
        let h = build_hierarchy(&edges(&[("a", "b"), ("b", "c"), ("c", "a")]));
        assert_eq!(descendants(&h, "a"), vec!["b", "c"]);
    }

    #[test]
    fn test_would_create_cycle() {
        let h = build_hierarchy(&edges(&[("music", "rock"), ("rock", "punk")]));
        assert!(would_create_cycle(&h, "punk", "music"));
        assert!(would_create_cycle(&h, "rock", "rock"));
        assert!(!would_create_cycle(&h, "music", "punk"));
        assert!(!would_create_cycle(&h, "jazz", "music"));
    }
}
