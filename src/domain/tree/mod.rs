//! Tree model for menus
//!
//! Converts between the flat parent-pointer representation that is
//! persisted and the nested representation that is rendered, and answers
//! the structural questions the mutation engine asks.
//!
//! Every function here is pure: the forest comes in by reference and any
//! new structure is returned by value. Walks use explicit stacks, so a
//! malformed or very deep menu cannot overflow the call stack.

use std::collections::{HashMap, HashSet};

use crate::domain::aggregates::menu_item::{MenuItem, MenuNode, OrderingEntry};
use crate::domain::value_objects::{DepthLimit, MenuItemId};

pub mod mutation;

#[cfg(test)]
pub(crate) mod fixtures;

/// One row of a pre-order walk over a forest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatNode {
    pub item: MenuItem,
    /// Zero-based depth (`0` for root items).
    pub depth: usize,
    /// Row of the direct parent in the same walk. Parents always come first.
    pub parent_row: Option<usize>,
    /// Position within the sibling list the item was found in.
    pub index: usize,
    pub child_count: usize,
}

impl FlatNode {
    pub fn id(&self) -> &MenuItemId { &self.item.id }
}

/// Rows of the ancestors of `rows[at]`, nearest first.
pub fn ancestors(rows: &[FlatNode], at: usize) -> impl Iterator<Item = &FlatNode> + '_ {
    std::iter::successors(rows.get(at).and_then(|row| row.parent_row), |pos| rows.get(*pos).and_then(|row| row.parent_row))
        .filter_map(|pos| rows.get(pos))
}

/// Flatten a forest into a deterministic pre-order list annotated with
/// depth and a link to the parent row.
pub fn flatten(forest: &[MenuNode]) -> Vec<FlatNode> {
    let mut rows = Vec::new();
    let mut stack: Vec<(&MenuNode, usize, Option<usize>, usize)> = forest
        .iter()
        .enumerate()
        .rev()
        .map(|(index, node)| (node, 0, None, index))
        .collect();

    while let Some((node, depth, parent_row, index)) = stack.pop() {
        let row = rows.len();
        for (child_index, child) in node.children.iter().enumerate().rev() {
            stack.push((child, depth + 1, Some(row), child_index));
        }
        rows.push(FlatNode {
            item: node.item.clone(),
            depth,
            parent_row,
            index,
            child_count: node.children.len(),
        });
    }
    rows
}

/// Flat items of a forest in pre-order, without annotations.
pub fn items(forest: &[MenuNode]) -> Vec<MenuItem> {
    flatten(forest).into_iter().map(|row| row.item).collect()
}

/// `{id, parent_id, order}` for every item of the forest, parents first.
pub fn ordering(forest: &[MenuNode]) -> Vec<OrderingEntry> {
    flatten(forest).iter().map(|row| row.item.ordering_entry()).collect()
}

/// Build the nested forest from flat items.
///
/// Items are grouped by `parent_id` and every sibling group is sorted by
/// `order` (ties keep input order). An item whose parent does not resolve,
/// or that points at itself, becomes a root. Items caught in a parent
/// cycle are unreachable from the roots; the first of them in input order
/// is promoted to root so its cycle hangs below it. Nothing is dropped
/// except exact duplicate ids, where the first occurrence wins.
///
/// Nesting is not bounded here; run untrusted input through [`heal`] or
/// check [`Resolved::depth`] first.
pub fn build_hierarchy(items: &[MenuItem]) -> Vec<MenuNode> {
    assemble(resolve(items).into_iter().map(|resolved| resolved.item).collect())
}

/// An item with its parent settled, as placed by [`resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub item: MenuItem,
    pub depth: usize,
}

/// Settle every parent pointer without building the nested forest.
///
/// Applies the same repairs as [`build_hierarchy`] and returns the items in
/// pre-order with their zero-based depth. Runs in linear time and memory
/// however deep the stored chain is.
pub fn resolve(items: &[MenuItem]) -> Vec<Resolved> {
    let mut seen: HashSet<&MenuItemId> = HashSet::with_capacity(items.len());
    let mut unique: Vec<&MenuItem> = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(&item.id) {
            unique.push(item);
        } else {
            tracing::warn!(item = %item.id, "duplicate menu item id, keeping first occurrence");
        }
    }

    let mut groups: HashMap<Option<MenuItemId>, Vec<MenuItem>> = HashMap::new();
    for item in &unique {
        let mut item = (*item).clone();
        let resolvable = item
            .parent_id
            .as_ref()
            .is_some_and(|parent| parent != &item.id && seen.contains(parent));
        if item.parent_id.is_some() && !resolvable {
            tracing::warn!(item = %item.id, parent = ?item.parent_id, "unresolvable parent, promoting item to root");
            item.parent_id = None;
        }
        groups.entry(item.parent_id.clone()).or_default().push(item);
    }
    for group in groups.values_mut() {
        group.sort_by_key(|item| item.order);
    }

    let mut visited: Vec<Resolved> = Vec::with_capacity(unique.len());
    let mut placed: HashSet<MenuItemId> = HashSet::with_capacity(unique.len());
    let mut stack: Vec<(MenuItem, usize)> = groups.remove(&None).unwrap_or_default().into_iter().rev().map(|item| (item, 0)).collect();
    walk_groups(&mut stack, &mut groups, &mut visited, &mut placed);

    // Whatever is left hangs off a cycle.
    let mut seeds = unique.iter();
    while !groups.is_empty() {
        let Some(seed) = seeds.find(|item| !placed.contains(&item.id)) else {
            break;
        };
        let key = seed.parent_id.clone();
        let mut promoted = None;
        if let Some(group) = groups.get_mut(&key) {
            if let Some(pos) = group.iter().position(|item| item.id == seed.id) {
                promoted = Some(group.remove(pos));
            }
            if group.is_empty() {
                groups.remove(&key);
            }
        }
        let Some(mut promoted) = promoted else {
            continue;
        };
        tracing::warn!(item = %promoted.id, "menu item is part of a parent cycle, promoting to root");
        promoted.parent_id = None;
        stack.push((promoted, 0));
        walk_groups(&mut stack, &mut groups, &mut visited, &mut placed);
    }

    visited
}

fn walk_groups(
    stack: &mut Vec<(MenuItem, usize)>,
    groups: &mut HashMap<Option<MenuItemId>, Vec<MenuItem>>,
    visited: &mut Vec<Resolved>,
    placed: &mut HashSet<MenuItemId>,
) {
    while let Some((item, depth)) = stack.pop() {
        if let Some(children) = groups.remove(&Some(item.id.clone())) {
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }
        placed.insert(item.id.clone());
        visited.push(Resolved { item, depth });
    }
}

/// Flat repair pass for stored menus.
///
/// Resolves parents like [`resolve`], renumbers every sibling group and
/// lifts anything below the last allowed level up to it: an item whose
/// parent already sits on the last level is re-parented to that parent's
/// parent and appended there, in pre-order. The nested forest built from
/// the result never exceeds `limit`.
pub fn heal(items: &[MenuItem], limit: DepthLimit) -> Vec<MenuItem> {
    let mut flat: Vec<MenuItem> = resolve(items).into_iter().map(|resolved| resolved.item).collect();
    densify_all(&mut flat);

    let last = limit.levels() - 1;
    let offset = flat.len();
    let mut placed: HashMap<MenuItemId, (usize, Option<MenuItemId>)> = HashMap::with_capacity(flat.len());
    let mut lifted = 0;
    for (pos, item) in flat.iter_mut().enumerate() {
        // Pre-order: the parent is always placed already.
        let parent = item.parent_id.clone().and_then(|parent| placed.get(&parent).map(|(depth, up)| (parent, *depth, up.clone())));
        let depth = match parent {
            None => 0,
            Some((_, depth, _)) if depth < last => depth + 1,
            Some((parent, _, up)) => {
                tracing::debug!(item = %item.id, parent = %parent, "menu item nested past the depth limit, lifting");
                item.parent_id = up;
                item.order = offset + pos;
                lifted += 1;
                last
            }
        };
        placed.insert(item.id.clone(), (depth, item.parent_id.clone()));
    }
    if lifted > 0 {
        tracing::warn!(lifted, levels = limit.levels(), "menu nested deeper than allowed, items lifted");
        densify_all(&mut flat);
    }
    flat
}

// Children always follow their parent in pre-order, so walking it
// backwards finishes every child list before its parent is built.
fn assemble(pre_order: Vec<MenuItem>) -> Vec<MenuNode> {
    let mut finished: HashMap<Option<MenuItemId>, Vec<MenuNode>> = HashMap::new();
    for item in pre_order.into_iter().rev() {
        let mut children = finished.remove(&Some(item.id.clone())).unwrap_or_default();
        children.reverse();
        let parent = item.parent_id.clone();
        finished.entry(parent).or_default().push(MenuNode { item, children });
    }
    let mut roots = finished.remove(&None).unwrap_or_default();
    roots.reverse();
    roots
}

pub fn find_node<'a>(forest: &'a [MenuNode], id: &MenuItemId) -> Option<&'a MenuNode> {
    let mut stack: Vec<&MenuNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        if &node.item.id == id {
            return Some(node);
        }
        stack.extend(node.children.iter());
    }
    None
}

/// Ids of every item below `node_id`, excluding `node_id` itself.
pub fn find_descendants(forest: &[MenuNode], node_id: &MenuItemId) -> HashSet<MenuItemId> {
    let mut found = HashSet::new();
    let Some(node) = find_node(forest, node_id) else {
        return found;
    };
    let mut stack: Vec<&MenuNode> = node.children.iter().collect();
    while let Some(current) = stack.pop() {
        found.insert(current.item.id.clone());
        stack.extend(current.children.iter());
    }
    found
}

/// Whether `node_id` may hang below `candidate_parent` (`None` is the root).
pub fn can_reparent(forest: &[MenuNode], node_id: &MenuItemId, candidate_parent: Option<&MenuItemId>) -> bool {
    match candidate_parent {
        None => true,
        Some(parent) if parent == node_id => false,
        Some(parent) => !find_descendants(forest, node_id).contains(parent),
    }
}

/// Number of levels in the forest (`0` when empty, `1` when flat).
///
/// The walk never descends past `limit`; a result of `limit.levels() + 1`
/// means the forest is deeper than allowed.
pub fn max_depth(forest: &[MenuNode], limit: DepthLimit) -> usize {
    let ceiling = limit.levels() + 1;
    let mut deepest = 0;
    let mut stack: Vec<(&MenuNode, usize)> = forest.iter().map(|node| (node, 1)).collect();
    while let Some((node, level)) = stack.pop() {
        deepest = deepest.max(level);
        if level < ceiling {
            stack.extend(node.children.iter().map(|child| (child, level + 1)));
        }
    }
    deepest
}

/// Levels occupied by `node` and everything below it (`1` for a leaf),
/// saturating one past `limit`.
pub fn subtree_height(node: &MenuNode, limit: DepthLimit) -> usize {
    max_depth(std::slice::from_ref(node), limit)
}

/// Reassign `order` to `0..n-1` within the sibling group of `parent`,
/// keeping the current relative order.
pub fn densify(items: &mut [MenuItem], parent: Option<&MenuItemId>) {
    let mut group: Vec<(usize, usize)> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.parent_id.as_ref() == parent)
        .map(|(pos, item)| (item.order, pos))
        .collect();
    group.sort();
    for (rank, (_, pos)) in group.into_iter().enumerate() {
        items[pos].order = rank;
    }
}

/// Densify every sibling group.
pub fn densify_all(items: &mut [MenuItem]) {
    let mut groups: HashMap<Option<MenuItemId>, Vec<(usize, usize)>> = HashMap::new();
    for (pos, item) in items.iter().enumerate() {
        groups.entry(item.parent_id.clone()).or_default().push((item.order, pos));
    }
    for mut group in groups.into_values() {
        group.sort();
        for (rank, (_, pos)) in group.into_iter().enumerate() {
            items[pos].order = rank;
        }
    }
}

/// Whether every sibling group of `items` is ranked exactly `0..n-1`.
pub fn is_dense(items: &[MenuItem]) -> bool {
    let mut groups: HashMap<Option<&MenuItemId>, Vec<usize>> = HashMap::new();
    for item in items {
        groups.entry(item.parent_id.as_ref()).or_default().push(item.order);
    }
    groups.into_values().all(|mut orders| {
        orders.sort_unstable();
        orders.iter().enumerate().all(|(rank, order)| rank == *order)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::{chain, item, shape};

    fn sample() -> Vec<MenuNode> {
        build_hierarchy(&[
            item("B", None, 1),
            item("A1", Some("A"), 0),
            item("A", None, 0),
            item("A2a", Some("A2"), 0),
            item("A2", Some("A"), 1),
            item("C", None, 2),
        ])
    }

    fn ids(rows: &[FlatNode]) -> Vec<&str> {
        rows.iter().map(|row| row.id().as_str()).collect()
    }

    #[test]
    fn build_hierarchy_groups_by_parent_and_sorts_by_order() {
        let forest = sample();
        assert_eq!(forest.iter().map(|n| n.id().as_str()).collect::<Vec<_>>(), vec!["A", "B", "C"]);
        let a = &forest[0];
        assert_eq!(a.children.iter().map(|n| n.id().as_str()).collect::<Vec<_>>(), vec!["A1", "A2"]);
        assert_eq!(a.children[1].children[0].id().as_str(), "A2a");
    }

    #[test]
    fn build_hierarchy_promotes_unresolvable_parent_to_root() {
        let forest = build_hierarchy(&[item("A", None, 0), item("orphan", Some("missing"), 0)]);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[1].id().as_str(), "orphan");
        assert_eq!(forest[1].item.parent_id, None);
    }

    #[test]
    fn build_hierarchy_keeps_items_caught_in_a_cycle() {
        let forest = build_hierarchy(&[item("R", None, 0), item("X", Some("Y"), 0), item("Y", Some("X"), 0)]);
        let rows = flatten(&forest);
        assert_eq!(ids(&rows), vec!["R", "X", "Y"]);
        assert_eq!(rows[1].item.parent_id, None);
        assert_eq!(rows[2].item.parent_id, Some(MenuItemId::from("X")));
    }

    #[test]
    fn build_hierarchy_treats_self_parent_as_root() {
        let forest = build_hierarchy(&[item("A", Some("A"), 0)]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].item.parent_id, None);
    }

    #[test]
    fn build_hierarchy_drops_duplicate_ids() {
        let forest = build_hierarchy(&[item("A", None, 0), item("A", None, 1)]);
        assert_eq!(flatten(&forest).len(), 1);
    }

    #[test]
    fn flatten_is_pre_order_with_depth_path_and_index() {
        let rows = flatten(&sample());
        assert_eq!(ids(&rows), vec!["A", "A1", "A2", "A2a", "B", "C"]);
        assert_eq!(rows.iter().map(|r| r.depth).collect::<Vec<_>>(), vec![0, 1, 1, 2, 0, 0]);
        assert_eq!(rows[3].parent_row, Some(2));
        assert_eq!(rows[2].index, 1);
        assert_eq!(rows[0].child_count, 2);
        assert_eq!(ancestors(&rows, 3).map(|row| row.id().as_str()).collect::<Vec<_>>(), vec!["A2", "A"]);
        assert_eq!(ancestors(&rows, 0).count(), 0);
    }

    #[test]
    fn flatten_then_build_round_trips() {
        let forest = sample();
        assert_eq!(build_hierarchy(&items(&forest)), forest);
    }

    #[test]
    fn resolve_reports_depth_in_pre_order() {
        let resolved = resolve(&[item("B", None, 1), item("A1", Some("A"), 0), item("A", None, 0), item("X", Some("Y"), 0), item("Y", Some("X"), 0)]);
        let placed: Vec<_> = resolved.iter().map(|r| (r.item.id.as_str(), r.depth)).collect();
        assert_eq!(placed, vec![("A", 0), ("A1", 1), ("B", 0), ("X", 0), ("Y", 1)]);
    }

    #[test]
    fn resolve_handles_a_chain_far_deeper_than_any_limit() {
        let resolved = resolve(&chain(100_000));
        assert_eq!(resolved.len(), 100_000);
        assert_eq!(resolved.last().map(|r| r.depth), Some(99_999));
    }

    #[test]
    fn heal_lifts_items_below_the_last_level() {
        let healed = heal(&[item("A", None, 0), item("A1", Some("A"), 0), item("x", Some("A1"), 0), item("x1", Some("x"), 0), item("y", Some("A1"), 1)], DepthLimit::new(2));
        assert_eq!(
            shape(&healed),
            vec![("A", None, 0), ("A1", Some("A"), 0), ("x", Some("A"), 1), ("x1", Some("A"), 2), ("y", Some("A"), 3)]
        );
        assert_eq!(max_depth(&build_hierarchy(&healed), DepthLimit::new(2)), 2);
    }

    #[test]
    fn heal_lifts_to_the_root_with_a_single_level() {
        let healed = heal(&[item("A", None, 0), item("A1", Some("A"), 0), item("B", None, 1)], DepthLimit::new(1));
        assert_eq!(shape(&healed), vec![("A", None, 0), ("A1", None, 2), ("B", None, 1)]);
    }

    #[test]
    fn heal_keeps_a_menu_within_the_limit_as_it_is() {
        let flat = items(&sample());
        assert_eq!(heal(&flat, DepthLimit::default()), flat);
    }

    #[test]
    fn heal_caps_a_long_chain() {
        let limit = DepthLimit::default();
        let healed = heal(&chain(100_000), limit);
        assert_eq!(healed.len(), 100_000);
        assert!(is_dense(&healed));
        let forest = build_hierarchy(&healed);
        assert_eq!(max_depth(&forest, limit), limit.levels());
        assert_eq!(flatten(&forest).iter().filter(|row| row.depth == limit.levels() - 1).count(), 100_000 - 3);
    }

    #[test]
    fn find_descendants_excludes_the_node_itself() {
        let forest = sample();
        let found = find_descendants(&forest, &MenuItemId::from("A"));
        assert_eq!(found.len(), 3);
        assert!(!found.contains(&MenuItemId::from("A")));
        assert!(found.contains(&MenuItemId::from("A2a")));
        assert!(find_descendants(&forest, &MenuItemId::from("missing")).is_empty());
    }

    #[test]
    fn can_reparent_rejects_self_and_descendants() {
        let forest = sample();
        let a = MenuItemId::from("A");
        assert!(can_reparent(&forest, &a, None));
        assert!(!can_reparent(&forest, &a, Some(&a)));
        assert!(!can_reparent(&forest, &a, Some(&MenuItemId::from("A2a"))));
        assert!(can_reparent(&forest, &a, Some(&MenuItemId::from("B"))));
        assert!(can_reparent(&forest, &MenuItemId::from("A2a"), Some(&MenuItemId::from("C"))));
    }

    #[test]
    fn max_depth_counts_levels_and_saturates_past_the_limit() {
        let forest = sample();
        assert_eq!(max_depth(&[], DepthLimit::default()), 0);
        assert_eq!(max_depth(&forest, DepthLimit::new(4)), 3);
        assert_eq!(max_depth(&forest, DepthLimit::new(1)), 2);
        assert_eq!(subtree_height(&forest[0].children[1], DepthLimit::default()), 2);
    }

    #[test]
    fn densify_renumbers_one_group_only() {
        let mut flat = vec![item("A", None, 3), item("B", None, 7), item("A1", Some("A"), 5)];
        densify(&mut flat, None);
        assert_eq!(shape(&flat), vec![("A", None, 0), ("B", None, 1), ("A1", Some("A"), 5)]);
        assert!(!is_dense(&flat));
        densify_all(&mut flat);
        assert!(is_dense(&flat));
    }

    #[test]
    fn ordering_covers_every_item_once() {
        let entries = ordering(&sample());
        assert_eq!(entries.len(), 6);
        let unique: HashSet<_> = entries.iter().map(|e| e.id.clone()).collect();
        assert_eq!(unique.len(), 6);
    }
}
