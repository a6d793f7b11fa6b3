//! Drop reconciliation.
//!
//! [`plan_move`] classifies a finished (or hovering) drag into a
//! [`MovePlan`]; [`apply_move`] executes that plan against a fresh copy of
//! the flat items. The editor previews with the first and commits with the
//! second, so the preview can never disagree with the commit.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::menu_item::{MenuItem, MenuNode};
use crate::domain::tree::{ancestors, build_hierarchy, can_reparent, find_node, flatten, subtree_height, FlatNode};
use crate::domain::value_objects::{DepthLimit, MenuItemId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootZone {
    Top,
    Bottom,
    #[default]
    Any,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// The always-visible children area below an item.
    #[default]
    ChildrenArea,
    /// A drop zone the user opened by hand on an item.
    DropZone,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Before,
    #[default]
    After,
}

impl Placement {
    /// Pointer above the vertical midpoint of the row drops before it,
    /// anything at or below drops after.
    pub fn from_pointer(pointer_y: f32, row_top: f32, row_height: f32) -> Self {
        if pointer_y < row_top + row_height / 2.0 { Self::Before } else { Self::After }
    }
}

/// Where a drag was released.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DropTarget {
    Root {
        #[serde(default)]
        zone: RootZone,
    },
    Container {
        parent: MenuItemId,
        #[serde(default)]
        kind: ContainerKind,
    },
    Sibling {
        item: MenuItemId,
        #[serde(default)]
        placement: Placement,
    },
}

impl DropTarget {
    pub fn root() -> Self { Self::Root { zone: RootZone::Any } }
    pub fn children_of(parent: impl Into<MenuItemId>) -> Self {
        Self::Container { parent: parent.into(), kind: ContainerKind::ChildrenArea }
    }
    pub fn drop_zone_of(parent: impl Into<MenuItemId>) -> Self {
        Self::Container { parent: parent.into(), kind: ContainerKind::DropZone }
    }
    pub fn before(item: impl Into<MenuItemId>) -> Self {
        Self::Sibling { item: item.into(), placement: Placement::Before }
    }
    pub fn after(item: impl Into<MenuItemId>) -> Self {
        Self::Sibling { item: item.into(), placement: Placement::After }
    }

    /// The item the target is bound to, if any.
    pub fn item_id(&self) -> Option<&MenuItemId> {
        match self {
            Self::Root { .. } => None,
            Self::Container { parent, .. } => Some(parent),
            Self::Sibling { item, .. } => Some(item),
        }
    }
}

/// What a drop would do, shown to the user while dragging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Affordance {
    /// Same parent, new rank.
    Reorder { index: usize },
    /// Below an item that is not one of the source's ancestors.
    Nest { parent: MenuItemId },
    /// Up to the sibling level of one of the source's ancestors.
    Unnest { parent: MenuItemId },
    ToRoot,
}

impl Affordance {
    pub fn describe(&self) -> String {
        match self {
            Self::Reorder { index } => format!("will move to position {}", index + 1),
            Self::Nest { parent } => format!("will nest under {parent}"),
            Self::Unnest { parent } => format!("will move up under {parent}"),
            Self::ToRoot => "will move to the top level".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("cannot move item into itself")]
    SelfParent,
    #[error("cannot move item into its own subtree")]
    IntoOwnSubtree,
    #[error("menu cannot be nested deeper than {levels} levels")]
    DepthExceeded { levels: usize },
}

/// Why a drop left the forest as it was without being an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unchanged {
    DroppedOnSelf,
    StaleSource,
    StaleTarget,
    SamePosition,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePlan {
    pub source: MenuItemId,
    pub from_parent: Option<MenuItemId>,
    pub from_index: usize,
    pub to_parent: Option<MenuItemId>,
    /// Rank in the target sibling group once the source has left its old one.
    pub to_index: usize,
    pub affordance: Affordance,
    /// The requested parent was too deep and the item lands one level up.
    pub redirected: bool,
    /// Drop zone to close after a successful commit.
    pub closes_drop_zone: Option<MenuItemId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Planned {
    Move(MovePlan),
    Unchanged(Unchanged),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Applied { forest: Vec<MenuNode>, plan: MovePlan },
    Unchanged(Unchanged),
}

struct Snapshot {
    rows: Vec<FlatNode>,
    by_id: HashMap<MenuItemId, usize>,
}

impl Snapshot {
    fn new(forest: &[MenuNode]) -> Self {
        let rows = flatten(forest);
        let by_id = rows.iter().enumerate().map(|(pos, row)| (row.item.id.clone(), pos)).collect();
        Self { rows, by_id }
    }

    fn row(&self, id: &MenuItemId) -> Option<&FlatNode> {
        self.by_id.get(id).map(|pos| &self.rows[*pos])
    }

    /// Sibling ids under `parent`, in rank order, leaving out `skip`.
    fn group(&self, parent: Option<&MenuItemId>, skip: &MenuItemId) -> Vec<MenuItemId> {
        self.rows
            .iter()
            .filter(|row| row.item.parent_id.as_ref() == parent && &row.item.id != skip)
            .map(|row| row.item.id.clone())
            .collect()
    }

    fn is_ancestor(&self, ancestor: &MenuItemId, of: &MenuItemId) -> bool {
        self.by_id.get(of).is_some_and(|pos| ancestors(&self.rows, *pos).any(|row| row.id() == ancestor))
    }

    fn child_depth(&self, parent: Option<&MenuItemId>) -> usize {
        parent.and_then(|id| self.row(id)).map(|row| row.depth + 1).unwrap_or(0)
    }
}

fn check_parent(forest: &[MenuNode], source: &MenuItemId, parent: Option<&MenuItemId>) -> Result<(), MoveError> {
    if can_reparent(forest, source, parent) {
        return Ok(());
    }
    if parent == Some(source) { Err(MoveError::SelfParent) } else { Err(MoveError::IntoOwnSubtree) }
}

/// Classify a drop of `source` onto `target` without touching the forest.
pub fn plan_move(
    forest: &[MenuNode],
    source: &MenuItemId,
    target: &DropTarget,
    limit: DepthLimit,
) -> Result<Planned, MoveError> {
    if target.item_id() == Some(source) {
        return Ok(Planned::Unchanged(Unchanged::DroppedOnSelf));
    }
    let snapshot = Snapshot::new(forest);
    let Some(src) = snapshot.row(source) else {
        return Ok(Planned::Unchanged(Unchanged::StaleSource));
    };
    let from_parent = src.item.parent_id.clone();

    let (mut to_parent, mut to_index) = match target {
        DropTarget::Root { .. } => (None, snapshot.group(None, source).len()),
        DropTarget::Container { parent, .. } => {
            if snapshot.row(parent).is_none() {
                return Ok(Planned::Unchanged(Unchanged::StaleTarget));
            }
            (Some(parent.clone()), snapshot.group(Some(parent), source).len())
        }
        DropTarget::Sibling { item, placement } => {
            let Some(other) = snapshot.row(item) else {
                return Ok(Planned::Unchanged(Unchanged::StaleTarget));
            };
            let parent = other.item.parent_id.clone();
            let group = snapshot.group(parent.as_ref(), source);
            let at = group.iter().position(|id| id == item).unwrap_or(group.len());
            // Cross-level drops (including onto an ancestor) always land after
            // the hovered item; only a same-parent reorder honours the pointer.
            let index = if parent == from_parent && *placement == Placement::Before { at } else { at + 1 };
            (parent, index)
        }
    };

    check_parent(forest, source, to_parent.as_ref())?;

    let mut redirected = false;
    let height = find_node(forest, source).map(|node| subtree_height(node, limit)).unwrap_or(1);
    if !limit.allows(snapshot.child_depth(to_parent.as_ref()), height) {
        let Some(rejected) = to_parent.take() else {
            return Err(MoveError::DepthExceeded { levels: limit.levels() });
        };
        let grand_parent = snapshot.row(&rejected).and_then(|row| row.item.parent_id.clone());
        let group = snapshot.group(grand_parent.as_ref(), source);
        to_index = group.iter().position(|id| id == &rejected).map(|at| at + 1).unwrap_or(group.len());
        to_parent = grand_parent;
        redirected = true;
        check_parent(forest, source, to_parent.as_ref())?;
        if !limit.allows(snapshot.child_depth(to_parent.as_ref()), height) {
            return Err(MoveError::DepthExceeded { levels: limit.levels() });
        }
        tracing::debug!(item = %source, parent = ?to_parent, "drop redirected one level up to respect depth limit");
    }

    if to_parent == from_parent && to_index == src.index {
        return Ok(Planned::Unchanged(Unchanged::SamePosition));
    }

    let affordance = match &to_parent {
        parent if *parent == from_parent => Affordance::Reorder { index: to_index },
        None => Affordance::ToRoot,
        Some(parent) if snapshot.is_ancestor(parent, source) => Affordance::Unnest { parent: parent.clone() },
        Some(parent) => Affordance::Nest { parent: parent.clone() },
    };
    let closes_drop_zone = match target {
        DropTarget::Container { parent, kind: ContainerKind::DropZone } => Some(parent.clone()),
        _ => None,
    };

    Ok(Planned::Move(MovePlan {
        source: source.clone(),
        from_parent,
        from_index: src.index,
        to_parent,
        to_index,
        affordance,
        redirected,
        closes_drop_zone,
    }))
}

/// Execute a drop, returning a new forest. The input forest is never
/// modified, so a rejected or abandoned move leaves the caller's state as
/// it was.
pub fn apply_move(
    forest: &[MenuNode],
    source: &MenuItemId,
    target: &DropTarget,
    limit: DepthLimit,
) -> Result<MoveOutcome, MoveError> {
    let plan = match plan_move(forest, source, target, limit)? {
        Planned::Move(plan) => plan,
        Planned::Unchanged(reason) => return Ok(MoveOutcome::Unchanged(reason)),
    };
    let forest = execute(forest, &plan);
    Ok(MoveOutcome::Applied { forest, plan })
}

fn execute(forest: &[MenuNode], plan: &MovePlan) -> Vec<MenuNode> {
    let snapshot = Snapshot::new(forest);

    // The source leaves with its whole subtree; only its own record changes
    // parent, descendants keep pointing at it.
    let old_group = snapshot.group(plan.from_parent.as_ref(), &plan.source);
    let mut new_group = if plan.to_parent == plan.from_parent {
        old_group.clone()
    } else {
        snapshot.group(plan.to_parent.as_ref(), &plan.source)
    };
    let at = plan.to_index.min(new_group.len());
    new_group.insert(at, plan.source.clone());

    let mut ranks: HashMap<&MenuItemId, usize> = HashMap::new();
    ranks.extend(old_group.iter().enumerate().map(|(rank, id)| (id, rank)));
    ranks.extend(new_group.iter().enumerate().map(|(rank, id)| (id, rank)));

    let items: Vec<MenuItem> = snapshot
        .rows
        .into_iter()
        .map(|row| {
            let mut item = row.item;
            if item.id == plan.source {
                item.parent_id = plan.to_parent.clone();
            }
            if let Some(rank) = ranks.get(&item.id) {
                item.order = *rank;
            }
            item
        })
        .collect();
    build_hierarchy(&items)
}
