//! Operation detection over a completed matching.
//!
//! Classification runs in three levels. Level 1 turns unmatched nodes into
//! inserts and deletes (suppressing nodes whose parent is itself unmatched,
//! so a removed subtree reports once) and inspects every matched pair for
//! content changes. Level 2 flags matched pairs whose parents no longer
//! correspond as moves. Level 3 re-scans the basic output and collapses
//! groups of related operations into merges, splits, and hierarchy
//! upgrades/downgrades, consuming the operations they explain.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::attrs::AttributeComparator;
use crate::constants::{HIERARCHY_SIMILARITY, MERGE_SPLIT_SIMILARITY};
use crate::matching::Matching;
use crate::measure;
use crate::options::{AttributeOrder, MatchOptions};
use crate::tree::{NodeId, Tree};

use super::{Change, ChangeKind, Operation};

/// Classifies every node of two matched trees into edit operations.
pub struct OperationDetector<'a> {
    tree1: &'a Tree,
    tree2: &'a Tree,
    matching: &'a Matching,
    options: &'a MatchOptions,
}

impl<'a> OperationDetector<'a> {
    /// Creates a detector over a completed matching.
    pub fn new(
        tree1: &'a Tree,
        tree2: &'a Tree,
        matching: &'a Matching,
        options: &'a MatchOptions,
    ) -> Self {
        OperationDetector {
            tree1,
            tree2,
            matching,
            options,
        }
    }

    /// Runs all detection levels and returns the ordered operation list.
    pub fn detect(&self) -> Vec<Operation> {
        let basic = self.detect_basic();
        debug!(operations = basic.len(), "basic detection complete");
        let collapsed = self.collapse_semantic(basic);
        debug!(operations = collapsed.len(), "semantic collapse complete");
        collapsed
    }

    /// Levels 1 and 2: deletes, updates, and moves in tree-1 document
    /// order, then inserts in tree-2 document order.
    fn detect_basic(&self) -> Vec<Operation> {
        let mut ops = Vec::new();

        for n1 in self.tree1.preorder() {
            match self.matching.match_for1(n1) {
                None => {
                    let parent = self.tree1.parent(n1);
                    // A delete inside an unmatched parent is implied by the
                    // parent's own delete.
                    let suppressed = parent
                        .map(|p| !self.matching.is_matched1(p))
                        .unwrap_or(false);
                    if !suppressed {
                        ops.push(Operation::Delete {
                            node: n1,
                            parent,
                            position: self.tree1.child_position(n1).unwrap_or(0),
                        });
                    }
                }
                Some(n2) => {
                    let changes = self.changes_for(n1, n2);
                    if !changes.is_empty() {
                        ops.push(Operation::Update {
                            node1: n1,
                            node2: n2,
                            changes,
                        });
                    }
                    if let Some(mv) = self.move_for(n1, n2) {
                        ops.push(mv);
                    }
                }
            }
        }

        for n2 in self.tree2.preorder() {
            if self.matching.is_matched2(n2) {
                continue;
            }
            let parent = self.tree2.parent(n2);
            let suppressed = parent
                .map(|p| !self.matching.is_matched2(p))
                .unwrap_or(false);
            if !suppressed {
                ops.push(Operation::Insert {
                    node: n2,
                    parent,
                    position: self.tree2.child_position(n2).unwrap_or(0),
                });
            }
        }

        ops
    }

    /// Inspects a matched pair for label, value, attribute, and attribute
    /// order differences.
    fn changes_for(&self, n1: NodeId, n2: NodeId) -> Vec<Change> {
        let mut changes = Vec::new();

        let label1 = self.tree1.label(n1);
        let label2 = self.tree2.label(n2);
        if label1 != label2 {
            changes.push(Change {
                kind: ChangeKind::LABEL,
                old: label1.map(str::to_string),
                new: label2.map(str::to_string),
            });
        }

        if !measure::texts_equivalent(self.tree1, n1, self.tree2, n2, self.options) {
            changes.push(Change {
                kind: ChangeKind::VALUE,
                old: self.tree1.value(n1).map(str::to_string),
                new: self.tree2.value(n2).map(str::to_string),
            });
        }

        let attrs1 = self.tree1.attributes(n1);
        let attrs2 = self.tree2.attributes(n2);
        if !AttributeComparator::equals_ignoring_order(attrs1, attrs2) {
            let render = AttributeComparator::new(AttributeOrder::Ignore);
            changes.push(Change {
                kind: ChangeKind::ATTRIBUTES,
                old: if attrs1.is_empty() {
                    None
                } else {
                    Some(render.comparison_key(attrs1))
                },
                new: if attrs2.is_empty() {
                    None
                } else {
                    Some(render.comparison_key(attrs2))
                },
            });
        }

        if self.options.attribute_order == AttributeOrder::Strict
            && AttributeComparator::same_key_set(attrs1, attrs2)
        {
            let order1 = AttributeComparator::key_order(attrs1);
            let order2 = AttributeComparator::key_order(attrs2);
            if order1 != order2 {
                changes.push(Change {
                    kind: ChangeKind::ATTRIBUTE_ORDER,
                    old: Some(order1),
                    new: Some(order2),
                });
            }
        }

        changes
    }

    /// Level 2: a matched pair moved when its parents no longer correspond.
    fn move_for(&self, n1: NodeId, n2: NodeId) -> Option<Operation> {
        let p1 = self.tree1.parent(n1);
        let p2 = self.tree2.parent(n2);
        let moved = match (p1, p2) {
            (None, None) => false,
            (None, Some(_)) | (Some(_), None) => true,
            (Some(p1), Some(p2)) => self.matching.match_for1(p1) != Some(p2),
        };
        if !moved {
            return None;
        }
        Some(Operation::Move {
            node1: n1,
            node2: n2,
            old_parent: p1,
            new_parent: p2,
            old_position: self.tree1.child_position(n1).unwrap_or(0),
            new_position: self.tree2.child_position(n2).unwrap_or(0),
        })
    }

    /// Level 3: collapse merges, splits, and hierarchy changes. Each
    /// collapse consumes its component operations and takes the slot of the
    /// earliest one, keeping the output ordered.
    fn collapse_semantic(&self, ops: Vec<Operation>) -> Vec<Operation> {
        let mut slots: Vec<Option<Operation>> = ops.into_iter().map(Some).collect();
        self.collapse_merges(&mut slots);
        self.collapse_splits(&mut slots);
        self.collapse_hierarchy(&mut slots);
        slots.into_iter().flatten().collect()
    }

    /// Two or more deletes under one tree-1 parent, whose image contains an
    /// update absorbing their combined text, become one merge.
    fn collapse_merges(&self, slots: &mut [Option<Operation>]) {
        // Deletes grouped by tree-1 parent, in first-appearance order.
        let mut parents: Vec<NodeId> = Vec::new();
        let mut deletes_by_parent: FxHashMap<NodeId, Vec<usize>> = FxHashMap::default();
        for (i, slot) in slots.iter().enumerate() {
            if let Some(Operation::Delete {
                parent: Some(parent),
                ..
            }) = slot
            {
                let entry = deletes_by_parent.entry(*parent).or_default();
                if entry.is_empty() {
                    parents.push(*parent);
                }
                entry.push(i);
            }
        }

        for parent1 in parents {
            let delete_idxs = &deletes_by_parent[&parent1];
            if delete_idxs.len() < 2 {
                continue;
            }
            let parent2 = match self.matching.match_for1(parent1) {
                Some(p) => p,
                None => continue,
            };

            let mut deleted_parts: Vec<String> = Vec::new();
            let mut deleted_nodes: Vec<NodeId> = Vec::new();
            for &i in delete_idxs {
                if let Some(Operation::Delete { node, .. }) = &slots[i] {
                    deleted_parts.push(self.tree1.subtree_text(*node));
                    deleted_nodes.push(*node);
                }
            }

            // An update inside the parent's image whose new text absorbs the
            // combined deleted text plus its own original text.
            let mut absorbed: Option<(usize, NodeId, NodeId)> = None;
            for (i, slot) in slots.iter().enumerate() {
                if let Some(Operation::Update { node1, node2, .. }) = slot {
                    if self.tree2.parent(*node2) != Some(parent2) {
                        continue;
                    }
                    let mut combined_parts = deleted_parts.clone();
                    combined_parts.push(self.tree1.subtree_text(*node1));
                    let combined = combined_parts.join(" ");
                    let target_text = self.tree2.subtree_text(*node2);
                    if measure::jaccard_words(&combined, &target_text)
                        >= MERGE_SPLIT_SIMILARITY
                    {
                        absorbed = Some((i, *node1, *node2));
                        break;
                    }
                }
            }
            let (update_idx, update_node1, update_node2) = match absorbed {
                Some(found) => found,
                None => continue,
            };

            let mut source_nodes = deleted_nodes;
            source_nodes.push(update_node1);
            let first = delete_idxs
                .iter()
                .copied()
                .chain(std::iter::once(update_idx))
                .min()
                .unwrap_or(update_idx);
            for &i in delete_idxs {
                slots[i] = None;
            }
            slots[update_idx] = None;
            slots[first] = Some(Operation::Merge {
                source_nodes,
                target_node: update_node2,
            });
        }
    }

    /// One delete whose matched parent's image gained two or more inserts
    /// carrying its text becomes one split.
    fn collapse_splits(&self, slots: &mut [Option<Operation>]) {
        let delete_idxs: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                matches!(
                    slot,
                    Some(Operation::Delete {
                        parent: Some(_),
                        ..
                    })
                )
                .then_some(i)
            })
            .collect();

        for delete_idx in delete_idxs {
            let (deleted, parent1) = match &slots[delete_idx] {
                Some(Operation::Delete {
                    node,
                    parent: Some(parent),
                    ..
                }) => (*node, *parent),
                _ => continue,
            };
            let parent2 = match self.matching.match_for1(parent1) {
                Some(p) => p,
                None => continue,
            };

            let mut insert_idxs: Vec<usize> = Vec::new();
            let mut inserted_nodes: Vec<NodeId> = Vec::new();
            for (i, slot) in slots.iter().enumerate() {
                if let Some(Operation::Insert { node, .. }) = slot {
                    if self.tree2.parent(*node) == Some(parent2) {
                        insert_idxs.push(i);
                        inserted_nodes.push(*node);
                    }
                }
            }
            if inserted_nodes.len() < 2 {
                continue;
            }

            let deleted_text = self.tree1.subtree_text(deleted);
            let inserted_text = inserted_nodes
                .iter()
                .map(|&n| self.tree2.subtree_text(n))
                .collect::<Vec<String>>()
                .join(" ");
            if measure::jaccard_words(&deleted_text, &inserted_text) < MERGE_SPLIT_SIMILARITY {
                continue;
            }

            let first = insert_idxs
                .iter()
                .copied()
                .chain(std::iter::once(delete_idx))
                .min()
                .unwrap_or(delete_idx);
            for &i in &insert_idxs {
                slots[i] = None;
            }
            slots[delete_idx] = None;
            slots[first] = Some(Operation::Split {
                source_node: deleted,
                target_nodes: inserted_nodes,
            });
        }
    }

    /// A remaining delete/insert pair with equal labels and near-identical
    /// text is a hierarchy change when the depths differ.
    fn collapse_hierarchy(&self, slots: &mut [Option<Operation>]) {
        let delete_idxs: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                matches!(slot, Some(Operation::Delete { .. })).then_some(i)
            })
            .collect();

        for delete_idx in delete_idxs {
            let deleted = match &slots[delete_idx] {
                Some(Operation::Delete { node, .. }) => *node,
                _ => continue,
            };
            let deleted_label = self.tree1.label(deleted);
            let deleted_text = self.tree1.subtree_text(deleted);
            let from_depth = self.tree1.depth(deleted);

            let mut chosen: Option<(usize, NodeId, usize)> = None;
            for (i, slot) in slots.iter().enumerate() {
                if let Some(Operation::Insert { node, .. }) = slot {
                    if self.tree2.label(*node) != deleted_label {
                        continue;
                    }
                    let to_depth = self.tree2.depth(*node);
                    if to_depth == from_depth {
                        continue;
                    }
                    let inserted_text = self.tree2.subtree_text(*node);
                    if measure::jaccard_words(&deleted_text, &inserted_text)
                        < HIERARCHY_SIMILARITY
                    {
                        continue;
                    }
                    chosen = Some((i, *node, to_depth));
                    break;
                }
            }

            if let Some((insert_idx, inserted, to_depth)) = chosen {
                let op = if to_depth < from_depth {
                    Operation::Upgrade {
                        node1: deleted,
                        node2: inserted,
                        from_depth,
                        to_depth,
                    }
                } else {
                    Operation::Downgrade {
                        node1: deleted,
                        node2: inserted,
                        from_depth,
                        to_depth,
                    }
                };
                let first = delete_idx.min(insert_idx);
                slots[delete_idx] = None;
                slots[insert_idx] = None;
                slots[first] = Some(op);
            }
        }
    }
}
