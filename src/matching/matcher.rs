//! The tree matching algorithm.
//!
//! Matching runs in staged passes. Nodes carrying equal external stable
//! identifiers pair first. The exact phase then buckets every node of both
//! trees by attribute-aware signature and pairs bucket members positionally
//! (equal signatures imply identical root-to-node paths, labels, and — where
//! relevant — attributes or sensitive text; this is the XDiff signature
//! approach). The approximate phase finally walks the remaining unmatched
//! tree-1 nodes in descending weight order and greedily pairs each with the
//! closest same-labeled tree-2 candidate under a distance cutoff (the XyDiff
//! weight-priority approach). Anchoring heavy subtrees first lets prefix
//! closure constrain everything beneath them, which is what keeps the greedy
//! single pass cheap.
//!
//! There is no rollback: a pair rejected by [`Matching::add`] already
//! encodes a constraint the greedy choice cannot relax, so it is skipped.

use std::cmp::Ordering;
use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::constants::MAX_MATCH_DISTANCE;
use crate::measure;
use crate::options::MatchOptions;
use crate::tree::{NodeId, Tree};

use super::Matching;

/// Builds a [`Matching`] between two trees.
pub struct TreeMatcher<'a> {
    tree1: &'a Tree,
    tree2: &'a Tree,
    options: &'a MatchOptions,
}

impl<'a> TreeMatcher<'a> {
    /// Creates a matcher over two trees with the given options.
    pub fn new(tree1: &'a Tree, tree2: &'a Tree, options: &'a MatchOptions) -> Self {
        TreeMatcher {
            tree1,
            tree2,
            options,
        }
    }

    /// Runs all matching phases and returns the completed matching.
    pub fn build_matching(&self) -> Matching {
        let mut matching =
            Matching::with_capacity(self.tree1.node_count(), self.tree2.node_count());

        self.match_by_xid(&mut matching);
        debug!(matched = matching.len(), "xid phase complete");

        self.match_exact(&mut matching);
        debug!(matched = matching.len(), "exact phase complete");

        self.match_approximate(&mut matching);
        debug!(matched = matching.len(), "approximate phase complete");

        matching
    }

    /// Pairs nodes that carry equal external stable identifiers.
    ///
    /// Runs before everything else: xid pairs survive relocation, and adding
    /// them while both ancestor chains are still unmatched is what lets the
    /// detector see them as moves later.
    fn match_by_xid(&self, matching: &mut Matching) {
        let mut by_xid: FxHashMap<&str, VecDeque<NodeId>> = FxHashMap::default();
        for n1 in self.tree1.preorder() {
            if let Some(xid) = self.tree1.xid(n1) {
                by_xid.entry(xid).or_default().push_back(n1);
            }
        }
        for n2 in self.tree2.preorder() {
            let xid = match self.tree2.xid(n2) {
                Some(x) => x,
                None => continue,
            };
            let bucket = match by_xid.get_mut(xid) {
                Some(b) => b,
                None => continue,
            };
            if let Some(n1) = bucket.pop_front() {
                if !matching.add(self.tree1, self.tree2, n1, n2) {
                    trace!(n1 = n1.index(), n2 = n2.index(), xid, "xid pair rejected");
                }
            }
        }
    }

    /// Exact phase: bucket by attribute-aware signature, pair positionally.
    ///
    /// Tree-1 nodes are visited in preorder so parents pair before their
    /// children and bucket consumption stays deterministic.
    fn match_exact(&self, matching: &mut Matching) {
        let mut buckets: FxHashMap<[u8; 16], VecDeque<NodeId>> = FxHashMap::default();
        for n2 in self.tree2.preorder() {
            if matching.is_matched2(n2) {
                continue;
            }
            let sig = self.tree2.signature(n2, self.options);
            buckets.entry(sig.digest()).or_default().push_back(n2);
        }

        for n1 in self.tree1.preorder() {
            if matching.is_matched1(n1) {
                continue;
            }
            let sig = self.tree1.signature(n1, self.options);
            let bucket = match buckets.get_mut(&sig.digest()) {
                Some(b) => b,
                None => continue,
            };
            // Positional pairing: the i-th bucket member of tree 1 takes the
            // i-th member of tree 2, consumed even if the add is rejected.
            while let Some(n2) = bucket.pop_front() {
                if matching.is_matched2(n2) {
                    continue;
                }
                if !matching.add(self.tree1, self.tree2, n1, n2) {
                    trace!(
                        n1 = n1.index(),
                        n2 = n2.index(),
                        signature = %sig,
                        "exact pair rejected"
                    );
                }
                break;
            }
        }
    }

    /// Approximate phase: remaining tree-1 nodes in descending weight order,
    /// each paired greedily with the same-labeled tree-2 candidate that
    /// minimizes semantic distance under the cutoff.
    ///
    /// Ties on distance break to the leftmost candidate in tree-2 document
    /// order, keeping the output stable across runs.
    fn match_approximate(&self, matching: &mut Matching) {
        let mut rank1: FxHashMap<NodeId, usize> = FxHashMap::default();
        for (i, n) in self.tree1.preorder().enumerate() {
            rank1.insert(n, i);
        }

        let mut unmatched1: Vec<NodeId> = self
            .tree1
            .preorder()
            .filter(|&n| !matching.is_matched1(n))
            .collect();
        unmatched1.sort_by(|&a, &b| {
            self.tree1
                .weight(b)
                .partial_cmp(&self.tree1.weight(a))
                .unwrap_or(Ordering::Equal)
                .then_with(|| rank1.get(&a).cmp(&rank1.get(&b)))
        });

        for n1 in unmatched1 {
            if matching.is_matched1(n1) {
                continue;
            }
            let label1 = self.tree1.label(n1);

            let mut best: Option<(f64, NodeId)> = None;
            for n2 in self.tree2.preorder() {
                if matching.is_matched2(n2) {
                    continue;
                }
                if self.tree2.label(n2) != label1 {
                    continue;
                }
                let distance = measure::semantic_distance(self.tree1, n1, self.tree2, n2);
                if distance > MAX_MATCH_DISTANCE {
                    continue;
                }
                // Strict less-than keeps the first (leftmost) candidate on
                // equal distances.
                let improves = match best {
                    Some((d, _)) => distance < d,
                    None => true,
                };
                if improves {
                    best = Some((distance, n2));
                }
            }

            if let Some((distance, n2)) = best {
                if matching.add(self.tree1, self.tree2, n1, n2) {
                    trace!(
                        n1 = n1.index(),
                        n2 = n2.index(),
                        distance,
                        "approximate pair added"
                    );
                } else {
                    trace!(
                        n1 = n1.index(),
                        n2 = n2.index(),
                        distance,
                        "approximate pair rejected"
                    );
                }
            }
        }
    }
}
