//! Memo table for lazily computed node metrics.
//!
//! Weights and signatures are cached per node index and invalidated through
//! explicit `clear_*` calls driven by [`Tree::touch`](super::Tree::touch),
//! keeping cache lifetime rules separate from tree mutation logic. Signature
//! slots additionally carry the option stamp they were computed under, so a
//! tree diffed twice with different options never serves stale entries.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::signature::Signature;

use super::NodeId;

#[derive(Debug, Default)]
pub(crate) struct MemoTable {
    weights: RefCell<Vec<Option<f64>>>,
    signatures: RefCell<Vec<Option<Rc<Signature>>>>,
    signature_stamp: Cell<u64>,
}

impl MemoTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Grows both tables to cover at least `len` nodes.
    pub(crate) fn ensure_len(&self, len: usize) {
        let mut weights = self.weights.borrow_mut();
        if weights.len() < len {
            weights.resize(len, None);
        }
        let mut signatures = self.signatures.borrow_mut();
        if signatures.len() < len {
            signatures.resize(len, None);
        }
    }

    pub(crate) fn weight(&self, id: NodeId) -> Option<f64> {
        self.weights.borrow().get(id.index()).copied().flatten()
    }

    pub(crate) fn store_weight(&self, id: NodeId, weight: f64) {
        self.ensure_len(id.index() + 1);
        self.weights.borrow_mut()[id.index()] = Some(weight);
    }

    pub(crate) fn clear_weight(&self, id: NodeId) {
        if let Some(slot) = self.weights.borrow_mut().get_mut(id.index()) {
            *slot = None;
        }
    }

    /// Returns the cached signature if it was computed under `stamp`.
    ///
    /// A stamp mismatch drops the whole signature table first: entries from
    /// another option set are unusable as a group.
    pub(crate) fn signature(&self, id: NodeId, stamp: u64) -> Option<Rc<Signature>> {
        if self.signature_stamp.get() != stamp {
            self.signatures.borrow_mut().iter_mut().for_each(|s| *s = None);
            self.signature_stamp.set(stamp);
            return None;
        }
        self.signatures.borrow().get(id.index()).cloned().flatten()
    }

    pub(crate) fn store_signature(&self, id: NodeId, stamp: u64, signature: Rc<Signature>) {
        if self.signature_stamp.get() != stamp {
            self.signatures.borrow_mut().iter_mut().for_each(|s| *s = None);
            self.signature_stamp.set(stamp);
        }
        self.ensure_len(id.index() + 1);
        self.signatures.borrow_mut()[id.index()] = Some(signature);
    }

    pub(crate) fn clear_signature(&self, id: NodeId) {
        if let Some(slot) = self.signatures.borrow_mut().get_mut(id.index()) {
            *slot = None;
        }
    }
}
