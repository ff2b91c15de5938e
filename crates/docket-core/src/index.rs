//! Ordered record index: an unbalanced binary search tree over an arena.
//!
//! Nodes live in a slot vector and point at each other through integer
//! handles, never through native references, so a stale handle can be
//! detected instead of dangling. The index owns every record transitively;
//! callers address records by [`RecordId`] only.
//!
//! # Invariants
//!
//! - Strict BST property: for any node, every id in its left subtree is
//!   smaller and every id in its right subtree is larger. Ids are unique;
//!   [`OrderedIndex::insert`] rejects duplicates.
//! - No rebalancing. Tree height is unbounded by input order and the
//!   degenerate O(n) chain is accepted.
//! - Two-child removal uses successor-copy: the minimum record of the
//!   right subtree moves into the surviving node and the (now empty)
//!   minimum node is removed, so links above the removed node are never
//!   restructured.

use crate::record::{Record, RecordId};
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors reported by index operations. All are recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// No record with this id exists in the index.
    #[error("no record with id {0}")]
    NotFound(RecordId),
    /// A record with this id is already present.
    #[error("record id {0} is already taken")]
    DuplicateKey(RecordId),
}

// ---------------------------------------------------------------------------
// Arena plumbing
// ---------------------------------------------------------------------------

/// Stable handle into the slot vector. Private: the public API speaks
/// [`RecordId`] only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

/// Which child link of a parent points at a node.
#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Node {
    record: Record,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

/// BST-keyed store of [`Record`]s, addressed by id.
#[derive(Debug, Clone, Default)]
pub struct OrderedIndex {
    slots: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
}

impl OrderedIndex {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        self.slots[id.0 as usize]
            .as_ref()
            .map_or_else(|| unreachable!("live link reached a vacant slot"), |n| n)
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.0 as usize]
            .as_mut()
            .map_or_else(|| unreachable!("live link reached a vacant slot"), |n| n)
    }

    fn alloc(&mut self, record: Record) -> NodeId {
        let node = Node {
            record,
            left: None,
            right: None,
        };
        if let Some(id) = self.free.pop() {
            self.slots[id.0 as usize] = Some(node);
            id
        } else {
            let id = NodeId(u32::try_from(self.slots.len()).unwrap_or_else(|_| {
                unreachable!("slot count exceeds u32::MAX");
            }));
            self.slots.push(Some(node));
            id
        }
    }

    /// Detach a node from the arena and recycle its slot.
    fn release(&mut self, id: NodeId) -> Node {
        let node = self.slots[id.0 as usize]
            .take()
            .map_or_else(|| unreachable!("released a vacant slot"), |n| n);
        self.free.push(id);
        node
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Descend by key comparison from the root. O(height).
    fn locate(&self, id: RecordId) -> Option<NodeId> {
        let mut cursor = self.root;
        while let Some(current) = cursor {
            let node = self.node(current);
            cursor = match id.cmp(&node.record.id()) {
                Ordering::Equal => return Some(current),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        None
    }

    #[must_use]
    pub fn find(&self, id: RecordId) -> Option<&Record> {
        self.locate(id).map(|n| &self.node(n).record)
    }

    #[must_use]
    pub fn find_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        let node = self.locate(id)?;
        Some(&mut self.node_mut(node).record)
    }

    #[must_use]
    pub fn contains(&self, id: RecordId) -> bool {
        self.locate(id).is_some()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    // -----------------------------------------------------------------------
    // Insert
    // -----------------------------------------------------------------------

    /// Place `record` as a new leaf, descending by key comparison. O(height).
    ///
    /// # Errors
    ///
    /// [`IndexError::DuplicateKey`] when a record with the same id already
    /// exists; the index is unchanged.
    pub fn insert(&mut self, record: Record) -> Result<(), IndexError> {
        let key = record.id();
        let Some(mut cursor) = self.root else {
            let id = self.alloc(record);
            self.root = Some(id);
            self.len += 1;
            return Ok(());
        };
        loop {
            let node = self.node(cursor);
            let (go_left, next) = match key.cmp(&node.record.id()) {
                Ordering::Equal => return Err(IndexError::DuplicateKey(key)),
                Ordering::Less => (true, node.left),
                Ordering::Greater => (false, node.right),
            };
            match next {
                Some(child) => cursor = child,
                None => {
                    let id = self.alloc(record);
                    let parent = self.node_mut(cursor);
                    if go_left {
                        parent.left = Some(id);
                    } else {
                        parent.right = Some(id);
                    }
                    self.len += 1;
                    return Ok(());
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Remove
    // -----------------------------------------------------------------------

    /// Remove the record with `id` and return it.
    ///
    /// Leaf nodes detach; one-child nodes splice their child into the
    /// parent's slot; two-child nodes promote the in-order successor's
    /// record (successor-copy, see module docs). Iterative, like every
    /// other descent in this module, so a degenerate chain costs O(n)
    /// time but constant stack.
    ///
    /// # Errors
    ///
    /// [`IndexError::NotFound`] when `id` is absent; the index is unchanged.
    pub fn remove(&mut self, id: RecordId) -> Result<Record, IndexError> {
        // Descend to the victim, remembering the link that points at it.
        let mut parent: Option<(NodeId, Side)> = None;
        let mut cursor = self.root;
        let current = loop {
            let Some(current) = cursor else {
                return Err(IndexError::NotFound(id));
            };
            let node = self.node(current);
            cursor = match id.cmp(&node.record.id()) {
                Ordering::Equal => break current,
                Ordering::Less => {
                    parent = Some((current, Side::Left));
                    node.left
                }
                Ordering::Greater => {
                    parent = Some((current, Side::Right));
                    node.right
                }
            };
        };

        let (left, right) = {
            let node = self.node(current);
            (node.left, node.right)
        };
        let removed = match (left, right) {
            (None, None) => {
                self.relink(parent, None);
                self.release(current).record
            }
            (Some(child), None) | (None, Some(child)) => {
                self.relink(parent, Some(child));
                self.release(current).record
            }
            (Some(_), Some(right_child)) => {
                // Successor-copy: splice out the minimum of the right
                // subtree (no left child by construction) and move its
                // record into this node.
                let mut successor_parent = None;
                let mut successor = right_child;
                while let Some(next) = self.node(successor).left {
                    successor_parent = Some(successor);
                    successor = next;
                }
                let successor_right = self.node(successor).right;
                match successor_parent {
                    None => self.node_mut(current).right = successor_right,
                    Some(p) => self.node_mut(p).left = successor_right,
                }
                let promoted = self.release(successor).record;
                std::mem::replace(&mut self.node_mut(current).record, promoted)
            }
        };
        self.len -= 1;
        Ok(removed)
    }

    /// Repoint the link described by `parent` (or the root) at `child`.
    fn relink(&mut self, parent: Option<(NodeId, Side)>, child: Option<NodeId>) {
        match parent {
            None => self.root = child,
            Some((p, Side::Left)) => self.node_mut(p).left = child,
            Some((p, Side::Right)) => self.node_mut(p).right = child,
        }
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Lazy in-order traversal, ascending by id. Restartable: each call
    /// produces a fresh iterator over the current tree.
    #[must_use]
    pub fn iter(&self) -> InOrder<'_> {
        let mut traversal = InOrder {
            index: self,
            stack: Vec::new(),
        };
        traversal.push_left_spine(self.root);
        traversal
    }
}

impl<'a> IntoIterator for &'a OrderedIndex {
    type Item = &'a Record;
    type IntoIter = InOrder<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator with an explicit descent stack.
#[derive(Debug)]
pub struct InOrder<'a> {
    index: &'a OrderedIndex,
    stack: Vec<NodeId>,
}

impl InOrder<'_> {
    fn push_left_spine(&mut self, mut link: Option<NodeId>) {
        while let Some(current) = link {
            self.stack.push(current);
            link = self.index.node(current).left;
        }
    }
}

impl<'a> Iterator for InOrder<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        let node = self.index.node(current);
        self.push_left_spine(node.right);
        Some(&node.record)
    }
}
