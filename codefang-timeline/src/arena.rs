//! Index-based treap arena.
//!
//! Nodes are stored in a flat `Vec` and referenced by index rather than by
//! `Box` pointer, the same storage discipline the corpus uses for its
//! analysis graphs (`drift-analysis::call_graph` builds a `petgraph`
//! `StableGraph` rather than a pointer-linked tree) even though no literal
//! treap exists in the corpus to copy from. Dead slots are pushed onto a
//! free list and reused by later allocations, and `shrink_pool` can
//! compact away everything but the live, reachable subtree.

pub(crate) type NodeIndex = u32;

/// A `[start, start + seg_len)` segment of the timeline, all sharing one
/// value (the tick at which that span of lines was last touched).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    pub seg_len: u32,
    pub value: u32,
    pub priority: u64,
    pub sub_len: u64,
    pub left: Option<NodeIndex>,
    pub right: Option<NodeIndex>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
    free: Vec<NodeIndex>,
}

impl Arena {
    pub fn with_capacity(cap: usize) -> Self {
        Arena {
            nodes: Vec::with_capacity(cap),
            free: Vec::new(),
        }
    }

    pub fn alloc(&mut self, node: Node) -> NodeIndex {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx as usize] = node;
            idx
        } else {
            self.nodes.push(node);
            (self.nodes.len() - 1) as NodeIndex
        }
    }

    pub fn free(&mut self, idx: NodeIndex) {
        self.free.push(idx);
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx as usize]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut Node {
        &mut self.nodes[idx as usize]
    }

    pub fn live_slots(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    fn sub_len_of(&self, idx: Option<NodeIndex>) -> u64 {
        idx.map(|i| self.nodes[i as usize].sub_len).unwrap_or(0)
    }

    fn update(&mut self, idx: NodeIndex) {
        let node = self.nodes[idx as usize];
        let total =
            node.seg_len as u64 + self.sub_len_of(node.left) + self.sub_len_of(node.right);
        self.nodes[idx as usize].sub_len = total;
    }

    /// Total length covered by the subtree rooted at `node`, or 0.
    pub fn subtree_len(&self, node: Option<NodeIndex>) -> u64 {
        self.sub_len_of(node)
    }

    /// Standard treap merge by max-heap priority.
    pub fn merge(&mut self, left: Option<NodeIndex>, right: Option<NodeIndex>) -> Option<NodeIndex> {
        match (left, right) {
            (None, r) => r,
            (l, None) => l,
            (Some(li), Some(ri)) => {
                if self.nodes[li as usize].priority >= self.nodes[ri as usize].priority {
                    let li_right = self.nodes[li as usize].right;
                    let merged = self.merge(li_right, Some(ri));
                    self.nodes[li as usize].right = merged;
                    self.update(li);
                    Some(li)
                } else {
                    let ri_left = self.nodes[ri as usize].left;
                    let merged = self.merge(Some(li), ri_left);
                    self.nodes[ri as usize].left = merged;
                    self.update(ri);
                    Some(ri)
                }
            }
        }
    }

    /// Splits the subtree rooted at `node` into `(left, right)` where
    /// `left` covers offsets `[0, pos)` and `right` covers `[pos, len)`.
    /// `pos` may fall strictly inside a node's own segment, in which case
    /// that segment is itself divided into two fresh nodes carrying the
    /// same value; `draw_priority` supplies the priorities for those new
    /// pieces and is only invoked when a segment actually gets split.
    pub fn split(
        &mut self,
        node: Option<NodeIndex>,
        pos: u64,
        draw_priority: &mut impl FnMut() -> u64,
    ) -> (Option<NodeIndex>, Option<NodeIndex>) {
        let idx = match node {
            None => return (None, None),
            Some(i) => i,
        };
        let n = self.nodes[idx as usize];
        let left_size = self.sub_len_of(n.left);

        if pos < left_size {
            let (ll, lr) = self.split(n.left, pos, draw_priority);
            self.nodes[idx as usize].left = lr;
            self.update(idx);
            return (ll, Some(idx));
        }

        let seg_len = n.seg_len as u64;
        if pos >= left_size + seg_len {
            let (rl, rr) = self.split(n.right, pos - left_size - seg_len, draw_priority);
            self.nodes[idx as usize].right = rl;
            self.update(idx);
            return (Some(idx), rr);
        }

        // pos divides this node's own segment at `offset`.
        let offset = (pos - left_size) as u32;
        let value = n.value;
        let mut left_result = n.left;
        let mut right_result = n.right;
        self.free(idx);

        if offset > 0 {
            let piece = self.alloc(Node {
                seg_len: offset,
                value,
                priority: draw_priority(),
                sub_len: 0,
                left: None,
                right: None,
            });
            self.update(piece);
            left_result = self.merge(left_result, Some(piece));
        }
        if (offset as u64) < seg_len {
            let piece = self.alloc(Node {
                seg_len: (seg_len - offset as u64) as u32,
                value,
                priority: draw_priority(),
                sub_len: 0,
                left: None,
                right: None,
            });
            self.update(piece);
            right_result = self.merge(Some(piece), right_result);
        }
        (left_result, right_result)
    }

    /// In-order walk of the subtree rooted at `node`, yielding each
    /// segment as `(value, seg_len)`.
    pub fn in_order(&self, node: Option<NodeIndex>, out: &mut Vec<(u32, u32)>) {
        let Some(idx) = node else { return };
        let n = self.nodes[idx as usize];
        self.in_order(n.left, out);
        out.push((n.value, n.seg_len));
        self.in_order(n.right, out);
    }

    /// Deep-copies the subtree rooted at `node` into `dst`, returning the
    /// new root index. Used by `shrink_pool` to compact away dead slots.
    pub fn copy_into(&self, node: Option<NodeIndex>, dst: &mut Arena) -> Option<NodeIndex> {
        let idx = node?;
        let n = self.nodes[idx as usize];
        let left = self.copy_into(n.left, dst);
        let right = self.copy_into(n.right, dst);
        let new_idx = dst.alloc(Node {
            seg_len: n.seg_len,
            value: n.value,
            priority: n.priority,
            sub_len: 0,
            left,
            right,
        });
        dst.update(new_idx);
        Some(new_idx)
    }
}
