//! Actor slots.
//!
//! An actor is one currently-rigid piece of a family, identified by its
//! slot index. Graph actors (owning support-graph nodes) occupy slots
//! `[0, node_count)`, where a slot index doubles as the island-root node
//! index; single-subsupport-chunk actors occupy the remaining slots, one
//! per subsupport chunk. Slot state is plain data — membership lists are
//! threaded through the family's link arrays, so a slot holds only list
//! heads and counts.

use breccia_core::INVALID_INDEX;

/// Index of an actor slot within its family.
pub type ActorIndex = u32;

/// Per-slot actor state.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ActorSlot {
    /// Whether the slot is borrowed (the actor exists).
    pub active: bool,
    /// Head of the visible-chunk list in the family's visibility links.
    pub first_visible_chunk_index: u32,
    /// Number of visible chunks.
    pub visible_chunk_count: u32,
    /// Head of the graph-node list in the family's node links.
    pub first_graph_node_index: u32,
    /// Number of owned graph nodes.
    pub graph_node_count: u32,
    /// Number of leaf chunks in the actor's subtrees.
    pub leaf_chunk_count: u32,
}

impl Default for ActorSlot {
    fn default() -> Self {
        Self {
            active: false,
            first_visible_chunk_index: INVALID_INDEX,
            visible_chunk_count: 0,
            first_graph_node_index: INVALID_INDEX,
            graph_node_count: 0,
            leaf_chunk_count: 0,
        }
    }
}
