//! Incremental connectivity over a family's support graph.
//!
//! [`FamilyGraph`] tracks which support-graph nodes remain connected as
//! edges are removed. Instead of recomputing components from scratch on
//! every severed bond, each node caches a `fast_route` (a neighbor believed
//! to lie on a path to its island's root) and a `hop_count` (an estimate of
//! that path's length). Removing an edge only dirties its two endpoint
//! nodes; [`FamilyGraph::find_islands`] later revalidates each dirty node —
//! fast route first, then a hop-count-greedy search — and carves off a new
//! island exactly when a node can no longer reach its root over live edges.
//!
//! The cached routes are purely an amortization device: the partition
//! produced by `find_islands` always equals the true connected components
//! of the live-edge graph. An island's identity (`island_id`) is the node
//! index of its root, which doubles as the actor slot that owns it.

use breccia_asset::SupportGraph;
use breccia_core::{contract_assert, is_invalid, INVALID_INDEX};
use breccia_fixed::{Comparator, FixedArray, FixedBitmap, FixedBoolArray, FixedPriorityQueue};

/// One visited node in an island search.
#[derive(Clone, Copy)]
struct TraversalState {
    node: u32,
    /// Index (into the visited array) of the node this one was reached
    /// from; invalid for the search start.
    prev: u32,
    /// Distance from the search start along the traversal tree.
    depth: u32,
}

/// Priority-queue entry for the hop-count-greedy search.
#[derive(Clone, Copy)]
struct QueueElement {
    visited_index: u32,
    hop_count: u32,
}

/// Orders queue elements by ascending hop count, so the search expands the
/// node believed closest to the root first.
struct HopCountOrder;

impl Comparator<QueueElement> for HopCountOrder {
    fn less(&self, a: &QueueElement, b: &QueueElement) -> bool {
        a.hop_count < b.hop_count
    }
}

/// Reusable traversal storage for [`FamilyGraph::find_islands`].
///
/// Sized once for a graph's node count and reused across resolutions, so
/// island maintenance allocates nothing at simulation time. A family owns
/// one; standalone graph users create their own.
pub struct IslandScratch {
    visited: FixedArray<TraversalState>,
    visit_marks: FixedBitmap,
    witnesses: FixedBitmap,
    queue: FixedPriorityQueue<QueueElement, HopCountOrder>,
}

impl IslandScratch {
    /// Scratch for a graph of `node_count` nodes.
    pub fn new(node_count: u32) -> Self {
        let n = node_count as usize;
        Self {
            visited: FixedArray::new(n),
            visit_marks: FixedBitmap::new(n),
            witnesses: FixedBitmap::new(n),
            queue: FixedPriorityQueue::with_comparator(n, HopCountOrder),
        }
    }

    /// Byte size of the traversal storage for `node_count` nodes.
    #[must_use]
    pub fn required_memory_size(node_count: u32) -> usize {
        let n = node_count as usize;
        FixedArray::<TraversalState>::required_memory_size(n)
            + 2 * FixedBitmap::required_memory_size(n)
            + FixedPriorityQueue::<QueueElement, HopCountOrder>::required_memory_size(n)
    }
}

/// Incremental island tracker stored on a family.
///
/// Methods take the static [`SupportGraph`] as a parameter; the tracker
/// itself holds only per-node and per-bond mutable state.
pub struct FamilyGraph {
    /// Owning island root (== actor slot) per node; invalid while a node is
    /// unresolved or after it is removed.
    island_ids: Vec<u32>,
    /// Per-actor dirty lists threaded through this array.
    dirty_node_links: Vec<u32>,
    /// Head of each actor's dirty list.
    first_dirty_node_indices: Vec<u32>,
    /// Cached next hop toward each node's island root.
    fast_route: Vec<u32>,
    /// Estimated hops to the island root along the fast route.
    hop_counts: Vec<u32>,
    /// Permanently severed bonds.
    is_edge_removed: FixedBoolArray,
    /// Whether a node currently sits in some actor's dirty list.
    is_node_in_dirty_list: FixedBoolArray,
}

impl FamilyGraph {
    /// Fresh tracker for a graph of `node_count` nodes and `bond_count`
    /// bonds.
    ///
    /// Every edge starts out removed and every island id invalid: actor
    /// deserialization restores exactly the edges interior to each actor it
    /// loads, while the fresh-spawn path calls [`FamilyGraph::initialize`],
    /// which marks all edges live.
    pub fn new(node_count: u32, bond_count: u32) -> Self {
        let n = node_count as usize;
        let mut is_edge_removed = FixedBoolArray::new(bond_count as usize);
        is_edge_removed.fill();
        Self {
            island_ids: vec![INVALID_INDEX; n],
            dirty_node_links: vec![INVALID_INDEX; n],
            first_dirty_node_indices: vec![INVALID_INDEX; n],
            fast_route: vec![INVALID_INDEX; n],
            hop_counts: vec![0; n],
            is_edge_removed,
            is_node_in_dirty_list: FixedBoolArray::new(n),
        }
    }

    /// Byte size of the tracker state for the given graph shape.
    #[must_use]
    pub fn required_memory_size(node_count: u32, bond_count: u32) -> usize {
        let n = node_count as usize;
        5 * FixedArray::<u32>::required_memory_size(n)
            + FixedBoolArray::required_memory_size(bond_count as usize)
            + FixedBoolArray::required_memory_size(n)
    }

    /// Mark every edge live and queue every node on `actor`'s dirty list.
    ///
    /// Called once when a family spawns with a single actor owning the
    /// whole graph; the first [`FamilyGraph::find_islands`] resolves the
    /// initial island(s) from this state.
    pub fn initialize(&mut self, actor: u32) {
        self.is_edge_removed.clear_all();
        let node_count = self.island_ids.len();
        if node_count == 0 {
            return;
        }
        for i in 0..node_count - 1 {
            self.dirty_node_links[i] = i as u32 + 1;
        }
        self.dirty_node_links[node_count - 1] = INVALID_INDEX;
        self.first_dirty_node_indices[actor as usize] = 0;
        self.is_node_in_dirty_list.fill();
    }

    /// Owning island root per node.
    #[must_use]
    pub fn island_ids(&self) -> &[u32] {
        &self.island_ids
    }

    /// Cached fast routes per node.
    #[must_use]
    pub fn fast_route(&self) -> &[u32] {
        &self.fast_route
    }

    /// Cached hop counts per node.
    #[must_use]
    pub fn hop_counts(&self) -> &[u32] {
        &self.hop_counts
    }

    /// The removed-edge flags, indexed by bond.
    #[must_use]
    pub fn is_edge_removed(&self) -> &FixedBoolArray {
        &self.is_edge_removed
    }

    /// Whether `actor` has dirty nodes awaiting [`FamilyGraph::find_islands`].
    #[must_use]
    pub fn has_dirty_nodes(&self, actor: u32) -> bool {
        let mut node = self.first_dirty_node_indices[actor as usize];
        while !is_invalid(node) {
            if self.is_node_in_dirty_list.test(node as usize) {
                return true;
            }
            node = self.dirty_node_links[node as usize];
        }
        false
    }

    /// Restore per-node state from a serialized actor. The caller supplies
    /// values recorded by a matching serialization pass.
    pub fn restore_node(&mut self, node: u32, island_id: u32, fast_route: u32, hop_count: u32) {
        self.island_ids[node as usize] = island_id;
        self.fast_route[node as usize] = fast_route;
        self.hop_counts[node as usize] = hop_count;
    }

    /// Assign `node`'s owning island id directly.
    pub fn set_island_id(&mut self, node: u32, island_id: u32) {
        self.island_ids[node as usize] = island_id;
    }

    /// Mark a bond live again during actor deserialization.
    pub fn restore_edge(&mut self, bond: u32) {
        self.is_edge_removed.reset(bond as usize);
    }

    /// Record the removal of the edge between `node0` and `node1`, dirtying
    /// both endpoints on `actor`'s list. Returns false when the nodes share
    /// no bond or it was already removed.
    pub fn notify_edge_removed(
        &mut self,
        actor: u32,
        node0: u32,
        node1: u32,
        graph: &SupportGraph,
    ) -> bool {
        let bond = graph.find_bond(node0, node1);
        if is_invalid(bond) {
            return false;
        }
        self.notify_edge_removed_with_bond(actor, node0, node1, bond)
    }

    /// [`FamilyGraph::notify_edge_removed`] with the bond index already
    /// known.
    pub fn notify_edge_removed_with_bond(
        &mut self,
        actor: u32,
        node0: u32,
        node1: u32,
        bond: u32,
    ) -> bool {
        if self.is_edge_removed.test(bond as usize) {
            return false;
        }
        self.is_edge_removed.set(bond as usize);
        if self.fast_route[node0 as usize] == node1 {
            self.fast_route[node0 as usize] = INVALID_INDEX;
        }
        if self.fast_route[node1 as usize] == node0 {
            self.fast_route[node1 as usize] = INVALID_INDEX;
        }
        self.add_to_dirty_list(actor, node0);
        self.add_to_dirty_list(actor, node1);
        true
    }

    /// Remove `node` from the graph: severs all of its remaining edges
    /// (dirtying the neighbors) and invalidates its island id so no
    /// partition will claim it. Returns whether the node was still part of
    /// an island.
    pub fn notify_node_removed(&mut self, actor: u32, node: u32, graph: &SupportGraph) -> bool {
        for adj in graph.adjacency_range(node) {
            let bond = graph.adjacent_bond_indices()[adj];
            if self.is_edge_removed.test(bond as usize) {
                continue;
            }
            self.is_edge_removed.set(bond as usize);
            let neighbor = graph.adjacent_node_indices()[adj];
            if self.fast_route[neighbor as usize] == node {
                self.fast_route[neighbor as usize] = INVALID_INDEX;
            }
            self.add_to_dirty_list(actor, neighbor);
        }
        let was_present = !is_invalid(self.island_ids[node as usize]);
        self.island_ids[node as usize] = INVALID_INDEX;
        self.fast_route[node as usize] = INVALID_INDEX;
        if self.is_node_in_dirty_list.test(node as usize) {
            // Left in the linked list; popping skips cleared entries.
            self.is_node_in_dirty_list.reset(node as usize);
        }
        was_present
    }

    /// Resolve `actor`'s dirty nodes into islands.
    ///
    /// Each dirty node first retries its cached fast route, then runs a
    /// hop-count-greedy search for its island root (or any node already
    /// verified this pass — a "witness"). A node that cannot reach its
    /// root has, by exhaustion, flooded its entire live-edge component;
    /// that component becomes a new island rooted at (and identified by)
    /// the node. Returns the number of new islands.
    ///
    /// The resulting `island_ids` always partition the actor's nodes into
    /// exact connected components under the remaining edges.
    pub fn find_islands(
        &mut self,
        actor: u32,
        scratch: &mut IslandScratch,
        graph: &SupportGraph,
    ) -> u32 {
        let mut new_island_count = 0;
        scratch.witnesses.clear_all();

        loop {
            // Pop the next dirty node, skipping lazily-removed entries.
            let mut node = self.first_dirty_node_indices[actor as usize];
            while !is_invalid(node) && !self.is_node_in_dirty_list.test(node as usize) {
                node = self.dirty_node_links[node as usize];
            }
            if is_invalid(node) {
                self.first_dirty_node_indices[actor as usize] = INVALID_INDEX;
                break;
            }
            self.first_dirty_node_indices[actor as usize] = self.dirty_node_links[node as usize];
            self.is_node_in_dirty_list.reset(node as usize);

            let island_id = self.island_ids[node as usize];
            if !is_invalid(island_id) {
                if node == island_id || scratch.witnesses.test(node as usize) {
                    continue; // the root itself, or already verified
                }
                if self.try_fast_path(node, island_id, scratch, graph) {
                    continue;
                }
                if self.find_route(node, island_id, scratch, graph) {
                    continue;
                }
            } else {
                // Unresolved node: flood its component. The search target
                // is the (invalid) island id, so it cannot succeed.
                self.find_route(node, island_id, scratch, graph);
            }

            // No route to the root: the exhausted visited set is the
            // node's whole remaining component. It becomes a new island
            // rooted here.
            self.adopt_component(node, scratch);
            new_island_count += 1;
        }

        new_island_count
    }

    /// Number of live (non-removed) edges.
    #[must_use]
    pub fn edge_count(&self, graph: &SupportGraph) -> u32 {
        let live = graph
            .adjacent_bond_indices()
            .iter()
            .filter(|&&bond| !self.is_edge_removed.test(bond as usize))
            .count();
        (live / 2) as u32
    }

    /// Whether a live edge joins `node0` and `node1`.
    #[must_use]
    pub fn has_edge(&self, node0: u32, node1: u32, graph: &SupportGraph) -> bool {
        let bond = graph.find_bond(node0, node1);
        !is_invalid(bond) && !self.is_edge_removed.test(bond as usize)
    }

    /// Breadth-first reachability over live edges, ignoring all cached
    /// state. Intended for tests and debugging.
    #[must_use]
    pub fn can_find_root(&self, start: u32, target: u32, graph: &SupportGraph) -> bool {
        if start == target {
            return true;
        }
        let mut seen = vec![false; graph.node_count() as usize];
        let mut stack = vec![start];
        seen[start as usize] = true;
        while let Some(node) = stack.pop() {
            for (neighbor, bond) in graph.adjacent(node) {
                if self.is_edge_removed.test(bond as usize) || seen[neighbor as usize] {
                    continue;
                }
                if neighbor == target {
                    return true;
                }
                seen[neighbor as usize] = true;
                stack.push(neighbor);
            }
        }
        false
    }

    fn add_to_dirty_list(&mut self, actor: u32, node: u32) {
        if self.is_node_in_dirty_list.test(node as usize) {
            return;
        }
        self.is_node_in_dirty_list.set(node as usize);
        self.dirty_node_links[node as usize] = self.first_dirty_node_indices[actor as usize];
        self.first_dirty_node_indices[actor as usize] = node;
    }

    /// Follow the cached fast route from `start` toward the island root.
    /// Succeeds when the chain reaches the root or a witness over live
    /// edges; on success the chain nodes become witnesses themselves.
    fn try_fast_path(
        &mut self,
        start: u32,
        island_id: u32,
        scratch: &mut IslandScratch,
        graph: &SupportGraph,
    ) -> bool {
        scratch.visited.clear();
        let node_limit = self.island_ids.len();
        let mut node = start;
        let mut depth = 0u32;
        loop {
            if node == island_id || (node != start && scratch.witnesses.test(node as usize)) {
                break;
            }
            if depth as usize >= node_limit {
                return false; // route cycles
            }
            let next = self.fast_route[node as usize];
            if is_invalid(next) || self.island_ids[node as usize] != island_id {
                return false;
            }
            let bond = graph.find_bond(node, next);
            if is_invalid(bond) || self.is_edge_removed.test(bond as usize) {
                return false;
            }
            scratch.visited.push_back(TraversalState {
                node,
                prev: INVALID_INDEX,
                depth,
            });
            node = next;
            depth += 1;
        }

        // Verified: the chain is live. Record hop counts back from the
        // endpoint and mark the chain as witnesses.
        let end_hops = if node == island_id {
            0
        } else {
            self.hop_counts[node as usize]
        };
        let chain = scratch.visited.as_slice();
        for (i, state) in chain.iter().enumerate() {
            let distance_to_end = (chain.len() - i) as u32;
            self.hop_counts[state.node as usize] = end_hops + distance_to_end;
            scratch.witnesses.set(state.node as usize);
        }
        true
    }

    /// Hop-count-greedy search from `start` for the island root or a
    /// witness, over live edges within `island_id`. On success the found
    /// path is unwound into fresh fast routes; on failure the visited
    /// array holds the start node's entire component.
    fn find_route(
        &mut self,
        start: u32,
        island_id: u32,
        scratch: &mut IslandScratch,
        graph: &SupportGraph,
    ) -> bool {
        scratch.visited.clear();
        scratch.visit_marks.clear_all();
        scratch.queue.clear();

        scratch.visited.push_back(TraversalState {
            node: start,
            prev: INVALID_INDEX,
            depth: 0,
        });
        scratch.visit_marks.set(start as usize);
        scratch.queue.push(QueueElement {
            visited_index: 0,
            hop_count: self.hop_counts[start as usize],
        });

        while !scratch.queue.is_empty() {
            let element = scratch.queue.pop();
            let state = scratch.visited[element.visited_index as usize];
            for (neighbor, bond) in graph.adjacent(state.node) {
                if self.is_edge_removed.test(bond as usize) {
                    continue;
                }
                if self.island_ids[neighbor as usize] != island_id {
                    continue;
                }
                if neighbor == island_id || scratch.witnesses.test(neighbor as usize) {
                    let end_hops = if neighbor == island_id {
                        0
                    } else {
                        self.hop_counts[neighbor as usize]
                    };
                    self.unwind_route(element.visited_index, neighbor, end_hops, scratch);
                    return true;
                }
                if !scratch.visit_marks.test(neighbor as usize) {
                    scratch.visit_marks.set(neighbor as usize);
                    scratch.visited.push_back(TraversalState {
                        node: neighbor,
                        prev: element.visited_index,
                        depth: state.depth + 1,
                    });
                    scratch.queue.push(QueueElement {
                        visited_index: scratch.visited.len() as u32 - 1,
                        hop_count: self.hop_counts[neighbor as usize],
                    });
                }
            }
        }
        false
    }

    /// Walk the traversal tree back from the successful node, pointing
    /// fast routes at the next hop toward `end_node` and marking the path
    /// as witnesses.
    fn unwind_route(
        &mut self,
        traversal_index: u32,
        end_node: u32,
        end_hops: u32,
        scratch: &mut IslandScratch,
    ) {
        let mut next = end_node;
        let mut hops = end_hops + 1;
        let mut index = traversal_index;
        loop {
            let state = scratch.visited[index as usize];
            self.fast_route[state.node as usize] = next;
            self.hop_counts[state.node as usize] = hops;
            scratch.witnesses.set(state.node as usize);
            next = state.node;
            hops += 1;
            if is_invalid(state.prev) {
                break;
            }
            index = state.prev;
        }
    }

    /// Turn the visited set into a new island rooted at `root`, with fast
    /// routes following the traversal tree back toward the root.
    fn adopt_component(&mut self, root: u32, scratch: &mut IslandScratch) {
        contract_assert!(!scratch.visited.is_empty());
        let members = scratch.visited.as_slice();
        for state in members {
            let node = state.node as usize;
            self.island_ids[node] = root;
            self.hop_counts[node] = state.depth;
            self.fast_route[node] = if is_invalid(state.prev) {
                INVALID_INDEX
            } else {
                members[state.prev as usize].node
            };
            if self.is_node_in_dirty_list.test(node) {
                self.is_node_in_dirty_list.reset(node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Path graph 0 - 1 - 2 with bonds 0 and 1.
    fn path3() -> SupportGraph {
        SupportGraph::from_parts(
            vec![0, 1, 2],
            vec![0, 1, 3, 4],
            vec![1, 0, 2, 1],
            vec![0, 0, 1, 1],
        )
    }

    #[test]
    fn initial_resolution_forms_one_island() {
        let graph = path3();
        let mut fg = FamilyGraph::new(3, 2);
        let mut scratch = IslandScratch::new(3);
        fg.initialize(0);
        assert_eq!(fg.edge_count(&graph), 2);
        assert_eq!(fg.find_islands(0, &mut scratch, &graph), 1);
        assert_eq!(fg.island_ids(), &[0, 0, 0]);
    }

    #[test]
    fn edge_removal_splits_path() {
        let graph = path3();
        let mut fg = FamilyGraph::new(3, 2);
        let mut scratch = IslandScratch::new(3);
        fg.initialize(0);
        fg.find_islands(0, &mut scratch, &graph);

        assert!(fg.notify_edge_removed(0, 1, 2, &graph));
        assert!(!fg.notify_edge_removed(0, 1, 2, &graph)); // already removed
        assert_eq!(fg.edge_count(&graph), 1);
        assert_eq!(fg.find_islands(0, &mut scratch, &graph), 1);
        assert_eq!(fg.island_ids()[0], fg.island_ids()[1]);
        assert_ne!(fg.island_ids()[0], fg.island_ids()[2]);
    }

    #[test]
    fn surviving_route_creates_no_island() {
        let graph = path3();
        let mut fg = FamilyGraph::new(3, 2);
        let mut scratch = IslandScratch::new(3);
        fg.initialize(0);
        fg.find_islands(0, &mut scratch, &graph);

        // Dirty the endpoints without disconnecting anything: there is no
        // such edge, so nothing happens at all.
        assert!(!fg.notify_edge_removed(0, 0, 2, &graph));
        assert_eq!(fg.find_islands(0, &mut scratch, &graph), 0);
        assert_eq!(fg.island_ids(), &[0, 0, 0]);
    }

    #[test]
    fn node_removal_drops_the_node_from_islands() {
        let graph = path3();
        let mut fg = FamilyGraph::new(3, 2);
        let mut scratch = IslandScratch::new(3);
        fg.initialize(0);
        fg.find_islands(0, &mut scratch, &graph);

        assert!(fg.notify_node_removed(0, 1, &graph));
        assert_eq!(fg.edge_count(&graph), 0);
        let new_islands = fg.find_islands(0, &mut scratch, &graph);
        // Node 0 keeps the old root; node 2 is carved off; node 1 is gone.
        assert_eq!(new_islands, 1);
        assert_eq!(fg.island_ids()[0], 0);
        assert!(is_invalid(fg.island_ids()[1]));
        assert_eq!(fg.island_ids()[2], 2);
    }

    #[test]
    fn has_edge_reflects_removal() {
        let graph = path3();
        let mut fg = FamilyGraph::new(3, 2);
        fg.initialize(0);
        assert!(fg.has_edge(0, 1, &graph));
        assert!(!fg.has_edge(0, 2, &graph));
        fg.notify_edge_removed(0, 0, 1, &graph);
        assert!(!fg.has_edge(0, 1, &graph));
    }

    #[test]
    fn can_find_root_ignores_cached_routes() {
        let graph = path3();
        let mut fg = FamilyGraph::new(3, 2);
        fg.initialize(0);
        assert!(fg.can_find_root(0, 2, &graph));
        fg.notify_edge_removed(0, 1, 2, &graph);
        assert!(!fg.can_find_root(0, 2, &graph));
        assert!(fg.can_find_root(2, 2, &graph));
    }

    #[test]
    fn dirty_tracking_is_per_actor() {
        let graph = path3();
        let mut fg = FamilyGraph::new(3, 2);
        let mut scratch = IslandScratch::new(3);
        fg.initialize(2);
        assert!(fg.has_dirty_nodes(2));
        assert!(!fg.has_dirty_nodes(0));
        assert_eq!(fg.find_islands(0, &mut scratch, &graph), 0);
        assert_eq!(fg.find_islands(2, &mut scratch, &graph), 1);
        assert!(!fg.has_dirty_nodes(2));
    }
}
