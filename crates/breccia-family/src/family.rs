//! The family: runtime arena and actor pool for one asset instance.

use std::sync::Arc;

use breccia_asset::Asset;
use breccia_core::{contract_assert, is_invalid, FamilyError, INVALID_INDEX};

use crate::actor::{ActorIndex, ActorSlot};
use crate::dlink::{self, IndexDLink};
use crate::graph::{FamilyGraph, IslandScratch};

/// How a health value is seeded at spawn.
#[derive(Clone, Copy, Debug)]
pub enum HealthInit<'a> {
    /// The same initial health everywhere.
    Uniform(f32),
    /// One value per element (per graph node for chunks, per bond for
    /// bonds). Per-node values propagate to every chunk in the node's
    /// subtree.
    Explicit(&'a [f32]),
}

/// Initial health configuration for a family's first actor.
#[derive(Clone, Copy, Debug)]
pub struct ActorDesc<'a> {
    /// Initial health of support chunks (and, through subtree propagation,
    /// their subsupport descendants).
    pub support_chunk_health: HealthInit<'a>,
    /// Initial health of bonds.
    pub bond_health: HealthInit<'a>,
}

impl ActorDesc<'_> {
    /// Uniform health for both chunks and bonds.
    #[must_use]
    pub fn uniform(chunk_health: f32, bond_health: f32) -> Self {
        Self {
            support_chunk_health: HealthInit::Uniform(chunk_health),
            bond_health: HealthInit::Uniform(bond_health),
        }
    }
}

/// Bytes a family allocates for the given asset, including the island
/// traversal scratch. Pure function of the asset's shape.
#[must_use]
pub fn family_memory_size(asset: &Asset) -> usize {
    use breccia_core::align16;
    let node_count = asset.graph().node_count();
    let bond_count = asset.bond_count();
    let lower = asset.lower_support_chunk_count() as usize;
    align16(lower * std::mem::size_of::<ActorSlot>())
        + align16(asset.chunk_count() as usize * std::mem::size_of::<IndexDLink>())
        + align16(asset.upper_support_chunk_count() as usize * 4)
        + align16(node_count as usize * 4)
        + align16(lower * 4)
        + align16(bond_count as usize * 4)
        + FamilyGraph::required_memory_size(node_count, bond_count)
        + IslandScratch::required_memory_size(node_count)
}

/// Runtime arena for one spawned instance of an [`Asset`].
///
/// A fresh family is empty; [`Family::create_first_actor`] spawns a single
/// actor (slot 0) owning every chunk and graph node, and actor
/// deserialization repopulates slots one actor at a time. Damage and
/// splitting redistribute ownership among the fixed pool of actor slots;
/// despawning (dropping the family) invalidates all of its actors at once.
pub struct Family {
    asset: Arc<Asset>,
    actors: Vec<ActorSlot>,
    visible_chunk_links: Vec<IndexDLink>,
    chunk_actor_indices: Vec<u32>,
    graph_node_links: Vec<u32>,
    /// Node healths in `[0, node_count)`, subsupport chunk healths after.
    lower_support_chunk_healths: Vec<f32>,
    bond_healths: Vec<f32>,
    family_graph: FamilyGraph,
    scratch: IslandScratch,
    actor_count: u32,
}

/// Iterator over an actor's visible chunk indices.
pub struct VisibleChunkIter<'a> {
    links: &'a [IndexDLink],
    curr: u32,
}

impl Iterator for VisibleChunkIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if is_invalid(self.curr) {
            return None;
        }
        let item = self.curr;
        self.curr = self.links[self.curr as usize].adj[1];
        Some(item)
    }
}

/// Iterator over an actor's graph node indices.
pub struct GraphNodeIter<'a> {
    links: &'a [u32],
    curr: u32,
}

impl Iterator for GraphNodeIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if is_invalid(self.curr) {
            return None;
        }
        let item = self.curr;
        self.curr = self.links[self.curr as usize];
        Some(item)
    }
}

impl Family {
    /// Allocate an empty family for an asset. Actors arrive either through
    /// [`Family::create_first_actor`] (fresh spawn) or through actor-state
    /// deserialization.
    pub fn new(asset: Arc<Asset>) -> Result<Self, FamilyError> {
        let node_count = asset.graph().node_count();
        if node_count == 0 {
            return Err(FamilyError::NoSupportChunks);
        }
        let bond_count = asset.bond_count();
        let lower_count = asset.lower_support_chunk_count() as usize;

        Ok(Self {
            actors: vec![ActorSlot::default(); lower_count],
            visible_chunk_links: vec![IndexDLink::default(); asset.chunk_count() as usize],
            chunk_actor_indices: vec![INVALID_INDEX; asset.upper_support_chunk_count() as usize],
            graph_node_links: vec![INVALID_INDEX; node_count as usize],
            lower_support_chunk_healths: vec![0.0; lower_count],
            bond_healths: vec![0.0; bond_count as usize],
            family_graph: FamilyGraph::new(node_count, bond_count),
            scratch: IslandScratch::new(node_count),
            actor_count: 0,
            asset,
        })
    }

    /// Spawn the family's first actor (slot 0), owning every chunk and
    /// graph node, with healths seeded from `desc`.
    pub fn create_first_actor(&mut self, desc: &ActorDesc<'_>) -> Result<ActorIndex, FamilyError> {
        if self.actor_count > 0 {
            return Err(FamilyError::FamilyNotEmpty);
        }
        let asset = Arc::clone(&self.asset);
        let node_count = asset.graph().node_count();
        let bond_count = asset.bond_count();

        if let HealthInit::Explicit(values) = desc.support_chunk_health {
            if values.len() != node_count as usize {
                return Err(FamilyError::SupportChunkHealthLength {
                    expected: node_count as usize,
                    actual: values.len(),
                });
            }
        }
        if let HealthInit::Explicit(values) = desc.bond_health {
            if values.len() != bond_count as usize {
                return Err(FamilyError::BondHealthLength {
                    expected: bond_count as usize,
                    actual: values.len(),
                });
            }
        }

        // Seed healths.
        match desc.support_chunk_health {
            HealthInit::Uniform(health) => self.lower_support_chunk_healths.fill(health),
            HealthInit::Explicit(values) => {
                for (node, &health) in values.iter().enumerate() {
                    let support_chunk = asset.graph().chunk_indices()[node];
                    for chunk in asset.depth_first(support_chunk) {
                        let index = asset.contiguous_lower_support_index(chunk);
                        self.lower_support_chunk_healths[index as usize] = health;
                    }
                }
            }
        }
        match desc.bond_health {
            HealthInit::Uniform(health) => self.bond_healths.fill(health),
            HealthInit::Explicit(values) => self.bond_healths.copy_from_slice(values),
        }

        // The first actor owns everything.
        self.borrow_actor(0);
        self.actors[0].first_graph_node_index = 0;
        self.actors[0].graph_node_count = node_count;
        self.actors[0].leaf_chunk_count = asset.leaf_chunk_count();
        for node in 0..node_count - 1 {
            self.graph_node_links[node as usize] = node + 1;
        }
        self.graph_node_links[node_count as usize - 1] = INVALID_INDEX;

        self.update_visible_chunks_from_graph_nodes(0);
        self.family_graph.initialize(0);
        self.family_graph
            .find_islands(0, &mut self.scratch, asset.graph());

        Ok(0)
    }

    /// The asset this family instantiates.
    #[must_use]
    pub fn asset(&self) -> &Arc<Asset> {
        &self.asset
    }

    /// Number of active actors.
    #[must_use]
    pub fn actor_count(&self) -> u32 {
        self.actor_count
    }

    /// Size of the actor slot pool (the worst-case actor count).
    #[must_use]
    pub fn max_actor_count(&self) -> u32 {
        self.actors.len() as u32
    }

    /// Whether slot `actor` currently holds an active actor.
    #[must_use]
    pub fn is_actor_active(&self, actor: ActorIndex) -> bool {
        (actor as usize) < self.actors.len() && self.actors[actor as usize].active
    }

    /// Iterate the indices of all active actors.
    pub fn actors(&self) -> impl Iterator<Item = ActorIndex> + '_ {
        self.actors
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.active)
            .map(|(index, _)| index as u32)
    }

    /// Iterate `actor`'s visible chunk indices.
    #[must_use]
    pub fn visible_chunks(&self, actor: ActorIndex) -> VisibleChunkIter<'_> {
        VisibleChunkIter {
            links: &self.visible_chunk_links,
            curr: self.actors[actor as usize].first_visible_chunk_index,
        }
    }

    /// Iterate `actor`'s graph node indices.
    #[must_use]
    pub fn graph_nodes(&self, actor: ActorIndex) -> GraphNodeIter<'_> {
        GraphNodeIter {
            links: &self.graph_node_links,
            curr: self.actors[actor as usize].first_graph_node_index,
        }
    }

    /// Number of chunks visible on `actor`.
    #[must_use]
    pub fn visible_chunk_count(&self, actor: ActorIndex) -> u32 {
        self.actors[actor as usize].visible_chunk_count
    }

    /// Number of graph nodes owned by `actor`.
    #[must_use]
    pub fn graph_node_count(&self, actor: ActorIndex) -> u32 {
        self.actors[actor as usize].graph_node_count
    }

    /// Number of leaf chunks under `actor`'s subtrees.
    #[must_use]
    pub fn leaf_chunk_count(&self, actor: ActorIndex) -> u32 {
        self.actors[actor as usize].leaf_chunk_count
    }

    /// Upper bound on the actors a single [`Family::split`] of `actor` can
    /// produce.
    #[must_use]
    pub fn max_split_actor_count(&self, actor: ActorIndex) -> u32 {
        self.actors[actor as usize].leaf_chunk_count + 1
    }

    /// The actor slot owning `chunk`, or invalid if unowned.
    #[must_use]
    pub fn chunk_actor_index(&self, chunk: u32) -> u32 {
        let upper = self.asset.upper_support_chunk_count();
        if chunk < upper {
            self.chunk_actor_indices[chunk as usize]
        } else {
            // Subsupport chunks map arithmetically onto the tail slots.
            chunk - (upper - self.asset.graph().node_count())
        }
    }

    /// The active actor owning `chunk`, if any.
    #[must_use]
    pub fn chunk_actor(&self, chunk: u32) -> Option<ActorIndex> {
        let index = self.chunk_actor_index(chunk);
        (!is_invalid(index) && self.is_actor_active(index)).then_some(index)
    }

    /// The active actor owning graph node `node`, if any.
    #[must_use]
    pub fn node_actor(&self, node: u32) -> Option<ActorIndex> {
        let chunk = self.asset.graph().chunk_indices()[node as usize];
        self.chunk_actor(chunk)
    }

    /// Bond healths, indexed by bond.
    #[must_use]
    pub fn bond_healths(&self) -> &[f32] {
        &self.bond_healths
    }

    /// Lower-support chunk healths: graph-node order first, then
    /// subsupport chunks in chunk order.
    #[must_use]
    pub fn lower_support_chunk_healths(&self) -> &[f32] {
        &self.lower_support_chunk_healths
    }

    /// Health of a lower-support chunk, or `None` for upper non-support
    /// chunks (which have no health of their own).
    #[must_use]
    pub fn chunk_health(&self, chunk: u32) -> Option<f32> {
        let index = self.asset.contiguous_lower_support_index(chunk);
        if is_invalid(index) {
            None
        } else {
            Some(self.lower_support_chunk_healths[index as usize])
        }
    }

    /// The connectivity tracker.
    #[must_use]
    pub fn family_graph(&self) -> &FamilyGraph {
        &self.family_graph
    }

    /// Mutable connectivity tracker, for actor-state restoration.
    pub fn family_graph_mut(&mut self) -> &mut FamilyGraph {
        &mut self.family_graph
    }

    /// Whether further damage can change `actor`: multi-node actors always
    /// can; single-chunk actors only while their chunk is alive.
    #[must_use]
    pub fn can_fracture(&self, actor: ActorIndex) -> bool {
        let slot = &self.actors[actor as usize];
        if !slot.active {
            return false;
        }
        if slot.graph_node_count < 2 {
            let health_index = if slot.graph_node_count == 0 {
                self.subsupport_health_index(slot.first_visible_chunk_index)
            } else {
                slot.first_graph_node_index
            };
            return self.lower_support_chunk_healths[health_index as usize] > 0.0;
        }
        true
    }

    /// Resolve `actor`'s dirty graph nodes into islands; returns the
    /// number of new islands found. Must be called after damage before
    /// splitting or serializing.
    pub fn find_islands(&mut self, actor: ActorIndex) -> Result<u32, FamilyError> {
        if !self.is_actor_active(actor) {
            return Err(FamilyError::ActorInactive { actor });
        }
        Ok(self
            .family_graph
            .find_islands(actor, &mut self.scratch, self.asset.graph()))
    }

    /// Split `actor` into its independent rigid pieces.
    ///
    /// Resolves islands, partitions the actor's graph nodes by island,
    /// rebuilds visibility, and cascades through dead single-chunk pieces
    /// (whose children become actors of their own). Indices of the
    /// resulting actors are appended to `new_actors`; the returned count is
    /// zero when the actor did not change, in which case nothing is
    /// appended. When it did change, the original slot is either released
    /// or reused for one of the results (it then appears in `new_actors`).
    pub fn split(
        &mut self,
        actor: ActorIndex,
        new_actors: &mut Vec<ActorIndex>,
    ) -> Result<usize, FamilyError> {
        if !self.is_actor_active(actor) {
            return Err(FamilyError::ActorInactive { actor });
        }
        let base = new_actors.len();

        if self.actors[actor as usize].graph_node_count <= 1 {
            let slot = &self.actors[actor as usize];
            let health_index = if slot.graph_node_count == 0 {
                self.subsupport_health_index(slot.first_visible_chunk_index)
            } else {
                slot.first_graph_node_index
            };
            if self.lower_support_chunk_healths[health_index as usize] <= 0.0 {
                self.partition_single_lower_support_chunk(actor, new_actors);
                self.cascade_brittle_chunks(base, new_actors);
            }
        } else {
            self.find_islands(actor)?;
            let count = self.partition_multiple_graph_nodes(actor, new_actors);
            if count > 1 {
                for i in base..new_actors.len() {
                    self.update_visible_chunks_from_graph_nodes(new_actors[i]);
                }
                self.cascade_brittle_chunks(base, new_actors);
            } else {
                // A single island is no split at all.
                new_actors.truncate(base);
            }
        }

        Ok(new_actors.len() - base)
    }

    // ---- restoration hooks used by the block codec ----

    /// Borrow a specific slot for actor-state restoration. Returns false
    /// (and does nothing) when the slot is already active.
    pub fn restore_borrow_actor(&mut self, actor: ActorIndex) -> bool {
        if self.is_actor_active(actor) {
            return false;
        }
        self.borrow_actor(actor);
        true
    }

    /// Release a slot again (rollback of a failed restoration).
    pub fn restore_return_actor(&mut self, actor: ActorIndex) {
        self.release_actor(actor);
    }

    /// Prepend `chunk` to `actor`'s visible list and claim its
    /// upper-support subtree. The subtree must be unowned.
    pub fn restore_visible_chunk(&mut self, actor: ActorIndex, chunk: u32) {
        let asset = Arc::clone(&self.asset);
        contract_assert!(dlink::is_solitary(&self.visible_chunk_links, chunk));
        dlink::insert_list_head(
            &mut self.actors[actor as usize].first_visible_chunk_index,
            &mut self.visible_chunk_links,
            chunk,
        );
        self.actors[actor as usize].visible_chunk_count += 1;
        for owned in asset.depth_first_upper_support(chunk) {
            contract_assert!(is_invalid(self.chunk_actor_indices[owned as usize]));
            self.chunk_actor_indices[owned as usize] = actor;
        }
    }

    /// Prepend graph node `node` to `actor`'s node list and assign its
    /// island id.
    pub fn restore_graph_node(&mut self, actor: ActorIndex, node: u32) {
        contract_assert!(is_invalid(self.graph_node_links[node as usize]));
        self.graph_node_links[node as usize] = self.actors[actor as usize].first_graph_node_index;
        self.actors[actor as usize].first_graph_node_index = node;
        self.actors[actor as usize].graph_node_count += 1;
        self.family_graph.set_island_id(node, actor);
    }

    /// Set restored visible-chunk and leaf counts on `actor`.
    pub fn restore_actor_counts(&mut self, actor: ActorIndex, leaf_chunk_count: u32) {
        self.actors[actor as usize].leaf_chunk_count = leaf_chunk_count;
    }

    /// Overwrite one lower-support health value (contiguous indexing).
    pub fn restore_lower_support_chunk_health(&mut self, index: u32, health: f32) {
        self.lower_support_chunk_healths[index as usize] = health;
    }

    /// Overwrite one bond health value.
    pub fn restore_bond_health(&mut self, bond: u32, health: f32) {
        self.bond_healths[bond as usize] = health;
    }

    // ---- internals shared with the fracture module ----

    pub(crate) fn asset_arc(&self) -> Arc<Asset> {
        Arc::clone(&self.asset)
    }

    pub(crate) fn health_mut(&mut self, index: u32) -> &mut f32 {
        &mut self.lower_support_chunk_healths[index as usize]
    }

    pub(crate) fn bond_health_mut(&mut self, bond: u32) -> &mut f32 {
        &mut self.bond_healths[bond as usize]
    }

    pub(crate) fn family_graph_and_scratch(
        &mut self,
    ) -> (&mut FamilyGraph, &mut IslandScratch) {
        (&mut self.family_graph, &mut self.scratch)
    }

    pub(crate) fn subsupport_health_index(&self, chunk: u32) -> u32 {
        self.asset.graph().node_count() + chunk - self.asset.first_subsupport_chunk_index()
    }

    fn borrow_actor(&mut self, actor: ActorIndex) {
        let slot = &mut self.actors[actor as usize];
        if !slot.active {
            slot.active = true;
            self.actor_count += 1;
        }
    }

    fn release_actor(&mut self, actor: ActorIndex) {
        let slot = &mut self.actors[actor as usize];
        if slot.active {
            slot.active = false;
            contract_assert!(self.actor_count > 0);
            self.actor_count -= 1;
        }
    }

    /// Rebuild `actor`'s visible-chunk list from its graph nodes after a
    /// repartition.
    pub(crate) fn update_visible_chunks_from_graph_nodes(&mut self, actor: ActorIndex) {
        if self.actors[actor as usize].graph_node_count == 0 {
            return;
        }
        let asset = Arc::clone(&self.asset);
        let mut node = self.actors[actor as usize].first_graph_node_index;
        while !is_invalid(node) {
            let support_chunk = asset.graph().chunk_indices()[node as usize];
            self.update_visible_chunks_from_support_chunk(actor, support_chunk);
            node = self.graph_node_links[node as usize];
        }
    }

    /// Walk up from a support chunk, transferring visibility to `actor`.
    ///
    /// A chunk is visible exactly when its owner differs from its parent's
    /// owner. Climbing stops as soon as ownership stops changing; when all
    /// siblings share an owner the parent absorbs them, otherwise the
    /// parent's ownership clears and its children surface.
    fn update_visible_chunks_from_support_chunk(&mut self, actor: ActorIndex, support_chunk: u32) {
        let asset = Arc::clone(&self.asset);
        let chunks = asset.chunks();
        let upper_support_chunk_count = asset.upper_support_chunk_count();

        let mut chunk_index = support_chunk;
        let mut chunk_actor_index = self.chunk_actor_indices[support_chunk as usize];
        let mut new_chunk_actor_index = actor;

        loop {
            if chunk_actor_index == new_chunk_actor_index {
                break; // ownership unchanged from here on up
            }

            let parent_chunk_index = chunks[chunk_index as usize].parent_chunk_index;
            let parent_chunk_actor_index = if !is_invalid(parent_chunk_index) {
                self.chunk_actor_indices[parent_chunk_index as usize]
            } else {
                INVALID_INDEX
            };
            let chunk_visible = chunk_actor_index != parent_chunk_actor_index;

            // A visible chunk leaves its old actor's visibility list.
            if chunk_visible && !is_invalid(chunk_actor_index) {
                dlink::remove_from_list(
                    &mut self.actors[chunk_actor_index as usize].first_visible_chunk_index,
                    &mut self.visible_chunk_links,
                    chunk_index,
                );
                self.actors[chunk_actor_index as usize].visible_chunk_count -= 1;
            }

            let old_chunk_actor_index = self.chunk_actor_indices[chunk_index as usize];
            self.chunk_actor_indices[chunk_index as usize] = new_chunk_actor_index;
            if !is_invalid(new_chunk_actor_index)
                && parent_chunk_actor_index != new_chunk_actor_index
            {
                // Now visible on this actor.
                dlink::insert_list_head(
                    &mut self.actors[actor as usize].first_visible_chunk_index,
                    &mut self.visible_chunk_links,
                    chunk_index,
                );
                self.actors[actor as usize].visible_chunk_count += 1;
                // Its children stop being visible on this actor.
                if actor != old_chunk_actor_index {
                    let chunk = &chunks[chunk_index as usize];
                    if chunk.first_child_index < upper_support_chunk_count {
                        for child in chunk.first_child_index..chunk.child_index_stop {
                            if self.chunk_actor_indices[child as usize] == actor {
                                dlink::remove_from_list(
                                    &mut self.actors[actor as usize].first_visible_chunk_index,
                                    &mut self.visible_chunk_links,
                                    child,
                                );
                                self.actors[actor as usize].visible_chunk_count -= 1;
                            }
                        }
                    }
                }
            }

            if !is_invalid(parent_chunk_index) {
                // The parent inherits ownership only if all its children
                // agree; otherwise it clears and its children surface.
                let parent_chunk = &chunks[parent_chunk_index as usize];
                let mut uniform = true;
                for child in parent_chunk.first_child_index..parent_chunk.child_index_stop {
                    if new_chunk_actor_index != self.chunk_actor_indices[child as usize] {
                        uniform = false;
                        break;
                    }
                }
                if !uniform {
                    new_chunk_actor_index = INVALID_INDEX;
                    for child in parent_chunk.first_child_index..parent_chunk.child_index_stop {
                        let child_actor = self.chunk_actor_indices[child as usize];
                        if !is_invalid(child_actor) && child_actor == parent_chunk_actor_index {
                            // This sibling was invisible under the shared
                            // parent; it surfaces on its own actor.
                            dlink::insert_list_head(
                                &mut self.actors[child_actor as usize].first_visible_chunk_index,
                                &mut self.visible_chunk_links,
                                child,
                            );
                            self.actors[child_actor as usize].visible_chunk_count += 1;
                        }
                    }
                }
            }

            if is_invalid(parent_chunk_index) {
                break;
            }
            chunk_index = parent_chunk_index;
            chunk_actor_index = parent_chunk_actor_index;
        }
    }

    /// Distribute `actor`'s graph nodes to their islands' actors. Appends
    /// every actor that received its first node, plus `actor` itself if it
    /// kept any; releases `actor` otherwise. Returns the appended count.
    fn partition_multiple_graph_nodes(
        &mut self,
        actor: ActorIndex,
        new_actors: &mut Vec<ActorIndex>,
    ) -> usize {
        if self.actors[actor as usize].graph_node_count <= 1 {
            log::warn!("partition_multiple_graph_nodes: actor {actor} is a single lower-support chunk");
            return 0;
        }
        let asset = Arc::clone(&self.asset);
        let graph_chunk_indices = asset.graph().chunk_indices();
        let subtree_leaf_chunk_counts = asset.subtree_leaf_chunk_counts();

        let mut appended = 0;
        self.actors[actor as usize].leaf_chunk_count = 0;
        let mut last_node = INVALID_INDEX;
        let mut node = self.actors[actor as usize].first_graph_node_index;
        while !is_invalid(node) {
            let next_node = self.graph_node_links[node as usize];
            let island_id = self.family_graph.island_ids()[node as usize];

            if island_id == actor {
                // Stays here.
                self.actors[actor as usize].leaf_chunk_count +=
                    subtree_leaf_chunk_counts[graph_chunk_indices[node as usize] as usize];
                last_node = node;
                node = next_node;
                continue;
            }

            // Unlink from this actor.
            if is_invalid(last_node) {
                self.actors[actor as usize].first_graph_node_index = next_node;
            } else {
                self.graph_node_links[last_node as usize] = next_node;
            }
            self.graph_node_links[node as usize] = INVALID_INDEX;
            self.actors[actor as usize].graph_node_count -= 1;

            // A removed (dead) node joins no one.
            if is_invalid(island_id) {
                node = next_node;
                continue;
            }

            self.borrow_actor(island_id);
            if is_invalid(self.actors[island_id as usize].first_graph_node_index) {
                new_actors.push(island_id);
                appended += 1;
            }
            self.graph_node_links[node as usize] =
                self.actors[island_id as usize].first_graph_node_index;
            self.actors[island_id as usize].first_graph_node_index = node;
            self.actors[island_id as usize].graph_node_count += 1;
            self.actors[island_id as usize].leaf_chunk_count +=
                subtree_leaf_chunk_counts[graph_chunk_indices[node as usize] as usize];

            node = next_node;
        }

        if self.actors[actor as usize].graph_node_count > 0 {
            new_actors.push(actor);
            appended += 1;
        } else {
            self.release_actor(actor);
        }

        appended
    }

    /// Replace a dead single-lower-support-chunk actor by one actor per
    /// child chunk. Returns the number of children appended.
    fn partition_single_lower_support_chunk(
        &mut self,
        actor: ActorIndex,
        new_actors: &mut Vec<ActorIndex>,
    ) -> usize {
        if self.actors[actor as usize].graph_node_count > 1 {
            log::warn!("partition_single_lower_support_chunk: actor {actor} holds multiple graph nodes");
            return 0;
        }
        let asset = Arc::clone(&self.asset);
        let slot = &self.actors[actor as usize];
        // A single-support-chunk actor may display an ancestor of its
        // support chunk (single-child chains), so take the chunk from the
        // graph when a node is present.
        let chunk_index = if slot.graph_node_count == 0 {
            slot.first_visible_chunk_index
        } else {
            asset.graph().chunk_indices()[slot.first_graph_node_index as usize]
        };

        let chunk = &asset.chunks()[chunk_index as usize];
        let child_count = chunk.child_count();
        if child_count == 0 {
            return 0;
        }

        let node_count = asset.graph().node_count();
        let first_subsupport = asset.first_subsupport_chunk_index();
        for child in chunk.first_child_index..chunk.child_index_stop {
            contract_assert!(child >= first_subsupport);
            let child_actor = node_count + (child - first_subsupport);
            contract_assert!(!self.actors[child_actor as usize].active);
            self.borrow_actor(child_actor);
            self.actors[child_actor as usize].first_visible_chunk_index = child;
            self.actors[child_actor as usize].visible_chunk_count = 1;
            self.actors[child_actor as usize].leaf_chunk_count =
                asset.subtree_leaf_chunk_counts()[child as usize];
            new_actors.push(child_actor);
        }

        self.release_actor(actor);
        child_count as usize
    }

    /// Re-partition any dead single-chunk results of a split into their
    /// children, repeatedly, until every listed actor is alive or solid.
    fn cascade_brittle_chunks(&mut self, base: usize, new_actors: &mut Vec<ActorIndex>) {
        let mut i = base;
        while i < new_actors.len() {
            let candidate = new_actors[i];
            let slot = &self.actors[candidate as usize];
            if slot.graph_node_count <= 1 {
                let health_index = if slot.graph_node_count == 0 {
                    self.subsupport_health_index(slot.first_visible_chunk_index)
                } else {
                    slot.first_graph_node_index
                };
                if self.lower_support_chunk_healths[health_index as usize] <= 0.0 {
                    let added = self.partition_single_lower_support_chunk(candidate, new_actors);
                    if added > 0 {
                        new_actors.swap_remove(i);
                        continue; // re-examine the swapped-in entry
                    }
                }
            }
            i += 1;
        }
    }
}
