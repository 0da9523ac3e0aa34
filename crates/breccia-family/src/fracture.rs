//! Damage application.
//!
//! The family consumes health deltas computed by the embedding engine's
//! damage model; it owns only the consequences of zero crossings. A bond
//! crossing zero severs its edge in the family graph and dirties the
//! owning actor. A lower-support chunk crossing zero detaches from the
//! graph (zeroing its bonds) and spills surplus damage evenly into its
//! children, recursively — subsupport chunks form simple trees off a
//! single graph node, so no connectivity work is needed below the support
//! level.

use std::sync::Arc;

use breccia_core::{contract_assert, is_invalid, INVALID_INDEX};

use crate::actor::ActorIndex;
use crate::family::Family;

/// Health damage addressed to the bond between two graph nodes.
#[derive(Clone, Copy, Debug)]
pub struct BondFractureCommand {
    /// First endpoint node.
    pub node0: u32,
    /// Second endpoint node.
    pub node1: u32,
    /// Health to subtract.
    pub health_damage: f32,
}

/// Health damage addressed to a lower-support chunk.
#[derive(Clone, Copy, Debug)]
pub struct ChunkFractureCommand {
    /// The chunk to damage.
    pub chunk_index: u32,
    /// Health to subtract.
    pub health_damage: f32,
}

/// A batch of damage commands.
#[derive(Clone, Copy, Debug, Default)]
pub struct FractureCommands<'a> {
    /// Bond damage commands.
    pub bond_fractures: &'a [BondFractureCommand],
    /// Chunk damage commands.
    pub chunk_fractures: &'a [ChunkFractureCommand],
}

/// Reports one bond actually damaged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BondFractureEvent {
    /// The bond's user data from the asset.
    pub user_data: u32,
    /// First endpoint node.
    pub node0: u32,
    /// Second endpoint node.
    pub node1: u32,
    /// Remaining health after the damage.
    pub health: f32,
}

/// Reports one chunk actually damaged.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkFractureEvent {
    /// The chunk's user data from the asset.
    pub user_data: u32,
    /// The damaged chunk.
    pub chunk_index: u32,
    /// Remaining health after the damage (negative when overkilled).
    pub health: f32,
}

/// Caller-owned sinks for fracture events.
#[derive(Debug, Default)]
pub struct FractureEvents {
    /// Bonds damaged, in application order.
    pub bond_fractures: Vec<BondFractureEvent>,
    /// Chunks damaged, in application order (hierarchical damage reports
    /// each affected descendant).
    pub chunk_fractures: Vec<ChunkFractureEvent>,
}

impl FractureEvents {
    /// Empty both sinks, keeping their allocations.
    pub fn clear(&mut self) {
        self.bond_fractures.clear();
        self.chunk_fractures.clear();
    }
}

impl Family {
    /// Subtract `health_damage` from the bond between `node0` and `node1`
    /// on `actor`. On a zero crossing the edge is severed and the actor
    /// dirtied. Returns the bond index, or invalid when the nodes share no
    /// bond.
    pub fn damage_bond(
        &mut self,
        actor: ActorIndex,
        node0: u32,
        node1: u32,
        health_damage: f32,
    ) -> u32 {
        let asset = self.asset_arc();
        let bond = asset.graph().find_bond(node0, node1);
        if is_invalid(bond) {
            contract_assert!(false, "damage_bond: nodes {node0} and {node1} share no bond");
            return INVALID_INDEX;
        }
        let health = *self.bond_health_mut(bond);
        if health > 0.0 && health_damage > 0.0 {
            *self.bond_health_mut(bond) = health - health_damage;
            if health - health_damage <= 0.0 {
                let (graph, _) = self.family_graph_and_scratch();
                graph.notify_edge_removed_with_bond(actor, node0, node1, bond);
                // Pin to zero so serialized state is reproducible.
                *self.bond_health_mut(bond) = 0.0;
            }
        }
        bond
    }

    /// Apply a batch of damage commands.
    ///
    /// With `filter_actor` set, commands resolving to a different actor
    /// are skipped with a warning (damage computed against a stale actor
    /// must not leak onto its neighbors). Events, when a sink is given,
    /// record each bond and chunk actually damaged.
    pub fn apply_fracture(
        &mut self,
        filter_actor: Option<ActorIndex>,
        commands: &FractureCommands<'_>,
        mut events: Option<&mut FractureEvents>,
    ) {
        for command in commands.chunk_fractures {
            self.apply_chunk_fracture(filter_actor, command, events.as_deref_mut());
        }

        let asset = self.asset_arc();
        for command in commands.bond_fractures {
            let graph = asset.graph();
            contract_assert!(command.node0 < graph.node_count());
            contract_assert!(command.node1 < graph.node_count());
            let chunk0 = graph.chunk_indices()[command.node0 as usize];
            let chunk1 = graph.chunk_indices()[command.node1 as usize];
            let actor0 = self.chunk_actor(chunk0);
            let actor1 = self.chunk_actor(chunk1);
            // Different live owners mean the bond is already broken.
            if actor0 != actor1 && actor0.is_some() && actor1.is_some() {
                continue;
            }
            let Some(actor) = actor0.or(actor1) else {
                continue;
            };
            if filter_actor.is_some_and(|filter| filter != actor) {
                log::warn!("apply_fracture: bond fracture command addresses another actor; ignored");
                continue;
            }
            let bond = self.damage_bond(actor, command.node0, command.node1, command.health_damage);
            if !is_invalid(bond) {
                if let Some(sink) = events.as_deref_mut() {
                    sink.bond_fractures.push(BondFractureEvent {
                        user_data: asset.bonds()[bond as usize].user_data,
                        node0: command.node0,
                        node1: command.node1,
                        health: self.bond_healths()[bond as usize],
                    });
                }
            }
        }
    }

    fn apply_chunk_fracture(
        &mut self,
        filter_actor: Option<ActorIndex>,
        command: &ChunkFractureCommand,
        mut events: Option<&mut FractureEvents>,
    ) {
        let asset = self.asset_arc();
        let chunk_index = command.chunk_index;
        let health_index = asset.contiguous_lower_support_index(chunk_index);
        contract_assert!(!is_invalid(health_index));
        if is_invalid(health_index) {
            return;
        }
        let health = self.lower_support_chunk_healths()[health_index as usize];
        if health <= 0.0 || command.health_damage <= 0.0 {
            return;
        }
        let Some(actor) = self.chunk_actor(chunk_index) else {
            return;
        };
        if filter_actor.is_some_and(|filter| filter != actor) {
            log::warn!("apply_fracture: chunk fracture command addresses another actor; ignored");
            return;
        }

        // A dying support chunk takes its bonds with it.
        let node_index = asset.chunk_to_graph_node_map()[chunk_index as usize];
        if self.graph_node_count(actor) > 1 && !is_invalid(node_index) {
            for adj in asset.graph().adjacency_range(node_index) {
                let bond = asset.graph().adjacent_bond_indices()[adj];
                contract_assert!(!is_invalid(bond));
                if *self.bond_health_mut(bond) > 0.0 {
                    *self.bond_health_mut(bond) = 0.0;
                }
            }
            let (graph, _) = self.family_graph_and_scratch();
            graph.notify_node_removed(actor, node_index, asset.graph());
        }

        let new_health = health - command.health_damage;
        *self.health_mut(health_index) = new_health;

        if let Some(sink) = events.as_deref_mut() {
            sink.chunk_fractures.push(ChunkFractureEvent {
                user_data: asset.chunks()[chunk_index as usize].user_data,
                chunk_index,
                health: new_health,
            });
        }

        let remaining_damage = -new_health;
        if remaining_damage > 0.0 {
            self.fracture_sub_support(chunk_index, remaining_damage, events);
        }
    }

    /// Spill surplus damage into `chunk_index`'s children, split evenly,
    /// recursing wherever a child is overkilled in turn.
    fn fracture_sub_support(
        &mut self,
        chunk_index: u32,
        health_damage: f32,
        mut events: Option<&mut FractureEvents>,
    ) {
        let asset = self.asset_arc();
        let chunk = &asset.chunks()[chunk_index as usize];
        let child_count = chunk.child_count();
        if child_count == 0 {
            return;
        }

        let per_child_damage = health_damage / child_count as f32;
        for child in chunk.first_child_index..chunk.child_index_stop {
            let health_index = asset.contiguous_lower_support_index(child);
            let health = self.lower_support_chunk_healths()[health_index as usize];
            if health <= 0.0 {
                continue;
            }
            contract_assert!(asset.chunks()[child as usize].parent_chunk_index == chunk_index);
            let remaining_damage = per_child_damage - health;
            let new_health = health - per_child_damage;
            *self.health_mut(health_index) = new_health;

            if let Some(sink) = events.as_deref_mut() {
                sink.chunk_fractures.push(ChunkFractureEvent {
                    user_data: asset.chunks()[child as usize].user_data,
                    chunk_index: child,
                    health: new_health,
                });
            }

            if new_health <= 0.0 && remaining_damage > 0.0 {
                self.fracture_sub_support(child, remaining_damage, events.as_deref_mut());
            }
        }
    }
}
