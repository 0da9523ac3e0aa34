//! Actor state block encode/decode.
//!
//! Section order after the 16-byte header and count table: visible chunk
//! indices, graph node indices, lower-support chunk healths (graph-node
//! order, depth-first per support chunk), bond healths (adjacency order,
//! each undirected bond once), fast routes, hop counts, and — when the
//! actor has interior bonds — a removed-edge flag array over them. Every
//! section is 16-byte aligned.
//!
//! Serialization requires the actor's dirty nodes to be resolved
//! ([`breccia_family::Family::find_islands`]); deserialization re-derives
//! the family-wide chunk ownership, membership links, and island ids as a
//! side effect of restoring the one actor.

use breccia_asset::Asset;
use breccia_core::{align16, contract_assert, is_invalid, BlockError};
use breccia_family::{ActorIndex, Family};
use breccia_fixed::FixedBoolArray;

use crate::codec::{read_header, write_header, BlockReader, BlockWriter};
use crate::ACTOR_BLOCK_TYPE;

/// Current actor block format version.
pub const ACTOR_FORMAT_VERSION: u32 = 1;

const HEADER_SIZE: usize = 16;
/// actor index, visible chunk count, graph node count, leaf chunk count.
const COUNTS_SIZE: usize = 16;

/// Encoded size for the given section element counts.
fn block_size(
    visible_chunk_count: usize,
    lower_support_chunk_count: usize,
    graph_node_count: usize,
    bond_count: usize,
) -> usize {
    HEADER_SIZE
        + COUNTS_SIZE
        + align16(visible_chunk_count * 4)
        + align16(graph_node_count * 4)
        + align16(lower_support_chunk_count * 4)
        + align16(bond_count * 4)
        + align16(graph_node_count * 4)
        + align16(graph_node_count * 4)
        + if bond_count == 0 {
            0
        } else {
            FixedBoolArray::required_memory_size(bond_count)
        }
}

/// Count the actor's lower-support chunks and interior bonds by the same
/// traversal the codec uses.
fn count_actor_contents(family: &Family, actor: ActorIndex) -> (usize, usize) {
    let asset = family.asset();
    let graph = asset.graph();
    let mut lower_support_chunk_count = 0;
    let mut bond_count = 0;
    if family.graph_node_count(actor) > 0 {
        for node in family.graph_nodes(actor) {
            for adj in graph.adjacency_range(node) {
                let adjacent_node = graph.adjacent_node_indices()[adj];
                if adjacent_node > node {
                    let adjacent_chunk = graph.chunk_indices()[adjacent_node as usize];
                    if family.chunk_actor_index(adjacent_chunk) == actor {
                        bond_count += 1;
                    }
                }
            }
            let support_chunk = graph.chunk_indices()[node as usize];
            lower_support_chunk_count += asset.depth_first(support_chunk).count();
        }
    } else {
        lower_support_chunk_count = 1;
    }
    (lower_support_chunk_count, bond_count)
}

/// Exact encoded size of `actor`'s state, or 0 when the slot is inactive.
#[must_use]
pub fn actor_serialization_size(family: &Family, actor: ActorIndex) -> usize {
    if !family.is_actor_active(actor) {
        return 0;
    }
    let (lower_support_chunk_count, bond_count) = count_actor_contents(family, actor);
    block_size(
        family.visible_chunk_count(actor) as usize,
        lower_support_chunk_count,
        family.graph_node_count(actor) as usize,
        bond_count,
    )
}

/// Size sufficient to serialize any actor of any family built from
/// `asset`.
#[must_use]
pub fn actor_serialization_size_upper_bound(asset: &Asset) -> usize {
    let node_count = asset.graph().node_count() as usize;
    block_size(
        node_count,
        asset.lower_support_chunk_count() as usize,
        node_count,
        asset.bond_count() as usize,
    )
}

/// Encode `actor`'s state into `buf`; returns the bytes written.
///
/// Fails with [`BlockError::DirtyNodes`] when island resolution is
/// pending — the connectivity caches being written must be settled.
pub fn serialize_actor(
    family: &Family,
    actor: ActorIndex,
    buf: &mut [u8],
) -> Result<usize, BlockError> {
    if !family.is_actor_active(actor) {
        return Err(BlockError::Malformed {
            detail: format!("actor {actor} is not active"),
        });
    }
    if family.graph_node_count(actor) > 0 && family.family_graph().has_dirty_nodes(actor) {
        log::error!("serialize_actor: actor {actor} has dirty nodes; call find_islands first");
        return Err(BlockError::DirtyNodes { actor });
    }

    let asset = family.asset();
    let graph = asset.graph();
    let (lower_support_chunk_count, bond_count) = count_actor_contents(family, actor);
    let total = block_size(
        family.visible_chunk_count(actor) as usize,
        lower_support_chunk_count,
        family.graph_node_count(actor) as usize,
        bond_count,
    );
    if buf.len() < total {
        return Err(BlockError::BufferTooSmall {
            needed: total,
            available: buf.len(),
        });
    }

    let mut writer = BlockWriter::new(buf);
    let size_offset = write_header(&mut writer, ACTOR_BLOCK_TYPE, ACTOR_FORMAT_VERSION)?;
    writer.write_u32(actor)?;
    writer.write_u32(family.visible_chunk_count(actor))?;
    writer.write_u32(family.graph_node_count(actor))?;
    writer.write_u32(family.leaf_chunk_count(actor))?;

    // Visible chunk indices.
    for chunk in family.visible_chunks(actor) {
        writer.write_u32(chunk)?;
    }
    writer.pad_to_16()?;

    // Graph node indices.
    for node in family.graph_nodes(actor) {
        writer.write_u32(node)?;
    }
    writer.pad_to_16()?;

    // Lower-support chunk healths: each node's health, then its subtree
    // depth-first (the support chunk itself excluded).
    let healths = family.lower_support_chunk_healths();
    if family.graph_node_count(actor) > 0 {
        for node in family.graph_nodes(actor) {
            writer.write_f32(healths[node as usize])?;
            let support_chunk = graph.chunk_indices()[node as usize];
            for chunk in asset.depth_first(support_chunk).skip(1) {
                let index = asset.contiguous_lower_support_index(chunk);
                writer.write_f32(healths[index as usize])?;
            }
        }
    } else {
        let chunk = family
            .visible_chunks(actor)
            .next()
            .expect("single-chunk actor has a visible chunk");
        let index = asset.contiguous_lower_support_index(chunk);
        writer.write_f32(healths[index as usize])?;
    }
    writer.pad_to_16()?;

    // Bond healths, interior to the actor, each undirected bond once.
    for node in family.graph_nodes(actor) {
        for adj in graph.adjacency_range(node) {
            let adjacent_node = graph.adjacent_node_indices()[adj];
            if adjacent_node > node {
                let adjacent_chunk = graph.chunk_indices()[adjacent_node as usize];
                if family.chunk_actor_index(adjacent_chunk) == actor {
                    let bond = graph.adjacent_bond_indices()[adj];
                    writer.write_f32(family.bond_healths()[bond as usize])?;
                }
            }
        }
    }
    writer.pad_to_16()?;

    // Fast routes, then hop counts.
    for node in family.graph_nodes(actor) {
        writer.write_u32(family.family_graph().fast_route()[node as usize])?;
    }
    writer.pad_to_16()?;
    for node in family.graph_nodes(actor) {
        writer.write_u32(family.family_graph().hop_counts()[node as usize])?;
    }
    writer.pad_to_16()?;

    // Removed-edge flags over the actor's interior bonds.
    if bond_count > 0 {
        writer.write_u32(bond_count as u32)?;
        writer.pad_to_16()?;
        let removed = family.family_graph().is_edge_removed();
        for node in family.graph_nodes(actor) {
            for adj in graph.adjacency_range(node) {
                let adjacent_node = graph.adjacent_node_indices()[adj];
                if adjacent_node > node {
                    let adjacent_chunk = graph.chunk_indices()[adjacent_node as usize];
                    if family.chunk_actor_index(adjacent_chunk) == actor {
                        let bond = graph.adjacent_bond_indices()[adj];
                        writer.write_bytes(&[u8::from(removed.test(bond as usize))])?;
                    }
                }
            }
        }
        writer.pad_to_16()?;
    }

    let written = writer.position();
    debug_assert_eq!(written, total);
    writer.patch_u32(size_offset, written as u32);
    Ok(written)
}

/// Decode an actor block into `family`, recreating the actor in its
/// original slot.
///
/// The slot must be free and none of the block's chunks owned by another
/// actor; family-wide structures (chunk ownership, membership links,
/// island ids, restored edge flags) are rebuilt as a side effect.
pub fn deserialize_actor(family: &mut Family, buf: &[u8]) -> Result<ActorIndex, BlockError> {
    let asset = family.asset().clone();
    let graph = asset.graph();

    let mut reader = BlockReader::new(buf);
    let recorded_size = read_header(&mut reader, ACTOR_BLOCK_TYPE, ACTOR_FORMAT_VERSION)?;
    if (recorded_size as usize) > buf.len() {
        return Err(BlockError::Malformed {
            detail: format!(
                "recorded size {recorded_size} exceeds buffer length {}",
                buf.len()
            ),
        });
    }

    let actor = reader.read_u32("actor index")?;
    let visible_chunk_count = reader.read_u32("visible chunk count")? as usize;
    let graph_node_count = reader.read_u32("graph node count")? as usize;
    let leaf_chunk_count = reader.read_u32("leaf chunk count")?;

    if actor >= family.max_actor_count() {
        return Err(BlockError::ActorIndexOutOfRange { actor });
    }
    if family.is_actor_active(actor) {
        return Err(BlockError::ActorSlotOccupied { actor });
    }

    let mut visible_chunks = Vec::with_capacity(visible_chunk_count);
    for _ in 0..visible_chunk_count {
        let chunk = reader.read_u32("visible chunk index")?;
        if chunk >= asset.chunk_count() {
            return Err(BlockError::Malformed {
                detail: format!("visible chunk index {chunk} out of range"),
            });
        }
        visible_chunks.push(chunk);
    }
    reader.skip_to_16("visible chunk padding")?;

    let mut graph_nodes = Vec::with_capacity(graph_node_count);
    let mut is_member = vec![false; graph.node_count() as usize];
    for _ in 0..graph_node_count {
        let node = reader.read_u32("graph node index")?;
        if node >= graph.node_count() || is_member[node as usize] {
            return Err(BlockError::Malformed {
                detail: format!("bad graph node index {node}"),
            });
        }
        is_member[node as usize] = true;
        graph_nodes.push(node);
    }
    reader.skip_to_16("graph node padding")?;

    if graph_node_count == 0 && visible_chunks.is_empty() {
        return Err(BlockError::Malformed {
            detail: "actor block has neither graph nodes nor visible chunks".into(),
        });
    }

    // No chunk in the block may already have an owner in this family.
    for &chunk in &visible_chunks {
        if chunk < asset.upper_support_chunk_count() {
            if !is_invalid(family.chunk_actor_index(chunk)) {
                return Err(BlockError::ChunkAlreadyOwned { chunk });
            }
        } else if family.is_actor_active(family.chunk_actor_index(chunk)) {
            return Err(BlockError::ChunkAlreadyOwned { chunk });
        }
    }

    // Derive the remaining section sizes and hold the block to them.
    let mut lower_support_chunk_count = 0usize;
    let mut bond_count = 0usize;
    if graph_node_count > 0 {
        for &node in &graph_nodes {
            for adj in graph.adjacency_range(node) {
                let adjacent_node = graph.adjacent_node_indices()[adj];
                if adjacent_node > node && is_member[adjacent_node as usize] {
                    bond_count += 1;
                }
            }
            let support_chunk = graph.chunk_indices()[node as usize];
            lower_support_chunk_count += asset.depth_first(support_chunk).count();
        }
    } else {
        lower_support_chunk_count = 1;
    }
    let expected_size = block_size(
        visible_chunk_count,
        lower_support_chunk_count,
        graph_node_count,
        bond_count,
    );
    if recorded_size as usize != expected_size {
        return Err(BlockError::Malformed {
            detail: format!(
                "recorded size {recorded_size} does not match derived size {expected_size}"
            ),
        });
    }

    // All validation done; rebuild the actor.
    if !family.restore_borrow_actor(actor) {
        return Err(BlockError::ActorSlotOccupied { actor });
    }

    for &chunk in visible_chunks.iter().rev() {
        family.restore_visible_chunk(actor, chunk);
    }
    for &node in graph_nodes.iter().rev() {
        family.restore_graph_node(actor, node);
    }
    family.restore_actor_counts(actor, leaf_chunk_count);
    contract_assert!(family.visible_chunk_count(actor) as usize == visible_chunk_count);
    contract_assert!(family.graph_node_count(actor) as usize == graph_node_count);

    // Lower-support chunk healths.
    if graph_node_count > 0 {
        for &node in &graph_nodes {
            let health = reader.read_f32("node health")?;
            family.restore_lower_support_chunk_health(node, health);
            let support_chunk = graph.chunk_indices()[node as usize];
            for chunk in asset.depth_first(support_chunk).skip(1) {
                let health = reader.read_f32("subsupport health")?;
                let index = asset.contiguous_lower_support_index(chunk);
                family.restore_lower_support_chunk_health(index, health);
            }
        }
    } else {
        let health = reader.read_f32("chunk health")?;
        let chunk = visible_chunks[0];
        let index = asset.contiguous_lower_support_index(chunk);
        family.restore_lower_support_chunk_health(index, health);
    }
    reader.skip_to_16("health padding")?;

    // Bond healths.
    let mut interior_bonds = Vec::with_capacity(bond_count);
    for &node in &graph_nodes {
        for adj in graph.adjacency_range(node) {
            let adjacent_node = graph.adjacent_node_indices()[adj];
            if adjacent_node > node && is_member[adjacent_node as usize] {
                let bond = graph.adjacent_bond_indices()[adj];
                let health = reader.read_f32("bond health")?;
                family.restore_bond_health(bond, health);
                interior_bonds.push(bond);
            }
        }
    }
    reader.skip_to_16("bond health padding")?;

    // Fast routes and hop counts.
    let mut fast_routes = Vec::with_capacity(graph_node_count);
    for _ in 0..graph_node_count {
        fast_routes.push(reader.read_u32("fast route")?);
    }
    reader.skip_to_16("fast route padding")?;
    let mut hop_counts = Vec::with_capacity(graph_node_count);
    for _ in 0..graph_node_count {
        hop_counts.push(reader.read_u32("hop count")?);
    }
    reader.skip_to_16("hop count padding")?;
    for (i, &node) in graph_nodes.iter().enumerate() {
        family
            .family_graph_mut()
            .restore_node(node, actor, fast_routes[i], hop_counts[i]);
    }

    // Removed-edge flags; edges start removed family-wide, so only live
    // ones need restoring.
    if bond_count > 0 {
        let recorded_bond_count = reader.read_u32("edge flag count")? as usize;
        if recorded_bond_count != bond_count {
            return Err(BlockError::Malformed {
                detail: format!(
                    "edge flag count {recorded_bond_count} does not match derived bond count {bond_count}"
                ),
            });
        }
        reader.skip_to_16("edge flag header padding")?;
        let flags = reader.read_bytes(bond_count, "edge flags")?;
        for (&bond, &flag) in interior_bonds.iter().zip(flags) {
            if flag == 0 {
                family.family_graph_mut().restore_edge(bond);
            }
        }
    }

    Ok(actor)
}
