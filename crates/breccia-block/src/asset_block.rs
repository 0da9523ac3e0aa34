//! Asset block encode/decode.
//!
//! Region order after the 16-byte header and count table: chunks, bonds,
//! subtree leaf counts, support chunk indices, chunk-to-node map,
//! adjacency partition, adjacent node indices, adjacent bond indices.
//! Every region is 16-byte aligned.

use breccia_asset::{Asset, Bond, Chunk, SupportGraph};
use breccia_core::{align16, BlockError};

use crate::codec::{read_header, write_header, BlockReader, BlockWriter};
use crate::ASSET_BLOCK_TYPE;

/// Current asset block format version.
pub const ASSET_FORMAT_VERSION: u32 = 1;

const HEADER_SIZE: usize = 16;
/// chunk count, bond count, node count, leaf chunk count, first
/// subsupport index, padded to 16.
const COUNTS_SIZE: usize = 32;

/// Exact encoded size of an asset, in bytes.
#[must_use]
pub fn asset_block_size(asset: &Asset) -> usize {
    let chunk_count = asset.chunk_count() as usize;
    let bond_count = asset.bond_count() as usize;
    let node_count = asset.graph().node_count() as usize;
    HEADER_SIZE
        + COUNTS_SIZE
        + align16(chunk_count * 32)
        + align16(bond_count * 32)
        + align16(chunk_count * 4)
        + align16(node_count * 4)
        + align16(chunk_count * 4)
        + align16((node_count + 1) * 4)
        + align16(2 * bond_count * 4)
        + align16(2 * bond_count * 4)
}

/// Encode `asset` into `buf`; returns the bytes written.
pub fn write_asset(asset: &Asset, buf: &mut [u8]) -> Result<usize, BlockError> {
    let total = asset_block_size(asset);
    if buf.len() < total {
        return Err(BlockError::BufferTooSmall {
            needed: total,
            available: buf.len(),
        });
    }

    let mut writer = BlockWriter::new(buf);
    let size_offset = write_header(&mut writer, ASSET_BLOCK_TYPE, ASSET_FORMAT_VERSION)?;

    writer.write_u32(asset.chunk_count())?;
    writer.write_u32(asset.bond_count())?;
    writer.write_u32(asset.graph().node_count())?;
    writer.write_u32(asset.leaf_chunk_count())?;
    writer.write_u32(asset.first_subsupport_chunk_index())?;
    writer.pad_to_16()?;

    for chunk in asset.chunks() {
        for component in chunk.centroid {
            writer.write_f32(component)?;
        }
        writer.write_f32(chunk.volume)?;
        writer.write_u32(chunk.parent_chunk_index)?;
        writer.write_u32(chunk.first_child_index)?;
        writer.write_u32(chunk.child_index_stop)?;
        writer.write_u32(chunk.user_data)?;
    }
    writer.pad_to_16()?;

    for bond in asset.bonds() {
        for component in bond.normal {
            writer.write_f32(component)?;
        }
        writer.write_f32(bond.area)?;
        for component in bond.centroid {
            writer.write_f32(component)?;
        }
        writer.write_u32(bond.user_data)?;
    }
    writer.pad_to_16()?;

    for section in [
        asset.subtree_leaf_chunk_counts(),
        asset.graph().chunk_indices(),
        asset.chunk_to_graph_node_map(),
        asset.graph().adjacency_partition(),
        asset.graph().adjacent_node_indices(),
        asset.graph().adjacent_bond_indices(),
    ] {
        for &value in section {
            writer.write_u32(value)?;
        }
        writer.pad_to_16()?;
    }

    let written = writer.position();
    debug_assert_eq!(written, total);
    writer.patch_u32(size_offset, written as u32);
    Ok(written)
}

/// Decode an asset block.
pub fn read_asset(buf: &[u8]) -> Result<Asset, BlockError> {
    let mut reader = BlockReader::new(buf);
    let recorded_size = read_header(&mut reader, ASSET_BLOCK_TYPE, ASSET_FORMAT_VERSION)?;
    if (recorded_size as usize) > buf.len() {
        return Err(BlockError::Malformed {
            detail: format!(
                "recorded size {recorded_size} exceeds buffer length {}",
                buf.len()
            ),
        });
    }

    let chunk_count = reader.read_u32("chunk count")? as usize;
    let bond_count = reader.read_u32("bond count")? as usize;
    let node_count = reader.read_u32("node count")? as usize;
    let leaf_chunk_count = reader.read_u32("leaf chunk count")?;
    let first_subsupport_chunk_index = reader.read_u32("first subsupport index")?;
    reader.skip_to_16("count padding")?;

    let mut chunks = Vec::with_capacity(chunk_count);
    for _ in 0..chunk_count {
        let centroid = [
            reader.read_f32("chunk centroid")?,
            reader.read_f32("chunk centroid")?,
            reader.read_f32("chunk centroid")?,
        ];
        chunks.push(Chunk {
            centroid,
            volume: reader.read_f32("chunk volume")?,
            parent_chunk_index: reader.read_u32("chunk parent")?,
            first_child_index: reader.read_u32("chunk first child")?,
            child_index_stop: reader.read_u32("chunk child stop")?,
            user_data: reader.read_u32("chunk user data")?,
        });
    }
    reader.skip_to_16("chunk padding")?;

    let mut bonds = Vec::with_capacity(bond_count);
    for _ in 0..bond_count {
        let normal = [
            reader.read_f32("bond normal")?,
            reader.read_f32("bond normal")?,
            reader.read_f32("bond normal")?,
        ];
        let area = reader.read_f32("bond area")?;
        let centroid = [
            reader.read_f32("bond centroid")?,
            reader.read_f32("bond centroid")?,
            reader.read_f32("bond centroid")?,
        ];
        bonds.push(Bond {
            normal,
            area,
            centroid,
            user_data: reader.read_u32("bond user data")?,
        });
    }
    reader.skip_to_16("bond padding")?;

    let mut read_u32_section = |count: usize, what: &str| -> Result<Vec<u32>, BlockError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(reader.read_u32(what)?);
        }
        reader.skip_to_16(what)?;
        Ok(values)
    };

    let subtree_leaf_chunk_counts = read_u32_section(chunk_count, "subtree leaf counts")?;
    let support_chunk_indices = read_u32_section(node_count, "support chunk indices")?;
    let chunk_to_graph_node_map = read_u32_section(chunk_count, "chunk to node map")?;
    let adjacency_partition = read_u32_section(node_count + 1, "adjacency partition")?;
    let adjacent_node_indices = read_u32_section(2 * bond_count, "adjacent node indices")?;
    let adjacent_bond_indices = read_u32_section(2 * bond_count, "adjacent bond indices")?;

    if adjacency_partition.last().copied().unwrap_or(0) as usize != 2 * bond_count {
        return Err(BlockError::Malformed {
            detail: "adjacency partition does not cover the adjacency arrays".into(),
        });
    }

    let graph = SupportGraph::from_parts(
        support_chunk_indices,
        adjacency_partition,
        adjacent_node_indices,
        adjacent_bond_indices,
    );

    Ok(Asset::from_parts(
        chunks,
        bonds,
        graph,
        leaf_chunk_count,
        first_subsupport_chunk_index,
        subtree_leaf_chunk_counts,
        chunk_to_graph_node_map,
    ))
}
