//! Immutable asset construction.

use indexmap::IndexMap;
use smallvec::SmallVec;

use breccia_core::{
    create_index_start_lookup, is_invalid, AssetBuildError, INVALID_INDEX,
};

use crate::coverage::ensure_exact_support_coverage;
use crate::desc::AssetDesc;
use crate::graph::SupportGraph;
use crate::hierarchy::{enumerate_breadth_first, DepthFirstIter};
use crate::order::test_for_valid_chunk_order;

/// One chunk of a built asset.
///
/// Children are contiguous: `first_child_index .. child_index_stop`. A
/// leaf has an empty (invalid) child range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chunk {
    /// Central position of the chunk's volume.
    pub centroid: [f32; 3],
    /// Volume of the chunk.
    pub volume: f32,
    /// Parent chunk index, or invalid for a root.
    pub parent_chunk_index: u32,
    /// First child chunk index.
    pub first_child_index: u32,
    /// One past the last child chunk index.
    pub child_index_stop: u32,
    /// Opaque user value from the descriptor.
    pub user_data: u32,
}

impl Chunk {
    /// Number of children.
    #[must_use]
    pub fn child_count(&self) -> u32 {
        if self.child_index_stop > self.first_child_index {
            self.child_index_stop - self.first_child_index
        } else {
            0
        }
    }
}

/// The breakable interface between two support chunks.
///
/// At most one bond exists per chunk pair. The normal points from the
/// lower-indexed chunk toward the higher-indexed one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bond {
    /// Average interface normal.
    pub normal: [f32; 3],
    /// Interface area.
    pub area: f32,
    /// Central position on the interface.
    pub centroid: [f32; 3],
    /// Opaque user value from the descriptor.
    pub user_data: u32,
}

/// Immutable fracture-hierarchy description.
///
/// Built once by [`Asset::build`] and shared read-only by every family
/// spawned from it; an asset must outlive all of its families (enforced by
/// the `Arc` handed to `Family::new`).
#[derive(Clone, Debug)]
pub struct Asset {
    chunks: Vec<Chunk>,
    bonds: Vec<Bond>,
    graph: SupportGraph,
    leaf_chunk_count: u32,
    first_subsupport_chunk_index: u32,
    subtree_leaf_chunk_counts: Vec<u32>,
    chunk_to_graph_node_map: Vec<u32>,
}

/// Two-pointer walk up the parent chain looking for a cycle.
fn test_for_loop(parents: &[u32], start: usize) -> bool {
    let mut index1 = parents[start];
    if is_invalid(index1) {
        return false;
    }
    let mut index2 = parents[index1 as usize];
    if is_invalid(index2) {
        return false;
    }
    loop {
        // Advance index1 once; index2 runs ahead and reaches any chain end
        // first, so index1 never steps off the chain.
        index1 = parents[index1 as usize];

        index2 = parents[index2 as usize];
        if index2 == index1 {
            return true;
        }
        if is_invalid(index2) {
            return false;
        }
        index2 = parents[index2 as usize];
        if index2 == index1 {
            return true;
        }
        if is_invalid(index2) {
            return false;
        }
    }
}

/// Chunk-pair entry used to sort and symmetrize the bond list.
#[derive(Clone, Copy)]
struct BondSortEntry {
    node0: u32,
    node1: u32,
    desc_index: u32,
}

impl Asset {
    /// Build an asset from a descriptor.
    ///
    /// Support coverage is enforced on an internal copy of the chunk
    /// descriptors (repairs log at info level; the caller's descriptor is
    /// not modified). Chunk order must already be valid — on
    /// [`AssetBuildError::InvalidChunkOrder`], repair the descriptor with
    /// [`build_chunk_reorder_map`](crate::build_chunk_reorder_map) and
    /// retry. Invalid, duplicate, and non-support bonds are dropped with a
    /// warning rather than failing the build.
    pub fn build(desc: &AssetDesc<'_>) -> Result<Self, AssetBuildError> {
        let chunk_count = desc.chunk_descs.len();
        if chunk_count == 0 {
            log::error!("asset build: descriptor has no chunks");
            return Err(AssetBuildError::NoChunks);
        }

        // The hierarchy must be a forest before anything walks it.
        let parents: Vec<u32> = desc
            .chunk_descs
            .iter()
            .map(|c| c.parent_chunk_index)
            .collect();
        for (i, &parent) in parents.iter().enumerate() {
            if !is_invalid(parent) && parent as usize >= chunk_count {
                log::error!("asset build: chunk {i} parent {parent} out of range");
                return Err(AssetBuildError::ParentOutOfRange {
                    chunk: i as u32,
                    parent,
                });
            }
        }
        for i in 0..chunk_count {
            if test_for_loop(&parents, i) {
                log::error!("asset build: parent chain loop at chunk {i}");
                return Err(AssetBuildError::HierarchyLoop { chunk: i as u32 });
            }
        }

        let mut chunk_descs = desc.chunk_descs.to_vec();
        let coverage = ensure_exact_support_coverage(&mut chunk_descs, false);

        if !test_for_valid_chunk_order(&chunk_descs, &coverage.annotations) {
            log::error!(
                "asset build: invalid chunk order; apply build_chunk_reorder_map to the descriptor first"
            );
            return Err(AssetBuildError::InvalidChunkOrder);
        }

        let first_subsupport_chunk_index = coverage
            .annotations
            .iter()
            .position(|a| !a.is_upper_support())
            .unwrap_or(chunk_count) as u32;

        // Map chunk index to graph node index; node order follows chunk
        // order over the support chunks.
        let mut chunk_to_graph_node_map = vec![INVALID_INDEX; chunk_count];
        let mut node_count = 0u32;
        for (i, ann) in coverage.annotations.iter().enumerate() {
            if ann.is_support() {
                chunk_to_graph_node_map[i] = node_count;
                node_count += 1;
            }
        }
        debug_assert_eq!(node_count, coverage.support_chunk_count);

        // Sanitize bonds: drop invalid and duplicate entries, then
        // symmetrize the survivors into the CSR adjacency.
        let mut invalid_found = false;
        let mut non_support_found = false;
        let mut duplicate_found = false;
        let mut unique_bonds: IndexMap<(u32, u32), u32> = IndexMap::new();
        for (i, bond_desc) in desc.bond_descs.iter().enumerate() {
            let [chunk0, chunk1] = bond_desc.chunk_indices;
            if chunk0 as usize >= chunk_count || chunk1 as usize >= chunk_count || chunk0 == chunk1
            {
                invalid_found = true;
                continue;
            }
            let node0 = chunk_to_graph_node_map[chunk0 as usize];
            let node1 = chunk_to_graph_node_map[chunk1 as usize];
            if is_invalid(node0) || is_invalid(node1) {
                non_support_found = true;
                continue;
            }
            let key = (node0.min(node1), node0.max(node1));
            if unique_bonds.contains_key(&key) {
                duplicate_found = true;
            } else {
                unique_bonds.insert(key, i as u32);
            }
        }
        if invalid_found {
            log::warn!("asset build: invalid bonds (missing or identical chunks) dropped");
        }
        if duplicate_found {
            log::warn!("asset build: duplicate bonds dropped");
        }
        if non_support_found {
            log::warn!("asset build: bonds referencing non-support chunks dropped");
        }

        let bond_count = unique_bonds.len();
        let mut sort_entries: Vec<BondSortEntry> = Vec::with_capacity(2 * bond_count);
        for (&(node0, node1), &desc_index) in &unique_bonds {
            sort_entries.push(BondSortEntry {
                node0,
                node1,
                desc_index,
            });
            sort_entries.push(BondSortEntry {
                node0: node1,
                node1: node0,
                desc_index,
            });
        }
        sort_entries.sort_by_key(|e| (e.node0, e.node1));

        let mut adjacency_partition = vec![0u32; node_count as usize + 1];
        let mut adjacent_node_indices = vec![0u32; 2 * bond_count];
        let mut adjacent_bond_indices = vec![0u32; 2 * bond_count];
        let mut bonds = Vec::with_capacity(bond_count);
        if bond_count > 0 {
            let keys: Vec<u32> = sort_entries.iter().map(|e| e.node0).collect();
            create_index_start_lookup(&mut adjacency_partition, 0, node_count - 1, &keys);

            let mut bond_remap = vec![INVALID_INDEX; desc.bond_descs.len()];
            for (pos, entry) in sort_entries.iter().enumerate() {
                adjacent_node_indices[pos] = entry.node1;
                let desc_index = entry.desc_index as usize;
                if is_invalid(bond_remap[desc_index]) {
                    let bond_desc = &desc.bond_descs[desc_index];
                    let mut bond = bond_desc.bond;
                    // The normal points from the lower-indexed chunk toward
                    // the higher; flip it if the node renumbering inverted
                    // the endpoint order.
                    let node_order = entry.node0 < entry.node1;
                    let desc_order = bond_desc.chunk_indices[0] < bond_desc.chunk_indices[1];
                    if desc_order && !node_order {
                        for component in &mut bond.normal {
                            *component = -*component;
                        }
                    }
                    bond_remap[desc_index] = bonds.len() as u32;
                    bonds.push(bond);
                }
                adjacent_bond_indices[pos] = bond_remap[desc_index];
            }
        }

        let support_chunk_indices: Vec<u32> = (0..chunk_count as u32)
            .filter(|&i| !is_invalid(chunk_to_graph_node_map[i as usize]))
            .collect();
        let graph = SupportGraph::from_parts(
            support_chunk_indices,
            adjacency_partition,
            adjacent_node_indices,
            adjacent_bond_indices,
        );

        // Chunks, with child ranges from the (validated) parent grouping.
        let mut chunks: Vec<Chunk> = chunk_descs
            .iter()
            .map(|cd| Chunk {
                centroid: cd.centroid,
                volume: cd.volume,
                parent_chunk_index: cd.parent_chunk_index,
                first_child_index: INVALID_INDEX,
                child_index_stop: INVALID_INDEX,
                user_data: cd.user_data,
            })
            .collect();
        for i in 0..chunk_count {
            let parent = chunks[i].parent_chunk_index;
            if !is_invalid(parent) {
                let parent = &mut chunks[parent as usize];
                if parent.child_index_stop == parent.first_child_index {
                    parent.first_child_index = i as u32;
                    parent.child_index_stop = i as u32;
                }
                parent.child_index_stop += 1;
            }
        }

        // Subtree leaf counts, accumulated bottom-up through a reversed
        // breadth-first enumeration of each root's subtree.
        let mut subtree_leaf_chunk_counts = vec![0u32; chunk_count];
        let roots: SmallVec<[u32; 4]> = (0..chunk_count as u32)
            .take_while(|&i| is_invalid(chunks[i as usize].parent_chunk_index))
            .collect();
        let mut breadth_first = Vec::with_capacity(chunk_count);
        for &root in &roots {
            breadth_first.clear();
            enumerate_breadth_first(&chunks, root, false, &mut breadth_first);
            for &chunk_index in breadth_first.iter().rev() {
                let chunk = &chunks[chunk_index as usize];
                if chunk.child_count() == 0 {
                    subtree_leaf_chunk_counts[chunk_index as usize] = 1;
                }
                let subtree_leaves = subtree_leaf_chunk_counts[chunk_index as usize];
                subtree_leaf_chunk_counts[chunk.parent_chunk_index as usize] += subtree_leaves;
            }
            if chunks[root as usize].child_count() == 0 {
                subtree_leaf_chunk_counts[root as usize] = 1;
            }
        }

        Ok(Self {
            chunks,
            bonds,
            graph,
            leaf_chunk_count: coverage.leaf_chunk_count,
            first_subsupport_chunk_index,
            subtree_leaf_chunk_counts,
            chunk_to_graph_node_map,
        })
    }

    /// Assemble an asset directly from its parts. Used by block decoding;
    /// the parts must already satisfy the construction invariants.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_parts(
        chunks: Vec<Chunk>,
        bonds: Vec<Bond>,
        graph: SupportGraph,
        leaf_chunk_count: u32,
        first_subsupport_chunk_index: u32,
        subtree_leaf_chunk_counts: Vec<u32>,
        chunk_to_graph_node_map: Vec<u32>,
    ) -> Self {
        Self {
            chunks,
            bonds,
            graph,
            leaf_chunk_count,
            first_subsupport_chunk_index,
            subtree_leaf_chunk_counts,
            chunk_to_graph_node_map,
        }
    }

    /// The chunk array.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The bond array.
    #[must_use]
    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// The support graph.
    #[must_use]
    pub fn graph(&self) -> &SupportGraph {
        &self.graph
    }

    /// Number of chunks.
    #[must_use]
    pub fn chunk_count(&self) -> u32 {
        self.chunks.len() as u32
    }

    /// Number of bonds.
    #[must_use]
    pub fn bond_count(&self) -> u32 {
        self.bonds.len() as u32
    }

    /// Number of leaf chunks in the hierarchy.
    #[must_use]
    pub fn leaf_chunk_count(&self) -> u32 {
        self.leaf_chunk_count
    }

    /// Index of the first subsupport chunk (== the chunk count when there
    /// are none).
    #[must_use]
    pub fn first_subsupport_chunk_index(&self) -> u32 {
        self.first_subsupport_chunk_index
    }

    /// Number of chunks at or above the support level.
    #[must_use]
    pub fn upper_support_chunk_count(&self) -> u32 {
        self.first_subsupport_chunk_index
    }

    /// Number of chunks strictly below the support level.
    #[must_use]
    pub fn subsupport_chunk_count(&self) -> u32 {
        self.chunk_count() - self.first_subsupport_chunk_index
    }

    /// Number of support chunks plus subsupport chunks. This is also the
    /// family actor-pool size: graph actors occupy the first
    /// `node_count` slots, single-subsupport-chunk actors the rest.
    #[must_use]
    pub fn lower_support_chunk_count(&self) -> u32 {
        self.graph.node_count() + self.subsupport_chunk_count()
    }

    /// Per-chunk count of leaves in the chunk's subtree.
    #[must_use]
    pub fn subtree_leaf_chunk_counts(&self) -> &[u32] {
        &self.subtree_leaf_chunk_counts
    }

    /// Chunk index to graph node index map; invalid for non-support chunks.
    #[must_use]
    pub fn chunk_to_graph_node_map(&self) -> &[u32] {
        &self.chunk_to_graph_node_map
    }

    /// Index of `chunk` within the family's contiguous lower-support
    /// health array: support chunks map to their graph node index,
    /// subsupport chunks follow, and upper non-support chunks have none.
    #[must_use]
    pub fn contiguous_lower_support_index(&self, chunk: u32) -> u32 {
        let node = self.chunk_to_graph_node_map[chunk as usize];
        if !is_invalid(node) {
            node
        } else if chunk >= self.first_subsupport_chunk_index {
            self.graph.node_count() + chunk - self.first_subsupport_chunk_index
        } else {
            INVALID_INDEX
        }
    }

    /// Depth-first iterator over the subtree rooted at `start`.
    #[must_use]
    pub fn depth_first(&self, start: u32) -> DepthFirstIter<'_> {
        DepthFirstIter::new(&self.chunks, start)
    }

    /// Depth-first iterator restricted to upper-support chunks.
    #[must_use]
    pub fn depth_first_upper_support(&self, start: u32) -> DepthFirstIter<'_> {
        DepthFirstIter::with_limit(&self.chunks, start, self.first_subsupport_chunk_index)
    }

    /// Memory footprint of the asset arrays in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        self.chunks.len() * std::mem::size_of::<Chunk>()
            + self.bonds.len() * std::mem::size_of::<Bond>()
            + self.graph.memory_bytes()
            + (self.subtree_leaf_chunk_counts.len() + self.chunk_to_graph_node_map.len())
                * std::mem::size_of::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{BondDesc, ChunkDesc};

    fn bond_between(chunk0: u32, chunk1: u32) -> BondDesc {
        BondDesc {
            bond: Bond {
                normal: [0.0, 0.0, 1.0],
                area: 1.0,
                centroid: [0.0; 3],
                user_data: 0,
            },
            chunk_indices: [chunk0, chunk1],
        }
    }

    #[test]
    fn empty_descriptor_is_rejected() {
        let desc = AssetDesc {
            chunk_descs: &[],
            bond_descs: &[],
        };
        assert!(matches!(Asset::build(&desc), Err(AssetBuildError::NoChunks)));
    }

    #[test]
    fn parent_cycle_is_rejected() {
        // 0 -> 1 -> 2 -> 0
        let chunks = [
            ChunkDesc::child(2, true),
            ChunkDesc::child(0, false),
            ChunkDesc::child(1, false),
        ];
        let desc = AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &[],
        };
        assert!(matches!(
            Asset::build(&desc),
            Err(AssetBuildError::HierarchyLoop { .. })
        ));
    }

    #[test]
    fn out_of_range_parent_is_rejected() {
        let chunks = [ChunkDesc::root(true), ChunkDesc::child(9, false)];
        let desc = AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &[],
        };
        assert!(matches!(
            Asset::build(&desc),
            Err(AssetBuildError::ParentOutOfRange { chunk: 1, parent: 9 })
        ));
    }

    #[test]
    fn two_bonded_roots_build_a_two_node_graph() {
        let chunks = [ChunkDesc::root(true), ChunkDesc::root(true)];
        let bonds = [bond_between(0, 1)];
        let asset = Asset::build(&AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &bonds,
        })
        .unwrap();

        assert_eq!(asset.chunk_count(), 2);
        assert_eq!(asset.bond_count(), 1);
        assert_eq!(asset.graph().node_count(), 2);
        assert_eq!(asset.graph().find_bond(0, 1), 0);
        assert_eq!(asset.graph().find_bond(1, 0), 0);
        assert!(asset.graph().is_symmetric());
        assert_eq!(asset.leaf_chunk_count(), 2);
        assert_eq!(asset.first_subsupport_chunk_index(), 2);
    }

    #[test]
    fn duplicate_and_self_bonds_are_dropped() {
        let chunks = [ChunkDesc::root(true), ChunkDesc::root(true)];
        let bonds = [
            bond_between(0, 1),
            bond_between(1, 0), // duplicate of the same undirected bond
            bond_between(0, 0), // self bond
            bond_between(0, 7), // out of range
        ];
        let asset = Asset::build(&AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &bonds,
        })
        .unwrap();
        assert_eq!(asset.bond_count(), 1);
        assert!(asset.graph().is_symmetric());
    }

    #[test]
    fn bonds_to_non_support_chunks_are_dropped() {
        // Chunk 2 is a subsupport leaf below support chunk 1.
        let chunks = [
            ChunkDesc::root(true),
            ChunkDesc::root(true),
            ChunkDesc::child(1, false),
        ];
        let bonds = [bond_between(0, 1), bond_between(0, 2)];
        let asset = Asset::build(&AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &bonds,
        })
        .unwrap();
        assert_eq!(asset.bond_count(), 1);
    }

    #[test]
    fn subtree_leaf_counts_accumulate() {
        // root(support) with children 1, 2; 1 has children 3, 4.
        let chunks = [
            ChunkDesc::root(true),
            ChunkDesc::child(0, false),
            ChunkDesc::child(0, false),
            ChunkDesc::child(1, false),
            ChunkDesc::child(1, false),
        ];
        let asset = Asset::build(&AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &[],
        })
        .unwrap();
        assert_eq!(asset.subtree_leaf_chunk_counts(), &[3, 2, 1, 1, 1]);
        assert_eq!(asset.leaf_chunk_count(), 3);
        assert_eq!(asset.chunks()[0].child_count(), 2);
        assert_eq!(asset.chunks()[1].first_child_index, 3);
        assert_eq!(asset.chunks()[1].child_index_stop, 5);
    }

    #[test]
    fn uncovered_hierarchy_gets_root_support() {
        // Scenario: no support flags anywhere; the root is promoted and
        // counts all leaves beneath it.
        let chunks = [
            ChunkDesc::root(false),
            ChunkDesc::child(0, false),
            ChunkDesc::child(0, false),
            ChunkDesc::child(0, false),
        ];
        let asset = Asset::build(&AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &[],
        })
        .unwrap();
        assert_eq!(asset.graph().node_count(), 1);
        assert_eq!(asset.graph().chunk_indices(), &[0]);
        assert_eq!(asset.subtree_leaf_chunk_counts()[0], 3);
        assert_eq!(asset.leaf_chunk_count(), 3);
    }

    #[test]
    fn single_chunk_asset() {
        let chunks = [ChunkDesc::root(true)];
        let asset = Asset::build(&AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &[],
        })
        .unwrap();
        assert_eq!(asset.graph().node_count(), 1);
        assert_eq!(asset.leaf_chunk_count(), 1);
        assert_eq!(asset.subtree_leaf_chunk_counts(), &[1]);
        assert_eq!(asset.lower_support_chunk_count(), 1);
    }

    #[test]
    fn contiguous_lower_support_indexing() {
        // root (not support) -> support chunks 1, 2 -> subsupport 3, 4
        // under chunk 1.
        let chunks = [
            ChunkDesc::root(false),
            ChunkDesc::child(0, true),
            ChunkDesc::child(0, true),
            ChunkDesc::child(1, false),
            ChunkDesc::child(1, false),
        ];
        let asset = Asset::build(&AssetDesc {
            chunk_descs: &chunks,
            bond_descs: &[],
        })
        .unwrap();
        assert_eq!(asset.first_subsupport_chunk_index(), 3);
        assert!(is_invalid(asset.contiguous_lower_support_index(0)));
        assert_eq!(asset.contiguous_lower_support_index(1), 0);
        assert_eq!(asset.contiguous_lower_support_index(2), 1);
        assert_eq!(asset.contiguous_lower_support_index(3), 2);
        assert_eq!(asset.contiguous_lower_support_index(4), 3);
        assert_eq!(asset.lower_support_chunk_count(), 4);
    }
}
