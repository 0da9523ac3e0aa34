//! The support graph: compressed-sparse-row connectivity over support chunks.

use breccia_core::{is_invalid, INVALID_INDEX};

/// Connectivity between support chunks via bonds.
///
/// Vertices ("nodes") represent support chunks; node indexing is separate
/// from chunk indexing, with `chunk_indices()[node]` mapping back. Each
/// bond appears twice in the adjacency, once from each endpoint, so the
/// adjacent arrays have `2 * bond_count` entries. For node `i`, the
/// adjacency subrange is `adjacency_partition()[i] ..
/// adjacency_partition()[i + 1]`, indexing both `adjacent_node_indices()`
/// and `adjacent_bond_indices()` in parallel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupportGraph {
    chunk_indices: Vec<u32>,
    adjacency_partition: Vec<u32>,
    adjacent_node_indices: Vec<u32>,
    adjacent_bond_indices: Vec<u32>,
}

impl SupportGraph {
    /// Assemble a graph from raw CSR arrays.
    ///
    /// `adjacency_partition` must have one more entry than `chunk_indices`,
    /// must be monotonically non-decreasing, and must end at the common
    /// length of the two adjacency arrays. Asset construction produces
    /// these arrays; tests and tools may assemble them directly.
    #[must_use]
    pub fn from_parts(
        chunk_indices: Vec<u32>,
        adjacency_partition: Vec<u32>,
        adjacent_node_indices: Vec<u32>,
        adjacent_bond_indices: Vec<u32>,
    ) -> Self {
        debug_assert_eq!(adjacency_partition.len(), chunk_indices.len() + 1);
        debug_assert!(adjacency_partition.windows(2).all(|w| w[0] <= w[1]));
        debug_assert_eq!(
            *adjacency_partition.last().unwrap_or(&0) as usize,
            adjacent_node_indices.len()
        );
        debug_assert_eq!(adjacent_node_indices.len(), adjacent_bond_indices.len());
        Self {
            chunk_indices,
            adjacency_partition,
            adjacent_node_indices,
            adjacent_bond_indices,
        }
    }

    /// An empty graph (no support chunks, no bonds).
    #[must_use]
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), vec![0], Vec::new(), Vec::new())
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> u32 {
        self.chunk_indices.len() as u32
    }

    /// Chunk index represented by each node.
    #[must_use]
    pub fn chunk_indices(&self) -> &[u32] {
        &self.chunk_indices
    }

    /// Bucket boundaries into the adjacency arrays; `node_count + 1`
    /// entries, monotonically non-decreasing.
    #[must_use]
    pub fn adjacency_partition(&self) -> &[u32] {
        &self.adjacency_partition
    }

    /// Neighbor node index per adjacency entry.
    #[must_use]
    pub fn adjacent_node_indices(&self) -> &[u32] {
        &self.adjacent_node_indices
    }

    /// Connecting bond index per adjacency entry.
    #[must_use]
    pub fn adjacent_bond_indices(&self) -> &[u32] {
        &self.adjacent_bond_indices
    }

    /// Adjacency subrange of `node`, as indices into the adjacent arrays.
    #[must_use]
    pub fn adjacency_range(&self, node: u32) -> std::ops::Range<usize> {
        self.adjacency_partition[node as usize] as usize
            ..self.adjacency_partition[node as usize + 1] as usize
    }

    /// Iterate `(neighbor_node, bond)` pairs adjacent to `node`.
    pub fn adjacent(&self, node: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.adjacency_range(node)
            .map(move |adj| (self.adjacent_node_indices[adj], self.adjacent_bond_indices[adj]))
    }

    /// The bond connecting two nodes, or [`INVALID_INDEX`] if none exists.
    #[must_use]
    pub fn find_bond(&self, node0: u32, node1: u32) -> u32 {
        for adj in self.adjacency_range(node0) {
            if self.adjacent_node_indices[adj] == node1 {
                return self.adjacent_bond_indices[adj];
            }
        }
        INVALID_INDEX
    }

    /// Whether every adjacency entry `(i -> j, bond)` has a matching
    /// `(j -> i, bond)`.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        for node in 0..self.node_count() {
            for (neighbor, bond) in self.adjacent(node) {
                if is_invalid(neighbor) || neighbor >= self.node_count() {
                    return false;
                }
                if self.find_bond(neighbor, node) != bond {
                    return false;
                }
            }
        }
        true
    }

    /// Memory footprint of the graph arrays in bytes.
    #[must_use]
    pub fn memory_bytes(&self) -> usize {
        (self.chunk_indices.len()
            + self.adjacency_partition.len()
            + self.adjacent_node_indices.len()
            + self.adjacent_bond_indices.len())
            * std::mem::size_of::<u32>()
    }
}
