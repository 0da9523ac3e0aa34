//! Test fixtures for Breccia development.
//!
//! Reference support graphs, descriptor builders for common hierarchies,
//! and a from-scratch union-find connectivity used to cross-check the
//! incremental island tracker.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use breccia_asset::{AssetDesc, Bond, BondDesc, ChunkDesc, SupportGraph};

/// Build a support graph from an adjacency-list description, assigning a
/// shared bond index to each symmetric pair of entries. Returns the graph
/// and its bond count.
pub fn support_graph_from_adjacency(
    adjacency_partition: &[u32],
    adjacent_node_indices: &[u32],
) -> (SupportGraph, u32) {
    let node_count = adjacency_partition.len() - 1;
    let entry_count = adjacent_node_indices.len();
    let mut adjacent_bond_indices = vec![u32::MAX; entry_count];
    let mut bond_count = 0u32;
    for node0 in 0..node_count as u32 {
        for i in adjacency_partition[node0 as usize] as usize
            ..adjacency_partition[node0 as usize + 1] as usize
        {
            if adjacent_bond_indices[i] != u32::MAX {
                continue;
            }
            adjacent_bond_indices[i] = bond_count;
            let node1 = adjacent_node_indices[i];
            for j in adjacency_partition[node1 as usize] as usize
                ..adjacency_partition[node1 as usize + 1] as usize
            {
                if adjacent_node_indices[j] == node0 {
                    adjacent_bond_indices[j] = bond_count;
                }
            }
            bond_count += 1;
        }
    }
    let graph = SupportGraph::from_parts(
        (0..node_count as u32).collect(),
        adjacency_partition.to_vec(),
        adjacent_node_indices.to_vec(),
        adjacent_bond_indices,
    );
    (graph, bond_count)
}

/// Ladder of eight nodes:
///
/// ```text
/// 0 -- 1 -- 2 -- 3
/// |    |    |    |
/// 4 -- 5    6 -- 7
/// ```
pub fn ladder8() -> (SupportGraph, u32) {
    let partition = [0u32, 2, 5, 8, 10, 12, 14, 16, 18];
    let indices = [
        1, 4, // 0
        0, 2, 5, // 1
        1, 3, 6, // 2
        2, 7, // 3
        0, 5, // 4
        1, 4, // 5
        2, 7, // 6
        3, 6, // 7
    ];
    support_graph_from_adjacency(&partition, &indices)
}

/// Three-by-four grid of twelve nodes:
///
/// ```text
/// 0 -- 1 -- 2 -- 3
/// |    |    |    |
/// 4 -- 5 -- 6 -- 7
/// |    |    |    |
/// 8 -- 9 -- 10-- 11
/// ```
pub fn grid12() -> (SupportGraph, u32) {
    let partition = [0u32, 2, 5, 8, 10, 13, 17, 21, 24, 26, 29, 32, 34];
    let indices = [
        1, 4, // 0
        0, 2, 5, // 1
        1, 3, 6, // 2
        2, 7, // 3
        0, 5, 8, // 4
        1, 4, 6, 9, // 5
        2, 5, 7, 10, // 6
        3, 6, 11, // 7
        4, 9, // 8
        5, 8, 10, // 9
        6, 9, 11, // 10
        7, 10, // 11
    ];
    support_graph_from_adjacency(&partition, &indices)
}

/// A bond descriptor with placeholder geometry.
pub fn test_bond(chunk0: u32, chunk1: u32) -> BondDesc {
    BondDesc {
        bond: Bond {
            normal: [1.0, 0.0, 0.0],
            area: 1.0,
            centroid: [0.0; 3],
            user_data: chunk0 * 100 + chunk1,
        },
        chunk_indices: [chunk0, chunk1],
    }
}

/// Scenario fixture: one support root with two leaf children and no bonds.
pub fn linear3() -> Vec<ChunkDesc> {
    vec![
        ChunkDesc::root(true),
        ChunkDesc::child(0, false),
        ChunkDesc::child(0, false),
    ]
}

/// Scenario fixture: two bonded support roots, each with two subsupport
/// leaf children.
pub fn bonded_pair() -> (Vec<ChunkDesc>, Vec<BondDesc>) {
    let chunks = vec![
        ChunkDesc::root(true),
        ChunkDesc::root(true),
        ChunkDesc::child(0, false),
        ChunkDesc::child(0, false),
        ChunkDesc::child(1, false),
        ChunkDesc::child(1, false),
    ];
    let bonds = vec![test_bond(0, 1)];
    (chunks, bonds)
}

/// Scenario fixture: an unflagged root with `leaf_count` leaf children.
pub fn unsupported_fan(leaf_count: u32) -> Vec<ChunkDesc> {
    let mut chunks = vec![ChunkDesc::root(false)];
    chunks.extend((0..leaf_count).map(|_| ChunkDesc::child(0, false)));
    chunks
}

/// A 2x2 grid of bonded support chunks under a common root, each with two
/// subsupport leaves. Rich enough to exercise splits, visibility, and
/// serialization together.
pub fn quad_with_leaves() -> (Vec<ChunkDesc>, Vec<BondDesc>) {
    let mut chunks = vec![ChunkDesc::root(false)];
    chunks.extend((0..4).map(|_| ChunkDesc::child(0, true)));
    for support in 1..=4u32 {
        chunks.push(ChunkDesc::child(support, false));
        chunks.push(ChunkDesc::child(support, false));
    }
    // Ring of bonds: 1-2, 2-3, 3-4, 4-1 (chunk indices).
    let bonds = vec![
        test_bond(1, 2),
        test_bond(2, 3),
        test_bond(3, 4),
        test_bond(1, 4),
    ];
    (chunks, bonds)
}

/// Build an [`AssetDesc`] view over fixture vectors.
pub fn desc<'a>(chunks: &'a [ChunkDesc], bonds: &'a [BondDesc]) -> AssetDesc<'a> {
    AssetDesc {
        chunk_descs: chunks,
        bond_descs: bonds,
    }
}

/// From-scratch connected components over live edges, for differential
/// testing against the incremental tracker. Components are sorted by
/// their smallest node, nodes sorted within each.
pub fn reference_components(
    graph: &SupportGraph,
    edge_removed: impl Fn(u32) -> bool,
) -> Vec<Vec<u32>> {
    let node_count = graph.node_count() as usize;
    let mut parent: Vec<u32> = (0..node_count as u32).collect();

    fn find(parent: &mut [u32], node: u32) -> u32 {
        let mut root = node;
        while parent[root as usize] != root {
            root = parent[root as usize];
        }
        let mut walk = node;
        while parent[walk as usize] != root {
            let next = parent[walk as usize];
            parent[walk as usize] = root;
            walk = next;
        }
        root
    }

    for node in 0..node_count as u32 {
        for (neighbor, bond) in graph.adjacent(node) {
            if edge_removed(bond) {
                continue;
            }
            let root0 = find(&mut parent, node);
            let root1 = find(&mut parent, neighbor);
            if root0 != root1 {
                parent[root1 as usize] = root0;
            }
        }
    }

    let mut components: Vec<Vec<u32>> = Vec::new();
    let mut component_of_root = vec![usize::MAX; node_count];
    for node in 0..node_count as u32 {
        let root = find(&mut parent, node) as usize;
        if component_of_root[root] == usize::MAX {
            component_of_root[root] = components.len();
            components.push(Vec::new());
        }
        components[component_of_root[root]].push(node);
    }
    components
}
