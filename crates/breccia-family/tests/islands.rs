//! Island tracking over the reference graphs, including a differential
//! check against from-scratch connected components.

use std::collections::BTreeSet;

use breccia_core::is_invalid;
use breccia_family::{FamilyGraph, IslandScratch};
use breccia_test_utils::{grid12, ladder8, reference_components, support_graph_from_adjacency};
use proptest::prelude::*;

/// Group nodes by island id; islands sorted by (size, first node), nodes
/// ascending within each. Panics on unresolved nodes.
fn islands_info(family_graph: &FamilyGraph) -> Vec<Vec<u32>> {
    let mut islands: Vec<Vec<u32>> = Vec::new();
    let mut roots: Vec<u32> = Vec::new();
    for (node, &id) in family_graph.island_ids().iter().enumerate() {
        assert!(!is_invalid(id), "node {node} has no island");
        match roots.iter().position(|&r| r == id) {
            Some(slot) => islands[slot].push(node as u32),
            None => {
                roots.push(id);
                islands.push(vec![node as u32]);
            }
        }
    }
    for island in &mut islands {
        island.sort_unstable();
    }
    islands.sort_by_key(|island| (island.len(), island[0]));
    islands
}

const ACTOR: u32 = 0;

#[test]
fn ladder_splits_after_cut_across() {
    let (graph, bond_count) = ladder8();
    let mut family_graph = FamilyGraph::new(graph.node_count(), bond_count);
    let mut scratch = IslandScratch::new(graph.node_count());
    family_graph.initialize(ACTOR);

    assert_eq!(family_graph.edge_count(&graph), 9);
    assert!(family_graph.notify_edge_removed(ACTOR, 0, 4, &graph));
    assert_eq!(family_graph.edge_count(&graph), 8);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 1);

    family_graph.notify_edge_removed(ACTOR, 1, 2, &graph);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 1);

    let info = islands_info(&family_graph);
    assert_eq!(info.len(), 2);
    assert_eq!(info[0], vec![0, 1, 4, 5]);
    assert_eq!(info[1], vec![2, 3, 6, 7]);
}

#[test]
fn ladder_isolates_a_corner_node() {
    let (graph, bond_count) = ladder8();
    let mut family_graph = FamilyGraph::new(graph.node_count(), bond_count);
    let mut scratch = IslandScratch::new(graph.node_count());
    family_graph.initialize(ACTOR);

    family_graph.notify_edge_removed(ACTOR, 0, 4, &graph);
    family_graph.notify_edge_removed(ACTOR, 4, 5, &graph);
    family_graph.notify_edge_removed(ACTOR, 1, 2, &graph);
    assert_eq!(family_graph.edge_count(&graph), 6);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 3);

    let info = islands_info(&family_graph);
    assert_eq!(info.len(), 3);
    assert_eq!(info[0], vec![4]);
    assert_eq!(info[1], vec![0, 1, 5]);
    assert_eq!(info[2], vec![2, 3, 6, 7]);
}

#[test]
fn ladder_tracks_dirty_nodes_per_actor() {
    const ACTOR_0: u32 = 5;
    const ACTOR_1: u32 = 2;

    let (graph, bond_count) = ladder8();
    let mut family_graph = FamilyGraph::new(graph.node_count(), bond_count);
    let mut scratch = IslandScratch::new(graph.node_count());
    family_graph.initialize(ACTOR_0);

    // Actor 1 has nothing dirty yet; actor 0 resolves the whole graph.
    assert_eq!(family_graph.find_islands(ACTOR_1, &mut scratch, &graph), 0);
    assert_eq!(family_graph.find_islands(ACTOR_0, &mut scratch, &graph), 1);

    family_graph.notify_edge_removed(ACTOR_0, 2, 1, &graph);
    assert_eq!(family_graph.edge_count(&graph), 8);
    assert_eq!(family_graph.find_islands(ACTOR_0, &mut scratch, &graph), 1);

    family_graph.notify_edge_removed(ACTOR_1, 2, 6, &graph);
    family_graph.notify_edge_removed(ACTOR_1, 7, 3, &graph);
    assert_eq!(family_graph.find_islands(ACTOR_1, &mut scratch, &graph), 1);

    family_graph.notify_edge_removed(ACTOR_0, 0, 1, &graph);
    family_graph.notify_edge_removed(ACTOR_0, 4, 5, &graph);
    assert_eq!(family_graph.find_islands(ACTOR_0, &mut scratch, &graph), 1);

    let info = islands_info(&family_graph);
    assert_eq!(info.len(), 4);
    assert_eq!(info[0], vec![0, 4]);
    assert_eq!(info[1], vec![1, 5]);
    assert_eq!(info[2], vec![2, 3]);
    assert_eq!(info[3], vec![6, 7]);
}

#[test]
fn grid_resolves_batched_removals() {
    let (graph, bond_count) = grid12();
    let mut family_graph = FamilyGraph::new(graph.node_count(), bond_count);
    let mut scratch = IslandScratch::new(graph.node_count());
    family_graph.initialize(ACTOR);

    family_graph.notify_edge_removed(ACTOR, 0, 4, &graph);
    family_graph.notify_edge_removed(ACTOR, 1, 5, &graph);
    family_graph.notify_edge_removed(ACTOR, 2, 6, &graph);
    family_graph.notify_edge_removed(ACTOR, 3, 7, &graph);
    family_graph.notify_edge_removed(ACTOR, 5, 6, &graph);
    family_graph.notify_edge_removed(ACTOR, 9, 10, &graph);
    assert_eq!(family_graph.edge_count(&graph), 11);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 3);

    let info = islands_info(&family_graph);
    assert_eq!(info.len(), 3);
    assert_eq!(info[0], vec![0, 1, 2, 3]);
    assert_eq!(info[1], vec![4, 5, 8, 9]);
    assert_eq!(info[2], vec![6, 7, 10, 11]);
}

#[test]
fn grid_resolves_incremental_removals() {
    let (graph, bond_count) = grid12();
    let mut family_graph = FamilyGraph::new(graph.node_count(), bond_count);
    let mut scratch = IslandScratch::new(graph.node_count());
    family_graph.initialize(ACTOR);

    family_graph.notify_edge_removed(ACTOR, 0, 4, &graph);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 1);
    family_graph.notify_edge_removed(ACTOR, 1, 5, &graph);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 0);
    family_graph.notify_edge_removed(ACTOR, 2, 6, &graph);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 0);
    family_graph.notify_edge_removed(ACTOR, 3, 7, &graph);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 1);
    family_graph.notify_edge_removed(ACTOR, 5, 6, &graph);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 0);
    family_graph.notify_edge_removed(ACTOR, 9, 10, &graph);
    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 1);

    let info = islands_info(&family_graph);
    assert_eq!(info.len(), 3);
    assert_eq!(info[0], vec![0, 1, 2, 3]);
    assert_eq!(info[1], vec![4, 5, 8, 9]);
    assert_eq!(info[2], vec![6, 7, 10, 11]);
}

#[test]
fn grid_survives_removing_every_edge() {
    let (graph, bond_count) = grid12();
    let mut family_graph = FamilyGraph::new(graph.node_count(), bond_count);
    let mut scratch = IslandScratch::new(graph.node_count());
    family_graph.initialize(ACTOR);

    let mut edges = family_graph.edge_count(&graph);
    for node0 in 0..graph.node_count() {
        let neighbors: Vec<u32> = graph.adjacent(node0).map(|(n, _)| n).collect();
        for node1 in neighbors {
            if family_graph.notify_edge_removed(ACTOR, node0, node1, &graph) {
                edges -= 1;
                assert_eq!(edges, family_graph.edge_count(&graph));
            }
        }
    }
    assert_eq!(family_graph.edge_count(&graph), 0);

    assert_eq!(family_graph.find_islands(ACTOR, &mut scratch, &graph), 12);
    for node in 0..graph.node_count() {
        assert_eq!(family_graph.island_ids()[node as usize], node);
    }
}

/// Build a 12-node graph from an undirected edge list.
fn graph_from_edges(edges: &[(u32, u32)]) -> (breccia_asset::SupportGraph, u32) {
    const NODES: usize = 12;
    let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); NODES];
    for &(a, b) in edges {
        neighbors[a as usize].push(b);
        neighbors[b as usize].push(a);
    }
    let mut partition = Vec::with_capacity(NODES + 1);
    let mut indices = Vec::new();
    partition.push(0u32);
    for list in &neighbors {
        indices.extend_from_slice(list);
        partition.push(indices.len() as u32);
    }
    support_graph_from_adjacency(&partition, &indices)
}

proptest! {
    /// Whatever edges are removed, and however island resolution is
    /// interleaved with the removals, the final partition must equal the
    /// components of a from-scratch union-find over the live edges.
    #[test]
    fn islands_match_reference_components(
        raw_edges in proptest::collection::btree_set((0u32..12, 0u32..12), 1..36),
        remove_mask in proptest::collection::vec(any::<bool>(), 36),
        resolve_mask in proptest::collection::vec(any::<bool>(), 36),
    ) {
        let edges: Vec<(u32, u32)> = raw_edges
            .into_iter()
            .filter(|&(a, b)| a != b)
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let (graph, bond_count) = graph_from_edges(&edges);

        let mut family_graph = FamilyGraph::new(graph.node_count(), bond_count);
        let mut scratch = IslandScratch::new(graph.node_count());
        family_graph.initialize(ACTOR);
        family_graph.find_islands(ACTOR, &mut scratch, &graph);

        let mut removed_bonds = BTreeSet::new();
        for (i, &(a, b)) in edges.iter().enumerate() {
            if !remove_mask[i % remove_mask.len()] {
                continue;
            }
            family_graph.notify_edge_removed(ACTOR, a, b, &graph);
            removed_bonds.insert(graph.find_bond(a, b));
            if resolve_mask[i % resolve_mask.len()] {
                family_graph.find_islands(ACTOR, &mut scratch, &graph);
            }
        }
        family_graph.find_islands(ACTOR, &mut scratch, &graph);

        let got = islands_info(&family_graph);
        let expected = {
            let mut components =
                reference_components(&graph, |bond| removed_bonds.contains(&bond));
            for component in &mut components {
                component.sort_unstable();
            }
            components.sort_by_key(|c| (c.len(), c[0]));
            components
        };
        prop_assert_eq!(got, expected);
    }
}
