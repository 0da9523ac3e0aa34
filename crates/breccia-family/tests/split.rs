//! Spawn, damage, and split scenarios over whole families.

use std::sync::Arc;

use breccia_asset::Asset;
use breccia_family::{ActorDesc, Family, FractureCommands, ChunkFractureCommand};
use breccia_test_utils::{bonded_pair, desc, linear3, quad_with_leaves, unsupported_fan};

fn spawn(chunks: &[breccia_asset::ChunkDesc], bonds: &[breccia_asset::BondDesc]) -> Family {
    let asset = Asset::build(&desc(chunks, bonds)).unwrap();
    let mut family = Family::new(Arc::new(asset)).unwrap();
    family
        .create_first_actor(&ActorDesc::uniform(1.0, 1.0))
        .unwrap();
    family
}

#[test]
fn spawn_single_support_root() {
    // A support root with two leaf children spawns one actor holding the
    // single graph node; the root is the one visible chunk.
    let chunks = linear3();
    let family = spawn(&chunks, &[]);

    assert_eq!(family.actor_count(), 1);
    assert!(family.is_actor_active(0));
    assert_eq!(family.graph_node_count(0), 1);
    assert_eq!(family.leaf_chunk_count(0), 2);
    assert_eq!(family.visible_chunk_count(0), 1);
    assert_eq!(family.visible_chunks(0).collect::<Vec<_>>(), vec![0]);
    assert_eq!(family.max_actor_count(), 3); // 1 node + 2 subsupport chunks
}

#[test]
fn spawn_coverage_fixed_fan() {
    // Zero support flags: the root is promoted, and the actor counts all
    // leaves beneath it.
    let chunks = unsupported_fan(5);
    let family = spawn(&chunks, &[]);

    assert_eq!(family.graph_node_count(0), 1);
    assert_eq!(family.leaf_chunk_count(0), 5);
    assert_eq!(family.asset().subtree_leaf_chunk_counts()[0], 5);
}

#[test]
fn breaking_the_only_bond_splits_in_two() {
    let (chunks, bonds) = bonded_pair();
    let mut family = spawn(&chunks, &bonds);
    assert_eq!(family.visible_chunk_count(0), 2);

    family.damage_bond(0, 0, 1, 2.0);
    assert_eq!(family.find_islands(0).unwrap(), 1);

    let mut new_actors = Vec::new();
    let count = family.split(0, &mut new_actors).unwrap();
    assert_eq!(count, 2);
    assert_eq!(family.actor_count(), 2);

    let mut sorted = new_actors.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1]);

    for &actor in &sorted {
        assert_eq!(family.graph_node_count(actor), 1);
        assert_eq!(family.leaf_chunk_count(actor), 2);
        assert_eq!(family.visible_chunk_count(actor), 1);
    }
    assert_eq!(family.visible_chunks(0).collect::<Vec<_>>(), vec![0]);
    assert_eq!(family.visible_chunks(1).collect::<Vec<_>>(), vec![1]);
    assert_eq!(family.chunk_actor(0), Some(0));
    assert_eq!(family.chunk_actor(1), Some(1));
}

#[test]
fn unbroken_actor_does_not_split() {
    let (chunks, bonds) = bonded_pair();
    let mut family = spawn(&chunks, &bonds);

    // Damage without severing.
    family.damage_bond(0, 0, 1, 0.25);
    assert_eq!(family.find_islands(0).unwrap(), 0);

    let mut new_actors = Vec::new();
    assert_eq!(family.split(0, &mut new_actors).unwrap(), 0);
    assert!(new_actors.is_empty());
    assert_eq!(family.actor_count(), 1);
}

#[test]
fn ring_splits_once_two_cuts_open_it() {
    let (chunks, bonds) = quad_with_leaves();
    let mut family = spawn(&chunks, &bonds);

    // The whole object shows as its (non-support) root chunk.
    assert_eq!(family.visible_chunks(0).collect::<Vec<_>>(), vec![0]);
    assert_eq!(family.graph_node_count(0), 4);
    assert_eq!(family.leaf_chunk_count(0), 8);

    // One cut leaves the ring of four connected.
    family.damage_bond(0, 0, 1, 2.0);
    assert_eq!(family.find_islands(0).unwrap(), 0);
    let mut new_actors = Vec::new();
    assert_eq!(family.split(0, &mut new_actors).unwrap(), 0);

    // The opposite cut opens it into two arcs.
    family.damage_bond(0, 2, 3, 2.0);
    let mut new_actors = Vec::new();
    let count = family.split(0, &mut new_actors).unwrap();
    assert_eq!(count, 2);

    let mut node_sets: Vec<Vec<u32>> = new_actors
        .iter()
        .map(|&actor| {
            let mut nodes: Vec<u32> = family.graph_nodes(actor).collect();
            nodes.sort_unstable();
            nodes
        })
        .collect();
    node_sets.sort();
    assert_eq!(node_sets, vec![vec![0, 3], vec![1, 2]]);

    // The root chunk is no longer anyone's; each arc shows its two
    // support chunks.
    assert_eq!(family.chunk_actor(0), None);
    for &actor in &new_actors {
        assert_eq!(family.visible_chunk_count(actor), 2);
        assert_eq!(family.leaf_chunk_count(actor), 4);
        let mut visible: Vec<u32> = family.visible_chunks(actor).collect();
        visible.sort_unstable();
        let mut expected: Vec<u32> = family
            .graph_nodes(actor)
            .map(|node| family.asset().graph().chunk_indices()[node as usize])
            .collect();
        expected.sort_unstable();
        assert_eq!(visible, expected);
    }
}

#[test]
fn dead_single_chunk_actor_crumbles_into_children() {
    let (chunks, bonds) = bonded_pair();
    let mut family = spawn(&chunks, &bonds);

    family.damage_bond(0, 0, 1, 2.0);
    family.find_islands(0).unwrap();
    let mut halves = Vec::new();
    family.split(0, &mut halves).unwrap();

    // Kill actor 0's single support chunk; the surplus damage stays below
    // the children's health, so they survive as debris actors.
    family.apply_fracture(
        None,
        &FractureCommands {
            bond_fractures: &[],
            chunk_fractures: &[ChunkFractureCommand {
                chunk_index: 0,
                health_damage: 2.0,
            }],
        },
        None,
    );
    assert!(!family.can_fracture(0));

    let mut debris = Vec::new();
    let count = family.split(0, &mut debris).unwrap();
    assert_eq!(count, 2);
    debris.sort_unstable();
    // Subsupport chunks 2 and 3 occupy slots node_count + (chunk - first
    // subsupport) = 2 and 3.
    assert_eq!(debris, vec![2, 3]);
    assert!(!family.is_actor_active(0));
    for &actor in &debris {
        assert_eq!(family.graph_node_count(actor), 0);
        assert_eq!(family.visible_chunk_count(actor), 1);
        assert_eq!(family.leaf_chunk_count(actor), 1);
    }
    assert_eq!(family.visible_chunks(2).collect::<Vec<_>>(), vec![2]);
    assert_eq!(family.chunk_actor(2), Some(2));
    // The other half is untouched.
    assert!(family.is_actor_active(1));
    assert_eq!(family.actor_count(), 3);
}

#[test]
fn overkill_cascade_produces_dead_debris() {
    let (chunks, bonds) = bonded_pair();
    let mut family = spawn(&chunks, &bonds);

    family.damage_bond(0, 0, 1, 2.0);
    family.find_islands(0).unwrap();
    let mut halves = Vec::new();
    family.split(0, &mut halves).unwrap();

    // 4 damage: 3 surplus splits 1.5 per child, overkilling both leaves.
    family.apply_fracture(
        None,
        &FractureCommands {
            bond_fractures: &[],
            chunk_fractures: &[ChunkFractureCommand {
                chunk_index: 0,
                health_damage: 4.0,
            }],
        },
        None,
    );
    assert_eq!(family.chunk_health(2), Some(-0.5));
    assert_eq!(family.chunk_health(3), Some(-0.5));

    let mut debris = Vec::new();
    let count = family.split(0, &mut debris).unwrap();
    // Leaves have no children to crumble into, so they remain as (dead)
    // single-chunk actors.
    assert_eq!(count, 2);
    for &actor in &debris {
        assert!(!family.can_fracture(actor));
    }
}

#[test]
fn split_of_inactive_actor_fails() {
    let chunks = linear3();
    let mut family = spawn(&chunks, &[]);
    let mut out = Vec::new();
    assert!(family.split(1, &mut out).is_err());
    assert!(family.find_islands(2).is_err());
}
