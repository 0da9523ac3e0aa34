//! Chunk-order validation and repair.
//!
//! Asset construction requires chunks grouped contiguously by parent, roots
//! first, with every upper-support chunk preceding every subsupport chunk.
//! [`test_for_valid_chunk_order`] checks the invariant;
//! [`build_chunk_reorder_map`] computes the permutation that repairs a
//! descriptor, and [`apply_chunk_reorder_map`] applies it to the chunk and
//! bond arrays consistently.

use breccia_core::{invert_map, is_invalid, INVALID_INDEX};

use crate::coverage::{ensure_exact_support_coverage, ChunkAnnotations};
use crate::desc::{BondDesc, ChunkDesc};

/// Whether the chunk array satisfies the construction ordering invariant.
///
/// `annotations` are the coverage annotations for these descriptors (see
/// [`ensure_exact_support_coverage`]).
#[must_use]
pub fn test_for_valid_chunk_order(
    chunk_descs: &[ChunkDesc],
    annotations: &[ChunkAnnotations],
) -> bool {
    let mut chunk_marks = vec![false; chunk_descs.len()];
    let mut current_parent = INVALID_INDEX;
    for (i, desc) in chunk_descs.iter().enumerate() {
        let parent = desc.parent_chunk_index;
        if parent != current_parent {
            if !is_invalid(current_parent) {
                chunk_marks[current_parent as usize] = true;
            }
            current_parent = parent;
            if is_invalid(current_parent) {
                // Roots must form the single leading group.
                return false;
            }
            if chunk_marks[current_parent as usize] {
                // This parent's child group already ended.
                return false;
            }
        }

        if i + 1 < chunk_descs.len()
            && !annotations[i].is_upper_support()
            && annotations[i + 1].is_upper_support()
        {
            return false;
        }
    }
    true
}

/// Compute the permutation that puts a descriptor into valid chunk order.
///
/// Returns `(map, identity)` where `map[old] = new`. When the descriptor is
/// already valid the map is the identity and `identity` is true. Coverage
/// annotations are derived internally (on a copy, with auto-fix), so the
/// input is never mutated.
///
/// The order places upper-support chunks before subsupport chunks, then
/// groups by parent index ascending with roots first; ties keep their
/// original relative order.
#[must_use]
pub fn build_chunk_reorder_map(chunk_descs: &[ChunkDesc]) -> (Vec<u32>, bool) {
    let chunk_count = chunk_descs.len();

    let mut fixed = chunk_descs.to_vec();
    let coverage = ensure_exact_support_coverage(&mut fixed, false);
    let annotations = &coverage.annotations;

    if test_for_valid_chunk_order(chunk_descs, annotations) {
        return ((0..chunk_count as u32).collect(), true);
    }

    // chunk_map[new] = old, sorted by (upper-support desc, parent + 1 asc).
    let mut chunk_map: Vec<u32> = (0..chunk_count as u32).collect();
    chunk_map.sort_by_key(|&i| {
        let upper = annotations[i as usize].is_upper_support();
        let parent_key = chunk_descs[i as usize].parent_chunk_index.wrapping_add(1);
        (!upper, parent_key)
    });

    let mut reorder_map = vec![0u32; chunk_count];
    invert_map(&mut reorder_map, &chunk_map);
    (reorder_map, false)
}

/// Apply a chunk reorder map to a descriptor in place.
///
/// Chunk descriptors are permuted so that old index `i` lands at
/// `map[i]`, with parent indices remapped; bond endpoint indices are
/// remapped likewise. With `keep_bond_normal_chunk_order` set, a bond
/// whose endpoints' relative order inverts has its normal flipped so the
/// low-to-high orientation convention survives the renumbering.
pub fn apply_chunk_reorder_map(
    chunk_descs: &mut [ChunkDesc],
    bond_descs: &mut [BondDesc],
    map: &[u32],
    keep_bond_normal_chunk_order: bool,
) {
    let chunk_count = chunk_descs.len();
    let original = chunk_descs.to_vec();
    for (i, desc) in original.into_iter().enumerate() {
        let new_index = map[i] as usize;
        chunk_descs[new_index] = desc;
        let parent = &mut chunk_descs[new_index].parent_chunk_index;
        if (*parent as usize) < chunk_count {
            *parent = map[*parent as usize];
        }
    }

    for bond_desc in bond_descs.iter_mut() {
        let [index0, index1] = bond_desc.chunk_indices;
        let new_index0 = if (index0 as usize) < chunk_count {
            map[index0 as usize]
        } else {
            index0
        };
        let new_index1 = if (index1 as usize) < chunk_count {
            map[index1 as usize]
        } else {
            index1
        };
        if keep_bond_normal_chunk_order && (index0 < index1) != (new_index0 < new_index1) {
            for component in &mut bond_desc.bond.normal {
                *component = -*component;
            }
        }
        bond_desc.chunk_indices = [new_index0, new_index1];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Bond;

    const NONE: u32 = INVALID_INDEX;

    fn descs(parents_support: &[(u32, bool)]) -> Vec<ChunkDesc> {
        parents_support
            .iter()
            .map(|&(p, s)| {
                if is_invalid(p) {
                    ChunkDesc::root(s)
                } else {
                    ChunkDesc::child(p, s)
                }
            })
            .collect()
    }

    fn annotations_for(chunk_descs: &[ChunkDesc]) -> Vec<ChunkAnnotations> {
        let mut copy = chunk_descs.to_vec();
        ensure_exact_support_coverage(&mut copy, false).annotations
    }

    #[test]
    fn valid_order_passes() {
        let d = descs(&[(NONE, false), (0, true), (0, true), (1, false), (2, false)]);
        let ann = annotations_for(&d);
        assert!(test_for_valid_chunk_order(&d, &ann));
    }

    #[test]
    fn split_child_group_fails() {
        // Children of 0 are not contiguous: 1 and 3 sandwich a child of 1.
        let d = descs(&[(NONE, true), (0, false), (1, false), (0, false)]);
        let ann = annotations_for(&d);
        assert!(!test_for_valid_chunk_order(&d, &ann));
    }

    #[test]
    fn subsupport_before_upper_support_fails() {
        // Chunk 1 is support, its child 2 (subsupport) precedes support
        // chunk 3.
        let d = descs(&[(NONE, false), (0, true), (1, false), (0, true)]);
        // Manual order: indices 0,1,2,3 with 2 subsupport before 3 upper.
        let ann = annotations_for(&d);
        assert!(!test_for_valid_chunk_order(&d, &ann));
    }

    #[test]
    fn reorder_map_is_identity_for_valid_input() {
        let d = descs(&[(NONE, false), (0, true), (0, true), (1, false)]);
        let (map, identity) = build_chunk_reorder_map(&d);
        assert!(identity);
        assert_eq!(map, vec![0, 1, 2, 3]);
    }

    #[test]
    fn reorder_map_repairs_invalid_input() {
        // Subsupport chunk 2 sits between the upper-support chunks.
        let mut d = descs(&[(NONE, false), (0, true), (1, false), (0, true)]);
        let (map, identity) = build_chunk_reorder_map(&d);
        assert!(!identity);

        let mut bonds: Vec<BondDesc> = vec![BondDesc {
            bond: Bond {
                normal: [1.0, 0.0, 0.0],
                area: 1.0,
                centroid: [0.0; 3],
                user_data: 0,
            },
            chunk_indices: [1, 3],
        }];
        apply_chunk_reorder_map(&mut d, &mut bonds, &map, true);

        let ann = annotations_for(&d);
        assert!(test_for_valid_chunk_order(&d, &ann));

        // The bond still connects the same two (renumbered) chunks.
        let [b0, b1] = bonds[0].chunk_indices;
        assert!(d[b0 as usize].support);
        assert!(d[b1 as usize].support);
    }

    #[test]
    fn normal_flips_when_endpoint_order_inverts() {
        let mut d = descs(&[(NONE, true), (NONE, true)]);
        let mut bonds = vec![BondDesc {
            bond: Bond {
                normal: [0.0, 0.0, 1.0],
                area: 1.0,
                centroid: [0.0; 3],
                user_data: 0,
            },
            chunk_indices: [0, 1],
        }];
        // Swap the two roots by hand.
        let map = vec![1, 0];
        apply_chunk_reorder_map(&mut d, &mut bonds, &map, true);
        assert_eq!(bonds[0].chunk_indices, [1, 0]);
        assert_eq!(bonds[0].bond.normal, [0.0, 0.0, -1.0]);

        // Applying without the convention flag leaves the normal alone.
        let mut bonds2 = vec![BondDesc {
            bond: bonds[0].bond,
            chunk_indices: [1, 0],
        }];
        let mut d2 = d.clone();
        apply_chunk_reorder_map(&mut d2, &mut bonds2, &map, false);
        assert_eq!(bonds2[0].bond.normal, [0.0, 0.0, -1.0]);
    }
}
