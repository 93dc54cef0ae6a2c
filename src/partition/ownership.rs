use crate::mesh::VertexId;
use std::collections::HashMap;

/// Assigns exactly one owner rank to every vertex in `global_order`
/// (vertices in globally sorted order, per §4.3).
///
/// For each vertex in turn, the candidate rank with the smallest rank-id
/// that has not yet exceeded its fair share (`ceil(|vertices| / |ranks|)`)
/// becomes owner. This is deterministic and load-balanced independent of
/// message arrival order (§4.3 invariant), which is exactly what makes
/// re-partitioning idempotent.
///
/// Panics if a vertex in `global_order` has no entry in `candidates` — every
/// vertex must have been accepted by at least one rank's filter.
pub fn assign_owners(
    global_order: &[VertexId],
    candidates: &HashMap<VertexId, Vec<usize>>,
    num_ranks: usize,
) -> HashMap<VertexId, usize> {
    let fair_share = (global_order.len() + num_ranks - 1) / num_ranks.max(1);
    let mut counts = vec![0usize; num_ranks];
    let mut owners = HashMap::with_capacity(global_order.len());

    for vertex_id in global_order {
        let ranks = candidates
            .get(vertex_id)
            .unwrap_or_else(|| panic!("vertex {:?} has no candidate owner rank", vertex_id));

        let owner = ranks
            .iter()
            .copied()
            .filter(|&r| counts[r] < fair_share)
            .min()
            .unwrap_or_else(|| *ranks.iter().min().expect("candidate list must be non-empty"));

        counts[owner] += 1;
        owners.insert(*vertex_id, owner);
    }
    owners
}

/// Builds the per-rank [`crate::mesh::VertexDistribution`] and
/// `vertexOffsets` prefix-sum array from an owner assignment, given the
/// mapping from vertex id to its *local* index in the final mesh.
pub fn build_distribution(
    owners: &HashMap<VertexId, usize>,
    local_index_of: &HashMap<VertexId, usize>,
    num_ranks: usize,
) -> (crate::mesh::VertexDistribution, Vec<usize>) {
    let mut distribution: crate::mesh::VertexDistribution = HashMap::new();
    for rank in 0..num_ranks {
        distribution.insert(rank, Vec::new());
    }

    let mut ordered: Vec<_> = owners.iter().collect();
    ordered.sort_by_key(|(vertex_id, _)| local_index_of[vertex_id]);

    for (vertex_id, &rank) in ordered {
        distribution.get_mut(&rank).unwrap().push(local_index_of[vertex_id]);
    }

    let mut offsets = vec![0usize; num_ranks + 1];
    for rank in 0..num_ranks {
        offsets[rank + 1] = offsets[rank] + distribution[&rank].len();
    }

    (distribution, offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_deterministic_and_load_balanced() {
        let ids: Vec<VertexId> = (0..10).map(VertexId).collect();
        let mut candidates = HashMap::new();
        for id in &ids {
            candidates.insert(*id, vec![0, 1]);
        }

        let owners_a = assign_owners(&ids, &candidates, 2);
        let owners_b = assign_owners(&ids, &candidates, 2);
        assert_eq!(owners_a, owners_b);

        let rank0_count = owners_a.values().filter(|&&r| r == 0).count();
        let rank1_count = owners_a.values().filter(|&&r| r == 1).count();
        assert_eq!(rank0_count, 5);
        assert_eq!(rank1_count, 5);
    }

    #[test]
    fn vertex_with_single_candidate_always_goes_to_it() {
        let ids: Vec<VertexId> = (0..4).map(VertexId).collect();
        let mut candidates = HashMap::new();
        candidates.insert(VertexId(0), vec![1]);
        candidates.insert(VertexId(1), vec![1]);
        candidates.insert(VertexId(2), vec![1]);
        candidates.insert(VertexId(3), vec![0, 1]);

        let owners = assign_owners(&ids, &candidates, 2);
        assert_eq!(owners[&VertexId(0)], 1);
        assert_eq!(owners[&VertexId(1)], 1);
        assert_eq!(owners[&VertexId(2)], 1);
    }
}
