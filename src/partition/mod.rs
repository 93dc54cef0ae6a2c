//! Orchestrates the provided/received partition roles (§4.3) by composing
//! [`codec`], [`feedback`], [`filter`], [`handshake`], and [`ownership`].
//!
//! The wire-compatible prefix (dimensionality, participant name, mesh
//! identity, vertex count, coordinates) is exactly the handshake in
//! [`handshake::send_mesh_handshake`] — no vertex-id array rides the wire, so
//! the canonical vertex numbering both sides agree on is simply *position in
//! that coordinate array*. Everything downstream (filtering, ownership,
//! global-index assignment) is keyed off that position.
//!
//! `FILTER_FIRST` and `BROADCAST_FILTER` share one predicate
//! ([`filter::filter_vertices`] already says so); they differ only in where
//! the filtering runs. This orchestration always broadcasts the full
//! coordinate set to every local rank and filters there, which reproduces
//! `BROADCAST_FILTER`'s wire pattern for all three policies. That is a
//! deliberate simplification of `FILTER_FIRST`'s wire-volume optimization,
//! not a behavioral difference — the set of vertices each rank keeps is
//! identical either way.

pub mod codec;
pub mod feedback;
pub mod filter;
pub mod handshake;
pub mod ownership;

pub use feedback::FeedbackMap;
pub use filter::GeometricFilter;

use crate::error::{CouplingError, Result};
use crate::intracomm::IntraComm;
use crate::mesh::{BoundingBox, Mesh, MeshId, Vertex, VertexId, VertexDistribution};
use crate::num_vec::Vector;
use crate::transport::Transport;
use std::collections::HashMap;

/// Safety factor applied when inflating bounding boxes for geometric
/// filtering and feedback-map construction (§4.3). Fixed per coupled pair in
/// this crate; a future configuration surface could make it per-mesh.
pub const DEFAULT_SAFETY_FACTOR: f64 = 0.1;

fn transport_err(participant: &str, rank: usize, source: std::io::Error) -> CouplingError {
    CouplingError::transport(rank, participant, source)
}

/// Runs the provided side of the partition protocol for one mesh.
///
/// Every local rank must call this; only the rank for which
/// `intracomm.is_master()` is true touches `peer_master`. Returns this rank's
/// entry of the [`FeedbackMap`] — the receiver ranks (on the peer
/// participant) that need data from this sender rank, the routing table
/// [`crate::m2n`] point-to-point communication consumes.
pub fn run_provided_side<const DIM: usize, I: IntraComm, T: Transport>(
    mesh: &Mesh<DIM>,
    participant_name: &str,
    intracomm: &mut I,
    peer_master: &mut T,
) -> Result<Vec<usize>> {
    let rank = intracomm.rank();
    let local_box = mesh.local_bounding_box();
    let gathered_boxes = intracomm
        .gather_doubles(&codec::encode_box(&local_box))
        .map_err(|e| transport_err(participant_name, rank, e))?;
    let gathered_coords = intracomm
        .gather_doubles(&codec::encode_coords(mesh.vertices()))
        .map_err(|e| transport_err(participant_name, rank, e))?;

    if intracomm.is_master() {
        let boxes = codec::decode_boxes::<DIM>(&gathered_boxes);
        handshake::send_mesh_handshake::<DIM, T>(
            peer_master,
            participant_name,
            mesh.id.0 as i32,
            &gathered_coords,
        )
        .map_err(|e| transport_err(participant_name, rank, e))?;
        handshake::send_boxes::<DIM, T>(peer_master, &boxes)
            .map_err(|e| transport_err(participant_name, rank, e))?;

        let per_receiver_rank = feedback::receive_needed_senders(peer_master)
            .map_err(|e| transport_err(participant_name, rank, e))?;
        let map = feedback::invert(&per_receiver_rank);
        broadcast_feedback_map(intracomm, participant_name, &map, intracomm.size())?;
        Ok(map.get(&rank).cloned().unwrap_or_default())
    } else {
        let map = receive_feedback_map(intracomm, participant_name)?;
        Ok(map.get(&rank).cloned().unwrap_or_default())
    }
}

/// Runs the received side of the partition protocol for one mesh.
///
/// `own_region` is this rank's own spatial region of interest — on a real
/// solver this is typically the bounding box of a mesh it already owns
/// locally; this crate treats it as an opaque input rather than computing it,
/// since the core does not know which of a participant's other meshes that
/// region should come from (§1 non-goals: no mapping-kernel geometry here).
///
/// Returns the filtered, owned-and-indexed [`Mesh`] plus this rank's needed
/// provided-side sender ranks — the list the caller feeds into
/// [`feedback::send_needed_senders`] via its own master (see
/// `run_received_side_master_feedback`, which this function calls
/// internally to complete the round trip before returning).
pub fn run_received_side<const DIM: usize, I: IntraComm, T: Transport>(
    mesh_id: MeshId,
    mesh_name: impl Into<String>,
    own_region: &BoundingBox<DIM>,
    filter: GeometricFilter,
    safety_factor: f64,
    participant_name: &str,
    intracomm: &mut I,
    provided_master: &mut T,
) -> Result<Mesh<DIM>> {
    let rank = intracomm.rank();
    let num_ranks = intracomm.size();

    let (coords, provided_boxes) = if intracomm.is_master() {
        let handshake = handshake::receive_mesh_handshake::<DIM, T>(provided_master, participant_name)?;
        if handshake.mesh_identity != mesh_id.0 as i32 {
            return Err(crate::error::ProtocolError::MeshIdentityMismatch {
                participant: participant_name.to_string(),
                rank,
                expected: mesh_id.0.to_string(),
                actual: handshake.mesh_identity,
            }
            .into());
        }
        let boxes = handshake::receive_boxes::<DIM, T>(provided_master)
            .map_err(|e| transport_err(participant_name, rank, e))?;
        (handshake.coords, boxes)
    } else {
        (Vec::new(), Vec::new())
    };

    let coords = intracomm
        .broadcast_doubles(&coords)
        .map_err(|e| transport_err(participant_name, rank, e))?;
    let num_total = coords.len() / DIM;

    let candidate_vertices: Vec<Vertex<DIM>> = (0..num_total)
        .map(|i| Vertex::new(VertexId(i as u64), Vector::from_slice(&coords[i * DIM..(i + 1) * DIM])))
        .collect();

    let kept: Vec<usize> = filter::filter_vertices(filter, &candidate_vertices, own_region, safety_factor);

    // Globally assign ownership of every kept vertex across this
    // participant's own ranks (§4.3 ownership assignment), then hand each
    // rank back the global index and owner flag for its own kept vertices in
    // submission order — both derived from the same gather/scatter so the
    // round trip preserves per-rank ordering.
    let my_count = kept.len() as f64;
    let counts = intracomm
        .gather_doubles(&[my_count])
        .map_err(|e| transport_err(participant_name, rank, e))?;
    let my_ids = codec::encode_usizes(&kept);
    let gathered_ids = intracomm
        .gather_doubles(&my_ids)
        .map_err(|e| transport_err(participant_name, rank, e))?;

    let (global_index_reply, owner_reply, vertex_offsets) = if intracomm.is_master() {
        let counts: Vec<usize> = counts.iter().map(|&c| c as usize).collect();
        let ids: Vec<usize> = codec::decode_usizes(&gathered_ids);

        let mut candidates: HashMap<VertexId, Vec<usize>> = HashMap::new();
        let mut rank_of_position = Vec::with_capacity(ids.len());
        let mut offset = 0;
        for (r, &c) in counts.iter().enumerate() {
            for _ in 0..c {
                rank_of_position.push(r);
            }
            offset += c;
        }
        debug_assert_eq!(offset, ids.len());

        for (position, &id) in ids.iter().enumerate() {
            candidates
                .entry(VertexId(id as u64))
                .or_insert_with(Vec::new)
                .push(rank_of_position[position]);
        }
        let mut global_order: Vec<VertexId> = candidates.keys().copied().collect();
        global_order.sort();

        let owners = ownership::assign_owners(&global_order, &candidates, num_ranks);

        let mut bucket_start = vec![0usize; num_ranks];
        let mut acc = 0;
        for r in 0..num_ranks {
            bucket_start[r] = acc;
            acc += counts[r];
        }

        // local_index_of: compact, 0-based index among only the vertices the
        // *owning* rank itself owns, in that rank's own submission order (the
        // order its final local mesh holds them in). A rank can also keep
        // vertices it does not own (overlap ghosts) — those must not consume
        // a slot here, or the owner's slice of `offsets` would have gaps.
        let mut owner_compact_counts = vec![0usize; num_ranks];
        let mut local_index_of: HashMap<VertexId, usize> = HashMap::with_capacity(owners.len());
        for (position, &id) in ids.iter().enumerate() {
            let vid = VertexId(id as u64);
            let r = rank_of_position[position];
            if r == owners[&vid] {
                local_index_of.insert(vid, owner_compact_counts[r]);
                owner_compact_counts[r] += 1;
            }
        }

        let (_distribution, offsets) = ownership::build_distribution(&owners, &local_index_of, num_ranks);

        // Reply arrays, laid out in the same per-rank submission order as
        // `ids`, so scattering with the original `counts` hands each rank
        // back the answers for exactly the vertices it submitted.
        let mut global_index_reply = vec![0.0f64; ids.len()];
        let mut owner_reply = vec![0.0f64; ids.len()];
        for (position, &id) in ids.iter().enumerate() {
            let vid = VertexId(id as u64);
            let owner_rank = owners[&vid];
            let global_index = vertex_offsets_global_index(&offsets, owner_rank, &local_index_of, vid);
            global_index_reply[position] = global_index as f64;
            owner_reply[position] = if owner_rank == rank_of_position[position] { 1.0 } else { 0.0 };
        }

        (global_index_reply, owner_reply, offsets)
    } else {
        (Vec::new(), Vec::new(), Vec::new())
    };

    let sizes: Vec<usize> = counts.iter().map(|&c| c as usize).collect();
    let my_global_indices = intracomm
        .scatter_doubles(intracomm.is_master().then(|| (&global_index_reply[..], &sizes[..])))
        .map_err(|e| transport_err(participant_name, rank, e))?;
    let my_owner_flags = intracomm
        .scatter_doubles(intracomm.is_master().then(|| (&owner_reply[..], &sizes[..])))
        .map_err(|e| transport_err(participant_name, rank, e))?;
    let vertex_offsets = intracomm
        .broadcast_doubles(&codec::encode_usizes(&vertex_offsets))
        .map_err(|e| transport_err(participant_name, rank, e))?;
    let vertex_offsets = codec::decode_usizes(&vertex_offsets);

    let mut mesh = Mesh::<DIM>::new(mesh_id, mesh_name);
    for (i, &source_index) in kept.iter().enumerate() {
        let mut vertex = candidate_vertices[source_index];
        vertex.global_index = Some(my_global_indices[i] as usize);
        vertex.owner = my_owner_flags[i] != 0.0;
        vertex.tagged = true;
        mesh.add_vertex(vertex);
    }
    mesh.vertex_offsets = vertex_offsets;
    let owned: Vec<usize> = mesh
        .vertices()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.owner)
        .map(|(i, _)| i)
        .collect();
    let mut distribution: VertexDistribution = HashMap::new();
    distribution.insert(rank, owned);
    mesh.vertex_distribution = distribution;

    // Feedback: this rank's needed provided-side senders are the ranks whose
    // (inflated) box overlaps our own region; gathered at our master and
    // forwarded to the provided-side master so it can build its own
    // FeedbackMap (§4.3).
    let needed = feedback::needed_senders(own_region, &provided_boxes, safety_factor);
    send_feedback_to_provided_master(intracomm, provided_master, participant_name, &needed)?;

    Ok(mesh)
}

fn vertex_offsets_global_index(
    offsets: &[usize],
    owner_rank: usize,
    local_index_of: &HashMap<VertexId, usize>,
    vid: VertexId,
) -> usize {
    offsets[owner_rank] + local_index_of[&vid]
}

fn broadcast_feedback_map<I: IntraComm>(
    intracomm: &mut I,
    participant_name: &str,
    map: &FeedbackMap,
    num_ranks: usize,
) -> Result<()> {
    let encoded = encode_feedback_map(map, num_ranks);
    intracomm
        .broadcast_doubles(&encoded)
        .map_err(|e| transport_err(participant_name, intracomm.rank(), e))?;
    Ok(())
}

fn receive_feedback_map<I: IntraComm>(intracomm: &mut I, participant_name: &str) -> Result<FeedbackMap> {
    let encoded = intracomm
        .broadcast_doubles(&[])
        .map_err(|e| transport_err(participant_name, intracomm.rank(), e))?;
    Ok(decode_feedback_map(&encoded))
}

/// `[sender_rank, count, receiver_rank...]*` — a flat encoding of
/// [`FeedbackMap`] suitable for `broadcast_doubles`.
fn encode_feedback_map(map: &FeedbackMap, num_ranks: usize) -> Vec<f64> {
    let mut out = Vec::new();
    for sender in 0..num_ranks {
        let receivers = map.get(&sender).cloned().unwrap_or_default();
        out.push(sender as f64);
        out.push(receivers.len() as f64);
        out.extend(receivers.iter().map(|&r| r as f64));
    }
    out
}

fn decode_feedback_map(flat: &[f64]) -> FeedbackMap {
    let mut map = FeedbackMap::new();
    let mut i = 0;
    while i < flat.len() {
        let sender = flat[i] as usize;
        let count = flat[i + 1] as usize;
        let receivers: Vec<usize> = flat[i + 2..i + 2 + count].iter().map(|&r| r as usize).collect();
        i += 2 + count;
        if !receivers.is_empty() {
            map.insert(sender, receivers);
        }
    }
    map
}

fn send_feedback_to_provided_master<I: IntraComm, T: Transport>(
    intracomm: &mut I,
    provided_master: &mut T,
    participant_name: &str,
    needed: &[usize],
) -> Result<()> {
    let rank = intracomm.rank();
    let my_count = needed.len() as f64;
    let counts = intracomm
        .gather_doubles(&[my_count])
        .map_err(|e| transport_err(participant_name, rank, e))?;
    let my_ids = codec::encode_usizes(needed);
    let gathered_ids = intracomm
        .gather_doubles(&my_ids)
        .map_err(|e| transport_err(participant_name, rank, e))?;

    if intracomm.is_master() {
        let counts: Vec<usize> = counts.iter().map(|&c| c as usize).collect();
        let ids: Vec<usize> = codec::decode_usizes(&gathered_ids);
        let mut per_receiver = Vec::with_capacity(counts.len());
        let mut cursor = 0;
        for &c in &counts {
            per_receiver.push(ids[cursor..cursor + c].to_vec());
            cursor += c;
        }
        feedback::send_needed_senders(provided_master, &per_receiver)
            .map_err(|e| transport_err(participant_name, rank, e))?;
    }
    Ok(())
}
