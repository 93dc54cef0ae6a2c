//! The provided-side-to-received-side mesh handshake.
//!
//! The prefix of this exchange — dimensionality, participant name, mesh
//! identity, vertex count, coordinate array — is the bit-compatible wire
//! format demanded by §6; it carries no magic number and no version tag
//! because existing deployments already speak it. The bounding-box list
//! that follows is internal to this crate's partition protocol and is not
//! subject to that compatibility constraint, so it uses the ordinary
//! length-prefixed framing every other message in this crate uses.

use crate::error::{CouplingError, ProtocolError};
use crate::mesh::BoundingBox;
use crate::partition::codec;
use crate::transport::Transport;
use std::io;

pub fn send_mesh_handshake<const DIM: usize, T: Transport>(
    transport: &mut T,
    participant_name: &str,
    mesh_identity: i32,
    coords: &[f64],
) -> io::Result<()> {
    transport.send_int(DIM as i32)?;
    transport.send_string(participant_name)?;
    transport.send_int(mesh_identity)?;
    let num_vertices = coords.len() / DIM;
    transport.send_int(num_vertices as i32)?;
    for &c in coords {
        transport.send_double(c)?;
    }
    Ok(())
}

pub struct MeshHandshake {
    pub participant_name: String,
    pub mesh_identity: i32,
    pub coords: Vec<f64>,
}

pub fn receive_mesh_handshake<const DIM: usize, T: Transport>(
    transport: &mut T,
    local_participant: &str,
) -> Result<MeshHandshake, CouplingError> {
    let dim = transport
        .receive_int()
        .map_err(|e| transport_error(local_participant, e))?;
    if dim as usize != DIM {
        return Err(ProtocolError::DimensionMismatch {
            participant: local_participant.to_string(),
            expected: DIM,
            actual: dim.max(0) as usize,
        }
        .into());
    }
    let participant_name = transport
        .receive_string()
        .map_err(|e| transport_error(local_participant, e))?;
    let mesh_identity = transport
        .receive_int()
        .map_err(|e| transport_error(local_participant, e))?;
    let num_vertices = transport
        .receive_int()
        .map_err(|e| transport_error(local_participant, e))? as usize;

    let mut coords = Vec::with_capacity(num_vertices * DIM);
    for _ in 0..num_vertices * DIM {
        coords.push(
            transport
                .receive_double()
                .map_err(|e| transport_error(local_participant, e))?,
        );
    }

    Ok(MeshHandshake {
        participant_name,
        mesh_identity,
        coords,
    })
}

pub fn send_boxes<const DIM: usize, T: Transport>(
    transport: &mut T,
    boxes: &[BoundingBox<DIM>],
) -> io::Result<()> {
    let flat: Vec<f64> = boxes.iter().flat_map(codec::encode_box).collect();
    transport.send_int(boxes.len() as i32)?;
    transport.send_doubles(&flat)
}

pub fn receive_boxes<const DIM: usize, T: Transport>(
    transport: &mut T,
) -> io::Result<Vec<BoundingBox<DIM>>> {
    let count = transport.receive_int()? as usize;
    let flat = transport.receive_doubles()?;
    assert_eq!(flat.len(), count * 2 * DIM);
    Ok(codec::decode_boxes(&flat))
}

fn transport_error(participant: &str, source: io::Error) -> CouplingError {
    CouplingError::Transport {
        rank: 0,
        peer: participant.to_string(),
        source,
    }
}
