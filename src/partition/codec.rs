//! Encodes [`BoundingBox`] values and small integer vectors as `f64` slices
//! so they can ride the [`crate::intracomm::IntraComm`] collectives, which
//! only move `f64` and `bool` payloads (§4.2).

use crate::mesh::{BoundingBox, Vertex};
use crate::num_vec::Vector;

pub fn encode_box<const DIM: usize>(bbox: &BoundingBox<DIM>) -> Vec<f64> {
    let mut out = Vec::with_capacity(2 * DIM);
    out.extend_from_slice(bbox.min().as_slice());
    out.extend_from_slice(bbox.max().as_slice());
    out
}

pub fn decode_box<const DIM: usize>(flat: &[f64]) -> BoundingBox<DIM> {
    assert_eq!(flat.len(), 2 * DIM);
    let mut bbox = BoundingBox::<DIM>::empty();
    bbox.expand_by_point(&Vector::from_slice(&flat[..DIM]));
    bbox.expand_by_point(&Vector::from_slice(&flat[DIM..]));
    bbox
}

pub fn decode_boxes<const DIM: usize>(flat: &[f64]) -> Vec<BoundingBox<DIM>> {
    flat.chunks_exact(2 * DIM).map(decode_box).collect()
}

pub fn encode_coords<const DIM: usize>(vertices: &[Vertex<DIM>]) -> Vec<f64> {
    let mut out = Vec::with_capacity(vertices.len() * DIM);
    for v in vertices {
        out.extend_from_slice(v.coords.as_slice());
    }
    out
}

pub fn encode_usizes(values: &[usize]) -> Vec<f64> {
    values.iter().map(|&v| v as f64).collect()
}

pub fn decode_usizes(values: &[f64]) -> Vec<usize> {
    values.iter().map(|&v| v as usize).collect()
}
