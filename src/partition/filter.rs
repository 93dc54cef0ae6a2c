use crate::mesh::{BoundingBox, Vertex};

/// Policy chosen per configured mesh (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GeometricFilter {
    /// No geometric reduction: every rank keeps the full mesh. Used for
    /// global mappings such as RBF.
    NoFilter,
    /// The provided-side master filters per receiver rank and sends only the
    /// filtered slice to each — minimizes wire volume.
    FilterFirst,
    /// The provided-side master broadcasts the full mesh; each receiving
    /// rank filters locally — minimizes CPU at master, trades network.
    BroadcastFilter,
}

/// Returns the local indices of the vertices in `vertices` that a rank with
/// bounding box `rank_box` should keep, under `filter`.
///
/// `NoFilter` keeps everything regardless of `rank_box`. The other two
/// policies differ only in *where* this function runs (provided-side master
/// vs. each receiving rank), not in the predicate itself, so both route
/// through the same geometric test here.
pub fn filter_vertices<const DIM: usize>(
    filter: GeometricFilter,
    vertices: &[Vertex<DIM>],
    rank_box: &BoundingBox<DIM>,
    safety_factor: f64,
) -> Vec<usize> {
    match filter {
        GeometricFilter::NoFilter => (0..vertices.len()).collect(),
        GeometricFilter::FilterFirst | GeometricFilter::BroadcastFilter => {
            let inflated = rank_box.inflated(safety_factor);
            vertices
                .iter()
                .enumerate()
                .filter(|(_, v)| inflated.contains(&v.coords))
                .map(|(i, _)| i)
                .collect()
        }
    }
}
