use super::DataId;

/// A named scalar or vector field on a mesh.
///
/// `dimension` is 1 for a scalar field or the mesh's dimensionality for a
/// vector field; `values` is laid out vertex-major with `dimension`
/// components per vertex (§3, invariant 2 of §8).
#[derive(Debug, Clone)]
pub struct Data {
    pub id: DataId,
    pub name: String,
    pub dimension: usize,
    values: Vec<f64>,
}

impl Data {
    pub fn new(id: DataId, name: impl Into<String>, dimension: usize) -> Self {
        Self {
            id,
            name: name.into(),
            dimension,
            values: Vec::new(),
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Resizes `values` to `num_vertices * dimension`, zero-filling any newly
    /// added entries. A no-op if already that size.
    pub fn allocate(&mut self, num_vertices: usize) {
        self.values.resize(num_vertices * self.dimension, 0.0);
    }
}
