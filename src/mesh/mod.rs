//! Mesh value-types: [`Vertex`], [`Edge`], [`Triangle`], [`Quad`], [`Data`],
//! [`BoundingBox`], and the [`Mesh`] container that owns them.
//!
//! A `Mesh` is generic over its dimensionality (`DIM` is 2 or 3), fixed for
//! the mesh's lifetime (§3). Coordinates and normals reuse
//! [`crate::num_vec::Vector`] the same way the teacher's numeric kernels do.

mod bounding_box;
mod data;

pub use bounding_box::BoundingBox;
pub use data::Data;

use crate::num_vec::Vector;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

/// A single mesh vertex.
///
/// `global_index` and `owner` are `None`/`false` until the partition
/// subsystem runs (§3); `tagged` records whether a geometric filter kept this
/// vertex during received-side reduction.
#[derive(Debug, Clone, Copy)]
pub struct Vertex<const DIM: usize> {
    pub id: VertexId,
    pub coords: Vector<f64, DIM>,
    pub normal: Vector<f64, DIM>,
    pub global_index: Option<usize>,
    pub owner: bool,
    pub tagged: bool,
}

impl<const DIM: usize> Vertex<DIM> {
    pub fn new(id: VertexId, coords: Vector<f64, DIM>) -> Self {
        Self {
            id,
            coords,
            normal: Vector::zero(),
            global_index: None,
            owner: false,
            tagged: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub id: EdgeId,
    pub vertices: [VertexId; 2],
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub id: FaceId,
    pub vertices: [VertexId; 3],
    pub edges: [EdgeId; 3],
}

#[derive(Debug, Clone, Copy)]
pub struct Quad {
    pub id: FaceId,
    pub vertices: [VertexId; 4],
    pub edges: [EdgeId; 4],
}

impl Quad {
    /// Reorders `vertices` in place so they wind consistently around the
    /// quad's boundary, given each vertex's 2D position. Returns whether the
    /// (possibly reordered) quad is convex.
    ///
    /// Per the open question in §9: if this returns `false`, the order of
    /// `vertices` afterwards is unspecified — callers must not rely on it.
    pub fn ensure_convex_order(&mut self, positions: &[(f64, f64); 4]) -> bool {
        let cx = positions.iter().map(|p| p.0).sum::<f64>() / 4.0;
        let cy = positions.iter().map(|p| p.1).sum::<f64>() / 4.0;

        let mut order: Vec<usize> = (0..4).collect();
        order.sort_by(|&a, &b| {
            let angle = |i: usize| (positions[i].1 - cy).atan2(positions[i].0 - cx);
            angle(a).partial_cmp(&angle(b)).unwrap()
        });

        let reordered_vertices = [
            self.vertices[order[0]],
            self.vertices[order[1]],
            self.vertices[order[2]],
            self.vertices[order[3]],
        ];
        let reordered_positions = [
            positions[order[0]],
            positions[order[1]],
            positions[order[2]],
            positions[order[3]],
        ];

        let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| {
            (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
        };

        let mut sign = 0.0;
        for i in 0..4 {
            let o = reordered_positions[i];
            let a = reordered_positions[(i + 1) % 4];
            let b = reordered_positions[(i + 2) % 4];
            let c = cross(o, a, b);
            if c != 0.0 {
                if sign == 0.0 {
                    sign = c.signum();
                } else if c.signum() != sign {
                    return false;
                }
            }
        }

        self.vertices = reordered_vertices;
        true
    }
}

/// Maps rank-in-group to the ordered local indices of that rank's globally
/// owned vertices, ascending (§3, §4.3 invariants).
pub type VertexDistribution = HashMap<usize, Vec<usize>>;

/// A named container of vertices, edges, triangles, quads, and data fields.
pub struct Mesh<const DIM: usize> {
    pub id: MeshId,
    pub name: String,
    vertices: Vec<Vertex<DIM>>,
    edges: Vec<Edge>,
    triangles: Vec<Triangle>,
    quads: Vec<Quad>,
    data: Vec<Data>,
    /// Populated once by the partition subsystem; empty before that (§3).
    pub vertex_distribution: VertexDistribution,
    /// `vertex_offsets[i]` = number of vertices owned by ranks `0..i` (§4.3).
    pub vertex_offsets: Vec<usize>,
}

impl<const DIM: usize> Mesh<DIM> {
    pub fn new(id: MeshId, name: impl Into<String>) -> Self {
        assert!(DIM == 2 || DIM == 3, "mesh dimensionality must be 2 or 3");
        Self {
            id,
            name: name.into(),
            vertices: Vec::new(),
            edges: Vec::new(),
            triangles: Vec::new(),
            quads: Vec::new(),
            data: Vec::new(),
            vertex_distribution: HashMap::new(),
            vertex_offsets: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        DIM
    }

    pub fn vertices(&self) -> &[Vertex<DIM>] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex<DIM>] {
        &mut self.vertices
    }

    pub fn add_vertex(&mut self, vertex: Vertex<DIM>) {
        self.vertices.push(vertex);
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Adds a triangle. Panics if any referenced edge id is not already
    /// present in the mesh — faces must reference edges already added (§3).
    pub fn add_triangle(&mut self, triangle: Triangle) {
        for edge_id in &triangle.edges {
            assert!(
                self.edges.iter().any(|e| &e.id == edge_id),
                "triangle {:?} references edge {:?} not present in mesh",
                triangle.id,
                edge_id
            );
        }
        self.triangles.push(triangle);
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn add_quad(&mut self, quad: Quad) {
        for edge_id in &quad.edges {
            assert!(
                self.edges.iter().any(|e| &e.id == edge_id),
                "quad {:?} references edge {:?} not present in mesh",
                quad.id,
                edge_id
            );
        }
        self.quads.push(quad);
    }

    pub fn data(&self) -> &[Data] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [Data] {
        &mut self.data
    }

    pub fn add_data(&mut self, data: Data) {
        self.data.push(data);
    }

    pub fn find_data(&self, id: DataId) -> Option<&Data> {
        self.data.iter().find(|d| d.id == id)
    }

    pub fn find_data_mut(&mut self, id: DataId) -> Option<&mut Data> {
        self.data.iter_mut().find(|d| d.id == id)
    }

    /// Allocates each data field's value buffer to `|vertices| * dimension`,
    /// zero-filled. Idempotent: re-allocating a field that is already the
    /// right size leaves its values untouched.
    pub fn allocate_data_values(&mut self) {
        let count = self.vertices.len();
        for data in &mut self.data {
            data.allocate(count);
        }
    }

    /// Computes a per-rank bounding box over this mesh's local vertices,
    /// used by the provided side of the partition subsystem (§4.3).
    pub fn local_bounding_box(&self) -> BoundingBox<DIM> {
        let mut bbox = BoundingBox::empty();
        for vertex in &self.vertices {
            bbox.expand_by_point(&vertex.coords);
        }
        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_triangle_mesh() -> Mesh<2> {
        let mut mesh = Mesh::<2>::new(MeshId(0), "fluid-surface");
        mesh.add_vertex(Vertex::new(VertexId(0), Vector::from([0.0, 0.0])));
        mesh.add_vertex(Vertex::new(VertexId(1), Vector::from([1.0, 0.0])));
        mesh.add_vertex(Vertex::new(VertexId(2), Vector::from([0.0, 1.0])));
        mesh.add_edge(Edge { id: EdgeId(0), vertices: [VertexId(0), VertexId(1)] });
        mesh.add_edge(Edge { id: EdgeId(1), vertices: [VertexId(1), VertexId(2)] });
        mesh.add_edge(Edge { id: EdgeId(2), vertices: [VertexId(2), VertexId(0)] });
        mesh.add_triangle(Triangle {
            id: FaceId(0),
            vertices: [VertexId(0), VertexId(1), VertexId(2)],
            edges: [EdgeId(0), EdgeId(1), EdgeId(2)],
        });
        mesh
    }

    #[test]
    #[should_panic(expected = "references edge")]
    fn triangle_referencing_missing_edge_panics() {
        let mut mesh = Mesh::<2>::new(MeshId(0), "bad");
        mesh.add_vertex(Vertex::new(VertexId(0), Vector::from([0.0, 0.0])));
        mesh.add_triangle(Triangle {
            id: FaceId(0),
            vertices: [VertexId(0), VertexId(0), VertexId(0)],
            edges: [EdgeId(7), EdgeId(8), EdgeId(9)],
        });
    }

    #[test]
    fn allocate_data_values_sizes_buffer_to_vertices_times_dimension() {
        let mut mesh = make_triangle_mesh();
        mesh.add_data(Data::new(DataId(0), "Forces", 2));
        mesh.allocate_data_values();
        assert_eq!(mesh.find_data(DataId(0)).unwrap().values().len(), 3 * 2);
    }

    #[test]
    fn convex_order_accepts_already_convex_square() {
        let mut quad = Quad {
            id: FaceId(0),
            vertices: [VertexId(0), VertexId(1), VertexId(2), VertexId(3)],
            edges: [EdgeId(0), EdgeId(1), EdgeId(2), EdgeId(3)],
        };
        let positions = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        assert!(quad.ensure_convex_order(&positions));
    }
}
