//! Cross-participant mesh partitioning scenarios exercising
//! `run_provided_side`/`run_received_side` over an in-process transport pair.

use confluence::constraint::Constraint;
use confluence::intracomm::{SingleRankIntraComm, TransportIntraComm};
use confluence::m2n::{DistributedCommunication, GatherScatter};
use confluence::mesh::{BoundingBox, Data, DataId, Mesh, MeshId, Vertex, VertexId};
use confluence::num_vec::Vector;
use confluence::partition::{run_provided_side, run_received_side, GeometricFilter};
use confluence::transport::{ChannelTransport, NullTransport, Transport};

/// A small xorshift generator: deterministic across runs without pulling in
/// an external crate for a single test fixture.
struct Xorshift(u64);

impl Xorshift {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// A uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn random_mesh(seed: u64, count: usize) -> Mesh<3> {
    let mut rng = Xorshift::new(seed);
    let mut mesh = Mesh::<3>::new(MeshId(0), "fluid-surface");
    for i in 0..count {
        let coords = Vector::from([rng.next_f64(), rng.next_f64(), rng.next_f64()]);
        mesh.add_vertex(Vertex::new(VertexId(i as u64), coords));
    }
    mesh.add_data(Data::new(DataId(0), "Forces", 3));
    mesh.allocate_data_values();
    mesh
}

fn unit_cube_region() -> BoundingBox<3> {
    let mut region = BoundingBox::<3>::empty();
    region.expand_by_point(&Vector::from([0.0, 0.0, 0.0]));
    region.expand_by_point(&Vector::from([0.5, 0.5, 0.5]));
    region
}

/// Scenario: filter correctness. 1000 vertices scattered uniformly over the
/// unit cube, a receiving rank whose own region is the lower octant
/// `[0, 0.5]^3`; under `FilterFirst` every vertex the received mesh keeps
/// must actually fall inside the inflated region, and every vertex clearly
/// outside it (by more than the inflation margin) must be dropped.
#[test]
fn filter_first_keeps_only_vertices_near_the_receivers_region() {
    let provided = random_mesh(0x5eed_1234, 1000);
    let safety_factor = 0.1;
    let region = unit_cube_region();
    let inflated = region.inflated(safety_factor);

    let (mut provided_link, mut received_link) = ChannelTransport::pair();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            let mut intracomm = SingleRankIntraComm;
            run_provided_side(&provided, "fluid", &mut intracomm, &mut provided_link).unwrap();
        });

        let mut intracomm = SingleRankIntraComm;
        let received = run_received_side(
            MeshId(0),
            "fluid-surface-copy",
            &region,
            GeometricFilter::FilterFirst,
            safety_factor,
            "structure",
            &mut intracomm,
            &mut received_link,
        )
        .unwrap();

        assert!(!received.vertices().is_empty());
        assert!(received.vertices().len() < provided.vertices().len());
        for vertex in received.vertices() {
            assert!(inflated.contains(&vertex.coords), "kept vertex outside inflated region: {:?}", vertex.coords);
        }

        let margin = 0.05_f64;
        let clearly_outside = provided
            .vertices()
            .iter()
            .filter(|v| {
                (0..3).any(|axis| v.coords[axis] < inflated.min()[axis] - margin || v.coords[axis] > inflated.max()[axis] + margin)
            })
            .count();
        let kept_clearly_outside = received
            .vertices()
            .iter()
            .filter(|v| {
                (0..3).any(|axis| v.coords[axis] < inflated.min()[axis] - margin || v.coords[axis] > inflated.max()[axis] + margin)
            })
            .count();
        assert!(clearly_outside > 0, "fixture didn't produce any clearly-outside vertices");
        assert_eq!(kept_clearly_outside, 0);
    });
}

/// Scenario: ownership determinism. Partitioning the same provided mesh
/// twice under the same rank count assigns every vertex to the same owner
/// both times.
#[test]
fn ownership_assignment_is_deterministic_across_runs() {
    let provided = random_mesh(0x5eed_1234, 64);
    let region = unit_cube_region();

    let run = || {
        let (mut provided_link, mut received_link) = ChannelTransport::pair();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let mut intracomm = SingleRankIntraComm;
                run_provided_side(&provided, "fluid", &mut intracomm, &mut provided_link).unwrap();
            });

            let mut intracomm = SingleRankIntraComm;
            let received = run_received_side(
                MeshId(0),
                "fluid-surface-copy",
                &region,
                GeometricFilter::NoFilter,
                0.1,
                "structure",
                &mut intracomm,
                &mut received_link,
            )
            .unwrap();

            let mut owned: Vec<u64> = received.vertices().iter().filter(|v| v.owner).map(|v| v.id.0).collect();
            owned.sort();
            owned
        })
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

/// Builds a 2-rank `TransportIntraComm` group: a master (rank 0) and one
/// secondary (rank 1), linked by an in-process channel, the way
/// `intracomm::tests::make_group` does for bare-collective tests.
fn two_rank_group() -> (TransportIntraComm, TransportIntraComm) {
    let (master_side, secondary_side) = ChannelTransport::pair();
    let master = TransportIntraComm::new_master(2, vec![Box::new(master_side) as Box<dyn Transport>]);
    let secondary = TransportIntraComm::new_secondary(1, 2, Box::new(secondary_side));
    (master, secondary)
}

fn wide_region() -> BoundingBox<3> {
    let mut region = BoundingBox::<3>::empty();
    region.expand_by_point(&Vector::from([-10.0, -10.0, -10.0]));
    region.expand_by_point(&Vector::from([10.0, 10.0, 10.0]));
    region
}

/// Scenario: ownership determinism and the `GatherScatter` master-relay path
/// under a real multi-rank topology on both participants, not the trivial
/// `num_ranks == 1` every other partition/m2n test in this file uses. Fluid
/// has 2 ranks contributing 2 vertices each; structure has 2 ranks, both
/// keeping the full 4-vertex mesh under `NoFilter`, so ownership assignment
/// has to split genuinely overlapping candidates across ranks rather than
/// just echoing one rank's filter output, and the master-computed
/// `bucket_start`/`local_index_of`/scatter-reply indexing actually has more
/// than one bucket to get right.
#[test]
fn multi_rank_partition_and_gather_scatter_exchange() {
    let (fluid_master_comm, fluid_secondary_comm) = two_rank_group();
    let (structure_master_comm, structure_secondary_comm) = two_rank_group();
    let (fluid_peer, structure_peer) = ChannelTransport::pair();

    std::thread::scope(|scope| {
        // fluid rank 0 (master): contributes global vertices 0, 1 and, once
        // the handshake completes, relays gathered Forces values to
        // structure's master over the inter-participant link.
        let fluid_master = scope.spawn(move || {
            let mut mesh = Mesh::<3>::new(MeshId(0), "fluid-surface");
            mesh.add_vertex(Vertex::new(VertexId(0), Vector::from([0.0, 0.0, 0.0])));
            mesh.add_vertex(Vertex::new(VertexId(1), Vector::from([1.0, 0.0, 0.0])));

            run_provided_side(&mesh, "fluid", &mut fluid_master_comm, &mut fluid_peer).unwrap();

            let mut m2n =
                GatherScatter::new(fluid_master_comm, Some(Box::new(fluid_peer)), vec![0, 1], vec![], "structure");
            m2n.send(&[10.0, 20.0], 1, Constraint::Consistent).unwrap();
        });

        // fluid rank 1 (secondary): contributes global vertices 2, 3. It
        // never touches the inter-participant link, so a `NullTransport`
        // fills the `peer_master` parameter every rank's call site needs.
        let fluid_secondary = scope.spawn(move || {
            let mut mesh = Mesh::<3>::new(MeshId(0), "fluid-surface");
            mesh.add_vertex(Vertex::new(VertexId(2), Vector::from([2.0, 0.0, 0.0])));
            mesh.add_vertex(Vertex::new(VertexId(3), Vector::from([3.0, 0.0, 0.0])));

            let mut unused_peer = NullTransport::new();
            run_provided_side(&mesh, "fluid", &mut fluid_secondary_comm, &mut unused_peer).unwrap();

            let mut m2n = GatherScatter::new(fluid_secondary_comm, None, vec![0, 1], vec![], "structure");
            m2n.send(&[30.0, 40.0], 1, Constraint::Consistent).unwrap();
        });

        // structure rank 0 (master): keeps all 4 vertices under `NoFilter`
        // and should end up owning the lower half under fair-share.
        let structure_master = scope.spawn(move || {
            let region = wide_region();
            let received = run_received_side(
                MeshId(0),
                "fluid-surface-copy",
                &region,
                GeometricFilter::NoFilter,
                0.1,
                "structure",
                &mut structure_master_comm,
                &mut structure_peer,
            )
            .unwrap();

            assert_eq!(received.vertices().len(), 4);
            assert_eq!(received.vertex_offsets, vec![0, 2, 4]);
            let owned: Vec<usize> = received
                .vertices()
                .iter()
                .enumerate()
                .filter(|(_, v)| v.owner)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(owned, vec![0, 1]);
            let owned_globals: Vec<usize> =
                owned.iter().map(|&i| received.vertices()[i].global_index.unwrap()).collect();

            let mut m2n = GatherScatter::new(
                structure_master_comm,
                Some(Box::new(structure_peer)),
                owned,
                received.vertex_offsets.clone(),
                "fluid",
            );
            let mut values = vec![0.0; 4];
            m2n.receive(&mut values, 1, Constraint::Consistent).unwrap();
            (owned_globals, values)
        });

        // structure rank 1 (secondary): same full mesh, should own the
        // upper half.
        let structure_secondary = scope.spawn(move || {
            let region = wide_region();
            let mut unused_peer = NullTransport::new();
            let received = run_received_side(
                MeshId(0),
                "fluid-surface-copy",
                &region,
                GeometricFilter::NoFilter,
                0.1,
                "structure",
                &mut structure_secondary_comm,
                &mut unused_peer,
            )
            .unwrap();

            let owned: Vec<usize> = received
                .vertices()
                .iter()
                .enumerate()
                .filter(|(_, v)| v.owner)
                .map(|(i, _)| i)
                .collect();
            assert_eq!(owned, vec![2, 3]);
            let owned_globals: Vec<usize> =
                owned.iter().map(|&i| received.vertices()[i].global_index.unwrap()).collect();

            let mut m2n = GatherScatter::new(structure_secondary_comm, None, owned, vec![], "fluid");
            let mut values = vec![0.0; 4];
            m2n.receive(&mut values, 1, Constraint::Consistent).unwrap();
            (owned_globals, values)
        });

        fluid_master.join().unwrap();
        fluid_secondary.join().unwrap();
        let (master_globals, master_values) = structure_master.join().unwrap();
        let (secondary_globals, secondary_values) = structure_secondary.join().unwrap();

        // Testable property 1 (§8): the multiset-union over all ranks of
        // owned vertex global-indices equals `{0..N-1}`, only non-trivial to
        // check once more than one rank is actually involved.
        let mut all_globals = master_globals;
        all_globals.extend(secondary_globals);
        all_globals.sort();
        assert_eq!(all_globals, vec![0, 1, 2, 3]);

        // Each structure rank received exactly its own owned slice of the
        // data fluid sent, relayed master-to-master and scattered back out —
        // the secondary-ranks-relay-through-master path that only runs with
        // secondary ranks actually present.
        assert_eq!(master_values[0], 10.0);
        assert_eq!(master_values[1], 20.0);
        assert_eq!(secondary_values[2], 30.0);
        assert_eq!(secondary_values[3], 40.0);
    });
}
