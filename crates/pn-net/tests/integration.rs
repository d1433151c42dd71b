//! Integration tests for pn-net.

use pn_core::{PoreId, ThroatId};
use pn_net::NetworkBuilder;

#[test]
fn build_minimal_network() {
    // Build: P0 -t0- P1
    let mut builder = NetworkBuilder::new();
    let p0 = builder.add_pore();
    let p1 = builder.add_pore();
    let t0 = builder.add_throat(p0, p1);

    let net = builder.build().unwrap();

    assert_eq!(net.pore_count(), 2);
    assert_eq!(net.throat_count(), 1);
    assert_eq!(net.throat_conns(t0), Some([p0, p1]));
    assert_eq!(net.pore_throats(p0), &[t0]);
    assert_eq!(net.pore_throats(p1), &[t0]);
    assert_eq!(net.other_end(t0, p0), Some(p1));
    assert_eq!(net.other_end(t0, p1), Some(p0));
}

#[test]
fn chain_adjacency() {
    // Build: P0 -t0- P1 -t1- P2
    let mut builder = NetworkBuilder::new();
    let p0 = builder.add_pore();
    let p1 = builder.add_pore();
    let p2 = builder.add_pore();
    let t0 = builder.add_throat(p0, p1);
    let t1 = builder.add_throat(p1, p2);

    let net = builder.build().unwrap();

    assert_eq!(net.pore_throats(p0), &[t0]);
    assert_eq!(net.pore_throats(p1), &[t0, t1]);
    assert_eq!(net.pore_throats(p2), &[t1]);
}

#[test]
fn empty_network() {
    let builder = NetworkBuilder::new();
    let net = builder.build().unwrap();
    assert_eq!(net.pore_count(), 0);
    assert_eq!(net.throat_count(), 0);
}

#[test]
fn coords_round_trip() {
    let mut builder = NetworkBuilder::new();
    let p0 = builder.add_pore();
    let p1 = builder.add_pore();
    builder.add_throat(p0, p1);
    builder.set_coords(vec![[0.0, 0.0, 0.0], [1e-4, 0.0, 0.0]]);

    let net = builder.build().unwrap();
    let coords = net.coords().unwrap();
    assert_eq!(coords.len(), 2);
    assert_eq!(coords[1][0], 1e-4);
}

#[test]
fn invalid_topology_is_rejected() {
    // Dangling endpoint
    let mut builder = NetworkBuilder::new();
    let p0 = builder.add_pore();
    builder.add_throat(p0, PoreId::from_index(7));
    let err = builder.build().unwrap_err();
    assert!(format!("{err}").contains("non-existent pore"));

    // Self loop
    let mut builder = NetworkBuilder::new();
    let p0 = builder.add_pore();
    builder.add_pore();
    builder.add_throat(p0, p0);
    assert!(builder.build().is_err());
}

#[test]
fn large_chain() {
    let mut builder = NetworkBuilder::new();
    builder.add_pores(10_000);
    for i in 0..9_999 {
        builder.add_throat(PoreId::from_index(i), PoreId::from_index(i + 1));
    }
    let net = builder.build().unwrap();

    assert_eq!(net.pore_count(), 10_000);
    assert_eq!(net.throat_count(), 9_999);
    // Interior pores see both neighbours, in throat order
    let mid = PoreId::from_index(5_000);
    assert_eq!(
        net.pore_throats(mid),
        &[ThroatId::from_index(4_999), ThroatId::from_index(5_000)]
    );
}

#[test]
fn networks_are_shareable_across_threads() {
    // Read-only topology can back concurrent independent runs
    let mut builder = NetworkBuilder::new();
    let p0 = builder.add_pore();
    let p1 = builder.add_pore();
    builder.add_throat(p0, p1);
    let net = builder.build().unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(net.pore_throats(p0).len(), 1);
            });
        }
    });
}
