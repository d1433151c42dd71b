//! pn-net: pore/throat network substrate for porenet.
//!
//! Provides:
//! - Core network data structures (Network with compact adjacency)
//! - Incremental network builder with validation
//!
//! Topology is fixed once built; geometric and physical properties
//! (entry pressures, volumes) live outside the network and are handed
//! to the percolation engines directly.
//!
//! # Example
//!
//! ```
//! use pn_net::NetworkBuilder;
//!
//! let mut builder = NetworkBuilder::new();
//! let p0 = builder.add_pore();
//! let p1 = builder.add_pore();
//! let t0 = builder.add_throat(p0, p1);
//! let net = builder.build().unwrap();
//!
//! assert_eq!(net.pore_count(), 2);
//! assert_eq!(net.throat_count(), 1);
//! assert_eq!(net.pore_throats(p0), &[t0]);
//! ```

pub mod builder;
pub mod error;
pub mod net;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::NetworkBuilder;
pub use error::NetError;
pub use net::Network;
