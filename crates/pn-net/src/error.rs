//! Network-specific error types.

use pn_core::{CoreError, PoreId, ThroatId};

/// Network construction and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    /// A throat refers to a pore that doesn't exist.
    InvalidPoreRef { throat: ThroatId, pore: PoreId },

    /// A throat joins a pore to itself.
    SelfLoop { throat: ThroatId, pore: PoreId },

    /// Coordinate array length doesn't match the pore count.
    CoordsLenMismatch { expected: usize, actual: usize },

    /// Adjacency list is inconsistent (throat in a pore's list but the
    /// throat doesn't reference that pore).
    InconsistentAdjacency { throat: ThroatId, pore: PoreId },
}

impl std::fmt::Display for NetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetError::InvalidPoreRef { throat, pore } => {
                write!(f, "Throat {} refers to non-existent pore {}", throat, pore)
            }
            NetError::SelfLoop { throat, pore } => {
                write!(f, "Throat {} joins pore {} to itself", throat, pore)
            }
            NetError::CoordsLenMismatch { expected, actual } => {
                write!(
                    f,
                    "Coordinate array has {} entries for {} pores",
                    actual, expected
                )
            }
            NetError::InconsistentAdjacency { throat, pore } => {
                write!(
                    f,
                    "Throat {} in pore {}'s adjacency list but doesn't reference that pore",
                    throat, pore
                )
            }
        }
    }
}

impl std::error::Error for NetError {}

impl From<NetError> for CoreError {
    fn from(err: NetError) -> Self {
        CoreError::Invariant {
            what: Box::leak(err.to_string().into_boxed_str()),
        }
    }
}
