//! Error handling logic

use std::fmt;

/// Identifier of a node inside a [`History`](crate::History) arena.
/// `NodeId(0)` is always the source. Ids are only meaningful for the tree
/// they were obtained from; edits that drop subtrees renumber the survivors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Failures raised while building, editing or evaluating a history tree.
///
/// The engine never recovers from these locally; the consuming layer decides
/// whether to warn or to refuse the edit that produced the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The input does not describe a well-formed measurement event
    /// (missing angles for an `n` basis, magnet without magnitude, ...).
    Structural {
        /// Structural failure message
        message: String,
    },

    /// A Born-rule value fell outside `[-ε, 1+ε]` or kept a residual
    /// imaginary part above tolerance.
    NumericalAnomaly {
        /// Leaf whose probability is suspect
        node: NodeId,
        /// NumericalAnomaly failure message
        message: String,
    },

    /// Every unit of probability mass belongs to ignored leaves, so the
    /// conditional probabilities are undefined.
    DegenerateRenormalization {
        /// DegenerateRenormalization failure message
        message: String,
    },

    /// An edit that does not apply to the node it targets.
    InvalidEdit {
        /// Edited node
        node: NodeId,
        /// InvalidEdit failure message
        message: String,
    },

    /// The edit would grow a root-to-leaf path beyond the depth bound.
    DepthExceeded {
        /// Node that would receive the new children
        node: NodeId,
        /// Depth the new children would sit at
        depth: usize,
        /// Maximum permitted depth
        limit: usize,
    },

    /// The id does not address a node of this tree.
    UnknownNode {
        /// Missing id
        node: NodeId,
    },

    /// JSON encoding or decoding failed.
    Serialization {
        /// Serialization failure message
        message: String,
    },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Structural { message } => write!(f, "Malformed History: {}", message),
            HistoryError::NumericalAnomaly { node, message } => write!(f, "Numerical Anomaly ({}): {}", node, message),
            HistoryError::DegenerateRenormalization { message } => write!(f, "Degenerate Renormalization: {}", message),
            HistoryError::InvalidEdit { node, message } => write!(f, "Invalid Edit ({}): {}", node, message),
            HistoryError::DepthExceeded { node, depth, limit } => {
                write!(f, "Depth Exceeded ({}): children would sit at depth {} (limit {})", node, depth, limit)
            }
            HistoryError::UnknownNode { node } => write!(f, "Unknown Node: {} is not part of this history", node),
            HistoryError::Serialization { message } => write!(f, "Serialization Error: {}", message),
        }
    }
}

// Implement the standard Error trait to allow for easy integration with Rust error handling.
impl std::error::Error for HistoryError {}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Serialization { message: err.to_string() }
    }
}
