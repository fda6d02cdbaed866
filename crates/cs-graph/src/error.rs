//! Graph-specific error types.

use cs_core::{CircuitId, CsError, ElemId, NodeId, TermId};
use thiserror::Error;

/// Circuit construction and arena errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A terminal refers to a node that doesn't exist.
    #[error("Terminal {term} refers to non-existent node {node}")]
    InvalidNodeRef { term: TermId, node: NodeId },

    /// A terminal refers to an element that doesn't exist.
    #[error("Terminal {term} refers to non-existent element {elem}")]
    InvalidElemRef { term: TermId, elem: ElemId },

    /// An element has duplicate terminal IDs.
    #[error("Element {elem} has duplicate terminal IDs")]
    DuplicateTerminals { elem: ElemId },

    /// A terminal's element field doesn't match the element containing it.
    #[error("Terminal {term} should belong to element {expected} but references {actual}")]
    TermElemMismatch {
        term: TermId,
        expected: ElemId,
        actual: ElemId,
    },

    /// Adjacency list is inconsistent (terminal in node's list but terminal doesn't reference node).
    #[error("Terminal {term} in node {node}'s adjacency list but doesn't reference that node")]
    InconsistentAdjacency { term: TermId, node: NodeId },

    /// No reference node was designated.
    #[error("Circuit has no reference node")]
    MissingReference,

    /// A port names a node that doesn't exist.
    #[error("Port '{name}' refers to non-existent node {node}")]
    InvalidPort { name: String, node: NodeId },

    /// A control link points at a missing element or starts from a non-controlled element.
    #[error("Element {elem} cannot be controlled by element {control}")]
    InvalidControl { elem: ElemId, control: ElemId },

    /// A sub-block is not strictly below the circuit embedding it.
    #[error("Level {parent_level} circuit cannot embed circuit {child} of level {child_level}")]
    LevelOrder {
        parent_level: u8,
        child: CircuitId,
        child_level: u8,
    },

    /// Level beyond the supported hierarchy depth.
    #[error("Level {level} exceeds maximum level {max}")]
    LevelOutOfRange { level: u8, max: u8 },

    /// Circuit id not present in the arena.
    #[error("Circuit {id} not in arena")]
    UnknownCircuit { id: CircuitId },

    /// ID not found.
    #[error("{what} not found")]
    IdNotFound { what: &'static str },
}

pub type GraphResult<T> = Result<T, GraphError>;

impl From<GraphError> for CsError {
    fn from(err: GraphError) -> Self {
        CsError::Invariant {
            what: err.to_string(),
        }
    }
}
