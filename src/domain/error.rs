//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::system::SystemId;

/// Domain errors represent structural violations of a system tree.
///
/// Only the checked operations report these; the plain structural
/// operations degrade to no-ops instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown system: {0:?}")]
    UnknownSystem(SystemId),

    #[error("system cannot be its own child: {0:?}")]
    SelfParent(SystemId),

    #[error("cycle detected: {child:?} is an ancestor of {parent:?}")]
    CycleDetected { parent: SystemId, child: SystemId },

    #[error("system {child:?} already has parent {parent:?}")]
    AlreadyParented { child: SystemId, parent: SystemId },
}

/// Result type for checked tree operations.
pub type DomainResult<T> = Result<T, DomainError>;
