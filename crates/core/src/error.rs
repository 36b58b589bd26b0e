//! Domain error model.

use rust_decimal::Decimal;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// lifecycle legality, stock ceilings). Infrastructure concerns belong elsewhere.
///
/// None of these are fatal: every variant is surfaced as the result of the
/// operation that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Unknown reference, or a reference owned by someone else.
    ///
    /// Cross-owner lookups are indistinguishable from missing rows.
    #[error("not found")]
    NotFound,

    /// A value failed validation (non-positive amount, bad batch size, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A foreign key supplied by a collaborator (category, brand) is unknown.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The lifecycle action is not permitted from the item's current status.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The action does not apply to the item's kind (consumable vs durable).
    #[error("wrong item kind: {0}")]
    WrongKind(String),

    /// Durable stock is a hard ceiling; the request would consume more than remains.
    #[error("exceeds stock: requested {requested}, remaining {remaining}")]
    ExceedsStock {
        requested: Decimal,
        remaining: Decimal,
    },

    /// A uniqueness conflict reported by storage.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persisted state does not satisfy a domain invariant.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_reference(msg: impl Into<String>) -> Self {
        Self::InvalidReference(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn wrong_kind(msg: impl Into<String>) -> Self {
        Self::WrongKind(msg.into())
    }

    pub fn exceeds_stock(requested: Decimal, remaining: Decimal) -> Self {
        Self::ExceedsStock {
            requested,
            remaining,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
