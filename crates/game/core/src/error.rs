//! Common error infrastructure for memory-core.
//!
//! This module provides the shared severity classification used by every
//! error type in the crate. Domain-specific errors (`FlipRejection`,
//! `SessionError`, `ValidationError`) live next to the rules they enforce.
//!
//! # Design Principles
//!
//! - **Type Safety**: Each concern has its own error type with specific variants
//! - **Severity Classification**: Errors are categorized so callers can pick a
//!   handling strategy (ignore, surface to the player, investigate)
//! - **Expected races are not faults**: a flip that loses a race against the
//!   board lock is `Recoverable`, never `Internal`

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: Expected conditions from fast or stale input; drop and continue
/// - **Validation**: Invalid input that should be rejected and reported
/// - **Internal**: Unexpected state inconsistencies that require investigation
/// - **Fatal**: Unrecoverable errors indicating corrupted state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - the request raced with the engine and can be dropped.
    ///
    /// Examples: flip while the board is evaluating a pair, flip on a face-up card
    Recoverable,

    /// Validation error - invalid input, should not retry without changes.
    ///
    /// Examples: incomplete registration, durations changed mid-session
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// These indicate bugs and should be investigated.
    Internal,

    /// Fatal error - state corrupted, cannot continue.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all memory-core errors.
///
/// # Implementation Guidelines
///
/// - All error enums should implement this trait
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait GameError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for log fields and test assertions.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
