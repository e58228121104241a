//! Error types for parkchain operations.
//!
//! [`Error`] carries one variant per failure kind a caller may need to react
//! to. Validation failures are deterministic and client-correctable; storage
//! and configuration failures are wrapped in their own enums so the top-level
//! match stays small.

use crate::domain::{CarId, UserId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for parkchain operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The candidate relation has the same car on both ends.
    #[error("a car cannot block itself ({car})")]
    SelfBlocking {
        /// The offending car
        car: CarId,
    },

    /// The exact ordered pair is already recorded.
    #[error("relationship already exists: {blocking} -> {blocked}")]
    DuplicateRelation {
        /// Blocking side of the pair
        blocking: CarId,
        /// Blocked side of the pair
        blocked: CarId,
    },

    /// Recording the relation would close a loop.
    #[error("would create a circular dependency: {blocking} -> {blocked}")]
    CircularBlocking {
        /// Blocking side of the rejected pair
        blocking: CarId,
        /// Blocked side of the rejected pair
        blocked: CarId,
    },

    /// No relation matches the requested pair.
    #[error("relationship not found: {blocking} -> {blocked}")]
    RelationNotFound {
        /// Blocking side of the pair
        blocking: CarId,
        /// Blocked side of the pair
        blocked: CarId,
    },

    /// Nothing blocks the car, so there is no one to ask to move.
    #[error("car is not blocked: {0}")]
    NotBlocked(CarId),

    /// The car directory does not know this car.
    #[error("car not found: {0}")]
    CarNotFound(CarId),

    /// The car directory does not know this user.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The relation store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// Configuration could not be loaded or saved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Short, stable reason string suitable for API responses.
    pub fn reason(&self) -> &'static str {
        match self {
            Error::SelfBlocking { .. } => "a car cannot block itself",
            Error::DuplicateRelation { .. } => "relationship already exists",
            Error::CircularBlocking { .. } => "would create a circular dependency",
            Error::RelationNotFound { .. } => "relationship not found",
            Error::NotBlocked(_) => "car is not blocked",
            Error::CarNotFound(_) => "car not found",
            Error::UserNotFound(_) => "user not found",
            Error::Persistence(_) => "persistence error",
            Error::Config(_) => "configuration error",
        }
    }

    /// Returns `true` for failures the caller can fix by changing the request.
    ///
    /// These are never retried.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Error::Persistence(_) | Error::Config(_))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Persistence(StorageError::Io(err))
    }
}

/// Failures raised by a relation store backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error while reading or writing the backing file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A relation could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file is not valid JSONL.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The store already holds a relation for this ordered pair.
    #[error("unique constraint violated for {blocking} -> {blocked}")]
    UniqueViolation {
        /// Blocking side of the pair
        blocking: CarId,
        /// Blocked side of the pair
        blocked: CarId,
    },

    /// The record to delete does not exist.
    #[error("record not found: {0}")]
    MissingRecord(String),

    /// The backend cannot perform this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.parkchain/` directory was found above the working directory.
    #[error("Not a parkchain repository (or any parent). Run 'parkchain init' first.")]
    NotInitialized,

    /// `init` was run where a repository already exists.
    #[error("parkchain is already initialized in {0}")]
    AlreadyInitialized(PathBuf),

    /// The configuration names a backend this build does not know.
    #[error("unknown storage backend '{0}'. Valid values: memory, jsonl")]
    UnknownBackend(String),

    /// A configured path escapes the repository root.
    #[error("path '{0}' must stay inside the repository")]
    PathOutsideRepository(String),

    /// The YAML could not be parsed or written.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error while reading or writing configuration.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A specialized Result type for parkchain operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::self_blocking(Error::SelfBlocking { car: CarId(1) }, "a car cannot block itself")]
    #[case::duplicate(
        Error::DuplicateRelation { blocking: CarId(1), blocked: CarId(2) },
        "relationship already exists"
    )]
    #[case::circular(
        Error::CircularBlocking { blocking: CarId(3), blocked: CarId(1) },
        "would create a circular dependency"
    )]
    #[case::not_blocked(Error::NotBlocked(CarId(4)), "car is not blocked")]
    fn test_display_starts_with_reason(#[case] err: Error, #[case] reason: &str) {
        assert_eq!(err.reason(), reason);
        assert!(err.to_string().starts_with(reason), "got: {err}");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_persistence_is_not_client_error() {
        let err: Error = io::Error::other("disk on fire").into();
        assert!(matches!(err, Error::Persistence(StorageError::Io(_))));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("disk on fire"));
    }
}
