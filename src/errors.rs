//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`ArmatureError`] covers the failure modes of the
//! save/load paths:
//! - I/O failures while reading or writing a stream
//! - Malformed or truncated serialized data
//!
//! Out-of-range clip or frame indices are *not* represented here: they
//! are programming errors and the affected methods panic instead (each
//! method documents this).
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ArmatureError>`.

use thiserror::Error;

/// The main error type for the armature crate.
#[derive(Error, Debug)]
pub enum ArmatureError {
    /// File or stream I/O failure during save/load. Truncated streams
    /// surface here as `UnexpectedEof`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream does not start with the expected magic number.
    #[error("Invalid magic number: expected '{expected}', got '{actual}'")]
    InvalidMagic {
        /// The magic this crate writes
        expected: String,
        /// The bytes actually found
        actual: String,
    },

    /// The stream declares a format version this crate does not understand.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// A size field or payload is inconsistent with the rest of the stream.
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),
}

/// Alias for `Result<T, ArmatureError>`.
pub type Result<T> = std::result::Result<T, ArmatureError>;
