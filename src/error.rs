//! Error types for template rendering
//!
//! This module defines the error type shared by layout parsing, block
//! dispatch, and the drawing backend, providing clear error messages and
//! proper error propagation.

use thiserror::Error;

/// Custom error type for template rendering operations
#[derive(Error, Debug)]
pub enum RenderError {
    /// The layout JSON is structurally invalid (missing `sections`,
    /// missing `footer`, non-positive grid columns, malformed block
    /// descriptors that are not objects, and similar).
    #[error("Invalid layout: {0}")]
    MalformedLayout(String),

    /// A block's `type` tag has no registered renderer.
    #[error("Unknown block type '{kind}' (section {section}, item {index})")]
    UnknownBlockType {
        kind: String,
        section: usize,
        index: usize,
    },

    /// A block descriptor is missing a field its renderer requires.
    #[error("Block '{block}' is missing required field '{field}'")]
    MissingField {
        block: &'static str,
        field: &'static str,
    },

    /// Nested blocks (conditional/grid/section) recursed past the
    /// depth limit, which points at a malformed or cyclic layout.
    #[error("Block nesting exceeded maximum depth of {0}")]
    DepthExceeded(usize),

    /// The QR encoder rejected the payload (too long for the symbol).
    #[error("QR code generation failed: {0}")]
    QrError(String),
}

/// Result type alias for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
