//! Error types for the `gemfield-world` crate.
//!
//! Registry operations are total and never fail; errors here only cover
//! constructing the grid geometry from configuration.

/// Errors that can occur while building world state.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The grid must have at least one column and one row.
    #[error("invalid grid dimensions: {width}x{depth}")]
    InvalidDimensions {
        /// Requested number of columns.
        width: i32,
        /// Requested number of rows.
        depth: i32,
    },

    /// Cell size must be a finite, strictly positive number.
    #[error("invalid cell size: {0}")]
    InvalidCellSize(f64),
}
