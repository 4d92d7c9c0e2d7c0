use thiserror::Error as ThisError;

/// Result alias for `manigraph`.
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned when an adjacency matrix is requested without a data matrix.
pub const DISTANCE_ERROR_MSG: &str = "no data matrix set: the adjacency matrix can only be \
     computed from a data matrix, use set_data_matrix() first";

/// Message returned when an affinity matrix is requested without data or adjacency.
pub const AFFINITY_ERROR_MSG: &str = "no data or adjacency matrix set: the affinity matrix can \
     only be computed from a data matrix or an adjacency matrix, use set_data_matrix() or \
     set_adjacency_matrix() first";

/// Message returned when a Laplacian is requested before any source was set.
pub const LAPLACIAN_ERROR_MSG: &str = "no data, adjacency or affinity matrix set: use \
     set_data_matrix(), set_adjacency_matrix() or set_affinity_matrix() first";

/// Pipeline stage, used to qualify method-lookup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Neighbor (distance) graph construction.
    Adjacency,
    /// Kernel transform of a distance graph.
    Affinity,
    /// Laplacian normalization of an affinity graph.
    Laplacian,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Adjacency => "adjacency",
            Stage::Affinity => "affinity",
            Stage::Laplacian => "laplacian",
        };
        f.write_str(name)
    }
}

/// Errors returned by the stage functions and the [`Geometry`](crate::Geometry) pipeline.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum Error {
    /// The requested stage cannot be derived from the pipeline's current source.
    #[error("{0}")]
    InvalidSource(&'static str),

    /// No strategy is registered under this name for the stage.
    #[error("unknown {stage} method '{method}'")]
    UnknownMethod {
        /// Stage the lookup was made for.
        stage: Stage,
        /// Requested method name.
        method: String,
    },

    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// A graph matrix was not square.
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
    },

    /// A graph matrix was not symmetric at the given entry.
    #[error("matrix is not symmetric at ({row}, {col})")]
    NotSymmetric {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// Matrix dimension mismatch.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// A NaN or infinite value, or a negative graph weight.
    #[error("invalid value at ({row}, {col}): entries must be finite and non-negative")]
    NonFinite {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// A parameter the chosen method does not recognize.
    #[error("method '{method}' does not accept parameter '{name}'")]
    UnknownParameter {
        /// Method that rejected the parameter.
        method: String,
        /// Parameter name.
        name: String,
    },
}

impl Error {
    pub(crate) fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// True for errors describing a malformed matrix or parameter set.
    pub fn is_malformed_input(&self) -> bool {
        !matches!(self, Error::InvalidSource(_) | Error::UnknownMethod { .. })
    }
}
