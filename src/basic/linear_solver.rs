use std::str::FromStr;

use derive_more::derive::{Display, Error};
use serde::{Deserialize, Serialize};

/// Outcome of a factorize or solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LinearSolverTerminationType {
    Success,
    /// Bad input data, e.g. a matrix that is not positive definite.
    Failure,
    /// Unrecoverable error inside the linear algebra library.
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum LinearSolverError {
    #[display("{message}")]
    Failure { message: String },
    #[display("{message}")]
    Fatal { message: String },
}

impl LinearSolverError {
    pub fn failure(message: impl Into<String>) -> Self {
        LinearSolverError::Failure {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        LinearSolverError::Fatal {
            message: message.into(),
        }
    }

    pub fn termination_type(&self) -> LinearSolverTerminationType {
        match self {
            LinearSolverError::Failure { .. } => LinearSolverTerminationType::Failure,
            LinearSolverError::Fatal { .. } => LinearSolverTerminationType::Fatal,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LinearSolverError::Failure { message } | LinearSolverError::Fatal { message } => message,
        }
    }
}

/// `Ok(())` is a successful termination. The solution buffer of a solve call
/// must not be used unless the result is `Ok`.
pub type LinearSolverResult = Result<(), LinearSolverError>;

pub fn termination_type(result: &LinearSolverResult) -> LinearSolverTerminationType {
    match result {
        Ok(()) => LinearSolverTerminationType::Success,
        Err(e) => e.termination_type(),
    }
}

/// Sparse linear algebra libraries a [`SparseCholesky`](crate::prelude::SparseCholesky)
/// can be built on. Every variant exists in every build; whether it can be
/// instantiated depends on the cargo features the crate was compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SparseLinearAlgebraLibraryType {
    #[display("faer")]
    Faer,
    #[display("rsparse")]
    RSparse,
}

impl SparseLinearAlgebraLibraryType {
    pub const ALL: [SparseLinearAlgebraLibraryType; 2] = [
        SparseLinearAlgebraLibraryType::Faer,
        SparseLinearAlgebraLibraryType::RSparse,
    ];

    /// Whether support for this library was compiled in.
    pub const fn is_compiled(self) -> bool {
        match self {
            SparseLinearAlgebraLibraryType::Faer => cfg!(feature = "faer"),
            SparseLinearAlgebraLibraryType::RSparse => cfg!(feature = "rsparse"),
        }
    }
}

/// Libraries available in this build, in order of preference.
pub fn compiled_libraries() -> Vec<SparseLinearAlgebraLibraryType> {
    SparseLinearAlgebraLibraryType::ALL
        .into_iter()
        .filter(|l| l.is_compiled())
        .collect()
}

impl Default for SparseLinearAlgebraLibraryType {
    fn default() -> Self {
        compiled_libraries()
            .first()
            .copied()
            .unwrap_or(SparseLinearAlgebraLibraryType::Faer)
    }
}

impl FromStr for SparseLinearAlgebraLibraryType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SparseLinearAlgebraLibraryType::ALL
            .into_iter()
            .find(|l| l.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownLibrary {
                name: s.to_string(),
            })
    }
}

/// An impossible solver configuration. Distinct from [`LinearSolverError`]:
/// this is never caused by the numbers in a matrix.
#[derive(Debug, Display, Error)]
pub enum ConfigurationError {
    #[display("this build was compiled without support for {_0}")]
    LibraryNotCompiled(#[error(not(source))] SparseLinearAlgebraLibraryType),
    #[display("unknown sparse linear algebra library type: {name}")]
    UnknownLibrary { name: String },
    #[display("invalid linear solver options: {_0}")]
    InvalidOptions(serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSolverOptions {
    pub sparse_linear_algebra_library_type: SparseLinearAlgebraLibraryType,
    /// Factorize and solve in `f32`, converting at the boundary.
    pub use_mixed_precision_solves: bool,
    /// Use a fill-reducing (AMD) ordering instead of the natural one.
    pub use_postordering: bool,
    /// Number of refinement passes after each solve; `0` disables refinement.
    pub max_num_refinement_iterations: usize,
}

impl Default for LinearSolverOptions {
    fn default() -> Self {
        Self {
            sparse_linear_algebra_library_type: SparseLinearAlgebraLibraryType::default(),
            use_mixed_precision_solves: false,
            use_postordering: false,
            max_num_refinement_iterations: 0,
        }
    }
}

impl LinearSolverOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(ConfigurationError::InvalidOptions)
    }
}
