//! Application-level error with a process exit code.
//!
//! Domain errors are typed (`ArtifactError`, `PipelineError`, ...) and converted
//! here at the front-end boundary.
//!
//! Exit codes:
//! - 2: bad input or I/O on user-supplied files
//! - 3: model/encoder artifacts missing, unreadable or corrupt
//! - 4: terminal/runtime failure
//! - 5: model contract violation (artifacts built against another schema)

use crate::app::pipeline::PipelineError;
use crate::io::artifacts::ArtifactError;

pub const EXIT_INPUT: u8 = 2;
pub const EXIT_ARTIFACT: u8 = 3;
pub const EXIT_RUNTIME: u8 = 4;
pub const EXIT_CONTRACT: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        let code = match err {
            ArtifactError::Schema { .. } => EXIT_CONTRACT,
            _ => EXIT_ARTIFACT,
        };
        AppError::new(code, format!("Startup failed: {err}"))
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let code = match err {
            PipelineError::Encoding(_) => EXIT_INPUT,
            PipelineError::NonFinitePrediction(_) => EXIT_RUNTIME,
            PipelineError::Contract(_) => EXIT_CONTRACT,
        };
        AppError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::io::artifacts::ArtifactKind;
    use crate::models::ContractViolation;

    #[test]
    fn missing_artifact_maps_to_artifact_exit_code() {
        let err: AppError = ArtifactError::Missing {
            kind: ArtifactKind::Model,
            path: PathBuf::from("co2_model.json"),
        }
        .into();
        assert_eq!(err.exit_code(), EXIT_ARTIFACT);
        assert_eq!(
            err.to_string(),
            "Startup failed: model artifact not found: co2_model.json"
        );
    }

    #[test]
    fn contract_violation_maps_to_contract_exit_code() {
        let err: AppError =
            PipelineError::Contract(ContractViolation::Shape { expected: 7, actual: 6 }).into();
        assert_eq!(err.exit_code(), EXIT_CONTRACT);

        let err: AppError = PipelineError::NonFinitePrediction(f64::NAN).into();
        assert_eq!(err.exit_code(), EXIT_RUNTIME);
    }
}
