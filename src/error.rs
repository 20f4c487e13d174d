use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotInitialized,
    PlantNotFound,
    TemplateNotFound,
    ChainNotFound,
    StepNotFound,
    AssignmentNotFound,
    TaskNotFound,
    AmbiguousRef,
    ChainNameConflict,
    InvalidState,
    Conflict,
    ApprovalRequired,
    Forbidden,
    ValidationError,
    DatabaseError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::PlantNotFound => "PLANT_NOT_FOUND",
            Self::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            Self::ChainNotFound => "CHAIN_NOT_FOUND",
            Self::StepNotFound => "STEP_NOT_FOUND",
            Self::AssignmentNotFound => "ASSIGNMENT_NOT_FOUND",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::AmbiguousRef => "AMBIGUOUS_REF",
            Self::ChainNameConflict => "CHAIN_NAME_CONFLICT",
            Self::InvalidState => "INVALID_STATE",
            Self::Conflict => "CONFLICT",
            Self::ApprovalRequired => "APPROVAL_REQUIRED",
            Self::Forbidden => "FORBIDDEN",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct SproutError {
    pub code: ErrorCode,
    pub message: String,
}

impl SproutError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_initialized() -> Self {
        Self::new(
            ErrorCode::NotInitialized,
            "sprout is not initialized. Run `sprout init` first.",
        )
    }

    pub fn plant_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::PlantNotFound,
            format!("Plant not found: {reference}"),
        )
    }

    pub fn template_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::TemplateNotFound,
            format!("Task template not found: {reference}"),
        )
    }

    pub fn chain_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::ChainNotFound,
            format!("Task chain not found: {reference}"),
        )
    }

    pub fn step_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::StepNotFound,
            format!("Chain step not found: {reference}"),
        )
    }

    pub fn assignment_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::AssignmentNotFound,
            format!("Chain assignment not found: {reference}"),
        )
    }

    pub fn task_not_found(reference: &str) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Care task not found: {reference}"),
        )
    }

    pub fn ambiguous_ref(reference: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::AmbiguousRef,
            format!(
                "Ambiguous reference '{}'. Candidates: {}",
                reference,
                candidates.join(", ")
            ),
        )
    }

    pub fn chain_name_conflict(name: &str) -> Self {
        Self::new(
            ErrorCode::ChainNameConflict,
            format!("Chain with name '{name}' already exists"),
        )
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn approval_required(step_id: &str) -> Self {
        Self::new(
            ErrorCode::ApprovalRequired,
            format!("Step {step_id} requires approval before it can be completed"),
        )
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }
}

impl From<rusqlite::Error> for SproutError {
    fn from(e: rusqlite::Error) -> Self {
        Self::database(e.to_string())
    }
}
