use thiserror::Error;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error("failed to spawn tool: {0}")]
    ToolSpawnFailed(String),

    #[error("invalid log date '{0}': expected YYYYMMDD")]
    InvalidDate(String),

    #[error("check failed: {0}")]
    Check(String),

    #[error("home directory not found: set HOME or pass --log-dir")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HookError {
    /// Short variant name recorded as `error_type` in audit records.
    pub fn kind(&self) -> &'static str {
        match self {
            HookError::MalformedEvent(_) => "MalformedEvent",
            HookError::ConfigNotFound(_) => "ConfigNotFound",
            HookError::ToolSpawnFailed(_) => "ToolSpawnFailed",
            HookError::InvalidDate(_) => "InvalidDate",
            HookError::Check(_) => "Check",
            HookError::HomeNotFound => "HomeNotFound",
            HookError::Io(_) => "Io",
            HookError::Yaml(_) => "Yaml",
            HookError::Json(_) => "Json",
        }
    }
}

pub type Result<T> = std::result::Result<T, HookError>;
