use thiserror::Error;

pub type Result<T> = std::result::Result<T, PanSecError>;

#[derive(Error, Debug)]
pub enum PanSecError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid risk thresholds: {0}")]
    InvalidRiskConfig(String),

    #[error("Process error ({command}): {message}")]
    Process { command: String, message: String },

    #[error("Installer error: {0}")]
    Installer(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PanSecError {
    /// Configuration problems are reported before any scan work starts and
    /// get their own exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::InvalidRiskConfig(_) | Self::Toml(_) => 2,
            _ => 1,
        }
    }
}
