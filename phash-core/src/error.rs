use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhashError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid hash format: {0}")]
    Format(String),

    #[error("Hash length mismatch: {left} bits vs {right} bits")]
    InputMismatch { left: usize, right: usize },

    #[error("Invalid hasher configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PhashError>;
