use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Endpoint errors
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid baud rate: {0}")]
    InvalidBaudRate(u32),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
