use thiserror::Error;

pub type Result<T> = std::result::Result<T, MembraneError>;

#[derive(Debug, Error)]
pub enum MembraneError {
    #[error("Construction error: {0}")]
    Construction(String),

    #[error("Serving error: {0}")]
    Serving(String),
}
