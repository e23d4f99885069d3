//! Error types

mod batch;
mod export;
mod field;
mod plugin;
mod request;
mod validation;

pub use batch::*;
pub use export::*;
pub use field::*;
pub use plugin::*;
pub use request::*;
pub use validation::*;

/// Top-level error for table controller operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request function failed.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Plugin registration or lookup failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// A batch action was refused or failed.
    #[error(transparent)]
    BatchAction(#[from] BatchActionError),

    /// Export failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Record field access failed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Invalid configuration or argument.
    #[error("Invalid configuration: {0}")]
    Config(String),
}
