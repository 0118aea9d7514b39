use thiserror::Error;
use ventwall_common::model::ModelValidationError;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The document an update or adjustment targeted does not exist. Deletes
    /// of missing documents are not errors, they report `false` instead.
    #[error("The target document was not found")]
    NotFound,
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
