pub mod error;
pub mod mem;
pub mod ops;
pub mod pg;
mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use store::Store;
