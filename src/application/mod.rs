// Application layer - use cases over the ledger.

pub mod error;
pub mod service;
pub mod statement;

pub use error::*;
pub use service::*;
pub use statement::*;
