// Application layer - use cases and orchestration.
// Clients (HTTP, CLI) call into LedgerService; it owns validation and maps
// storage outcomes to AppError.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
