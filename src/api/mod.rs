//! Typed access to the incident/document backend.

pub mod documents;
pub mod error;
pub mod http;
pub mod incidents;
pub mod status;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use documents::DocumentsClient;
pub use error::{ApiError, ErrorKind, ProblemDetails};
pub use http::Gateway;
pub use incidents::IncidentsClient;
pub use status::StatusClient;
