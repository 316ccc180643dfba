pub mod access_gate;
pub mod auth_gate;
pub mod request_context;

pub use access_gate::{access_gate, authorize};
pub use auth_gate::{auth_gate, authenticate};
pub use request_context::request_context_middleware;
