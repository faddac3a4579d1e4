pub mod admission;
pub mod session;

pub use admission::{AdmissionGate, AllowedOrigins};
pub use session::{MemorySessionStore, SessionContext, SessionSettings};
