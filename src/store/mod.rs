//! Persistence layer — libSQL-backed storage for profiles, programs, and
//! the conversation log.

pub mod libsql_backend;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Conversation, Database, Program, UserProfile};
