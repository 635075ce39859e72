//! Session domain model and persistence contract.

pub mod model;
pub mod repository;

pub use model::{ConversationState, Session};
pub use repository::ProgressStore;
