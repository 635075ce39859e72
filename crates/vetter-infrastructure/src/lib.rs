pub mod content;
pub mod dto;
pub mod instance_lock;
pub mod paths;
pub mod progress_store;
pub mod result_repository;
pub mod storage;

pub use content::{load_locale_tables, load_question_catalogs};
pub use instance_lock::InstanceLock;
pub use paths::VetterPaths;
pub use progress_store::FileProgressStore;
pub use result_repository::FileResultRepository;
pub use storage::{AtomicTomlError, AtomicTomlFile};
