pub mod catalog;
pub mod category;
pub mod engine;
pub mod error;
pub mod locale;
pub mod result;
pub mod review;
pub mod score;
pub mod session;
pub mod shuffle;
pub mod transport;

// Re-export common error type
pub use error::{Result, VetterError};

pub use catalog::{Question, QuestionCatalog, DEFAULT_LANGUAGE};
pub use category::{Category, CategoryCounts, Letter, CATEGORY_COUNT};
pub use engine::{ConversationEngine, EngineOutcome, ReviewRequest};
pub use locale::LocaleRegistry;
pub use result::{ResultRepository, TestResult, TestStatus};
pub use review::{ReviewDispatcher, Verdict};
pub use session::{ConversationState, ProgressStore, Session};
pub use shuffle::OptionOrder;
pub use transport::{
    Choice, DeliveryError, InboundEvent, InboundKind, MessageRef, Outgoing, RespondentId,
    RespondentProfile, Transport,
};
