//! Event dispatcher.
//!
//! Routes inbound events either to the reviewer decision path or to the
//! conversation engine, and executes the engine's outcome against the
//! transport: deliver replies, record the acknowledgement reference,
//! retract messages, and hand completed attempts to the reviewer.
//!
//! Events for the same respondent are serialized through a per-respondent
//! mutex; different respondents proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, warn};
use vetter_core::error::Result;
use vetter_core::{
    ConversationEngine, EngineOutcome, InboundEvent, InboundKind, RespondentId, ReviewDispatcher,
    Transport,
};

pub struct Dispatcher {
    engine: Arc<ConversationEngine>,
    review: Arc<ReviewDispatcher>,
    transport: Arc<dyn Transport>,
    reviewer: RespondentId,
    locks: RwLock<HashMap<i64, Arc<Mutex<()>>>>,
}

impl Dispatcher {
    pub fn new(
        engine: Arc<ConversationEngine>,
        review: Arc<ReviewDispatcher>,
        transport: Arc<dyn Transport>,
        reviewer: RespondentId,
    ) -> Self {
        Self {
            engine,
            review,
            transport,
            reviewer,
            locks: RwLock::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, respondent: RespondentId) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(&respondent.0) {
            return lock.clone();
        }
        self.locks
            .write()
            .await
            .entry(respondent.0)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Processes one inbound event end to end.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<()> {
        if event.respondent == self.reviewer {
            if let InboundKind::Button(ref data) = event.kind {
                return self.review.process_decision(data).await;
            }
        }

        let lock = self.lock_for(event.respondent).await;
        let _guard = lock.lock().await;

        let respondent = event.respondent;
        let outcome = self.engine.handle(event).await?;
        self.execute(respondent, outcome).await
    }

    async fn execute(&self, respondent: RespondentId, outcome: EngineOutcome) -> Result<()> {
        for (index, reply) in outcome.replies.into_iter().enumerate() {
            match self.transport.send(respondent, reply).await {
                Ok(message_ref) => {
                    if outcome.ack_reply == Some(index) {
                        self.engine.record_ack(respondent, &message_ref).await?;
                    }
                }
                Err(e) => {
                    error!(%respondent, error = %e, "failed to deliver reply");
                }
            }
        }

        if let Some(message_ref) = outcome.retract {
            if let Err(e) = self.transport.retract(respondent, &message_ref).await {
                // Best effort; the conversation continues either way.
                warn!(%respondent, error = %e, "failed to retract acknowledgement");
            }
        }

        if let Some(request) = outcome.review_request {
            self.review.notify_reviewer(&request).await?;
        }

        Ok(())
    }
}
