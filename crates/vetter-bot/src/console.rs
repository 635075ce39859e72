//! Console transport.
//!
//! A local stand-in for a chat backend: messages print to stdout and every
//! delivery gets a synthetic reference so retraction can be exercised.
//! Useful for manual walkthroughs and for running the full stack without
//! network access.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use vetter_core::{DeliveryError, MessageRef, Outgoing, RespondentId, Transport};

#[derive(Default)]
pub struct ConsoleTransport {
    counter: AtomicU64,
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(
        &self,
        recipient: RespondentId,
        message: Outgoing,
    ) -> Result<MessageRef, DeliveryError> {
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        println!("--> [{recipient}] {}", message.text);
        for choice in &message.choices {
            println!("      ({}) {}", choice.data, choice.label);
        }
        Ok(MessageRef(format!("console-{id}")))
    }

    async fn retract(
        &self,
        recipient: RespondentId,
        message: &MessageRef,
    ) -> Result<(), DeliveryError> {
        println!("--> [{recipient}] retracted {}", message.0);
        Ok(())
    }
}
