//! Full-stack walkthrough: dispatcher + engine + file-backed stores.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vetter_bot::Dispatcher;
use vetter_core::engine::callback;
use vetter_core::{
    Category, ConversationEngine, ConversationState, DeliveryError, InboundEvent, InboundKind,
    Letter, LocaleRegistry, MessageRef, Outgoing, ProgressStore, QuestionCatalog, RespondentId,
    RespondentProfile, ResultRepository, ReviewDispatcher, TestStatus, Transport,
};
use vetter_infrastructure::{FileProgressStore, FileResultRepository, VetterPaths};

const RESPONDENT: RespondentId = RespondentId(1001);
const REVIEWER: RespondentId = RespondentId(42);

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<(RespondentId, Outgoing)>>,
    retracted: Mutex<Vec<(RespondentId, MessageRef)>>,
    counter: AtomicU64,
}

impl RecordingTransport {
    fn sent_to(&self, respondent: RespondentId) -> Vec<Outgoing> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == respondent)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        recipient: RespondentId,
        message: Outgoing,
    ) -> Result<MessageRef, DeliveryError> {
        self.sent.lock().unwrap().push((recipient, message));
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(MessageRef(format!("msg-{id}")))
    }

    async fn retract(
        &self,
        recipient: RespondentId,
        message: &MessageRef,
    ) -> Result<(), DeliveryError> {
        self.retracted
            .lock()
            .unwrap()
            .push((recipient, message.clone()));
        Ok(())
    }
}

struct Stack {
    dispatcher: Dispatcher,
    transport: Arc<RecordingTransport>,
    progress: Arc<FileProgressStore>,
    results: Arc<FileResultRepository>,
    _dir: TempDir,
}

fn stack() -> Stack {
    let dir = TempDir::new().unwrap();
    let paths = VetterPaths::at(dir.path());
    let progress = Arc::new(FileProgressStore::new(paths.progress_dir()));
    let results = Arc::new(FileResultRepository::new(paths.results_dir()));
    let transport = Arc::new(RecordingTransport::default());

    let catalog = Arc::new(QuestionCatalog::builtin().unwrap());
    let locales = Arc::new(LocaleRegistry::builtin().unwrap());
    let engine = Arc::new(ConversationEngine::new(
        catalog,
        locales.clone(),
        progress.clone(),
        results.clone(),
    ));
    let review = Arc::new(ReviewDispatcher::new(
        transport.clone(),
        results.clone(),
        locales,
        REVIEWER,
    ));
    let dispatcher = Dispatcher::new(engine, review, transport.clone(), REVIEWER);

    Stack {
        dispatcher,
        transport,
        progress,
        results,
        _dir: dir,
    }
}

fn event(respondent: RespondentId, kind: InboundKind) -> InboundEvent {
    InboundEvent {
        respondent,
        profile: RespondentProfile {
            username: Some("tester".to_string()),
            first_name: Some("Test".to_string()),
        },
        kind,
    }
}

async fn press(stack: &Stack, data: &str) {
    stack
        .dispatcher
        .dispatch(event(RESPONDENT, InboundKind::Button(data.to_string())))
        .await
        .unwrap();
}

/// The letter that maps to `wanted` under the stored permutation for `index`.
async fn letter_for(stack: &Stack, index: usize, wanted: Category) -> Letter {
    let session = stack
        .progress
        .get(RESPONDENT)
        .await
        .unwrap()
        .expect("session on disk");
    let order = *session.option_order(index).expect("order recorded");
    *Letter::ALL
        .iter()
        .find(|letter| order.letter_to_category(**letter) == wanted)
        .unwrap()
}

#[tokio::test]
async fn full_conversation_with_review_decision() {
    let s = stack();

    s.dispatcher
        .dispatch(event(RESPONDENT, InboundKind::Command("start".to_string())))
        .await
        .unwrap();
    press(&s, "lang_en").await;
    press(&s, callback::CONSENT_YES).await;
    press(&s, callback::START_TEST).await;

    for index in 0..30 {
        let letter = letter_for(&s, index, Category::Two).await;
        press(&s, &format!("answer_{letter}")).await;
    }
    press(&s, callback::FINISH).await;

    s.dispatcher
        .dispatch(event(
            RESPONDENT,
            InboundKind::Photo {
                file_ref: "shot-1".to_string(),
            },
        ))
        .await
        .unwrap();

    // Reviewer received the summary with decision choices and the evidence.
    let to_reviewer = s.transport.sent_to(REVIEWER);
    assert_eq!(to_reviewer.len(), 1);
    assert!(to_reviewer[0].text.contains("shot-1"));
    let data: Vec<&str> = to_reviewer[0]
        .choices
        .iter()
        .map(|c| c.data.as_str())
        .collect();
    assert_eq!(data, vec!["accept_1001", "reject_1001"]);

    // The reviewer accepts; the respondent is notified and the record updated.
    s.dispatcher
        .dispatch(event(REVIEWER, InboundKind::Button("accept_1001".to_string())))
        .await
        .unwrap();

    let result = s.results.get(RESPONDENT).await.unwrap().unwrap();
    assert_eq!(result.status, TestStatus::Accepted);
    assert_eq!(result.counts.get(Category::Two), 30);

    let session = s.progress.get(RESPONDENT).await.unwrap().unwrap();
    assert_eq!(session.state, ConversationState::Completed);
}

#[tokio::test]
async fn back_navigation_retracts_delivered_acknowledgement() {
    let s = stack();

    s.dispatcher
        .dispatch(event(RESPONDENT, InboundKind::Command("start".to_string())))
        .await
        .unwrap();
    press(&s, "lang_en").await;
    press(&s, callback::CONSENT_YES).await;
    press(&s, callback::START_TEST).await;

    let letter = letter_for(&s, 0, Category::One).await;
    press(&s, &format!("answer_{letter}")).await;

    // The delivered acknowledgement reference was recorded on disk.
    let session = s.progress.get(RESPONDENT).await.unwrap().unwrap();
    let ack_ref = session.last_prompt_message.clone().expect("ack recorded");

    press(&s, callback::BACK).await;

    let retracted = s.transport.retracted.lock().unwrap().clone();
    assert_eq!(retracted, vec![(RESPONDENT, MessageRef(ack_ref))]);

    let session = s.progress.get(RESPONDENT).await.unwrap().unwrap();
    assert_eq!(session.current_question_index, 0);
    assert!(session.answers.is_empty());
    assert!(session.last_prompt_message.is_none());
}

#[tokio::test]
async fn reviewer_text_is_handled_as_regular_conversation() {
    let s = stack();

    // A reviewer typing /start goes through the normal respondent flow.
    s.dispatcher
        .dispatch(event(REVIEWER, InboundKind::Command("start".to_string())))
        .await
        .unwrap();
    let to_reviewer = s.transport.sent_to(REVIEWER);
    assert_eq!(to_reviewer.len(), 1);
    assert!(to_reviewer[0]
        .choices
        .iter()
        .all(|c| c.data.starts_with("lang_")));
}
