//! Conversation engine.
//!
//! The finite-state machine driving one respondent through language
//! selection, introduction, consent, answering, secondary-evidence
//! submission, and completion. The engine owns all mutation of a session's
//! in-progress fields: it loads the session from the progress store,
//! applies one transition, persists the result, and returns the outbound
//! messages plus any side requests (acknowledgement tracking, message
//! retraction, reviewer hand-off) for the caller to execute.
//!
//! An event addressed to a state that does not handle it is ignored with a
//! logged notice and the current expected input is restated; the engine
//! never surfaces a hard error to the respondent for an out-of-sequence
//! message.

use crate::catalog::QuestionCatalog;
use crate::category::Letter;
use crate::error::Result;
use crate::locale::LocaleRegistry;
use crate::result::{ResultRepository, TestResult, TestStatus};
use crate::score;
use crate::session::{ConversationState, ProgressStore, Session};
use crate::shuffle::OptionOrder;
use crate::transport::{
    Choice, InboundEvent, InboundKind, MessageRef, Outgoing, RespondentId, RespondentProfile,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Callback-data identifiers used on interactive choices.
pub mod callback {
    pub const LANGUAGE_PREFIX: &str = "lang_";
    pub const CONSENT_YES: &str = "consent_yes";
    pub const CONSENT_NO: &str = "consent_no";
    pub const START_TEST: &str = "start_test";
    pub const DECLINE_TEST: &str = "choice_no";
    pub const ANSWER_PREFIX: &str = "answer_";
    pub const BACK: &str = "back_to_previous";
    pub const FINISH: &str = "finish_test";
}

/// A completed attempt handed off to the reviewer channel.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub result: TestResult,
    /// Transport reference of the uploaded evidence, forwarded to the
    /// reviewer alongside the summary.
    pub evidence: String,
}

/// Result of applying one inbound event.
#[derive(Debug, Default)]
pub struct EngineOutcome {
    /// Messages to deliver to the respondent, in order.
    pub replies: Vec<Outgoing>,
    /// Index into `replies` of the answer acknowledgement whose delivered
    /// message reference should be recorded via [`ConversationEngine::record_ack`].
    pub ack_reply: Option<usize>,
    /// A previously delivered acknowledgement to retract (back-navigation).
    pub retract: Option<MessageRef>,
    /// Reviewer hand-off produced by a completed attempt.
    pub review_request: Option<ReviewRequest>,
}

impl EngineOutcome {
    fn replies(replies: Vec<Outgoing>) -> Self {
        Self {
            replies,
            ..Self::default()
        }
    }
}

/// The per-respondent conversation state machine.
pub struct ConversationEngine {
    catalog: Arc<QuestionCatalog>,
    locales: Arc<LocaleRegistry>,
    progress: Arc<dyn ProgressStore>,
    results: Arc<dyn ResultRepository>,
}

impl ConversationEngine {
    pub fn new(
        catalog: Arc<QuestionCatalog>,
        locales: Arc<LocaleRegistry>,
        progress: Arc<dyn ProgressStore>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            catalog,
            locales,
            progress,
            results,
        }
    }

    /// Applies one inbound event for a respondent.
    ///
    /// The whole load-mutate-persist cycle for one respondent must be
    /// externally serialized (see the dispatcher); the engine itself does
    /// not lock.
    pub async fn handle(&self, event: InboundEvent) -> Result<EngineOutcome> {
        let respondent = event.respondent;
        let mut session = match self.progress.get(respondent).await? {
            Some(session) => session,
            None => Session::new(),
        };
        self.repair(respondent, &mut session);

        match event.kind {
            InboundKind::Command(ref command) if command.as_str() == "start" => {
                self.on_start(respondent, &mut session).await
            }
            InboundKind::Button(ref data) => {
                self.on_button(respondent, &event.profile, &mut session, data)
                    .await
            }
            InboundKind::Text(ref text) => {
                // A bare letter typed while answering counts as an answer.
                if session.state == ConversationState::Answering {
                    match Letter::parse(text) {
                        Some(letter) => {
                            return self.on_answer(respondent, &mut session, letter).await;
                        }
                        None => {
                            let mut replies = vec![Outgoing::text(
                                self.locales
                                    .text("please_select_option", &session.language),
                            )];
                            replies.extend(self.restate(&session));
                            return Ok(EngineOutcome::replies(replies));
                        }
                    }
                }
                self.ignore(respondent, &session, "text")
            }
            InboundKind::Photo { ref file_ref } => {
                self.on_evidence(respondent, &event.profile, &mut session, file_ref, true)
                    .await
            }
            InboundKind::Document {
                ref file_ref,
                ref mime_type,
            } => {
                let is_image = mime_type
                    .as_deref()
                    .is_some_and(|mime| mime.starts_with("image/"));
                self.on_evidence(respondent, &event.profile, &mut session, file_ref, is_image)
                    .await
            }
            InboundKind::Command(_) => self.ignore(respondent, &session, "command"),
        }
    }

    /// Records the transport reference of a delivered acknowledgement so it
    /// can be retracted on back-navigation.
    pub async fn record_ack(&self, respondent: RespondentId, message: &MessageRef) -> Result<()> {
        if let Some(mut session) = self.progress.get(respondent).await? {
            session.last_prompt_message = Some(message.0.clone());
            self.progress.upsert(respondent, &session).await?;
        }
        Ok(())
    }

    /// `/start`: present the language menu. The session is reset to the
    /// language-selection stage; choosing a language clears the prior
    /// attempt.
    async fn on_start(
        &self,
        respondent: RespondentId,
        session: &mut Session,
    ) -> Result<EngineOutcome> {
        session.state = ConversationState::LanguageSelection;
        self.progress.upsert(respondent, session).await?;
        Ok(EngineOutcome::replies(vec![self.language_menu()]))
    }

    async fn on_button(
        &self,
        respondent: RespondentId,
        profile: &RespondentProfile,
        session: &mut Session,
        data: &str,
    ) -> Result<EngineOutcome> {
        if let Some(language) = data.strip_prefix(callback::LANGUAGE_PREFIX) {
            if session.state == ConversationState::LanguageSelection {
                return self.on_language_chosen(respondent, session, language).await;
            }
            return self.ignore(respondent, session, data);
        }

        match (session.state, data) {
            (ConversationState::Introduction, callback::CONSENT_YES) => {
                session.state = ConversationState::TestChoice;
                self.progress.upsert(respondent, session).await?;
                let text = self.locales.text("test_intro", &session.language);
                let choices = vec![
                    Choice::new(
                        callback::START_TEST,
                        self.locales.text("take_test", &session.language),
                    ),
                    Choice::new(
                        callback::DECLINE_TEST,
                        self.locales.text("no_thanks", &session.language),
                    ),
                ];
                Ok(EngineOutcome::replies(vec![Outgoing::with_choices(
                    text, choices,
                )]))
            }
            (ConversationState::Introduction, callback::CONSENT_NO)
            | (ConversationState::TestChoice, callback::DECLINE_TEST) => {
                let text = self.locales.text("thanks_for_interest", &session.language);
                self.progress.remove(respondent).await?;
                Ok(EngineOutcome::replies(vec![Outgoing::text(text)]))
            }
            (ConversationState::TestChoice, callback::START_TEST) => {
                self.on_start_test(respondent, session).await
            }
            (ConversationState::Answering, data) => {
                if let Some(raw) = data.strip_prefix(callback::ANSWER_PREFIX) {
                    match Letter::parse(raw) {
                        Some(letter) => self.on_answer(respondent, session, letter).await,
                        None => {
                            let mut replies = vec![Outgoing::text(
                                self.locales
                                    .text("please_select_option", &session.language),
                            )];
                            replies.extend(self.restate(session));
                            Ok(EngineOutcome::replies(replies))
                        }
                    }
                } else if data == callback::BACK {
                    self.on_back(respondent, session).await
                } else if data == callback::FINISH {
                    self.on_finish(respondent, profile, session).await
                } else {
                    self.ignore(respondent, session, data)
                }
            }
            (_, data) => self.ignore(respondent, session, data),
        }
    }

    /// Language chosen: clear any prior attempt, persist the language, show
    /// the introduction and consent prompt.
    async fn on_language_chosen(
        &self,
        respondent: RespondentId,
        session: &mut Session,
        language: &str,
    ) -> Result<EngineOutcome> {
        let language = if self.catalog.has_language(language) {
            language.to_string()
        } else {
            warn!(%respondent, language, "unsupported language chosen, using default");
            self.catalog.default_language().to_string()
        };
        *session = Session::with_language(language);
        self.progress.upsert(respondent, session).await?;

        let lang = &session.language;
        let replies = vec![
            Outgoing::text(self.locales.text("language_selected", lang)),
            Outgoing::text(self.locales.text("welcome", lang)),
            Outgoing::with_choices(
                self.locales.text("start_question", lang),
                vec![
                    Choice::new(callback::CONSENT_YES, self.locales.text("yes_please", lang)),
                    Choice::new(callback::CONSENT_NO, self.locales.text("no_thanks", lang)),
                ],
            ),
        ];
        Ok(EngineOutcome::replies(replies))
    }

    /// Start of a test attempt: reset progress fields, shuffle question 0,
    /// persist, and present the first question.
    async fn on_start_test(
        &self,
        respondent: RespondentId,
        session: &mut Session,
    ) -> Result<EngineOutcome> {
        session.reset_attempt();
        session.state = ConversationState::Answering;
        session.record_option_order(0, OptionOrder::shuffle(&mut rand::thread_rng()));
        self.progress.upsert(respondent, session).await?;
        Ok(EngineOutcome::replies(vec![self.question_prompt(session, 0)]))
    }

    /// A valid answer letter: translate via the stored mapping, append,
    /// advance. The acknowledgement reply is marked for reference tracking.
    async fn on_answer(
        &self,
        respondent: RespondentId,
        session: &mut Session,
        letter: Letter,
    ) -> Result<EngineOutcome> {
        let total = self.catalog.question_count(&session.language);
        let index = session.current_question_index;
        if index >= total {
            // All questions answered; only back or finish are expected.
            return self.ignore(respondent, session, "answer");
        }

        // The order stored when the question was shown is authoritative; a
        // missing entry can only mean the record predates this attempt, so
        // shuffle once and record it.
        let order = match session.option_order(index) {
            Some(order) => *order,
            None => {
                warn!(%respondent, index, "no stored option order for current question");
                let order = OptionOrder::shuffle(&mut rand::thread_rng());
                session.record_option_order(index, order);
                order
            }
        };
        let category = order.letter_to_category(letter);
        session.answers.push(category);
        session.counts.increment(category);
        session.current_question_index = index + 1;

        let ack = Outgoing::text(self.locales.text_with(
            "answer_selected",
            &session.language,
            &[("letter", letter.to_string())],
        ));

        let next = session.current_question_index;
        let follow_up = if next == total {
            Outgoing::with_choices(
                self.locales
                    .text("all_questions_answered", &session.language),
                vec![
                    Choice::new(
                        callback::BACK,
                        self.locales.text("back_to_previous", &session.language),
                    ),
                    Choice::new(
                        callback::FINISH,
                        self.locales.text("finish_test", &session.language),
                    ),
                ],
            )
        } else {
            if session.option_order(next).is_none() {
                session.record_option_order(next, OptionOrder::shuffle(&mut rand::thread_rng()));
            }
            self.question_prompt(session, next)
        };
        self.progress.upsert(respondent, session).await?;

        Ok(EngineOutcome {
            replies: vec![ack, follow_up],
            ack_reply: Some(0),
            retract: None,
            review_request: None,
        })
    }

    /// Back-navigation: pop the last answer, retract its acknowledgement,
    /// and re-present the previous question with its stored permutation.
    async fn on_back(
        &self,
        respondent: RespondentId,
        session: &mut Session,
    ) -> Result<EngineOutcome> {
        if session.current_question_index == 0 {
            return Ok(EngineOutcome::replies(vec![Outgoing::text(
                self.locales
                    .text("first_question_no_back", &session.language),
            )]));
        }

        let retract = session.last_prompt_message.take().map(MessageRef);
        if let Some(last) = session.answers.pop() {
            session.counts.decrement(last);
        }
        session.current_question_index -= 1;
        let index = session.current_question_index;
        self.progress.upsert(respondent, session).await?;

        Ok(EngineOutcome {
            replies: vec![self.question_prompt(session, index)],
            ack_reply: None,
            retract,
            review_request: None,
        })
    }

    /// Finish: only legal once every question is answered. Freezes the
    /// answers into a TestResult with status `completed_first_test`.
    async fn on_finish(
        &self,
        respondent: RespondentId,
        profile: &RespondentProfile,
        session: &mut Session,
    ) -> Result<EngineOutcome> {
        let total = self.catalog.question_count(&session.language);
        if session.current_question_index != total {
            return self.ignore(respondent, session, callback::FINISH);
        }

        let counts = score::reconcile(&session.answers, session.counts);
        session.counts = counts;
        let result = TestResult::new(
            respondent,
            profile.display_name(),
            session.answers.clone(),
            counts,
            TestStatus::CompletedFirstTest,
        );
        self.results.upsert(&result).await?;

        session.state = ConversationState::AwaitingSecondEvidence;
        self.progress.upsert(respondent, session).await?;

        Ok(EngineOutcome::replies(vec![Outgoing::text(
            self.locales.text("first_test_completed", &session.language),
        )]))
    }

    /// Secondary evidence: an image completes the attempt; anything else is
    /// re-prompted without mutating state.
    async fn on_evidence(
        &self,
        respondent: RespondentId,
        profile: &RespondentProfile,
        session: &mut Session,
        file_ref: &str,
        is_image: bool,
    ) -> Result<EngineOutcome> {
        if session.state != ConversationState::AwaitingSecondEvidence {
            return self.ignore(respondent, session, "upload");
        }
        if !is_image {
            info!(%respondent, "non-image evidence received, re-prompting");
            return Ok(EngineOutcome::replies(vec![Outgoing::text(
                self.locales.text("not_image", &session.language),
            )]));
        }

        let counts = score::reconcile(&session.answers, session.counts);
        session.counts = counts;
        let result = TestResult::new(
            respondent,
            profile.display_name(),
            session.answers.clone(),
            counts,
            TestStatus::Completed,
        );
        self.results.upsert(&result).await?;

        session.state = ConversationState::Completed;
        self.progress.upsert(respondent, session).await?;

        Ok(EngineOutcome {
            replies: vec![Outgoing::text(self.respondent_summary(session))],
            ack_reply: None,
            retract: None,
            review_request: Some(ReviewRequest {
                result,
                evidence: file_ref.to_string(),
            }),
        })
    }

    /// Out-of-sequence event: log and restate the current expected input.
    fn ignore(
        &self,
        respondent: RespondentId,
        session: &Session,
        what: &str,
    ) -> Result<EngineOutcome> {
        info!(%respondent, state = ?session.state, event = what, "ignoring out-of-sequence event");
        Ok(EngineOutcome::replies(self.restate(session)))
    }

    /// The prompt a respondent in this state is expected to answer.
    fn restate(&self, session: &Session) -> Vec<Outgoing> {
        let lang = &session.language;
        match session.state {
            ConversationState::LanguageSelection => vec![self.language_menu()],
            ConversationState::Introduction => vec![Outgoing::with_choices(
                self.locales.text("start_question", lang),
                vec![
                    Choice::new(callback::CONSENT_YES, self.locales.text("yes_please", lang)),
                    Choice::new(callback::CONSENT_NO, self.locales.text("no_thanks", lang)),
                ],
            )],
            ConversationState::TestChoice => vec![Outgoing::with_choices(
                self.locales.text("test_intro", lang),
                vec![
                    Choice::new(callback::START_TEST, self.locales.text("take_test", lang)),
                    Choice::new(callback::DECLINE_TEST, self.locales.text("no_thanks", lang)),
                ],
            )],
            ConversationState::Answering => {
                let total = self.catalog.question_count(lang);
                if session.current_question_index >= total {
                    vec![Outgoing::with_choices(
                        self.locales.text("all_questions_answered", lang),
                        vec![
                            Choice::new(callback::BACK, self.locales.text("back_to_previous", lang)),
                            Choice::new(callback::FINISH, self.locales.text("finish_test", lang)),
                        ],
                    )]
                } else {
                    vec![self.question_prompt(session, session.current_question_index)]
                }
            }
            ConversationState::AwaitingSecondEvidence => vec![Outgoing::text(
                self.locales.text("send_screenshot", lang),
            )],
            ConversationState::Completed => vec![Outgoing::text(
                self.locales.text("thanks_for_interest", lang),
            )],
        }
    }

    fn language_menu(&self) -> Outgoing {
        let choices = self
            .catalog
            .languages()
            .map(|lang| {
                Choice::new(
                    format!("{}{lang}", callback::LANGUAGE_PREFIX),
                    self.locales.text("language_name", lang),
                )
            })
            .collect();
        Outgoing::with_choices(
            self.locales
                .text("language_selection", self.locales.default_language()),
            choices,
        )
    }

    /// Formats one question with its stored option order and letter choices.
    ///
    /// Callers must have recorded the option order for `index` first.
    fn question_prompt(&self, session: &Session, index: usize) -> Outgoing {
        let lang = &session.language;
        let questions = self.catalog.questions_for(lang);
        let question = &questions[index];
        let order = session
            .option_order(index)
            .copied()
            .unwrap_or_else(OptionOrder::identity);

        let header = self.locales.text_with(
            "question_header",
            lang,
            &[
                ("current", (index + 1).to_string()),
                ("total", questions.len().to_string()),
            ],
        );
        let mut text = format!("{header}\n{}\n", question.prompt);
        for (letter, option) in order.display_options(question) {
            text.push_str(&format!("\n{letter}) {option}"));
        }

        let mut choices: Vec<Choice> = Letter::ALL
            .iter()
            .map(|letter| {
                Choice::new(
                    format!("{}{letter}", callback::ANSWER_PREFIX),
                    letter.to_string(),
                )
            })
            .collect();
        if index > 0 {
            choices.push(Choice::new(
                callback::BACK,
                self.locales.text("back_to_previous", lang),
            ));
        }
        Outgoing::with_choices(text, choices)
    }

    /// The respondent-facing breakdown sent on completion.
    fn respondent_summary(&self, session: &Session) -> String {
        let lang = &session.language;
        let pct = score::percentages(&session.counts);
        let mut text = self.locales.text("results_received", lang);
        for (category, count) in session.counts.iter() {
            let phase = self
                .locales
                .text(&format!("phase_{}", category.label()), lang);
            let line = self.locales.text_with(
                "results_line",
                lang,
                &[
                    ("count", count.to_string()),
                    ("percent", pct[category.index()].to_string()),
                    ("phase", phase),
                ],
            );
            text.push('\n');
            text.push_str(&line);
        }
        text
    }

    /// Repairs invariant drift in a loaded session. Answers are the source
    /// of truth; the index and counts are derived.
    fn repair(&self, respondent: RespondentId, session: &mut Session) {
        if session.invariants_hold() {
            return;
        }
        warn!(%respondent, "session invariants violated on load, repairing from answer list");
        session.counts = score::reconcile(&session.answers, session.counts);
        if session.state == ConversationState::Answering {
            session.current_question_index = session.answers.len();
        }
    }
}
