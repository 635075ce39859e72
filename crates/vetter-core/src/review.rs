//! Reviewer channel: summary hand-off and accept/reject decisions.

use crate::engine::ReviewRequest;
use crate::error::{Result, VetterError};
use crate::locale::LocaleRegistry;
use crate::result::{ResultRepository, TestResult, TestStatus};
use crate::score;
use crate::transport::{Choice, DeliveryError, Outgoing, RespondentId, Transport};
use std::sync::Arc;
use tracing::{error, info};

/// The reviewer's verdict on a completed test result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    fn status(self) -> TestStatus {
        match self {
            Verdict::Accepted => TestStatus::Accepted,
            Verdict::Rejected => TestStatus::Rejected,
        }
    }

    fn message_key(self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted_message",
            Verdict::Rejected => "rejected_message",
        }
    }
}

/// Parses reviewer callback data (`accept_<id>` / `reject_<id>`).
pub fn parse_decision(data: &str) -> Option<(Verdict, RespondentId)> {
    let (verdict, raw_id) = if let Some(rest) = data.strip_prefix("accept_") {
        (Verdict::Accepted, rest)
    } else if let Some(rest) = data.strip_prefix("reject_") {
        (Verdict::Rejected, rest)
    } else {
        return None;
    };
    raw_id.parse::<i64>().ok().map(|id| (verdict, RespondentId(id)))
}

/// Packages completed sessions for the reviewer and routes decisions back
/// to the originating respondent.
pub struct ReviewDispatcher {
    transport: Arc<dyn Transport>,
    results: Arc<dyn ResultRepository>,
    locales: Arc<LocaleRegistry>,
    reviewer: RespondentId,
}

impl ReviewDispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        results: Arc<dyn ResultRepository>,
        locales: Arc<LocaleRegistry>,
        reviewer: RespondentId,
    ) -> Self {
        Self {
            transport,
            results,
            locales,
            reviewer,
        }
    }

    /// Human-readable per-category breakdown for one test result.
    ///
    /// Lines are sorted by category label: `label) count (percent%)`.
    pub fn build_summary(&self, result: &TestResult) -> String {
        let lang = self.locales.default_language();
        let mut text = self.locales.text_with(
            "reviewer_new_results",
            lang,
            &[
                ("name", result.display_name.clone()),
                ("id", result.respondent.to_string()),
            ],
        );
        let counts = score::reconcile(&result.answers, result.counts);
        let pct = score::percentages(&counts);
        for (category, count) in counts.iter() {
            text.push_str(&format!(
                "\n{}) {} ({}%)",
                category.label(),
                count,
                pct[category.index()]
            ));
        }
        text
    }

    /// Sends a completed result to the reviewer with accept/reject actions.
    ///
    /// The evidence reference travels with the summary so the reviewer can
    /// pull up the second-test screenshot.
    pub async fn notify_reviewer(&self, request: &ReviewRequest) -> Result<()> {
        let result = &request.result;
        let lang = self.locales.default_language();
        let mut summary = self.build_summary(result);
        summary.push('\n');
        summary.push_str(&self.locales.text_with(
            "reviewer_evidence",
            lang,
            &[("reference", request.evidence.clone())],
        ));
        let choices = vec![
            Choice::new(
                format!("accept_{}", result.respondent),
                self.locales.text("accept_label", lang),
            ),
            Choice::new(
                format!("reject_{}", result.respondent),
                self.locales.text("reject_label", lang),
            ),
        ];
        self.transport
            .send(self.reviewer, Outgoing::with_choices(summary, choices))
            .await
            .map_err(|e| VetterError::Delivery(e.to_string()))?;
        Ok(())
    }

    /// Delivers the reviewer's verdict to the respondent and updates the
    /// stored status.
    ///
    /// - No TestResult on file: `NotFound`, nothing is sent.
    /// - Respondent unreachable: `Unreachable`, status left untouched.
    pub async fn deliver_decision(&self, respondent: RespondentId, verdict: Verdict) -> Result<()> {
        let result = self
            .results
            .get(respondent)
            .await?
            .ok_or_else(|| VetterError::not_found("test_result", respondent.to_string()))?;

        let lang = self.locales.default_language();
        let message = self.locales.text(verdict.message_key(), lang);
        match self.transport.send(respondent, Outgoing::text(message)).await {
            Ok(_) => {}
            Err(DeliveryError::Unreachable) => {
                info!(%respondent, "decision undeliverable, respondent never started a conversation");
                return Err(VetterError::Unreachable(respondent.0));
            }
            Err(DeliveryError::Other(reason)) => {
                error!(%respondent, %reason, "decision delivery failed");
                return Err(VetterError::Delivery(reason));
            }
        }

        self.results.set_status(respondent, verdict.status()).await?;
        info!(%respondent, ?verdict, prior = ?result.status, "decision delivered");
        Ok(())
    }

    /// Full reviewer callback path: parse, deliver, report back to the
    /// reviewer. Delivery faults are reported to the reviewer, never
    /// propagated.
    pub async fn process_decision(&self, data: &str) -> Result<()> {
        let Some((verdict, respondent)) = parse_decision(data) else {
            info!(data, "unrecognized reviewer callback");
            return Ok(());
        };

        let lang = self.locales.default_language();
        let feedback = match self.deliver_decision(respondent, verdict).await {
            Ok(()) => self.locales.text_with(
                "reviewer_decision_sent",
                lang,
                &[("id", respondent.to_string())],
            ),
            Err(err) if err.is_not_found() => self.locales.text_with(
                "reviewer_no_result",
                lang,
                &[("id", respondent.to_string())],
            ),
            Err(err) if err.is_unreachable() => self.locales.text_with(
                "reviewer_unreachable",
                lang,
                &[("id", respondent.to_string())],
            ),
            Err(err) => self.locales.text_with(
                "reviewer_delivery_failed",
                lang,
                &[("id", respondent.to_string()), ("reason", err.to_string())],
            ),
        };
        self.transport
            .send(self.reviewer, Outgoing::text(feedback))
            .await
            .map_err(|e| VetterError::Delivery(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    #[test]
    fn test_parse_decision() {
        assert_eq!(
            parse_decision("accept_42"),
            Some((Verdict::Accepted, RespondentId(42)))
        );
        assert_eq!(
            parse_decision("reject_7"),
            Some((Verdict::Rejected, RespondentId(7)))
        );
        assert_eq!(parse_decision("accept_abc"), None);
        assert_eq!(parse_decision("answer_A"), None);
    }

    #[test]
    fn test_verdict_status_mapping() {
        assert_eq!(Verdict::Accepted.status(), TestStatus::Accepted);
        assert_eq!(Verdict::Rejected.status(), TestStatus::Rejected);
    }

    #[test]
    fn test_category_ordering_in_summary_lines() {
        // build_summary walks categories in label order.
        let labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["1", "2", "3", "4"]);
    }
}
