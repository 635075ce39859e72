use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vetter_bot::{ConsoleTransport, Dispatcher};
use vetter_core::{
    ConversationEngine, InboundEvent, InboundKind, LocaleRegistry, QuestionCatalog, RespondentId,
    RespondentProfile, ReviewDispatcher,
};
use vetter_infrastructure::{
    load_locale_tables, load_question_catalogs, FileProgressStore, FileResultRepository,
    InstanceLock, VetterPaths,
};

#[derive(Parser)]
#[command(name = "vetter")]
#[command(about = "Staged questionnaire bot with durable per-respondent sessions", long_about = None)]
struct Cli {
    /// Base data directory (defaults to the platform data dir)
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    /// Respondent id of the reviewer account
    #[arg(long)]
    reviewer_id: i64,

    /// Directory of additional question catalogs (defaults to <data-dir>/questions)
    #[arg(long)]
    questions_dir: Option<std::path::PathBuf>,

    /// Directory of additional locale tables (defaults to <data-dir>/locales)
    #[arg(long)]
    locales_dir: Option<std::path::PathBuf>,

    /// Respondent id used for console input without an explicit @id prefix
    #[arg(long, default_value_t = 1)]
    respondent_id: i64,
}

/// Console line syntax:
/// - `/start`            slash command
/// - `!<data>`           button press with callback data
/// - `photo <ref>`       photo upload
/// - `doc <ref> <mime>`  document upload
/// - anything else       plain text
///
/// A leading `@<id> ` overrides the acting respondent (e.g. to answer as
/// the reviewer).
fn parse_line(line: &str, default_respondent: RespondentId) -> Option<InboundEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (respondent, rest) = match line.strip_prefix('@') {
        Some(rest) => {
            let (id, rest) = rest.split_once(' ')?;
            (RespondentId(id.parse().ok()?), rest.trim())
        }
        None => (default_respondent, line),
    };

    let kind = if let Some(command) = rest.strip_prefix('/') {
        InboundKind::Command(command.to_string())
    } else if let Some(data) = rest.strip_prefix('!') {
        InboundKind::Button(data.to_string())
    } else if let Some(file_ref) = rest.strip_prefix("photo ") {
        InboundKind::Photo {
            file_ref: file_ref.trim().to_string(),
        }
    } else if let Some(args) = rest.strip_prefix("doc ") {
        let mut parts = args.split_whitespace();
        InboundKind::Document {
            file_ref: parts.next()?.to_string(),
            mime_type: parts.next().map(str::to_string),
        }
    } else {
        InboundKind::Text(rest.to_string())
    };

    Some(InboundEvent {
        respondent,
        profile: RespondentProfile {
            username: Some(format!("console{}", respondent.0)),
            first_name: None,
        },
        kind,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => VetterPaths::at(dir),
        None => VetterPaths::default_location().context("cannot resolve data directory")?,
    };
    let _instance_lock = InstanceLock::acquire(paths.instance_lock_file())?;

    let questions_dir = cli.questions_dir.unwrap_or_else(|| paths.questions_dir());
    let locales_dir = cli.locales_dir.unwrap_or_else(|| paths.locales_dir());
    let mut catalog = QuestionCatalog::builtin()?;
    load_question_catalogs(&mut catalog, &questions_dir)?;
    let mut locales = LocaleRegistry::builtin()?;
    load_locale_tables(&mut locales, &locales_dir)?;

    let catalog = Arc::new(catalog);
    let locales = Arc::new(locales);
    let progress = Arc::new(FileProgressStore::new(paths.progress_dir()));
    let results = Arc::new(FileResultRepository::new(paths.results_dir()));
    let transport = Arc::new(ConsoleTransport::default());

    let reviewer = RespondentId(cli.reviewer_id);
    let engine = Arc::new(ConversationEngine::new(
        catalog,
        locales.clone(),
        progress,
        results.clone(),
    ));
    let review = Arc::new(ReviewDispatcher::new(
        transport.clone(),
        results,
        locales,
        reviewer,
    ));
    let dispatcher = Dispatcher::new(engine, review, transport, reviewer);

    info!(
        data_dir = %paths.base_dir().display(),
        %reviewer,
        "vetter started, reading events from stdin"
    );

    let default_respondent = RespondentId(cli.respondent_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(event) = parse_line(&line, default_respondent) else {
            continue;
        };
        if let Err(e) = dispatcher.dispatch(event).await {
            error!(error = %e, "event dispatch failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_and_button() {
        let event = parse_line("/start", RespondentId(1)).unwrap();
        assert_eq!(event.kind, InboundKind::Command("start".to_string()));

        let event = parse_line("!answer_B", RespondentId(1)).unwrap();
        assert_eq!(event.kind, InboundKind::Button("answer_B".to_string()));
    }

    #[test]
    fn test_parse_respondent_override() {
        let event = parse_line("@42 !accept_7", RespondentId(1)).unwrap();
        assert_eq!(event.respondent, RespondentId(42));
        assert_eq!(event.kind, InboundKind::Button("accept_7".to_string()));
    }

    #[test]
    fn test_parse_uploads_and_text() {
        let event = parse_line("photo shot.png", RespondentId(1)).unwrap();
        assert_eq!(
            event.kind,
            InboundKind::Photo {
                file_ref: "shot.png".to_string()
            }
        );

        let event = parse_line("doc file.pdf application/pdf", RespondentId(1)).unwrap();
        assert_eq!(
            event.kind,
            InboundKind::Document {
                file_ref: "file.pdf".to_string(),
                mime_type: Some("application/pdf".to_string()),
            }
        );

        let event = parse_line("  hello  ", RespondentId(1)).unwrap();
        assert_eq!(event.kind, InboundKind::Text("hello".to_string()));

        assert!(parse_line("   ", RespondentId(1)).is_none());
    }
}
