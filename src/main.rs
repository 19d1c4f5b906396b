use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use env_logger::Env;
use secrecy::SecretString;

use eejaz::{
    app_state::AppState,
    config::Config,
    errors::PipelineError,
    models::{
        domain::{Document, ExamMetadata, Language, QuestionType},
        dto::GenerationOptions,
    },
    repositories::CredentialRepository,
    services::PipelineObserver,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn a PDF or text file into a summary and a question set")]
struct Args {
    /// PDF or plain-text file to study.
    file: PathBuf,

    #[arg(short, long, default_value = "ar")]
    lang: Language,

    #[arg(short, long, default_value_t = 10)]
    count: u32,

    /// Comma separated: mcq, tf, fill, reasoning. Empty means all.
    #[arg(short, long, value_delimiter = ',')]
    types: Vec<QuestionType>,

    /// Stores a new Gemini API key before running.
    #[arg(long)]
    api_key: Option<String>,

    /// Total exam mark; prints the mark per question.
    #[arg(long)]
    total_mark: Option<f64>,
}

struct ConsoleObserver;

impl PipelineObserver for ConsoleObserver {
    fn on_progress(&self, percent: u8, message: &str) {
        eprintln!("[{:>3}%] {}", percent, message);
    }

    fn on_credential_invalidated(&self) {
        eprintln!("API key missing or rejected; run again with --api-key <KEY>");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info,lopdf=warn")).init();

    let args = Args::parse();
    let config = Config::from_env();

    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(key) = args.api_key {
        if let Err(e) = state.credentials.store(SecretString::from(key)).await {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    }

    let document = match Document::from_path(&args.file).await {
        Ok(doc) => doc,
        Err(e) => {
            log::error!("Failed to read {}: {}", args.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut orchestrator = match state.orchestrator() {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = GenerationOptions::new(args.lang, args.count, args.types);
    let result = match orchestrator.run(&document, &options, &ConsoleObserver).await {
        Ok(result) => result,
        Err(e) => return report_failure(&e, args.lang),
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Failed to serialize result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if let Some(total_mark) = args.total_mark {
        orchestrator.session_mut().annotate_exam(ExamMetadata {
            total_mark,
            ..ExamMetadata::default()
        });
        if let Some(mark) = orchestrator.session().mark_per_question() {
            eprintln!("Mark per question: {}", mark);
        }
    }

    ExitCode::SUCCESS
}

fn report_failure(err: &PipelineError, lang: Language) -> ExitCode {
    eprintln!("{}", err.user_message(lang));
    ExitCode::FAILURE
}
