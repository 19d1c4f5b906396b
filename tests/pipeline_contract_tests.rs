use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use secrecy::SecretString;

use eejaz::{
    config::RateLimitPolicy,
    errors::{AttemptFailure, OcrError, PipelineError, TransportError},
    models::{
        domain::{document::MEDIA_TYPE_PDF, Document, Language, Provenance, QuestionType},
        dto::{GeminiRequest, GenerationOptions},
    },
    repositories::{CredentialRepository, InMemoryCredentialRepository},
    services::{
        generation_client::Sleeper,
        ocr_service::{PageRasterizer, TextRecognizer},
        prompt_builder::MAX_SOURCE_CHARS,
        GenerationClient, GenerationTransport, OcrEngine, PipelineObserver, PipelineOrchestrator,
        RetrySettings, TextExtractor, TransportResponse,
    },
};

const API_KEY: &str = "AIzaSyContractTestContractTest0000000";

/// Replays scripted responses in order and records every prompt it receives.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationTransport for ScriptedTransport {
    async fn post(
        &self,
        _model: &str,
        _api_key: &SecretString,
        body: &GeminiRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(body.prompt_text().unwrap_or_default().to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(status(500)))
    }
}

#[derive(Default)]
struct InstantSleeper {
    waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

#[derive(Default)]
struct CollectingObserver {
    percents: Mutex<Vec<u8>>,
    invalidations: AtomicU32,
}

impl PipelineObserver for CollectingObserver {
    fn on_progress(&self, percent: u8, _message: &str) {
        self.percents.lock().unwrap().push(percent);
    }

    fn on_credential_invalidated(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pretends every page rendered and counts how often it was asked to.
#[derive(Default)]
struct FakeRasterizer {
    runs: AtomicU32,
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn rasterize(
        &self,
        _pdf_path: &Path,
        last_page: u32,
        _scale: f32,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, OcrError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok((1..=last_page)
            .map(|i| out_dir.join(format!("page-{}.png", i)))
            .collect())
    }
}

struct FixedRecognizer(String);

#[async_trait]
impl TextRecognizer for FixedRecognizer {
    async fn recognize(&self, _image_path: &Path, _languages: &str) -> Result<String, OcrError> {
        Ok(self.0.clone())
    }
}

fn status(status: u16) -> TransportResponse {
    TransportResponse {
        status,
        body: String::new(),
    }
}

fn ok_with(text: &str) -> Result<TransportResponse, TransportError> {
    let body = serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    });
    Ok(TransportResponse {
        status: 200,
        body: body.to_string(),
    })
}

fn filler(n: usize) -> String {
    "Photosynthesis converts light energy into chemical energy in plants. "
        .chars()
        .cycle()
        .take(n)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn pdf_with_text(pages: &[String]) -> Vec<u8> {
    use lopdf::{
        content::{Content, Operation},
        dictionary, Document as PdfDocument, Object, Stream,
    };

    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    sleeper: Arc<InstantSleeper>,
    rasterizer: Arc<FakeRasterizer>,
    credentials: Arc<InMemoryCredentialRepository>,
    orchestrator: PipelineOrchestrator,
}

fn harness(script: Vec<Result<TransportResponse, TransportError>>, ocr_text: &str) -> Harness {
    let transport = Arc::new(ScriptedTransport::new(script));
    let sleeper = Arc::new(InstantSleeper::default());
    let rasterizer = Arc::new(FakeRasterizer::default());
    let credentials = Arc::new(InMemoryCredentialRepository::with_key(API_KEY));

    let client = GenerationClient::new(
        transport.clone(),
        credentials.clone(),
        sleeper.clone(),
        RetrySettings {
            models: vec![
                "gemini-flash-latest".to_string(),
                "gemini-2.0-flash".to_string(),
                "gemini-2.0-flash-lite".to_string(),
            ],
            rounds: 3,
            backoff_unit: Duration::from_millis(100),
            round_pause: Duration::from_millis(1),
            policy: RateLimitPolicy::RetryEveryRound,
        },
    );
    let ocr = OcrEngine::new(
        rasterizer.clone(),
        Arc::new(FixedRecognizer(ocr_text.to_string())),
        10,
        2.0,
        "ara+eng",
    );

    Harness {
        transport,
        sleeper,
        rasterizer,
        credentials,
        orchestrator: PipelineOrchestrator::new(TextExtractor::new(15), ocr, client),
    }
}

fn options() -> GenerationOptions {
    GenerationOptions::new(Language::En, 4, vec![QuestionType::Mcq, QuestionType::Tf])
}

const EMPTY_RESULT: &str = "{\"summary\":\"x\",\"questions\":[]}";

#[tokio::test]
async fn test_unreadable_document_makes_no_network_call() {
    let mut h = harness(vec![], "");
    let doc = Document::new("blank.pdf", MEDIA_TYPE_PDF, pdf_with_text(&["Hi".to_string()]));
    let observer = CollectingObserver::default();

    let err = h.orchestrator.run(&doc, &options(), &observer).await.unwrap_err();

    assert!(matches!(err, PipelineError::UnreadableDocument { .. }));
    assert_eq!(h.transport.calls(), 0);
    assert_eq!(h.rasterizer.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_short_native_text_engages_ocr() {
    let mut h = harness(vec![ok_with(EMPTY_RESULT)], &filler(400));
    let doc = Document::new("short.pdf", MEDIA_TYPE_PDF, pdf_with_text(&[filler(150)]));

    h.orchestrator
        .run(&doc, &options(), &CollectingObserver::default())
        .await
        .unwrap();

    assert_eq!(h.rasterizer.runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rich_native_text_skips_ocr() {
    let mut h = harness(vec![ok_with(EMPTY_RESULT)], "");
    let pages: Vec<String> = (0..5).map(|_| filler(1000)).collect();
    let doc = Document::new("rich.pdf", MEDIA_TYPE_PDF, pdf_with_text(&pages));

    h.orchestrator
        .run(&doc, &options(), &CollectingObserver::default())
        .await
        .unwrap();

    assert_eq!(h.rasterizer.runs.load(Ordering::SeqCst), 0);
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test]
async fn test_extracted_text_for_native_pdf_is_native() {
    let extractor = TextExtractor::new(15);
    let doc = Document::new("rich.pdf", MEDIA_TYPE_PDF, pdf_with_text(&[filler(300)]));

    let extracted = extractor.extract(&doc).await.unwrap();

    assert_eq!(extracted.provenance, Provenance::Native);
    assert_eq!(extracted.text, filler(300));
}

#[tokio::test]
async fn test_embedded_text_is_capped() {
    let mut h = harness(vec![ok_with(EMPTY_RESULT)], "");
    let doc = Document::new("long.txt", "text/plain", filler(50_000).into_bytes());

    h.orchestrator
        .run(&doc, &options(), &CollectingObserver::default())
        .await
        .unwrap();

    let prompt = &h.transport.prompts()[0];
    let start = prompt.find("### SOURCE TEXT START\n").unwrap() + "### SOURCE TEXT START\n".len();
    let end = prompt.find("\n### SOURCE TEXT END").unwrap();
    assert!(prompt[start..end].chars().count() <= MAX_SOURCE_CHARS);
}

#[tokio::test]
async fn test_rate_limited_round_continues_with_longer_backoff() {
    let mut h = harness(
        vec![
            Ok(status(429)),
            Ok(status(429)),
            Ok(status(429)),
            Ok(status(429)),
            ok_with(EMPTY_RESULT),
        ],
        "",
    );
    let doc = Document::new("notes.txt", "text/plain", filler(600).into_bytes());
    let observer = CollectingObserver::default();

    let result = h.orchestrator.run(&doc, &options(), &observer).await.unwrap();

    assert_eq!(result.summary, "x");
    assert_eq!(h.transport.calls(), 5);

    let waits = h.sleeper.waits.lock().unwrap().clone();
    let round_one = waits[0];
    let round_two = waits[4];
    assert_eq!(waits[3], Duration::from_millis(1));
    assert!(round_two > round_one);
}

#[tokio::test]
async fn test_auth_rejection_invalidates_once() {
    let mut h = harness(vec![Ok(status(401)), ok_with(EMPTY_RESULT)], "");
    let doc = Document::new("notes.txt", "text/plain", filler(600).into_bytes());
    let observer = CollectingObserver::default();

    let err = h.orchestrator.run(&doc, &options(), &observer).await.unwrap_err();

    assert_eq!(
        err,
        PipelineError::GenerationFailure {
            cause: AttemptFailure::AuthInvalid,
            attempts: 1,
        }
    );
    assert_eq!(observer.invalidations.load(Ordering::SeqCst), 1);
    assert_eq!(h.transport.calls(), 1);
    assert!(h.credentials.load().await.unwrap().is_none());
    assert!(h.orchestrator.session().last_result().is_none());
}

#[tokio::test]
async fn test_fenced_and_trailing_comma_responses_parse() {
    let mut h = harness(
        vec![
            ok_with("```json\n{\"summary\":\"fenced\",\"questions\":[]}\n```"),
            ok_with("{\"summary\":\"comma\",\"questions\":[],}"),
        ],
        "",
    );
    let doc = Document::new("notes.txt", "text/plain", filler(600).into_bytes());

    let first = h
        .orchestrator
        .run(&doc, &options(), &CollectingObserver::default())
        .await
        .unwrap();
    let second = h
        .orchestrator
        .run(&doc, &options(), &CollectingObserver::default())
        .await
        .unwrap();

    assert_eq!(first.summary, "fenced");
    assert_eq!(second.summary, "comma");
    assert_eq!(
        h.orchestrator.session().last_result().map(|r| r.summary.as_str()),
        Some("comma")
    );
}

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let mut h = harness(vec![ok_with(EMPTY_RESULT)], &filler(400));
    let doc = Document::new("scan.pdf", MEDIA_TYPE_PDF, pdf_with_text(&[filler(20), filler(20)]));
    let observer = CollectingObserver::default();

    h.orchestrator.run(&doc, &options(), &observer).await.unwrap();

    let percents = observer.percents.lock().unwrap().clone();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert_eq!(percents.first(), Some(&10));
    assert_eq!(percents.last(), Some(&100));
}
