use async_trait::async_trait;
use receipt_split_core::config::SplitConfig;
use receipt_split_core::error::{CoreError, CoreResult};
use receipt_split_core::session::collaborators::{
    CaptureStore, CapturedFile, ReceiptAnalysisClient,
};
use receipt_split_core::session::controller::{AnalysisOutcome, SessionPhase, SplitController};
use receipt_split_core::session::event::SessionEventType;
use receipt_split_core::session::observer::MemoryObserver;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BREAD: &str = r#"[{"shop_name":"S","item_info":[{"id":"0","name":"Bread","total_price":300,"price":300,"buyer_f":0,"remarks":""}]}]"#;

#[derive(Clone, Default)]
struct FakeCapture {
    files: Arc<Mutex<Vec<CapturedFile>>>,
    resets: Arc<AtomicUsize>,
}

impl FakeCapture {
    fn add(&self, name: &str) {
        let mut files = self.files.lock().unwrap();
        let id = files.len().to_string();
        files.push(CapturedFile {
            id,
            file_name: name.to_string(),
        });
    }
}

impl CaptureStore for FakeCapture {
    fn files(&self) -> Vec<CapturedFile> {
        self.files.lock().unwrap().clone()
    }

    fn reset(&self) {
        self.files.lock().unwrap().clear();
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

enum Reply {
    Payload(&'static str),
    UploadFails,
    FetchFails,
}

struct FakeService {
    reply: Reply,
    delay: Duration,
}

#[async_trait]
impl ReceiptAnalysisClient for FakeService {
    async fn upload(&self, files: Vec<CapturedFile>) -> CoreResult<String> {
        tokio::time::sleep(self.delay).await;
        if let Reply::UploadFails = self.reply {
            return Err(CoreError::UpstreamFailure("upload rejected: 500".to_string()));
        }
        Ok(format!("remote-{}", files.len()))
    }

    async fn fetch_analysis(&self, remote_id: &str) -> CoreResult<String> {
        match self.reply {
            Reply::Payload(p) => Ok(p.to_string()),
            Reply::FetchFails => Err(CoreError::InvalidInput(format!("unknown {}", remote_id))),
            Reply::UploadFails => unreachable!(),
        }
    }
}

fn controller(
    reply: Reply,
    delay: Duration,
) -> (SplitController<FakeCapture, FakeService>, FakeCapture, MemoryObserver) {
    let capture = FakeCapture::default();
    let observer = MemoryObserver::new();
    let ctl = SplitController::new(
        capture.clone(),
        FakeService { reply, delay },
        Arc::new(observer.clone()),
        SplitConfig::default(),
    )
    .unwrap();
    (ctl, capture, observer)
}

#[tokio::test]
async fn full_session_reaches_ready_and_splits() {
    let (mut ctl, capture, observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    ctl.begin_session();
    assert_eq!(ctl.phase(), SessionPhase::CAPTURING);
    capture.add("receiptImage0.png");

    let outcome = ctl.analyze().await.unwrap();
    assert_eq!(outcome, AnalysisOutcome::Ready { item_count: 1 });
    assert!(ctl.is_analysis_complete());
    assert_eq!(ctl.phase(), SessionPhase::READY);

    assert_eq!(ctl.set_allocation("0", 100.0).unwrap(), 100.0);
    let t = ctl.totals().unwrap();
    assert_eq!((t.total_a, t.total_b, t.grand_total), (200.0, 100.0, 300.0));
    assert_eq!(ctl.slider_spec("0").unwrap().step, Some(50.0));

    let kinds: Vec<SessionEventType> = observer.events().iter().map(|e| e.event_type).collect();
    assert!(kinds.contains(&SessionEventType::UPLOAD_COMPLETED));
    assert!(kinds.contains(&SessionEventType::ANALYSIS_READY));
    assert!(kinds.contains(&SessionEventType::ALLOCATION_SET));
}

#[tokio::test]
async fn begin_session_resets_capture_and_state() {
    let (mut ctl, capture, _observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    ctl.begin_session();
    capture.add("a.png");
    ctl.analyze().await.unwrap();
    let first_session = ctl.session_id().to_string();

    ctl.begin_session();
    assert!(ctl.state().is_none());
    assert!(!ctl.is_analysis_complete());
    assert!(capture.files().is_empty());
    assert_eq!(capture.resets.load(Ordering::SeqCst), 2);
    assert_ne!(ctl.session_id(), first_session);
}

#[tokio::test]
async fn new_session_supersedes_in_flight_analysis() {
    let (mut ctl, capture, observer) = controller(Reply::Payload(BREAD), Duration::from_millis(200));
    ctl.begin_session();
    capture.add("a.png");

    let pending = ctl.start_analysis().unwrap();
    ctl.begin_session();
    let finished = pending.wait().await;

    assert_eq!(ctl.complete_analysis(finished).unwrap(), AnalysisOutcome::Superseded);
    assert!(ctl.state().is_none());
    assert_eq!(ctl.phase(), SessionPhase::CAPTURING);
    assert!(observer
        .events()
        .iter()
        .any(|e| e.event_type == SessionEventType::ANALYSIS_SUPERSEDED));
}

#[tokio::test]
async fn stale_result_is_ignored_even_if_it_finished() {
    let (mut ctl, capture, _observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    ctl.begin_session();
    capture.add("a.png");
    let pending = ctl.start_analysis().unwrap();
    let finished = pending.wait().await;

    ctl.begin_session();
    assert_eq!(ctl.complete_analysis(finished).unwrap(), AnalysisOutcome::Superseded);
    assert!(ctl.state().is_none());
}

#[tokio::test]
async fn second_start_while_in_flight_is_rejected() {
    let (mut ctl, capture, _observer) = controller(Reply::Payload(BREAD), Duration::from_millis(50));
    ctl.begin_session();
    capture.add("a.png");
    let pending = ctl.start_analysis().unwrap();
    assert!(matches!(ctl.start_analysis(), Err(CoreError::InvalidInput(_))));
    let finished = pending.wait().await;
    assert!(ctl.complete_analysis(finished).is_ok());
}

#[tokio::test]
async fn analysis_without_captures_is_rejected() {
    let (mut ctl, _capture, _observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    ctl.begin_session();
    assert!(matches!(ctl.analyze().await, Err(CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn upstream_failure_without_split_is_failed() {
    for reply in [Reply::UploadFails, Reply::FetchFails] {
        let (mut ctl, capture, observer) = controller(reply, Duration::ZERO);
        ctl.begin_session();
        capture.add("a.png");
        let err = ctl.analyze().await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamFailure(_)));
        assert_eq!(ctl.phase(), SessionPhase::FAILED);
        assert!(ctl.state().is_none());
        assert!(observer
            .events()
            .iter()
            .any(|e| e.event_type == SessionEventType::ANALYSIS_UPSTREAM_FAILURE));
    }
}

#[tokio::test]
async fn upstream_failure_keeps_displayed_split() {
    for reply in [Reply::UploadFails, Reply::FetchFails] {
        let (mut ctl, capture, _observer) = controller(reply, Duration::ZERO);
        ctl.begin_session();
        capture.add("a.png");
        ctl.on_analysis_complete(BREAD).unwrap();
        ctl.set_allocation("0", 100.0).unwrap();
        let before = ctl.totals().unwrap();

        let err = ctl.analyze().await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamFailure(_)));
        assert_eq!(ctl.totals().unwrap(), before);
        assert_eq!(ctl.phase(), SessionPhase::READY);
        assert!(ctl.is_analysis_complete());
    }
}

#[tokio::test]
async fn dropped_analysis_does_not_block_retry() {
    let (mut ctl, capture, _observer) = controller(Reply::Payload(BREAD), Duration::from_millis(20));
    ctl.begin_session();
    capture.add("a.png");

    let dropped = tokio::time::timeout(Duration::from_millis(1), ctl.analyze()).await;
    assert!(dropped.is_err());
    assert_eq!(ctl.phase(), SessionPhase::ANALYZING);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let outcome = ctl.analyze().await.unwrap();
    assert_eq!(outcome, AnalysisOutcome::Ready { item_count: 1 });
    assert_eq!(ctl.phase(), SessionPhase::READY);
    assert_eq!(capture.files().len(), 1);
}

#[tokio::test]
async fn finished_dropped_analysis_releases_phase_on_next_start() {
    let (mut ctl, capture, _observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    ctl.begin_session();
    capture.add("a.png");

    drop(ctl.start_analysis().unwrap());
    assert_eq!(ctl.phase(), SessionPhase::ANALYZING);
    tokio::time::sleep(Duration::from_millis(50)).await;

    capture.reset();
    assert!(matches!(ctl.start_analysis(), Err(CoreError::InvalidInput(_))));
    assert_eq!(ctl.phase(), SessionPhase::CAPTURING);
}

#[tokio::test]
async fn slow_service_times_out_as_upstream_failure() {
    let capture = FakeCapture::default();
    let cfg = SplitConfig {
        analysis_timeout_ms: 20,
        ..SplitConfig::default()
    };
    let mut ctl = SplitController::new(
        capture.clone(),
        FakeService {
            reply: Reply::Payload(BREAD),
            delay: Duration::from_secs(5),
        },
        Arc::new(MemoryObserver::new()),
        cfg,
    )
    .unwrap();
    ctl.begin_session();
    capture.add("a.png");
    let err = ctl.analyze().await.unwrap_err();
    assert!(err.to_string().contains("timed out"));
}

#[test]
fn malformed_payload_keeps_displayed_split() {
    let (mut ctl, _capture, observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    ctl.on_analysis_complete(BREAD).unwrap();
    ctl.set_allocation("0", 120.0).unwrap();
    let before = ctl.totals().unwrap();

    let err = ctl.on_analysis_complete("{ not an array").unwrap_err();
    assert!(matches!(err, CoreError::MalformedPayload(_)));
    assert_eq!(ctl.totals().unwrap(), before);
    assert_eq!(ctl.phase(), SessionPhase::READY);

    let kinds: Vec<SessionEventType> = observer.events().iter().map(|e| e.event_type).collect();
    assert!(kinds.contains(&SessionEventType::ANALYSIS_MALFORMED_PAYLOAD));
    assert!(!kinds.contains(&SessionEventType::ANALYSIS_NO_ITEMS));
}

#[test]
fn empty_payload_is_a_ready_empty_split() {
    let (mut ctl, _capture, observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    let outcome = ctl.on_analysis_complete("[]").unwrap();
    assert_eq!(outcome, AnalysisOutcome::Ready { item_count: 0 });
    let t = ctl.totals().unwrap();
    assert_eq!((t.total_a, t.total_b, t.grand_total), (0.0, 0.0, 0.0));
    assert!(observer
        .events()
        .iter()
        .any(|e| e.event_type == SessionEventType::ANALYSIS_NO_ITEMS));
}

#[test]
fn allocation_before_analysis_and_unknown_ids_are_rejected() {
    let (mut ctl, _capture, observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    assert!(matches!(ctl.set_allocation("0", 1.0), Err(CoreError::InvalidInput(_))));

    ctl.on_analysis_complete(BREAD).unwrap();
    let before = ctl.totals().unwrap();
    assert!(matches!(
        ctl.set_allocation("nonexistent", 10.0),
        Err(CoreError::ItemNotFound(_))
    ));
    assert_eq!(ctl.totals().unwrap(), before);
    assert!(observer
        .events()
        .iter()
        .any(|e| e.event_type == SessionEventType::ALLOCATION_REJECTED));
}

#[test]
fn start_analysis_outside_runtime_is_an_error() {
    let (mut ctl, capture, _observer) = controller(Reply::Payload(BREAD), Duration::ZERO);
    capture.add("a.png");
    assert!(matches!(ctl.start_analysis(), Err(CoreError::InvalidInput(_))));
}
