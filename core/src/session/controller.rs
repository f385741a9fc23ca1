use super::collaborators::{CaptureStore, CapturedFile, ReceiptAnalysisClient};
use super::event::{SessionEvent, SessionEventType};
use super::observer::SessionObserver;
use crate::config::SplitConfig;
use crate::error::{CoreError, CoreResult};
use crate::ids::session_id_ulid;
use crate::receipt::parser::{parse_items, ParseStatus};
use crate::split::export::render_split_csv;
use crate::split::model::{SplitState, SplitTotals};
use crate::split::slider::{slider_spec, SliderSpec};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionPhase {
    IDLE,
    CAPTURING,
    ANALYZING,
    READY,
    FAILED,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Ready { item_count: usize },
    /// Result belonged to a session that has since been replaced.
    Superseded,
}

/// Handle to the upload-then-analyze task of one session.
pub struct PendingAnalysis {
    session_id: String,
    handle: JoinHandle<CoreResult<String>>,
}

impl PendingAnalysis {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn wait(self) -> FinishedAnalysis {
        let result = match self.handle.await {
            Ok(Ok(raw)) => TaskResult::Payload(raw),
            Ok(Err(e)) => TaskResult::Failed(e),
            Err(e) if e.is_cancelled() => TaskResult::Cancelled,
            Err(e) => TaskResult::Failed(CoreError::UpstreamFailure(format!(
                "analysis task failed: {}",
                e
            ))),
        };
        FinishedAnalysis {
            session_id: self.session_id,
            result,
        }
    }
}

#[derive(Debug)]
pub enum TaskResult {
    Payload(String),
    Failed(CoreError),
    Cancelled,
}

#[derive(Debug)]
pub struct FinishedAnalysis {
    pub session_id: String,
    pub result: TaskResult,
}

pub struct SplitController<S: CaptureStore, A: ReceiptAnalysisClient> {
    capture: S,
    client: Arc<A>,
    observer: Arc<dyn SessionObserver>,
    cfg: SplitConfig,
    session_id: String,
    phase: SessionPhase,
    state: Option<SplitState>,
    analysis_complete: bool,
    in_flight: Option<AbortHandle>,
}

impl<S: CaptureStore, A: ReceiptAnalysisClient> SplitController<S, A> {
    pub fn new(
        capture: S,
        client: A,
        observer: Arc<dyn SessionObserver>,
        cfg: SplitConfig,
    ) -> CoreResult<Self> {
        cfg.validate()?;
        Ok(Self {
            capture,
            client: Arc::new(client),
            observer,
            cfg,
            session_id: session_id_ulid(),
            phase: SessionPhase::IDLE,
            state: None,
            analysis_complete: false,
            in_flight: None,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_analysis_complete(&self) -> bool {
        self.analysis_complete
    }

    pub fn state(&self) -> Option<&SplitState> {
        self.state.as_ref()
    }

    pub fn config(&self) -> &SplitConfig {
        &self.cfg
    }

    /// Start a fresh capture session. Any analysis still running for the
    /// previous session is aborted and its result will be ignored.
    pub fn begin_session(&mut self) {
        if let Some(abort) = self.in_flight.take() {
            abort.abort();
            self.emit(
                SessionEventType::ANALYSIS_SUPERSEDED,
                json!({ "reason": "new session started" }),
            );
        }
        let previous = std::mem::replace(&mut self.session_id, session_id_ulid());
        self.state = None;
        self.analysis_complete = false;
        self.capture.reset();
        self.phase = SessionPhase::CAPTURING;
        self.emit(
            SessionEventType::SESSION_STARTED,
            json!({ "previous_session_id": previous }),
        );
    }

    /// Spawn the upload-then-analyze task for the current captures.
    /// Must be called from within a tokio runtime.
    pub fn start_analysis(&mut self) -> CoreResult<PendingAnalysis> {
        // A caller that dropped its PendingAnalysis never reaches
        // complete_analysis; a finished task no longer blocks a retry.
        if self.in_flight.as_ref().is_some_and(AbortHandle::is_finished) {
            self.in_flight = None;
            self.phase = self.settled_phase(SessionPhase::CAPTURING);
        }
        if self.in_flight.is_some() {
            return Err(CoreError::InvalidInput(
                "an analysis is already in flight for this session".to_string(),
            ));
        }
        let files = self.capture.files();
        if files.is_empty() {
            return Err(CoreError::InvalidInput("no captured images".to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::InvalidInput(format!("no async runtime: {}", e)))?;

        self.emit(
            SessionEventType::ANALYSIS_REQUESTED,
            json!({ "file_count": files.len() }),
        );

        let client = Arc::clone(&self.client);
        let observer = Arc::clone(&self.observer);
        let session_id = self.session_id.clone();
        let timeout_ms = self.cfg.analysis_timeout_ms;
        let task_session_id = session_id.clone();
        let handle = runtime.spawn(async move {
            let pipeline =
                upload_then_fetch(client.as_ref(), observer.as_ref(), &task_session_id, files);
            match tokio::time::timeout(Duration::from_millis(timeout_ms), pipeline).await {
                Ok(result) => result,
                Err(_) => Err(CoreError::UpstreamFailure(format!(
                    "analysis timed out after {} ms",
                    timeout_ms
                ))),
            }
        });

        self.in_flight = Some(handle.abort_handle());
        self.phase = SessionPhase::ANALYZING;
        Ok(PendingAnalysis { session_id, handle })
    }

    /// Apply the result of a finished analysis task to the session it was
    /// started for. Results of replaced sessions are dropped.
    pub fn complete_analysis(
        &mut self,
        finished: FinishedAnalysis,
    ) -> CoreResult<AnalysisOutcome> {
        if finished.session_id != self.session_id {
            self.observer.record(&SessionEvent::now(
                SessionEventType::ANALYSIS_SUPERSEDED,
                &finished.session_id,
                json!({ "current_session_id": self.session_id }),
            ));
            return Ok(AnalysisOutcome::Superseded);
        }
        self.in_flight = None;

        match finished.result {
            TaskResult::Payload(raw) => self.on_analysis_complete(&raw),
            TaskResult::Cancelled => {
                self.phase = self.settled_phase(SessionPhase::CAPTURING);
                self.emit(
                    SessionEventType::ANALYSIS_SUPERSEDED,
                    json!({ "reason": "task cancelled" }),
                );
                Ok(AnalysisOutcome::Superseded)
            }
            TaskResult::Failed(e) => {
                let err = match e {
                    CoreError::UpstreamFailure(msg) => CoreError::UpstreamFailure(msg),
                    other => CoreError::UpstreamFailure(other.to_string()),
                };
                self.phase = self.settled_phase(SessionPhase::FAILED);
                self.emit(
                    SessionEventType::ANALYSIS_UPSTREAM_FAILURE,
                    json!({ "error": err.to_string() }),
                );
                Err(err)
            }
        }
    }

    pub async fn analyze(&mut self) -> CoreResult<AnalysisOutcome> {
        let pending = self.start_analysis()?;
        let finished = pending.wait().await;
        self.complete_analysis(finished)
    }

    /// Parse a raw analysis payload and, unless it is malformed, replace the
    /// split state with its items.
    pub fn on_analysis_complete(&mut self, raw: &str) -> CoreResult<AnalysisOutcome> {
        let outcome = parse_items(raw);
        match &outcome.status {
            ParseStatus::Malformed(reason) => {
                self.phase = self.settled_phase(SessionPhase::FAILED);
                self.emit(
                    SessionEventType::ANALYSIS_MALFORMED_PAYLOAD,
                    json!({ "reason": reason, "payload_bytes": raw.len() }),
                );
                return Err(CoreError::MalformedPayload(reason.clone()));
            }
            ParseStatus::NoItems => {
                self.emit(
                    SessionEventType::ANALYSIS_NO_ITEMS,
                    json!({ "shop_count": outcome.shop_names.len() }),
                );
            }
            ParseStatus::Parsed => {}
        }

        let item_count = outcome.items.len();
        self.emit(
            SessionEventType::ANALYSIS_READY,
            json!({
                "item_count": item_count,
                "shop_names": outcome.shop_names,
                "non_positive_price_ids": outcome.non_positive_price_ids,
            }),
        );
        self.state = Some(SplitState::initialize(outcome.items));
        self.analysis_complete = true;
        self.phase = SessionPhase::READY;
        Ok(AnalysisOutcome::Ready { item_count })
    }

    pub fn set_allocation(&mut self, item_id: &str, value: f64) -> CoreResult<f64> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| CoreError::InvalidInput("no split is ready".to_string()))?;
        match state.set_allocation(item_id, value) {
            Ok(stored) => {
                self.emit(
                    SessionEventType::ALLOCATION_SET,
                    json!({ "item_id": item_id, "requested": value, "stored": stored }),
                );
                Ok(stored)
            }
            Err(e) => {
                self.emit(
                    SessionEventType::ALLOCATION_REJECTED,
                    json!({ "item_id": item_id, "error": e.to_string() }),
                );
                Err(e)
            }
        }
    }

    pub fn totals(&self) -> Option<SplitTotals> {
        self.state.as_ref().map(SplitState::totals)
    }

    pub fn slider_spec(&self, item_id: &str) -> CoreResult<SliderSpec> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| CoreError::InvalidInput("no split is ready".to_string()))?;
        let item = state.item(item_id)?;
        Ok(slider_spec(item.total_price(), self.cfg.slider_divisions))
    }

    pub fn export_csv(&self) -> CoreResult<String> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| CoreError::InvalidInput("no split is ready".to_string()))?;
        render_split_csv(state, &self.cfg)
    }

    /// Phase after an analysis ends without new items: a split already on
    /// screen stays READY.
    fn settled_phase(&self, without_state: SessionPhase) -> SessionPhase {
        if self.state.is_some() {
            SessionPhase::READY
        } else {
            without_state
        }
    }

    fn emit(&self, event_type: SessionEventType, details: serde_json::Value) {
        self.observer
            .record(&SessionEvent::now(event_type, &self.session_id, details));
    }
}

async fn upload_then_fetch<A: ReceiptAnalysisClient>(
    client: &A,
    observer: &dyn SessionObserver,
    session_id: &str,
    files: Vec<CapturedFile>,
) -> CoreResult<String> {
    let remote_id = client.upload(files).await?;
    observer.record(&SessionEvent::now(
        SessionEventType::UPLOAD_COMPLETED,
        session_id,
        json!({ "remote_id": remote_id }),
    ));
    client.fetch_analysis(&remote_id).await
}
