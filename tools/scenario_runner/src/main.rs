use async_trait::async_trait;
use receipt_split_core::config::SplitConfig;
use receipt_split_core::error::{CoreError, CoreResult};
use receipt_split_core::receipt::parser::parse_items;
use receipt_split_core::session::collaborators::{
    CaptureStore, CapturedFile, ReceiptAnalysisClient,
};
use receipt_split_core::session::controller::{AnalysisOutcome, SplitController};
use receipt_split_core::session::observer::TracingObserver;
use receipt_split_core::split::model::SplitTotals;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SCENARIO_A: &str = r#"[{"shop_name":"S","item_info":[{"id":"0","name":"Bread","total_price":300,"price":300,"buyer_f":0,"remarks":""}]}]"#;
const SCENARIO_B: &str = r#"[
    {"shop_name":"S1","item_info":[{"id":"0","name":"Bread","total_price":300,"price":300,"buyer_f":0,"remarks":""}]},
    {"shop_name":"S2","item_info":[{"id":"0","name":"Cheese","total_price":500,"price":500,"buyer_f":0,"remarks":""}]}
]"#;

struct CheckResult {
    check_id: &'static str,
    passed: bool,
    message: String,
}

/// Scanner stand-in that yields the same pages for every session.
struct ScriptedCapture {
    pages: usize,
}

impl CaptureStore for ScriptedCapture {
    fn files(&self) -> Vec<CapturedFile> {
        (0..self.pages)
            .map(|i| CapturedFile {
                id: i.to_string(),
                file_name: format!("receiptImage{}.png", i),
            })
            .collect()
    }

    fn reset(&self) {}
}

/// Answers every analysis with a fixed payload.
struct CannedService {
    payload: &'static str,
}

#[async_trait]
impl ReceiptAnalysisClient for CannedService {
    async fn upload(&self, files: Vec<CapturedFile>) -> CoreResult<String> {
        Ok(format!("canned-{}", files.len()))
    }

    async fn fetch_analysis(&self, _remote_id: &str) -> CoreResult<String> {
        Ok(self.payload.to_string())
    }
}

fn check(check_id: &'static str, passed: bool, message: impl Into<String>) -> CheckResult {
    CheckResult {
        check_id,
        passed,
        message: message.into(),
    }
}

async fn ready_controller(
    payload: &'static str,
) -> CoreResult<SplitController<ScriptedCapture, CannedService>> {
    let mut ctl = SplitController::new(
        ScriptedCapture { pages: 1 },
        CannedService { payload },
        Arc::new(TracingObserver),
        SplitConfig::default(),
    )?;
    ctl.begin_session();
    match ctl.analyze().await? {
        AnalysisOutcome::Ready { .. } => Ok(ctl),
        AnalysisOutcome::Superseded => Err(CoreError::InvalidInput(
            "analysis unexpectedly superseded".to_string(),
        )),
    }
}

fn totals_of<S: CaptureStore, A: ReceiptAnalysisClient>(
    ctl: &SplitController<S, A>,
) -> CoreResult<SplitTotals> {
    ctl.totals()
        .ok_or_else(|| CoreError::InvalidInput("no split is ready".to_string()))
}

async fn run_checks() -> CoreResult<Vec<CheckResult>> {
    let mut out = Vec::new();

    let mut a = ready_controller(SCENARIO_A).await?;
    let t = totals_of(&a)?;
    out.push(check(
        "SCENARIO_A_INITIAL",
        (t.total_a, t.total_b, t.grand_total) == (300.0, 0.0, 300.0),
        format!("{:?}", t),
    ));
    a.set_allocation("0", 100.0)?;
    let t = totals_of(&a)?;
    out.push(check(
        "SCENARIO_A_ALLOCATED",
        (t.total_a, t.total_b, t.grand_total) == (200.0, 100.0, 300.0),
        format!("{:?}", t),
    ));

    let mut b = ready_controller(SCENARIO_B).await?;
    let ids: Vec<String> = b
        .state()
        .map(|s| s.items().iter().map(|i| i.id().to_string()).collect())
        .unwrap_or_default();
    out.push(check(
        "SCENARIO_B_DISTINCT_IDS",
        ids.len() == 2 && ids[0] != ids[1],
        format!("{:?}", ids),
    ));
    if ids.len() == 2 {
        b.set_allocation(&ids[0], 100.0)?;
        b.set_allocation(&ids[1], 200.0)?;
    }
    let t = totals_of(&b)?;
    out.push(check(
        "SCENARIO_B_TOTALS",
        t.grand_total == 800.0 && t.total_b == 300.0 && t.total_a == 500.0,
        format!("{:?}", t),
    ));

    let low = a.set_allocation("0", -50.0)?;
    let high = a.set_allocation("0", 9999.0)?;
    out.push(check(
        "SCENARIO_C_CLAMP",
        low == 0.0 && high == 300.0,
        format!("low={} high={}", low, high),
    ));

    let before = a.totals();
    let rejected = matches!(
        a.set_allocation("nonexistent", 10.0),
        Err(CoreError::ItemNotFound(_))
    );
    out.push(check(
        "SCENARIO_D_UNKNOWN_ID",
        rejected && a.totals() == before,
        format!("rejected={}", rejected),
    ));

    let malformed = parse_items("not json");
    out.push(check(
        "MALFORMED_PAYLOAD",
        malformed.is_malformed() && malformed.items.is_empty(),
        format!("{:?}", malformed.status),
    ));

    Ok(out)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let results = match run_checks().await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("scenario runner error: {}", e);
            std::process::exit(1);
        }
    };

    let mut any_fail = false;
    for r in &results {
        println!(
            "CHECK {} {} {}",
            r.check_id,
            if r.passed { "PASS" } else { "FAIL" },
            r.message
        );
        any_fail |= !r.passed;
    }
    let summary = serde_json::json!({
        "checks": results.len(),
        "failed": results.iter().filter(|r| !r.passed).count(),
    });
    println!("SUMMARY {}", summary);
    if any_fail {
        std::process::exit(1);
    }
}
