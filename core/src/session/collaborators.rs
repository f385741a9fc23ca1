use crate::error::CoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A locally stored capture waiting to be submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CapturedFile {
    pub id: String,
    pub file_name: String,
}

/// Document capture side: owns the images of the current session.
pub trait CaptureStore: Send + Sync {
    fn files(&self) -> Vec<CapturedFile>;
    fn reset(&self);
}

/// Remote receipt analysis service.
#[async_trait]
pub trait ReceiptAnalysisClient: Send + Sync + 'static {
    /// Submit the captured images, returning the remote analysis id.
    async fn upload(&self, files: Vec<CapturedFile>) -> CoreResult<String>;

    /// Fetch the raw analysis payload for a remote analysis id.
    async fn fetch_analysis(&self, remote_id: &str) -> CoreResult<String>;
}
