use async_trait::async_trait;
use serde_json::Value;

use super::TransportError;
use super::messages::{FrameDetails, FrameId, Tab, TabId, TabMessage};

/// Browser extension APIs the coordinator depends on.
///
/// Implemented by the embedding (a real extension runtime) and by test fakes.
#[async_trait]
pub trait BrowserApi: Send + Sync {
    /// Sends a one-shot message to a tab, optionally targeting a single frame.
    /// `Ok(None)` means the receiver answered without data.
    async fn tab_send_message(
        &self,
        tab: &Tab,
        message: TabMessage,
        frame_id: Option<FrameId>,
    ) -> Result<Option<Value>, TransportError>;

    /// Navigation metadata of a frame, `None` when the frame is gone.
    async fn get_frame_details(&self, tab_id: TabId, frame_id: FrameId) -> Option<FrameDetails>;

    /// Active tab of the current window.
    async fn get_tab_from_current_window(&self) -> Option<Tab>;
}
