#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autofill_engine::collect::{AutofillField, AutofillOverlayContent, AutofillPageDetails};
use autofill_engine::dom::{Document, NodeId};
use autofill_engine::overlay::{AutofillRequest, AutofillService, CipherService, CipherView};
use autofill_engine::transport::messages::{FrameDetails, FrameId, Tab, TabId, TabMessage};
use autofill_engine::transport::{BrowserApi, TransportError};
use parking_lot::Mutex;
use serde_json::Value;

// ============================================================================
// Overlay content (frame side)
// ============================================================================

#[derive(Debug, Default)]
pub struct OverlayLog {
    /// (element, opid, element number) per listener setup, in call order.
    pub listener_setups: Vec<(NodeId, String, i64)>,
    pub update_required: Vec<bool>,
    pub cleared_user_filled_fields: usize,
}

/// Records every call; the log is shared so tests can read it while the
/// collector owns the overlay.
#[derive(Clone, Default)]
pub struct RecordingOverlay {
    pub log: Arc<Mutex<OverlayLog>>,
}

impl RecordingOverlay {
    pub fn new() -> (Box<dyn AutofillOverlayContent>, Arc<Mutex<OverlayLog>>) {
        let overlay = Self::default();
        let log = Arc::clone(&overlay.log);
        (Box::new(overlay), log)
    }
}

impl AutofillOverlayContent for RecordingOverlay {
    fn setup_overlay_listeners(
        &mut self,
        _doc: &Document,
        element: NodeId,
        field: &AutofillField,
        _page_details: &AutofillPageDetails,
    ) {
        self.log
            .lock()
            .listener_setups
            .push((element, field.opid.clone(), field.element_number));
    }

    fn set_page_details_update_required(&mut self, required: bool) {
        self.log.lock().update_required.push(required);
    }

    fn clear_user_filled_fields(&mut self) {
        self.log.lock().cleared_user_filled_fields += 1;
    }
}

// ============================================================================
// Browser API
// ============================================================================

type Responder = Box<dyn Fn(&TabMessage, Option<FrameId>) -> Option<Value> + Send + Sync>;

/// In-memory browser: a frame tree per tab, a scripted responder for tab
/// messages, and a log of everything the coordinator asked for.
///
/// With a latency set, every call sleeps on the tokio clock before
/// answering, so paused-clock tests can interleave work with it.
#[derive(Default)]
pub struct FakeBrowserApi {
    latency: Mutex<Option<Duration>>,
    frames: Mutex<HashMap<(TabId, FrameId), FrameDetails>>,
    responder: Mutex<Option<Responder>>,
    current_tab: Mutex<Option<Tab>>,
    sent: Mutex<Vec<(TabId, TabMessage, Option<FrameId>)>>,
    frame_queries: Mutex<Vec<(TabId, FrameId)>>,
    current_tab_queries: Mutex<usize>,
}

impl FakeBrowserApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_frame(&self, tab_id: TabId, frame_id: FrameId, parent_frame_id: FrameId, url: &str) {
        self.frames.lock().insert(
            (tab_id, frame_id),
            FrameDetails {
                frame_id,
                parent_frame_id,
                url: url.to_string(),
            },
        );
    }

    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&TabMessage, Option<FrameId>) -> Option<Value> + Send + Sync + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    async fn wait(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn set_current_tab(&self, tab: Option<Tab>) {
        *self.current_tab.lock() = tab;
    }

    pub fn sent(&self) -> Vec<(TabId, TabMessage, Option<FrameId>)> {
        self.sent.lock().clone()
    }

    pub fn was_sent(&self, message: &TabMessage, frame_id: Option<FrameId>) -> bool {
        self.sent
            .lock()
            .iter()
            .any(|(_, sent, frame)| sent == message && *frame == frame_id)
    }

    pub fn count_sent<F>(&self, predicate: F) -> usize
    where
        F: Fn(&TabMessage) -> bool,
    {
        self.sent.lock().iter().filter(|(_, message, _)| predicate(message)).count()
    }

    pub fn frame_queries(&self) -> Vec<(TabId, FrameId)> {
        self.frame_queries.lock().clone()
    }

    pub fn current_tab_queries(&self) -> usize {
        *self.current_tab_queries.lock()
    }

    pub fn clear_log(&self) {
        self.sent.lock().clear();
        self.frame_queries.lock().clear();
    }
}

#[async_trait]
impl BrowserApi for FakeBrowserApi {
    async fn tab_send_message(
        &self,
        tab: &Tab,
        message: TabMessage,
        frame_id: Option<FrameId>,
    ) -> Result<Option<Value>, TransportError> {
        self.wait().await;
        let response = self
            .responder
            .lock()
            .as_ref()
            .and_then(|responder| responder(&message, frame_id));
        self.sent.lock().push((tab.id, message, frame_id));
        Ok(response)
    }

    async fn get_frame_details(&self, tab_id: TabId, frame_id: FrameId) -> Option<FrameDetails> {
        self.frame_queries.lock().push((tab_id, frame_id));
        self.wait().await;
        self.frames.lock().get(&(tab_id, frame_id)).cloned()
    }

    async fn get_tab_from_current_window(&self) -> Option<Tab> {
        *self.current_tab_queries.lock() += 1;
        self.current_tab.lock().clone()
    }
}

// ============================================================================
// Cipher service
// ============================================================================

/// Returns a fixed list of ciphers and records the URLs asked for.
#[derive(Default)]
pub struct FakeCipherService {
    pub ciphers: Mutex<Vec<CipherView>>,
    pub requested_urls: Mutex<Vec<String>>,
}

impl FakeCipherService {
    pub fn with_ciphers(ciphers: Vec<CipherView>) -> Arc<Self> {
        Arc::new(Self {
            ciphers: Mutex::new(ciphers),
            ..Self::default()
        })
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested_urls.lock().clone()
    }
}

#[async_trait]
impl CipherService for FakeCipherService {
    async fn get_all_decrypted_for_url(&self, url: &str) -> Vec<CipherView> {
        self.requested_urls.lock().push(url.to_string());
        self.ciphers.lock().clone()
    }

    fn sort_ciphers_by_last_used_then_name(&self, a: &CipherView, b: &CipherView) -> Ordering {
        b.last_used_date
            .cmp(&a.last_used_date)
            .then_with(|| a.name.cmp(&b.name))
    }
}

// ============================================================================
// Autofill service
// ============================================================================

/// Records fill requests and clipboard writes; answers with a fixed TOTP code.
#[derive(Default)]
pub struct FakeAutofillService {
    totp: Mutex<Option<String>>,
    requests: Mutex<Vec<AutofillRequest>>,
    clipboard: Mutex<Vec<String>>,
}

impl FakeAutofillService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_totp(&self, code: &str) {
        *self.totp.lock() = Some(code.to_string());
    }

    pub fn requests(&self) -> Vec<AutofillRequest> {
        self.requests.lock().clone()
    }

    pub fn clipboard(&self) -> Vec<String> {
        self.clipboard.lock().clone()
    }
}

#[async_trait]
impl AutofillService for FakeAutofillService {
    async fn do_autofill(&self, request: AutofillRequest) -> Option<String> {
        self.requests.lock().push(request);
        self.totp.lock().clone()
    }

    fn copy_to_clipboard(&self, text: &str) {
        self.clipboard.lock().push(text.to_string());
    }
}
