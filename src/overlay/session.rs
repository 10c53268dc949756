use std::collections::HashSet;

use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

use super::ciphers::CipherView;
use crate::collect::model::AutofillPageDetails;
use crate::transport::messages::{FrameId, SubFrameOffsetData, Tab};
use crate::transport::port::Port;

const PORT_KEY_LENGTH: usize = 12;

/// Sub-frame offsets of a tab, kept in the order frames first reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubFrameOffsets {
    entries: Vec<(FrameId, Option<SubFrameOffsetData>)>,
}

impl SubFrameOffsets {
    /// The frame's entry: `Some(None)` while the window-message fallback is pending.
    pub fn get(&self, frame_id: FrameId) -> Option<&Option<SubFrameOffsetData>> {
        self.entries
            .iter()
            .find(|(frame, _)| *frame == frame_id)
            .map(|(_, offset)| offset)
    }

    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.get(frame_id).is_some()
    }

    /// Replaces an existing entry in place, otherwise appends.
    pub fn insert(&mut self, frame_id: FrameId, offset: Option<SubFrameOffsetData>) {
        match self.entries.iter_mut().find(|(frame, _)| *frame == frame_id) {
            Some(entry) => entry.1 = offset,
            None => self.entries.push((frame_id, offset)),
        }
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.entries.iter().map(|(frame, _)| *frame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the coordinator knows about one tab.
#[derive(Debug)]
pub struct TabSession {
    pub tab: Tab,
    /// Page details per frame, in arrival order.
    pub page_details: Vec<(FrameId, AutofillPageDetails)>,
    /// `None` marks a frame whose offset is pending a window-message answer.
    pub sub_frame_offsets: SubFrameOffsets,
    /// Frames with an offset resolution in flight.
    pub resolving: HashSet<FrameId>,
    pub port_key: String,
    pub overlay_ciphers: Vec<(String, CipherView)>,
    pub button_port: Option<Port>,
    pub list_port: Option<Port>,
    pub reposition: Option<AbortHandle>,
    pub background: Vec<AbortHandle>,
}

impl TabSession {
    pub fn new(tab: Tab) -> Self {
        Self {
            tab,
            page_details: Vec::new(),
            sub_frame_offsets: SubFrameOffsets::default(),
            resolving: HashSet::new(),
            port_key: generate_port_key(),
            overlay_ciphers: Vec::new(),
            button_port: None,
            list_port: None,
            reposition: None,
            background: Vec::new(),
        }
    }

    /// Stores a frame's details, replacing an earlier snapshot in place.
    pub fn set_page_details(&mut self, frame_id: FrameId, details: AutofillPageDetails) {
        match self.page_details.iter_mut().find(|(frame, _)| *frame == frame_id) {
            Some(entry) => entry.1 = details,
            None => self.page_details.push((frame_id, details)),
        }
    }

    pub fn page_details_for(&self, frame_id: FrameId) -> Option<&AutofillPageDetails> {
        self.page_details
            .iter()
            .find(|(frame, _)| *frame == frame_id)
            .map(|(_, details)| details)
    }

    /// Whether the frame has an offset entry or a resolution in flight.
    pub fn has_offset_entry(&self, frame_id: FrameId) -> bool {
        self.sub_frame_offsets.contains(frame_id) || self.resolving.contains(&frame_id)
    }

    pub fn overlay_cipher(&self, overlay_cipher_id: &str) -> Option<&CipherView> {
        self.overlay_ciphers
            .iter()
            .find(|(id, _)| id == overlay_cipher_id)
            .map(|(_, cipher)| cipher)
    }

    /// Moves a cipher to the front of the list, keeping its overlay id.
    pub fn promote_overlay_cipher(&mut self, overlay_cipher_id: &str) {
        if let Some(index) = self.overlay_ciphers.iter().position(|(id, _)| id == overlay_cipher_id) {
            let entry = self.overlay_ciphers.remove(index);
            self.overlay_ciphers.insert(0, entry);
        }
    }

    /// Aborts the pending settle timer. Offset recomputation already in
    /// flight is left to finish.
    pub fn cancel_reposition(&mut self) {
        if let Some(handle) = self.reposition.take() {
            handle.abort();
        }
    }

    pub fn track_background(&mut self, handle: AbortHandle) {
        self.background.retain(|task| !task.is_finished());
        self.background.push(handle);
    }

    /// Aborts every task still running on behalf of this tab.
    pub fn teardown(&mut self) {
        self.cancel_reposition();
        for handle in self.background.drain(..) {
            handle.abort();
        }
        self.resolving.clear();
        self.button_port = None;
        self.list_port = None;
        debug!(tab_id = self.tab.id, "tab session torn down");
    }
}

fn generate_port_key() -> String {
    Uuid::new_v4().simple().to_string()[..PORT_KEY_LENGTH].to_string()
}
