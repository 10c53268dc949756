//! Sub-frame offset resolution and inline menu repositioning.
//!
//! A frame's offset is the sum of its iframe's position inside every
//! ancestor frame, asked of each parent in turn. When a parent cannot
//! answer, the frame is asked to work it out through window messages and
//! reports back with `updateSubFrameData`.

use std::sync::Arc;

use tracing::debug;

use super::background::{OverlayBackground, TOP_FRAME_ID};
use super::position::{inline_menu_button_position, inline_menu_list_position};
use crate::transport::messages::{
    FrameId, InlineMenuElement, MessageSender, PortMessage, SubFrameOffsetData, Tab, TabMessage, decode_response,
};

impl OverlayBackground {
    /// Resolves and stores the offset of `frame_id`, starting from `url`.
    ///
    /// Stops silently once the tab's session is gone or replaced.
    pub(super) async fn build_sub_frame_offsets(&self, tab: &Tab, frame_id: FrameId, url: &str) {
        let Some(port_key) = self.port_key(tab.id) else {
            return;
        };

        let mut offset = SubFrameOffsetData {
            frame_id: Some(frame_id),
            left: 0.0,
            top: 0.0,
            url: url.to_string(),
        };

        let mut frame_details = self.browser.get_frame_details(tab.id, frame_id).await;
        if frame_details.is_none() {
            debug!(tab_id = tab.id, frame_id, "no frame details, falling back to window messages");
            self.store_offset_placeholder(tab, frame_id, &port_key).await;
            return;
        }

        while let Some(frame) = frame_details.take().filter(|frame| frame.parent_frame_id > -1) {
            if !self.session_is_current(tab.id, &port_key) {
                return;
            }

            let request = TabMessage::GetSubFrameOffsets {
                sub_frame_url: frame.url.clone(),
                sub_frame_id: frame.frame_id,
            };
            let response = self
                .browser
                .tab_send_message(tab, request, Some(frame.parent_frame_id))
                .await;
            let parent_offset = match response {
                Ok(response) => decode_response::<SubFrameOffsetData>(response).unwrap_or_else(|error| {
                    debug!(tab_id = tab.id, frame_id, %error, "malformed sub-frame offset");
                    None
                }),
                Err(error) => {
                    debug!(tab_id = tab.id, frame_id, %error, "sub-frame offset request failed");
                    None
                }
            };

            let Some(parent_offset) = parent_offset else {
                self.store_offset_placeholder(tab, frame_id, &port_key).await;
                return;
            };

            offset.left += parent_offset.left;
            offset.top += parent_offset.top;

            if !self.session_is_current(tab.id, &port_key) {
                return;
            }
            frame_details = self.browser.get_frame_details(tab.id, frame.parent_frame_id).await;
        }

        let mut state = self.state.lock();
        if let Some(session) = state.sessions.get_mut(&tab.id).filter(|s| s.port_key == port_key) {
            debug!(tab_id = tab.id, frame_id, left = offset.left, top = offset.top, "sub-frame offset resolved");
            session.sub_frame_offsets.insert(frame_id, Some(offset));
            session.resolving.remove(&frame_id);
        }
    }

    async fn store_offset_placeholder(&self, tab: &Tab, frame_id: FrameId, port_key: &str) {
        {
            let mut state = self.state.lock();
            let Some(session) = state.sessions.get_mut(&tab.id).filter(|s| s.port_key == port_key) else {
                return;
            };
            session.sub_frame_offsets.insert(frame_id, None);
            session.resolving.remove(&frame_id);
        }

        let message = TabMessage::GetSubFrameOffsetsFromWindowMessage { sub_frame_id: frame_id };
        if let Err(error) = self.browser.tab_send_message(tab, message, Some(frame_id)).await {
            debug!(tab_id = tab.id, frame_id, %error, "window message fallback not delivered");
        }
    }

    /// Recomputes every known offset of the sender's tab except the sender's
    /// own, then repositions the inline menu once the page has settled.
    ///
    /// Does nothing when the sender frame holds the focused field or the tab
    /// has no offsets yet. A pending reposition is cancelled first; a
    /// recomputation already in flight keeps running and replaces each offset
    /// only once the new value is known.
    pub(super) fn rebuild_sub_frame_offsets(self: &Arc<Self>, sender: &MessageSender) {
        let tab = sender.tab.clone();
        let rebuild = {
            let mut state = self.state.lock();
            let state = &mut *state;
            let Some(session) = state.sessions.get_mut(&tab.id) else {
                return;
            };
            session.cancel_reposition();

            if state.focus.holds_frame(tab.id, sender.frame_id) || session.sub_frame_offsets.is_empty() {
                debug!(tab_id = tab.id, frame_id = sender.frame_id, "skipping sub-frame rebuild");
                return;
            }

            let frames: Vec<FrameId> = session
                .sub_frame_offsets
                .frame_ids()
                .filter(|frame_id| *frame_id != sender.frame_id)
                .collect();
            (frames, session.port_key.clone())
        };
        let (frames, port_key) = rebuild;

        let this = Arc::clone(self);
        let task_tab = tab.clone();
        let url = sender.url.clone();
        let handle = tokio::spawn(async move {
            for frame_id in frames {
                if !this.session_is_current(task_tab.id, &port_key) {
                    return;
                }
                this.build_sub_frame_offsets(&task_tab, frame_id, &url).await;
            }
            this.schedule_reposition(&task_tab, &port_key);
        })
        .abort_handle();

        if let Some(session) = self.state.lock().sessions.get_mut(&tab.id) {
            session.track_background(handle);
        }
    }

    /// Starts the settle timer, replacing any timer still pending.
    fn schedule_reposition(self: &Arc<Self>, tab: &Tab, port_key: &str) {
        let mut state = self.state.lock();
        let Some(session) = state.sessions.get_mut(&tab.id).filter(|s| s.port_key == port_key) else {
            return;
        };
        session.cancel_reposition();

        let this = Arc::clone(self);
        let task_tab = tab.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(this.settings.settle_delay).await;
            this.update_inline_menu_position_after_sub_frame_rebuild(&task_tab).await;
        })
        .abort_handle();
        session.reposition = Some(handle);
    }

    async fn update_inline_menu_position_after_sub_frame_rebuild(&self, tab: &Tab) {
        let focused_frame = {
            let state = self.state.lock();
            if !state.focus.is_focused_in_tab(tab.id) {
                return;
            }
            state.focus.focused_field().map(|field| field.frame_id)
        };

        self.append_inline_menu_element(tab, InlineMenuElement::Button).await;

        let has_value = self
            .browser
            .tab_send_message(tab, TabMessage::CheckMostRecentlyFocusedFieldHasValue, focused_frame)
            .await
            .ok()
            .flatten()
            .and_then(|value| value.as_bool())
            .unwrap_or(false);

        if has_value && !self.is_unlocked() {
            return;
        }
        self.append_inline_menu_element(tab, InlineMenuElement::List).await;
    }

    async fn append_inline_menu_element(&self, tab: &Tab, overlay_element: InlineMenuElement) {
        let message = TabMessage::AppendInlineMenuElementsToDom { overlay_element };
        if let Err(error) = self.browser.tab_send_message(tab, message, Some(TOP_FRAME_ID)).await {
            debug!(tab_id = tab.id, ?overlay_element, %error, "failed to append inline menu element");
        }
    }
}

impl OverlayBackground {
    /// Posts the placement of one inline menu element to its port, in
    /// top-frame coordinates of the focused field.
    ///
    /// Skipped while the focused field's frame waits on the window-message
    /// fallback for its offset.
    pub(super) fn update_inline_menu_position(&self, sender: &MessageSender, overlay_element: InlineMenuElement) {
        let update = {
            let state = self.state.lock();
            let Some(field) = state.focus.focused_field().filter(|field| field.tab_id == sender.tab.id) else {
                return;
            };
            let Some(session) = state.sessions.get(&sender.tab.id) else {
                return;
            };
            let offset = match session.sub_frame_offsets.get(field.frame_id) {
                Some(None) => {
                    debug!(tab_id = sender.tab.id, frame_id = field.frame_id, "sub-frame offset pending");
                    return;
                }
                Some(Some(offset)) => Some(offset),
                None => None,
            };
            match overlay_element {
                InlineMenuElement::Button => (
                    session.button_port.clone(),
                    inline_menu_button_position(&field.data, offset),
                ),
                InlineMenuElement::List => (
                    session.list_port.clone(),
                    inline_menu_list_position(&field.data, offset),
                ),
            }
        };

        let (port, styles) = update;
        let Some(port) = port else {
            return;
        };
        if let Err(error) = port.post_message(PortMessage::UpdateIframePosition { styles }) {
            debug!(tab_id = sender.tab.id, ?overlay_element, %error, "failed to post inline menu position");
        }
    }
}
