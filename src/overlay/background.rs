use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use super::ciphers::{
    AuthenticationStatus, CipherService, CipherView, IconSettings, InlineMenuVisibility, OverlayCipherData,
};
use super::fill::AutofillService;
use super::focus::{FocusState, FocusTracker};
use super::session::{SubFrameOffsets, TabSession};
use crate::collect::model::AutofillPageDetails;
use crate::transport::BrowserApi;
use crate::transport::messages::{
    ExtensionMessage, FrameId, InboundPortMessage, InlineMenuPortCommand, MessageSender, PortMessage,
    SubFrameOffsetData, Tab, TabId, TabMessage,
};
use crate::transport::port::{Port, PortName};

pub(super) const TOP_FRAME_ID: FrameId = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySettings {
    /// Wait after a sub-frame rebuild before repositioning the inline menu.
    pub settle_delay: Duration,
    pub icons: IconSettings,
    pub inline_menu_visibility: InlineMenuVisibility,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(650),
            icons: IconSettings {
                icons_url: "https://icons.bitwarden.net".to_string(),
                show_favicons: true,
            },
            inline_menu_visibility: InlineMenuVisibility::default(),
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct CoordinatorState {
    pub(super) sessions: HashMap<TabId, TabSession>,
    pub(super) focus: FocusTracker,
}

/// Background end of an inline menu port, handed to the element that connected.
#[derive(Debug)]
pub struct InlineMenuPortConnection {
    pub port_key: String,
    pub receiver: mpsc::UnboundedReceiver<PortMessage>,
}

/// Coordinator for the inline menu across every frame of every tab.
///
/// All state sits behind one mutex that is never held across an `.await`;
/// anything read before an await is re-validated after it.
pub struct OverlayBackground {
    pub(super) state: Mutex<CoordinatorState>,
    pub(super) browser: Arc<dyn BrowserApi>,
    ciphers: Arc<dyn CipherService>,
    pub(super) autofill: Arc<dyn AutofillService>,
    auth_status: watch::Receiver<AuthenticationStatus>,
    pub(super) settings: OverlaySettings,
}

impl OverlayBackground {
    pub fn new(
        browser: Arc<dyn BrowserApi>,
        ciphers: Arc<dyn CipherService>,
        autofill: Arc<dyn AutofillService>,
        auth_status: watch::Receiver<AuthenticationStatus>,
        settings: OverlaySettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CoordinatorState::default()),
            browser,
            ciphers,
            autofill,
            auth_status,
            settings,
        })
    }

    pub(super) fn is_unlocked(&self) -> bool {
        *self.auth_status.borrow() == AuthenticationStatus::Unlocked
    }

    /// Whether the tab's session is still the one identified by `port_key`.
    pub(super) fn session_is_current(&self, tab_id: TabId, port_key: &str) -> bool {
        self.state
            .lock()
            .sessions
            .get(&tab_id)
            .is_some_and(|session| session.port_key == port_key)
    }

    // ------------------------------------------------------------------------
    // Message dispatch
    // ------------------------------------------------------------------------

    /// Handles one runtime message. The returned value, if any, is the
    /// response for the sender.
    pub async fn handle_message(self: &Arc<Self>, message: ExtensionMessage, sender: &MessageSender) -> Option<Value> {
        match message {
            ExtensionMessage::CollectPageDetailsResponse { details } => {
                self.store_page_details(sender, details);
                None
            }
            ExtensionMessage::UpdateSubFrameData { sub_frame_data } => {
                self.update_sub_frame_data(sender, sub_frame_data);
                None
            }
            ExtensionMessage::RebuildSubFrameOffsets => {
                self.rebuild_sub_frame_offsets(sender);
                None
            }
            ExtensionMessage::UpdateFocusedFieldData { focused_field_data } => {
                self.state
                    .lock()
                    .focus
                    .focus(sender.tab.id, sender.frame_id, focused_field_data);
                None
            }
            ExtensionMessage::UpdateIsFieldCurrentlyFocused {
                is_field_currently_focused,
            } => {
                self.state.lock().focus.set_currently_focused(is_field_currently_focused);
                None
            }
            ExtensionMessage::CloseAutofillInlineMenu {
                force_close_inline_menu,
            } => {
                self.close_inline_menu(&sender.tab, force_close_inline_menu).await;
                None
            }
            ExtensionMessage::GetAutofillInlineMenuVisibility => {
                let visibility: u8 = self.settings.inline_menu_visibility.into();
                Some(Value::from(visibility))
            }
            ExtensionMessage::UpdateAutofillInlineMenuPosition { overlay_element } => {
                self.update_inline_menu_position(sender, overlay_element);
                None
            }
            ExtensionMessage::Unknown => {
                debug!("ignoring unknown extension message");
                None
            }
        }
    }

    fn store_page_details(self: &Arc<Self>, sender: &MessageSender, details: AutofillPageDetails) {
        let frame_id = sender.frame_id;
        let needs_offset = {
            let mut state = self.state.lock();
            let session = state
                .sessions
                .entry(sender.tab.id)
                .or_insert_with(|| TabSession::new(sender.tab.clone()));
            session.set_page_details(frame_id, details);

            let needs_offset = frame_id != TOP_FRAME_ID && !session.has_offset_entry(frame_id);
            if needs_offset {
                session.resolving.insert(frame_id);
            }
            needs_offset
        };

        if !needs_offset {
            return;
        }

        debug!(tab_id = sender.tab.id, frame_id, "resolving sub-frame offset");
        let this = Arc::clone(self);
        let tab = sender.tab.clone();
        let url = sender.url.clone();
        let handle = tokio::spawn(async move {
            this.build_sub_frame_offsets(&tab, frame_id, &url).await;
        })
        .abort_handle();

        if let Some(session) = self.state.lock().sessions.get_mut(&sender.tab.id) {
            session.track_background(handle);
        }
    }

    fn update_sub_frame_data(&self, sender: &MessageSender, sub_frame_data: SubFrameOffsetData) {
        let mut state = self.state.lock();
        if let Some(session) = state.sessions.get_mut(&sender.tab.id) {
            session.sub_frame_offsets.insert(sender.frame_id, Some(sub_frame_data));
        }
    }

    async fn close_inline_menu(&self, tab: &Tab, force_close_inline_menu: bool) {
        self.state.lock().focus.blur();
        let message = TabMessage::CloseAutofillInlineMenu {
            force_close_inline_menu,
        };
        if let Err(error) = self.browser.tab_send_message(tab, message, Some(TOP_FRAME_ID)).await {
            debug!(tab_id = tab.id, %error, "failed to forward inline menu close");
        }
    }

    // ------------------------------------------------------------------------
    // Overlay ciphers
    // ------------------------------------------------------------------------

    /// Refreshes the inline menu list for the active tab of the current
    /// window. Tabs that never reported page details are left alone.
    pub async fn update_overlay_ciphers(&self) {
        if !self.is_unlocked() {
            return;
        }

        let Some(tab) = self.browser.get_tab_from_current_window().await else {
            return;
        };
        let Some(port_key) = self.port_key(tab.id) else {
            debug!(tab_id = tab.id, "no page details for the current tab, skipping cipher refresh");
            return;
        };

        let mut ciphers = self.ciphers.get_all_decrypted_for_url(&tab.url).await;
        ciphers.sort_by(|a, b| self.ciphers.sort_ciphers_by_last_used_then_name(a, b));

        let overlay_ciphers: Vec<(String, CipherView)> = ciphers
            .into_iter()
            .enumerate()
            .map(|(index, cipher)| (format!("overlay-cipher-{index}"), cipher))
            .collect();
        let cipher_data: Vec<OverlayCipherData> = overlay_ciphers
            .iter()
            .map(|(id, cipher)| OverlayCipherData::from_cipher(id, cipher, &self.settings.icons))
            .collect();
        let populated = !cipher_data.is_empty();

        let list_port = {
            let mut state = self.state.lock();
            let Some(session) = state.sessions.get_mut(&tab.id).filter(|s| s.port_key == port_key) else {
                return;
            };
            session.overlay_ciphers = overlay_ciphers;
            session.list_port.clone()
        };

        if !self.is_unlocked() {
            return;
        }

        if let Some(port) = list_port {
            let message = PortMessage::UpdateAutofillInlineMenuListCiphers { ciphers: cipher_data };
            if let Err(error) = port.post_message(message) {
                warn!(tab_id = tab.id, %error, "failed to post ciphers to the inline menu list");
            }
        }

        let message = TabMessage::UpdateIsOverlayCiphersPopulated {
            is_overlay_ciphers_populated: populated,
        };
        if let Err(error) = self.browser.tab_send_message(&tab, message, None).await {
            debug!(tab_id = tab.id, %error, "failed to report overlay cipher population");
        }
    }

    // ------------------------------------------------------------------------
    // Ports
    // ------------------------------------------------------------------------

    /// Connects an inline menu element to the tab's session. Returns `None`,
    /// leaving the element disconnected, when the tab has no session.
    pub fn connect_port(&self, tab: &Tab, name: PortName) -> Option<InlineMenuPortConnection> {
        let mut state = self.state.lock();
        let Some(session) = state.sessions.get_mut(&tab.id) else {
            warn!(tab_id = tab.id, port = ?name, "inline menu port connected before any page details");
            return None;
        };

        let (port, receiver) = Port::open(name);
        match name {
            PortName::InlineMenuButton => session.button_port = Some(port),
            PortName::InlineMenuList => session.list_port = Some(port),
        }
        Some(InlineMenuPortConnection {
            port_key: session.port_key.clone(),
            receiver,
        })
    }

    /// Handles a message from an inline menu element. Messages whose key
    /// does not match the tab's port key are dropped.
    pub async fn handle_port_message(&self, tab: &Tab, name: PortName, message: InboundPortMessage) {
        let key_matches = {
            let state = self.state.lock();
            state
                .sessions
                .get(&tab.id)
                .is_some_and(|session| message.port_key.as_deref() == Some(session.port_key.as_str()))
        };
        if !key_matches {
            warn!(tab_id = tab.id, port = ?name, "dropping port message with invalid port key");
            return;
        }

        match message.command {
            InlineMenuPortCommand::CloseAutofillInlineMenu => self.close_inline_menu(tab, false).await,
            InlineMenuPortCommand::FillSelectedListItem { overlay_cipher_id } => {
                if name == PortName::InlineMenuList {
                    self.fill_selected_list_item(tab, overlay_cipher_id).await;
                }
            }
            InlineMenuPortCommand::Unknown => debug!(port = ?name, "ignoring unknown port command"),
        }
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    /// Drops everything known about a tab. Safe to call repeatedly.
    pub fn remove_page_details(&self, tab_id: TabId) {
        let mut state = self.state.lock();
        if let Some(mut session) = state.sessions.remove(&tab_id) {
            session.teardown();
        }
        state.focus.clear_for_tab(tab_id);
    }

    pub fn on_tab_removed(&self, tab_id: TabId) {
        self.remove_page_details(tab_id);
    }

    /// Only a top-level navigation invalidates the tab.
    pub fn on_tab_navigated(&self, tab_id: TabId, frame_id: FrameId) {
        if frame_id == TOP_FRAME_ID {
            self.remove_page_details(tab_id);
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn has_session(&self, tab_id: TabId) -> bool {
        self.state.lock().sessions.contains_key(&tab_id)
    }

    pub fn page_details(&self, tab_id: TabId) -> Vec<(FrameId, AutofillPageDetails)> {
        self.state
            .lock()
            .sessions
            .get(&tab_id)
            .map(|session| session.page_details.clone())
            .unwrap_or_default()
    }

    pub fn sub_frame_offsets(&self, tab_id: TabId) -> Option<SubFrameOffsets> {
        self.state
            .lock()
            .sessions
            .get(&tab_id)
            .map(|session| session.sub_frame_offsets.clone())
    }

    pub fn port_key(&self, tab_id: TabId) -> Option<String> {
        self.state
            .lock()
            .sessions
            .get(&tab_id)
            .map(|session| session.port_key.clone())
    }

    pub fn overlay_cipher_ids(&self, tab_id: TabId) -> Vec<(String, String)> {
        self.state
            .lock()
            .sessions
            .get(&tab_id)
            .map(|session| {
                session
                    .overlay_ciphers
                    .iter()
                    .map(|(overlay_id, cipher)| (overlay_id.clone(), cipher.id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn overlay_cipher(&self, tab_id: TabId, overlay_cipher_id: &str) -> Option<CipherView> {
        self.state
            .lock()
            .sessions
            .get(&tab_id)
            .and_then(|session| session.overlay_cipher(overlay_cipher_id).cloned())
    }

    pub fn focus_state(&self) -> FocusState {
        self.state.lock().focus.state()
    }

    pub fn has_pending_reposition(&self, tab_id: TabId) -> bool {
        self.state
            .lock()
            .sessions
            .get(&tab_id)
            .and_then(|session| session.reposition.as_ref())
            .is_some_and(|handle| !handle.is_finished())
    }
}
