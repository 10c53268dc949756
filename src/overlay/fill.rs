use async_trait::async_trait;
use tracing::debug;

use super::background::OverlayBackground;
use super::ciphers::{CipherRepromptType, CipherView};
use crate::collect::model::AutofillPageDetails;
use crate::transport::messages::Tab;

/// What the autofill engine needs to fill one cipher into a tab.
#[derive(Debug, Clone, PartialEq)]
pub struct AutofillRequest {
    pub tab: Tab,
    pub cipher: CipherView,
    /// Page details of every frame of the tab, in arrival order.
    pub page_details: Vec<AutofillPageDetails>,
    pub fill_new_password: bool,
    pub allow_totp_autofill: bool,
}

/// Fills ciphers into pages. Implemented by the embedding.
#[async_trait]
pub trait AutofillService: Send + Sync {
    /// Returns the TOTP code generated while filling, if any.
    async fn do_autofill(&self, request: AutofillRequest) -> Option<String>;

    fn copy_to_clipboard(&self, text: &str);

    async fn is_password_reprompt_required(&self, cipher: &CipherView, _tab: &Tab) -> bool {
        cipher.reprompt != CipherRepromptType::None
    }
}

impl OverlayBackground {
    /// Fills the cipher behind an `overlay-cipher-<n>` id picked in the
    /// inline menu list, then moves it to the top of the list.
    pub(super) async fn fill_selected_list_item(&self, tab: &Tab, overlay_cipher_id: Option<String>) {
        let Some(overlay_cipher_id) = overlay_cipher_id else {
            return;
        };

        let selected = {
            let state = self.state.lock();
            let session = state.sessions.get(&tab.id);
            let cipher = session.and_then(|session| session.overlay_cipher(&overlay_cipher_id)).cloned();
            cipher.zip(session).map(|(cipher, session)| {
                let page_details: Vec<AutofillPageDetails> =
                    session.page_details.iter().map(|(_, details)| details.clone()).collect();
                (cipher, page_details, session.port_key.clone())
            })
        };
        let Some((cipher, page_details, port_key)) = selected else {
            debug!(tab_id = tab.id, %overlay_cipher_id, "no cipher behind the selected list item");
            return;
        };

        if self.autofill.is_password_reprompt_required(&cipher, tab).await {
            debug!(tab_id = tab.id, %overlay_cipher_id, "password reprompt required before filling");
            return;
        }
        if !self.session_is_current(tab.id, &port_key) {
            return;
        }

        let request = AutofillRequest {
            tab: tab.clone(),
            cipher,
            page_details,
            fill_new_password: true,
            allow_totp_autofill: true,
        };
        if let Some(totp) = self.autofill.do_autofill(request).await {
            self.autofill.copy_to_clipboard(&totp);
        }

        let mut state = self.state.lock();
        if let Some(session) = state.sessions.get_mut(&tab.id).filter(|s| s.port_key == port_key) {
            session.promote_overlay_cipher(&overlay_cipher_id);
        }
    }
}
