use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collect::model::AutofillPageDetails;
use crate::overlay::ciphers::OverlayCipherData;
use crate::overlay::position::InlineMenuStyles;

pub type TabId = i64;
pub type FrameId = i64;

// ============================================================================
// Sender metadata
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: TabId,
    pub url: String,
}

/// Who sent a one-shot message: the tab, the frame inside it, and the frame's URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub tab: Tab,
    pub frame_id: FrameId,
    pub url: String,
}

/// Frame metadata as reported by the browser's navigation API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDetails {
    pub frame_id: FrameId,
    /// `-1` for the top-level frame.
    pub parent_frame_id: FrameId,
    pub url: String,
}

/// Pixel offset of a sub-frame relative to the top-level viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubFrameOffsetData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
    pub left: f64,
    pub top: f64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedFieldData {
    #[serde(default)]
    pub focused_field_styles: BTreeMap<String, String>,
    #[serde(default)]
    pub focused_field_rects: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opid: Option<String>,
}

// ============================================================================
// Runtime messages (frame -> background)
// ============================================================================

/// One-shot messages handled by the background coordinator.
///
/// Unknown commands deserialize to [`ExtensionMessage::Unknown`] and extra
/// fields are ignored, so newer senders never break older receivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExtensionMessage {
    CollectPageDetailsResponse {
        details: AutofillPageDetails,
    },
    UpdateSubFrameData {
        sub_frame_data: SubFrameOffsetData,
    },
    RebuildSubFrameOffsets,
    UpdateFocusedFieldData {
        focused_field_data: FocusedFieldData,
    },
    UpdateIsFieldCurrentlyFocused {
        is_field_currently_focused: bool,
    },
    CloseAutofillInlineMenu {
        #[serde(default)]
        force_close_inline_menu: bool,
    },
    GetAutofillInlineMenuVisibility,
    /// Sent by the top frame once an inline menu element is in its DOM.
    UpdateAutofillInlineMenuPosition {
        overlay_element: InlineMenuElement,
    },
    #[serde(other)]
    Unknown,
}

// ============================================================================
// Tab messages (background -> frame)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InlineMenuElement {
    Button,
    List,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TabMessage {
    /// Asks a parent frame where its child iframe sits.
    GetSubFrameOffsets {
        sub_frame_url: String,
        sub_frame_id: FrameId,
    },
    /// Asks a frame to find its own offset through window messaging.
    GetSubFrameOffsetsFromWindowMessage {
        sub_frame_id: FrameId,
    },
    AppendInlineMenuElementsToDom {
        overlay_element: InlineMenuElement,
    },
    CheckMostRecentlyFocusedFieldHasValue,
    UpdateIsOverlayCiphersPopulated {
        is_overlay_ciphers_populated: bool,
    },
    CloseAutofillInlineMenu {
        force_close_inline_menu: bool,
    },
}

// ============================================================================
// Port messages
// ============================================================================

/// Messages posted to an inline menu element over its port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PortMessage {
    UpdateAutofillInlineMenuListCiphers { ciphers: Vec<OverlayCipherData> },
    UpdateIframePosition { styles: InlineMenuStyles },
}

/// Message received from an inline menu element. Every message must carry
/// the port key handed out when the port connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundPortMessage {
    #[serde(default)]
    pub port_key: Option<String>,
    #[serde(flatten)]
    pub command: InlineMenuPortCommand,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InlineMenuPortCommand {
    CloseAutofillInlineMenu,
    /// The user picked an entry of the inline menu list.
    FillSelectedListItem {
        #[serde(default)]
        overlay_cipher_id: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Decodes the optional JSON reply of a tab message.
pub fn decode_response<T>(response: Option<Value>) -> Result<Option<T>, serde_json::Error>
where
    T: for<'de> Deserialize<'de>,
{
    match response {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value).map(Some),
    }
}
