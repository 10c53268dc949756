use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ============================================================================
// Page details wire model
// ============================================================================

/// A tracked `<form>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AutofillForm {
    pub opid: String,
    /// Absolute URL, resolved against the document location.
    pub html_action: String,
    pub html_name: String,
    #[serde(rename = "htmlID")]
    pub html_id: String,
    pub html_method: String,
}

/// Options of a select element as `[normalizedText, value]` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SelectInfo {
    pub options: Vec<(Option<String>, String)>,
}

/// A tracked input, textarea, select or `span[data-bwautofill]`.
///
/// Span fields carry only the base properties (everything up to
/// `data_set_values`); hidden inputs omit the label properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AutofillField {
    pub opid: String,
    /// Position in the last full scan, `-1` when discovered between scans.
    pub element_number: i64,
    pub viewable: bool,
    pub max_length: Option<i64>,
    #[serde(rename = "htmlID")]
    pub html_id: Option<String>,
    pub html_name: Option<String>,
    pub html_class: Option<String>,
    pub tabindex: Option<String>,
    pub title: Option<String>,
    pub tag_name: Option<String>,
    pub data_set_values: String,

    #[serde(rename = "label-tag", default, skip_serializing_if = "Option::is_none")]
    pub label_tag: Option<String>,
    #[serde(rename = "label-data", default, skip_serializing_if = "Option::is_none")]
    pub label_data: Option<String>,
    #[serde(rename = "label-aria", default, skip_serializing_if = "Option::is_none")]
    pub label_aria: Option<String>,
    #[serde(rename = "label-top", default, skip_serializing_if = "Option::is_none")]
    pub label_top: Option<String>,
    #[serde(rename = "label-right", default, skip_serializing_if = "Option::is_none")]
    pub label_right: Option<String>,
    #[serde(rename = "label-left", default, skip_serializing_if = "Option::is_none")]
    pub label_left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_complete_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_info: Option<SelectInfo>,
    /// Owning form's opid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(rename = "aria-hidden", default, skip_serializing_if = "Option::is_none")]
    pub aria_hidden: Option<bool>,
    #[serde(rename = "aria-disabled", default, skip_serializing_if = "Option::is_none")]
    pub aria_disabled: Option<bool>,
    #[serde(rename = "aria-haspopup", default, skip_serializing_if = "Option::is_none")]
    pub aria_haspopup: Option<bool>,
    #[serde(rename = "data-stripe", default, skip_serializing_if = "Option::is_none")]
    pub data_stripe: Option<String>,
}

/// Snapshot of a frame's forms and fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AutofillPageDetails {
    pub title: String,
    pub url: String,
    pub document_url: String,
    pub forms: BTreeMap<String, AutofillForm>,
    pub fields: Vec<AutofillField>,
    /// Epoch milliseconds.
    pub collected_timestamp: u64,
}

impl AutofillPageDetails {
    /// Equality ignoring the collection timestamp.
    pub fn same_content(&self, other: &Self) -> bool {
        self.title == other.title
            && self.url == other.url
            && self.document_url == other.document_url
            && self.forms == other.forms
            && self.fields == other.fields
    }
}
