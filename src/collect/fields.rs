use url::Url;

use super::model::SelectInfo;
use crate::dom::{Document, NodeId};

/// Input types that never hold user credentials or profile data.
const IGNORED_INPUT_TYPES: &[&str] = &["hidden", "submit", "reset", "button", "image", "file"];
const NON_INPUT_FIELD_TAGS: &[&str] = &["textarea", "select"];
const UNIMPORTANT_FIELD_TYPES: &[&str] = &["checkbox", "radio"];

pub const MAX_LENGTH_CAP: i64 = 999;
const HIDDEN_VALUE_MAX_LENGTH: usize = 254;

/// Whether a node is a collectable field: a non-ignored input, a textarea or
/// select (none opted out through `data-bwignore`), or `span[data-bwautofill]`.
pub fn is_form_field_element(doc: &Document, node: NodeId) -> bool {
    let Some(tag) = doc.tag_name(node) else {
        return false;
    };

    if tag == "span" && doc.has_attribute(node, "data-bwautofill") {
        return true;
    }

    let ignored = doc.has_attribute(node, "data-bwignore");
    if tag == "input" {
        let input_type = doc.input_type(node).unwrap_or_default();
        return !ignored && !IGNORED_INPUT_TYPES.contains(&input_type.as_str());
    }

    NON_INPUT_FIELD_TAGS.contains(&tag) && !ignored
}

pub fn is_form_or_field_element(doc: &Document, node: NodeId) -> bool {
    doc.is_form_element(node) || is_form_field_element(doc, node)
}

/// Applies the field cap. Under the limit everything is kept; over it,
/// non-checkbox/radio fields come first and the remaining slots are filled
/// with checkbox/radio fields, each group in document order.
pub fn limit_field_candidates(doc: &Document, candidates: Vec<NodeId>, limit: usize) -> Vec<NodeId> {
    if limit == 0 || candidates.len() <= limit {
        return candidates;
    }

    let mut priority = Vec::with_capacity(limit);
    let mut unimportant = Vec::new();
    for element in candidates {
        if priority.len() >= limit {
            return priority;
        }
        let field_type = attribute_lower_case(doc, element, "type").unwrap_or_default();
        if UNIMPORTANT_FIELD_TYPES.contains(&field_type.as_str()) {
            unimportant.push(element);
        } else {
            priority.push(element);
        }
    }

    let remaining = limit.saturating_sub(priority.len());
    priority.extend(unimportant.into_iter().take(remaining));
    priority
}

pub fn attribute_lower_case(doc: &Document, element: NodeId, name: &str) -> Option<String> {
    doc.property_or_attribute(element, name)
        .map(|value| value.to_lowercase())
}

/// `maxLength` for inputs and textareas, capped at 999 (999 when unset).
pub fn field_max_length(doc: &Document, element: NodeId) -> Option<i64> {
    if !matches!(doc.tag_name(element), Some("input" | "textarea")) {
        return None;
    }
    let max_length = doc.max_length(element);
    let max_length = if max_length > -1 { max_length } else { MAX_LENGTH_CAP };
    Some(max_length.min(MAX_LENGTH_CAP))
}

/// Value reported for a field. Checkboxes report a check mark rather than
/// their value, long hidden values are truncated, and spans report text.
pub fn element_value(doc: &Document, element: NodeId) -> String {
    if !doc.is_fillable_form_field(element) {
        return doc.text_content(element);
    }

    let value = doc.value(element);
    let element_type = doc.input_type(element).unwrap_or_default().to_lowercase();
    if doc.has_tag(element, "input") && element_type == "checkbox" {
        return if doc.checked(element) { "✓".to_string() } else { String::new() };
    }

    if element_type == "hidden" && value.chars().count() > HIDDEN_VALUE_MAX_LENGTH {
        let prefix: String = value.chars().take(HIDDEN_VALUE_MAX_LENGTH).collect();
        return format!("{prefix}...SNIPPED");
    }

    value
}

/// `data-*` attributes rendered as `"key: value, "` per entry.
pub fn data_set_values(doc: &Document, element: NodeId) -> String {
    doc.dataset(element)
        .into_iter()
        .map(|(key, value)| format!("{key}: {value}, "))
        .collect()
}

/// Select options with their text lower-cased and stripped of whitespace and punctuation.
pub fn select_element_options(doc: &Document, element: NodeId) -> SelectInfo {
    let options = doc
        .select_options(element)
        .into_iter()
        .map(|(text, value)| {
            let text = (!text.is_empty()).then(|| {
                text.to_lowercase()
                    .chars()
                    .filter(|c| !c.is_whitespace() && !OPTION_TEXT_PUNCTUATION.contains(*c))
                    .collect()
            });
            (text, value)
        })
        .collect();
    SelectInfo { options }
}

const OPTION_TEXT_PUNCTUATION: &str = "~`!@$%^&#*()-_+=:;'\"[]|\\,<.>?";

/// First non-empty of `x-autocompletetype`, `autocompletetype`, `autocomplete`.
pub fn auto_complete_attribute(doc: &Document, element: NodeId) -> Option<String> {
    let non_empty = |name: &str| doc.property_or_attribute(element, name).filter(|v| !v.is_empty());
    non_empty("x-autocompletetype")
        .or_else(|| non_empty("autocompletetype"))
        .or_else(|| doc.property_or_attribute(element, "autocomplete"))
}

/// The form's action resolved against the page location.
pub fn form_action(doc: &Document, form: NodeId, location: &str) -> String {
    let action = doc.property_or_attribute(form, "action").unwrap_or_default();
    match Url::parse(location) {
        Ok(base) => base
            .join(action.trim())
            .map(|resolved| resolved.to_string())
            .unwrap_or(action),
        Err(_) => action,
    }
}

/// Inclusive ancestor `button[type=submit]`.
pub fn is_within_submit_button(doc: &Document, element: NodeId) -> bool {
    doc.closest(element, |doc, node| {
        doc.has_tag(node, "button")
            && doc
                .attribute(node, "type")
                .is_some_and(|t| t.eq_ignore_ascii_case("submit"))
    })
    .is_some()
}
