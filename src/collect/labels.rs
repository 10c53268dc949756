//! Label heuristics for form fields.
//!
//! Every source produces text normalized by [`trim_and_remove_non_printable_text`].

use crate::dom::{Document, NodeId};

/// Tags that start a new section of the page; sibling walks stop at them.
const SECTION_TRANSITION_TAGS: &[&str] = &[
    "html", "body", "button", "form", "head", "iframe", "input", "option", "script", "select",
    "table", "textarea",
];

/// Collapses each run of non-printable characters (outside `0x20..=0x7E`) and
/// each run of whitespace into a single space, then trims.
pub fn trim_and_remove_non_printable_text(text: &str) -> String {
    let is_printable = |c: char| ('\x20'..='\x7E').contains(&c);
    let is_space = |c: char| c.is_whitespace() || c == '\u{feff}';

    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if !is_printable(c) {
            while chars.peek().is_some_and(|&next| !is_printable(next)) {
                chars.next();
            }
            out.push(' ');
        } else if is_space(c) {
            while chars.peek().is_some_and(|&next| is_space(next)) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out.trim().to_string()
}

pub fn is_new_section_element(doc: &Document, node: Option<NodeId>) -> bool {
    match node {
        None => true,
        Some(node) => doc
            .tag_name(node)
            .is_some_and(|tag| SECTION_TRANSITION_TAGS.contains(&tag)),
    }
}

/// Normalized text of a text node or of an element's descendants.
pub fn text_content_from_node(doc: &Document, node: NodeId) -> String {
    if doc.is_text(node) {
        return trim_and_remove_non_printable_text(doc.node_value(node).unwrap_or(""));
    }
    trim_and_remove_non_printable_text(&doc.text_content(node))
}

/// Text of the field's label elements, concatenated without a separator.
///
/// Native associations win. Without them, `label[for]` matches on the id or
/// name in the field's root are combined with ancestor labels, and only when
/// nothing matched does a preceding `<dt>` of the parent `<dd>` count.
pub fn create_label_tag(doc: &Document, field: NodeId) -> String {
    let native = doc.labels(field);
    if !native.is_empty() {
        return join_label_text(doc, &native);
    }

    let mut labels: Vec<NodeId> = Vec::new();

    let element_id = doc.property_or_attribute(field, "id").unwrap_or_default();
    let element_name = doc.property_or_attribute(field, "name").unwrap_or_default();
    let targets: Vec<&str> = [element_id.as_str(), element_name.as_str()]
        .into_iter()
        .filter(|target| !target.is_empty())
        .collect();
    if !targets.is_empty() {
        for label in doc.labels_for(field, &targets) {
            push_unique(&mut labels, label);
        }
    }

    let document_element = doc.document_element();
    let mut current = Some(field);
    while let Some(node) = current {
        if Some(node) == document_element {
            break;
        }
        if doc.has_tag(node, "label") {
            push_unique(&mut labels, node);
        }
        current = doc
            .parent_element(node)
            .and_then(|parent| doc.closest_tag(parent, "label"));
    }

    if labels.is_empty() {
        let definition_term = doc
            .parent_element(field)
            .filter(|&parent| doc.has_tag(parent, "dd"))
            .and_then(|parent| doc.previous_element_sibling(parent))
            .filter(|&sibling| doc.has_tag(sibling, "dt"));
        if let Some(term) = definition_term {
            labels.push(term);
        }
    }

    join_label_text(doc, &labels)
}

fn push_unique(labels: &mut Vec<NodeId>, label: NodeId) {
    if !labels.contains(&label) {
        labels.push(label);
    }
}

fn join_label_text(doc: &Document, labels: &[NodeId]) -> String {
    labels
        .iter()
        .map(|&label| trim_and_remove_non_printable_text(&doc.text_content(label)))
        .collect()
}

/// Text of the following siblings up to the next section transition.
pub fn create_right_label(doc: &Document, field: NodeId) -> String {
    let mut parts = Vec::new();
    let mut current = field;
    while let Some(next) = doc.next_sibling(current) {
        current = next;
        if is_new_section_element(doc, Some(next)) {
            break;
        }
        let text = text_content_from_node(doc, next);
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.concat()
}

/// Text found walking backwards from the field, in reading order.
pub fn create_left_label(doc: &Document, field: NodeId) -> String {
    let mut parts = text_from_previous_siblings(doc, field);
    parts.reverse();
    parts.concat()
}

/// Walks previous siblings collecting text. When none of them has any, steps
/// to the parent's previous sibling, descends to its deepest last child, and
/// repeats from there.
fn text_from_previous_siblings(doc: &Document, node: NodeId) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = node;
    while let Some(previous) = doc.previous_sibling(current) {
        current = previous;
        if is_new_section_element(doc, Some(current)) {
            return parts;
        }
        let text = text_content_from_node(doc, current);
        if !text.is_empty() {
            parts.push(text);
        }
    }

    if !parts.is_empty() {
        return parts;
    }

    let Some(parent) = doc.parent(current) else {
        return parts;
    };
    let mut sibling = if doc.is_element(parent) {
        doc.previous_element_sibling(parent)
    } else {
        doc.previous_sibling(parent)
    };
    while let Some(node) = sibling {
        match doc.last_child(node) {
            Some(last) if !is_new_section_element(doc, Some(node)) => sibling = Some(last),
            _ => break,
        }
    }

    if is_new_section_element(doc, sibling) {
        return parts;
    }
    let Some(sibling) = sibling else {
        return parts;
    };

    let text = text_content_from_node(doc, sibling);
    if !text.is_empty() {
        parts.push(text);
        return parts;
    }
    text_from_previous_siblings(doc, sibling)
}

/// Text of the same-column cell in the previous table row.
pub fn create_top_label(doc: &Document, field: NodeId) -> Option<String> {
    let cell = doc.closest_tag(field, "td")?;
    let column = doc.cell_index(cell)?;
    let previous_row = doc
        .closest_tag(cell, "tr")
        .and_then(|row| doc.previous_element_sibling(row))
        .filter(|&row| doc.has_tag(row, "tr"))?;

    doc.row_cells(previous_row)
        .get(column)
        .map(|&above| text_content_from_node(doc, above))
}
