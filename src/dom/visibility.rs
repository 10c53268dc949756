use super::document::{ComputedStyle, Document, NodeId};

/// Decides whether an element is actually viewable on the page.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomElementVisibilityService;

impl DomElementVisibilityService {
    pub fn new() -> Self {
        Self
    }

    /// Connected, not hidden by style on itself or any ancestor (across
    /// shadow boundaries), at least 1x1 when laid out, and not positioned
    /// entirely outside the document.
    pub fn is_element_viewable(&self, doc: &Document, id: NodeId) -> bool {
        if !doc.is_element(id) || !doc.is_connected(id) {
            return false;
        }
        if self.is_hidden_by_style(doc, id) {
            return false;
        }

        let Some(rect) = doc.rect(id) else {
            return true;
        };
        if rect.width < 1.0 || rect.height < 1.0 {
            return false;
        }
        if let Some((width, height)) = doc.document_size() {
            if rect.right() <= 0.0 || rect.bottom() <= 0.0 || rect.left >= width || rect.top >= height {
                return false;
            }
        }
        true
    }

    /// Whether `id` or one of its ancestors is styled out of view.
    pub fn is_hidden_by_style(&self, doc: &Document, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if doc.is_element(node) && effective_style(doc, node).hides_element() {
                return true;
            }
            current = match doc.parent(node) {
                Some(parent) if doc.is_shadow_root(parent) => doc.shadow_host(parent),
                other => other,
            };
        }
        false
    }
}

/// Layout style merged with what the markup itself declares.
fn effective_style(doc: &Document, id: NodeId) -> ComputedStyle {
    let mut style = doc.style(id);
    if doc.has_attribute(id, "hidden") {
        style.display_none = true;
    }
    if doc.has_tag(id, "input") && doc.input_type(id).as_deref() == Some("hidden") {
        style.display_none = true;
    }
    if let Some(inline) = doc.attribute(id, "style") {
        for declaration in inline.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_end_matches("!important").trim().to_ascii_lowercase();
            match property.trim().to_ascii_lowercase().as_str() {
                "display" if value == "none" => style.display_none = true,
                "visibility" if value == "hidden" || value == "collapse" => style.visibility_hidden = true,
                "opacity" if value.parse::<f64>().is_ok_and(|o| o <= 0.0) => style.opacity_zero = true,
                _ => {}
            }
        }
    }
    style
}
