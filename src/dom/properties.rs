//! Property-level reads over the arena document.
//!
//! Elements expose both attributes and reflected properties. The collector
//! reads a name as a property when the element type defines one (so `type`
//! is normalized, `value` is live, `tagName` is upper-cased) and falls back
//! to the raw attribute otherwise.

use super::document::{Document, NodeId};

const FORM_CONTROL_TAGS: &[&str] = &["input", "select", "textarea", "button", "output", "fieldset", "object"];
const LABELABLE_TAGS: &[&str] = &["input", "select", "textarea", "button", "meter", "output", "progress"];
const INPUT_TYPES: &[&str] = &[
    "button", "checkbox", "color", "date", "datetime-local", "email", "file", "hidden", "image",
    "month", "number", "password", "radio", "range", "reset", "search", "submit", "tel", "text",
    "time", "url", "week",
];

impl Document {
    pub fn is_form_element(&self, id: NodeId) -> bool {
        self.has_tag(id, "form")
    }

    fn is_form_control(&self, id: NodeId) -> bool {
        self.tag_name(id)
            .is_some_and(|tag| FORM_CONTROL_TAGS.contains(&tag))
    }

    /// Input, textarea and select: the elements that own a `value` to fill.
    pub fn is_fillable_form_field(&self, id: NodeId) -> bool {
        matches!(self.tag_name(id), Some("input" | "textarea" | "select"))
    }

    pub fn is_labelable(&self, id: NodeId) -> bool {
        match self.tag_name(id) {
            Some("input") => self.input_type(id).as_deref() != Some("hidden"),
            Some(tag) => LABELABLE_TAGS.contains(&tag),
            None => false,
        }
    }

    /// The normalized `type` property, or `None` for elements without one.
    pub fn input_type(&self, id: NodeId) -> Option<String> {
        match self.tag_name(id)? {
            "input" => {
                let raw = self.attribute(id, "type").unwrap_or("").trim().to_ascii_lowercase();
                if INPUT_TYPES.contains(&raw.as_str()) {
                    Some(raw)
                } else {
                    Some("text".to_string())
                }
            }
            "textarea" => Some("textarea".to_string()),
            "select" => Some(if self.has_attribute(id, "multiple") {
                "select-multiple".to_string()
            } else {
                "select-one".to_string()
            }),
            "button" => {
                let raw = self.attribute(id, "type").unwrap_or("").to_ascii_lowercase();
                Some(match raw.as_str() {
                    "reset" | "button" => raw,
                    _ => "submit".to_string(),
                })
            }
            _ => self.attribute(id, "type").map(str::to_string),
        }
    }

    /// Reads `name` as a property where the element defines it, else as an attribute.
    pub fn property_or_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let tag = self.tag_name(id)?;
        let attr_or_empty = |attr: &str| Some(self.attribute(id, attr).unwrap_or("").to_string());

        match name {
            "id" | "title" => attr_or_empty(name),
            "tagName" | "tagname" => Some(tag.to_ascii_uppercase()),
            "opid" => self.opid(id).map(str::to_string),
            "name" if self.is_form_control(id) || tag == "form" => attr_or_empty("name"),
            "type" if self.is_form_control(id) => self.input_type(id),
            "value" if self.is_form_control(id) => Some(self.value(id)),
            "placeholder" if matches!(tag, "input" | "textarea") => attr_or_empty("placeholder"),
            "autocomplete" if matches!(tag, "input" | "select" | "textarea" | "form") => {
                attr_or_empty("autocomplete")
            }
            "action" if tag == "form" => attr_or_empty("action"),
            "method" if tag == "form" => {
                let raw = self.attribute(id, "method").unwrap_or("").to_ascii_lowercase();
                Some(match raw.as_str() {
                    "post" | "dialog" => raw,
                    _ => "get".to_string(),
                })
            }
            _ => self.attribute(id, name).map(str::to_string),
        }
    }

    /// Boolean read of a property or attribute. With `check_string` the value
    /// must be the literal `"true"`, which is how ARIA states are expressed.
    pub fn attribute_boolean(&self, id: NodeId, name: &str, check_string: bool) -> bool {
        if check_string {
            return self.property_or_attribute(id, name).as_deref() == Some("true");
        }

        match name {
            "checked" => self.checked(id),
            "disabled" | "readonly" => self.has_attribute(id, name),
            _ => self
                .property_or_attribute(id, name)
                .is_some_and(|value| !value.is_empty()),
        }
    }

    /// Live value: the written property if any, else the markup default.
    pub fn value(&self, id: NodeId) -> String {
        let Some(element) = self.element(id) else {
            return String::new();
        };
        if let Some(value) = &element.value {
            return value.clone();
        }

        match element.tag.as_str() {
            "textarea" => self.text_content(id),
            "select" => self.selected_option_value(id).unwrap_or_default(),
            _ => self.attribute(id, "value").unwrap_or("").to_string(),
        }
    }

    pub fn checked(&self, id: NodeId) -> bool {
        match self.element(id) {
            Some(element) => element.checked.unwrap_or_else(|| self.has_attribute(id, "checked")),
            None => false,
        }
    }

    /// The `maxLength` property: the parsed attribute, or -1 when absent or invalid.
    pub fn max_length(&self, id: NodeId) -> i64 {
        self.attribute(id, "maxlength")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|length| *length >= 0)
            .unwrap_or(-1)
    }

    /// The form an associated element belongs to: the `form` attribute target, else the nearest ancestor form.
    pub fn form_owner(&self, id: NodeId) -> Option<NodeId> {
        if !self.is_form_control(id) {
            return None;
        }
        if let Some(form_id) = self.attribute(id, "form") {
            let root = self.root_node(id);
            return self
                .element_by_id(root, form_id)
                .filter(|&form| self.is_form_element(form));
        }
        self.parent_element(id)
            .and_then(|parent| self.closest_tag(parent, "form"))
    }

    /// First element in `root`'s light tree whose `id` attribute equals `element_id`.
    pub fn element_by_id(&self, root: NodeId, element_id: &str) -> Option<NodeId> {
        if element_id.is_empty() {
            return None;
        }
        self.descendants(root)
            .into_iter()
            .find(|&node| self.attribute(node, "id") == Some(element_id))
    }

    /// Labels natively associated with a labelable element, in tree order.
    pub fn labels(&self, id: NodeId) -> Vec<NodeId> {
        if !self.is_labelable(id) {
            return Vec::new();
        }
        let element_id = self.attribute(id, "id").unwrap_or("");
        let root = self.root_node(id);

        self.descendants(root)
            .into_iter()
            .filter(|&node| self.has_tag(node, "label"))
            .filter(|&label| match self.attribute(label, "for") {
                Some(target) => !element_id.is_empty() && target == element_id,
                None => self.first_labelable_descendant(label) == Some(id),
            })
            .collect()
    }

    fn first_labelable_descendant(&self, label: NodeId) -> Option<NodeId> {
        self.descendants(label)
            .into_iter()
            .find(|&node| self.is_labelable(node))
    }

    /// Labels in the element's root whose `for` attribute equals any of `targets`.
    pub fn labels_for(&self, id: NodeId, targets: &[&str]) -> Vec<NodeId> {
        let root = self.root_node(id);
        self.descendants(root)
            .into_iter()
            .filter(|&node| self.has_tag(node, "label"))
            .filter(|&label| {
                self.attribute(label, "for")
                    .is_some_and(|target| targets.contains(&target))
            })
            .collect()
    }

    /// `(text, value)` for every option of a select, including those in optgroups.
    pub fn select_options(&self, id: NodeId) -> Vec<(String, String)> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.has_tag(node, "option"))
            .map(|option| {
                let text = collapse_whitespace(&self.text_content(option));
                let value = self
                    .attribute(option, "value")
                    .map(str::to_string)
                    .unwrap_or_else(|| text.clone());
                (text, value)
            })
            .collect()
    }

    fn selected_option_value(&self, select: NodeId) -> Option<String> {
        let options: Vec<NodeId> = self
            .descendants(select)
            .into_iter()
            .filter(|&node| self.has_tag(node, "option"))
            .collect();
        let selected = options
            .iter()
            .copied()
            .find(|&option| self.has_attribute(option, "selected"))
            .or_else(|| options.first().copied())?;

        Some(
            self.attribute(selected, "value")
                .map(str::to_string)
                .unwrap_or_else(|| collapse_whitespace(&self.text_content(selected))),
        )
    }

    /// `data-*` attributes with camel-cased keys, in attribute order.
    pub fn dataset(&self, id: NodeId) -> Vec<(String, String)> {
        self.attributes(id)
            .iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix("data-")?;
                Some((camel_case_data_key(key), value.clone()))
            })
            .collect()
    }

    /// Column position of a table cell in its row, `None` outside a row.
    pub fn cell_index(&self, cell: NodeId) -> Option<usize> {
        let row = self.parent_element(cell).filter(|&row| self.has_tag(row, "tr"))?;
        self.row_cells(row).iter().position(|&c| c == cell)
    }

    pub fn row_cells(&self, row: NodeId) -> Vec<NodeId> {
        self.element_children(row)
            .into_iter()
            .filter(|&child| matches!(self.tag_name(child), Some("td" | "th")))
            .collect()
    }
}

fn camel_case_data_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '-' {
            upper_next = true;
            continue;
        }
        if upper_next && ch.is_ascii_lowercase() {
            out.push(ch.to_ascii_uppercase());
        } else {
            if upper_next {
                out.push('-');
            }
            out.push(ch);
        }
        upper_next = false;
    }
    if upper_next {
        out.push('-');
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
