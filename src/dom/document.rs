use std::collections::HashMap;

use slotmap::{SlotMap, new_key_type};

// ============================================================================
// Arena document model
// ============================================================================

new_key_type! {
    /// Identity of a node. Keys are generational, so a key held for a node
    /// that has been dropped from the arena never resolves to a new node.
    pub struct NodeId;
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    ShadowRoot { host: NodeId },
}

#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// Lower-cased tag name.
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// Live `value` property. `None` until written, then it shadows the attribute.
    pub value: Option<String>,
    /// Live `checked` property. `None` until written.
    pub checked: Option<bool>,
    pub shadow_root: Option<NodeId>,
    pub style: ComputedStyle,
    /// Border box relative to the document origin, when layout is known.
    pub rect: Option<Rect>,
}

/// The subset of computed style the visibility checks care about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub opacity_zero: bool,
}

impl ComputedStyle {
    pub fn hides_element(&self) -> bool {
        self.display_none || self.visibility_hidden || self.opacity_zero
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Element-attached autofill identifier.
    pub opid: Option<String>,
}

// ============================================================================
// Observer records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

#[derive(Debug, Default)]
struct IntersectionObserverState {
    connected: bool,
    /// Observed element → whether it was fully visible at the last check.
    observed: HashMap<NodeId, bool>,
    pending: Vec<IntersectionEntry>,
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    title: String,
    location_href: String,
    document_url: String,
    viewport: Rect,
    /// Scrollable document size; `None` when no layout is available.
    document_size: Option<(f64, f64)>,
    observing_mutations: bool,
    pending_mutations: Vec<MutationRecord>,
    intersection: IntersectionObserverState,
}

impl Document {
    /// A document holding only its root node.
    pub fn empty(url: &str) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
            opid: None,
        });

        Self {
            nodes,
            root,
            title: String::new(),
            location_href: url.to_string(),
            document_url: url.to_string(),
            viewport: Rect::new(0.0, 0.0, 1280.0, 720.0),
            document_size: None,
            observing_mutations: false,
            pending_mutations: Vec::new(),
            intersection: IntersectionObserverState::default(),
        }
    }

    /// A blank `<html><head></head><body></body></html>` document.
    pub fn new(url: &str) -> Self {
        let mut doc = Self::empty(url);
        let root = doc.root;
        let html = doc.append_element(root, "html", &[]);
        doc.append_element(html, "head", &[]);
        doc.append_element(html, "body", &[]);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&child| self.is_element(child))
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .copied()
            .find(|&child| self.tag_name(child) == Some("body"))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn location_href(&self) -> &str {
        &self.location_href
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    /// History-API navigation: the location changes but the document stays.
    pub fn push_state(&mut self, url: &str) {
        self.location_href = url.to_string();
    }

    // ------------------------------------------------------------------------
    // Node access
    // ------------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id)?.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id).map(|n| &n.kind), Some(NodeKind::Text(_)))
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(id).map(|n| &n.kind),
            Some(NodeKind::ShadowRoot { .. })
        )
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    fn sibling_position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_position(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.sibling_position(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.previous_sibling(id);
        while let Some(node) = current {
            if self.is_element(node) {
                return Some(node);
            }
            current = self.previous_sibling(node);
        }
        None
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.element(host)?.shadow_root
    }

    pub fn shadow_host(&self, shadow_root: NodeId) -> Option<NodeId> {
        match self.nodes.get(shadow_root)?.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    /// The document or shadow root that contains `id`.
    pub fn root_node(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Whether the node is attached to this document, through shadow hosts if needed.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let root = self.root_node(current);
            if root == self.root {
                return true;
            }
            match self.shadow_host(root) {
                Some(host) => current = host,
                None => return false,
            }
        }
    }

    /// Inclusive ancestor search that stays within the node's tree.
    pub fn closest<F>(&self, id: NodeId, mut predicate: F) -> Option<NodeId>
    where
        F: FnMut(&Document, NodeId) -> bool,
    {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node) && predicate(self, node) {
                return Some(node);
            }
            current = self.parent_element(node);
        }
        None
    }

    pub fn closest_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.closest(id, |doc, node| doc.has_tag(node, tag))
    }

    /// Light-tree descendants of `id` in tree order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Concatenated text of the light-tree descendants, like `textContent`.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => text.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|node| match &self.nodes[node].kind {
                    NodeKind::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Value of a text node.
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Attributes and properties
    // ------------------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id)
            .map(|e| e.attributes.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let Some(element) = self.element_mut(id) else {
            return;
        };
        match element.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attributes.push((name.clone(), value.to_string())),
        }
        self.record_mutation(id, MutationKind::Attributes { name });
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let before = element.attributes.len();
        element.attributes.retain(|(key, _)| *key != name);
        if element.attributes.len() != before {
            self.record_mutation(id, MutationKind::Attributes { name });
        }
    }

    /// Writes the live `value` property. Property writes are not observable mutations.
    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.value = Some(value.to_string());
        }
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        if let Some(element) = self.element_mut(id) {
            element.checked = Some(checked);
        }
    }

    pub fn opid(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id)?.opid.as_deref()
    }

    pub fn set_opid(&mut self, id: NodeId, opid: String) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.opid = Some(opid);
        }
    }

    // ------------------------------------------------------------------------
    // Tree construction and mutation
    // ------------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node {
            kind: NodeKind::Element(ElementData {
                tag: tag.to_ascii_lowercase(),
                ..ElementData::default()
            }),
            parent: None,
            children: Vec::new(),
            opid: None,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node {
            kind: NodeKind::Text(text.to_string()),
            parent: None,
            children: Vec::new(),
            opid: None,
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node {
            kind: NodeKind::Comment(text.to_string()),
            parent: None,
            children: Vec::new(),
            opid: None,
        })
    }

    /// Creates an element with attributes and appends it to `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        if let Some(element) = self.element_mut(id) {
            element.attributes = attributes
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
                .collect();
        }
        self.append_child(parent, id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Inserts `child` under `parent` before `reference` (or at the end).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) || parent == child {
            return;
        }
        if self.is_inclusive_ancestor(child, parent) {
            return;
        }
        self.remove(child);

        let position = reference
            .and_then(|r| self.children(parent).iter().position(|&c| c == r))
            .unwrap_or_else(|| self.children(parent).len());
        self.nodes[parent].children.insert(position, child);
        self.nodes[child].parent = Some(parent);
        self.record_mutation(
            parent,
            MutationKind::ChildList {
                added: vec![child],
                removed: Vec::new(),
            },
        );
    }

    /// Detaches `id` from its parent. The subtree stays addressable.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.nodes[parent].children.retain(|&c| c != id);
        self.nodes[id].parent = None;
        self.intersection.observed.remove(&id);
        self.record_mutation(
            parent,
            MutationKind::ChildList {
                added: Vec::new(),
                removed: vec![id],
            },
        );
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            if let NodeKind::Text(existing) = &mut node.kind {
                *existing = text.to_string();
            }
        }
    }

    /// Attaches an open shadow root to `host`, returning the existing one if present.
    pub fn attach_shadow(&mut self, host: NodeId) -> Option<NodeId> {
        if let Some(existing) = self.shadow_root(host) {
            return Some(existing);
        }
        self.element(host)?;
        let shadow = self.nodes.insert(Node {
            kind: NodeKind::ShadowRoot { host },
            parent: None,
            children: Vec::new(),
            opid: None,
        });
        if let Some(element) = self.element_mut(host) {
            element.shadow_root = Some(shadow);
        }
        Some(shadow)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn document_size(&self) -> Option<(f64, f64)> {
        self.document_size
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
        self.refresh_intersections();
    }

    pub fn set_document_size(&mut self, width: f64, height: f64) {
        self.document_size = Some((width, height));
        self.refresh_intersections();
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.element(id)?.rect
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        if let Some(element) = self.element_mut(id) {
            element.rect = Some(rect);
        }
        self.refresh_intersections();
    }

    pub fn style(&self, id: NodeId) -> ComputedStyle {
        self.element(id).map(|e| e.style).unwrap_or_default()
    }

    pub fn set_style(&mut self, id: NodeId, style: ComputedStyle) {
        if let Some(element) = self.element_mut(id) {
            element.style = style;
        }
        self.refresh_intersections();
    }

    /// Whether the element's box lies entirely inside the viewport.
    pub fn is_fully_in_viewport(&self, id: NodeId) -> bool {
        if !self.is_connected(id) {
            return false;
        }
        match self.rect(id) {
            Some(rect) => rect.width > 0.0 && rect.height > 0.0 && self.viewport.contains(&rect),
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Mutation observer
    // ------------------------------------------------------------------------

    /// Starts recording subtree, attribute, and child-list mutations.
    pub fn observe_mutations(&mut self) {
        self.observing_mutations = true;
    }

    pub fn disconnect_mutation_observer(&mut self) {
        self.observing_mutations = false;
        self.pending_mutations.clear();
    }

    pub fn is_observing_mutations(&self) -> bool {
        self.observing_mutations
    }

    /// Drains the records delivered since the last call, as one observer batch.
    pub fn take_mutation_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.pending_mutations)
    }

    fn record_mutation(&mut self, target: NodeId, kind: MutationKind) {
        if self.observing_mutations && self.is_connected(target) {
            self.pending_mutations.push(MutationRecord { target, kind });
        }
    }

    // ------------------------------------------------------------------------
    // Intersection observer (threshold 1.0, no root margin)
    // ------------------------------------------------------------------------

    pub fn connect_intersection_observer(&mut self) {
        self.intersection.connected = true;
    }

    pub fn disconnect_intersection_observer(&mut self) {
        self.intersection = IntersectionObserverState::default();
    }

    pub fn is_intersection_observer_connected(&self) -> bool {
        self.intersection.connected
    }

    /// Observing an element queues an initial entry for its current state.
    pub fn observe_intersection(&mut self, id: NodeId) {
        if !self.intersection.connected {
            return;
        }
        let visible = self.is_fully_in_viewport(id);
        self.intersection.observed.insert(id, visible);
        self.intersection.pending.push(Self::entry(id, visible));
    }

    pub fn unobserve_intersection(&mut self, id: NodeId) {
        self.intersection.observed.remove(&id);
        self.intersection.pending.retain(|entry| entry.target != id);
    }

    pub fn is_intersection_observed(&self, id: NodeId) -> bool {
        self.intersection.observed.contains_key(&id)
    }

    pub fn take_intersection_entries(&mut self) -> Vec<IntersectionEntry> {
        std::mem::take(&mut self.intersection.pending)
    }

    fn refresh_intersections(&mut self) {
        if !self.intersection.connected {
            return;
        }
        let observed: Vec<(NodeId, bool)> = self
            .intersection
            .observed
            .iter()
            .map(|(&id, &visible)| (id, visible))
            .collect();
        for (id, was_visible) in observed {
            let visible = self.is_fully_in_viewport(id);
            if visible != was_visible {
                self.intersection.observed.insert(id, visible);
                self.intersection.pending.push(Self::entry(id, visible));
            }
        }
    }

    fn entry(target: NodeId, visible: bool) -> IntersectionEntry {
        IntersectionEntry {
            target,
            is_intersecting: visible,
            intersection_ratio: if visible { 1.0 } else { 0.0 },
        }
    }
}
