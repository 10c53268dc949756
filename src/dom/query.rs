use tracing::debug;

use super::document::{Document, NodeId};

/// Filtered element queries over a document, piercing shadow roots when the
/// page is known to contain them.
#[derive(Debug, Default)]
pub struct DomQueryService {
    page_contains_shadow_dom: bool,
    query_count: usize,
}

impl DomQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descendants of `root` (excluding `root`) accepted by `filter`, in tree order.
    ///
    /// The walk descends into open shadow roots when the page has been
    /// flagged as containing shadow DOM or when `force_deep` is set. A host's
    /// shadow tree is visited before its light children.
    pub fn query<F>(&mut self, doc: &Document, root: NodeId, mut filter: F, force_deep: bool) -> Vec<NodeId>
    where
        F: FnMut(&Document, NodeId) -> bool,
    {
        self.query_count += 1;

        if !(self.page_contains_shadow_dom || force_deep) {
            return doc
                .descendants(root)
                .into_iter()
                .filter(|&node| doc.is_element(node) && filter(doc, node))
                .collect();
        }

        let mut out = Vec::new();
        let mut stack = deep_children(doc, root);
        stack.reverse();
        while let Some(node) = stack.pop() {
            if doc.is_element(node) && filter(doc, node) {
                out.push(node);
            }
            let mut children = deep_children(doc, node);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub fn page_contains_shadow_dom(&self) -> bool {
        self.page_contains_shadow_dom
    }

    /// Walks the whole document looking for a shadow root. Expensive, so the
    /// collector only calls it from an idle task.
    pub fn check_page_contains_shadow_dom(&mut self, doc: &Document) {
        let found = doc
            .descendants(doc.root())
            .into_iter()
            .any(|node| doc.shadow_root(node).is_some());
        if found && !self.page_contains_shadow_dom {
            debug!("page contains shadow DOM, switching to deep queries");
        }
        self.page_contains_shadow_dom = found;
    }

    /// Number of `query` calls made so far.
    pub fn query_count(&self) -> usize {
        self.query_count
    }
}

fn deep_children(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let mut children = Vec::new();
    if let Some(shadow) = doc.shadow_root(node) {
        children.extend_from_slice(doc.children(shadow));
    }
    children.extend_from_slice(doc.children(node));
    children
}
