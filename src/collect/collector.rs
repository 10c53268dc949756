use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::cache::ElementCache;
use super::fields::{
    attribute_lower_case, auto_complete_attribute, data_set_values, element_value, field_max_length,
    form_action, is_form_field_element, is_within_submit_button, limit_field_candidates,
    select_element_options,
};
use super::labels::{create_label_tag, create_left_label, create_right_label, create_top_label};
use super::model::{AutofillField, AutofillForm, AutofillPageDetails};
use super::scheduler::{IdleScheduler, Millis, TaskId};
use crate::dom::{
    Document, DomElementVisibilityService, DomQueryService, IntersectionEntry, MutationRecord, NodeId,
};
use crate::transport::messages::ExtensionMessage;

// ============================================================================
// Collaborators
// ============================================================================

/// Frame-side inline menu service that attaches listeners to collected fields.
pub trait AutofillOverlayContent {
    fn setup_overlay_listeners(
        &mut self,
        doc: &Document,
        element: NodeId,
        field: &AutofillField,
        page_details: &AutofillPageDetails,
    );

    fn set_page_details_update_required(&mut self, required: bool);

    fn clear_user_filled_fields(&mut self);
}

/// One-way channel from the frame to the background coordinator.
pub trait ExtensionMessageSink {
    fn send_extension_message(&self, message: ExtensionMessage);
}

impl ExtensionMessageSink for tokio::sync::mpsc::UnboundedSender<ExtensionMessage> {
    fn send_extension_message(&self, message: ExtensionMessage) {
        if self.send(message).is_err() {
            debug!("extension message dropped, receiver closed");
        }
    }
}

// ============================================================================
// Settings and scheduling
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorSettings {
    pub field_limit: usize,
    pub mutation_debounce_ms: Millis,
    pub mutation_max_wait_ms: Millis,
    pub mutation_batch_timeout_ms: Millis,
    pub shadow_dom_check_timeout_ms: Millis,
    pub rescan_timeout_ms: Millis,
    pub field_build_timeout_ms: Millis,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            field_limit: 100,
            mutation_debounce_ms: 100,
            mutation_max_wait_ms: 500,
            mutation_batch_timeout_ms: 500,
            shadow_dom_check_timeout_ms: 500,
            rescan_timeout_ms: 1000,
            field_build_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum CollectorTask {
    ProcessMutations,
    ProcessMutationBatch { batch: Vec<MutationRecord>, is_last: bool },
    CheckShadowDom,
    BuildFieldAfterMutation(NodeId),
    RescanAfterMutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Nothing queued or in flight.
    Idle,
    /// Observer batches are waiting for the drain task.
    Queued,
    /// Batches have been handed to their own idle tasks.
    Processing,
}

// ============================================================================
// Collector
// ============================================================================

/// Per-frame collector of form and field elements.
///
/// Driven entirely by the host: it hands over mutation records and
/// intersection entries, and advances the idle scheduler with its clock.
pub struct CollectAutofillContentService {
    pub(super) settings: CollectorSettings,
    pub(super) query: DomQueryService,
    pub(super) visibility: DomElementVisibilityService,
    pub(super) overlay: Option<Box<dyn AutofillOverlayContent>>,
    pub(super) messenger: Option<Box<dyn ExtensionMessageSink>>,
    pub(super) no_fields_found: bool,
    pub(super) dom_recently_mutated: bool,
    pub(super) form_elements: ElementCache<AutofillForm>,
    pub(super) field_elements: ElementCache<AutofillField>,
    pub(super) current_location_href: String,
    pub(super) observers_installed: bool,
    pub(super) elements_initializing_intersection: HashSet<NodeId>,
    pub(super) mutations_queue: Vec<Vec<MutationRecord>>,
    pub(super) drain_task: Option<TaskId>,
    pub(super) rescan_task: Option<TaskId>,
    pub(super) pending_batches: usize,
    pub(super) scheduler: IdleScheduler<CollectorTask>,
}

impl CollectAutofillContentService {
    pub fn new(settings: CollectorSettings) -> Self {
        Self {
            settings,
            query: DomQueryService::new(),
            visibility: DomElementVisibilityService::new(),
            overlay: None,
            messenger: None,
            no_fields_found: false,
            dom_recently_mutated: true,
            form_elements: ElementCache::new(),
            field_elements: ElementCache::new(),
            current_location_href: String::new(),
            observers_installed: false,
            elements_initializing_intersection: HashSet::new(),
            mutations_queue: Vec::new(),
            drain_task: None,
            rescan_task: None,
            pending_batches: 0,
            scheduler: IdleScheduler::new(),
        }
    }

    pub fn with_overlay(mut self, overlay: Box<dyn AutofillOverlayContent>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_message_sink(mut self, messenger: Box<dyn ExtensionMessageSink>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn autofill_form_elements(&self) -> &ElementCache<AutofillForm> {
        &self.form_elements
    }

    pub fn autofill_field_elements(&self) -> &ElementCache<AutofillField> {
        &self.field_elements
    }

    pub fn query_service(&self) -> &DomQueryService {
        &self.query
    }

    pub fn mutation_state(&self) -> MutationState {
        if self.drain_task.is_some() {
            MutationState::Queued
        } else if self.pending_batches > 0 {
            MutationState::Processing
        } else {
            MutationState::Idle
        }
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.scheduler.is_empty()
    }

    /// When the host should next call [`Self::run_idle_tasks`].
    pub fn next_wake(&self) -> Option<Millis> {
        self.scheduler.next_wake()
    }

    // ------------------------------------------------------------------------
    // Page details
    // ------------------------------------------------------------------------

    /// Snapshot of the frame's forms and fields.
    ///
    /// Repeated calls with no relevant mutation in between only re-check the
    /// visibility of cached fields and never query the DOM.
    pub fn get_page_details(&mut self, doc: &mut Document) -> AutofillPageDetails {
        if !self.observers_installed {
            self.install_observers(doc);
        }

        if !self.dom_recently_mutated && self.no_fields_found {
            debug!("no fields on previous scan and no mutation since, returning empty details");
            return self.formatted_page_details(doc, BTreeMap::new(), Vec::new());
        }

        if !self.dom_recently_mutated && !self.field_elements.is_empty() {
            debug!(fields = self.field_elements.len(), "returning cached page details");
            self.update_cached_field_visibility(doc);
            let forms = self.formatted_forms();
            let fields = self.field_elements.values().cloned().collect();
            return self.formatted_page_details(doc, forms, fields);
        }

        let (form_elements, field_candidates) = self.query_form_and_field_elements(doc);
        let forms = self.build_forms_data(doc, &form_elements);

        let candidates = limit_field_candidates(doc, field_candidates, self.settings.field_limit);
        let fields: Vec<AutofillField> = candidates
            .into_iter()
            .enumerate()
            .filter_map(|(index, element)| self.build_autofill_field_item(doc, element, index as i64))
            .collect();
        self.field_elements.sort_by_key(|field| field.element_number);

        if fields.is_empty() {
            self.no_fields_found = true;
        }
        self.dom_recently_mutated = false;
        debug!(forms = forms.len(), fields = fields.len(), "full page scan complete");

        let page_details = self.formatted_page_details(doc, forms, fields);
        self.setup_overlay_listeners(doc, &page_details);
        page_details
    }

    fn install_observers(&mut self, doc: &mut Document) {
        self.current_location_href = doc.location_href().to_string();
        doc.observe_mutations();
        doc.connect_intersection_observer();
        self.query.check_page_contains_shadow_dom(doc);
        self.observers_installed = true;
    }

    fn formatted_page_details(
        &self,
        doc: &Document,
        forms: BTreeMap<String, AutofillForm>,
        fields: Vec<AutofillField>,
    ) -> AutofillPageDetails {
        AutofillPageDetails {
            title: doc.title().to_string(),
            url: doc.location_href().to_string(),
            document_url: doc.document_url().to_string(),
            forms,
            fields,
            collected_timestamp: epoch_millis(),
        }
    }

    fn formatted_forms(&self) -> BTreeMap<String, AutofillForm> {
        self.form_elements
            .values()
            .map(|form| (form.opid.clone(), form.clone()))
            .collect()
    }

    fn cached_page_details(&self, doc: &Document) -> AutofillPageDetails {
        let forms = self.formatted_forms();
        let fields = self.field_elements.values().cloned().collect();
        self.formatted_page_details(doc, forms, fields)
    }

    fn update_cached_field_visibility(&mut self, doc: &Document) {
        let mut became_viewable = Vec::new();
        let keys: Vec<NodeId> = self.field_elements.keys().collect();
        for element in keys {
            let viewable = self.visibility.is_element_viewable(doc, element);
            if let Some(field) = self.field_elements.get_mut(element) {
                if !field.viewable && viewable {
                    became_viewable.push(element);
                }
                field.viewable = viewable;
            }
        }

        for element in became_viewable {
            if let Some(field) = self.field_elements.get(element).cloned() {
                self.setup_overlay_on_field(doc, element, &field, None);
            }
        }
    }

    fn query_form_and_field_elements(&mut self, doc: &Document) -> (Vec<NodeId>, Vec<NodeId>) {
        let root = doc.document_element().unwrap_or_else(|| doc.root());
        let mut forms = Vec::new();
        let mut fields = Vec::new();
        self.query.query(
            doc,
            root,
            |doc, node| {
                if doc.is_form_element(node) {
                    forms.push(node);
                    true
                } else if is_form_field_element(doc, node) {
                    fields.push(node);
                    true
                } else {
                    false
                }
            },
            false,
        );
        (forms, fields)
    }

    fn build_forms_data(&mut self, doc: &mut Document, form_elements: &[NodeId]) -> BTreeMap<String, AutofillForm> {
        let location = doc.location_href().to_string();
        for (index, &form) in form_elements.iter().enumerate() {
            let opid = format!("__form__{index}");
            doc.set_opid(form, opid.clone());

            if let Some(existing) = self.form_elements.get_mut(form) {
                existing.opid = opid;
                continue;
            }

            self.form_elements.insert(
                form,
                AutofillForm {
                    opid,
                    html_action: form_action(doc, form, &location),
                    html_name: doc.property_or_attribute(form, "name").unwrap_or_default(),
                    html_id: doc.property_or_attribute(form, "id").unwrap_or_default(),
                    html_method: doc.property_or_attribute(form, "method").unwrap_or_default(),
                },
            );
        }
        self.formatted_forms()
    }

    /// Builds (or refreshes) the record for one field.
    ///
    /// A cached field at a real index only has its opid and position
    /// updated. Index `-1` marks a field discovered between full scans: it is
    /// reported to the overlay but not cached.
    pub(super) fn build_autofill_field_item(
        &mut self,
        doc: &mut Document,
        element: NodeId,
        index: i64,
    ) -> Option<AutofillField> {
        if is_within_submit_button(doc, element) {
            return None;
        }

        let opid = format!("__{index}");
        doc.set_opid(element, opid.clone());

        if index >= 0 {
            if let Some(existing) = self.field_elements.get_mut(element) {
                existing.opid = opid;
                existing.element_number = index;
                return Some(existing.clone());
            }
        }

        let base = AutofillField {
            opid,
            element_number: index,
            viewable: self.visibility.is_element_viewable(doc, element),
            max_length: field_max_length(doc, element),
            html_id: doc.property_or_attribute(element, "id"),
            html_name: doc.property_or_attribute(element, "name"),
            html_class: doc.property_or_attribute(element, "class"),
            tabindex: doc.property_or_attribute(element, "tabindex"),
            title: doc.property_or_attribute(element, "title"),
            tag_name: attribute_lower_case(doc, element, "tagName"),
            data_set_values: data_set_values(doc, element),
            ..AutofillField::default()
        };

        if !base.viewable {
            self.elements_initializing_intersection.insert(element);
            doc.observe_intersection(element);
        }

        if doc.has_tag(element, "span") {
            self.cache_field(index, element, base.clone());
            return Some(base);
        }

        let element_type = attribute_lower_case(doc, element, "type");
        let mut field = base;
        if element_type.as_deref() != Some("hidden") {
            field.label_tag = Some(create_label_tag(doc, element));
            field.label_data = doc.property_or_attribute(element, "data-label");
            field.label_aria = doc.property_or_attribute(element, "aria-label");
            field.label_top = create_top_label(doc, element);
            field.label_right = Some(create_right_label(doc, element));
            field.label_left = Some(create_left_label(doc, element));
            field.placeholder = doc.property_or_attribute(element, "placeholder");
        }

        field.rel = doc.property_or_attribute(element, "rel");
        field.field_type = element_type;
        field.value = Some(element_value(doc, element));
        field.checked = Some(doc.attribute_boolean(element, "checked", false));
        field.auto_complete_type = auto_complete_attribute(doc, element);
        field.disabled = Some(doc.attribute_boolean(element, "disabled", false));
        field.readonly = Some(doc.attribute_boolean(element, "readonly", false));
        field.select_info = doc
            .has_tag(element, "select")
            .then(|| select_element_options(doc, element));
        field.form = doc
            .form_owner(element)
            .and_then(|form| doc.property_or_attribute(form, "opid"));
        field.aria_hidden = Some(doc.attribute_boolean(element, "aria-hidden", true));
        field.aria_disabled = Some(doc.attribute_boolean(element, "aria-disabled", true));
        field.aria_haspopup = Some(doc.attribute_boolean(element, "aria-haspopup", true));
        field.data_stripe = doc.property_or_attribute(element, "data-stripe");

        self.cache_field(index, element, field.clone());
        Some(field)
    }

    fn cache_field(&mut self, index: i64, element: NodeId, field: AutofillField) {
        if index >= 0 {
            self.field_elements.insert(element, field);
        }
    }

    fn setup_overlay_listeners(&mut self, doc: &Document, page_details: &AutofillPageDetails) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        for (element, field) in self.field_elements.iter() {
            overlay.setup_overlay_listeners(doc, element, field, page_details);
        }
    }

    pub(super) fn setup_overlay_on_field(
        &mut self,
        doc: &Document,
        element: NodeId,
        field: &AutofillField,
        page_details: Option<&AutofillPageDetails>,
    ) {
        if self.overlay.is_none() {
            return;
        }
        let cached;
        let page_details = match page_details {
            Some(details) => details,
            None => {
                cached = self.cached_page_details(doc);
                &cached
            }
        };
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.setup_overlay_listeners(doc, element, field, page_details);
        }
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// The element carrying `opid`. Takes the first of several matches (with
    /// a warning); with no match, falls back to the element at the opid's
    /// numeric position among the current field elements.
    pub fn get_autofill_field_element_by_opid(&mut self, doc: &Document, opid: &str) -> Option<NodeId> {
        let candidates: Vec<NodeId> = if self.field_elements.is_empty() {
            let root = doc.document_element().unwrap_or_else(|| doc.root());
            self.query.query(doc, root, is_form_field_element, false)
        } else {
            self.field_elements.keys().collect()
        };

        let matching: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|&element| doc.opid(element) == Some(opid))
            .collect();

        if matching.is_empty() {
            let index = opid.split("__").nth(1)?.parse::<usize>().ok()?;
            return candidates.get(index).copied();
        }

        if matching.len() > 1 {
            warn!(opid, count = matching.len(), "more than one element found with opid");
        }
        matching.first().copied()
    }

    pub fn is_password_field_within_document(&mut self, doc: &Document) -> bool {
        let root = doc.document_element().unwrap_or_else(|| doc.root());
        let found = self.query.query(
            doc,
            root,
            |doc, node| doc.has_tag(node, "input") && doc.input_type(node).as_deref() == Some("password"),
            false,
        );
        !found.is_empty()
    }

    // ------------------------------------------------------------------------
    // Intersection observer
    // ------------------------------------------------------------------------

    /// Marks tracked fields viewable once they scroll fully into view.
    pub fn handle_intersection_entries(&mut self, doc: &mut Document, entries: Vec<IntersectionEntry>) {
        for entry in entries {
            let element = entry.target;
            if self.elements_initializing_intersection.remove(&element) {
                continue;
            }

            if !self.field_elements.contains(element) {
                doc.unobserve_intersection(element);
                continue;
            }

            if !self.visibility.is_element_viewable(doc, element) {
                continue;
            }

            let Some(field) = self.field_elements.get_mut(element) else {
                continue;
            };
            field.viewable = true;
            let field = field.clone();
            self.setup_overlay_on_field(doc, element, &field, None);
            doc.unobserve_intersection(element);
        }
    }

    // ------------------------------------------------------------------------
    // Host loop
    // ------------------------------------------------------------------------

    /// Delivers whatever the document's observers recorded, then runs the
    /// idle tasks that are due at `now`.
    pub fn process_pending(&mut self, doc: &mut Document, now: Millis) {
        if doc.is_observing_mutations() {
            let records = doc.take_mutation_records();
            if !records.is_empty() {
                self.handle_mutations(doc, records, now);
            }
        }

        if doc.is_intersection_observer_connected() {
            let entries = doc.take_intersection_entries();
            if !entries.is_empty() {
                self.handle_intersection_entries(doc, entries);
            }
        }

        self.run_idle_tasks(doc, now);
    }

    /// Runs every idle task that is runnable at `now`, including tasks those
    /// tasks schedule.
    pub fn run_idle_tasks(&mut self, doc: &mut Document, now: Millis) {
        while let Some((_, task)) = self.scheduler.next_ready(now) {
            self.run_task(doc, task, now);
        }
    }

    /// Cancels every pending idle task and disconnects both observers.
    pub fn destroy(&mut self, doc: &mut Document) {
        self.scheduler.cancel_all();
        self.drain_task = None;
        self.rescan_task = None;
        self.pending_batches = 0;
        self.mutations_queue.clear();
        doc.disconnect_mutation_observer();
        doc.disconnect_intersection_observer();
        debug!("collector destroyed");
    }
}

impl Default for CollectAutofillContentService {
    fn default() -> Self {
        Self::new(CollectorSettings::default())
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
