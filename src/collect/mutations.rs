//! Mutation reconciliation for the collector.
//!
//! Observer batches are queued and drained from idle tasks, so a burst of
//! DOM changes costs one rescan rather than one per record.

use std::str::FromStr;

use strum::EnumString;
use tracing::debug;

use super::collector::{CollectAutofillContentService, CollectorTask};
use super::fields::{
    attribute_lower_case, auto_complete_attribute, element_value, field_max_length, form_action,
    is_form_field_element, is_form_or_field_element,
};
use super::model::{AutofillField, AutofillForm};
use super::scheduler::Millis;
use crate::dom::{Document, MutationKind, MutationRecord, NodeId};
use crate::transport::messages::ExtensionMessage;

/// Form attributes mirrored into a cached [`AutofillForm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum FormAttribute {
    Action,
    Name,
    Id,
    Method,
}

/// Field attributes mirrored into a cached [`AutofillField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum FieldAttribute {
    MaxLength,
    Id,
    Name,
    Class,
    TabIndex,
    Title,
    Rel,
    TagName,
    Type,
    Value,
    Checked,
    Disabled,
    ReadOnly,
    AutoComplete,
    #[strum(serialize = "data-label")]
    DataLabel,
    #[strum(serialize = "aria-label")]
    AriaLabel,
    #[strum(serialize = "aria-hidden")]
    AriaHidden,
    #[strum(serialize = "aria-disabled")]
    AriaDisabled,
    #[strum(serialize = "aria-haspopup")]
    AriaHasPopup,
    #[strum(serialize = "data-stripe")]
    DataStripe,
}

impl CollectAutofillContentService {
    /// Entry point for a batch of mutation records delivered by the observer.
    pub fn handle_mutations(&mut self, doc: &mut Document, records: Vec<MutationRecord>, now: Millis) {
        if doc.location_href() != self.current_location_href {
            self.handle_window_location_mutation(doc, now);
            return;
        }

        match self.drain_task {
            Some(id) if self.scheduler.is_pending(id) => {
                self.scheduler.debounce(id, now, self.settings.mutation_debounce_ms);
            }
            _ => {
                let id = self.scheduler.request_debounced(
                    CollectorTask::ProcessMutations,
                    now,
                    self.settings.mutation_debounce_ms,
                    self.settings.mutation_max_wait_ms,
                );
                self.drain_task = Some(id);
            }
        }
        self.mutations_queue.push(records);
    }

    fn handle_window_location_mutation(&mut self, doc: &Document, now: Millis) {
        debug!(href = doc.location_href(), "location changed, clearing collected elements");
        self.current_location_href = doc.location_href().to_string();
        self.dom_recently_mutated = true;

        if let Some(overlay) = self.overlay.as_mut() {
            overlay.set_page_details_update_required(true);
            overlay.clear_user_filled_fields();
            if let Some(messenger) = self.messenger.as_ref() {
                messenger.send_extension_message(ExtensionMessage::CloseAutofillInlineMenu {
                    force_close_inline_menu: true,
                });
            }
        }

        self.no_fields_found = false;
        self.form_elements.clear();
        self.field_elements.clear();
        self.update_autofill_elements_after_mutation(now);
    }

    pub(super) fn run_task(&mut self, doc: &mut Document, task: CollectorTask, now: Millis) {
        match task {
            CollectorTask::ProcessMutations => self.process_mutations(now),
            CollectorTask::ProcessMutationBatch { batch, is_last } => {
                self.pending_batches = self.pending_batches.saturating_sub(1);
                self.process_mutation_records(doc, batch, now);
                if is_last && self.dom_recently_mutated {
                    self.update_autofill_elements_after_mutation(now);
                }
            }
            CollectorTask::CheckShadowDom => {
                self.query.check_page_contains_shadow_dom(doc);
                if self.query.page_contains_shadow_dom() {
                    self.flag_update_required();
                }
            }
            CollectorTask::BuildFieldAfterMutation(element) => self.build_field_after_mutation(doc, element),
            CollectorTask::RescanAfterMutation => {
                self.rescan_task = None;
                self.get_page_details(doc);
            }
        }
    }

    fn process_mutations(&mut self, now: Millis) {
        self.drain_task = None;

        if !self.query.page_contains_shadow_dom() {
            self.scheduler.request_idle_callback(
                CollectorTask::CheckShadowDom,
                now,
                self.settings.shadow_dom_check_timeout_ms,
            );
        }

        let queue = std::mem::take(&mut self.mutations_queue);
        let last = queue.len().saturating_sub(1);
        debug!(batches = queue.len(), "draining mutation queue");
        for (index, batch) in queue.into_iter().enumerate() {
            self.scheduler.request_idle_callback(
                CollectorTask::ProcessMutationBatch {
                    batch,
                    is_last: index == last,
                },
                now,
                self.settings.mutation_batch_timeout_ms,
            );
            self.pending_batches += 1;
        }
    }

    fn process_mutation_records(&mut self, doc: &mut Document, records: Vec<MutationRecord>, now: Millis) {
        for record in records {
            match record.kind {
                MutationKind::ChildList { added, removed } => {
                    let removed_autofill = self.is_autofill_element_node_mutated(doc, &removed, true, now);
                    let added_autofill = self.is_autofill_element_node_mutated(doc, &added, false, now);
                    if removed_autofill || added_autofill {
                        self.flag_update_required();
                    }
                }
                MutationKind::Attributes { name } => {
                    self.handle_autofill_element_attribute_mutation(doc, record.target, &name);
                }
            }
        }
    }

    /// Whether any of `nodes` is, or contains, a form or field element.
    /// Removed ones are purged from the caches; added ones get an incremental
    /// field build when an overlay is attached.
    fn is_autofill_element_node_mutated(
        &mut self,
        doc: &mut Document,
        nodes: &[NodeId],
        removing: bool,
        now: Millis,
    ) -> bool {
        let mut mutated = Vec::new();
        for &node in nodes {
            if !doc.is_element(node) {
                continue;
            }
            if is_form_or_field_element(doc, node) {
                mutated.push(node);
            }
            mutated.extend(self.query.query(doc, node, is_form_or_field_element, true));
        }

        if removing {
            for &element in &mutated {
                self.delete_cached_autofill_element(doc, element);
            }
        } else if self.overlay.is_some() {
            for &element in &mutated {
                self.scheduler.request_idle_callback(
                    CollectorTask::BuildFieldAfterMutation(element),
                    now,
                    self.settings.field_build_timeout_ms,
                );
            }
        }

        !mutated.is_empty()
    }

    fn delete_cached_autofill_element(&mut self, doc: &mut Document, element: NodeId) {
        if self.form_elements.remove(element).is_some() {
            return;
        }
        if self.field_elements.remove(element).is_some() {
            self.elements_initializing_intersection.remove(&element);
            doc.unobserve_intersection(element);
        }
    }

    fn build_field_after_mutation(&mut self, doc: &mut Document, element: NodeId) {
        if !doc.is_connected(element)
            || !is_form_field_element(doc, element)
            || self.field_elements.contains(element)
        {
            return;
        }
        if let Some(field) = self.build_autofill_field_item(doc, element, -1) {
            self.setup_overlay_on_field(doc, element, &field, None);
        }
    }

    fn flag_update_required(&mut self) {
        self.dom_recently_mutated = true;
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.set_page_details_update_required(true);
        }
        self.no_fields_found = false;
    }

    /// Replaces any pending rescan with a fresh one.
    fn update_autofill_elements_after_mutation(&mut self, now: Millis) {
        if let Some(id) = self.rescan_task.take() {
            self.scheduler.cancel(id);
        }
        let id = self.scheduler.request_idle_callback(
            CollectorTask::RescanAfterMutation,
            now,
            self.settings.rescan_timeout_ms,
        );
        self.rescan_task = Some(id);
    }

    fn handle_autofill_element_attribute_mutation(&mut self, doc: &Document, target: NodeId, name: &str) {
        let name = name.to_lowercase();

        if let Some(form) = self.form_elements.get_mut(target) {
            if let Ok(attribute) = FormAttribute::from_str(&name) {
                let location = doc.location_href().to_string();
                update_form_attribute(form, doc, target, attribute, &location);
            }
            return;
        }

        if let Some(field) = self.field_elements.get_mut(target) {
            if let Ok(attribute) = FieldAttribute::from_str(&name) {
                update_field_attribute(field, doc, target, attribute);
            }
        }
    }
}

fn update_form_attribute(
    form: &mut AutofillForm,
    doc: &Document,
    element: NodeId,
    attribute: FormAttribute,
    location: &str,
) {
    let read = |name: &str| doc.property_or_attribute(element, name).unwrap_or_default();
    match attribute {
        FormAttribute::Action => form.html_action = form_action(doc, element, location),
        FormAttribute::Name => form.html_name = read("name"),
        FormAttribute::Id => form.html_id = read("id"),
        FormAttribute::Method => form.html_method = read("method"),
    }
}

fn update_field_attribute(field: &mut AutofillField, doc: &Document, element: NodeId, attribute: FieldAttribute) {
    let read = |name: &str| doc.property_or_attribute(element, name);
    match attribute {
        FieldAttribute::MaxLength => field.max_length = field_max_length(doc, element),
        FieldAttribute::Id => field.html_id = read("id"),
        FieldAttribute::Name => field.html_name = read("name"),
        FieldAttribute::Class => field.html_class = read("class"),
        FieldAttribute::TabIndex => field.tabindex = read("tabindex"),
        FieldAttribute::Title => field.title = read("title"),
        FieldAttribute::Rel => field.rel = read("rel"),
        FieldAttribute::TagName => field.tag_name = attribute_lower_case(doc, element, "tagName"),
        FieldAttribute::Type => field.field_type = attribute_lower_case(doc, element, "type"),
        FieldAttribute::Value => field.value = Some(element_value(doc, element)),
        FieldAttribute::Checked => field.checked = Some(doc.attribute_boolean(element, "checked", false)),
        FieldAttribute::Disabled => field.disabled = Some(doc.attribute_boolean(element, "disabled", false)),
        FieldAttribute::ReadOnly => field.readonly = Some(doc.attribute_boolean(element, "readonly", false)),
        FieldAttribute::AutoComplete => field.auto_complete_type = auto_complete_attribute(doc, element),
        FieldAttribute::DataLabel => field.label_data = read("data-label"),
        FieldAttribute::AriaLabel => field.label_aria = read("aria-label"),
        FieldAttribute::AriaHidden => field.aria_hidden = Some(doc.attribute_boolean(element, "aria-hidden", true)),
        FieldAttribute::AriaDisabled => {
            field.aria_disabled = Some(doc.attribute_boolean(element, "aria-disabled", true))
        }
        FieldAttribute::AriaHasPopup => {
            field.aria_haspopup = Some(doc.attribute_boolean(element, "aria-haspopup", true))
        }
        FieldAttribute::DataStripe => field.data_stripe = read("data-stripe"),
    }
}
