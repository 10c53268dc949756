mod common;

use autofill_engine::collect::{CollectAutofillContentService, CollectorSettings};
use autofill_engine::dom::{ComputedStyle, Document, NodeId, Rect};
use common::fakes::RecordingOverlay;
use common::{blank_document, body, by_id, login_document};
use pretty_assertions::assert_eq;

// =========================================================================
// Full scans
// =========================================================================

#[test]
fn login_page_collects_form_fields_and_labels() {
    let mut doc = login_document();
    let mut collector = CollectAutofillContentService::default();

    let details = collector.get_page_details(&mut doc);

    assert_eq!(details.title, "Sign in");
    assert_eq!(details.url, "https://example.com/login");
    assert_eq!(details.forms.len(), 1);
    let form = &details.forms["__form__0"];
    assert_eq!(form.html_name, "login");
    assert_eq!(form.html_id, "login");
    assert_eq!(form.html_action, "https://example.com/session");

    assert_eq!(details.fields.len(), 2);
    let username = &details.fields[0];
    assert_eq!(username.opid, "__0");
    assert_eq!(username.label_tag.as_deref(), Some("Username"));
    assert_eq!(username.auto_complete_type.as_deref(), Some("username"));
    assert_eq!(username.form.as_deref(), Some("__form__0"));
    assert!(username.viewable);

    let password = &details.fields[1];
    assert_eq!(password.opid, "__1");
    assert_eq!(password.field_type.as_deref(), Some("password"));
    assert_eq!(password.label_tag.as_deref(), Some("Password"));
}

#[test]
fn repeated_calls_reuse_cached_elements_without_querying() {
    let mut doc = login_document();
    let mut collector = CollectAutofillContentService::default();

    let first = collector.get_page_details(&mut doc);
    let queries_after_first = collector.query_service().query_count();
    let second = collector.get_page_details(&mut doc);

    assert!(first.same_content(&second));
    assert_eq!(
        collector.query_service().query_count(),
        queries_after_first,
        "cached path must not query the DOM"
    );
}

#[test]
fn empty_page_short_circuits_until_mutated() {
    let mut doc = blank_document();
    let mut collector = CollectAutofillContentService::default();

    assert!(collector.get_page_details(&mut doc).fields.is_empty());
    let queries = collector.query_service().query_count();
    assert!(collector.get_page_details(&mut doc).fields.is_empty());
    assert_eq!(collector.query_service().query_count(), queries);

    let body = body(&doc);
    doc.append_element(body, "input", &[("name", "email")]);
    collector.process_pending(&mut doc, 0);
    collector.run_idle_tasks(&mut doc, 2_000);

    let details = collector.get_page_details(&mut doc);
    assert_eq!(details.fields.len(), 1);
    assert_eq!(details.fields[0].html_name.as_deref(), Some("email"));
}

#[test]
fn element_identity_is_stable_across_scans() {
    let mut doc = login_document();
    let mut collector = CollectAutofillContentService::default();
    collector.get_page_details(&mut doc);
    let username = by_id(&doc, "username");

    let form = by_id(&doc, "login");
    let remember = doc.append_element(form, "input", &[("type", "checkbox"), ("name", "remember")]);
    collector.process_pending(&mut doc, 0);
    collector.run_idle_tasks(&mut doc, 2_000);

    assert_eq!(collector.autofill_field_elements().len(), 3);
    let cached = collector
        .autofill_field_elements()
        .get(username)
        .expect("username still cached under the same node");
    assert_eq!(cached.opid, "__0");
    assert_eq!(doc.opid(remember), Some("__2"));
}

#[test]
fn field_cap_prefers_non_checkbox_fields() {
    let mut doc = blank_document();
    let body = body(&doc);
    for index in 0..150 {
        let attributes: Vec<(&str, &str)> = if index % 5 < 2 {
            vec![("type", "checkbox")]
        } else {
            vec![("type", "text")]
        };
        doc.append_element(body, "input", &attributes);
    }

    let mut collector = CollectAutofillContentService::new(CollectorSettings {
        field_limit: 100,
        ..CollectorSettings::default()
    });
    let details = collector.get_page_details(&mut doc);

    assert_eq!(details.fields.len(), 100);
    let checkboxes = details
        .fields
        .iter()
        .filter(|field| field.field_type.as_deref() == Some("checkbox"))
        .count();
    assert_eq!(checkboxes, 10);
    assert!(
        details.fields[..90]
            .iter()
            .all(|field| field.field_type.as_deref() == Some("text"))
    );
    for (position, field) in details.fields.iter().enumerate() {
        assert_eq!(field.opid, format!("__{position}"));
        assert_eq!(field.element_number, position as i64);
    }
}

#[test]
fn multiple_labels_concatenate_without_separator() {
    let mut doc = blank_document();
    let body = body(&doc);
    let first = doc.append_element(body, "label", &[("for", "full-name")]);
    doc.append_text(first, "First");
    let last = doc.append_element(body, "label", &[("for", "full-name")]);
    doc.append_text(last, "Last");
    doc.append_element(body, "input", &[("id", "full-name")]);

    let mut collector = CollectAutofillContentService::default();
    let details = collector.get_page_details(&mut doc);

    assert_eq!(details.fields[0].label_tag.as_deref(), Some("FirstLast"));
}

#[test]
fn checkbox_and_select_values_are_normalized() {
    let mut doc = blank_document();
    let body = body(&doc);
    let terms = doc.append_element(body, "input", &[("type", "checkbox"), ("value", "yes")]);
    doc.set_checked(terms, true);
    let country = doc.append_element(body, "select", &[("name", "country")]);
    let option = doc.append_element(country, "option", &[("value", "US")]);
    doc.append_text(option, "United States");

    let mut collector = CollectAutofillContentService::default();
    let details = collector.get_page_details(&mut doc);

    assert_eq!(details.fields[0].value.as_deref(), Some("✓"));
    let select_info = details.fields[1].select_info.as_ref().expect("select options");
    assert_eq!(
        select_info.options,
        vec![(Some("unitedstates".to_string()), "US".to_string())]
    );
}

#[test]
fn ignored_and_opted_out_elements_are_not_collected() {
    let mut doc = blank_document();
    let body = body(&doc);
    doc.append_element(body, "input", &[("type", "hidden"), ("name", "csrf")]);
    doc.append_element(body, "input", &[("type", "submit")]);
    doc.append_element(body, "input", &[("name", "search"), ("data-bwignore", "")]);
    doc.append_element(body, "textarea", &[("name", "notes")]);

    let mut collector = CollectAutofillContentService::default();
    let details = collector.get_page_details(&mut doc);

    assert_eq!(details.fields.len(), 1);
    assert_eq!(details.fields[0].html_name.as_deref(), Some("notes"));
}

#[test]
fn shadow_root_fields_are_found_once_shadow_dom_is_detected() {
    let mut doc = blank_document();
    let body = body(&doc);
    let host = doc.append_element(body, "div", &[]);
    let shadow = doc.attach_shadow(host).expect("host is an element");
    doc.append_element(shadow, "input", &[("name", "shadowed")]);

    let mut collector = CollectAutofillContentService::default();
    let details = collector.get_page_details(&mut doc);

    assert!(collector.query_service().page_contains_shadow_dom());
    assert_eq!(details.fields.len(), 1);
    assert_eq!(details.fields[0].html_name.as_deref(), Some("shadowed"));
}

// =========================================================================
// Visibility and overlay wiring
// =========================================================================

#[test]
fn overlay_listeners_attach_to_every_collected_field() {
    let mut doc = login_document();
    let (overlay, log) = RecordingOverlay::new();
    let mut collector = CollectAutofillContentService::default().with_overlay(overlay);

    collector.get_page_details(&mut doc);

    let opids: Vec<String> = log
        .lock()
        .listener_setups
        .iter()
        .map(|(_, opid, _)| opid.clone())
        .collect();
    assert_eq!(opids, vec!["__0".to_string(), "__1".to_string()]);
}

#[test]
fn hidden_field_becomes_viewable_when_scrolled_into_view() {
    let mut doc = blank_document();
    let body = body(&doc);
    let input = doc.append_element(body, "input", &[("name", "later")]);
    doc.set_style(
        input,
        ComputedStyle {
            display_none: true,
            ..ComputedStyle::default()
        },
    );

    let (overlay, log) = RecordingOverlay::new();
    let mut collector = CollectAutofillContentService::default().with_overlay(overlay);
    let details = collector.get_page_details(&mut doc);
    assert!(!details.fields[0].viewable);
    assert!(doc.is_intersection_observed(input));

    // The entry queued by observing is the initial notification and is ignored.
    collector.process_pending(&mut doc, 0);
    assert!(!collector.autofill_field_elements().get(input).unwrap().viewable);
    let setups_before = log.lock().listener_setups.len();

    doc.set_style(input, ComputedStyle::default());
    doc.set_rect(input, Rect::new(10.0, 10.0, 200.0, 24.0));
    collector.process_pending(&mut doc, 10);

    assert!(collector.autofill_field_elements().get(input).unwrap().viewable);
    assert!(!doc.is_intersection_observed(input));
    assert_eq!(log.lock().listener_setups.len(), setups_before + 1);
}

#[test]
fn destroy_cancels_work_and_disconnects_observers() {
    let mut doc = login_document();
    let mut collector = CollectAutofillContentService::default();
    collector.get_page_details(&mut doc);

    let body = body(&doc);
    doc.append_element(body, "input", &[]);
    collector.process_pending(&mut doc, 0);
    assert!(collector.has_pending_tasks());

    collector.destroy(&mut doc);

    assert!(!collector.has_pending_tasks());
    assert!(!doc.is_observing_mutations());
    assert!(!doc.is_intersection_observer_connected());
}

// =========================================================================
// Form and field numbering
// =========================================================================

fn login_page() -> (Document, NodeId, NodeId) {
    let mut doc = Document::new("https://example.com/login");
    let body = doc.body().unwrap();
    let form = doc.append_element(body, "form", &[("action", "/session"), ("method", "post")]);
    let user = doc.append_element(form, "input", &[("id", "user"), ("name", "username")]);
    let pass = doc.append_element(form, "input", &[("type", "password")]);
    (doc, user, pass)
}

#[test]
fn builds_forms_and_fields_on_first_scan() {
    let (mut doc, user, pass) = login_page();
    let mut collector = CollectAutofillContentService::default();

    let details = collector.get_page_details(&mut doc);

    assert_eq!(details.forms.len(), 1);
    let form = &details.forms["__form__0"];
    assert_eq!(form.html_action, "https://example.com/session");
    assert_eq!(form.html_method, "post");
    assert_eq!(details.fields.len(), 2);
    assert_eq!(details.fields[0].opid, "__0");
    assert_eq!(details.fields[0].form.as_deref(), Some("__form__0"));
    assert_eq!(details.fields[1].field_type.as_deref(), Some("password"));
    assert_eq!(doc.opid(user), Some("__0"));
    assert_eq!(doc.opid(pass), Some("__1"));
    assert!(doc.is_observing_mutations());
}

#[test]
fn fields_inside_submit_buttons_are_skipped() {
    let mut doc = Document::new("https://example.com/");
    let body = doc.body().unwrap();
    let button = doc.append_element(body, "button", &[("type", "submit")]);
    doc.append_element(button, "input", &[]);
    doc.append_element(body, "input", &[]);

    let mut collector = CollectAutofillContentService::default();
    let details = collector.get_page_details(&mut doc);

    assert_eq!(details.fields.len(), 1);
    assert_eq!(details.fields[0].opid, "__1");
}

#[test]
fn span_fields_carry_base_properties_only() {
    let mut doc = Document::new("https://example.com/");
    let body = doc.body().unwrap();
    let span = doc.append_element(body, "span", &[("data-bwautofill", ""), ("id", "card")]);
    doc.append_text(span, "4111");

    let mut collector = CollectAutofillContentService::default();
    let details = collector.get_page_details(&mut doc);
    let field = &details.fields[0];

    assert_eq!(field.html_id.as_deref(), Some("card"));
    assert_eq!(field.tag_name.as_deref(), Some("span"));
    assert_eq!(field.max_length, None);
    assert!(field.label_tag.is_none());
    assert!(field.value.is_none());
}

#[test]
fn opid_lookup_warns_and_falls_back_to_index() {
    let (mut doc, user, pass) = login_page();
    let mut collector = CollectAutofillContentService::default();
    collector.get_page_details(&mut doc);

    assert_eq!(collector.get_autofill_field_element_by_opid(&doc, "__1"), Some(pass));
    doc.set_opid(pass, "__0".to_string());
    assert_eq!(collector.get_autofill_field_element_by_opid(&doc, "__0"), Some(user));
    doc.set_opid(user, "renamed".to_string());
    doc.set_opid(pass, "renamed".to_string());
    assert_eq!(collector.get_autofill_field_element_by_opid(&doc, "__1"), Some(pass));
    assert_eq!(collector.get_autofill_field_element_by_opid(&doc, "bogus"), None);
}

#[test]
fn detects_password_fields() {
    let (doc, _, _) = login_page();
    let mut collector = CollectAutofillContentService::default();
    assert!(collector.is_password_field_within_document(&doc));

    let empty = Document::new("https://example.com/");
    assert!(!collector.is_password_field_within_document(&empty));
}
