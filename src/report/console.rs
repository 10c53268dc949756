use crate::collect::model::{AutofillField, AutofillPageDetails};

// ============================================================================
// Console reporter
// ============================================================================

const LABEL_WIDTH: usize = 32;

/// Format collected page details for terminal output.
///
/// Produces output like:
/// ```text
/// === Page: Sign in (https://example.com/login) ===
///
/// Forms (1):
///   __form__0  POST  https://example.com/session  name="login" id=""
///
/// Fields (2):
///   __0   text      username   Username      [__form__0]
///   __1   password  password   Password      [__form__0] (hidden)
///
/// === 1 forms, 2 fields (1 viewable) ===
/// ```
pub fn format_console_report(details: &AutofillPageDetails) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Page: {} ({}) ===\n\n", details.title, details.url));

    out.push_str(&format!("Forms ({}):\n", details.forms.len()));
    for form in details.forms.values() {
        out.push_str(&format!(
            "  {}  {}  {}  name=\"{}\" id=\"{}\"\n",
            form.opid,
            form.html_method.to_uppercase(),
            form.html_action,
            form.html_name,
            form.html_id
        ));
    }

    out.push_str(&format!("\nFields ({}):\n", details.fields.len()));
    for field in &details.fields {
        out.push_str(&format_field_line(field));
    }

    let viewable = details.fields.iter().filter(|f| f.viewable).count();
    out.push_str(&format!(
        "\n=== {} forms, {} fields ({} viewable) ===\n",
        details.forms.len(),
        details.fields.len(),
        viewable
    ));

    out
}

fn format_field_line(field: &AutofillField) -> String {
    let field_type = field
        .field_type
        .as_deref()
        .or(field.tag_name.as_deref())
        .unwrap_or("?");
    let name = field
        .html_name
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(field.html_id.as_deref())
        .unwrap_or("");

    let mut line = format!(
        "  {:<5} {:<9} {:<10} {}",
        field.opid,
        field_type,
        name,
        truncate(&best_label(field), LABEL_WIDTH)
    );
    if let Some(form) = &field.form {
        line.push_str(&format!("  [{}]", form));
    }
    if !field.viewable {
        line.push_str(" (hidden)");
    }
    line.push('\n');
    line
}

/// The first non-empty label source, in the order a reader would trust it.
fn best_label(field: &AutofillField) -> String {
    [
        &field.label_tag,
        &field.label_aria,
        &field.label_data,
        &field.placeholder,
        &field.label_left,
        &field.label_top,
    ]
    .into_iter()
    .flatten()
    .find(|label| !label.is_empty())
    .cloned()
    .unwrap_or_default()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
