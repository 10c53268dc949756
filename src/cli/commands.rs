use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};
use url::Url;

use crate::cli::config::{AppConfig, build_collector_settings};
use crate::collect::CollectAutofillContentService;
use crate::collect::model::AutofillPageDetails;
use crate::dom::parse::parse_html;
use crate::error::{AutofillError, Result};
use crate::report::console::format_console_report;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TraceEvent;

/// Where the page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Url(String),
    File(String),
}

impl PageSource {
    pub fn from_args(url: Option<&str>, file: Option<&str>) -> Option<Self> {
        match (url, file) {
            (Some(url), _) => Some(Self::Url(url.to_string())),
            (None, Some(file)) => Some(Self::File(file.to_string())),
            (None, None) => None,
        }
    }

    fn describe(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::File(path) => path,
        }
    }
}

// ============================================================================
// collect subcommand
// ============================================================================

pub fn cmd_collect(
    source: &PageSource,
    format: &str,
    output: Option<&str>,
    trace_path: Option<&str>,
    field_limit: Option<usize>,
    config: &AppConfig,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let (html, page_url) = load_page(source)?;
    let settings = build_collector_settings(config, field_limit);

    info!(source = source.describe(), "collecting page details");
    let (details, query_count) = collect_page_details(&html, &page_url, settings)?;
    let duration = start.elapsed().as_millis();

    if let Some(path) = trace_path {
        let event = TraceEvent::now(source.describe(), &details)
            .with_query_count(query_count)
            .with_duration(duration);
        TraceLogger::new(path).log(&event);
    }

    // Format report
    let output_content = match format {
        "table" => format_console_report(&details),
        _ => {
            let mut json = serde_json::to_string_pretty(&details).map_err(|source| AutofillError::Json {
                context: "page details".to_string(),
                source,
            })?;
            json.push('\n');
            json
        }
    };

    // Write or print
    match output {
        Some(path) => std::fs::write(path, &output_content)?,
        None => print!("{}", output_content),
    }

    Ok(())
}

/// Parses `html` and runs one full collection over it. Also returns the
/// number of DOM queries the collector made.
pub fn collect_page_details(
    html: &str,
    page_url: &str,
    settings: crate::collect::CollectorSettings,
) -> Result<(AutofillPageDetails, usize)> {
    let mut doc = parse_html(html, page_url)?;
    let mut collector = CollectAutofillContentService::new(settings);
    let details = collector.get_page_details(&mut doc);
    collector.destroy(&mut doc);
    debug!(fields = details.fields.len(), forms = details.forms.len(), "collection finished");
    Ok((details, collector.query_service().query_count()))
}

/// Loads the page HTML and the URL the document should report.
pub fn load_page(source: &PageSource) -> Result<(String, String)> {
    match source {
        PageSource::Url(url) => {
            let parsed = Url::parse(url).map_err(|source| AutofillError::InvalidUrl {
                url: url.clone(),
                source,
            })?;
            let html = reqwest::blocking::get(parsed.clone())
                .and_then(|response| response.error_for_status())
                .and_then(|response| response.text())
                .map_err(|source| AutofillError::Fetch {
                    url: url.clone(),
                    source,
                })?;
            Ok((html, parsed.to_string()))
        }
        PageSource::File(path) => {
            let html = std::fs::read_to_string(path).map_err(|source| AutofillError::Io {
                path: path.clone(),
                source,
            })?;
            Ok((html, file_url(path)))
        }
    }
}

fn file_url(path: &str) -> String {
    std::fs::canonicalize(Path::new(path))
        .ok()
        .and_then(|absolute| Url::from_file_path(absolute).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| format!("file://{path}"))
}
