use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::collect::model::AutofillPageDetails;

/// One line of the collection trace.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub source: String,

    pub url: String,
    pub title: String,

    pub form_count: usize,
    pub field_count: usize,
    pub viewable_field_count: usize,

    pub query_count: Option<usize>,
    pub duration_ms: Option<u128>,
}

impl TraceEvent {
    pub fn now(source: impl ToString, details: &AutofillPageDetails) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or(0),
            source: source.to_string(),
            url: details.url.clone(),
            title: details.title.clone(),
            form_count: details.forms.len(),
            field_count: details.fields.len(),
            viewable_field_count: details.fields.iter().filter(|field| field.viewable).count(),
            query_count: None,
            duration_ms: None,
        }
    }

    pub fn with_query_count(mut self, query_count: usize) -> Self {
        self.query_count = Some(query_count);
        self
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}
