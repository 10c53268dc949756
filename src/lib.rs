//! Autofill content collection and inline menu coordination.
//!
//! [`collect`] scans a frame's document for forms and fields and keeps that
//! model current as the DOM mutates. [`overlay`] aggregates the page details
//! of every frame in a tab and drives the inline menu.

pub mod cli;
pub mod collect;
pub mod dom;
pub mod error;
pub mod overlay;
pub mod report;
pub mod trace;
pub mod transport;

pub use collect::{AutofillPageDetails, CollectAutofillContentService, CollectorSettings};
pub use dom::Document;
pub use error::{AutofillError, Result};
pub use overlay::{OverlayBackground, OverlaySettings};
