pub mod cache;
pub mod collector;
pub mod fields;
pub mod labels;
pub mod model;
mod mutations;
pub mod scheduler;

pub use cache::ElementCache;
pub use collector::{
    AutofillOverlayContent, CollectAutofillContentService, CollectorSettings, ExtensionMessageSink,
    MutationState,
};
pub use model::{AutofillField, AutofillForm, AutofillPageDetails, SelectInfo};
pub use scheduler::{IdleScheduler, Millis, TaskId};
