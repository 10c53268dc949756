pub mod background;
pub mod ciphers;
pub mod fill;
pub mod focus;
mod offsets;
pub mod position;
pub mod session;

pub use background::{InlineMenuPortConnection, OverlayBackground, OverlaySettings};
pub use ciphers::{
    AuthenticationStatus, CipherRepromptType, CipherService, CipherType, CipherView, IconSettings,
    InlineMenuVisibility, OverlayCipherData,
};
pub use fill::{AutofillRequest, AutofillService};
pub use focus::{FocusState, FocusTracker, FocusedField};
pub use position::InlineMenuStyles;
pub use session::{SubFrameOffsets, TabSession};
