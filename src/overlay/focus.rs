use crate::transport::messages::{FocusedFieldData, FrameId, TabId};

/// The most recently focused field across all tabs.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusedField {
    pub tab_id: TabId,
    pub frame_id: FrameId,
    pub data: FocusedFieldData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FocusState {
    Unfocused,
    Focused(FocusedField),
}

/// Focus state machine: `Unfocused` until a frame reports focused field
/// data, back to `Unfocused` on blur, close or tab teardown.
#[derive(Debug, Default)]
pub struct FocusTracker {
    last: Option<FocusedField>,
    currently_focused: bool,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&mut self, tab_id: TabId, frame_id: FrameId, data: FocusedFieldData) {
        self.last = Some(FocusedField { tab_id, frame_id, data });
        self.currently_focused = true;
    }

    pub fn set_currently_focused(&mut self, focused: bool) {
        self.currently_focused = focused && self.last.is_some();
    }

    pub fn blur(&mut self) {
        self.currently_focused = false;
    }

    /// Forgets the field when it lives in `tab_id`.
    pub fn clear_for_tab(&mut self, tab_id: TabId) {
        if self.last.as_ref().is_some_and(|field| field.tab_id == tab_id) {
            self.last = None;
            self.currently_focused = false;
        }
    }

    pub fn state(&self) -> FocusState {
        match &self.last {
            Some(field) if self.currently_focused => FocusState::Focused(field.clone()),
            _ => FocusState::Unfocused,
        }
    }

    pub fn focused_field(&self) -> Option<&FocusedField> {
        self.last.as_ref().filter(|_| self.currently_focused)
    }

    /// Whether the most recently focused field sits in this exact frame,
    /// focused or not.
    pub fn holds_frame(&self, tab_id: TabId, frame_id: FrameId) -> bool {
        self.last
            .as_ref()
            .is_some_and(|field| field.tab_id == tab_id && field.frame_id == frame_id)
    }

    pub fn is_focused_in_tab(&self, tab_id: TabId) -> bool {
        self.focused_field().is_some_and(|field| field.tab_id == tab_id)
    }
}
