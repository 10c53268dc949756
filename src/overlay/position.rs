//! Inline menu placement in top-frame coordinates.
//!
//! The focused field reports its rects relative to its own frame; adding the
//! frame's sub-frame offset moves them into the top frame, where the inline
//! menu elements live.

use serde::{Deserialize, Serialize};

use crate::transport::messages::{FocusedFieldData, SubFrameOffsetData};

/// CSS placement of an inline menu iframe, in whole pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineMenuStyles {
    pub top: String,
    pub left: String,
    pub width: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

struct FieldRect {
    top: f64,
    left: f64,
    width: f64,
    height: f64,
}

impl FieldRect {
    fn of(field: &FocusedFieldData) -> Self {
        let rect = |key: &str| field.focused_field_rects.get(key).copied().unwrap_or(0.0);
        Self {
            top: rect("top"),
            left: rect("left"),
            width: rect("width"),
            height: rect("height"),
        }
    }
}

/// Square button vertically centred in the field, tucked against its right edge.
pub fn inline_menu_button_position(
    field: &FocusedFieldData,
    offset: Option<&SubFrameOffsetData>,
) -> InlineMenuStyles {
    let (offset_left, offset_top) = offset.map_or((0.0, 0.0), |offset| (offset.left, offset.top));
    let FieldRect { top, left, width, height } = FieldRect::of(field);

    let element_offset = if height >= 50.0 {
        height * 0.47
    } else if height >= 35.0 {
        height * 0.42
    } else {
        height * 0.37
    };
    let element_height = height - element_offset;
    let element_top = offset_top + top + element_offset / 2.0;

    let padding_left = padding(field, "paddingLeft");
    let padding_right = padding(field, "paddingRight");
    let element_left = match (padding_right, padding_left) {
        (Some(right), Some(left_padding)) if right > left_padding => {
            left + width - height - (right - element_offset + 2.0)
        }
        _ => left + width - height + element_offset / 2.0,
    };

    InlineMenuStyles {
        top: px(element_top),
        left: px(element_left + offset_left),
        width: px(element_height),
        height: Some(px(element_height)),
    }
}

/// List directly below the field, as wide as the field.
pub fn inline_menu_list_position(field: &FocusedFieldData, offset: Option<&SubFrameOffsetData>) -> InlineMenuStyles {
    let (offset_left, offset_top) = offset.map_or((0.0, 0.0), |offset| (offset.left, offset.top));
    let FieldRect { top, left, width, height } = FieldRect::of(field);

    InlineMenuStyles {
        top: px(top + height + offset_top),
        left: px(left + offset_left),
        width: px(width),
        height: None,
    }
}

/// Leading integer of a CSS length such as `"12px"`.
fn padding(field: &FocusedFieldData, key: &str) -> Option<f64> {
    let value = field.focused_field_styles.get(key)?.trim();
    let end = value
        .char_indices()
        .find(|(index, c)| !(c.is_ascii_digit() || (*index == 0 && *c == '-')))
        .map_or(value.len(), |(index, _)| index);
    value[..end].parse::<i64>().ok().map(|number| number as f64)
}

fn px(value: f64) -> String {
    format!("{}px", (value + 0.5).floor() as i64)
}
