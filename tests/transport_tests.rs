use autofill_engine::transport::messages::{
    InboundPortMessage, InlineMenuElement, InlineMenuPortCommand, PortMessage, SubFrameOffsetData, decode_response,
};
use autofill_engine::transport::{ExtensionMessage, Port, PortName, TabMessage, TransportError};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

// =========================================================================
// Message wire format
// =========================================================================

#[test]
fn unknown_commands_and_extra_fields_are_tolerated() {
    let message: ExtensionMessage =
        serde_json::from_value(json!({ "command": "somethingNew", "payload": 1 })).unwrap();
    assert_eq!(message, ExtensionMessage::Unknown);

    let message: ExtensionMessage = serde_json::from_value(json!({
        "command": "updateIsFieldCurrentlyFocused",
        "isFieldCurrentlyFocused": true,
        "extra": "ignored",
    }))
    .unwrap();
    assert_eq!(
        message,
        ExtensionMessage::UpdateIsFieldCurrentlyFocused {
            is_field_currently_focused: true
        }
    );
}

#[test]
fn close_defaults_to_soft_close() {
    let message: ExtensionMessage =
        serde_json::from_value(json!({ "command": "closeAutofillInlineMenu" })).unwrap();
    assert_eq!(
        message,
        ExtensionMessage::CloseAutofillInlineMenu {
            force_close_inline_menu: false
        }
    );
}

#[test]
fn tab_messages_use_camel_case_wire_names() {
    let json = serde_json::to_value(TabMessage::GetSubFrameOffsets {
        sub_frame_url: "https://example.com/frame".into(),
        sub_frame_id: 3,
    })
    .unwrap();
    assert_eq!(
        json,
        json!({
            "command": "getSubFrameOffsets",
            "subFrameUrl": "https://example.com/frame",
            "subFrameId": 3,
        })
    );

    let json = serde_json::to_value(TabMessage::AppendInlineMenuElementsToDom {
        overlay_element: InlineMenuElement::List,
    })
    .unwrap();
    assert_eq!(json["overlayElement"], "list");
}

#[test]
fn inbound_port_messages_carry_their_key() {
    let message: InboundPortMessage = serde_json::from_value(json!({
        "command": "closeAutofillInlineMenu",
        "portKey": "abc",
    }))
    .unwrap();
    assert_eq!(message.port_key.as_deref(), Some("abc"));
    assert_eq!(message.command, InlineMenuPortCommand::CloseAutofillInlineMenu);
}

#[test]
fn list_selection_carries_the_overlay_cipher_id() {
    let message: InboundPortMessage = serde_json::from_value(json!({
        "command": "fillSelectedListItem",
        "overlayCipherId": "overlay-cipher-1",
        "portKey": "abc",
    }))
    .unwrap();
    assert_eq!(
        message.command,
        InlineMenuPortCommand::FillSelectedListItem {
            overlay_cipher_id: Some("overlay-cipher-1".into())
        }
    );
}

#[test]
fn null_responses_decode_to_none() {
    let decoded: Option<SubFrameOffsetData> = decode_response(Some(Value::Null)).unwrap();
    assert!(decoded.is_none());

    let decoded: Option<SubFrameOffsetData> =
        decode_response(Some(json!({ "left": 1.0, "top": 2.0, "url": "u" }))).unwrap();
    assert_eq!(decoded.map(|d| d.left), Some(1.0));
}

// =========================================================================
// Ports
// =========================================================================

#[test]
fn posting_to_a_dropped_receiver_fails() {
    let (port, receiver) = Port::open(PortName::InlineMenuList);
    assert!(port.is_connected());
    drop(receiver);

    let result = port.post_message(PortMessage::UpdateAutofillInlineMenuListCiphers { ciphers: vec![] });
    assert!(matches!(
        result,
        Err(TransportError::PortDisconnected(PortName::InlineMenuList))
    ));
    assert!(!port.is_connected());
}
