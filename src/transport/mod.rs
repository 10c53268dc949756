pub mod browser_api;
pub mod messages;
pub mod port;

use thiserror::Error;

pub use browser_api::BrowserApi;
pub use messages::{ExtensionMessage, FrameId, MessageSender, Tab, TabId, TabMessage};
pub use port::{Port, PortName};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("port {0:?} is disconnected")]
    PortDisconnected(PortName),

    #[error("no receiver for tab {tab_id} frame {frame_id:?}")]
    NoReceiver { tab_id: TabId, frame_id: Option<FrameId> },

    #[error("malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}
