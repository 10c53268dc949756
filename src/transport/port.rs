use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::TransportError;
use super::messages::PortMessage;

/// Names of the persistent ports opened by the inline menu elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortName {
    InlineMenuButton,
    InlineMenuList,
}

/// Background end of a persistent connection to an inline menu element.
#[derive(Debug, Clone)]
pub struct Port {
    name: PortName,
    sender: mpsc::UnboundedSender<PortMessage>,
}

impl Port {
    /// Opens a port and returns it with the receiving end handed to the element.
    pub fn open(name: PortName) -> (Self, mpsc::UnboundedReceiver<PortMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { name, sender }, receiver)
    }

    pub fn name(&self) -> PortName {
        self.name
    }

    pub fn post_message(&self, message: PortMessage) -> Result<(), TransportError> {
        self.sender
            .send(message)
            .map_err(|_| TransportError::PortDisconnected(self.name))
    }

    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
