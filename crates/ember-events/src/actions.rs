use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::PlayerId;

/// Outbound effects the block layer asks the host server to perform.
///
/// The engine never touches world state directly; every game-facing action
/// block emits one of these on the engine's action channel and the host
/// applies it on its own terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostAction {
    SendMessage {
        player: PlayerId,
        text: String,
    },
    Broadcast {
        text: String,
    },
    RunCommand {
        player: PlayerId,
        command: String,
    },
    Teleport {
        player: PlayerId,
        world: String,
        x: f64,
        y: f64,
        z: f64,
    },
    GiveItem {
        player: PlayerId,
        item: String,
        quantity: i64,
    },
    PlaySound {
        player: PlayerId,
        sound: String,
    },
    /// Ask the host to cancel the occurrence identified by its dispatch
    /// sequence number, if it is still cancellable.
    CancelOccurrence {
        seq: u64,
    },
}

/// Sender half of the host-action channel handed to executing blocks.
///
/// Sends never block; a closed receiver means the host is shutting down and
/// the action is dropped.
#[derive(Debug, Clone)]
pub struct HostActionSender {
    tx: UnboundedSender<HostAction>,
}

impl HostActionSender {
    pub fn new(tx: UnboundedSender<HostAction>) -> Self {
        Self { tx }
    }

    pub fn send(&self, action: HostAction) {
        let _ = self.tx.send(action);
    }
}
