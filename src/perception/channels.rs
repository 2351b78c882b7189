// Communication channels for the perception loop
use tokio::sync::mpsc;

use super::state::{StateReader, StateWriter, perception_state_channel};
use super::types::PerceptionCommand;

/// Helper function to create the command channel and the state channel
pub fn create_perception_channels() -> (
    mpsc::Sender<PerceptionCommand>,
    mpsc::Receiver<PerceptionCommand>,
    StateWriter,
    StateReader,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (state_writer, state_reader) = perception_state_channel();
    (cmd_tx, cmd_rx, state_writer, state_reader)
}
