//! Defines the communication channel messages between the web server and the board task.

use super::models::BoardStatusResponse;
use crate::reporter::wire::WireFormat;
use tokio::sync::oneshot;

/// Represents a request sent from a web handler to the board task.
#[derive(Debug)]
pub enum BoardRequest {
    /// On-demand pull of the full current grid.
    Query {
        format: WireFormat,
        /// The channel to send the encoded snapshot back on.
        respond_to: oneshot::Sender<Result<Vec<u8>, String>>,
    },
    /// Board identity, scanner state and counters.
    Status {
        respond_to: oneshot::Sender<BoardStatusResponse>,
    },
}
