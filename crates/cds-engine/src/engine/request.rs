use futures::channel::{mpsc, oneshot};

use crate::error::EngineError;
use crate::registry::ConnId;

use super::notice::EngineNotice;

/// One request per inbound operation; every variant carries the reply
/// channel its caller is parked on. The event loop consumes these in
/// FIFO order, which is the whole serialization discipline.
pub enum EngineRequest {
    RegisterAdmin {
        conn: ConnId,
        outbox: mpsc::UnboundedSender<EngineNotice>,
        // true when promoted, false when kept as a plain observer
        result_sender: oneshot::Sender<Result<bool, EngineError>>,
    },

    RegisterDesigner {
        conn: ConnId,
        outbox: mpsc::UnboundedSender<EngineNotice>,
        result_sender: oneshot::Sender<Result<usize, EngineError>>,
    },

    SubmitInput {
        conn: ConnId,
        values: Vec<f64>,
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },

    SelectRound {
        name: String,
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },

    AdvanceRound {
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },

    ReloadSession {
        definition_id: u32,
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },

    RescoreRound {
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },

    PollRound {
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },

    Disconnect {
        conn: ConnId,
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },

    Shutdown {
        result_sender: oneshot::Sender<Result<(), EngineError>>,
    },
}
