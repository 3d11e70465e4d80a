use futures::{channel::{mpsc, oneshot}, SinkExt};

use crate::error::EngineError;
use crate::registry::ConnId;

use super::notice::EngineNotice;
use super::request::EngineRequest;

/// Caller-side handle on the engine event loop. Every method queues one
/// request and waits for its reply; clone the handle to drive the loop
/// from several tasks.
#[derive(Clone)]
pub struct EngineClient {
    engine_request_sender: mpsc::Sender<EngineRequest>,
}

impl EngineClient {
    pub fn new(engine_request_sender: mpsc::Sender<EngineRequest>) -> Self {
        Self { engine_request_sender }
    }

    async fn request<T>(
        &mut self,
        request: EngineRequest,
        result_receiver: oneshot::Receiver<Result<T, EngineError>>,
    ) -> Result<T, EngineError> {
        self.engine_request_sender
            .send(request)
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        result_receiver
            .await
            .map_err(|_| EngineError::ChannelClosed)?
    }

    /// Claims the administrator role; resolves to `false` when another
    /// connection already holds it and this one stays an observer.
    pub async fn register_admin(
        &mut self,
        conn: ConnId,
        outbox: mpsc::UnboundedSender<EngineNotice>,
    ) -> Result<bool, EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(
            EngineRequest::RegisterAdmin { conn, outbox, result_sender },
            result_receiver,
        ).await
    }

    /// Resolves to the assigned designer slot index.
    pub async fn register_designer(
        &mut self,
        conn: ConnId,
        outbox: mpsc::UnboundedSender<EngineNotice>,
    ) -> Result<usize, EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(
            EngineRequest::RegisterDesigner { conn, outbox, result_sender },
            result_receiver,
        ).await
    }

    pub async fn submit_input(
        &mut self,
        conn: ConnId,
        values: Vec<f64>,
    ) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(
            EngineRequest::SubmitInput { conn, values, result_sender },
            result_receiver,
        ).await
    }

    pub async fn select_round(&mut self, name: &str) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(
            EngineRequest::SelectRound { name: name.to_string(), result_sender },
            result_receiver,
        ).await
    }

    pub async fn advance_round(&mut self) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(EngineRequest::AdvanceRound { result_sender }, result_receiver).await
    }

    pub async fn reload_session(&mut self, definition_id: u32) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(
            EngineRequest::ReloadSession { definition_id, result_sender },
            result_receiver,
        ).await
    }

    pub async fn rescore_round(&mut self) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(EngineRequest::RescoreRound { result_sender }, result_receiver).await
    }

    pub async fn poll_round(&mut self) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(EngineRequest::PollRound { result_sender }, result_receiver).await
    }

    pub async fn disconnect(&mut self, conn: ConnId) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(EngineRequest::Disconnect { conn, result_sender }, result_receiver).await
    }

    pub async fn shutdown(&mut self) -> Result<(), EngineError> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.request(EngineRequest::Shutdown { result_sender }, result_receiver).await
    }
}
