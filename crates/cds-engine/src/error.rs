use serde::{Serialize, Deserialize};
use thiserror::Error;

use cds_session::LoadError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Engine: no session is loaded")]
    NoSession,

    #[error("Engine: all designer slots are bound")]
    NoSlotAvailable,

    #[error("Engine: session load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Engine: request channel closed")]
    ChannelClosed,
}
