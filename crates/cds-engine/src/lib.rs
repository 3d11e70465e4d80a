pub mod error;
pub mod engine;
pub mod registry;
pub mod state;
pub mod score;
pub mod event_log;

mod broadcast;

// re-export
pub use crate::error::EngineError;
pub use crate::registry::ConnId;
pub use crate::event_log::{EventKind, EventRecord};

pub fn async_executor<F>(future: F)
    where F: futures::Future<Output = ()> + 'static + std::marker::Send,
{
    tokio::task::spawn(future);
}
