mod request;
mod notice;
mod client;
mod event_loop;

// re-exports
pub use request::EngineRequest;
pub use notice::{
    EngineNotice, SessionView, RoundView, ScopedRoundView,
    DesignerScoreView, ScoreReportView,
};
pub use client::EngineClient;
pub use event_loop::{engine_channel, engine_event_loop};
