use futures::{channel::mpsc, StreamExt};
use serde_json::json;

use cds_session::SessionStore;

use crate::broadcast::Broadcaster;
use crate::error::EngineError;
use crate::event_log::{EventKind, EventLog, EventRecord};
use crate::registry::{Participant, ParticipantRegistry};
use crate::state::EngineState;

use super::client::EngineClient;
use super::notice::EngineNotice;
use super::request::EngineRequest;

/// Client/loop channel pair. The bounded request queue is the whole
/// serialization discipline: requests drain one at a time, in
/// submission order.
pub fn engine_channel() -> (EngineClient, mpsc::Receiver<EngineRequest>) {
    let (engine_request_sender, engine_request_receiver) = mpsc::channel(0);
    (EngineClient::new(engine_request_sender), engine_request_receiver)
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Single exclusive owner of the engine aggregate. Each request runs to
/// completion against `EngineState` and its broadcast goes out before
/// the reply is released, so a resolved call means the mutation and its
/// notices are committed. Replies to callers that already went away are
/// dropped. The loop ends on `Shutdown` or when every client handle is
/// gone.
pub async fn engine_event_loop(
    mut engine_request_receiver: mpsc::Receiver<EngineRequest>,
    store: SessionStore,
    event_sink: Option<mpsc::UnboundedSender<EventRecord>>,
) {
    let mut state = EngineState::new();
    let mut registry = ParticipantRegistry::new(0);
    let events = EventLog::new(event_sink);

    while let Some(request) = engine_request_receiver.next().await {
        match request {
            EngineRequest::RegisterAdmin { conn, outbox, result_sender } => {
                let participant = Participant { conn, outbox };
                let promoted = registry.bind_admin(participant.clone());
                if !promoted {
                    log::debug!("administrator role taken, {conn:?} joins as observer");
                }
                Broadcaster { registry: &registry, state: &state }.admin_joined(&participant);
                let _ = result_sender.send(Ok(promoted));
            }

            EngineRequest::RegisterDesigner { conn, outbox, result_sender } => {
                let reply = if !state.has_session() {
                    Err(EngineError::NoSession)
                } else {
                    let participant = Participant { conn, outbox };
                    match registry.bind_designer(participant.clone()) {
                        Some(index) => {
                            Broadcaster { registry: &registry, state: &state }
                                .designer_joined(&participant, index);
                            Ok(index)
                        }
                        None => Err(EngineError::NoSlotAvailable),
                    }
                };
                let _ = result_sender.send(reply);
            }

            EngineRequest::SubmitInput { conn, values, result_sender } => {
                let reply = if !state.has_session() {
                    Err(EngineError::NoSession)
                } else {
                    let now = now_ms();
                    // unknown or unassigned connections are dropped silently
                    let effects = registry.designer_index(conn)
                        .and_then(|designer| {
                            let effects = state.apply_input(designer, &values, now);
                            if effects.is_some() {
                                events.record(now, EventKind::Action, json!({
                                    "designer": designer,
                                    "values": values,
                                }));
                            }
                            effects
                        });
                    if let Some(effects) = effects {
                        if effects.task_completed {
                            events.record(now, EventKind::Complete, json!({
                                "task": effects.task_index,
                            }));
                        }
                        let scored = state.maybe_score_round(now);
                        if scored {
                            events.record(now, EventKind::Score, json!({
                                "totals": state.scores().totals(),
                            }));
                        }
                        let broadcaster = Broadcaster { registry: &registry, state: &state };
                        broadcaster.input_applied(effects, now);
                        if scored {
                            broadcaster.scores_written();
                        }
                    }
                    Ok(())
                };
                let _ = result_sender.send(reply);
            }

            EngineRequest::SelectRound { name, result_sender } => {
                let reply = if !state.has_session() {
                    Err(EngineError::NoSession)
                } else {
                    if state.select_round_by_name(&name) {
                        events.record(now_ms(), EventKind::Round, json!({ "round": name }));
                        Broadcaster { registry: &registry, state: &state }.round_activated();
                    } else {
                        log::debug!("ignored selection of unknown round '{name}'");
                    }
                    Ok(())
                };
                let _ = result_sender.send(reply);
            }

            EngineRequest::AdvanceRound { result_sender } => {
                let reply = if !state.has_session() {
                    Err(EngineError::NoSession)
                } else {
                    if state.advance_round() {
                        let name = state.active_round()
                            .map(|round| round.name.clone())
                            .unwrap_or_default();
                        events.record(now_ms(), EventKind::Round, json!({ "round": name }));
                        Broadcaster { registry: &registry, state: &state }.round_activated();
                    }
                    Ok(())
                };
                let _ = result_sender.send(reply);
            }

            EngineRequest::ReloadSession { definition_id, result_sender } => {
                // the fetch happens before any state is touched; a
                // failed load leaves the running session as it was
                let reply = match store.load(definition_id).await {
                    Ok(session) => {
                        for participant in registry.resize(session.num_designers) {
                            let _ = participant.outbox.unbounded_send(EngineNotice::Evicted);
                        }
                        state.install_session(session);
                        events.record(now_ms(), EventKind::Load, json!({
                            "definition": definition_id,
                        }));
                        Broadcaster { registry: &registry, state: &state }.session_loaded();
                        Ok(())
                    }
                    Err(err) => {
                        log::warn!("definition {definition_id} rejected: {err}");
                        Err(EngineError::Load(err))
                    }
                };
                let _ = result_sender.send(reply);
            }

            EngineRequest::RescoreRound { result_sender } => {
                let reply = if !state.has_session() {
                    Err(EngineError::NoSession)
                } else {
                    let now = now_ms();
                    if state.score_round(now) {
                        events.record(now, EventKind::Score, json!({
                            "totals": state.scores().totals(),
                        }));
                        Broadcaster { registry: &registry, state: &state }.scores_written();
                    }
                    Ok(())
                };
                let _ = result_sender.send(reply);
            }

            EngineRequest::PollRound { result_sender } => {
                let reply = if !state.has_session() {
                    Err(EngineError::NoSession)
                } else {
                    let now = now_ms();
                    // polling is one of the lazy scoring triggers
                    if state.maybe_score_round(now) {
                        events.record(now, EventKind::Score, json!({
                            "totals": state.scores().totals(),
                        }));
                        Broadcaster { registry: &registry, state: &state }.scores_written();
                    }
                    Broadcaster { registry: &registry, state: &state }.round_polled(now);
                    Ok(())
                };
                let _ = result_sender.send(reply);
            }

            EngineRequest::Disconnect { conn, result_sender } => {
                registry.unbind(conn);
                let _ = result_sender.send(Ok(()));
            }

            EngineRequest::Shutdown { result_sender } => {
                log::info!("engine event loop shutting down");
                let _ = result_sender.send(Ok(()));
                break;
            }
        }
    }
}
