use crate::engine::{
    DesignerScoreView, EngineNotice, RoundView, ScopedRoundView, ScoreReportView, SessionView,
};
use crate::registry::{Participant, ParticipantRegistry};
use crate::state::{EngineState, InputEffects};

fn push(participant: &Participant, notice: EngineNotice) {
    // a dead outbox means the connection is on its way out; the
    // boundary layer will follow up with a Disconnect
    let _ = participant.outbox.unbounded_send(notice);
}

/// Post-mutation fanout: full views to the administrator side, scoped
/// views to each affected designer. Borrows the committed state, so a
/// broadcast always reflects exactly one finished mutation.
pub(crate) struct Broadcaster<'a> {
    pub registry: &'a ParticipantRegistry,
    pub state: &'a EngineState,
}

impl<'a> Broadcaster<'a> {
    fn to_admin_side(&self, notice: EngineNotice) {
        for participant in self.registry.admin_side() {
            push(participant, notice.clone());
        }
    }

    fn full_round_view(&self) -> Option<RoundView> {
        let active = self.state.active()?;
        Some(RoundView::of(active.kind, self.state.active_round()?))
    }

    /// Admin-side registration: the session layout plus the full state
    /// of the active round. Observers get the same feed.
    pub fn admin_joined(&self, participant: &Participant) {
        let Some(session) = self.state.session() else { return };
        push(participant, EngineNotice::SessionSnapshot(SessionView::of(session)));
        if let Some(view) = self.full_round_view() {
            push(participant, EngineNotice::RoundSnapshot(view));
        }
    }

    pub fn designer_joined(&self, participant: &Participant, index: usize) {
        push(participant, EngineNotice::SlotAssigned { index });
        if let Some(round) = self.state.active_round() {
            push(participant, EngineNotice::ScopedRoundSnapshot(ScopedRoundView::of(round, index)));
        }
    }

    /// Select, advance and reload all land here once the new round is
    /// in place.
    pub fn round_activated(&self) {
        if let Some(view) = self.full_round_view() {
            self.to_admin_side(EngineNotice::RoundSnapshot(view));
        }
        let Some(round) = self.state.active_round() else { return };
        for (index, participant) in self.registry.designers() {
            push(participant, EngineNotice::ScopedRoundSnapshot(ScopedRoundView::of(round, index)));
        }
    }

    pub fn session_loaded(&self) {
        let Some(session) = self.state.session() else { return };
        let snapshot = EngineNotice::SessionSnapshot(SessionView::of(session));
        self.to_admin_side(snapshot.clone());
        for (_, participant) in self.registry.designers() {
            push(participant, snapshot.clone());
        }
        self.round_activated();
    }

    /// One committed input: scoped outputs (and the running clock on a
    /// bounded round) to the touched task's designers, the full task to
    /// the admin side, completion transitions as they happened.
    pub fn input_applied(&self, effects: InputEffects, now_ms: u64) {
        let Some(round) = self.state.active_round() else { return };
        let Some(task) = round.tasks.get(effects.task_index) else { return };

        let remaining = self.state.time_remaining(now_ms);
        for &designer in &task.designers {
            let Some(participant) = self.registry.designer(designer) else { continue };
            push(participant, EngineNotice::OutputUpdated {
                outputs: task.visible_outputs(designer),
            });
            if effects.task_completed {
                push(participant, EngineNotice::TaskCompleted);
            }
            if round.max_time.is_some() {
                push(participant, EngineNotice::TimeRemainingUpdated {
                    remaining: remaining.get(designer).copied().flatten(),
                });
            }
        }

        self.to_admin_side(EngineNotice::TaskSnapshot(task.clone()));
        if effects.round_completed {
            self.to_admin_side(EngineNotice::RoundCompleted);
        }
    }

    pub fn scores_written(&self) {
        let Some(active) = self.state.active() else { return };
        for (index, participant) in self.registry.designers() {
            push(participant, EngineNotice::ScoreUpdated(
                DesignerScoreView::of(self.state.scores(), active, index),
            ));
        }
        self.to_admin_side(EngineNotice::ScoreReport(ScoreReportView::of(self.state.scores())));
    }

    /// Administrator poll: the current round plus the per-designer
    /// clock.
    pub fn round_polled(&self, now_ms: u64) {
        if let Some(view) = self.full_round_view() {
            self.to_admin_side(EngineNotice::RoundSnapshot(view));
        }
        self.to_admin_side(EngineNotice::TimeRemainingReport {
            remaining: self.state.time_remaining(now_ms),
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures::channel::mpsc;

    use cds_session::{RoundDefinition, SessionDefinition, TaskDefinition};
    use crate::registry::ConnId;

    fn installed_state() -> EngineState {
        let definition = SessionDefinition {
            name: "broadcast".to_string(),
            num_designers: 2,
            error_tol: 0.01,
            training: vec![],
            scored: vec![RoundDefinition {
                name: "s0".to_string(),
                max_time: Some(10_000),
                tasks: vec![TaskDefinition {
                    designers: vec![0, 1],
                    num_inputs: vec![1, 1],
                    num_outputs: vec![1, 1],
                    inputs: vec![0, 1],
                    outputs: vec![0, 1],
                    coupling: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                    target: vec![1.0, 1.0],
                }],
            }],
        };
        let mut state = EngineState::new();
        state.install_session(definition.into_session().unwrap());
        state
    }

    fn bound_registry() -> (
        ParticipantRegistry,
        Vec<mpsc::UnboundedReceiver<EngineNotice>>,
    ) {
        let mut registry = ParticipantRegistry::new(2);
        let mut inboxes = Vec::new();
        for conn in 0..3u64 {
            let (outbox, inbox) = mpsc::unbounded();
            let participant = Participant { conn: ConnId(conn), outbox };
            if conn == 0 {
                assert!(registry.bind_admin(participant));
            } else {
                registry.bind_designer(participant);
            }
            inboxes.push(inbox);
        }
        (registry, inboxes)
    }

    fn drain(inbox: &mut mpsc::UnboundedReceiver<EngineNotice>) -> Vec<EngineNotice> {
        let mut out = Vec::new();
        while let Ok(Some(notice)) = inbox.try_next() {
            out.push(notice);
        }
        out
    }

    #[test]
    fn activation_fans_out_full_and_scoped_views() {
        let state = installed_state();
        let (registry, mut inboxes) = bound_registry();

        Broadcaster { registry: &registry, state: &state }.round_activated();

        let admin = drain(&mut inboxes[0]);
        assert!(matches!(admin[0], EngineNotice::RoundSnapshot(ref view) if view.name == "s0"));

        let designer = drain(&mut inboxes[1]);
        match &designer[0] {
            EngineNotice::ScopedRoundSnapshot(view) => {
                assert_eq!(view.num_inputs, 1);
                assert_eq!(view.target, vec![1.0]);
            }
            other => panic!("unexpected notice {other:?}"),
        }
    }

    #[test]
    fn input_fanout_scopes_outputs_and_clock() {
        let mut state = installed_state();
        let (registry, mut inboxes) = bound_registry();

        let effects = state.apply_input(1, &[0.5], 1_000).unwrap();
        Broadcaster { registry: &registry, state: &state }.input_applied(effects, 3_000);

        let designer = drain(&mut inboxes[2]);
        assert_eq!(designer[0], EngineNotice::OutputUpdated { outputs: vec![0.5] });
        assert_eq!(designer[1], EngineNotice::TimeRemainingUpdated { remaining: Some(8_000) });

        let admin = drain(&mut inboxes[0]);
        assert!(matches!(admin[0], EngineNotice::TaskSnapshot(ref task) if task.y == vec![0.0, 0.5]));
    }

    #[test]
    fn completion_transition_reaches_both_sides() {
        let mut state = installed_state();
        let (registry, mut inboxes) = bound_registry();

        state.apply_input(0, &[1.0], 0);
        let effects = state.apply_input(1, &[1.0], 100).unwrap();
        Broadcaster { registry: &registry, state: &state }.input_applied(effects, 100);

        assert!(drain(&mut inboxes[1]).contains(&EngineNotice::TaskCompleted));
        assert!(drain(&mut inboxes[0]).contains(&EngineNotice::RoundCompleted));
    }
}
