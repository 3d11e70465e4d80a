use serde::{Serialize, Deserialize};

use cds_session::{Round, RoundKind, Session};

use crate::score::{compute_round_scores, ScoreBoard};

/// Cursor into the session's training/scored sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRound {
    pub kind: RoundKind,
    pub index: usize,
}

/// Per-designer start/completion timestamps for the active round, in
/// epoch milliseconds. First write wins on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingRecord {
    started_ms: Vec<Option<u64>>,
    completed_ms: Vec<Option<u64>>,
}

impl TimingRecord {
    pub fn reset(&mut self, num_designers: usize) {
        self.started_ms = vec![None; num_designers];
        self.completed_ms = vec![None; num_designers];
    }

    pub fn start(&mut self, designer: usize, now_ms: u64) {
        if let Some(slot) = self.started_ms.get_mut(designer) {
            slot.get_or_insert(now_ms);
        }
    }

    pub fn complete(&mut self, designer: usize, now_ms: u64) {
        if let Some(slot) = self.completed_ms.get_mut(designer) {
            slot.get_or_insert(now_ms);
        }
    }

    pub fn started(&self, designer: usize) -> Option<u64> {
        self.started_ms.get(designer).copied().flatten()
    }

    pub fn completed(&self, designer: usize) -> Option<u64> {
        self.completed_ms.get(designer).copied().flatten()
    }
}

/// What one input application changed, for the post-commit broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEffects {
    pub task_index: usize,
    pub task_completed: bool,
    pub round_completed: bool,
}

/// The one shared mutable aggregate. Every mutation runs to completion
/// on the engine event loop, so no locking happens here; timestamps
/// come in as explicit parameters.
#[derive(Debug, Default)]
pub struct EngineState {
    session: Option<Session>,
    active: Option<ActiveRound>,
    timing: TimingRecord,
    scores: ScoreBoard,
    round_scored: bool,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn active(&self) -> Option<ActiveRound> {
        self.active
    }

    pub fn active_round(&self) -> Option<&Round> {
        let active = self.active?;
        self.session.as_ref()?.round(active.kind, active.index)
    }

    pub fn timing(&self) -> &TimingRecord {
        &self.timing
    }

    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    /// Swaps in a freshly loaded session. All prior round, timing and
    /// score state is discarded and the first round becomes active.
    pub fn install_session(&mut self, session: Session) {
        self.scores.reset(session.training.len(), session.scored.len(), session.num_designers);
        self.timing.reset(session.num_designers);
        self.round_scored = false;
        self.active = None;

        let first = session.first_round();
        self.session = Some(session);
        if let Some((kind, index)) = first {
            self.activate(kind, index);
        }
    }

    /// Training names are searched before scored names; an unknown name
    /// changes nothing and reports `false`.
    pub fn select_round_by_name(&mut self, name: &str) -> bool {
        let Some((kind, index)) = self.session.as_ref().and_then(|s| s.find_round(name)) else {
            return false;
        };
        self.activate(kind, index);
        true
    }

    /// Steps training -> first scored -> scored in order. Past the last
    /// scored round this is a no-op and reports `false`.
    pub fn advance_round(&mut self) -> bool {
        let Some(active) = self.active else { return false };
        let Some((kind, index)) = self.session.as_ref()
            .and_then(|s| s.next_round(active.kind, active.index)) else {
            return false;
        };
        self.activate(kind, index);
        true
    }

    fn activate(&mut self, kind: RoundKind, index: usize) {
        let Some(session) = self.session.as_mut() else { return };
        let error_tol = session.error_tol;
        let num_designers = session.num_designers;
        let Some(round) = session.round_mut(kind, index) else { return };

        round.activate(error_tol);
        log::info!("activated {:?} round '{}'", kind, round.name);

        self.active = Some(ActiveRound { kind, index });
        self.timing.reset(num_designers);
        self.round_scored = false;
    }

    pub fn lookup_task(&self, designer: usize) -> Option<usize> {
        self.active_round()?.task_for(designer)
    }

    /// Applies one designer's values to their task. `None` when there
    /// is no session, no active round or no task for this designer.
    pub fn apply_input(&mut self, designer: usize, values: &[f64], now_ms: u64) -> Option<InputEffects> {
        let error_tol = self.session.as_ref()?.error_tol;
        let active = self.active?;
        let round = self.session.as_mut()?.round_mut(active.kind, active.index)?;
        let task_index = round.task_for(designer)?;

        let task = &mut round.tasks[task_index];
        task.write_inputs(designer, values);
        task.recompute_outputs();

        // the shared task clock starts with the first input from anyone
        for &attached in &task.designers {
            self.timing.start(attached, now_ms);
        }

        let was_complete = task.is_complete;
        task.evaluate_complete(error_tol);
        let task_completed = !was_complete && task.is_complete;
        if task_completed {
            for &attached in &task.designers {
                self.timing.complete(attached, now_ms);
            }
        }

        let round_was_complete = round.is_complete;
        round.evaluate_complete();
        let round_completed = !round_was_complete && round.is_complete;

        Some(InputEffects { task_index, task_completed, round_completed })
    }

    /// Per-designer remaining budget, all `None` for an unbounded
    /// round. Designers who have not started keep the full budget.
    pub fn time_remaining(&self, now_ms: u64) -> Vec<Option<u64>> {
        let Some(session) = &self.session else { return Vec::new() };
        let Some(round) = self.active_round() else { return Vec::new() };
        let Some(budget) = round.max_time else {
            return vec![None; session.num_designers];
        };
        (0..session.num_designers)
            .map(|designer| {
                Some(match self.timing.started(designer) {
                    None => budget,
                    Some(start) => budget.saturating_sub(now_ms.saturating_sub(start)),
                })
            })
            .collect()
    }

    /// A round settles when it completes, or when every participating
    /// designer has either completed or run out their started budget.
    pub fn round_settled(&self, now_ms: u64) -> bool {
        let Some(session) = &self.session else { return false };
        let Some(round) = self.active_round() else { return false };
        if round.is_complete {
            return true;
        }
        let Some(budget) = round.max_time else { return false };

        let mut participating = false;
        for designer in 0..session.num_designers {
            let Some(task) = round.task_for(designer) else { continue };
            participating = true;
            if round.tasks[task].is_complete {
                continue;
            }
            match self.timing.started(designer) {
                Some(start) if now_ms.saturating_sub(start) >= budget => continue,
                _ => return false,
            }
        }
        participating
    }

    /// Lazy scoring trigger: fires once per round activation.
    pub fn maybe_score_round(&mut self, now_ms: u64) -> bool {
        if self.round_scored || !self.round_settled(now_ms) {
            return false;
        }
        self.score_round(now_ms)
    }

    /// Computes and records scores for the active round, overwriting
    /// any previous value. The explicit rescore request lands here.
    pub fn score_round(&mut self, now_ms: u64) -> bool {
        let Some(active) = self.active else { return false };
        let Some(session) = &self.session else { return false };
        let Some(round) = session.round(active.kind, active.index) else { return false };

        let scores = compute_round_scores(round, &self.timing, session.num_designers, now_ms);
        for (designer, score) in scores.iter().enumerate() {
            if let Some(score) = *score {
                self.scores.set(active.kind, active.index, designer, score);
            }
        }
        self.round_scored = true;
        log::info!("scored {:?} round '{}': {:?}", active.kind, round.name, scores);
        true
    }
}
