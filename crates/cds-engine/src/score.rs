use serde::{Serialize, Deserialize};

use cds_session::{Round, RoundKind};

use crate::state::TimingRecord;

/// One score slot per designer per round, unset until the round is
/// scored. Rescoring overwrites in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    num_designers: usize,
    training: Vec<Vec<Option<u64>>>,
    scored: Vec<Vec<Option<u64>>>,
}

impl ScoreBoard {
    pub fn reset(&mut self, training_rounds: usize, scored_rounds: usize, num_designers: usize) {
        self.num_designers = num_designers;
        self.training = vec![vec![None; num_designers]; training_rounds];
        self.scored = vec![vec![None; num_designers]; scored_rounds];
    }

    fn rounds(&self, kind: RoundKind) -> &[Vec<Option<u64>>] {
        match kind {
            RoundKind::Training => &self.training,
            RoundKind::Scored => &self.scored,
        }
    }

    pub fn set(&mut self, kind: RoundKind, round: usize, designer: usize, score: u64) {
        let rounds = match kind {
            RoundKind::Training => &mut self.training,
            RoundKind::Scored => &mut self.scored,
        };
        if let Some(slot) = rounds.get_mut(round).and_then(|r| r.get_mut(designer)) {
            *slot = Some(score);
        }
    }

    pub fn get(&self, kind: RoundKind, round: usize, designer: usize) -> Option<u64> {
        self.rounds(kind).get(round).and_then(|r| r.get(designer)).copied().flatten()
    }

    /// A designer's slots across one round sequence.
    pub fn designer_rounds(&self, kind: RoundKind, designer: usize) -> Vec<Option<u64>> {
        self.rounds(kind).iter()
            .map(|round| round.get(designer).copied().flatten())
            .collect()
    }

    pub fn board(&self, kind: RoundKind) -> Vec<Vec<Option<u64>>> {
        self.rounds(kind).to_vec()
    }

    /// Unset slots count as zero.
    pub fn total(&self, designer: usize) -> u64 {
        self.training.iter()
            .chain(self.scored.iter())
            .filter_map(|round| round.get(designer).copied().flatten())
            .sum()
    }

    pub fn totals(&self) -> Vec<u64> {
        (0..self.num_designers).map(|designer| self.total(designer)).collect()
    }
}

/// Time a designer spent on the round so far: completion minus start
/// when both are set, elapsed when only started, zero otherwise.
pub fn duration(timing: &TimingRecord, designer: usize, now_ms: u64) -> u64 {
    match (timing.started(designer), timing.completed(designer)) {
        (Some(start), Some(done)) => done.saturating_sub(start),
        (Some(start), None) => now_ms.saturating_sub(start),
        (None, _) => 0,
    }
}

/// Scores one round: designers on a complete task earn the reference
/// duration minus their own, floored at zero; everyone else earns zero.
/// Designers without a task in this round stay unset.
///
/// The reference duration is the round's time budget, or for unbounded
/// rounds the longest duration observed among the participating
/// designers (zero when nobody has started yet; a later rescore picks
/// up real durations).
pub fn compute_round_scores(
    round: &Round,
    timing: &TimingRecord,
    num_designers: usize,
    now_ms: u64,
) -> Vec<Option<u64>> {
    let durations: Vec<u64> = (0..num_designers)
        .map(|designer| duration(timing, designer, now_ms))
        .collect();

    let observed_max = (0..num_designers)
        .filter(|&designer| round.task_for(designer).is_some())
        .map(|designer| durations[designer])
        .max()
        .unwrap_or(0);
    let max_duration = round.max_time.unwrap_or(observed_max);

    (0..num_designers)
        .map(|designer| {
            let task = round.task_for(designer)?;
            if round.tasks[task].is_complete {
                Some(max_duration.saturating_sub(durations[designer]))
            } else {
                Some(0)
            }
        })
        .collect()
}
