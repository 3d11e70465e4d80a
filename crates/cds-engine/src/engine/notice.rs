use serde::{Serialize, Deserialize};

use cds_session::{Round, RoundKind, Session, Task, Vector};

use crate::score::ScoreBoard;
use crate::state::ActiveRound;

/// Post-mutation notifications pushed into participant outboxes. Full
/// views go to the administrator side, scoped ones to designers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineNotice {
    SessionSnapshot(SessionView),
    RoundSnapshot(RoundView),
    ScopedRoundSnapshot(ScopedRoundView),
    SlotAssigned { index: usize },
    OutputUpdated { outputs: Vector },
    TaskCompleted,
    TaskSnapshot(Task),
    RoundCompleted,
    TimeRemainingUpdated { remaining: Option<u64> },
    TimeRemainingReport { remaining: Vec<Option<u64>> },
    ScoreUpdated(DesignerScoreView),
    ScoreReport(ScoreReportView),
    Evicted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub name: String,
    pub num_designers: usize,
    pub training_rounds: Vec<String>,
    pub scored_rounds: Vec<String>,
}

impl SessionView {
    pub fn of(session: &Session) -> Self {
        Self {
            name: session.name.clone(),
            num_designers: session.num_designers,
            training_rounds: session.round_names(RoundKind::Training),
            scored_rounds: session.round_names(RoundKind::Scored),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundView {
    pub name: String,
    pub kind: RoundKind,
    pub max_time: Option<u64>,
    pub tasks: Vec<Task>,
    pub is_complete: bool,
}

impl RoundView {
    pub fn of(kind: RoundKind, round: &Round) -> Self {
        Self {
            name: round.name.clone(),
            kind,
            max_time: round.max_time,
            tasks: round.tasks.clone(),
            is_complete: round.is_complete,
        }
    }
}

/// What a single designer is allowed to see of the active round: the
/// shape of their ports and their slice of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedRoundView {
    pub name: String,
    pub max_time: Option<u64>,
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub target: Vector,
}

impl ScopedRoundView {
    pub fn of(round: &Round, designer: usize) -> Self {
        let (num_inputs, num_outputs, target) = match round.task_for(designer) {
            Some(index) => {
                let task = &round.tasks[index];
                (
                    task.input_ports(designer),
                    task.output_ports(designer),
                    task.visible_target(designer),
                )
            }
            None => (0, 0, Vec::new()),
        };
        Self {
            name: round.name.clone(),
            max_time: round.max_time,
            num_inputs,
            num_outputs,
            target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignerScoreView {
    pub training: Vec<Option<u64>>,
    pub scored: Vec<Option<u64>>,
    /// this round's slot as just written
    pub score: Option<u64>,
    pub total: u64,
}

impl DesignerScoreView {
    pub fn of(board: &ScoreBoard, active: ActiveRound, designer: usize) -> Self {
        Self {
            training: board.designer_rounds(RoundKind::Training, designer),
            scored: board.designer_rounds(RoundKind::Scored, designer),
            score: board.get(active.kind, active.index, designer),
            total: board.total(designer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReportView {
    pub training: Vec<Vec<Option<u64>>>,
    pub scored: Vec<Vec<Option<u64>>>,
    pub totals: Vec<u64>,
}

impl ScoreReportView {
    pub fn of(board: &ScoreBoard) -> Self {
        Self {
            training: board.board(RoundKind::Training),
            scored: board.board(RoundKind::Scored),
            totals: board.totals(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_round() -> Round {
        Round {
            name: "r0".to_string(),
            max_time: Some(30_000),
            tasks: vec![Task {
                designers: vec![0, 1],
                num_inputs: vec![1, 1],
                num_outputs: vec![1, 1],
                inputs: vec![0, 1],
                outputs: vec![0, 1],
                coupling: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                target: vec![0.25, 0.75],
                solution: Some(vec![0.25, 0.75]),
                x: vec![0.0, 0.0],
                y: vec![0.0, 0.0],
                is_complete: false,
            }],
            assignment: vec![Some(0), Some(0), None],
            is_complete: false,
        }
    }

    #[test]
    fn scoped_views_carry_only_the_designers_slice() {
        let round = sample_round();

        let scoped = ScopedRoundView::of(&round, 1);
        assert_eq!(scoped.num_inputs, 1);
        assert_eq!(scoped.num_outputs, 1);
        assert_eq!(scoped.target, vec![0.75]);

        // an unassigned designer sees an empty shape
        let scoped = ScopedRoundView::of(&round, 2);
        assert_eq!(scoped.num_inputs, 0);
        assert!(scoped.target.is_empty());
        assert_eq!(scoped.max_time, Some(30_000));
    }

    #[test]
    fn serde() {
        let notice = EngineNotice::ScopedRoundSnapshot(ScopedRoundView::of(&sample_round(), 0));

        let encoded = bincode::serialize(&notice).unwrap();
        let restructured: EngineNotice = bincode::deserialize(&encoded).unwrap();
        assert_eq!(notice, restructured);

        let json = serde_json::to_string(&EngineNotice::SlotAssigned { index: 2 }).unwrap();
        assert_eq!(json, r#"{"SlotAssigned":{"index":2}}"#);
    }
}
