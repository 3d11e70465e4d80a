use serde::{Serialize, Deserialize};

pub type Vector = Vec<f64>;
pub type Matrix = Vec<Vec<f64>>;

pub fn mat_vec(matrix: &Matrix, vector: &Vector) -> Vector {
    matrix.iter()
        .map(|row| row.iter().zip(vector.iter()).map(|(a, b)| a * b).sum())
        .collect()
}

pub fn transpose(matrix: &Matrix) -> Matrix {
    let rows = matrix.len();
    let cols = matrix.first().map(Vec::len).unwrap_or(0);
    (0..cols)
        .map(|col| (0..rows).map(|row| matrix[row][col]).collect())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundKind {
    Training,
    Scored,
}

/// One shared linear relationship `y = C * x` worked on by a group of
/// designers. Each input/output port is owned by exactly one designer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub designers: Vec<usize>,
    pub num_inputs: Vec<usize>,
    pub num_outputs: Vec<usize>,

    // port owners, one designer index per port
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,

    pub coupling: Matrix,
    pub target: Vector,

    // reference point for the administrator, computed once per load
    pub solution: Option<Vector>,

    pub x: Vector,
    pub y: Vector,
    pub is_complete: bool,
}

impl Task {
    pub fn port_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn has_designer(&self, designer: usize) -> bool {
        self.designers.contains(&designer)
    }

    pub fn ensure_solution(&mut self) {
        if self.solution.is_none() {
            self.solution = Some(mat_vec(&transpose(&self.coupling), &self.target));
        }
    }

    /// Resets `x` to zeros and rederives `y` and the completion flag.
    pub fn materialize(&mut self, error_tol: f64) {
        self.x = vec![0.0; self.inputs.len()];
        self.recompute_outputs();
        self.evaluate_complete(error_tol);
    }

    pub fn recompute_outputs(&mut self) {
        self.y = mat_vec(&self.coupling, &self.x);
    }

    pub fn evaluate_complete(&mut self, error_tol: f64) -> bool {
        self.is_complete = self.y.iter()
            .zip(self.target.iter())
            .all(|(y, target)| (y - target).abs() <= error_tol);
        self.is_complete
    }

    /// Writes `values` into the `x` positions owned by `designer`, in
    /// port order. Extra values are dropped, missing ones leave the
    /// current entry in place.
    pub fn write_inputs(&mut self, designer: usize, values: &[f64]) {
        let mut next = values.iter();
        for (slot, owner) in self.x.iter_mut().zip(self.inputs.iter()) {
            if *owner != designer {
                continue;
            }
            match next.next() {
                Some(value) => *slot = *value,
                None => break,
            }
        }
    }

    pub fn input_ports(&self, designer: usize) -> usize {
        self.inputs.iter().filter(|&&owner| owner == designer).count()
    }

    pub fn output_ports(&self, designer: usize) -> usize {
        self.outputs.iter().filter(|&&owner| owner == designer).count()
    }

    pub fn visible_outputs(&self, designer: usize) -> Vector {
        self.y.iter()
            .zip(self.outputs.iter())
            .filter(|(_, &owner)| owner == designer)
            .map(|(value, _)| *value)
            .collect()
    }

    pub fn visible_target(&self, designer: usize) -> Vector {
        self.target.iter()
            .zip(self.outputs.iter())
            .filter(|(_, &owner)| owner == designer)
            .map(|(value, _)| *value)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub name: String,
    /// time budget in milliseconds, `None` for an unbounded round
    pub max_time: Option<u64>,
    pub tasks: Vec<Task>,
    /// designer index -> task index, derived from the task designer lists
    pub assignment: Vec<Option<usize>>,
    pub is_complete: bool,
}

impl Round {
    pub fn task_for(&self, designer: usize) -> Option<usize> {
        self.assignment.get(designer).copied().flatten()
    }

    /// Brings every task to a fresh instance of this round: reference
    /// solutions are kept once computed, `x`/`y` are rematerialized and
    /// completion is rederived from them.
    pub fn activate(&mut self, error_tol: f64) {
        for task in &mut self.tasks {
            task.ensure_solution();
            task.materialize(error_tol);
        }
        self.evaluate_complete();
    }

    pub fn evaluate_complete(&mut self) -> bool {
        self.is_complete = self.tasks.iter().all(|task| task.is_complete);
        self.is_complete
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub num_designers: usize,
    pub error_tol: f64,
    pub training: Vec<Round>,
    pub scored: Vec<Round>,
}

impl Session {
    pub fn rounds(&self, kind: RoundKind) -> &[Round] {
        match kind {
            RoundKind::Training => &self.training,
            RoundKind::Scored => &self.scored,
        }
    }

    pub fn round(&self, kind: RoundKind, index: usize) -> Option<&Round> {
        self.rounds(kind).get(index)
    }

    pub fn round_mut(&mut self, kind: RoundKind, index: usize) -> Option<&mut Round> {
        match kind {
            RoundKind::Training => self.training.get_mut(index),
            RoundKind::Scored => self.scored.get_mut(index),
        }
    }

    pub fn round_names(&self, kind: RoundKind) -> Vec<String> {
        self.rounds(kind).iter().map(|round| round.name.clone()).collect()
    }

    /// Training names take precedence over scored names on lookup.
    pub fn find_round(&self, name: &str) -> Option<(RoundKind, usize)> {
        if let Some(index) = self.training.iter().position(|round| round.name == name) {
            return Some((RoundKind::Training, index));
        }
        self.scored.iter()
            .position(|round| round.name == name)
            .map(|index| (RoundKind::Scored, index))
    }

    pub fn first_round(&self) -> Option<(RoundKind, usize)> {
        if !self.training.is_empty() {
            Some((RoundKind::Training, 0))
        } else if !self.scored.is_empty() {
            Some((RoundKind::Scored, 0))
        } else {
            None
        }
    }

    /// Successor in the training-then-scored progression, `None` past
    /// the last scored round.
    pub fn next_round(&self, kind: RoundKind, index: usize) -> Option<(RoundKind, usize)> {
        match kind {
            RoundKind::Training => {
                if index + 1 < self.training.len() {
                    Some((RoundKind::Training, index + 1))
                } else if !self.scored.is_empty() {
                    Some((RoundKind::Scored, 0))
                } else {
                    None
                }
            }
            RoundKind::Scored => {
                if index + 1 < self.scored.len() {
                    Some((RoundKind::Scored, index + 1))
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_port_task() -> Task {
        Task {
            designers: vec![0, 1],
            num_inputs: vec![1, 1],
            num_outputs: vec![1, 1],
            inputs: vec![0, 1],
            outputs: vec![0, 1],
            coupling: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            target: vec![1.0, 1.0],
            solution: None,
            x: vec![0.0, 0.0],
            y: vec![0.0, 0.0],
            is_complete: false,
        }
    }

    #[test]
    fn mat_vec_and_transpose() {
        let m = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(mat_vec(&m, &vec![1.0, 1.0]), vec![3.0, 7.0]);
        assert_eq!(transpose(&m), vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
    }

    #[test]
    fn solution_computed_once() {
        let mut task = two_port_task();
        task.ensure_solution();
        assert_eq!(task.solution, Some(vec![1.0, 1.0]));

        // a later activation must not recompute it
        task.solution = Some(vec![9.0, 9.0]);
        task.ensure_solution();
        assert_eq!(task.solution, Some(vec![9.0, 9.0]));
    }

    #[test]
    fn write_inputs_follows_port_order_and_truncates() {
        let mut task = two_port_task();
        task.inputs = vec![0, 1, 0];
        task.x = vec![0.0, 0.0, 0.0];

        task.write_inputs(0, &[0.5, 0.7, 99.0]);
        assert_eq!(task.x, vec![0.5, 0.0, 0.7]);

        // a short vector leaves later ports untouched
        task.write_inputs(0, &[0.1]);
        assert_eq!(task.x, vec![0.1, 0.0, 0.7]);

        // other designers' ports are never written
        task.write_inputs(1, &[0.2]);
        assert_eq!(task.x, vec![0.1, 0.2, 0.7]);
    }

    #[test]
    fn completion_uses_inclusive_tolerance() {
        let mut task = two_port_task();
        task.x = vec![1.0, 0.95];
        task.recompute_outputs();

        assert!(task.evaluate_complete(0.05));
        assert!(!task.evaluate_complete(0.01));
    }

    #[test]
    fn scoped_views_follow_output_owners() {
        let mut task = two_port_task();
        task.outputs = vec![1, 1];
        task.y = vec![0.25, 0.75];

        assert_eq!(task.visible_outputs(1), vec![0.25, 0.75]);
        assert!(task.visible_outputs(0).is_empty());
        assert_eq!(task.visible_target(1), vec![1.0, 1.0]);
        assert_eq!(task.input_ports(0), 1);
        assert_eq!(task.output_ports(0), 0);
    }

    #[test]
    fn round_completion_is_conjunction_over_tasks() {
        let mut round = Round {
            name: "r".to_string(),
            max_time: None,
            tasks: vec![two_port_task(), two_port_task()],
            assignment: vec![Some(0), Some(0)],
            is_complete: false,
        };
        round.tasks[0].is_complete = true;
        assert!(!round.evaluate_complete());

        round.tasks[1].is_complete = true;
        assert!(round.evaluate_complete());
    }

    #[test]
    fn round_progression_order() {
        let round = |name: &str| Round {
            name: name.to_string(),
            max_time: None,
            tasks: vec![],
            assignment: vec![],
            is_complete: false,
        };
        let session = Session {
            name: "s".to_string(),
            num_designers: 2,
            error_tol: 0.05,
            training: vec![round("t0"), round("t1")],
            scored: vec![round("s0"), round("s1")],
        };

        assert_eq!(session.first_round(), Some((RoundKind::Training, 0)));
        assert_eq!(session.next_round(RoundKind::Training, 0), Some((RoundKind::Training, 1)));
        assert_eq!(session.next_round(RoundKind::Training, 1), Some((RoundKind::Scored, 0)));
        assert_eq!(session.next_round(RoundKind::Scored, 0), Some((RoundKind::Scored, 1)));
        assert_eq!(session.next_round(RoundKind::Scored, 1), None);

        assert_eq!(session.find_round("t1"), Some((RoundKind::Training, 1)));
        assert_eq!(session.find_round("s0"), Some((RoundKind::Scored, 0)));
        assert_eq!(session.find_round("nope"), None);
    }
}
