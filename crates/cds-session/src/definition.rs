use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::model::{Matrix, Round, Session, Task, Vector};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Session: definition not found: {0}")]
    DefinitionNotFound(String),
    #[error("Session: definition is not valid JSON: {0}")]
    Malformed(String),
    #[error("Session: {0}")]
    Invalid(String),
}

/// On-disk description of a session, consumed read-only at load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDefinition {
    pub name: String,
    pub num_designers: usize,
    pub error_tol: f64,
    #[serde(default)]
    pub training: Vec<RoundDefinition>,
    #[serde(default)]
    pub scored: Vec<RoundDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundDefinition {
    pub name: String,
    #[serde(default)]
    pub max_time: Option<u64>,
    pub tasks: Vec<TaskDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub designers: Vec<usize>,
    pub num_inputs: Vec<usize>,
    pub num_outputs: Vec<usize>,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
    pub coupling: Matrix,
    pub target: Vector,
}

impl SessionDefinition {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.num_designers == 0 {
            return Err(LoadError::Invalid("num_designers must be at least 1".to_string()));
        }
        if !self.error_tol.is_finite() || self.error_tol <= 0.0 {
            return Err(LoadError::Invalid("error_tol must be a positive number".to_string()));
        }
        if self.training.is_empty() && self.scored.is_empty() {
            return Err(LoadError::Invalid("definition holds no rounds".to_string()));
        }
        for round in self.training.iter().chain(self.scored.iter()) {
            round.validate(self.num_designers)?;
        }
        Ok(())
    }

    /// Validates and builds the runtime session. Derived vectors start
    /// zeroed, reference solutions are left for round activation.
    pub fn into_session(self) -> Result<Session, LoadError> {
        self.validate()?;
        let num_designers = self.num_designers;
        Ok(Session {
            name: self.name,
            num_designers,
            error_tol: self.error_tol,
            training: self.training.into_iter()
                .map(|round| round.into_round(num_designers))
                .collect(),
            scored: self.scored.into_iter()
                .map(|round| round.into_round(num_designers))
                .collect(),
        })
    }
}

impl RoundDefinition {
    fn validate(&self, num_designers: usize) -> Result<(), LoadError> {
        if self.tasks.is_empty() {
            return Err(LoadError::Invalid(format!("round '{}' holds no tasks", self.name)));
        }
        for task in &self.tasks {
            task.validate(&self.name, num_designers)?;
        }
        Ok(())
    }

    fn into_round(self, num_designers: usize) -> Round {
        let tasks: Vec<Task> = self.tasks.into_iter().map(TaskDefinition::into_task).collect();
        // first task naming a designer wins the assignment
        let assignment = (0..num_designers)
            .map(|designer| tasks.iter().position(|task| task.has_designer(designer)))
            .collect();
        Round {
            name: self.name,
            max_time: self.max_time,
            tasks,
            assignment,
            is_complete: false,
        }
    }
}

impl TaskDefinition {
    fn validate(&self, round: &str, num_designers: usize) -> Result<(), LoadError> {
        let ports = self.inputs.len();
        if ports == 0 {
            return Err(LoadError::Invalid(format!("round '{round}': task has no input ports")));
        }
        if self.outputs.len() != ports {
            return Err(LoadError::Invalid(format!(
                "round '{round}': input and output port counts differ"
            )));
        }
        if self.coupling.len() != ports || self.coupling.iter().any(|row| row.len() != ports) {
            return Err(LoadError::Invalid(format!(
                "round '{round}': coupling matrix must be {ports}x{ports}"
            )));
        }
        if self.target.len() != ports {
            return Err(LoadError::Invalid(format!(
                "round '{round}': target length must match the output ports"
            )));
        }
        if self.designers.is_empty() {
            return Err(LoadError::Invalid(format!("round '{round}': task names no designers")));
        }
        let mut seen = self.designers.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != self.designers.len() {
            return Err(LoadError::Invalid(format!(
                "round '{round}': task designer list has duplicates"
            )));
        }
        if self.designers.iter().any(|&designer| designer >= num_designers) {
            return Err(LoadError::Invalid(format!(
                "round '{round}': designer index out of range"
            )));
        }
        for owner in self.inputs.iter().chain(self.outputs.iter()) {
            if !self.designers.contains(owner) {
                return Err(LoadError::Invalid(format!(
                    "round '{round}': port owner {owner} is not on the task designer list"
                )));
            }
        }
        if self.num_inputs.len() != self.designers.len()
            || self.num_outputs.len() != self.designers.len()
        {
            return Err(LoadError::Invalid(format!(
                "round '{round}': per-designer port counts misaligned with the designer list"
            )));
        }
        for (slot, &designer) in self.designers.iter().enumerate() {
            let owned_inputs = self.inputs.iter().filter(|&&owner| owner == designer).count();
            let owned_outputs = self.outputs.iter().filter(|&&owner| owner == designer).count();
            if self.num_inputs[slot] != owned_inputs || self.num_outputs[slot] != owned_outputs {
                return Err(LoadError::Invalid(format!(
                    "round '{round}': num_inputs/num_outputs disagree with the port owners"
                )));
            }
        }
        Ok(())
    }

    fn into_task(self) -> Task {
        let ports = self.inputs.len();
        Task {
            designers: self.designers,
            num_inputs: self.num_inputs,
            num_outputs: self.num_outputs,
            inputs: self.inputs,
            outputs: self.outputs,
            coupling: self.coupling,
            target: self.target,
            solution: None,
            x: vec![0.0; ports],
            y: vec![0.0; ports],
            is_complete: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn definition() -> SessionDefinition {
        SessionDefinition {
            name: "sample".to_string(),
            num_designers: 2,
            error_tol: 0.05,
            training: vec![],
            scored: vec![RoundDefinition {
                name: "scored-0".to_string(),
                max_time: Some(60_000),
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
        }
    }

    #[test]
    fn valid_definition_builds_a_session() {
        let session = definition().into_session().unwrap();
        assert_eq!(session.num_designers, 2);
        assert_eq!(session.scored.len(), 1);

        let round = &session.scored[0];
        assert_eq!(round.assignment, vec![Some(0), Some(0)]);
        assert_eq!(round.tasks[0].x, vec![0.0, 0.0]);
        assert_eq!(round.tasks[0].solution, None);
    }

    #[test]
    fn assignment_takes_the_first_task_naming_a_designer() {
        let mut def = definition();
        def.num_designers = 3;
        let mut second = def.scored[0].tasks[0].clone();
        second.designers = vec![1, 2];
        second.inputs = vec![1, 2];
        second.outputs = vec![1, 2];
        def.scored[0].tasks.push(second);

        let session = def.into_session().unwrap();
        // designer 1 appears in both tasks and stays on the first
        assert_eq!(session.scored[0].assignment, vec![Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn rejects_non_square_coupling() {
        let mut def = definition();
        def.scored[0].tasks[0].coupling = vec![vec![1.0, 0.0]];
        assert!(matches!(def.validate(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn rejects_out_of_range_port_owner() {
        let mut def = definition();
        def.scored[0].tasks[0].inputs = vec![0, 7];
        assert!(matches!(def.validate(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn rejects_misaligned_port_counts() {
        let mut def = definition();
        def.scored[0].tasks[0].num_inputs = vec![2, 0];
        assert!(matches!(def.validate(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn rejects_empty_definitions() {
        let mut def = definition();
        def.scored.clear();
        assert!(matches!(def.validate(), Err(LoadError::Invalid(_))));

        let mut def = definition();
        def.num_designers = 0;
        assert!(matches!(def.validate(), Err(LoadError::Invalid(_))));

        let mut def = definition();
        def.error_tol = 0.0;
        assert!(matches!(def.validate(), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn serde() {
        let def = definition();

        let encoded = bincode::serialize(&def).unwrap();
        let restructured: SessionDefinition = bincode::deserialize(&encoded).unwrap();
        assert_eq!(def, restructured);

        // max_time and the round lists may be omitted in JSON
        let raw = r#"{
            "name": "bare",
            "num_designers": 1,
            "error_tol": 0.05,
            "scored": [{
                "name": "only",
                "tasks": [{
                    "designers": [0],
                    "num_inputs": [1],
                    "num_outputs": [1],
                    "inputs": [0],
                    "outputs": [0],
                    "coupling": [[1.0]],
                    "target": [0.5]
                }]
            }]
        }"#;
        let parsed: SessionDefinition = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.scored[0].max_time, None);
        assert!(parsed.training.is_empty());
        assert!(parsed.validate().is_ok());
    }
}
