use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::definition::{RoundDefinition, SessionDefinition, TaskDefinition};
use crate::model::{mat_vec, Matrix, Vector};

/// Knobs for randomized but solvable session definitions.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub name: String,
    pub num_designers: usize,
    pub error_tol: f64,
    pub training_rounds: usize,
    pub scored_rounds: usize,
    /// designers grouped into one task, in index order
    pub designers_per_task: usize,
    pub ports_per_designer: usize,
    /// orthonormal coupling when true, a signed diagonal otherwise
    pub coupled: bool,
    pub max_time: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: "generated".to_string(),
            num_designers: 4,
            error_tol: 0.05,
            training_rounds: 1,
            scored_rounds: 1,
            designers_per_task: 2,
            ports_per_designer: 1,
            coupled: true,
            max_time: None,
            seed: None,
        }
    }
}

pub fn generate_session(config: &GeneratorConfig) -> SessionDefinition {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let training = (0..config.training_rounds)
        .map(|index| generate_round(config, format!("training-{index}"), &mut rng))
        .collect();
    let scored = (0..config.scored_rounds)
        .map(|index| generate_round(config, format!("scored-{index}"), &mut rng))
        .collect();

    SessionDefinition {
        name: config.name.clone(),
        num_designers: config.num_designers,
        error_tol: config.error_tol,
        training,
        scored,
    }
}

fn generate_round(config: &GeneratorConfig, name: String, rng: &mut StdRng) -> RoundDefinition {
    let designers: Vec<usize> = (0..config.num_designers).collect();
    let tasks = designers
        .chunks(config.designers_per_task.max(1))
        .map(|group| generate_task(group, config.ports_per_designer.max(1), config.coupled, rng))
        .collect();

    RoundDefinition { name, max_time: config.max_time, tasks }
}

fn generate_task(
    group: &[usize],
    ports_per_designer: usize,
    coupled: bool,
    rng: &mut StdRng,
) -> TaskDefinition {
    let ports = group.len() * ports_per_designer;
    let owners: Vec<usize> = group.iter()
        .flat_map(|&designer| std::iter::repeat(designer).take(ports_per_designer))
        .collect();

    let coupling = if coupled {
        orthonormal_matrix(ports, rng)
    } else {
        signed_diagonal(ports, rng)
    };

    // Draw the reference solution first and keep every component away
    // from zero, so the zeroed initial inputs start visibly unsolved.
    // The target then maps back onto exactly that solution.
    let solution: Vector = (0..ports)
        .map(|_| {
            let magnitude = rng.gen_range(0.25..0.9);
            if rng.gen_bool(0.5) { magnitude } else { -magnitude }
        })
        .collect();
    let target = mat_vec(&coupling, &solution);

    TaskDefinition {
        designers: group.to_vec(),
        num_inputs: vec![ports_per_designer; group.len()],
        num_outputs: vec![ports_per_designer; group.len()],
        inputs: owners.clone(),
        outputs: owners,
        coupling,
        target,
    }
}

/// Random square matrix with orthonormal rows, by Gram-Schmidt.
fn orthonormal_matrix(ports: usize, rng: &mut StdRng) -> Matrix {
    let mut rows: Vec<Vector> = Vec::with_capacity(ports);
    while rows.len() < ports {
        let mut candidate: Vector = (0..ports).map(|_| rng.gen_range(-1.0..1.0)).collect();
        for row in &rows {
            let projection: f64 = row.iter().zip(candidate.iter()).map(|(a, b)| a * b).sum();
            for (value, basis) in candidate.iter_mut().zip(row.iter()) {
                *value -= projection * basis;
            }
        }
        let norm = candidate.iter().map(|value| value * value).sum::<f64>().sqrt();
        if norm < 1e-6 {
            // degenerate draw, try another vector
            continue;
        }
        for value in &mut candidate {
            *value /= norm;
        }
        rows.push(candidate);
    }
    rows
}

fn signed_diagonal(ports: usize, rng: &mut StdRng) -> Matrix {
    (0..ports)
        .map(|row| {
            (0..ports)
                .map(|col| {
                    if row != col {
                        0.0
                    } else if rng.gen_bool(0.5) {
                        1.0
                    } else {
                        -1.0
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::transpose;

    #[test]
    fn seeded_generation_is_reproducible() {
        let config = GeneratorConfig { seed: Some(42), ..Default::default() };
        assert_eq!(generate_session(&config), generate_session(&config));

        let other = GeneratorConfig { seed: Some(43), ..Default::default() };
        assert_ne!(generate_session(&config), generate_session(&other));
    }

    #[test]
    fn generated_definitions_validate() {
        for coupled in [true, false] {
            let config = GeneratorConfig {
                num_designers: 5,
                training_rounds: 2,
                scored_rounds: 3,
                ports_per_designer: 2,
                coupled,
                max_time: Some(120_000),
                seed: Some(7),
                ..Default::default()
            };
            let definition = generate_session(&config);
            assert!(definition.validate().is_ok());
            assert_eq!(definition.training.len(), 2);
            assert_eq!(definition.scored.len(), 3);
            // 5 designers in pairs leaves a trailing solo task
            assert_eq!(definition.scored[0].tasks.len(), 3);
        }
    }

    #[test]
    fn reference_solutions_stay_off_zero() {
        for coupled in [true, false] {
            let config = GeneratorConfig {
                coupled,
                ports_per_designer: 2,
                seed: Some(11),
                ..Default::default()
            };
            let definition = generate_session(&config);
            for round in definition.training.iter().chain(definition.scored.iter()) {
                for task in &round.tasks {
                    let solution = mat_vec(&transpose(&task.coupling), &task.target);
                    assert!(solution.iter().all(|value| value.abs() > 0.2));
                }
            }
        }
    }

    #[test]
    fn ports_split_evenly_across_the_group() {
        let config = GeneratorConfig { ports_per_designer: 3, seed: Some(5), ..Default::default() };
        let definition = generate_session(&config);
        let task = &definition.scored[0].tasks[0];

        assert_eq!(task.designers, vec![0, 1]);
        assert_eq!(task.num_inputs, vec![3, 3]);
        assert_eq!(task.inputs, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(task.inputs, task.outputs);
    }

    #[test]
    fn orthonormal_rows_are_unit_and_orthogonal() {
        let mut rng = StdRng::seed_from_u64(3);
        let matrix = orthonormal_matrix(4, &mut rng);
        for (i, row) in matrix.iter().enumerate() {
            for (j, other) in matrix.iter().enumerate() {
                let dot: f64 = row.iter().zip(other.iter()).map(|(a, b)| a * b).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-9);
            }
        }
    }
}
