//! Simulated session: one administrator and four random-walk designers
//! drive a generated session until the scored round completes.
//!
//! Run with `RUST_LOG=info cargo run --example random-walk`.

use futures::channel::mpsc;
use futures::StreamExt;
use rand::{rngs::StdRng, Rng, SeedableRng};

use cds_engine::engine::{engine_channel, engine_event_loop, EngineClient, EngineNotice};
use cds_engine::{async_executor, ConnId};
use cds_session::{generate_session, GeneratorConfig, MemoryDefinitionSource, SessionStore};

const ADMIN_CONN: ConnId = ConnId(0);

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = GeneratorConfig {
        name: "random-walk-demo".to_string(),
        num_designers: 4,
        training_rounds: 0,
        scored_rounds: 1,
        // uncoupled keeps the greedy walk honest about its own ports
        coupled: false,
        max_time: Some(120_000),
        seed: Some(7),
        ..Default::default()
    };
    let mut source = MemoryDefinitionSource::new();
    source.insert(
        1,
        serde_json::to_string(&generate_session(&config)).expect("definition serializes"),
    );

    let (event_sink, mut event_drain) = mpsc::unbounded();
    let (client, engine_request_receiver) = engine_channel();
    async_executor(engine_event_loop(
        engine_request_receiver,
        SessionStore::new(source),
        Some(event_sink),
    ));

    // the audit side channel, drained as JSON lines
    async_executor(async move {
        while let Some(record) = event_drain.next().await {
            println!("{}", serde_json::to_string(&record).expect("records serialize"));
        }
    });

    let mut admin = client.clone();
    admin.reload_session(1).await.expect("definition 1 loads");
    let (admin_outbox, mut admin_inbox) = mpsc::unbounded();
    admin.register_admin(ADMIN_CONN, admin_outbox).await.expect("engine is up");

    let mut walkers = Vec::new();
    for designer in 0..config.num_designers {
        let handle = client.clone();
        walkers.push(tokio::spawn(async move {
            let conn = ConnId(1 + designer as u64);
            random_walk(handle, conn).await;
        }));
    }
    for walker in walkers {
        walker.await.expect("walker finishes");
    }

    admin.rescore_round().await.expect("engine is up");
    while let Ok(Some(notice)) = admin_inbox.try_next() {
        if let EngineNotice::ScoreReport(report) = notice {
            log::info!("final totals: {:?}", report.totals);
        }
    }
    admin.shutdown().await.expect("engine is up");
}

/// Greedy random walk over the designer's own inputs: propose a small
/// perturbation, keep it if the visible error shrank, step back to the
/// best point otherwise.
async fn random_walk(mut handle: EngineClient, conn: ConnId) {
    let (outbox, mut inbox) = mpsc::unbounded();
    let slot = handle.register_designer(conn, outbox).await.expect("slot available");

    // registration pushed the scoped view of the active round
    let mut num_inputs = 0;
    let mut target = Vec::new();
    while let Ok(Some(notice)) = inbox.try_next() {
        if let EngineNotice::ScopedRoundSnapshot(view) = notice {
            num_inputs = view.num_inputs;
            target = view.target;
        }
    }

    let mut rng = StdRng::seed_from_u64(slot as u64);
    let mut current = vec![0.0; num_inputs];
    let mut best_error = f64::MAX;

    for step in 0..5_000u32 {
        let proposal: Vec<f64> = current.iter()
            .map(|value| value + rng.gen_range(-0.05..0.05))
            .collect();
        handle.submit_input(conn, proposal.clone()).await.expect("engine is up");

        let mut done = false;
        let mut outputs = Vec::new();
        while let Ok(Some(notice)) = inbox.try_next() {
            match notice {
                EngineNotice::OutputUpdated { outputs: seen } => outputs = seen,
                EngineNotice::TaskCompleted => done = true,
                _ => {}
            }
        }
        if done {
            log::info!("designer {slot} reached the target after {step} steps");
            return;
        }

        let error = outputs.iter()
            .zip(target.iter())
            .map(|(y, t)| (y - t).abs())
            .fold(0.0_f64, f64::max);
        if error < best_error {
            best_error = error;
            current = proposal;
        } else {
            handle.submit_input(conn, current.clone()).await.expect("engine is up");
        }
    }
    log::warn!("designer {slot} gave up without converging");
}
