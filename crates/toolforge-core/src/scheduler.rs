//! Candidate scheduling strategies.
//!
//! Two strategies, selected by configuration. Parallel fans every candidate
//! out at once and waits for all of them; adaptive launches strictly one at
//! a time and stops early once a candidate clears the score cutoff.
//! Candidate indices are assigned before any execution begins; launch order
//! is fully determined by the strategy.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::domain::evaluation::CandidateEvaluation;
use crate::domain::settings::{GenerationSettings, SchedulerStrategy};
use crate::progress::{ProgressEvent, ProgressPhase, SharedProgress};

/// Executes one candidate's full pipeline. Infallible by contract: the
/// candidate boundary converts every failure into an invalid evaluation.
#[async_trait]
pub trait CandidateRunner: Send + Sync + 'static {
    async fn run_candidate(&self, index: u32) -> CandidateEvaluation;
}

/// Early-stop predicate: valid and at or above the cutoff. Pure and
/// strategy-independent.
pub fn is_early_stop_candidate(candidate: &CandidateEvaluation, cutoff: i64) -> bool {
    candidate.is_valid && candidate.score >= cutoff
}

/// Run the configured strategy to completion and return every evaluation
/// produced, in candidate-index order.
pub async fn run_candidates<R: CandidateRunner>(
    settings: &GenerationSettings,
    job_id: &str,
    runner: Arc<R>,
    sink: SharedProgress,
) -> Vec<CandidateEvaluation> {
    sink.emit(ProgressEvent::job(
        ProgressPhase::SchedulerStarted,
        job_id,
        format!(
            "strategy={} candidates={}",
            settings.strategy.as_str(),
            settings.candidate_count
        ),
    ));

    match settings.strategy {
        SchedulerStrategy::Parallel => run_parallel(settings, job_id, runner, sink).await,
        SchedulerStrategy::Adaptive => run_adaptive(settings, job_id, runner, sink).await,
    }
}

async fn run_parallel<R: CandidateRunner>(
    settings: &GenerationSettings,
    job_id: &str,
    runner: Arc<R>,
    sink: SharedProgress,
) -> Vec<CandidateEvaluation> {
    sink.emit(ProgressEvent::job(
        ProgressPhase::SchedulerFanout,
        job_id,
        format!("launching {} candidates concurrently", settings.candidate_count),
    ));

    let mut handles = Vec::with_capacity(settings.candidate_count as usize);
    for index in 1..=settings.candidate_count {
        let runner = Arc::clone(&runner);
        handles.push(tokio::spawn(
            async move { runner.run_candidate(index).await },
        ));
    }

    let joined = futures::future::join_all(handles).await;
    let mut evaluations = Vec::with_capacity(joined.len());
    for (i, result) in joined.into_iter().enumerate() {
        let index = i as u32 + 1;
        match result {
            Ok(eval) => evaluations.push(eval),
            // A panicked candidate task is folded into a crashed evaluation,
            // never aborting its siblings.
            Err(_) => evaluations.push(CandidateEvaluation::crashed(
                format!("candidate-{index}"),
                std::path::PathBuf::new(),
                0,
                0,
            )),
        }
    }

    sink.emit(ProgressEvent::job(
        ProgressPhase::SchedulerDrain,
        job_id,
        format!("all {} candidates finished", evaluations.len()),
    ));

    evaluations
}

async fn run_adaptive<R: CandidateRunner>(
    settings: &GenerationSettings,
    job_id: &str,
    runner: Arc<R>,
    sink: SharedProgress,
) -> Vec<CandidateEvaluation> {
    let mut evaluations = Vec::new();

    for index in 1..=settings.candidate_count {
        let eval = runner.run_candidate(index).await;
        let stop = is_early_stop_candidate(&eval, settings.score_cutoff);
        evaluations.push(eval);

        if stop {
            info!(
                job_id = %job_id,
                candidate = index,
                cutoff = settings.score_cutoff,
                "early stop: candidate cleared cutoff"
            );
            sink.emit(ProgressEvent::job(
                ProgressPhase::SchedulerEarlyStop,
                job_id,
                format!(
                    "candidate-{index} cleared cutoff {}; skipping remaining launches",
                    settings.score_cutoff
                ),
            ));
            break;
        }

        if index < settings.candidate_count && settings.launch_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(settings.launch_delay_ms)).await;
        }
    }

    sink.emit(ProgressEvent::job(
        ProgressPhase::SchedulerDrain,
        job_id,
        format!(
            "{} of {} candidates ran",
            evaluations.len(),
            settings.candidate_count
        ),
    ));

    evaluations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn eval_with(index: u32, score: i64, is_valid: bool) -> CandidateEvaluation {
        let mut eval =
            CandidateEvaluation::crashed(format!("candidate-{index}"), PathBuf::new(), 1_000, 1);
        eval.score = score;
        eval.is_valid = is_valid;
        eval.summary = "scripted".to_string();
        eval
    }

    /// Runner that replays a scripted (score, validity) sequence.
    struct ScriptedRunner {
        script: Mutex<Vec<(i64, bool)>>,
        launches: AtomicU32,
    }

    impl ScriptedRunner {
        fn new(script: Vec<(i64, bool)>) -> Self {
            Self {
                script: Mutex::new(script),
                launches: AtomicU32::new(0),
            }
        }

        fn launched(&self) -> u32 {
            self.launches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CandidateRunner for ScriptedRunner {
        async fn run_candidate(&self, index: u32) -> CandidateEvaluation {
            self.launches.fetch_add(1, Ordering::SeqCst);
            let (score, is_valid) = {
                let mut script = self.script.lock().unwrap();
                if script.is_empty() {
                    (0, false)
                } else {
                    script.remove(0)
                }
            };
            eval_with(index, score, is_valid)
        }
    }

    fn settings(strategy: SchedulerStrategy, count: u32, cutoff: i64) -> GenerationSettings {
        let mut s = GenerationSettings::default();
        s.strategy = strategy;
        s.candidate_count = count;
        s.score_cutoff = cutoff;
        s.launch_delay_ms = 0;
        s
    }

    #[test]
    fn early_stop_predicate_boundaries() {
        assert!(is_early_stop_candidate(&eval_with(1, 90, true), 90));
        assert!(is_early_stop_candidate(&eval_with(1, 150, true), 90));
        assert!(!is_early_stop_candidate(&eval_with(1, 89, true), 90));
        assert!(!is_early_stop_candidate(&eval_with(1, 150, false), 90));
        assert!(!is_early_stop_candidate(&eval_with(1, 90, false), 90));
    }

    #[tokio::test]
    async fn adaptive_stops_after_first_clearing_candidate() {
        let runner = Arc::new(ScriptedRunner::new(vec![(95, true), (120, true)]));
        let evals = run_candidates(
            &settings(SchedulerStrategy::Adaptive, 3, 90),
            "job-1",
            Arc::clone(&runner),
            Arc::new(NullProgress),
        )
        .await;

        assert_eq!(evals.len(), 1);
        assert_eq!(runner.launched(), 1);
    }

    #[tokio::test]
    async fn adaptive_score_89_causes_second_launch() {
        let runner = Arc::new(ScriptedRunner::new(vec![(89, true), (95, true)]));
        let evals = run_candidates(
            &settings(SchedulerStrategy::Adaptive, 3, 90),
            "job-1",
            Arc::clone(&runner),
            Arc::new(NullProgress),
        )
        .await;

        assert_eq!(evals.len(), 2);
        assert_eq!(runner.launched(), 2);
    }

    #[tokio::test]
    async fn adaptive_invalid_high_score_never_stops_early() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            (150, false),
            (150, false),
            (150, false),
        ]));
        let evals = run_candidates(
            &settings(SchedulerStrategy::Adaptive, 3, 90),
            "job-1",
            Arc::clone(&runner),
            Arc::new(NullProgress),
        )
        .await;

        assert_eq!(evals.len(), 3);
    }

    #[tokio::test]
    async fn parallel_runs_every_candidate() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            (200, true),
            (10, false),
            (50, true),
            (70, false),
        ]));
        let evals = run_candidates(
            &settings(SchedulerStrategy::Parallel, 4, 90),
            "job-1",
            Arc::clone(&runner),
            Arc::new(NullProgress),
        )
        .await;

        // No early termination even though the first candidate cleared the bar.
        assert_eq!(evals.len(), 4);
        assert_eq!(runner.launched(), 4);
    }

    #[tokio::test]
    async fn parallel_results_are_in_index_order() {
        let runner = Arc::new(ScriptedRunner::new(vec![
            (1, true),
            (2, true),
            (3, true),
        ]));
        let evals = run_candidates(
            &settings(SchedulerStrategy::Parallel, 3, 90),
            "job-1",
            runner,
            Arc::new(NullProgress),
        )
        .await;

        let ids: Vec<_> = evals.iter().map(|e| e.candidate_id.clone()).collect();
        assert_eq!(ids, vec!["candidate-1", "candidate-2", "candidate-3"]);
    }
}
