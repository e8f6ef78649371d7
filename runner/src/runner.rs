//! Runner — drives the bar iteration, coordinates every component,
//! maintains progress and the manifest, checkpoints, and handles errors.
//! Single-threaded and event-time sequential across bars; the only
//! sanctioned concurrency is the bounded LLM fan-out within one bar step.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use trendlab_core::domain::{
    Candidate, CandidateId, CircuitStateLabel, DecisionEvent, Direction, IdGen, OutcomeLabel,
    RunId,
};
use trendlab_core::features::{FeaturePipeline, FeaturePipelineConfig, FeatureSnapshot};
use trendlab_core::llm::{BreakerState, LLMBackend, LLMHarness, LLMResult, PromptBuilder, SetupQuality};
use trendlab_core::playbooks::{Breakout, CandidateDraft, Playbook, Pullback};
use trendlab_core::positions::PositionEngine;
use trendlab_core::schema::CURRENT_SCHEMA_VERSION;

use crate::checkpoint::Checkpoint;
use crate::config::{RunConfig, SizeMethod};
use crate::decision_log::DecisionLog;
use crate::error::{DataError, PreflightError, RunError};
use crate::manifest::Manifest;
use crate::ohlcv::OHLCVSource;
use crate::preflight::run_preflight;
use crate::result::RunResult;
use crate::storage::{CandidateCache, CandidateFilter, OutcomeLabels, PositionLedger};

fn circuit_label(state: BreakerState) -> CircuitStateLabel {
    match state {
        BreakerState::Closed => CircuitStateLabel::Closed,
        BreakerState::Open => CircuitStateLabel::Open,
        BreakerState::HalfOpen => CircuitStateLabel::HalfOpen,
    }
}

fn parse_minimum_quality(label: &str) -> Result<SetupQuality, RunError> {
    serde_json::from_value(serde_json::Value::String(label.to_string())).map_err(|_| {
        RunError::Preflight(PreflightError::Config(crate::error::ConfigError::OutOfRange {
            field: "quality_gate.minimum_setup_quality".to_string(),
            reason: format!("`{label}` is not a recognized setup quality grade"),
        }))
    })
}

fn build_playbooks(config: &RunConfig) -> Vec<Box<dyn Playbook>> {
    let mut playbooks: Vec<Box<dyn Playbook>> = Vec::new();
    if config.playbooks.breakout.enabled {
        playbooks.push(Box::new(Breakout::new(config.playbooks.breakout.params.clone())));
    }
    if config.playbooks.pullback.enabled {
        playbooks.push(Box::new(Pullback::new(config.playbooks.pullback.params.clone())));
    }
    playbooks
}

/// A cooperative cancellation handle. Polled between bar steps; setting it
/// causes the runner to checkpoint and exit cleanly rather than mid-bar.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Runner {
    config: RunConfig,
    feature_config: FeaturePipelineConfig,
    source: Box<dyn OHLCVSource>,
    llm_harness: Arc<LLMHarness>,
    output_dir: PathBuf,
    candidate_cache: CandidateCache,
    position_ledger: PositionLedger,
    outcome_labels: OutcomeLabels,
    decision_log: DecisionLog,
    feature_pipeline: FeaturePipeline,
    position_engine: PositionEngine,
    playbooks: Vec<Box<dyn Playbook>>,
    id_gen: IdGen,
    run_id: RunId,
    manifest: Manifest,
    runtime: tokio::runtime::Runtime,
    cancellation: CancellationToken,
    equity: f64,
    quality_gate_minimum: SetupQuality,
    start_bar_index: usize,
}

impl Runner {
    pub fn new(
        config: RunConfig,
        source: Box<dyn OHLCVSource>,
        backend: Box<dyn LLMBackend>,
        output_dir: PathBuf,
    ) -> Result<Self, RunError> {
        let mut feature_config = FeaturePipelineConfig::default();
        feature_config.warmup_bars = config.market.warmup_bars;

        run_preflight(&config, &feature_config, source.as_ref(), &output_dir)?;

        let config_hash = config.content_hash();
        let run_id = RunId::from_bytes(format!("{}:{}", config.run_label, config_hash).as_bytes());

        let candidate_cache = CandidateCache::open(
            output_dir
                .join("candidates.sqlite")
                .to_str()
                .unwrap_or_default(),
        )?;
        let position_ledger = PositionLedger::open(
            output_dir
                .join("positions.sqlite")
                .to_str()
                .unwrap_or_default(),
        )?;
        let outcome_labels = OutcomeLabels::open(
            output_dir.join("labels.sqlite").to_str().unwrap_or_default(),
        )?;
        let decision_log = DecisionLog::open(&output_dir.join("decision_events.jsonl"))?;

        let checkpoint_path = output_dir.join("checkpoint.json");
        let checkpoint = Checkpoint::load_if_valid(&checkpoint_path, &config_hash)?;

        let (feature_pipeline, start_bar_index) = match &checkpoint {
            Some(cp) => (cp.restore_feature_pipeline()?, cp.bar_index + 1),
            None => (FeaturePipeline::new(feature_config.clone()), 0),
        };

        let mut position_engine = PositionEngine::new(
            config.execution.fee_model,
            config.execution.r_multiple_basis,
            config.execution.is_taker,
        );
        if let Some(cp) = &checkpoint {
            for position in position_ledger.get_open_positions(&run_id)? {
                if cp.open_position_ids.contains(&position.id) {
                    position_engine.restore_open(position);
                }
            }
        }

        let next_candidate = candidate_cache
            .query(&CandidateFilter {
                run_id: Some(run_id.clone()),
                ..Default::default()
            })?
            .iter()
            .map(|c| c.id.0 + 1)
            .max()
            .unwrap_or(0);
        let next_position = position_ledger
            .get_all(&run_id)?
            .iter()
            .map(|p| p.id.0 + 1)
            .max()
            .unwrap_or(0);
        let id_gen = IdGen::resume(next_candidate, next_position);

        let llm_harness = Arc::new(LLMHarness::new(config.llm.clone(), backend));
        let playbooks = build_playbooks(&config);
        let quality_gate_minimum = parse_minimum_quality(&config.quality_gate.minimum_setup_quality)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .map_err(|e| RunError::InvariantViolation(format!("failed to start tokio runtime: {e}")))?;

        let started_at = Utc::now();
        let manifest = Manifest::start(run_id.clone(), &config, started_at);
        manifest.save(&output_dir.join("manifest.json"))?;
        std::fs::write(
            output_dir.join("run_config.json"),
            serde_json::to_string_pretty(&config)
                .map_err(|e| RunError::Checkpoint(format!("failed to snapshot config: {e}")))?,
        )
        .map_err(|e| RunError::Checkpoint(format!("failed to write run_config.json: {e}")))?;

        let equity = config.portfolio.starting_equity;

        Ok(Self {
            config,
            feature_config,
            source,
            llm_harness,
            output_dir,
            candidate_cache,
            position_ledger,
            outcome_labels,
            decision_log,
            feature_pipeline,
            position_engine,
            playbooks,
            id_gen,
            run_id,
            manifest,
            runtime,
            cancellation: CancellationToken::new(),
            equity,
            quality_gate_minimum,
            start_bar_index,
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Drive the bar loop to completion (or cooperative cancellation),
    /// finalizing the manifest on both success and failure.
    pub fn run(mut self) -> Result<RunResult, RunError> {
        let outcome = self.run_inner();
        let now = Utc::now();
        match &outcome {
            Ok(result) => {
                self.manifest.finish_success(result.bars_processed, now);
            }
            Err(e) => {
                self.manifest.finish_failure(self.start_bar_index, now, e.to_string());
            }
        }
        self.manifest.save(&self.output_dir.join("manifest.json"))?;
        outcome
    }

    fn run_inner(&mut self) -> Result<RunResult, RunError> {
        let mut iterators: Vec<(String, std::iter::Peekable<Box<dyn Iterator<Item = trendlab_core::domain::Bar> + Send>>)> =
            Vec::new();
        for symbol in &self.config.market.symbols {
            let iter = self.source.iter_bars(
                symbol,
                self.config.market.start_date,
                self.config.market.end_date,
                &self.config.market.timeframe,
            )?;
            iterators.push((symbol.clone(), iter.peekable()));
        }

        let mut last_timestamp: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut result = RunResult::new(self.feature_config.warmup_bars);
        let mut bar_index = self.start_bar_index;
        let mut llm_calls = 0u64;
        let mut llm_successes = 0u64;
        let mut llm_failures = 0u64;

        loop {
            if self.cancellation.is_cancelled() {
                info!(bar_index, "cooperative cancellation received, checkpointing and exiting");
                break;
            }

            let next_ts = iterators
                .iter_mut()
                .filter_map(|(_, it)| it.peek().map(|b| b.timestamp))
                .min();
            let Some(ts) = next_ts else { break };

            let mut bars_this_step = Vec::new();
            for (symbol, it) in iterators.iter_mut() {
                while let Some(peeked) = it.peek() {
                    if peeked.timestamp == ts {
                        let bar = it.next().expect("peeked bar must exist");
                        if bar.is_void() {
                            return Err(DataError::VoidBar {
                                symbol: symbol.clone(),
                                timestamp: bar.timestamp,
                            }
                            .into());
                        }
                        if let Some(prev) = last_timestamp.get(symbol) {
                            if bar.timestamp <= *prev {
                                return Err(DataError::OutOfOrder {
                                    symbol: symbol.clone(),
                                    prev: *prev,
                                    next: bar.timestamp,
                                }
                                .into());
                            }
                        }
                        last_timestamp.insert(symbol.clone(), bar.timestamp);
                        bars_this_step.push(bar);
                    } else {
                        break;
                    }
                }
            }
            bars_this_step.sort_by(|a, b| a.symbol.cmp(&b.symbol));

            let (step_candidates, step_positions) =
                self.process_bar_step(bars_this_step, bar_index, &mut result, &mut llm_calls, &mut llm_successes, &mut llm_failures)?;
            let _ = (step_candidates, step_positions);

            bar_index += 1;
            result.bars_processed = bar_index;

            if bar_index % self.config.checkpoint_interval_bars == 0 {
                self.write_checkpoint(bar_index, ts)?;
                self.manifest.record_progress(bar_index, Utc::now());
                self.manifest.save(&self.output_dir.join("manifest.json"))?;
            }
            if bar_index % self.config.heartbeat_interval_bars == 0 {
                info!(
                    bar_index,
                    candidates_generated = result.candidates_generated,
                    llm_calls,
                    llm_successes,
                    llm_failures,
                    "heartbeat"
                );
            }
        }

        if self.cancellation.is_cancelled() {
            self.write_checkpoint(bar_index.saturating_sub(1), Utc::now())?;
        }

        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_bar_step(
        &mut self,
        bars: Vec<trendlab_core::domain::Bar>,
        bar_index: usize,
        result: &mut RunResult,
        llm_calls: &mut u64,
        llm_successes: &mut u64,
        llm_failures: &mut u64,
    ) -> Result<(usize, usize), RunError> {
        // Step 1: feature snapshots, keyed by symbol for later lookup (e.g. ATR at entry).
        let mut snapshots: HashMap<String, FeatureSnapshot> = HashMap::new();
        for bar in &bars {
            if let Some(snapshot) = self.feature_pipeline.on_bar(bar) {
                snapshots.insert(bar.symbol.clone(), snapshot);
            }
        }

        // Step 2: position closures, first in persisted ordering for this step.
        for bar in &bars {
            let closures = self.position_engine.update(bar, bar_index);
            for closure in closures {
                self.position_ledger.close_position(&closure)?;
                let position = self
                    .position_ledger
                    .get(closure.position_id)?
                    .ok_or_else(|| RunError::InvariantViolation(format!(
                        "closed position {} missing from ledger immediately after close",
                        closure.position_id
                    )))?;
                let label = OutcomeLabel::new(
                    position.candidate_id,
                    closure.position_id,
                    closure.realized_r_multiple,
                    closure.exit_reason,
                    position.bars_held(closure.exit_bar_index),
                );
                self.outcome_labels.put_label(&self.run_id, &label)?;
                result.positions_closed += 1;
            }

            // Persist the trailing-stop ratchet (arm/advance) the engine just
            // applied in memory: without this, a checkpoint-resumed run
            // reloads every still-open position with `trailing = Unarmed`
            // and `extreme_since_entry = entry_price`, discarding ratchet
            // progress made before the checkpoint.
            let exit_state_updates: Vec<_> = self
                .position_engine
                .open_positions()
                .filter(|p| p.symbol == bar.symbol)
                .map(|p| (p.id, p.exit_state.clone()))
                .collect();
            for (position_id, exit_state) in exit_state_updates {
                self.position_ledger.update_position(position_id, exit_state)?;
            }
        }

        // Step 3: playbook evaluation, persisted regardless of later decision.
        let mut drafts: Vec<(CandidateDraft, FeatureSnapshot, trendlab_core::domain::Bar)> = Vec::new();
        for bar in &bars {
            let Some(snapshot) = snapshots.get(&bar.symbol) else {
                continue;
            };
            for playbook in &self.playbooks {
                if let Some(draft) = playbook.evaluate(snapshot, bar) {
                    drafts.push((draft, snapshot.clone(), bar.clone()));
                }
            }
        }
        drafts.sort_by(|(a, _, _), (b, _, _)| {
            a.playbook_name.cmp(&b.playbook_name).then(a.symbol.cmp(&b.symbol))
        });

        let mut candidates = Vec::with_capacity(drafts.len());
        for (draft, snapshot, bar) in &drafts {
            let fingerprint = trendlab_core::playbooks::candidate_fingerprint(snapshot);
            let candidate = Candidate::new(
                self.id_gen.next_candidate_id(),
                self.run_id.clone(),
                draft.symbol.clone(),
                draft.bar_timestamp,
                draft.playbook_name.clone(),
                draft.direction,
                draft.entry_price,
                draft.exit_spec,
                fingerprint,
            );
            self.candidate_cache.put(&candidate)?;
            result.candidates_generated += 1;
            candidates.push((candidate, snapshot.clone(), bar.clone()));
        }

        // Step 4: LLM consultation, bounded concurrent fan-out within this bar,
        // reduced back in the deterministic (playbook, symbol) order already
        // encoded in `candidates`' indices.
        let llm_results = self.consult_llm_concurrently(&candidates);
        for (_, result_entry) in &llm_results {
            *llm_calls += 1;
            if result_entry.success {
                *llm_successes += 1;
            } else {
                *llm_failures += 1;
            }
        }

        let mut positions_opened = 0usize;
        for (idx, (candidate, snapshot, _bar)) in candidates.into_iter().enumerate() {
            let llm_result = &llm_results[idx].1;
            let event = DecisionEvent {
                schema_version: CURRENT_SCHEMA_VERSION,
                timestamp: candidate.bar_timestamp,
                candidate_id: candidate.id,
                llm_raw_response: llm_result.raw_response.clone(),
                parsed_decision: llm_result.parsed_decision.clone(),
                latency_ms: llm_result.latency_ms,
                retries: llm_result.retries,
                fallback_used: llm_result.fallback_used,
                circuit_state: circuit_label(llm_result.circuit_state),
            };
            self.decision_log.append(&event)?;

            let meets_quality = llm_result
                .parsed_decision
                .setup_quality
                .meets_minimum(self.quality_gate_minimum);
            let is_take = matches!(llm_result.parsed_decision.decision, trendlab_core::llm::Decision::Take);

            if is_take && meets_quality {
                if let Some(mut candidate) = self.candidate_cache.get(candidate.id)? {
                    if self.can_open_position() {
                        let atr_key_prefix = "atr_";
                        let atr_at_entry = snapshot
                            .values
                            .iter()
                            .find(|(k, _)| k.starts_with(atr_key_prefix))
                            .map(|(_, v)| *v)
                            .unwrap_or(0.0);
                        let size_units = self.size_position(candidate.entry_price, &candidate, atr_at_entry);
                        if size_units > 0.0 {
                            let position_id = self.id_gen.next_position_id();
                            let position = self.position_engine.open(
                                position_id,
                                &candidate,
                                candidate.entry_price,
                                atr_at_entry,
                                size_units,
                                bar_index,
                            );
                            self.position_ledger.open_position(&self.run_id, &position)?;
                            candidate.mark_taken(position_id);
                            self.candidate_cache.put(&candidate)?;
                            positions_opened += 1;
                            result.positions_opened += 1;
                        }
                    }
                }
            }
        }

        Ok((drafts.len(), positions_opened))
    }

    fn can_open_position(&self) -> bool {
        if self.position_engine.open_position_count() >= self.config.portfolio.max_positions {
            return false;
        }
        let exposure: f64 = self.position_engine.open_positions().map(|p| p.size_quote).sum();
        exposure / self.equity.max(f64::EPSILON) < self.config.portfolio.max_exposure_fraction
    }

    fn size_position(&self, entry_price: f64, candidate: &Candidate, _atr_at_entry: f64) -> f64 {
        let risk_notional = self.equity * self.config.portfolio.risk_per_trade;
        match self.config.portfolio.size_method {
            SizeMethod::RiskFraction => {
                let stop_distance = (entry_price - candidate.exit_spec.stop_loss_price).abs();
                if stop_distance <= f64::EPSILON {
                    0.0
                } else {
                    risk_notional / stop_distance
                }
            }
            SizeMethod::FixedFractionNotional => {
                if entry_price <= f64::EPSILON {
                    0.0
                } else {
                    risk_notional / entry_price
                }
            }
        }
    }

    fn consult_llm_concurrently(
        &self,
        candidates: &[(Candidate, FeatureSnapshot, trendlab_core::domain::Bar)],
    ) -> Vec<(usize, LLMResult)> {
        let harness = Arc::clone(&self.llm_harness);
        let max_concurrency = 4usize.max(1);
        let prompt_builder = PromptBuilder::default();
        let system_prompt = prompt_builder.system_prompt.clone();

        let prompts: Vec<(usize, String)> = candidates
            .iter()
            .enumerate()
            .map(|(idx, (candidate, snapshot, bar))| {
                let user_prompt = prompt_builder.build_user_prompt(
                    candidate,
                    snapshot,
                    bar,
                    "no regime classifier configured",
                    "respect configured risk per trade and max exposure",
                );
                (idx, user_prompt)
            })
            .collect();

        self.runtime.block_on(async move {
            let semaphore = Arc::new(tokio::sync::Semaphore::new(max_concurrency));
            let mut set = tokio::task::JoinSet::new();
            for (idx, user_prompt) in prompts {
                let harness = Arc::clone(&harness);
                let sem = Arc::clone(&semaphore);
                let system_prompt = system_prompt.clone();
                set.spawn(async move {
                    let _permit = sem.acquire_owned().await.expect("semaphore never closed");
                    let result =
                        tokio::task::spawn_blocking(move || harness.query(&system_prompt, &user_prompt))
                            .await
                            .expect("llm harness task panicked");
                    (idx, result)
                });
            }
            let mut results = Vec::new();
            while let Some(joined) = set.join_next().await {
                results.push(joined.expect("llm fan-out task panicked"));
            }
            results.sort_by_key(|(idx, _)| *idx);
            results
        })
    }

    fn write_checkpoint(&self, bar_index: usize, bar_timestamp: DateTime<Utc>) -> Result<(), RunError> {
        let open_ids: Vec<_> = self.position_engine.open_positions().map(|p| p.id).collect();
        let checkpoint = Checkpoint::new(
            self.config.content_hash(),
            bar_index.saturating_sub(1),
            bar_timestamp,
            &self.feature_pipeline,
            open_ids,
        )?;
        checkpoint.save(&self.output_dir.join("checkpoint.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::sample_config;
    use crate::ohlcv::InMemoryOHLCVSource;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use tempfile::tempdir;
    use trendlab_core::domain::Bar;
    use trendlab_core::llm::MockBackend;

    fn uptrend_bars(symbol: &str, count: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.2;
                Bar {
                    symbol: symbol.to_string(),
                    timestamp: start + ChronoDuration::hours(i as i64),
                    open: close - 0.1,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 1_000.0 + i as f64,
                }
            })
            .collect()
    }

    #[test]
    fn runner_processes_warmup_bars_without_opening_positions() {
        let mut config = sample_config();
        config.market.symbols = vec!["BTCUSDT".to_string()];
        config.market.warmup_bars = 250;
        let bars = uptrend_bars("BTCUSDT", 50);
        let source = Box::new(InMemoryOHLCVSource::new().with_bars("BTCUSDT", bars));
        let backend = Box::new(MockBackend::new(vec![]));
        let dir = tempdir().unwrap();

        let runner = Runner::new(config, source, backend, dir.path().to_path_buf()).unwrap();
        let result = runner.run().unwrap();
        assert_eq!(result.positions_opened, 0);
        assert_eq!(result.candidates_generated, 0);
    }

    #[test]
    fn runner_writes_manifest_and_run_config_snapshot() {
        let mut config = sample_config();
        config.market.symbols = vec!["BTCUSDT".to_string()];
        config.market.warmup_bars = 10;
        let bars = uptrend_bars("BTCUSDT", 5);
        let source = Box::new(InMemoryOHLCVSource::new().with_bars("BTCUSDT", bars));
        let backend = Box::new(MockBackend::new(vec![]));
        let dir = tempdir().unwrap();

        let runner = Runner::new(config, source, backend, dir.path().to_path_buf()).unwrap();
        let _ = runner.run().unwrap();
        assert!(dir.path().join("manifest.json").exists());
        assert!(dir.path().join("run_config.json").exists());
    }
}
