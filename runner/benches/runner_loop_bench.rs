//! Criterion benchmark for the full bar loop: feature pipeline, playbook
//! evaluation, mock LLM consultation, and position exit evaluation combined.
//! Guards against accidental quadratic behavior creeping into the
//! orchestration layer above the feature pipeline (whose own O(1)-per-bar
//! claim is benchmarked separately in `trendlab-core`).

use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::tempdir;
use trendlab_core::domain::Bar;
use trendlab_core::llm::{Decision, LLMHarnessConfig};
use trendlab_core::playbooks::{BreakoutConfig, PullbackConfig};
use trendlab_core::positions::{FeeModel, RMultipleBasis};
use trendlab_runner::config::{
    DecisionTiming, ExecutionSettings, FillTiming, MarketScope, PlaybookToggle, PlaybooksConfig,
    PortfolioConfig, RunConfig, SetupQualityGate, SizeMethod, CURRENT_CONFIG_SCHEMA_VERSION,
};
use trendlab_runner::{InMemoryOHLCVSource, Runner};

fn bench_config() -> RunConfig {
    RunConfig {
        schema_version: CURRENT_CONFIG_SCHEMA_VERSION,
        run_label: "bench-run".to_string(),
        market: MarketScope {
            venue: "binance".to_string(),
            symbols: vec!["BTCUSDT".to_string()],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            timeframe: "15m".to_string(),
            warmup_bars: 200,
        },
        portfolio: PortfolioConfig {
            starting_equity: 100_000.0,
            max_positions: 5,
            max_exposure_fraction: 0.5,
            risk_per_trade: 0.01,
            size_method: SizeMethod::RiskFraction,
        },
        llm: LLMHarnessConfig {
            fallback_decision: Decision::Skip,
            ..LLMHarnessConfig::default()
        },
        quality_gate: SetupQualityGate {
            minimum_setup_quality: "B".to_string(),
        },
        playbooks: PlaybooksConfig {
            breakout: PlaybookToggle {
                enabled: true,
                params: BreakoutConfig::default(),
            },
            pullback: PlaybookToggle {
                enabled: true,
                params: PullbackConfig::default(),
            },
        },
        execution: ExecutionSettings {
            decision_timing: DecisionTiming::OnClose,
            fill_timing: FillTiming::NextOpen,
            fee_model: FeeModel::default(),
            is_taker: true,
            r_multiple_basis: RMultipleBasis::PreFee,
        },
        checkpoint_interval_bars: 500,
        heartbeat_interval_bars: 500,
    }
}

fn uptrend_bars(symbol: &str, n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;
    for i in 0..n {
        price += 0.02 * ((i % 17) as f64 - 8.0).signum();
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp: base + chrono::Duration::hours(i as i64),
            open: price - 0.1,
            high: price + 0.4,
            low: price - 0.4,
            close: price,
            volume: 1_000.0 + (i as f64 % 30.0) * 10.0,
        });
    }
    bars
}

fn bench_runner_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("runner_bar_loop");
    for &n in &[250usize, 1_000, 4_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let config = bench_config();
                let bars = uptrend_bars("BTCUSDT", n);
                let source = Box::new(InMemoryOHLCVSource::new().with_bars("BTCUSDT", bars));
                let backend = Box::new(trendlab_core::llm::MockBackend::new(vec![]));
                let dir = tempdir().unwrap();

                let runner =
                    Runner::new(config, source, backend, dir.path().to_path_buf()).unwrap();
                black_box(runner.run().unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_runner_loop);
criterion_main!(benches);
