use clap::Parser;
use packman_pursuit::config::GameConfig;
use packman_pursuit::constants::TICK_MS;
use packman_pursuit::engine::{GameEngine, GameEngineOptions};
use packman_pursuit::types::{AgentId, Mode, RoundOverReason, RuntimeEvent, Snapshot};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;

const MAX_COMBO: u32 = 4;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless pursuit simulation with an autopilot player")]
struct Cli {
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 2)]
    scenarios: u32,
    #[arg(long, default_value_t = 180)]
    max_seconds: u64,
    /// JSON file with `GameConfig` overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    seed: u32,
    #[serde(rename = "maxSeconds")]
    max_seconds: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    reason: Option<RoundOverReason>,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    score: u32,
    lives: u32,
    #[serde(rename = "dotsConsumed")]
    dots_consumed: u32,
    kills: u32,
    captures: u32,
    #[serde(rename = "modeChanges")]
    mode_changes: u32,
    #[serde(rename = "maxCombo")]
    max_combo: u32,
    #[serde(rename = "bonusTaken")]
    bonus_taken: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
enum AnomalyKind {
    OutsideGrid,
    ComboOverflow,
    LingeringFrighten,
}

#[derive(Clone, Debug, Serialize)]
struct Anomaly {
    kind: AnomalyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<AgentId>,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    #[serde(flatten)]
    anomaly: Anomaly,
}

/// Every anomaly sighting by tick, plus one summary line per kind and agent.
#[derive(Debug, Default)]
struct AnomalyLog {
    records: Vec<AnomalyRecord>,
    reported: HashSet<(AnomalyKind, Option<AgentId>)>,
    messages: Vec<String>,
}

impl AnomalyLog {
    fn record(&mut self, tick: u64, anomaly: Anomaly) {
        if self.reported.insert((anomaly.kind, anomaly.agent)) {
            self.messages.push(anomaly.message.clone());
        }
        self.records.push(AnomalyRecord { tick, anomaly });
    }
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "bestScore")]
    best_score: u32,
    #[serde(rename = "totalKills")]
    total_kills: u32,
    #[serde(rename = "totalCaptures")]
    total_captures: u32,
    #[serde(rename = "maxCombo")]
    max_combo: u32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

impl RunSummary {
    fn from_runs(
        match_id: &str,
        started_at: String,
        finished_at: String,
        runs: Vec<ScenarioRunResult>,
    ) -> Self {
        let anomaly_count: usize = runs.iter().map(|run| run.anomaly_records.len()).sum();
        let scenarios: Vec<ScenarioResultLine> = runs.into_iter().map(|run| run.result).collect();

        let mut reason_counts = BTreeMap::new();
        for line in &scenarios {
            *reason_counts.entry(reason_key(line.reason)).or_insert(0) += 1;
        }

        let count = scenarios.len() as u64;
        let (average_duration_ms, average_score) = if count == 0 {
            (0, 0)
        } else {
            let duration: u64 = scenarios.iter().map(|line| line.duration_ms).sum();
            let score: u64 = scenarios.iter().map(|line| u64::from(line.score)).sum();
            (duration / count, (score / count) as u32)
        };

        Self {
            match_id: match_id.to_string(),
            started_at,
            finished_at,
            scenario_count: scenarios.len(),
            anomaly_count,
            average_duration_ms,
            average_score,
            best_score: scenarios.iter().map(|line| line.score).max().unwrap_or(0),
            total_kills: scenarios.iter().map(|line| line.kills).sum(),
            total_captures: scenarios.iter().map(|line| line.captures).sum(),
            max_combo: scenarios.iter().map(|line| line.max_combo).max().unwrap_or(0),
            reason_counts,
            scenarios,
        }
    }

    fn write_to(&self, path: &Path) -> io::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
    }
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine<'a> {
    #[serde(rename = "timestampMs")]
    timestamp_ms: i64,
    level: &'static str,
    event: &'a str,
    #[serde(rename = "matchId")]
    match_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

/// JSON-line event log on stderr, bound to one match.
#[derive(Clone, Debug)]
struct RunLog {
    match_id: String,
}

impl RunLog {
    fn emit(
        &self,
        level: Level,
        event: &str,
        scenario: Option<&Scenario>,
        tick: Option<u64>,
        details: Value,
    ) {
        let line = StructuredLogLine {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            level: level_name(level),
            event,
            match_id: &self.match_id,
            scenario: scenario.map(|scenario| scenario.name.as_str()),
            seed: scenario.map(|scenario| scenario.seed),
            tick,
            details,
        };
        match serde_json::to_string(&line) {
            Ok(text) => eprintln!("{text}"),
            Err(error) => tracing::error!(%error, event, "log line did not serialize"),
        }
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::ERROR => "error",
        Level::WARN => "warn",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        _ => "trace",
    }
}

/// Tracks conditions that only count as anomalies when they persist.
#[derive(Debug, Default)]
struct FrightenWatch {
    killed_since_broadcast: HashSet<AgentId>,
    idle_frames: u32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let started_at = chrono::Utc::now().to_rfc3339();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let log = RunLog {
        match_id: cli
            .match_id
            .clone()
            .unwrap_or_else(|| default_match_id(seed_hint, &random_suffix())),
    };

    let config = match cli.config.as_ref() {
        Some(path) => match GameConfig::from_json_file(path) {
            Ok(config) => config,
            Err(error) => {
                log.emit(
                    Level::ERROR,
                    "config_load_failed",
                    None,
                    None,
                    json!({
                        "path": path.to_string_lossy(),
                        "error": error.to_string(),
                    }),
                );
                std::process::exit(2);
            }
        },
        None => GameConfig::default(),
    };

    let mut runs = Vec::new();
    for scenario in &scenarios {
        log.emit(
            Level::INFO,
            "scenario_started",
            Some(scenario),
            None,
            json!({ "maxSeconds": scenario.max_seconds }),
        );
        let run = match run_scenario(scenario, &config) {
            Ok(run) => run,
            Err(error) => {
                log.emit(
                    Level::ERROR,
                    "scenario_failed",
                    Some(scenario),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        };

        for record in &run.anomaly_records {
            log.emit(
                Level::WARN,
                "anomaly_detected",
                Some(scenario),
                Some(record.tick),
                json!(record.anomaly),
            );
        }
        log.emit(
            Level::INFO,
            "scenario_finished",
            Some(scenario),
            Some(run.finished_tick),
            json!({
                "reason": run.result.reason,
                "durationMs": run.result.duration_ms,
                "score": run.result.score,
                "kills": run.result.kills,
                "captures": run.result.captures,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => tracing::error!(%error, "scenario result did not serialize"),
        }
        runs.push(run);
    }

    let has_anomaly = runs.iter().any(|run| !run.result.anomalies.is_empty());
    let summary = RunSummary::from_runs(
        &log.match_id,
        started_at,
        chrono::Utc::now().to_rfc3339(),
        runs,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = summary.write_to(path) {
            log.emit(
                Level::ERROR,
                "summary_write_failed",
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    log.emit(
        Level::INFO,
        "run_finished",
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "bestScore": summary.best_score,
            "totalKills": summary.total_kills,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(
    scenario: &Scenario,
    config: &GameConfig,
) -> packman_pursuit::error::Result<ScenarioRunResult> {
    let mut engine = GameEngine::new(GameEngineOptions {
        seed: scenario.seed,
        config: config.clone(),
        autopilot: true,
        ..GameEngineOptions::default()
    })?;
    let world = (engine.grid.world_width(), engine.grid.world_height());
    let max_ticks = scenario.max_seconds * 1000 / TICK_MS;

    let mut max_combo = 0;
    let mut bonus_taken = 0;
    let mut watch = FrightenWatch::default();
    let mut anomalies = AnomalyLog::default();
    let mut last_tick = 0u64;

    while !engine.is_ended() && engine.tick() < max_ticks {
        engine.step(TICK_MS);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;

        for event in &snapshot.events {
            match event {
                RuntimeEvent::AgentKilled { agent, combo, .. } => {
                    watch.killed_since_broadcast.insert(*agent);
                    max_combo = max_combo.max(*combo);
                }
                RuntimeEvent::ModeChanged { .. } | RuntimeEvent::RoundStarted => {
                    watch.killed_since_broadcast.clear();
                }
                RuntimeEvent::BonusTaken { .. } => bonus_taken += 1,
                _ => {}
            }
        }

        for anomaly in collect_snapshot_anomalies(&snapshot, world, &mut watch) {
            anomalies.record(snapshot.tick, anomaly);
        }
    }

    let summary = engine.build_summary();
    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            reason: summary.reason,
            duration_ms: summary.duration_ms,
            score: summary.score,
            lives: summary.lives,
            dots_consumed: summary.dots_consumed,
            kills: summary.kills,
            captures: summary.captures,
            mode_changes: engine.mode_changes(),
            max_combo,
            bonus_taken,
            anomalies: anomalies.messages,
        },
        anomaly_records: anomalies.records,
        finished_tick: last_tick,
    })
}

fn collect_snapshot_anomalies(
    snapshot: &Snapshot,
    (world_width, world_height): (f32, f32),
    watch: &mut FrightenWatch,
) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    for agent in &snapshot.agents {
        if !agent.x.is_finite()
            || !agent.y.is_finite()
            || agent.x < 0.0
            || agent.y < 0.0
            || agent.x >= world_width
            || agent.y >= world_height
        {
            anomalies.push(Anomaly {
                kind: AnomalyKind::OutsideGrid,
                agent: Some(agent.id),
                message: format!(
                    "agent outside the grid: {:?} at ({}, {})",
                    agent.id, agent.x, agent.y
                ),
            });
        }
    }

    if snapshot.combo > MAX_COMBO {
        anomalies.push(Anomaly {
            kind: AnomalyKind::ComboOverflow,
            agent: None,
            message: format!("combo above {MAX_COMBO}: {}", snapshot.combo),
        });
    }

    // Killed agents keep the frightened mode until the next broadcast.
    let stray = snapshot.agents.iter().find(|agent| {
        agent.mode == Mode::Frightened
            && agent.overlay.is_none()
            && !watch.killed_since_broadcast.contains(&agent.id)
    });
    match stray {
        Some(agent) if snapshot.frighten_remaining_ms == 0 => {
            watch.idle_frames += 1;
            if watch.idle_frames > 1 {
                anomalies.push(Anomaly {
                    kind: AnomalyKind::LingeringFrighten,
                    agent: Some(agent.id),
                    message: format!("{:?} stayed frightened after the window closed", agent.id),
                });
            }
        }
        _ => watch.idle_frames = 0,
    }

    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = cli
        .seed
        .map(normalize_seed)
        .unwrap_or_else(|| normalize_seed(chrono::Utc::now().timestamp_millis() as u64));
    (0..cli.scenarios.max(1))
        .map(|idx| Scenario {
            name: format!("autopilot-{}", idx + 1),
            seed: seed.wrapping_add(idx),
            max_seconds: cli.max_seconds.max(1),
        })
        .collect()
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

fn default_match_id(seed: u32, suffix: &str) -> String {
    format!("sim-{seed}-{suffix}")
}

fn reason_key(reason: Option<RoundOverReason>) -> String {
    match reason {
        Some(RoundOverReason::Cleared) => "cleared",
        Some(RoundOverReason::OutOfLives) => "out_of_lives",
        None => "time_cap",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use packman_pursuit::types::{AgentView, Direction, PlayerView};

    fn make_scenario_result(
        reason: Option<RoundOverReason>,
        duration_ms: u64,
    ) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            reason,
            duration_ms,
            score: 1_000,
            lives: 1,
            dots_consumed: 100,
            kills: 2,
            captures: 2,
            mode_changes: 5,
            max_combo: 2,
            bonus_taken: 0,
            anomalies: Vec::new(),
        }
    }

    fn snapshot(agents: Vec<AgentView>, frighten_remaining_ms: u64) -> Snapshot {
        Snapshot {
            tick: 1,
            elapsed_ms: TICK_MS,
            score: 0,
            lives: 3,
            dots_consumed: 0,
            dots_remaining: 244,
            timeline_mode: Some(Mode::Scatter),
            frighten_remaining_ms,
            combo: 0,
            player: PlayerView {
                x: 140.0,
                y: 235.0,
                dir: Direction::None,
            },
            agents,
            bonus: None,
            events: Vec::new(),
        }
    }

    fn agent(id: AgentId, x: f32, mode: Mode) -> AgentView {
        AgentView {
            id,
            x,
            y: 115.0,
            dir: Direction::Left,
            mode,
            overlay: None,
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_suffix() {
        assert_eq!(default_match_id(42, "abc123"), "sim-42-abc123");
        assert_eq!(random_suffix().len(), 6);
    }

    fn run(line: ScenarioResultLine, anomalies: usize) -> ScenarioRunResult {
        let anomaly = Anomaly {
            kind: AnomalyKind::ComboOverflow,
            agent: None,
            message: "combo above 4: 5".to_string(),
        };
        ScenarioRunResult {
            result: line,
            anomaly_records: vec![AnomalyRecord { tick: 1, anomaly }; anomalies],
            finished_tick: 0,
        }
    }

    #[test]
    fn run_summary_aggregates_scenarios() {
        let mut best = make_scenario_result(None, 90_000);
        best.score = 3_000;
        best.max_combo = 4;
        let summary = RunSummary::from_runs(
            "sim-42-x",
            "2024-01-01T00:00:00+00:00".to_string(),
            "2024-01-01T00:01:00+00:00".to_string(),
            vec![
                run(make_scenario_result(Some(RoundOverReason::OutOfLives), 60_000), 1),
                run(best, 0),
            ],
        );
        assert_eq!(summary.scenario_count, 2);
        assert_eq!(summary.anomaly_count, 1);
        assert_eq!(summary.average_duration_ms, 75_000);
        assert_eq!(summary.average_score, 2_000);
        assert_eq!(summary.best_score, 3_000);
        assert_eq!(summary.total_kills, 4);
        assert_eq!(summary.total_captures, 4);
        assert_eq!(summary.max_combo, 4);
        assert_eq!(
            summary.reason_counts,
            BTreeMap::from([
                ("out_of_lives".to_string(), 1usize),
                ("time_cap".to_string(), 1usize),
            ])
        );
    }

    #[test]
    fn empty_run_summary_has_zero_averages() {
        let summary = RunSummary::from_runs("sim-1-x", String::new(), String::new(), Vec::new());
        assert_eq!(summary.average_duration_ms, 0);
        assert_eq!(summary.best_score, 0);
        assert!(summary.reason_counts.is_empty());
    }

    #[test]
    fn summary_write_fails_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("packman-pursuit-missing-{}", random_suffix()))
            .join("summary.json");
        let summary = RunSummary::from_runs(
            "sim-1-x",
            String::new(),
            String::new(),
            vec![run(make_scenario_result(None, 60_000), 0)],
        );
        assert!(summary.write_to(&target).is_err());
    }

    #[test]
    fn anomaly_log_reports_each_agent_once_but_keeps_every_sighting() {
        let lingering = |agent: AgentId| Anomaly {
            kind: AnomalyKind::LingeringFrighten,
            agent: Some(agent),
            message: format!("{agent:?} stayed frightened after the window closed"),
        };
        let mut log = AnomalyLog::default();
        log.record(10, lingering(AgentId::Flanker));
        log.record(11, lingering(AgentId::Flanker));
        log.record(11, lingering(AgentId::Skittish));

        assert_eq!(log.messages.len(), 2);
        assert_eq!(log.records.len(), 3);
        assert_eq!(log.records[1].tick, 11);
    }

    #[test]
    fn log_levels_use_lowercase_names() {
        assert_eq!(level_name(Level::WARN), "warn");
        assert_eq!(level_name(Level::ERROR), "error");
    }

    #[test]
    fn agents_outside_the_grid_are_flagged() {
        let mut watch = FrightenWatch::default();
        let snap = snapshot(
            vec![
                agent(AgentId::Chaser, 140.0, Mode::Chase),
                agent(AgentId::Ambusher, 281.0, Mode::Chase),
            ],
            0,
        );
        let found = collect_snapshot_anomalies(&snap, (280.0, 310.0), &mut watch);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AnomalyKind::OutsideGrid);
        assert_eq!(found[0].agent, Some(AgentId::Ambusher));
    }

    #[test]
    fn lingering_frightened_agent_is_flagged_after_one_frame() {
        let mut watch = FrightenWatch::default();
        let snap = snapshot(vec![agent(AgentId::Flanker, 140.0, Mode::Frightened)], 0);
        assert!(collect_snapshot_anomalies(&snap, (280.0, 310.0), &mut watch).is_empty());
        let found = collect_snapshot_anomalies(&snap, (280.0, 310.0), &mut watch);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AnomalyKind::LingeringFrighten);
        assert_eq!(found[0].agent, Some(AgentId::Flanker));

        let mut watch = FrightenWatch::default();
        watch.killed_since_broadcast.insert(AgentId::Flanker);
        for _ in 0..5 {
            assert!(collect_snapshot_anomalies(&snap, (280.0, 310.0), &mut watch).is_empty());
        }
    }

    #[test]
    fn scenarios_use_consecutive_seeds() {
        let cli = Cli::parse_from(["simulate", "--seed", "7", "--scenarios", "3"]);
        let scenarios = resolve_scenarios(&cli);
        let seeds: Vec<u32> = scenarios.iter().map(|s| s.seed).collect();
        assert_eq!(seeds, vec![7, 8, 9]);
        assert_eq!(scenarios[0].max_seconds, 180);
    }

    #[test]
    fn short_scenario_runs_to_the_time_cap_or_an_ending() {
        let scenario = Scenario {
            name: "smoke".to_string(),
            seed: 3,
            max_seconds: 5,
        };
        let run = run_scenario(&scenario, &GameConfig::default()).unwrap();
        assert!(run.finished_tick <= 5_000 / TICK_MS);
        assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
    }
}
