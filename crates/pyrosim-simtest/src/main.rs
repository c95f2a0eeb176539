//! PyroSim Headless Scenario Harness
//!
//! Drives the engine in simulated time through scripted operator scenarios
//! and checks the invariants a control-room trainer relies on.
//! Runs entirely in-process: no tokio runtime, no rendering.
//!
//! Usage:
//!   cargo run -p pyrosim-simtest
//!   cargo run -p pyrosim-simtest -- --verbose
//!   cargo run -p pyrosim-simtest -- --dump
//!   cargo run -p pyrosim-simtest -- --config plant.json

use pyrosim_core::prelude::*;
use pyrosim_logic::clock::format_clock;

const SEED: u64 = 20_240_601;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let dump = args.iter().any(|a| a == "--dump");
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1));

    println!("=== PyroSim Scenario Harness ===\n");

    let base = match config_path {
        Some(path) => match EngineConfig::from_path(path) {
            Ok(mut c) => {
                c.seed.get_or_insert(SEED);
                c
            }
            Err(e) => {
                eprintln!("  ✗ config {}: {}", path, e);
                std::process::exit(2);
            }
        },
        None => EngineConfig::seeded(SEED),
    };

    let mut results = Vec::new();

    // 1. Reactor start-up and steady state
    results.extend(validate_reactor_startup(&base, verbose));

    // 2. Cool-down and shutdown
    results.extend(validate_reactor_shutdown(&base, verbose));

    // 3. Recycling line
    results.extend(validate_plant_line(&base, verbose));

    // 4. Lab turnaround
    results.extend(validate_lab(&base, verbose));

    // 5. Long soak: bounds, history, alarms
    let final_frame = validate_soak(&base, verbose, &mut results);

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if dump {
        match serde_json::to_string_pretty(&final_frame) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("frame dump failed: {}", e),
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn scheduler(base: &EngineConfig) -> TickScheduler {
    TickScheduler::new(SimulationEngine::new(base.clone()))
}

fn run_until_mode(s: &mut TickScheduler, mode: SystemMode, limit: u32) -> Option<u32> {
    (1..=limit).find(|_| {
        s.advance(1.0);
        s.engine().snapshot().system_mode == mode
    })
}

// ── 1. Reactor start-up ─────────────────────────────────────────────────

fn validate_reactor_startup(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Reactor Start-up ---");
    let mut results = Vec::new();
    let mut s = scheduler(base);

    results.push(TestResult {
        name: "start_from_off".into(),
        passed: s.apply(Command::StartReactor),
        detail: "start accepted in OFF".into(),
    });
    results.push(TestResult {
        name: "double_start_ignored".into(),
        passed: !s.apply(Command::StartReactor),
        detail: "second start is a no-op".into(),
    });

    let mut idle_while_heating = true;
    let mut ticks = None;
    for i in 1..=600 {
        s.advance(1.0);
        let snap = s.engine().snapshot();
        if snap.system_mode == SystemMode::Heating && snap.feed_rate != 0.0 {
            idle_while_heating = false;
        }
        if snap.system_mode == SystemMode::Stable {
            ticks = Some(i);
            break;
        }
    }
    results.push(TestResult {
        name: "reaches_stable".into(),
        passed: ticks.is_some(),
        detail: match ticks {
            Some(t) => format!("stable after {} ticks", t),
            None => "never stabilised in 600 ticks".into(),
        },
    });
    results.push(TestResult {
        name: "no_feed_while_heating".into(),
        passed: idle_while_heating,
        detail: "feed held at zero until stable".into(),
    });

    s.advance(1.0);
    let snap = s.engine().snapshot();
    let ratio = if snap.feed_rate > 0.0 {
        snap.condensate_flow / (0.65 * snap.feed_rate)
    } else {
        0.0
    };
    results.push(TestResult {
        name: "condensate_tracks_feed".into(),
        passed: (0.9..=1.1).contains(&ratio),
        detail: format!(
            "feed {:.2} kg/h, condensate {:.2} kg/h (ratio {:.3})",
            snap.feed_rate, snap.condensate_flow, ratio
        ),
    });

    if verbose {
        println!("  reactor at {:.1} °C", snap.reactor_temp);
    }
    results
}

// ── 2. Shutdown ─────────────────────────────────────────────────────────

fn validate_reactor_shutdown(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Reactor Shutdown ---");
    let mut results = Vec::new();
    let mut s = scheduler(base);
    s.apply(Command::StartReactor);
    run_until_mode(&mut s, SystemMode::Stable, 600);
    s.run_secs(300);
    let before = s.engine().snapshot().clone();

    results.push(TestResult {
        name: "stop_accepted".into(),
        passed: s.apply(Command::StopReactor),
        detail: "stop accepted in STABLE".into(),
    });

    let mut last = before.reactor_temp;
    let mut monotone = true;
    let mut ticks = None;
    for i in 1..=600 {
        s.advance(1.0);
        let snap = s.engine().snapshot();
        if snap.reactor_temp > last {
            monotone = false;
        }
        last = snap.reactor_temp;
        if snap.system_mode == SystemMode::Off {
            ticks = Some(i);
            break;
        }
    }
    results.push(TestResult {
        name: "cooling_monotone".into(),
        passed: monotone,
        detail: "reactor temperature never rose while cooling".into(),
    });
    results.push(TestResult {
        name: "reaches_off".into(),
        passed: ticks.is_some(),
        detail: match ticks {
            Some(t) => format!("off after {} ticks", t),
            None => "still cooling after 600 ticks".into(),
        },
    });

    let after = s.engine().snapshot();
    results.push(TestResult {
        name: "inventory_survives_shutdown".into(),
        passed: after.bio_oil_tank_level >= before.bio_oil_tank_level
            && after.biomass_hopper_level <= before.biomass_hopper_level,
        detail: format!(
            "bio-oil {:.2}% → {:.2}%, hopper {:.2}% → {:.2}%",
            before.bio_oil_tank_level,
            after.bio_oil_tank_level,
            before.biomass_hopper_level,
            after.biomass_hopper_level
        ),
    });
    results.push(TestResult {
        name: "off_is_idle".into(),
        passed: after.feed_rate == 0.0 && after.condensate_flow == 0.0 && after.discharge_rate == 0.0,
        detail: "feed, condensate and discharge zero in OFF".into(),
    });
    results.push(TestResult {
        name: "setpoint_restored".into(),
        passed: after.target_temp == base.target_temp,
        detail: format!("target back to {:.0} °C", after.target_temp),
    });

    if verbose {
        for line in s.engine().reactor_log().lines().iter().take(5) {
            println!("  {}", line);
        }
    }
    results
}

// ── 3. Plant line ───────────────────────────────────────────────────────

fn validate_plant_line(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Recycling Line ---");
    let mut results = Vec::new();
    let mut config = base.clone();
    config.plant.jam_probability = 0.0;
    config.plant.recovery_probability = 0.0;
    let mut s = scheduler(&config);

    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });
    s.run_secs(50);
    let gcr = s.engine().plant().silo_levels_kg.gcr;
    results.push(TestResult {
        name: "gcr_silo_fills".into(),
        passed: gcr > 0.0 && gcr <= config.plant.silo_capacity_kg.gcr,
        detail: format!("{:.1} kg after 50 s", gcr),
    });

    let prior = s.engine().plant().processing_rate_tires_per_hour;
    s.apply(Command::InjectJam(Stage::Granulators));
    s.advance(config.schedule.plant_period_secs);
    let jammed = s.engine().plant().processing_rate_tires_per_hour;
    results.push(TestResult {
        name: "jam_penalty".into(),
        passed: (jammed - prior * config.plant.jam_penalty).abs() < 1e-9,
        detail: format!("{:.2} → {:.2} tyres/h", prior, jammed),
    });

    s.apply(Command::SetPlant {
        running: false,
        tons_per_day: 50.0,
    });
    s.advance(config.schedule.plant_period_secs);
    let plant = s.engine().plant();
    results.push(TestResult {
        name: "stop_is_immediate".into(),
        passed: plant.all_off() && plant.processing_rate_tires_per_hour == 0.0,
        detail: "all stages OFF, zero throughput".into(),
    });

    if verbose {
        for line in plant.log.lines().iter().take(5) {
            println!("  {}", line);
        }
    }
    results
}

// ── 4. Lab ──────────────────────────────────────────────────────────────

fn validate_lab(base: &EngineConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Quality Lab ---");
    let mut results = Vec::new();
    let mut s = scheduler(base);

    results.push(TestResult {
        name: "sample_needs_batch".into(),
        passed: !s.apply(Command::TakeSample),
        detail: "take_sample refused with no batch".into(),
    });

    s.apply(Command::SimulateBatch);
    let first = s.apply(Command::TakeSample);
    let second = s.apply(Command::TakeSample);
    results.push(TestResult {
        name: "single_job_in_flight".into(),
        passed: first && !second && s.pending_jobs() == 1,
        detail: format!("{} pending job(s)", s.pending_jobs()),
    });

    let latency = base.schedule.lab_latency_secs;
    s.advance(latency - 0.5);
    let early = s.engine().analysis_result().is_some();
    s.advance(1.0);
    let result = s.engine().analysis_result();
    results.push(TestResult {
        name: "fixed_latency".into(),
        passed: !early && result.is_some(),
        detail: format!("result after {:.1} s", latency),
    });
    if let Some(r) = result {
        if verbose {
            println!(
                "  {}: carbon {:.2}%, ash {:.2}%, {:?}",
                r.sample_id, r.assay.carbon_pct, r.assay.ash_pct, r.quality
            );
        }
    }
    results
}

// ── 5. Soak ─────────────────────────────────────────────────────────────

fn validate_soak(base: &EngineConfig, verbose: bool, results: &mut Vec<TestResult>) -> Frame {
    println!("--- Soak ---");
    let mut s = scheduler(base);
    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });

    let mut bounded = true;
    for cycle in 0..3 {
        s.apply(Command::StartReactor);
        for _ in 0..(900 + cycle * 120) {
            s.advance(1.0);
            let engine = s.engine();
            bounded &= engine
                .snapshot()
                .levels()
                .iter()
                .all(|l| (0.0..=100.0).contains(l));
            if engine.lab().batch_ready {
                s.apply(Command::TakeSample);
            }
        }
        s.apply(Command::StopReactor);
        run_until_mode(&mut s, SystemMode::Off, 600);
    }
    results.push(TestResult {
        name: "levels_bounded".into(),
        passed: bounded,
        detail: "every hopper/tank level stayed within 0..=100".into(),
    });

    let engine = s.engine();
    let history = engine.history();
    results.push(TestResult {
        name: "history_capped".into(),
        passed: history.recent_len() == base.history.recent_capacity
            && history.minute_len() <= base.history.minute_capacity,
        detail: format!(
            "{} recent, {} per-minute samples",
            history.recent_len(),
            history.minute_len()
        ),
    });
    results.push(TestResult {
        name: "logs_capped".into(),
        passed: engine.reactor_log().len() <= 100 && engine.plant_log().len() <= 50,
        detail: format!(
            "{} reactor, {} plant entries",
            engine.reactor_log().len(),
            engine.plant_log().len()
        ),
    });

    results.push(TestResult {
        name: "alarm_table_loaded".into(),
        passed: engine.alarm_configs().len() == base.alarms.len(),
        detail: format!(
            "{} signals configured, {} active",
            engine.alarm_configs().len(),
            engine.evaluate_alarms().len()
        ),
    });

    if verbose {
        let fleet: Vec<String> = engine
            .fleet()
            .iter()
            .map(|u| format!("{}:{:?}", u.id, u.status))
            .collect();
        println!("  [{}] fleet {}", format_clock(engine.sim_time()), fleet.join(" "));
    }

    s.stop();
    s.stop();
    let frozen = s.advance(10.0);
    results.push(TestResult {
        name: "stop_idempotent".into(),
        passed: s.is_stopped() && frozen.reactor_ticks == 0,
        detail: "no ticks after stop".into(),
    });

    s.engine().frame()
}
