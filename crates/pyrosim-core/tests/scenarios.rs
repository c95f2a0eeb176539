//! End-to-end scenarios against the virtual-time scheduler.
//!
//! Exercises: commands → reactor cycle → plant line → lab → history,
//! with a fixed seed so every run sees the same noise.

use pyrosim_core::prelude::*;
use pyrosim_core::systems::ReactorModel;

// ── Helpers ────────────────────────────────────────────────────────────

fn scheduler(seed: u64) -> TickScheduler {
    TickScheduler::new(SimulationEngine::new(EngineConfig::seeded(seed)))
}

fn quiet_plant(seed: u64) -> TickScheduler {
    let mut config = EngineConfig::seeded(seed);
    config.plant.jam_probability = 0.0;
    config.plant.recovery_probability = 0.0;
    TickScheduler::new(SimulationEngine::new(config))
}

/// Advance one second at a time until `mode`, returning the seconds taken.
fn run_until_mode(s: &mut TickScheduler, mode: SystemMode, limit: u32) -> Option<u32> {
    for i in 1..=limit {
        s.advance(1.0);
        if s.engine().snapshot().system_mode == mode {
            return Some(i);
        }
    }
    None
}

fn assert_levels_bounded(s: &TickScheduler) {
    let engine = s.engine();
    for level in engine.snapshot().levels() {
        assert!((0.0..=100.0).contains(&level), "level {} out of range", level);
    }
    let silos = engine.plant().silo_levels_kg;
    assert!(silos.gcr >= 0.0 && silos.gcr <= 20_000.0);
    assert!(silos.steel >= 0.0 && silos.steel <= 10_000.0);
    assert!(silos.fiber >= 0.0 && silos.fiber <= 5_000.0);
}

// ── Reactor cycle ──────────────────────────────────────────────────────

#[test]
fn reactor_reaches_stable_and_produces() {
    let mut s = scheduler(1);
    assert!(s.apply(Command::StartReactor));

    // Heating closes 5 % of the gap per tick, so the bound is loose
    let ticks = run_until_mode(&mut s, SystemMode::Stable, 400);
    assert!(ticks.is_some(), "reactor never stabilised");

    s.advance(1.0);
    let snap = s.engine().snapshot();
    assert!(snap.feed_rate > 0.0);
    let expected = 0.65 * snap.feed_rate;
    assert!(
        (snap.condensate_flow - expected).abs() <= expected * 0.1,
        "condensate {} vs {}",
        snap.condensate_flow,
        expected
    );
}

#[test]
fn heating_never_skips_to_cooling_or_off() {
    let mut s = scheduler(2);
    s.apply(Command::StartReactor);
    for _ in 0..400 {
        s.advance(1.0);
        let mode = s.engine().snapshot().system_mode;
        assert!(
            mode == SystemMode::Heating || mode == SystemMode::Stable,
            "unexpected {:?}",
            mode
        );
        if mode == SystemMode::Stable {
            return;
        }
    }
    panic!("reactor never stabilised");
}

#[test]
fn full_cycle_returns_to_off() {
    let mut s = scheduler(3);
    s.apply(Command::StartReactor);
    run_until_mode(&mut s, SystemMode::Stable, 400);
    s.run_secs(120);
    assert!(s.apply(Command::StopReactor));

    let mut last = s.engine().snapshot().reactor_temp;
    let mut off = false;
    for _ in 0..400 {
        s.advance(1.0);
        let snap = s.engine().snapshot();
        assert!(snap.reactor_temp <= last + 1e-9);
        last = snap.reactor_temp;
        if snap.system_mode == SystemMode::Off {
            off = true;
            break;
        }
    }
    assert!(off, "reactor never reached off");
    assert!(s.engine().reactor_log().contains("shut down"));
}

#[test]
fn off_means_no_production_on_every_tick() {
    let mut s = quiet_plant(4);
    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });
    for cycle in 0..2 {
        s.apply(Command::StartReactor);
        run_until_mode(&mut s, SystemMode::Stable, 400);
        s.run_secs(30 + cycle * 30);
        s.apply(Command::StopReactor);
        for _ in 0..400 {
            s.advance(1.0);
            assert_levels_bounded(&s);
            let snap = s.engine().snapshot();
            if snap.system_mode == SystemMode::Off {
                assert_eq!(snap.feed_rate, 0.0);
                assert_eq!(snap.condensate_flow, 0.0);
                assert_eq!(snap.discharge_rate, 0.0);
                break;
            }
        }
    }
    s.run_secs(5);
    let snap = s.engine().snapshot();
    assert_eq!(snap.system_mode, SystemMode::Off);
    assert_eq!(s.engine().counters().total(), 0);
}

#[test]
fn heating_bound_scales_with_gap() {
    // Lower bound of the per-tick rise is 5 % of the gap; give generous slack
    let tuning = pyrosim_core::config::ReactorTuning::default();
    let gap = 500.0 - tuning.ambient_temp;
    let bound = ((gap / 1.0).ln() / -(1.0 - tuning.heating_rate).ln()).ceil() as u32 + 10;

    let mut s = scheduler(5);
    s.apply(Command::StartReactor);
    let ticks = run_until_mode(&mut s, SystemMode::Stable, bound);
    assert!(ticks.is_some(), "not stable within {} ticks", bound);
}

// ── Plant line ─────────────────────────────────────────────────────────

#[test]
fn plant_fills_gcr_silo() {
    let mut s = scheduler(6);
    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });
    s.run_secs(50);
    let gcr = s.engine().plant().silo_levels_kg.gcr;
    assert!(gcr > 0.0);
    assert!(gcr <= 20_000.0);
}

#[test]
fn silos_never_drain_while_running() {
    let mut s = scheduler(7);
    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });
    let mut last = s.engine().plant().silo_levels_kg;
    for _ in 0..300 {
        s.advance(2.0);
        let now = s.engine().plant().silo_levels_kg;
        assert!(now.gcr >= last.gcr && now.steel >= last.steel && now.fiber >= last.fiber);
        assert_levels_bounded(&s);
        last = now;
    }
}

#[test]
fn forced_jam_cuts_rate_to_a_fifth() {
    let mut s = quiet_plant(8);
    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });
    s.advance(2.0);
    let prior = s.engine().plant().processing_rate_tires_per_hour;
    assert!(prior > 0.0);

    assert!(s.apply(Command::InjectJam(Stage::PrimaryShredder)));
    s.advance(2.0);
    let plant = s.engine().plant();
    assert_eq!(plant.status(Stage::PrimaryShredder), StageStatus::Jammed);
    assert!((plant.processing_rate_tires_per_hour - prior * 0.2).abs() < 1e-9);

    s.advance(2.0);
    let plant = s.engine().plant();
    assert_eq!(plant.status(Stage::PrimaryShredder), StageStatus::Jammed);
    assert!((plant.processing_rate_tires_per_hour - prior).abs() < 1e-9);
}

#[test]
fn stopped_plant_is_fully_off_after_one_tick() {
    let mut s = scheduler(9);
    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });
    s.run_secs(40);
    s.apply(Command::SetPlant {
        running: false,
        tons_per_day: 50.0,
    });
    s.advance(2.0);
    let plant = s.engine().plant();
    assert!(Stage::LINE
        .iter()
        .all(|stage| plant.status(*stage) == StageStatus::Off));
    assert_eq!(plant.processing_rate_tires_per_hour, 0.0);
}

// ── Lab ────────────────────────────────────────────────────────────────

#[test]
fn second_take_sample_is_a_noop() {
    let mut s = scheduler(10);
    s.apply(Command::SimulateBatch);
    assert!(s.apply(Command::TakeSample));
    assert!(!s.apply(Command::TakeSample));
    assert_eq!(s.pending_jobs(), 1);
}

#[test]
fn automatic_batches_get_graded() {
    let mut s = quiet_plant(11);
    s.apply(Command::SetPlant {
        running: true,
        tons_per_day: 50.0,
    });
    let mut graded = 0;
    for _ in 0..120 {
        s.advance(1.0);
        if s.engine().lab().batch_ready {
            assert!(s.apply(Command::TakeSample));
        }
        if s.engine().analysis_result().is_some() {
            graded += 1;
        }
    }
    assert!(graded > 0, "no batch completed analysis");
    assert!(s.engine().plant_log().contains("Quality: Premium"));
}

// ── History and fleet ──────────────────────────────────────────────────

#[test]
fn history_rings_stay_capped() {
    let mut s = scheduler(12);
    s.apply(Command::StartReactor);
    s.run_secs(700);
    let history = s.engine().history();
    assert_eq!(history.recent_len(), 600);
    assert!(history.minute_len() >= 10 && history.minute_len() <= 12);
}

#[test]
fn fleet_is_fixed_after_first_tick() {
    let mut s = scheduler(13);
    s.advance(1.0);
    let ids: Vec<String> = s.engine().fleet().iter().map(|u| u.id.clone()).collect();
    assert_eq!(ids.len(), 9);
    s.run_secs(100);
    let later: Vec<String> = s.engine().fleet().iter().map(|u| u.id.clone()).collect();
    assert_eq!(ids, later);
}

// ── Alarms ─────────────────────────────────────────────────────────────

#[test]
fn lowered_threshold_raises_alarm_in_steady_state() {
    let mut s = scheduler(14);
    s.apply(Command::SetAlarm(
        Signal::ReactorTemp,
        AlarmConfig::new(400.0, 480.0, 900.0),
    ));
    s.apply(Command::StartReactor);
    run_until_mode(&mut s, SystemMode::Stable, 400);
    s.advance(1.0);
    let alarms = s.engine().evaluate_alarms();
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].level, AlarmLevel::High);
}

#[test]
fn direct_model_use_without_engine() {
    let mut model = ReactorModel::new(Default::default(), 450.0, "zeolite-zsm5", 1.0);
    assert!(model.start(0.0));
    assert_eq!(model.mode(), SystemMode::Heating);
}
