use glam::Vec2;

use super::mode::{Mode, ModeKind};
use super::*;
use crate::config::Config;
use crate::geometry::ScreenGeometry;
use crate::pointer::fake::{FailOn, FakePointer};
use crate::schedule::TimerKind;

const DT: f64 = 0.016;

fn config() -> Config {
    Config {
        seed: Some(7),
        rampage_delay: (100.0, 100.0),
        run_gap: (1.0, 2.0),
        ..Config::default()
    }
}

fn engine() -> Engine<FakePointer> {
    Engine::new(config(), ScreenGeometry::default(), FakePointer::default())
}

/// Advance `secs` of simulated time at the fast tick, firing timers each tick.
fn run_for(engine: &mut Engine<FakePointer>, now: &mut f64, secs: f64, cursor: Vec2) {
    let end = *now + secs;
    while *now < end {
        *now += DT;
        engine.step(*now, cursor);
        engine.tick_timers(*now);
    }
}

/// Jump to the takeover timer and fire it.
fn fire_takeover(engine: &mut Engine<FakePointer>, now: &mut f64) {
    let due = engine
        .timers()
        .due_at(TimerKind::TakeoverStart)
        .expect("takeover armed");
    *now = due;
    engine.tick_timers(*now);
    assert_eq!(engine.mode_kind(), ModeKind::Takeover);
}

fn rampaging() -> (Engine<FakePointer>, f64) {
    let mut e = engine();
    let mut now = 0.0;
    e.start(now);
    run_for(&mut e, &mut now, 0.5, Vec2::new(800.0, 500.0));
    e.activate_rampage(now);
    (e, now)
}

#[test]
fn start_follows_and_arms_rampage() {
    let mut e = engine();
    assert_eq!(e.mode_kind(), ModeKind::Idle);
    e.start(1.0);
    assert_eq!(e.mode_kind(), ModeKind::Following);
    assert_eq!(e.timers().due_at(TimerKind::RampageArm), Some(101.0));
    assert!(!e.timers().is_armed(TimerKind::TakeoverStart));
    assert!(!e.timers().is_armed(TimerKind::DialogShow));
}

#[test]
fn idle_never_moves_the_sprite() {
    let mut e = engine();
    let parked = e.position();
    let mut now = 0.0;
    for i in 0..200 {
        now += DT;
        e.step(now, Vec2::new(i as f32 * 5.0, 300.0));
    }
    assert_eq!(e.position(), parked);
    assert_eq!(e.trail().len(), 0);
}

#[test]
fn following_settles_but_rampage_keeps_creeping() {
    let cursor = Vec2::new(900.0, 400.0);

    let mut calm = engine();
    let mut now = 0.0;
    calm.start(now);
    run_for(&mut calm, &mut now, 120.0 * DT, cursor);
    assert_eq!(calm.velocity().y, 0.0);

    let mut wild = engine();
    let mut now = 0.0;
    wild.start(now);
    wild.activate_rampage(now);
    run_for(&mut wild, &mut now, 120.0 * DT, cursor);
    assert_eq!(wild.mode_kind(), ModeKind::Rampage);
    assert_ne!(wild.velocity().y, 0.0);
}

#[test]
fn chasing_leaves_fading_paws() {
    let mut e = engine();
    let mut now = 0.0;
    e.start(now);
    run_for(&mut e, &mut now, 1.0, Vec2::new(900.0, 400.0));
    let frame = e.frame(now);
    assert!(!frame.marks.is_empty());
    assert!(frame.marks.iter().all(|m| m.alpha > 0.0 && m.alpha <= 1.0));
    // Oldest first, so alpha is non-decreasing.
    assert!(frame.marks.windows(2).all(|w| w[0].alpha <= w[1].alpha));
}

#[test]
fn rampage_arms_both_effects_at_base_cadence() {
    let (e, now) = rampaging();
    assert_eq!(e.mode_kind(), ModeKind::Rampage);
    let takeover = e.timers().due_at(TimerKind::TakeoverStart).unwrap() - now;
    let dialog = e.timers().due_at(TimerKind::DialogShow).unwrap() - now;
    assert!((30.0..=180.0).contains(&takeover), "{takeover}");
    assert!((5.0..=7.0).contains(&dialog), "{dialog}");
    assert_eq!(e.factor(), EscalationFactor::default());
}

#[test]
fn double_rampage_activation_is_a_no_op() {
    let (mut e, now) = rampaging();
    let due = e.timers().due_at(TimerKind::TakeoverStart);
    e.activate_rampage(now + 1.0);
    assert_eq!(e.timers().due_at(TimerKind::TakeoverStart), due);
    assert_eq!(e.mode_kind(), ModeKind::Rampage);
}

#[test]
fn takeover_blocks_drives_and_gives_back_the_pointer() {
    let (mut e, mut now) = rampaging();
    fire_takeover(&mut e, &mut now);

    assert!(e.arbiter().is_acquired());
    assert!(e.arbiter().backend().filter_installed);
    assert!(!e.arbiter().backend().cursor_visible);

    let Mode::Takeover(t) = *e.mode() else {
        panic!("expected takeover");
    };
    assert!((10.0..=15.0).contains(&t.duration));
    assert!(t.escalated);

    run_for(&mut e, &mut now, 2.0, Vec2::ZERO);
    let screen = ScreenGeometry::default().available;
    let driven = e.arbiter().backend().position;
    assert!(screen.contains(driven));
    assert!(e.arbiter().backend().moves > 100);

    run_for(&mut e, &mut now, 14.0, Vec2::ZERO);
    assert_eq!(e.mode_kind(), ModeKind::Rampage);
    assert!(!e.arbiter().is_acquired());
    assert!(!e.arbiter().backend().filter_installed);
    assert!(e.arbiter().backend().cursor_visible);
    assert!((e.factor().takeover - 0.9).abs() < 1e-12);
    assert!(e.timers().is_armed(TimerKind::TakeoverStart));
}

#[test]
fn escalated_takeovers_shrink_the_cadence() {
    let (mut e, mut now) = rampaging();
    for _ in 0..3 {
        fire_takeover(&mut e, &mut now);
        run_for(&mut e, &mut now, 15.1, Vec2::ZERO);
        assert_eq!(e.mode_kind(), ModeKind::Rampage);
    }
    assert!((e.factor().takeover - 0.729).abs() < 1e-9);
    let wait = e.timers().due_at(TimerKind::TakeoverStart).unwrap() - now;
    assert!(wait <= 131.22 + 1e-6, "{wait}");
    assert!(wait >= 21.87 - 15.1, "{wait}");
}

#[test]
fn calm_takeover_returns_to_following_without_rescheduling() {
    let mut e = engine();
    let mut now = 0.0;
    e.start(now);
    run_for(&mut e, &mut now, 0.5, Vec2::new(800.0, 500.0));

    e.timers.arm(TimerKind::TakeoverStart, now);
    e.tick_timers(now);
    let Mode::Takeover(t) = *e.mode() else {
        panic!("expected takeover, got {:?}", e.mode_kind());
    };
    assert!(!t.escalated);
    assert!(e.arbiter().backend().filter_installed);

    // Not a rampage, so a cancel does nothing.
    e.request_deescalate();
    run_for(&mut e, &mut now, 15.1, Vec2::ZERO);

    assert_eq!(e.mode_kind(), ModeKind::Following);
    assert!(!e.arbiter().backend().filter_installed);
    assert!(e.arbiter().backend().cursor_visible);
    assert!(!e.timers().is_armed(TimerKind::TakeoverStart));
    assert_eq!(e.factor(), EscalationFactor::default());
}

#[test]
fn failed_hook_install_degrades_to_unblocked_takeover() {
    let (mut e, mut now) = rampaging();
    e.arbiter_mut().backend_mut().fail.push(FailOn::Install);
    fire_takeover(&mut e, &mut now);

    assert!(!e.arbiter().backend().filter_installed);
    assert!(e.arbiter().backend().cursor_visible);
    run_for(&mut e, &mut now, 1.0, Vec2::ZERO);
    assert!(e.arbiter().backend().moves > 0);
}

#[test]
fn dialog_shows_in_rampage_then_hides_and_reschedules() {
    let (mut e, _) = rampaging();
    let mut now = e.timers().due_at(TimerKind::DialogShow).unwrap();
    e.tick_timers(now);
    e.step(now + DT, Vec2::ZERO);
    let bubble = e.frame(now).bubble.expect("bubble visible");
    assert!(DIALOG_LINES.contains(&bubble.text));
    assert_eq!(e.frame(now).mask_rects().last(), Some(&bubble.rect));

    now += DIALOG_VISIBLE;
    e.tick_timers(now);
    assert!(e.frame(now).bubble.is_none());
    assert!((e.factor().dialog - 0.75).abs() < 1e-12);
    let next = e.timers().due_at(TimerKind::DialogShow).unwrap() - now;
    assert!((3.75..=5.25).contains(&next), "{next}");
}

#[test]
fn bubble_hidden_outside_rampage() {
    let (mut e, mut now) = rampaging();
    // The first dialog comes due long before the takeover and fires with it.
    fire_takeover(&mut e, &mut now);
    assert!(e.dialog().is_some());
    assert!(e.frame(now).bubble.is_none());
}

#[test]
fn deescalate_outside_rampage_is_ignored() {
    let mut e = engine();
    let mut now = 0.0;
    e.start(now);
    e.request_deescalate();
    run_for(&mut e, &mut now, 0.1, Vec2::new(500.0, 500.0));
    assert_eq!(e.mode_kind(), ModeKind::Following);
}

#[test]
fn cancel_mid_takeover_releases_then_retreats_offscreen() {
    let (mut e, mut now) = rampaging();
    fire_takeover(&mut e, &mut now);
    run_for(&mut e, &mut now, 1.0, Vec2::ZERO);

    e.command_sender().send(Command::Deescalate).unwrap();
    now += DT;
    e.step(now, Vec2::ZERO);
    let start = now;

    assert!(!e.arbiter().is_acquired());
    assert!(e.arbiter().backend().cursor_visible);
    assert!(!e.arbiter().backend().filter_installed);
    assert!(e.dialog().is_none());
    assert!(!e.timers().is_armed(TimerKind::TakeoverStart));
    assert!(!e.timers().is_armed(TimerKind::DialogShow));

    let Mode::RampageExit(path) = *e.mode() else {
        panic!("expected exit, got {:?}", e.mode_kind());
    };
    assert!(ScreenGeometry::default().is_offscreen(path.to));

    assert_eq!(path.start, start);
    let marks_before = e.trail().len();
    while now + DT < path.end_time() {
        now += DT;
        e.step(now, Vec2::ZERO);
        assert_eq!(e.mode_kind(), ModeKind::RampageExit);
    }
    assert!(e.trail().len() <= marks_before);

    e.step(path.end_time(), Vec2::ZERO);
    assert_eq!(e.mode_kind(), ModeKind::Idle);
    assert_eq!(e.position(), path.to);
}

#[test]
fn cancel_forces_pointer_back_even_when_release_fails() {
    let (mut e, mut now) = rampaging();
    fire_takeover(&mut e, &mut now);
    e.arbiter_mut().backend_mut().fail.push(FailOn::Remove);
    e.request_deescalate();
    e.step(now + DT, Vec2::ZERO);

    let backend = e.arbiter().backend();
    assert!(backend.cursor_visible);
    assert!(!backend.filter_installed);
    assert_eq!(backend.forced, 1);
    assert_eq!(e.mode_kind(), ModeKind::RampageExit);
}

#[test]
fn full_exit_resets_factors_and_rearms() {
    let (mut e, mut now) = rampaging();
    for _ in 0..2 {
        fire_takeover(&mut e, &mut now);
        run_for(&mut e, &mut now, 15.1, Vec2::ZERO);
    }
    assert!(e.factor().takeover < 1.0);
    assert!(e.factor().dialog < 1.0);

    e.request_deescalate();
    run_for(&mut e, &mut now, EXIT_DURATION + 0.1, Vec2::ZERO);
    assert_eq!(e.mode_kind(), ModeKind::Idle);
    assert_eq!(e.factor().takeover, 1.0);
    assert_eq!(e.factor().dialog, 1.0);
    assert!(e.timers().is_armed(TimerKind::RampageArm));
    assert!(e.timers().is_armed(TimerKind::ScriptedRun));
}

#[test]
fn scripted_runs_never_overlap() {
    let (mut e, mut now) = rampaging();
    e.request_deescalate();
    run_for(&mut e, &mut now, EXIT_DURATION + 0.1, Vec2::ZERO);
    assert_eq!(e.mode_kind(), ModeKind::Idle);

    // (start, completion)
    let mut runs: Vec<(f64, Option<f64>)> = Vec::new();
    let end = now + 60.0;
    while now < end {
        now += DT;
        e.step(now, Vec2::ZERO);
        e.tick_timers(now);
        if let Mode::ScriptedRun(run) = *e.mode() {
            if runs.last().map(|r| r.0) != Some(run.path.start) {
                runs.push((run.path.start, None));
            }
            if let (Some(until), Some(last)) = (run.hold_until, runs.last_mut()) {
                last.1 = Some(until - RUN_HOLD);
            }
        }
    }

    assert!(runs.len() >= 4, "only {} runs", runs.len());
    for pair in runs.windows(2) {
        let done = pair[0].1.expect("earlier run completed");
        assert!(done >= pair[0].0 + RUN_DURATION - 1e-9);
        assert!(pair[1].0 >= done + RUN_HOLD - 1e-9);
    }
}

#[test]
fn scripted_run_crosses_the_screen_leaving_paws() {
    let (mut e, mut now) = rampaging();
    e.request_deescalate();
    run_for(&mut e, &mut now, EXIT_DURATION + 0.1, Vec2::ZERO);
    let wait = e.timers().due_at(TimerKind::ScriptedRun).unwrap() - now + DT;
    run_for(&mut e, &mut now, wait, Vec2::ZERO);
    let Mode::ScriptedRun(run) = *e.mode() else {
        panic!("expected run, got {:?}", e.mode_kind());
    };
    let screen = ScreenGeometry::default();
    assert!(screen.is_offscreen(run.path.from));
    assert!(screen.is_offscreen(run.path.to));
    assert!((run.path.from.x < 0.0) != (run.path.to.x < 0.0));

    run_for(&mut e, &mut now, 2.5, Vec2::ZERO);
    assert!(screen.virtual_desktop.contains(e.position()));
    assert!(e.trail().len() > 3);
}

#[test]
fn rampage_due_mid_run_is_deferred() {
    let (mut e, mut now) = rampaging();
    e.request_deescalate();
    run_for(&mut e, &mut now, EXIT_DURATION + 0.1, Vec2::ZERO);
    let wait = e.timers().due_at(TimerKind::ScriptedRun).unwrap() - now + DT;
    run_for(&mut e, &mut now, wait, Vec2::ZERO);
    assert_eq!(e.mode_kind(), ModeKind::ScriptedRun);

    e.activate_rampage(now);
    assert_eq!(e.mode_kind(), ModeKind::ScriptedRun);
    assert_eq!(e.timers().due_at(TimerKind::RampageArm), Some(now + RAMPAGE_RETRY));

    run_for(&mut e, &mut now, RUN_DURATION + RUN_HOLD + 1.5, Vec2::ZERO);
    assert_eq!(e.mode_kind(), ModeKind::Rampage);
    assert!(!e.timers().is_armed(TimerKind::ScriptedRun));
}

#[test]
fn resume_following_only_from_idle() {
    let (mut e, mut now) = rampaging();
    e.resume_following();
    assert_eq!(e.mode_kind(), ModeKind::Rampage);

    e.request_deescalate();
    run_for(&mut e, &mut now, EXIT_DURATION + 0.1, Vec2::ZERO);
    e.resume_following();
    assert_eq!(e.mode_kind(), ModeKind::Following);
    assert!(!e.timers().is_armed(TimerKind::ScriptedRun));
}
