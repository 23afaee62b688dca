//! End-to-end device scenarios on the virtual-clock rig.

use servo_router::app::actuator::{CommandSource, Intent, ServoPosition};
use servo_router::app::events::AppEvent;
use servo_router::app::network::{CommissioningMode, CommissioningPhase, MeshSignal};
use servo_router::drivers::button::{ButtonEvent, ButtonPhase};
use servo_router::drivers::indicator::{IndicatorPattern, BLUE, GREEN};

use crate::mock_hw::MeshCall;
use crate::rig::Rig;

fn position_changes(rig: &Rig) -> usize {
    rig.log.count(|e| matches!(e, AppEvent::PositionChanged { .. }))
}

// ── 1. Cold boot, unpaired ────────────────────────────────────

#[test]
fn cold_boot_blinks_blue_then_goes_green_on_join() {
    let mut rig = Rig::new(&[]);
    rig.run_until(500);

    assert!(!rig.patterns().is_empty());
    assert!(rig
        .patterns()
        .iter()
        .all(|&(_, p)| p == IndicatorPattern::BlueBlink));
    assert!(rig.colours().contains(&BLUE));
    assert_eq!(rig.position(), ServoPosition::Rest);

    rig.join();
    rig.run_for(200);
    assert_eq!(rig.phase(), Some(CommissioningPhase::Joined));
    assert_eq!(rig.pattern_now(), IndicatorPattern::GreenSolid);
    assert_eq!(rig.pixel.last(), Some(GREEN));
}

// ── 2. Remote ON then OFF ─────────────────────────────────────

#[test]
fn remote_on_then_off_cancels_auto_return() {
    let mut rig = Rig::new(&[]);
    rig.join();
    rig.run_until(1000);

    rig.remote_on_off(true);
    rig.settle();
    assert_eq!(rig.position(), ServoPosition::Target);
    let (_, deadline) = rig.timer.armed().expect("timer armed");
    assert_eq!(deadline, rig.clock.now() + 2000);

    rig.run_for(1000);
    rig.remote_on_off(false);
    rig.step();
    assert_eq!(rig.position(), ServoPosition::Rest);
    assert_eq!(rig.timer.armed(), None);

    rig.run_for(5000);
    assert_eq!(position_changes(&rig), 2);
    assert_eq!(rig.position(), ServoPosition::Rest);
    // Remote changes are already known to the stack.
    assert_eq!(
        rig.mesh
            .count_where(|c| matches!(c, MeshCall::SetOnOff(..) | MeshCall::Report(_))),
        0
    );
}

// ── 3. Local short press while joined ─────────────────────────

#[test]
fn short_press_while_joined_plays_reports_and_returns() {
    let mut rig = Rig::new(&[(1000, 1200)]);
    rig.join();
    let ep = rig.config.endpoint_id;

    rig.run_until(1000);
    assert_eq!(rig.position(), ServoPosition::Rest);

    rig.run_until(1400);
    assert_eq!(rig.position(), ServoPosition::Target);
    assert_eq!(rig.mesh.count(&MeshCall::SetOnOff(ep, true)), 1);
    assert_eq!(rig.mesh.count(&MeshCall::Report(ep)), 1);

    rig.run_until(3400);
    assert_eq!(rig.position(), ServoPosition::Rest);
    assert_eq!(rig.mesh.count(&MeshCall::SetOnOff(ep, false)), 1);
    // Auto-return syncs the attribute but does not report.
    assert_eq!(rig.mesh.count(&MeshCall::Report(ep)), 1);
    assert_eq!(rig.pwm.committed(), [rig.rest_duty(), rig.target_duty(), rig.rest_duty()]);
}

#[test]
fn short_press_before_join_toggles_without_report() {
    let mut rig = Rig::new(&[(300, 500)]);
    rig.boot_stack();
    rig.run_until(700);
    assert_eq!(rig.position(), ServoPosition::Target);
    assert_eq!(rig.mesh.count_where(|c| matches!(c, MeshCall::Report(_))), 0);
}

// ── 4. Local long press ───────────────────────────────────────

#[test]
fn long_press_arms_blue_solid_then_resets_once() {
    let mut rig = Rig::new(&[(1000, 4100)]);
    rig.join();

    rig.run_until(4000);
    assert_ne!(rig.pattern_now(), IndicatorPattern::BlueSolid);

    rig.run_until(4090);
    assert_eq!(rig.state.button.load(), ButtonPhase::HeldLongArmed);
    assert_eq!(rig.pattern_now(), IndicatorPattern::BlueSolid);

    rig.run_until(6000);
    assert_eq!(rig.mesh.count(&MeshCall::FactoryReset), 1);
    assert_eq!(position_changes(&rig), 0);
    assert_eq!(rig.pwm.committed(), [rig.rest_duty()]);
    assert_eq!(
        rig.log.count(|e| matches!(e, AppEvent::Button(ButtonEvent::LongPressArmed))),
        1
    );
    assert_eq!(rig.log.count(|e| *e == AppEvent::FactoryReset), 1);
}

#[test]
fn armed_hold_renders_blue_solid_over_everything() {
    let mut rig = Rig::new(&[(1000, 5000)]);
    rig.join();
    rig.run_until(4900);

    let armed: Vec<_> = rig
        .patterns()
        .iter()
        .filter(|&&(t, _)| t >= 4100)
        .map(|&(_, p)| p)
        .collect();
    assert!(!armed.is_empty());
    assert!(armed.iter().all(|&p| p == IndicatorPattern::BlueSolid));
    assert_eq!(rig.pixel.last(), Some(BLUE));
}

#[test]
fn presses_after_long_release_are_ignored() {
    let mut rig = Rig::new(&[(1000, 4100), (5000, 5200)]);
    rig.join();
    rig.run_until(8000);
    assert_eq!(rig.mesh.count(&MeshCall::FactoryReset), 1);
    assert_eq!(position_changes(&rig), 0);
}

// ── 5. Auto-return vs. immediate rest race ────────────────────

#[test]
fn toggle_just_before_expiry_beats_a_dispatched_auto_return() {
    let mut rig = Rig::new(&[]);
    rig.join();
    rig.run_until(1000);

    rig.remote_on_off(true);
    rig.settle();
    let (token, _) = rig.timer.armed().expect("timer armed");

    rig.run_for(1980);
    assert_eq!(rig.position(), ServoPosition::Target);

    // The expiry callback was already on its way when the toggle landed.
    rig.post(Intent::button_toggle());
    rig.post(Intent::auto_return(token));
    rig.settle();

    assert_eq!(rig.position(), ServoPosition::Rest);
    assert_eq!(rig.timer.armed(), None);
    assert_eq!(rig.pwm.committed(), [rig.rest_duty(), rig.target_duty(), rig.rest_duty()]);

    let sources: Vec<_> = rig
        .log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::PositionChanged { source, .. } => Some(source),
            _ => None,
        })
        .collect();
    assert_eq!(sources, [CommandSource::Remote, CommandSource::Button]);

    rig.run_for(3000);
    assert_eq!(position_changes(&rig), 2);
}

// ── 6. Steering failure loop ──────────────────────────────────

#[test]
fn steering_failure_retries_once_per_error_and_keeps_blinking() {
    let mut rig = Rig::new(&[]);
    rig.boot_stack();
    rig.signal(MeshSignal::SteeringComplete, Err(-1));

    assert_eq!(rig.phase(), Some(CommissioningPhase::Steering));
    assert_eq!(rig.mesh.count(&MeshCall::RetryIn(1000)), 1);

    rig.run_for(1000);
    assert!(rig
        .patterns()
        .iter()
        .all(|&(_, p)| p == IndicatorPattern::BlueBlink));

    rig.agent.retry_steering();
    let steering = MeshCall::Commission(CommissioningMode::NetworkSteering { touchlink: false });
    assert_eq!(rig.mesh.count(&steering), 2);
    assert_eq!(rig.mesh.count(&MeshCall::RetryIn(1000)), 1);
}
