//! Network agent against the mock mesh: commissioning, attribute contract,
//! and what the indicator makes of each phase.

use servo_router::app::actuator::ServoPosition;
use servo_router::app::events::AppEvent;
use servo_router::app::network::{CommissioningMode, CommissioningPhase, MeshSignal};
use servo_router::config::DeviceConfig;
use servo_router::drivers::indicator::IndicatorPattern;

use crate::mock_hw::{MeshCall, NETWORK};
use crate::rig::Rig;

#[test]
fn join_records_network_identifiers() {
    let mut rig = Rig::new(&[]);
    rig.join();
    assert_eq!(rig.agent.network(), Some(NETWORK));
    assert_eq!(rig.log.count(|e| *e == AppEvent::Joined(NETWORK)), 1);
    assert_eq!(
        rig.mesh.calls(),
        [
            MeshCall::Commission(CommissioningMode::Initialization),
            MeshCall::Commission(CommissioningMode::NetworkSteering { touchlink: false }),
        ]
    );
}

#[test]
fn hue_preset_steers_with_touchlink_on_its_endpoint() {
    let mut rig = Rig::with_config(DeviceConfig::hue_plug(), &[]);
    rig.join();
    assert_eq!(
        rig.mesh.count(&MeshCall::Commission(CommissioningMode::NetworkSteering {
            touchlink: true
        })),
        1
    );

    rig.remote_on_off(true);
    rig.settle();
    assert_eq!(rig.position(), ServoPosition::Target);
    // 205 + 180 * 819 / 180
    assert_eq!(rig.pwm.last(), Some(1024));
}

#[test]
fn reboot_with_error_fails_for_good() {
    let mut rig = Rig::new(&[]);
    rig.signal(MeshSignal::SkipStartup, Ok(()));
    rig.signal(MeshSignal::Reboot, Err(0x103));
    assert_eq!(rig.phase(), Some(CommissioningPhase::Failed));
    assert_eq!(rig.pattern_now(), IndicatorPattern::RedBlink);
    assert_eq!(rig.log.count(|e| *e == AppEvent::StackFailed { code: 0x103 }), 1);

    rig.mesh.clear();
    rig.signal(MeshSignal::SkipStartup, Ok(()));
    rig.signal(MeshSignal::FirstStart, Ok(()));
    assert_eq!(rig.phase(), Some(CommissioningPhase::Failed));
    assert!(rig.mesh.calls().is_empty());
}

#[test]
fn failed_stack_still_lets_the_button_drive_the_servo() {
    let mut rig = Rig::new(&[(300, 450)]);
    rig.signal(MeshSignal::FirstStart, Err(-1));
    rig.run_until(600);
    assert_eq!(rig.position(), ServoPosition::Target);
    assert_eq!(rig.mesh.count_where(|c| matches!(c, MeshCall::Report(_))), 0);
}

#[test]
fn leave_goes_back_to_blinking_and_stops_reports() {
    let mut rig = Rig::new(&[(1000, 1100)]);
    rig.join();
    rig.signal(MeshSignal::Leave, Ok(()));
    assert_eq!(rig.phase(), Some(CommissioningPhase::Initializing));
    assert_eq!(rig.agent.network(), None);
    assert_eq!(rig.pattern_now(), IndicatorPattern::BlueBlink);

    rig.run_until(1300);
    assert_eq!(rig.position(), ServoPosition::Target);
    assert_eq!(rig.mesh.count_where(|c| matches!(c, MeshCall::Report(_))), 0);
}

#[test]
fn rejoin_after_leave_steers_again() {
    let mut rig = Rig::new(&[]);
    rig.join();
    rig.signal(MeshSignal::Leave, Ok(()));
    rig.signal(MeshSignal::SkipStartup, Ok(()));
    rig.signal(MeshSignal::Reboot, Ok(()));
    rig.signal(MeshSignal::SteeringComplete, Ok(()));
    assert_eq!(rig.phase(), Some(CommissioningPhase::Joined));
    assert_eq!(rig.log.count(|e| matches!(e, AppEvent::Joined(_))), 2);
}

#[test]
fn remote_writes_for_other_endpoints_are_ignored() {
    let mut rig = Rig::with_config(
        DeviceConfig {
            endpoint_id: 11,
            ..DeviceConfig::default()
        },
        &[],
    );
    rig.join();
    let write = servo_router::app::network::AttributeWrite {
        endpoint: 10,
        cluster: servo_router::zcl::CLUSTER_ON_OFF,
        attribute: servo_router::zcl::ATTR_ON_OFF,
        data_type: servo_router::zcl::TYPE_BOOL,
        value: &[1],
    };
    assert_eq!(rig.agent.handle_attribute_write(&write), None);
}

#[test]
fn every_remote_write_commits_its_value() {
    let mut rig = Rig::new(&[]);
    rig.join();
    for on in [true, true, false, true, false, false] {
        rig.remote_on_off(on);
        rig.step();
        assert_eq!(rig.position() == ServoPosition::Target, on);
    }
}

#[test]
fn write_burst_ahead_of_the_owner_ends_on_the_last_value() {
    let mut rig = Rig::new(&[]);
    rig.join();
    rig.run_until(500);

    // The stack task outranks the owner, so a burst lands before any is handled.
    for _ in 0..12 {
        rig.remote_on_off(true);
    }
    rig.remote_on_off(false);
    assert_eq!(rig.channel.len(), 1);

    rig.step();
    assert_eq!(rig.position(), ServoPosition::Rest);
    assert_eq!(rig.timer.armed(), None);
    assert_eq!(rig.pwm.committed(), [rig.rest_duty(), rig.rest_duty()]);
}

#[test]
fn refused_reset_leaves_the_button_working() {
    let mut rig = Rig::new(&[(1000, 4100), (5000, 5200)]);
    rig.mesh.set_stopped(true);
    rig.signal(MeshSignal::SkipStartup, Ok(()));
    rig.signal(MeshSignal::FirstStart, Err(-1));

    rig.run_until(6000);
    assert_eq!(rig.mesh.count(&MeshCall::FactoryReset), 1);
    assert_eq!(rig.log.count(|e| *e == AppEvent::FactoryResetRefused), 1);
    // The short press after the refused reset still drives the servo.
    assert_eq!(rig.position(), ServoPosition::Target);
}
