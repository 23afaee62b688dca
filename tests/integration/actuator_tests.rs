//! Actuator owner pipeline: intents in, committed duties and timer
//! armings out.

use servo_router::app::actuator::{
    ActuatorCommand, ActuatorSettings, ActuatorStateMachine, CommandSource, Intent, ServoPosition,
};
use servo_router::app::events::AppEvent;
use servo_router::app::service::{self, ActuatorService, IntentChannel, INTENT_DEPTH};
use servo_router::app::state::PositionCell;
use servo_router::config::DeviceConfig;

use crate::mock_hw::{EventLog, ManualTimer, RecordingPwm, VirtualClock};

struct Bench {
    clock: VirtualClock,
    pwm: RecordingPwm,
    timer: ManualTimer,
    log: EventLog,
    channel: IntentChannel,
}

impl Bench {
    fn new() -> Self {
        let clock = VirtualClock::default();
        Self {
            timer: ManualTimer::new(clock.clone()),
            clock,
            pwm: RecordingPwm::default(),
            log: EventLog::default(),
            channel: IntentChannel::new(),
        }
    }

    fn service<'a>(
        &self,
        config: &DeviceConfig,
        cell: &'a PositionCell,
    ) -> ActuatorService<'a, RecordingPwm, ManualTimer> {
        let mut svc = ActuatorService::new(
            ActuatorStateMachine::new(
                self.pwm.clone(),
                self.timer.clone(),
                ActuatorSettings::from(config),
            ),
            cell,
        );
        svc.home();
        svc
    }
}

#[test]
fn home_drives_rest_duty_once() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let _svc = bench.service(&DeviceConfig::default(), &cell);
    // 205 + 20 * 819 / 180
    assert_eq!(bench.pwm.committed(), [296]);
    assert_eq!(bench.timer.starts(), 0);
}

#[test]
fn play_drives_target_and_arms_for_configured_delay() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let mut svc = bench.service(&DeviceConfig::default(), &cell);
    bench.clock.advance(500);

    let mut log = bench.log.clone();
    svc.handle(Intent::remote(ActuatorCommand::Play), &mut log);

    assert_eq!(cell.load(), ServoPosition::Target);
    assert_eq!(bench.pwm.last(), Some(933));
    assert_eq!(bench.timer.armed().map(|(_, at)| at), Some(2500));
}

#[test]
fn expiry_returns_to_rest_after_delay() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let mut svc = bench.service(&DeviceConfig::default(), &cell);
    let mut log = bench.log.clone();

    svc.handle(Intent::remote(ActuatorCommand::Play), &mut log);
    bench.clock.advance(1999);
    assert_eq!(bench.timer.fire_due(), None);
    bench.clock.advance(1);
    let token = bench.timer.fire_due().expect("expired");

    assert!(service::post(&bench.channel, Intent::auto_return(token)));
    assert_eq!(svc.drain(&bench.channel, &mut log), 1);
    assert_eq!(cell.load(), ServoPosition::Rest);
    assert!(!svc.machine().is_armed());
}

#[test]
fn repeated_play_restarts_instead_of_stacking() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let mut svc = bench.service(&DeviceConfig::default(), &cell);
    let mut log = bench.log.clone();

    for _ in 0..3 {
        svc.handle(Intent::remote(ActuatorCommand::Play), &mut log);
        assert_eq!(bench.timer.instances(), 1);
        bench.clock.advance(1500);
    }
    // Last play at 3000, so expiry is due at 5000, not 2000.
    assert_eq!(bench.timer.armed().map(|(_, at)| at), Some(5000));
    assert_eq!(bench.timer.starts(), 3);
}

#[test]
fn expiry_from_a_replaced_arming_is_dropped() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let mut svc = bench.service(&DeviceConfig::default(), &cell);
    let mut log = bench.log.clone();

    svc.handle(Intent::remote(ActuatorCommand::Play), &mut log);
    let first = svc.machine().armed_token().expect("armed");
    svc.handle(Intent::remote(ActuatorCommand::Play), &mut log);

    assert_eq!(svc.handle(Intent::auto_return(first), &mut log), None);
    assert_eq!(cell.load(), ServoPosition::Target);
    assert!(svc.machine().is_armed());
}

#[test]
fn toggle_alternates_and_rest_is_idempotent() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let mut svc = bench.service(&DeviceConfig::default(), &cell);
    let mut log = bench.log.clone();

    svc.handle(Intent::button_toggle(), &mut log);
    assert_eq!(cell.load(), ServoPosition::Target);
    svc.handle(Intent::button_toggle(), &mut log);
    assert_eq!(cell.load(), ServoPosition::Rest);
    svc.handle(Intent::remote(ActuatorCommand::Rest), &mut log);
    assert_eq!(cell.load(), ServoPosition::Rest);
    assert_eq!(bench.timer.armed(), None);

    let events = log.events();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[2],
        AppEvent::PositionChanged {
            from: ServoPosition::Rest,
            to: ServoPosition::Rest,
            source: CommandSource::Remote,
        }
    );
}

#[test]
fn inverted_servo_uses_swapped_duty_endpoints() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let config = DeviceConfig {
        duty_at_0_deg: 1024,
        duty_at_180_deg: 205,
        ..DeviceConfig::default()
    };
    let mut svc = bench.service(&config, &cell);
    let mut log = bench.log.clone();
    svc.handle(Intent::remote(ActuatorCommand::Play), &mut log);

    // 1024 - 20 * 819 / 180 and 1024 - 160 * 819 / 180, truncated.
    assert_eq!(bench.pwm.committed(), [933, 296]);
}

#[test]
fn channel_holds_eight_intents_in_order() {
    let bench = Bench::new();
    let cell = PositionCell::new();
    let mut svc = bench.service(&DeviceConfig::default(), &cell);
    let mut log = bench.log.clone();

    for _ in 0..INTENT_DEPTH {
        assert!(service::post(&bench.channel, Intent::button_toggle()));
    }
    assert!(!service::post(&bench.channel, Intent::button_toggle()));

    assert_eq!(svc.drain(&bench.channel, &mut log), INTENT_DEPTH);
    // An even number of toggles lands back at rest.
    assert_eq!(cell.load(), ServoPosition::Rest);
    assert_eq!(svc.handled(), INTENT_DEPTH as u32);
}
