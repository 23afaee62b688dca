//! Whole-device test rig on a virtual clock.
//!
//! Wires the real actuator service, network agent, attribute reporter,
//! button recognizer and indicator to the mocks in `mock_hw`, and steps
//! them the way the firmware tasks do: button every 20 ms, indicator every
//! 100 ms, actuator owner whenever something is queued.

use servo_router::app::actuator::{ActuatorSettings, ActuatorStateMachine, Intent, ServoPosition};
use servo_router::app::commands::{self, Dispatched};
use servo_router::app::network::{
    AttributeReporter, AttributeWrite, CommissioningPhase, MeshSignal, NetworkAgent,
};
use servo_router::app::service::{self, ActuatorService, IntentChannel};
use servo_router::app::state::SharedState;
use servo_router::config::DeviceConfig;
use servo_router::drivers::button::{ButtonRecognizer, ButtonTiming};
use servo_router::drivers::indicator::{Indicator, IndicatorPattern, Rgb};
use servo_router::zcl;

use crate::mock_hw::{
    EventLog, ManualTimer, MockMesh, RecordingPixel, RecordingPwm, ScriptedLine, VirtualClock,
};

pub const POLL_MS: u64 = 20;
pub const TICK_MS: u64 = 100;

pub struct Rig {
    pub config: DeviceConfig,
    pub clock: VirtualClock,
    pub state: &'static SharedState,
    pub channel: &'static IntentChannel,
    pub pwm: RecordingPwm,
    pub timer: ManualTimer,
    pub mesh: MockMesh,
    pub pixel: RecordingPixel,
    pub log: EventLog,
    pub service: ActuatorService<'static, RecordingPwm, ManualTimer>,
    pub agent: NetworkAgent<'static, MockMesh>,
    reporter: AttributeReporter<'static, MockMesh>,
    indicator: Indicator<RecordingPixel>,
    button: ButtonRecognizer<'static, ScriptedLine, VirtualClock, VirtualClock>,
    next_tick_ms: u64,
    patterns: Vec<(u64, IndicatorPattern)>,
}

#[allow(dead_code)]
impl Rig {
    /// Boot with `presses` scripted on the button line. The servo is homed;
    /// no stack signal has arrived yet.
    pub fn new(presses: &[(u64, u64)]) -> Self {
        Self::with_config(DeviceConfig::default(), presses)
    }

    pub fn with_config(config: DeviceConfig, presses: &[(u64, u64)]) -> Self {
        let clock = VirtualClock::default();
        let state: &'static SharedState = Box::leak(Box::new(SharedState::new()));
        let channel: &'static IntentChannel = Box::leak(Box::new(IntentChannel::new()));
        let pwm = RecordingPwm::default();
        let timer = ManualTimer::new(clock.clone());
        let mesh = MockMesh::default();
        let pixel = RecordingPixel::default();

        let mut service = ActuatorService::new(
            ActuatorStateMachine::new(pwm.clone(), timer.clone(), ActuatorSettings::from(&config)),
            &state.position,
        );
        service.home();

        let agent = NetworkAgent::new(
            mesh.clone(),
            &state.commissioning,
            config.endpoint_id,
            config.touchlink_target,
        );
        let reporter = AttributeReporter::new(mesh.clone(), &state.commissioning, config.endpoint_id);
        let button = ButtonRecognizer::new(
            ScriptedLine::new(clock.clone(), presses),
            clock.clone(),
            clock.clone(),
            &state.button,
            ButtonTiming::from(&config),
        );

        Self {
            config,
            clock,
            state,
            channel,
            pwm,
            timer,
            mesh,
            pixel: pixel.clone(),
            log: EventLog::default(),
            service,
            agent,
            reporter,
            indicator: Indicator::new(pixel),
            button,
            next_tick_ms: 0,
            patterns: Vec::new(),
        }
    }

    // ── Stimuli ───────────────────────────────────────────────

    pub fn signal(&mut self, signal: MeshSignal, status: Result<(), i32>) {
        let mut log = self.log.clone();
        self.agent.handle_signal(signal, status, &mut log);
    }

    /// Skip-startup then first-start, both ok: the node is steering.
    pub fn boot_stack(&mut self) {
        self.signal(MeshSignal::SkipStartup, Ok(()));
        self.signal(MeshSignal::FirstStart, Ok(()));
    }

    pub fn join(&mut self) {
        self.boot_stack();
        self.signal(MeshSignal::SteeringComplete, Ok(()));
    }

    /// Deliver an on/off write from the hub the way the stack callback does.
    pub fn remote_on_off(&mut self, on: bool) {
        let value = [u8::from(on)];
        let write = AttributeWrite {
            endpoint: self.config.endpoint_id,
            cluster: zcl::CLUSTER_ON_OFF,
            attribute: zcl::ATTR_ON_OFF,
            data_type: zcl::TYPE_BOOL,
            value: &value,
        };
        if let Some(cmd) = self.agent.handle_attribute_write(&write) {
            service::post(self.channel, Intent::remote(cmd));
        }
    }

    pub fn post(&mut self, intent: Intent) {
        assert!(service::post(self.channel, intent), "intent channel full");
    }

    // ── Time ──────────────────────────────────────────────────

    /// One 20 ms button cadence, with everything it can trigger.
    pub fn step(&mut self) {
        if let Some(event) = self.button.poll() {
            let mut mesh = self.mesh.clone();
            let mut log = self.log.clone();
            if commands::dispatch(event, self.channel, &mut mesh, &mut log)
                == Dispatched::ResetRefused
            {
                self.button.rearm();
            }
        }
        if let Some(token) = self.timer.fire_due() {
            service::post(self.channel, Intent::auto_return(token));
        }
        self.settle();
        while self.clock.now() >= self.next_tick_ms {
            let pattern = IndicatorPattern::observe(self.state);
            self.indicator.tick(pattern);
            self.patterns.push((self.next_tick_ms, pattern));
            self.next_tick_ms += TICK_MS;
        }
        self.clock.advance(POLL_MS);
    }

    /// Step until the clock reaches `t_ms`.
    pub fn run_until(&mut self, t_ms: u64) {
        while self.clock.now() < t_ms {
            self.step();
        }
    }

    pub fn run_for(&mut self, ms: u64) {
        let until = self.clock.now() + ms;
        self.run_until(until);
    }

    /// Let the actuator owner handle everything queued.
    pub fn settle(&mut self) -> usize {
        let mut sink = (self.log.clone(), &mut self.reporter);
        self.service.drain(self.channel, &mut sink)
    }

    // ── Observations ──────────────────────────────────────────

    pub fn position(&self) -> ServoPosition {
        self.state.position.load()
    }

    pub fn phase(&self) -> Option<CommissioningPhase> {
        self.state.commissioning.load()
    }

    pub fn pattern_now(&self) -> IndicatorPattern {
        IndicatorPattern::observe(self.state)
    }

    /// Patterns rendered so far, stamped with their tick time.
    pub fn patterns(&self) -> &[(u64, IndicatorPattern)] {
        &self.patterns
    }

    pub fn colours(&self) -> Vec<Rgb> {
        self.pixel.shown()
    }

    pub fn rest_duty(&self) -> u32 {
        ActuatorSettings::from(&self.config)
            .duty
            .duty_for(self.config.rest_angle_deg)
    }

    pub fn target_duty(&self) -> u32 {
        ActuatorSettings::from(&self.config)
            .duty
            .duty_for(self.config.target_angle_deg)
    }
}
