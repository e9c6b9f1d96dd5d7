//! Soft access-point lifecycle and supervision.

use embassy_net::Stack;
use embassy_time::Timer;
use esp_radio::wifi::{ApConfig, AuthMethod, ModeConfig, WifiController};
use log::{info, warn};

use eggtimer_core::{
    clock::Clock,
    supervise::{ApDirective, ApSupervisor},
};
use eggtimer_hal_esp32s3::clock::BoardClock;

use super::{
    AP_ENSURE_EVERY_MS, AP_LOG_EVERY_MS, AP_PASSPHRASE, AP_SETTLE_MS, AP_SSID, AP_START_POLL_MS,
    AP_START_POLLS,
};

/// Owns the radio controller and keeps the soft AP on the air.
///
/// Every radio fault ends here as a log line; the event loop must never
/// see an error from this module.
pub(super) struct AccessPoint<'d> {
    controller: WifiController<'d>,
    stack: Stack<'d>,
    supervisor: ApSupervisor,
    clock: BoardClock,
}

impl<'d> AccessPoint<'d> {
    pub(super) fn new(controller: WifiController<'d>, stack: Stack<'d>) -> Self {
        let clock = BoardClock::new();
        Self {
            controller,
            stack,
            supervisor: ApSupervisor::new(clock.now(), AP_ENSURE_EVERY_MS, AP_LOG_EVERY_MS),
            clock,
        }
    }

    pub(super) fn is_active(&mut self) -> bool {
        self.controller.is_started().unwrap_or(false)
    }

    /// Full (re)start: stop a half-up radio, settle, configure, start, then
    /// poll until the driver confirms. Callable as often as the supervisor
    /// wants; failures are logged and retried on the next ensure window.
    pub(super) async fn start(&mut self) {
        if self.is_active() {
            if let Err(err) = self.controller.stop_async().await {
                warn!("ap stop failed: {:?}", err);
            }
        }
        Timer::after_millis(AP_SETTLE_MS).await;

        let mode = ModeConfig::Ap(
            ApConfig::default()
                .with_ssid(AP_SSID.into())
                .with_password(AP_PASSPHRASE.into())
                .with_auth_method(AuthMethod::Wpa2Personal),
        );
        if let Err(err) = self.controller.set_config(&mode) {
            warn!("ap mode config failed: {:?}", err);
            return;
        }
        if let Err(err) = self.controller.start_async().await {
            warn!("ap start failed: {:?}", err);
            return;
        }

        for _ in 0..AP_START_POLLS {
            if self.is_active() {
                info!("ap started: ssid={}", AP_SSID);
                return;
            }
            Timer::after_millis(AP_START_POLL_MS).await;
        }
        warn!("ap start not confirmed after {} polls", AP_START_POLLS);
    }

    /// One supervision slot per loop iteration: restart when the ensure
    /// window finds the radio down, and emit the periodic status line.
    pub(super) async fn supervise(&mut self) {
        let now = self.clock.now();
        let active = self.is_active();
        if self.supervisor.poll(now, active) == ApDirective::Restart {
            warn!("ap inactive; restarting");
            self.start().await;
        }
        if self.supervisor.log_due(self.clock.now()) {
            self.log_status();
        }
    }

    fn log_status(&mut self) {
        let address = self.stack.config_v4().map(|config| config.address);
        info!(
            "ap status: started={} link_up={} addr={:?}",
            self.is_active(),
            self.stack.is_link_up(),
            address
        );
    }
}
