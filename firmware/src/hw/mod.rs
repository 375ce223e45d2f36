//! GPIO rendering of pulse notifications.

use embassy_stm32::gpio::Output;
use trigger_core::pulse::{OutputDriver, StatusColor};

use crate::config::BOARD_VARIANT;

/// Two-channel status LED (green/blue legs of an RGB LED).
pub struct StatusLed<'d> {
    green: Output<'d>,
    blue: Output<'d>,
}

impl<'d> StatusLed<'d> {
    pub fn new(green: Output<'d>, blue: Output<'d>) -> Self {
        Self { green, blue }
    }

    pub fn show(&mut self, color: StatusColor) {
        match color {
            StatusColor::Green => {
                self.blue.set_low();
                self.green.set_high();
            }
            StatusColor::Blue => {
                self.green.set_low();
                self.blue.set_high();
            }
        }
    }
}

/// Camera trigger lines, the pulse LED and the status LED.
pub struct HardwareOutputs<'d> {
    camera_1: Output<'d>,
    camera_2: Output<'d>,
    pulse_led: Output<'d>,
    status: Option<StatusLed<'d>>,
}

impl<'d> HardwareOutputs<'d> {
    /// Outputs start LOW; the status LED shows idle.
    pub fn new(
        camera_1: Output<'d>,
        camera_2: Output<'d>,
        pulse_led: Output<'d>,
        status: StatusLed<'d>,
    ) -> Self {
        let mut outputs = Self {
            camera_1,
            camera_2,
            pulse_led,
            status: BOARD_VARIANT.has_status_led().then_some(status),
        };
        outputs.set_level(false);
        outputs.on_run_state_changed(false);
        outputs
    }

    fn set_level(&mut self, high: bool) {
        if high {
            self.camera_1.set_high();
            self.camera_2.set_high();
            self.pulse_led.set_high();
        } else {
            self.camera_1.set_low();
            self.camera_2.set_low();
            self.pulse_led.set_low();
        }
    }
}

impl OutputDriver for HardwareOutputs<'_> {
    fn on_assert(&mut self, _pulse_index: u32, _elapsed_ms: u32) {
        self.set_level(true);
    }

    fn on_deassert(&mut self) {
        self.set_level(false);
    }

    fn on_run_state_changed(&mut self, running: bool) {
        if let Some(status) = self.status.as_mut() {
            status.show(StatusColor::for_run_state(running));
        }
    }
}
