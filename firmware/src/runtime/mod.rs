use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_sync::channel::Channel;
use static_cell::StaticCell;
use trigger_core::pulse::PulseTrainState;

use crate::config::BOARD_VARIANT;
use crate::console::{InputQueue, OutputQueue};
use crate::hw::{HardwareOutputs, StatusLed};
use crate::telemetry::TelemetryRecorder;
use crate::train::{NotifyQueue, TrainCell, new_train_cell};
use crate::usb;

mod console_task;
mod pulse_task;
mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static TRAIN: TrainCell =
    new_train_cell(PulseTrainState::new(BOARD_VARIANT.default_config()));
pub(super) static NOTIFY_QUEUE: NotifyQueue = Channel::new();
pub(super) static INPUT_QUEUE: InputQueue = Channel::new();
pub(super) static OUTPUT_QUEUE: OutputQueue = Channel::new();
pub(super) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA4,
        PA5,
        PA6,
        PB0,
        PB1,
        USB,
        PA11,
        PA12,
        ..
    } = hal::init(config);

    let outputs = HardwareOutputs::new(
        Output::new(PA4, Level::Low, Speed::VeryHigh),
        Output::new(PA5, Level::Low, Speed::VeryHigh),
        Output::new(PA6, Level::Low, Speed::Low),
        StatusLed::new(
            Output::new(PB0, Level::Low, Speed::Low),
            Output::new(PB1, Level::Low, Speed::Low),
        ),
    );

    defmt::info!(
        "trigger box up: variant={} period={}ms",
        BOARD_VARIANT.tag(),
        BOARD_VARIANT.default_config().period_ms
    );

    spawner
        .spawn(pulse_task::run(outputs, TelemetryRecorder::new()))
        .expect("failed to spawn pulse task");

    spawner
        .spawn(usb_task::run(USB, PA12, PA11))
        .expect("failed to spawn USB task");

    spawner
        .spawn(console_task::run())
        .expect("failed to spawn console task");

    core::future::pending::<()>().await;
}
