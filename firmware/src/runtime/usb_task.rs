use embassy_futures::join::join;
use embassy_futures::select::{Either3, select3};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::driver::{Driver, EndpointError};

use super::{INPUT_QUEUE, OUTPUT_QUEUE, USB_STORAGE};
use crate::console::{self, InputFrame, OutputLine};
use crate::usb::{self, UsbDeviceStrings};

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

const PACKET_LEN: usize = usb::MAX_PACKET_SIZE as usize;

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let (mut device, port) = usb::build(driver, storage, UsbDeviceStrings::default());
    let usb::ConsolePort {
        sender,
        receiver,
        control,
    } = port;

    join(device.run(), run_console_interface(sender, receiver, control)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

async fn run_console_interface<D>(
    mut sender: Sender<'static, D>,
    mut receiver: Receiver<'static, D>,
    control: ControlChanged<'static>,
) -> !
where
    D: Driver<'static>,
{
    let input = INPUT_QUEUE.sender();
    let output = OUTPUT_QUEUE.receiver();
    let mut ingress = [0u8; PACKET_LEN];
    let mut pending_tx: Option<OutputLine> = None;

    loop {
        join(receiver.wait_connection(), sender.wait_connection()).await;
        wait_for_dtr(&control, &mut sender).await;

        // Anything queued while detached is stale.
        while output.try_receive().is_ok() {}
        pending_tx = None;
        console::set_attached(true);
        defmt::info!("usb: console connected");

        loop {
            match select3(
                receiver.read_packet(&mut ingress),
                async {
                    let line = match pending_tx.take() {
                        Some(line) => line,
                        None => output.receive().await,
                    };
                    match write_line(&mut sender, line.as_bytes()).await {
                        Ok(()) => Ok(()),
                        Err(err) => {
                            pending_tx = Some(line);
                            Err(err)
                        }
                    }
                },
                control.control_changed(),
            )
            .await
            {
                Either3::First(Ok(0)) | Either3::Second(Ok(())) => {}
                Either3::First(Ok(count)) => {
                    let mut frame = InputFrame::new();
                    if frame.extend_from_slice(&ingress[..count]).is_err() {
                        defmt::warn!("usb: dropping console frame len={} (overflow)", count);
                        continue;
                    }

                    input.send(frame).await;
                }
                Either3::First(Err(EndpointError::Disabled))
                | Either3::Second(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: console interface disabled");
                    break;
                }
                Either3::First(Err(_)) => {
                    defmt::warn!("usb: console read error");
                }
                Either3::Second(Err(_)) => {
                    defmt::warn!("usb: console write error");
                }
                Either3::Third(()) => {
                    if !sender.dtr() {
                        defmt::warn!("usb: console host dropped DTR");
                        break;
                    }
                }
            }
        }

        console::set_attached(false);
    }
}

/// Writes `bytes` as a packet sequence, closing full-size tails with a
/// zero-length packet.
async fn write_line<D>(sender: &mut Sender<'static, D>, bytes: &[u8]) -> Result<(), EndpointError>
where
    D: Driver<'static>,
{
    for chunk in bytes.chunks(PACKET_LEN) {
        sender.write_packet(chunk).await?;
    }
    if bytes.len() % PACKET_LEN == 0 {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}

async fn wait_for_dtr<D>(control: &ControlChanged<'static>, sender: &mut Sender<'static, D>)
where
    D: Driver<'static>,
{
    while !sender.dtr() {
        control.control_changed().await;
    }
}
