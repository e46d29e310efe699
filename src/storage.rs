//! The USB device stack: `usb-device` plus a Bulk-Only SCSI class, serving
//! blocks out of a RAM disk.

use bridge::config::{
    ENDPOINT0_SIZE, MANUFACTURER, MSC_MAX_LUN, MSC_PACKET_SIZE, PRODUCT, RAM_DISK_BLOCKS,
    SCSI_PRODUCT, SCSI_REVISION, SCSI_VENDOR, SERIAL_NUMBER, USB_PID, USB_VID,
};
use bridge::disk::RamDisk;
use bridge::scsi::{self, Outcome, Sense, Session};
use bridge::usb::{IrqLatch, UsbStack};
use bridge::Error;
use hal::hal::usb::UsbBus;
use usb_device::bus::UsbBusAllocator;
use usb_device::prelude::*;
use usb_device::UsbError;
use usbd_storage::subclass::scsi::{Scsi, ScsiCommand};
use usbd_storage::subclass::Command;
use usbd_storage::transport::bbb::BulkOnly;
use usbd_storage::transport::TransportError;

use crate::board::UsbLine;

type Class = Scsi<BulkOnly<'static, UsbBus, &'static mut [u8]>>;
type Disk = &'static mut RamDisk<RAM_DISK_BLOCKS>;

/// Queues a fixed response and passes the command, or fails it if the
/// response could not be queued.
macro_rules! reply {
    ($session:ident, $command:ident, $data:expr) => {{
        match $command.try_write_data_all($data) {
            Ok(()) => {
                $command.pass();
            }
            Err(_) => {
                $session.reject(Sense::DATA_PHASE_ERROR);
                $command.fail();
            }
        }
    }};
}

/// Ends the command unless the transfer is still waiting on the endpoint.
macro_rules! settle {
    ($command:ident, $outcome:expr) => {
        match $outcome {
            Outcome::Pending => (),
            Outcome::Passed => {
                $command.pass();
            }
            Outcome::Failed => {
                $command.fail();
            }
        }
    };
}

pub struct MassStorage {
    device: UsbDevice<'static, UsbBus>,
    class: Class,
    session: Session<Disk>,
    latch: &'static IrqLatch<UsbLine>,
}

impl MassStorage {
    pub fn new(
        alloc: &'static UsbBusAllocator<UsbBus>,
        transport_buf: &'static mut [u8],
        disk: Disk,
        latch: &'static IrqLatch<UsbLine>,
    ) -> Result<Self, Error> {
        let class = Scsi::new(alloc, MSC_PACKET_SIZE, MSC_MAX_LUN, transport_buf)
            .map_err(|_| Error::StackInit)?;

        let device = UsbDeviceBuilder::new(alloc, UsbVidPid(USB_VID, USB_PID))
            .strings(&[StringDescriptors::default()
                .manufacturer(MANUFACTURER)
                .product(PRODUCT)
                .serial_number(SERIAL_NUMBER)])
            .map_err(|_| Error::StackInit)?
            .max_packet_size_0(ENDPOINT0_SIZE)
            .map_err(|_| Error::StackInit)?
            .device_class(0x00)
            .build();

        Ok(Self {
            device,
            class,
            session: Session::new(disk),
            latch,
        })
    }
}

impl UsbStack for MassStorage {
    fn task(&mut self) {
        let latch = self.latch;
        latch.service(|| {
            let polled = self.device.poll(&mut [&mut self.class]);

            // a bus reset or suspend abandons whatever transfer was in flight
            match self.device.state() {
                UsbDeviceState::Default | UsbDeviceState::Suspend => self.session.reset(),
                _ => (),
            }

            if polled {
                let session = &mut self.session;
                let _ = self.class.poll(|command| serve(session, command));
            }
        })
    }
}

fn serve(
    session: &mut Session<Disk>,
    mut command: Command<ScsiCommand, Scsi<BulkOnly<UsbBus, &mut [u8]>>>,
) {
    let blocks = session.block_count();
    match command.kind {
        ScsiCommand::TestUnitReady { .. } => {
            command.pass();
        }
        ScsiCommand::Inquiry { .. } => reply!(
            session,
            command,
            &scsi::inquiry(SCSI_VENDOR, SCSI_PRODUCT, SCSI_REVISION)
        ),
        ScsiCommand::RequestSense { .. } => {
            let sense = session.take_sense().bytes();
            reply!(session, command, &sense)
        }
        ScsiCommand::ReadCapacity10 { .. } => {
            reply!(session, command, &scsi::read_capacity_10(blocks))
        }
        ScsiCommand::ReadCapacity16 { .. } => {
            reply!(session, command, &scsi::read_capacity_16(blocks))
        }
        ScsiCommand::ReadFormatCapacities { .. } => {
            reply!(session, command, &scsi::read_format_capacities(blocks))
        }
        ScsiCommand::ModeSense6 { .. } => reply!(session, command, &scsi::MODE_SENSE_6),
        ScsiCommand::ModeSense10 { .. } => reply!(session, command, &scsi::MODE_SENSE_10),
        ScsiCommand::Read { lba, len } => {
            let outcome = session.read(narrow(lba), narrow(len), |chunk| {
                not_yet(command.write_data(chunk))
            });
            settle!(command, outcome)
        }
        ScsiCommand::Write { lba, len } => {
            let outcome = session.write(narrow(lba), narrow(len), |buf| {
                not_yet(command.read_data(buf))
            });
            settle!(command, outcome)
        }
        _ => {
            session.reject(Sense::INVALID_COMMAND);
            command.fail();
        }
    }
}

/// A full or empty endpoint only means the transfer has to wait for the
/// next poll. Everything else ends the command.
fn not_yet<E: core::fmt::Debug>(result: Result<usize, TransportError<E>>) -> Result<usize, TransportError<E>> {
    match result {
        Err(TransportError::Usb(UsbError::WouldBlock)) => Ok(0),
        other => other,
    }
}

/// Addresses past `u32::MAX` are out of range for any disk this serves.
fn narrow<T>(value: T) -> u32
where
    u32: TryFrom<T>,
{
    u32::try_from(value).unwrap_or(u32::MAX)
}
