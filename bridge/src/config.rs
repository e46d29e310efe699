//! Build-time configuration. Behaviour variants are picked with cargo
//! features, everything else is a constant here.

use crate::clock::{Generator, USB_HZ};
use crate::disk::BLOCK_SIZE;
use crate::port::{Function, Pin, PA04, PA05, PA06, PA07, PA17, PA24, PA25};
use crate::spi::{ErrorPolicy, Outbound, PreloadPolicy, SpiConfig, SpiPads};
use crate::usb::{DmaBuffer, RootHubPort, UsbPins};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Speed {
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Os {
    None,
}

// USB stack ABI

pub const ROOT_HUB_PORT: RootHubPort = RootHubPort(0);
/// Whatever the controller does by default, which on SAMD21 is full speed.
pub const MAX_SPEED: Speed = Speed::Full;
pub const MCU: &str = "SAMD21";
pub const OS: Os = Os::None;
pub const DEBUG: u8 = 0;
pub const DEVICE_ENABLED: bool = true;
pub const ENDPOINT0_SIZE: u8 = 64;

pub const MSC_INSTANCES: u8 = 1;
pub const CDC_INSTANCES: u8 = 0;
pub const HID_INSTANCES: u8 = 0;
pub const MIDI_INSTANCES: u8 = 0;
pub const VENDOR_INSTANCES: u8 = 0;

pub const MSC_EP_BUFSIZE: usize = 512;
/// DMA buffers stay in the default SRAM section.
pub const MEM_SECTION: Option<&str> = None;
pub const MEM_ALIGN: usize = 4;

pub const MSC_PACKET_SIZE: u16 = 64;
pub const MSC_MAX_LUN: u8 = 0;

// Identity

pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;
pub const MANUFACTURER: &str = "cdz";
pub const PRODUCT: &str = "cdz SPI bridge";
pub const SERIAL_NUMBER: &str = "0001";

pub const SCSI_VENDOR: &[u8; 8] = b"cdz     ";
pub const SCSI_PRODUCT: &[u8; 16] = b"SPI bridge disk ";
pub const SCSI_REVISION: &[u8; 4] = b"0001";

// Board

pub const CPU_HZ: u32 = 48_000_000;
pub const FLASH_WAIT_STATES: u8 = 1;
/// Single point that decides where the USB clock comes from.
pub const USB_GENERATOR: Generator = Generator(0);
pub const SPI_GENERATOR: Generator = Generator(0);

pub const USB_PINS: UsbPins = UsbPins { dm: PA24, dp: PA25 };
pub const LED_PIN: Pin = PA17;

pub const SPI: SpiConfig = SpiConfig::SUBORDINATE;
pub const SPI_PADS: SpiPads = SpiPads {
    pads: [PA04, PA05, PA06, PA07],
    function: Function::D,
};

pub const PRELOAD_BYTE: u8 = b'b';

pub const OUTBOUND: Outbound = Outbound {
    byte: PRELOAD_BYTE,
    policy: if cfg!(feature = "gate-preload") {
        PreloadPolicy::GateOnDre
    } else {
        PreloadPolicy::Unchecked
    },
    errors: if cfg!(feature = "clear-spi-errors") {
        ErrorPolicy::Clear
    } else {
        ErrorPolicy::Ignore
    },
};

pub const RAM_DISK_BLOCKS: usize = 16;

const _: () = assert!(DEVICE_ENABLED);
const _: () = assert!(matches!(ENDPOINT0_SIZE, 8 | 16 | 32 | 64));
const _: () = assert!(MSC_EP_BUFSIZE > 0 && MSC_EP_BUFSIZE % BLOCK_SIZE == 0);
const _: () = assert!(MSC_INSTANCES == 1);
const _: () = assert!(
    CDC_INSTANCES + HID_INSTANCES + MIDI_INSTANCES + VENDOR_INSTANCES == 0
);
const _: () = assert!(core::mem::align_of::<DmaBuffer<MSC_EP_BUFSIZE>>() >= MEM_ALIGN);
const _: () = assert!(MEM_SECTION.is_none());
const _: () = assert!(matches!(MSC_PACKET_SIZE, 8 | 16 | 32 | 64));
const _: () = assert!(FLASH_WAIT_STATES >= 1);
const _: () = assert!(SPI.roles().is_ok());
const _: () = assert!(CPU_HZ == USB_HZ);
const _: () = assert!(RAM_DISK_BLOCKS > 0);
