//! SCSI block commands on top of a [`BlockDevice`].
//!
//! The transport hands commands over one at a time and may call back with the
//! same READ or WRITE several times when its endpoint buffer fills up or runs
//! dry. [`Session`] keeps the position of the transfer in between, so nothing
//! here ever waits on the host.

use crate::disk::{Block, BlockDevice, BLOCK_SIZE};

/// Standard INQUIRY data: direct access, removable, SPC-2.
pub fn inquiry(vendor: &[u8; 8], product: &[u8; 16], revision: &[u8; 4]) -> [u8; 36] {
    let mut data = [0; 36];
    data[1] = 0x80;
    data[2] = 0x04;
    data[3] = 0x02;
    data[4] = 36 - 5;
    data[8..16].copy_from_slice(vendor);
    data[16..32].copy_from_slice(product);
    data[32..36].copy_from_slice(revision);
    data
}

/// Last LBA and block length.
pub fn read_capacity_10(block_count: u32) -> [u8; 8] {
    let mut data = [0; 8];
    data[0..4].copy_from_slice(&block_count.saturating_sub(1).to_be_bytes());
    data[4..8].copy_from_slice(&(BLOCK_SIZE as u32).to_be_bytes());
    data
}

pub fn read_capacity_16(block_count: u32) -> [u8; 32] {
    let mut data = [0; 32];
    let last = u64::from(block_count.saturating_sub(1));
    data[0..8].copy_from_slice(&last.to_be_bytes());
    data[8..12].copy_from_slice(&(BLOCK_SIZE as u32).to_be_bytes());
    data
}

/// One current-capacity descriptor, formatted media.
pub fn read_format_capacities(block_count: u32) -> [u8; 12] {
    let mut data = [0; 12];
    data[3] = 8;
    data[4..8].copy_from_slice(&block_count.to_be_bytes());
    data[8] = 0x02;
    data[9..12].copy_from_slice(&(BLOCK_SIZE as u32).to_be_bytes()[1..]);
    data
}

/// Mode parameter header only: no pages, no block descriptors, writable.
pub const MODE_SENSE_6: [u8; 4] = [3, 0, 0, 0];
pub const MODE_SENSE_10: [u8; 8] = [0, 6, 0, 0, 0, 0, 0, 0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sense {
    pub key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl Sense {
    pub const NONE: Sense = Sense::new(0x00, 0x00);
    pub const INVALID_COMMAND: Sense = Sense::new(0x05, 0x20);
    pub const LBA_OUT_OF_RANGE: Sense = Sense::new(0x05, 0x21);
    pub const WRITE_FAULT: Sense = Sense::new(0x03, 0x03);
    pub const MEDIUM_ERROR: Sense = Sense::new(0x03, 0x11);
    pub const DATA_PHASE_ERROR: Sense = Sense::new(0x0B, 0x4B);

    const fn new(key: u8, asc: u8) -> Self {
        Sense { key, asc, ascq: 0 }
    }

    /// Fixed format sense data.
    pub fn bytes(&self) -> [u8; 18] {
        let mut data = [0; 18];
        data[0] = 0x70;
        data[2] = self.key;
        data[7] = 10;
        data[12] = self.asc;
        data[13] = self.ascq;
        data
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The endpoint could not take more right now; call again with the same
    /// command.
    Pending,
    Passed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    ToHost,
    FromHost,
}

/// Position inside a multi-block READ or WRITE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    direction: Direction,
    /// The command this transfer belongs to.
    start: u32,
    blocks: u32,
    lba: u32,
    remaining: u32,
    offset: usize,
}

pub struct Session<D> {
    disk: D,
    sense: Sense,
    transfer: Option<Transfer>,
    buffer: Block,
}

impl<D: BlockDevice> Session<D> {
    pub fn new(disk: D) -> Self {
        Self {
            disk,
            sense: Sense::NONE,
            transfer: None,
            buffer: [0; BLOCK_SIZE],
        }
    }

    pub fn block_count(&self) -> u32 {
        self.disk.block_count()
    }

    /// Sense data for REQUEST SENSE. Reading it resets it.
    pub fn take_sense(&mut self) -> Sense {
        core::mem::replace(&mut self.sense, Sense::NONE)
    }

    pub fn reject(&mut self, sense: Sense) -> Outcome {
        self.transfer = None;
        self.sense = sense;
        Outcome::Failed
    }

    /// Drops any transfer in flight and clears the sense data, as after a
    /// bus reset.
    pub fn reset(&mut self) {
        self.transfer = None;
        self.sense = Sense::NONE;
    }

    pub fn transfer(&self) -> Option<&Transfer> {
        self.transfer.as_ref()
    }

    fn start(&mut self, direction: Direction, lba: u32, blocks: u32) -> Result<Transfer, Sense> {
        match self.transfer {
            Some(t) if t.direction == direction && t.start == lba && t.blocks == blocks => {
                return Ok(t)
            }
            // anything else is a new command; the old cursor is dropped
            _ => self.transfer = None,
        }
        match lba.checked_add(blocks) {
            Some(end) if end <= self.disk.block_count() => Ok(Transfer {
                direction,
                start: lba,
                blocks,
                lba,
                remaining: blocks,
                // forces a block load on the first pass of a read
                offset: if direction == Direction::ToHost { BLOCK_SIZE } else { 0 },
            }),
            _ => Err(Sense::LBA_OUT_OF_RANGE),
        }
    }

    fn finish(&mut self, outcome: Outcome, transfer: Transfer) -> Outcome {
        match outcome {
            Outcome::Pending => self.transfer = Some(transfer),
            Outcome::Passed => {
                self.transfer = None;
                self.sense = Sense::NONE;
            }
            Outcome::Failed => self.transfer = None,
        }
        outcome
    }

    /// READ(10/16). `send` is offered the rest of the current block and
    /// returns how many bytes the endpoint took. An error from `send` fails
    /// the command.
    pub fn read<F, E>(&mut self, lba: u32, blocks: u32, mut send: F) -> Outcome
    where
        F: FnMut(&[u8]) -> Result<usize, E>,
    {
        let mut t = match self.start(Direction::ToHost, lba, blocks) {
            Ok(t) => t,
            Err(sense) => return self.reject(sense),
        };

        let outcome = loop {
            if t.offset == BLOCK_SIZE {
                if t.remaining == 0 {
                    break Outcome::Passed;
                }
                if self.disk.read_block(t.lba, &mut self.buffer).is_err() {
                    break self.reject(Sense::MEDIUM_ERROR);
                }
                t.lba += 1;
                t.remaining -= 1;
                t.offset = 0;
            }
            let n = match send(&self.buffer[t.offset..]) {
                Ok(0) => break Outcome::Pending,
                Ok(n) => n,
                Err(_) => break self.reject(Sense::DATA_PHASE_ERROR),
            };
            t.offset += n;
        };
        self.finish(outcome, t)
    }

    /// WRITE(10/16). `recv` fills as much of the slice as the endpoint has
    /// and returns the count.
    pub fn write<F, E>(&mut self, lba: u32, blocks: u32, mut recv: F) -> Outcome
    where
        F: FnMut(&mut [u8]) -> Result<usize, E>,
    {
        let mut t = match self.start(Direction::FromHost, lba, blocks) {
            Ok(t) => t,
            Err(sense) => return self.reject(sense),
        };

        let outcome = loop {
            if t.remaining == 0 {
                break Outcome::Passed;
            }
            let n = match recv(&mut self.buffer[t.offset..]) {
                Ok(0) => break Outcome::Pending,
                Ok(n) => n,
                Err(_) => break self.reject(Sense::DATA_PHASE_ERROR),
            };
            t.offset += n;
            if t.offset == BLOCK_SIZE {
                if self.disk.write_block(t.lba, &self.buffer).is_err() {
                    break self.reject(Sense::WRITE_FAULT);
                }
                t.lba += 1;
                t.remaining -= 1;
                t.offset = 0;
            }
        };
        self.finish(outcome, t)
    }
}
