//! Block storage behind the mass storage class.

use crate::Error;

pub const BLOCK_SIZE: usize = 512;

pub type Block = [u8; BLOCK_SIZE];

pub trait BlockDevice {
    fn block_count(&self) -> u32;
    fn read_block(&mut self, lba: u32, block: &mut Block) -> Result<(), Error>;
    fn write_block(&mut self, lba: u32, block: &Block) -> Result<(), Error>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    fn read_block(&mut self, lba: u32, block: &mut Block) -> Result<(), Error> {
        (**self).read_block(lba, block)
    }

    fn write_block(&mut self, lba: u32, block: &Block) -> Result<(), Error> {
        (**self).write_block(lba, block)
    }
}

/// `N` blocks of RAM, zeroed at reset.
pub struct RamDisk<const N: usize> {
    blocks: [Block; N],
}

impl<const N: usize> RamDisk<N> {
    pub const fn new() -> Self {
        Self {
            blocks: [[0; BLOCK_SIZE]; N],
        }
    }

    fn block(&mut self, lba: u32) -> Result<&mut Block, Error> {
        self.blocks
            .get_mut(lba as usize)
            .ok_or(Error::BlockOutOfRange(lba))
    }
}

impl<const N: usize> BlockDevice for RamDisk<N> {
    fn block_count(&self) -> u32 {
        N as u32
    }

    fn read_block(&mut self, lba: u32, block: &mut Block) -> Result<(), Error> {
        block.copy_from_slice(self.block(lba)?);
        Ok(())
    }

    fn write_block(&mut self, lba: u32, block: &Block) -> Result<(), Error> {
        self.block(lba)?.copy_from_slice(block);
        Ok(())
    }
}
