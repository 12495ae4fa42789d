use crate::address::{Address, FIRST_HEAP_REGION, IMAGE_REGION, MAX_REGION_LEN};
use byteorder::{ByteOrder, LittleEndian};
use std::sync::Arc;
use thiserror::Error;

/// Default ceiling on live heap bytes.
pub const DEFAULT_MAX_ALLOCATION: usize = 256 * 1024 * 1024;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("invalid address {0}")]
    InvalidAddress(Address),
    #[error("access of {len} byte(s) at {address} is out of bounds")]
    OutOfBounds { address: Address, len: usize },
    #[error("write to read-only memory at {0}")]
    ReadOnly(Address),
    #[error("invalid allocation size {0}")]
    InvalidSize(i64),
    #[error("allocation of {requested} bytes exceeds limit of {limit} bytes")]
    LimitExceeded { requested: usize, limit: usize },
    #[error("offset {0:#x} is beyond the addressable range")]
    OffsetOutOfRange(u64),
}

#[derive(Debug, Clone)]
pub enum Region {
    /// The program image, shared with the decoder.
    Image(Arc<[u8]>),
    /// Zero-initialised allocation owned by the VM.
    Heap(Vec<u8>),
}

impl Region {
    pub fn len(&self) -> usize {
        match self {
            Region::Image(bytes) => bytes.len(),
            Region::Heap(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The address space seen by a running program.
///
/// Region ids index straight into `regions`; freed heap regions leave a
/// `None` behind so stale addresses fail instead of aliasing new memory.
pub struct Memory {
    regions: Vec<Option<Region>>,
    bytes_allocated: usize,
    max_allocation: usize,
}

impl Memory {
    pub fn new(image: Arc<[u8]>) -> Self {
        Self::with_limit(image, DEFAULT_MAX_ALLOCATION)
    }

    pub fn with_limit(image: Arc<[u8]>, max_allocation: usize) -> Self {
        let mut regions = Vec::with_capacity(16);
        regions.push(None); // null region
        regions.push(Some(Region::Image(image)));
        debug_assert_eq!(regions.len() as u32, FIRST_HEAP_REGION);
        Self {
            regions,
            bytes_allocated: 0,
            max_allocation,
        }
    }

    /// Address of byte `offset` inside the program image.
    pub fn image_address(&self, offset: usize) -> Result<Address, MemoryError> {
        u32::try_from(offset)
            .map(|offset| Address::new(IMAGE_REGION, offset))
            .map_err(|_| MemoryError::OffsetOutOfRange(offset as u64))
    }

    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    pub fn live_allocations(&self) -> usize {
        self.regions
            .iter()
            .skip(FIRST_HEAP_REGION as usize)
            .filter(|r| r.is_some())
            .count()
    }

    /// Length of the region `addr` points into.
    pub fn region_len(&self, addr: Address) -> Result<usize, MemoryError> {
        self.region(addr).map(Region::len)
    }

    // --- Allocation ---

    pub fn allocate(&mut self, size: i64) -> Result<Address, MemoryError> {
        if size < 0 || size as u64 > MAX_REGION_LEN as u64 {
            return Err(MemoryError::InvalidSize(size));
        }
        let size = size as usize;
        let requested = self.bytes_allocated.saturating_add(size);
        if requested > self.max_allocation {
            return Err(MemoryError::LimitExceeded {
                requested,
                limit: self.max_allocation,
            });
        }

        let id = self.regions.len() as u32;
        self.regions.push(Some(Region::Heap(vec![0u8; size])));
        self.bytes_allocated = requested;
        Ok(Address::new(id, 0))
    }

    /// Release a heap region. Only the base address returned by
    /// [`Memory::allocate`] is accepted.
    pub fn free(&mut self, addr: Address) -> Result<(), MemoryError> {
        if addr.region() < FIRST_HEAP_REGION || addr.offset() != 0 {
            return Err(MemoryError::InvalidAddress(addr));
        }
        let slot = self
            .regions
            .get_mut(addr.region() as usize)
            .ok_or(MemoryError::InvalidAddress(addr))?;
        match slot.take() {
            Some(region) => {
                self.bytes_allocated -= region.len();
                Ok(())
            }
            None => Err(MemoryError::InvalidAddress(addr)),
        }
    }

    // --- Raw access ---

    fn region(&self, addr: Address) -> Result<&Region, MemoryError> {
        self.regions
            .get(addr.region() as usize)
            .and_then(Option::as_ref)
            .ok_or(MemoryError::InvalidAddress(addr))
    }

    pub fn read_bytes(&self, addr: Address, len: usize) -> Result<&[u8], MemoryError> {
        let bytes: &[u8] = match self.region(addr)? {
            Region::Image(bytes) => &bytes[..],
            Region::Heap(bytes) => &bytes[..],
        };
        let start = addr.offset() as usize;
        start
            .checked_add(len)
            .and_then(|end| bytes.get(start..end))
            .ok_or(MemoryError::OutOfBounds { address: addr, len })
    }

    fn bytes_mut(&mut self, addr: Address, len: usize) -> Result<&mut [u8], MemoryError> {
        let region = self
            .regions
            .get_mut(addr.region() as usize)
            .and_then(Option::as_mut)
            .ok_or(MemoryError::InvalidAddress(addr))?;
        let bytes = match region {
            Region::Image(_) => return Err(MemoryError::ReadOnly(addr)),
            Region::Heap(bytes) => bytes,
        };
        let start = addr.offset() as usize;
        start
            .checked_add(len)
            .and_then(|end| bytes.get_mut(start..end))
            .ok_or(MemoryError::OutOfBounds { address: addr, len })
    }

    pub fn write_bytes(&mut self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        self.bytes_mut(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Bytes from `addr` up to (not including) the first NUL. A string that
    /// runs off the end of its region is an error.
    pub fn read_c_string(&self, addr: Address) -> Result<Vec<u8>, MemoryError> {
        let len = self.region_len(addr)?;
        let start = addr.offset() as usize;
        let tail = self.read_bytes(addr, len.saturating_sub(start))?;
        match tail.iter().position(|&b| b == 0) {
            Some(end) => Ok(tail[..end].to_vec()),
            None => Err(MemoryError::OutOfBounds {
                address: addr,
                len: tail.len() + 1,
            }),
        }
    }

    // --- Typed access (little-endian) ---

    pub fn read_u8(&self, addr: Address) -> Result<u8, MemoryError> {
        Ok(self.read_bytes(addr, 1)?[0])
    }

    pub fn write_u8(&mut self, addr: Address, val: u8) -> Result<(), MemoryError> {
        self.bytes_mut(addr, 1)?[0] = val;
        Ok(())
    }

    pub fn read_u16(&self, addr: Address) -> Result<u16, MemoryError> {
        Ok(LittleEndian::read_u16(self.read_bytes(addr, 2)?))
    }

    pub fn write_u16(&mut self, addr: Address, val: u16) -> Result<(), MemoryError> {
        LittleEndian::write_u16(self.bytes_mut(addr, 2)?, val);
        Ok(())
    }

    pub fn read_u32(&self, addr: Address) -> Result<u32, MemoryError> {
        Ok(LittleEndian::read_u32(self.read_bytes(addr, 4)?))
    }

    pub fn write_u32(&mut self, addr: Address, val: u32) -> Result<(), MemoryError> {
        LittleEndian::write_u32(self.bytes_mut(addr, 4)?, val);
        Ok(())
    }

    pub fn read_i64(&self, addr: Address) -> Result<i64, MemoryError> {
        Ok(LittleEndian::read_i64(self.read_bytes(addr, 8)?))
    }

    pub fn write_i64(&mut self, addr: Address, val: i64) -> Result<(), MemoryError> {
        LittleEndian::write_i64(self.bytes_mut(addr, 8)?, val);
        Ok(())
    }
}
