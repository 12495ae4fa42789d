use std::fmt;

// --- Packed u64 address ---
// Bits 63..32 = region id
// Bits 31..0  = byte offset inside the region

const REGION_SHIFT: u32 = 32;
const OFFSET_MASK: u64 = (1u64 << 32) - 1;

/// Region 0 never holds memory, so the all-zero address is null.
pub const NULL_REGION: u32 = 0;
/// The program image is always mapped at region 1.
pub const IMAGE_REGION: u32 = 1;
/// Heap allocations start here; ids are never reused.
pub const FIRST_HEAP_REGION: u32 = 2;

/// Largest single region the address format can describe.
pub const MAX_REGION_LEN: usize = OFFSET_MASK as usize;

/// Opaque handle into VM-managed memory.
///
/// Programs see addresses as plain `i64` values on the value stack and may
/// do arithmetic on them. Arithmetic only touches the low (offset) half as
/// long as it stays in range, so `base + k` keeps pointing into the same
/// region and every access is checked against that region's length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Address(pub u64);

impl Address {
    #[inline]
    pub fn new(region: u32, offset: u32) -> Self {
        Address(((region as u64) << REGION_SHIFT) | offset as u64)
    }

    #[inline]
    pub fn null() -> Self {
        Address(0)
    }

    /// Reinterpret a stack value as an address.
    #[inline]
    pub fn from_raw(raw: i64) -> Self {
        Address(raw as u64)
    }

    /// The value pushed on the stack for this address.
    #[inline]
    pub fn to_raw(self) -> i64 {
        self.0 as i64
    }

    #[inline]
    pub fn region(self) -> u32 {
        (self.0 >> REGION_SHIFT) as u32
    }

    #[inline]
    pub fn offset(self) -> u32 {
        (self.0 & OFFSET_MASK) as u32
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.region() == NULL_REGION
    }

    /// Pointer arithmetic on the raw value, wrapping like the integer the
    /// program holds. A carry out of the offset changes the region id; use
    /// [`Address::checked_offset_by`] when the region must stay fixed.
    #[inline]
    pub fn offset_by(self, delta: i64) -> Self {
        Address(self.0.wrapping_add(delta as u64))
    }

    /// Offset arithmetic that never leaves the region. `None` when the new
    /// offset does not fit the 32-bit offset field.
    #[inline]
    pub fn checked_offset_by(self, delta: i64) -> Option<Self> {
        let offset = (self.offset() as i64).checked_add(delta)?;
        u32::try_from(offset)
            .ok()
            .map(|offset| Address::new(self.region(), offset))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({}:{:#x})", self.region(), self.offset())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.region() {
            NULL_REGION => write!(f, "null+{:#x}", self.offset()),
            IMAGE_REGION => write!(f, "image+{:#x}", self.offset()),
            r => write!(f, "heap#{}+{:#x}", r, self.offset()),
        }
    }
}

impl From<Address> for i64 {
    fn from(addr: Address) -> i64 {
        addr.to_raw()
    }
}
