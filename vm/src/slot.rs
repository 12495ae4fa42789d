use std::fmt;

/// Slots below this index live in the current frame; the rest are globals.
pub const LOCAL_SLOTS: usize = 256;

/// Element datatypes carried in bits 0..=6 of a slot tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Datatype {
    Int = 1,
    Chr = 2,
    Str = 3,
}

impl Datatype {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Datatype::Int),
            2 => Some(Datatype::Chr),
            3 => Some(Datatype::Str),
            _ => None,
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Datatype::Int => "int",
            Datatype::Chr => "chr",
            Datatype::Str => "str",
        })
    }
}

/// Packed shape/type tag: bits 0..=6 datatype, bit 7 set for scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SlotTag(pub u8);

impl SlotTag {
    pub const SCALAR_FLAG: u8 = 0x80;
    pub const DATATYPE_MASK: u8 = 0x7F;

    pub fn new(datatype: u8, is_array: bool) -> Self {
        let bits = datatype & Self::DATATYPE_MASK;
        if is_array {
            SlotTag(bits)
        } else {
            SlotTag(bits | Self::SCALAR_FLAG)
        }
    }

    #[inline]
    pub fn datatype(self) -> u8 {
        self.0 & Self::DATATYPE_MASK
    }

    #[inline]
    pub fn is_array(self) -> bool {
        self.0 & Self::SCALAR_FLAG == 0
    }

    /// Byte-granular indexing applies to `chr` buffers only.
    #[inline]
    pub fn element_size(self) -> i64 {
        if self.datatype() == Datatype::Chr as u8 {
            1
        } else {
            8
        }
    }
}

/// A variable slot. `tag` is `None` until a declaration instruction runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slot {
    pub value: i64,
    pub tag: Option<SlotTag>,
}

impl Slot {
    pub fn declared(datatype: u8, is_array: bool) -> Self {
        Self {
            value: 0,
            tag: Some(SlotTag::new(datatype, is_array)),
        }
    }
}
