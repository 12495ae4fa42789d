pub struct NativeMeta {
    pub name: &'static str,
    pub arity: usize,
}

// THE SINGLE SOURCE OF TRUTH
// The index in this array IS the native id used by INVOKE_NATIVE.
// Extension modules must pick ids outside 0..NATIVE_TABLE.len().
pub const NATIVE_TABLE: &[NativeMeta] = &[
    NativeMeta {
        name: "printc",
        arity: 1,
    }, // Index 0
    NativeMeta {
        name: "allocate",
        arity: 1,
    }, // Index 1
    NativeMeta {
        name: "deallocate",
        arity: 1,
    }, // Index 2
    NativeMeta {
        name: "exit",
        arity: 1,
    }, // Index 3
    // Files
    NativeMeta {
        name: "file_open",
        arity: 2,
    }, // Index 4
    NativeMeta {
        name: "file_close",
        arity: 1,
    }, // Index 5
    NativeMeta {
        name: "file_write",
        arity: 4,
    }, // Index 6
    NativeMeta {
        name: "file_read",
        arity: 4,
    }, // Index 7
    NativeMeta {
        name: "file_size",
        arity: 1,
    }, // Index 8
    // Raw memory
    NativeMeta {
        name: "read16",
        arity: 1,
    }, // Index 9
    NativeMeta {
        name: "write16",
        arity: 2,
    }, // Index 10
    NativeMeta {
        name: "read32",
        arity: 1,
    }, // Index 11
    NativeMeta {
        name: "write32",
        arity: 2,
    }, // Index 12
    // Indirect calls (target + N arguments)
    NativeMeta {
        name: "call0",
        arity: 1,
    }, // Index 13
    NativeMeta {
        name: "call1",
        arity: 2,
    }, // Index 14
    NativeMeta {
        name: "call2",
        arity: 3,
    }, // Index 15
    NativeMeta {
        name: "call3",
        arity: 4,
    }, // Index 16
    NativeMeta {
        name: "call4",
        arity: 5,
    }, // Index 17
];

pub const PRINTC: u64 = 0;
pub const ALLOCATE: u64 = 1;
pub const DEALLOCATE: u64 = 2;
pub const EXIT: u64 = 3;
pub const FILE_OPEN: u64 = 4;
pub const FILE_CLOSE: u64 = 5;
pub const FILE_WRITE: u64 = 6;
pub const FILE_READ: u64 = 7;
pub const FILE_SIZE: u64 = 8;
pub const READ16: u64 = 9;
pub const WRITE16: u64 = 10;
pub const READ32: u64 = 11;
pub const WRITE32: u64 = 12;
pub const CALL0: u64 = 13;
pub const CALL1: u64 = 14;
pub const CALL2: u64 = 15;
pub const CALL3: u64 = 16;
pub const CALL4: u64 = 17;

/// First id guaranteed not to collide with a built-in.
pub const FIRST_EXTENSION_ID: u64 = NATIVE_TABLE.len() as u64;

pub fn native_meta(id: u64) -> Option<&'static NativeMeta> {
    NATIVE_TABLE.get(usize::try_from(id).ok()?)
}

pub fn native_id(name: &str) -> Option<u64> {
    NATIVE_TABLE
        .iter()
        .position(|m| m.name == name)
        .map(|i| i as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_table_positions() {
        let ids = [
            (PRINTC, "printc"),
            (ALLOCATE, "allocate"),
            (DEALLOCATE, "deallocate"),
            (EXIT, "exit"),
            (FILE_OPEN, "file_open"),
            (FILE_CLOSE, "file_close"),
            (FILE_WRITE, "file_write"),
            (FILE_READ, "file_read"),
            (FILE_SIZE, "file_size"),
            (READ16, "read16"),
            (WRITE16, "write16"),
            (READ32, "read32"),
            (WRITE32, "write32"),
            (CALL0, "call0"),
            (CALL4, "call4"),
        ];
        for (id, name) in ids {
            assert_eq!(native_meta(id).map(|m| m.name), Some(name));
            assert_eq!(native_id(name), Some(id));
        }
        assert_eq!(FIRST_EXTENSION_ID, 18);
    }
}
