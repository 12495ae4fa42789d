use crate::error::RuntimeError;
use crate::machine::VM;
use memory::Address;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// Open files, keyed by the handle value given to the program.
/// Handle 0 is never issued so programs can test for failure.
#[derive(Debug, Default)]
pub struct FileTable {
    files: HashMap<i64, File>,
    next_handle: i64,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn insert(&mut self, file: File) -> i64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        self.files.insert(handle, file);
        handle
    }

    pub fn get_mut(&mut self, handle: i64) -> Option<&mut File> {
        self.files.get_mut(&handle)
    }

    pub fn remove(&mut self, handle: i64) -> Option<File> {
        self.files.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Translate a C `fopen` mode string. A `b` anywhere is ignored.
pub fn open_options(mode: &str) -> Option<OpenOptions> {
    let mode: String = mode.chars().filter(|&c| c != 'b').collect();
    let mut opts = OpenOptions::new();
    match mode.as_str() {
        "r" => opts.read(true),
        "w" => opts.write(true).create(true).truncate(true),
        "a" => opts.append(true).create(true),
        "r+" => opts.read(true).write(true),
        "w+" => opts.read(true).write(true).create(true).truncate(true),
        "a+" => opts.read(true).append(true).create(true),
        _ => return None,
    };
    Some(opts)
}

fn read_string(vm: &VM, raw: i64) -> Result<String, RuntimeError> {
    let bytes = vm.memory.read_c_string(Address::from_raw(raw))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn native_file_open(vm: &mut VM) -> Result<(), RuntimeError> {
    let mode_ptr = vm.stack.pop()?;
    let path_ptr = vm.stack.pop()?;
    let mode = read_string(vm, mode_ptr)?;
    let path = PathBuf::from(read_string(vm, path_ptr)?);

    let handle = match open_options(&mode).map(|opts| opts.open(&path)) {
        Some(Ok(file)) => vm.files.insert(file),
        Some(Err(e)) => {
            tracing::debug!(path = %path.display(), %mode, error = %e, "file_open failed");
            0
        }
        None => {
            tracing::debug!(%mode, "file_open: unsupported mode");
            0
        }
    };
    vm.stack.push(handle)
}

pub fn native_file_close(vm: &mut VM) -> Result<(), RuntimeError> {
    let handle = vm.stack.pop()?;
    let result = match vm.files.remove(handle) {
        Some(_) => 0,
        None => -1,
    };
    vm.stack.push(result)
}

fn write_at(file: &mut File, data: &[u8], offset: u64) -> io::Result<usize> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(data)?;
    Ok(data.len())
}

fn read_at(file: &mut File, size: u64, offset: u64) -> io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    file.take(size).read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn native_file_write(vm: &mut VM) -> Result<(), RuntimeError> {
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;
    let buffer = Address::from_raw(vm.stack.pop()?);
    let handle = vm.stack.pop()?;

    if size < 0 || offset < 0 {
        return vm.stack.push(-1);
    }
    let data = vm.memory.read_bytes(buffer, size as usize)?.to_vec();
    let result = match vm.files.get_mut(handle) {
        Some(file) => match write_at(file, &data, offset as u64) {
            Ok(n) => n as i64,
            Err(e) => {
                tracing::debug!(handle, error = %e, "file_write failed");
                -1
            }
        },
        None => -1,
    };
    vm.stack.push(result)
}

pub fn native_file_read(vm: &mut VM) -> Result<(), RuntimeError> {
    let offset = vm.stack.pop()?;
    let size = vm.stack.pop()?;
    let buffer = Address::from_raw(vm.stack.pop()?);
    let handle = vm.stack.pop()?;

    if size < 0 || offset < 0 {
        return vm.stack.push(-1);
    }
    let data = match vm.files.get_mut(handle) {
        Some(file) => match read_at(file, size as u64, offset as u64) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(handle, error = %e, "file_read failed");
                return vm.stack.push(-1);
            }
        },
        None => return vm.stack.push(-1),
    };
    vm.memory.write_bytes(buffer, &data)?;
    vm.stack.push(data.len() as i64)
}

pub fn native_file_size(vm: &mut VM) -> Result<(), RuntimeError> {
    let handle = vm.stack.pop()?;
    let result = match vm.files.get_mut(handle).map(|f| f.metadata()) {
        Some(Ok(meta)) => meta.len() as i64,
        _ => -1,
    };
    vm.stack.push(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_translation() {
        assert!(open_options("r").is_some());
        assert!(open_options("rb").is_some());
        assert!(open_options("w+").is_some());
        assert!(open_options("x").is_none());
        assert!(open_options("").is_none());
    }

    #[test]
    fn test_handles_start_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = FileTable::new();
        let file = File::create(dir.path().join("a")).unwrap();
        assert_eq!(table.insert(file), 1);
        assert!(table.remove(1).is_some());
        assert!(table.remove(1).is_none());
    }
}
