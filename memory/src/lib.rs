pub mod address;
pub mod heap;


pub use address::Address;
pub use heap::{Memory, MemoryError, Region};
