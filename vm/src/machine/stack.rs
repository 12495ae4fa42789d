use crate::error::RuntimeError;

/// Bounded LIFO of 64-bit values shared by every frame of one VM.
#[derive(Debug, Clone)]
pub struct ValueStack {
    values: Vec<i64>,
    capacity: usize,
}

impl ValueStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    #[inline]
    pub fn push(&mut self, value: i64) -> Result<(), RuntimeError> {
        if self.values.len() >= self.capacity {
            return Err(RuntimeError::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Result<i64, RuntimeError> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bottom-to-top view, for hosts inspecting results.
    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
