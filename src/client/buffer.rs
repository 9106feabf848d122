use std::collections::VecDeque;

/// Messages waiting for the channel to open, oldest first.
#[derive(Debug, Default)]
pub struct OutboundBuffer {
    pending: VecDeque<String>,
}

impl OutboundBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: String) {
        self.pending.push_back(message);
    }

    /// Takes every pending message in submission order, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<String> {
        self.pending.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
