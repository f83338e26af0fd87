use crate::models::Reading;

/// Bounded, ordered log of the readings collected during one session.
///
/// The capacity cap is policy, not allocation: a full buffer rejects the push
/// and the detector must close the session. Readings leave through
/// `take_all`, a single-pass hand-off to the analyzer.
#[derive(Debug)]
pub struct SessionBuffer {
    readings: Vec<Reading>,
    capacity: usize,
}

impl SessionBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            readings: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a reading. Returns false when the buffer is at capacity; the
    /// reading is dropped and the caller must terminate the session.
    pub fn try_push(&mut self, reading: Reading) -> bool {
        if self.readings.len() >= self.capacity {
            return false;
        }
        self.readings.push(reading);
        true
    }

    /// Drain all readings for one-shot consumption. The buffer is empty and
    /// reusable afterwards.
    pub fn take_all(&mut self) -> Vec<Reading> {
        std::mem::take(&mut self.readings)
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(elapsed_ms: u64) -> Reading {
        Reading::new(3.1, 0.1, elapsed_ms, 3.3, 3.0)
    }

    #[test]
    fn rejects_pushes_past_capacity() {
        let mut buffer = SessionBuffer::with_capacity(3);
        assert!(buffer.try_push(reading(5)));
        assert!(buffer.try_push(reading(10)));
        assert!(buffer.try_push(reading(15)));
        assert!(!buffer.try_push(reading(20)));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn take_all_drains_in_order_and_resets() {
        let mut buffer = SessionBuffer::with_capacity(8);
        buffer.try_push(reading(5));
        buffer.try_push(reading(10));

        let drained = buffer.take_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].elapsed_ms, 5);
        assert_eq!(drained[1].elapsed_ms, 10);
        assert!(buffer.is_empty());

        // Reusable after draining.
        assert!(buffer.try_push(reading(5)));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let mut buffer = SessionBuffer::with_capacity(0);
        assert!(!buffer.try_push(reading(5)));
        assert!(buffer.is_empty());
    }
}
