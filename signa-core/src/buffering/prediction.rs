//! Fixed-capacity vote window for the stabilizer.
//!
//! Entries are a label index or `None` for a low-confidence frame. Nulls take
//! up space in the window on purpose: they dilute stale votes.

use std::collections::{HashMap, VecDeque};

/// Most frequent non-null label in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub label: usize,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct RollingPredictionBuffer {
    entries: VecDeque<Option<usize>>,
    capacity: usize,
}

impl RollingPredictionBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: Option<usize>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn fill_ratio(&self) -> f32 {
        self.entries.len() as f32 / self.capacity as f32
    }

    pub fn non_null_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Most frequent non-null label. Ties go to the label voted most recently.
    pub fn majority(&self) -> Option<Vote> {
        let mut tally: HashMap<usize, (usize, usize)> = HashMap::new();
        for (pos, label) in self.entries.iter().enumerate() {
            if let Some(label) = label {
                let slot = tally.entry(*label).or_insert((0, pos));
                slot.0 += 1;
                slot.1 = pos;
            }
        }
        tally
            .into_iter()
            .max_by_key(|(_, (count, last))| (*count, *last))
            .map(|(label, (count, _))| Vote { label, count })
    }

    pub fn entries(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut buffer = RollingPredictionBuffer::new(3);
        for label in 0..5 {
            buffer.push(Some(label));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(
            buffer.entries().collect::<Vec<_>>(),
            vec![Some(2), Some(3), Some(4)]
        );
    }

    #[test]
    fn majority_ignores_nulls() {
        let mut buffer = RollingPredictionBuffer::new(5);
        buffer.push(None);
        buffer.push(Some(1));
        buffer.push(None);
        buffer.push(Some(1));
        buffer.push(Some(2));
        assert_eq!(buffer.majority(), Some(Vote { label: 1, count: 2 }));
        assert_eq!(buffer.non_null_count(), 3);
    }

    #[test]
    fn majority_tie_goes_to_most_recent() {
        let mut buffer = RollingPredictionBuffer::new(4);
        buffer.push(Some(7));
        buffer.push(Some(3));
        buffer.push(Some(3));
        buffer.push(Some(7));
        assert_eq!(buffer.majority(), Some(Vote { label: 7, count: 2 }));
    }

    #[test]
    fn all_null_window_has_no_majority() {
        let mut buffer = RollingPredictionBuffer::new(3);
        buffer.push(None);
        buffer.push(None);
        assert_eq!(buffer.majority(), None);
        assert!((buffer.fill_ratio() - 2.0 / 3.0).abs() < 1e-6);
    }
}
