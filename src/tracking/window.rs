use std::collections::{HashMap, VecDeque};

use crate::models::{FrameBatch, RankedCandidate};

/// Fixed-capacity FIFO of the most recent frame batches.
#[derive(Debug, Clone)]
pub struct DetectionWindow {
    capacity: usize,
    frames: VecDeque<FrameBatch>,
}

impl DetectionWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Appends a batch, evicting the oldest ones beyond capacity, and returns
    /// the recomputed ranking.
    pub fn push(&mut self, batch: FrameBatch) -> Vec<RankedCandidate> {
        self.frames.push_back(batch);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
        self.rank()
    }

    /// Identities ordered by occurrence count across the window, ties in
    /// encounter order, capped at the size of the busiest single frame.
    pub fn rank(&self) -> Vec<RankedCandidate> {
        let max_per_frame = self.max_per_frame();
        if max_per_frame == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<RankedCandidate> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();

        for event in self.frames.iter().flat_map(|frame| frame.detections.iter()) {
            match slots.get(event.identity_key.as_str()) {
                Some(&slot) => {
                    let candidate = &mut ranked[slot];
                    candidate.occurrence_count += 1;
                    // Newest sighting carries the freshest score and image.
                    candidate.score = event.score;
                    if event.image_ref.is_some() {
                        candidate.image_ref = event.image_ref.clone();
                    }
                }
                None => {
                    slots.insert(event.identity_key.as_str(), ranked.len());
                    let mut candidate = RankedCandidate::from(event);
                    candidate.occurrence_count = 1;
                    ranked.push(candidate);
                }
            }
        }

        // sort_by is stable, so equal counts keep encounter order
        ranked.sort_by(|a, b| b.occurrence_count.cmp(&a.occurrence_count));
        ranked.truncate(max_per_frame);
        ranked
    }

    pub fn max_per_frame(&self) -> usize {
        self.frames.iter().map(FrameBatch::len).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DetectionEvent;

    fn det(name: &str, score: f64) -> DetectionEvent {
        DetectionEvent::new(name, "base1", Some(score), None)
    }

    fn batch(index: u64, names: &[&str]) -> FrameBatch {
        FrameBatch::new(index, names.iter().map(|n| det(n, 1.0)).collect())
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut window = DetectionWindow::new(5);
        for i in 0..12 {
            window.push(batch(i, &["A"]));
            assert!(window.len() <= 5);
        }
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn empty_window_ranks_nothing() {
        let mut window = DetectionWindow::new(5);
        assert!(window.rank().is_empty());
        assert!(window.push(batch(0, &[])).is_empty());
        assert!(window.push(batch(1, &[])).is_empty());
    }

    #[test]
    fn ranks_by_frequency_with_stable_ties() {
        let mut window = DetectionWindow::new(5);
        window.push(batch(0, &["A", "B"]));
        window.push(batch(1, &["C", "B"]));
        let ranked = window.push(batch(2, &["C", "B"]));
        let keys: Vec<_> = ranked.iter().map(|c| c.display_name.as_str()).collect();
        // B=3, C=2, A=1, capped at 2 per frame
        assert_eq!(keys, vec!["B", "C"]);
        assert_eq!(ranked[0].occurrence_count, 3);
    }

    #[test]
    fn ties_keep_encounter_order() {
        let mut window = DetectionWindow::new(5);
        window.push(batch(0, &["X"]));
        let ranked = window.push(batch(1, &["Y", "X", "Y", "X"]));
        let keys: Vec<_> = ranked.iter().map(|c| c.display_name.as_str()).collect();
        // X=3, Y=2
        assert_eq!(keys, vec!["X", "Y"]);

        let mut window = DetectionWindow::new(5);
        let ranked = window.push(batch(0, &["P", "Q"]));
        let keys: Vec<_> = ranked.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(keys, vec!["P", "Q"]);
    }

    #[test]
    fn union_larger_than_busiest_frame_is_capped() {
        let mut window = DetectionWindow::new(5);
        window.push(batch(0, &["A"]));
        window.push(batch(1, &["B"]));
        window.push(batch(2, &["C"]));
        let ranked = window.push(batch(3, &["D"]));
        assert_eq!(window.max_per_frame(), 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].display_name, "A");
    }

    #[test]
    fn evicted_frames_stop_counting() {
        let mut window = DetectionWindow::new(2);
        window.push(batch(0, &["A", "B"]));
        window.push(batch(1, &["B"]));
        let ranked = window.push(batch(2, &["C"]));
        let keys: Vec<_> = ranked.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(keys, vec!["B"]);
    }

    #[test]
    fn candidate_carries_latest_score() {
        let mut window = DetectionWindow::new(5);
        window.push(FrameBatch::new(0, vec![det("A", 4.0)]));
        let ranked = window.push(FrameBatch::new(1, vec![det("A", 9.0)]));
        assert_eq!(ranked[0].score, Some(9.0));
        assert_eq!(ranked[0].occurrence_count, 2);
    }
}
