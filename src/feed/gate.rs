use std::collections::VecDeque;

/// Rolling average of per-frame classifier confidence.
///
/// The card counts as present once the average over the last `window`
/// frames reaches `threshold`.
#[derive(Debug, Clone)]
pub struct ConfidenceGate {
    window: usize,
    threshold: f64,
    samples: VecDeque<f64>,
}

impl ConfidenceGate {
    pub fn new(window: usize, threshold: f64) -> Self {
        let window = window.max(1);
        Self {
            window,
            threshold,
            samples: VecDeque::with_capacity(window),
        }
    }

    /// Records a confidence and returns whether the card is now present.
    /// Non-finite confidences are ignored.
    pub fn push(&mut self, confidence: f64) -> bool {
        if confidence.is_finite() {
            self.samples.push_back(confidence);
            while self.samples.len() > self.window {
                self.samples.pop_front();
            }
        }
        self.is_present()
    }

    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn is_present(&self) -> bool {
        self.average().map_or(false, |avg| avg >= self.threshold)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::ConfidenceGate;

    #[test]
    fn opens_when_rolling_average_reaches_threshold() {
        let mut gate = ConfidenceGate::new(3, 0.9);
        assert!(!gate.is_present());
        assert!(!gate.push(0.5));
        assert!(!gate.push(1.0));
        assert!(!gate.push(1.0));
        // window now [1.0, 1.0, 1.0]
        assert!(gate.push(1.0));
        assert!(!gate.push(0.4));
    }

    #[test]
    fn ignores_non_finite_samples_and_resets() {
        let mut gate = ConfidenceGate::new(2, 0.5);
        gate.push(f64::NAN);
        assert_eq!(gate.average(), None);
        gate.push(0.75);
        assert_eq!(gate.average(), Some(0.75));
        gate.reset();
        assert!(!gate.is_present());
    }
}
