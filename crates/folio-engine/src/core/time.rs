/// Repaint-signal divider.
/// Lets a simulation advance at a fixed number of repaint signals per step,
/// independent of how often the display refreshes.
#[derive(Debug, Clone)]
pub struct FrameCounter {
    /// Signals per step.
    every: u32,
    /// Signals seen since the last step.
    count: u32,
}

impl FrameCounter {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            count: 0,
        }
    }

    /// Record one repaint signal. Returns true when a step is due.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count < self.every {
            return false;
        }
        self.count = 0;
        true
    }

    /// Forget partially accumulated signals.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn every(&self) -> u32 {
        self.every
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_on_every_tenth_signal() {
        let mut fc = FrameCounter::new(10);
        let fired: Vec<u32> = (1..=30).filter(|_| fc.tick()).collect();
        assert_eq!(fired.len(), 3);

        let mut fc = FrameCounter::new(10);
        for i in 1..=9 {
            assert!(!fc.tick(), "fired early on signal {}", i);
        }
        assert!(fc.tick());
    }

    #[test]
    fn zero_means_every_signal() {
        let mut fc = FrameCounter::new(0);
        assert!(fc.tick());
        assert!(fc.tick());
    }

    #[test]
    fn reset_discards_partial_count() {
        let mut fc = FrameCounter::new(3);
        fc.tick();
        fc.tick();
        fc.reset();
        assert!(!fc.tick());
        assert!(!fc.tick());
        assert!(fc.tick());
    }
}
