/// Per-run cap on request units. Starts at zero each invocation and is never persisted;
/// the provider's own budget resets on its schedule independently of this counter.
#[derive(Debug, Clone)]
pub struct QuotaGovernor {
    budget: u64,
    consumed: u64,
}

impl QuotaGovernor {
    pub fn new(budget: u64) -> Self {
        Self { budget, consumed: 0 }
    }

    /// Reserve `n` units if that stays within budget. Denial consumes nothing.
    pub fn try_consume(&mut self, n: u64) -> bool {
        match self.consumed.checked_add(n) {
            Some(next) if next <= self.budget => {
                self.consumed = next;
                true
            }
            _ => false,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.budget - self.consumed
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn budget(&self) -> u64 {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_up_to_budget_then_denies() {
        let mut q = QuotaGovernor::new(3);
        assert!(q.try_consume(1));
        assert!(q.try_consume(2));
        assert_eq!(q.remaining(), 0);
        assert!(!q.try_consume(1));
        assert_eq!(q.consumed(), 3);
    }

    #[test]
    fn denial_leaves_counter_untouched() {
        let mut q = QuotaGovernor::new(5);
        assert!(q.try_consume(4));
        assert!(!q.try_consume(2));
        assert_eq!(q.consumed(), 4);
        assert!(q.try_consume(1));
        assert!(!q.try_consume(u64::MAX));
    }

    #[test]
    fn zero_budget_never_grants() {
        let mut q = QuotaGovernor::new(0);
        assert!(!q.try_consume(1));
        assert!(q.try_consume(0));
    }
}
