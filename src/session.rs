use std::cell::Cell;
use std::rc::Rc;

/// Tracks whether a panel currently has a route calculation running.
#[derive(Clone, Debug, Default)]
pub struct CalculationState {
    calculating: Rc<Cell<bool>>,
}

impl CalculationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_calculating(&self) -> bool {
        self.calculating.get()
    }

    /// Marks a calculation as started, unless one is already in flight.
    pub fn try_begin(&self) -> Option<CalculationGuard> {
        if self.calculating.replace(true) {
            return None;
        }
        Some(CalculationGuard { calculating: Rc::clone(&self.calculating) })
    }
}

/// Clears the calculating flag when dropped.
#[derive(Debug)]
pub struct CalculationGuard {
    calculating: Rc<Cell<bool>>,
}

impl Drop for CalculationGuard {
    fn drop(&mut self) {
        self.calculating.set(false);
    }
}
