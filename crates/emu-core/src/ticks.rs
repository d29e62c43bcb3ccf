//! CPU clock cycles as a distinct type.

/// A count of CPU clock cycles (T-states).
///
/// Schedulers interleaving several chips convert between their master clock
/// and each chip's cycles; keeping the unit in the type stops the two from
/// being mixed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u32> for Ticks {
    fn from(cycles: u32) -> Self {
        Self(u64::from(cycles))
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl core::fmt::Display for Ticks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} cycles", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtraction_saturates() {
        assert_eq!(Ticks::new(3) - Ticks::new(10), Ticks::ZERO);
        assert_eq!(Ticks::new(10) - Ticks::new(3), Ticks::new(7));
    }

    #[test]
    fn accumulates_instruction_costs() {
        let mut total = Ticks::ZERO;
        for cost in [4u32, 7, 11] {
            total += Ticks::from(cost);
        }
        assert_eq!(total.get(), 22);
        assert_eq!(total.to_string(), "22 cycles");
    }
}
