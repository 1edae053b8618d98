//! Per-step performance metrics.
//!
//! [`StepMetrics`] captures timing and particle bookkeeping for a single
//! step of [`Simulation::evolve`](crate::Simulation::evolve).

/// Timing and particle counts collected during a single step.
///
/// All durations are in microseconds. The engine overwrites these after
/// each step; read the latest with
/// [`last_metrics()`](crate::Simulation::last_metrics).
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Time spent gathering, pushing and depositing, in microseconds.
    pub push_deposit_us: u64,
    /// Time spent in the field advance, in microseconds.
    pub field_solve_us: u64,
    /// Time spent in redistribution and the boundary pass, in microseconds.
    pub redistribute_us: u64,
    /// Particles that changed tile during redistribution.
    pub particles_moved: usize,
    /// Particles dropped by redistribution or by the boundary pass.
    pub particles_lost: usize,
    /// Particles alive at the end of the step.
    pub particles: usize,
}

pub(crate) fn micros(start: std::time::Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.push_deposit_us, 0);
        assert_eq!(m.field_solve_us, 0);
        assert_eq!(m.redistribute_us, 0);
        assert_eq!(m.particles_moved, 0);
        assert_eq!(m.particles_lost, 0);
        assert_eq!(m.particles, 0);
    }

    #[test]
    fn metrics_fields_accessible() {
        let m = StepMetrics {
            total_us: 100,
            push_deposit_us: 60,
            field_solve_us: 30,
            redistribute_us: 5,
            particles_moved: 3,
            particles_lost: 1,
            particles: 41,
        };
        assert_eq!(m.total_us, 100);
        assert!(m.push_deposit_us + m.field_solve_us + m.redistribute_us <= m.total_us);
        assert_eq!(m.particles_lost, 1);
    }
}
