//! Moving window and Galilean frame shift.

use tracing::debug;

use crate::config::MovingWindowConfig;
use crate::level::Level;

/// Where the window should be, tracked between whole-cell shifts.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowState {
    target_lo: f64,
}

impl WindowState {
    /// Window starting at the level-0 origin `lo` along the window axis.
    pub fn new(lo: f64) -> Self {
        Self { target_lo: lo }
    }

    /// Physical position the lower domain edge is catching up to.
    pub fn target_lo(&self) -> f64 {
        self.target_lo
    }

    /// Advance the target by one step and shift every patch by the whole
    /// level-0 cells the domain now lags behind it. Returns the number of
    /// level-0 cells moved.
    pub fn advance(&mut self, cfg: &MovingWindowConfig, levels: &mut [Level], cur_time: f64, dt: f64) -> usize {
        if !cfg.enabled {
            return 0;
        }
        if cur_time >= cfg.start_time {
            self.target_lo += cfg.speed * dt;
        }
        let Some(base) = levels.first() else {
            return 0;
        };
        let axis = cfg.axis;
        let lo = base.geom().prob_lo()[axis];
        let dx = base.geom().dx()[axis];
        let lag = ((self.target_lo - lo) / dx).floor();
        if lag < 1.0 {
            return 0;
        }
        let n = lag as usize;
        for level in levels.iter_mut() {
            let fine_cells = level.coarse.as_ref().map_or(n, |link| n * link.ratio[axis]);
            level.fp.fields.shift_down(axis, fine_cells);
            if let Some(link) = level.coarse.as_mut() {
                link.cp.fields.shift_down(axis, n);
                for a in link.aux.e.iter_mut().chain(link.aux.b.iter_mut()) {
                    a.shift_down(axis, fine_cells);
                }
            }
        }
        debug!(axis, cells = n, target_lo = self.target_lo, "moving window shifted");
        n
    }
}

/// Move the origin of every patch by `velocity * dt`.
pub fn shift_galilean(levels: &mut [Level], velocity: [f64; 3], dt: f64) {
    for level in levels.iter_mut() {
        for patch in level.patches_mut() {
            for (d, v) in velocity.iter().enumerate() {
                if *v != 0.0 {
                    patch.fields.geom.shift_origin(d, v * dt);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::level::build_levels;
    use corona_grid::IndexBox;
    use proptest::prelude::*;

    fn setup(patch: Option<IndexBox>) -> (SimConfig, Vec<Level>) {
        let mut cfg = SimConfig::default();
        cfg.grid.n_cells = [8, 1, 16];
        cfg.grid.dx = [1.0; 3];
        cfg.grid.periodic = [true, true, false];
        cfg.refinement.patch = patch;
        cfg.moving_window.enabled = true;
        cfg.moving_window.axis = 2;
        cfg.moving_window.speed = 0.75;
        let levels = build_levels(&cfg, &[1.0, 1.0]).unwrap();
        (cfg, levels)
    }

    #[test]
    fn shifts_only_whole_cells() {
        let (cfg, mut levels) = setup(None);
        let mut w = WindowState::new(0.0);
        levels[0].fp.fields.e[0].set([2, 0, 5], 4.0);
        assert_eq!(w.advance(&cfg.moving_window, &mut levels, 0.0, 1.0), 0);
        assert_eq!(w.advance(&cfg.moving_window, &mut levels, 1.0, 1.0), 1);
        assert_eq!(levels[0].geom().prob_lo()[2], 1.0);
        assert_eq!(levels[0].fp.fields.e[0].get([2, 0, 4]), 4.0);
        // 2.25 target against 1.0 origin: one more cell.
        assert_eq!(w.advance(&cfg.moving_window, &mut levels, 2.0, 1.0), 1);
        assert_eq!(w.advance(&cfg.moving_window, &mut levels, 3.0, 1.0), 1);
        assert_eq!(levels[0].geom().prob_lo()[2], 3.0);
    }

    #[test]
    fn window_waits_for_start_time() {
        let (mut cfg, mut levels) = setup(None);
        cfg.moving_window.start_time = 10.0;
        let mut w = WindowState::new(0.0);
        for t in 0..5 {
            assert_eq!(w.advance(&cfg.moving_window, &mut levels, t as f64, 1.0), 0);
        }
        assert_eq!(w.target_lo(), 0.0);
    }

    #[test]
    fn refined_patch_moves_by_ratio_cells() {
        let (mut cfg, mut levels) = setup(Some(IndexBox::new([2, 0, 4], [6, 1, 12])));
        cfg.moving_window.speed = 2.0;
        let mut w = WindowState::new(0.0);
        assert_eq!(w.advance(&cfg.moving_window, &mut levels, 0.0, 1.0), 2);
        assert_eq!(levels[1].geom().prob_lo()[2], 6.0);
        let cp = &levels[1].coarse.as_ref().unwrap().cp.fields.geom;
        assert_eq!(cp.prob_lo()[2], 6.0);
    }

    #[test]
    fn galilean_shift_moves_every_origin() {
        let (_, mut levels) = setup(Some(IndexBox::new([2, 0, 4], [6, 1, 12])));
        shift_galilean(&mut levels, [0.0, 0.0, 3.0], 0.5);
        assert_eq!(levels[0].geom().prob_lo()[2], 1.5);
        assert_eq!(levels[1].geom().prob_lo()[2], 5.5);
        assert_eq!(levels[0].geom().prob_lo()[0], 0.0);
    }

    proptest! {
        #[test]
        fn origin_trails_the_target_by_less_than_a_cell(speed in 0.0f64..3.0, steps in 1usize..40) {
            let (mut cfg, mut levels) = setup(None);
            cfg.moving_window.speed = speed;
            let mut w = WindowState::new(0.0);
            let mut moved = 0;
            for k in 0..steps {
                moved += w.advance(&cfg.moving_window, &mut levels, k as f64, 1.0);
            }
            let lo = levels[0].geom().prob_lo()[2];
            prop_assert_eq!(lo, moved as f64);
            let lag = w.target_lo() - lo;
            prop_assert!((0.0..1.0).contains(&lag), "lag {}", lag);
        }
    }
}
