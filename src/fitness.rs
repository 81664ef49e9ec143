//! Ranks candidate layouts.
//!
//! The primary term is the waste fraction summed over panels. A small
//! tie-break bonus favors panels whose largest remaining gap is comfortably
//! larger than the smallest item already placed there, i.e. panels that can
//! still usefully take more items. With `min_initial_usage` set, layouts
//! that leave more panels completely untouched rank first, which
//! consolidates usage onto as few panels as possible.

use crate::types::{Params, Unused, Used};

/// Lexicographic fitness: untouched-initial panel count first (only
/// populated under `min_initial_usage`), waste score second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fitness {
    pub untouched_initial: usize,
    pub score: f64,
}

impl Fitness {
    /// Strictly better: more untouched panels, or equal counts and a lower
    /// score. Exact ties are not "better", so the first-enumerated
    /// candidate wins them.
    pub fn better_than(&self, other: &Fitness) -> bool {
        if self.untouched_initial != other.untouched_initial {
            self.untouched_initial > other.untouched_initial
        } else {
            self.score < other.score
        }
    }
}

#[derive(Clone, Copy, Default)]
struct PanelAgg {
    used_sum: f64,
    min_used: f64,
    max_unused: f64,
}

/// Fitness evaluator with reusable per-panel scratch, sized once for the
/// panel count. The solver evaluates thousands of candidates per item, so
/// the scratch is not reallocated per call.
pub struct Evaluator {
    agg: Vec<PanelAgg>,
}

impl Evaluator {
    pub fn new(panel_count: usize) -> Self {
        Self {
            agg: vec![PanelAgg::default(); panel_count],
        }
    }

    pub fn evaluate<I>(&mut self, params: &Params, used: &[Used], unused: I) -> Fitness
    where
        I: IntoIterator<Item = Unused>,
    {
        self.agg.fill(PanelAgg::default());

        for u in used {
            let agg = &mut self.agg[u.panel];
            let area = params.items[u.item].area();
            agg.used_sum += area;
            if agg.min_used == 0.0 || area < agg.min_used {
                agg.min_used = area;
            }
        }

        let mut untouched_initial = 0;
        for u in unused {
            let agg = &mut self.agg[u.panel];
            let area = u.area();
            if area > agg.max_unused {
                agg.max_unused = area;
            }
            if params.min_initial_usage && u.initial {
                untouched_initial += 1;
            }
        }

        let total = params.panels_area();
        let k = params.fitness_k;
        let mut score = 0.0;
        for (panel, agg) in params.panels.iter().zip(&self.agg) {
            score += (panel.area() - agg.used_sum) / total;
            score -= k * agg.min_used * agg.max_unused / (total * total);
        }

        Fitness {
            untouched_initial,
            score,
        }
    }
}
