//! Placement search over the item sequence.
//!
//! Items are processed largest-first. For each item every combination of
//! free rectangle, orientation and split direction is tried; the greedy
//! method keeps the combination with the best immediate fitness, the
//! forward-greedy method ranks each combination by the fitness of a full
//! greedy completion of the remaining items. Branches are forked search
//! states whose free-rectangle slots live in a recycling [`Pool`]; every
//! losing branch returns its slots the moment it loses, so the pool stays
//! proportional to the surviving state.

use crate::fitness::{Evaluator, Fitness};
use crate::geometry::{self, Split};
use crate::pool::{Handle, Pool, PoolError};
use crate::types::{Layout, Method, Params, SolveError, Unused, Used};

/// Mutable working value threaded through the search: committed placements
/// plus handles to this branch's free rectangles. Each state exclusively
/// owns its handles; forking duplicates the referenced slots.
struct SearchState {
    used: Vec<Used>,
    free: Vec<Handle<Unused>>,
}

impl SearchState {
    /// Forks this state, leaving out the free rect at `skip` (the one being
    /// consumed by a cut). On pool exhaustion the partially built fork is
    /// released before the error propagates.
    fn fork_without(&self, skip: usize, pool: &mut Pool<Unused>) -> Result<Self, PoolError> {
        let mut free = Vec::with_capacity(self.free.len() + 1);
        for (i, &h) in self.free.iter().enumerate() {
            if i == skip {
                continue;
            }
            match pool.insert(pool[h]) {
                Ok(dup) => free.push(dup),
                Err(e) => {
                    for dup in free {
                        pool.remove(dup);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Self {
            used: self.used.clone(),
            free,
        })
    }

    /// Full fork, shared by the forward-greedy probe.
    fn fork(&self, pool: &mut Pool<Unused>) -> Result<Self, PoolError> {
        self.fork_without(usize::MAX, pool)
    }

    /// Returns every slot this branch owns to the pool.
    fn release(self, pool: &mut Pool<Unused>) {
        for h in self.free {
            pool.remove(h);
        }
    }
}

struct Search<'a> {
    params: &'a Params,
    pool: &'a mut Pool<Unused>,
    scorer: Evaluator,
}

impl Search<'_> {
    fn score(&mut self, state: &SearchState) -> Fitness {
        let unused: Vec<Unused> = state.free.iter().map(|&h| self.pool[h]).collect();
        self.scorer.evaluate(self.params, &state.used, unused)
    }

    /// One step of the state machine: consume `item_idx`, returning the
    /// best-scoring successor state. `rest` is the processing order of the
    /// items still to come, used only by the forward-greedy lookahead.
    fn best_step(
        &mut self,
        state: &SearchState,
        item_idx: usize,
        rest: &[usize],
        lookahead: bool,
    ) -> Result<SearchState, SolveError> {
        let item = &self.params.items[item_idx];
        let mut best: Option<(SearchState, Fitness)> = None;

        for rotate in [false, true] {
            if rotate && !item.can_rotate {
                continue;
            }
            for fi in 0..state.free.len() {
                let free = self.pool[state.free[fi]];
                if !geometry::fits(item, &free, rotate) {
                    continue;
                }
                for split in [Split::Vertical, Split::Horizontal] {
                    let Some(cut) = geometry::cut(
                        item_idx,
                        item,
                        &free,
                        rotate,
                        split,
                        self.params.cut_width,
                    ) else {
                        continue;
                    };

                    let mut candidate = match state.fork_without(fi, self.pool) {
                        Ok(c) => c,
                        Err(e) => {
                            release_best(best, self.pool);
                            return Err(e.into());
                        }
                    };
                    candidate.used.push(cut.used);
                    let mut failed = None;
                    for leftover in cut.leftovers() {
                        match self.pool.insert(leftover) {
                            Ok(h) => candidate.free.push(h),
                            Err(e) => {
                                failed = Some(e);
                                break;
                            }
                        }
                    }
                    if let Some(e) = failed {
                        candidate.release(self.pool);
                        release_best(best, self.pool);
                        return Err(e.into());
                    }

                    let fitness = if lookahead && !rest.is_empty() {
                        match self.complete_greedy(&candidate, rest) {
                            Ok(f) => f,
                            Err(SolveError::Unsolvable) => {
                                // Local pruning signal only: this
                                // combination cannot host the remaining
                                // items, others may.
                                candidate.release(self.pool);
                                continue;
                            }
                            Err(e) => {
                                candidate.release(self.pool);
                                release_best(best, self.pool);
                                return Err(e);
                            }
                        }
                    } else {
                        self.score(&candidate)
                    };

                    let replaces = match &best {
                        Some((_, best_fitness)) => fitness.better_than(best_fitness),
                        None => true,
                    };
                    if replaces {
                        release_best(best.take(), self.pool);
                        best = Some((candidate, fitness));
                    } else {
                        candidate.release(self.pool);
                    }
                }
            }
        }

        match best {
            Some((state, _)) => Ok(state),
            None => Err(SolveError::Unsolvable),
        }
    }

    /// Forward-greedy lookahead: greedily place every remaining item on a
    /// probe fork of `candidate`, score the fully placed state, then drop
    /// the probe so only the candidate's own contribution survives.
    fn complete_greedy(
        &mut self,
        candidate: &SearchState,
        rest: &[usize],
    ) -> Result<Fitness, SolveError> {
        let probe = candidate.fork(self.pool)?;
        let done = self.run_greedy(probe, rest)?;
        let fitness = self.score(&done);
        done.release(self.pool);
        Ok(fitness)
    }

    /// Plain greedy over `items`, consuming `state`. The state is released
    /// on every exit path; on success the final state is returned.
    fn run_greedy(
        &mut self,
        mut state: SearchState,
        items: &[usize],
    ) -> Result<SearchState, SolveError> {
        for (i, &item_idx) in items.iter().enumerate() {
            match self.best_step(&state, item_idx, &items[i + 1..], false) {
                Ok(next) => {
                    state.release(self.pool);
                    state = next;
                }
                Err(e) => {
                    state.release(self.pool);
                    return Err(e);
                }
            }
        }
        Ok(state)
    }
}

fn release_best(best: Option<(SearchState, Fitness)>, pool: &mut Pool<Unused>) {
    if let Some((state, _)) = best {
        state.release(pool);
    }
}

/// Processing order: indices sorted by descending area. `total_cmp` plus a
/// stable sort keeps the order, and therefore every tie-break downstream,
/// bit-reproducible.
fn descending_area_order(areas: impl Iterator<Item = f64>) -> Vec<usize> {
    let areas: Vec<f64> = areas.collect();
    let mut order: Vec<usize> = (0..areas.len()).collect();
    order.sort_by(|&a, &b| areas[b].total_cmp(&areas[a]));
    order
}

/// Computes a layout placing every item of `params` onto its panels.
///
/// The pool must be exclusively owned by this call; reusing one pool across
/// concurrent calculations is not supported. On success every transient
/// slot has been returned, so `pool.live()` is back to its entry value.
pub fn calculate(
    pool: &mut Pool<Unused>,
    method: Method,
    params: &Params,
) -> Result<Layout, SolveError> {
    tracing::debug!(
        panels = params.panels.len(),
        items = params.items.len(),
        ?method,
        "calculate"
    );

    let panel_order = descending_area_order(params.panels.iter().map(|p| p.area()));
    let item_order = descending_area_order(params.items.iter().map(|i| i.area()));

    let mut initial = SearchState {
        used: Vec::new(),
        free: Vec::with_capacity(params.panels.len()),
    };
    for &pi in &panel_order {
        let panel = &params.panels[pi];
        let rect = Unused {
            panel: pi,
            width: panel.width,
            height: panel.height,
            x: 0.0,
            y: 0.0,
            initial: true,
        };
        match pool.insert(rect) {
            Ok(h) => initial.free.push(h),
            Err(e) => {
                initial.release(pool);
                return Err(e.into());
            }
        }
    }

    let mut search = Search {
        params,
        pool,
        scorer: Evaluator::new(params.panels.len()),
    };
    let lookahead = method == Method::ForwardGreedy;

    let mut state = initial;
    for (i, &item_idx) in item_order.iter().enumerate() {
        match search.best_step(&state, item_idx, &item_order[i + 1..], lookahead) {
            Ok(next) => {
                state.release(search.pool);
                state = next;
            }
            Err(e) => {
                state.release(search.pool);
                tracing::debug!(error = %e, "calculate failed");
                return Err(e);
            }
        }
    }

    let SearchState { used, free } = state;
    let unused: Vec<Unused> = free.iter().map(|&h| pool[h]).collect();
    for h in free {
        pool.remove(h);
    }

    tracing::debug!(used = used.len(), unused = unused.len(), "calculate done");
    Ok(Layout { used, unused })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, Panel};

    fn solve(method: Method, params: &Params) -> Result<Layout, SolveError> {
        let mut pool = Pool::new();
        let result = calculate(&mut pool, method, params);
        // Memory discipline: every branch returned its slots.
        assert_eq!(pool.live(), 0);
        result
    }

    /// Validates a layout against the params:
    /// 1. every item placed exactly once;
    /// 2. every placement and free rect inside its panel's bounds;
    /// 3. no two placements on the same panel overlap;
    /// 4. no placement overlaps a free rect on the same panel.
    fn assert_layout_valid(params: &Params, layout: &Layout) {
        assert_eq!(layout.used.len(), params.items.len());
        let mut placed: Vec<usize> = layout.used.iter().map(|u| u.item).collect();
        placed.sort();
        placed.dedup();
        assert_eq!(placed.len(), params.items.len(), "item placed twice");

        let rects: Vec<(usize, f64, f64, f64, f64)> = layout
            .used
            .iter()
            .map(|u| {
                let item = &params.items[u.item];
                let (w, h) = if u.rotate {
                    (item.height, item.width)
                } else {
                    (item.width, item.height)
                };
                (u.panel, u.x, u.y, w, h)
            })
            .chain(
                layout
                    .unused
                    .iter()
                    .map(|u| (u.panel, u.x, u.y, u.width, u.height)),
            )
            .collect();

        for &(panel, x, y, w, h) in &rects {
            let p = &params.panels[panel];
            assert!(
                x >= 0.0 && y >= 0.0 && x + w <= p.width + 1e-9 && y + h <= p.height + 1e-9,
                "rect {w}x{h} at ({x}, {y}) exceeds panel '{}'",
                p.id
            );
        }

        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                let (pa, ax, ay, aw, ah) = rects[i];
                let (pb, bx, by, bw, bh) = rects[j];
                if pa != pb {
                    continue;
                }
                let overlaps =
                    ax < bx + bw - 1e-9 && bx < ax + aw - 1e-9 && ay < by + bh - 1e-9 && by < ay + ah - 1e-9;
                assert!(
                    !overlaps,
                    "rect {i} ({aw}x{ah} @ ({ax},{ay})) overlaps rect {j} ({bw}x{bh} @ ({bx},{by}))"
                );
            }
        }
    }

    #[test]
    fn test_single_item_on_single_panel() {
        // One 50x50 item on a 100x100 panel: placed at the origin, two
        // leftovers of combined area 7500.
        let params = Params::new(
            0.0,
            false,
            vec![Panel::new("p", 100.0, 100.0)],
            vec![Item::new("i", 50.0, 50.0, false)],
        )
        .unwrap();
        let layout = solve(Method::Greedy, &params).unwrap();
        assert_layout_valid(&params, &layout);
        assert_eq!((layout.used[0].x, layout.used[0].y), (0.0, 0.0));
        assert!(!layout.used[0].rotate);
        assert_eq!(layout.unused.len(), 2);
        let leftover: f64 = layout.unused.iter().map(|u| u.area()).sum();
        assert_eq!(leftover, 7500.0);
    }

    #[test]
    fn test_kerf_consumes_residual() {
        // 10x10 panel, kerf 1, two 10x4 items: second lands at y=5, and the
        // final 1-wide band is fully consumed by the cuts.
        let params = Params::new(
            1.0,
            false,
            vec![Panel::new("p", 10.0, 10.0)],
            vec![
                Item::new("a", 10.0, 4.0, false),
                Item::new("b", 10.0, 4.0, false),
            ],
        )
        .unwrap();
        let layout = solve(Method::Greedy, &params).unwrap();
        assert_layout_valid(&params, &layout);
        let mut ys: Vec<f64> = layout.used.iter().map(|u| u.y).collect();
        ys.sort_by(f64::total_cmp);
        assert_eq!(ys, vec![0.0, 5.0]);
        assert!(layout.unused.is_empty());
    }

    #[test]
    fn test_oversized_item_is_unsolvable() {
        let params = Params::new(
            0.0,
            false,
            vec![Panel::new("p", 5.0, 5.0)],
            vec![Item::new("i", 6.0, 6.0, false)],
        )
        .unwrap();
        assert_eq!(solve(Method::Greedy, &params), Err(SolveError::Unsolvable));
        assert_eq!(
            solve(Method::ForwardGreedy, &params),
            Err(SolveError::Unsolvable)
        );
    }

    #[test]
    fn test_rotation_required() {
        let panels = vec![Panel::new("p", 100.0, 50.0)];
        let rigid = Params::new(0.0, false, panels.clone(), vec![Item::new("i", 50.0, 100.0, false)])
            .unwrap();
        assert_eq!(solve(Method::Greedy, &rigid), Err(SolveError::Unsolvable));

        let rotatable =
            Params::new(0.0, false, panels, vec![Item::new("i", 50.0, 100.0, true)]).unwrap();
        let layout = solve(Method::Greedy, &rotatable).unwrap();
        assert_layout_valid(&rotatable, &layout);
        assert!(layout.used[0].rotate);
    }

    #[test]
    fn test_min_initial_usage_touches_one_panel() {
        // Two equal panels, one item: exactly one panel is cut into, the
        // other survives as its initial free rect.
        let params = Params::new(
            0.0,
            true,
            vec![Panel::new("a", 100.0, 100.0), Panel::new("b", 100.0, 100.0)],
            vec![Item::new("i", 50.0, 50.0, false)],
        )
        .unwrap();
        let layout = solve(Method::Greedy, &params).unwrap();
        assert_layout_valid(&params, &layout);
        let untouched = layout.unused.iter().filter(|u| u.initial).count();
        assert_eq!(untouched, params.panels.len() - 1);
    }

    #[test]
    fn test_min_initial_usage_consolidates() {
        // Both items fit on one panel; the objective must not spread them.
        let params = Params::new(
            0.0,
            true,
            vec![Panel::new("a", 100.0, 100.0), Panel::new("b", 100.0, 100.0)],
            vec![
                Item::new("i0", 10.0, 10.0, false),
                Item::new("i1", 10.0, 10.0, false),
            ],
        )
        .unwrap();
        for method in [Method::Greedy, Method::ForwardGreedy] {
            let layout = solve(method, &params).unwrap();
            assert_layout_valid(&params, &layout);
            assert_eq!(layout.used[0].panel, layout.used[1].panel);
            assert_eq!(layout.unused.iter().filter(|u| u.initial).count(), 1);
        }
    }

    #[test]
    fn test_larger_items_processed_first() {
        let params = Params::new(
            0.0,
            false,
            vec![Panel::new("p", 100.0, 100.0)],
            vec![
                Item::new("small", 10.0, 10.0, false),
                Item::new("large", 90.0, 90.0, false),
            ],
        )
        .unwrap();
        let layout = solve(Method::Greedy, &params).unwrap();
        assert_layout_valid(&params, &layout);
        // The large item claims the origin despite being listed second.
        let large = layout.used.iter().find(|u| u.item == 1).unwrap();
        assert_eq!((large.x, large.y), (0.0, 0.0));
    }

    #[test]
    fn test_deterministic_reruns() {
        let params = Params::new(
            2.0,
            true,
            vec![Panel::new("a", 250.0, 120.0), Panel::new("b", 250.0, 120.0)],
            vec![
                Item::new("i0", 80.0, 60.0, true),
                Item::new("i1", 80.0, 60.0, true),
                Item::new("i2", 100.0, 40.0, false),
                Item::new("i3", 35.0, 35.0, true),
                Item::new("i4", 120.0, 55.0, true),
            ],
        )
        .unwrap();
        for method in [Method::Greedy, Method::ForwardGreedy] {
            let first = solve(method, &params).unwrap();
            let second = solve(method, &params).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_forward_greedy_places_all_items() {
        let params = Params::new(
            3.0,
            false,
            vec![Panel::new("a", 300.0, 200.0), Panel::new("b", 200.0, 150.0)],
            vec![
                Item::new("i0", 150.0, 100.0, true),
                Item::new("i1", 120.0, 80.0, true),
                Item::new("i2", 90.0, 90.0, false),
                Item::new("i3", 60.0, 40.0, true),
                Item::new("i4", 60.0, 40.0, true),
                Item::new("i5", 30.0, 20.0, true),
            ],
        )
        .unwrap();
        let layout = solve(Method::ForwardGreedy, &params).unwrap();
        assert_layout_valid(&params, &layout);
    }

    #[test]
    fn test_area_conservation() {
        let params = Params::new(
            4.0,
            false,
            vec![Panel::new("p", 400.0, 300.0)],
            vec![
                Item::new("i0", 180.0, 120.0, true),
                Item::new("i1", 100.0, 90.0, true),
                Item::new("i2", 80.0, 50.0, false),
            ],
        )
        .unwrap();
        let layout = solve(Method::Greedy, &params).unwrap();
        assert_layout_valid(&params, &layout);
        let used_area: f64 = layout.used.iter().map(|u| params.items[u.item].area()).sum();
        let unused_area: f64 = layout.unused.iter().map(|u| u.area()).sum();
        // The remainder is the kerf the cuts consumed.
        assert!(used_area + unused_area <= params.panels_area() + 1e-9);
    }

    #[test]
    fn test_no_items_returns_initial_rects() {
        let params = Params::new(
            0.0,
            false,
            vec![Panel::new("a", 10.0, 20.0), Panel::new("b", 30.0, 5.0)],
            vec![],
        )
        .unwrap();
        let layout = solve(Method::Greedy, &params).unwrap();
        assert!(layout.used.is_empty());
        assert_eq!(layout.unused.len(), 2);
        assert!(layout.unused.iter().all(|u| u.initial));
    }

    #[test]
    fn test_pool_exhaustion_is_fatal_and_balanced() {
        let params = Params::new(
            0.0,
            false,
            vec![Panel::new("a", 100.0, 100.0), Panel::new("b", 100.0, 100.0)],
            vec![
                Item::new("i0", 10.0, 10.0, true),
                Item::new("i1", 10.0, 10.0, true),
                Item::new("i2", 10.0, 10.0, true),
            ],
        )
        .unwrap();
        let mut pool = Pool::with_limit(3);
        let err = calculate(&mut pool, Method::Greedy, &params).unwrap_err();
        assert!(matches!(err, SolveError::Pool(_)));
        // Even the failure path hands every slot back.
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn test_forward_greedy_not_worse_on_split_choice() {
        // A case where the split orientation chosen for the first item
        // decides whether the second fits on the same panel.
        let params = Params::new(
            0.0,
            true,
            vec![Panel::new("a", 100.0, 100.0), Panel::new("b", 100.0, 100.0)],
            vec![
                Item::new("wide", 100.0, 60.0, false),
                Item::new("low", 100.0, 40.0, false),
            ],
        )
        .unwrap();
        let layout = solve(Method::ForwardGreedy, &params).unwrap();
        assert_layout_valid(&params, &layout);
        assert_eq!(layout.used[0].panel, layout.used[1].panel);
    }
}
