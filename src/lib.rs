//! 2D guillotine cutting-stock solver.
//!
//! Given rectangular stock panels and rectangular items, computes where to
//! cut each item, honoring a fixed kerf and optional 90° rotation. Every
//! cut is a guillotine cut, so a placement splits a free rectangle into at
//! most two residuals. Two heuristics are provided: plain greedy and
//! forward-greedy (one-ply lookahead).

pub mod fitness;
pub mod geometry;
pub mod io;
pub mod pool;
pub mod render;
pub mod solver;
pub mod types;

pub use pool::Pool;
pub use solver::calculate;
pub use types::{Item, Layout, Method, Panel, Params, SolveError, Unused, Used};
