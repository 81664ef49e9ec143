use crate::pool::PoolError;

/// A stock sheet to cut pieces from. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

impl Panel {
    pub fn new(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A rectangular piece that must be cut out of some panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub can_rotate: bool,
}

impl Item {
    pub fn new(id: impl Into<String>, width: f64, height: f64, can_rotate: bool) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            can_rotate,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Default weight of the fitness tie-break term.
pub const DEFAULT_FITNESS_K: f64 = 0.03;

/// Validated calculation input. Construction enforces the invariants the
/// solver relies on: strictly positive dimensions, non-negative kerf and
/// unique panel/item ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub cut_width: f64,
    pub min_initial_usage: bool,
    pub fitness_k: f64,
    pub panels: Vec<Panel>,
    pub items: Vec<Item>,
    panels_area: f64,
}

impl Params {
    pub fn new(
        cut_width: f64,
        min_initial_usage: bool,
        panels: Vec<Panel>,
        items: Vec<Item>,
    ) -> Result<Self, InvalidParams> {
        Self::with_fitness_k(cut_width, min_initial_usage, DEFAULT_FITNESS_K, panels, items)
    }

    pub fn with_fitness_k(
        cut_width: f64,
        min_initial_usage: bool,
        fitness_k: f64,
        panels: Vec<Panel>,
        items: Vec<Item>,
    ) -> Result<Self, InvalidParams> {
        if !(cut_width >= 0.0) {
            return Err(InvalidParams::NegativeCutWidth(cut_width));
        }
        if !fitness_k.is_finite() {
            return Err(InvalidParams::InvalidFitnessK(fitness_k));
        }
        for panel in &panels {
            if !(panel.width > 0.0) || !(panel.height > 0.0) {
                return Err(InvalidParams::NonPositivePanel(panel.id.clone()));
            }
        }
        for item in &items {
            if !(item.width > 0.0) || !(item.height > 0.0) {
                return Err(InvalidParams::NonPositiveItem(item.id.clone()));
            }
        }
        check_unique(panels.iter().map(|p| p.id.as_str()))
            .map_err(|id| InvalidParams::DuplicatePanelId(id.to_string()))?;
        check_unique(items.iter().map(|i| i.id.as_str()))
            .map_err(|id| InvalidParams::DuplicateItemId(id.to_string()))?;

        let panels_area = panels.iter().map(Panel::area).sum();
        Ok(Self {
            cut_width,
            min_initial_usage,
            fitness_k,
            panels,
            items,
            panels_area,
        })
    }

    /// Total panel area, computed once at construction.
    pub fn panels_area(&self) -> f64 {
        self.panels_area
    }
}

fn check_unique<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), &'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for id in ids {
        if seen.contains(&id) {
            return Err(id);
        }
        seen.push(id);
    }
    Ok(())
}

/// A committed placement: item `item` sits on panel `panel` with its
/// lower-left corner at `(x, y)`. Indices refer to the `Params` vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Used {
    pub panel: usize,
    pub item: usize,
    pub x: f64,
    pub y: f64,
    pub rotate: bool,
}

/// A free rectangle of a panel not yet assigned to any item. `initial` is
/// true only while the rect still covers its whole untouched panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unused {
    pub panel: usize,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub initial: bool,
}

impl Unused {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Final output of a calculation: every item placed exactly once, plus the
/// leftover free rectangles.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub used: Vec<Used>,
    pub unused: Vec<Unused>,
}

/// Placement search variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Rank each candidate by its immediate fitness.
    Greedy,
    /// Rank each candidate by the fitness of a full greedy completion of
    /// the remaining items (one-ply lookahead).
    ForwardGreedy,
}

/// Input that violates the `Params` invariants. Always detected before the
/// solver runs.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidParams {
    NegativeCutWidth(f64),
    InvalidFitnessK(f64),
    NonPositivePanel(String),
    NonPositiveItem(String),
    DuplicatePanelId(String),
    DuplicateItemId(String),
}

impl std::fmt::Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeCutWidth(w) => write!(f, "cut_width must be >= 0, got {w}"),
            Self::InvalidFitnessK(k) => write!(f, "fitness_k must be finite, got {k}"),
            Self::NonPositivePanel(id) => {
                write!(f, "panel '{id}' must have positive width and height")
            }
            Self::NonPositiveItem(id) => {
                write!(f, "item '{id}' must have positive width and height")
            }
            Self::DuplicatePanelId(id) => write!(f, "duplicate panel id '{id}'"),
            Self::DuplicateItemId(id) => write!(f, "duplicate item id '{id}'"),
        }
    }
}

impl std::error::Error for InvalidParams {}

/// Outcome classes of `solver::calculate` other than success.
///
/// `Unsolvable` is a normal result of the search (some item has no feasible
/// placement); `Pool` means the slot budget ran out and the whole
/// calculation must be treated as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    Unsolvable,
    Pool(PoolError),
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsolvable => write!(f, "no feasible placement for every item"),
            Self::Pool(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SolveError {}

impl From<PoolError> for SolveError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}
