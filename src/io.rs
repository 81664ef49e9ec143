//! JSON wire format: parameter loading and result writing.
//!
//! Panels and items are identified by id on the wire; the solver works
//! with indices internally, so this layer owns the mapping in both
//! directions.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::types::{
    DEFAULT_FITNESS_K, InvalidParams, Item, Layout, Panel, Params, Unused, Used,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct PanelDoc {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemDoc {
    pub id: String,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub can_rotate: bool,
}

/// Wire shape of the calculation parameters.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParamsDoc {
    pub cut_width: f64,
    #[serde(default)]
    pub min_initial_usage: bool,
    #[serde(default = "default_fitness_k")]
    pub fitness_k: f64,
    pub panels: Vec<PanelDoc>,
    pub items: Vec<ItemDoc>,
}

fn default_fitness_k() -> f64 {
    DEFAULT_FITNESS_K
}

impl ParamsDoc {
    pub fn into_params(self) -> Result<Params, InvalidParams> {
        Params::with_fitness_k(
            self.cut_width,
            self.min_initial_usage,
            self.fitness_k,
            self.panels
                .into_iter()
                .map(|p| Panel::new(p.id, p.width, p.height))
                .collect(),
            self.items
                .into_iter()
                .map(|i| Item::new(i.id, i.width, i.height, i.can_rotate))
                .collect(),
        )
    }

    pub fn from_params(params: &Params) -> Self {
        Self {
            cut_width: params.cut_width,
            min_initial_usage: params.min_initial_usage,
            fitness_k: params.fitness_k,
            panels: params
                .panels
                .iter()
                .map(|p| PanelDoc {
                    id: p.id.clone(),
                    width: p.width,
                    height: p.height,
                })
                .collect(),
            items: params
                .items
                .iter()
                .map(|i| ItemDoc {
                    id: i.id.clone(),
                    width: i.width,
                    height: i.height,
                    can_rotate: i.can_rotate,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsedDoc {
    pub panel: String,
    pub item: String,
    pub x: f64,
    pub y: f64,
    pub rotate: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnusedDoc {
    pub panel: String,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
}

/// Wire shape of a calculation result: the echoed parameters plus the
/// placements and leftover free rectangles.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultDoc {
    pub params: ParamsDoc,
    pub used: Vec<UsedDoc>,
    pub unused: Vec<UnusedDoc>,
}

pub fn result_doc(params: &Params, layout: &Layout) -> ResultDoc {
    let used = layout
        .used
        .iter()
        .map(|u: &Used| UsedDoc {
            panel: params.panels[u.panel].id.clone(),
            item: params.items[u.item].id.clone(),
            x: u.x,
            y: u.y,
            rotate: u.rotate,
        })
        .collect();
    let unused = layout
        .unused
        .iter()
        .map(|u: &Unused| UnusedDoc {
            panel: params.panels[u.panel].id.clone(),
            width: u.width,
            height: u.height,
            x: u.x,
            y: u.y,
        })
        .collect();
    ResultDoc {
        params: ParamsDoc::from_params(params),
        used,
        unused,
    }
}

/// Failure to produce valid `Params` from raw input.
#[derive(Debug)]
pub enum LoadError {
    Json(serde_json::Error),
    Invalid(InvalidParams),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "invalid parameters json: {e}"),
            Self::Invalid(e) => write!(f, "invalid parameters: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<InvalidParams> for LoadError {
    fn from(e: InvalidParams) -> Self {
        Self::Invalid(e)
    }
}

/// Reads, parses and validates calculation parameters.
pub fn load_params(reader: impl Read) -> Result<Params, LoadError> {
    let doc: ParamsDoc = serde_json::from_reader(reader)?;
    Ok(doc.into_params()?)
}

/// Writes the result as a single JSON document followed by a newline.
pub fn write_result(
    mut writer: impl Write,
    params: &Params,
    layout: &Layout,
) -> std::io::Result<()> {
    let doc = result_doc(params, layout);
    serde_json::to_writer(&mut writer, &doc)?;
    writeln!(writer)
}
