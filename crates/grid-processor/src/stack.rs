//! Depth stack assembly.
//!
//! A stack is built from a [`LayerCatalog`] (available depth → handle) and a
//! list of requested levels. The first requested level defines the grid and
//! the reference shape; every later level that is absent, unreadable or of
//! the wrong shape becomes an all-`NaN` layer instead of failing the stack.

use std::fmt;

use field_common::{Grid, GridShape, ScalarField, VectorField};
use tracing::{debug, warn};

use crate::config::RegridConfig;
use crate::error::{GridProcessorError, Result};
use crate::regrid::{regrid, regrid_vector};

/// Tolerance (metres) when matching a requested depth to an available one.
pub const DEPTH_TOLERANCE: f64 = 1e-6;

/// A 2D layer that can be stacked by depth.
pub trait StackLayer: Sized {
    fn shape(&self) -> GridShape;

    /// Placeholder for a depth with no usable data.
    fn missing(shape: GridShape) -> Self;

    /// Resample the layer from `source` onto `target`.
    fn regrid(&self, source: &Grid, target: &Grid, config: &RegridConfig) -> Result<Self>;
}

impl StackLayer for ScalarField {
    fn shape(&self) -> GridShape {
        ScalarField::shape(self)
    }

    fn missing(shape: GridShape) -> Self {
        ScalarField::missing(shape)
    }

    fn regrid(&self, source: &Grid, target: &Grid, config: &RegridConfig) -> Result<Self> {
        regrid(self, source, target, config)
    }
}

impl StackLayer for VectorField {
    fn shape(&self) -> GridShape {
        VectorField::shape(self)
    }

    fn missing(shape: GridShape) -> Self {
        VectorField::missing(shape)
    }

    fn regrid(&self, source: &Grid, target: &Grid, config: &RegridConfig) -> Result<Self> {
        regrid_vector(self, source, target, config)
    }
}

/// Handle to one depth's data, read lazily.
pub trait LayerSource {
    type Layer: StackLayer;
    type Error: fmt::Display;

    /// Read the layer and the grid it lives on.
    fn read_layer(&self) -> std::result::Result<(Self::Layer, Grid), Self::Error>;
}

/// Available depths and their handles.
#[derive(Debug, Clone)]
pub struct LayerCatalog<S> {
    entries: Vec<(f64, S)>,
}

impl<S> Default for LayerCatalog<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S> LayerCatalog<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle. A second handle for the same depth replaces the first.
    pub fn insert(&mut self, depth: f64, source: S) {
        match self
            .entries
            .iter_mut()
            .find(|(d, _)| (d - depth).abs() <= DEPTH_TOLERANCE)
        {
            Some(entry) => entry.1 = source,
            None => self.entries.push((depth, source)),
        }
    }

    /// Handle for `depth`, if one is within [`DEPTH_TOLERANCE`].
    pub fn get(&self, depth: f64) -> Option<&S> {
        self.entries
            .iter()
            .find(|(d, _)| (d - depth).abs() <= DEPTH_TOLERANCE)
            .map(|(_, s)| s)
    }

    /// Available depths in insertion order.
    pub fn depths(&self) -> Vec<f64> {
        self.entries.iter().map(|(d, _)| *d).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> FromIterator<(f64, S)> for LayerCatalog<S> {
    fn from_iter<I: IntoIterator<Item = (f64, S)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (depth, source) in iter {
            catalog.insert(depth, source);
        }
        catalog
    }
}

/// Why a level was filled with `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum FillReason {
    /// No handle for the depth.
    Absent,
    /// The handle failed to read.
    ReadFailed(String),
    /// Regridding the layer failed.
    RegridFailed(String),
    /// The layer's shape differs from the reference.
    ShapeMismatch {
        expected: GridShape,
        actual: GridShape,
    },
}

impl fmt::Display for FillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillReason::Absent => write!(f, "absent"),
            FillReason::ReadFailed(e) => write!(f, "read failed: {e}"),
            FillReason::RegridFailed(e) => write!(f, "regrid failed: {e}"),
            FillReason::ShapeMismatch { expected, actual } => {
                write!(f, "shape {actual} does not match {expected}")
            }
        }
    }
}

/// A level that holds a `NaN` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct FilledLevel {
    pub depth: f64,
    pub reason: FillReason,
}

/// Layers aligned one-to-one with the requested levels.
#[derive(Debug, Clone)]
pub struct DepthStack<L> {
    levels: Vec<f64>,
    layers: Vec<L>,
    grid: Grid,
    filled: Vec<FilledLevel>,
}

impl<L: StackLayer> DepthStack<L> {
    /// Requested depths, in request order.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    pub fn layers(&self) -> &[L] {
        &self.layers
    }

    /// Layer at the `index`-th requested level.
    pub fn layer(&self, index: usize) -> Option<&L> {
        self.layers.get(index)
    }

    /// Grid shared by all layers.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Levels that were filled with `NaN`.
    pub fn filled(&self) -> &[FilledLevel] {
        &self.filled
    }

    pub fn shape(&self) -> GridShape {
        self.grid.shape()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn into_parts(self) -> (Grid, Vec<f64>, Vec<L>) {
        (self.grid, self.levels, self.layers)
    }
}

/// Builds [`DepthStack`]s for a fixed list of requested levels.
#[derive(Debug, Clone)]
pub struct StackAssembler {
    levels: Vec<f64>,
    target: Option<Grid>,
    regrid: RegridConfig,
}

impl StackAssembler {
    pub fn new(levels: impl Into<Vec<f64>>) -> Self {
        Self {
            levels: levels.into(),
            target: None,
            regrid: RegridConfig::default(),
        }
    }

    /// Regrid every layer onto `target`; the stack then lives on `target`.
    pub fn regrid_onto(mut self, target: Grid, config: RegridConfig) -> Self {
        self.target = Some(target);
        self.regrid = config;
        self
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Assemble a stack from the handles in `catalog`.
    ///
    /// Fails only when the first requested level cannot be produced.
    pub fn assemble<S: LayerSource>(&self, catalog: &LayerCatalog<S>) -> Result<DepthStack<S::Layer>> {
        let Some((&first, rest)) = self.levels.split_first() else {
            return Err(GridProcessorError::stack_build("no depth levels requested"));
        };

        let source = catalog.get(first).ok_or_else(|| {
            GridProcessorError::stack_build(format!("first depth {first} m is not available"))
        })?;
        let (layer, grid) = source.read_layer().map_err(|e| {
            GridProcessorError::stack_build(format!("failed to read first depth {first} m: {e}"))
        })?;
        let (first_layer, grid) = match &self.target {
            Some(target) => {
                let layer = layer.regrid(&grid, target, &self.regrid).map_err(|e| {
                    GridProcessorError::stack_build(format!(
                        "failed to regrid first depth {first} m: {e}"
                    ))
                })?;
                (layer, target.clone())
            }
            None => {
                if layer.shape() != grid.shape() {
                    return Err(GridProcessorError::stack_build(format!(
                        "first depth {first} m has shape {} on a {} grid",
                        layer.shape(),
                        grid.shape()
                    )));
                }
                (layer, grid)
            }
        };

        let reference = first_layer.shape();
        let mut layers = Vec::with_capacity(self.levels.len());
        layers.push(first_layer);
        let mut filled = Vec::new();

        for &depth in rest {
            match self.load_level(catalog.get(depth), reference) {
                Ok(layer) => layers.push(layer),
                Err(reason) => {
                    warn!(depth, reason = %reason, "Depth unavailable, filling with NaN");
                    layers.push(<S::Layer as StackLayer>::missing(reference));
                    filled.push(FilledLevel { depth, reason });
                }
            }
        }

        debug!(
            levels = self.levels.len(),
            filled = filled.len(),
            shape = %reference,
            "Depth stack assembled"
        );

        Ok(DepthStack {
            levels: self.levels.clone(),
            layers,
            grid,
            filled,
        })
    }

    fn load_level<S: LayerSource>(
        &self,
        source: Option<&S>,
        reference: GridShape,
    ) -> std::result::Result<S::Layer, FillReason> {
        let source = source.ok_or(FillReason::Absent)?;
        let (layer, grid) = source
            .read_layer()
            .map_err(|e| FillReason::ReadFailed(e.to_string()))?;

        let layer = match &self.target {
            Some(target) => layer
                .regrid(&grid, target, &self.regrid)
                .map_err(|e| FillReason::RegridFailed(e.to_string()))?,
            None => layer,
        };

        if layer.shape() != reference {
            return Err(FillReason::ShapeMismatch {
                expected: reference,
                actual: layer.shape(),
            });
        }
        Ok(layer)
    }
}
