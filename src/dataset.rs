use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use ndarray::{concatenate, Array, ArrayD, ArrayViewD, Axis, Dimension, Zip};
use strum_macros::{Display, EnumString};

use crate::error::ScoreError;
use crate::rank::rank_data;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    Int(i64),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{v}"),
            Label::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl From<i32> for Label {
    fn from(v: i32) -> Self {
        Label::Int(v as i64)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DType {
    #[strum(serialize = "float64")]
    Float64,
    #[strum(serialize = "int64")]
    Int64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Values {
    F64(ArrayD<f64>),
    I64(ArrayD<i64>),
}

impl Values {
    pub fn dtype(&self) -> DType {
        match self {
            Values::F64(_) => DType::Float64,
            Values::I64(_) => DType::Int64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Values::F64(a) => a.shape(),
            Values::I64(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn as_f64(&self) -> Option<&ArrayD<f64>> {
        match self {
            Values::F64(a) => Some(a),
            Values::I64(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<&ArrayD<i64>> {
        match self {
            Values::I64(a) => Some(a),
            Values::F64(_) => None,
        }
    }

    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            Values::F64(a) => a.clone(),
            Values::I64(a) => a.mapv(|v| v as f64),
        }
    }

    fn permuted(&self, order: &[usize]) -> Values {
        match self {
            Values::F64(a) => Values::F64(a.clone().permuted_axes(order.to_vec())),
            Values::I64(a) => Values::I64(a.clone().permuted_axes(order.to_vec())),
        }
    }

    fn select(&self, axis: Axis, indices: &[usize]) -> Values {
        match self {
            Values::F64(a) => Values::F64(a.select(axis, indices)),
            Values::I64(a) => Values::I64(a.select(axis, indices)),
        }
    }

    fn index_axis(&self, axis: Axis, index: usize) -> Values {
        match self {
            Values::F64(a) => Values::F64(a.index_axis(axis, index).to_owned()),
            Values::I64(a) => Values::I64(a.index_axis(axis, index).to_owned()),
        }
    }
}

impl<D: Dimension> From<Array<f64, D>> for Values {
    fn from(a: Array<f64, D>) -> Self {
        Values::F64(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<i64, D>> for Values {
    fn from(a: Array<i64, D>) -> Self {
        Values::I64(a.into_dyn())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    dims: Vec<String>,
    values: Values,
}

impl Variable {
    pub fn new<I, S>(dims: I, values: impl Into<Values>) -> Result<Self, ScoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        let values = values.into();
        if dims.len() != values.ndim() {
            return Err(ScoreError::DimensionCount {
                expected: values.ndim(),
                found: dims.len(),
            });
        }
        let mut seen = HashSet::new();
        for dim in &dims {
            if !seen.insert(dim.as_str()) {
                return Err(ScoreError::DuplicateDimension { dim: dim.clone() });
            }
        }
        Ok(Self { dims, values })
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn axis_of(&self, dim: &str) -> Option<Axis> {
        self.dims.iter().position(|d| d == dim).map(Axis)
    }

    pub fn len_of(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|axis| self.values.shape()[axis.index()])
    }
}

/// Labels within a coordinate are unique; arrays from different datasets
/// are matched by label, never by position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    coords: BTreeMap<String, Vec<Label>>,
    data_vars: BTreeMap<String, Variable>,
}

fn check_unique(dim: &str, labels: &[Label]) -> Result<(), ScoreError> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label) {
            return Err(ScoreError::DuplicateLabel {
                dim: dim.to_string(),
                label: label.to_string(),
            });
        }
    }
    Ok(())
}

fn label_positions(labels: &[Label]) -> HashMap<&Label, usize> {
    labels.iter().enumerate().map(|(i, l)| (l, i)).collect()
}

fn concat_values(axis: Axis, parts: &[Values]) -> Result<Values, ScoreError> {
    if parts.iter().all(|p| p.dtype() == DType::Int64) {
        let views: Vec<ArrayViewD<i64>> = parts
            .iter()
            .filter_map(Values::as_i64)
            .map(|a| a.view())
            .collect();
        return Ok(Values::I64(concatenate(axis, &views)?));
    }
    let owned: Vec<ArrayD<f64>> = parts.iter().map(Values::to_f64).collect();
    let views: Vec<ArrayViewD<f64>> = owned.iter().map(|a| a.view()).collect();
    Ok(Values::F64(concatenate(axis, &views)?))
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coord<S, L, I>(mut self, dim: S, labels: I) -> Result<Self, ScoreError>
    where
        S: Into<String>,
        L: Into<Label>,
        I: IntoIterator<Item = L>,
    {
        let dim = dim.into();
        let labels: Vec<Label> = labels.into_iter().map(Into::into).collect();
        check_unique(&dim, &labels)?;
        for var in self.data_vars.values() {
            if let Some(len) = var.len_of(&dim) {
                if len != labels.len() {
                    return Err(ScoreError::CoordinateLength {
                        dim,
                        expected: len,
                        found: labels.len(),
                    });
                }
            }
        }
        self.coords.insert(dim, labels);
        Ok(self)
    }

    pub fn with_var(
        mut self,
        name: impl Into<String>,
        variable: Variable,
    ) -> Result<Self, ScoreError> {
        for (dim, &len) in variable.dims.iter().zip(variable.values.shape()) {
            let labels = self
                .coords
                .get(dim)
                .ok_or_else(|| ScoreError::MissingCoordinate { dim: dim.clone() })?;
            if labels.len() != len {
                return Err(ScoreError::CoordinateLength {
                    dim: dim.clone(),
                    expected: labels.len(),
                    found: len,
                });
            }
        }
        self.data_vars.insert(name.into(), variable);
        Ok(self)
    }

    pub fn coord(&self, dim: &str) -> Option<&[Label]> {
        self.coords.get(dim).map(Vec::as_slice)
    }

    pub fn coords(&self) -> impl Iterator<Item = (&str, &[Label])> {
        self.coords.iter().map(|(d, l)| (d.as_str(), l.as_slice()))
    }

    pub fn var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.data_vars.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn var_names(&self) -> Vec<&str> {
        self.data_vars.keys().map(String::as_str).collect()
    }

    pub fn dims(&self) -> BTreeSet<&str> {
        self.coords.keys().map(String::as_str).collect()
    }

    pub fn len_of(&self, dim: &str) -> Option<usize> {
        self.coords.get(dim).map(Vec::len)
    }

    /// Returns a copy with the labels of `dim` replaced. `self` is untouched.
    pub fn assign_coord<L, I>(&self, dim: &str, labels: I) -> Result<Dataset, ScoreError>
    where
        L: Into<Label>,
        I: IntoIterator<Item = L>,
    {
        let current = self
            .coords
            .get(dim)
            .ok_or_else(|| ScoreError::MissingCoordinate { dim: dim.to_string() })?;
        let labels: Vec<Label> = labels.into_iter().map(Into::into).collect();
        if labels.len() != current.len() {
            return Err(ScoreError::CoordinateLength {
                dim: dim.to_string(),
                expected: current.len(),
                found: labels.len(),
            });
        }
        check_unique(dim, &labels)?;

        let mut relabelled = self.clone();
        relabelled.coords.insert(dim.to_string(), labels);
        Ok(relabelled)
    }

    /// Stacks datasets along `dim`.
    ///
    /// Every other dimension is inner-joined on its labels, keeping the
    /// label order of the first dataset, and each variable takes the axis
    /// order of its counterpart in the first dataset.
    pub fn concat(datasets: &[&Dataset], dim: &str) -> Result<Dataset, ScoreError> {
        let Some((first, rest)) = datasets.split_first() else {
            return Ok(Dataset::new());
        };

        let names = first.var_names();
        for ds in rest {
            let found = ds.var_names();
            if found != names {
                return Err(ScoreError::VariableMismatch {
                    expected: names.iter().map(|n| n.to_string()).collect(),
                    found: found.iter().map(|n| n.to_string()).collect(),
                });
            }
        }

        let mut coords = BTreeMap::new();
        let mut stacked = Vec::new();
        for ds in datasets {
            let labels = ds
                .coord(dim)
                .ok_or_else(|| ScoreError::MissingCoordinate { dim: dim.to_string() })?;
            stacked.extend(labels.iter().cloned());
        }
        check_unique(dim, &stacked)?;
        coords.insert(dim.to_string(), stacked);

        for (name, labels) in &first.coords {
            if name == dim {
                continue;
            }
            let mut others = Vec::with_capacity(rest.len());
            for ds in rest {
                let other = ds
                    .coord(name)
                    .ok_or_else(|| ScoreError::MissingCoordinate { dim: name.clone() })?;
                others.push(label_positions(other));
            }
            let joined: Vec<Label> = labels
                .iter()
                .filter(|l| others.iter().all(|pos| pos.contains_key(l)))
                .cloned()
                .collect();
            coords.insert(name.clone(), joined);
        }

        let mut data_vars = BTreeMap::new();
        for name in names {
            let head = &first.data_vars[name];
            let axis = head
                .axis_of(dim)
                .ok_or_else(|| ScoreError::MissingDimension {
                    variable: name.to_string(),
                    dim: dim.to_string(),
                })?;

            let mut parts = Vec::with_capacity(datasets.len());
            for ds in datasets {
                parts.push(ds.aligned(name, &head.dims, &coords, dim)?);
            }
            let values = concat_values(axis, &parts)?;
            data_vars.insert(
                name.to_string(),
                Variable {
                    dims: head.dims.clone(),
                    values,
                },
            );
        }

        Ok(Dataset { coords, data_vars })
    }

    // Reorders `name` to the axis order `order` and reindexes every axis
    // except `skip` onto the labels in `targets`.
    fn aligned(
        &self,
        name: &str,
        order: &[String],
        targets: &BTreeMap<String, Vec<Label>>,
        skip: &str,
    ) -> Result<Values, ScoreError> {
        let var = &self.data_vars[name];
        let found: BTreeSet<&String> = var.dims.iter().collect();
        let expected: BTreeSet<&String> = order.iter().collect();
        if found != expected {
            return Err(ScoreError::DimensionMismatch {
                dataset: format!("variable '{name}'"),
                expected: order.to_vec(),
                found: var.dims.clone(),
            });
        }

        let perm: Vec<usize> = order
            .iter()
            .filter_map(|d| var.dims.iter().position(|v| v == d))
            .collect();
        let mut values = var.values.permuted(&perm);

        for (k, d) in order.iter().enumerate() {
            if d == skip {
                continue;
            }
            let own = self
                .coord(d)
                .ok_or_else(|| ScoreError::MissingCoordinate { dim: d.clone() })?;
            let target = targets
                .get(d)
                .ok_or_else(|| ScoreError::MissingCoordinate { dim: d.clone() })?;
            let positions = label_positions(own);
            let mut indices = Vec::with_capacity(target.len());
            for label in target {
                let idx = positions.get(label).ok_or_else(|| ScoreError::LabelNotFound {
                    dim: d.clone(),
                    label: label.to_string(),
                })?;
                indices.push(*idx);
            }
            values = values.select(Axis(k), &indices);
        }
        Ok(values)
    }

    /// Average-tie, 1-based ranks along `dim`. Variables without `dim` are
    /// dropped; NaN stays NaN.
    pub fn rank(&self, dim: &str) -> Result<Dataset, ScoreError> {
        if !self.coords.contains_key(dim) {
            return Err(ScoreError::MissingCoordinate { dim: dim.to_string() });
        }

        let mut data_vars = BTreeMap::new();
        for (name, var) in &self.data_vars {
            let Some(axis) = var.axis_of(dim) else {
                continue;
            };
            let mut ranked = var.values.to_f64();
            Zip::from(ranked.lanes_mut(axis)).par_for_each(|mut lane| {
                let ranks = rank_data(&lane);
                lane.assign(&ranks);
            });
            data_vars.insert(
                name.clone(),
                Variable {
                    dims: var.dims.clone(),
                    values: Values::F64(ranked),
                },
            );
        }

        Ok(Dataset {
            coords: self.coords.clone(),
            data_vars,
        })
    }

    pub fn sel(&self, dim: &str, label: &Label) -> Result<Dataset, ScoreError> {
        let labels = self
            .coords
            .get(dim)
            .ok_or_else(|| ScoreError::MissingCoordinate { dim: dim.to_string() })?;
        let index = labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| ScoreError::LabelNotFound {
                dim: dim.to_string(),
                label: label.to_string(),
            })?;

        let mut coords = self.coords.clone();
        coords.remove(dim);

        let mut data_vars = BTreeMap::new();
        for (name, var) in &self.data_vars {
            let selected = match var.axis_of(dim) {
                Some(axis) => Variable {
                    dims: var.dims.iter().filter(|d| *d != dim).cloned().collect(),
                    values: var.values.index_axis(axis, index),
                },
                None => var.clone(),
            };
            data_vars.insert(name.clone(), selected);
        }

        Ok(Dataset { coords, data_vars })
    }
}
