//! JSON granule container
//!
//! Layout of one file:
//!
//! ```text
//! {
//!   "dimensions": { "time_01": 3 },
//!   "attributes": { "product_name": "...", "processing_baseline": "..." },
//!   "variables": {
//!     "lat_01": { "shape": [3], "data": [1, 2, null], "fill_value": 2147483647 },
//!     "range_ocean_20_ku": { "shape": [3, 20], "data": [...] }
//!   }
//! }
//! ```
//!
//! `null` entries and entries equal to `fill_value` are read as NaN.

use super::{Granule, GranuleError, Grid};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct RawGranule {
    #[serde(default)]
    dimensions: HashMap<String, usize>,
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    variables: HashMap<String, RawVariable>,
}

#[derive(Debug, Deserialize)]
struct RawVariable {
    shape: Vec<usize>,
    data: Vec<Option<f64>>,
    #[serde(default)]
    fill_value: Option<f64>,
}

#[derive(Debug)]
struct StoredVariable {
    shape: Vec<usize>,
    data: Vec<f64>,
}

#[derive(Debug)]
pub struct JsonGranule {
    path: PathBuf,
    dimensions: HashMap<String, usize>,
    attributes: HashMap<String, String>,
    variables: HashMap<String, StoredVariable>,
}

impl JsonGranule {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GranuleError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::from_json_str(path, &text)
    }

    pub fn from_json_str(path: impl AsRef<Path>, text: &str) -> Result<Self, GranuleError> {
        let raw: RawGranule = serde_json::from_str(text)?;

        let mut variables = HashMap::with_capacity(raw.variables.len());
        for (name, var) in raw.variables {
            let expected: usize = var.shape.iter().product();
            if expected != var.data.len() {
                return Err(GranuleError::Malformed(format!(
                    "variable {} has shape {:?} but {} values",
                    name,
                    var.shape,
                    var.data.len()
                )));
            }

            let fill = var.fill_value;
            let data = var
                .data
                .into_iter()
                .map(|v| match (v, fill) {
                    (Some(x), Some(f)) if x == f => f64::NAN,
                    (Some(x), _) => x,
                    (None, _) => f64::NAN,
                })
                .collect();

            variables.insert(name, StoredVariable { shape: var.shape, data });
        }

        Ok(Self {
            path: path.as_ref().to_path_buf(),
            dimensions: raw.dimensions,
            attributes: raw.attributes,
            variables,
        })
    }
}

impl Granule for JsonGranule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).copied()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn variable(&self, name: &str) -> Option<&[f64]> {
        self.variables.get(name).map(|v| v.data.as_slice())
    }

    fn variable_2d(&self, name: &str) -> Option<Grid<'_>> {
        let var = self.variables.get(name)?;
        match var.shape.as_slice() {
            [rows, cols] => Some(Grid {
                rows: *rows,
                cols: *cols,
                data: &var.data,
            }),
            _ => None,
        }
    }
}
