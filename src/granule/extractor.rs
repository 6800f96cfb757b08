//! Field extraction with signed-sum expressions
//!
//! An expression is a single variable name or several terms joined by `+` or
//! `-`, e.g. `inv_bar_cor_01+hf_fluct_cor_01`. A term may also be a plain
//! numeric constant, which is folded into every record.

use super::Granule;

#[derive(Debug, Clone, PartialEq)]
pub enum Term<'a> {
    Field { sign: f64, name: &'a str },
    Constant(f64),
}

/// Split an expression into signed terms.
pub fn parse_expression(expr: &str) -> Result<Vec<Term<'_>>, String> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err("empty field expression".to_string());
    }

    let mut terms = Vec::new();
    let mut sign = 1.0;
    let mut start = 0;
    let bytes = expr.as_bytes();

    for i in 0..=bytes.len() {
        let at_sign = i < bytes.len()
            && (bytes[i] == b'+' || bytes[i] == b'-')
            && !is_exponent_sign(expr, start, i);
        if i < bytes.len() && !at_sign {
            continue;
        }

        let token = expr[start..i].trim();
        if token.is_empty() {
            // Only a leading sign may stand without a preceding term
            if i != 0 || i == bytes.len() {
                return Err(format!("dangling sign in expression '{}'", expr));
            }
        } else if let Ok(value) = token.parse::<f64>() {
            terms.push(Term::Constant(sign * value));
        } else {
            terms.push(Term::Field { sign, name: token });
        }

        if i < bytes.len() {
            sign = if bytes[i] == b'-' { -1.0 } else { 1.0 };
            start = i + 1;
        }
    }

    if !terms.iter().any(|t| matches!(t, Term::Field { .. })) {
        return Err(format!("expression '{}' names no field", expr));
    }
    Ok(terms)
}

/// A sign right after the `e` of a numeric token such as `1e-3` belongs to
/// the number.
fn is_exponent_sign(expr: &str, start: usize, i: usize) -> bool {
    let bytes = expr.as_bytes();
    if i <= start + 1 || !matches!(bytes[i - 1], b'e' | b'E') {
        return false;
    }
    let mantissa = expr[start..i - 1].trim();
    !mantissa.is_empty()
        && mantissa.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && mantissa.parse::<f64>().is_ok()
}

/// Pulls scaled fields out of one granule.
///
/// Missing fields are reported and leave the destination untouched; callers
/// cope with the stale or zero content.
pub struct FieldExtractor<'g> {
    granule: &'g dyn Granule,
    records: usize,
    missing: usize,
}

impl<'g> FieldExtractor<'g> {
    pub fn new(granule: &'g dyn Granule, records: usize) -> Self {
        Self {
            granule,
            records,
            missing: 0,
        }
    }

    /// Number of failed extractions so far
    pub fn missing_count(&self) -> usize {
        self.missing
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.granule.variable(name).is_some()
    }

    /// Evaluate `expr`, multiply by `scale` and return the new array.
    pub fn fetch(&mut self, expr: &str, scale: f64) -> Option<Vec<f64>> {
        let terms = match parse_expression(expr) {
            Ok(terms) => terms,
            Err(e) => {
                log::warn!("{}: {}", self.granule.path().display(), e);
                self.missing += 1;
                return None;
            }
        };

        let mut sum = vec![0.0; self.records];
        for term in &terms {
            match *term {
                Term::Constant(value) => sum.iter_mut().for_each(|s| *s += value),
                Term::Field { sign, name } => {
                    let values = match self.granule.variable(name) {
                        Some(values) => values,
                        None => {
                            log::warn!(
                                "Field {} not found in {}",
                                name,
                                self.granule.path().display()
                            );
                            self.missing += 1;
                            return None;
                        }
                    };
                    if values.len() != self.records {
                        log::warn!(
                            "Field {} in {} has {} values, expected {}",
                            name,
                            self.granule.path().display(),
                            values.len(),
                            self.records
                        );
                        self.missing += 1;
                        return None;
                    }
                    for (s, v) in sum.iter_mut().zip(values) {
                        *s += sign * v;
                    }
                }
            }
        }

        for s in sum.iter_mut() {
            *s *= scale;
        }
        Some(sum)
    }

    /// Evaluate into `dest`; returns false (and leaves `dest` alone) on failure.
    pub fn fill(&mut self, expr: &str, scale: f64, dest: &mut [f64]) -> bool {
        match self.fetch(expr, scale) {
            Some(values) => {
                dest.copy_from_slice(&values);
                true
            }
            None => false,
        }
    }

    /// Fetch a high-rate field as a flat row-major array of `records × width`.
    pub fn fetch_2d(&mut self, name: &str, scale: f64, width: usize) -> Option<Vec<f64>> {
        let grid = match self.granule.variable_2d(name) {
            Some(grid) => grid,
            None => {
                log::warn!(
                    "High-rate field {} not found in {}",
                    name,
                    self.granule.path().display()
                );
                self.missing += 1;
                return None;
            }
        };

        if grid.rows != self.records || grid.cols != width {
            log::warn!(
                "High-rate field {} in {} has shape [{}, {}], expected [{}, {}]",
                name,
                self.granule.path().display(),
                grid.rows,
                grid.cols,
                self.records,
                width
            );
            self.missing += 1;
            return None;
        }

        Some(grid.data.iter().map(|v| v * scale).collect())
    }
}
