use std::collections::BTreeSet;

/// One-hot encoder for a single text column; categories are kept sorted.
///
/// A value not seen during fitting encodes to all zeros instead of failing,
/// so a front-end sending a new spelling still gets a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHotEncoder {
    column: String,
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn new(column: &str) -> Self {
        OneHotEncoder {
            column: column.to_string(),
            categories: Vec::new(),
        }
    }

    pub fn fit(&mut self, values: &[String]) {
        let unique: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        self.categories = unique.into_iter().map(str::to_string).collect();
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Append the encoding of `value` to `out`.
    pub fn encode_into(&self, value: &str, out: &mut Vec<f64>) {
        let hit = self
            .categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok();
        out.extend((0..self.categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }));
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.column, c))
            .collect()
    }
}
