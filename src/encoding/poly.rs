/// Degree-two, interaction-only expansion without a bias column:
/// the inputs first, then every product `x_i * x_j` with `i < j`.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionFeatures {
    n_inputs: usize,
}

impl InteractionFeatures {
    pub fn new(n_inputs: usize) -> Self {
        InteractionFeatures { n_inputs }
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn n_outputs(&self) -> usize {
        self.n_inputs + self.n_inputs * self.n_inputs.saturating_sub(1) / 2
    }

    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::with_capacity(self.n_outputs() - self.n_inputs);
        for i in 0..self.n_inputs {
            for j in (i + 1)..self.n_inputs {
                pairs.push((i, j));
            }
        }
        pairs
    }

    pub fn expand(&self, inputs: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_outputs());
        out.extend_from_slice(inputs);
        out.extend(self.pairs().into_iter().map(|(i, j)| inputs[i] * inputs[j]));
        out
    }

    pub fn feature_names(&self, inputs: &[String]) -> Vec<String> {
        let mut names = inputs.to_vec();
        names.extend(
            self.pairs()
                .into_iter()
                .map(|(i, j)| format!("{} {}", inputs[i], inputs[j])),
        );
        names
    }
}
