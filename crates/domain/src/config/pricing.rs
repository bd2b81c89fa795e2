use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// USD per 1k tokens, prompt and completion priced separately.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModelRate {
    pub prompt_rate_per_1k: f64,
    pub completion_rate_per_1k: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTable {
    pub models: HashMap<String, ModelRate>,
}

impl PriceTable {
    /// Cost in USD for the given token counts. Unknown models price at
    /// zero — the caller is responsible for raising a `model_unknown`
    /// warning.
    pub fn estimate_cost(&self, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        let Some(rate) = self.models.get(model) else {
            return 0.0;
        };
        (prompt_tokens as f64 / 1000.0) * rate.prompt_rate_per_1k
            + (completion_tokens as f64 / 1000.0) * rate.completion_rate_per_1k
    }

    pub fn is_known(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }
}
