//! PromptBuilder — assembles the four-part prompt sent for each candidate:
//! global-regime context, asset state, setup details, policy constraints.

use crate::domain::{Bar, Candidate};
use crate::features::FeatureSnapshot;

pub struct PromptBuilder {
    pub system_prompt: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            system_prompt: "You are a disciplined trading analyst. Respond with a single JSON object: \
                {\"decision\": \"take\"|\"skip\", \"setup_quality\": \"A+\"..\"C-\", \"confidence\": 0..1, \
                \"risk_flags\": [string], \"notes\": string}."
                .to_string(),
        }
    }
}

impl PromptBuilder {
    pub fn build_user_prompt(
        &self,
        candidate: &Candidate,
        features: &FeatureSnapshot,
        bar: &Bar,
        regime_note: &str,
        policy_constraints: &str,
    ) -> String {
        let mut sections = Vec::new();
        sections.push(format!("## Global regime\n{regime_note}"));
        sections.push(format!(
            "## Asset state\nsymbol={} close={:.4} volume={:.2} timestamp={}",
            bar.symbol, bar.close, bar.volume, bar.timestamp
        ));
        let feature_lines: Vec<String> = features
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v:.4}"))
            .collect();
        sections.push(format!("## Setup details\nplaybook={} direction={:?} entry_price={:.4}\nfeatures: {}",
            candidate.playbook_name, candidate.direction, candidate.entry_price, feature_lines.join(", ")));
        sections.push(format!("## Policy constraints\n{policy_constraints}"));
        sections.join("\n\n")
    }
}
