//! Narrative financial advice over a computed summary
//!
//! Renders the `financial_insight` prompt with rupee-formatted figures and
//! relays the backend's streamed reply. Nothing here touches the ledger.

use std::collections::HashMap;

use futures::TryStreamExt;
use tracing::{debug, info};

use crate::ai::{AIClient, ChatPrompt, InsightBackend, TextStream};
use crate::error::Result;
use crate::models::FinancialSummary;
use crate::money::format_rupees;
use crate::prompts::{Prompt, PromptId, PromptLibrary};

/// Template variables for a summary, every amount rendered in rupees
pub fn summary_vars(summary: &FinancialSummary) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();
    vars.insert("total_income", format_rupees(summary.total_income));
    vars.insert("total_expense", format_rupees(summary.total_expense));
    vars.insert("savings", format_rupees(summary.savings));
    vars.insert("savings_percent", format!("{:.2}", summary.savings_percent));
    vars.insert("financial_score", summary.financial_score.to_string());
    vars
}

/// Streams advice text for a financial summary
#[derive(Clone)]
pub struct InsightGenerator {
    ai: AIClient,
    prompt: Prompt,
}

impl InsightGenerator {
    pub fn new(ai: AIClient, prompt: Prompt) -> Self {
        Self { ai, prompt }
    }

    /// Build from the prompt library (override first, then embedded)
    pub fn from_library(ai: AIClient, library: &mut PromptLibrary) -> Result<Self> {
        let prompt = library.get(PromptId::FinancialInsight)?.clone();
        if prompt.is_override {
            info!(
                version = prompt.metadata.version,
                "Using overridden financial insight prompt"
            );
        }
        Ok(Self::new(ai, prompt))
    }

    pub fn backend(&self) -> &AIClient {
        &self.ai
    }

    /// The exact request sent to the backend for this summary
    pub fn build_prompt(&self, summary: &FinancialSummary) -> ChatPrompt {
        ChatPrompt {
            system: self.prompt.system_section().map(str::to_string),
            user: self.prompt.render_user(&summary_vars(summary)),
        }
    }

    /// Start streaming advice
    ///
    /// Fragments are passed through as they arrive, in order. A backend
    /// failure before the first fragment is returned here; one mid-stream is
    /// yielded as the stream's final item.
    pub async fn generate_insight(&self, summary: &FinancialSummary) -> Result<TextStream> {
        let prompt = self.build_prompt(summary);
        debug!(
            model = %self.ai.model(),
            score = summary.financial_score,
            "Requesting financial insight"
        );
        self.ai.stream_chat(&prompt).await
    }

    /// Generate and concatenate the whole reply
    pub async fn collect_insight(&self, summary: &FinancialSummary) -> Result<String> {
        let stream = self.generate_insight(summary).await?;
        stream.try_collect::<Vec<String>>().await.map(|parts| parts.concat())
    }
}
