//! Natural-language explanation of generated queries.

use promql_adapters::{AdapterError, CompletionProvider};
use promql_core::{CancellationToken, QueryContext};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::error::{AgentError, Result};
use crate::prompts;

pub struct Explainer {
    llm: Arc<dyn CompletionProvider>,
}

impl Explainer {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    /// One-sentence explanation of `promql`.
    ///
    /// A completion error is folded into the returned text so a translation
    /// is not lost to a broken explanation. Cancellation is the only error.
    #[instrument(skip(self, ctx, cancel))]
    pub async fn explain(
        &self,
        ctx: &QueryContext,
        promql: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let prompt = prompts::explanation_prompt(ctx, promql);
        match self.llm.complete(&prompt, cancel).await {
            Ok(text) => Ok(clean(&text)),
            Err(AdapterError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => {
                warn!("Explanation failed: {}", e);
                Ok(format!("Query: {}\nError generating explanation: {}", promql, e))
            }
        }
    }
}

fn clean(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c.is_whitespace())
        .to_string()
}
