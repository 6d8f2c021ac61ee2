//! Grounded prompt composition.
//!
//! Renders the retrieved excerpts and the user question through a
//! Handlebars template. Excerpts are rendered in the order given, which is
//! the retriever's similarity order (most relevant first).

use crate::types::{ComposedPrompt, Excerpt};
use handlebars::Handlebars;
use policyqa_core::{AppError, AppResult};
use serde::Serialize;

/// Instruction preamble sent as the system message.
pub const DEFAULT_PREAMBLE: &str = "You are a policy assistant for company employees.
Answer ONLY using the provided policy excerpts.
If the answer is not in the excerpts, say: \"I couldn't find this in the provided policies.\"
Keep the answer concise and practical.
Cite the excerpts you used by label and source, for example: [S1] (Source, page N).
Always end with citations in this format: (Source, page).";

/// Default user-message template.
pub const DEFAULT_TEMPLATE: &str = "Question: {{question}}

Policy excerpts:
{{#if excerpts}}{{#each excerpts}}
[{{label}}] ({{document}}, page {{page}})
{{text}}
{{/each}}{{else}}
(none)
{{/if}}";

const TEMPLATE_NAME: &str = "grounded";

#[derive(Serialize)]
struct TemplateData<'a> {
    question: &'a str,
    excerpts: &'a [Excerpt],
}

/// Composes grounded prompts from a question and retrieved excerpts.
pub struct PromptComposer {
    preamble: String,
    registry: Handlebars<'static>,
}

impl PromptComposer {
    /// Create a composer with the default preamble and template.
    pub fn new() -> AppResult<Self> {
        Self::with_template(DEFAULT_PREAMBLE, DEFAULT_TEMPLATE)
    }

    /// Create a composer with a custom preamble and Handlebars template.
    ///
    /// The template receives `question` and `excerpts` (each with `label`,
    /// `document`, `page`, `text`).
    pub fn with_template(preamble: impl Into<String>, template: &str) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Policy text is plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| AppError::Config(format!("Failed to register prompt template: {}", e)))?;

        Ok(Self {
            preamble: preamble.into(),
            registry,
        })
    }

    /// The instruction preamble in use.
    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Compose a prompt from a question and excerpts in relevance order.
    pub fn compose(&self, question: &str, excerpts: &[Excerpt]) -> AppResult<ComposedPrompt> {
        tracing::debug!("Composing prompt with {} excerpts", excerpts.len());

        let data = TemplateData {
            question: question.trim(),
            excerpts,
        };

        let rendered = self
            .registry
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| AppError::Other(format!("Failed to render prompt template: {}", e)))?;

        Ok(ComposedPrompt {
            system: self.preamble.clone(),
            user: rendered.trim_end().to_string(),
            excerpt_count: excerpts.len(),
        })
    }
}
