//! The think, act, observe loop.
//!
//! A run starts from a single user message and alternates model turns with
//! tool dispatch until the model answers in plain text or the turn budget
//! is spent. History lives only for the duration of [`Orchestrator::run`].

use crate::error::RunError;
use crate::model::{Backend, Message, ModelError, ModelRequest, ModelResponse, Usage};
use crate::tools::{ToolHost, ToolSpec};
use std::time::Duration;
use storage::{Report, TokenCounts};

/// Model turns allowed per run.
pub const DEFAULT_MAX_TURNS: usize = 5;

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a senior business analyst. Answer questions about \
regional revenue, marketing spend and churn using only the data returned by your tools. Call tools \
for every figure you cite, search the internal knowledge base to explain changes, and state clearly \
when data is missing.";

/// A final answer from the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Usage reported on the answering turn.
    pub usage: Usage,
    /// Model turns taken, including the answering one.
    pub turns: usize,
}

impl Answer {
    pub fn to_report(&self, prompt: &str) -> Report {
        Report::new(
            prompt,
            self.text.clone(),
            self.usage.model_id.clone(),
            TokenCounts {
                prompt: self.usage.prompt_tokens,
                completion: self.usage.completion_tokens,
                total: self.usage.total_tokens,
            },
        )
    }
}

/// Drives one backend through bounded tool-calling conversations.
pub struct Orchestrator<B> {
    backend: B,
    max_turns: usize,
    call_timeout: Option<Duration>,
}

impl<B: Backend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_turns: DEFAULT_MAX_TURNS,
            call_timeout: None,
        }
    }

    /// Cap on model turns per run; at least one.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Bound each backend call; an elapsed call fails the run as a gateway timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Answer `prompt`, letting the model call tools from `tools`.
    pub async fn run<H: ToolHost>(
        &self,
        prompt: &str,
        tools: &H,
        system_instruction: Option<&str>,
    ) -> Result<Answer, RunError> {
        tracing::info!(
            model = self.backend.model_id(),
            max_turns = self.max_turns,
            tools = tools.specs().len(),
            "starting run"
        );
        let mut history = vec![Message::user(prompt)];

        for turn in 1..=self.max_turns {
            tracing::debug!(turn, messages = history.len(), "model turn");
            let response = self
                .complete(&history, tools.specs(), system_instruction)
                .await
                .inspect_err(|e| tracing::error!(turn, error = %e, "model call failed"))?;

            let Some(message) = response.message else {
                tracing::warn!(turn, "model returned no candidate content");
                return Err(RunError::EmptyResponse);
            };

            let calls = message.tool_calls();
            if calls.is_empty() {
                let text = message.first_text().unwrap_or_default();
                if text.trim().is_empty() {
                    return Err(RunError::EmptyAnswer);
                }
                let mut usage = response.usage;
                if usage.model_id.is_empty() {
                    usage.model_id = self.backend.model_id().to_string();
                }
                tracing::info!(
                    turn,
                    model = %usage.model_id,
                    total_tokens = usage.total_tokens,
                    "model answered"
                );
                return Ok(Answer {
                    text: text.to_string(),
                    usage,
                    turns: turn,
                });
            }

            if turn == self.max_turns {
                tracing::warn!(
                    limit = self.max_turns,
                    pending = calls.len(),
                    "turn budget spent with tool calls pending"
                );
                break;
            }

            history.push(message);
            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                tracing::info!(turn, tool = %call.name, arguments = %call.arguments, "dispatching tool");
                results.push(tools.dispatch(call).await);
            }
            history.push(Message::tool_results(results));
        }

        Err(RunError::TooManyToolSteps {
            limit: self.max_turns,
        })
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        system: Option<&str>,
    ) -> Result<ModelResponse, ModelError> {
        let request = ModelRequest {
            messages,
            tools,
            system,
        };
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.backend.complete(request))
                .await
                .map_err(|_| ModelError::Timeout(limit))?,
            None => self.backend.complete(request).await,
        }
    }
}
