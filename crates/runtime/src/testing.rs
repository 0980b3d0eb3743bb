//! Test doubles for the model gateway and tool hosts.

use crate::model::{
    Backend, Embedder, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall,
    Usage,
};
use crate::tools::{ToolError, ToolHost, ToolParam, ToolSpec};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn usage(prompt: u32, completion: u32) -> Usage {
    Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: prompt + completion,
        model_id: "mock-model".into(),
    }
}

pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        message: Some(Message::from_parts(Role::Model, vec![Part::Text(text.into())])),
        usage: usage(10, 5),
    }
}

pub fn tool_call_response(calls: Vec<ToolCall>) -> ModelResponse {
    ModelResponse {
        message: Some(Message::from_parts(
            Role::Model,
            calls.into_iter().map(Part::ToolCall).collect(),
        )),
        usage: usage(10, 2),
    }
}

pub fn empty_response() -> ModelResponse {
    ModelResponse {
        message: None,
        usage: Usage::default(),
    }
}

/// What a backend received on one call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub tools: Vec<String>,
}

/// Backend answering from a queue and recording every request.
pub struct MockBackend {
    responses: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockBackend {
    pub fn new(responses: Vec<Result<ModelResponse, ModelError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(responses: Vec<ModelResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests received, in call order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Backend for MockBackend {
    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            system: request.system.map(str::to_string),
            tools: request.tools.iter().map(|spec| spec.name.clone()).collect(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::InvalidResponse("mock exhausted".into())))
    }
}

/// Backend that never answers within a short timeout.
pub struct SlowBackend(pub Duration);

impl Backend for SlowBackend {
    fn model_id(&self) -> &str {
        "slow-model"
    }

    async fn complete(&self, _request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        tokio::time::sleep(self.0).await;
        Ok(text_response("too late"))
    }
}

/// Embedder returning fixed vectors per text; unknown text maps to the first basis vector.
pub struct MockEmbedder {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    failing: bool,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(2)
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

impl Embedder for MockEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        if self.failing {
            return Err(ModelError::Api {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.vectors.get(text).cloned().unwrap_or_else(|| {
            let mut basis = vec![0.0; self.dimensions];
            if let Some(first) = basis.first_mut() {
                *first = 1.0;
            }
            basis
        }))
    }
}

/// Tool host that echoes its arguments and records every executed call.
pub struct FakeToolHost {
    specs: Vec<ToolSpec>,
    executed: Mutex<Vec<ToolCall>>,
}

impl FakeToolHost {
    pub fn new(names: &[&str]) -> Self {
        Self {
            specs: names
                .iter()
                .map(|name| ToolSpec::new(*name, "fake").param(ToolParam::string("region", "r")))
                .collect(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.name.clone())
            .collect()
    }
}

impl ToolHost for FakeToolHost {
    fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        self.executed.lock().unwrap().push(call.clone());
        if self.specs.iter().any(|spec| spec.name == call.name) {
            Ok(json!({ "tool": call.name, "args": call.arguments }))
        } else {
            Err(ToolError::NotFound(call.name.clone()))
        }
    }
}
