//! Google Gemini API backend.

use crate::model::{
    Backend, Embedder, Message, ModelError, ModelRequest, ModelResponse, Part, Role, ToolCall,
    Usage,
};
use crate::tools::{ParamType, ToolSpec};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::time::Duration;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 3072;
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ApiPart {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: ApiFunctionCall,
        #[serde(
            rename = "thoughtSignature",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        thought_signature: Option<String>,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: ApiFunctionResponse,
    },
    Text {
        text: String,
        #[serde(
            rename = "thoughtSignature",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        thought_signature: Option<String>,
    },
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiTool {
    function_declarations: Vec<ApiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct ApiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct ApiGenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    #[serde(default)]
    usage_metadata: ApiUsageMetadata,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    content: Option<ApiContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiUsageMetadata {
    prompt_token_count: u32,
    candidates_token_count: u32,
    total_token_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEmbedRequest<'a> {
    model: String,
    content: ApiEmbedContent<'a>,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct ApiEmbedContent<'a> {
    parts: [ApiEmbedText<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ApiEmbedText<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedResponse {
    embedding: ApiEmbedding,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedding {
    values: Vec<f32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating a Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiBackendBuilder {
    api_key: String,
    model: String,
    base_url: String,
    embedding_model: String,
    embedding_dimensions: usize,
    temperature: f64,
    timeout: Duration,
}

impl GeminiBackendBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API root, e.g. to point at a proxy.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn embedding_dimensions(mut self, dimensions: usize) -> Self {
        self.embedding_dimensions = dimensions;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Per-request timeout for both completions and embeddings.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<GeminiBackend, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(GeminiBackend {
            client,
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            embedding_model: self.embedding_model,
            embedding_dimensions: self.embedding_dimensions,
            temperature: self.temperature,
            timeout: self.timeout,
        })
    }
}

/// Gemini API backend.
///
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    embedding_model: String,
    embedding_dimensions: usize,
    temperature: f64,
    timeout: Duration,
}

impl GeminiBackend {
    pub fn builder(api_key: impl Into<String>) -> GeminiBackendBuilder {
        GeminiBackendBuilder::new(api_key)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User | Role::Tool => "user",
            Role::Model => "model",
        }
    }

    fn message_to_api(msg: &Message) -> ApiContent {
        let parts = msg
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => ApiPart::Text {
                    text: text.clone(),
                    thought_signature: None,
                },
                Part::SignedText { text, signature } => ApiPart::Text {
                    text: text.clone(),
                    thought_signature: Some(signature.clone()),
                },
                Part::ToolCall(call) => ApiPart::FunctionCall {
                    function_call: ApiFunctionCall {
                        name: call.name.clone(),
                        args: call.arguments.clone(),
                    },
                    thought_signature: call.signature.clone(),
                },
                Part::ToolResult(result) => ApiPart::FunctionResponse {
                    function_response: ApiFunctionResponse {
                        name: result.name().to_string(),
                        response: match result.payload() {
                            object @ Value::Object(_) => object,
                            other => json!({ "result": other }),
                        },
                    },
                },
                Part::Opaque(value) => ApiPart::Other(value.clone()),
            })
            .collect();

        ApiContent {
            role: Some(Self::role_to_api(msg.role).to_string()),
            parts,
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiFunctionDeclaration {
        let properties: Map<String, Value> = spec
            .parameters
            .iter()
            .map(|param| {
                let kind = match param.kind {
                    ParamType::String => "STRING",
                    ParamType::Number => "NUMBER",
                };
                (
                    param.name.clone(),
                    json!({ "type": kind, "description": param.description }),
                )
            })
            .collect();

        ApiFunctionDeclaration {
            name: spec.name.clone(),
            description: spec.description.clone(),
            parameters: json!({
                "type": "OBJECT",
                "properties": properties,
                "required": spec.required(),
            }),
        }
    }

    fn translate_request(&self, request: ModelRequest<'_>) -> ApiRequest {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![ApiTool {
                function_declarations: request.tools.iter().map(Self::tool_to_api).collect(),
            }]
        };

        ApiRequest {
            contents: request.messages.iter().map(Self::message_to_api).collect(),
            tools,
            system_instruction: request.system.map(|text| ApiContent {
                role: None,
                parts: vec![ApiPart::Text {
                    text: text.to_string(),
                    thought_signature: None,
                }],
            }),
            generation_config: ApiGenerationConfig {
                temperature: self.temperature,
            },
        }
    }

    fn normalize_response(&self, response: ApiResponse) -> ModelResponse {
        let usage = Usage {
            prompt_tokens: response.usage_metadata.prompt_token_count,
            completion_tokens: response.usage_metadata.candidates_token_count,
            total_tokens: response.usage_metadata.total_token_count,
            model_id: response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
        };

        let parts: Vec<Part> = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match part {
                ApiPart::Text {
                    text,
                    thought_signature: None,
                } => Some(Part::Text(text)),
                ApiPart::Text {
                    text,
                    thought_signature: Some(signature),
                } => Some(Part::SignedText { text, signature }),
                ApiPart::FunctionCall {
                    function_call,
                    thought_signature,
                } => Some(Part::ToolCall(ToolCall {
                    name: function_call.name,
                    arguments: function_call.args,
                    signature: thought_signature,
                })),
                ApiPart::Other(value) => Some(Part::Opaque(value)),
                ApiPart::FunctionResponse { .. } => None,
            })
            .collect();

        let message = (!parts.is_empty()).then(|| Message::from_parts(Role::Model, parts));
        ModelResponse { message, usage }
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<String, ModelError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn transport_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_timeout() {
            ModelError::Timeout(self.timeout)
        } else {
            ModelError::Network(e.to_string())
        }
    }
}

impl std::fmt::Display for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gemini({})", self.model)
    }
}

impl Backend for GeminiBackend {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let body = self.translate_request(request);
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let text = self.post(&url, &body).await?;
        let response: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Ok(self.normalize_response(response))
    }
}

impl Embedder for GeminiBackend {
    fn dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        let body = ApiEmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: ApiEmbedContent {
                parts: [ApiEmbedText { text }],
            },
            output_dimensionality: self.embedding_dimensions,
        };
        let url = format!(
            "{}/models/{}:embedContent",
            self.base_url, self.embedding_model
        );

        let text = self.post(&url, &body).await?;
        let response: ApiEmbedResponse = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let values = response.embedding.values;
        if values.len() != self.embedding_dimensions {
            return Err(ModelError::InvalidResponse(format!(
                "expected {} embedding dimensions, got {}",
                self.embedding_dimensions,
                values.len()
            )));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolResult;
    use crate::tools::ToolParam;

    fn backend() -> GeminiBackend {
        GeminiBackend::builder("test-key").build().unwrap()
    }

    fn parse(body: Value) -> ModelResponse {
        let response: ApiResponse = serde_json::from_value(body).unwrap();
        backend().normalize_response(response)
    }

    #[test]
    fn display_names_model() {
        assert_eq!(backend().to_string(), "gemini(gemini-2.5-flash-lite)");
    }

    #[test]
    fn request_carries_tools_system_and_temperature() {
        let messages = [Message::user("How did EMEA do in May 2024?")];
        let tools = [ToolSpec::new("fetch_sales_data", "Get revenue.")
            .param(ToolParam::string("region", "The region"))
            .param(ToolParam::number("limit", "Max rows").optional())];
        let request = ModelRequest {
            messages: &messages,
            tools: &tools,
            system: Some("You are a senior business analyst."),
        };

        let body = serde_json::to_value(backend().translate_request(request)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "How did EMEA do in May 2024?"}]}
                ],
                "tools": [{
                    "functionDeclarations": [{
                        "name": "fetch_sales_data",
                        "description": "Get revenue.",
                        "parameters": {
                            "type": "OBJECT",
                            "properties": {
                                "region": {"type": "STRING", "description": "The region"},
                                "limit": {"type": "NUMBER", "description": "Max rows"}
                            },
                            "required": ["region"]
                        }
                    }]
                }],
                "system_instruction": {"parts": [{"text": "You are a senior business analyst."}]},
                "generation_config": {"temperature": 0.2}
            })
        );
    }

    #[test]
    fn request_without_tools_omits_declarations() {
        let messages = [Message::user("hi")];
        let request = ModelRequest {
            messages: &messages,
            tools: &[],
            system: None,
        };
        let body = serde_json::to_value(backend().translate_request(request)).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn tool_round_trip_is_encoded_as_function_parts() {
        let mut call = ToolCall::new("fetch_churn_data", json!({"region": "EMEA", "month": "May"}));
        call.signature = Some("sig-abc".into());
        let messages = [
            Message::user("churn?"),
            Message::from_parts(Role::Model, vec![Part::ToolCall(call)]),
            Message::tool_results(vec![
                ToolResult::success("fetch_churn_data", json!({"churn_rate": 4.2})),
                ToolResult::failure("nope", "Tool nope not found"),
            ]),
        ];
        let request = ModelRequest {
            messages: &messages,
            tools: &[],
            system: None,
        };

        let body = serde_json::to_value(backend().translate_request(request)).unwrap();
        assert_eq!(
            body["contents"][1],
            json!({
                "role": "model",
                "parts": [{
                    "functionCall": {"name": "fetch_churn_data", "args": {"region": "EMEA", "month": "May"}},
                    "thoughtSignature": "sig-abc"
                }]
            })
        );
        assert_eq!(
            body["contents"][2],
            json!({
                "role": "user",
                "parts": [
                    {"functionResponse": {"name": "fetch_churn_data", "response": {"churn_rate": 4.2}}},
                    {"functionResponse": {"name": "nope", "response": {"error": "Tool nope not found"}}}
                ]
            })
        );
    }

    #[test]
    fn parses_text_answer_and_usage() {
        let response = parse(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Revenue fell 28.89%."}]}}],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 30, "totalTokenCount": 150},
            "modelVersion": "gemini-2.5-flash-lite-001"
        }));
        let message = response.message.unwrap();
        assert_eq!(message.first_text(), Some("Revenue fell 28.89%."));
        assert_eq!(response.usage.prompt_tokens, 120);
        assert_eq!(response.usage.completion_tokens, 30);
        assert_eq!(response.usage.total_tokens, 150);
        assert_eq!(response.usage.model_id, "gemini-2.5-flash-lite-001");
    }

    #[test]
    fn parses_function_calls_with_signature() {
        let response = parse(json!({
            "candidates": [{"content": {"role": "model", "parts": [
                {"functionCall": {"name": "fetch_sales_data", "args": {"region": "EMEA", "month": "May 2024"}},
                 "thoughtSignature": "opaque"},
                {"functionCall": {"name": "fetch_churn_data", "args": {"region": "EMEA", "month": "May 2024"}}}
            ]}}]
        }));
        let calls = response.message.unwrap().tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].signature.as_deref(), Some("opaque"));
        assert_eq!(calls[1].name, "fetch_churn_data");
        assert_eq!(calls[1].signature, None);
    }

    #[test]
    fn missing_usage_defaults_to_zero_and_configured_model() {
        let response = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "ok"}]}}]
        }));
        assert_eq!(response.usage.total_tokens, 0);
        assert_eq!(response.usage.model_id, "gemini-2.5-flash-lite");
    }

    #[test]
    fn missing_candidates_yield_no_message() {
        assert!(parse(json!({})).message.is_none());
        assert!(parse(json!({"candidates": [{"finishReason": "SAFETY"}]})).message.is_none());
        assert!(parse(json!({"candidates": [{"content": {"parts": []}}]})).message.is_none());
    }

    #[test]
    fn model_parts_are_echoed_verbatim() {
        let parts = json!([
            {"executableCode": {"code": "print(1)"}},
            {"text": "Checking EMEA.", "thoughtSignature": "sig-text"},
            {"functionCall": {"name": "fetch_sales_data", "args": {"region": "EMEA"}},
             "thoughtSignature": "sig-call"}
        ]);
        let response = parse(json!({
            "candidates": [{"content": {"role": "model", "parts": parts}}]
        }));
        let message = response.message.unwrap();
        assert_eq!(
            message.parts[0],
            Part::Opaque(json!({"executableCode": {"code": "print(1)"}}))
        );
        assert_eq!(message.first_text(), Some("Checking EMEA."));

        let history = [Message::user("q"), message];
        let request = ModelRequest {
            messages: &history,
            tools: &[],
            system: None,
        };
        let body = serde_json::to_value(backend().translate_request(request)).unwrap();
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"], parts);
    }

    #[test]
    fn embed_request_shape() {
        let body = ApiEmbedRequest {
            model: "models/gemini-embedding-001".into(),
            content: ApiEmbedContent {
                parts: [ApiEmbedText { text: "churn" }],
            },
            output_dimensionality: 3072,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({
                "model": "models/gemini-embedding-001",
                "content": {"parts": [{"text": "churn"}]},
                "outputDimensionality": 3072
            })
        );
    }

    #[test]
    fn builder_overrides_defaults() {
        let backend = GeminiBackend::builder("k")
            .model("gemini-2.5-pro")
            .embedding_dimensions(768)
            .base_url("http://localhost:9999/")
            .build()
            .unwrap();
        assert_eq!(backend.model_id(), "gemini-2.5-pro");
        assert_eq!(backend.dimensions(), 768);
        assert_eq!(backend.base_url, "http://localhost:9999");
    }
}
