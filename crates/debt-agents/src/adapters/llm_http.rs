//! OpenAI-compatible chat-completions transport.
//!
//! Tools are mapped to function declarations and tool_calls parsed back.
//! Structured completion forces JSON output and inlines the schema into
//! the system prompt. `stream` is satisfied by completing once and
//! replaying the response as items; the core only consumes final
//! responses, so nothing downstream depends on incremental delivery.

use adjudication::ports::llm::{
    ChatRole, CompletionRequest, CompletionResponse, FinishReason, LlmTransport, StreamItem,
    TokenUsage, ToolCall, TransportError, TransportResult,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

/// HTTP client for one chat-completions endpoint.
pub struct HttpLlm {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLlm {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_body(&self, request: &CompletionRequest, force_json: bool) -> Value {
        let mut messages = vec![json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        for message in &request.messages {
            let role = match message.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": message.content}));
        }

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(
                request
                    .tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "type": "function",
                            "function": {
                                "name": tool.name,
                                "description": tool.description,
                                "parameters": tool.parameters,
                            }
                        })
                    })
                    .collect(),
            );
        }
        if force_json {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    async fn post(&self, body: Value) -> TransportResult<WireResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(TransportError::Auth(format!("status {status}")));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TransportError::RateLimited(format!("status {status}")));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransportError::Network(format!("status {status}: {text}")));
        }
        response
            .json::<WireResponse>()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded arguments, per the wire format.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn parse_response(wire: WireResponse) -> TransportResult<CompletionResponse> {
    let choice = wire
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::InvalidResponse("no choices in response".into()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .filter_map(|call| {
            let args: Value = serde_json::from_str(&call.function.arguments).ok()?;
            Some(ToolCall {
                name: call.function.name,
                args,
            })
        })
        .collect();

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    };

    let usage = wire
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
        finish_reason,
    })
}

#[async_trait]
impl LlmTransport for HttpLlm {
    async fn complete(&self, request: CompletionRequest) -> TransportResult<CompletionResponse> {
        let body = self.build_body(&request, false);
        let wire = self.post(body).await?;
        let response = parse_response(wire)?;
        debug!(
            tool_calls = response.tool_calls.len(),
            finish_reason = ?response.finish_reason,
            "completion received"
        );
        Ok(response)
    }

    async fn complete_structured(
        &self,
        mut request: CompletionRequest,
        schema: Value,
    ) -> TransportResult<Value> {
        request.system_prompt = format!(
            "{}\n\nRespond with a single JSON object matching this schema:\n{}",
            request.system_prompt, schema
        );
        let body = self.build_body(&request, true);
        let wire = self.post(body).await?;
        let response = parse_response(wire)?;
        serde_json::from_str(response.content.trim())
            .map_err(|e| TransportError::InvalidResponse(format!("not valid JSON: {e}")))
    }

    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> TransportResult<BoxStream<'static, TransportResult<StreamItem>>> {
        let response = self.complete(request).await?;
        let mut items = Vec::new();
        if !response.content.is_empty() {
            items.push(Ok(StreamItem::Content(response.content)));
        }
        for call in response.tool_calls {
            items.push(Ok(StreamItem::ToolCall(call)));
        }
        items.push(Ok(StreamItem::Done(response.finish_reason)));
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
