//! Converts conversation turns to Gemini request format and Gemini responses
//! back to [`EngineReply`].
//!
//! System turns become `systemInstruction`. Consecutive tool results are
//! grouped into a single `user` content so that parallel function calls are
//! answered in one block.

use sentient_core::errors::GatewayError;
use sentient_core::messages::{Segment, ToolCall, Turn, TurnContent};
use sentient_core::normalize::normalize;
use sentient_core::provider::EngineReply;
use sentient_core::tools::ToolDefinition;

use crate::types::{
    Candidate, FunctionCallData, FunctionDeclaration, FunctionResponseData, GeminiContent,
    GeminiPart, GeminiTool, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};

/// Placeholder signature for function calls replayed from history.
const SKIP_THOUGHT_SIGNATURE: &str = "skip_thought_signature_validator";

/// Build a `generateContent` request from the session turns and tool catalog.
pub fn build_request(
    turns: &[Turn],
    tools: &[ToolDefinition],
    temperature: f64,
) -> GenerateContentRequest {
    let mut system_texts: Vec<&str> = Vec::new();
    let mut contents: Vec<GeminiContent> = Vec::new();

    for turn in turns {
        match turn {
            Turn::System { content } => system_texts.push(content),
            Turn::User { content } => {
                if !content.is_empty() {
                    contents.push(GeminiContent {
                        role: Some("user".into()),
                        parts: vec![text_part(content.clone())],
                    });
                }
            }
            Turn::Assistant { content, tool_calls } => {
                let mut parts = Vec::new();
                let text = normalize(content);
                if !text.is_empty() {
                    parts.push(text_part(text));
                }
                for call in tool_calls {
                    parts.push(GeminiPart::FunctionCall {
                        function_call: FunctionCallData {
                            name: call.name.clone(),
                            args: call_args(call),
                        },
                        thought_signature: Some(SKIP_THOUGHT_SIGNATURE.into()),
                    });
                }
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: Some("model".into()),
                        parts,
                    });
                }
            }
            Turn::Tool { name, content, .. } => {
                let part = GeminiPart::FunctionResponse {
                    function_response: FunctionResponseData {
                        name: name.clone(),
                        response: serde_json::json!({ "result": content }),
                    },
                };
                match contents.last_mut() {
                    Some(last) if is_function_response_block(last) => last.parts.push(part),
                    _ => contents.push(GeminiContent {
                        role: Some("user".into()),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    let system_instruction = if system_texts.is_empty() {
        None
    } else {
        Some(GeminiContent {
            role: None,
            parts: vec![text_part(system_texts.join("\n\n"))],
        })
    };

    let tools = if tools.is_empty() {
        vec![]
    } else {
        vec![GeminiTool {
            function_declarations: tools.iter().map(convert_tool).collect(),
        }]
    };

    GenerateContentRequest {
        contents,
        system_instruction,
        tools,
        generation_config: GenerationConfig { temperature },
    }
}

/// Interpret the first candidate of a response.
///
/// Any function call part makes the reply a tool-call request, keeping the
/// visible text that came with it; otherwise the parts become the final
/// content. Reasoning parts are kept as non-text segments so they never
/// reach the user.
pub fn parse_response(response: GenerateContentResponse) -> Result<EngineReply, GatewayError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(GatewayError::MalformedResponse(
            "response contained no candidates".into(),
        ));
    };
    let Candidate {
        content,
        finish_reason,
    } = candidate;
    let Some(content) = content else {
        return Err(GatewayError::MalformedResponse(format!(
            "candidate has no content (finish reason: {})",
            finish_reason.as_deref().unwrap_or("unknown")
        )));
    };

    let calls: Vec<ToolCall> = content
        .parts
        .iter()
        .filter_map(|part| match part {
            GeminiPart::FunctionCall { function_call, .. } => Some(ToolCall::new(
                function_call.name.clone(),
                function_call.args.clone(),
            )),
            _ => None,
        })
        .collect();

    let segments: Vec<Segment> = content
        .parts
        .into_iter()
        .map(|part| match part {
            GeminiPart::Text {
                text,
                thought: None | Some(false),
            } => Segment::Text { text },
            _ => Segment::Other,
        })
        .collect();
    let content = TurnContent::Segments(segments);

    if !calls.is_empty() {
        return Ok(EngineReply::ToolCalls {
            text: normalize(&content),
            calls,
        });
    }
    Ok(EngineReply::Final(content))
}

fn text_part(text: String) -> GeminiPart {
    GeminiPart::Text {
        text,
        thought: None,
    }
}

fn call_args(call: &ToolCall) -> serde_json::Value {
    if call.arguments.is_null() {
        serde_json::json!({})
    } else {
        call.arguments.clone()
    }
}

fn is_function_response_block(content: &GeminiContent) -> bool {
    content.role.as_deref() == Some("user")
        && !content.parts.is_empty()
        && content
            .parts
            .iter()
            .all(|p| matches!(p, GeminiPart::FunctionResponse { .. }))
}

fn convert_tool(tool: &ToolDefinition) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.parameters_schema.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.into(),
            description: format!("{name} tool"),
            parameters_schema: json!({"type": "object", "properties": {}}),
        }
    }

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn system_turn_becomes_system_instruction() {
        let turns = vec![Turn::system("rules"), Turn::user("hi")];
        let req = build_request(&turns, &[], 0.0);
        let Some(sys) = &req.system_instruction else {
            panic!("expected system instruction");
        };
        assert!(matches!(&sys.parts[0], GeminiPart::Text { text, .. } if text == "rules"));
        assert_eq!(req.contents.len(), 1);
        assert_eq!(req.contents[0].role.as_deref(), Some("user"));
    }

    #[test]
    fn assistant_tool_calls_become_model_function_calls() {
        let call = ToolCall::new("list_events", serde_json::Value::Null);
        let turns = vec![
            Turn::user("what's on?"),
            Turn::assistant_tool_calls("Let me look.", vec![call.clone()]),
            Turn::tool_result(call.id.clone(), "list_events", "No upcoming events found."),
        ];
        let req = build_request(&turns, &[definition("list_events")], 0.0);
        assert_eq!(req.contents.len(), 3);

        let model = &req.contents[1];
        assert_eq!(model.role.as_deref(), Some("model"));
        assert!(matches!(&model.parts[0], GeminiPart::Text { text, .. } if text == "Let me look."));
        let GeminiPart::FunctionCall { function_call, .. } = &model.parts[1] else {
            panic!("expected function call part");
        };
        assert_eq!(function_call.name, "list_events");
        assert_eq!(function_call.args, json!({}));

        let result = &req.contents[2];
        assert_eq!(result.role.as_deref(), Some("user"));
        let GeminiPart::FunctionResponse { function_response } = &result.parts[0] else {
            panic!("expected function response part");
        };
        assert_eq!(function_response.name, "list_events");
        assert_eq!(function_response.response["result"], "No upcoming events found.");
    }

    #[test]
    fn consecutive_tool_results_share_one_block() {
        let a = ToolCall::new("list_events", json!({}));
        let b = ToolCall::new("consult_memory", json!({"query": "all"}));
        let turns = vec![
            Turn::user("plan it"),
            Turn::assistant_tool_calls("", vec![a.clone(), b.clone()]),
            Turn::tool_result(a.id, "list_events", "none"),
            Turn::tool_result(b.id, "consult_memory", "empty"),
        ];
        let req = build_request(&turns, &[], 0.0);
        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.contents[2].parts.len(), 2);
    }

    #[test]
    fn tool_catalog_is_declared() {
        let req = build_request(
            &[Turn::user("hi")],
            &[definition("read_mail"), definition("send_mail")],
            0.0,
        );
        assert_eq!(req.tools.len(), 1);
        let names: Vec<_> = req.tools[0]
            .function_declarations
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, ["read_mail", "send_mail"]);
    }

    #[test]
    fn empty_assistant_turn_is_dropped() {
        let turns = vec![Turn::user("hi"), Turn::assistant_text("")];
        let req = build_request(&turns, &[], 0.0);
        assert_eq!(req.contents.len(), 1);
    }

    #[test]
    fn text_response_is_final() {
        let reply = parse_response(response(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello"}, {"text": " there"}]}}]
        })))
        .unwrap();
        let EngineReply::Final(content) = reply else {
            panic!("expected final reply");
        };
        assert_eq!(normalize(&content), "Hello there");
    }

    #[test]
    fn thought_parts_are_hidden() {
        let reply = parse_response(response(json!({
            "candidates": [{"content": {"parts": [{"text": "hmm", "thought": true}, {"text": "Done."}]}}]
        })))
        .unwrap();
        let EngineReply::Final(content) = reply else {
            panic!("expected final reply");
        };
        assert_eq!(normalize(&content), "Done.");
    }

    #[test]
    fn function_calls_keep_accompanying_text() {
        let reply = parse_response(response(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Let me check."},
                {"functionCall": {"name": "list_events", "args": {}}},
                {"functionCall": {"name": "consult_memory", "args": {"query": "all"}}}
            ]}}]
        })))
        .unwrap();
        let EngineReply::ToolCalls { text, calls } = reply else {
            panic!("expected tool calls");
        };
        assert_eq!(text, "Let me check.");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "list_events");
        assert_eq!(calls[1].arguments["query"], "all");
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[test]
    fn missing_candidates_is_malformed() {
        let err = parse_response(response(json!({}))).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[test]
    fn blocked_candidate_is_malformed() {
        let err = parse_response(response(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
