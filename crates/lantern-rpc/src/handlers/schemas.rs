//! Tool catalog and argument validation.

use serde_json::{json, Map, Value};

/// Search tool name.
pub const SEARCH_TOOL: &str = "glean_search";
/// Chat tool name.
pub const CHAT_TOOL: &str = "glean_chat";

const DEFAULT_PAGE_SIZE: u64 = 10;

/// The `tools/list` catalog.
pub fn tool_catalog() -> Value {
    json!([
        {
            "name": SEARCH_TOOL,
            "description": "Search Glean Enterprise Knowledge",
            "inputSchema": search_schema(),
        },
        {
            "name": CHAT_TOOL,
            "description": "Chat with Glean Assistant using Glean's RAG",
            "inputSchema": chat_schema(),
        },
    ])
}

fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {"type": "string", "description": "The search query"},
            "cursor": {"type": "string", "description": "Pagination cursor for position in overall results"},
            "pageSize": {"type": "integer", "minimum": 1, "default": DEFAULT_PAGE_SIZE, "description": "Number of results to return"},
            "maxSnippetSize": {"type": "integer", "minimum": 1, "description": "Maximum characters for snippets"},
            "disableSpellcheck": {"type": "boolean", "description": "Whether to disable spellcheck"},
            "requestOptions": {
                "type": "object",
                "properties": {
                    "datasourcesFilter": {"type": "array", "items": {"type": "string"}, "description": "Filter results to one or more datasources"},
                    "facetBucketSize": {"type": "integer"}
                }
            }
        },
        "required": ["query"],
        "additionalProperties": false
    })
}

fn chat_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "messages": {
                "type": "array",
                "description": "The chat messages, ordered oldest first",
                "items": {
                    "type": "object",
                    "properties": {
                        "author": {"type": "string", "enum": ["USER", "GLEAN_AI"], "default": "USER"},
                        "messageType": {"type": "string", "enum": ["UPDATE", "CONTENT", "CONTEXT", "DEBUG", "ERROR", "HEADING", "WARNING"], "default": "CONTENT"},
                        "fragments": {
                            "type": "array",
                            "items": {"type": "object", "properties": {"text": {"type": "string"}}}
                        }
                    },
                    "required": ["fragments"]
                }
            },
            "saveChat": {"type": "boolean", "description": "Save the chat session for future reference"},
            "chatId": {"type": "string", "description": "Continue an existing chat"},
            "timeoutMillis": {"type": "integer", "minimum": 1, "description": "Timeout for the chat request"}
        },
        "required": ["messages"],
        "additionalProperties": false
    })
}

/// Validate search arguments and fill defaults.
///
/// Returns the request body, or one `path: problem` line per issue.
pub fn validate_search(args: &Map<String, Value>) -> Result<Value, Vec<String>> {
    let mut issues = Vec::new();

    match args.get("query") {
        Some(Value::String(q)) if !q.trim().is_empty() => {}
        Some(Value::String(_)) => issues.push("query: must not be empty".to_string()),
        Some(_) => issues.push("query: expected string".to_string()),
        None => issues.push("query: required".to_string()),
    }
    check_optional_string(args, "cursor", &mut issues);
    check_optional_positive(args, "pageSize", &mut issues);
    check_optional_positive(args, "maxSnippetSize", &mut issues);
    if args.get("disableSpellcheck").is_some_and(|v| !v.is_boolean()) {
        issues.push("disableSpellcheck: expected boolean".to_string());
    }
    if args.get("requestOptions").is_some_and(|v| !v.is_object()) {
        issues.push("requestOptions: expected object".to_string());
    }
    check_unknown(args, &["query", "cursor", "pageSize", "maxSnippetSize", "disableSpellcheck", "requestOptions"], &mut issues);

    if !issues.is_empty() {
        return Err(issues);
    }
    let mut body = args.clone();
    let _ = body.entry("pageSize").or_insert(json!(DEFAULT_PAGE_SIZE));
    Ok(Value::Object(body))
}

/// Validate chat arguments and fill defaults.
pub fn validate_chat(args: &Map<String, Value>) -> Result<Value, Vec<String>> {
    let mut issues = Vec::new();

    let mut messages = Vec::new();
    match args.get("messages") {
        Some(Value::Array(list)) if !list.is_empty() => {
            for (i, message) in list.iter().enumerate() {
                match normalize_message(message) {
                    Ok(m) => messages.push(m),
                    Err(problem) => issues.push(format!("messages.{i}.{problem}")),
                }
            }
        }
        Some(Value::Array(_)) => issues.push("messages: must not be empty".to_string()),
        Some(_) => issues.push("messages: expected array".to_string()),
        None => issues.push("messages: required".to_string()),
    }
    if args.get("saveChat").is_some_and(|v| !v.is_boolean()) {
        issues.push("saveChat: expected boolean".to_string());
    }
    check_optional_string(args, "chatId", &mut issues);
    check_optional_positive(args, "timeoutMillis", &mut issues);
    check_unknown(args, &["messages", "saveChat", "chatId", "timeoutMillis"], &mut issues);

    if !issues.is_empty() {
        return Err(issues);
    }
    let mut body = args.clone();
    let _ = body.insert("messages".to_string(), Value::Array(messages));
    Ok(Value::Object(body))
}

fn normalize_message(message: &Value) -> Result<Value, String> {
    let Value::Object(obj) = message else {
        return Err("expected object".to_string());
    };
    let Some(Value::Array(fragments)) = obj.get("fragments") else {
        return Err("fragments: expected array".to_string());
    };
    if fragments.iter().any(|f| !f.is_object()) {
        return Err("fragments: expected objects".to_string());
    }
    let mut out = obj.clone();
    let _ = out.entry("author").or_insert(json!("USER"));
    let _ = out.entry("messageType").or_insert(json!("CONTENT"));
    Ok(Value::Object(out))
}

fn check_optional_string(args: &Map<String, Value>, key: &str, issues: &mut Vec<String>) {
    if args.get(key).is_some_and(|v| !v.is_string()) {
        issues.push(format!("{key}: expected string"));
    }
}

fn check_optional_positive(args: &Map<String, Value>, key: &str, issues: &mut Vec<String>) {
    if let Some(v) = args.get(key) {
        if !v.as_u64().is_some_and(|n| n > 0) {
            issues.push(format!("{key}: expected positive integer"));
        }
    }
}

fn check_unknown(args: &Map<String, Value>, known: &[&str], issues: &mut Vec<String>) {
    for key in args.keys() {
        if !known.contains(&key.as_str()) {
            issues.push(format!("{key}: unrecognized field"));
        }
    }
}
