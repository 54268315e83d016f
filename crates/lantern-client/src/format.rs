//! Plain-text rendering of knowledge index responses.

use serde_json::Value;

/// Render a search response as numbered result blocks.
pub fn format_search(response: &Value) -> String {
    let Some(results) = response.get("results").and_then(Value::as_array) else {
        return "No results found.".to_string();
    };

    let blocks: Vec<String> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let title = result.get("title").and_then(Value::as_str).unwrap_or("No title");
            let url = result.get("url").and_then(Value::as_str).unwrap_or("");
            let source = result
                .pointer("/document/datasource")
                .and_then(Value::as_str)
                .unwrap_or("Unknown source");
            let snippets = snippet_text(result);
            let snippets = if snippets.is_empty() {
                "No description available".to_string()
            } else {
                snippets
            };
            format!("[{}] {title}\n{snippets}\nSource: {source}\nURL: {url}", i + 1)
        })
        .collect();

    let total = response
        .get("totalResults")
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .unwrap_or(results.len() as u64);
    let query = response
        .pointer("/metadata/searchedQuery")
        .and_then(Value::as_str)
        .unwrap_or("your query");

    format!("Search results for \"{query}\" ({total} results):\n\n{}", blocks.join("\n\n"))
}

fn snippet_text(result: &Value) -> String {
    let Some(snippets) = result.get("snippets").and_then(Value::as_array) else {
        return String::new();
    };
    let mut ordered: Vec<&Value> = snippets.iter().collect();
    ordered.sort_by_key(|s| s.get("snippetTextOrdering").and_then(Value::as_i64).unwrap_or(0));
    ordered
        .into_iter()
        .filter_map(|s| s.get("text").and_then(Value::as_str))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a chat response as `AUTHOR: text` paragraphs.
pub fn format_chat(response: &Value) -> String {
    let Some(messages) = response.get("messages").and_then(Value::as_array) else {
        return "No response received.".to_string();
    };

    let lines: Vec<String> = messages
        .iter()
        .filter_map(|message| {
            let author = message.get("author").and_then(Value::as_str).unwrap_or("UNKNOWN");
            let text = message
                .get("fragments")
                .and_then(Value::as_array)
                .map(|fragments| {
                    fragments
                        .iter()
                        .filter_map(|f| f.get("text").and_then(Value::as_str))
                        .collect::<String>()
                })
                .unwrap_or_default();
            (!text.is_empty()).then(|| format!("{author}: {text}"))
        })
        .collect();

    if lines.is_empty() {
        "No response received.".to_string()
    } else {
        lines.join("\n\n")
    }
}
