//! Renders raw tool results as readable text.
//!
//! Formatting is total: any `serde_json::Value`, however partial or
//! malformed, produces a string. Known tools get dedicated templates;
//! everything else goes through shape probes evaluated in a fixed
//! priority order, with a filtered key/value dump as the last resort.

use serde_json::{Map, Value};

use crate::mcp::tool_names;

const BODY_PREVIEW_CHARS: usize = 200;
const REPO_LIST_CAP: usize = 10;
const ISSUE_LIST_CAP: usize = 5;
const PR_LIST_CAP: usize = 5;
const FALLBACK_ENTRY_CAP: usize = 10;

/// Formats a tool result for display. Never fails; when no template or
/// probe applies the raw JSON is shown instead.
pub fn format_result(tool_name: &str, data: &Value) -> String {
    format_known_tool(tool_name, data).unwrap_or_else(|| format_by_shape(data))
}

/// Dedicated templates for the tools the pipeline knows by name. Returns
/// `None` when the payload does not have the expected shape, letting the
/// structural probes take over.
fn format_known_tool(tool_name: &str, data: &Value) -> Option<String> {
    match tool_name {
        tool_names::SEARCH_REPOSITORIES => {
            let items = data
                .get("items")
                .and_then(Value::as_array)
                .or_else(|| data.as_array())?;
            Some(format_repo_list(items))
        }
        tool_names::LIST_PULL_REQUESTS => data.as_array().map(|items| format_pr_list(items)),
        tool_names::LIST_ISSUES => data.as_array().map(|items| format_issue_list(items)),
        tool_names::GET_ISSUE => data.as_object().map(format_issue),
        tool_names::GET_ME => data.as_object().map(format_user),
        tool_names::LIST_AVAILABLE_TOOLS => data.as_array().map(|tools| format_tool_list(tools)),
        _ => None,
    }
}

/// Structural dispatch for unrecognized tools, in fixed priority order:
/// protocol envelope, pull request, issue, repository, array, key/value
/// dump.
fn format_by_shape(data: &Value) -> String {
    if let Some(obj) = data.as_object() {
        if let Some(text) = format_content_envelope(obj) {
            return text;
        }
        if has_pr_shape(obj) {
            return format_pull_request(obj);
        }
        if has_issue_shape(obj) {
            return format_issue(obj);
        }
        if has_repo_shape(obj) {
            return format_repository(obj);
        }
        return format_fallback_map(obj);
    }

    if let Some(items) = data.as_array() {
        return format_array(items);
    }

    raw_json(data)
}

fn has_pr_shape(obj: &Map<String, Value>) -> bool {
    obj.contains_key("number") && obj.contains_key("title") && obj.contains_key("head")
}

fn has_issue_shape(obj: &Map<String, Value>) -> bool {
    obj.contains_key("number") && obj.contains_key("title")
}

fn has_repo_shape(obj: &Map<String, Value>) -> bool {
    obj.contains_key("name") && obj.contains_key("full_name")
}

/// The protocol-standard result envelope: a `content` array of typed
/// items. Text items are joined; anything else is stringified.
fn format_content_envelope(obj: &Map<String, Value>) -> Option<String> {
    let content = obj.get("content")?.as_array()?;
    let parts: Vec<String> = content
        .iter()
        .map(|item| {
            item.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| raw_json(item))
        })
        .collect();
    Some(parts.join("\n"))
}

fn format_array(items: &[Value]) -> String {
    match items {
        [] => "No results found.".to_string(),
        [single] => format_by_shape(single),
        _ => items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("Item {}:\n{}", i + 1, format_by_shape(item)))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn format_issue(obj: &Map<String, Value>) -> String {
    let mut out = format!(
        "Issue #{}: {}",
        field_u64(obj, "number"),
        field_str(obj, "title", "(untitled)")
    );

    out.push_str(&format!(
        "\nState: {} | Author: {} | Created: {}",
        field_str(obj, "state", "unknown"),
        nested_str(obj, "user", "login", "unknown"),
        date_only(field_str(obj, "created_at", "unknown")),
    ));

    let labels = name_list(obj.get("labels"), "name");
    if !labels.is_empty() {
        out.push_str(&format!("\nLabels: {}", labels.join(", ")));
    }
    let assignees = name_list(obj.get("assignees"), "login");
    if !assignees.is_empty() {
        out.push_str(&format!("\nAssignees: {}", assignees.join(", ")));
    }

    if let Some(body) = obj.get("body").and_then(Value::as_str) {
        if !body.trim().is_empty() {
            out.push('\n');
            out.push_str(&truncate(body.trim(), BODY_PREVIEW_CHARS));
        }
    }

    if let Some(url) = obj.get("html_url").and_then(Value::as_str) {
        out.push('\n');
        out.push_str(url);
    }
    out
}

fn format_pull_request(obj: &Map<String, Value>) -> String {
    let head = branch_ref(obj.get("head"));
    let base = branch_ref(obj.get("base"));

    let mut out = format!(
        "PR #{}: {}\nState: {} | Author: {} | Branch: {}\u{2192}{} | Created: {}",
        field_u64(obj, "number"),
        field_str(obj, "title", "(untitled)"),
        field_str(obj, "state", "unknown"),
        nested_str(obj, "user", "login", "unknown"),
        head,
        base,
        date_only(field_str(obj, "created_at", "unknown")),
    );

    if let Some(url) = obj.get("html_url").and_then(Value::as_str) {
        out.push('\n');
        out.push_str(url);
    }
    out
}

fn format_repository(obj: &Map<String, Value>) -> String {
    let mut out = field_str(obj, "full_name", "(unnamed repository)").to_string();

    if let Some(description) = obj.get("description").and_then(Value::as_str) {
        if !description.is_empty() {
            out.push_str(&format!(" \u{2014} {}", description));
        }
    }

    let language = obj.get("language").and_then(Value::as_str);
    let stars = obj.get("stargazers_count").and_then(Value::as_u64);
    match (language, stars) {
        (Some(language), Some(stars)) => {
            out.push_str(&format!("\nLanguage: {} | Stars: {}", language, stars))
        }
        (Some(language), None) => out.push_str(&format!("\nLanguage: {}", language)),
        (None, Some(stars)) => out.push_str(&format!("\nStars: {}", stars)),
        (None, None) => {}
    }

    if let Some(url) = obj.get("html_url").and_then(Value::as_str) {
        out.push('\n');
        out.push_str(url);
    }
    out
}

fn format_user(obj: &Map<String, Value>) -> String {
    let login = field_str(obj, "login", "unknown");
    let mut out = match obj.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => format!("{} ({})", login, name),
        _ => login.to_string(),
    };

    if let Some(bio) = obj.get("bio").and_then(Value::as_str) {
        if !bio.is_empty() {
            out.push('\n');
            out.push_str(bio);
        }
    }

    let repos = obj.get("public_repos").and_then(Value::as_u64);
    let followers = obj.get("followers").and_then(Value::as_u64);
    if repos.is_some() || followers.is_some() {
        out.push_str(&format!(
            "\nRepos: {} | Followers: {}",
            repos.unwrap_or(0),
            followers.unwrap_or(0)
        ));
    }

    if let Some(url) = obj.get("html_url").and_then(Value::as_str) {
        out.push('\n');
        out.push_str(url);
    }
    out
}

fn format_repo_list(items: &[Value]) -> String {
    format_capped_list(items, REPO_LIST_CAP, "Repositories:", |item| {
        let obj = item.as_object();
        let full_name = obj
            .and_then(|o| o.get("full_name"))
            .and_then(Value::as_str)
            .unwrap_or("(unnamed)");
        match obj
            .and_then(|o| o.get("description"))
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
        {
            Some(description) => format!("- {} \u{2014} {}", full_name, description),
            None => format!("- {}", full_name),
        }
    })
}

fn format_pr_list(items: &[Value]) -> String {
    format_capped_list(items, PR_LIST_CAP, "Pull requests:", |item| {
        let obj = item.as_object();
        format!(
            "- #{} {} ({})",
            obj.map(|o| field_u64(o, "number")).unwrap_or(0),
            obj.map(|o| field_str(o, "title", "(untitled)")).unwrap_or("(untitled)"),
            obj.map(|o| field_str(o, "state", "unknown")).unwrap_or("unknown"),
        )
    })
}

fn format_issue_list(items: &[Value]) -> String {
    format_capped_list(items, ISSUE_LIST_CAP, "Issues:", |item| {
        let obj = item.as_object();
        format!(
            "- #{} {} ({})",
            obj.map(|o| field_u64(o, "number")).unwrap_or(0),
            obj.map(|o| field_str(o, "title", "(untitled)")).unwrap_or("(untitled)"),
            obj.map(|o| field_str(o, "state", "unknown")).unwrap_or("unknown"),
        )
    })
}

fn format_tool_list(tools: &[Value]) -> String {
    if tools.is_empty() {
        return "No tools are currently available.".to_string();
    }
    let mut out = String::from("Here's what I can do:");
    for tool in tools {
        let obj = tool.as_object();
        out.push_str(&format!(
            "\n- {}: {}",
            obj.map(|o| field_str(o, "name", "(unnamed)")).unwrap_or("(unnamed)"),
            obj.map(|o| field_str(o, "description", "")).unwrap_or(""),
        ));
    }
    out
}

fn format_capped_list(
    items: &[Value],
    cap: usize,
    header: &str,
    line: impl Fn(&Value) -> String,
) -> String {
    if items.is_empty() {
        return "No results found.".to_string();
    }

    let mut out = header.to_string();
    for item in items.iter().take(cap) {
        out.push('\n');
        out.push_str(&line(item));
    }
    if items.len() > cap {
        out.push_str(&format!("\n(showing {} of {})", cap, items.len()));
    }
    out
}

/// Last-resort rendering: key/value lines with null and empty values
/// dropped, capped at ten entries. Falls back to raw JSON when nothing
/// presentable remains.
fn format_fallback_map(obj: &Map<String, Value>) -> String {
    let lines: Vec<String> = obj
        .iter()
        .filter(|(_, value)| !is_empty_value(value))
        .take(FALLBACK_ENTRY_CAP)
        .map(|(key, value)| match value.as_str() {
            Some(s) => format!("{}: {}", key, s),
            None => format!("{}: {}", key, value),
        })
        .collect();

    if lines.is_empty() {
        raw_json(&Value::Object(obj.clone()))
    } else {
        lines.join("\n")
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn raw_json(data: &Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

fn field_str<'a>(obj: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    obj.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn field_u64(obj: &Map<String, Value>, key: &str) -> u64 {
    obj.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn nested_str<'a>(
    obj: &'a Map<String, Value>,
    outer: &str,
    inner: &str,
    default: &'a str,
) -> &'a str {
    obj.get(outer)
        .and_then(|v| v.get(inner))
        .and_then(Value::as_str)
        .unwrap_or(default)
}

/// `head`/`base` can be an object carrying `ref` or a bare string.
fn branch_ref(value: Option<&Value>) -> &str {
    value
        .and_then(|v| v.get("ref").and_then(Value::as_str).or_else(|| v.as_str()))
        .unwrap_or("?")
}

fn name_list(value: Option<&Value>, key: &str) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get(key)
                        .and_then(Value::as_str)
                        .or_else(|| item.as_str())
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn date_only(timestamp: &str) -> &str {
    timestamp.get(..10).unwrap_or(timestamp)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formatting_is_total_on_degenerate_inputs() {
        assert_eq!(format_result("anything", &Value::Null), "null");
        assert_eq!(format_result("anything", &json!([])), "No results found.");

        let deep = json!({"a": {"b": {"c": {"d": [1, 2, 3]}}}});
        assert!(!format_result("anything", &deep).is_empty());
    }

    #[test]
    fn issue_without_user_still_formats() {
        let partial = json!({"number": 7, "title": "broken login"});
        let text = format_result("mystery_tool", &partial);
        assert!(text.contains("Issue #7: broken login"));
        assert!(text.contains("Author: unknown"));
    }

    #[test]
    fn issue_template_includes_labels_and_preview() {
        let issue = json!({
            "number": 68,
            "title": "Login fails",
            "state": "open",
            "user": {"login": "octocat"},
            "created_at": "2024-01-15T10:30:00Z",
            "labels": [{"name": "bug"}, {"name": "help wanted"}],
            "assignees": [{"login": "octocat"}],
            "body": "a".repeat(250),
            "html_url": "https://github.com/octocat/hello-world/issues/68"
        });
        let text = format_result("get_issue", &issue);
        assert!(text.contains("Issue #68: Login fails"));
        assert!(text.contains("Created: 2024-01-15"));
        assert!(text.contains("Labels: bug, help wanted"));
        assert!(text.contains("Assignees: octocat"));
        // 200-char preview plus ellipsis, not the whole body
        assert!(text.contains(&format!("{}...", "a".repeat(200))));
        assert!(!text.contains(&"a".repeat(201)));
        assert!(text.ends_with("https://github.com/octocat/hello-world/issues/68"));
    }

    #[test]
    fn pull_request_shape_wins_over_issue_shape() {
        let pr = json!({
            "number": 12,
            "title": "Add caching",
            "state": "open",
            "user": {"login": "octocat"},
            "head": {"ref": "feature/cache"},
            "base": {"ref": "main"},
            "created_at": "2024-02-01T00:00:00Z"
        });
        let text = format_result("mystery_tool", &pr);
        assert!(text.starts_with("PR #12: Add caching"));
        assert!(text.contains("feature/cache\u{2192}main"));
    }

    #[test]
    fn repository_shape_is_detected() {
        let repo = json!({
            "name": "hello-world",
            "full_name": "octocat/hello-world",
            "description": "My first repository",
            "language": "Rust",
            "stargazers_count": 42,
            "html_url": "https://github.com/octocat/hello-world"
        });
        let text = format_result("mystery_tool", &repo);
        assert!(text.starts_with("octocat/hello-world \u{2014} My first repository"));
        assert!(text.contains("Language: Rust | Stars: 42"));
    }

    #[test]
    fn content_envelope_joins_text_items() {
        let envelope = json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "text", "text": "second"},
            ]
        });
        assert_eq!(format_result("mystery_tool", &envelope), "first\nsecond");
    }

    #[test]
    fn singleton_array_formats_like_its_element() {
        let issue = json!({"number": 1, "title": "only one"});
        let direct = format_result("mystery_tool", &issue);
        let wrapped = format_result("mystery_tool", &json!([issue]));
        assert_eq!(direct, wrapped);
        assert!(!wrapped.contains("Item 1"));
    }

    #[test]
    fn longer_arrays_get_one_based_item_prefixes() {
        let items = json!([
            {"number": 1, "title": "first"},
            {"number": 2, "title": "second"},
        ]);
        let text = format_result("mystery_tool", &items);
        assert!(text.contains("Item 1:"));
        assert!(text.contains("Item 2:"));
    }

    #[test]
    fn repo_list_caps_at_ten_with_suffix() {
        let items: Vec<Value> = (0..23)
            .map(|i| json!({"full_name": format!("octocat/repo-{}", i)}))
            .collect();
        let text = format_result("search_repositories", &json!({"items": items}));
        assert!(text.contains("octocat/repo-0"));
        assert!(text.contains("octocat/repo-9"));
        assert!(!text.contains("octocat/repo-10"));
        assert!(text.contains("(showing 10 of 23)"));
    }

    #[test]
    fn issue_list_caps_at_five() {
        let items: Vec<Value> = (1..=8)
            .map(|i| json!({"number": i, "title": format!("issue {}", i), "state": "open"}))
            .collect();
        let text = format_result("list_issues", &json!(items));
        assert!(text.contains("#5 issue 5"));
        assert!(!text.contains("#6 issue 6"));
        assert!(text.contains("(showing 5 of 8)"));
    }

    #[test]
    fn fallback_dump_drops_empty_values() {
        let data = json!({
            "kept": "value",
            "gone_null": null,
            "gone_empty": "",
            "gone_list": [],
            "count": 3
        });
        let text = format_result("mystery_tool", &data);
        assert!(text.contains("kept: value"));
        assert!(text.contains("count: 3"));
        assert!(!text.contains("gone_null"));
        assert!(!text.contains("gone_empty"));
    }
}
