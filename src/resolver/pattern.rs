use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use super::{IntentResolver, ResolveError, Resolution, ToolInvocation};
use crate::catalog::ToolCatalog;
use crate::mcp::tool_names;

/// Keyword-driven intent resolution over a fixed set of categories.
///
/// Categories are evaluated independently, not as a priority chain: a
/// single message can contribute one invocation per matching category.
/// Only the generic list-tools fallback and the catalog token tie-break
/// wait for every named category to come up empty.
pub struct PatternResolver {
    repo_re: Regex,
    bare_repo_re: Regex,
    issue_number_re: Regex,
    quoted_re: Regex,
    path_re: Regex,
    branches_re: Regex,
    create_guard_re: Regex,
}

impl Default for PatternResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternResolver {
    pub fn new() -> Self {
        Self {
            repo_re: Regex::new(r"\b([A-Za-z0-9][A-Za-z0-9_.-]*)/([A-Za-z0-9][A-Za-z0-9_.-]*)")
                .expect("repo regex"),
            bare_repo_re: Regex::new(r"(?i)\brepo(?:sitory)?\s+([A-Za-z0-9][A-Za-z0-9_.-]*)")
                .expect("bare repo regex"),
            issue_number_re: Regex::new(r"(?i)(?:#|issue\s+#?|number\s+)(\d+)")
                .expect("issue number regex"),
            quoted_re: Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("quoted regex"),
            path_re: Regex::new(r"\b([\w-]+(?:/[\w.-]+)*\.[A-Za-z0-9]+)\b").expect("path regex"),
            branches_re: Regex::new(r"(?i)\bfrom\s+([\w./-]+)\s+(?:to|into)\s+([\w./-]+)")
                .expect("branches regex"),
            create_guard_re: Regex::new(r"\b(?:create|open an|new issue|file an)\b")
                .expect("create guard regex"),
        }
    }

    fn matches_any(text: &str, triggers: &[&str]) -> bool {
        triggers.iter().any(|t| text.contains(t))
    }

    /// Pulls an `owner/name` reference out of the text, falling back to a
    /// bare `repo <name>` mention (scoped to the catalog's fallback
    /// owner) and then to the configured default repository.
    fn extract_repo(&self, input: &str, catalog: &ToolCatalog) -> Option<(String, String)> {
        // A path like src/main.rs also matches owner/name; prefer a
        // candidate whose name half carries no extension dot.
        let mut first = None;
        for caps in self.repo_re.captures_iter(input) {
            let owner = caps[1].to_string();
            let name = caps[2].to_string();
            if !name.contains('.') {
                return Some((owner, name));
            }
            first.get_or_insert((owner, name));
        }
        if let Some(pair) = first {
            return Some(pair);
        }

        if let Some(caps) = self.bare_repo_re.captures(input) {
            if let Some(owner) = catalog.fallback_owner() {
                return Some((owner.to_string(), caps[1].to_string()));
            }
        }

        catalog.default_repository().cloned()
    }

    fn extract_issue_number(&self, input: &str) -> Option<u64> {
        self.issue_number_re
            .captures(input)
            .and_then(|caps| caps[1].parse().ok())
    }

    fn extract_quoted(&self, input: &str) -> Option<String> {
        self.quoted_re.captures(input).map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
    }

    fn extract_path(&self, input: &str) -> Option<String> {
        self.path_re.captures(input).map(|caps| caps[1].to_string())
    }

    fn repo_scoped(
        invocation: ToolInvocation,
        owner: &str,
        repo: &str,
    ) -> ToolInvocation {
        invocation.with_arg("owner", owner).with_arg("repo", repo)
    }

    /// Last resort before giving up: pick the first catalog tool whose
    /// name shares a word with the request, attaching the default
    /// repository when one is configured.
    async fn token_overlap(&self, lower: &str, catalog: &ToolCatalog) -> Option<ToolInvocation> {
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 3)
            .collect();

        for tool in catalog.available_tools().await {
            let shared = tool
                .name
                .split(['_', '-'])
                .any(|part| part.len() >= 3 && words.contains(&part));
            if !shared {
                continue;
            }

            let mut invocation = ToolInvocation::new(
                tool.name.clone(),
                format!("trying {} for your request", tool.name),
            );
            if let Some((owner, repo)) = catalog.default_repository() {
                invocation = Self::repo_scoped(invocation, owner, repo);
            }
            debug!(tool = %tool.name, "Resolved by catalog token overlap");
            return Some(invocation);
        }
        None
    }
}

#[async_trait]
impl IntentResolver for PatternResolver {
    async fn resolve(
        &self,
        input: &str,
        catalog: &ToolCatalog,
    ) -> Result<Resolution, ResolveError> {
        let lower = input.trim().to_lowercase();
        let mut invocations = Vec::new();

        // Repository listing: deliberately unscoped, the remote resolves
        // @me to the authenticated user.
        if Self::matches_any(&lower, &["repositories", "list repos", "my repos", "show repos"]) {
            invocations.push(
                ToolInvocation::new(tool_names::SEARCH_REPOSITORIES, "listing your repositories")
                    .with_arg("query", "user:@me"),
            );
        }

        if Self::matches_any(&lower, &["create repo", "new repo"]) {
            if let Some(name) = self.extract_quoted(input) {
                invocations.push(
                    ToolInvocation::new(
                        tool_names::CREATE_REPOSITORY,
                        format!("creating repository {}", name),
                    )
                    .with_arg("name", name),
                );
            }
        }

        if Self::matches_any(&lower, &["pull requests", "prs"]) {
            if let Some((owner, repo)) = self.extract_repo(input, catalog) {
                invocations.push(Self::repo_scoped(
                    ToolInvocation::new(
                        tool_names::LIST_PULL_REQUESTS,
                        format!("listing pull requests in {}/{}", owner, repo),
                    ),
                    &owner,
                    &repo,
                ));
            }
        }

        if Self::matches_any(
            &lower,
            &["create pull request", "create a pr", "open a pr", "create pr"],
        ) {
            if let (Some((owner, repo)), Some(title), Some(branches)) = (
                self.extract_repo(input, catalog),
                self.extract_quoted(input),
                self.branches_re.captures(input),
            ) {
                invocations.push(
                    Self::repo_scoped(
                        ToolInvocation::new(
                            tool_names::CREATE_PULL_REQUEST,
                            format!("opening pull request \"{}\" in {}/{}", title, owner, repo),
                        ),
                        &owner,
                        &repo,
                    )
                    .with_arg("title", title)
                    .with_arg("head", branches[1].to_string())
                    .with_arg("base", branches[2].to_string()),
                );
            }
        }

        if lower.contains("issues") {
            if let Some((owner, repo)) = self.extract_repo(input, catalog) {
                invocations.push(Self::repo_scoped(
                    ToolInvocation::new(
                        tool_names::LIST_ISSUES,
                        format!("listing issues in {}/{}", owner, repo),
                    ),
                    &owner,
                    &repo,
                ));
            }
        }

        if Self::matches_any(
            &lower,
            &["create issue", "create an issue", "new issue", "open an issue", "file an issue"],
        ) {
            if let (Some((owner, repo)), Some(title)) = (
                self.extract_repo(input, catalog),
                self.extract_quoted(input),
            ) {
                invocations.push(
                    Self::repo_scoped(
                        ToolInvocation::new(
                            tool_names::CREATE_ISSUE,
                            format!("creating issue \"{}\" in {}/{}", title, owner, repo),
                        ),
                        &owner,
                        &repo,
                    )
                    .with_arg("title", title),
                );
            }
        }

        // Single-issue fetch fires on an extractable number, not on a
        // keyword list, so "show #68" works too.
        if lower.contains("issue") || input.contains('#') {
            if let Some(number) = self.extract_issue_number(input) {
                if !self.create_guard_re.is_match(&lower) {
                    if let Some((owner, repo)) = self.extract_repo(input, catalog) {
                        invocations.push(
                            Self::repo_scoped(
                                ToolInvocation::new(
                                    tool_names::GET_ISSUE,
                                    format!("fetching issue #{} from {}/{}", number, owner, repo),
                                ),
                                &owner,
                                &repo,
                            )
                            .with_arg("issue_number", number),
                        );
                    }
                }
            }
        }

        if Self::matches_any(&lower, &["file", "contents of"]) {
            if let (Some((owner, repo)), Some(path)) = (
                self.extract_repo(input, catalog),
                self.extract_path(input),
            ) {
                invocations.push(
                    Self::repo_scoped(
                        ToolInvocation::new(
                            tool_names::GET_FILE_CONTENTS,
                            format!("fetching {} from {}/{}", path, owner, repo),
                        ),
                        &owner,
                        &repo,
                    )
                    .with_arg("path", path),
                );
            }
        }

        if Self::matches_any(
            &lower,
            &["my profile", "who am i", "my account", "user profile", "about me"],
        ) {
            invocations.push(ToolInvocation::new(
                tool_names::GET_ME,
                "looking up your profile",
            ));
        }

        // The generic fallback only fires when nothing else matched.
        if invocations.is_empty()
            && Self::matches_any(
                &lower,
                &["what can you do", "help", "list tools", "available tools", "capabilities"],
            )
        {
            invocations.push(ToolInvocation::new(
                tool_names::LIST_AVAILABLE_TOOLS,
                "listing what I can do",
            ));
        }

        if invocations.is_empty() {
            if let Some(invocation) = self.token_overlap(&lower, catalog).await {
                invocations.push(invocation);
            }
        }

        if invocations.is_empty() {
            return Ok(Resolution::NeedsMoreInfo(
                "tell me which repository (owner/repo) and what you'd like to do — \
                 for example 'list my repositories' or 'show issue #12 in octocat/hello-world'"
                    .to_string(),
            ));
        }

        debug!(count = invocations.len(), "Pattern resolution produced invocations");
        Ok(Resolution::ToolCalls(invocations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::ToolInfo;

    fn catalog() -> ToolCatalog {
        ToolCatalog::from_snapshot(Vec::new(), None)
    }

    fn catalog_with_default() -> ToolCatalog {
        ToolCatalog::from_snapshot(
            Vec::new(),
            Some(("octocat".to_string(), "hello-world".to_string())),
        )
    }

    async fn resolve(input: &str, catalog: &ToolCatalog) -> Resolution {
        PatternResolver::new().resolve(input, catalog).await.unwrap()
    }

    fn calls(resolution: Resolution) -> Vec<ToolInvocation> {
        match resolution {
            Resolution::ToolCalls(calls) => calls,
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_repositories_is_a_single_unscoped_invocation() {
        let calls = calls(resolve("List my repositories", &catalog()).await);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, tool_names::SEARCH_REPOSITORIES);
        assert!(!calls[0].arguments.contains_key("owner"));
        assert!(!calls[0].arguments.contains_key("repo"));
    }

    #[tokio::test]
    async fn issue_fetch_extracts_repo_and_number() {
        let calls = calls(resolve("Show issue #68 in octocat/hello-world", &catalog()).await);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, tool_names::GET_ISSUE);
        assert_eq!(calls[0].arguments["owner"], "octocat");
        assert_eq!(calls[0].arguments["repo"], "hello-world");
        assert_eq!(calls[0].arguments["issue_number"], 68);
    }

    #[tokio::test]
    async fn issue_fetch_accepts_spelled_out_number() {
        let calls = calls(resolve("get issue 42 from octocat/hello-world", &catalog()).await);
        assert_eq!(calls[0].arguments["issue_number"], 42);
    }

    #[tokio::test]
    async fn issue_fetch_without_repo_contributes_nothing() {
        let resolution = resolve("show issue #68", &catalog()).await;
        assert!(matches!(resolution, Resolution::NeedsMoreInfo(_)));
    }

    #[tokio::test]
    async fn issue_fetch_falls_back_to_default_repository() {
        let calls = calls(resolve("show issue #68", &catalog_with_default()).await);
        assert_eq!(calls[0].arguments["owner"], "octocat");
        assert_eq!(calls[0].arguments["repo"], "hello-world");
    }

    #[tokio::test]
    async fn unmatched_text_needs_more_info() {
        let resolution = resolve("what's the weather like today", &catalog()).await;
        assert!(matches!(resolution, Resolution::NeedsMoreInfo(_)));
    }

    #[tokio::test]
    async fn resolution_is_deterministic() {
        let catalog = catalog_with_default();
        let input = "list issues in octocat/hello-world";
        let first = resolve(input, &catalog).await;
        let second = resolve(input, &catalog).await;
        assert_eq!(first, second);
    }

    /// Documented quirk: categories are evaluated independently, so one
    /// message can yield several unrelated invocations.
    #[tokio::test]
    async fn one_message_can_match_several_categories() {
        let calls = calls(
            resolve(
                "list my repositories and show issue #5 in octocat/hello-world",
                &catalog(),
            )
            .await,
        );
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].tool_name, tool_names::SEARCH_REPOSITORIES);
        assert_eq!(calls[1].tool_name, tool_names::GET_ISSUE);
    }

    #[tokio::test]
    async fn create_issue_requires_a_title() {
        // Quoted title present
        let calls = calls(
            resolve("create an issue \"login broken\" in octocat/hello-world", &catalog()).await,
        );
        assert_eq!(calls[0].tool_name, tool_names::CREATE_ISSUE);
        assert_eq!(calls[0].arguments["title"], "login broken");

        // No title: the category silently contributes nothing
        let resolution = resolve("create an issue in octocat/hello-world", &catalog()).await;
        assert!(matches!(resolution, Resolution::NeedsMoreInfo(_)));
    }

    #[tokio::test]
    async fn file_fetch_extracts_the_path() {
        let calls = calls(
            resolve("show me the file src/main.rs in octocat/hello-world", &catalog()).await,
        );
        assert_eq!(calls[0].tool_name, tool_names::GET_FILE_CONTENTS);
        assert_eq!(calls[0].arguments["owner"], "octocat");
        assert_eq!(calls[0].arguments["path"], "src/main.rs");
    }

    #[tokio::test]
    async fn fallback_lists_tools_only_when_nothing_else_matched() {
        let alone = calls(resolve("help", &catalog()).await);
        assert_eq!(alone[0].tool_name, tool_names::LIST_AVAILABLE_TOOLS);

        // "help" alongside a real category defers to the category.
        let deferred = calls(resolve("help me list my repositories", &catalog()).await);
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].tool_name, tool_names::SEARCH_REPOSITORIES);
    }

    #[tokio::test]
    async fn bare_repo_name_scopes_to_the_fallback_owner() {
        let catalog =
            ToolCatalog::from_snapshot(Vec::new(), None).with_fallback_owner("octocat");
        let calls = calls(resolve("list issues in repo hello-world", &catalog).await);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, tool_names::LIST_ISSUES);
        assert_eq!(calls[0].arguments["owner"], "octocat");
        assert_eq!(calls[0].arguments["repo"], "hello-world");
    }

    #[tokio::test]
    async fn bare_repo_name_without_any_owner_contributes_nothing() {
        let resolution = resolve("list issues in repo hello-world", &catalog()).await;
        assert!(matches!(resolution, Resolution::NeedsMoreInfo(_)));
    }

    #[tokio::test]
    async fn past_tense_created_does_not_suppress_issue_fetch() {
        let calls = calls(
            resolve(
                "show issue #68 in octocat/hello-world that was created yesterday",
                &catalog(),
            )
            .await,
        );
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, tool_names::GET_ISSUE);
        assert_eq!(calls[0].arguments["issue_number"], 68);
    }

    #[tokio::test]
    async fn token_overlap_picks_first_matching_catalog_tool() {
        let catalog = ToolCatalog::from_snapshot(
            vec![
                ToolInfo {
                    name: "list_workflows".to_string(),
                    description: "List workflows".to_string(),
                    input_schema: serde_json::json!({}),
                },
                ToolInfo {
                    name: "get_workflow_run".to_string(),
                    description: "Get a workflow run".to_string(),
                    input_schema: serde_json::json!({}),
                },
            ],
            Some(("octocat".to_string(), "hello-world".to_string())),
        );

        let calls = calls(resolve("show me the workflows please", &catalog).await);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_name, "list_workflows");
        // Default repository rides along as parameters.
        assert_eq!(calls[0].arguments["owner"], "octocat");
    }
}
