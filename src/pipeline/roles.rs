//! Agent roles
//!
//! The closed set of personas the pipeline talks to. Each role resolves once,
//! at startup, to fixed instructions and an optional output schema; nothing
//! here is assembled per call.

use serde::Serialize;
use serde_json::{json, Value};

/// A configured reasoning persona
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Turns a query into a search plan
    Planner,
    /// Runs one web search and summarizes it
    Search,
    /// Writes the final report
    Writer,
    /// Turns a report into an email
    DeliveryAgent,
}

impl Role {
    /// Stable role name used in logs and requests
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Planner => "planner",
            Role::Search => "search",
            Role::Writer => "writer",
            Role::DeliveryAgent => "delivery-agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape a structured role must return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    /// `{"searches": [{"query", "reason"}]}` with exactly `entries` items
    SearchPlan {
        /// Required number of searches
        entries: usize,
    },
    /// `{"short_summary", "markdown_report", "follow_up_questions"}`
    Report,
    /// `{"subject", "html_body"}`
    EmailDraft,
}

impl OutputSchema {
    /// Schema in the OpenAPI subset accepted by `generationConfig.responseSchema`
    pub fn response_schema(&self) -> Value {
        match self {
            OutputSchema::SearchPlan { entries } => json!({
                "type": "OBJECT",
                "properties": {
                    "searches": {
                        "type": "ARRAY",
                        "minItems": entries,
                        "maxItems": entries,
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "reason": {"type": "STRING"},
                                "query": {"type": "STRING"}
                            },
                            "required": ["reason", "query"]
                        }
                    }
                },
                "required": ["searches"]
            }),
            OutputSchema::Report => json!({
                "type": "OBJECT",
                "properties": {
                    "short_summary": {"type": "STRING"},
                    "markdown_report": {"type": "STRING"},
                    "follow_up_questions": {
                        "type": "ARRAY",
                        "items": {"type": "STRING"}
                    }
                },
                "required": ["short_summary", "markdown_report", "follow_up_questions"]
            }),
            OutputSchema::EmailDraft => json!({
                "type": "OBJECT",
                "properties": {
                    "subject": {"type": "STRING"},
                    "html_body": {"type": "STRING"}
                },
                "required": ["subject", "html_body"]
            }),
        }
    }

    /// Check a parsed response against the schema
    ///
    /// Returns a description of the first mismatch found.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        let object = value
            .as_object()
            .ok_or_else(|| "expected a JSON object".to_string())?;

        match self {
            OutputSchema::SearchPlan { entries } => {
                let searches = object
                    .get("searches")
                    .and_then(Value::as_array)
                    .ok_or_else(|| "missing 'searches' array".to_string())?;
                if searches.len() != *entries {
                    return Err(format!(
                        "expected exactly {} searches, got {}",
                        entries,
                        searches.len()
                    ));
                }
                for (i, item) in searches.iter().enumerate() {
                    require_string(item, "query").map_err(|e| format!("searches[{}]: {}", i, e))?;
                    if item.get("reason").is_none() {
                        require_string(item, "rationale")
                            .map_err(|_| format!("searches[{}]: missing 'reason'", i))?;
                    } else {
                        require_string(item, "reason")
                            .map_err(|e| format!("searches[{}]: {}", i, e))?;
                    }
                }
                Ok(())
            }
            OutputSchema::Report => {
                require_string(value, "short_summary")?;
                let body = if value.get("markdown_report").is_some() {
                    require_string(value, "markdown_report")?
                } else {
                    require_string(value, "markdown_body")
                        .map_err(|_| "missing 'markdown_report'".to_string())?
                };
                if body.trim().is_empty() {
                    return Err("'markdown_report' is empty".to_string());
                }
                match object.get("follow_up_questions") {
                    None | Some(Value::Null) => Ok(()),
                    Some(Value::Array(items)) if items.iter().all(Value::is_string) => Ok(()),
                    Some(_) => Err("'follow_up_questions' must be an array of strings".to_string()),
                }
            }
            OutputSchema::EmailDraft => {
                for field in ["subject", "html_body"] {
                    if require_string(value, field)?.trim().is_empty() {
                        return Err(format!("'{}' is empty", field));
                    }
                }
                Ok(())
            }
        }
    }
}

fn require_string<'a>(value: &'a Value, field: &str) -> Result<&'a str, String> {
    match value.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(format!("'{}' must be a string", field)),
        None => Err(format!("missing '{}'", field)),
    }
}

/// Everything needed to call one role
#[derive(Debug, Clone)]
pub struct RoleConfig {
    /// Display name used in logs
    pub name: &'static str,
    /// System-level instructions, never user controlled
    pub instructions: String,
    /// Required output shape, if the role is structured
    pub schema: Option<OutputSchema>,
    /// Whether the backend should ground the call with web search
    pub web_search: bool,
}

/// Immutable role -> configuration mapping, resolved at startup
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    planner: RoleConfig,
    search: RoleConfig,
    writer: RoleConfig,
    delivery_agent: RoleConfig,
}

impl RoleRegistry {
    /// Build the standard registry for plans of `num_searches` directives
    pub fn new(num_searches: usize) -> Self {
        Self {
            planner: RoleConfig {
                name: "Planner",
                instructions: planner_instructions(num_searches),
                schema: Some(OutputSchema::SearchPlan {
                    entries: num_searches,
                }),
                web_search: false,
            },
            search: RoleConfig {
                name: "Search Agent",
                instructions: SEARCH_INSTRUCTIONS.to_string(),
                schema: None,
                web_search: true,
            },
            writer: RoleConfig {
                name: "Writer Agent",
                instructions: WRITER_INSTRUCTIONS.to_string(),
                schema: Some(OutputSchema::Report),
                web_search: false,
            },
            delivery_agent: RoleConfig {
                name: "Email Agent",
                instructions: DELIVERY_INSTRUCTIONS.to_string(),
                schema: Some(OutputSchema::EmailDraft),
                web_search: false,
            },
        }
    }

    /// Configuration for a role
    pub fn get(&self, role: Role) -> &RoleConfig {
        match role {
            Role::Planner => &self.planner,
            Role::Search => &self.search,
            Role::Writer => &self.writer,
            Role::DeliveryAgent => &self.delivery_agent,
        }
    }
}

fn planner_instructions(num_searches: usize) -> String {
    format!(
        r#"You are a research planner. Given a research query, decide which web searches
would best answer it. Output exactly {} searches.

For each search give:
- "query": the search term to run
- "reason": one sentence on why this search helps answer the query

Return ONLY valid JSON of the form {{"searches": [{{"reason": "...", "query": "..."}}]}}."#,
        num_searches
    )
}

const SEARCH_INSTRUCTIONS: &str = r#"You are a research assistant. Given a search term, search the web for it and
write a concise summary of the results: 2-3 paragraphs, under 300 words.
Capture the main points and skip the fluff; full sentences are not required.
Someone else will synthesize a report from your summary.
Reply with the summary only, no commentary."#;

const WRITER_INSTRUCTIONS: &str = r#"You are a senior researcher writing a cohesive report for a research query.
You are given the original query and summaries of initial research. Some searches
may have failed; their notes say so and should be treated as gaps, not facts.

First outline the structure and flow of the report, then write it in markdown.
The report should be detailed: aim for 5-10 pages, at least 1000 words.

Return ONLY valid JSON with:
- "short_summary": a 2-3 sentence summary of the findings
- "markdown_report": the full report in markdown
- "follow_up_questions": suggested topics to research further"#;

const DELIVERY_INSTRUCTIONS: &str = r#"You turn a detailed research report into one nicely formatted HTML email.
You are given the recipient, a short summary and the report in markdown.

- Write an engaging subject line that names the research topic
- Convert the markdown report to clean, well structured HTML (headings, paragraphs, lists)
- Keep it easy to read

Return ONLY valid JSON with "subject" and "html_body"."#;
