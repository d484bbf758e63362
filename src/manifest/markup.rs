//! Parsers for content definition files.
//!
//! Agent files are Markdown with optional YAML frontmatter and an embedded
//! `<agent>` block. Workflows are YAML (or Markdown with frontmatter). Tools and
//! tasks are XML-ish `<task>`/`<tool>` files or Markdown with frontmatter.
//!
//! Parsers never fail: they return whatever they recovered plus the warnings
//! collected on the way.

use crate::manifest::records::{MenuItem, Persona};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static AGENT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<agent\b([^>]*)>(.*?)</agent>").expect("agent block pattern")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*"([^"]*)""#).expect("attribute pattern")
});

static MENU_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<item\b([^>]*?)(?:/>|>(.*?)</item>)").expect("menu item pattern")
});

static COMMAND_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(task|tool)\b([^>]*)>").expect("command tag pattern")
});

/// Something recoverable that went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    InvalidFrontmatter(String),
    MissingAgentBlock,
    MissingPersonaField(&'static str),
    MenuItemWithoutCommand(String),
    InvalidYaml(String),
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseWarning::InvalidFrontmatter(msg) => write!(f, "invalid frontmatter: {}", msg),
            ParseWarning::MissingAgentBlock => write!(f, "no <agent> block"),
            ParseWarning::MissingPersonaField(field) => write!(f, "persona has no <{}>", field),
            ParseWarning::MenuItemWithoutCommand(label) => {
                write!(f, "menu item without cmd: {}", label)
            }
            ParseWarning::InvalidYaml(msg) => write!(f, "invalid YAML: {}", msg),
        }
    }
}

/// A partial value plus the warnings collected while building it.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub value: T,
    pub warnings: Vec<ParseWarning>,
}

/// Frontmatter fields the catalog reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    pub name: Option<String>,
    pub description: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub standalone: Option<bool>,
}

/// Everything recoverable from an agent definition.
#[derive(Debug, Clone, Default)]
pub struct AgentMarkup {
    pub frontmatter: Frontmatter,
    pub name: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub persona: Option<Persona>,
    pub capabilities: Vec<String>,
    pub menu: Vec<MenuItem>,
    pub workflows: BTreeMap<String, String>,
}

/// Split `---` frontmatter from the body. `None` when the file has none.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;
    let end = rest.find("\n---")?;
    let yaml = &rest[..end];
    let after = &rest[end + 4..];
    let body = after.split_once('\n').map(|(_, body)| body).unwrap_or("");
    Some((yaml, body))
}

fn parse_frontmatter(content: &str, warnings: &mut Vec<ParseWarning>) -> (Frontmatter, String) {
    match split_frontmatter(content) {
        Some((yaml, body)) => {
            let frontmatter = serde_yaml::from_str::<Frontmatter>(yaml).unwrap_or_else(|e| {
                warnings.push(ParseWarning::InvalidFrontmatter(e.to_string()));
                Frontmatter::default()
            });
            (frontmatter, body.to_string())
        }
        None => (Frontmatter::default(), content.to_string()),
    }
}

fn attributes(raw: &str) -> BTreeMap<String, String> {
    ATTRIBUTE
        .captures_iter(raw)
        .map(|cap| (cap[1].to_string(), unescape(&cap[2])))
        .collect()
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Text of the first `<tag>…</tag>` in `body`, trimmed.
fn element_text(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)?;
    let after_open = &body[start + open.len()..];
    // Guard against `<role>` matching `<roles>`.
    if !after_open.starts_with('>') && !after_open.starts_with(char::is_whitespace) {
        return None;
    }
    let content_start = after_open.find('>')? + 1;
    let content = &after_open[content_start..];
    let end = content.find(&close)?;
    let text = unescape(content[..end].trim());
    Some(collapse_whitespace(&text))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name a workflow reference goes by: its directory for `…/<name>/workflow.yaml`,
/// otherwise the file stem.
pub fn workflow_name_from_path(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    let path = Path::new(&normalized);
    let stem = path.file_stem()?.to_string_lossy().to_string();
    if stem == "workflow" {
        path.parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
    } else {
        Some(stem)
    }
}

fn parse_menu(body: &str, warnings: &mut Vec<ParseWarning>) -> Vec<MenuItem> {
    let menu_body = match body.find("<menu") {
        Some(start) => &body[start..],
        None => return Vec::new(),
    };
    MENU_ITEM
        .captures_iter(menu_body)
        .filter_map(|cap| {
            let attrs = attributes(cap.get(1).map(|m| m.as_str()).unwrap_or(""));
            let label = cap
                .get(2)
                .map(|m| collapse_whitespace(&unescape(m.as_str())))
                .unwrap_or_default();
            let cmd = match attrs.get("cmd") {
                Some(cmd) => cmd.trim().trim_start_matches('*').to_string(),
                None => {
                    warnings.push(ParseWarning::MenuItemWithoutCommand(label));
                    return None;
                }
            };
            let workflow = attrs
                .get("workflow")
                .or_else(|| attrs.get("run-workflow"))
                .or_else(|| attrs.get("validate-workflow"))
                .filter(|w| !w.trim().is_empty() && w.trim() != "todo")
                .cloned();
            let exec = attrs.get("exec").cloned();
            Some(MenuItem {
                cmd,
                label,
                workflow,
                exec,
            })
        })
        .collect()
}

fn workflow_map(menu: &[MenuItem]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for item in menu {
        let target = match item.workflow.as_ref().or(item.exec.as_ref()) {
            Some(target) if item.workflow.is_some() || is_workflow_file(target) => target,
            _ => continue,
        };
        if !item.cmd.is_empty() {
            map.entry(item.cmd.clone()).or_insert_with(|| target.clone());
        }
        if let Some(name) = workflow_name_from_path(target) {
            map.entry(name).or_insert_with(|| target.clone());
        }
    }
    map
}

fn is_workflow_file(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    normalized.ends_with("/workflow.yaml") || normalized.ends_with("/workflow.md")
}

fn split_list(text: &str) -> Vec<String> {
    text.split(|c| c == ',' || c == '\n' || c == ';')
        .map(|item| item.trim().trim_start_matches('-').trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse an agent definition file.
pub fn parse_agent_markup(content: &str) -> Parsed<AgentMarkup> {
    let mut warnings = Vec::new();
    let (frontmatter, body) = parse_frontmatter(content, &mut warnings);
    let mut markup = AgentMarkup {
        frontmatter,
        ..Default::default()
    };

    let Some(block) = AGENT_BLOCK.captures(&body) else {
        warnings.push(ParseWarning::MissingAgentBlock);
        return Parsed {
            value: markup,
            warnings,
        };
    };
    let attrs = attributes(&block[1]);
    let inner = block[2].to_string();

    markup.name = attrs.get("name").cloned();
    markup.title = attrs.get("title").cloned();
    markup.icon = attrs.get("icon").cloned();

    if inner.contains("<persona") {
        let mut field = |tag: &'static str| {
            element_text(&inner, tag).unwrap_or_else(|| {
                warnings.push(ParseWarning::MissingPersonaField(tag));
                String::new()
            })
        };
        markup.persona = Some(Persona {
            role: field("role"),
            identity: field("identity"),
            communication_style: field("communication_style"),
            principles: field("principles"),
        });
    }

    markup.capabilities = element_text(&inner, "capabilities")
        .map(|text| split_list(&text))
        .unwrap_or_default();
    markup.menu = parse_menu(&inner, &mut warnings);
    markup.workflows = workflow_map(&markup.menu);

    Parsed {
        value: markup,
        warnings,
    }
}

/// Workflow fields the catalog reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowDefinition {
    pub name: Option<String>,
    pub description: Option<String>,
    pub standalone: Option<bool>,
}

/// Parse `workflow.yaml`, or a `workflow.md` whose metadata sits in frontmatter.
pub fn parse_workflow_definition(content: &str) -> Parsed<WorkflowDefinition> {
    let mut warnings = Vec::new();
    let yaml = split_frontmatter(content)
        .map(|(yaml, _)| yaml)
        .unwrap_or(content);
    let value = serde_yaml::from_str::<WorkflowDefinition>(yaml).unwrap_or_else(|e| {
        warnings.push(ParseWarning::InvalidYaml(e.to_string()));
        WorkflowDefinition::default()
    });
    Parsed { value, warnings }
}

/// Tool/task fields the catalog reads.
#[derive(Debug, Clone, Default)]
pub struct CommandDefinition {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub standalone: bool,
}

/// Parse a tool or task file.
pub fn parse_command_definition(content: &str) -> Parsed<CommandDefinition> {
    let mut warnings = Vec::new();
    let (frontmatter, body) = parse_frontmatter(content, &mut warnings);
    let mut value = CommandDefinition {
        name: frontmatter.name.clone(),
        display_name: frontmatter.title.clone(),
        description: frontmatter.description.clone(),
        standalone: frontmatter.standalone.unwrap_or(false),
    };

    if let Some(cap) = COMMAND_TAG.captures(&body) {
        let attrs = attributes(&cap[2]);
        if value.display_name.is_none() {
            value.display_name = attrs.get("name").cloned();
        }
        if value.description.is_none() {
            value.description = attrs
                .get("description")
                .cloned()
                .or_else(|| element_text(&body, "objective"));
        }
        if let Some(flag) = attrs.get("standalone") {
            value.standalone = flag.eq_ignore_ascii_case("true");
        }
    }

    Parsed { value, warnings }
}
