//! pyproject.toml reader for the mirrored package pin (PEP 508/PEP 440)
//!
//! Only `project.dependencies` is read, whether it is spelled as a key of the
//! `[project]` table or as a dotted key (`project.dependencies = [...]`).

use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use pep508_rs::pep440_rs::{Operator, Version};
use pep508_rs::{Requirement, VerbatimUrl, VersionOrUrl};
use regex::Regex;
use tracing::{debug, warn};

use crate::version::error::ConfigError;

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("static regex is valid"));

/// PEP 503 normalized form of a package name.
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

/// Key path of the dependency list
const DEPENDENCIES_KEY: [&str; 2] = ["project", "dependencies"];

/// The parts of a pyproject.toml the mirror cares about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Decoded requirement strings of `project.dependencies`
    pub dependencies: Vec<String>,
}

/// Exact pin of the mirrored package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pin {
    /// Package name as spelled in the requirement (e.g. "Zizmor")
    pub name: String,
    pub version: Version,
}

impl Manifest {
    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut parser = tree_sitter::Parser::new();
        let language = tree_sitter_toml_ng::LANGUAGE;
        parser.set_language(&language.into()).map_err(|e| {
            warn!("Failed to set TOML language for tree-sitter: {}", e);
            ConfigError::Parse(e.to_string())
        })?;

        let tree = parser.parse(content, None).ok_or_else(|| {
            warn!("Failed to parse TOML content");
            ConfigError::Parse("Failed to parse TOML".to_string())
        })?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(ConfigError::Parse("Invalid TOML syntax".to_string()));
        }

        let mut manifest = Manifest::default();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                // Root-level keys, e.g. `project.dependencies = [...]`
                "pair" => manifest.read_pair(child, &[], content),
                "table" => {
                    if let Some(table) = table_path(child, content) {
                        manifest.read_table(child, &table, content);
                    }
                }
                _ => {}
            }
        }

        Ok(manifest)
    }

    /// Read and parse the manifest at `path`.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content)
    }

    /// Exact version the manifest currently pins `package` to.
    pub fn current_version(&self, package: &str) -> Result<Version, ConfigError> {
        self.current_pin(package).map(|pin| pin.version)
    }

    /// Exact pin of `package`, with its name as written in the manifest.
    ///
    /// The requirement must exist and carry exactly one `==` specifier.
    pub fn current_pin(&self, package: &str) -> Result<Pin, ConfigError> {
        let target = normalize_name(package);

        let mut found = None;
        for dep in &self.dependencies {
            let req = Requirement::<VerbatimUrl>::from_str(dep).map_err(|e| {
                ConfigError::InvalidRequirement {
                    requirement: dep.clone(),
                    reason: e.to_string(),
                }
            })?;
            if req.name.to_string() == target {
                found = Some((dep, req));
                break;
            }
        }

        let Some((raw, req)) = found else {
            return Err(ConfigError::MissingRequirement(package.to_string()));
        };

        let not_exact = || ConfigError::NotExactPin {
            package: package.to_string(),
            requirement: raw.clone(),
        };

        let Some(VersionOrUrl::VersionSpecifier(specifiers)) = &req.version_or_url else {
            return Err(not_exact());
        };

        match specifiers.iter().collect::<Vec<_>>().as_slice() {
            [spec] if *spec.operator() == Operator::Equal => {
                debug!("{} is pinned to {}", package, spec.version());
                Ok(Pin {
                    name: written_name(raw).to_string(),
                    version: spec.version().clone(),
                })
            }
            _ => Err(not_exact()),
        }
    }

    /// Read the pairs of a `[table]`
    fn read_table(&mut self, table_node: tree_sitter::Node, table: &[String], content: &str) {
        let mut cursor = table_node.walk();

        for child in table_node.children(&mut cursor) {
            if child.kind() == "pair" {
                self.read_pair(child, table, content);
            }
        }
    }

    /// Pick up `project.dependencies` from a `key = value` pair below `table`
    fn read_pair(&mut self, pair_node: tree_sitter::Node, table: &[String], content: &str) {
        let mut cursor = pair_node.walk();
        let mut is_dependencies = false;

        for child in pair_node.children(&mut cursor) {
            match child.kind() {
                "bare_key" | "quoted_key" | "dotted_key" => {
                    let path: Vec<String> = table
                        .iter()
                        .cloned()
                        .chain(key_path(&content[child.byte_range()]))
                        .collect();
                    is_dependencies = path == DEPENDENCIES_KEY;
                }
                "array" if is_dependencies => {
                    self.dependencies = strings_in_array(child, content);
                }
                _ => {}
            }
        }
    }
}

/// Package name at the start of a requirement string
fn written_name(requirement: &str) -> &str {
    let requirement = requirement.trim_start();
    let end = requirement
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(requirement.len());
    &requirement[..end]
}

/// Key path of a `[table]` header, if the node is a standard table
fn table_path(table_node: tree_sitter::Node, content: &str) -> Option<Vec<String>> {
    let header = table_node.child(0)?;
    if header.kind() != "[" {
        return None;
    }

    let mut cursor = table_node.walk();
    for child in table_node.children(&mut cursor) {
        if matches!(child.kind(), "bare_key" | "quoted_key" | "dotted_key") {
            return Some(key_path(&content[child.byte_range()]));
        }
    }
    None
}

/// Segments of a (possibly dotted) key, e.g. `project . "dependencies"`
fn key_path(key: &str) -> Vec<String> {
    key.split('.')
        .map(|segment| toml_string(segment.trim()))
        .collect()
}

/// String elements of a TOML array
fn strings_in_array(array_node: tree_sitter::Node, content: &str) -> Vec<String> {
    let mut cursor = array_node.walk();
    array_node
        .children(&mut cursor)
        .filter(|child| child.kind() == "string")
        .map(|child| toml_string(&content[child.byte_range()]))
        .collect()
}

/// Value of a TOML string literal; bare text is returned as is
fn toml_string(text: &str) -> String {
    let text = text.trim();
    if let Some(inner) = strip_delimiters(text, "\"\"\"") {
        decode_escapes(strip_leading_newline(inner))
    } else if let Some(inner) = strip_delimiters(text, "'''") {
        strip_leading_newline(inner).to_string()
    } else if let Some(inner) = strip_delimiters(text, "\"") {
        decode_escapes(inner)
    } else if let Some(inner) = strip_delimiters(text, "'") {
        inner.to_string()
    } else {
        text.to_string()
    }
}

fn strip_delimiters<'a>(text: &'a str, delimiter: &str) -> Option<&'a str> {
    if text.len() >= 2 * delimiter.len() {
        text.strip_prefix(delimiter)?.strip_suffix(delimiter)
    } else {
        None
    }
}

fn strip_leading_newline(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

/// Decode the escape sequences of a basic string body
fn decode_escapes(body: &str) -> String {
    let mut decoded = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }

        match chars.next() {
            Some('b') => decoded.push('\u{8}'),
            Some('t') => decoded.push('\t'),
            Some('n') => decoded.push('\n'),
            Some('f') => decoded.push('\u{c}'),
            Some('r') => decoded.push('\r'),
            Some('e') => decoded.push('\u{1b}'),
            Some('"') => decoded.push('"'),
            Some('\\') => decoded.push('\\'),
            Some(kind @ ('u' | 'U')) => {
                let len = if kind == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(len).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(unicode) => decoded.push(unicode),
                    None => {
                        decoded.push('\\');
                        decoded.push(kind);
                        decoded.push_str(&hex);
                    }
                }
            }
            // Line-ending backslash in multi-line strings trims up to the next content
            Some(ws) if ws.is_whitespace() => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
            }
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }

    decoded
}
