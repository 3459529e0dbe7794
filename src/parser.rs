use crate::error::{DocfillError, Result};
use crate::path::PathExpr;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const MARKER_OPEN: &str = "{{";
const MARKER_CLOSE: &str = "}}";

/// The two block directive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Each,
    If,
}

impl BlockKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "each" => Some(Self::Each),
            "if" => Some(Self::If),
            _ => None,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Each => "each",
            Self::If => "if",
        })
    }
}

/// A parsed template node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text copied to the output unchanged
    Text(String),
    /// `{{path}}`
    Variable(PathExpr),
    /// `{{#each path}}body{{/each}}`
    Each { path: PathExpr, body: Vec<Node> },
    /// `{{#if path}}body{{/if}}`
    If { path: PathExpr, body: Vec<Node> },
}

// Flattens nested bodies onto a heap stack so dropping a deeply nested tree
// does not recurse once per level.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = match self {
            Node::Each { body, .. } | Node::If { body, .. } => std::mem::take(body),
            Node::Text(_) | Node::Variable(_) => return,
        };
        while let Some(mut node) = pending.pop() {
            if let Node::Each { body, .. } | Node::If { body, .. } = &mut node {
                pending.append(body);
            }
        }
    }
}

/// A template parsed into its directive tree.
///
/// Immutable once built; render it any number of times against different contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// True when the template contains no directives at all.
    pub fn is_static(&self) -> bool {
        self.nodes.iter().all(|node| matches!(node, Node::Text(_)))
    }
}

impl FromStr for Template {
    type Err = DocfillError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

/// Kind of a single marker, as reported by [`find_directives`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Variable,
    Each,
    If,
    EndEach,
    EndIf,
}

/// A directive marker found in a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectiveInfo {
    pub kind: DirectiveKind,
    /// The full marker including `{{` and `}}`
    pub full_match: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
enum Marker {
    Open(BlockKind, PathExpr),
    Close(BlockKind),
    Variable(PathExpr),
}

#[derive(Debug)]
enum Token<'t> {
    Text(&'t str),
    Marker {
        start: usize,
        end: usize,
        raw: &'t str,
        marker: Marker,
    },
}

/// Splits a template into literal text and classified markers, left to right.
///
/// Stops after the first error.
struct Scanner<'t> {
    template: &'t str,
    cursor: usize,
}

impl<'t> Scanner<'t> {
    fn new(template: &'t str) -> Self {
        Self {
            template,
            cursor: 0,
        }
    }

    fn fail(&mut self, err: DocfillError) -> Option<Result<Token<'t>>> {
        self.cursor = self.template.len();
        Some(Err(err))
    }
}

impl<'t> Iterator for Scanner<'t> {
    type Item = Result<Token<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        let template = self.template;
        let rest = &template[self.cursor..];
        if rest.is_empty() {
            return None;
        }

        let Some(offset) = rest.find(MARKER_OPEN) else {
            self.cursor = template.len();
            return Some(Ok(Token::Text(rest)));
        };
        if offset > 0 {
            self.cursor += offset;
            return Some(Ok(Token::Text(&rest[..offset])));
        }

        let start = self.cursor;
        let inner_start = start + MARKER_OPEN.len();
        let Some(inner_len) = template[inner_start..].find(MARKER_CLOSE) else {
            let snippet: String = rest.chars().take(32).collect();
            return self.fail(DocfillError::MalformedDirective {
                position: start,
                directive: snippet,
                reason: "missing closing '}}'".to_string(),
            });
        };
        let end = inner_start + inner_len + MARKER_CLOSE.len();
        let raw = &template[start..end];
        let inner = &template[inner_start..inner_start + inner_len];

        match classify(inner) {
            Ok(marker) => {
                self.cursor = end;
                Some(Ok(Token::Marker {
                    start,
                    end,
                    raw,
                    marker,
                }))
            }
            Err(reason) => self.fail(DocfillError::MalformedDirective {
                position: start,
                directive: raw.to_string(),
                reason,
            }),
        }
    }
}

fn classify(inner: &str) -> std::result::Result<Marker, String> {
    let trimmed = inner.trim();

    if let Some(rest) = trimmed.strip_prefix('#') {
        let rest = rest.trim_start();
        let (keyword, path) = rest
            .split_once(char::is_whitespace)
            .unwrap_or((rest, ""));
        let kind = BlockKind::from_keyword(keyword)
            .ok_or_else(|| format!("unknown block directive '#{keyword}'"))?;
        return PathExpr::parse(path).map(|path| Marker::Open(kind, path));
    }

    if let Some(rest) = trimmed.strip_prefix('/') {
        let keyword = rest.trim();
        return BlockKind::from_keyword(keyword)
            .map(Marker::Close)
            .ok_or_else(|| format!("unknown closing directive '/{keyword}'"));
    }

    PathExpr::parse(trimmed).map(Marker::Variable)
}

struct Frame {
    kind: BlockKind,
    path: PathExpr,
    position: usize,
    body: Vec<Node>,
}

impl Frame {
    fn into_node(self) -> Node {
        match self.kind {
            BlockKind::Each => Node::Each {
                path: self.path,
                body: self.body,
            },
            BlockKind::If => Node::If {
                path: self.path,
                body: self.body,
            },
        }
    }
}

fn current<'a>(root: &'a mut Vec<Node>, stack: &'a mut [Frame]) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => &mut frame.body,
        None => root,
    }
}

/// Parses a template into its directive tree.
///
/// Block directives are paired by a stack of open frames: an opening marker
/// pushes a frame that collects its body, the matching close pops it and
/// attaches the finished subtree to its parent. Runs in a single pass.
///
/// # Errors
///
/// - `DocfillError::MalformedDirective` for a marker with an empty or invalid
///   path, an unknown keyword, or a missing `}}`.
/// - `DocfillError::UnmatchedDirective` for a close without an open, a close of
///   the wrong kind, or a block still open at end of input.
pub fn parse(template: &str) -> Result<Template> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for token in Scanner::new(template) {
        match token? {
            Token::Text(text) => current(&mut root, &mut stack).push(Node::Text(text.to_string())),
            Token::Marker { start, marker, .. } => match marker {
                Marker::Variable(path) => {
                    current(&mut root, &mut stack).push(Node::Variable(path));
                }
                Marker::Open(kind, path) => stack.push(Frame {
                    kind,
                    path,
                    position: start,
                    body: Vec::new(),
                }),
                Marker::Close(kind) => {
                    let frame = stack.pop().ok_or_else(|| DocfillError::UnmatchedDirective {
                        position: start,
                        message: format!("{} has no matching {{{{#{kind}}}}}", close_tag(kind)),
                    })?;
                    if frame.kind != kind {
                        return Err(DocfillError::UnmatchedDirective {
                            position: start,
                            message: format!(
                                "{} cannot close {} opened at position {}",
                                close_tag(kind),
                                open_tag(frame.kind, &frame.path),
                                frame.position
                            ),
                        });
                    }
                    current(&mut root, &mut stack).push(frame.into_node());
                }
            },
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(DocfillError::UnmatchedDirective {
            position: frame.position,
            message: format!(
                "{} is never closed with {}",
                open_tag(frame.kind, &frame.path),
                close_tag(frame.kind)
            ),
        });
    }

    Ok(Template { nodes: root })
}

fn open_tag(kind: BlockKind, path: &PathExpr) -> String {
    format!("{{{{#{kind} {path}}}}}")
}

fn close_tag(kind: BlockKind) -> String {
    format!("{{{{/{kind}}}}}")
}

/// Lists every directive marker in source order without checking block pairing.
///
/// # Errors
///
/// Returns `DocfillError::MalformedDirective` for the first marker that cannot be classified.
pub fn find_directives(template: &str) -> Result<Vec<DirectiveInfo>> {
    let mut directives = Vec::new();

    for token in Scanner::new(template) {
        if let Token::Marker {
            start,
            end,
            raw,
            marker,
        } = token?
        {
            let (kind, path) = match marker {
                Marker::Variable(path) => (DirectiveKind::Variable, Some(path.to_string())),
                Marker::Open(BlockKind::Each, path) => (DirectiveKind::Each, Some(path.to_string())),
                Marker::Open(BlockKind::If, path) => (DirectiveKind::If, Some(path.to_string())),
                Marker::Close(BlockKind::Each) => (DirectiveKind::EndEach, None),
                Marker::Close(BlockKind::If) => (DirectiveKind::EndIf, None),
            };
            directives.push(DirectiveInfo {
                kind,
                full_match: raw.to_string(),
                path,
                start,
                end,
            });
        }
    }

    Ok(directives)
}
