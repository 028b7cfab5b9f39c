//! Domain name generation engine.
//!
//! A scan pattern is either a wildcard pattern or a raw regular expression.
//! Both are turned into a regular expression, parsed with `regex-syntax`, and
//! every string the expression can match is enumerated lazily.
//!
//! # Wildcard Syntax
//!
//! - `*` : one character of `[a-z0-9-]`
//! - `%d`: one digit (`[0-9]`)
//! - `%w`: one letter (`[a-z]`)
//! - `%s`: a literal hyphen
//! - Any other character: literal (regex metacharacters are escaped)
//!
//! # Examples
//!
//! ```
//! use domain_scan_lib::generate::Expansion;
//!
//! let expansion = Expansion::from_pattern("app%d.com", false).unwrap();
//! assert_eq!(expansion.count(), 10);
//! assert_eq!(expansion.iter().next().as_deref(), Some("app0.com"));
//! ```

use crate::error::DomainScanError;
use crate::utils::is_valid_domain;
use regex_syntax::hir::{Class, Hir, HirKind};

/// Patterns expanding to more names than this are rejected.
pub const MAX_EXPANSIONS: u128 = 1_000_000;

/// How many leading expansions are checked against the domain predicate.
pub const VALIDATION_SAMPLE: usize = 10_000;

/// Upper bound used for `*`, `+` and `{n,}` inside raw regular expressions.
const UNBOUNDED_REPEAT_LIMIT: u32 = 100;

/// Convert a user pattern into the regular expression it stands for.
///
/// Raw regular expressions are returned untouched.
pub fn convert_pattern_to_regex(pattern: &str, is_regex: bool) -> String {
    if is_regex {
        return pattern.to_string();
    }

    let mut regex = String::with_capacity(pattern.len() * 2 + 2);
    regex.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '.' | '+' | '?' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\' => {
                regex.push('\\');
                regex.push(ch);
            }
            '*' => regex.push_str("[a-z0-9-]"),
            '%' => match chars.peek() {
                Some('d') => {
                    chars.next();
                    regex.push_str("[0-9]");
                }
                Some('w') => {
                    chars.next();
                    regex.push_str("[a-z]");
                }
                Some('s') => {
                    chars.next();
                    regex.push('-');
                }
                _ => regex.push('%'),
            },
            _ => regex.push(ch),
        }
    }

    regex.push('$');
    regex
}

/// A node of the expansion tree, built from the parsed expression.
#[derive(Debug, Clone)]
enum Node {
    Literal(String),
    Class(Vec<(char, char)>),
    Concat(Vec<Node>),
    Alternation(Vec<Node>),
    Repeat { node: Box<Node>, min: u32, max: u32 },
}

impl Node {
    fn from_hir(hir: &Hir) -> Node {
        match hir.kind() {
            // Anchors and word boundaries do not contribute characters
            HirKind::Empty | HirKind::Look(_) => Node::Literal(String::new()),
            HirKind::Literal(literal) => {
                Node::Literal(String::from_utf8_lossy(&literal.0).into_owned())
            }
            HirKind::Class(Class::Unicode(class)) => Node::Class(
                class
                    .ranges()
                    .iter()
                    .map(|range| (range.start(), range.end()))
                    .collect(),
            ),
            HirKind::Class(Class::Bytes(class)) => Node::Class(
                class
                    .ranges()
                    .iter()
                    .map(|range| (char::from(range.start()), char::from(range.end())))
                    .collect(),
            ),
            HirKind::Repetition(repetition) => {
                let min = repetition.min;
                let max = repetition
                    .max
                    .unwrap_or_else(|| min.max(UNBOUNDED_REPEAT_LIMIT));
                Node::Repeat {
                    node: Box::new(Node::from_hir(&repetition.sub)),
                    min,
                    max,
                }
            }
            HirKind::Capture(capture) => Node::from_hir(&capture.sub),
            HirKind::Concat(subs) => Node::Concat(subs.iter().map(Node::from_hir).collect()),
            HirKind::Alternation(subs) => {
                Node::Alternation(subs.iter().map(Node::from_hir).collect())
            }
        }
    }

    /// Number of strings this node produces, saturating at `u128::MAX`.
    fn count(&self) -> u128 {
        match self {
            Node::Literal(_) => 1,
            Node::Class(ranges) => ranges
                .iter()
                .map(|&(start, end)| class_range_len(start, end))
                .fold(0u128, u128::saturating_add),
            Node::Concat(nodes) => nodes
                .iter()
                .map(Node::count)
                .fold(1u128, u128::saturating_mul),
            Node::Alternation(nodes) => nodes
                .iter()
                .map(Node::count)
                .fold(0u128, u128::saturating_add),
            Node::Repeat { node, min, max } => repeat_count(node.count(), *min, *max),
        }
    }

    fn iter(&self) -> Box<dyn Iterator<Item = String> + Send + '_> {
        match self {
            Node::Literal(text) => Box::new(std::iter::once(text.clone())),
            Node::Class(ranges) => Box::new(
                ranges
                    .iter()
                    .flat_map(|&(start, end)| start..=end)
                    .map(String::from),
            ),
            Node::Concat(nodes) => concat_iter(nodes),
            Node::Alternation(nodes) => Box::new(nodes.iter().flat_map(Node::iter)),
            Node::Repeat { node, min, max } => {
                Box::new((*min..=*max).flat_map(move |times| repeat_iter(node, times)))
            }
        }
    }
}

fn class_range_len(start: char, end: char) -> u128 {
    let (start, end) = (u32::from(start), u32::from(end));
    if end < start {
        return 0;
    }
    let mut len = u128::from(end - start + 1);
    // Surrogates are not chars and are skipped by char ranges
    let overlap_start = start.max(0xD800);
    let overlap_end = end.min(0xDFFF);
    if overlap_start <= overlap_end {
        len -= u128::from(overlap_end - overlap_start + 1);
    }
    len
}

fn repeat_count(per_item: u128, min: u32, max: u32) -> u128 {
    match per_item {
        0 => u128::from(min == 0),
        1 => u128::from(max.saturating_sub(min)) + 1,
        _ => {
            let mut total: u128 = 0;
            for times in min..=max {
                total = total.saturating_add(per_item.saturating_pow(times));
                if total == u128::MAX {
                    break;
                }
            }
            total
        }
    }
}

fn concat_iter(nodes: &[Node]) -> Box<dyn Iterator<Item = String> + Send + '_> {
    match nodes.split_first() {
        None => Box::new(std::iter::once(String::new())),
        Some((first, rest)) => Box::new(first.iter().flat_map(move |head| {
            concat_iter(rest).map(move |tail| {
                let mut joined = head.clone();
                joined.push_str(&tail);
                joined
            })
        })),
    }
}

fn repeat_iter(node: &Node, times: u32) -> Box<dyn Iterator<Item = String> + Send + '_> {
    if times == 0 {
        return Box::new(std::iter::once(String::new()));
    }
    Box::new(node.iter().flat_map(move |head| {
        repeat_iter(node, times - 1).map(move |tail| {
            let mut joined = head.clone();
            joined.push_str(&tail);
            joined
        })
    }))
}

/// Every string a scan pattern can generate, enumerated on demand.
#[derive(Debug, Clone)]
pub struct Expansion {
    root: Node,
}

impl Expansion {
    /// Parse a regular expression into an expansion.
    pub fn from_regex(regex: &str) -> Result<Self, DomainScanError> {
        let hir = regex_syntax::Parser::new().parse(regex)?;
        Ok(Self {
            root: Node::from_hir(&hir),
        })
    }

    /// Convert and parse a scan pattern.
    pub fn from_pattern(pattern: &str, is_regex: bool) -> Result<Self, DomainScanError> {
        Self::from_regex(&convert_pattern_to_regex(pattern, is_regex))
    }

    /// Total number of generated strings (duplicates included).
    pub fn count(&self) -> u128 {
        self.root.count()
    }

    /// Lazily enumerate the generated strings.
    pub fn iter(&self) -> impl Iterator<Item = String> + Send + '_ {
        self.root.iter()
    }
}

/// Check that a pattern is safe to scan and return its expansion count.
///
/// The pattern is rejected when it cannot be parsed, when it expands to more
/// than [`MAX_EXPANSIONS`] names, or when any of the first
/// [`VALIDATION_SAMPLE`] names fails the domain-syntax predicate.
pub fn validate_pattern(pattern: &str, is_regex: bool) -> Result<u128, DomainScanError> {
    let expansion = Expansion::from_pattern(pattern, is_regex)
        .map_err(|_| DomainScanError::invalid_pattern("pattern", "Invalid pattern"))?;

    let count = expansion.count();
    if count > MAX_EXPANSIONS {
        return Err(DomainScanError::invalid_pattern(
            "pattern",
            "This pattern makes more than a million domain names",
        ));
    }

    if let Some(domain) = expansion
        .iter()
        .take(VALIDATION_SAMPLE)
        .find(|domain| !is_valid_domain(domain))
    {
        return Err(DomainScanError::invalid_pattern(
            "pattern",
            format!("This pattern makes invalid domain names: {}", domain),
        ));
    }

    Ok(count)
}
