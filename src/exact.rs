//! Deterministic exact-match fast path.
//!
//! The probabilistic classifiers are overlaid by a matcher that compiles
//! intent lines into literal patterns and returns guaranteed hits at
//! confidence 1.0. Only the call contract, the [`ExactMatcher`] trait,
//! matters to the core, and custom grammar backends can be plugged
//! into the container. The default [`ExactPatternMatcher`] compiles each
//! line to an anchored regex supporting `(a|b)` alternations, `(a|)`
//! optionals, and `{entity}` captures; registered entity values refine a
//! capture into an alternation over those values.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;

/// One fast-path hit: always confidence 1.0.
#[derive(Debug, Clone)]
pub struct ExactMatch {
    /// Name of the matched intent.
    pub name: String,
    /// Entity name → extracted text.
    pub entities: HashMap<String, String>,
}

/// Call contract between the core and the deterministic fast path.
pub trait ExactMatcher: Send + Sync {
    /// Register (or replace) an intent's literal pattern lines.
    fn add_intent(&mut self, name: &str, lines: &[String]);

    /// Drop an intent from exact matching.
    fn remove_intent(&mut self, name: &str);

    /// Register (or replace) an entity's allowed values; `{name}`
    /// captures in intent lines then only match those values.
    fn add_entity(&mut self, name: &str, lines: &[String]);

    /// Drop an entity; captures referencing it fall back to wildcards.
    fn remove_entity(&mut self, name: &str);

    /// All intents matching the query exactly.
    fn matches(&self, query: &str) -> Vec<ExactMatch>;
}

struct Pattern {
    regex: Regex,
    entity_names: Vec<String>,
}

type LineMap = HashMap<String, Vec<String>, ahash::RandomState>;

/// Regex-backed [`ExactMatcher`] implementation.
///
/// Patterns are compiled lazily on first match after a mutation.
#[derive(Default)]
pub struct ExactPatternMatcher {
    intents: LineMap,
    entities: LineMap,
    compiled: Mutex<Option<Vec<(String, Vec<Pattern>)>>>,
}

impl ExactPatternMatcher {
    /// Create an empty matcher.
    pub fn new() -> Self {
        ExactPatternMatcher::default()
    }

    fn invalidate(&mut self) {
        *self.compiled.lock() = None;
    }

    fn compile(&self) -> Vec<(String, Vec<Pattern>)> {
        let mut compiled: Vec<(String, Vec<Pattern>)> = self
            .intents
            .iter()
            .map(|(name, lines)| {
                let patterns = lines
                    .iter()
                    .filter_map(|line| compile_line(line, &self.entities))
                    .collect();
                (name.clone(), patterns)
            })
            .collect();
        compiled.sort_by(|a, b| a.0.cmp(&b.0));
        compiled
    }
}

impl ExactMatcher for ExactPatternMatcher {
    fn add_intent(&mut self, name: &str, lines: &[String]) {
        self.intents.insert(name.to_string(), lines.to_vec());
        self.invalidate();
    }

    fn remove_intent(&mut self, name: &str) {
        self.intents.remove(name);
        self.invalidate();
    }

    fn add_entity(&mut self, name: &str, lines: &[String]) {
        self.entities.insert(name.to_string(), lines.to_vec());
        self.invalidate();
    }

    fn remove_entity(&mut self, name: &str) {
        self.entities.remove(name);
        self.invalidate();
    }

    fn matches(&self, query: &str) -> Vec<ExactMatch> {
        let mut guard = self.compiled.lock();
        let compiled = guard.get_or_insert_with(|| self.compile());

        let query = query.to_lowercase();
        let mut hits = Vec::new();
        for (name, patterns) in compiled.iter() {
            for pattern in patterns {
                if let Some(captures) = pattern.regex.captures(&query) {
                    let mut entities = HashMap::new();
                    for (i, entity) in pattern.entity_names.iter().enumerate() {
                        if let Some(group) = captures.get(i + 1) {
                            let text = group.as_str().trim();
                            if !text.is_empty() {
                                entities.insert(entity.clone(), text.to_string());
                            }
                        }
                    }
                    hits.push(ExactMatch {
                        name: name.clone(),
                        entities,
                    });
                    break;
                }
            }
        }
        hits
    }
}

/// Compile one pattern line to an anchored regex. Returns `None` for
/// blank or malformed lines.
fn compile_line(line: &str, entities: &LineMap) -> Option<Pattern> {
    let line = line.trim().to_lowercase();
    if line.is_empty() {
        return None;
    }

    let mut body = String::new();
    let mut literal = String::new();
    let mut entity_names = Vec::new();

    let flush = |body: &mut String, literal: &mut String| {
        if !literal.is_empty() {
            body.push_str(&regex::escape(literal));
            literal.clear();
        }
    };

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' => {
                flush(&mut body, &mut literal);
                body.push_str("(?:");
            }
            ')' => {
                flush(&mut body, &mut literal);
                body.push(')');
            }
            '|' => {
                flush(&mut body, &mut literal);
                body.push('|');
            }
            '{' => {
                flush(&mut body, &mut literal);
                let mut name = String::new();
                for inner in chars.by_ref() {
                    if inner == '}' {
                        break;
                    }
                    name.push(inner);
                }
                body.push_str(&entity_fragment(&name, entities));
                entity_names.push(name);
            }
            c if c.is_whitespace() || matches!(c, '.' | '!' | '?') => {
                flush(&mut body, &mut literal);
                // Collapse separator runs into one lenient gap.
                if !body.ends_with("\\W*") {
                    body.push_str("\\W*");
                }
                while chars
                    .peek()
                    .is_some_and(|&n| n.is_whitespace() || matches!(n, '.' | '!' | '?'))
                {
                    chars.next();
                }
            }
            c => literal.push(c),
        }
    }
    flush(&mut body, &mut literal);

    let anchored = format!("^\\W*{body}\\W*$");
    let regex = Regex::new(&anchored).ok()?;
    Some(Pattern { regex, entity_names })
}

/// The capture group for an `{entity}` reference: an alternation over
/// the entity's registered values, or a lazy wildcard when unknown.
fn entity_fragment(name: &str, entities: &LineMap) -> String {
    match entities.get(name).filter(|values| !values.is_empty()) {
        Some(values) => {
            let alternatives: Vec<String> = values
                .iter()
                .filter(|v| !v.trim().is_empty())
                .map(|value| {
                    value
                        .trim()
                        .to_lowercase()
                        .split_whitespace()
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join("\\W+")
                })
                .collect();
            format!("((?:{}))", alternatives.join("|"))
        }
        None => "(.*?)".to_string(),
    }
}
