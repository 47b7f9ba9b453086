//! Key and value search returning JSON Pointers

use crate::pointer::join;
use crate::query::{array_placeholder, ellipsize, object_placeholder, scalar_text};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// What a search compares the query against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Object member names
    Key,
    /// Scalar leaf values
    #[default]
    Value,
}

/// Search parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Text to look for; empty matches everything
    pub query: String,
    /// Keys or values
    #[serde(rename = "type")]
    pub search_type: SearchType,
    /// Require every query word instead of the whole query
    pub fuzzy_match: bool,
    /// Maximum number of matches
    pub limit: usize,
    /// Maximum characters of a preview
    pub max_value_length: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            search_type: SearchType::Value,
            fuzzy_match: false,
            limit: 20,
            max_value_length: 120,
        }
    }
}

impl SearchOptions {
    /// Value search for `query` with default limits
    pub fn values(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Key search for `query` with default limits
    pub fn keys(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            search_type: SearchType::Key,
            ..Self::default()
        }
    }

    /// Switch to word-wise matching
    pub fn fuzzy(mut self) -> Self {
        self.fuzzy_match = true;
        self
    }

    /// Set the match limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// A single search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SearchMatch {
    /// Member name matched
    Key {
        /// Pointer to the member
        pointer: String,
        /// The matching key
        key: String,
        /// Short rendering of the member's value
        value_preview: String,
    },
    /// Scalar value matched
    Value {
        /// Pointer to the leaf
        pointer: String,
        /// The matching text, bounded
        matched_value: String,
    },
}

impl SearchMatch {
    /// Pointer of the hit
    pub fn pointer(&self) -> &str {
        match self {
            SearchMatch::Key { pointer, .. } | SearchMatch::Value { pointer, .. } => pointer,
        }
    }
}

/// Result of [`search`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    /// Query as supplied
    pub query: String,
    /// Search mode
    #[serde(rename = "type")]
    pub search_type: SearchType,
    /// Whether word-wise matching was used
    pub fuzzy: bool,
    /// Hits in document order
    pub matches: Vec<SearchMatch>,
    /// Number of hits
    pub count: usize,
    /// Traversal stopped at the limit before visiting every node
    pub truncated: bool,
}

/// Depth-first search of `doc` for keys or scalar values matching the query.
///
/// ```
/// use quill_document::{search, SearchOptions};
/// use serde_json::json;
///
/// let doc = json!({"clients": [{"name": "Client X Corp"}]});
/// let outcome = search(&doc, &SearchOptions::values("client x").fuzzy());
/// assert_eq!(outcome.count, 1);
/// assert_eq!(outcome.matches[0].pointer(), "/clients/0/name");
/// ```
pub fn search(doc: &Value, options: &SearchOptions) -> SearchOutcome {
    let mut searcher = Searcher::new(options);
    let truncated = searcher.walk(doc);
    let matches = searcher.matches;

    SearchOutcome {
        query: options.query.clone(),
        search_type: options.search_type,
        fuzzy: options.fuzzy_match,
        count: matches.len(),
        matches,
        truncated,
    }
}

/// Children still to visit in one compound node
struct Frame<'v> {
    path: String,
    children: Children<'v>,
}

enum Children<'v> {
    Object(serde_json::map::Iter<'v>),
    Array(std::iter::Enumerate<std::slice::Iter<'v, Value>>),
}

impl<'v> Frame<'v> {
    fn new(node: &'v Value, path: String) -> Option<Self> {
        let children = match node {
            Value::Object(map) => Children::Object(map.iter()),
            Value::Array(items) => Children::Array(items.iter().enumerate()),
            _ => return None,
        };
        Some(Self { path, children })
    }

    /// Next child as (member name, pointer, value).
    fn next(&mut self) -> Option<(Option<&'v str>, String, &'v Value)> {
        match &mut self.children {
            Children::Object(iter) => iter
                .next()
                .map(|(key, value)| (Some(key.as_str()), join(&self.path, key), value)),
            Children::Array(iter) => iter
                .next()
                .map(|(idx, item)| (None, format!("{}/{}", self.path, idx), item)),
        }
    }
}

struct Searcher<'a> {
    options: &'a SearchOptions,
    query: String,
    words: Vec<String>,
    matches: Vec<SearchMatch>,
    // compound nodes already entered, keyed by pointer
    visited: HashSet<String>,
}

impl<'a> Searcher<'a> {
    fn new(options: &'a SearchOptions) -> Self {
        let query = options.query.to_lowercase();
        let words = query.split_whitespace().map(str::to_string).collect();
        Self {
            options,
            query,
            words,
            matches: Vec::new(),
            visited: HashSet::new(),
        }
    }

    fn full(&self) -> bool {
        self.matches.len() >= self.options.limit
    }

    /// Pre-order traversal on an explicit stack, so nesting depth is bounded
    /// by the heap rather than the call stack.
    ///
    /// Returns true when the limit cut the traversal short.
    fn walk<'v>(&mut self, root: &'v Value) -> bool {
        if self.full() {
            return true;
        }
        let mut stack: Vec<Frame<'v>> = Vec::new();
        self.enter(root, String::new(), &mut stack);

        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.next(),
                None => return false,
            };
            let Some((key, pointer, value)) = next else {
                stack.pop();
                continue;
            };
            if self.full() {
                return true;
            }

            match (self.options.search_type, key) {
                (SearchType::Key, Some(key)) => self.match_key(key, value, &pointer),
                (SearchType::Key, None) => {}
                (SearchType::Value, _) => self.match_leaf(value, &pointer),
            }

            if is_compound(value) {
                if self.full() {
                    return true;
                }
                self.enter(value, pointer, &mut stack);
            }
        }
    }

    fn enter<'v>(&mut self, node: &'v Value, path: String, stack: &mut Vec<Frame<'v>>) {
        if !self.visited.insert(path.clone()) {
            return;
        }
        if let Some(frame) = Frame::new(node, path) {
            stack.push(frame);
        }
    }

    fn match_key(&mut self, key: &str, value: &Value, pointer: &str) {
        if self.is_match(key) {
            let value_preview = self.preview(value);
            self.matches.push(SearchMatch::Key {
                pointer: pointer.to_string(),
                key: key.to_string(),
                value_preview,
            });
        }
    }

    fn match_leaf(&mut self, value: &Value, pointer: &str) {
        if is_compound(value) {
            return;
        }
        let text = scalar_text(value);
        if self.is_match(&text) {
            self.matches.push(SearchMatch::Value {
                pointer: pointer.to_string(),
                matched_value: text.chars().take(self.options.max_value_length).collect(),
            });
        }
    }

    fn is_match(&self, text: &str) -> bool {
        if self.query.is_empty() {
            return true;
        }
        let text = text.to_lowercase();
        if self.options.fuzzy_match {
            self.words.iter().all(|w| text.contains(w.as_str()))
        } else {
            text.contains(&self.query)
        }
    }

    fn preview(&self, value: &Value) -> String {
        match value {
            Value::Object(map) => object_placeholder(map.len()),
            Value::Array(items) => array_placeholder(items.len()),
            scalar => ellipsize(&scalar_text(scalar), self.options.max_value_length),
        }
    }
}

fn is_compound(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "clients": [
                {"name": "Client X Corp", "city": "Lisbon"},
                {"name": "Other Client", "city": "Porto"}
            ],
            "client_count": 2,
            "notes": {"client": "x marks the spot"}
        })
    }

    #[test]
    fn test_fuzzy_value_match_is_word_wise() {
        let outcome = search(&doc(), &SearchOptions::values("client x").fuzzy());
        let pointers: Vec<_> = outcome.matches.iter().map(|m| m.pointer()).collect();
        assert_eq!(pointers, vec!["/clients/0/name"]);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_exact_value_match_is_substring() {
        let outcome = search(&doc(), &SearchOptions::values("CLIENT"));
        assert_eq!(outcome.count, 2);
        assert_eq!(
            outcome.matches[1],
            SearchMatch::Value {
                pointer: "/clients/1/name".to_string(),
                matched_value: "Other Client".to_string(),
            }
        );
    }

    #[test]
    fn test_value_mode_matches_numbers_not_compounds() {
        let outcome = search(&doc(), &SearchOptions::values("2"));
        let pointers: Vec<_> = outcome.matches.iter().map(|m| m.pointer()).collect();
        assert_eq!(pointers, vec!["/client_count"]);
    }

    #[test]
    fn test_key_mode_previews() {
        let outcome = search(&doc(), &SearchOptions::keys("client"));
        assert_eq!(
            outcome.matches[0],
            SearchMatch::Key {
                pointer: "/clients".to_string(),
                key: "clients".to_string(),
                value_preview: "[...] (2 items)".to_string(),
            }
        );
        assert_eq!(outcome.matches[1].pointer(), "/client_count");
        assert_eq!(outcome.matches[2].pointer(), "/notes/client");
        assert_eq!(outcome.count, 3);
    }

    #[test]
    fn test_limit_truncates() {
        let outcome = search(&doc(), &SearchOptions::values("").with_limit(2));
        assert_eq!(outcome.count, 2);
        assert!(outcome.truncated);
    }

    #[test]
    fn test_descendants_before_later_siblings() {
        let doc = json!({"a": {"b": "x", "c": ["x"]}, "d": "x"});
        let outcome = search(&doc, &SearchOptions::values("x"));
        let pointers: Vec<_> = outcome.matches.iter().map(|m| m.pointer()).collect();
        assert_eq!(pointers, vec!["/a/b", "/a/c/0", "/d"]);
    }

    #[test]
    fn test_deep_nesting() {
        let mut doc = json!("needle");
        for _ in 0..4_000 {
            doc = Value::Array(vec![doc]);
        }
        let outcome = search(&doc, &SearchOptions::values("needle"));
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.matches[0].pointer().len(), 2 * 4_000);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_escaped_keys_in_pointers() {
        let doc = json!({"a/b": {"c~d": "hit"}});
        let outcome = search(&doc, &SearchOptions::values("hit"));
        assert_eq!(outcome.matches[0].pointer(), "/a~1b/c~0d");
    }

    #[test]
    fn test_matched_value_is_bounded() {
        let doc = json!({"text": "needle ".repeat(100)});
        let mut options = SearchOptions::values("needle");
        options.max_value_length = 10;
        let outcome = search(&doc, &options);
        match &outcome.matches[0] {
            SearchMatch::Value { matched_value, .. } => assert_eq!(matched_value.chars().count(), 10),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_outcome_shape() {
        let outcome = search(&doc(), &SearchOptions::values("lisbon"));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "query": "lisbon",
                "type": "value",
                "fuzzy": false,
                "matches": [{"pointer": "/clients/0/city", "matched_value": "Lisbon"}],
                "count": 1,
                "truncated": false
            })
        );
    }

    #[test]
    fn test_options_deserialize() {
        let options: SearchOptions =
            serde_json::from_value(json!({"query": "x", "type": "key", "fuzzy_match": true})).unwrap();
        assert_eq!(options.search_type, SearchType::Key);
        assert!(options.fuzzy_match);
        assert_eq!(options.limit, 20);
        assert_eq!(options.max_value_length, 120);
    }
}
