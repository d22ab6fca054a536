//! Completion trees
//!
//! A [`CompletionTree`] describes, level by level, which words may follow
//! the words already typed. Attaching a tree to an engine subscribes one
//! resolver per nesting level to the `$N` positional events.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::CompletionEvent;
use super::dispatcher::Dispatcher;
use super::reply::{Answer, Reply};
use super::request::ends_with_whitespace;
use crate::error::{Result, TreeError};

/// Nullary function computing candidates when its node is reached
pub type Producer = Rc<dyn Fn() -> Answer>;

/// Value stored under a tree key
#[derive(Clone)]
pub enum TreeNode {
    /// Nested level
    Subtree(CompletionTree),
    /// Fixed candidate words
    Leaf(Vec<String>),
    /// Candidates computed on demand
    Producer(Producer),
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeNode::Subtree(tree) => f.debug_tuple("Subtree").field(tree).finish(),
            TreeNode::Leaf(words) => f.debug_tuple("Leaf").field(words).finish(),
            TreeNode::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Ordered mapping from words to what may follow them
#[derive(Clone, Debug, Default)]
pub struct CompletionTree {
    entries: Vec<(String, TreeNode)>,
}

/// Where a path walk ended
enum Located<'a> {
    Tree(&'a CompletionTree),
    Node(&'a TreeNode),
}

impl CompletionTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a nested level under `key`
    pub fn subtree(mut self, key: impl Into<String>, tree: CompletionTree) -> Self {
        self.insert(key, TreeNode::Subtree(tree));
        self
    }

    /// Add fixed candidates under `key`
    pub fn leaf<I, S>(mut self, key: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(key, TreeNode::Leaf(words.into_iter().map(Into::into).collect()));
        self
    }

    /// Add computed candidates under `key`
    pub fn producer<F, A>(mut self, key: impl Into<String>, producer: F) -> Self
    where
        F: Fn() -> A + 'static,
        A: Into<Answer>,
    {
        self.insert(key, TreeNode::Producer(Rc::new(move || producer().into())));
        self
    }

    /// Insert or replace the node under `key`, keeping the key's original position
    pub fn insert(&mut self, key: impl Into<String>, node: TreeNode) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = node,
            None => self.entries.push((key, node)),
        }
    }

    /// Look up the node under `key`
    pub fn get(&self, key: &str) -> Option<&TreeNode> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, node)| node)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| key.clone()).collect()
    }

    /// Number of keys at this level
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this level has no keys
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest chain of nested mappings
    ///
    /// Leaves and producers do not add depth. An empty tree has depth 0;
    /// a non-empty one has depth 1 plus the depth of its deepest subtree,
    /// where an empty subtree still counts as one level.
    pub fn depth(&self) -> usize {
        if self.is_empty() { 0 } else { self.nesting() }
    }

    fn nesting(&self) -> usize {
        1 + self
            .entries
            .iter()
            .filter_map(|(_, node)| match node {
                TreeNode::Subtree(tree) => Some(tree.nesting()),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Compute the answer for a completion request
    ///
    /// The first fragment always completes against the top-level keys.
    /// Deeper fragments walk the completed words of `line` (the program name
    /// and any partially typed last word excluded) and answer with what the
    /// walk reached.
    ///
    /// # Arguments
    /// * `fragment` - 1-based index of the word being completed
    /// * `line` - Command line typed so far
    ///
    /// # Returns
    /// * `Answer` - Candidates, or [`Reply::Missing`] if the walk led nowhere
    pub fn resolve(&self, fragment: Option<i64>, line: &str) -> Answer {
        if fragment == Some(1) {
            return Reply::Candidates(self.keys()).into();
        }

        let path = completed_path(line);
        trace!(?path, "walking completion tree");
        match self.walk(&path) {
            Some(Located::Tree(tree)) => Reply::Candidates(tree.keys()).into(),
            Some(Located::Node(TreeNode::Leaf(words))) => Reply::Candidates(words.clone()).into(),
            Some(Located::Node(TreeNode::Producer(producer))) => producer(),
            Some(Located::Node(TreeNode::Subtree(tree))) => Reply::Candidates(tree.keys()).into(),
            None => Reply::Missing.into(),
        }
    }

    fn walk(&self, path: &[&str]) -> Option<Located<'_>> {
        let mut current = Located::Tree(self);
        for key in path {
            let Located::Tree(tree) = current else {
                return None;
            };
            current = match tree.get(key)? {
                TreeNode::Subtree(subtree) => Located::Tree(subtree),
                node => Located::Node(node),
            };
        }
        Some(current)
    }

    /// Build a tree from a TOML table
    ///
    /// Tables become nested levels and arrays of strings become leaves.
    pub fn from_toml(table: &toml::Table) -> Result<Self> {
        let mut tree = Self::new();
        for (key, value) in table {
            let node = match value {
                toml::Value::Table(nested) => TreeNode::Subtree(Self::from_toml(nested)?),
                toml::Value::Array(items) => TreeNode::Leaf(
                    items
                        .iter()
                        .map(|item| match item {
                            toml::Value::String(word) => Ok(word.clone()),
                            other => Err(TreeError::InvalidLeaf {
                                key: key.clone(),
                                found: other.type_str().to_string(),
                            }),
                        })
                        .collect::<std::result::Result<_, _>>()?,
                ),
                other => {
                    return Err(TreeError::InvalidNode {
                        key: key.clone(),
                        found: other.type_str().to_string(),
                    }
                    .into());
                }
            };
            tree.insert(key.clone(), node);
        }
        Ok(tree)
    }

    /// Build a tree from a JSON object
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(TreeError::InvalidRoot(json_kind(value).to_string()).into());
        };

        let mut tree = Self::new();
        for (key, value) in map {
            let node = match value {
                serde_json::Value::Object(_) => TreeNode::Subtree(Self::from_json(value)?),
                serde_json::Value::Array(items) => {
                    let mut words = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            serde_json::Value::String(word) => words.push(word.clone()),
                            other => {
                                return Err(TreeError::InvalidLeaf {
                                    key: key.clone(),
                                    found: json_kind(other).to_string(),
                                }
                                .into());
                            }
                        }
                    }
                    TreeNode::Leaf(words)
                }
                other => {
                    return Err(TreeError::InvalidNode {
                        key: key.clone(),
                        found: json_kind(other).to_string(),
                    }
                    .into());
                }
            };
            tree.insert(key.clone(), node);
        }
        Ok(tree)
    }

    /// Parse JSON text into a tree
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(&value)
    }

    fn write_outline(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        for (key, node) in &self.entries {
            let pad = "  ".repeat(indent);
            match node {
                TreeNode::Subtree(tree) => {
                    writeln!(f, "{pad}{key}")?;
                    tree.write_outline(f, indent + 1)?;
                }
                TreeNode::Leaf(words) => writeln!(f, "{pad}{key}: {}", words.join(", "))?,
                TreeNode::Producer(_) => writeln!(f, "{pad}{key}: <computed>")?,
            }
        }
        Ok(())
    }
}

/// Indented outline, one key per line
impl fmt::Display for CompletionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_outline(f, 0)
    }
}

/// Subscribe a resolver for every level of `tree`
///
/// # Returns
/// * `usize` - The tree depth, i.e. the number of subscriptions made
pub fn attach(tree: CompletionTree, dispatcher: &mut Dispatcher<CompletionEvent>) -> usize {
    let depth = tree.depth();
    let tree = Rc::new(tree);
    for level in 1..=depth {
        let tree = Rc::clone(&tree);
        dispatcher.subscribe(format!("${level}"), move |event: &CompletionEvent| {
            event.reply.reply(tree.resolve(event.fragment, &event.line));
        });
    }
    depth
}

/// Completed words after the program name
///
/// A last word not followed by whitespace is still being typed and is left out.
fn completed_path(line: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = line.split(char::is_whitespace).skip(1).collect();
    if !ends_with_whitespace(line) {
        tokens.pop();
    }
    tokens.retain(|token| !token.is_empty());
    tokens
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
