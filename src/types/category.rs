//! Category tree used to group pull requests into changelog sections

use super::pull_request::PullRequest;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Errors raised when a category tree is malformed or addressed incorrectly
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ForestError {
    #[error("No catch-all category configured (exactly one category needs order = \"last\")")]
    MissingCatchAll,
    #[error("Multiple catch-all categories configured: {0}")]
    MultipleCatchAll(String),
    #[error("Catch-all category '{0}' must not declare labels, prefixes or sub-categories")]
    CatchAllNotEmpty(String),
    #[error("Sub-category '{0}' cannot be the catch-all")]
    NestedCatchAll(String),
    #[error("Category '{0}' is nested too deeply (at most one level of sub-categories)")]
    TooDeep(String),
    #[error("Duplicate category name '{0}' among siblings")]
    DuplicateName(String),
    #[error("Duplicate partial key '{0}' among siblings")]
    DuplicatePartial(String),
    #[error("Unknown category path '{0}'")]
    UnknownPath(String),
}

/// Sort position of a category in the rendered changelog
///
/// `Last` is reserved for the catch-all and sorts after every rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderRepr", into = "OrderRepr")]
pub enum DisplayOrder {
    Rank(i64),
    Last,
}

impl Default for DisplayOrder {
    fn default() -> Self {
        Self::Rank(0)
    }
}

impl Ord for DisplayOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Rank(a), Self::Rank(b)) => a.cmp(b),
            (Self::Rank(_), Self::Last) => Ordering::Less,
            (Self::Last, Self::Rank(_)) => Ordering::Greater,
            (Self::Last, Self::Last) => Ordering::Equal,
        }
    }
}

impl PartialOrd for DisplayOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OrderRepr {
    Number(i64),
    Word(String),
}

impl TryFrom<OrderRepr> for DisplayOrder {
    type Error = String;

    fn try_from(value: OrderRepr) -> Result<Self, Self::Error> {
        match value {
            OrderRepr::Number(rank) => Ok(Self::Rank(rank)),
            OrderRepr::Word(word) if word.eq_ignore_ascii_case("last") => Ok(Self::Last),
            OrderRepr::Word(word) => Err(format!(
                "Invalid order '{word}', expected an integer or \"last\""
            )),
        }
    }
}

impl From<DisplayOrder> for OrderRepr {
    fn from(order: DisplayOrder) -> Self {
        match order {
            DisplayOrder::Rank(rank) => Self::Number(rank),
            DisplayOrder::Last => Self::Word("last".to_string()),
        }
    }
}

/// A changelog section, optionally holding one level of sub-categories
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Heading shown in the changelog
    pub name: String,
    /// Owning team, shown in the chat summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Any of these labels files a PR here
    #[serde(default)]
    pub labels: Vec<String>,
    /// A `[prefix]` at the start of the title or release note files a PR here
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Key of the hand-written partial and segment of the category path
    pub partial: String,
    #[serde(default)]
    pub order: DisplayOrder,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Category>,
    #[serde(skip)]
    pub pull_requests: Vec<PullRequest>,
}

impl Category {
    pub fn new(name: &str, partial: &str) -> Self {
        Self {
            name: name.to_string(),
            team: None,
            labels: Vec::new(),
            prefixes: Vec::new(),
            partial: partial.to_string(),
            order: DisplayOrder::default(),
            children: Vec::new(),
            pull_requests: Vec::new(),
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.prefixes = prefixes.iter().map(ToString::to_string).collect();
        self
    }

    pub fn with_order(mut self, order: DisplayOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_team(mut self, team: &str) -> Self {
        self.team = Some(team.to_string());
        self
    }

    pub fn with_children(mut self, children: Vec<Category>) -> Self {
        self.children = children;
        self
    }

    pub fn is_catch_all(&self) -> bool {
        self.order == DisplayOrder::Last
    }

    /// Number of PRs filed here, including sub-categories
    pub fn total_pull_requests(&self) -> usize {
        self.pull_requests.len()
            + self
                .children
                .iter()
                .map(Category::total_pull_requests)
                .sum::<usize>()
    }
}

/// Dotted address of a category, built from partial keys (`vscode.browser`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    pub fn top(partial: &str) -> Self {
        Self(vec![partial.to_string()])
    }

    pub fn child(&self, partial: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(partial.to_string());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True when `other` extends this path by at least one segment
    pub fn is_strict_prefix_of(&self, other: &Self) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for CategoryPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split('.').map(|seg| seg.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(format!("Invalid category path '{s}'"));
        }
        Ok(Self(segments))
    }
}

impl Serialize for CategoryPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CategoryPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A decision to file one PR under one category path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub path: CategoryPath,
    pub pull_request: PullRequest,
}

/// The validated top-level category list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryForest {
    categories: Vec<Category>,
}

impl CategoryForest {
    /// Validate a category list and wrap it in a forest
    pub fn new(categories: Vec<Category>) -> Result<Self, ForestError> {
        validate_siblings(&categories)?;

        let catch_alls: Vec<&Category> = categories.iter().filter(|c| c.is_catch_all()).collect();
        match catch_alls.as_slice() {
            [] => return Err(ForestError::MissingCatchAll),
            [catch_all] => {
                if !catch_all.labels.is_empty()
                    || !catch_all.prefixes.is_empty()
                    || !catch_all.children.is_empty()
                {
                    return Err(ForestError::CatchAllNotEmpty(catch_all.name.clone()));
                }
            }
            many => {
                let names: Vec<&str> = many.iter().map(|c| c.name.as_str()).collect();
                return Err(ForestError::MultipleCatchAll(names.join(", ")));
            }
        }

        for category in &categories {
            validate_siblings(&category.children)?;
            for child in &category.children {
                if child.is_catch_all() {
                    return Err(ForestError::NestedCatchAll(child.name.clone()));
                }
                if !child.children.is_empty() {
                    return Err(ForestError::TooDeep(child.name.clone()));
                }
            }
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Path of the designated catch-all category
    pub fn catch_all_path(&self) -> CategoryPath {
        self.categories
            .iter()
            .find(|c| c.is_catch_all())
            .map(|c| CategoryPath::top(&c.partial))
            .unwrap_or_else(|| CategoryPath(Vec::new()))
    }

    pub fn get(&self, path: &CategoryPath) -> Option<&Category> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.categories.iter().find(|c| &c.partial == first)?;
        for segment in rest {
            node = node.children.iter().find(|c| &c.partial == segment)?;
        }
        Some(node)
    }

    fn get_mut(&mut self, path: &CategoryPath) -> Option<&mut Category> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.categories.iter_mut().find(|c| &c.partial == first)?;
        for segment in rest {
            node = node.children.iter_mut().find(|c| &c.partial == segment)?;
        }
        Some(node)
    }

    pub fn contains(&self, path: &CategoryPath) -> bool {
        self.get(path).is_some()
    }

    /// Find a category by its exact display name, searching sub-categories too
    pub fn resolve_name(&self, name: &str) -> Option<CategoryPath> {
        for category in &self.categories {
            let path = CategoryPath::top(&category.partial);
            if category.name == name {
                return Some(path);
            }
            if let Some(child) = category.children.iter().find(|c| c.name == name) {
                return Some(path.child(&child.partial));
            }
        }
        None
    }

    /// File every assignment, in order, returning the filled forest
    pub fn file(mut self, assignments: Vec<Assignment>) -> Result<Self, ForestError> {
        for Assignment { path, pull_request } in assignments {
            let node = self
                .get_mut(&path)
                .ok_or_else(|| ForestError::UnknownPath(path.to_string()))?;
            node.pull_requests.push(pull_request);
        }
        Ok(self)
    }

    pub fn total_pull_requests(&self) -> usize {
        self.categories
            .iter()
            .map(Category::total_pull_requests)
            .sum()
    }

    /// Every label declared anywhere in the tree
    pub fn all_labels(&self) -> Vec<&str> {
        let mut labels = Vec::new();
        for category in &self.categories {
            labels.extend(category.labels.iter().map(String::as_str));
            for child in &category.children {
                labels.extend(child.labels.iter().map(String::as_str));
            }
        }
        labels
    }
}

fn validate_siblings(categories: &[Category]) -> Result<(), ForestError> {
    let mut names = HashSet::new();
    let mut partials = HashSet::new();
    for category in categories {
        if !names.insert(category.name.as_str()) {
            return Err(ForestError::DuplicateName(category.name.clone()));
        }
        if !partials.insert(category.partial.as_str()) {
            return Err(ForestError::DuplicatePartial(category.partial.clone()));
        }
    }
    Ok(())
}
