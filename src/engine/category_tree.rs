//! Category hierarchy and checkbox synchronization.
//!
//! The tree is built once from a declarative list of [`CategoryDecl`]s and
//! keeps every category in an arena (`Vec`) with an id index. Two levels are
//! supported: top-level categories and their sub-categories.
//!
//! Consistency rules:
//! - A category with children is checked iff all its children are checked.
//! - Toggling a category sets every descendant to the same value.
//! - Toggling a sub-category re-derives its direct parent.

use crate::engine::errors::ConsentError;
use crate::engine::record::{ConsentRecord, SEPARATOR};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declaration of a single category, as found in the consent box markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDecl {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Initial checkbox state.
    #[serde(default)]
    pub checked: bool,
}

impl CategoryDecl {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), parent: None, checked: false }
    }

    pub fn child_of(id: impl Into<String>, parent: impl Into<String>) -> Self {
        Self { id: id.into(), parent: Some(parent.into()), checked: false }
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    id: String,
    parent: Option<usize>,
    children: Vec<usize>,
    checked: bool,
}

impl Category {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    nodes: Vec<Category>,
    index: HashMap<String, usize>,
}

impl CategoryTree {
    /// Builds the tree from declarations in markup order.
    ///
    /// A parent must be declared before its sub-categories and must itself be
    /// a top-level category.
    pub fn build(decls: impl IntoIterator<Item = CategoryDecl>) -> Result<Self, ConsentError> {
        let mut tree = CategoryTree::default();

        for decl in decls {
            if decl.id.is_empty() || decl.id.contains(SEPARATOR) {
                return Err(ConsentError::InvalidCategory(format!(
                    "identifier {:?} must be non-empty and must not contain {:?}",
                    decl.id, SEPARATOR
                )));
            }
            if tree.index.contains_key(&decl.id) {
                return Err(ConsentError::InvalidCategory(format!("duplicate identifier {:?}", decl.id)));
            }

            let parent = match &decl.parent {
                None => None,
                Some(parent_id) => {
                    let &idx = tree.index.get(parent_id).ok_or_else(|| {
                        ConsentError::InvalidCategory(format!(
                            "parent {:?} of {:?} is not declared before it",
                            parent_id, decl.id
                        ))
                    })?;
                    if !tree.nodes[idx].is_top_level() {
                        return Err(ConsentError::InvalidCategory(format!(
                            "{:?} nests deeper than category/sub-category",
                            decl.id
                        )));
                    }
                    Some(idx)
                }
            };

            let idx = tree.nodes.len();
            tree.nodes.push(Category {
                id: decl.id.clone(),
                parent,
                children: Vec::new(),
                checked: decl.checked,
            });
            tree.index.insert(decl.id, idx);
            if let Some(p) = parent {
                tree.nodes[p].children.push(idx);
            }
        }

        tree.derive_all_parents();
        Ok(tree)
    }

    /// Builds the tree from a JSON array of declarations.
    pub fn from_json(json: &str) -> Result<Self, ConsentError> {
        let decls: Vec<CategoryDecl> =
            serde_json::from_str(json).map_err(|e| ConsentError::InvalidCategory(e.to_string()))?;
        Self::build(decls)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Categories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.nodes.iter()
    }

    pub fn is_checked(&self, id: &str) -> Result<bool, ConsentError> {
        self.lookup(id).map(|idx| self.nodes[idx].checked)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        let category = self.get(id)?;
        category.parent.map(|p| self.nodes[p].id.as_str())
    }

    pub fn children_of(&self, id: &str) -> Vec<&str> {
        self.get(id)
            .map(|c| c.children.iter().map(|&i| self.nodes[i].id.as_str()).collect())
            .unwrap_or_default()
    }

    /// Returns the top-level category owning `id` (itself when top-level).
    pub fn top_level_of(&self, id: &str) -> Option<&str> {
        let mut idx = *self.index.get(id)?;
        while let Some(parent) = self.nodes[idx].parent {
            idx = parent;
        }
        Some(self.nodes[idx].id.as_str())
    }

    /// Sets `id` to `checked`, propagating down to every descendant and
    /// re-deriving the direct parent.
    pub fn toggle(&mut self, id: &str, checked: bool) -> Result<(), ConsentError> {
        let idx = self.lookup(id)?;

        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            self.nodes[i].checked = checked;
            stack.extend(self.nodes[i].children.iter().copied());
        }

        if let Some(parent) = self.nodes[idx].parent {
            self.derive(parent);
        }

        log::debug!("Cookiebox » toggled {:?} to {}", id, checked);
        Ok(())
    }

    pub fn set_all(&mut self, checked: bool) {
        for node in &mut self.nodes {
            node.checked = checked;
        }
    }

    /// Identifiers of all checked categories in declaration order.
    pub fn current_consent_set(&self) -> ConsentRecord {
        self.nodes
            .iter()
            .filter(|n| n.checked)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Checks every declared identifier in `record`, then re-derives parents.
    /// Returns the identifiers of `record` that are not declared.
    pub fn restore(&mut self, record: &ConsentRecord) -> Vec<String> {
        let mut unknown = Vec::new();
        for id in record.iter() {
            match self.index.get(id) {
                Some(&idx) => self.nodes[idx].checked = true,
                None => unknown.push(id.to_string()),
            }
        }
        self.derive_all_parents();
        unknown
    }

    fn lookup(&self, id: &str) -> Result<usize, ConsentError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ConsentError::NotFound(id.to_string()))
    }

    fn derive(&mut self, idx: usize) {
        let all_checked = self.nodes[idx].children.iter().all(|&c| self.nodes[c].checked);
        self.nodes[idx].checked = all_checked;
    }

    fn derive_all_parents(&mut self) {
        for idx in 0..self.nodes.len() {
            if self.nodes[idx].has_children() {
                self.derive(idx);
            }
        }
    }
}
