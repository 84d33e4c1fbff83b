use std::collections::HashSet;

use uuid::Uuid;

use crate::{api::PostId, Error, PostTree};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CollapseGroupId(pub Uuid);

/// A range of first-level posts that can be hidden at once, boundaries
/// included, along with their subtrees
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollapseGroup {
    pub id: CollapseGroupId,
    pub start: PostId,
    pub end: PostId,
    pub active: bool,
}

impl CollapseGroup {
    fn covers(&self, tree: &PostTree, index: usize) -> bool {
        match (
            tree.first_level_index(&self.start),
            tree.first_level_index(&self.end),
        ) {
            (Some(s), Some(e)) => s.min(e) <= index && index <= s.max(e),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CollapseManager {
    groups: Vec<CollapseGroup>,

    /// Posts whose own subtree the user folded
    collapsed_indents: HashSet<PostId>,
}

impl CollapseManager {
    pub fn new() -> CollapseManager {
        CollapseManager::default()
    }

    /// Registers an inactive group over the first-level posts from `start`
    /// to `end`
    pub fn add_collapse_group(
        &mut self,
        tree: &PostTree,
        start: PostId,
        end: PostId,
    ) -> Result<CollapseGroupId, Error> {
        for p in [start, end] {
            if !tree.is_first_level(&p) {
                return Err(Error::NotFirstLevel(p));
            }
        }
        let id = CollapseGroupId(Uuid::new_v4());
        tracing::debug!(group = ?id, ?start, ?end, "adding collapse group");
        self.groups.push(CollapseGroup {
            id,
            start,
            end,
            active: false,
        });
        Ok(id)
    }

    fn set_active(&mut self, id: CollapseGroupId, active: bool) -> bool {
        match self.groups.iter_mut().find(|g| g.id == id) {
            Some(g) => {
                g.active = active;
                true
            }
            None => {
                tracing::warn!(group = ?id, "toggling a collapse group that does not exist");
                false
            }
        }
    }

    /// Returns false if no such group is registered
    pub fn on_collapse_level(&mut self, id: CollapseGroupId) -> bool {
        self.set_active(id, true)
    }

    pub fn on_uncollapse_level(&mut self, id: CollapseGroupId) -> bool {
        self.set_active(id, false)
    }

    pub fn group(&self, id: CollapseGroupId) -> Option<&CollapseGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn groups(&self) -> &[CollapseGroup] {
        &self.groups
    }

    /// The active group hiding this first-level post, if any
    pub fn collapsing_group(&self, post: &PostId, tree: &PostTree) -> Option<&CollapseGroup> {
        let index = tree.first_level_index(post)?;
        self.groups
            .iter()
            .find(|g| g.active && g.covers(tree, index))
    }

    pub fn is_collapsed(&self, post: &PostId, tree: &PostTree) -> bool {
        self.collapsing_group(post, tree).is_some()
    }

    pub fn collapse_indent(&mut self, post: PostId) {
        self.collapsed_indents.insert(post);
    }

    pub fn uncollapse_indent(&mut self, post: &PostId) {
        self.collapsed_indents.remove(post);
    }

    pub fn is_indent_collapsed(&self, post: &PostId) -> bool {
        self.collapsed_indents.contains(post)
    }

    /// Whether a post is out of sight, either because its first-level
    /// ancestor is in an active group or because one of its ancestors was
    /// folded
    pub fn is_hidden(&self, post: &PostId, tree: &PostTree) -> bool {
        let by_group = tree
            .first_level_parent(post)
            .map(|p| self.is_collapsed(&p, tree))
            .unwrap_or(false);
        by_group
            || tree
                .ancestors(post)
                .any(|a| self.collapsed_indents.contains(&a.post.post_id))
    }

    /// Drops all groups, folded indents are kept
    pub fn reset(&mut self) {
        if !self.groups.is_empty() {
            tracing::debug!(num_groups = self.groups.len(), "dropping collapse groups");
        }
        self.groups.clear();
    }
}
