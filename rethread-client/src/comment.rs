use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::api::{Comment, CommentId};

/// Reply structure of the comments attached to a single post
#[derive(Clone, Debug, Default)]
pub struct CommentTree {
    comments: HashMap<CommentId, Arc<Comment>>,

    /// Comments that reply to the post itself, in source order
    roots: Vec<CommentId>,

    children: HashMap<CommentId, Vec<CommentId>>,
    parents: HashMap<CommentId, CommentId>,
    display_sequence: Vec<CommentId>,
}

impl CommentTree {
    pub fn build(comments: &[Comment]) -> CommentTree {
        let mut tree = CommentTree::default();
        for c in comments {
            if tree.comments.contains_key(&c.comment_id) {
                tracing::warn!(comment = ?c.comment_id, "comment is listed twice, ignoring the copy");
                continue;
            }
            tree.comments.insert(c.comment_id, Arc::new(c.clone()));
        }

        let mut attached = HashSet::with_capacity(comments.len());
        for c in comments {
            if !attached.insert(c.comment_id) {
                continue;
            }
            match c.parent_comment_id {
                Some(p) if p != c.comment_id && tree.comments.contains_key(&p) => {
                    tree.parents.insert(c.comment_id, p);
                    tree.children.entry(p).or_insert_with(Vec::new).push(c.comment_id);
                }
                None => tree.roots.push(c.comment_id),
                Some(p) => {
                    // Also add as a top-level comment if the parent could not be found
                    tracing::warn!(comment = ?c.comment_id, parent = ?p, "parent of comment not found, attaching it to the post");
                    tree.roots.push(c.comment_id);
                }
            }
        }

        let mut visited = HashSet::with_capacity(comments.len());
        for r in tree.roots.clone() {
            tree.walk_from(r, &mut visited);
        }
        for c in comments {
            if visited.contains(&c.comment_id) {
                continue;
            }
            tracing::warn!(comment = ?c.comment_id, "comment is part of a reply cycle, attaching it to the post");
            if let Some(p) = tree.parents.remove(&c.comment_id) {
                if let Some(siblings) = tree.children.get_mut(&p) {
                    siblings.retain(|s| *s != c.comment_id);
                }
            }
            tree.roots.push(c.comment_id);
            tree.walk_from(c.comment_id, &mut visited);
        }

        tree
    }

    fn walk_from(&mut self, start: CommentId, visited: &mut HashSet<CommentId>) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            self.display_sequence.push(id);
            if let Some(children) = self.children.get(&id) {
                stack.extend(children.iter().rev().copied());
            }
        }
    }

    pub fn get(&self, id: &CommentId) -> Option<&Arc<Comment>> {
        self.comments.get(id)
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn roots(&self) -> &[CommentId] {
        &self.roots
    }

    pub fn children(&self, id: &CommentId) -> &[CommentId] {
        self.children.get(id).map(|c| c as &[CommentId]).unwrap_or(&[])
    }

    pub fn parent(&self, id: &CommentId) -> Option<CommentId> {
        self.parents.get(id).copied()
    }

    pub fn display_sequence(&self) -> &[CommentId] {
        &self.display_sequence
    }

    /// Comments in depth-first order, each followed by its replies
    pub fn display_comments(&self) -> impl Iterator<Item = &Arc<Comment>> {
        self.display_sequence
            .iter()
            .filter_map(|id| self.comments.get(id))
    }
}
