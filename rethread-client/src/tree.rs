use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::api::{Post, PostId};

#[derive(Clone, Debug)]
pub struct ThreadPostInfo {
    pub post: Arc<Post>,

    /// Lookup-only link to the parent's entry, None for the root
    pub parent: Option<PostId>,

    /// Children in the order they were attached
    pub children: Vec<PostId>,

    /// Depth in the tree, 0 for the root
    pub level: usize,
}

/// Parent/children index over the posts of a thread
///
/// Posts are stored in an arena keyed by id, and all links between them are
/// ids resolved through the arena.
#[derive(Clone, Debug, Default)]
pub struct PostTree {
    root: Option<PostId>,
    posts: HashMap<PostId, ThreadPostInfo>,
    display_sequence: Vec<PostId>,
}

impl PostTree {
    pub fn empty() -> PostTree {
        PostTree::default()
    }

    /// Builds the tree out of the flat list of posts the server sent.
    ///
    /// Posts whose parent is not in the list, and posts that are part of a
    /// parent cycle, get attached directly under the root. A second
    /// parent-less post is not a root, and gets attached under the first one.
    pub fn build(posts: &[Arc<Post>]) -> PostTree {
        let root_id = match posts.iter().find(|p| p.parent_post_id.is_none()) {
            Some(root) => root.post_id,
            None => {
                if !posts.is_empty() {
                    tracing::error!(num_posts = posts.len(), "thread has no root post");
                }
                return PostTree::empty();
            }
        };

        let mut tree = PostTree {
            root: Some(root_id),
            posts: HashMap::with_capacity(posts.len()),
            display_sequence: Vec::with_capacity(posts.len()),
        };
        for p in posts {
            if tree.posts.contains_key(&p.post_id) {
                tracing::warn!(post = ?p.post_id, "post is listed twice in thread, ignoring the copy");
                continue;
            }
            tree.posts.insert(
                p.post_id,
                ThreadPostInfo {
                    post: p.clone(),
                    parent: None,
                    children: Vec::new(),
                    level: 0,
                },
            );
        }

        let mut attached = HashSet::with_capacity(posts.len());
        attached.insert(root_id);
        for p in posts {
            if !attached.insert(p.post_id) {
                continue;
            }
            let parent = match p.parent_post_id {
                Some(parent) if parent != p.post_id && tree.posts.contains_key(&parent) => parent,
                stated => {
                    tracing::warn!(
                        post = ?p.post_id,
                        parent = ?stated,
                        "parent of post is not in thread, attaching it to the root"
                    );
                    root_id
                }
            };
            tree.attach(p.post_id, parent);
        }

        let mut visited = HashSet::with_capacity(posts.len());
        tree.walk_from(root_id, 0, &mut visited);
        for p in posts {
            if visited.contains(&p.post_id) {
                continue;
            }
            tracing::warn!(
                post = ?p.post_id,
                "post is part of a parent cycle, attaching it to the root"
            );
            tree.detach(p.post_id);
            tree.attach(p.post_id, root_id);
            tree.walk_from(p.post_id, 1, &mut visited);
        }

        tree
    }

    fn attach(&mut self, child: PostId, parent: PostId) {
        if let Some(info) = self.posts.get_mut(&child) {
            info.parent = Some(parent);
        }
        if let Some(info) = self.posts.get_mut(&parent) {
            info.children.push(child);
        }
    }

    fn detach(&mut self, child: PostId) {
        let parent = self.posts.get_mut(&child).and_then(|info| info.parent.take());
        if let Some(info) = parent.and_then(|p| self.posts.get_mut(&p)) {
            info.children.retain(|c| *c != child);
        }
    }

    /// Depth-first walk that sets levels and extends the display sequence
    fn walk_from(&mut self, start: PostId, level: usize, visited: &mut HashSet<PostId>) {
        let mut stack = vec![(start, level)];
        while let Some((id, level)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let info = self
                .posts
                .get_mut(&id)
                .expect("walking to a post that is not in the tree");
            info.level = level;
            self.display_sequence.push(id);
            stack.extend(info.children.iter().rev().map(|c| (*c, level + 1)));
        }
    }

    pub fn root_id(&self) -> Option<PostId> {
        self.root
    }

    pub fn root(&self) -> Option<&ThreadPostInfo> {
        self.root.and_then(|r| self.posts.get(&r))
    }

    pub fn get(&self, id: &PostId) -> Option<&ThreadPostInfo> {
        self.posts.get(id)
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Root first, then the subtree of each child in child order
    pub fn display_sequence(&self) -> &[PostId] {
        &self.display_sequence
    }

    pub fn display_posts(&self) -> impl Iterator<Item = &Arc<Post>> {
        self.display_sequence
            .iter()
            .filter_map(|id| self.posts.get(id).map(|info| &info.post))
    }

    /// Parents of `id`, closest first, ending with the root
    pub fn ancestors(&self, id: &PostId) -> impl Iterator<Item = &ThreadPostInfo> {
        let mut next = self.posts.get(id).and_then(|info| info.parent);
        std::iter::from_fn(move || {
            let info = self.posts.get(&next?)?;
            next = info.parent;
            Some(info)
        })
    }

    /// Direct children of the root
    pub fn first_level_posts(&self) -> &[PostId] {
        self.root()
            .map(|root| &root.children as &[PostId])
            .unwrap_or(&[])
    }

    pub fn is_first_level(&self, id: &PostId) -> bool {
        self.posts
            .get(id)
            .map(|info| info.parent.is_some() && info.parent == self.root)
            .unwrap_or(false)
    }

    /// Position of a first-level post among the children of the root
    pub fn first_level_index(&self, id: &PostId) -> Option<usize> {
        self.first_level_posts().iter().position(|p| p == id)
    }

    /// The first-level post whose subtree contains `id`.
    ///
    /// Returns `id` itself for first-level posts, and None for the root and
    /// for posts not in the tree.
    pub fn first_level_parent(&self, id: &PostId) -> Option<PostId> {
        let root = self.root?;
        let mut current = self.posts.get(id)?;
        loop {
            match current.parent {
                None => return None,
                Some(p) if p == root => return Some(current.post.post_id),
                Some(p) => current = self.posts.get(&p)?,
            }
        }
    }

    fn siblings(&self, id: &PostId) -> Option<(&[PostId], usize)> {
        let parent = self.posts.get(id)?.parent?;
        let siblings = &self.posts.get(&parent)?.children;
        let idx = siblings.iter().position(|s| s == id)?;
        Some((siblings, idx))
    }

    pub fn next_sibling(&self, id: &PostId) -> Option<PostId> {
        let (siblings, idx) = self.siblings(id)?;
        siblings.get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, id: &PostId) -> Option<PostId> {
        let (siblings, idx) = self.siblings(id)?;
        idx.checked_sub(1).map(|i| siblings[i])
    }
}
