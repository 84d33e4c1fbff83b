use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    api::{Comment, CommentId, Post, PostId},
    CommentTree,
};

/// Identity of a post or comment, enough to scroll to it
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ElementRef {
    pub post_id: PostId,
    pub comment_id: Option<CommentId>,
}

impl ElementRef {
    pub fn post(post_id: PostId) -> ElementRef {
        ElementRef {
            post_id,
            comment_id: None,
        }
    }

    pub fn comment(c: &Comment) -> ElementRef {
        ElementRef {
            post_id: c.parent_post_id,
            comment_id: Some(c.comment_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ThreadElement {
    Post(Arc<Post>),
    Comment(Arc<Comment>),
}

impl ThreadElement {
    pub fn element_ref(&self) -> ElementRef {
        match self {
            ThreadElement::Post(p) => ElementRef::post(p.post_id),
            ThreadElement::Comment(c) => ElementRef::comment(c),
        }
    }

    /// The post itself, or the post a comment is attached to
    pub fn post_id(&self) -> PostId {
        match self {
            ThreadElement::Post(p) => p.post_id,
            ThreadElement::Comment(c) => c.parent_post_id,
        }
    }

    pub fn is_new(&self) -> bool {
        match self {
            ThreadElement::Post(p) => p.has_news(),
            ThreadElement::Comment(c) => c.is_new,
        }
    }
}

/// All distinct category tags, in order of first occurrence
pub fn extract_categories<'a, I>(posts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Arc<Post>>,
{
    let mut seen = HashSet::new();
    let mut res = Vec::new();
    for p in posts {
        for c in &p.tags.category_tags {
            if seen.insert(c.as_str()) {
                res.push(c.clone());
            }
        }
    }
    res
}

/// Posts in display order, each followed by its comments in reply order
pub fn extract_replies_sequence<'a, I>(
    posts: I,
    post_comments: &'a HashMap<PostId, CommentTree>,
) -> impl Iterator<Item = ThreadElement> + 'a
where
    I: IntoIterator<Item = &'a Arc<Post>>,
    I::IntoIter: 'a,
{
    posts.into_iter().flat_map(move |p| {
        let comments = post_comments
            .get(&p.post_id)
            .into_iter()
            .flat_map(|tree| tree.display_comments().cloned().map(ThreadElement::Comment));
        std::iter::once(ThreadElement::Post(p.clone())).chain(comments)
    })
}

/// Same order as `extract_replies_sequence`, keeping only what is new to the
/// user: new posts, posts with new comments, and new comments.
///
/// The sequence is computed lazily, and can be restarted by calling this again.
pub fn extract_new_replies_sequence<'a, I>(
    posts: I,
    post_comments: &'a HashMap<PostId, CommentTree>,
) -> impl Iterator<Item = ElementRef> + 'a
where
    I: IntoIterator<Item = &'a Arc<Post>>,
    I::IntoIter: 'a,
{
    extract_replies_sequence(posts, post_comments)
        .filter(ThreadElement::is_new)
        .map(|e| e.element_ref())
}

/// Cycles through new replies, for "jump to next new" navigation
#[derive(Clone, Debug)]
pub struct NewRepliesCursor {
    sequence: Arc<[ElementRef]>,
    current: Option<usize>,
}

impl NewRepliesCursor {
    pub fn new(sequence: Arc<[ElementRef]>) -> NewRepliesCursor {
        NewRepliesCursor {
            sequence,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Next new element, wrapping around to the first one after the last
    pub fn next_new(&mut self) -> Option<ElementRef> {
        if self.sequence.is_empty() {
            return None;
        }
        let next = self
            .current
            .map(|i| (i + 1) % self.sequence.len())
            .unwrap_or(0);
        self.current = Some(next);
        Some(self.sequence[next])
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}
