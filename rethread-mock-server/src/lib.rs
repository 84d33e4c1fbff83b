use std::collections::{btree_map, BTreeMap, HashSet};

use async_trait::async_trait;
use rethread_client::{
    api::{Action, Comment, Error, Post, PostId, ReplyTo, Tags, Thread, ThreadId},
    ThreadSource,
};

pub struct MockServer(BTreeMap<ThreadId, Thread>);

impl MockServer {
    pub fn new() -> MockServer {
        MockServer(BTreeMap::new())
    }

    pub fn test_num_threads(&self) -> usize {
        self.0.len()
    }

    pub fn admin_create_thread(&mut self, t: Thread) -> Result<(), Error> {
        for p in &t.posts {
            p.validate()?;
        }
        rethread_client::api::validate_string(&t.board_slug)?;
        match self.0.entry(t.thread_id) {
            btree_map::Entry::Occupied(_) => Err(Error::UuidAlreadyUsed(t.thread_id.0)),
            btree_map::Entry::Vacant(entry) => {
                tracing::debug!(thread = ?t.thread_id, num_posts = t.posts.len(), "created thread");
                entry.insert(t);
                Ok(())
            }
        }
    }

    pub fn thread(&self, id: ThreadId) -> Result<&Thread, Error> {
        self.0.get(&id).ok_or(Error::ThreadNotFound(id.0))
    }

    fn thread_of_post_mut(&mut self, post: PostId) -> Result<&mut Thread, Error> {
        self.0
            .values_mut()
            .find(|t| t.posts.iter().any(|p| p.post_id == post))
            .ok_or(Error::PostNotFound(post.0))
    }

    fn post_mut(&mut self, post: PostId) -> Result<&mut Post, Error> {
        self.0
            .values_mut()
            .flat_map(|t| t.posts.iter_mut())
            .find(|p| p.post_id == post)
            .ok_or(Error::PostNotFound(post.0))
    }

    fn is_uuid_used(&self, uuid: rethread_client::api::Uuid) -> bool {
        self.0.values().any(|t| {
            t.thread_id.0 == uuid
                || t.posts.iter().any(|p| {
                    p.post_id.0 == uuid || p.comments.iter().any(|c| c.comment_id.0 == uuid)
                })
        })
    }

    pub async fn submit_action(&mut self, a: Action) -> Result<(), Error> {
        a.validate()?;
        match a {
            Action::NewPost(p) => self.new_post(p),
            Action::NewComments { reply_to, comments } => self.new_comments(reply_to, comments),
            Action::EditTags { post_id, tags } => self.edit_tags(post_id, tags),
            Action::VisitThread(t) => self.visit(t),
        }
    }

    fn new_post(&mut self, p: Post) -> Result<(), Error> {
        if self.is_uuid_used(p.post_id.0) {
            return Err(Error::UuidAlreadyUsed(p.post_id.0));
        }
        let parent = p.parent_post_id.ok_or(Error::PermissionDenied)?;
        let thread = self
            .0
            .get_mut(&p.thread_id)
            .ok_or(Error::ThreadNotFound(p.thread_id.0))?;
        if !thread.posts.iter().any(|q| q.post_id == parent) {
            return Err(Error::PostNotFound(parent.0));
        }
        tracing::debug!(post = ?p.post_id, ?parent, "new post");
        thread.posts.push(p);
        Ok(())
    }

    fn new_comments(&mut self, reply_to: ReplyTo, comments: Vec<Comment>) -> Result<(), Error> {
        let mut known = HashSet::new();
        for c in &comments {
            if self.is_uuid_used(c.comment_id.0) || !known.insert(c.comment_id) {
                return Err(Error::UuidAlreadyUsed(c.comment_id.0));
            }
            if c.parent_post_id != reply_to.post_id {
                return Err(Error::PostNotFound(c.parent_post_id.0));
            }
        }
        let post = self.post_mut(reply_to.post_id)?;
        known.extend(post.comments.iter().map(|c| c.comment_id));
        for parent in reply_to
            .comment_id
            .iter()
            .chain(comments.iter().filter_map(|c| c.parent_comment_id.as_ref()))
        {
            if !known.contains(parent) {
                return Err(Error::CommentNotFound(parent.0));
            }
        }
        tracing::debug!(post = ?reply_to.post_id, num_comments = comments.len(), "new comments");
        post.comments.extend(comments);
        Ok(())
    }

    fn edit_tags(&mut self, post: PostId, tags: Tags) -> Result<(), Error> {
        self.post_mut(post)?.tags = tags;
        Ok(())
    }

    fn visit(&mut self, thread: ThreadId) -> Result<(), Error> {
        let thread = self
            .0
            .get_mut(&thread)
            .ok_or(Error::ThreadNotFound(thread.0))?;
        for p in thread.posts.iter_mut() {
            p.is_new = false;
            p.new_comments_amount = 0;
            for c in p.comments.iter_mut() {
                c.is_new = false;
            }
        }
        Ok(())
    }

    /// Simulates another user replying: the post shows up as new
    pub fn test_reply_from_other_user(&mut self, mut p: Post) -> Result<(), Error> {
        p.is_new = true;
        let parent = p.parent_post_id.ok_or(Error::PermissionDenied)?;
        let thread = self.thread_of_post_mut(parent)?;
        p.thread_id = thread.thread_id;
        thread.posts.push(p);
        Ok(())
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl ThreadSource for &MockServer {
    async fn fetch_thread(&mut self, thread: ThreadId) -> Result<Thread, Error> {
        self.thread(thread).map(|t| t.clone())
    }
}
