use std::{collections::HashMap, sync::Arc};

use crate::{
    api::{self, Comment, DefaultView, Identity, Post, PostId, Tags, Thread, ThreadId},
    extract_categories, extract_new_replies_sequence, extract_replies_sequence, ChronologicalExt,
    CommentTree, ElementRef, Error, Memo, PostTree, ThreadElement, ThreadSource,
};

/// Everything derived from one version of the thread data
#[derive(Clone, Debug, Default)]
pub struct ThreadIndex {
    pub tree: PostTree,
    pub comments: HashMap<PostId, CommentTree>,

    /// All posts, oldest first
    pub chronological: Vec<Arc<Post>>,

    pub new_replies: Arc<[ElementRef]>,
    pub categories: Vec<String>,
}

impl ThreadIndex {
    pub fn build(thread: Option<&Thread>) -> ThreadIndex {
        let thread = match thread {
            Some(t) => t,
            None => return ThreadIndex::default(),
        };
        let posts = thread
            .posts
            .iter()
            .cloned()
            .map(Arc::new)
            .collect::<Vec<_>>();
        let tree = PostTree::build(&posts);
        let comments = posts
            .iter()
            .filter(|p| !p.comments.is_empty())
            .map(|p| (p.post_id, CommentTree::build(&p.comments)))
            .collect::<HashMap<_, _>>();
        // only keep the copies that made it into the tree, so that sequences
        // and the tree always agree
        let mut chronological = posts
            .iter()
            .filter(|p| {
                tree.get(&p.post_id)
                    .map(|info| Arc::ptr_eq(&info.post, p))
                    .unwrap_or(false)
            })
            .cloned()
            .collect::<Vec<_>>();
        chronological.sort_chronologically();
        let new_replies: Arc<[ElementRef]> =
            extract_new_replies_sequence(tree.display_posts(), &comments).collect();
        let categories = extract_categories(tree.display_posts());
        tracing::debug!(
            thread = ?thread.thread_id,
            num_posts = tree.len(),
            num_new = new_replies.len(),
            "built thread index"
        );
        ThreadIndex {
            tree,
            comments,
            chronological,
            new_replies,
            categories,
        }
    }

    /// Posts and their comments, in tree display order
    pub fn replies_sequence(&self) -> impl Iterator<Item = ThreadElement> + '_ {
        extract_replies_sequence(self.tree.display_posts(), &self.comments)
    }

    pub fn element(&self, r: &ElementRef) -> Result<ThreadElement, Error> {
        let post = self
            .tree
            .get(&r.post_id)
            .ok_or(Error::UnknownPost(r.post_id))?;
        match r.comment_id {
            None => Ok(ThreadElement::Post(post.post.clone())),
            Some(c) => self
                .comments
                .get(&r.post_id)
                .and_then(|tree| tree.get(&c))
                .map(|c| ThreadElement::Comment(c.clone()))
                .ok_or(Error::UnknownComment(c)),
        }
    }
}

/// Fetched data for the thread currently being looked at, along with the
/// state of the fetch
#[derive(Debug)]
pub struct ThreadContext {
    thread_id: ThreadId,
    data: Option<Thread>,
    fetching: bool,

    /// Bumped on every change to `data`
    version: u64,

    index: Memo<u64, Arc<ThreadIndex>>,
}

impl ThreadContext {
    pub fn new(thread_id: ThreadId) -> ThreadContext {
        ThreadContext {
            thread_id,
            data: None,
            fetching: false,
            version: 0,
            index: Memo::new(),
        }
    }

    pub fn with_thread(thread: Thread) -> ThreadContext {
        ThreadContext {
            thread_id: thread.thread_id,
            data: Some(thread),
            fetching: false,
            version: 0,
            index: Memo::new(),
        }
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.data.as_ref()
    }

    /// First fetch in flight, with no data to show yet
    pub fn is_loading(&self) -> bool {
        self.fetching && self.data.is_none()
    }

    /// Any fetch in flight, refetches included
    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Switching to another thread drops the current data, a refetch is needed
    pub fn set_thread_id(&mut self, thread_id: ThreadId) {
        if thread_id == self.thread_id {
            return;
        }
        tracing::debug!(from = ?self.thread_id, to = ?thread_id, "switching thread");
        self.thread_id = thread_id;
        self.data = None;
        self.bump();
    }

    pub fn begin_fetch(&mut self) {
        self.fetching = true;
    }

    pub fn finish_fetch(&mut self, res: Result<Thread, api::Error>) -> Result<(), Error> {
        self.fetching = false;
        match res {
            Ok(thread) if thread.thread_id != self.thread_id => {
                tracing::warn!(
                    expected = ?self.thread_id,
                    got = ?thread.thread_id,
                    "ignoring fetch result for a thread that is no longer current"
                );
                Ok(())
            }
            Ok(thread) => {
                tracing::info!(thread = ?thread.thread_id, num_posts = thread.posts.len(), "thread fetched");
                self.data = Some(thread);
                self.bump();
                Ok(())
            }
            Err(api::Error::ThreadNotFound(t)) => {
                tracing::warn!(thread = ?t, "thread not found, nothing to display");
                self.data = None;
                self.bump();
                Err(Error::Api(api::Error::ThreadNotFound(t)))
            }
            Err(e) => {
                tracing::error!(thread = ?self.thread_id, error = ?e, "failed fetching thread, keeping previous data");
                Err(Error::Api(e))
            }
        }
    }

    pub async fn refetch<S>(&mut self, source: &mut S) -> Result<(), Error>
    where
        S: ThreadSource + Send,
    {
        self.begin_fetch();
        let res = source.fetch_thread(self.thread_id).await;
        self.finish_fetch(res)
    }

    /// Derived data, rebuilt only if the thread data changed since last call
    pub fn index(&mut self) -> Arc<ThreadIndex> {
        let data = &self.data;
        self.index
            .get_or_compute(self.version, || Arc::new(ThreadIndex::build(data.as_ref())))
            .clone()
    }

    pub fn thread_root(&mut self) -> Option<Arc<Post>> {
        self.index().tree.root().map(|r| r.post.clone())
    }

    /// The post the page is pinned to, or the thread root if none is
    pub fn current_root(&mut self, pinned: Option<PostId>) -> Option<Arc<Post>> {
        let index = self.index();
        if let Some(p) = pinned {
            match index.tree.get(&p) {
                Some(info) => return Some(info.post.clone()),
                None => tracing::warn!(post = ?p, "pinned post is not in thread, showing the root"),
            }
        }
        index.tree.root().map(|r| r.post.clone())
    }

    pub fn categories(&mut self) -> Vec<String> {
        self.index().categories.clone()
    }

    pub fn has_new_replies(&mut self) -> bool {
        !self.index().new_replies.is_empty()
    }

    pub fn new_replies_count(&mut self) -> usize {
        self.index().new_replies.len()
    }

    pub fn default_view(&self) -> DefaultView {
        self.data.as_ref().map(|t| t.default_view).unwrap_or_default()
    }

    pub fn personal_identity(&self) -> Option<&Identity> {
        self.data.as_ref().and_then(|t| t.personal_identity.as_ref())
    }

    pub fn board_slug(&self) -> Option<&str> {
        self.data.as_ref().map(|t| &t.board_slug as &str)
    }

    fn posts_mut(&mut self) -> Result<&mut Vec<Post>, Error> {
        self.data
            .as_mut()
            .map(|t| &mut t.posts)
            .ok_or(Error::NotLoaded)
    }

    /// Adds a post the user just created to the cached data
    pub fn add_post(&mut self, post: Post) -> Result<(), Error> {
        let posts = self.posts_mut()?;
        if posts.iter().any(|p| p.post_id == post.post_id) {
            return Err(Error::Api(api::Error::UuidAlreadyUsed(post.post_id.0)));
        }
        let parent = post
            .parent_post_id
            .ok_or_else(|| {
                Error::Api(api::Error::Unknown(String::from(
                    "a thread cannot have a second root",
                )))
            })?;
        if !posts.iter().any(|p| p.post_id == parent) {
            return Err(Error::UnknownPost(parent));
        }
        tracing::debug!(post = ?post.post_id, ?parent, "adding post to cached thread");
        posts.push(post);
        self.bump();
        Ok(())
    }

    pub fn add_comments(&mut self, post_id: PostId, comments: Vec<Comment>) -> Result<(), Error> {
        let post = self
            .posts_mut()?
            .iter_mut()
            .find(|p| p.post_id == post_id)
            .ok_or(Error::UnknownPost(post_id))?;
        if let Some(c) = comments.iter().find(|c| c.parent_post_id != post_id) {
            return Err(Error::UnknownPost(c.parent_post_id));
        }
        tracing::debug!(post = ?post_id, num_comments = comments.len(), "adding comments to cached thread");
        post.comments.extend(comments);
        self.bump();
        Ok(())
    }

    pub fn update_post_tags(&mut self, post_id: PostId, tags: Tags) -> Result<(), Error> {
        let post = self
            .posts_mut()?
            .iter_mut()
            .find(|p| p.post_id == post_id)
            .ok_or(Error::UnknownPost(post_id))?;
        post.tags = tags;
        self.bump();
        Ok(())
    }

    /// Forget about all new contributions, as happens when the user visits the
    /// thread
    pub fn mark_read(&mut self) {
        let posts = match self.posts_mut() {
            Ok(posts) => posts,
            Err(_) => return,
        };
        for p in posts.iter_mut() {
            p.is_new = false;
            p.new_comments_amount = 0;
            for c in p.comments.iter_mut() {
                c.is_new = false;
            }
        }
        self.bump();
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::test_utils::*;

    struct FixedSource(Result<Thread, api::Error>);

    #[async_trait]
    impl ThreadSource for FixedSource {
        async fn fetch_thread(&mut self, _thread: ThreadId) -> Result<Thread, api::Error> {
            self.0.clone()
        }
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed initializing tokio runtime")
            .block_on(f)
    }

    #[test]
    fn fetch_state_flags() {
        let mut ctx = ThreadContext::new(thread_id());
        assert!(!ctx.is_loading());
        ctx.begin_fetch();
        assert!(ctx.is_loading());
        assert!(ctx.is_fetching());
        ctx.finish_fetch(Ok(flat_thread(3))).unwrap();
        assert!(!ctx.is_fetching());

        ctx.begin_fetch();
        assert!(!ctx.is_loading());
        assert!(ctx.is_fetching());
    }

    #[test]
    fn failed_fetch_keeps_previous_data() {
        let mut ctx = ThreadContext::with_thread(flat_thread(3));
        let version = ctx.version();
        ctx.begin_fetch();
        assert_eq!(
            ctx.finish_fetch(Err(api::Error::PermissionDenied)),
            Err(Error::Api(api::Error::PermissionDenied))
        );
        assert_eq!(ctx.version(), version);
        assert_eq!(ctx.index().tree.len(), 3);
    }

    #[test]
    fn missing_thread_shows_nothing() {
        let mut ctx = ThreadContext::with_thread(flat_thread(3));
        let res = ctx.finish_fetch(Err(api::Error::ThreadNotFound(thread_id().0)));
        assert!(res.is_err());
        assert!(ctx.thread().is_none());
        assert!(ctx.index().chronological.is_empty());
        assert!(ctx.thread_root().is_none());
    }

    #[test]
    fn stale_results_are_ignored() {
        let mut ctx = ThreadContext::new(thread_id());
        ctx.set_thread_id(api::ThreadId::stub());
        ctx.begin_fetch();
        ctx.finish_fetch(Ok(flat_thread(3))).unwrap();
        assert!(ctx.thread().is_none());
        assert!(!ctx.is_fetching());
    }

    #[test]
    fn index_is_rebuilt_only_on_change() {
        let mut ctx = ThreadContext::with_thread(flat_thread(3));
        let first = ctx.index();
        assert!(Arc::ptr_eq(&first, &ctx.index()));

        ctx.add_post(post(4, Some(2), 10)).unwrap();
        let second = ctx.index();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.tree.len(), 4);
        assert_eq!(
            second.chronological.iter().map(|p| p.post_id).collect::<Vec<_>>(),
            vec![id(1), id(2), id(3), id(4)]
        );
    }

    #[test]
    fn cache_updates_check_their_targets() {
        let mut ctx = ThreadContext::new(thread_id());
        assert_eq!(ctx.add_post(post(4, Some(1), 0)), Err(Error::NotLoaded));

        let mut ctx = ThreadContext::with_thread(flat_thread(3));
        assert_eq!(ctx.add_post(post(4, Some(42), 0)), Err(Error::UnknownPost(id(42))));
        assert!(ctx.add_post(post(4, None, 0)).is_err());
        assert_eq!(
            ctx.add_post(post(2, Some(1), 0)),
            Err(Error::Api(api::Error::UuidAlreadyUsed(id(2).0)))
        );
        assert_eq!(
            ctx.add_comments(id(42), vec![comment(1, 42, None, 0)]),
            Err(Error::UnknownPost(id(42)))
        );
        assert_eq!(
            ctx.update_post_tags(id(42), Tags::default()),
            Err(Error::UnknownPost(id(42)))
        );
        assert_eq!(ctx.index().tree.len(), 3);
    }

    #[test]
    fn cache_updates_show_up_in_index() {
        let mut ctx = ThreadContext::with_thread(flat_thread(3));
        let mut c = comment(10, 2, None, 5);
        c.is_new = true;
        ctx.add_comments(id(2), vec![c]).unwrap();
        ctx.update_post_tags(id(3), Tags::with_categories(["art"])).unwrap();

        let index = ctx.index();
        assert_eq!(index.comments.get(&id(2)).map(|c| c.len()), Some(1));
        assert_eq!(index.categories, vec!["art"]);
        assert_eq!(
            &index.new_replies[..],
            &[ElementRef {
                post_id: id(2),
                comment_id: Some(cid(10))
            }]
        );
        assert!(ctx.has_new_replies());

        ctx.mark_read();
        assert!(!ctx.has_new_replies());
        assert_eq!(ctx.new_replies_count(), 0);
    }

    #[test]
    fn current_root_follows_pinned_post() {
        let mut ctx = ThreadContext::with_thread(flat_thread(3));
        assert_eq!(ctx.current_root(None).map(|p| p.post_id), Some(id(1)));
        assert_eq!(ctx.current_root(Some(id(3))).map(|p| p.post_id), Some(id(3)));
        assert_eq!(ctx.current_root(Some(id(42))).map(|p| p.post_id), Some(id(1)));
        assert_eq!(ctx.board_slug(), Some("gore"));
        assert_eq!(ctx.default_view(), DefaultView::Thread);
    }

    #[test]
    fn elements_resolve_from_refs() {
        let mut t = flat_thread(2);
        t.posts[1].comments = vec![comment(10, 2, None, 3)];
        let mut ctx = ThreadContext::with_thread(t);
        let index = ctx.index();
        assert_eq!(index.replies_sequence().count(), 3);
        assert!(matches!(
            index.element(&ElementRef { post_id: id(2), comment_id: Some(cid(10)) }),
            Ok(ThreadElement::Comment(_))
        ));
        assert_eq!(
            index.element(&ElementRef { post_id: id(2), comment_id: Some(cid(11)) }),
            Err(Error::UnknownComment(cid(11)))
        );
        assert_eq!(index.element(&ElementRef::post(id(9))), Err(Error::UnknownPost(id(9))));
    }

    #[test]
    fn refetch_goes_through_source() {
        let mut ctx = ThreadContext::new(thread_id());
        let mut source = FixedSource(Ok(flat_thread(4)));
        block_on(ctx.refetch(&mut source)).unwrap();
        assert_eq!(ctx.index().tree.len(), 4);
        assert!(!ctx.is_fetching());

        let mut failing = FixedSource(Err(api::Error::PermissionDenied));
        assert!(block_on(ctx.refetch(&mut failing)).is_err());
        assert_eq!(ctx.index().tree.len(), 4);
    }
}
