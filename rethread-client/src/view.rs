use std::{collections::HashSet, fmt, str::FromStr, sync::Arc};

use crate::{
    api::{DefaultView, Post, PostId},
    CategoryFilter, Memo, PostTree, ThreadContext,
};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ThreadViewMode {
    #[default]
    Thread,
    Timeline,
    Gallery,
}

impl FromStr for ThreadViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<ThreadViewMode, String> {
        match s {
            "thread" => Ok(ThreadViewMode::Thread),
            "timeline" => Ok(ThreadViewMode::Timeline),
            "gallery" | "masonry" => Ok(ThreadViewMode::Gallery),
            _ => Err(format!("unknown view mode {s:?}")),
        }
    }
}

impl fmt::Display for ThreadViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThreadViewMode::Thread => "thread",
            ThreadViewMode::Timeline => "timeline",
            ThreadViewMode::Gallery => "gallery",
        })
    }
}

impl From<DefaultView> for ThreadViewMode {
    fn from(v: DefaultView) -> ThreadViewMode {
        match v {
            DefaultView::Thread => ThreadViewMode::Thread,
            DefaultView::Timeline => ThreadViewMode::Timeline,
            DefaultView::Gallery => ThreadViewMode::Gallery,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum TimelineViewMode {
    #[default]
    All,
    Latest,
    New,
}

impl FromStr for TimelineViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<TimelineViewMode, String> {
        match s {
            "all" => Ok(TimelineViewMode::All),
            "latest" => Ok(TimelineViewMode::Latest),
            "new" => Ok(TimelineViewMode::New),
            _ => Err(format!("unknown timeline mode {s:?}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum GalleryMode {
    #[default]
    All,
    New,
}

impl FromStr for GalleryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<GalleryMode, String> {
        match s {
            "all" => Ok(GalleryMode::All),
            "new" => Ok(GalleryMode::New),
            _ => Err(format!("unknown gallery mode {s:?}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct GalleryViewMode {
    pub mode: GalleryMode,

    /// Whether the first post of the thread is shown before the gallery
    pub show_cover: bool,
}

/// Everything the user picked about how to look at a thread
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct ViewMode {
    pub thread: ThreadViewMode,
    pub timeline: TimelineViewMode,
    pub gallery: GalleryViewMode,

    /// None when no category filter is active
    pub filter: Option<CategoryFilter>,
}

impl ViewMode {
    /// The mode that actually applies, given the post the page may be pinned to
    pub fn effective_mode(&self, pinned: Option<PostId>) -> ThreadViewMode {
        match pinned {
            Some(_) => ThreadViewMode::Thread,
            None => self.thread,
        }
    }
}

/// Projects the chronological sequence of posts onto what `mode` shows.
///
/// Under an active filter in thread mode, the ancestors of all matching posts
/// are kept too, so that the tree can still be walked down to them.
pub fn project_view(
    chronological: &[Arc<Post>],
    tree: &PostTree,
    mode: &ViewMode,
    pinned: Option<PostId>,
) -> Vec<Arc<Post>> {
    let effective = mode.effective_mode(pinned);
    let projected = match effective {
        ThreadViewMode::Thread => chronological.to_vec(),
        ThreadViewMode::Timeline => match mode.timeline {
            TimelineViewMode::All => chronological.to_vec(),
            TimelineViewMode::Latest => chronological.iter().rev().cloned().collect(),
            TimelineViewMode::New => chronological
                .iter()
                .filter(|p| p.has_news())
                .cloned()
                .collect(),
        },
        ThreadViewMode::Gallery => {
            let (cover, body) = match chronological.split_first() {
                Some((cover, body)) => (Some(cover), body),
                None => (None, chronological),
            };
            let cover = cover.filter(|_| mode.gallery.show_cover);
            let body = body
                .iter()
                .filter(|p| mode.gallery.mode == GalleryMode::All || p.has_news());
            cover.into_iter().chain(body).cloned().collect()
        }
    };

    let filter = match &mode.filter {
        None => return projected,
        Some(f) => f,
    };
    let matching = projected
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect::<Vec<_>>();
    if effective != ThreadViewMode::Thread {
        return matching;
    }

    let mut keep = HashSet::with_capacity(matching.len());
    for p in &matching {
        if !keep.insert(p.post_id) {
            continue;
        }
        for ancestor in tree.ancestors(&p.post_id) {
            if !keep.insert(ancestor.post.post_id) {
                break;
            }
        }
    }
    chronological
        .iter()
        .filter(|p| keep.contains(&p.post_id))
        .cloned()
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HandlerId(u64);

/// The current view mode, notifying registered handlers on each change
pub struct ViewState {
    mode: ViewMode,
    handlers: Vec<(HandlerId, Box<dyn FnMut(&ViewMode)>)>,
    next_handler: u64,
}

impl fmt::Debug for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewState")
            .field("mode", &self.mode)
            .field("num_handlers", &self.handlers.len())
            .finish()
    }
}

impl Default for ViewState {
    fn default() -> ViewState {
        ViewState::new(ViewMode::default())
    }
}

impl ViewState {
    pub fn new(mode: ViewMode) -> ViewState {
        ViewState {
            mode,
            handlers: Vec::new(),
            next_handler: 0,
        }
    }

    pub fn mode(&self) -> &ViewMode {
        &self.mode
    }

    pub fn add_on_change_handler(&mut self, handler: impl FnMut(&ViewMode) + 'static) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Returns whether the handler was still registered
    pub fn remove_on_change_handler(&mut self, id: HandlerId) -> bool {
        let len = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != len
    }

    pub fn num_handlers(&self) -> usize {
        self.handlers.len()
    }

    fn update(&mut self, f: impl FnOnce(&mut ViewMode)) {
        let before = self.mode.clone();
        f(&mut self.mode);
        if before == self.mode {
            return;
        }
        tracing::debug!(mode = ?self.mode, "view mode changed");
        for (_, handler) in self.handlers.iter_mut() {
            handler(&self.mode);
        }
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.update(|m| *m = mode)
    }

    pub fn set_thread_view_mode(&mut self, thread: ThreadViewMode) {
        self.update(|m| m.thread = thread)
    }

    pub fn set_timeline_view_mode(&mut self, timeline: TimelineViewMode) {
        self.update(|m| m.timeline = timeline)
    }

    pub fn set_gallery_view_mode(&mut self, gallery: GalleryViewMode) {
        self.update(|m| m.gallery = gallery)
    }

    /// An empty filter is the same as no filter
    pub fn set_active_filters(&mut self, filter: Option<CategoryFilter>) {
        let filter = filter.filter(|f| !f.is_empty());
        self.update(|m| m.filter = filter)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct ProjectionKey {
    mode: ViewMode,
    pinned: Option<PostId>,
    version: u64,
    fetching: bool,
}

/// `project_view`, recomputed only when the mode, the pinned post or the
/// thread data changed
#[derive(Debug, Default)]
pub struct ViewProjector {
    memo: Memo<ProjectionKey, Arc<[Arc<Post>]>>,
}

impl ViewProjector {
    pub fn new() -> ViewProjector {
        ViewProjector::default()
    }

    /// Nothing is shown while a fetch is in flight
    pub fn project(
        &mut self,
        thread: &mut ThreadContext,
        mode: &ViewMode,
        pinned: Option<PostId>,
    ) -> Arc<[Arc<Post>]> {
        let key = ProjectionKey {
            mode: mode.clone(),
            pinned,
            version: thread.version(),
            fetching: thread.is_fetching(),
        };
        self.memo
            .get_or_compute(key, || {
                if thread.is_fetching() {
                    return Arc::from(Vec::new());
                }
                let index = thread.index();
                let projected = project_view(&index.chronological, &index.tree, mode, pinned);
                tracing::trace!(num_posts = projected.len(), "projected view");
                Arc::from(projected)
            })
            .clone()
    }
}
