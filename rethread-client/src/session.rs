use std::{
    cell::{Ref, RefCell, RefMut},
    rc::Rc,
    sync::Arc,
};

use crate::{
    api::{Post, PostId},
    CollapseManager, DisplayConfig, DisplayManager, DisplayMore, ElementRef, Error, HandlerId,
    Jump, NewRepliesCursor, Scheduler, TaskHandle, ThreadContext, ThreadSource, ThreadViewMode,
    ViewProjector, ViewState,
};

/// Everything one open thread page needs: the thread data, the projection of
/// it for the current view mode, and the state of what is realized
pub struct ThreadSession {
    thread: ThreadContext,
    view: Rc<RefCell<ViewState>>,
    projector: ViewProjector,
    display: Rc<RefCell<DisplayManager>>,
    collapse: Rc<RefCell<CollapseManager>>,

    /// Post the page navigated to, if any
    pinned: Option<PostId>,

    /// Cursor over new replies, along with the thread version it was built for
    cursor: Option<(u64, NewRepliesCursor)>,

    handler: Option<HandlerId>,
}

impl ThreadSession {
    /// Subscribes to view changes, that reset what is realized and collapsed
    pub fn open(
        thread: ThreadContext,
        view: Rc<RefCell<ViewState>>,
        config: DisplayConfig,
    ) -> ThreadSession {
        let display = Rc::new(RefCell::new(DisplayManager::new(config)));
        let collapse = Rc::new(RefCell::new(CollapseManager::new()));
        let handler = {
            let display = Rc::downgrade(&display);
            let collapse = Rc::downgrade(&collapse);
            view.borrow_mut().add_on_change_handler(move |mode| {
                tracing::debug!(?mode, "view changed, resetting display");
                if let Some(display) = display.upgrade() {
                    display.borrow_mut().reset();
                }
                if let Some(collapse) = collapse.upgrade() {
                    collapse.borrow_mut().reset();
                }
            })
        };
        tracing::info!(thread = ?thread.thread_id(), "opened thread session");
        ThreadSession {
            thread,
            view,
            projector: ViewProjector::new(),
            display,
            collapse,
            pinned: None,
            cursor: None,
            handler: Some(handler),
        }
    }

    pub fn thread(&self) -> &ThreadContext {
        &self.thread
    }

    /// Direct changes to the thread data are picked up at the next
    /// projection
    pub fn thread_mut(&mut self) -> &mut ThreadContext {
        &mut self.thread
    }

    pub fn view(&self) -> &Rc<RefCell<ViewState>> {
        &self.view
    }

    pub fn pinned(&self) -> Option<PostId> {
        self.pinned
    }

    pub fn set_pinned(&mut self, pinned: Option<PostId>) {
        if pinned != self.pinned {
            self.pinned = pinned;
            self.display.borrow_mut().reset();
            self.collapse.borrow_mut().reset();
        }
    }

    /// Switches to the view the thread author picked
    pub fn apply_default_view(&mut self) {
        let mode = ThreadViewMode::from(self.thread.default_view());
        self.view.borrow_mut().set_thread_view_mode(mode);
    }

    pub fn effective_mode(&self) -> ThreadViewMode {
        self.view.borrow().mode().effective_mode(self.pinned)
    }

    pub async fn refetch<S>(&mut self, source: &mut S, scheduler: &mut dyn Scheduler) -> Result<(), Error>
    where
        S: ThreadSource + Send,
    {
        self.display.borrow_mut().stop_auto_load(scheduler);
        let res = self.thread.refetch(source).await;
        self.sync_auto_load(scheduler);
        res
    }

    pub fn current_mode_display_elements(&mut self) -> Arc<[Arc<Post>]> {
        let view = self.view.borrow();
        self.projector
            .project(&mut self.thread, view.mode(), self.pinned)
    }

    pub fn current_mode_loaded_elements(&mut self) -> Vec<Arc<Post>> {
        let elements = self.current_mode_display_elements();
        self.display.borrow().loaded(&elements).to_vec()
    }

    pub fn max_display(&self) -> usize {
        self.display.borrow().max_display()
    }

    pub fn has_more(&mut self) -> bool {
        let total = self.current_mode_display_elements().len();
        self.display.borrow().has_more(total)
    }

    pub fn display_more(&mut self) -> DisplayMore {
        let total = self.current_mode_display_elements().len();
        self.display.borrow_mut().display_more(total)
    }

    pub fn collapse(&self) -> Ref<'_, CollapseManager> {
        self.collapse.borrow()
    }

    pub fn collapse_mut(&self) -> RefMut<'_, CollapseManager> {
        self.collapse.borrow_mut()
    }

    pub fn is_hidden(&mut self, post: &PostId) -> bool {
        let index = self.thread.index();
        self.collapse.borrow().is_hidden(post, &index.tree)
    }

    pub fn display_to_thread_element(
        &mut self,
        target: &ElementRef,
        scheduler: &mut dyn Scheduler,
        on_done: impl FnOnce() + 'static,
    ) -> Result<Jump, Error> {
        let index = self.thread.index();
        index.element(target)?;
        let elements = self.current_mode_display_elements();
        self.display.borrow_mut().display_to_thread_element(
            target,
            &elements,
            &index.tree,
            &mut self.collapse.borrow_mut(),
            scheduler,
            on_done,
        )
    }

    /// Jumps to the next new reply, wrapping around after the last one.
    /// Returns None if there is nothing new.
    pub fn next_new_reply(
        &mut self,
        scheduler: &mut dyn Scheduler,
        on_done: impl FnOnce() + 'static,
    ) -> Result<Option<(ElementRef, Jump)>, Error> {
        let version = self.thread.version();
        let stale = !matches!(&self.cursor, Some((v, _)) if *v == version);
        if stale {
            let new_replies = self.thread.index().new_replies.clone();
            self.cursor = Some((version, NewRepliesCursor::new(new_replies)));
        }
        let target = match self.cursor.as_mut().and_then(|(_, c)| c.next_new()) {
            Some(t) => t,
            None => return Ok(None),
        };
        let jump = self.display_to_thread_element(&target, scheduler, on_done)?;
        Ok(Some((target, jump)))
    }

    /// Idle-time loading runs in thread mode, when no fetch is in flight
    fn should_auto_load(&self) -> bool {
        !self.thread.is_fetching() && self.effective_mode() == ThreadViewMode::Thread
    }

    pub fn sync_auto_load(&mut self, scheduler: &mut dyn Scheduler) {
        let should_run = self.should_auto_load();
        let total = self.current_mode_display_elements().len();
        self.display
            .borrow_mut()
            .sync_auto_load(should_run, total, scheduler);
    }

    /// Runs a task scheduled by this session, returns false for unknown tasks.
    ///
    /// Idle-time loading scheduled before a mode change or a fetch is dropped
    /// instead of run.
    pub fn on_task(&mut self, task: TaskHandle, scheduler: &mut dyn Scheduler) -> bool {
        if !self.should_auto_load() && self.display.borrow().is_auto_loading() {
            let mut display = self.display.borrow_mut();
            let stale = display.auto_load_task() == Some(task);
            display.stop_auto_load(scheduler);
            if stale {
                tracing::debug!(?task, "dropping idle-time loading");
                return true;
            }
        }
        let total = self.current_mode_display_elements().len();
        self.display.borrow_mut().on_task(task, total, scheduler)
    }

    /// Cancels all pending work and stops listening to view changes
    pub fn close(mut self, scheduler: &mut dyn Scheduler) {
        self.display.borrow_mut().cancel_all(scheduler);
        self.unsubscribe();
        tracing::info!(thread = ?self.thread.thread_id(), "closed thread session");
    }

    fn unsubscribe(&mut self) {
        if let Some(handler) = self.handler.take() {
            match self.view.try_borrow_mut() {
                Ok(mut view) => {
                    view.remove_on_change_handler(handler);
                }
                Err(_) => tracing::error!("view state busy, could not unsubscribe session"),
            }
        }
    }
}

impl Drop for ThreadSession {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        api::DefaultView, test_utils::*, CategoryFilter, LocalScheduler, TimelineViewMode,
        FIRST_LOAD,
    };

    fn open(posts: Vec<crate::api::Post>) -> (ThreadSession, Rc<RefCell<ViewState>>) {
        let view = Rc::new(RefCell::new(ViewState::default()));
        let session = ThreadSession::open(
            ThreadContext::with_thread(thread(posts)),
            view.clone(),
            DisplayConfig::default(),
        );
        (session, view)
    }

    fn run(session: &mut ThreadSession, sched: &mut LocalScheduler) {
        while let Some(task) = sched.pop_ready() {
            assert!(session.on_task(task, &mut *sched));
        }
    }

    #[test]
    fn loaded_elements_follow_max_display() {
        let (mut session, _view) = open(flat_thread(12).posts);
        assert_eq!(session.current_mode_display_elements().len(), 12);
        assert_eq!(
            session
                .current_mode_loaded_elements()
                .iter()
                .map(|p| p.post_id)
                .collect::<Vec<_>>(),
            (1..=5).map(id).collect::<Vec<_>>()
        );
        assert!(session.has_more());
        session.display_more();
        session.display_more();
        assert_eq!(session.max_display(), 12);
        assert!(!session.has_more());
        assert_eq!(session.display_more(), DisplayMore { new_max: 12, has_more: false });
    }

    #[test]
    fn view_changes_reset_display_and_collapse() {
        let (mut session, view) = open(flat_thread(20).posts);
        let mut sched = LocalScheduler::new();
        let jump = session
            .display_to_thread_element(&ElementRef::post(id(15)), &mut sched, || ())
            .unwrap();
        assert!(jump.collapsed.is_some());
        assert_eq!(session.collapse().groups().len(), 1);
        assert!(session.is_hidden(&id(10)));

        view.borrow_mut()
            .set_active_filters(Some(CategoryFilter::new(["art"])));
        assert_eq!(session.max_display(), FIRST_LOAD);
        assert!(session.collapse().groups().is_empty());
        assert!(!session.is_hidden(&id(10)));
    }

    #[test]
    fn close_unsubscribes_and_cancels() {
        let (mut session, view) = open(flat_thread(20).posts);
        let mut sched = LocalScheduler::new();
        assert_eq!(view.borrow().num_handlers(), 1);

        let done = Rc::new(Cell::new(false));
        let d = done.clone();
        session
            .display_to_thread_element(&ElementRef::post(id(2)), &mut sched, move || d.set(true))
            .unwrap();
        session.sync_auto_load(&mut sched);
        assert_eq!(sched.pending(), 2);

        session.close(&mut sched);
        assert_eq!(view.borrow().num_handlers(), 0);
        assert_eq!(sched.pending(), 0);
        assert!(!done.get());
        view.borrow_mut().set_thread_view_mode(ThreadViewMode::Timeline);
    }

    #[test]
    fn dropping_unsubscribes() {
        let (session, view) = open(flat_thread(3).posts);
        drop(session);
        assert_eq!(view.borrow().num_handlers(), 0);
    }

    #[test]
    fn auto_load_only_in_thread_mode() {
        let (mut session, view) = open(flat_thread(12).posts);
        let mut sched = LocalScheduler::new();

        view.borrow_mut()
            .set_thread_view_mode(ThreadViewMode::Timeline);
        session.sync_auto_load(&mut sched);
        assert_eq!(sched.pending(), 0);

        // pinning a post forces thread mode
        session.set_pinned(Some(id(2)));
        session.sync_auto_load(&mut sched);
        assert_eq!(sched.pending(), 1);
        run(&mut session, &mut sched);
        assert_eq!(session.max_display(), 12);

        session.set_pinned(None);
        session.sync_auto_load(&mut sched);
        assert_eq!(sched.pending(), 0);
        assert_eq!(session.max_display(), FIRST_LOAD);
    }

    #[test]
    fn mode_change_drops_pending_auto_load() {
        let (mut session, view) = open(flat_thread(30).posts);
        let mut sched = LocalScheduler::new();
        session.sync_auto_load(&mut sched);
        assert_eq!(sched.pending(), 1);

        // the host does not resync after the change
        view.borrow_mut()
            .set_thread_view_mode(ThreadViewMode::Timeline);
        assert_eq!(session.max_display(), FIRST_LOAD);
        run(&mut session, &mut sched);
        assert_eq!(session.max_display(), FIRST_LOAD);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn mode_change_between_idle_and_frame_drops_the_frame() {
        let (mut session, view) = open(flat_thread(30).posts);
        let mut sched = LocalScheduler::new();
        session.sync_auto_load(&mut sched);
        let idle = sched.pop_ready().unwrap();
        assert!(session.on_task(idle, &mut sched));
        assert_eq!(sched.pending(), 1);

        view.borrow_mut()
            .set_thread_view_mode(ThreadViewMode::Gallery);
        run(&mut session, &mut sched);
        assert_eq!(session.max_display(), FIRST_LOAD);
    }

    #[test]
    fn auto_load_stops_while_fetching() {
        let (mut session, _view) = open(flat_thread(12).posts);
        let mut sched = LocalScheduler::new();
        session.sync_auto_load(&mut sched);
        assert_eq!(sched.pending(), 1);

        session.thread_mut().begin_fetch();
        assert!(session.current_mode_display_elements().is_empty());
        session.sync_auto_load(&mut sched);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn next_new_reply_cycles_through_news() {
        let mut posts = flat_thread(20).posts;
        posts[17].is_new = true; // post 18
        let mut c = comment(100, 3, None, 30);
        c.is_new = true;
        posts[2].comments.push(c); // on post 3

        let (mut session, _view) = open(posts);
        let mut sched = LocalScheduler::new();

        let (target, jump) = session.next_new_reply(&mut sched, || ()).unwrap().unwrap();
        assert_eq!(target, ElementRef { post_id: id(3), comment_id: Some(cid(100)) });
        assert_eq!(jump.collapsed, None);

        let (target, jump) = session.next_new_reply(&mut sched, || ()).unwrap().unwrap();
        assert_eq!(target, ElementRef::post(id(18)));
        assert!(jump.collapsed.is_some());

        let (target, _) = session.next_new_reply(&mut sched, || ()).unwrap().unwrap();
        assert_eq!(target.post_id, id(3));

        session.thread_mut().mark_read();
        assert_eq!(session.next_new_reply(&mut sched, || ()).unwrap(), None);
    }

    #[test]
    fn jumps_check_their_target() {
        let (mut session, view) = open(flat_thread(20).posts);
        let mut sched = LocalScheduler::new();
        let target = ElementRef { post_id: id(3), comment_id: Some(cid(1)) };
        assert_eq!(
            session.display_to_thread_element(&target, &mut sched, || ()),
            Err(Error::UnknownComment(cid(1)))
        );

        // post 3 is not new, so not in the timeline of new posts
        view.borrow_mut().set_mode(crate::ViewMode {
            thread: ThreadViewMode::Timeline,
            timeline: TimelineViewMode::New,
            ..Default::default()
        });
        assert_eq!(
            session.display_to_thread_element(&ElementRef::post(id(3)), &mut sched, || ()),
            Err(Error::NotDisplayed(id(3)))
        );
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn default_view_seeds_the_mode() {
        let view = Rc::new(RefCell::new(ViewState::default()));
        let mut t = flat_thread(3);
        t.default_view = DefaultView::Gallery;
        let mut session = ThreadSession::open(ThreadContext::with_thread(t), view.clone(), DisplayConfig::default());
        session.apply_default_view();
        assert_eq!(view.borrow().mode().thread, ThreadViewMode::Gallery);
        assert_eq!(session.effective_mode(), ThreadViewMode::Gallery);
        assert_eq!(session.current_mode_display_elements().len(), 2);
    }
}
