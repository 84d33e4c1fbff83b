use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    api::{Post, PostId},
    CollapseGroupId, CollapseManager, ElementRef, Error, PostTree, Scheduler, TaskHandle,
    IDLE_TIMEOUT,
};

/// Number of elements realized right after the view changes
pub const FIRST_LOAD: usize = 5;

/// Number of elements each "load more" adds
pub const READ_MORE_STEP: usize = 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DisplayConfig {
    pub first_load: usize,
    pub read_more_step: usize,
}

impl Default for DisplayConfig {
    fn default() -> DisplayConfig {
        DisplayConfig {
            first_load: FIRST_LOAD,
            read_more_step: READ_MORE_STEP,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DisplayMore {
    pub new_max: usize,
    pub has_more: bool,
}

/// What a call to `display_to_thread_element` did
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Jump {
    /// Position of the target in the display sequence
    pub index: usize,
    pub max_display: usize,

    /// The group collapsed to skip over the posts between the previously
    /// realized ones and the target
    pub collapsed: Option<CollapseGroupId>,
}

enum FrameTask {
    LoadMore,
    Reveal(Box<dyn FnOnce()>),
}

impl fmt::Debug for FrameTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameTask::LoadMore => write!(f, "LoadMore"),
            FrameTask::Reveal(_) => write!(f, "Reveal"),
        }
    }
}

/// Tracks how much of the display sequence is realized
#[derive(Debug)]
pub struct DisplayManager {
    config: DisplayConfig,
    max_display: usize,

    /// Pending idle or frame task of the auto-loading loop
    auto_load: Option<TaskHandle>,

    frames: HashMap<TaskHandle, FrameTask>,
}

impl Default for DisplayManager {
    fn default() -> DisplayManager {
        DisplayManager::new(DisplayConfig::default())
    }
}

impl DisplayManager {
    pub fn new(config: DisplayConfig) -> DisplayManager {
        DisplayManager {
            config,
            max_display: config.first_load,
            auto_load: None,
            frames: HashMap::new(),
        }
    }

    pub fn config(&self) -> DisplayConfig {
        self.config
    }

    pub fn max_display(&self) -> usize {
        self.max_display
    }

    /// Back to the first load, as is needed whenever the view changes
    pub fn reset(&mut self) {
        self.max_display = self.config.first_load;
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.max_display < total
    }

    pub fn display_more(&mut self, total: usize) -> DisplayMore {
        let new_max = usize::min(self.max_display + self.config.read_more_step, total);
        self.max_display = new_max;
        tracing::debug!(loaded = new_max, total, "displaying more");
        DisplayMore {
            new_max,
            has_more: new_max < total,
        }
    }

    /// The realized prefix of `elements`
    pub fn loaded<'a, T>(&self, elements: &'a [T]) -> &'a [T] {
        &elements[..usize::min(self.max_display, elements.len())]
    }

    /// Makes sure `target` is realized, then calls `on_done` after the next
    /// frame.
    ///
    /// When the target is far ahead, the first-level posts strictly between
    /// the realized ones and the target get collapsed, so that they need not
    /// be rendered. Nothing changes if an error is returned.
    pub fn display_to_thread_element(
        &mut self,
        target: &ElementRef,
        elements: &[Arc<Post>],
        tree: &PostTree,
        collapse: &mut CollapseManager,
        scheduler: &mut dyn Scheduler,
        on_done: impl FnOnce() + 'static,
    ) -> Result<Jump, Error> {
        let target_id = target.post_id;
        let index = elements
            .iter()
            .position(|p| p.post_id == target_id)
            .ok_or(Error::NotDisplayed(target_id))?;

        if index < self.max_display {
            self.reveal(scheduler, on_done);
            return Ok(Jump {
                index,
                max_display: self.max_display,
                collapsed: None,
            });
        }

        let new_max = usize::min(index + 1 + self.config.read_more_step, elements.len());
        let last = self.max_display.checked_sub(1).map(|i| elements[i].post_id);
        // nothing to skip over when the target comes right after the
        // realized elements
        let range = if index == self.max_display {
            None
        } else {
            self.range_to_collapse(last, target_id, tree)?
        };

        tracing::debug!(target = ?target_id, index, new_max, ?range, "jumping to element");
        self.max_display = new_max;
        let collapsed = match range {
            None => None,
            Some((start, end)) => {
                let group = collapse.add_collapse_group(tree, start, end)?;
                collapse.on_collapse_level(group);
                Some(group)
            }
        };
        self.reveal(scheduler, on_done);
        Ok(Jump {
            index,
            max_display: new_max,
            collapsed,
        })
    }

    /// First-level posts strictly between the one holding `last` and the one
    /// holding `target`, or None if there are none
    fn range_to_collapse(
        &self,
        last: Option<PostId>,
        target: PostId,
        tree: &PostTree,
    ) -> Result<Option<(PostId, PostId)>, Error> {
        let unresolved = || {
            tracing::error!(?last, ?target, "could not find the first-level posts around the jump");
            Error::CollapseBounds { last, target }
        };
        // with only the root realized, everything before the target can go
        let last_parent = match last {
            Some(l) if tree.root_id() != Some(l) => {
                Some(tree.first_level_parent(&l).ok_or_else(unresolved)?)
            }
            _ => None,
        };
        let target_parent = tree.first_level_parent(&target).ok_or_else(unresolved)?;

        let from = match last_parent {
            Some(p) => tree.first_level_index(&p).ok_or_else(unresolved)? + 1,
            None => 0,
        };
        let to = tree.first_level_index(&target_parent).ok_or_else(unresolved)?;
        if from >= to {
            return Ok(None);
        }
        let start = match last_parent {
            Some(p) => tree.next_sibling(&p),
            None => tree.first_level_posts().first().copied(),
        };
        let end = tree.previous_sibling(&target_parent);
        match (start, end) {
            (Some(start), Some(end)) => Ok(Some((start, end))),
            _ => Err(unresolved()),
        }
    }

    fn reveal(&mut self, scheduler: &mut dyn Scheduler, on_done: impl FnOnce() + 'static) {
        let task = scheduler.schedule_frame();
        self.frames.insert(task, FrameTask::Reveal(Box::new(on_done)));
    }

    pub fn is_auto_loading(&self) -> bool {
        self.auto_load.is_some()
    }

    /// Pending idle or frame task of the idle-time loading loop
    pub fn auto_load_task(&self) -> Option<TaskHandle> {
        self.auto_load
    }

    /// Starts the idle-time loading loop if it should run and is not running
    /// yet, stops it if it should not run
    pub fn sync_auto_load(&mut self, should_run: bool, total: usize, scheduler: &mut dyn Scheduler) {
        if !should_run {
            self.stop_auto_load(scheduler);
            return;
        }
        if self.auto_load.is_none() && self.has_more(total) {
            tracing::trace!("starting idle-time loading");
            self.auto_load = Some(scheduler.schedule_idle(None));
        }
    }

    pub fn stop_auto_load(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(task) = self.auto_load.take() {
            tracing::trace!(?task, "stopping idle-time loading");
            scheduler.cancel(task);
            self.frames.remove(&task);
        }
    }

    /// Cancels everything still pending, completion callbacks included
    pub fn cancel_all(&mut self, scheduler: &mut dyn Scheduler) {
        self.stop_auto_load(scheduler);
        for (task, _) in self.frames.drain() {
            scheduler.cancel(task);
        }
    }

    /// Runs a task this manager scheduled, returns false for unknown tasks
    pub fn on_task(&mut self, task: TaskHandle, total: usize, scheduler: &mut dyn Scheduler) -> bool {
        if let Some(frame) = self.frames.remove(&task) {
            match frame {
                FrameTask::Reveal(on_done) => on_done(),
                FrameTask::LoadMore => {
                    self.auto_load = None;
                    if self.display_more(total).has_more {
                        tracing::trace!("more to load at next idle step");
                        self.auto_load = Some(scheduler.schedule_idle(Some(IDLE_TIMEOUT)));
                    }
                }
            }
            return true;
        }
        if self.auto_load == Some(task) {
            tracing::trace!("host is idle, loading more at next frame");
            let frame = scheduler.schedule_frame();
            self.frames.insert(frame, FrameTask::LoadMore);
            self.auto_load = Some(frame);
            return true;
        }
        false
    }
}
