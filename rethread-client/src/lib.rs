mod collapse;
pub use collapse::{CollapseGroup, CollapseGroupId, CollapseManager};

mod comment;
pub use comment::CommentTree;

mod display;
pub use display::{DisplayConfig, DisplayManager, DisplayMore, Jump, FIRST_LOAD, READ_MORE_STEP};

mod error;
pub use error::Error;

mod filter;
pub use filter::CategoryFilter;

mod memo;
pub use memo::Memo;

mod order;
pub use order::ChronologicalExt;

mod scheduler;
pub use scheduler::{LocalScheduler, Scheduler, TaskHandle, IDLE_TIMEOUT};

mod sequence;
pub use sequence::{
    extract_categories, extract_new_replies_sequence, extract_replies_sequence, ElementRef,
    NewRepliesCursor, ThreadElement,
};

mod session;
pub use session::ThreadSession;

mod source;
pub use source::ThreadSource;

mod thread;
pub use thread::{ThreadContext, ThreadIndex};

mod tree;
pub use tree::{PostTree, ThreadPostInfo};

mod view;
pub use view::{
    project_view, GalleryMode, GalleryViewMode, HandlerId, ThreadViewMode, TimelineViewMode,
    ViewMode, ViewProjector, ViewState,
};

pub mod api {
    pub use rethread_api::*;
}

#[cfg(test)]
mod test_utils;
