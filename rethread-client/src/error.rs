use crate::api::{self, CommentId, PostId};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] api::Error),

    #[error("Thread data is not loaded yet")]
    NotLoaded,

    #[error("Post {0:?} is not part of the thread")]
    UnknownPost(PostId),

    #[error("Comment {0:?} is not part of the thread")]
    UnknownComment(CommentId),

    #[error("Post {0:?} is not a direct child of the thread root")]
    NotFirstLevel(PostId),

    #[error("Post {0:?} is not part of the current display sequence")]
    NotDisplayed(PostId),

    #[error("Could not find the first-level posts to collapse between {last:?} and {target:?}")]
    CollapseBounds {
        last: Option<PostId>,
        target: PostId,
    },
}
