use crate::{Comment, CommentId, Error, Post, PostId, Tags, ThreadId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTo {
    pub post_id: PostId,
    pub comment_id: Option<CommentId>,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub enum Action {
    NewPost(Post),
    NewComments {
        reply_to: ReplyTo,
        comments: Vec<Comment>,
    },
    EditTags {
        post_id: PostId,
        tags: Tags,
    },
    VisitThread(ThreadId),
}

impl Action {
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Action::NewPost(p) => p.validate(),
            Action::NewComments {
                reply_to: _,
                comments,
            } => comments.iter().try_for_each(|c| c.validate()),
            Action::EditTags { post_id: _, tags } => tags.validate(),
            Action::VisitThread(_) => Ok(()),
        }
    }
}
