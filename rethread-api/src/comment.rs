use uuid::Uuid;

use crate::{Error, PostId, Time, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: CommentId,

    /// Post this comment is attached to
    pub parent_post_id: PostId,

    /// Comment this one replies to, if any
    #[serde(default)]
    pub parent_comment_id: Option<CommentId>,

    pub created: Time,
    pub content: String,

    #[serde(default)]
    pub is_new: bool,
}

impl Comment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.content)
    }
}
