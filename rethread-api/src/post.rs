use uuid::Uuid;

use crate::{Comment, Error, Tags, ThreadId, Time, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn stub() -> PostId {
        PostId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: PostId,
    pub thread_id: ThreadId,

    /// None only for the root of the thread
    #[serde(default)]
    pub parent_post_id: Option<PostId>,

    pub created: Time,
    pub content: String,

    #[serde(default)]
    pub is_new: bool,

    #[serde(default)]
    pub new_comments_amount: u32,

    #[serde(default)]
    pub tags: Tags,

    /// Comments in the order the server sent them
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Whether this post should show up in "new" views
    pub fn has_news(&self) -> bool {
        self.is_new || self.new_comments_amount > 0
    }

    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.content)?;
        self.tags.validate()?;
        for c in &self.comments {
            c.validate()?;
        }
        Ok(())
    }
}
