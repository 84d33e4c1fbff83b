use std::str::FromStr;

use uuid::Uuid;

use crate::{Identity, Post, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct ThreadId(pub Uuid);

impl ThreadId {
    pub fn stub() -> ThreadId {
        ThreadId(STUB_UUID)
    }
}

/// View the thread author picked as the one to open the thread with
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultView {
    #[default]
    Thread,
    Timeline,
    Gallery,
}

impl FromStr for DefaultView {
    type Err = String;

    fn from_str(s: &str) -> Result<DefaultView, String> {
        match s {
            "thread" => Ok(DefaultView::Thread),
            "timeline" => Ok(DefaultView::Timeline),
            "gallery" => Ok(DefaultView::Gallery),
            _ => Err(format!("unknown default view {s:?}")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub thread_id: ThreadId,
    pub board_slug: String,

    #[serde(default)]
    pub default_view: DefaultView,

    /// Identity the current user posts with in this thread, if any
    #[serde(default)]
    pub personal_identity: Option<Identity>,

    /// Flat list of posts, in the order the server sent them
    pub posts: Vec<Post>,
}
