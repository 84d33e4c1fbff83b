pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<chrono::Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod action;
pub use action::{Action, ReplyTo};

mod comment;
pub use comment::{Comment, CommentId};

mod error;
pub use error::Error;

mod post;
pub use post::{Post, PostId};

mod tag;
pub use tag::Tags;

mod thread;
pub use thread::{DefaultView, Thread, ThreadId};

mod user;
pub use user::Identity;

// Text is stored server-side as C-compatible strings, null bytes are refused
pub fn validate_string(s: &str) -> Result<(), Error> {
    if s.contains('\0') {
        return Err(Error::NullByteInString(String::from(s)));
    }
    Ok(())
}
