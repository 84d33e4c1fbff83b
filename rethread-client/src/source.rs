use async_trait::async_trait;

use crate::api::{Error, Thread, ThreadId};

/// Where thread data gets fetched from
#[async_trait]
pub trait ThreadSource {
    async fn fetch_thread(&mut self, thread: ThreadId) -> Result<Thread, Error>;
}
