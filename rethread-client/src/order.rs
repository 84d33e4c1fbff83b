use std::sync::Arc;

use crate::api::Post;

pub trait ChronologicalExt {
    /// Oldest first. The sort is stable, so posts created at the same time
    /// keep the order the server sent them in.
    fn sort_chronologically(&mut self);

    fn chronological(&self) -> Vec<Arc<Post>>;
}

impl ChronologicalExt for [Arc<Post>] {
    fn sort_chronologically(&mut self) {
        self.sort_by_key(|p| p.created)
    }

    fn chronological(&self) -> Vec<Arc<Post>> {
        let mut res = self.to_vec();
        res.sort_chronologically();
        res
    }
}
