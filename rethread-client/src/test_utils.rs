use std::sync::Arc;

use chrono::TimeZone;

use crate::api::{Comment, CommentId, Post, PostId, Tags, Thread, ThreadId, Time, Uuid};

pub fn id(n: u128) -> PostId {
    PostId(Uuid::from_u128(n))
}

pub fn cid(n: u128) -> CommentId {
    CommentId(Uuid::from_u128(n))
}

pub fn thread_id() -> ThreadId {
    ThreadId(Uuid::from_u128(0xfeed))
}

pub fn at(minutes: i64) -> Time {
    chrono::Utc
        .timestamp_opt(1_600_000_000 + minutes * 60, 0)
        .unwrap()
}

pub fn post(n: u128, parent: Option<u128>, minutes: i64) -> Post {
    Post {
        post_id: id(n),
        thread_id: thread_id(),
        parent_post_id: parent.map(id),
        created: at(minutes),
        content: format!("post {n}"),
        is_new: false,
        new_comments_amount: 0,
        tags: Tags::default(),
        comments: Vec::new(),
    }
}

pub fn new_post(n: u128, parent: Option<u128>, minutes: i64) -> Post {
    Post {
        is_new: true,
        ..post(n, parent, minutes)
    }
}

pub fn tagged(mut p: Post, categories: &[&str]) -> Post {
    p.tags = Tags::with_categories(categories.iter().copied());
    p
}

pub fn comment(n: u128, post: u128, parent: Option<u128>, minutes: i64) -> Comment {
    Comment {
        comment_id: cid(n),
        parent_post_id: id(post),
        parent_comment_id: parent.map(cid),
        created: at(minutes),
        content: format!("comment {n}"),
        is_new: false,
    }
}

pub fn arcs(posts: Vec<Post>) -> Vec<Arc<Post>> {
    posts.into_iter().map(Arc::new).collect()
}

pub fn thread(posts: Vec<Post>) -> Thread {
    Thread {
        thread_id: thread_id(),
        board_slug: String::from("gore"),
        default_view: Default::default(),
        personal_identity: None,
        posts,
    }
}

/// root(1) with first-level posts 2..=n, one minute apart
pub fn flat_thread(n: u128) -> Thread {
    let mut posts = vec![post(1, None, 0)];
    posts.extend((2..=n).map(|i| post(i, Some(1), i as i64)));
    thread(posts)
}
