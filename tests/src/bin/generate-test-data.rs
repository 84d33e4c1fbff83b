use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use rethread_api::{Comment, CommentId, DefaultView, Identity, Post, PostId, Tags, Thread, ThreadId};
use uuid::Uuid;

const NUM_POSTS: usize = 60;
const POST_WORD_COUNT: usize = 40;

const MAX_COMMENTS_PER_POST: usize = 4;
const COMMENT_WORD_COUNT: usize = 12;

// One in NEW_RATIO posts or comments is unread
const NEW_RATIO: u32 = 6;

const CATEGORIES: &[&str] = &["art", "lore", "meta", "ooc", "question"];

fn gen_new(rng: &mut impl Rng) -> bool {
    rng.gen_ratio(1, NEW_RATIO)
}

fn gen_tags(rng: &mut impl Rng) -> Tags {
    let num = rng.gen_range(0..=2);
    let categories = CATEGORIES.choose_multiple(rng, num).copied();
    let mut tags = Tags::with_categories(categories);
    if rng.gen_ratio(1, 10) {
        tags.content_warnings.push(lipsum::lipsum_words(1));
    }
    tags
}

fn gen_comments(rng: &mut impl Rng, post: PostId, created: chrono::DateTime<Utc>) -> Vec<Comment> {
    let mut comments: Vec<Comment> = Vec::new();
    for i in 0..rng.gen_range(0..=MAX_COMMENTS_PER_POST) {
        // comments either answer the post or one of the previous comments
        let parent_comment_id = match i > 0 && rng.gen_bool(0.5) {
            true => comments.choose(rng).map(|c| c.comment_id),
            false => None,
        };
        comments.push(Comment {
            comment_id: CommentId(Uuid::new_v4()),
            parent_post_id: post,
            parent_comment_id,
            created: created + Duration::minutes(i as i64 + 1),
            content: lipsum::lipsum_words(COMMENT_WORD_COUNT),
            is_new: gen_new(rng),
        });
    }
    comments
}

fn main() {
    let mut rng = rand::thread_rng();
    let thread_id = ThreadId(Uuid::new_v4());
    let start = Utc::now() - Duration::days(30);

    let mut posts: Vec<Post> = Vec::with_capacity(NUM_POSTS);
    for i in 0..NUM_POSTS {
        let post_id = PostId(Uuid::new_v4());
        // posts are created in order so that parents always predate their replies
        let created = start + Duration::hours(i as i64 * 6) + Duration::minutes(rng.gen_range(0..60));
        let parent_post_id = match i {
            0 => None,
            // favor replying to the recent posts to get deep-ish chains
            _ => {
                let lo = i.saturating_sub(8);
                let parent = match rng.gen_ratio(1, 3) {
                    true => 0,
                    false => rng.gen_range(lo..i),
                };
                Some(posts[parent].post_id)
            }
        };
        let comments = gen_comments(&mut rng, post_id, created);
        let new_comments_amount = comments.iter().filter(|c| c.is_new).count() as u32;
        posts.push(Post {
            post_id,
            thread_id,
            parent_post_id,
            created,
            content: lipsum::lipsum_words(POST_WORD_COUNT),
            is_new: i != 0 && gen_new(&mut rng),
            new_comments_amount,
            tags: gen_tags(&mut rng),
            comments,
        });
    }

    // servers send posts in no particular order
    posts[1..].shuffle(&mut rng);

    let thread = Thread {
        thread_id,
        board_slug: lipsum::lipsum_words(1).to_lowercase(),
        default_view: *[DefaultView::Thread, DefaultView::Timeline, DefaultView::Gallery]
            .choose(&mut rng)
            .unwrap(),
        personal_identity: rng.gen_bool(0.5).then(|| Identity {
            name: lipsum::lipsum_words(2),
            avatar: format!("https://example.org/avatars/{}.png", Uuid::new_v4()),
        }),
        posts,
    };
    println!("{}", serde_json::to_string_pretty(&thread).unwrap());
}
