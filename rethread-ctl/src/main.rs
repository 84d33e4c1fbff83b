use std::{cell::Cell, cell::RefCell, path::PathBuf, rc::Rc};

use anyhow::Context;
use async_trait::async_trait;
use rethread_client::{
    api::{self, CommentId, PostId, Thread, ThreadId, Uuid},
    CategoryFilter, CommentTree, DisplayConfig, ElementRef, GalleryMode, GalleryViewMode,
    LocalScheduler, ThreadContext, ThreadIndex, ThreadSession, ThreadSource, ThreadViewMode,
    TimelineViewMode, ViewMode, ViewState,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON dump of the thread to look at
    #[structopt(short = "f", long, env = "RETHREAD_THREAD_FILE", parse(from_os_str))]
    thread_file: PathBuf,

    #[structopt(long, env = "RETHREAD_FIRST_LOAD", default_value = "5")]
    first_load: usize,

    #[structopt(long, env = "RETHREAD_READ_MORE_STEP", default_value = "5")]
    read_more_step: usize,

    /// thread, timeline or gallery; defaults to the thread's default view
    #[structopt(short, long)]
    mode: Option<ThreadViewMode>,

    /// all, latest or new
    #[structopt(long, default_value = "all")]
    timeline: TimelineViewMode,

    /// all or new
    #[structopt(long, default_value = "all")]
    gallery: GalleryMode,

    #[structopt(long)]
    show_cover: bool,

    /// Comma-separated list of categories to restrict the view to
    #[structopt(long)]
    categories: Option<CategoryFilter>,

    /// Post to navigate to, forcing thread mode
    #[structopt(long)]
    pinned: Option<Uuid>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Print the realized elements of the current view
    Show {
        /// Keep loading at idle time until everything is shown
        #[structopt(long)]
        all: bool,
    },

    /// List the categories used in the thread
    Categories,

    /// List the new posts and comments
    New,

    /// Reveal a post or comment, collapsing what lies in between if needed
    Jump {
        post: Uuid,

        #[structopt(long)]
        comment: Option<Uuid>,
    },
}

/// Serves the one thread found in a JSON dump
struct FileSource(Thread);

impl FileSource {
    async fn open(path: &PathBuf) -> anyhow::Result<FileSource> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading thread file {path:?}"))?;
        let thread: Thread = serde_json::from_slice(&data)
            .with_context(|| format!("parsing thread file {path:?}"))?;
        tracing::debug!(thread = ?thread.thread_id, posts = thread.posts.len(), "loaded thread file");
        Ok(FileSource(thread))
    }
}

#[async_trait]
impl ThreadSource for FileSource {
    async fn fetch_thread(&mut self, thread: ThreadId) -> Result<Thread, api::Error> {
        if thread != self.0.thread_id {
            return Err(api::Error::ThreadNotFound(thread.0));
        }
        Ok(self.0.clone())
    }
}

fn comment_depth(tree: &CommentTree, id: &CommentId) -> usize {
    std::iter::successors(tree.parent(id), |p| tree.parent(p)).count()
}

fn print_view(session: &mut ThreadSession) {
    let index = session.thread_mut().index();
    let elements = session.current_mode_display_elements();
    let loaded = session.current_mode_loaded_elements();
    let tree_mode = session.effective_mode() == ThreadViewMode::Thread;
    let mut hidden = 0;
    for p in &loaded {
        if tree_mode && session.is_hidden(&p.post_id) {
            hidden += 1;
            continue;
        }
        if hidden > 0 {
            println!("[{hidden} collapsed]");
            hidden = 0;
        }
        let level = match tree_mode {
            true => index.tree.get(&p.post_id).map(|i| i.level).unwrap_or(0),
            false => 0,
        };
        print_post(&index, p, level);
    }
    if hidden > 0 {
        println!("[{hidden} collapsed]");
    }
    println!("-- {} of {} shown", loaded.len(), elements.len());
}

fn print_post(index: &ThreadIndex, p: &api::Post, level: usize) {
    let indent = "  ".repeat(level);
    let marker = if p.has_news() { "*" } else { " " };
    println!(
        "{indent}{marker} {} {} [{}] {}",
        p.post_id.0,
        p.created.format("%Y-%m-%d %H:%M"),
        p.tags.category_tags.join(","),
        p.content.lines().next().unwrap_or(""),
    );
    if let Some(comments) = index.comments.get(&p.post_id) {
        for c in comments.display_comments() {
            let indent = "  ".repeat(level + 1 + comment_depth(comments, &c.comment_id));
            let marker = if c.is_new { "*" } else { " " };
            println!(
                "{indent}{marker} > {} {}",
                c.comment_id.0,
                c.content.lines().next().unwrap_or("")
            );
        }
    }
}

fn run_until(session: &mut ThreadSession, sched: &mut LocalScheduler, done: impl Fn() -> bool) {
    while !done() {
        match sched.pop_ready() {
            Some(task) => {
                session.on_task(task, sched);
            }
            None => break,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    let mut source = FileSource::open(&opt.thread_file).await?;
    let view = Rc::new(RefCell::new(ViewState::new(ViewMode {
        thread: opt.mode.unwrap_or_default(),
        timeline: opt.timeline,
        gallery: GalleryViewMode {
            mode: opt.gallery,
            show_cover: opt.show_cover,
        },
        filter: opt.categories.filter(|c| !c.is_empty()),
    })));
    let mut sched = LocalScheduler::new();
    let mut session = ThreadSession::open(
        ThreadContext::new(source.0.thread_id),
        view,
        DisplayConfig {
            first_load: opt.first_load,
            read_more_step: opt.read_more_step,
        },
    );
    session
        .refetch(&mut source, &mut sched)
        .await
        .context("fetching thread")?;
    if opt.mode.is_none() {
        session.apply_default_view();
    }
    session.set_pinned(opt.pinned.map(PostId));
    session.sync_auto_load(&mut sched);

    match opt.cmd {
        Command::Show { all } => {
            if all {
                run_until(&mut session, &mut sched, || false);
                // idle-time loading only runs in thread mode
                while session.has_more() {
                    session.display_more();
                }
            }
            print_view(&mut session);
        }
        Command::Categories => {
            for c in session.thread_mut().categories() {
                println!("{c}");
            }
        }
        Command::New => {
            let index = session.thread_mut().index();
            for r in index.new_replies.iter() {
                match r.comment_id {
                    None => println!("post {}", r.post_id.0),
                    Some(c) => println!("comment {} on post {}", c.0, r.post_id.0),
                }
            }
        }
        Command::Jump { post, comment } => {
            let target = ElementRef {
                post_id: PostId(post),
                comment_id: comment.map(CommentId),
            };
            let revealed = Rc::new(Cell::new(false));
            let jump = {
                let revealed = revealed.clone();
                session
                    .display_to_thread_element(&target, &mut sched, move || revealed.set(true))
                    .context("jumping to element")?
            };
            if let Some(group) = jump.collapsed.and_then(|g| session.collapse().group(g).cloned()) {
                println!(
                    "collapsed first-level posts {} to {}",
                    group.start.0, group.end.0
                );
            }
            run_until(&mut session, &mut sched, || revealed.get());
            print_view(&mut session);
        }
    }

    session.close(&mut sched);
    Ok(())
}
