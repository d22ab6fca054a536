use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use super::reply::SharedBuffer;
use super::*;

fn engine(program: &str, args: &[&str]) -> (Completion, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let completion =
        Completion::new(program, CompletionRequest::from_args(args)).with_output(buffer.clone());
    (completion, buffer)
}

fn git_tree() -> CompletionTree {
    CompletionTree::new()
        .subtree("init", CompletionTree::new())
        .subtree(
            "clone",
            CompletionTree::new().leaf("origin", ["--depth", "--branch"]),
        )
}

#[tokio::test]
async fn test_tree_root_keys_for_first_fragment() {
    let (mut completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    completion.tree(git_tree());

    assert_eq!(completion.init().await, Outcome::Completed);
    assert_eq!(buffer.contents(), "init\nclone\n");
}

#[tokio::test]
async fn test_tree_second_fragment() {
    let (mut completion, buffer) = engine("git", &["--compgen", "2", "clone", "git clone "]);
    completion.tree(git_tree());

    assert_eq!(completion.generate().await, Settlement::Emitted);
    assert_eq!(buffer.contents(), "origin\n");
}

#[tokio::test]
async fn test_tree_with_zsh_offset() {
    // zsh counts the program name, so CURRENT=3 is the second argument
    let (mut completion, buffer) =
        engine("git", &["--compzsh", "--compgen", "3", "clone", "git clone or"]);
    completion.tree(git_tree());

    completion.init().await;
    assert_eq!(buffer.contents(), "origin\n");
}

#[tokio::test]
async fn test_fragment_beyond_tree_depth_is_silent() {
    let (mut completion, buffer) =
        engine("git", &["--compgen", "4", "x", "git clone origin --depth "]);
    completion.tree(git_tree());

    assert_eq!(completion.generate().await, Settlement::Idle);
    assert_eq!(buffer.contents(), "");
}

#[tokio::test]
async fn test_empty_tree_registers_nothing() {
    let (mut completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    completion.tree(CompletionTree::new());

    assert_eq!(completion.generate().await, Settlement::Idle);
    assert_eq!(buffer.contents(), "");
}

#[tokio::test]
async fn test_dispatch_order_and_shared_payload() {
    let (mut completion, _buffer) =
        engine("git", &["--compgen", "1", "git", "git "]);
    completion.set_fragments(["action", "user"]);

    let log: Rc<RefCell<Vec<(String, usize)>>> = Rc::new(RefCell::new(Vec::new()));
    for event in ["$1", "action", COMPLETE_EVENT] {
        let log = log.clone();
        completion.on(event, move |payload: &CompletionEvent| {
            log.borrow_mut()
                .push((event.to_string(), payload as *const CompletionEvent as usize));
        });
    }

    completion.generate().await;

    let log = log.borrow();
    let order: Vec<&str> = log.iter().map(|(event, _)| event.as_str()).collect();
    assert_eq!(order, vec![COMPLETE_EVENT, "action", "$1"]);
    assert!(log.iter().all(|(_, address)| *address == log[0].1));
}

#[tokio::test]
async fn test_complete_event_carries_fragment_name() {
    let (mut completion, _buffer) =
        engine("git", &["--compgen", "2", "clone", "git clone "]);
    completion.set_fragments(["action", "user"]);

    let seen = Rc::new(RefCell::new(None));
    let captured = seen.clone();
    completion.on(COMPLETE_EVENT, move |event: &CompletionEvent| {
        *captured.borrow_mut() = Some((
            event.fragment_name.clone(),
            event.before.clone(),
            event.line.clone(),
        ));
    });

    completion.generate().await;
    assert_eq!(
        seen.borrow().clone(),
        Some((
            Some("user".to_string()),
            Some("clone".to_string()),
            "git clone ".to_string()
        ))
    );
}

#[tokio::test]
async fn test_invalid_fragment_only_fires_complete() {
    let (mut completion, buffer) = engine("git", &["--compgen", "??", "x", "git "]);
    completion.set_fragments(["action"]);
    completion.tree(git_tree());

    let fired = Rc::new(RefCell::new(Vec::new()));
    for event in [COMPLETE_EVENT, "action"] {
        let fired = fired.clone();
        completion.on(event, move |_: &CompletionEvent| {
            fired.borrow_mut().push(event);
        });
    }

    assert_eq!(completion.generate().await, Settlement::Idle);
    assert_eq!(*fired.borrow(), vec![COMPLETE_EVENT]);
    assert_eq!(buffer.contents(), "");
}

#[tokio::test]
async fn test_first_reply_wins() {
    let (mut completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    completion.on(COMPLETE_EVENT, |event: &CompletionEvent| {
        event.reply.reply(vec!["from-complete"]);
    });
    completion.on_fragment(1, |event: &CompletionEvent| {
        event.reply.reply(vec!["from-position"]);
    });

    completion.generate().await;
    assert_eq!(buffer.contents(), "from-complete\n");
}

#[tokio::test]
async fn test_deferred_reply_with_async_subscription() {
    let (mut completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    completion.on_async("$1", |event: &CompletionEvent| {
        event.reply.reply(Answer::deferred(async {
            tokio::task::yield_now().await;
            vec!["remote-a", "remote-b"]
        }));
    });

    assert_eq!(completion.generate().await, Settlement::Emitted);
    assert_eq!(buffer.contents(), "remote-a\nremote-b\n");
}

#[tokio::test]
async fn test_deferred_reply_awaited_without_async_subscription() {
    let (mut completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    completion.on("$1", |event: &CompletionEvent| {
        event.reply.reply(Answer::deferred(async { vec!["late"] }));
    });

    assert_eq!(completion.generate().await, Settlement::Emitted);
    assert_eq!(buffer.contents(), "late\n");
}

#[tokio::test]
async fn test_legacy_gate_drops_deferred_reply() {
    let (completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    let mut completion = completion.with_options(EngineOptions {
        legacy_async_gate: true,
        ..EngineOptions::default()
    });
    completion.on("$1", |event: &CompletionEvent| {
        event.reply.reply(Answer::deferred(async { vec!["late"] }));
    });

    assert_eq!(completion.generate().await, Settlement::Dropped);
    assert_eq!(buffer.contents(), "");
}

#[tokio::test]
async fn test_legacy_gate_waits_with_async_subscription() {
    let (completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    let mut completion = completion.with_options(EngineOptions {
        legacy_async_gate: true,
        ..EngineOptions::default()
    });
    completion.on_async("$1", |event: &CompletionEvent| {
        event.reply.reply(Answer::deferred(async { vec!["late"] }));
    });

    assert_eq!(completion.generate().await, Settlement::Emitted);
    assert_eq!(buffer.contents(), "late\n");
}

#[tokio::test(start_paused = true)]
async fn test_reply_timeout() {
    let (completion, buffer) = engine("git", &["--compgen", "1", "git", "git "]);
    let mut completion = completion.with_options(EngineOptions {
        reply_timeout: Some(Duration::from_millis(100)),
        ..EngineOptions::default()
    });
    completion.on_async("$1", |event: &CompletionEvent| {
        event.reply.reply(Answer::deferred(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            vec!["too-late"]
        }));
    });

    assert_eq!(completion.init().await, Outcome::Completed);
    assert_eq!(buffer.contents(), "");
}

#[tokio::test]
async fn test_tree_producer_can_defer() {
    let (mut completion, buffer) = engine("npm", &["--compgen", "2", "run", "npm run "]);
    completion.tree(
        CompletionTree::new()
            .subtree("install", CompletionTree::new().leaf("--save", ["--save-dev"]))
            .producer("run", || Answer::deferred(async { vec!["build", "test"] })),
    );

    assert_eq!(completion.generate().await, Settlement::Emitted);
    assert_eq!(buffer.contents(), "build\ntest\n");
}

#[tokio::test]
async fn test_install_prints_hook() {
    let (completion, buffer) = engine("git|g", &["--completion"]);
    let mut completion = completion.with_options(EngineOptions {
        alias_dir: Some(PathBuf::from("/tmp")),
        ..EngineOptions::default()
    });
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();
    completion.next(move || *flag.borrow_mut() = true);

    assert_eq!(completion.init().await, Outcome::Completed);
    assert!(!*ran.borrow());

    let output = buffer.contents();
    assert!(output.starts_with("### git completion - begin. generated by tabhook ###"));
    assert!(output.ends_with("### g completion - end ###\n"));
}

#[tokio::test]
async fn test_install_fish_with_debug() {
    let (completion, buffer) = engine("git", &["--completion-fish", "--debug"]);
    let mut completion = completion.with_options(EngineOptions {
        alias_dir: Some(PathBuf::from("/opt/dev")),
        ..EngineOptions::default()
    });

    assert_eq!(completion.init().await, Outcome::Completed);
    let output = buffer.contents();
    assert!(output.contains("complete -f -c git -a '(_git_completion)'"));
    assert!(output.contains("  alias git=/opt/dev/git"));
}

#[tokio::test]
async fn test_run_mode_runs_main_program() {
    let (mut completion, buffer) = engine("git", &["status"]);
    completion.tree(git_tree());
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();
    completion.next(move || *flag.borrow_mut() = true);

    assert_eq!(completion.init().await, Outcome::Main);
    assert!(*ran.borrow());
    assert_eq!(buffer.contents(), "");
    assert!(!completion.check_install());
}

#[tokio::test]
async fn test_template_names_fragments() {
    let buffer = SharedBuffer::default();
    let mut completion = Completion::from_template(
        "git <action> <branch>",
        CompletionRequest::from_args(["--compgen", "2", "checkout", "git checkout "]),
    )
    .with_output(buffer.clone());
    assert_eq!(completion.fragments(), ["action", "branch"]);

    completion.on("branch", |event: &CompletionEvent| {
        event.reply.reply(vec!["main", "develop"]);
    });

    completion.init().await;
    assert_eq!(buffer.contents(), "main\ndevelop\n");
}

#[tokio::test]
async fn test_callbacks_answer_their_position() {
    let callbacks = vec![
        Callback::words(["install", "run"]),
        Callback::handler(|event: &CompletionEvent| {
            if event.line.starts_with("npm run") {
                vec!["build".to_string()]
            } else {
                Vec::new()
            }
        }),
    ];

    let buffer = SharedBuffer::default();
    let mut completion = Completion::with_callbacks(
        " npm ",
        callbacks,
        CompletionRequest::from_args(["--compgen", "2", "run", "npm run "]),
    )
    .with_output(buffer.clone());
    assert_eq!(completion.identity().primary, "npm");
    assert_eq!(completion.fragments(), ["arg0", "arg1"]);

    completion.init().await;
    assert_eq!(buffer.contents(), "build\n");
}

#[tokio::test]
async fn test_callbacks_first_position() {
    let buffer = SharedBuffer::default();
    let mut completion = Completion::with_callbacks(
        "npm",
        vec![Callback::words(["install", "run"])],
        CompletionRequest::from_args(["--compgen", "1", "npm", "npm i"]),
    )
    .with_output(buffer.clone());

    completion.init().await;
    assert_eq!(buffer.contents(), "install\nrun\n");
}
