//! Dispatcher behaviour: sessions, authorization, delivery, restart

use matbot_core::{Inbound, MediaReference, Outbound, Rejection, SessionState, UNRECOGNIZED_REPLY};
use matbot_test_utils::{
    setup_test_bot, setup_test_bot_with_admins, task, RecordingSink, Sent, ADMIN, OTHER_ADMIN,
    STUDENT,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn accept_without_session_is_rejected() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;

    let err = d.accept_upload(ADMIN, "document", "X").unwrap_err();

    assert!(matches!(err, Rejection::NoActiveSession));
    assert!(d.store().list_non_empty().is_empty());
    assert!(!bot.data_file().exists());
}

#[test]
fn invalid_begin_leaves_session_untouched() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;
    d.begin_upload(ADMIN, Some("4")).unwrap();

    for bad in ["abc", "0", "20", "-1", "4.5"] {
        let err = d.begin_upload(ADMIN, Some(bad)).unwrap_err();
        assert!(err.is_validation(), "{bad} should be a validation error");
        assert_eq!(d.sessions().state(ADMIN), SessionState::AwaitingFile(task(4)));
    }
}

#[test]
fn rebind_sends_files_to_latest_task() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;

    d.begin_upload(ADMIN, Some("5")).unwrap();
    d.begin_upload(ADMIN, Some("7")).unwrap();
    assert_eq!(d.accept_upload(ADMIN, "document", "X").unwrap(), task(7));

    assert_eq!(d.store().get(task(7)), vec![MediaReference::document("X")]);
    assert!(d.store().get(task(5)).is_empty());
}

#[test]
fn session_accepts_many_files_until_done() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;

    d.begin_upload(ADMIN, Some("2")).unwrap();
    d.accept_upload(ADMIN, "document", "d1").unwrap();
    d.accept_upload(ADMIN, "video", "v1").unwrap();
    d.accept_upload(ADMIN, "audio", "a1").unwrap();
    d.finish_upload(ADMIN);

    assert_eq!(d.sessions().state(ADMIN), SessionState::Idle);
    assert_eq!(
        d.store().get(task(2)),
        vec![
            MediaReference::document("d1"),
            MediaReference::video("v1"),
            MediaReference::audio("a1"),
        ]
    );
    assert!(matches!(
        d.accept_upload(ADMIN, "document", "late"),
        Err(Rejection::NoActiveSession)
    ));
}

#[test]
fn finish_is_idempotent() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;

    d.finish_upload(ADMIN);
    d.finish_upload(STUDENT);
    assert_eq!(d.sessions().active_count(), 0);

    let response = d.handle(ADMIN, Inbound::Done);
    assert_eq!(response.text(), Some("Upload mode finished."));
}

#[test]
fn unknown_media_kind_keeps_session() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;
    d.begin_upload(ADMIN, Some("9")).unwrap();

    let err = d.accept_upload(ADMIN, "photo", "p1").unwrap_err();

    assert!(err.is_validation());
    assert_eq!(d.sessions().state(ADMIN), SessionState::AwaitingFile(task(9)));
    assert!(d.store().get(task(9)).is_empty());
}

#[test]
fn concurrent_admins_upload_to_their_own_tasks() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;

    d.begin_upload(ADMIN, Some("1")).unwrap();
    d.begin_upload(OTHER_ADMIN, Some("19")).unwrap();
    d.accept_upload(OTHER_ADMIN, "audio", "o1").unwrap();
    d.accept_upload(ADMIN, "document", "a1").unwrap();

    assert_eq!(d.store().get(task(1)), vec![MediaReference::document("a1")]);
    assert_eq!(d.store().get(task(19)), vec![MediaReference::audio("o1")]);
}

#[test]
fn non_admin_cannot_begin_or_list() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;
    d.begin_upload(ADMIN, Some("3")).unwrap();
    d.accept_upload(ADMIN, "document", "secret").unwrap();

    assert!(d.begin_upload(STUDENT, Some("3")).unwrap_err().is_forbidden());
    assert_eq!(d.sessions().state(STUDENT), SessionState::Idle);

    assert!(d.inventory(STUDENT).unwrap_err().is_forbidden());
    let response = d.handle(STUDENT, Inbound::List);
    let text = response.text().unwrap();
    assert_eq!(text, "You do not have administrator rights.");
    assert!(!text.contains("Task 3"));
}

#[test]
fn inventory_lists_counts_in_task_order() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;

    d.begin_upload(ADMIN, Some("12")).unwrap();
    d.accept_upload(ADMIN, "video", "v").unwrap();
    d.begin_upload(ADMIN, Some("3")).unwrap();
    d.accept_upload(ADMIN, "document", "d1").unwrap();
    d.accept_upload(ADMIN, "document", "d2").unwrap();

    let inventory = d.inventory(ADMIN).unwrap();
    assert_eq!(inventory.tasks, vec![(task(3), 2), (task(12), 1)]);
    assert_eq!(
        d.handle(ADMIN, Inbound::List).text(),
        Some("Tasks with materials:\nTask 3: 2 file(s)\nTask 12: 1 file(s)")
    );
}

#[test]
fn admin_set_is_fixed_per_process() {
    let bot = setup_test_bot_with_admins(&[ADMIN, OTHER_ADMIN]);
    assert!(bot.dispatcher.is_admin(ADMIN));
    assert!(bot.dispatcher.is_admin(OTHER_ADMIN));
    assert!(!bot.dispatcher.is_admin(STUDENT));

    let bot = bot.restart(&[OTHER_ADMIN]);
    assert!(!bot.dispatcher.is_admin(ADMIN));
    assert!(bot.dispatcher.is_admin(OTHER_ADMIN));
    assert_eq!(
        bot.dispatcher.handle(ADMIN, Inbound::CheckMe).text(),
        Some("You are not an administrator.")
    );
}

#[test]
fn restart_keeps_acknowledged_uploads() {
    let bot = setup_test_bot();
    bot.dispatcher.begin_upload(ADMIN, Some("6")).unwrap();
    bot.dispatcher.accept_upload(ADMIN, "document", "d1").unwrap();
    bot.dispatcher.accept_upload(ADMIN, "audio", "a1").unwrap();

    let bot = bot.restart(&[ADMIN]);

    assert_eq!(
        bot.dispatcher.store().get(task(6)),
        vec![MediaReference::document("d1"), MediaReference::audio("a1")]
    );
    // sessions are not durable
    assert_eq!(bot.dispatcher.sessions().state(ADMIN), SessionState::Idle);
}

#[test]
fn persistence_failure_is_not_acknowledged() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;
    d.begin_upload(ADMIN, Some("8")).unwrap();

    // a directory in place of the data file makes the final rename fail
    std::fs::create_dir(bot.data_file()).unwrap();
    std::fs::write(bot.data_file().join("keep"), b"").unwrap();

    let response = d.handle(ADMIN, Inbound::media("document", "d1"));

    assert_eq!(
        response.text(),
        Some("Could not save the file, please try again later.")
    );
    assert!(d.store().get(task(8)).is_empty());
    assert_eq!(d.sessions().state(ADMIN), SessionState::AwaitingFile(task(8)));
}

#[test]
fn media_without_session_is_unrecognized_input() {
    let bot = setup_test_bot();
    let response = bot
        .dispatcher
        .handle(ADMIN, Inbound::media("document", "d1"));
    assert_eq!(response.text(), Some(UNRECOGNIZED_REPLY));

    let response = bot.dispatcher.handle(STUDENT, Inbound::from_text("hello"));
    assert_eq!(response.text(), Some(UNRECOGNIZED_REPLY));
}

#[test]
fn media_racing_done_is_added_or_unrecognized() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;
    let added = "File added to task 6. Send another file or /done to finish.";

    let replies = std::thread::scope(|s| {
        let toggler = s.spawn(|| {
            for _ in 0..200 {
                d.begin_upload(ADMIN, Some("6")).unwrap();
                d.finish_upload(ADMIN);
            }
        });
        let sender = s.spawn(|| {
            (0..200)
                .map(|i| {
                    d.handle(ADMIN, Inbound::media("audio", format!("a{i}")))
                        .text()
                        .map(str::to_string)
                })
                .collect::<Vec<_>>()
        });
        toggler.join().unwrap();
        sender.join().unwrap()
    });

    for reply in &replies {
        let reply = reply.as_deref();
        assert!(
            reply == Some(added) || reply == Some(UNRECOGNIZED_REPLY),
            "unexpected reply {reply:?}"
        );
    }
    let acknowledged = replies.iter().filter(|r| r.as_deref() == Some(added)).count();
    assert_eq!(d.store().get(task(6)).len(), acknowledged);
}

#[test]
fn add_command_replies() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;

    let text = d.handle(ADMIN, Inbound::from_text("/add 5"));
    assert!(text.text().unwrap().contains("task 5"));

    let usage = d.handle(ADMIN, Inbound::from_text("/add five"));
    assert_eq!(
        usage.text(),
        Some("Usage: /add <task number> (for example: /add 5)")
    );

    let range = d.handle(ADMIN, Inbound::from_text("/add 42"));
    assert_eq!(range.text(), Some("Task number must be between 1 and 19."));

    let forbidden = d.handle(STUDENT, Inbound::from_text("/add 5"));
    assert_eq!(forbidden.text(), Some("You do not have administrator rights."));
}

#[test]
fn empty_task_has_no_materials() {
    let bot = setup_test_bot();
    let response = bot.dispatcher.handle(STUDENT, Inbound::from_selection("task_14"));
    assert_eq!(response.text(), Some("No materials for task 14 yet."));
}

#[tokio::test]
async fn partial_delivery_failure_is_aggregated() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;
    d.begin_upload(ADMIN, Some("5")).unwrap();
    d.accept_upload(ADMIN, "document", "d1").unwrap();
    d.accept_upload(ADMIN, "video", "v1").unwrap();
    d.accept_upload(ADMIN, "audio", "a1").unwrap();
    d.finish_upload(ADMIN);

    let response = d.handle(STUDENT, Inbound::SelectTask(task(5)));
    assert!(matches!(response.effects(), [Outbound::Deliver(_)]));

    let sink = RecordingSink::failing_on(&["v1"]);
    let reports = response.realize(&sink).await;

    assert_eq!(
        sink.media(),
        vec![
            MediaReference::document("d1"),
            MediaReference::video("v1"),
            MediaReference::audio("a1"),
        ]
    );
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].attempted, 3);
    assert_eq!(reports[0].delivered(), 2);
    assert_eq!(
        sink.texts(),
        vec!["Could not send 1 of 3 files for task 5.".to_string()]
    );
}

#[tokio::test]
async fn clean_delivery_sends_no_warning() {
    let bot = setup_test_bot();
    let d = &bot.dispatcher;
    d.begin_upload(ADMIN, Some("1")).unwrap();
    d.accept_upload(ADMIN, "document", "d1").unwrap();

    let sink = RecordingSink::new();
    d.handle(STUDENT, Inbound::from_selection("task_1"))
        .realize(&sink)
        .await;

    assert_eq!(sink.attempts(), vec![Sent::Media(MediaReference::document("d1"))]);
}

#[tokio::test]
async fn start_menu_reaches_sink() {
    let bot = setup_test_bot();
    let sink = RecordingSink::new();

    bot.dispatcher
        .handle(STUDENT, Inbound::from_text("/start"))
        .realize(&sink)
        .await;

    match sink.attempts().as_slice() {
        [Sent::Menu { tasks, .. }] => assert_eq!(tasks.len(), 19),
        other => panic!("unexpected sends: {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_rejected_begin_never_changes_session(arg in "\\PC{0,6}") {
        let bot = setup_test_bot();
        let d = &bot.dispatcher;
        d.begin_upload(ADMIN, Some("10")).unwrap();

        match d.begin_upload(ADMIN, Some(&arg)) {
            Ok(t) => prop_assert_eq!(d.sessions().state(ADMIN), SessionState::AwaitingFile(t)),
            Err(_) => prop_assert_eq!(
                d.sessions().state(ADMIN),
                SessionState::AwaitingFile(task(10))
            ),
        }
    }
}
