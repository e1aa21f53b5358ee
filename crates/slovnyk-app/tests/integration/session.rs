//! End-to-end session flows against the loopback server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use slovnyk_app::open_session;
use slovnyk_app::session::{Outcome, WriteResult, FALLBACK_WORD, LAST_HOST_KEY, LAST_PORT_KEY};

use crate::harness::{one, test_config, FakeServer};

#[test]
fn test_connect_remembers_endpoint() {
    let server = FakeServer::dictionary();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let mut session = open_session(&config, None, Some(server.port)).unwrap();
    session.connect();
    assert_eq!(
        one(&mut session),
        Outcome::Connected {
            host: "127.0.0.1".into(),
            port: server.port
        }
    );
    assert!(session.is_connected());
    assert_eq!(session.store().get_setting(LAST_PORT_KEY, ""), server.port.to_string());
    session.shutdown();

    // A fresh session picks the remembered endpoint up.
    let session = open_session(&config, None, None).unwrap();
    assert_eq!(session.client().endpoint().1, server.port);
    assert_eq!(session.store().get_setting(LAST_HOST_KEY, ""), "127.0.0.1");
    session.shutdown();
}

#[test]
fn test_translate_is_formatted_and_recorded() {
    let server = FakeServer::dictionary();
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(server.port)).unwrap();

    assert!(session.translate("  Chicken "));
    let Outcome::Translation(t) = one(&mut session) else {
        panic!("expected a translation");
    };
    assert_eq!(t.query, "chicken");
    assert_eq!(t.headword, "chicken");
    assert_eq!(
        t.formatted,
        "[ NOUN ]\n   a domestic birdchicken\n\n[ VERB ]\n   to chicken out"
    );
    assert!(!t.favorite);

    assert!(session.translate("cat"));
    let Outcome::Translation(t) = one(&mut session) else {
        panic!("expected a translation");
    };
    assert!(t.formatted.starts_with("[ NOUN ]"));
    assert!(t.formatted.contains("[розм.]"));
    assert!(!t.badges.is_empty());

    assert_eq!(session.store().get_history_words(10), vec!["cat", "chicken"]);
    assert_eq!(
        server.received(),
        vec!["TRANSLATE|chicken|".to_string(), "TRANSLATE|cat|".to_string()]
    );
    session.shutdown();
}

#[test]
fn test_not_found_is_not_recorded() {
    let server = FakeServer::dictionary();
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(server.port)).unwrap();

    session.translate("qwerty");
    assert_eq!(one(&mut session), Outcome::NotFound { word: "qwerty".into() });
    assert!(session.store().get_history_words(10).is_empty());
    session.shutdown();
}

#[test]
fn test_headword_spelled_like_a_status() {
    let server = FakeServer::dictionary();
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(server.port)).unwrap();

    session.translate("Error");
    let Outcome::Translation(t) = one(&mut session) else {
        panic!("expected a translation");
    };
    assert_eq!(t.headword, "error");
    assert_eq!(t.formatted, "[ NOUN ]\n   помилка");
    assert_eq!(session.store().get_history_words(10), vec!["error"]);
    session.shutdown();
}

#[test]
fn test_write_verbs_report_status() {
    let server = FakeServer::dictionary();
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(server.port)).unwrap();

    session.add("собака", "dog");
    assert_eq!(
        one(&mut session),
        Outcome::Write {
            verb: "ADD",
            word: "собака".into(),
            result: WriteResult::Done {
                detail: Some("Word added".into())
            },
        }
    );

    session.add_word("cat", "кіт");
    let Outcome::Write { result, .. } = one(&mut session) else {
        panic!("expected a write outcome");
    };
    assert!(matches!(result, WriteResult::Duplicate { .. }));

    session.delete("horse");
    let Outcome::Write { result, .. } = one(&mut session) else {
        panic!("expected a write outcome");
    };
    assert_eq!(
        result,
        WriteResult::Rejected {
            detail: Some("Word not found.".into())
        }
    );

    session.store().add_history("cat", "кіт");
    session.delete("cat");
    let Outcome::Write { result, .. } = one(&mut session) else {
        panic!("expected a write outcome");
    };
    assert!(result.is_done());
    assert!(session.store().get_history_words(10).is_empty());

    session.update("dog", "пес");
    let Outcome::Write { verb, result, .. } = one(&mut session) else {
        panic!("expected a write outcome");
    };
    assert_eq!(verb, "UPDATE");
    assert!(result.is_done());

    assert_eq!(
        server.received(),
        vec![
            "ADD|собака|dog".to_string(),
            "ADD_WORD|cat|кіт".to_string(),
            "DELETE|horse|".to_string(),
            "DELETE|cat|".to_string(),
            "UPDATE|dog|пес".to_string(),
        ]
    );
    session.shutdown();
}

#[test]
fn test_random_word_and_fallback() {
    let server = FakeServer::dictionary();
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(server.port)).unwrap();
    session.random();
    assert_eq!(
        one(&mut session),
        Outcome::WordOfDay {
            headword: "chicken".into(),
            formatted: "[ NOUN ]\n   a domestic bird".into(),
            fallback: false,
        }
    );
    session.shutdown();

    let broken = FakeServer::start(|_| Some("DATABASE_ERROR".into()));
    let mut session = open_session(&test_config(&dir), None, Some(broken.port)).unwrap();
    session.random();
    let Outcome::WordOfDay {
        headword, fallback, ..
    } = one(&mut session)
    else {
        panic!("expected a word of the day");
    };
    assert_eq!(headword, FALLBACK_WORD);
    assert!(fallback);
    session.shutdown();
}

#[test]
fn test_unreachable_server() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(port)).unwrap();

    session.connect();
    assert!(matches!(one(&mut session), Outcome::ConnectFailed { .. }));
    assert_eq!(session.store().get_setting(LAST_PORT_KEY, "none"), "none");

    session.translate("cat");
    assert_eq!(
        one(&mut session),
        Outcome::NoResponse {
            verb: "TRANSLATE",
            word: "cat".into()
        }
    );
    assert!(!session.is_connected());
    session.shutdown();
}

#[test]
fn test_concurrent_lookups_keep_their_words() {
    let server = FakeServer::dictionary();
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(server.port)).unwrap();

    session.translate("cat");
    session.translate("chicken");
    session.translate("qwerty");
    let outcomes = session.drain(crate::harness::WAIT);
    assert_eq!(outcomes.len(), 3);

    for outcome in outcomes {
        match outcome {
            Outcome::Translation(t) => assert_eq!(t.query, t.headword),
            Outcome::NotFound { word } => assert_eq!(word, "qwerty"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(session.pending(), 0);
    session.shutdown();
}

#[test]
fn test_shutdown_does_not_wait_for_silent_server() {
    let server = FakeServer::start(|_| None);
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(&test_config(&dir), None, Some(server.port)).unwrap();
    let client = Arc::clone(session.client());

    session.translate("cat");
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(session.pending(), 1);

    // The worker is inside its 300 ms receive wait holding the connection.
    let started = Instant::now();
    session.shutdown();
    assert!(started.elapsed() < Duration::from_millis(250));
    assert!(client.is_closed());
    assert!(!client.is_connected());
    assert_eq!(server.received(), vec!["TRANSLATE|cat|".to_string()]);
}
