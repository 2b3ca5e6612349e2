#![cfg(unix)]

use expectrl::{Eof, Error as ExpectError, Session};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

const EXPECT_TIMEOUT: Duration = Duration::from_secs(4);
const EXPECT_RETRIES: usize = 3;

#[test]
fn repl_answers_and_exits_on_quit() {
    let (mut session, _home, _state_home) = spawn_app();
    expect_text(&mut session, "you> ");

    session.send_line("2*(3+4)^2").expect("send calc");
    expect_text(&mut session, "[calc] 2*(3+4)**2 = 98");
    expect_text(&mut session, "you> ");

    session.send_line("convert 10 km to mi").expect("send conversion");
    expect_text(&mut session, "[unit] 10.0 kilometer = 6.2137119223733395 mile");

    session.send_line("quit").expect("quit line");
    session.expect(Eof).expect("process exits");
}

#[test]
fn slash_commands_show_history_and_trace() {
    let (mut session, _home, state_home) = spawn_app();
    expect_text(&mut session, "you> ");

    session.send_line("hello there").expect("send chat");
    expect_text(&mut session, "[chat] I can help with:");

    session.send_line("/history 1").expect("history");
    expect_text(&mut session, "[chat] I can help with:");

    session.send_line("/trace").expect("trace");
    expect_text(&mut session, "Trace file: ");

    session.send_line("exit").expect("exit line");
    session.expect(Eof).expect("process exits");

    let content = read_trace_file(&state_home);
    assert!(
        content.contains("[user.in    ] hello there"),
        "trace content:\n{content}"
    );
    assert!(
        content.contains("[reply.chat ] I can help with:"),
        "trace content:\n{content}"
    );
}

#[test]
fn end_of_input_closes_the_session() {
    let (mut session, _home, _state_home) = spawn_app();
    expect_text(&mut session, "you> ");
    session.send_line("1/0").expect("send division");
    expect_text(&mut session, "[chat] ");
    session.send([4u8]).expect("send Ctrl-D");
    session.expect(Eof).expect("process exits");
}

fn spawn_app() -> (Session, TempDir, TempDir) {
    let home = tempfile::tempdir().expect("create HOME tempdir");
    let state_home = tempfile::tempdir().expect("create XDG_STATE_HOME tempdir");

    let mut command = Command::new(binary_path());
    command
        .current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env("XDG_STATE_HOME", state_home.path())
        .env("NO_COLOR", "1")
        .env("ASKBOX_GEOCODING_URL", "http://127.0.0.1:9")
        .env("ASKBOX_WEATHER_URL", "http://127.0.0.1:9")
        .env("ASKBOX_WIKI_URL", "http://127.0.0.1:9");

    let mut session = Session::spawn(command).expect("spawn askbox in PTY");
    session.set_expect_timeout(Some(EXPECT_TIMEOUT));
    (session, home, state_home)
}

fn binary_path() -> String {
    std::env::var("CARGO_BIN_EXE_askbox").unwrap_or_else(|_| "target/debug/askbox".to_string())
}

fn expect_text(session: &mut Session, text: &str) {
    for attempt in 1..=EXPECT_RETRIES {
        match session.expect(text) {
            Ok(_) => return,
            Err(ExpectError::ExpectTimeout) if attempt < EXPECT_RETRIES => continue,
            Err(err) => panic!(
                "failed to match text {:?} on attempt {}: {}",
                text, attempt, err
            ),
        }
    }

    panic!("unreachable: retries exhausted without returning");
}

fn read_trace_file(state_home: &TempDir) -> String {
    let trace_dir: PathBuf = state_home.path().join("askbox").join("traces");
    let mut entries = fs::read_dir(&trace_dir)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", trace_dir.display()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|err| panic!("failed to iterate {}: {err}", trace_dir.display()));
    assert_eq!(
        entries.len(),
        1,
        "expected exactly one trace file in {}",
        trace_dir.display()
    );
    let path = entries.remove(0).path();
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()))
}
