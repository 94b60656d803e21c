mod support;

use assert_cmd::Command;
use predicates::str::contains;

use support::TestDeck;

#[test]
fn taskdeck_help_works() {
    Command::cargo_bin("taskdeck")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage: taskdeck"))
        .stdout(contains("Kanban board"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "task",
        "project",
        "board",
        "calendar",
        "timeline",
        "dashboard",
        "export",
        "import",
        "settings",
        "notify",
        "auth",
        "sync",
        "watch",
        "serve",
        "migrate",
    ];

    for cmd in subcommands {
        Command::cargo_bin("taskdeck")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn empty_deck_lists_nothing() {
    let deck = TestDeck::new();
    let value = deck.json(&["task", "list"]);
    assert_eq!(value["schema_version"], "taskdeck.v1");
    assert_eq!(value["command"], "task list");
    assert_eq!(value["status"], "success");
    assert_eq!(value["data"]["total"].as_u64(), Some(0));

    deck.cmd()
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(contains("Tasks (0)"))
        .stdout(contains("taskdeck task new <title>"));
}

#[test]
fn quiet_suppresses_human_output() {
    let deck = TestDeck::new();
    deck.cmd()
        .args(["--quiet", "task", "new", "Silent"])
        .assert()
        .success()
        .stdout("");
}
