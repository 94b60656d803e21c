mod support;

use predicates::str::contains;
use serde_json::Value;

use support::TestDeck;

fn calendar_day<'a>(calendar: &'a Value, date: &str) -> &'a Value {
    calendar["data"]["weeks"]
        .as_array()
        .expect("weeks")
        .iter()
        .flat_map(|week| week.as_array().expect("week").iter())
        .find(|day| day["date"] == date)
        .expect("day in grid")
}

#[test]
fn website_design_mock_scenario() {
    let deck = TestDeck::new();
    let project_id = deck.new_project("Website");
    let task_id = deck.new_task(&["Design mock", "--project", "Website", "--due", "2024-01-01"]);

    let task = deck.json(&["task", "show", &task_id]);
    assert_eq!(task["data"]["projectId"], project_id.as_str());
    assert_eq!(task["data"]["status"], "Todo");

    let board = deck.json(&["board"]);
    let todo = &board["data"]["columns"][0];
    assert_eq!(todo["status"], "Todo");
    assert_eq!(todo["count"].as_u64(), Some(1));
    assert_eq!(todo["lanes"][0]["cards"][0]["title"], "Design mock");
    assert_eq!(todo["lanes"][0]["cards"][0]["project"], "Website");

    let calendar = deck.json(&["calendar", "--month", "2024-01"]);
    let day = calendar_day(&calendar, "2024-01-01");
    assert_eq!(day["in_month"], true);
    assert_eq!(day["tasks"][0]["title"], "Design mock");

    let on_due_date = deck.json(&["dashboard", "--today", "2024-01-01"]);
    assert_eq!(on_due_date["data"]["overdue"].as_array().map(Vec::len), Some(0));

    let after = deck.json(&["dashboard", "--today", "2024-01-02"]);
    let overdue = after["data"]["overdue"].as_array().expect("overdue");
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["title"], "Design mock");
    assert_eq!(overdue[0]["project"], "Website");

    deck.json(&["task", "move", &task_id, "done"]);
    let done = deck.json(&["dashboard", "--today", "2024-01-02"]);
    assert_eq!(done["data"]["overdue"].as_array().map(Vec::len), Some(0));
    assert_eq!(done["data"]["completion"].as_f64(), Some(1.0));
}

#[test]
fn move_reports_transition_and_noop() {
    let deck = TestDeck::new();
    let task_id = deck.new_task(&["Design mock"]);
    let before = deck.json(&["task", "show", &task_id]);

    let moved = deck.json(&["task", "move", &task_id, "Done"]);
    assert_eq!(moved["data"]["from"], "Todo");
    assert_eq!(moved["data"]["to"], "Done");
    assert_eq!(moved["data"]["changed"], true);
    assert_ne!(moved["data"]["task"]["updatedAt"], before["data"]["updatedAt"]);

    let again = deck.json(&["task", "move", &task_id, "done"]);
    assert_eq!(again["data"]["changed"], false);
    assert_eq!(again["data"]["task"]["updatedAt"], moved["data"]["task"]["updatedAt"]);

    deck.cmd()
        .args(["task", "move", &task_id, "in-progress"])
        .assert()
        .success()
        .stdout(contains("Moved Design mock to In Progress"));
}

#[test]
fn empty_title_is_rejected_and_nothing_is_saved() {
    let deck = TestDeck::new();
    deck.cmd()
        .args(["task", "new", "   "])
        .assert()
        .code(2)
        .stderr(contains("title cannot be empty"));

    let list = deck.json(&["task", "list"]);
    assert_eq!(list["data"]["total"].as_u64(), Some(0));

    let task_id = deck.new_task(&["Keep me"]);
    deck.cmd()
        .args(["task", "edit", &task_id, "--title", ""])
        .assert()
        .code(2);
    let task = deck.json(&["task", "show", &task_id]);
    assert_eq!(task["data"]["title"], "Keep me");
}

#[test]
fn deleting_a_project_unassigns_its_tasks() {
    let deck = TestDeck::new();
    let project_id = deck.new_project("Website");
    let other_id = deck.new_project("Mobile");
    let a = deck.new_task(&["Design mock", "--project", &project_id]);
    let b = deck.new_task(&["Copy", "--project", "website"]);
    let c = deck.new_task(&["App icon", "--project", "Mobile"]);

    let deleted = deck.json(&["project", "delete", "Website"]);
    let detached: Vec<&str> = deleted["data"]["detached_tasks"]
        .as_array()
        .expect("detached")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(detached, vec![a.as_str(), b.as_str()]);

    let list = deck.json(&["task", "list"]);
    assert_eq!(list["data"]["total"].as_u64(), Some(3));
    for task in list["data"]["tasks"].as_array().expect("tasks") {
        if task["id"] == c.as_str() {
            assert_eq!(task["projectId"], other_id.as_str());
        } else {
            assert_eq!(task["projectId"], "");
        }
    }

    let projects = deck.json(&["project", "list"]);
    assert_eq!(projects["data"]["total"].as_u64(), Some(1));
}

#[test]
fn unknown_project_is_not_found() {
    let deck = TestDeck::new();
    let output = deck
        .cmd()
        .args(["task", "new", "Orphan", "--project", "Nowhere", "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output).expect("error envelope");
    assert_eq!(value["status"], "error");
    assert_eq!(value["command"], "task new");
    assert_eq!(value["error"]["code"].as_i64(), Some(2));
    assert_eq!(value["next_steps"][0], "taskdeck project list");
}

#[test]
fn board_filters_and_swimlanes() {
    let deck = TestDeck::new();
    deck.new_project("Website");
    deck.new_task(&["Design mock", "--project", "Website", "--assignee", "ana"]);
    deck.new_task(&["Deploy", "--assignee", "bo", "--status", "in-progress"]);
    deck.new_task(&["Write copy", "--assignee", "ana", "--priority", "high"]);

    let ana = deck.json(&["board", "--assignee", "ANA"]);
    let todo = &ana["data"]["columns"][0];
    assert_eq!(todo["count"].as_u64(), Some(2));

    let search = deck.json(&["board", "--search", "deploy"]);
    assert_eq!(search["data"]["columns"][0]["count"].as_u64(), Some(0));
    assert_eq!(search["data"]["columns"][1]["status"], "In Progress");
    assert_eq!(search["data"]["columns"][1]["count"].as_u64(), Some(1));

    let lanes = deck.json(&["board", "--swimlane", "assignee"]);
    assert_eq!(lanes["data"]["swimlane"], "assignee");
    let todo_lanes = lanes["data"]["columns"][0]["lanes"].as_array().expect("lanes");
    assert_eq!(todo_lanes.len(), 1);
    assert_eq!(todo_lanes[0]["label"], "ana");
}

#[test]
fn comments_use_the_resolved_author() {
    let deck = TestDeck::new();
    let task_id = deck.new_task(&["Design mock"]);

    let first = deck.json(&["task", "comment", &task_id, "looks good", "--author", "ana"]);
    assert_eq!(first["data"]["comments"][0]["author"], "ana");

    let output = deck
        .cmd()
        .env("TASKDECK_AUTHOR", "bo")
        .args(["task", "comment", &task_id, "ship it", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let second: Value = serde_json::from_slice(&output).expect("json");
    assert_eq!(second["data"]["comments"][1]["author"], "bo");

    let third = deck.json(&["task", "comment", &task_id, "done"]);
    assert_eq!(third["data"]["comments"][2]["author"], "anonymous");
}

#[test]
fn attachments_are_inlined_while_signed_out() {
    let deck = TestDeck::new();
    let task_id = deck.new_task(&["Design mock"]);
    let file = deck.write_file("notes.txt", "hello");

    let value = deck.json(&["task", "attach", &task_id, file.to_str().expect("utf-8 path")]);
    let attachment = &value["data"]["attachments"][0];
    assert_eq!(attachment["name"], "notes.txt");
    assert_eq!(attachment["size"].as_u64(), Some(5));
    assert_eq!(attachment["url"], "data:text/plain;base64,aGVsbG8=");
    assert!(value["warnings"][0]
        .as_str()
        .expect("warning")
        .contains("not signed in"));
}

#[test]
fn timeline_lists_projects_with_milestones() {
    let deck = TestDeck::new();
    deck.json(&[
        "project",
        "new",
        "Website",
        "--start",
        "2024-01-01",
        "--end",
        "2024-01-31",
        "--milestone",
        "2024-01-15 - Beta",
    ]);
    let value = deck.json(&["timeline"]);
    let row = &value["data"]["rows"][0];
    assert_eq!(row["name"], "Website");
    assert_eq!(row["milestones"][0]["title"], "Beta");
    assert_eq!(value["data"]["range"][0], "2024-01-01");
    assert_eq!(value["data"]["range"][1], "2024-01-31");
}
