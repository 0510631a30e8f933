// ABOUTME: Integration tests for the task tree execution engine
// ABOUTME: Covers event ordering, loops, iteration bindings, error containment and the variable store

use serde_json::json;
use tasktree::engine::{
    ExecutionError, ProgressLog, ProgressStatus, TaskFlowEngine, COUNTER_VAR, ERROR_VAR,
};
use tasktree::parser::{FlowParser, Task, TaskFlow};

mod common;
use common::*;

#[tokio::test]
async fn test_failure_stops_remaining_siblings() {
    let mut engine = failing_click_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![screenshot("a"), click("b"), screenshot("c")];

    let err = engine.execute_task_flow(&tasks, &mut log).await.unwrap_err();

    assert_eq!(err.to_string(), FAILURE_MESSAGE);
    assert_eq!(
        log.trace(),
        vec![start("a"), success("a"), start("b"), error("b")]
    );
    assert_eq!(
        log.events()[3].message,
        format!("Error: {}", FAILURE_MESSAGE)
    );
}

#[tokio::test]
async fn test_nested_blocks_flush_before_parent_success() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![
        if_task(
            "check",
            "true",
            vec![foreach_task("each", "[1, 2]", "n", vec![screenshot("shot")])],
            vec![],
        ),
        screenshot("last"),
    ];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert_eq!(
        log.trace(),
        vec![
            start("check"),
            start("each"),
            start("shot"),
            success("shot"),
            start("shot"),
            success("shot"),
            success("each"),
            success("check"),
            start("last"),
            success("last"),
        ]
    );
}

#[tokio::test]
async fn test_if_selects_branch() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let flow = TaskFlow::new(
        "branches",
        vec![
            if_task("high", "count > 2", vec![screenshot("then")], vec![screenshot("else")]),
            if_task("unknown", "missing > 2", vec![screenshot("then2")], vec![]),
            screenshot("after"),
        ],
    )
    .with_variable("count", 3);

    engine.execute_flow(&flow, &mut log).await.unwrap();

    assert_eq!(
        completed_ids(&log),
        vec!["then", "high", "unknown", "after"]
    );
}

#[tokio::test]
async fn test_while_stops_at_max_iterations() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![while_task("loop", "true", 3, vec![screenshot("body")])];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    let bodies = completed_ids(&log)
        .into_iter()
        .filter(|id| id == "body")
        .count();
    assert_eq!(bodies, 3);
    assert_eq!(engine.variable(COUNTER_VAR), Some(&json!(3)));
}

#[tokio::test]
async fn test_while_rechecks_condition_against_counter() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![while_task("loop", "count < 2", 10, vec![screenshot("body")])];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert_eq!(completed_ids(&log), vec!["body", "body", "loop"]);
    assert_eq!(engine.variable(COUNTER_VAR), Some(&json!(2)));
}

#[tokio::test]
async fn test_while_non_positive_cap_never_runs() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![
        while_task("zero", "true", 0, vec![screenshot("body")]),
        while_task("negative", "true", -1, vec![screenshot("body")]),
    ];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert_eq!(completed_ids(&log), vec!["zero", "negative"]);
    assert_eq!(engine.variable(COUNTER_VAR), Some(&json!(0)));
}

#[tokio::test]
async fn test_while_iteration_is_local() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![
        while_task(
            "loop",
            "true",
            3,
            vec![if_task("second", "iteration === 1", vec![screenshot("hit")], vec![])],
        ),
        if_task("outside", "iteration === 1", vec![screenshot("leak")], vec![]),
    ];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    let hits: Vec<_> = completed_ids(&log)
        .into_iter()
        .filter(|id| id == "hit" || id == "leak")
        .collect();
    assert_eq!(hits, vec!["hit"]);
    assert!(engine.variable("iteration").is_none());
}

#[tokio::test]
async fn test_foreach_binds_item_and_index() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![foreach_task(
        "each",
        "[1,2,3]",
        "x",
        vec![
            if_task("bound", "x === index + 1", vec![screenshot("match")], vec![]),
            if_task("second", "x === 2 && index === 1", vec![screenshot("two")], vec![]),
        ],
    )];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    let ids = completed_ids(&log);
    assert_eq!(ids.iter().filter(|id| *id == "match").count(), 3);
    assert_eq!(ids.iter().filter(|id| *id == "two").count(), 1);

    // Store keeps the last binding after the loop.
    assert_eq!(engine.variable("x"), Some(&json!(3)));
    assert_eq!(engine.variable("index"), Some(&json!(2)));
}

#[tokio::test]
async fn test_foreach_resolves_variable_name() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let flow = TaskFlow::new(
        "by_name",
        vec![
            foreach_task("pages", "pages", "page", vec![screenshot("visit")]),
            foreach_task("absent", "nothing_here", "page", vec![screenshot("never")]),
        ],
    )
    .with_variable("pages", json!(["/", "/about"]));

    engine.execute_flow(&flow, &mut log).await.unwrap();

    assert_eq!(completed_ids(&log), vec!["visit", "visit", "pages", "absent"]);
    assert_eq!(engine.variable("page"), Some(&json!("/about")));
}

#[tokio::test]
async fn test_missing_condition_is_false() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![
        Task::new("branch", "if")
            .with_children(vec![screenshot("then")])
            .with_else_children(vec![screenshot("otherwise")]),
        Task::new("loop", "while")
            .with_config("maxIterations", 5)
            .with_children(vec![screenshot("never")]),
    ];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert_eq!(completed_ids(&log), vec!["otherwise", "branch", "loop"]);
    assert_eq!(engine.variable(COUNTER_VAR), Some(&json!(0)));
}

#[tokio::test]
async fn test_foreach_without_items_iterates_nothing() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let flow = TaskFlow::new(
        "empty_sources",
        vec![
            Task::new("no_items", "foreach").with_children(vec![screenshot("never")]),
            foreach_task("zero", "n", "x", vec![screenshot("never")]),
            foreach_task("blank", "label", "x", vec![screenshot("never")]),
            foreach_task("off", "flag", "x", vec![screenshot("never")]),
        ],
    )
    .with_variable("n", json!(0))
    .with_variable("label", json!(""))
    .with_variable("flag", json!(false));

    engine.execute_flow(&flow, &mut log).await.unwrap();

    assert_eq!(
        completed_ids(&log),
        vec!["no_items", "zero", "blank", "off"]
    );
}

#[tokio::test]
async fn test_foreach_rejects_non_array() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let flow = TaskFlow::new(
        "not_array",
        vec![foreach_task("each", "settings", "s", vec![screenshot("never")])],
    )
    .with_variable("settings", json!({"a": 1}));

    let err = engine.execute_flow(&flow, &mut log).await.unwrap_err();

    assert_eq!(
        err,
        ExecutionError::InvalidIterable {
            task_id: "each".to_string(),
            found: "object".to_string(),
        }
    );
    assert_eq!(log.trace(), vec![start("each"), error("each")]);
}

#[tokio::test]
async fn test_try_absorbs_failure_and_runs_catch() {
    let mut engine = failing_click_engine();
    let mut log = ProgressLog::new();
    let condition = format!("error === '{}'", FAILURE_MESSAGE);
    let tasks = vec![
        try_task(
            "guard",
            vec![screenshot("before"), click("boom"), screenshot("skipped")],
            vec![if_task("check", &condition, vec![screenshot("recovered")], vec![])],
        ),
        screenshot("after"),
    ];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert_eq!(
        log.trace(),
        vec![
            start("guard"),
            start("before"),
            success("before"),
            start("boom"),
            error("boom"),
            start("check"),
            start("recovered"),
            success("recovered"),
            success("check"),
            success("guard"),
            start("after"),
            success("after"),
        ]
    );
    assert_eq!(engine.variable(ERROR_VAR), Some(&json!(FAILURE_MESSAGE)));
}

#[tokio::test]
async fn test_try_catches_failure_from_any_depth() {
    let mut engine = failing_click_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![try_task(
        "guard",
        vec![foreach_task(
            "each",
            "[1]",
            "n",
            vec![if_task("deep", "n === 1", vec![click("boom")], vec![])],
        )],
        vec![],
    )];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert_eq!(log.summary().failed, 3);
    assert_eq!(log.events().last().map(|e| e.task_id.as_str()), Some("guard"));
    assert_eq!(engine.variable(ERROR_VAR), Some(&json!(FAILURE_MESSAGE)));
}

#[tokio::test]
async fn test_try_without_failure_skips_catch() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![try_task("guard", vec![screenshot("ok")], vec![screenshot("catch")])];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert_eq!(completed_ids(&log), vec!["ok", "guard"]);
    assert!(engine.variable(ERROR_VAR).is_none());
}

#[tokio::test]
async fn test_failing_catch_propagates() {
    let mut engine = failing_click_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![
        try_task("guard", vec![click("first")], vec![click("second")]),
        screenshot("never"),
    ];

    let err = engine.execute_task_flow(&tasks, &mut log).await.unwrap_err();

    assert_eq!(err.task_id(), "second");
    assert_eq!(log.trace().last(), Some(&error("guard")));
    assert!(!completed_ids(&log).contains(&"never".to_string()));
}

#[tokio::test]
async fn test_unknown_type_is_fatal_inside_try() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![try_task(
        "guard",
        vec![Task::new("odd", "teleport")],
        vec![screenshot("catch")],
    )];

    let err = engine.execute_task_flow(&tasks, &mut log).await.unwrap_err();

    assert!(matches!(err, ExecutionError::UnknownTaskType { .. }));
    assert_eq!(
        log.trace(),
        vec![start("guard"), start("odd"), error("odd"), error("guard")]
    );
}

#[tokio::test]
async fn test_max_depth_exceeded() {
    let mut engine = instant_engine().with_max_depth(2);
    let mut log = ProgressLog::new();
    let tasks = vec![try_task(
        "d0",
        vec![try_task(
            "d1",
            vec![try_task("d2", vec![screenshot("d3")], vec![])],
            vec![],
        )],
        vec![],
    )];

    let err = engine.execute_task_flow(&tasks, &mut log).await.unwrap_err();

    assert_eq!(
        err,
        ExecutionError::MaxDepthExceeded {
            task_id: "d3".to_string(),
            max_depth: 2,
        }
    );
    assert_eq!(log.summary().failed, 4);
}

#[tokio::test]
async fn test_cancellation_between_tasks() {
    let mut engine = instant_engine();
    let token = engine.cancellation_token();
    engine
        .registry_mut()
        .register(Box::new(CancellingAction { token }));
    let mut log = ProgressLog::new();
    let tasks = vec![try_task(
        "guard",
        vec![screenshot("stop"), Task::new("after", "wait").with_config("duration", 0)],
        vec![],
    )];

    let err = engine.execute_task_flow(&tasks, &mut log).await.unwrap_err();

    assert_eq!(
        err,
        ExecutionError::Cancelled {
            task_id: "after".to_string()
        }
    );
    assert_eq!(
        log.trace(),
        vec![start("guard"), start("stop"), success("stop"), error("guard")]
    );
}

#[tokio::test]
async fn test_store_seeded_with_counter_only() {
    let mut engine = instant_engine();
    engine.set_variable("stale", "value");

    let mut seen = Vec::new();
    {
        let mut reporter = |task_id: &str, _status: ProgressStatus, _message: &str| {
            seen.push(task_id.to_string())
        };
        let tasks = vec![if_task("probe", "stale", vec![screenshot("leak")], vec![])];
        engine
            .execute_task_flow(&tasks, &mut reporter)
            .await
            .unwrap();
    }

    assert_eq!(seen, vec!["probe", "probe"]);
    let vars = engine.variables();
    assert_eq!(vars.len(), 1);
    assert_eq!(vars.get(COUNTER_VAR), Some(&json!(0)));
}

#[tokio::test]
async fn test_snapshot_is_detached() {
    let mut engine = instant_engine();
    engine.set_variable("x", 5);

    let mut snapshot = engine.variables();
    assert_eq!(snapshot.get("x"), Some(&json!(5)));

    snapshot.insert("x".to_string(), json!(99));
    snapshot.insert("y".to_string(), json!(1));

    assert_eq!(engine.variable("x"), Some(&json!(5)));
    assert!(engine.variable("y").is_none());
}

#[tokio::test]
async fn test_get_text_output_visible_to_conditions() {
    let mut engine = instant_engine();
    let mut log = ProgressLog::new();
    let tasks = vec![
        Task::new("read", "get_text")
            .with_config("selector", "#title")
            .with_config("variable", "title"),
        if_task(
            "check",
            "title === 'Simulated text content from #title'",
            vec![screenshot("seen")],
            vec![],
        ),
    ];

    engine.execute_task_flow(&tasks, &mut log).await.unwrap();

    assert!(completed_ids(&log).contains(&"seen".to_string()));
}

#[tokio::test]
async fn test_engines_do_not_share_state() {
    let mut first = instant_engine();
    let mut second = instant_engine();
    let flow_a = TaskFlow::new("a", vec![screenshot("a")]).with_variable("owner", "a");
    let flow_b = TaskFlow::new("b", vec![screenshot("b")]).with_variable("owner", "b");
    let mut log_a = ProgressLog::new();
    let mut log_b = ProgressLog::new();

    let (ra, rb) = tokio::join!(
        first.execute_flow(&flow_a, &mut log_a),
        second.execute_flow(&flow_b, &mut log_b)
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(first.variable("owner"), Some(&json!("a")));
    assert_eq!(second.variable("owner"), Some(&json!("b")));
}

#[tokio::test]
async fn test_yaml_flow_end_to_end() {
    let env = TestEnvironment::new();
    let path = env
        .write_raw(
            "checkout",
            r##"
name: checkout
variables:
  products: ["apple", "pear"]
tasks:
  - id: open
    name: Open shop
    type: open_browser
    config:
      url: https://shop.example.com
  - id: basket
    type: foreach
    config:
      items: products
      itemVar: product
    children:
      - id: add
        type: click_element
        config:
          selector: "#add"
  - id: poll
    type: while
    config:
      condition: "count < 5"
      maxIterations: "2"
    children:
      - id: pause
        type: wait
        config:
          duration: 1
  - id: verify
    type: if
    config:
      condition: "count === 2 && product === 'pear'"
    children:
      - id: done
        type: screenshot
        config:
          filename: done.png
"##,
        )
        .await;

    let flow = FlowParser::new().parse_file(&path).await.unwrap();
    let mut engine: TaskFlowEngine = instant_engine();
    let mut log = ProgressLog::new();

    engine.execute_flow(&flow, &mut log).await.unwrap();

    assert_eq!(log.events()[0].message, "Starting: Open shop");
    assert_eq!(log.events()[2].message, "Starting: basket");
    assert!(completed_ids(&log).contains(&"done".to_string()));
    assert_eq!(log.summary().failed, 0);
}
