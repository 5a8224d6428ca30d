use std::path::Path;
use stepwright_engine::scenario::{load_scenarios, ScenarioError};
use stepwright_engine::step::ActionKind;

const LOGIN_YAML: &str = r#"
scenarios:
  - name: Login
    tags: [smoke]
    steps:
      - Click the login button
      - Type admin into username
      - Type Secret123 into password
      - Click the submit button
      - Verify the dashboard appears
"#;

const SEARCH_YAML: &str = r#"
scenarios:
  - name: Search
    steps:
      - Type rust testing into the search box
      - wait for 2 seconds
      - Verify the results list appears
"#;

#[tokio::test]
async fn loads_a_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("login.yaml");
    tokio::fs::write(&path, LOGIN_YAML).await.unwrap();

    let scenarios = load_scenarios(&path).await.unwrap();
    assert_eq!(scenarios.len(), 1);
    let (scenario, warnings) = &scenarios[0];
    assert!(warnings.is_empty());
    assert_eq!(scenario.name, "Login");
    assert_eq!(scenario.tags, vec!["smoke".to_string()]);
    assert_eq!(scenario.steps.len(), 5);
    assert_eq!(scenario.steps[2].value.as_deref(), Some("Secret123"));
    assert_eq!(scenario.steps[4].action, ActionKind::Verify);
}

#[tokio::test]
async fn loads_a_directory_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("b_search.yaml"), SEARCH_YAML)
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("a_login.yaml"), LOGIN_YAML)
        .await
        .unwrap();
    tokio::fs::write(dir.path().join("notes.txt"), "not a scenario")
        .await
        .unwrap();

    let scenarios = load_scenarios(dir.path()).await.unwrap();
    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[0].0.name, "Login");
    assert_eq!(scenarios[1].0.name, "Search");
}

#[tokio::test]
async fn missing_path_is_not_found() {
    let err = load_scenarios(Path::new("/does/not/exist"))
        .await
        .unwrap_err();
    assert!(matches!(err, ScenarioError::NotFound(_)));
}

#[tokio::test]
async fn broken_yaml_reports_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    tokio::fs::write(&path, "scenarios: [unclosed").await.unwrap();

    let err = load_scenarios(&path).await.unwrap_err();
    match err {
        ScenarioError::Yaml { path: p, .. } => assert_eq!(p, path),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn default_timeout_can_be_reconfigured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("search.yaml");
    tokio::fs::write(&path, SEARCH_YAML).await.unwrap();

    let (mut scenario, _) = load_scenarios(&path).await.unwrap().remove(0);
    scenario.apply_default_timeout(25);
    // The explicit 2-second wait keeps its own timeout.
    assert_eq!(scenario.steps[1].timeout_secs, 2);
    assert_eq!(scenario.steps[0].timeout_secs, 25);
    assert_eq!(scenario.steps[2].timeout_secs, 25);
}
