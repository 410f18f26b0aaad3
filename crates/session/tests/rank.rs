//! Tests for event ranking.

use papilio_session::{
    AssistantConfig, Error, EventSummary, SessionManager,
    testing::{ScriptedLoader, ScriptedModel},
};

async fn ready(model: ScriptedModel) -> SessionManager<ScriptedLoader> {
    let session = SessionManager::new(ScriptedLoader::new(model), AssistantConfig::default());
    session.ensure_loaded(|_| {}).await.unwrap();
    session
}

fn events() -> Vec<EventSummary> {
    vec![
        EventSummary::new("1", "Water the plants"),
        EventSummary::new("2", "Quarterly tax filing"),
        EventSummary::new("3", "Team offsite"),
    ]
}

#[tokio::test]
async fn ranks_from_fenced_reply() {
    let model = ScriptedModel::new(["```json\n", r#"["2", "3", "1"]"#, "\n```"]);
    let session = ready(model.clone()).await;

    let ranked = session.rank_events(&events()).await.unwrap();
    assert_eq!(ranked, vec!["2", "3", "1"]);

    let prompt = &model.requests()[0].messages[0].content;
    assert!(prompt.contains("- ID: 2, Title: Quarterly tax filing"));
}

#[tokio::test]
async fn empty_list_skips_model() {
    let model = ScriptedModel::new(["[]"]);
    let session = SessionManager::new(ScriptedLoader::new(model.clone()), AssistantConfig::default());

    assert!(session.rank_events(&[]).await.unwrap().is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn malformed_reply_is_an_inference_error() {
    let model = ScriptedModel::new(["Event 2 matters most."]);
    let session = ready(model).await;

    let err = session.rank_events(&events()).await.unwrap_err();
    assert!(matches!(err, Error::ModelInference(_)));
}

#[tokio::test]
async fn rank_before_ready_is_unavailable() {
    let model = ScriptedModel::new(["[\"1\"]"]);
    let session = SessionManager::new(ScriptedLoader::new(model.clone()), AssistantConfig::default());

    let err = session.rank_events(&events()).await.unwrap_err();
    assert!(matches!(err, Error::Unavailable));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn engine_failure_is_an_inference_error() {
    let model = ScriptedModel::failing_after(["[\"1\"]"], 0);
    let session = ready(model).await;

    let err = session.rank_events(&events()).await.unwrap_err();
    assert!(matches!(err, Error::ModelInference(_)));
}
