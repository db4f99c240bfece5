use news_curator::{
    Article, ChatModel, CuratorError, RelevanceScorer, ScoreResult, ScriptedChatModel,
};
use std::sync::Arc;
use tracing::info;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

fn article(url: &str, title: &str, content: &str) -> Article {
    Article {
        url: url.to_string(),
        title: Some(title.to_string()),
        category: Some("Technology".to_string()),
        description: None,
        content: Some(content.to_string()),
    }
}

fn scorer_with(model: &Arc<ScriptedChatModel>) -> RelevanceScorer {
    let mut scorer = RelevanceScorer::new(Arc::clone(model) as Arc<dyn ChatModel>, 5);
    scorer.set_preferences("HIGH priority: technology.\nTopics to Ignore: sports.");
    scorer
}

#[tokio::test]
async fn empty_input_returns_empty_without_any_call() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    let scorer = scorer_with(&model);

    let results = scorer.score_articles(&[], None).await;

    assert!(results.is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn single_article_bypasses_the_batch_envelope() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    model.push_reply(r#"{"score": 9, "reason": "core tech topic"}"#);
    let scorer = scorer_with(&model);

    let articles = vec![article("https://x/1", "AI chips", "new accelerator")];
    let results = scorer.score_articles(&articles, None).await;

    assert_eq!(results, vec![ScoreResult::new(9, "core tech topic")]);
    assert_eq!(model.calls(), 1);

    let prompts = model.prompts();
    assert!(!prompts[0].contains("--- ARTICLE"));
    assert!(!prompts[0].contains("article_index"));
    assert!(prompts[0].contains("HIGH priority: technology."));
}

#[tokio::test]
async fn batch_results_land_at_their_declared_indices() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    // Entries arrive out of order and one is missing entirely.
    model.push_reply(
        r#"{"results": [
            {"article_index": 1, "score": 8, "reason": "b"},
            {"article_index": 0, "score": 5, "reason": "a"}
        ]}"#,
    );
    let scorer = scorer_with(&model);

    let articles = vec![
        article("https://x/1", "one", "a"),
        article("https://x/2", "two", "b"),
        article("https://x/3", "three", "c"),
    ];
    let results = scorer.score_articles(&articles, None).await;

    assert_eq!(model.calls(), 1);
    assert_eq!(results[0], ScoreResult::new(5, "a"));
    assert_eq!(results[1], ScoreResult::new(8, "b"));
    assert_eq!(
        results[2],
        ScoreResult::floor("Missing from batch response")
    );

    // One call carried the whole envelope.
    let prompts = model.prompts();
    assert!(prompts[0].contains("--- ARTICLE 0 ---"));
    assert!(prompts[0].contains("--- ARTICLE 2 ---"));
}

#[tokio::test]
async fn failed_batch_falls_back_to_one_call_per_article() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    model.push_failure("connection refused");
    model.push_reply(r#"{"score": 7, "reason": "first"}"#);
    model.push_reply(r#"{"score": 3, "reason": "second"}"#);
    model.push_reply("not json");
    let scorer = scorer_with(&model);

    let articles = vec![
        article("https://x/1", "one", "a"),
        article("https://x/2", "two", "b"),
        article("https://x/3", "three", "c"),
    ];
    let results = scorer.score_articles(&articles, None).await;

    // Exactly 1 failed batch call plus 3 fallback calls.
    assert_eq!(model.calls(), 4);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0], ScoreResult::new(7, "first"));
    assert_eq!(results[1], ScoreResult::new(3, "second"));
    // The third fallback reply was malformed and degrades independently.
    assert_eq!(results[2].score, 1);
    assert!(results[2].reason.starts_with("JSON parse error:"));
}

#[tokio::test]
async fn single_path_call_failure_degrades_to_diagnostic_floor() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    model.push_failure("timeout after 60s");
    let scorer = scorer_with(&model);

    let result = scorer
        .analyze_one(&article("https://x/1", "one", "a"), None)
        .await;

    assert_eq!(result.score, 1);
    assert!(result.reason.starts_with("Error analyzing article:"));
    assert!(result.reason.contains("timeout after 60s"));
}

#[tokio::test]
async fn garbled_batch_reply_yields_defaults_not_errors() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    model.push_reply("<<definitely not json>>");
    let scorer = scorer_with(&model);

    let articles = vec![
        article("https://x/1", "one", "a"),
        article("https://x/2", "two", "b"),
    ];
    let results = scorer.score_articles(&articles, None).await;

    assert_eq!(model.calls(), 1);
    assert_eq!(
        results,
        vec![
            ScoreResult::floor("Failed to parse batch response"),
            ScoreResult::floor("Failed to parse batch response"),
        ]
    );
}

#[tokio::test]
async fn chunk_of_one_scores_identically_to_a_direct_single_call() {
    init_tracing();
    let reply = r#"{"score": 8, "reason": "transit coverage"}"#;
    let subject = article("https://x/9", "Light rail opens", "the line opened");

    // Direct single-article call.
    let direct_model = Arc::new(ScriptedChatModel::new());
    direct_model.push_reply(reply);
    let direct = scorer_with(&direct_model)
        .analyze_one(&subject, None)
        .await;

    // The same article arriving as a final chunk of size 1.
    let chunked_model = Arc::new(ScriptedChatModel::new());
    chunked_model.push_reply(reply);
    let chunked = scorer_with(&chunked_model)
        .score_articles(std::slice::from_ref(&subject), None)
        .await;

    assert_eq!(chunked, vec![direct]);
    assert_eq!(direct_model.prompts(), chunked_model.prompts());
}

#[tokio::test]
async fn explicit_preferences_override_the_loaded_document() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    model.push_reply(r#"{"score": 6, "reason": "x"}"#);
    let scorer = scorer_with(&model);

    let articles = vec![article("https://x/1", "one", "a")];
    scorer
        .score_articles(&articles, Some("ONLY weather emergencies"))
        .await;

    let prompts = model.prompts();
    assert!(prompts[0].contains("ONLY weather emergencies"));
    assert!(!prompts[0].contains("HIGH priority: technology."));
}

#[tokio::test]
async fn missing_preferences_file_is_a_hard_error() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    let mut scorer = RelevanceScorer::new(model as Arc<dyn ChatModel>, 5);

    let result = scorer.load_preferences("/definitely/not/a/real/path.md");
    match result {
        Err(CuratorError::PreferencesNotFound { path }) => {
            info!("Got expected error for {}", path);
            assert_eq!(path, "/definitely/not/a/real/path.md");
        }
        other => panic!("expected PreferencesNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn configured_batch_size_is_clamped_into_bounds() {
    init_tracing();
    let model = Arc::new(ScriptedChatModel::new());
    assert_eq!(
        RelevanceScorer::new(Arc::clone(&model) as Arc<dyn ChatModel>, 50).batch_size(),
        10
    );
    assert_eq!(
        RelevanceScorer::new(Arc::clone(&model) as Arc<dyn ChatModel>, 0).batch_size(),
        1
    );
    assert_eq!(
        RelevanceScorer::new(model as Arc<dyn ChatModel>, 5).batch_size(),
        5
    );
}

#[tokio::test]
async fn test_connection_reports_reachability() {
    init_tracing();
    let reachable = Arc::new(ScriptedChatModel::new());
    reachable.push_reply("ok");
    assert!(scorer_with(&reachable).test_connection().await);

    let unreachable = Arc::new(ScriptedChatModel::new());
    unreachable.push_failure("connection refused");
    assert!(!scorer_with(&unreachable).test_connection().await);
}
