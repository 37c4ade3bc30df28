use std::collections::BTreeMap;
use std::sync::Arc;

use euclid_common::models::{EvalMode, EvalReportResponse};
use euclid_db::{ConversationRepository, Database, EvalRunFilter, EvalRunRepository};

fn report(mode: EvalMode, label: &str, tags: &[&str], avg_ms: u64) -> EvalReportResponse {
    EvalReportResponse {
        total_prompts: 3,
        avg_duration_ms: avg_ms,
        visualization_coverage: 0.5,
        avg_checks_pass_rate: 0.75,
        mode,
        run_label: Some(label.to_string()),
        run_tags: tags.iter().map(|t| t.to_string()).collect(),
        timeout_count: 0,
        error_count: 0,
        latency_histogram: BTreeMap::new(),
        results: Vec::new(),
    }
}

#[tokio::test]
async fn test_snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store").join("snapshot.json");

    let conv_id = {
        let db = Arc::new(Database::open(&path).await.unwrap());
        let conversations = ConversationRepository::new(db.clone());
        let conv = conversations.create(Some("Geometry".into()), None).await.unwrap();
        conversations.add_message(&conv.id, "user", "Prove I.47", None).await.unwrap();
        EvalRunRepository::new(db)
            .insert(&report(EvalMode::Catalog, "baseline", &["nightly"], 12))
            .await
            .unwrap();
        conv.id
    };

    let db = Arc::new(Database::open(&path).await.unwrap());
    let full = ConversationRepository::new(db.clone())
        .get_with_messages(&conv_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(full.conversation.title.as_deref(), Some("Geometry"));
    assert_eq!(full.messages.len(), 1);
    assert!(EvalRunRepository::new(db).latest().await.unwrap().is_some());
}

#[tokio::test]
async fn test_eval_history_filters() {
    let repo = EvalRunRepository::new(Arc::new(Database::in_memory()));
    repo.insert(&report(EvalMode::Catalog, "run-a", &["baseline", "catalog"], 10)).await.unwrap();
    repo.insert(&report(EvalMode::Live, "run-b", &["experiment", "live"], 900)).await.unwrap();

    let all = repo.list(&EvalRunFilter { limit: 10, ..Default::default() }).await.unwrap();
    assert_eq!(all.len(), 2);

    let catalog = repo
        .list(&EvalRunFilter {
            mode: Some(EvalMode::Catalog),
            label_contains: Some("RUN-A".into()),
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].run_label.as_deref(), Some("run-a"));

    let tagged = repo
        .list(&EvalRunFilter { tag: Some("live".into()), limit: 10, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].summary().avg_duration_ms, 900);

    let limited = repo.list(&EvalRunFilter { limit: 0, ..Default::default() }).await.unwrap();
    assert_eq!(limited.len(), 1);
}
