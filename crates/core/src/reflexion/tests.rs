use std::sync::{Arc, Mutex};

use reflexion_model::{ModelMessage, ToolChoice};
use reflexion_test_model::{PresetResponse, TestModelProvider};
use serde_json::{Value, json};

use super::*;
use crate::ErrorKind;
use crate::search::fake::FakeSearch;

fn draft(queries: &[&str]) -> PresetResponse {
    PresetResponse::with_tool_call(
        "call_draft",
        "AnswerQuestion",
        json!({
            "answer": "A first take.",
            "reflection": { "missing": "sources", "superfluous": "nothing" },
            "search_queries": queries,
        }),
    )
}

fn revision(answer: &str, queries: &[&str]) -> PresetResponse {
    PresetResponse::with_tool_call(
        "call_revise",
        "ReviseAnswer",
        json!({
            "answer": answer,
            "reflection": { "missing": "", "superfluous": "" },
            "search_queries": queries,
            "references": ["[1] https://example.com/a"],
        }),
    )
}

fn scripted(responses: Vec<PresetResponse>) -> TestModelProvider {
    let mut provider = TestModelProvider::default();
    for resp in responses {
        provider.add_response(resp);
    }
    provider
}

fn search() -> FakeSearch {
    FakeSearch::with_hits([
        ("a", "https://example.com/a"),
        ("b", "https://example.com/b"),
    ])
}

fn tool_result_ids(history: &ConversationHistory) -> Vec<&str> {
    history
        .messages()
        .iter()
        .filter_map(|msg| match msg {
            Message::ToolResult(result) => Some(result.source_call_id.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_default_run_performs_three_cycles() {
    let provider = scripted(vec![
        draft(&["a"]),
        revision("v1", &[]),
        revision("v2", &[]),
        revision("v3", &[]),
    ]);
    let search = search();
    let agent = ReflexionAgent::builder(provider.clone(), search.clone()).build();
    assert_eq!(agent.max_iterations(), DEFAULT_MAX_ITERATIONS);

    let outcome = agent.invoke("Explain X").await.unwrap();

    assert_eq!(outcome.tool_cycles, DEFAULT_MAX_ITERATIONS + 1);
    assert_eq!(outcome.answer.answer, "v3");
    assert_eq!(provider.remaining(), 0);
    assert_eq!(search.queries(), ["a"]);

    // User, draft, one result, then three revisions.
    let history = &outcome.history;
    assert_eq!(history.len(), 6);
    assert_eq!(history.question(), "Explain X");
    assert_eq!(history.tool_result_count(), 1);
}

#[tokio::test]
async fn test_cycles_follow_max_iterations() {
    for max_iterations in 0..4 {
        let mut responses = vec![draft(&["a"])];
        for i in 0..=max_iterations {
            responses.push(revision(&format!("v{i}"), &[]));
        }
        let provider = scripted(responses);

        let cycles = Arc::new(Mutex::new(vec![]));
        let agent = ReflexionAgent::builder(provider.clone(), search())
            .max_iterations(max_iterations)
            .on_event({
                let cycles = Arc::clone(&cycles);
                move |event| {
                    if let ReflexionEvent::ToolsExecuted { cycle, .. } = event {
                        cycles.lock().unwrap().push(cycle);
                    }
                }
            })
            .build();

        let outcome = agent.invoke("Explain X").await.unwrap();
        assert_eq!(outcome.tool_cycles, max_iterations + 1);
        assert_eq!(provider.remaining(), 0);
        let expected: Vec<_> = (1..=max_iterations + 1).collect();
        assert_eq!(*cycles.lock().unwrap(), expected);
    }
}

#[tokio::test]
async fn test_zero_iterations_stops_after_first_revision() {
    let provider = scripted(vec![draft(&["a", "b"]), revision("final", &[])]);
    let agent = ReflexionAgent::builder(provider.clone(), search())
        .max_iterations(0)
        .build();

    let mut run = agent.start("Explain X");
    assert_eq!(run.step().await.unwrap(), Stage::ExecuteTools);
    assert_eq!(run.step().await.unwrap(), Stage::Revise);
    assert_eq!(run.step().await.unwrap(), Stage::Terminated);
    assert_eq!(run.tool_cycles_completed(), 1);

    // Stepping a terminated run is a no-op.
    assert_eq!(run.step().await.unwrap(), Stage::Terminated);
    assert_eq!(provider.requests().len(), 2);

    let outcome = run.into_outcome().unwrap();
    assert_eq!(outcome.answer.answer, "final");
}

#[tokio::test]
async fn test_cycles_count_batches_not_messages() {
    let provider = scripted(vec![
        draft(&["a", "b"]),
        revision("v1", &[]),
        revision("v2", &[]),
    ]);
    let agent = ReflexionAgent::builder(provider, search())
        .max_iterations(1)
        .build();

    let mut run = agent.start("Explain X");
    run.step().await.unwrap();
    run.step().await.unwrap();

    // Two results from a single batch.
    assert_eq!(run.history().tool_result_count(), 2);
    assert_eq!(run.tool_cycles_completed(), 1);
    assert_eq!(tool_result_ids(run.history()), ["search:1:0", "search:1:1"]);

    // Counting messages would stop here, counting batches goes on.
    assert_eq!(run.step().await.unwrap(), Stage::ExecuteTools);

    // The revision asked for nothing, so this cycle adds no messages but
    // still counts.
    assert_eq!(run.step().await.unwrap(), Stage::Revise);
    assert_eq!(run.history().tool_result_count(), 2);
    assert_eq!(run.tool_cycles_completed(), 2);
    assert_eq!(run.step().await.unwrap(), Stage::Terminated);
}

#[tokio::test]
async fn test_revisions_never_carry_queries() {
    let provider = scripted(vec![
        draft(&["a"]),
        revision("v1", &["c", "d"]),
        revision("v2", &["e"]),
        revision("v3", &[]),
    ]);
    let search = search();
    let outcome = ReflexionAgent::builder(provider, search.clone())
        .build()
        .invoke("Explain X")
        .await
        .unwrap();

    for msg in outcome.history.messages() {
        let Message::Ai(ai) = msg else { continue };
        if let AnswerRecord::Revision(revision) = ai.classify().unwrap() {
            assert!(revision.search_queries.is_empty());
            assert!(ai.search_calls().is_empty());
        }
    }
    assert!(outcome.answer.search_queries.is_empty());
    assert_eq!(search.queries(), ["a"]);
}

#[tokio::test]
async fn test_tool_executor_without_queries() {
    let provider = scripted(vec![draft(&["a"]), revision("v1", &[])]);
    let agent = ReflexionAgent::builder(provider, search())
        .max_iterations(1)
        .build();

    let mut run = agent.start("Explain X");
    run.step().await.unwrap();
    run.step().await.unwrap();
    run.step().await.unwrap();

    let results = agent.tool_executor.execute(run.history()).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_failed_lookup_is_reported() {
    let provider = scripted(vec![draft(&["a", "unknown"]), revision("v1", &[])]);
    let agent = ReflexionAgent::builder(provider, search())
        .max_iterations(0)
        .build();

    let outcome = agent.invoke("Explain X").await.unwrap();

    let payloads: Vec<Value> = outcome
        .history
        .messages()
        .iter()
        .filter_map(|msg| match msg {
            Message::ToolResult(result) => {
                Some(serde_json::from_str(&result.payload).unwrap())
            }
            _ => None,
        })
        .collect();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0]["query"], "a");
    assert_eq!(payloads[0]["results"][0]["url"], "https://example.com/a");
    assert_eq!(payloads[1]["query"], "unknown");
    assert!(payloads[1]["error"].as_str().unwrap().contains("unknown"));
}

#[tokio::test]
async fn test_responder_failure_keeps_history() {
    let provider = scripted(vec![draft(&["a"]).with_failures(0)]);
    let agent = ReflexionAgent::builder(provider, search()).build();

    let mut run = agent.start("Explain X");
    let err = run.step().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalCallFailure);
    assert_eq!(run.stage(), Stage::Draft);
    assert_eq!(run.history().len(), 1);
    assert!(matches!(run.history().messages()[0], Message::User(_)));
}

#[tokio::test]
async fn test_revisor_failure_keeps_tool_results() {
    let provider = scripted(vec![
        draft(&["a"]),
        revision("v1", &[]).with_failures(0),
    ]);
    let agent = ReflexionAgent::builder(provider, search()).build();

    let mut run = agent.start("Explain X");
    assert_eq!(run.step().await.unwrap(), Stage::ExecuteTools);
    assert_eq!(run.step().await.unwrap(), Stage::Revise);
    let err = run.step().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ExternalCallFailure);
    assert_eq!(run.stage(), Stage::Revise);
    assert_eq!(run.tool_cycles_completed(), 1);
    assert_eq!(run.history().len(), 3);
    assert_eq!(tool_result_ids(run.history()), ["search:1:0"]);
}

#[tokio::test]
async fn test_draft_with_extra_fields_is_accepted() {
    let provider = scripted(vec![
        PresetResponse::with_tool_call(
            "call_draft",
            "AnswerQuestion",
            json!({
                "answer": "A first take.",
                "reflection": { "missing": "sources", "superfluous": "" },
                "search_queries": ["a"],
                "references": [],
            }),
        ),
        revision("final", &[]),
    ]);
    let agent = ReflexionAgent::builder(provider, search())
        .max_iterations(0)
        .build();

    let mut run = agent.start("Explain X");
    run.step().await.unwrap();
    let draft = run.history().last_ai_message().unwrap();
    assert!(matches!(draft.classify(), Ok(AnswerRecord::Draft(_))));
    assert_eq!(draft.search_calls().len(), 1);

    while run.stage() != Stage::Terminated {
        run.step().await.unwrap();
    }
    assert_eq!(run.into_outcome().unwrap().answer.answer, "final");
}

#[tokio::test]
async fn test_invalid_draft_is_a_schema_mismatch() {
    let provider = scripted(vec![draft(&[])]);
    let agent = ReflexionAgent::builder(provider, search()).build();

    let err = agent.invoke("Explain X").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
}

#[tokio::test]
async fn test_classification_is_stable() {
    let provider = scripted(vec![draft(&["a"]), revision("final", &[])]);
    let outcome = ReflexionAgent::builder(provider, search())
        .max_iterations(0)
        .build()
        .invoke("Explain X")
        .await
        .unwrap();

    let last = outcome.history.last_ai_message().unwrap();
    let first = last.classify().unwrap();
    let second = last.classify().unwrap();
    assert_eq!(first, second);
    assert_eq!(first, AnswerRecord::Revision(outcome.answer.clone()));
}

#[tokio::test]
async fn test_unfinished_run_has_no_outcome() {
    let provider = scripted(vec![draft(&["a"])]);
    let agent = ReflexionAgent::builder(provider, search()).build();

    let mut run = agent.start("Explain X");
    run.step().await.unwrap();
    let err = run.into_outcome().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ClassificationFailure);
}

#[tokio::test]
async fn test_requests_sent_to_the_model() {
    let provider = scripted(vec![draft(&["a"]), revision("final", &[])]);
    ReflexionAgent::builder(provider.clone(), search())
        .max_iterations(0)
        .build()
        .invoke("Explain X")
        .await
        .unwrap();

    let requests = provider.requests();
    assert_eq!(
        requests[0].tool_choice,
        ToolChoice::Function("AnswerQuestion".to_owned())
    );
    assert_eq!(
        requests[1].tool_choice,
        ToolChoice::Function("ReviseAnswer".to_owned())
    );

    // System, question, draft with its call, the result, postamble.
    let messages = &requests[1].messages;
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[1], ModelMessage::User("Explain X".to_owned()));
    let ModelMessage::AssistantToolCalls { tool_calls, .. } = &messages[2]
    else {
        panic!("expected the draft with its search calls");
    };
    let ModelMessage::Tool(result) = &messages[3] else {
        panic!("expected a search result");
    };
    assert_eq!(result.id, tool_calls[0].id);
}
