// tests/pipeline_flow.rs
//
// End-to-end intake pipeline with in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use idea_scorer::calibration::{CalibrationStore, MemoryStore};
use idea_scorer::extract::{DisabledExtractor, MockExtractor, ParamExtractor};
use idea_scorer::intake::{QaPair, Rejection};
use idea_scorer::pipeline::{render_chat_reply, IdeaPipeline, IdeaRequest, Outcome};
use idea_scorer::results::ResultLog;
use idea_scorer::score::{RawParams, ScoreEngine, ScoreMode, WeightVector};

const IDEA: &str = "A marketplace where neighbours swap house plants and cuttings.";

struct Parts {
    store: Arc<MemoryStore>,
    results: Arc<ResultLog>,
    pipeline: IdeaPipeline,
}

fn build(extractor: Arc<dyn ParamExtractor>) -> Parts {
    let store = Arc::new(MemoryStore::default());
    let engine = Arc::new(ScoreEngine::new(
        Arc::new(WeightVector::default()),
        store.clone(),
    ));
    let results = Arc::new(ResultLog::with_capacity(50));
    let pipeline = IdeaPipeline::new(engine, extractor, results.clone());
    Parts {
        store,
        results,
        pipeline,
    }
}

/// Counts calls and never answers.
struct MustNotCall(AtomicUsize);

#[async_trait]
impl ParamExtractor for MustNotCall {
    async fn extract(&self, _idea: &str, _answers: &[QaPair]) -> Option<RawParams> {
        self.0.fetch_add(1, Ordering::SeqCst);
        None
    }
    fn provider_name(&self) -> &'static str {
        "must-not-call"
    }
}

fn answer(id: &str, value: &str) -> QaPair {
    QaPair {
        id: Some(id.to_string()),
        question: String::new(),
        answer: value.to_string(),
    }
}

#[tokio::test]
async fn single_shot_inference_scores_and_logs() {
    let p = build(Arc::new(MockExtractor::default()));
    let out = p.pipeline.run(&IdeaRequest::new(IDEA)).await;

    match &out {
        Outcome::Scored {
            result,
            calibrated,
            feedback,
        } => {
            assert_eq!(result.score, "99.9%");
            assert_eq!(result.mode, ScoreMode::Adaptive);
            assert_eq!(result.provider, "mock");
            assert_eq!(result.inputs.reach, 5000);
            assert_eq!(*calibrated, Some(false));
            assert!(feedback.is_none(), "feedback is off by default");
        }
        other => panic!("expected scored, got {other:?}"),
    }
    assert_eq!(p.store.history().len(), 1);
    assert_eq!(p.results.snapshot_last_n(5).len(), 1);
    assert!(render_chat_reply(&out).contains("99.9%"));
}

#[tokio::test]
async fn fixed_answers_skip_the_model() {
    let probe = Arc::new(MustNotCall(AtomicUsize::new(0)));
    let p = build(probe.clone());
    let req = IdeaRequest {
        idea: IDEA.to_string(),
        answers: vec![
            answer("reach", "5000"),
            answer("impact", "4"),
            answer("confidence", "0.7"),
            answer("effort", "3"),
            answer("competition", "2"),
        ],
        mode: ScoreMode::Adaptive,
    };
    let out = p.pipeline.run(&req).await;
    let Outcome::Scored { result, .. } = out else {
        panic!("expected scored");
    };
    assert_eq!(result.provider, "answers");
    assert_eq!(result.score, "99.9%");
    assert_eq!(probe.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn partial_answers_go_to_the_model() {
    let probe = Arc::new(MustNotCall(AtomicUsize::new(0)));
    let p = build(probe.clone());
    let req = IdeaRequest {
        idea: IDEA.to_string(),
        answers: vec![answer("reach", "5000")],
        mode: ScoreMode::Adaptive,
    };
    let out = p.pipeline.run(&req).await;
    assert!(matches!(out, Outcome::ModelUnavailable { .. }));
    assert_eq!(probe.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn raw_mode_leaves_history_alone() {
    let p = build(Arc::new(MockExtractor::default()));
    let req = IdeaRequest {
        mode: ScoreMode::Raw,
        ..IdeaRequest::new(IDEA)
    };
    let Outcome::Scored {
        result, calibrated, ..
    } = p.pipeline.run(&req).await
    else {
        panic!("expected scored");
    };
    assert_eq!(result.score, "0.3452");
    assert_eq!(result.raw, 0.3452);
    assert!(calibrated.is_none());
    assert!(p.store.history().is_empty());
}

#[tokio::test]
async fn invalid_ideas_are_rejected_without_scoring() {
    let p = build(Arc::new(MockExtractor::default()));
    let out = p.pipeline.run(&IdeaRequest::new("  hi  ")).await;
    match out {
        Outcome::Rejected { reason, message } => {
            assert_eq!(reason, Rejection::TooShort { min: 10 });
            assert!(message.contains("too short"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(p.store.history().is_empty());
    assert!(p.results.snapshot_last_n(5).is_empty());
}

#[tokio::test]
async fn disabled_model_yields_user_message() {
    let p = build(Arc::new(DisabledExtractor));
    let out = p.pipeline.run(&IdeaRequest::new(IDEA)).await;
    let Outcome::ModelUnavailable { message } = &out else {
        panic!("expected model unavailable");
    };
    assert!(message.starts_with("Could not get a response from the model"));
    assert!(render_chat_reply(&out).starts_with("⚠️"));
}

#[tokio::test]
async fn feedback_is_attached_when_enabled() {
    let mock = MockExtractor {
        params: RawParams::new(200, 2, 0.4, 8, 9),
        feedback: Some("Crowded market; find a niche.".into()),
    };
    let store = Arc::new(MemoryStore::default());
    let engine = Arc::new(ScoreEngine::new(Arc::new(WeightVector::default()), store));
    let pipeline = IdeaPipeline::new(engine, Arc::new(mock), Arc::new(ResultLog::with_capacity(5)))
        .with_feedback(true);

    let out = pipeline.run(&IdeaRequest::new(IDEA)).await;
    let Outcome::Scored { feedback, .. } = &out else {
        panic!("expected scored");
    };
    assert_eq!(feedback.as_deref(), Some("Crowded market; find a niche."));
    assert!(render_chat_reply(&out).contains("<b>Feedback:</b> Crowded market; find a niche."));
}

#[tokio::test]
async fn history_fills_and_curve_calibrates() {
    let p = build(Arc::new(MockExtractor::default()));
    for i in 0..30 {
        let req = IdeaRequest {
            idea: format!("{IDEA} Variant {i}"),
            answers: vec![
                answer("reach", &(i * 1000).to_string()),
                answer("impact", &(1 + i % 5).to_string()),
                answer("confidence", "0.5"),
                answer("effort", &(1 + i % 10).to_string()),
                answer("competition", &(1 + (i * 3) % 10).to_string()),
            ],
            mode: ScoreMode::Adaptive,
        };
        let _ = p.pipeline.run(&req).await;
    }
    assert_eq!(p.store.history().len(), 30);
    let Outcome::Scored { calibrated, .. } = p.pipeline.run(&IdeaRequest::new(IDEA)).await else {
        panic!("expected scored");
    };
    assert_eq!(calibrated, Some(true));
}
