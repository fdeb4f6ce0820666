use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use applemar_planner::models::{BudgetEntry, Investment, Projection, RiskAnalysis};
use applemar_planner::risk::{AnalysisError, Analyst, Completion, RiskDesk, SessionStatus};
use applemar_planner::state::AppState;
use applemar_planner::store::MemoryStore;
use async_trait::async_trait;
use tokio::runtime::Handle;

/// Answers the n-th call with the n-th scripted (delay, score); `None` fails
struct ScriptedAnalyst {
    calls: AtomicUsize,
    script: Vec<(Duration, Option<f64>)>,
}

impl ScriptedAnalyst {
    fn new(script: Vec<(Duration, Option<f64>)>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script,
        })
    }

    fn analysis(score: f64) -> RiskAnalysis {
        RiskAnalysis {
            risk_score: score,
            critical_issues: vec![format!("issue at {score}")],
            recommendations: vec![],
            market_outlook: "Estável".to_string(),
        }
    }
}

#[async_trait]
impl Analyst for ScriptedAnalyst {
    async fn analyze(
        &self,
        _budgets: &[BudgetEntry],
        _investments: &[Investment],
    ) -> Result<RiskAnalysis, AnalysisError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, score) = self.script[n];
        tokio::time::sleep(delay).await;

        match score {
            Some(score) => Ok(Self::analysis(score)),
            None => Err(AnalysisError::Status {
                status: 503,
                message: "unavailable".to_string(),
            }),
        }
    }

    async fn project(&self, budgets: &[BudgetEntry]) -> Result<Vec<Projection>, AnalysisError> {
        Ok(vec![Projection {
            month: "2025-03".to_string(),
            projected_revenue: budgets.len() as f64,
            projected_expense: 0.0,
            confidence: 0.5,
        }])
    }
}

fn state() -> AppState {
    AppState::load(Box::new(MemoryStore::new()))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn later_request_wins_even_when_it_finishes_first() {
    let analyst = ScriptedAnalyst::new(vec![
        (Duration::from_millis(300), Some(10.0)),
        (Duration::from_millis(10), Some(80.0)),
    ]);
    let mut desk = RiskDesk::new(Some(analyst as Arc<dyn Analyst>), Handle::current());
    let state = state();

    let first = desk.request_analysis(state.snapshot());
    let second = desk.request_analysis(state.snapshot());
    assert!(second > first);
    assert_eq!(desk.risk().status(), SessionStatus::Loading);

    assert_eq!(desk.next_completion().await, Some(Completion::Applied));
    assert_eq!(desk.risk().result().map(|r| r.risk_score), Some(80.0));

    // the slow, superseded response arrives afterwards and is dropped
    assert_eq!(desk.next_completion().await, Some(Completion::Stale));
    assert_eq!(desk.risk().result().map(|r| r.risk_score), Some(80.0));
    assert_eq!(desk.risk().status(), SessionStatus::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failure_keeps_previous_result() {
    let analyst = ScriptedAnalyst::new(vec![
        (Duration::from_millis(5), Some(35.0)),
        (Duration::from_millis(5), None),
    ]);
    let mut desk = RiskDesk::new(Some(analyst as Arc<dyn Analyst>), Handle::current());
    let state = state();

    desk.request_analysis(state.snapshot());
    assert_eq!(desk.next_completion().await, Some(Completion::Applied));

    desk.request_analysis(state.snapshot());
    assert_eq!(desk.next_completion().await, Some(Completion::Failed));

    assert_eq!(desk.risk().status(), SessionStatus::Failed);
    assert_eq!(desk.risk().result().map(|r| r.risk_score), Some(35.0));
    assert!(desk.risk().last_error().unwrap().contains("503"));
}

#[tokio::test]
async fn missing_analyst_fails_with_nothing_to_show() {
    let mut desk = RiskDesk::new(None, Handle::current());

    desk.request_analysis(state().snapshot());
    assert_eq!(desk.poll(), 1);

    assert_eq!(desk.risk().status(), SessionStatus::Failed);
    assert!(desk.risk().result().is_none());
    assert!(desk.risk().last_error().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn projections_track_separately_from_risk() {
    let analyst = ScriptedAnalyst::new(vec![]);
    let mut desk = RiskDesk::new(Some(analyst as Arc<dyn Analyst>), Handle::current());

    desk.request_projection(state().budgets().to_vec());
    assert_eq!(desk.next_completion().await, Some(Completion::Applied));

    let points = desk.projections().result().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].projected_revenue, 5.0);
    assert_eq!(desk.risk().status(), SessionStatus::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn discarded_request_never_lands() {
    let analyst = ScriptedAnalyst::new(vec![(Duration::from_millis(50), Some(60.0))]);
    let mut desk = RiskDesk::new(Some(analyst as Arc<dyn Analyst>), Handle::current());

    desk.request_analysis(state().snapshot());
    desk.discard();
    assert_eq!(desk.risk().status(), SessionStatus::Idle);

    assert_eq!(desk.next_completion().await, Some(Completion::Stale));
    assert_eq!(desk.risk().status(), SessionStatus::Idle);
    assert!(desk.risk().result().is_none());
}
