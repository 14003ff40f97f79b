use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::api_client::TaskApi;
use crate::errors::ClientError;
use crate::models::{ListItem, ListKind};
use crate::notify::Notifier;
use crate::planner::controller::{DispatchOutcome, ListController, ViewHandle};
use crate::planner::reconcile::Action;
use crate::session::SessionContext;

/// The daily planner next to its recommended tasks. Both lists share one
/// session context and one notifier; an accepted recommendation moves into
/// the planner once the backend confirms it.
pub struct Dashboard {
    planner: Arc<ListController>,
    recommendations: Arc<ListController>,
}

/// Handles for the two mounted views; dropping it tears both down.
pub struct DashboardViews {
    _planner: ViewHandle,
    _recommendations: ViewHandle,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn TaskApi>,
        session: SessionContext,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            planner: ListController::new(
                ListKind::Planner,
                api.clone(),
                session.clone(),
                notifier.clone(),
            ),
            recommendations: ListController::new(ListKind::Recommended, api, session, notifier),
        }
    }

    pub fn planner(&self) -> &Arc<ListController> {
        &self.planner
    }

    pub fn recommendations(&self) -> &Arc<ListController> {
        &self.recommendations
    }

    pub fn mount(&self) -> Result<DashboardViews, ClientError> {
        Ok(DashboardViews {
            _planner: self.planner.mount()?,
            _recommendations: self.recommendations.mount()?,
        })
    }

    /// Accepts a recommendation and, once confirmed, adds it to the planner.
    pub async fn accept_recommendation(
        &self,
        item_id: &str,
    ) -> Result<DispatchOutcome, ClientError> {
        let outcome = self
            .recommendations
            .dispatch(item_id, Action::Accept)
            .await?;

        if let DispatchOutcome::Applied { item: Some(item) } = &outcome {
            if self.planner.adopt(item.clone()) {
                info!("Added '{}' to the daily planner", item.title);
            }
        }
        Ok(outcome)
    }
}

/// Completion count for the planner header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerSummary {
    pub completed: usize,
    pub total: usize,
}

impl PlannerSummary {
    pub fn of(items: &[ListItem]) -> Self {
        Self {
            completed: items.iter().filter(|i| i.is_completed()).count(),
            total: items.len(),
        }
    }
}

impl fmt::Display for PlannerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} completed", self.completed, self.total)
    }
}

pub fn recommendation_headline(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} AI-generated recommendation{plural} based on your profile")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::planner::controller::tests::{
        signed_in, wait_until, FakeApi, RecordingNotifier, Scripted,
    };
    use crate::planner::reconcile::tests::item;

    #[tokio::test]
    async fn test_accepted_recommendation_moves_to_planner() {
        let ctx = signed_in();
        let api = Arc::new(FakeApi::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let dashboard = Dashboard::new(api.clone(), ctx, notifier.clone());

        let mut rec = item("rec-1", "Upload your resume");
        rec.status = TaskStatus::Pending;
        rec.scheduling_hint = Some("45 min".into());
        api.script_list(Scripted::ok(vec![item("1", "Follow up")]));
        api.script_list(Scripted::ok(vec![rec, item("rec-2", "Connect LinkedIn")]));
        dashboard.planner().refresh().await.unwrap();
        dashboard.recommendations().refresh().await.unwrap();

        api.script_mutation(Scripted::ok(()));
        dashboard.accept_recommendation("rec-1").await.unwrap();

        let planner = dashboard.planner().items();
        assert_eq!(planner.len(), 2);
        assert_eq!(planner[0].id, "rec-1");
        assert_eq!(planner[0].status, TaskStatus::Accepted);
        assert_eq!(planner[0].scheduling_hint.as_deref(), Some("Est. 45 min"));
        assert_eq!(dashboard.recommendations().items().len(), 1);
        assert_eq!(notifier.seen()[0].title, "Task added to planner");
    }

    #[tokio::test]
    async fn test_failed_accept_leaves_both_lists() {
        let ctx = signed_in();
        let api = Arc::new(FakeApi::default());
        let dashboard = Dashboard::new(api.clone(), ctx, Arc::new(RecordingNotifier::default()));

        api.script_list(Scripted::ok(vec![item("rec-1", "A")]));
        dashboard.recommendations().refresh().await.unwrap();
        api.script_mutation(Scripted::err(ClientError::Status {
            status: 404,
            message: "Task not found".into(),
        }));

        assert!(dashboard.accept_recommendation("rec-1").await.is_err());
        assert!(dashboard.planner().items().is_empty());
        assert_eq!(dashboard.recommendations().items().len(), 1);
    }

    #[tokio::test]
    async fn test_mount_loads_both_views() {
        let ctx = signed_in();
        let api = Arc::new(FakeApi::default());
        let dashboard = Dashboard::new(api.clone(), ctx, Arc::new(RecordingNotifier::default()));
        // Both views fetch concurrently; give each the same body.
        api.script_list(Scripted::ok(vec![item("1", "A")]));
        api.script_list(Scripted::ok(vec![item("1", "A")]));

        let views = dashboard.mount().unwrap();
        wait_until(|| {
            dashboard.planner().items().len() == 1 && dashboard.recommendations().items().len() == 1
        })
        .await;
        drop(views);
        assert!(!dashboard.planner().is_live());
        assert!(!dashboard.recommendations().is_live());
    }

    #[test]
    fn test_summary_and_headline() {
        let mut done = item("2", "B");
        done.status = TaskStatus::Completed;
        let summary = PlannerSummary::of(&[item("1", "A"), done]);
        assert_eq!(summary.to_string(), "1 of 2 completed");
        assert_eq!(
            recommendation_headline(1),
            "1 AI-generated recommendation based on your profile"
        );
        assert_eq!(
            recommendation_headline(4),
            "4 AI-generated recommendations based on your profile"
        );
    }
}
