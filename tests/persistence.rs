mod common;

use std::sync::Arc;

use autoapply::collaborators::Collaborators;
use autoapply::{AutomationController, Command, CommandResponse, Records, SqliteStore};

use common::{job, test_config, FakeFormAutomation, FakePageAnalyzer, FixedClock, ParkedScheduler};

async fn controller_on(store: SqliteStore) -> AutomationController {
    let collaborators = Collaborators::new(
        Arc::new(FakePageAnalyzer::default()),
        Arc::new(FakeFormAutomation::default()),
    )
    .with_clock(Arc::new(FixedClock::new(common::t0())));
    AutomationController::new(
        Records::new(Arc::new(store)),
        collaborators,
        Arc::new(ParkedScheduler::default()),
    )
    .await
}

#[tokio::test]
async fn config_and_counters_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autoapply.sqlite3");

    {
        let store = SqliteStore::open(path.clone()).unwrap();
        Records::new(Arc::new(store.clone()))
            .save_config(&test_config())
            .await
            .unwrap();

        let controller = controller_on(store).await;
        let patch = serde_json::from_str(r#"{"pacing": {"dailyLimit": 9}}"#).unwrap();
        let response = controller.dispatch(Command::UpdateConfig(patch)).await;
        assert!(matches!(response, CommandResponse::Config(ref config) if config.pacing.daily_limit == 9));

        controller.jobs_found(vec![job("a", None)]).await;
        controller.start(None).await.unwrap();
        controller.run_once().await;
        controller.stop().await;
    }

    let controller = controller_on(SqliteStore::open(path).unwrap()).await;
    assert_eq!(controller.config().pacing.daily_limit, 9);

    let status = controller.status().await;
    assert_eq!(status.applications_today, 1);
    assert_eq!(status.daily_limit, 9);

    match controller.dispatch(Command::GetStatistics).await {
        CommandResponse::Statistics(statistics) => {
            assert_eq!(statistics.total_submitted, 1);
            assert_eq!(statistics.success_rate, 1.0);
        }
        other => panic!("unexpected response {other:?}"),
    }
}
