// End-to-end session test: a recorded pre-check and upgrade feed drives
// the workflow from CONFIGURE to RESULTS through the public API only.

use std::sync::Arc;

use serde_json::json;
use tokio_stream as stream;

use upline_contracts::{ConnectionStatus, DeviceConfig, FinalStatus, RawFrame, WorkflowStep};
use upline_pipeline::PipelineConfig;
use upline_workflow::{MemorySink, Session, WorkflowError};

fn device() -> DeviceConfig {
    DeviceConfig {
        host: "edge-router-1".into(),
        username: "operator".into(),
        password: "secret".into(),
        target_version: Some("21.4R3".into()),
        image_filename: Some("junos-21.4R3.tgz".into()),
        selected_pre_checks: vec!["storage".into(), "image".into()],
    }
}

fn pre_check_feed() -> Vec<RawFrame> {
    vec![
        RawFrame::Status(ConnectionStatus::Connected),
        json!({ "event_type": "OPERATION_START", "job_id": "job-77",
                "data": { "operation": "pre_check" } })
        .into(),
        // Free-text line with an embedded event, as jobs actually emit them
        r#"worker: PRE_CHECK_EVENT:{"event_type":"PRE_CHECK_RESULT","data":{"check_name":"storage","passed":true}}"#
            .into(),
        json!({ "event_type": "PROGRESS_UPDATE", "data": { "progress": 50 } }).into(),
        json!({ "event_type": "PRE_CHECK_RESULT",
                "data": { "check_name": "image", "passed": true } })
        .into(),
        json!({ "event_type": "PRE_CHECK_COMPLETE",
                "data": { "validation_passed": true, "can_proceed": true,
                          "required_mb": 10, "available_mb": 20 } })
        .into(),
    ]
}

fn upgrade_feed() -> Vec<RawFrame> {
    vec![
        json!({ "event_type": "STEP_START",
                "data": { "step": 1, "description": "Copying image" } })
        .into(),
        json!({ "event_type": "PROGRESS_UPDATE", "data": { "progress": 80 } }).into(),
        json!({ "event_type": "STEP_COMPLETE",
                "data": { "name": "Copying image", "duration": 34.2 } })
        .into(),
        json!({ "event_type": "OPERATION_COMPLETE", "data": { "success": true } }).into(),
    ]
}

#[tokio::test]
async fn full_upgrade_session_reaches_results() {
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(PipelineConfig::default(), sink.clone());

    session.controller_mut().update_device_config(device());
    session.controller_mut().start_pre_check().unwrap();
    session.run(stream::iter(pre_check_feed())).await;

    {
        let state = session.controller().state();
        assert!(state.pre_check.is_complete);
        assert_eq!(state.pre_check.progress, 100.0);
        assert_eq!(state.pre_check.results.len(), 2);
        assert_eq!(state.job_id.as_deref(), Some("job-77"));
        assert!(state.review.can_proceed);
    }

    let summary = session.controller().state().pre_check.summary.clone();
    session
        .controller_mut()
        .move_to_review(json!({ "summary": summary }))
        .unwrap();
    session.controller_mut().start_upgrade().unwrap();
    session.run(stream::iter(upgrade_feed())).await;
    let result = session.controller().state().upgrade.result.clone().unwrap();
    session.controller_mut().move_to_results(result).unwrap();

    let state = session.controller().state();
    assert_eq!(state.current_step, WorkflowStep::Results);
    assert_eq!(state.results.final_status, Some(FinalStatus::Success));
    assert_eq!(state.upgrade.logs.len(), 4);

    // The storage headroom summary is rendered for the operator
    let visible = sink.visible().await;
    assert!(visible.iter().any(|r| r.message.contains("10.00") && r.message.contains("20.00")));
    assert_eq!(sink.statuses().await, vec![ConnectionStatus::Connected]);
}

#[tokio::test]
async fn failed_pre_check_blocks_the_upgrade() {
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::new(PipelineConfig::default(), sink);

    session.controller_mut().update_device_config(device());
    session.controller_mut().start_pre_check().unwrap();
    session
        .run(stream::iter(vec![RawFrame::from(json!({
            "event_type": "PRE_CHECK_COMPLETE",
            "data": {
                "validation_passed": false,
                "can_proceed": false,
                "results": [{ "check_name": "storage", "passed": false,
                              "message": "Insufficient storage" }],
                "recommendations": ["Free up space under /var"]
            }
        }))]))
        .await;

    let summary = session.controller().state().pre_check.summary.clone();
    session
        .controller_mut()
        .move_to_review(json!({ "summary": summary }))
        .unwrap();
    assert_eq!(
        session.controller_mut().start_upgrade().unwrap_err(),
        WorkflowError::ProceedNotApproved
    );
    assert!(!session.controller().step_accessible(WorkflowStep::Upgrade));
}
