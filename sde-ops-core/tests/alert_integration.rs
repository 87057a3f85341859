use serde_json::{json, Value};

use sde_ops_core::alert::{AlertError, AlertRelay, SNS_VALIDATION_MESSAGE};
use sde_ops_core::config::AlertConfig;
use sde_ops_core::contract::{LogEvent, MetricFilter, MockChatWebhook, MockLogQuery};

fn config() -> AlertConfig {
    AlertConfig {
        slack_hook_url: "https://hooks.slack.test/services/T000/B000/XXX".to_string(),
        aws_region: "eu-west-2".to_string(),
    }
}

fn sns_event(message: &Value) -> Value {
    json!({"Records": [{"Sns": {"Message": message.to_string()}}]})
}

fn alarm() -> Value {
    json!({
        "AlarmName": "ingest-errors",
        "AlarmDescription": "Errors in the forwarder",
        "NewStateReason": "Threshold Crossed",
        "StateChangeTime": "2024-01-23T16:00:30.000+0000",
        "Trigger": {
            "MetricName": "ErrorCount",
            "Namespace": "SDE/Forwarder",
            "Dimensions": [{"name": "FunctionName", "value": "forwarder"}]
        }
    })
}

fn texts(payload: &Value) -> Vec<String> {
    payload["blocks"]
        .as_array()
        .expect("payload has blocks")
        .iter()
        .filter_map(|block| block["text"]["text"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_sns_validation_message_is_acknowledged_without_posting() {
    let mut logs = MockLogQuery::new();
    logs.expect_describe_metric_filters().never();
    let mut webhook = MockChatWebhook::new();
    webhook.expect_post().never();

    let relay = AlertRelay::new(logs, webhook, config());
    let response = relay
        .handle(&sns_event(&json!(SNS_VALIDATION_MESSAGE)))
        .await
        .unwrap();
    assert_eq!(
        response,
        json!({"message": "Sns validation event, no action required."})
    );
}

#[tokio::test]
async fn test_ecs_task_change_posts_fixed_sections() {
    let logs = MockLogQuery::new();
    let mut webhook = MockChatWebhook::new();
    webhook
        .expect_post()
        .withf(|payload| {
            texts(payload)
                == vec![
                    "*Detail:* ECS Task State Change",
                    "*Group:* service:ingest",
                    "*Desired Status:* STOPPED",
                    "*Reason:* Essential container exited",
                ]
        })
        .times(1)
        .returning(|_| Ok(200));

    let message = json!({
        "detail-type": "ECS Task State Change",
        "detail": {
            "group": "service:ingest",
            "desiredStatus": "STOPPED",
            "stoppedReason": "Essential container exited"
        }
    });
    let relay = AlertRelay::new(logs, webhook, config());
    let response = relay.handle(&sns_event(&message)).await.unwrap();
    assert_eq!(response, json!({"status": 200}));
}

#[tokio::test]
async fn test_alarm_without_metric_filter_describes_trigger() {
    let mut logs = MockLogQuery::new();
    logs.expect_describe_metric_filters()
        .withf(|namespace, metric_name| namespace == "SDE/Forwarder" && metric_name == "ErrorCount")
        .times(1)
        .returning(|_, _| Ok(vec![]));
    logs.expect_filter_log_events().never();
    let mut webhook = MockChatWebhook::new();
    webhook
        .expect_post()
        .withf(|payload| {
            texts(payload)
                == vec![
                    "*Alarm name:* ingest-errors",
                    "*Alarm description:* Errors in the forwarder",
                    "*Time:* 2024-01-23T16:00:30.000+0000",
                    "*Reason:* Threshold Crossed",
                    "*Namespace:* SDE/Forwarder",
                    "*FunctionName:* forwarder",
                    "*Metric name:* ErrorCount",
                ]
        })
        .times(1)
        .returning(|_| Ok(200));

    let relay = AlertRelay::new(logs, webhook, config());
    relay.handle(&sns_event(&alarm())).await.unwrap();
}

#[tokio::test]
async fn test_metric_filter_lookup_failure_falls_back_to_summary() {
    let mut logs = MockLogQuery::new();
    logs.expect_describe_metric_filters()
        .returning(|_, _| Err("access denied".into()));
    let mut webhook = MockChatWebhook::new();
    webhook
        .expect_post()
        .withf(|payload| texts(payload).first().map(String::as_str) == Some("*Alarm name:* ingest-errors"))
        .times(1)
        .returning(|_| Ok(200));

    let relay = AlertRelay::new(logs, webhook, config());
    relay.handle(&sns_event(&alarm())).await.unwrap();
}

#[tokio::test]
async fn test_alarm_with_metric_filter_includes_latest_events() {
    let mut logs = MockLogQuery::new();
    logs.expect_describe_metric_filters().returning(|_, _| {
        Ok(vec![MetricFilter {
            log_group_name: "/aws/lambda/forwarder".to_string(),
            filter_pattern: "ERROR".to_string(),
        }])
    });
    logs.expect_filter_log_events()
        .withf(|log_group, pattern, start_ms, end_ms| {
            log_group == "/aws/lambda/forwarder"
                && pattern == "ERROR"
                && *end_ms == 1706025630000
                && *start_ms == 1706025600000
        })
        .times(1)
        .returning(|_, _, _, _| {
            Ok((0..5)
                .map(|i| LogEvent {
                    timestamp_ms: Some(1706025600000 + i * 1000),
                    message: Some(format!("ERROR event {i}")),
                })
                .collect())
        });

    let mut webhook = MockChatWebhook::new();
    webhook
        .expect_post()
        .withf(|payload| {
            let texts = texts(payload);
            let dividers = payload["blocks"]
                .as_array()
                .map(|blocks| blocks.iter().filter(|b| b["type"] == "divider").count());
            texts
                == vec![
                    "*Log group:* <https://eu-west-2.console.aws.amazon.com/cloudwatch/home?region=eu-west-2#logStream:group=/aws/lambda/forwarder|/aws/lambda/forwarder>",
                    "*Matching events from the last 30 seconds*",
                    "*Timestamp:* 2024-01-23T16:00:04",
                    "*Message:* ERROR event 4",
                    "*Timestamp:* 2024-01-23T16:00:03",
                    "*Message:* ERROR event 3",
                    "*Timestamp:* 2024-01-23T16:00:02",
                    "*Message:* ERROR event 2",
                ]
                && dividers == Some(3)
        })
        .times(1)
        .returning(|_| Ok(200));

    let relay = AlertRelay::new(logs, webhook, config());
    relay.handle(&sns_event(&alarm())).await.unwrap();
}

#[tokio::test]
async fn test_metric_filter_without_events_says_so() {
    let mut logs = MockLogQuery::new();
    logs.expect_describe_metric_filters().returning(|_, _| {
        Ok(vec![MetricFilter {
            log_group_name: "app".to_string(),
            filter_pattern: "ERROR".to_string(),
        }])
    });
    logs.expect_filter_log_events()
        .returning(|_, _, _, _| Err("timeout".into()));
    let mut webhook = MockChatWebhook::new();
    webhook
        .expect_post()
        .withf(|payload| {
            texts(payload).last().map(String::as_str) == Some("*Could not find matching log entries*")
        })
        .times(1)
        .returning(|_| Ok(200));

    let relay = AlertRelay::new(logs, webhook, config());
    relay.handle(&sns_event(&alarm())).await.unwrap();
}

#[tokio::test]
async fn test_non_200_from_slack_is_an_error() {
    let mut logs = MockLogQuery::new();
    logs.expect_describe_metric_filters().returning(|_, _| Ok(vec![]));
    let mut webhook = MockChatWebhook::new();
    webhook.expect_post().times(1).returning(|_| Ok(500));

    let relay = AlertRelay::new(logs, webhook, config());
    let result = relay.handle(&sns_event(&alarm())).await;
    assert!(matches!(result, Err(AlertError::UnexpectedStatus(500))));
}

#[tokio::test]
async fn test_event_without_sns_message_is_an_error() {
    let relay = AlertRelay::new(MockLogQuery::new(), MockChatWebhook::new(), config());
    let result = relay.handle(&json!({"Records": []})).await;
    assert!(matches!(result, Err(AlertError::MissingMessage)));

    let result = relay
        .handle(&json!({"Records": [{"Sns": {"Message": "not json"}}]}))
        .await;
    assert!(matches!(result, Err(AlertError::InvalidMessage(_))));
}
