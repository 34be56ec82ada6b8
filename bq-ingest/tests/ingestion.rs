#![cfg(feature = "test-utils")]

use bq_ingest::client::{BigQueryClient, CreateTableOptions};
use bq_ingest::error::ErrorKind;
use bq_ingest::insert::{InsertOutcome, RowBatch};
use bq_ingest::model::{ErrorPayload, QueryResultsParams};
use bq_ingest::schema::TableFieldSchema;
use bq_ingest::test_utils::fake_service::{FakeTableService, ServiceCall};
use bq_ingest::test_utils::responses::{batch_errors, insert_failure, insert_success, row_error};
use bq_ingest_telemetry::tracing::init_test_tracing;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

fn events(count: usize) -> Vec<Value> {
    (0..count).map(|id| json!({"id": id})).collect()
}

fn duplicate_table_error() -> bq_ingest::error::BqError {
    let error = ErrorPayload::new("duplicate", "Already Exists: Table p:d.t");
    bq_ingest::classify::classify(&error, None, std::slice::from_ref(&error), None)
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_rows_are_skipped_on_second_pass() {
    init_test_tracing();

    let service = FakeTableService::new();
    service
        .push_insert_rows(Ok(insert_failure(batch_errors(5, &[1, 3]))))
        .await;
    service.push_insert_rows(Ok(insert_success())).await;
    let client = BigQueryClient::new(service.clone());

    let outcome = client
        .insert_rows("p", "d", "t", events(5), true)
        .await
        .unwrap();

    let (first_pass, second_pass, invalid_row_count, accepted_row_count) = match outcome {
        InsertOutcome::TwoPass {
            first_pass,
            second_pass,
            invalid_row_count,
            accepted_row_count,
        } => (first_pass, second_pass, invalid_row_count, accepted_row_count),
        other => panic!("expected a second pass, got {other:?}"),
    };
    assert_eq!(invalid_row_count, 2);
    assert_eq!(accepted_row_count, 3);
    assert_eq!(first_pass.insert_errors().len(), 5);
    assert_eq!(second_pass, insert_success());

    let requests = service.insert_rows_requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].rows.len(), 5);
    let retried_ids = requests[1]
        .rows
        .iter()
        .map(|row| row.json["id"].clone())
        .collect::<Vec<_>>();
    assert_eq!(retried_ids, vec![json!(0), json!(2), json!(4)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn row_errors_are_returned_when_not_ignored() {
    init_test_tracing();

    let service = FakeTableService::new();
    let response = insert_failure(batch_errors(3, &[0]));
    service.push_insert_rows(Ok(response.clone())).await;
    let client = BigQueryClient::new(service.clone());

    let outcome = client
        .insert_rows("p", "d", "t", events(3), false)
        .await
        .unwrap();

    assert_eq!(outcome, InsertOutcome::Single(response));
    assert_eq!(service.insert_rows_requests().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_rows_fail_without_second_pass() {
    init_test_tracing();

    let service = FakeTableService::new();
    service
        .push_insert_rows(Ok(insert_failure(vec![
            row_error(
                0,
                "invalid",
                "Maximum allowed row size exceeded. Allowed: 1048576 Row size: 5242880",
            ),
            row_error(1, "stopped", ""),
        ])))
        .await;
    let client = BigQueryClient::new(service.clone());

    let err = client
        .insert_rows("p", "d", "t", events(2), true)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StreamingRowTooLarge);
    assert_eq!(err.detail(), Some("p.d.t"));
    assert_eq!(service.insert_rows_requests().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_rows_fail_even_when_row_errors_are_returned() {
    init_test_tracing();

    let service = FakeTableService::new();
    service
        .push_insert_rows(Ok(insert_failure(vec![row_error(
            0,
            "invalid",
            "Maximum allowed row size exceeded. Allowed: 1048576 Row size: 5242880",
        )])))
        .await;
    let client = BigQueryClient::new(service.clone());

    let err = client
        .insert_rows("p", "d", "t", events(1), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StreamingRowTooLarge);
    assert_eq!(service.insert_rows_requests().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_pass_errors_are_returned_without_another_retry() {
    init_test_tracing();

    let service = FakeTableService::new();
    service
        .push_insert_rows(Ok(insert_failure(batch_errors(3, &[0]))))
        .await;
    let second_response = insert_failure(vec![row_error(
        1,
        "invalid",
        "Maximum allowed row size exceeded. Allowed: 1048576 Row size: 5242880",
    )]);
    service
        .push_insert_rows(Ok(second_response.clone()))
        .await;
    let client = BigQueryClient::new(service.clone());

    let outcome = client
        .insert_rows("p", "d", "t", events(3), true)
        .await
        .unwrap();

    let (second_pass, invalid_row_count, accepted_row_count) = match outcome {
        InsertOutcome::TwoPass {
            second_pass,
            invalid_row_count,
            accepted_row_count,
            ..
        } => (second_pass, invalid_row_count, accepted_row_count),
        other => panic!("expected a second pass, got {other:?}"),
    };
    assert_eq!(second_pass, second_response);
    assert_eq!(invalid_row_count, 1);
    assert_eq!(accepted_row_count, 2);
    assert_eq!(service.insert_rows_requests().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn clean_insert_returns_response() {
    init_test_tracing();

    let service = FakeTableService::new();
    let client = BigQueryClient::new(service.clone());

    let outcome = client
        .insert_rows("p", "d", "t", json!({"id": 1, "name": "one"}), true)
        .await
        .unwrap();

    assert_eq!(outcome, InsertOutcome::Single(insert_success()));
    assert!(outcome.second_pass().is_none());

    let requests = service.insert_rows_requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].rows[0].json, json!({"id": 1, "name": "one"}));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_batches_are_sent() {
    init_test_tracing();

    let service = FakeTableService::new();
    let client = BigQueryClient::new(service.clone());

    client
        .insert_rows("p", "d", "t", RowBatch::default(), false)
        .await
        .unwrap();

    let requests = service.insert_rows_requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].rows.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn insert_ids_are_sent_on_both_passes() {
    init_test_tracing();

    let service = FakeTableService::new();
    service
        .push_insert_rows(Ok(insert_failure(batch_errors(3, &[2]))))
        .await;
    let client = BigQueryClient::new(service.clone());

    let batch = RowBatch::with_insert_ids(events(3), |row| format!("event-{}", row["id"]));
    client.insert_rows("p", "d", "t", batch, true).await.unwrap();

    let requests = service.insert_rows_requests().await;
    let retried_ids = requests[1]
        .rows
        .iter()
        .map(|row| row.insert_id.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        retried_ids,
        vec![Some("event-0".to_string()), Some("event-1".to_string())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn transport_errors_propagate_unchanged() {
    init_test_tracing();

    let service = FakeTableService::new();
    let err = bq_ingest::error::BqError::communication(Some(502), "<html>Bad Gateway</html>");
    service.push_insert_rows(Err(err.clone())).await;
    let client = BigQueryClient::new(service);

    let returned = client
        .insert_rows("p", "d", "t", events(1), true)
        .await
        .unwrap_err();

    assert_eq!(returned, err);
    assert_eq!(returned.http_status(), Some(502));
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_table_is_raised_unless_ignored() {
    init_test_tracing();

    let service = FakeTableService::new();
    service.push_insert_table(Err(duplicate_table_error())).await;
    service.push_insert_table(Err(duplicate_table_error())).await;
    let client = BigQueryClient::new(service.clone());
    let fields = vec![TableFieldSchema::string("name")];

    let err = client
        .create_table("p", "d", "t", fields.clone(), CreateTableOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);

    let created = client
        .create_table(
            "p",
            "d",
            "t",
            fields,
            CreateTableOptions {
                ignore_existing: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn create_table_sends_table_resource() {
    init_test_tracing();

    let service = FakeTableService::new();
    let client = BigQueryClient::new(service.clone());
    let expiration = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();

    let created = client
        .create_table(
            "p",
            "d",
            "events",
            vec![TableFieldSchema::string("name")],
            CreateTableOptions {
                ignore_existing: false,
                description: Some("raw events".to_string()),
                friendly_name: Some("Events".to_string()),
                expiration: Some(expiration),
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created.table_reference.to_string(), "p.d.events");
    assert_eq!(created.expiration_time.as_deref(), Some("1893456000000"));

    let calls = service.calls().await;
    let [ServiceCall::InsertTable { table, .. }] = calls.as_slice() else {
        panic!("expected a single table insert, got {calls:?}");
    };
    assert_eq!(
        serde_json::to_value(table).unwrap(),
        json!({
            "tableReference": {"projectId": "p", "datasetId": "d", "tableId": "events"},
            "schema": {"fields": [{"name": "name", "type": "STRING"}]},
            "friendlyName": "Events",
            "description": "raw events",
            "expirationTime": "1893456000000"
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn other_table_errors_are_raised_even_when_ignoring_existing() {
    init_test_tracing();

    let service = FakeTableService::new();
    let error = ErrorPayload::new("notFound", "Not found: Dataset p:d");
    service
        .push_insert_table(Err(bq_ingest::classify::classify(
            &error,
            None,
            &[],
            None,
        )))
        .await;
    let client = BigQueryClient::new(service);

    let err = client
        .create_table(
            "p",
            "d",
            "t",
            vec![TableFieldSchema::integer("id")],
            CreateTableOptions {
                ignore_existing: true,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread")]
async fn query_results_are_passed_through() {
    init_test_tracing();

    let service = FakeTableService::new();
    let client = BigQueryClient::new(service.clone());
    let params = QueryResultsParams {
        max_results: Some(100),
        page_token: Some("next".to_string()),
        ..Default::default()
    };

    let results = client
        .get_query_results("p", "job123", params.clone())
        .await
        .unwrap();

    assert_eq!(results.job_complete, Some(true));
    assert_eq!(
        service.calls().await,
        vec![ServiceCall::GetQueryResults {
            project_id: "p".to_string(),
            job_id: "job123".to_string(),
            params,
        }]
    );
}
