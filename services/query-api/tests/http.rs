// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP-level coverage for the view façade (spec §8 S1, S3, S6 and the
//! legacy endpoint shapes from §6), exercised against `FakeBusClient` so no
//! network or bus process is needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use query_api::models::AppState;
use query_api::routes;
use query_bridge_core::{HistoryBody, HistoryResponse, MetricMetadata, TimeAggregate};
use query_bridge_engine::testing::FakeBusClient;
use query_bridge_engine::Coordinator;
use serde_json::json;
use tower::ServiceExt;

fn test_router(bus: FakeBusClient) -> Router {
    let coordinator = Arc::new(Coordinator::new(Arc::new(bus)));
    let state = Arc::new(AppState { coordinator });
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::query::routes())
        .merge(routes::discover::routes())
        .merge(routes::legacy::routes())
        .with_state(state)
}

#[tokio::test]
async fn health_check_returns_200() {
    let app = test_router(FakeBusClient::new());
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn query_returns_series_with_timing_headers() {
    let bus = FakeBusClient::new().with_metric("m1", MetricMetadata::new()).with_history(
        "m1",
        HistoryResponse {
            body: HistoryBody::Aggregates(vec![TimeAggregate {
                timestamp: query_bridge_core::Timestamp::from_posix_ms(5_000),
                minimum: 2.0,
                maximum: 2.0,
                sum: 2.0,
                count: 1,
                integral_ns: 2_000_000_000.0,
                active_time: query_bridge_core::Duration::from_secs(1),
                mean: 2.0,
                mean_integral: 2.0,
            }]),
            request_duration: 0.01,
        },
    );
    let app = test_router(bus);

    let body = json!({
        "targets": [{"metric": "m1"}],
        "range": {"from": "2023-01-01T00:00:00.000000Z", "to": "2023-01-01T00:10:00.000000Z"},
        "maxDataPoints": 10
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-duration"));
    assert!(response.headers().contains_key("x-request-duration-cpu"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let series: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(series[0]["target"], "m1/avg");
}

#[tokio::test]
async fn search_as_selector_returns_sorted_names() {
    let bus = FakeBusClient::new()
        .with_metric("cpu.1", MetricMetadata::new())
        .with_metric("cpu.2", MetricMetadata::new())
        .with_metric("mem.1", MetricMetadata::new());
    let app = test_router(bus);

    let body = json!({"target": "/cpu\\.\\d+/", "metadata": false});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let names: Vec<String> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(names, vec!["cpu.1".to_string(), "cpu.2".to_string()]);
}

#[tokio::test]
async fn metadata_not_found_maps_to_404() {
    let app = test_router(FakeBusClient::new());
    let body = json!({"target": "missing.metric"});
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/metadata")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn legacy_counter_status_renders_plain_text_lines() {
    let mut description = MetricMetadata::new();
    description.insert("description".to_string(), json!("CPU load"));
    let bus = FakeBusClient::new().with_metric("cpu.load", description);
    let app = test_router(bus);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/legacy/cntr_status.php")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("selector=cpu.load"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text, "cpu.load;CPU load");
}

#[tokio::test]
async fn legacy_counter_data_filters_to_window() {
    let bus = FakeBusClient::new().with_history(
        "m1",
        HistoryResponse {
            body: HistoryBody::Aggregates(vec![
                TimeAggregate {
                    timestamp: query_bridge_core::Timestamp::from_posix_ms(1_500),
                    minimum: 4.0,
                    maximum: 4.0,
                    sum: 4.0,
                    count: 1,
                    integral_ns: 4.0,
                    active_time: query_bridge_core::Duration::from_secs(1),
                    mean: 4.0,
                    mean_integral: 4.0,
                },
            ]),
            request_duration: 0.01,
        },
    );
    let app = test_router(bus);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/legacy/counter_data.php?cntr=m1&start=1000&stop=2000&width=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["data"], json!([[1_500, 4.0]]));
}
