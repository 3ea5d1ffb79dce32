// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! AMQP-backed [`BusClient`] implementation (spec SPEC_FULL §4.I).
//!
//! `LapinBusClient` opens one connection and one channel at startup,
//! declares an exclusive auto-delete reply queue, and issues RPC-style
//! requests (correlation id + reply-to) against the management exchange.
//! The wire schema exchanged with the bus is this crate's own concern —
//! the adapter's contract stops at the [`BusClient`] trait.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use query_bridge_core::{
    AggregateRequestParams, BusClient, Error, GetMetricsParams, HistoryRequestParams,
    HistoryResponse, MetricMetadata, Result, TimeAggregate,
};
use serde::{de::DeserializeOwned, Serialize};

/// Startup configuration for [`LapinBusClient`] (spec SPEC_FULL §3
/// `AdapterConfig`).
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// AMQP connection URL, e.g. `amqp://localhost/`.
    pub url: String,
    /// Bearer token sent as the message's `app_id` for the management
    /// exchange to authorize the call.
    pub token: String,
    /// Exchange the RPC requests are published to.
    pub management_exchange: String,
}

/// A long-lived AMQP connection/channel pair, reused across every request
/// this process handles (spec §5 "one long-lived bus client per process").
pub struct LapinBusClient {
    channel: Channel,
    reply_queue: String,
    exchange: String,
    token: String,
    correlation_seq: AtomicU64,
}

impl LapinBusClient {
    /// Connect to the bus and declare this process's private reply queue.
    pub async fn connect(config: &BusConfig) -> Result<Self> {
        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(|e| Error::upstream(format!("amqp connect failed: {e}")))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| Error::upstream(format!("amqp channel open failed: {e}")))?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions { exclusive: true, auto_delete: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::upstream(format!("amqp reply queue declare failed: {e}")))?;

        tracing::info!(exchange = %config.management_exchange, "connected to metric bus");

        Ok(Self {
            channel,
            reply_queue: queue.name().to_string(),
            exchange: config.management_exchange.clone(),
            token: config.token.clone(),
            correlation_seq: AtomicU64::new(0),
        })
    }

    /// Close the channel's reply queue and drop the connection. Called from
    /// the service's shutdown hook.
    pub async fn close(&self) -> Result<()> {
        self.channel
            .queue_delete(&self.reply_queue, QueueDeleteOptions::default())
            .await
            .map_err(|e| Error::upstream(format!("amqp reply queue teardown failed: {e}")))?;
        Ok(())
    }

    fn next_correlation_id(&self) -> String {
        let seq = self.correlation_seq.fetch_add(1, Ordering::Relaxed);
        format!("query-bridge-{seq}")
    }

    /// Issue one RPC-style request: publish `body` to the management
    /// exchange with a correlation id and this client's reply-to queue,
    /// then await and deserialize the first reply within `timeout`.
    async fn rpc<Req, Resp>(&self, routing_key: &str, body: &Req, timeout: StdDuration) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let correlation_id = self.next_correlation_id();
        let payload = serde_json::to_vec(body)?;

        let mut consumer = self
            .channel
            .basic_consume(
                &self.reply_queue,
                &correlation_id,
                BasicConsumeOptions { no_ack: true, ..Default::default() },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::upstream(format!("amqp consume failed: {e}")))?;

        let properties = BasicProperties::default()
            .with_correlation_id(correlation_id.clone().into())
            .with_reply_to(self.reply_queue.clone().into())
            .with_app_id(self.token.clone().into())
            .with_content_type("application/json".into());

        self.channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                properties,
            )
            .await
            .map_err(|e| Error::upstream(format!("amqp publish failed: {e}")))?;

        let delivery = tokio::time::timeout(timeout, async {
            use futures::StreamExt;
            consumer.next().await
        })
        .await
        .map_err(|_| Error::not_found(format!("bus request '{routing_key}' timed out")))?
        .ok_or_else(|| Error::upstream("amqp reply stream closed"))?
        .map_err(|e| Error::upstream(format!("amqp delivery error: {e}")))?;

        serde_json::from_slice(&delivery.data).map_err(Error::from)
    }
}

#[async_trait]
impl BusClient for LapinBusClient {
    async fn get_metrics(&self, params: GetMetricsParams) -> Result<BTreeMap<String, MetricMetadata>> {
        self.rpc("get_metrics", &params, StdDuration::from_secs(30)).await
    }

    async fn history_data_request(
        &self,
        params: HistoryRequestParams,
    ) -> Result<Option<HistoryResponse>> {
        let deadline = StdDuration::from_nanos(params.timeout.ns().max(0) as u64);
        self.rpc("history_data_request", &params, deadline).await
    }

    async fn history_aggregate_request(
        &self,
        params: AggregateRequestParams,
    ) -> Result<Option<TimeAggregate>> {
        self.rpc("history_aggregate_request", &params, StdDuration::from_secs(30)).await
    }
}
