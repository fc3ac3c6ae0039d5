//! The client side of the Leaf scheduler protocol.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::Instant;
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

use leaf_api::leaf::leaf_client;
use leaf_api::leaf::{
    CpuConfig, CreateFunctionRequest, FunctionId, ImageTag, ResourceConfig, ScheduleCallRequest,
};

use crate::collector::CallResult;
use crate::config::FunctionResources;

// Trailer keys as they appear on the wire (gRPC lowercases metadata keys).
const TRAILER_CALL_QUEUED: &str = "callqueuedtimestamp";
const TRAILER_GOT_RESPONSE: &str = "gotresponsetimestamp";
const TRAILER_INSTANCE_ID: &str = "instanceid";
const TRAILER_LEAF_GOT_REQUEST: &str = "leafgotrequesttimestamp";
const TRAILER_LEAF_SCHEDULED_CALL: &str = "leafscheduledcalltimestamp";
const TRAILER_FUNCTION_PROCESSING_TIME: &str = "functionprocessingtime";

/// Client for the Leaf scheduler.
///
/// Wraps a single lazily-established plaintext channel. Clones share the
/// channel and are cheap enough to hand one to every call task.
#[derive(Debug, Clone)]
pub struct LeafClient {
    client: leaf_client::LeafClient<Channel>,
    timeout: Duration,
}

impl LeafClient {
    /// Sets up the channel to `address` (`host:port`).
    ///
    /// The connection itself is only established on first use; reachability
    /// problems surface on the first call.
    pub fn connect(address: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{address}"))
            .with_context(|| format!("invalid leaf address {address}"))?;
        Ok(Self {
            client: leaf_client::LeafClient::new(endpoint.connect_lazy()),
            timeout,
        })
    }

    /// Registers a function image with the Leaf and returns the assigned
    /// function id.
    pub async fn create_function(
        &self,
        image_tag: &str,
        resources: &FunctionResources,
    ) -> Result<String> {
        let request = CreateFunctionRequest {
            image_tag: Some(ImageTag {
                tag: image_tag.to_owned(),
            }),
            config: Some(ResourceConfig {
                memory: resources.memory.as_u64() as i64,
                cpu: Some(CpuConfig {
                    period: resources.cpu.period,
                    quota: resources.cpu.quota,
                }),
            }),
        };

        let mut client = self.client.clone();
        let response = client.create_function(request).await?.into_inner();
        let function_id = response
            .function_id
            .context("Leaf returned no function id")?;
        Ok(function_id.id)
    }

    /// Issues one call and captures everything about it as a [`CallResult`].
    ///
    /// This never fails: RPC errors and deadline hits are recorded in the
    /// result's status and error fields. The call is cut off at
    /// `min(deadline, now + timeout)`.
    pub async fn schedule_call(
        &self,
        deadline: Instant,
        function_id: &str,
        image_tag: &str,
        payload: Vec<u8>,
    ) -> CallResult {
        let mut result = CallResult::pending(function_id, image_tag, payload.len() as u64);

        let mut request = tonic::Request::new(ScheduleCallRequest {
            function_id: Some(FunctionId {
                id: function_id.to_owned(),
            }),
            data: payload,
        });
        request.set_timeout(self.timeout);

        let call_deadline = deadline.min(Instant::now() + self.timeout);
        let mut client = self.client.clone();

        let start = Instant::now();
        let outcome = tokio::time::timeout_at(call_deadline, client.schedule_call(request)).await;
        result.latency = start.elapsed();

        match outcome {
            Ok(Ok(response)) => {
                let (trailers, response, _) = response.into_parts();
                result.response_size = response.data.len() as u64;
                result.call_queued = trailer(&trailers, TRAILER_CALL_QUEUED);
                result.got_response = trailer(&trailers, TRAILER_GOT_RESPONSE);
                result.instance_id = trailer(&trailers, TRAILER_INSTANCE_ID);
                result.leaf_got_request = trailer(&trailers, TRAILER_LEAF_GOT_REQUEST);
                result.leaf_scheduled_call = trailer(&trailers, TRAILER_LEAF_SCHEDULED_CALL);
                result.function_processing_time =
                    trailer(&trailers, TRAILER_FUNCTION_PROCESSING_TIME);
            }
            Ok(Err(status)) => {
                result.status = status.code();
                result.error = status.message().to_owned();
            }
            Err(_) => {
                result.status = Code::DeadlineExceeded;
                result.error = "deadline elapsed before the Leaf responded".to_owned();
            }
        }

        result
    }
}

/// Looks up one trailer value; for unary calls tonic merges response trailers
/// into the response metadata.
fn trailer(trailers: &MetadataMap, key: &'static str) -> String {
    match trailers.get(key).and_then(|value| value.to_str().ok()) {
        Some(value) => value.to_owned(),
        None => {
            tracing::warn!(key, "response carried no trailer value");
            String::new()
        }
    }
}
