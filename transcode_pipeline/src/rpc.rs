// /////////////////////////////////////////////////////////////////////////////
// Media Transcode Worker
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! External RPC surface: request/reply DTOs matching the broker's JSON
//! shapes, and the async transport port a worker publishes progress and
//! terminal replies through.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use transcode_domain::TranscodeError;

/// `__internal__` sub-object of one requested output version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputInternal {
    pub container: String,
    pub is_update: bool,
}

/// One entry of the request's `outputs` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpec {
    pub container: String,
    pub storage_alias: String,
    #[serde(rename = "__internal__")]
    pub internal: OutputInternal,
}

/// The `rpc.media.transcode_video_file` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeRequest {
    pub resource_id: String,
    pub res_id_encoded: String,
    pub metadata_db: String,
    pub storage_alias: String,
    pub usr_id: u32,
    pub last_upld_req: u32,
    pub parts_size: Vec<u32>,
    #[serde(default)]
    pub elementary_streams: serde_json::Value,
    pub outputs: HashMap<String, OutputSpec>,
}

/// A progress reply: zero or more per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReply {
    pub progress: f64,
}

/// Per-version metadata in a successful terminal reply's `info` map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub container: String,
    pub bytes_written: u64,
}

/// A successful terminal reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalReplyOk {
    pub resource_id: String,
    pub usr_id: u32,
    pub last_upld_req: u32,
    pub info: HashMap<String, VersionInfo>,
}

/// A failed terminal reply. Carries whatever fields the erroring component
/// wrote into the shared error-info map, plus the `_http_resp_code` the
/// outer HTTP layer reads to pick a status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalReplyErr {
    #[serde(rename = "_http_resp_code")]
    pub http_resp_code: u16,
    #[serde(flatten)]
    pub fields: HashMap<String, String>,
}

impl TerminalReplyErr {
    pub fn from_error(err: &TranscodeError) -> Self {
        let mut fields = HashMap::new();
        fields.insert("error".to_string(), err.to_string());
        fields.insert("category".to_string(), err.category().to_string());
        Self {
            http_resp_code: err.http_status(),
            fields,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TerminalReply {
    Ok(TerminalReplyOk),
    Err(TerminalReplyErr),
}

/// Async port a worker publishes replies through. One in-process mock
/// implementation is provided for tests; a real broker-backed transport
/// (AMQP, etc.) plugs in behind the same trait.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn publish_progress(&self, correlation_id: &str, progress: ProgressReply) -> Result<(), TranscodeError>;
    async fn publish_terminal(&self, correlation_id: &str, reply: TerminalReply) -> Result<(), TranscodeError>;
}

/// In-process transport that records published replies for inspection,
/// used as a test double for broker-backed transports.
#[derive(Default)]
pub struct InMemoryRpcTransport {
    pub progress: tokio::sync::Mutex<Vec<(String, ProgressReply)>>,
    pub terminal: tokio::sync::Mutex<Vec<(String, TerminalReply)>>,
}

impl InMemoryRpcTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RpcTransport for InMemoryRpcTransport {
    async fn publish_progress(&self, correlation_id: &str, progress: ProgressReply) -> Result<(), TranscodeError> {
        self.progress.lock().await.push((correlation_id.to_string(), progress));
        Ok(())
    }

    async fn publish_terminal(&self, correlation_id: &str, reply: TerminalReply) -> Result<(), TranscodeError> {
        self.terminal.lock().await.push((correlation_id.to_string(), reply));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_outputs_map_with_internal_fallback() {
        let json = r#"{
            "resource_id": "r1", "res_id_encoded": "cjE=",
            "metadata_db": "db_server_1", "storage_alias": "alias1",
            "usr_id": 42, "last_upld_req": 7,
            "parts_size": [1024, 2048],
            "elementary_streams": {},
            "outputs": {
                "1080": {
                    "container": "hls",
                    "storage_alias": "alias1",
                    "__internal__": { "container": "mp4", "is_update": false }
                }
            }
        }"#;
        let req: TranscodeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.usr_id, 42);
        assert_eq!(req.outputs["1080"].internal.container, "mp4");
    }

    #[test]
    fn terminal_reply_err_carries_http_resp_code_from_error() {
        let err = TranscodeError::storage("source chunk missing");
        let reply = TerminalReplyErr::from_error(&err);
        assert_eq!(reply.http_resp_code, 404);
        assert_eq!(reply.fields.get("category").unwrap(), "storage");
    }

    #[tokio::test]
    async fn in_memory_transport_records_published_replies() {
        let transport = InMemoryRpcTransport::new();
        transport
            .publish_progress("rpc.media.transcode_video_file.corr_id.abc", ProgressReply { progress: 0.5 })
            .await
            .unwrap();
        assert_eq!(transport.progress.lock().await.len(), 1);
    }
}
