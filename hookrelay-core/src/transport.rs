// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! gRPC transport to the plugin daemon over a Unix domain socket.
//!
//! The channel is established lazily by [`PluginStub::wait_for_connected`] and
//! cached. Any `UNAVAILABLE` result drops the cached channel so the next poll
//! reconnects from scratch. Each RPC is driven to completion on a private
//! current-thread runtime, so callers block exactly for the duration of the
//! call and never need an async context of their own.

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hookrelay_proto::{
    CranePluginDClient, EndHookReply, EndHookRequest, JobMonitorHookReply, JobMonitorHookRequest,
    StartHookReply, StartHookRequest,
};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tokio::runtime::Runtime;
use tonic::transport::{Channel, Endpoint, Uri};
use tonic::{Code, Status};
use tower::service_fn;
use tracing::{debug, trace};

use crate::config::PluginConfig;
use crate::delivery::is_transient;
use crate::dispatch::{CallContext, PluginStub};
use crate::error::{HookRelayError, Result};

/// Placeholder authority; the connector ignores it and dials the socket path.
const UDS_AUTHORITY: &str = "http://[::]:50051";

/// Unix socket gRPC client implementing [`PluginStub`].
pub struct GrpcTransport {
    runtime: Runtime,
    endpoint: Endpoint,
    socket_path: PathBuf,
    client: Option<CranePluginDClient<Channel>>,
}

impl GrpcTransport {
    /// Prepare a transport for `config.endpoint`. No connection is made yet.
    pub fn new(config: &PluginConfig) -> Result<Self> {
        let socket_path = config.socket_path()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(HookRelayError::Runtime)?;

        let endpoint = Endpoint::from_static(UDS_AUTHORITY)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .http2_keep_alive_interval(Duration::from_secs(config.keepalive_interval_secs))
            .keep_alive_timeout(Duration::from_secs(config.keepalive_timeout_secs))
            .keep_alive_while_idle(config.keepalive_while_idle);

        Ok(Self {
            runtime,
            endpoint,
            socket_path,
            client: None,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Whether a channel is currently cached.
    pub fn has_channel(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(
        endpoint: Endpoint,
        socket_path: PathBuf,
    ) -> std::result::Result<Channel, tonic::transport::Error> {
        endpoint
            .connect_with_connector(service_fn(move |_: Uri| {
                let socket_path = socket_path.clone();
                async move {
                    let stream = UnixStream::connect(socket_path).await?;
                    Ok::<_, std::io::Error>(TokioIo::new(stream))
                }
            }))
            .await
    }

    fn client(&self) -> std::result::Result<CranePluginDClient<Channel>, Status> {
        self.client
            .clone()
            .ok_or_else(|| Status::unavailable("plugin daemon channel is not established"))
    }

    fn request<T>(context: &CallContext, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        if let Some(timeout) = context.timeout() {
            request.set_timeout(timeout);
        }
        request
    }

    /// Copy the reply out, or record failure detail and classify the status.
    fn complete<Reply>(
        &mut self,
        context: &mut CallContext,
        result: std::result::Result<tonic::Response<Reply>, Status>,
        reply: &mut Reply,
    ) -> std::result::Result<(), Status> {
        match result {
            Ok(response) => {
                *reply = response.into_inner();
                Ok(())
            }
            Err(status) => {
                let detail = status
                    .source()
                    .map(|source| source.to_string())
                    .unwrap_or_else(|| format!("grpc status {:?}", status.code()));
                context.set_debug_error(detail);

                let status = normalize_status(status);
                if is_transient(&status) {
                    debug!(socket = ?self.socket_path, "Dropping plugin daemon channel");
                    self.client = None;
                }
                Err(status)
            }
        }
    }
}

/// Failures raised by the transport itself (socket gone, connection reset)
/// are reported as `UNAVAILABLE` whatever code tonic attached to them.
fn normalize_status(status: Status) -> Status {
    if status.code() == Code::Unavailable {
        return status;
    }
    let from_transport = status.source().is_some_and(|source| {
        source.downcast_ref::<tonic::transport::Error>().is_some()
            || source.downcast_ref::<std::io::Error>().is_some()
    });
    if from_transport {
        Status::unavailable(status.message().to_string())
    } else {
        status
    }
}

impl PluginStub for GrpcTransport {
    fn wait_for_connected(&mut self, timeout: Duration) -> bool {
        if self.client.is_some() {
            return true;
        }

        let endpoint = self.endpoint.clone();
        let socket_path = self.socket_path.clone();
        let connected = self.runtime.block_on(async move {
            tokio::time::timeout(timeout, Self::connect(endpoint, socket_path)).await
        });

        match connected {
            Ok(Ok(channel)) => {
                self.client = Some(CranePluginDClient::new(channel));
                true
            }
            Ok(Err(e)) => {
                trace!(socket = ?self.socket_path, "Plugin daemon connect failed: {}", e);
                false
            }
            Err(_) => {
                trace!(socket = ?self.socket_path, "Plugin daemon connect timed out");
                false
            }
        }
    }

    fn start_hook(
        &mut self,
        context: &mut CallContext,
        request: &StartHookRequest,
        reply: &mut StartHookReply,
    ) -> std::result::Result<(), Status> {
        let mut client = self.client()?;
        let request = Self::request(context, request.clone());
        let result = self.runtime.block_on(client.start_hook(request));
        self.complete(context, result, reply)
    }

    fn end_hook(
        &mut self,
        context: &mut CallContext,
        request: &EndHookRequest,
        reply: &mut EndHookReply,
    ) -> std::result::Result<(), Status> {
        let mut client = self.client()?;
        let request = Self::request(context, request.clone());
        let result = self.runtime.block_on(client.end_hook(request));
        self.complete(context, result, reply)
    }

    fn job_monitor_hook(
        &mut self,
        context: &mut CallContext,
        request: &JobMonitorHookRequest,
        reply: &mut JobMonitorHookReply,
    ) -> std::result::Result<(), Status> {
        let mut client = self.client()?;
        let request = Self::request(context, request.clone());
        let result = self.runtime.block_on(client.job_monitor_hook(request));
        self.complete(context, result, reply)
    }
}
