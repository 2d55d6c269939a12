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

//! Unary client for the plugin daemon service.

use tonic::codegen::*;

use crate::plugin::{
    EndHookReply, EndHookRequest, JobMonitorHookReply, JobMonitorHookRequest, StartHookReply,
    StartHookRequest,
};
use crate::SERVICE_NAME;

/// Client stub bound to any gRPC service (normally a `tonic::transport::Channel`).
#[derive(Debug, Clone)]
pub struct CranePluginDClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl<T> CranePluginDClient<T>
where
    T: tonic::client::GrpcService<tonic::body::BoxBody>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + std::marker::Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + std::marker::Send,
{
    pub fn new(inner: T) -> Self {
        let inner = tonic::client::Grpc::new(inner);
        Self { inner }
    }

    pub async fn start_hook(
        &mut self,
        request: impl tonic::IntoRequest<StartHookRequest>,
    ) -> std::result::Result<tonic::Response<StartHookReply>, tonic::Status> {
        self.unary(request, "StartHook").await
    }

    pub async fn end_hook(
        &mut self,
        request: impl tonic::IntoRequest<EndHookRequest>,
    ) -> std::result::Result<tonic::Response<EndHookReply>, tonic::Status> {
        self.unary(request, "EndHook").await
    }

    pub async fn job_monitor_hook(
        &mut self,
        request: impl tonic::IntoRequest<JobMonitorHookRequest>,
    ) -> std::result::Result<tonic::Response<JobMonitorHookReply>, tonic::Status> {
        self.unary(request, "JobMonitorHook").await
    }

    async fn unary<Req, Reply>(
        &mut self,
        request: impl tonic::IntoRequest<Req>,
        method: &'static str,
    ) -> std::result::Result<tonic::Response<Reply>, tonic::Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Reply: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unavailable(format!("Service was not ready: {}", e.into()))
        })?;
        let codec = tonic::codec::ProstCodec::<Req, Reply>::default();
        let path = http::uri::PathAndQuery::try_from(format!("/{}/{}", SERVICE_NAME, method))
            .map_err(|e| tonic::Status::internal(format!("invalid method path: {}", e)))?;
        let mut req = request.into_request();
        req.extensions_mut()
            .insert(GrpcMethod::new(SERVICE_NAME, method));
        self.inner.unary(req, path, codec).await
    }
}
