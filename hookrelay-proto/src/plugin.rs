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

//! Plugin hook messages.

/// Scheduler-side view of one job, as handed to plugins.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobInfo {
    #[prost(uint32, tag = "1")]
    pub job_id: u32,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub partition: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub account: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub username: ::prost::alloc::string::String,
    #[prost(uint32, tag = "6")]
    pub uid: u32,
    #[prost(string, tag = "7")]
    pub node_list: ::prost::alloc::string::String,
    #[prost(enumeration = "JobStatus", tag = "8")]
    pub status: i32,
    #[prost(uint32, tag = "9")]
    pub exit_code: u32,
    #[prost(message, optional, tag = "10")]
    pub submit_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "11")]
    pub start_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "12")]
    pub end_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "13")]
    pub time_limit: ::core::option::Option<::prost_types::Duration>,
    /// Filled in by the client when an end hook is enqueued.
    #[prost(message, optional, tag = "14")]
    pub elapsed_time: ::core::option::Option<::prost_types::Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum JobStatus {
    Pending = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    ExceedTimeLimit = 4,
    Cancelled = 5,
    OutOfMemory = 6,
}

impl JobStatus {
    /// String value of the enum field name used in the schema.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::ExceedTimeLimit => "ExceedTimeLimit",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::OutOfMemory => "OutOfMemory",
        }
    }

    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Running" => Some(Self::Running),
            "Completed" => Some(Self::Completed),
            "Failed" => Some(Self::Failed),
            "ExceedTimeLimit" => Some(Self::ExceedTimeLimit),
            "Cancelled" => Some(Self::Cancelled),
            "OutOfMemory" => Some(Self::OutOfMemory),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartHookRequest {
    #[prost(message, repeated, tag = "1")]
    pub job_info_list: ::prost::alloc::vec::Vec<JobInfo>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct StartHookReply {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndHookRequest {
    #[prost(message, repeated, tag = "1")]
    pub job_info_list: ::prost::alloc::vec::Vec<JobInfo>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct EndHookReply {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobMonitorHookRequest {
    #[prost(uint32, tag = "1")]
    pub job_id: u32,
    #[prost(string, tag = "2")]
    pub cgroup: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct JobMonitorHookReply {}
