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

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hookrelay_core::proto::JobInfo;
use hookrelay_core::{init_logging, GrpcTransport, HookRelayConfig, PluginClient, PluginStub};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Plugin daemon endpoint, e.g. unix:///run/crane/cplugind.sock (overrides config file)
    #[arg(long, global = true, env = "HOOKRELAY_PLUGIN_ENDPOINT")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a start hook for one batch of jobs
    Start {
        #[arg(long = "job-id", required = true, num_args = 1..)]
        job_ids: Vec<u32>,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        partition: String,

        #[arg(long, default_value_t = 10)]
        drain_timeout_secs: u64,
    },
    /// Send an end hook for jobs that started N seconds ago
    End {
        #[arg(long = "job-id", required = true, num_args = 1..)]
        job_ids: Vec<u32>,

        #[arg(long)]
        started_secs_ago: i64,

        #[arg(long, default_value_t = 10)]
        drain_timeout_secs: u64,
    },
    /// Send a resource monitor hook for one job's cgroup
    Monitor {
        #[arg(long)]
        job_id: u32,

        #[arg(long)]
        cgroup: String,

        #[arg(long, default_value_t = 10)]
        drain_timeout_secs: u64,
    },
    /// Check whether the plugin daemon is reachable
    Check,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = HookRelayConfig::load(args.config)?;
    if let Some(endpoint) = args.endpoint {
        config.plugin.endpoint = endpoint;
        config.validate()?;
    }

    init_logging(&config.logging)?;

    match args.command {
        Command::Start {
            job_ids,
            name,
            partition,
            drain_timeout_secs,
        } => {
            let jobs: Vec<JobInfo> = job_ids
                .into_iter()
                .map(|job_id| JobInfo {
                    job_id,
                    name: name.clone(),
                    partition: partition.clone(),
                    ..Default::default()
                })
                .collect();
            send(&config, drain_timeout_secs, |client| {
                client.start_hook_async(jobs)
            })
        }
        Command::End {
            job_ids,
            started_secs_ago,
            drain_timeout_secs,
        } => {
            let started = chrono::Utc::now().timestamp() - started_secs_ago;
            let jobs: Vec<JobInfo> = job_ids
                .into_iter()
                .map(|job_id| JobInfo {
                    job_id,
                    start_time: Some(prost_types::Timestamp {
                        seconds: started,
                        nanos: 0,
                    }),
                    ..Default::default()
                })
                .collect();
            send(&config, drain_timeout_secs, |client| {
                client.end_hook_async(jobs)
            })
        }
        Command::Monitor {
            job_id,
            cgroup,
            drain_timeout_secs,
        } => send(&config, drain_timeout_secs, |client| {
            client.job_monitor_hook_async(job_id, cgroup)
        }),
        Command::Check => check(&config),
    }
}

fn send(
    config: &HookRelayConfig,
    drain_timeout_secs: u64,
    enqueue: impl FnOnce(&PluginClient),
) -> Result<()> {
    let client = PluginClient::connect(&config.plugin)
        .with_context(|| format!("failed to set up plugin client for {}", config.plugin.endpoint))?;

    enqueue(&client);

    let deadline = Instant::now() + Duration::from_secs(drain_timeout_secs);
    while Instant::now() < deadline {
        let stats = client.stats();
        if stats.total_sent + stats.total_rejected > 0 {
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }

    let stats = client.stats();
    let pending = client.pending_events();
    client.shutdown();

    println!("Endpoint: {}", config.plugin.endpoint);
    println!("  sent:     {}", stats.total_sent);
    println!("  rejected: {}", stats.total_rejected);
    println!("  requeued: {}", stats.total_requeued);
    println!("  pending:  {}", pending);

    if stats.total_sent == 0 {
        bail!(
            "hook event was not delivered within {}s",
            drain_timeout_secs
        );
    }
    Ok(())
}

fn check(config: &HookRelayConfig) -> Result<()> {
    let mut transport = GrpcTransport::new(&config.plugin)?;
    let timeout = Duration::from_millis(config.plugin.connect_timeout_ms);

    info!(socket = ?transport.socket_path(), "Checking plugin daemon");
    if transport.wait_for_connected(timeout) {
        println!("Plugin daemon at {} is reachable", config.plugin.endpoint);
        Ok(())
    } else {
        bail!(
            "plugin daemon at {} is not reachable within {}ms",
            config.plugin.endpoint,
            timeout.as_millis()
        )
    }
}
