use crate::{AppResult, InterpreterScriptHost, config::Config};

use macro_runner_core::{AdapterExit, LaunchArgs, ScriptHostAdapter, connect_to_host};

use tracing::{info, instrument};

/// Worker process body: connect back to the host and serve macro requests.
#[instrument(skip(config))]
pub(crate) async fn run_worker(launch: &str, config: &Config) -> AppResult<AdapterExit> {
    let launch_args: LaunchArgs = launch.parse()?;

    info!(
        correlation_id = %launch_args.correlation_id,
        host_pid = launch_args.host_pid,
        host_version = %launch_args.host_version,
        "Worker starting"
    );

    let (reader, writer) = connect_to_host(launch_args.correlation_id).await?;
    let host = InterpreterScriptHost::new(&config.engine, &launch_args);

    let exit = ScriptHostAdapter::new(host, reader, writer)
        .with_idle_timeout(config.worker.idle_timeout())
        .run()
        .await?;

    info!(exit = ?exit, "Worker exiting");

    Ok(exit)
}
