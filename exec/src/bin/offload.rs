//! The wrapper binary. Invoke it in front of a compile command:
//!
//! ```text
//! offload --dep main.c --output-file main.o -- cc -c main.c -o main.o
//! ```
//!
//! If the command is remote-eligible it runs on the configured Remote
//! Execution cluster and its outputs are written back locally; otherwise
//! the command is exec'd in place.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;
use url::Url;

use offload_castore::cas::CasClient;
use offload_castore::context::{Auth, RequestContext, TokenSession};
use offload_castore::retry::RetryPolicy;
use offload_castore::tonic::channel_from_url;
use offload_castore::Error;
use offload_exec::action::{build_action, ActionOptions};
use offload_exec::client::RemoteExecutionClient;
use offload_exec::command::ParsedCommand;
use offload_exec::signals;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// A global log level to use when printing logs. `RUST_LOG` takes
    /// priority when set.
    #[arg(long, default_value_t = Level::WARN)]
    log_level: Level,

    /// Execution service URL (grpc+http, grpc+https or grpc+unix).
    #[arg(long, env = "OFFLOAD_SERVER", default_value = "grpc+http://localhost:8085")]
    server: Url,

    /// CAS service URL. Defaults to the execution service.
    #[arg(long, env = "OFFLOAD_CAS_SERVER")]
    cas_server: Option<Url>,

    /// Action cache service URL. Defaults to the CAS service.
    #[arg(long, env = "OFFLOAD_ACTION_CACHE_SERVER")]
    action_cache_server: Option<Url>,

    /// Instance name to pass to the services.
    #[arg(long, env = "OFFLOAD_INSTANCE", default_value = "main")]
    instance: String,

    /// Number of times to retry failed requests.
    #[arg(long, env = "OFFLOAD_RETRY_LIMIT", default_value_t = 0)]
    retry_limit: u32,

    /// Base delay in milliseconds between retries; grows exponentially.
    #[arg(long, env = "OFFLOAD_RETRY_DELAY", default_value_t = 100)]
    retry_delay: u64,

    /// Bearer-token JSON file ({"access_token": ...}); refreshed
    /// out-of-band, re-read on UNAUTHENTICATED.
    #[arg(long, env = "OFFLOAD_AUTH_TOKEN_FILE")]
    auth_token_file: Option<PathBuf>,

    /// Correlation id tying this invocation to the surrounding build.
    #[arg(long, env = "OFFLOAD_CORRELATED_INVOCATIONS_ID", default_value = "")]
    correlated_invocations_id: String,

    /// An input file of the command, as determined by your dependency
    /// scanner. Repeat per file, or pass a comma-separated list.
    #[arg(long = "dep", env = "OFFLOAD_DEPS", value_delimiter = ',')]
    deps: Vec<String>,

    /// Send this whole directory tree as the input root instead of --dep
    /// entries.
    #[arg(long, env = "OFFLOAD_DEPS_DIRECTORY")]
    deps_directory: Option<PathBuf>,

    /// An output file to request back from the build server.
    #[arg(long = "output-file", env = "OFFLOAD_OUTPUT_FILES", value_delimiter = ',')]
    output_files: Vec<String>,

    /// An output directory to request back from the build server.
    #[arg(
        long = "output-directory",
        env = "OFFLOAD_OUTPUT_DIRECTORIES",
        value_delimiter = ','
    )]
    output_directories: Vec<String>,

    /// KEY=VALUE environment variable for the remote build environment.
    #[arg(long = "remote-env", env = "OFFLOAD_REMOTE_ENV", value_delimiter = ',')]
    remote_env: Vec<String>,

    /// KEY=VALUE platform property the build server uses to select a
    /// worker.
    #[arg(long = "platform", env = "OFFLOAD_PLATFORM", value_delimiter = ',')]
    platform: Vec<String>,

    /// Send the command to the build server even if it was not recognized
    /// as a compile.
    #[arg(long, env = "OFFLOAD_FORCE_REMOTE")]
    force_remote: bool,

    /// Set the `do_not_cache` flag so the action result is never cached.
    #[arg(long, env = "OFFLOAD_DO_NOT_CACHE")]
    do_not_cache: bool,

    /// Skip the action cache lookup and re-run the action.
    #[arg(long, env = "OFFLOAD_SKIP_CACHE")]
    skip_cache: bool,

    /// Do not write the build outputs to disk.
    #[arg(long, env = "OFFLOAD_DONT_SAVE_OUTPUT")]
    dont_save_output: bool,

    /// The command to run.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    command: Vec<String>,
}

fn parse_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>, Error> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| Error::Precondition(format!("expected KEY=VALUE, got {:?}", pair)))
        })
        .collect()
}

/// Replaces this process with the command, the fallback when it is not
/// remote-eligible. Only returns on exec failure.
fn run_locally(argv: &[String]) -> Error {
    use std::os::unix::process::CommandExt;
    debug!("running locally");
    let err = std::process::Command::new(&argv[0]).args(&argv[1..]).exec();
    Error::io(&argv[0], err)
}

async fn run(cli: Cli) -> Result<i32, Error> {
    let cancel = signals::install();
    let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;

    let parsed = ParsedCommand {
        arguments: cli.command.clone(),
        // Recognizing compiles and extracting dependencies belong to an
        // external parser; operating as a plain wrapper, a command with
        // declared inputs is remote-eligible.
        is_compiler_command: !cli.deps.is_empty() || cli.deps_directory.is_some(),
        input_paths: cli.deps.iter().cloned().collect(),
        output_paths: BTreeSet::new(),
    };

    let options = ActionOptions {
        force_remote: cli.force_remote,
        do_not_cache: cli.do_not_cache,
        deps_directory: cli.deps_directory.clone(),
        output_files: cli.output_files.iter().cloned().collect(),
        output_directories: cli.output_directories.iter().cloned().collect(),
        remote_env: parse_pairs(&cli.remote_env)?,
        platform: parse_pairs(&cli.platform)?,
    };

    let built = match build_action(&parsed, &cwd, &options)? {
        Some(built) => built,
        None => return Err(run_locally(&cli.command)),
    };
    info!(action = %built.action_digest, "action built");

    let auth = match &cli.auth_token_file {
        Some(path) => Auth::Token(TokenSession::open(path)?),
        None => Auth::None,
    };
    let context = Arc::new(RequestContext::new(
        auth,
        cli.correlated_invocations_id.clone(),
        cancel,
    ));
    context.set_action_id(built.action_digest.hash.clone());
    let retry = RetryPolicy::new(cli.retry_limit, Duration::from_millis(cli.retry_delay));

    let endpoint_error =
        |e| Error::Precondition(format!("cannot set up server channel: {}", e));
    let execution_channel = channel_from_url(&cli.server).await.map_err(endpoint_error)?;
    let cas_url = cli.cas_server.clone().unwrap_or_else(|| cli.server.clone());
    let cas_channel = channel_from_url(&cas_url).await.map_err(endpoint_error)?;
    let action_cache_url = cli.action_cache_server.clone().unwrap_or_else(|| cas_url.clone());
    let action_cache_channel = channel_from_url(&action_cache_url)
        .await
        .map_err(endpoint_error)?;

    let cas = CasClient::new(
        cas_channel,
        cli.instance.clone(),
        context.clone(),
        retry.clone(),
    );
    let client = RemoteExecutionClient::new(
        execution_channel,
        action_cache_channel,
        cas,
        context,
        retry,
        cli.instance.clone(),
    );

    // Look in the action cache first, if allowed. Lookup failures are a
    // miss, not a fatal error.
    let mut result = None;
    if !cli.skip_cache {
        match client.fetch_from_action_cache(&built.action_digest).await {
            Ok(cached) => {
                if cached.is_some() {
                    info!(action = %built.action_digest.hash, "action cache hit");
                }
                result = cached;
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => warn!("action cache lookup failed: {}", e),
        }
    }

    let result = match result {
        Some(result) => result,
        None => {
            debug!("uploading resources");
            client
                .cas()
                .upload_resources(&built.blobs, &built.files)
                .await?;
            debug!("executing action");
            client
                .execute_action(&built.action_digest, cli.skip_cache)
                .await?
        }
    };

    // Pass the remote compiler output through as if it ran here.
    let stdout = client
        .get_output_blob(&result.stdout_raw, &result.stdout_digest)
        .await?;
    let stderr = client
        .get_output_blob(&result.stderr_raw, &result.stderr_digest)
        .await?;
    std::io::stdout()
        .write_all(&stdout)
        .map_err(|e| Error::io("stdout", e))?;
    std::io::stderr()
        .write_all(&stderr)
        .map_err(|e| Error::io("stderr", e))?;

    if !cli.dont_save_output {
        client.write_files_to_disk(&result, &cwd).await?;
    }

    Ok(result.exit_code)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(cli.log_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(Error::Cancelled) => std::process::exit(signals::SIGINT_EXIT_CODE),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
