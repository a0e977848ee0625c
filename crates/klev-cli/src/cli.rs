//! Argument parsing, command dispatch, and process-level outcome handling.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use klev_api_models::{AclItem, CleanupPolicy, DEFAULT_CONSUME_LEN, EgressPayload};
use klev_telemetry::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging, invocation_span, record_outcome,
};
use reqwest::Url;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{
    ClientConfig, CliResult, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, parse_url,
};
use crate::commands::{
    consume, egress_webhooks, filters, ingress_webhooks, logs, offsets, paths, publish, receive,
    tokens,
};
use crate::output::render_error;

/// Exit code used when the process is interrupted by Ctrl-C.
pub(crate) const EXIT_INTERRUPTED: i32 = 130;

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let trace_id = Uuid::new_v4().to_string();
    let span = invocation_span(cli.command.label(), &trace_id);
    let exit_code = execute(cli, &trace_id).instrument(span.clone()).await;
    record_outcome(&span, exit_code);
    exit_code
}

async fn execute(cli: Cli, trace_id: &str) -> i32 {
    // The receiver installs its own signal handling for graceful shutdown.
    let interruptible = !matches!(cli.command, Command::Receive(_));
    let result = if interruptible {
        match until_interrupted(dispatch(cli, trace_id), tokio::signal::ctrl_c()).await {
            Some(result) => result,
            None => return EXIT_INTERRUPTED,
        }
    } else {
        dispatch(cli, trace_id).await
    };

    match result {
        Ok(()) => 0,
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            render_error(&err);
            err.exit_code()
        }
    }
}

/// Drive `work` to completion unless `interrupt` fires first.
///
/// A failed interrupt registration disables that branch; the work still runs.
async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = io::Result<()>>,
) -> Option<T> {
    tokio::select! {
        value = work => Some(value),
        Ok(()) = interrupt => {
            tracing::info!("interrupted");
            None
        }
    }
}

async fn dispatch(cli: Cli, trace_id: &str) -> CliResult<()> {
    let ctx = ClientConfig {
        base_url: cli.base_url,
        token: cli.authtoken,
        timeout: Duration::from_secs(cli.timeout),
    }
    .connect(trace_id)?;

    match cli.command {
        Command::Paths => paths::run(&ctx).await,
        Command::Logs(command) => logs::run(&ctx, command).await,
        Command::Offsets(command) => offsets::run(&ctx, command).await,
        Command::Tokens(command) => tokens::run(&ctx, command).await,
        Command::IngressWebhooks(command) => ingress_webhooks::run(&ctx, command).await,
        Command::EgressWebhooks(command) => egress_webhooks::run(&ctx, command).await,
        Command::Filters(command) => filters::run(&ctx, command).await,
        Command::Publish(args) => publish::run(&ctx, args).await,
        Command::Consume(args) => consume::run(&ctx, args).await,
        Command::Receive(args) => receive::run(args).await,
    }
}

#[derive(Parser)]
#[command(name = "klev", version, about = "Command-line client for the klev log service")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "KLEV_TOKEN",
        hide_env_values = true,
        help = "Token used for authorization"
    )]
    pub(crate) authtoken: Option<String>,
    #[arg(
        long,
        global = true,
        env = "KLEV_URL",
        value_parser = parse_url,
        default_value = DEFAULT_BASE_URL,
        hide = true
    )]
    pub(crate) base_url: Url,
    #[arg(
        long,
        global = true,
        env = "KLEV_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Per-request timeout in seconds"
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "KLEV_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level directive written to stderr"
    )]
    pub(crate) log_level: String,
    #[arg(
        long,
        global = true,
        env = "KLEV_LOG_FORMAT",
        default_value = "pretty",
        help = "Log format: pretty or json"
    )]
    pub(crate) log_format: LogFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Get the API paths; validates the token.
    Paths,
    /// Interact with logs.
    #[command(subcommand)]
    Logs(LogsCommand),
    /// Interact with offsets.
    #[command(subcommand)]
    Offsets(OffsetsCommand),
    /// Interact with tokens.
    #[command(subcommand)]
    Tokens(TokensCommand),
    /// Interact with ingress webhooks.
    #[command(subcommand)]
    IngressWebhooks(IngressWebhooksCommand),
    /// Interact with egress webhooks.
    #[command(subcommand)]
    EgressWebhooks(EgressWebhooksCommand),
    /// Interact with filters.
    #[command(subcommand)]
    Filters(FiltersCommand),
    /// Publish a message.
    Publish(PublishArgs),
    /// Consume messages.
    Consume(ConsumeArgs),
    /// Receive messages from an egress webhook.
    Receive(ReceiveArgs),
}

impl Command {
    pub(crate) const fn label(&self) -> &'static str {
        match self {
            Self::Paths => "paths",
            Self::Logs(_) => "logs",
            Self::Offsets(_) => "offsets",
            Self::Tokens(_) => "tokens",
            Self::IngressWebhooks(_) => "ingress-webhooks",
            Self::EgressWebhooks(_) => "egress-webhooks",
            Self::Filters(_) => "filters",
            Self::Publish(_) => "publish",
            Self::Consume(_) => "consume",
            Self::Receive(_) => "receive",
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct ListArgs {
    #[arg(long, help = "Find by metadata instead of listing everything")]
    pub(crate) metadata: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct IdArgs {
    #[arg(help = "Resource identifier")]
    pub(crate) id: String,
}

#[derive(Subcommand, Debug)]
pub(crate) enum LogsCommand {
    /// List logs, or find them by metadata.
    List(ListArgs),
    /// Create a new log.
    Create(LogCreateArgs),
    /// Get a log.
    Get(IdArgs),
    /// Update a log.
    Update(LogUpdateArgs),
    /// Get log statistics.
    Stats(IdArgs),
    /// Delete a log.
    Delete(IdArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct CleanupArgs {
    #[arg(long, help = "Trim once the log exceeds this many bytes")]
    pub(crate) trim_bytes: Option<i64>,
    #[arg(long, help = "Trim once the log holds more than this many messages")]
    pub(crate) trim_count: Option<i64>,
    #[arg(long, help = "Trim messages older than this many seconds")]
    pub(crate) trim_seconds: Option<i64>,
    #[arg(long, help = "Compact messages older than this many seconds")]
    pub(crate) compact_seconds: Option<i64>,
    #[arg(long, help = "Expire the latest message of a key after this many seconds")]
    pub(crate) expire_seconds: Option<i64>,
}

impl From<CleanupArgs> for CleanupPolicy {
    fn from(args: CleanupArgs) -> Self {
        Self {
            trim_bytes: args.trim_bytes,
            trim_count: args.trim_count,
            trim_seconds: args.trim_seconds,
            compact_seconds: args.compact_seconds,
            expire_seconds: args.expire_seconds,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct LogCreateArgs {
    #[arg(long, default_value = "", help = "Machine readable metadata")]
    pub(crate) metadata: String,
    #[arg(long, help = "Keep only the latest message per key")]
    pub(crate) compacting: bool,
    #[command(flatten)]
    pub(crate) cleanup: CleanupArgs,
}

#[derive(Args, Debug)]
pub(crate) struct LogUpdateArgs {
    #[arg(help = "Log identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Machine readable metadata")]
    pub(crate) metadata: Option<String>,
    #[command(flatten)]
    pub(crate) cleanup: CleanupArgs,
}

#[derive(Subcommand, Debug)]
pub(crate) enum OffsetsCommand {
    /// List offsets, or find them by metadata.
    List(ListArgs),
    /// Create a new offset.
    Create(OffsetCreateArgs),
    /// Get an offset.
    Get(IdArgs),
    /// Update an offset.
    Update(OffsetUpdateArgs),
    /// Set the stored position of an offset.
    Set(OffsetSetArgs),
    /// Acknowledge a processed position; the offset only moves forward.
    Ack(OffsetAckArgs),
    /// Delete an offset.
    Delete(IdArgs),
}

#[derive(Args, Debug)]
pub(crate) struct OffsetCreateArgs {
    #[arg(long, help = "Log this offset tracks")]
    pub(crate) log_id: String,
    #[arg(long, default_value = "", help = "Machine readable metadata")]
    pub(crate) metadata: String,
}

#[derive(Args, Debug)]
pub(crate) struct OffsetUpdateArgs {
    #[arg(help = "Offset identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Machine readable metadata")]
    pub(crate) metadata: Option<String>,
    #[arg(long, allow_negative_numbers = true, help = "Stored position")]
    pub(crate) value: Option<i64>,
    #[arg(long, help = "Machine readable metadata for the position")]
    pub(crate) value_metadata: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct OffsetSetArgs {
    #[arg(help = "Offset identifier")]
    pub(crate) id: String,
    #[arg(long, allow_negative_numbers = true, help = "Position to store")]
    pub(crate) value: i64,
    #[arg(long, help = "Machine readable metadata for the position")]
    pub(crate) value_metadata: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct OffsetAckArgs {
    #[arg(help = "Offset identifier")]
    pub(crate) id: String,
    #[arg(long, allow_negative_numbers = true, help = "Processed position")]
    pub(crate) value: i64,
}

#[derive(Subcommand, Debug)]
pub(crate) enum TokensCommand {
    /// List tokens, or find them by metadata.
    List(ListArgs),
    /// Create a new token.
    Create(TokenCreateArgs),
    /// Get a token.
    Get(IdArgs),
    /// Update a token.
    Update(TokenUpdateArgs),
    /// Delete a token.
    Delete(IdArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct TokenCreateArgs {
    #[arg(long, default_value = "", help = "Machine readable metadata")]
    pub(crate) metadata: String,
    #[arg(long, help = "ACL entry as a JSON object; repeat for more entries")]
    pub(crate) acl: Vec<AclItem>,
}

#[derive(Args, Debug)]
pub(crate) struct TokenUpdateArgs {
    #[arg(help = "Token identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Machine readable metadata")]
    pub(crate) metadata: Option<String>,
    #[arg(long, help = "Replacement ACL entry as a JSON object; repeat for more entries")]
    pub(crate) acl: Option<Vec<AclItem>>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum IngressWebhooksCommand {
    /// List ingress webhooks, or find them by metadata.
    List(ListArgs),
    /// Create a new ingress webhook.
    Create(IngressWebhookCreateArgs),
    /// Get an ingress webhook.
    Get(IdArgs),
    /// Update an ingress webhook.
    Update(IngressWebhookUpdateArgs),
    /// Replace the secret validating deliveries.
    Rotate(IngressWebhookRotateArgs),
    /// Delete an ingress webhook.
    Delete(IdArgs),
}

#[derive(Args, Debug)]
pub(crate) struct IngressWebhookCreateArgs {
    #[arg(long, help = "Log that will store webhook data")]
    pub(crate) log_id: String,
    #[arg(long = "type", help = "Sender integration of the webhook")]
    pub(crate) kind: String,
    #[arg(long, help = "Secret to validate webhook messages")]
    pub(crate) secret: String,
    #[arg(long, default_value = "", help = "Machine readable metadata")]
    pub(crate) metadata: String,
}

#[derive(Args, Debug)]
pub(crate) struct IngressWebhookUpdateArgs {
    #[arg(help = "Ingress webhook identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Machine readable metadata")]
    pub(crate) metadata: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct IngressWebhookRotateArgs {
    #[arg(help = "Ingress webhook identifier")]
    pub(crate) id: String,
    #[arg(long, help = "New secret to validate webhook messages")]
    pub(crate) secret: String,
}

#[derive(Subcommand, Debug)]
pub(crate) enum EgressWebhooksCommand {
    /// List egress webhooks, or find them by metadata.
    List(ListArgs),
    /// Create a new egress webhook.
    Create(EgressWebhookCreateArgs),
    /// Get an egress webhook.
    Get(IdArgs),
    /// Update an egress webhook.
    Update(EgressWebhookUpdateArgs),
    /// Rotate the signing secret.
    Rotate(EgressWebhookRotateArgs),
    /// Get delivery status.
    Status(IdArgs),
    /// Delete an egress webhook.
    Delete(IdArgs),
}

#[derive(Args, Debug)]
pub(crate) struct EgressWebhookCreateArgs {
    #[arg(long, help = "Log whose messages are delivered")]
    pub(crate) log_id: String,
    #[arg(long, help = "Where to deliver data")]
    pub(crate) destination: String,
    #[arg(long, default_value = "message", help = "What to deliver: message or offset")]
    pub(crate) payload: EgressPayload,
    #[arg(long, default_value = "", help = "Machine readable metadata")]
    pub(crate) metadata: String,
}

#[derive(Args, Debug)]
pub(crate) struct EgressWebhookUpdateArgs {
    #[arg(help = "Egress webhook identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Machine readable metadata")]
    pub(crate) metadata: Option<String>,
    #[arg(long, help = "Where to deliver data")]
    pub(crate) destination: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct EgressWebhookRotateArgs {
    #[arg(help = "Egress webhook identifier")]
    pub(crate) id: String,
    #[arg(long, help = "For how long the old secret stays valid")]
    pub(crate) expire_seconds: Option<i64>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum FiltersCommand {
    /// List filters, or find them by metadata.
    List(ListArgs),
    /// Create a new filter.
    Create(FilterCreateArgs),
    /// Get a filter.
    Get(IdArgs),
    /// Update a filter.
    Update(FilterUpdateArgs),
    /// Get evaluation status.
    Status(IdArgs),
    /// Delete a filter.
    Delete(IdArgs),
}

#[derive(Args, Debug)]
pub(crate) struct FilterCreateArgs {
    #[arg(long, help = "Log the filter reads")]
    pub(crate) source_id: String,
    #[arg(long, help = "Log the filter writes")]
    pub(crate) target_id: String,
    #[arg(long, help = "Expression to evaluate")]
    pub(crate) expression: String,
    #[arg(long, default_value = "", help = "Machine readable metadata")]
    pub(crate) metadata: String,
}

#[derive(Args, Debug)]
pub(crate) struct FilterUpdateArgs {
    #[arg(help = "Filter identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Machine readable metadata")]
    pub(crate) metadata: Option<String>,
    #[arg(long, help = "Expression to evaluate")]
    pub(crate) expression: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct PublishArgs {
    #[arg(help = "Log to publish to")]
    pub(crate) log_id: String,
    #[arg(long, help = "Message time in microseconds since the Unix epoch")]
    pub(crate) time: Option<i64>,
    #[arg(long, help = "Key as a string")]
    pub(crate) key: Option<String>,
    #[arg(long, help = "File to read the key from")]
    pub(crate) key_file: Option<PathBuf>,
    #[arg(long, help = "Key as base64 encoded bytes")]
    pub(crate) key_bytes: Option<String>,
    #[arg(long, help = "Value as a string")]
    pub(crate) value: Option<String>,
    #[arg(long, help = "File to read the value from")]
    pub(crate) value_file: Option<PathBuf>,
    #[arg(long, help = "Value as base64 encoded bytes")]
    pub(crate) value_bytes: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ConsumeArgs {
    #[arg(help = "Log to consume from")]
    pub(crate) log_id: String,
    #[arg(
        long,
        allow_negative_numbers = true,
        help = "Starting offset; -2 is the oldest message, -1 the newest"
    )]
    pub(crate) offset: Option<i64>,
    #[arg(long, help = "Offset resource holding the starting position")]
    pub(crate) offset_id: Option<String>,
    #[arg(long, default_value_t = DEFAULT_CONSUME_LEN, help = "Max messages per batch")]
    pub(crate) size: i32,
    #[arg(long, help = "How long to wait for new messages, e.g. 500ms or 30s")]
    pub(crate) poll: Option<String>,
    #[arg(long, default_value = "string", help = "Payload encoding: string or base64")]
    pub(crate) encoding: String,
    #[arg(long = "continue", help = "Keep consuming until interrupted; requires --poll")]
    pub(crate) repeat: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReceiveArgs {
    #[arg(long, help = "Secret to validate the payload signature")]
    pub(crate) secret: String,
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED), help = "Address to bind")]
    pub(crate) bind: IpAddr,
    #[arg(long, default_value_t = 9000, help = "Port to listen on")]
    pub(crate) port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[tokio::test]
    async fn failed_interrupt_registration_lets_the_command_finish() {
        let work = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            7
        };
        let interrupt = async { Err(io::Error::other("signal handler unavailable")) };
        assert_eq!(until_interrupted(work, interrupt).await, Some(7));
    }

    #[tokio::test]
    async fn interrupt_stops_pending_work() {
        let work = std::future::pending::<i32>();
        let interrupt = async { Ok(()) };
        assert_eq!(until_interrupted(work, interrupt).await, None);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn token_flag_and_defaults_parse() {
        let cli = parse(&["klev", "--authtoken", "tok", "paths"]);
        assert_eq!(cli.authtoken.as_deref(), Some("tok"));
        assert_eq!(cli.base_url.as_str(), "https://api.klev.dev/");
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
        assert_eq!(cli.log_format, LogFormat::Pretty);
        assert!(matches!(cli.command, Command::Paths));
    }

    #[test]
    fn list_metadata_presence_is_preserved() {
        let cli = parse(&["klev", "logs", "list", "--metadata", ""]);
        let Command::Logs(LogsCommand::List(args)) = cli.command else {
            panic!("expected logs list");
        };
        assert_eq!(args.metadata.as_deref(), Some(""));

        let cli = parse(&["klev", "logs", "list"]);
        let Command::Logs(LogsCommand::List(args)) = cli.command else {
            panic!("expected logs list");
        };
        assert!(args.metadata.is_none());
    }

    #[test]
    fn consume_flags_parse() {
        let cli = parse(&[
            "klev", "consume", "log_1", "--offset", "-1", "--size", "2", "--poll", "5s",
            "--encoding", "base64", "--continue",
        ]);
        let Command::Consume(args) = cli.command else {
            panic!("expected consume");
        };
        assert_eq!(args.offset, Some(-1));
        assert_eq!(args.size, 2);
        assert_eq!(args.poll.as_deref(), Some("5s"));
        assert!(args.repeat);
    }

    #[test]
    fn repeated_acl_flags_keep_order() {
        let cli = parse(&[
            "klev",
            "tokens",
            "create",
            "--acl",
            r#"{"object":"logs"}"#,
            "--acl",
            r#"{"object":"offsets"}"#,
        ]);
        let Command::Tokens(TokensCommand::Create(args)) = cli.command else {
            panic!("expected tokens create");
        };
        let objects: Vec<_> = args.acl.iter().map(|item| item.0["object"].clone()).collect();
        assert_eq!(objects, vec!["logs", "offsets"]);
    }

    #[test]
    fn token_update_without_acl_leaves_it_unset() {
        let cli = parse(&["klev", "tokens", "update", "tok_1", "--metadata", "m"]);
        let Command::Tokens(TokensCommand::Update(args)) = cli.command else {
            panic!("expected tokens update");
        };
        assert!(args.acl.is_none());
    }

    #[test]
    fn invalid_acl_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["klev", "tokens", "create", "--acl", "[]"]).is_err());
    }

    #[test]
    fn receive_defaults_to_all_interfaces_on_9000() {
        let cli = parse(&["klev", "receive", "--secret", "s"]);
        let Command::Receive(args) = cli.command else {
            panic!("expected receive");
        };
        assert_eq!(args.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(args.port, 9000);
    }
}
