
use std::io::{self, Read};

use clap::{Parser, Subcommand};
use futures_util::{Stream, StreamExt, future};
use receiver::config::{DEFAULT_MESSAGE_TYPE, DEFAULT_WS_URL};
use receiver::{ChatLine, Incoming, ReceiverError, WriterSink, run_session};
use schema::Schema;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Receiver(#[from] ReceiverError),
    #[error(transparent)]
    Schema(#[from] schema::SchemaError),
    #[error("failed to read frame input: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "chatwire-cli", about = "Protobuf chat receiver and frame inspector")]
struct Cli {
    #[arg(long, env = "CHATWIRE_WS_URL", default_value = DEFAULT_WS_URL)]
    ws_url: String,

    /// Path or http(s) URL of the `.proto` schema.
    #[arg(long, env = "CHATWIRE_SCHEMA", default_value = "http://localhost:3000/protobuf/user_message.proto")]
    schema: String,

    #[arg(long, env = "CHATWIRE_MESSAGE_TYPE", default_value = DEFAULT_MESSAGE_TYPE)]
    message_type: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    ws_url: String,
    schema: String,
    message_type: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and print one `<username> - <text>` line per chat frame.
    Listen,
    /// Decode a single binary frame.
    Decode {
        /// File holding the raw frame bytes, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,

        /// Print every decoded field as JSON instead of the chat line.
        #[arg(long)]
        json: bool,
    },
    /// Print the parsed schema as JSON.
    Schema,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = CliContext { ws_url: cli.ws_url, schema: cli.schema, message_type: cli.message_type };

    match cli.command {
        Command::Listen => run_listen(&ctx).await,
        Command::Decode { input, json } => run_decode(&ctx, &input, json).await,
        Command::Schema => run_schema(&ctx).await,
    }
}

async fn run_listen(cli: &CliContext) -> Result<(), CliError> {
    let stdout = io::stdout();
    let summary = run_session(
        &cli.message_type,
        load_schema_text(&cli.schema),
        connect(&cli.ws_url),
        WriterSink::new(stdout.lock()),
    )
    .await;

    tracing::info!(
        appended = summary.appended,
        failed = summary.failed,
        ignored = summary.ignored,
        dropped = summary.dropped,
        state = %summary.state,
        "session ended"
    );
    Ok(())
}

async fn run_decode(cli: &CliContext, input: &str, json: bool) -> Result<(), CliError> {
    let source = load_schema_text(&cli.schema).await?;
    let message_type = schema::load_type(&source, &cli.message_type)?;
    let frame = read_frame(input)?;
    let message = message_type.decode(&frame)?;

    if json {
        print_json(&message.to_json())?;
    } else {
        println!("{}", ChatLine::from_message(&message)?);
    }
    Ok(())
}

async fn run_schema(cli: &CliContext) -> Result<(), CliError> {
    let source = load_schema_text(&cli.schema).await?;
    let schema = Schema::parse(&source)?;
    print_json(&schema_json(&schema))
}

/// Fetch the schema text from an http(s) URL, or read it from disk.
async fn load_schema_text(source: &str) -> Result<String, ReceiverError> {
    if is_http_source(source) {
        let response = reqwest::get(source).await.map_err(|e| ReceiverError::SchemaLoad(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReceiverError::SchemaLoad(format!("GET {source} returned {}", status.as_u16())));
        }
        return response.text().await.map_err(|e| ReceiverError::SchemaLoad(e.to_string()));
    }
    tokio::fs::read_to_string(source).await.map_err(|e| ReceiverError::SchemaLoad(format!("{source}: {e}")))
}

fn is_http_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn connect(
    url: &str,
) -> Result<impl Stream<Item = Result<Incoming, tungstenite::Error>>, ReceiverError> {
    let (stream, _) = connect_async(url).await.map_err(|e| ReceiverError::Connect(e.to_string()))?;
    tracing::info!(%url, "websocket open");
    Ok(stream.filter_map(|message| future::ready(incoming_from_message(message))))
}

/// Map a tungstenite read onto a chat transport frame. Control frames yield
/// nothing; tungstenite answers pings and ends the stream after a close.
fn incoming_from_message(
    message: Result<Message, tungstenite::Error>,
) -> Option<Result<Incoming, tungstenite::Error>> {
    match message {
        Ok(Message::Binary(bytes)) => Some(Ok(Incoming::Binary(bytes.to_vec()))),
        Ok(Message::Text(text)) => Some(Ok(Incoming::Text(text.as_str().to_owned()))),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_)) => None,
        Err(e) => Some(Err(e)),
    }
}

fn read_frame(input: &str) -> Result<Vec<u8>, CliError> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read(input)?)
}

fn schema_json(schema: &Schema) -> serde_json::Value {
    serde_json::json!({
        "syntax": schema.syntax(),
        "package": schema.package(),
        "imports": schema.imports(),
        "messages": schema.messages().collect::<Vec<_>>(),
        "enums": schema.enums().collect::<Vec<_>>(),
    })
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
