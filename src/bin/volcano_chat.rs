//! volcano-chat: send one prompt to an Ark endpoint from the command line.
//!
//! Usage:
//!   volcano-chat --endpoint <id> [OPTIONS] <prompt>
//!   volcano-chat --endpoint <id> --check

use anyhow::{anyhow, bail, Context};
use futures::StreamExt;
use std::io::Write;
use tracing_subscriber::EnvFilter;
use volcano_llm::{
    ApiMode, Attachment, ConnectionBuilder, Dispatcher, MediaKind, PromptRequest, StreamEvent,
};

#[derive(Debug, Default)]
struct Args {
    mode: Option<String>,
    endpoint: Option<String>,
    region: Option<String>,
    base_url: Option<String>,
    system: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    stop: Vec<String>,
    images: Vec<String>,
    videos: Vec<String>,
    stream: bool,
    check: bool,
    prompt: Vec<String>,
}

fn print_usage() {
    println!(
        r#"volcano-chat {}: chat with a Volcano Engine Ark endpoint

USAGE:
    volcano-chat --endpoint <id> [OPTIONS] <prompt>...

OPTIONS:
    --mode <OpenAPI|REST API>   Calling convention (default: OpenAPI)
    --endpoint <id>             Endpoint id of the model deployment
    --region <region>           Region for the default base URL (default: cn-beijing)
    --base-url <url>            Custom base URL, overrides the region default
    --system <text>             System prompt
    --max-tokens <n>            Maximum tokens to generate (default: 1024)
    --temperature <t>           Sampling temperature (default: 0.7)
    --top-p <p>                 Nucleus sampling (default: 0.9)
    --stop <text>               Stop sequence, repeatable
    --image <file>              Attach an image file, repeatable
    --video <file>              Attach a video file, repeatable
    --stream                    Stream the answer as it is generated
    --check                     Only check connectivity and credentials
    -h, --help                  Show this help message

ENVIRONMENT:
    VOLCANO_API_KEY             API key (fallback: ARK_API_KEY)
    VOLCANO_HTTP_TIMEOUT_SECS   Request timeout in seconds
    RUST_LOG                    Log filter (default: volcano_llm=info)"#,
        env!("CARGO_PKG_VERSION")
    );
}

fn parse_args(raw: &[String]) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("missing value for {flag}"))
        };
        match arg.as_str() {
            "--mode" => args.mode = Some(value("--mode")?),
            "--endpoint" => args.endpoint = Some(value("--endpoint")?),
            "--region" => args.region = Some(value("--region")?),
            "--base-url" => args.base_url = Some(value("--base-url")?),
            "--system" => args.system = Some(value("--system")?),
            "--max-tokens" => {
                args.max_tokens = Some(value("--max-tokens")?.parse().context("--max-tokens")?)
            }
            "--temperature" => {
                args.temperature = Some(value("--temperature")?.parse().context("--temperature")?)
            }
            "--top-p" => args.top_p = Some(value("--top-p")?.parse().context("--top-p")?),
            "--stop" => args.stop.push(value("--stop")?),
            "--image" => args.images.push(value("--image")?),
            "--video" => args.videos.push(value("--video")?),
            "--stream" => args.stream = true,
            "--check" => args.check = true,
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown option: {flag}"),
            other => args.prompt.push(other.to_string()),
        }
    }
    Ok(args)
}

fn api_key_from_env() -> anyhow::Result<String> {
    std::env::var("VOLCANO_API_KEY")
        .or_else(|_| std::env::var("ARK_API_KEY"))
        .map_err(|_| anyhow!("set VOLCANO_API_KEY (or ARK_API_KEY)"))
}

fn load_attachment(path: &str, expected: MediaKind) -> anyhow::Result<Attachment> {
    let attachment = Attachment::from_file(path)?;
    if attachment.kind != expected {
        bail!("{path} is not a {} file", expected.as_str());
    }
    Ok(attachment)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mode: ApiMode = args.mode.as_deref().unwrap_or("OpenAPI").parse()?;
    let mut builder = ConnectionBuilder::new(mode)
        .endpoint_id(args.endpoint.clone().unwrap_or_default())
        .api_key(api_key_from_env()?);
    if let Some(region) = &args.region {
        builder = builder.region(region);
    }
    if let Some(url) = &args.base_url {
        builder = builder.custom_base_url(url);
    }
    let connection = builder.build()?;
    let dispatcher = Dispatcher::new()?;

    if args.check {
        let models = dispatcher.list_models(&connection).await?;
        println!("ok: {} models visible at {}", models.len(), connection.base_url());
        return Ok(());
    }

    let mut request = PromptRequest::new(args.prompt.join(" "));
    if let Some(system) = args.system {
        request = request.system_prompt(system);
    }
    if let Some(n) = args.max_tokens {
        request = request.max_tokens(n);
    }
    if let Some(t) = args.temperature {
        request = request.temperature(t);
    }
    if let Some(p) = args.top_p {
        request = request.top_p(p);
    }
    if !args.stop.is_empty() {
        request = request.stop(args.stop);
    }
    for path in &args.images {
        request = request.attachment(load_attachment(path, MediaKind::Image)?);
    }
    for path in &args.videos {
        request = request.attachment(load_attachment(path, MediaKind::Video)?);
    }

    if args.stream {
        let mut events = dispatcher.send_stream(&connection, &request).await?;
        let mut stdout = std::io::stdout();
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::ContentDelta { content } => {
                    write!(stdout, "{content}")?;
                    stdout.flush()?;
                }
                StreamEvent::Usage { usage } => {
                    eprintln!("{}", serde_json::to_string(&usage)?);
                }
                StreamEvent::Finish { .. } => {}
            }
        }
        writeln!(stdout)?;
    } else {
        let result = dispatcher.send(&connection, &request).await?;
        println!("{}", result.response_text);
        eprintln!("{}", result.info());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("volcano_llm=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    let result = match parse_args(&raw) {
        Ok(args) => run(args).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        match e.downcast_ref::<volcano_llm::Error>() {
            Some(err) => eprintln!("{}: {}", err.kind(), err),
            None => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
}
