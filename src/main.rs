use std::net::SocketAddr;

use image_tools_backend::api::server::serve;
use image_tools_backend::api::stdio::serve_stdio;
use image_tools_backend::config::AppConfig;
use serde_json::{json, Value};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
enum CliCommand {
    Serve { bind: Option<SocketAddr> },
    ServeStdio,
    ListTools,
    Call { tool: String, arguments: Value },
    Help,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli_args = std::env::args().skip(1).collect::<Vec<_>>();
    let command = parse_cli_args(cli_args.as_slice())?;
    if command == CliCommand::Help {
        print_usage();
        return Ok(());
    }

    let working_dir = std::env::current_dir()?;
    let config = AppConfig::from_environment(working_dir.as_path())?;
    // The blocking Gemini client must be built outside the async runtime.
    let dispatcher = config.build_dispatcher()?;

    match command {
        CliCommand::Serve { bind } => {
            let addr = bind.unwrap_or(config.bind);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(serve(addr, dispatcher.clone()))?;
        }
        CliCommand::ServeStdio => {
            let stdin = std::io::stdin();
            serve_stdio(&dispatcher, stdin.lock(), std::io::stdout().lock())?;
        }
        CliCommand::ListTools => {
            println!(
                "{}",
                serde_json::to_string_pretty(&dispatcher.registry().catalog())?
            );
        }
        CliCommand::Call { tool, arguments } => {
            let envelope = dispatcher.dispatch(tool.as_str(), &arguments);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if !envelope.is_ok() {
                std::process::exit(1);
            }
        }
        CliCommand::Help => {}
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    // stdout carries envelopes for the stdio surface and the call command.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_cli_args(args: &[String]) -> Result<CliCommand, Box<dyn std::error::Error>> {
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        return Ok(CliCommand::Help);
    }

    let Some(subcommand) = args.first() else {
        return Ok(CliCommand::Serve { bind: None });
    };
    let rest = &args[1..];
    match subcommand.as_str() {
        "serve" => parse_serve_args(rest),
        "serve-stdio" => {
            reject_extra(rest)?;
            Ok(CliCommand::ServeStdio)
        }
        "list-tools" => {
            reject_extra(rest)?;
            Ok(CliCommand::ListTools)
        }
        "call" => parse_call_args(rest),
        "help" => Ok(CliCommand::Help),
        unknown => Err(std::io::Error::other(format!(
            "Unknown command: {unknown}\n\nUse --help for usage."
        ))
        .into()),
    }
}

fn parse_serve_args(args: &[String]) -> Result<CliCommand, Box<dyn std::error::Error>> {
    let mut bind = None::<SocketAddr>;
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let needs_value = |idx: usize| -> Result<String, Box<dyn std::error::Error>> {
            let Some(value) = args.get(idx + 1) else {
                return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
            };
            Ok(value.clone())
        };

        match flag {
            "--bind" => {
                bind = Some(needs_value(i)?.parse()?);
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }
    Ok(CliCommand::Serve { bind })
}

fn parse_call_args(args: &[String]) -> Result<CliCommand, Box<dyn std::error::Error>> {
    let Some(tool) = args.first().filter(|t| !t.starts_with("--")) else {
        return Err(std::io::Error::other("call requires a tool name").into());
    };
    let mut arguments = json!({});
    let mut i = 1usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let needs_value = |idx: usize| -> Result<String, Box<dyn std::error::Error>> {
            let Some(value) = args.get(idx + 1) else {
                return Err(std::io::Error::other(format!("Missing value for {flag}")).into());
            };
            Ok(value.clone())
        };

        match flag {
            "--args" => {
                arguments = serde_json::from_str::<Value>(needs_value(i)?.as_str()).map_err(|e| {
                    std::io::Error::other(format!("--args must be a JSON object: {e}"))
                })?;
                i += 2;
            }
            unknown => {
                return Err(std::io::Error::other(format!(
                    "Unknown argument: {unknown}\n\nUse --help for usage."
                ))
                .into());
            }
        }
    }
    Ok(CliCommand::Call {
        tool: tool.clone(),
        arguments,
    })
}

fn reject_extra(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    match args.first() {
        Some(extra) => Err(std::io::Error::other(format!(
            "Unknown argument: {extra}\n\nUse --help for usage."
        ))
        .into()),
        None => Ok(()),
    }
}

fn print_usage() {
    eprintln!(concat!(
        "Usage:\n",
        "  image-tools-backend [serve [--bind ADDR]]\n",
        "  image-tools-backend serve-stdio\n",
        "  image-tools-backend list-tools\n",
        "  image-tools-backend call <tool> [--args JSON]\n\n",
        "Configuration comes from the environment, ./.env and image-tools.toml\n",
        "(override the settings path with IMAGE_TOOLS_SETTINGS).\n"
    ));
}
