use std::env;
use std::process::ExitCode;

use posefeed_sim::{run, Script, SimOptions};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let options = match parse_args(env::args().skip(1).collect()) {
        Ok(Some(options)) => options,
        Ok(None) => {
            println!("{}", usage_text());
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{message}\n\n{}", usage_text());
            return ExitCode::from(2);
        }
    };

    init_tracing();
    match run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(error = %message, "posefeed_sim_failed");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<Option<SimOptions>, String> {
    let mut options = SimOptions::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(None),
            "--port" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --port".to_string())?;
                options.port = value
                    .parse::<u16>()
                    .map_err(|_| format!("invalid --port value '{value}' (expected u16)"))?;
                index += 2;
            }
            "--rate-hz" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --rate-hz".to_string())?;
                options.rate_hz = value
                    .parse::<u32>()
                    .ok()
                    .filter(|rate| *rate > 0)
                    .ok_or_else(|| format!("invalid --rate-hz value '{value}' (expected u32 > 0)"))?;
                index += 2;
            }
            "--script" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --script".to_string())?;
                options.script = Script::parse(value).ok_or_else(|| {
                    format!("invalid --script value '{value}' (expected run|jump|idle|mixed)")
                })?;
                index += 2;
            }
            other => return Err(format!("unknown argument '{other}'")),
        }
    }
    Ok(Some(options))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn usage_text() -> String {
    [
        "posefeed_sim - scripted pose feed over websocket",
        "",
        "Usage:",
        "  posefeed_sim [--port <u16>] [--rate-hz <u32>] [--script <run|jump|idle|mixed>]",
        "",
        "Defaults:",
        "  --port 8000",
        "  --rate-hz 10",
        "  --script mixed",
    ]
    .join("\n")
}
