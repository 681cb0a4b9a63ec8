mod cmd;

use clap::Parser;
use cmd::config::ProbeArgs;

#[derive(Parser)]
#[command(name = "fapi-healthcheck", about = "Проверка health/readiness fapi-server")]
struct Cli {
    #[command(flatten)]
    args: ProbeArgs,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cmd::probe::check(&cli.args).await {
        Ok(url) => println!("{} check succeeded for {url}", cli.args.check),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
