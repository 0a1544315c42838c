#[macro_use]
extern crate tracing;

use std::path::PathBuf;

use structopt::StructOpt;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    runtime::Builder,
    signal,
};

#[derive(Debug, StructOpt)]
struct Opts {
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,
    #[structopt(short, long = "config")]
    config_path: Option<PathBuf>,
    /// Print the effective configuration and exit
    #[structopt(long)]
    dump_config: bool,
    /// Advance to the next pattern on every line read from stdin
    #[structopt(long)]
    cycle_patterns: bool,
}

async fn run(opts: Opts) -> color_eyre::eyre::Result<()> {
    // Load configuration
    let config = if let Some(config_path) = opts.config_path.as_deref() {
        hexlamp::models::Config::load_file(config_path).await?
    } else {
        hexlamp::models::Config::default()
    };

    // Dump configuration if this was asked
    if opts.dump_config {
        print!("{}", config.to_string()?);
        return Ok(());
    }

    // Create the lamp and spawn its render loop
    let (lamp, handle) = hexlamp::lamp::Lamp::new(&config)?;
    let lamp = tokio::spawn(lamp.run());

    info!(name = %config.name, "lamp started");

    // Start the control server
    let _control_server = if config.control_server.enable {
        Some(
            hexlamp::servers::bind("Control", config.control_server.address(), {
                let handle = handle.clone();
                move |tcp| hexlamp::servers::control::handle_client(tcp, handle.clone())
            })
            .await?,
        )
    } else {
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut cycle_patterns = opts.cycle_patterns;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                break;
            }
            line = lines.next_line(), if cycle_patterns => {
                match line {
                    Ok(Some(_)) => {
                        let pattern = handle.next_pattern().await?;
                        info!(%pattern, "switched pattern");
                    }
                    Ok(None) => {
                        debug!("stdin closed");
                        cycle_patterns = false;
                    }
                    Err(error) => {
                        warn!(error = %error, "failed to read from stdin");
                        cycle_patterns = false;
                    }
                }
            }
        }
    }

    // Turn the lamp off before leaving
    if let Err(error) = handle.write(hexlamp::control::ParamKind::Power, vec![0]).await {
        warn!(error = %error, "failed to turn the lamp off");
    }

    handle.stop().await?;
    lamp.await?;

    Ok(())
}

fn install_tracing(opts: &Opts) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fmt_layer = fmt::layer();

    let filter_layer = EnvFilter::try_from_env("HEXLAMP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(match opts.verbose {
            0 => "hexlamp=warn,hexlampd=warn",
            1 => "hexlamp=info,hexlampd=info",
            2 => "hexlamp=debug,hexlampd=debug",
            _ => "hexlamp=trace,hexlampd=trace",
        })
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
}

#[paw::main]
fn main(opts: Opts) -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    install_tracing(&opts)?;

    let thd_count = match num_cpus::get() {
        1 => 2,
        other => other.min(4),
    };

    let rt = Builder::new_multi_thread()
        .worker_threads(thd_count)
        .enable_all()
        .build()?;
    let result = rt.block_on(run(opts));

    // A pending stdin read would otherwise keep the runtime alive
    rt.shutdown_timeout(std::time::Duration::from_millis(100));
    result
}
