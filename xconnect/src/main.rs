mod args;

use anyhow::Result;
use args::Args;
use clap::Parser;
use tracing::{error, info};
use x11_client::{Connection, Connector, EnvDisplay, NoAuthority, StaticAuthority};

fn init_logging(verbose: u8) -> Result<()> {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "xconnect={0},x11_client={0},x11_protocol={0}",
                    log_level
                )
                .into()
            }),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

fn print_summary(conn: &Connection) {
    let setup = conn.setup();
    println!("vendor:           {}", setup.vendor);
    println!("release:          {}", setup.release_number);
    println!(
        "protocol version: {}.{}",
        setup.protocol_major_version, setup.protocol_minor_version
    );
    println!("screens:          {}", setup.roots.len());
    println!("authenticated:    {}", conn.is_authenticated());
    if let Some(screen) = conn.default_root() {
        println!(
            "default screen:   {} ({}x{} pixels, {}x{} mm, depth {})",
            conn.default_screen(),
            screen.width_in_pixels,
            screen.height_in_pixels,
            screen.width_in_millimeters,
            screen.height_in_millimeters,
            screen.root_depth
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    info!("Starting xconnect {}", env!("CARGO_PKG_VERSION"));

    let config = args.to_config()?;
    let connector = match args.cookie()? {
        Some(cookie) => Connector::new(config, StaticAuthority::mit_magic_cookie(cookie)),
        None => Connector::new(config, NoAuthority),
    };

    match connector.connect(&EnvDisplay).await {
        Ok(conn) => {
            print_summary(&conn);
            Ok(())
        }
        Err(e) => {
            error!(retryable = e.is_retryable(), "connection failed: {}", e);
            Err(e.into())
        }
    }
}
