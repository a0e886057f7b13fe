use anyhow::{anyhow, Result};
use dotcrab::command::Started;
use dotcrab::{
    Config, HyperClient, Nameserver, OsFileManager, RootsFetcher, Shared, TokioCommander, Unbound,
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("dotcrab".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;

    let unbound = Unbound::new(
        Arc::new(TokioCommander),
        &config.unbound_etc_dir,
        &config.unbound_path,
    );
    let version = unbound.version().await?;
    tracing::info!("unbound version {version}");

    let roots = RootsFetcher::new(
        config.clone(),
        Arc::new(HyperClient::new(config.http_timeout)),
        Arc::new(OsFileManager),
    );
    if let Err(err) = roots.download_root_hints().await {
        tracing::warn!("{err}");
    }
    if let Err(err) = roots.download_root_key().await {
        tracing::warn!("{err}");
    }

    let Started {
        stdout,
        stderr,
        wait,
    } = unbound.start(config.verbosity_details_level).await?;
    tokio::spawn(forward_stdout(stdout));
    tokio::spawn(forward_stderr(stderr));

    if config.use_dns_internally {
        dotcrab::use_dns_internally(config.resolver_ip);
    }
    if config.use_dns_system_wide {
        Nameserver::new(&config.resolv_conf_path)
            .use_dns_system_wide(config.resolver_ip, config.keep_nameserver)
            .await?;
    }

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        exit = wait => {
            match exit {
                Ok(Ok(())) => tracing::info!("unbound exited"),
                Ok(Err(err)) => return Err(err.into()),
                Err(_) => return Err(anyhow!("lost track of the unbound process")),
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

async fn forward_stdout(mut lines: UnboundedReceiver<String>) {
    while let Some(line) = lines.recv().await {
        tracing::info!(target: "unbound", "{line}");
    }
}

async fn forward_stderr(mut lines: UnboundedReceiver<String>) {
    while let Some(line) = lines.recv().await {
        tracing::warn!(target: "unbound", "{line}");
    }
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dotcrab=info,unbound=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<Shared> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            tracing::debug!("loaded config from {config_file}");
            let config = Config::try_from_file(&config_file)?;
            Ok(Arc::new(config))
        }
    }
}
