use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use etcd_backup::cli::{attempts_from_retries, Cli, Commands, EtcdArgs};
use etcd_backup::http::PeerClient;
use etcd_backup::naming::snapshot_name;
use etcd_backup::operations;
use etcd_backup::snapshot::{Etcdctl, Kubectl};
use etcd_backup::storage::{ObjectStoreConnector, S3Connector};
use etcd_backup::{BackupConfig, ConfigLoader};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("etcd_backup={}", level).parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("rustls=warn".parse()?)
        .add_directive("aws_config=warn".parse()?)
        .add_directive("aws_smithy_runtime=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigLoader::load(cli.config.as_deref()).await?;

    if let Err(e) = dispatch(cli.command, config).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn required_name(etcd: &EtcdArgs) -> Result<String> {
    let requested = etcd.name.as_deref().ok_or_else(|| anyhow!("--name is required"))?;
    Ok(snapshot_name(requested)?.to_string())
}

async fn dispatch(command: Commands, mut config: BackupConfig) -> Result<()> {
    match command {
        Commands::Save {
            etcd,
            s3,
            creation,
            retention,
            once,
            backup_retries,
            s3_retries,
        } => {
            etcd.apply(&mut config);
            s3.apply(&mut config.s3);
            if let Some(creation) = creation {
                config.schedule.creation = creation.into();
            }
            if let Some(retention) = retention {
                config.schedule.retention = retention.into();
            }
            if let Some(retries) = backup_retries {
                config.retry.backup_attempts = attempts_from_retries(retries);
            }
            if let Some(retries) = s3_retries {
                config.retry.s3_attempts = attempts_from_retries(retries);
            }
            config.require_etcd_tls()?;

            let config = Arc::new(config);
            let tool = Arc::new(Etcdctl::from_config(&config.etcd));
            let connector = Arc::new(S3Connector::new(config.retry.clone()));

            if once {
                let name = required_name(&etcd)?;
                info!("Taking one-shot snapshot {}", name);
                let report = operations::save_once(config, &name, tool, connector.as_ref()).await?;
                info!("✓ Snapshot saved to {}", report.snapshot.archive_path.display());
            } else {
                let cluster_state = Arc::new(Kubectl::new(config.cluster_state.clone()));
                operations::save_rolling(config, tool, cluster_state, connector).await?;
            }
        }
        Commands::Delete { etcd, s3, cleanup } => {
            let name = required_name(&etcd)?;
            etcd.apply(&mut config);
            s3.apply(&mut config.s3);

            let store = if config.s3.enabled && !cleanup {
                Some(S3Connector::new(config.retry.clone()).connect(&config.s3).await?)
            } else {
                None
            };
            operations::delete_snapshot(&config, store.as_deref(), &name, cleanup).await?;
        }
        Commands::Download { etcd, s3 } => {
            let name = required_name(&etcd)?;
            etcd.apply(&mut config);
            s3.apply(&mut config.s3);

            let path = if config.s3.enabled {
                let store = S3Connector::new(config.retry.clone()).connect(&config.s3).await?;
                operations::download_from_store(store.as_ref(), &config, &name).await?
            } else {
                config.require_etcd_tls()?;
                let client = PeerClient::from_config(&config.etcd)?;
                operations::download_from_peer(&client, &config, &name).await?
            };
            info!("✓ Snapshot available at {}", path.display());
        }
        Commands::ExtractStateFile { etcd, s3 } => {
            let name = required_name(&etcd)?;
            etcd.apply(&mut config);
            s3.apply(&mut config.s3);

            if config.s3.enabled {
                let store = S3Connector::new(config.retry.clone()).connect(&config.s3).await?;
                operations::download_from_store(store.as_ref(), &config, &name).await?;
            }
            operations::extract_state_file(&config, &name).await?;
        }
        Commands::Serve { etcd } => {
            let name = required_name(&etcd)?;
            etcd.apply(&mut config);
            operations::serve_snapshot(&config, &name).await?;
        }
    }
    Ok(())
}
