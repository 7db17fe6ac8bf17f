//! Run the web application

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::app::Services;
use crate::config::Config;
use crate::web;

pub async fn run(config: &Config, bind: Option<&str>) -> Result<()> {
    let bind = bind.unwrap_or(&config.bind);
    let services = Services::from_config(config).context("failed to initialise services")?;

    info!(
        backend = ?config.backend,
        upload_dir = %config.upload_dir.display(),
        index_dir = %config.index_dir.display(),
        "Starting helpdesk"
    );

    web::serve(Arc::new(services), bind).await
}
