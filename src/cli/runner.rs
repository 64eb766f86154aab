//! CLI runner - executes commands

use crate::api::RestApi;
use crate::cli::commands::{Cli, Commands, OutputFormat, QueryArgs};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::pagination::{BatchInfo, Flow};
use crate::query::Fetch;
use crate::refs::Ref;
use futures::TryStreamExt;
use serde_json::{json, Value};
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let api = RestApi::new(self.client_config()?)?;

        match &self.cli.command {
            Commands::Query { query } => self.query(&api, query).await,
            Commands::Batch { query, batch_size } => self.batch(&api, query, *batch_size).await,
            Commands::Get { reference, fetch } => {
                let reference = Ref::parse(reference)?;
                let object = api
                    .get(&reference, fetch.as_deref().map(Fetch::from))
                    .await?;
                self.output_message(&object);
                Ok(())
            }
            Commands::Delete { reference } => {
                let reference = Ref::parse(reference)?;
                api.delete(&reference).await?;
                info!("Deleted {reference}");
                Ok(())
            }
        }
    }

    /// Config file, then environment, then command-line flags
    pub fn client_config(&self) -> Result<ClientConfig> {
        let config = match &self.cli.config {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig::default(),
        };
        Ok(self.apply_flags(config.with_env_overrides()))
    }

    fn apply_flags(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(server) = &self.cli.server {
            config.server.clone_from(server);
        }
        if let Some(key) = &self.cli.api_key {
            config.api_key = Some(key.clone());
        }
        config
    }

    /// Stream every matching record
    async fn query(&self, api: &RestApi, args: &QueryArgs) -> Result<()> {
        let options = args.to_options();
        let mut pages = Box::pin(api.stream(&options).into_stream());
        let mut processed = 0;

        while let Some(page) = pages.try_next().await? {
            processed = page.info.processed;
            for record in &page.records {
                self.output_record(&options.resource, record);
            }
        }

        info!("Fetched {processed} records from {}", options.resource);
        Ok(())
    }

    /// Stream matching records in batches
    async fn batch(
        &self,
        api: &RestApi,
        args: &QueryArgs,
        batch_size: Option<usize>,
    ) -> Result<()> {
        let options = args.to_options();
        let result = api
            .query_batch(&options, batch_size, |records, info| {
                self.output_batch(&options.resource, &records, info);
                async { Ok(Flow::Continue) }
            })
            .await?;

        info!(
            "Fetched {} records in {} batches from {}",
            result.total_processed, result.total_batches, options.resource
        );
        Ok(())
    }

    fn output_record(&self, resource: &str, record: &Value) {
        self.output_message(&json!({
            "type": "RECORD",
            "record": {
                "resource": resource,
                "data": record
            }
        }));
    }

    fn output_batch(&self, resource: &str, records: &[Value], info: BatchInfo) {
        self.output_message(&json!({
            "type": "BATCH",
            "batch": {
                "resource": resource,
                "info": info
            }
        }));
        for record in records {
            self.output_record(resource, record);
        }
    }

    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
