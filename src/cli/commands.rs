//! CLI commands and argument parsing

use crate::pagination::QueryOptions;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Collection Pager CLI
#[derive(Parser, Debug)]
#[command(name = "collection-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Server root, overrides config and environment
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// API key, overrides config and environment
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream every matching object, one record per line
    Query {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Stream matching objects in fixed-size batches
    Batch {
        #[command(flatten)]
        query: QueryArgs,

        /// Records per batch (default: page size)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Read one object
    Get {
        /// Object ref, e.g. /defect/1234
        reference: String,

        /// Fields to return (comma-separated)
        #[arg(long)]
        fetch: Option<String>,
    },

    /// Delete one object
    Delete {
        /// Object ref, e.g. /defect/1234
        reference: String,
    },
}

/// Options shared by the paged commands
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct QueryArgs {
    /// Object type or collection path, e.g. defect or /defect/1234/tasks
    pub object_type: String,

    /// Filter expression, e.g. "(State = Open)"
    #[arg(short, long)]
    pub query: Option<String>,

    /// Sort order
    #[arg(short, long)]
    pub order: Option<String>,

    /// Fields to return (comma-separated, or "true" for all)
    #[arg(long)]
    pub fetch: Option<String>,

    /// First record index (1-based)
    #[arg(long)]
    pub start: Option<u64>,

    /// Records per page
    #[arg(long)]
    pub page_size: Option<u64>,

    /// Maximum records overall
    #[arg(short, long)]
    pub limit: Option<u64>,
}

impl QueryArgs {
    /// Query options for these arguments
    pub fn to_options(&self) -> QueryOptions {
        QueryOptions {
            resource: self.object_type.clone(),
            start: self.start,
            page_size: self.page_size,
            limit: self.limit,
            order: self.order.clone(),
            query: self.query.clone(),
            fetch: self.fetch.as_deref().map(Into::into),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Fetch;

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "collection-pager",
            "query",
            "defect",
            "--query",
            "(State = Open)",
            "--fetch",
            "Name,State",
            "--page-size",
            "50",
            "--limit",
            "120",
        ])
        .unwrap();

        let Commands::Query { query } = cli.command else {
            panic!("Expected query command");
        };
        let options = query.to_options();
        assert_eq!(options.resource, "defect");
        assert_eq!(options.query.as_deref(), Some("(State = Open)"));
        assert_eq!(options.fetch, Some(Fetch::fields(["Name", "State"])));
        assert_eq!(options.page_size, Some(50));
        assert_eq!(options.limit, Some(120));
        assert_eq!(options.start, None);
    }

    #[test]
    fn test_parse_batch_command_with_globals() {
        let cli = Cli::try_parse_from([
            "collection-pager",
            "batch",
            "/defect/1/tasks",
            "--batch-size",
            "25",
            "--format",
            "pretty",
            "--server",
            "https://example.com",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Pretty);
        assert_eq!(cli.server.as_deref(), Some("https://example.com"));
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Batch {
                batch_size: Some(25),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_get_and_delete() {
        let cli = Cli::try_parse_from(["collection-pager", "get", "/defect/5", "--fetch", "true"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Get { ref reference, .. } if reference == "/defect/5"));

        let cli = Cli::try_parse_from(["collection-pager", "delete", "/defect/5"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { .. }));
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["collection-pager", "-f", "parquet", "query", "defect"]).is_err());
    }
}
