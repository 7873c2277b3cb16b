mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use ofs_client::{IMetaServiceStub, InMemoryMetaStub, LayoutFixture, MetaClientConfig, TcpMetaStub};
use ofs_config::Configuration;
use ofs_hcfs::{normalize_path, BlockLocation, BlockLocationProvider, OfsBlockLocationProvider};
use ofs_logging::{init_logging, LogConfig};

use output::{OutputFormat, Printer};

/// Print which storage nodes hold a byte range of an OrangeFS file.
#[derive(Parser, Debug)]
#[command(name = "ofs-locate", version, about)]
struct Cli {
    /// Configuration file (TOML, `fs.ofs.*` keys).
    #[arg(long, env = "OFS_LOCATE_CONFIG")]
    config: Option<PathBuf>,

    /// Serve layouts from a JSON fixture instead of the control plane.
    #[arg(long)]
    layout_file: Option<PathBuf>,

    /// First byte of the range.
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Length of the range; defaults to the rest of the file.
    #[arg(long)]
    length: Option<u64>,

    /// Output format (table or json).
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Also write logs to files in this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the default configuration as TOML and exit.
    #[arg(long, default_value_t = false)]
    dump_default_config: bool,

    /// File path or ofs:// URI.
    #[arg(required_unless_present = "dump_default_config")]
    path: Option<String>,
}

fn load_configuration(path: Option<&PathBuf>) -> anyhow::Result<Configuration> {
    let mut conf = MetaClientConfig::default_configuration();
    if let Some(path) = path {
        let file = Configuration::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
        conf.merge(&file);
    }
    Ok(conf)
}

fn make_stub(layout_file: Option<&PathBuf>) -> anyhow::Result<Arc<dyn IMetaServiceStub>> {
    match layout_file {
        Some(path) => {
            let stub = InMemoryMetaStub::from_fixture(LayoutFixture::load(path)?);
            tracing::info!(
                "serving {} files from fixture {}",
                stub.file_count(),
                path.display()
            );
            Ok(Arc::new(stub))
        }
        None => Ok(Arc::new(TcpMetaStub::new())),
    }
}

/// Resolve `[offset, offset + length)`, or `[offset, EOF)` without a length.
async fn locate(
    provider: &OfsBlockLocationProvider,
    path: &str,
    offset: u64,
    length: Option<u64>,
) -> anyhow::Result<Vec<BlockLocation>> {
    let locations = match length {
        Some(length) => provider.get_block_locations(path, offset, length).await?,
        None => provider.get_block_locations_to_eof(path, offset).await?,
    };
    Ok(locations)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_default_config {
        print!("{}", MetaClientConfig::default_configuration().to_toml_string()?);
        return Ok(());
    }

    let log_config = LogConfig {
        level: if cli.verbose { "debug" } else { "warn" }.to_string(),
        log_dir: cli.log_dir.clone(),
        ..LogConfig::default()
    };
    let _guard = init_logging(&log_config)?;

    let conf = load_configuration(cli.config.as_ref())?;
    let stub = make_stub(cli.layout_file.as_ref())?;
    let provider = OfsBlockLocationProvider::from_configuration(&conf, stub)?;

    let path = normalize_path(cli.path.as_deref().unwrap_or_default())?;
    let locations = locate(&provider, &path, cli.offset, cli.length).await?;

    Printer::stdout(cli.format).print_locations(&path, &locations)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from([
            "ofs-locate",
            "--layout-file",
            "fixture.json",
            "--offset",
            "1048576",
            "--length",
            "3145728",
            "--format",
            "json",
            "/user/test/file4m",
        ])
        .unwrap();
        assert_eq!(cli.offset, 1048576);
        assert_eq!(cli.length, Some(3145728));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.path.as_deref(), Some("/user/test/file4m"));

        assert!(Cli::try_parse_from(["ofs-locate"]).is_err());
        assert!(Cli::try_parse_from(["ofs-locate", "--dump-default-config"]).is_ok());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core-site.toml");
        std::fs::write(
            &path,
            r#"
[fs.ofs]
systems = "tcp://meta-9:3334"

[fs.ofs.topology.default]
rack = "/lab"
"#,
        )
        .unwrap();

        let conf = load_configuration(Some(&path)).unwrap();
        assert_eq!(conf.get(ofs_config::keys::SYSTEMS), Some("tcp://meta-9:3334"));
        assert_eq!(conf.get(ofs_config::keys::TOPOLOGY_DEFAULT_RACK), Some("/lab"));
        assert_eq!(conf.get(ofs_config::keys::RETRY_MAX_ATTEMPTS), Some("3"));
    }

    #[tokio::test]
    async fn test_fixture_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.json");
        std::fs::write(
            &path,
            r#"{
                "servers": [{"server_id": 1, "address": "tcp://dn1:3334"}],
                "files": [{
                    "path": "/f", "handle": 1, "file_size": 100,
                    "layout": {
                        "kind": "explicit",
                        "stripes": [{"offset": 0, "length": 100, "servers": [1]}]
                    }
                }]
            }"#,
        )
        .unwrap();

        let conf = load_configuration(None).unwrap();
        let stub = make_stub(Some(&path)).unwrap();
        let provider = OfsBlockLocationProvider::from_configuration(&conf, stub).unwrap();
        let locs = locate(&provider, "/f", 10, Some(90)).await.unwrap();
        assert_eq!(locs.len(), 1);
        assert_eq!(locs[0].names, vec!["dn1:3334"]);

        let locs = locate(&provider, "ofs://meta/f", 40, None).await.unwrap();
        assert_eq!((locs[0].offset, locs[0].length), (40, 60));
        assert!(locate(&provider, "/f", 101, None).await.is_err());
    }
}
