use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use mediasync_config::{DEFAULT_MIN_SIDECAR_PREFIX, DEFAULT_SIDECAR_NAME_LIMIT};
use mediasync_core::{DateRange, ExtensionList, InclusionFilter};
use mediasync_cli::commands::{self, SourceArgs, UploadArgs};
use mediasync_cli::settings::SettingsStore;
use mediasync_cli::{album_mode, CliMediaType, CliSourceKind};
use mediasync_pipeline::ReconcileOptions;
use mediasync_source::PairingRules;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceOpts {
    /// Folders, zip archives or Takeout parts, merged in the given order
    #[arg(required = true)]
    paths: Vec<Utf8PathBuf>,
    #[arg(long, value_enum, default_value_t = CliSourceKind::Folder)]
    kind: CliSourceKind,
    #[arg(long, help = "Use the parent folder name as album (folder sources)")]
    album_from_folder: bool,
    #[arg(long, default_value_t = DEFAULT_SIDECAR_NAME_LIMIT)]
    sidecar_name_limit: usize,
    #[arg(long, default_value_t = DEFAULT_MIN_SIDECAR_PREFIX)]
    min_sidecar_prefix: usize,
    #[arg(long, help = "Candidates buffered ahead of the driver")]
    channel_capacity: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse sources and summarize what would be considered
    Scan {
        #[command(flatten)]
        source: SourceOpts,
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    /// Reconcile sources against the catalog
    Upload {
        #[command(flatten)]
        source: SourceOpts,
        #[arg(long, env = "MEDIASYNC_CATALOG", help = "Catalog snapshot file")]
        catalog: Option<std::path::PathBuf>,
        #[arg(long, help = "Override the configured device id")]
        device_id: Option<String>,
        #[arg(long, help = "Comma separated extensions to include, e.g. .jpg,.heic")]
        include_ext: Option<ExtensionList>,
        #[arg(long, help = "Comma separated extensions to exclude")]
        exclude_ext: Option<ExtensionList>,
        #[arg(long, value_enum)]
        include_type: Option<CliMediaType>,
        #[arg(long, help = "YYYY, YYYY-MM, YYYY-MM-DD or start,end")]
        date_range: Option<DateRange>,
        #[arg(long, help = "Skip assets shared by a partner")]
        skip_partner: bool,
        #[arg(long, help = "Also consider trashed assets")]
        keep_trashed: bool,
        #[arg(long, help = "Only assets from this source album")]
        from_album: Option<String>,
        #[arg(long, help = "File every upload into this album")]
        into_album: Option<String>,
        #[arg(long, help = "Recreate source albums on the catalog")]
        create_albums: bool,
        #[arg(long, help = "Delete local files once the catalog holds them")]
        delete: bool,
    },
}

impl SourceOpts {
    fn into_args(self, configured_capacity: usize) -> SourceArgs {
        SourceArgs {
            paths: self.paths,
            kind: self.kind,
            album_from_folder: self.album_from_folder,
            pairing: PairingRules {
                max_sidecar_name_len: self.sidecar_name_limit,
                min_prefix_len: self.min_sidecar_prefix,
            },
            channel_capacity: self.channel_capacity.unwrap_or(configured_capacity),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing the current item");
                cancel.cancel();
            }
        });
    }

    let store = SettingsStore::new()?;
    let settings = store.load_or_init()?;

    match cli.command {
        Commands::Scan { source, output } => {
            let src = source.into_args(settings.channel_capacity);
            commands::cmd_scan(src, output, cancel).await?;
        }
        Commands::Upload {
            source,
            catalog,
            device_id,
            include_ext,
            exclude_ext,
            include_type,
            date_range,
            skip_partner,
            keep_trashed,
            from_album,
            into_album,
            create_albums,
            delete,
        } => {
            let options = ReconcileOptions {
                filter: InclusionFilter::new(
                    include_ext.unwrap_or_default(),
                    exclude_ext.unwrap_or_default(),
                    include_type.map(Into::into),
                    date_range,
                ),
                keep_partner: !skip_partner,
                keep_trashed,
                from_album,
                album_mode: album_mode(into_album, create_albums),
                delete_local: delete,
            };
            let args = UploadArgs {
                source: source.into_args(settings.channel_capacity),
                catalog: catalog.unwrap_or_else(|| store.catalog_path(&settings)),
                device_id: device_id.unwrap_or_else(|| settings.device_id.clone()),
                options,
            };
            let report = commands::cmd_upload(args, cancel).await?;
            if report.stats.failed > 0 {
                anyhow::bail!("{} assets failed to upload", report.stats.failed);
            }
            if let Some(flush) = &report.flush {
                flush.check()?;
            }
        }
    }

    Ok(())
}
