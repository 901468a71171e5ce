use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vitrine_driver::diagnostics::{self, SourceFile};
use vitrine_driver::{check_sources, Fixture, StoreKind, VitrineConfig};
use vitrine_preview::{assemble, PreviewInput};
use vitrine_registry::{
    browse, load_showcase, resolve, tab_counts, CatalogQuery, ComponentRef, ComponentStore,
    HttpFetcher, MemoryStore, QuickFilter, RestStore, SortOption, SourceFetcher,
};
use vitrine_scan::{parse_dependencies_with, parse_internal_dependencies, scan, VersionTable};

#[derive(Parser)]
#[command(
    name = "vitrine",
    version,
    about = "Component registry toolkit: scan sources, resolve dependency trees, bundle previews"
)]
struct Cli {
    /// Path to vitrine.toml
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show exports and dependencies of a source file
    Scan {
        input: PathBuf,

        /// Take versions from this package.json
        #[arg(long, value_name = "FILE")]
        package_json: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check a component and its demo before publishing
    Check {
        #[arg(long, value_name = "FILE")]
        code: PathBuf,

        #[arg(long, value_name = "FILE")]
        demo: PathBuf,

        /// Internal import already assigned to a component, as SPECIFIER=AUTHOR/SLUG
        #[arg(long = "map", value_name = "MAPPING")]
        mappings: Vec<String>,
    },

    /// Resolve the registry dependency tree of components
    Resolve {
        /// author/slug[/demo]
        #[arg(required = true)]
        refs: Vec<String>,

        /// Include the demo file of every requested component
        #[arg(long)]
        with_demos: bool,

        #[arg(long, value_name = "FILE")]
        fixture: Option<PathBuf>,
    },

    /// Resolve a component and print its preview bundle
    Bundle {
        /// author/slug[/demo]
        reference: String,

        #[arg(long, value_name = "FILE")]
        fixture: Option<PathBuf>,
    },

    /// List catalog demos
    Catalog {
        #[arg(long, default_value = "downloads")]
        sort: SortOption,

        #[arg(long, default_value = "all")]
        filter: QuickFilter,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Page size; defaults to catalog.page_size
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, value_name = "FILE")]
        fixture: Option<PathBuf>,
    },
}

struct Backend {
    store: Box<dyn ComponentStore>,
    fetcher: Box<dyn SourceFetcher>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = VitrineConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Scan {
            input,
            package_json,
            json,
        } => scan_command(&input, package_json.as_deref(), json),
        Commands::Check {
            code,
            demo,
            mappings,
        } => check_command(&code, &demo, &mappings),
        Commands::Resolve {
            refs,
            with_demos,
            fixture,
        } => resolve_command(&config, &refs, with_demos, fixture.as_deref()).await,
        Commands::Bundle { reference, fixture } => {
            bundle_command(&config, &reference, fixture.as_deref()).await
        }
        Commands::Catalog {
            sort,
            filter,
            offset,
            limit,
            fixture,
        } => {
            let query = CatalogQuery {
                quick_filter: filter,
                sort,
                offset,
                limit: limit.unwrap_or(config.catalog.page_size),
            };
            catalog_command(&config, &query, fixture.as_deref()).await
        }
    }
}

fn read_source_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Error reading {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn scan_command(input: &Path, package_json: Option<&Path>, json: bool) -> Result<ExitCode> {
    let source = read_source_file(input)?;

    let versions = match package_json {
        Some(path) => VersionTable::from_package_json(&read_source_file(path)?)
            .with_context(|| format!("Invalid package.json at {}", path.display()))?
            .with_fallback(&VersionTable::default()),
        None => VersionTable::default(),
    };

    let summary = scan(&source);
    let exports = summary.value_export_names();
    let dependencies = parse_dependencies_with(&source, &versions);
    let internal = parse_internal_dependencies(&source);

    if json {
        print_json(&serde_json::json!({
            "exports": exports,
            "has_default_export": summary.has_default_export(),
            "dependencies": dependencies,
            "internal_dependencies": internal,
        }))?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("Scan of {}", input.display());
    println!("{}", "=".repeat(60));
    println!("Exports: {}", exports.join(", "));
    println!(
        "Default export: {}",
        if summary.has_default_export() { "yes" } else { "no" }
    );

    println!("\nnpm dependencies ({}):", dependencies.len());
    for (name, version) in &dependencies {
        println!("  {:30} {}", name, version);
    }

    println!("\nInternal dependencies ({}):", internal.len());
    for (specifier, path) in &internal {
        println!("  {:30} -> {}", specifier, path);
    }

    Ok(ExitCode::SUCCESS)
}

fn check_command(code_path: &Path, demo_path: &Path, mappings: &[String]) -> Result<ExitCode> {
    let code = read_source_file(code_path)?;
    let demo = read_source_file(demo_path)?;

    let mut mapped = IndexMap::new();
    for mapping in mappings {
        let Some((specifier, target)) = mapping.split_once('=') else {
            bail!("mapping '{}' is not SPECIFIER=AUTHOR/SLUG", mapping);
        };
        let target: ComponentRef = target
            .parse()
            .with_context(|| format!("Invalid mapping target in '{}'", mapping))?;
        mapped.insert(specifier.to_string(), target.component_key());
    }

    let found = check_sources(&code, &demo, &mapped);
    let code_name = code_path.to_string_lossy().to_string();
    let demo_name = demo_path.to_string_lossy().to_string();
    for diagnostic in &found {
        let (filename, source) = match diagnostic.file {
            SourceFile::Component => (&code_name, &code),
            SourceFile::Demo => (&demo_name, &demo),
        };
        diagnostics::report(diagnostic, filename, source)?;
    }

    if diagnostics::has_errors(&found) {
        return Ok(ExitCode::FAILURE);
    }

    println!("{} warning(s)", found.len());
    Ok(ExitCode::SUCCESS)
}

fn open_backend(config: &VitrineConfig, fixture: Option<&Path>) -> Result<Backend> {
    if let Some(path) = fixture {
        let (store, fetcher) = Fixture::load(path)
            .with_context(|| format!("Failed to load fixture {}", path.display()))?
            .into_backend();
        return Ok(Backend {
            store: Box::new(store),
            fetcher: Box::new(fetcher),
        });
    }

    let fetcher = HttpFetcher::new(config.fetch_timeout()).context("Failed to build HTTP client")?;
    let store: Box<dyn ComponentStore> = match config.store.kind {
        StoreKind::Memory => {
            debug!("No fixture given; using an empty in-memory store");
            Box::new(MemoryStore::new())
        }
        StoreKind::Rest => {
            let url = config
                .store
                .url
                .clone()
                .context("store.url is required for the rest store")?;
            info!("Using REST store at {}", url);
            Box::new(RestStore::new(
                url,
                config.api_key().unwrap_or_default(),
                config.fetch_timeout(),
            )?)
        }
    };

    Ok(Backend {
        store,
        fetcher: Box::new(fetcher),
    })
}

fn parse_ref(raw: &str) -> Result<ComponentRef> {
    raw.parse()
        .with_context(|| format!("Invalid component reference '{}'", raw))
}

async fn resolve_command(
    config: &VitrineConfig,
    raw_refs: &[String],
    with_demos: bool,
    fixture: Option<&Path>,
) -> Result<ExitCode> {
    let refs = raw_refs.iter().map(|r| parse_ref(r)).collect::<Result<Vec<_>>>()?;
    let backend = open_backend(config, fixture)?;

    let tree = resolve(backend.store.as_ref(), backend.fetcher.as_ref(), &refs, with_demos).await?;
    print_json(&tree)?;
    Ok(ExitCode::SUCCESS)
}

async fn bundle_command(
    config: &VitrineConfig,
    raw_ref: &str,
    fixture: Option<&Path>,
) -> Result<ExitCode> {
    let reference = parse_ref(raw_ref)?;
    let backend = open_backend(config, fixture)?;

    let showcase =
        load_showcase(backend.store.as_ref(), backend.fetcher.as_ref(), &reference).await?;
    let input = PreviewInput::from_showcase(&showcase, config.preview.stylesheets.clone());
    let bundle = assemble(&input).with_context(|| format!("Cannot preview {}", reference))?;

    print_json(&bundle)?;
    Ok(ExitCode::SUCCESS)
}

async fn catalog_command(
    config: &VitrineConfig,
    query: &CatalogQuery,
    fixture: Option<&Path>,
) -> Result<ExitCode> {
    let backend = open_backend(config, fixture)?;
    let store = backend.store.as_ref();

    let (listings, counts) = tokio::join!(browse(store, query), tab_counts(store));
    let listings = listings?;

    let tabs: Vec<String> = counts
        .iter()
        .map(|(filter, count)| format!("{}: {}", filter, count))
        .collect();
    println!("{}", tabs.join("  "));
    println!("{}", "=".repeat(60));

    for listing in &listings {
        let reference = listing
            .component
            .reference()
            .with_demo(listing.demo.demo_slug.clone());
        println!(
            "{:40} {:24} downloads={} likes={}",
            reference.to_string(),
            listing.component.name,
            listing.component.downloads_count,
            listing.component.likes_count
        );
    }

    Ok(ExitCode::SUCCESS)
}
