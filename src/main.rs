use clap::{Parser, Subcommand};
use imageservice::cache::ImageCache;
use imageservice::config::{self, ServiceConfig};
use imageservice::request::{self, ImageRequest, Transform};
use imageservice::templates::TemplateRepository;
use imageservice::{output, paths, prime, server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imageservice")]
#[command(version)]
#[command(about = "On-demand image resizing with a filesystem cache")]
#[command(long_about = "\
On-demand image resizing with a filesystem cache

Originals live under the source root. Derivatives are generated on first
request with ImageMagick and kept under the cache root forever:

  GET /dir/hello.100x200.png   media/dir/hello.png  →  cache/dir/hello.100x200.png
  GET /dir/hello.thumb.png     media/dir/hello.*    →  cache/dir/hello.thumb.png

Named templates (`thumb` above) are read from imagemagick.templates, one
`name = convert arguments` per line.

Run 'imageservice gen-config' to generate a documented imageservice.toml.")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct GlobalArgs {
    /// Config file (missing file means defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Directory of original images (overrides config)
    #[arg(long, global = true)]
    source_root: Option<PathBuf>,

    /// Directory of generated images (overrides config)
    #[arg(long, global = true)]
    cache_root: Option<PathBuf>,

    /// HTTP listen address (overrides config)
    #[arg(long, global = true)]
    bind: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve images over HTTP
    Serve,
    /// Run one request path through the cache, e.g. dir/hello.100x200.png
    Fetch { request_path: String },
    /// Generate one derivative for every original under the source root
    Prime(PrimeTarget),
    /// Rewrite an image URL to point at a derivative
    Url {
        url: String,
        /// `WxH` or a template name
        descriptor: String,
    },
    /// Print a stock imageservice.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct PrimeTarget {
    /// Resize every original to WxH
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// Apply a named template to every original
    #[arg(long, value_name = "NAME")]
    template: Option<String>,
}

impl PrimeTarget {
    fn transform(self) -> Option<Transform> {
        match (self.size, self.template) {
            (Some((width, height)), _) => Some(Transform::Dimensions { width, height }),
            (None, Some(name)) => Some(Transform::Template { name }),
            (None, None) => None,
        }
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    request::parse_dimensions(s).ok_or_else(|| format!("expected WxH, e.g. 100x200, got '{s}'"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let config = load_config(&cli.global)?;
            let templates = TemplateRepository::load(&config.template_dirs)?;
            let cache = Arc::new(ImageCache::new(&config, templates, config.backend()));
            tokio::runtime::Runtime::new()?.block_on(server::serve(cache, &config.bind))?;
        }
        Command::Fetch { request_path } => {
            let config = load_config(&cli.global)?;
            let request = ImageRequest::parse(&request_path)
                .ok_or_else(|| format!("not an image request: {request_path}"))?;
            let templates = templates_for(&config, &request.transform)?;
            let cache = ImageCache::new(&config, templates, config.backend());
            match cache.serve(&request) {
                Ok(artifact) => output::print_fetch_output(&request, &artifact),
                Err(e) => return Err(output::format_serve_error(&request, &e).into()),
            }
        }
        Command::Prime(target) => {
            let config = load_config(&cli.global)?;
            let transform = target
                .transform()
                .ok_or("prime needs either --size or --template")?;
            let templates = templates_for(&config, &transform)?;
            let cache = ImageCache::new(&config, templates, config.backend());
            let requests = prime::discover(&config.source_root, &transform)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_prime_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let stats = prime::prime(&cache, requests, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            println!("{}", output::format_prime_summary(&stats));
            if stats.failed > 0 {
                return Err(format!("{} of {} requests failed", stats.failed, stats.total()).into());
            }
        }
        Command::Url { url, descriptor } => {
            println!("{}", paths::sized_url(&url, &descriptor));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides.
fn load_config(args: &GlobalArgs) -> Result<ServiceConfig, config::ConfigError> {
    let mut config = config::load_config(&args.config)?;
    if let Some(source_root) = &args.source_root {
        config.source_root = source_root.clone();
    }
    if let Some(cache_root) = &args.cache_root {
        config.cache_root = cache_root.clone();
    }
    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Templates are only read when the work at hand needs them.
fn templates_for(
    config: &ServiceConfig,
    transform: &Transform,
) -> Result<TemplateRepository, imageservice::templates::TemplateError> {
    match transform {
        Transform::Template { .. } => TemplateRepository::load(&config.template_dirs),
        Transform::Dimensions { .. } => Ok(TemplateRepository::empty()),
    }
}
