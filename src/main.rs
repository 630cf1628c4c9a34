use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cached_image::domain::{ImageDecoder, ImageTransport, ResourceKey};
use cached_image::infrastructure::{
    AppConfig, CliArgs, ConfigStore, HttpTransport, ImageCrateDecoder, ImageLoader,
    MemoryImageCache,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let store = ConfigStore::new()?;
    let mut config = store.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = cached_image::VERSION, "Starting cached-image");

    let keys = args
        .urls
        .iter()
        .map(|url| ResourceKey::parse(url))
        .collect::<Result<Vec<_>, _>>()?;

    let cache = Arc::new(MemoryImageCache::new(config.cache));
    let transport: Arc<dyn ImageTransport> = Arc::new(HttpTransport::new(&config.http)?);
    let decoder: Arc<dyn ImageDecoder> = Arc::new(ImageCrateDecoder::new(config.decoder));

    for pass in 1..=args.passes {
        let loaders = keys
            .iter()
            .map(|key| {
                ImageLoader::builder()
                    .cache(cache.clone())
                    .transport(transport.clone())
                    .decoder(decoder.clone())
                    .preload(key.clone())
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (key, loader) in keys.iter().zip(&loaders) {
            match loader.settled().await.image {
                Some(image) => {
                    println!("[pass {pass}] {key}: {}x{}", image.width(), image.height());
                }
                None => println!("[pass {pass}] {key}: failed"),
            }
        }
    }

    println!("{}", cache.stats());

    Ok(())
}
