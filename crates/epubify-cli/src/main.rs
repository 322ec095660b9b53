use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use epubify_client::{DocLinkExtractor, ReadabilityExtractor, ReqwestFetcher};
use epubify_core::config::ConversionConfig;
use epubify_core::converter::{ConversionService, TracingConversionReporter};
use epubify_core::job::{ConversionRequest, JobStatus, epub_filename};
use epubify_core::registry::MemoryRegistry;
use epubify_core::traits::LinkExtractor;

#[derive(Parser)]
#[command(name = "epubify", version, about = "Convert documentation websites into EPUB books")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a documentation site into an EPUB file
    Convert {
        /// Documentation index page
        #[arg(short, long)]
        url: String,

        /// Book title (defaults to EPUBIFY_DEFAULT_TITLE or "Documentation")
        #[arg(short, long)]
        title: Option<String>,

        /// Output file (defaults to the sanitized title with an .epub extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum cleaned content length, in characters, for a page to be kept
        #[arg(long, env = "EPUBIFY_MIN_CONTENT_LENGTH")]
        min_content_length: Option<usize>,

        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Print the documentation links that would be converted
    Links {
        /// Documentation index page
        #[arg(short, long)]
        url: String,

        #[command(flatten)]
        crawl: CrawlArgs,
    },
}

#[derive(Args)]
struct CrawlArgs {
    /// Maximum number of pages to fetch
    #[arg(short, long, env = "EPUBIFY_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Extra domain whose pages count as documentation (repeatable)
    #[arg(long = "allow-domain", value_name = "DOMAIN")]
    allow_domains: Vec<String>,

    /// Allow fetching hosts on private or loopback addresses
    #[arg(long, default_value_t = false)]
    allow_private_urls: bool,
}

impl CrawlArgs {
    fn apply(self, mut config: ConversionConfig) -> Result<ConversionConfig> {
        if let Some(max_pages) = self.max_pages {
            if max_pages == 0 {
                bail!("--max-pages must be at least 1");
            }
            config = config.with_max_pages(max_pages);
        }
        for domain in self.allow_domains {
            let domain = domain.trim().trim_start_matches('.').to_ascii_lowercase();
            if !domain.is_empty() && !config.allowed_domains.contains(&domain) {
                config.allowed_domains.push(domain);
            }
        }
        if self.allow_private_urls {
            config = config.allow_private_urls();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("epubify=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConversionConfig::from_env().context("Invalid EPUBIFY_* configuration")?;

    match cli.command {
        Commands::Convert {
            url,
            title,
            output,
            min_content_length,
            crawl,
        } => {
            let mut config = crawl.apply(config)?;
            if let Some(min) = min_content_length {
                config = config.with_min_content_length(min);
            }
            cmd_convert(&url, title, output, config).await?;
        }
        Commands::Links { url, crawl } => {
            cmd_links(&url, crawl.apply(config)?).await?;
        }
    }

    Ok(())
}

async fn cmd_convert(
    url: &str,
    title: Option<String>,
    output: Option<PathBuf>,
    config: ConversionConfig,
) -> Result<()> {
    let fetcher = ReqwestFetcher::from_config(&config).context("Failed to create HTTP client")?;
    let links = DocLinkExtractor::with_config(fetcher.clone(), &config);
    let content = ReadabilityExtractor::with_config(fetcher, &config);
    let service = ConversionService::new(links, content, MemoryRegistry::new(), config);

    let request = match title {
        Some(title) => ConversionRequest::new(url).with_title(title),
        None => ConversionRequest::new(url),
    };
    let job = service.create_job(request).await?;
    let job = service.run(job.id, &TracingConversionReporter).await?;

    if job.status != JobStatus::Completed {
        bail!("{}", job.message);
    }

    let book_title = job.book_title(&service.config().default_title);
    let path = output.unwrap_or_else(|| PathBuf::from(epub_filename(book_title)));
    let epub = job.download()?;

    std::fs::write(&path, &epub)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {} ({} bytes)", path.display(), epub.len());
    Ok(())
}

async fn cmd_links(url: &str, config: ConversionConfig) -> Result<()> {
    let fetcher = ReqwestFetcher::from_config(&config).context("Failed to create HTTP client")?;
    let extractor = DocLinkExtractor::with_config(fetcher, &config);

    let links = extractor.extract_links(url).await?;
    for link in &links {
        println!("{link}");
    }
    tracing::info!(count = links.len(), "Done");

    Ok(())
}
