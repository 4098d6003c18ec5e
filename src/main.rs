use clap::{Parser, Subcommand};
use quire::{config, output, site};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Static site generator for a personal site and blog")]
#[command(long_about = "\
Static site generator for a personal site and blog

Markdown in, static HTML out: posts and pages with math and highlighted code,
responsive images, an RSS feed, fingerprinted stylesheets and an offline
cache worker.

Content structure:

  content/
  ├── site.toml                       # Site config (optional)
  ├── index.md                        # Home page intro → /
  ├── about.md                        # Page → /about/
  ├── posts/
  │   └── 2024-03-09-hello-world.md   # Post → /posts/hello-world/
  ├── css/                            # Stylesheets, linked as /css/*.css?v=<hash>
  └── img/, fonts/, favicon.ico ...   # Copied verbatim

Shortcodes in markdown:
  {% image \"img/harbour.jpg\", \"Boats at dusk\", \"50vw\" %}
  {{ year() }}

Run 'quire gen-config' to generate a documented site.toml.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build {
        /// Ignore the image cache of previous builds and re-encode everything
        #[arg(long)]
        no_cache: bool,
    },
    /// Validate config, content and shortcodes without writing anything
    Check,
    /// Print the stylesheet hash and versioned stylesheet URLs
    Hash,
    /// Print the service worker script a build would emit
    Sw,
    /// Print a stock site.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build { no_cache } => {
            let site_config = config::load_config(&cli.source)?;
            init_thread_pool(&site_config.processing);

            println!("==> Building {} → {}", cli.source.display(), cli.output.display());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_image_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let options = site::BuildOptions {
                use_cache: !no_cache,
                events: Some(tx),
            };
            // The sender is dropped when build returns, which ends the printer
            let result = site::build(&cli.source, &cli.output, options);
            printer
                .join()
                .map_err(|_| "image progress printer panicked")?;
            let report = result?;
            output::print_build_report(&report, &cli.output);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let report = site::check(&cli.source)?;
            output::print_check_report(&report);
            println!("==> Content is valid");
        }
        Command::Hash => {
            let site_config = config::load_config(&cli.source)?;
            let (hash, urls) = site::stylesheets(&cli.source, &site_config)?;
            output::print_hash(&hash, &urls);
        }
        Command::Sw => {
            print!("{}", site::service_worker(&cli.source)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
