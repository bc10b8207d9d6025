//! Postbridge CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use postbridge_core::{render_document, slugify, BlogPost, Catalog, Config};
use postbridge_github::GitHubClient;
use postbridge_web::{router_from_config, PublishOptions, PublishSettings, Publisher};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Initialize logging with the specified verbosity level
fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<()> {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    // Target prefix match covers every postbridge_* crate
    let filter =
        EnvFilter::from_default_env().add_directive(format!("postbridge={}", level).parse()?);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_file(verbose >= 3)
        .with_line_number(verbose >= 3);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "postbridge")]
#[command(about = "Publish blog posts to a GitHub repository as pull requests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (YAML)
    #[arg(long, env = "POSTBRIDGE_CONFIG", global = true)]
    config: Option<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    github_token: Option<String>,

    /// Repository owner
    #[arg(long, env = "GITHUB_OWNER", global = true)]
    github_owner: Option<String>,

    /// Repository name
    #[arg(long, env = "GITHUB_REPO", global = true)]
    github_repo: Option<String>,

    /// API key required on /api routes
    #[arg(long, env = "POSTBRIDGE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Secret for webhook signature verification
    #[arg(long, env = "POSTBRIDGE_WEBHOOK_SECRET", hide_env_values = true, global = true)]
    webhook_secret: Option<String>,

    /// Increase verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output logs as JSON (for machine parsing)
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Render a post JSON file to Markdown with frontmatter
    Render {
        /// Post file (a single post object or an array of posts)
        file: PathBuf,
        /// Write `<slug>.md` files into this directory instead of printing
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the slug of a title
    Slug {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// List content from Markdown and JSON sources, reporting duplicates
    Catalog {
        #[arg(long)]
        markdown_dir: Option<PathBuf>,
        #[arg(long)]
        json_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Publish posts from a JSON file
    Publish {
        /// Post file (a single post object or an array of posts)
        file: PathBuf,
        /// One branch, commit and pull request for all posts
        #[arg(long)]
        batch: bool,
        /// Merge the pull request once opened
        #[arg(long)]
        auto_merge: bool,
        #[arg(long = "label")]
        labels: Vec<String>,
        #[arg(long = "reviewer")]
        reviewers: Vec<String>,
        /// Base branch (defaults to github.base_branch)
        #[arg(long)]
        base: Option<String>,
    },
}

/// Post files hold either one post or a list of posts
#[derive(Deserialize)]
#[serde(untagged)]
enum PostFile {
    Many(Vec<BlogPost>),
    One(Box<BlogPost>),
}

fn read_posts(path: &Path) -> Result<Vec<BlogPost>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let posts = match serde_json::from_str::<PostFile>(&content)
        .with_context(|| format!("Invalid post file {}", path.display()))?
    {
        PostFile::Many(posts) => posts,
        PostFile::One(post) => vec![*post],
    };
    Ok(posts)
}

impl Cli {
    /// Load the config file (if any) and apply flag and environment overrides
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let path = shellexpand::tilde(path).to_string();
                Config::from_yaml_file(&path)?
            }
            None => Config::default(),
        };

        if let Some(token) = &self.github_token {
            config.github.token = Some(token.clone());
        }
        if let Some(owner) = &self.github_owner {
            config.github.owner = owner.clone();
        }
        if let Some(repo) = &self.github_repo {
            config.github.repo = repo.clone();
        }
        if let Some(key) = &self.api_key {
            config.server.api_key = Some(key.clone());
        }
        if let Some(secret) = &self.webhook_secret {
            config.webhook.secret = Some(secret.clone());
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet, cli.log_json)?;

    match &cli.command {
        Commands::Serve { host, port } => {
            let mut config = cli.load_config()?;
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            config.validate()?;
            run_server(config).await?;
        }

        Commands::Render { file, out } => {
            let posts = read_posts(file)?;
            for post in &posts {
                post.validate()?;
            }

            match out {
                Some(dir) => {
                    let mut seen = HashSet::new();
                    for post in &posts {
                        let slug = post.slug();
                        if !seen.insert(slug.clone()) {
                            bail!("Duplicate slug '{}' would overwrite {}.md", slug, slug);
                        }
                    }

                    std::fs::create_dir_all(dir)
                        .with_context(|| format!("Failed to create {}", dir.display()))?;
                    for post in &posts {
                        let path = dir.join(format!("{}.md", post.slug()));
                        std::fs::write(&path, render_document(post)?)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("{}", path.display());
                    }
                }
                None => {
                    for (index, post) in posts.iter().enumerate() {
                        if index > 0 {
                            println!();
                        }
                        print!("{}", render_document(post)?);
                    }
                }
            }
        }

        Commands::Slug { title } => {
            let slug = slugify(&title.join(" "));
            if slug.is_empty() {
                bail!("Title does not produce a usable slug");
            }
            println!("{}", slug);
        }

        Commands::Catalog {
            markdown_dir,
            json_dir,
            json,
        } => {
            let catalog = Catalog::load(markdown_dir.as_deref(), json_dir.as_deref());

            if *json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                print_catalog(&catalog);
            }
        }

        Commands::Publish {
            file,
            batch,
            auto_merge,
            labels,
            reviewers,
            base,
        } => {
            let config = cli.load_config()?;
            config.validate()?;

            let posts = read_posts(file)?;
            let options = PublishOptions {
                reviewers: reviewers.clone(),
                labels: labels.clone(),
                base_branch: base.clone(),
                auto_merge: *auto_merge,
                batch_mode: *batch,
            };

            let client = GitHubClient::from_config(&config.github)?;
            let publisher = Publisher::new(Arc::new(client), PublishSettings::from_config(&config));
            let report = publisher.publish(&posts, &options).await?;

            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                bail!(
                    "Publishing failed: {}",
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    let client = GitHubClient::from_config(&config.github)?;
    let app = router_from_config(Arc::new(client), &config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        addr = %addr,
        repository = %format!("{}/{}", config.github.owner, config.github.repo),
        api_key = config.server.api_key.is_some(),
        webhook_secret = config.webhook.secret.is_some(),
        "Starting postbridge server"
    );
    println!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn print_catalog(catalog: &Catalog) {
    if catalog.is_empty() {
        println!("No posts found");
    }

    for entry in catalog.entries() {
        println!(
            "{}\t{}\t{}\t{}{}",
            entry.date,
            entry.slug,
            entry.source.as_str(),
            entry.title,
            if entry.published { "" } else { " (draft)" }
        );
    }

    for duplicate in catalog.duplicates() {
        println!(
            "duplicate: {} kept {} dropped {}",
            duplicate.slug,
            duplicate.kept.display(),
            duplicate.dropped.display()
        );
    }
}
