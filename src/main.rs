use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use tracing_subscriber::EnvFilter;

use inkpost::App;
use inkpost::config::{Config, LogFormat};

#[derive(Parser)]
#[command(name = "inkpost", version, about = "Minimal Markdown blog")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "INKPOST_CONFIG", default_value = "inkpost.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Credentials {
    /// Account to act as
    #[arg(long)]
    user: String,
    #[arg(long, env = "INKPOST_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args)]
struct Body {
    /// Read the post text from a file
    #[arg(long, conflicts_with = "text")]
    file: Option<String>,
    /// Post text given inline
    #[arg(long)]
    text: Option<String>,
}

impl Body {
    fn load(&self) -> Result<String> {
        match (&self.file, &self.text) {
            (Some(path), _) => std::fs::read_to_string(path).with_context(|| format!("reading {path}")),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => bail!("either --file or --text is required"),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Register a user
    AddUser {
        username: String,
        #[arg(long, env = "INKPOST_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        /// Allow the user to delete posts
        #[arg(long)]
        admin: bool,
    },
    /// List one page of posts, newest first
    List {
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show a post and its comments
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Write a new post
    Post {
        #[command(flatten)]
        auth: Credentials,
        #[arg(long)]
        title: String,
        #[command(flatten)]
        body: Body,
    },
    /// Replace the title and text of a post
    Edit {
        id: i64,
        #[command(flatten)]
        auth: Credentials,
        #[arg(long)]
        title: String,
        #[command(flatten)]
        body: Body,
    },
    /// Delete a post and its comments (admins only)
    Delete {
        id: i64,
        #[command(flatten)]
        auth: Credentials,
    },
    /// Comment on a post
    Comment { id: i64, reply: String },
    /// Render Markdown from a file (or stdin) to sanitized HTML
    Render { file: Option<String> },
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn render_file(file: Option<&str>) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    print!("{}", inkpost::render(&raw));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Render { file } => {
            init_tracing("warn", LogFormat::Text);
            render_file(file.as_deref())
        }
        command => {
            let cfg = Config::from_file(&cli.config)
                .with_context(|| format!("loading configuration from {}", cli.config))?;
            init_tracing(&cfg.log_level, cfg.log_format);
            let app = App::open(cfg).await?;
            execute(&app, command).await
        }
    }
}

async fn execute(app: &App, command: Command) -> Result<()> {
    match command {
        Command::AddUser {
            username,
            password,
            email,
            admin,
        } => {
            let user = app.register(&username, &password, email.as_deref()).await?;
            if admin {
                app.store().set_admin(&user.username, true).await?;
            }
            println!("created user {} (#{})", user.username, user.id);
        }
        Command::List { page, json } => {
            let index = app.index(page).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&index)?);
            } else {
                println!("{}\n", app.config().site_name);
                for post in &index.posts {
                    println!(
                        "{:>6}  {}  {}",
                        post.id(),
                        post.timestamp().format("%Y-%m-%d %H:%M"),
                        post.title()
                    );
                }
                let nav: Vec<String> = index
                    .page
                    .nav_pages()
                    .into_iter()
                    .map(|n| match n {
                        Some(n) if n == index.page.page => format!("[{n}]"),
                        Some(n) => n.to_string(),
                        None => "...".to_string(),
                    })
                    .collect();
                println!(
                    "page {} of {}  {}",
                    index.page.page,
                    index.page.pages().max(1),
                    nav.join(" ")
                );
            }
        }
        Command::Show { id, json } => {
            let page = app.post(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                println!("# {}\n", page.post.title());
                println!("{}", page.post.text_html());
                for comment in &page.comments {
                    println!("-- {}", comment.reply);
                }
            }
        }
        Command::Post { auth, title, body } => {
            let session = app.login(&auth.user, &auth.password, false).await?;
            let post = app.add_post(&session, &title, &body.load()?).await?;
            println!("created post #{}", post.id());
            app.logout(session);
        }
        Command::Edit {
            id,
            auth,
            title,
            body,
        } => {
            let session = app.login(&auth.user, &auth.password, false).await?;
            app.edit_post(&session, id, &title, &body.load()?).await?;
            println!("updated post #{id}");
            app.logout(session);
        }
        Command::Delete { id, auth } => {
            let session = app.login(&auth.user, &auth.password, false).await?;
            app.delete_post(&session, id).await?;
            println!("deleted post #{id}");
            app.logout(session);
        }
        Command::Comment { id, reply } => {
            let comment = app.add_comment(id, &reply).await?;
            println!("added comment #{} to post #{id}", comment.id);
        }
        Command::Render { file } => render_file(file.as_deref())?,
    }
    Ok(())
}
