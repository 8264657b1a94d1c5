//! `mailgate` - register users and relay mail through a service account.
//!
//! ```text
//! mailgate register alice
//! mailgate send --user alice --to bob@example.com --subject Hi --body Hello
//! mailgate fetch --user alice --count 5
//! ```

use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use mailgate_core::{
    Attachment, AttachmentSource, Gateway, GatewayConfig, OutgoingMessage, Session,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mailgate")]
#[command(about = "Mail-relay gateway: local accounts sending and reading mail through one service account", long_about = None)]
struct Cli {
    /// JSON configuration file; environment variables are used otherwise
    #[arg(long, global = true, env = "MAILGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Credential database path
    #[arg(long, global = true, env = "MAILGATE_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a local user
    Register {
        /// Username to create
        username: String,

        #[command(flatten)]
        password: PasswordArg,
    },
    /// Send a message from the service account
    Send {
        #[command(flatten)]
        login: LoginArgs,

        /// Recipient address
        #[arg(long)]
        to: String,

        /// Subject line
        #[arg(long, default_value = "")]
        subject: String,

        /// Plain-text body
        #[arg(long, default_value = "")]
        body: String,

        /// File to attach
        #[arg(long)]
        attach: Option<PathBuf>,
    },
    /// Show the most recent inbox messages
    Fetch {
        #[command(flatten)]
        login: LoginArgs,

        /// How many messages to read
        #[arg(long, default_value = "5")]
        count: NonZeroUsize,
    },
}

#[derive(clap::Args)]
struct PasswordArg {
    /// Account password
    #[arg(long, env = "MAILGATE_USER_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(clap::Args)]
struct LoginArgs {
    /// Username to log in as
    #[arg(long)]
    user: String,

    #[command(flatten)]
    password: PasswordArg,
}

/// An attachment read from disk when the message is built.
#[derive(Debug)]
struct FileAttachment(PathBuf);

impl AttachmentSource for FileAttachment {
    fn read_bytes(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.0)
    }
}

impl FileAttachment {
    fn into_attachment(self) -> anyhow::Result<Attachment> {
        let filename = attachment_name(&self.0)?;
        Ok(Attachment::new(filename, self))
    }
}

fn attachment_name(path: &Path) -> anyhow::Result<String> {
    match path.file_name() {
        Some(name) => Ok(name.to_string_lossy().into_owned()),
        None => bail!("attachment path {} has no file name", path.display()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailgate=info,mailgate_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.database)?;
    let gateway = Gateway::open(config)
        .await
        .context("failed to open credential store")?;

    match cli.command {
        Commands::Register { username, password } => {
            let record = gateway.register(&username, &password.password).await?;
            println!("registered {} (id {})", record.username, record.id);
        }
        Commands::Send {
            login,
            to,
            subject,
            body,
            attach,
        } => {
            let session = login_as(&gateway, &login).await?;
            let mut message = OutgoingMessage::new(to, subject, body);
            if let Some(path) = attach {
                message = message.with_attachment(FileAttachment(path).into_attachment()?);
            }

            let report = gateway.send(&session, message).await?;
            println!("message sent");
            if let Some(error) = report.attachment_error {
                println!("warning: {error}");
            }
        }
        Commands::Fetch { login, count } => {
            let session = login_as(&gateway, &login).await?;
            let results = gateway.fetch_recent(&session, count).await?;
            if results.is_empty() {
                println!("inbox is empty");
            }
            for result in results {
                match result {
                    Ok(summary) => {
                        println!("#{} from: {}", summary.seq, summary.from);
                        println!("   subject: {}", summary.subject);
                        for line in summary.body_text.lines() {
                            println!("   | {line}");
                        }
                    }
                    Err(error) => println!("#{} {error}", error.seq),
                }
            }
        }
    }

    Ok(())
}

async fn login_as(gateway: &Gateway, login: &LoginArgs) -> anyhow::Result<Session> {
    let session = gateway.login(&login.user, &login.password.password).await?;
    info!(user = session.username(), "logged in");
    Ok(session)
}

fn load_config(path: Option<&Path>, database: Option<PathBuf>) -> anyhow::Result<GatewayConfig> {
    let mut config = match path {
        Some(path) => GatewayConfig::from_json_file(path)?,
        None => {
            let mut config = GatewayConfig::from_env()?;
            config.database_path = default_database_path()?;
            config
        }
    };
    if let Some(database) = database {
        config.database_path = database;
    }
    Ok(config)
}

/// `<data dir>/mailgate/mailgate.db`, creating the directory.
fn default_database_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("no data directory on this platform; pass --database")?
        .join("mailgate");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir.join("mailgate.db"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from([
            "mailgate", "send", "--user", "alice", "--password", "pw", "--to", "bob@example.com",
            "--subject", "Hi", "--attach", "/tmp/report.pdf",
        ])
        .unwrap();
        let Commands::Send { login, to, attach, body, .. } = cli.command else {
            panic!("expected send");
        };
        assert_eq!(login.user, "alice");
        assert_eq!(to, "bob@example.com");
        assert_eq!(body, "");
        assert_eq!(attach.as_deref(), Some(Path::new("/tmp/report.pdf")));
    }

    #[test]
    fn test_fetch_count() {
        let cli = Cli::try_parse_from(["mailgate", "fetch", "--user", "a", "--password", "p"]).unwrap();
        let Commands::Fetch { count, .. } = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(count.get(), 5);

        assert!(Cli::try_parse_from(["mailgate", "fetch", "--user", "a", "--password", "p", "--count", "0"]).is_err());
    }

    #[test]
    fn test_attachment_name() {
        assert_eq!(attachment_name(Path::new("/tmp/q3 report.pdf")).unwrap(), "q3 report.pdf");
        assert!(attachment_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_missing_file_reports_io_error() {
        let source = FileAttachment(PathBuf::from("/nonexistent/mailgate/file.bin"));
        assert!(source.read_bytes().is_err());
    }
}
