//! filebase-upload - presign and upload CAR files to Filebase.
//!
//! # Usage
//!
//! ```text
//! FILEBASE_TOKEN=... filebase-upload upload my-bucket ./data.car
//! FILEBASE_TOKEN=... filebase-upload head my-bucket data.car
//! FILEBASE_TOKEN=... filebase-upload sign-url https://s3.filebase.com/my-bucket/data.car
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FILEBASE_TOKEN` | *(required)* | base64 of `accessKeyId:secretAccessKey` |
//! | `FILEBASE_API_URL` | `s3.filebase.com` | Endpoint host |
//! | `FILEBASE_REGION` | `us-east-1` | Signing region |
//! | `FILEBASE_EXPIRES_IN` | `3600` | Presigned URL validity in seconds |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use filebase_client::{ClientConfig, FilebaseClient, credentials_from_env};
use filebase_sigv4::{HttpRequest, HttpRequestInit, Presigner, format_url, parse_url_with_query};
use http::Method;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Presign and upload CAR files to Filebase.
#[derive(Debug, Parser)]
#[command(name = "filebase-upload", version)]
#[command(about = "Presign and upload CAR files to Filebase", long_about = None)]
struct Cli {
    /// Endpoint host, overriding `FILEBASE_API_URL`
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Signing region, overriding `FILEBASE_REGION`
    #[arg(long, global = true)]
    region: Option<String>,

    /// Presigned URL validity in seconds, overriding `FILEBASE_EXPIRES_IN`
    #[arg(long, global = true, allow_negative_numbers = true)]
    expires_in: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the bucket if needed and print a presigned upload URL
    Presign {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
    },
    /// Upload a CAR file
    Upload {
        /// Bucket name
        bucket: String,
        /// Path of the CAR file to upload
        file: PathBuf,
        /// Object key (defaults to the file name)
        #[arg(long)]
        key: Option<String>,
    },
    /// Check whether an object exists and print its CID
    Head {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
    },
    /// Download an object
    Get {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
        /// Write the body to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Create a bucket
    CreateBucket {
        /// Bucket name
        bucket: String,
    },
    /// Presign an arbitrary URL without contacting the server
    SignUrl {
        /// Absolute URL to presign
        url: String,
        /// HTTP method the URL will be used with
        #[arg(short, long, default_value = "PUT")]
        method: String,
    },
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so that stdout carries only command output.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Apply command-line overrides on top of the environment configuration.
fn build_config(cli: &Cli, mut config: ClientConfig) -> ClientConfig {
    if let Some(api_url) = &cli.api_url {
        config.api_url.clone_from(api_url);
    }
    if let Some(region) = &cli.region {
        config.region.clone_from(region);
    }
    if let Some(expires_in) = cli.expires_in {
        config.expires_in = expires_in;
    }
    config
}

/// Presign `url` for `method` offline.
///
/// Query parameters already on `url` are kept and signed.
fn sign_url(url: &str, method: &str, presigner: &Presigner) -> Result<String> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method: {method}"))?;
    let request = HttpRequest::new(HttpRequestInit {
        method: Some(method),
        ..HttpRequestInit::from(parse_url_with_query(url)?)
    });
    Ok(format_url(&presigner.presign(&request)))
}

/// Object key for an uploaded file: its file name.
fn default_key(file: &Path) -> Result<String> {
    file.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("cannot derive an object key from {}", file.display()))
}

async fn run(cli: Cli, config: ClientConfig) -> Result<()> {
    let client = FilebaseClient::new(config, credentials_from_env()?);
    match cli.command {
        Commands::Presign { bucket, key } => {
            println!("{}", client.create_presigned_url(&bucket, &key).await?);
        }
        Commands::Upload { bucket, file, key } => {
            let key = match key {
                Some(key) => key,
                None => default_key(&file)?,
            };
            let body = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let response = client.upload_car(&bucket, &key, Bytes::from(body)).await?;
            println!("{}", response.status);
        }
        Commands::Head { bucket, key } => {
            let (exists, cid) = client.head_object(&bucket, &key).await?;
            match (exists, cid) {
                (true, Some(cid)) => println!("{cid}"),
                (true, None) => println!("exists (no CID)"),
                (false, _) => anyhow::bail!("{bucket}/{key} not found"),
            }
        }
        Commands::Get {
            bucket,
            key,
            output,
        } => {
            let response = client.get_object(&bucket, &key).await?;
            match output {
                Some(path) => tokio::fs::write(&path, &response.body)
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&response.body).await?;
                    stdout.flush().await?;
                }
            }
        }
        Commands::CreateBucket { bucket } => {
            let created = client.create_bucket(&bucket).await?;
            println!("{}", if created { "created" } else { "not created" });
        }
        Commands::SignUrl { url, method } => {
            println!("{}", sign_url(&url, &method, client.presigner())?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli, ClientConfig::from_env());

    init_tracing(&config.log_level)?;

    info!(
        api_url = %config.api_url,
        region = %config.region,
        expires_in = config.expires_in,
        version = VERSION,
        "starting filebase-upload",
    );

    run(cli, config).await
}

#[cfg(test)]
mod tests {
    use filebase_sigv4::Credentials;

    use super::*;

    fn test_presigner() -> Presigner {
        Presigner::new(Credentials::new("AKID", "SECRET"), "us-east-1")
    }

    #[test]
    fn test_should_parse_upload_command() {
        let cli = Cli::try_parse_from([
            "filebase-upload",
            "upload",
            "my-bucket",
            "./data.car",
            "--key",
            "renamed.car",
        ])
        .unwrap();
        match cli.command {
            Commands::Upload { bucket, file, key } => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(file, PathBuf::from("./data.car"));
                assert_eq!(key.as_deref(), Some("renamed.car"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_should_apply_cli_overrides() {
        let cli = Cli::try_parse_from([
            "filebase-upload",
            "--api-url",
            "localhost:9000",
            "--expires-in",
            "-1",
            "create-bucket",
            "b",
        ])
        .unwrap();
        let config = build_config(&cli, ClientConfig::default());
        assert_eq!(config.api_url, "localhost:9000");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.expires_in, -1);
    }

    #[test]
    fn test_should_sign_url_offline() {
        let url = sign_url(
            "https://s3.filebase.com/my-bucket/hello.txt",
            "get",
            &test_presigner(),
        )
        .unwrap();
        assert!(url.starts_with("https://s3.filebase.com/my-bucket/hello.txt?X-Amz-Algorithm="));
        assert!(url.contains("X-Amz-Credential=AKID%2F"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[test]
    fn test_should_keep_query_when_signing_url() {
        let url = sign_url(
            "https://s3.filebase.com/b/k?partNumber=1&uploadId=abc",
            "PUT",
            &test_presigner(),
        )
        .unwrap();
        assert!(url.starts_with("https://s3.filebase.com/b/k?X-Amz-Algorithm="));
        assert!(url.contains("&partNumber=1&uploadId=abc"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[test]
    fn test_should_reject_invalid_sign_url_input() {
        let presigner = test_presigner();
        assert!(sign_url("not a url", "PUT", &presigner).is_err());
        assert!(sign_url("https://example.com/", "BAD METHOD", &presigner).is_err());
    }

    #[test]
    fn test_should_default_key_to_file_name() {
        assert_eq!(default_key(Path::new("/tmp/out/data.car")).unwrap(), "data.car");
        assert!(default_key(Path::new("/")).is_err());
    }
}
