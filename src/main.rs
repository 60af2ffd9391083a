//! b2 - command-line access to Backblaze B2
//!
//! Thin wrapper over the b2_client library for manual testing and scripting.

use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use b2_client::b2::{BucketType, Credentials, FileCollection, FileInfo};
use b2_client::{B2Client, ClientConfig};

/// CLI command
#[derive(Debug, PartialEq)]
enum Command {
    Authorize,
    ListBuckets,
    CreateBucket {
        name: String,
        bucket_type: BucketType,
    },
    UpdateBucket {
        bucket_id: String,
        bucket_type: BucketType,
    },
    DeleteBucket {
        bucket_id: String,
    },
    ListFiles {
        bucket_id: String,
        start: String,
        count: u32,
        versions: bool,
    },
    FileInfo {
        file_id: String,
    },
    Hide {
        bucket_id: String,
        file_name: String,
    },
    DeleteVersion {
        file_name: String,
        file_id: String,
    },
    Upload {
        bucket_id: String,
        path: PathBuf,
        file_name: Option<String>,
    },
    Download {
        bucket_name: String,
        file_name: String,
        out: PathBuf,
    },
    DownloadById {
        file_id: String,
        out: PathBuf,
    },
    Help,
}

fn print_help() {
    eprintln!(
        r#"b2 - Backblaze B2 command-line client

USAGE:
    b2 authorize
    b2 list-buckets
    b2 create-bucket <name> [allPrivate|allPublic]
    b2 update-bucket <bucket_id> <allPrivate|allPublic>
    b2 delete-bucket <bucket_id>
    b2 list-files <bucket_id> [start_file_name] [max_count]
    b2 list-versions <bucket_id> [start_file_name] [max_count]
    b2 file-info <file_id>
    b2 hide <bucket_id> <file_name>
    b2 delete-version <file_name> <file_id>
    b2 upload <bucket_id> <local_path> [file_name]
    b2 download <bucket_name> <file_name> <out_path>
    b2 download-id <file_id> <out_path>
    b2 help

ENVIRONMENT:
    B2_KEY_ID        B2 account ID or application key ID (or B2_ACCOUNT_ID)
    B2_KEY           B2 application key (or B2_APPLICATION_KEY)
    B2_AUTH_URL      Override the authorization endpoint
    B2_TIMEOUT_SECS  Request timeout in seconds (default 30)
    RUST_LOG         Log filter (trace, debug, info, warn, error)
"#
    );
}

/// Positional argument `index`, or a usage error naming it
fn arg(args: &[String], index: usize, name: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow!("Missing argument <{}>", name))
}

fn parse_count(value: Option<&String>) -> Result<u32> {
    match value {
        Some(v) => v
            .parse()
            .with_context(|| format!("Invalid max_count '{}'", v)),
        None => Ok(b2_client::b2::files::DEFAULT_FILE_COUNT),
    }
}

/// Parse arguments (without the program name) into a command
fn parse_args(args: &[String]) -> Result<Command> {
    let Some(name) = args.first() else {
        return Ok(Command::Help);
    };

    let command = match name.as_str() {
        "authorize" => Command::Authorize,
        "list-buckets" => Command::ListBuckets,
        "create-bucket" => Command::CreateBucket {
            name: arg(args, 1, "name")?,
            bucket_type: match args.get(2) {
                Some(t) => t.parse()?,
                None => BucketType::AllPrivate,
            },
        },
        "update-bucket" => Command::UpdateBucket {
            bucket_id: arg(args, 1, "bucket_id")?,
            bucket_type: arg(args, 2, "bucket_type")?.parse()?,
        },
        "delete-bucket" => Command::DeleteBucket {
            bucket_id: arg(args, 1, "bucket_id")?,
        },
        "list-files" | "list-versions" => Command::ListFiles {
            bucket_id: arg(args, 1, "bucket_id")?,
            start: args.get(2).cloned().unwrap_or_default(),
            count: parse_count(args.get(3))?,
            versions: name == "list-versions",
        },
        "file-info" => Command::FileInfo {
            file_id: arg(args, 1, "file_id")?,
        },
        "hide" => Command::Hide {
            bucket_id: arg(args, 1, "bucket_id")?,
            file_name: arg(args, 2, "file_name")?,
        },
        "delete-version" => Command::DeleteVersion {
            file_name: arg(args, 1, "file_name")?,
            file_id: arg(args, 2, "file_id")?,
        },
        "upload" => Command::Upload {
            bucket_id: arg(args, 1, "bucket_id")?,
            path: PathBuf::from(arg(args, 2, "local_path")?),
            file_name: args.get(3).cloned(),
        },
        "download" => Command::Download {
            bucket_name: arg(args, 1, "bucket_name")?,
            file_name: arg(args, 2, "file_name")?,
            out: PathBuf::from(arg(args, 3, "out_path")?),
        },
        "download-id" => Command::DownloadById {
            file_id: arg(args, 1, "file_id")?,
            out: PathBuf::from(arg(args, 2, "out_path")?),
        },
        "help" | "--help" | "-h" => Command::Help,
        other => bail!("Unknown command: {}", other),
    };

    Ok(command)
}

/// First non-empty environment variable among `names`
fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| env::var(n).ok())
        .find(|v| !v.is_empty())
}

fn credentials_from_env() -> Result<Credentials> {
    let key_id = env_any(&["B2_KEY_ID", "B2_ACCOUNT_ID"])
        .ok_or_else(|| anyhow!("B2_KEY_ID is not set"))?;
    let key = env_any(&["B2_KEY", "B2_APPLICATION_KEY"])
        .ok_or_else(|| anyhow!("B2_KEY is not set"))?;
    Ok(Credentials::new(key_id, key))
}

fn print_page(page: &FileCollection) {
    for file in &page.files {
        println!(
            "{:<6} {:>12} {} {}",
            format!("{:?}", file.action).to_lowercase(),
            file.size,
            file.file_id.as_deref().unwrap_or("-"),
            file.file_name
        );
    }
    if page.has_more() {
        println!("next: {}", page.next_file_name.as_deref().unwrap_or_default());
    }
}

fn print_file_info(info: &FileInfo) {
    println!("fileId:        {}", info.file_id);
    println!("fileName:      {}", info.file_name);
    println!("contentLength: {}", info.content_length);
    println!("contentType:   {}", info.content_type);
    println!("contentSha1:   {}", info.content_sha1);
    let mut keys: Vec<_> = info.info.keys().collect();
    keys.sort();
    for key in keys {
        println!("info:          {} = {}", key, info.info[key]);
    }
}

async fn run(command: Command) -> Result<()> {
    let config = ClientConfig::from_env()?;
    let client = B2Client::authorize_with_config(&credentials_from_env()?, &config).await?;

    match command {
        Command::Authorize => {
            let session = client.session();
            println!("accountId:   {}", session.account_id);
            println!("apiUrl:      {}", session.api_url);
            println!("downloadUrl: {}", session.download_url);
        }
        Command::ListBuckets => {
            for bucket in client.list_buckets().await? {
                println!(
                    "{}  {:<10}  {}",
                    bucket.bucket_id, bucket.bucket_type, bucket.bucket_name
                );
            }
        }
        Command::CreateBucket { name, bucket_type } => {
            let bucket = client.create_bucket(&name, bucket_type).await?;
            println!("{}", bucket.bucket_id);
        }
        Command::UpdateBucket {
            bucket_id,
            bucket_type,
        } => {
            let bucket = client.update_bucket(&bucket_id, bucket_type).await?;
            println!("{}  {}", bucket.bucket_id, bucket.bucket_type);
        }
        Command::DeleteBucket { bucket_id } => {
            let bucket = client.delete_bucket(&bucket_id).await?;
            println!("deleted {}", bucket.bucket_name);
        }
        Command::ListFiles {
            bucket_id,
            start,
            count,
            versions,
        } => {
            let page = if versions {
                client
                    .list_file_versions_with_count_and_offset(&bucket_id, &start, count)
                    .await?
            } else {
                client
                    .list_file_names_with_count_and_offset(&bucket_id, &start, count)
                    .await?
            };
            print_page(&page);
        }
        Command::FileInfo { file_id } => {
            print_file_info(&client.get_file_info(&file_id).await?);
        }
        Command::Hide {
            bucket_id,
            file_name,
        } => {
            let file = client.hide_file(&bucket_id, &file_name).await?;
            println!("hidden {}", file.file_name);
        }
        Command::DeleteVersion { file_name, file_id } => {
            let version = client.delete_file_version(&file_name, &file_id).await?;
            println!("deleted {} ({})", version.file_name, version.file_id);
        }
        Command::Upload {
            bucket_id,
            path,
            file_name,
        } => {
            let upload = client.get_upload_url(&bucket_id).await?;
            let info = match file_name {
                Some(name) => {
                    client
                        .upload_file_with_file_name(
                            &upload.upload_url,
                            &upload.authorization_token,
                            &path,
                            &name,
                        )
                        .await?
                }
                None => client.upload_to(&upload, &path).await?,
            };
            print_file_info(&info);
        }
        Command::Download {
            bucket_name,
            file_name,
            out,
        } => {
            let (data, info) = client.download_file_by_name(&bucket_name, &file_name).await?;
            tokio::fs::write(&out, &data)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            debug!(out = %out.display(), size = data.len(), "Wrote download");
            print_file_info(&info);
        }
        Command::DownloadById { file_id, out } => {
            let (data, info) = client.download_file_by_id(&file_id).await?;
            tokio::fs::write(&out, &data)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            debug!(out = %out.display(), size = data.len(), "Wrote download");
            print_file_info(&info);
        }
        Command::Help => print_help(),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging on stderr so stdout stays scriptable
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(2);
        }
    };

    if command == Command::Help {
        print_help();
        return Ok(());
    }

    if let Err(e) = run(command).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    Ok(())
}
