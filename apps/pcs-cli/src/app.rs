//! Command handlers.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, bail};
use pcs_client::oauth::{self, RefreshRequest};
use pcs_client::{ByteRange, Client, ListOptions, RequestOptions};
use pcs_protocol::{FileEntry, OnDuplicate};
use pcs_transfer::{ByteSource, FileSource, MemorySource, SpeedCalculator, StreamSource};
use pcs_upload::{UploadCoordinator, UploadEvent, UploadMethod, UploadRequest};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::Command;
use crate::adapter::ClientTransport;
use crate::config::Config;

/// Resolved configuration plus where it came from.
pub struct Context {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl Context {
    fn client(&self) -> anyhow::Result<Client> {
        let client = Client::new(&self.config.access_token).context(
            "no access token: pass --token, set PCS_ACCESS_TOKEN or run `pcs refresh`",
        )?;
        Ok(match self.config.request_timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }
}

/// Runs one command to completion.
pub async fn run(command: Command, ctx: Context) -> anyhow::Result<()> {
    let opts = RequestOptions::default();
    match command {
        Command::Info => {
            let quota = ctx.client()?.quota(&opts).await?;
            println!(
                "used {} of {} ({} free)",
                format_bytes(quota.used),
                format_bytes(quota.quota),
                format_bytes(quota.free())
            );
        }
        Command::Upload {
            local,
            remote,
            on_duplicate,
            chunk_size,
            concurrency,
            no_rapid,
            size,
        } => {
            let overrides = UploadOverrides {
                chunk_size,
                concurrency,
                no_rapid,
            };
            upload(&ctx, &local, &remote, on_duplicate, overrides, size).await?;
        }
        Command::Download {
            remote,
            local,
            range,
        } => {
            let range = range.as_deref().map(parse_range).transpose()?;
            let data = ctx.client()?.download(&remote, range, &opts).await?;
            tokio::fs::write(&local, &data)
                .await
                .with_context(|| format!("writing {}", local.display()))?;
            println!("{} -> {} ({})", remote, local.display(), format_bytes(data.len() as u64));
        }
        Command::Meta { remote } => {
            let entry = ctx.client()?.meta(&remote, &opts).await?;
            println!("path:   {}", entry.path);
            println!("fs_id:  {}", entry.fs_id);
            println!("type:   {}", if entry.is_dir() { "directory" } else { "file" });
            println!("size:   {}", format_bytes(entry.size));
            if !entry.md5.is_empty() {
                println!("md5:    {}", entry.md5);
            }
            println!("mtime:  {}", entry.mtime);
        }
        Command::Ls { remote, by, order } => {
            let list = ListOptions {
                by: by.map(Into::into),
                order: order.map(Into::into),
                limit: None,
            };
            for entry in ctx.client()?.list(&remote, list, &opts).await? {
                println!("{}", format_entry(&entry));
            }
        }
        Command::Mkdir { remote } => {
            let dir = ctx.client()?.mkdir(&remote, &opts).await?;
            println!("created {}", dir.path);
        }
        Command::Rm { remote } => {
            ctx.client()?.delete(&remote, &opts).await?;
            println!("deleted {remote}");
        }
        Command::Refresh {
            refresh_token,
            client_id,
            client_secret,
            scope,
        } => {
            refresh(ctx, refresh_token, client_id, client_secret, scope).await?;
        }
    }
    Ok(())
}

struct UploadOverrides {
    chunk_size: Option<u64>,
    concurrency: Option<usize>,
    no_rapid: bool,
}

async fn upload(
    ctx: &Context,
    local: &Path,
    remote: &str,
    on_duplicate: OnDuplicate,
    overrides: UploadOverrides,
    stream_size: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = ctx.config.upload_config();
    if let Some(chunk_size) = overrides.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(concurrency) = overrides.concurrency {
        config.concurrency = concurrency;
    }
    if overrides.no_rapid {
        config.rapid_upload = false;
    }

    let mut source = open_source(local, stream_size)?;
    let client = Arc::new(ctx.client()?);
    let transport = Arc::new(ClientTransport::new(client, RequestOptions::default()));
    let mut coordinator = UploadCoordinator::new(transport, config);

    let progress = coordinator.take_events().map(|rx| tokio::spawn(report_progress(rx)));

    let cancel = coordinator.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling upload");
            cancel.cancel();
        }
    });

    let request = UploadRequest::new(remote, on_duplicate);
    let result = coordinator.upload(&request, source.as_mut()).await;

    interrupt.abort();
    // Closes the event channel so the reporter drains and exits.
    drop(coordinator);
    if let Some(progress) = progress {
        let _ = progress.await;
    }

    let outcome = result?;
    let how = match outcome.method {
        UploadMethod::Rapid => "rapid upload, no data sent".to_string(),
        UploadMethod::Chunked { parts } => format!("{parts} parts"),
        UploadMethod::Single => "single request".to_string(),
    };
    println!(
        "{} -> {} ({}, {})",
        local.display(),
        outcome.file.path,
        format_bytes(outcome.file.size),
        how
    );
    Ok(())
}

/// Opens `local` as a byte source; `-` reads stdin.
fn open_source(local: &Path, stream_size: Option<u64>) -> anyhow::Result<Box<dyn ByteSource>> {
    if local.as_os_str() != "-" {
        let file = FileSource::open(local).with_context(|| format!("opening {}", local.display()))?;
        return Ok(Box::new(file));
    }

    match stream_size {
        Some(size) => Ok(Box::new(StreamSource::new(std::io::stdin(), size))),
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .context("reading stdin")?;
            Ok(Box::new(MemorySource::new(data)))
        }
    }
}

/// Prints upload progress to stderr until the event channel closes.
async fn report_progress(mut rx: mpsc::Receiver<UploadEvent>) {
    let speed = SpeedCalculator::default();
    let mut last_done = 0u64;

    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::Hashing { size, .. } => {
                eprintln!("hashing {} for rapid upload", format_bytes(size));
            }
            UploadEvent::RapidHit { .. } => eprintln!("rapid upload matched existing content"),
            UploadEvent::RapidMiss { .. } => eprintln!("content unknown to server, uploading"),
            UploadEvent::ChunkUploaded {
                index,
                total,
                bytes_done,
                bytes_total,
            } => {
                speed.add_sample(bytes_done.saturating_sub(last_done));
                last_done = bytes_done;
                let eta = speed
                    .eta(bytes_total.saturating_sub(bytes_done))
                    .map(|d| format!(", eta {}s", d.as_secs()))
                    .unwrap_or_default();
                eprintln!(
                    "chunk {}/{}: {} of {} at {}/s{}",
                    index + 1,
                    total,
                    format_bytes(bytes_done),
                    format_bytes(bytes_total),
                    format_bytes(speed.bytes_per_second() as u64),
                    eta
                );
            }
            UploadEvent::ChunkRetry {
                index,
                attempt,
                delay,
            } => {
                eprintln!(
                    "chunk {} failed, attempt {} in {:.1}s",
                    index + 1,
                    attempt,
                    delay.as_secs_f64()
                );
            }
            UploadEvent::Committing { parts } => eprintln!("committing {parts} parts"),
            UploadEvent::Completed { .. } => {}
        }
    }
}

async fn refresh(
    mut ctx: Context,
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scope: Option<String>,
) -> anyhow::Result<()> {
    let refresh_token = refresh_token.unwrap_or_else(|| ctx.config.refresh_token.clone());
    let client_id = client_id.unwrap_or_else(|| ctx.config.client_id.clone());
    let client_secret = client_secret.unwrap_or_else(|| ctx.config.client_secret.clone());
    if refresh_token.is_empty() || client_id.is_empty() || client_secret.is_empty() {
        bail!("refresh needs a refresh token, client id and client secret");
    }

    let token = oauth::refresh_access_token(&RefreshRequest {
        refresh_token: &refresh_token,
        client_id: &client_id,
        client_secret: &client_secret,
        scope: scope.as_deref(),
    })
    .await?;

    ctx.config.access_token = token.access_token;
    if !token.refresh_token.is_empty() {
        ctx.config.refresh_token = token.refresh_token;
    }
    ctx.config.client_id = client_id;
    ctx.config.client_secret = client_secret;
    ctx.config.save(ctx.config_path.as_deref())?;

    info!(expires_in = token.expires_in, "access token saved");
    println!("access token refreshed, valid for {}s", token.expires_in);
    Ok(())
}

/// Parses `start-` or `start-end` into a byte range.
fn parse_range(s: &str) -> anyhow::Result<ByteRange> {
    let (start, end) = s
        .split_once('-')
        .with_context(|| format!("invalid range {s:?}: expected start-[end]"))?;
    let start: u64 = start
        .trim()
        .parse()
        .with_context(|| format!("invalid range start in {s:?}"))?;
    let end = end.trim();
    if end.is_empty() {
        return Ok(ByteRange::starting_at(start));
    }
    let end: u64 = end
        .parse()
        .with_context(|| format!("invalid range end in {s:?}"))?;
    if end < start {
        bail!("invalid range {s:?}: end before start");
    }
    Ok(ByteRange::inclusive(start, end))
}

fn format_entry(entry: &FileEntry) -> String {
    let kind = if entry.is_dir() { 'd' } else { '-' };
    format!("{kind} {:>10} {:>12} {}", format_bytes(entry.size), entry.mtime, entry.path)
}

/// Formats a byte count with binary units.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
