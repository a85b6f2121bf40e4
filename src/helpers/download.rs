use std::cmp::min;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

/// Stream `url` into `filename` in the current directory with a progress
/// bar, writing through a temp file and renaming on completion.
///
/// Uses its own client: image downloads run for minutes and must not inherit
/// the resolver's short per-request timeout.
pub async fn download_image(url: &str, filename: &str) -> Result<PathBuf> {
    let client = Client::new();

    let mut res = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;

    let status = res.status();
    if !status.is_success() {
        bail!("HTTP {status} for {url}");
    }

    let total_size = res
        .content_length()
        .with_context(|| format!("missing content length for {url}"))?;

    let pb = ProgressBar::new(total_size);
    let style = ProgressStyle::with_template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
         {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    )
    .context("build progress style")?
    .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(format!("Downloading {url}"));

    let mut out_path = std::env::current_dir().context("resolve current directory")?;
    out_path.push(filename);

    let tmp = out_path.with_extension("download");
    let mut file = File::create(&tmp).with_context(|| format!("create file {}", tmp.display()))?;
    let mut downloaded: u64 = 0;

    let copy_result: Result<()> = async {
        while let Some(chunk) = res.chunk().await.context("read download chunk")? {
            file.write_all(&chunk)
                .with_context(|| format!("write to {}", tmp.display()))?;
            downloaded = min(downloaded + chunk.len() as u64, total_size);
            pb.set_position(downloaded);
        }
        Ok(())
    }
    .await;
    drop(file);

    finalize_download(&tmp, &out_path, copy_result)?;

    pb.finish_with_message(format!("Downloaded {url} to {}", out_path.display()));
    Ok(out_path)
}

/// Promote a completed temp file into place; an interrupted copy must not
/// leave a stale `.download` file behind.
fn finalize_download(tmp: &Path, out_path: &Path, copy_result: Result<()>) -> Result<()> {
    match copy_result {
        Ok(()) => fs::rename(tmp, out_path)
            .with_context(|| format!("move {} -> {}", tmp.display(), out_path.display())),
        Err(err) => {
            let _ = fs::remove_file(tmp);
            Err(err)
        }
    }
}
