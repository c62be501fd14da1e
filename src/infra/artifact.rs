//! Infrastructure implementation of the `ArtifactSource` port.
//!
//! Downloads with `ureq` into a temp file next to the destination, then
//! unpacks the gzipped tarball with `tar` + `flate2`. Blocking work runs on
//! `tokio::task::spawn_blocking`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::application::ports::ArtifactSource;
use crate::infra::SystemHost;

impl ArtifactSource for SystemHost {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let agent = self.http.clone();
        let url = url.to_string();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || download(&agent, &url, &dest))
            .await
            .context("download task panicked")?
    }

    async fn unpack(&self, archive: &Path, into: &Path) -> Result<()> {
        let archive = archive.to_path_buf();
        let into = into.to_path_buf();
        tokio::task::spawn_blocking(move || unpack_tar_gz(&archive, &into))
            .await
            .context("unpack task panicked")?
    }
}

fn download(agent: &ureq::Agent, url: &str, dest: &Path) -> Result<()> {
    let response = agent.get(url).call().map_err(|e| match e {
        ureq::Error::Status(code, _) => anyhow::anyhow!("server returned HTTP {code}"),
        ureq::Error::Transport(t) => anyhow::anyhow!("transport error: {t}"),
    })?;

    let parent = dest
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut tmp = NamedTempFile::new_in(&parent)
        .with_context(|| format!("creating temp file in {}", parent.display()))?;
    let written = std::io::copy(&mut response.into_reader(), &mut tmp)
        .context("writing download to disk")?;
    anyhow::ensure!(written > 0, "download was empty");
    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("saving {}", dest.display()))?;
    tracing::debug!(bytes = written, path = %dest.display(), "download complete");
    Ok(())
}

fn unpack_tar_gz(archive: &Path, into: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
    let mut tar = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.set_preserve_permissions(true);
    tar.unpack(into)
        .with_context(|| format!("extracting {}", archive.display()))?;
    Ok(())
}
