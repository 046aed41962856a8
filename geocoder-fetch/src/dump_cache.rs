//! Fetch, decompress, and day-cache the GeoNames dump files on local disk.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;

const GEONAMES_URL: &str = "https://download.geonames.org/export/dump";

pub struct DumpCache {
    http_client: reqwest::Client,
}

impl DumpCache {
    pub fn new(http_client: reqwest::Client) -> Self {
        DumpCache { http_client }
    }

    /// Produce a readable local path whose contents match today's upstream
    /// dump for `base_name`. `archive_name` is either `<base>.zip` or
    /// `<base>.txt`; `inner_file_name` is required when it is a zip.
    pub async fn get(
        &self,
        base_name: &str,
        archive_name: &str,
        inner_file_name: Option<&str>,
        folder: &Path,
    ) -> Result<PathBuf> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let daily_path = folder.join(format!("{base_name}_{today}.txt"));
        if daily_path.exists() {
            #[cfg(feature = "tracing")]
            tracing::info!("dump cache hit (daily): {}", daily_path.display());
            return Ok(daily_path);
        }

        let stable_path = folder.join(format!("{base_name}.txt"));
        if stable_path.exists() {
            #[cfg(feature = "tracing")]
            tracing::info!("dump cache hit (stable): {}", stable_path.display());
            return Ok(stable_path);
        }

        tokio::fs::create_dir_all(folder)
            .await
            .with_context(|| format!("creating dump directory {}", folder.display()))?;

        let url = format!("{GEONAMES_URL}/{archive_name}");
        #[cfg(feature = "tracing")]
        tracing::info!("fetching {url}");

        let response = self.http_client.get(&url).send().await.map_err(|e| anyhow!(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned status {status}"));
        }
        let body = response.bytes().await.context("reading response body")?;

        let contents: Vec<u8> = if archive_name.ends_with(".zip") {
            let inner = inner_file_name
                .ok_or_else(|| anyhow!("archive {archive_name} requires an inner file name"))?;
            extract_single_entry(&body, inner)?
        } else {
            body.to_vec()
        };

        tokio::fs::write(&daily_path, &contents)
            .await
            .with_context(|| format!("writing {}", daily_path.display()))?;

        housekeep(folder, &daily_path).await?;

        Ok(daily_path)
    }
}

/// Decompress the single zip entry whose internal path equals `inner_file_name`,
/// draining all other entries without materializing them.
fn extract_single_entry(zip_bytes: &[u8], inner_file_name: &str) -> Result<Vec<u8>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(zip_bytes)).context("opening zip archive")?;

    let matches: Vec<usize> = (0..archive.len())
        .filter(|&i| {
            archive
                .by_index(i)
                .map(|f| f.name() == inner_file_name)
                .unwrap_or(false)
        })
        .collect();

    if matches.len() != 1 {
        return Err(anyhow!("expected {inner_file_name}, found {} file(s)", matches.len()));
    }

    let mut file = archive.by_index(matches[0])?;
    let mut out = Vec::with_capacity(file.size() as usize);
    std::io::copy(&mut file, &mut out).context("decompressing zip entry")?;
    Ok(out)
}

/// Remove every other file in `folder` besides `keep` — only the current
/// day's file is retained.
async fn housekeep(folder: &Path, keep: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path == keep {
            continue;
        }
        if entry.file_type().await?.is_file() {
            #[cfg(feature = "tracing")]
            tracing::info!("removing stale cache file: {}", path.display());
            tokio::fs::remove_file(&path).await.ok();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_single_entry_requires_exactly_one_match() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let options = zip::write::FileOptions::default();
            writer.start_file("alternateNames.txt", options).unwrap();
            std::io::Write::write_all(&mut writer, b"hello").unwrap();
            writer.finish().unwrap();
        }
        let bytes = buf.into_inner();

        let extracted = extract_single_entry(&bytes, "alternateNames.txt").unwrap();
        assert_eq!(extracted, b"hello");

        let err = extract_single_entry(&bytes, "missing.txt").unwrap_err();
        assert!(err.to_string().contains("found 0 file"));
    }

    #[tokio::test]
    async fn stable_cache_file_is_reused_without_network() {
        let dir = tempfile_dir();
        tokio::fs::write(dir.join("cities1000.txt"), b"cached").await.unwrap();

        let cache = DumpCache::new(reqwest::Client::new());
        let path = cache
            .get("cities1000", "cities1000.zip", Some("cities1000.txt"), &dir)
            .await
            .unwrap();
        assert_eq!(path, dir.join("cities1000.txt"));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    fn tempfile_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "geocoder-fetch-test-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
