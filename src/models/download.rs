//! Download infrastructure for model files.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Model files are large; the remote-index timeout does not apply here
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Lower-case hex SHA-256 of a file
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex(&hasher.finalize()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Download `url` to `dest`, returning the number of bytes written.
///
/// Writes to `dest.part` first and renames on success, so an interrupted
/// download never leaves a truncated file where the loader looks.
pub fn download_file(url: &str, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()?;

    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to GET {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("HTTP {}: {}", response.status(), url);
    }

    let total_size = response.content_length();
    let partial = dest.with_extension("part");
    let mut file = File::create(&partial)?;
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = response.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        file.write_all(&buffer[..bytes_read])?;
        downloaded += bytes_read as u64;

        if let Some(total) = total_size {
            print!("\r  {}/{} MB", downloaded / (1024 * 1024), total / (1024 * 1024));
        } else {
            print!("\r  {} MB", downloaded / (1024 * 1024));
        }
        std::io::stdout().flush().ok();
    }
    println!();

    file.sync_all()?;
    fs::rename(&partial, dest).with_context(|| format!("Failed to move download to {:?}", dest))?;
    tracing::debug!(url, bytes = downloaded, "download complete");
    Ok(downloaded)
}

/// Check a file against an expected checksum, deleting it on mismatch.
/// Returns the computed SHA-256.
pub fn verify_file(path: &Path, expected_sha256: Option<&str>) -> Result<String> {
    let hash = sha256_file(path)?;

    if let Some(expected) = expected_sha256 {
        if hash != expected.to_lowercase() {
            fs::remove_file(path).ok();
            anyhow::bail!(
                "Checksum mismatch for {:?}\n  Expected: {}\n  Got: {}",
                path,
                expected,
                hash
            );
        }
    }
    Ok(hash)
}

/// Download and verify a file. Returns computed SHA256.
pub fn download_and_verify(url: &str, dest: &Path, expected_sha256: Option<&str>) -> Result<String> {
    println!("  {}", url);
    download_file(url, dest)?;
    let hash = verify_file(dest, expected_sha256)?;
    println!("  sha256 {}", &hash[..12]);
    Ok(hash)
}
