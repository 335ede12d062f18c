// src/output/mod.rs
// =============================================================================
// Writes the crawl results to plain-text files.
//
// Files (all ';'-separated, one record per line):
// - accessible.csv    URLs that answered with a success status
// - active.csv        URLs that were alive in the reference year
// - rank.csv          url;z  or, extended, url;z;mention_delta;activity_z;combined
// - interactions.csv  source;target for every interaction, in recorded order
//
// Undefined scores are written as the literal "undefined".
// =============================================================================

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::registry::RegistrySnapshot;
use crate::stats::Ranking;

/// Record shape of rank.csv
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankFormat {
    Basic,
    Extended,
}

#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub accessible: PathBuf,
    pub active: PathBuf,
    pub rank: PathBuf,
    pub interactions: PathBuf,
}

pub fn write_all(
    dir: &Path,
    snapshot: &RegistrySnapshot,
    ranking: &Ranking,
    format: RankFormat,
) -> Result<WrittenFiles> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let files = WrittenFiles {
        accessible: dir.join("accessible.csv"),
        active: dir.join("active.csv"),
        rank: dir.join("rank.csv"),
        interactions: dir.join("interactions.csv"),
    };

    write_lines(&files.accessible, snapshot.accessible().map(|f| f.url.clone()))?;
    write_lines(&files.active, snapshot.alive().map(|f| f.url.clone()))?;
    write_lines(
        &files.rank,
        ranking.feeds.iter().map(|f| match format {
            RankFormat::Basic => format!("{};{}", f.url, score(f.z_score)),
            RankFormat::Extended => format!(
                "{};{};{};{};{}",
                f.url,
                score(f.z_score),
                score(f.mention_delta),
                score(f.activity_z_score),
                score(f.combined_score)
            ),
        }),
    )?;
    write_lines(
        &files.interactions,
        snapshot.feeds.iter().flat_map(|feed| {
            feed.interacting_with
                .iter()
                .map(move |target| format!("{};{}", feed.url, target))
        }),
    )?;

    Ok(files)
}

fn score(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "undefined".to_string(),
    }
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
