use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::context;
use crate::query::{self, RepositoryView};
use crate::stats::RepositoryStats;
use crate::storage::SqliteStorage;
use crate::types::NOT_AVAILABLE;

pub fn list(ctx: &context::Context, owners: &[String], json: bool) -> Result<()> {
    let storage = SqliteStorage::new(ctx.db_path());
    let repos = query::query_repositories(&storage, owners).context("loading repositories")?;
    if repos.is_empty() {
        log::warn!("🤷 No repositories stored for the given owners");
        return Ok(());
    }
    write_list(&mut std::io::stdout().lock(), &repos, json)
}

pub fn export(ctx: &context::Context, owners: &[String], output: &Path) -> Result<()> {
    let storage = SqliteStorage::new(ctx.db_path());
    let mut repos = query::query_repositories(&storage, owners).context("loading repositories")?;
    if repos.is_empty() {
        log::warn!("🤷 No repositories stored for the given owners, nothing exported");
        return Ok(());
    }
    repos.sort_by(|a, b| a.owner.cmp(&b.owner).then_with(|| a.name.cmp(&b.name)));

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let rows = write_csv(BufWriter::new(file), &repos)
        .with_context(|| format!("writing {}", output.display()))?;
    log::info!("📤 Exported {} repositories to {}", rows, output.display());
    Ok(())
}

pub fn owners(ctx: &context::Context) -> Result<()> {
    let storage = SqliteStorage::new(ctx.db_path());
    let owners = query::list_owners(&storage).context("loading owners")?;
    if owners.is_empty() {
        log::warn!("🤷 No owners stored yet, run `harvest` first");
        return Ok(());
    }
    let mut out = std::io::stdout().lock();
    for owner in owners {
        writeln!(out, "{}", owner)?;
    }
    Ok(())
}

pub fn stats(ctx: &context::Context, owners: &[String], top: usize, json: bool) -> Result<()> {
    let storage = SqliteStorage::new(ctx.db_path());
    let repos = query::query_repositories(&storage, owners).context("loading repositories")?;
    if repos.is_empty() {
        log::warn!("🤷 No repositories stored for the given owners");
        return Ok(());
    }
    let stats = RepositoryStats::compute(&repos, top, chrono::Utc::now());
    write_stats(&mut std::io::stdout().lock(), &stats, json)
}

fn write_list<W: Write>(out: &mut W, repos: &[RepositoryView], json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, repos)?;
        writeln!(out)?;
        return Ok(());
    }
    for repo in repos {
        writeln!(out, "{}", summary_line(repo))?;
    }
    Ok(())
}

/// Header row plus one record per repository; fields are quoted as needed.
fn write_csv<W: Write>(out: W, repos: &[RepositoryView]) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    for repo in repos {
        writer.serialize(repo)?;
    }
    writer.flush()?;
    Ok(repos.len())
}

fn summary_line(repo: &RepositoryView) -> String {
    format!(
        "- {} (⭐ {} / 🍴 {}) - {} - {}",
        repo.name,
        repo.stars,
        repo.forks,
        repo.language.as_deref().unwrap_or(NOT_AVAILABLE),
        repo.last_updated.as_deref().unwrap_or(NOT_AVAILABLE)
    )
}

fn write_stats<W: Write>(out: &mut W, stats: &RepositoryStats, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, stats)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "Repositories: {}", stats.total)?;
    writeln!(
        out,
        "Stars: total {}, mean {:.2}, median {:.1}",
        stats.stars.total, stats.stars.mean, stats.stars.median
    )?;
    writeln!(
        out,
        "Forks: total {}, mean {:.2}, median {:.1}",
        stats.forks.total, stats.forks.mean, stats.forks.median
    )?;
    writeln!(out, "Updated in the last six months: {}", stats.updated_last_six_months)?;

    writeln!(out, "\nTop by stars:")?;
    for (rank, repo) in stats.top_by_stars.iter().enumerate() {
        writeln!(out, "{:>3}. {}/{} ⭐ {}", rank + 1, repo.owner, repo.name, repo.stars)?;
    }
    writeln!(out, "\nTop by forks:")?;
    for (rank, repo) in stats.top_by_forks.iter().enumerate() {
        writeln!(out, "{:>3}. {}/{} 🍴 {}", rank + 1, repo.owner, repo.name, repo.forks)?;
    }
    writeln!(out, "\nLanguages:")?;
    for lang in &stats.languages {
        writeln!(
            out,
            "  {}: {} repositories, mean ⭐ {:.2}, mean 🍴 {:.2}",
            lang.language, lang.repositories, lang.mean_stars, lang.mean_forks
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sqlite::tests::{record, temp_storage};
    use crate::storage::{Storage, StorageWrite};
    use chrono::TimeZone;

    fn stored_views() -> Vec<RepositoryView> {
        let (_dir, storage) = temp_storage();
        let session = storage.open_session().unwrap();
        let mut first = record(1, "acme", "https://github.com/acme/repo-1", 5);
        first.forks = 2;
        let mut second = record(2, "acme", "https://github.com/acme/repo-2", 9);
        second.language = None;
        second.last_updated = None;
        session.upsert_repository(&first).unwrap();
        session.upsert_repository(&second).unwrap();

        let mut views = query::query_repositories(&storage, &[]).unwrap();
        views.sort_by_key(|v| v.id);
        views
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn list_prints_one_summary_line_per_repository() {
        let views = stored_views();
        let text = render(|out| write_list(out, &views, false));

        assert_eq!(
            text,
            "- repo-1 (⭐ 5 / 🍴 2) - Rust - 2024-05-01T10:00:00Z\n\
             - repo-2 (⭐ 9 / 🍴 0) - N/A - N/A\n"
        );
    }

    #[test]
    fn list_json_uses_public_field_names() {
        let views = stored_views();
        let text = render(|out| write_list(out, &views, true));

        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        let first = &parsed[0];
        assert_eq!(first["id"], 1);
        assert_eq!(first["lastUpdated"], "2024-05-01T10:00:00Z");
        assert!(first["collectedAt"].is_string());
        assert!(parsed[1]["language"].is_null());
    }

    #[test]
    fn csv_has_header_and_quotes_awkward_descriptions() {
        let mut views = stored_views();
        views[0].description = Some(r#"Fast, "safe" tools"#.to_string());
        views[1].description = None;

        let mut out = Vec::new();
        assert_eq!(write_csv(&mut out, &views).unwrap(), 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "id,owner,name,description,stars,forks,lastUpdated,language,url,collectedAt"
        );
        assert!(lines[1].starts_with(r#"1,acme,repo-1,"Fast, ""safe"" tools",5,2,"#));
        assert!(lines[2].starts_with("2,acme,repo-2,,9,0,,,"));

        let parsed: Vec<RepositoryView> = csv::Reader::from_reader(text.as_bytes())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed, views);
    }

    #[test]
    fn export_writes_file_for_selected_owner() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context::Context {
            data_dir: dir.path().to_path_buf(),
            api_url: url::Url::parse("http://127.0.0.1:1").unwrap(),
            github_token: None,
            request_timeout: std::time::Duration::from_secs(1),
            log_file: None,
            reset: false,
        };
        let storage = SqliteStorage::new(ctx.db_path());
        storage.init().unwrap();
        let session = storage.open_session().unwrap();
        session
            .upsert_repository(&record(1, "acme", "https://github.com/acme/repo-1", 5))
            .unwrap();
        session
            .upsert_repository(&record(2, "globex", "https://github.com/globex/repo-2", 7))
            .unwrap();

        let output = dir.path().join("out").join("github_repos.csv");
        export(&ctx, &["globex".to_string()], &output).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("https://github.com/globex/repo-2"));
        assert!(!text.contains("acme"));
    }

    #[test]
    fn stats_text_report() {
        let views = stored_views();
        let now = chrono::Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let stats = RepositoryStats::compute(&views, 1, now);
        let text = render(|out| write_stats(out, &stats, false));

        assert!(text.starts_with("Repositories: 2\n"));
        assert!(text.contains("Stars: total 14, mean 7.00, median 7.0"));
        assert!(text.contains("Updated in the last six months: 1"));
        assert!(text.contains("  1. acme/repo-2 ⭐ 9"));
        assert!(text.contains("  1. acme/repo-1 🍴 2"));
    }
}
