// typo.rs — Typo subcommands: report, list, show, patch, delete, counts, last.

use clap::Subcommand;
use serde::Serialize;
use tr_typo::{
    Page, PageRequest, SortDirection, SortKey, Transition, TypoEvent, TypoReport, TypoResult,
    TypoService, TypoStatus, TypoStore, WorkspaceId,
};

use super::print_json;
use crate::config::ReporterConfig;

#[derive(Subcommand)]
pub enum TypoCommands {
    /// Report a typo found on a page.
    Report {
        #[arg(long)]
        workspace: WorkspaceId,
        /// Page the typo was found on (http or https).
        #[arg(long)]
        url: String,
        /// The misspelled text.
        #[arg(long)]
        text: String,
        /// Suggested correction.
        #[arg(long, default_value = "")]
        fix: String,
        /// Text immediately before the typo.
        #[arg(long, default_value = "")]
        before: String,
        /// Text immediately after the typo.
        #[arg(long, default_value = "")]
        after: String,
        #[arg(long, default_value = "")]
        reporter: String,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// List a workspace's typos, one page at a time.
    List {
        #[arg(long)]
        workspace: WorkspaceId,
        /// Zero-based page number.
        #[arg(long, default_value_t = 0)]
        page: u64,
        /// Page size (defaults to the configured page size).
        #[arg(long)]
        size: Option<u64>,
        /// created_at, id or status.
        #[arg(long, default_value = "created_at")]
        sort: SortKey,
        /// asc or desc.
        #[arg(long, default_value = "asc")]
        direction: SortDirection,
    },
    /// Show one typo.
    Show {
        id: i64,
        #[arg(long)]
        workspace: WorkspaceId,
    },
    /// Apply a lifecycle event (start, restart, resolve) to a typo.
    Patch {
        id: i64,
        #[arg(long)]
        workspace: WorkspaceId,
        /// Omit to print the current status without changing it.
        #[arg(long)]
        event: Option<TypoEvent>,
    },
    /// Delete a typo.
    Delete {
        id: i64,
        #[arg(long)]
        workspace: WorkspaceId,
    },
    /// Count a workspace's typos by status.
    Counts {
        #[arg(long)]
        workspace: WorkspaceId,
    },
    /// Show the workspace's "last" typo.
    Last {
        #[arg(long)]
        workspace: WorkspaceId,
    },
}

pub fn execute(cmd: &TypoCommands, config: &ReporterConfig, json: bool) -> anyhow::Result<()> {
    let db = config.open_database()?;
    let svc = config.typo_service(&db);

    match cmd {
        TypoCommands::Report {
            workspace,
            url,
            text,
            fix,
            before,
            after,
            reporter,
            comment,
        } => {
            let report = TypoReport::new(url, text)
                .with_suggested_fix(fix)
                .with_context(before, after)
                .with_reporter(reporter, comment);
            report_typo(&svc, report, *workspace, json)
        }
        TypoCommands::List {
            workspace,
            page,
            size,
            sort,
            direction,
        } => {
            let size = size.unwrap_or(svc.config().default_page_size);
            let request = PageRequest::of(*page, size).sorted_by(*sort, *direction);
            list_typos(&svc, &request, *workspace, json)
        }
        TypoCommands::Show { id, workspace } => show_typo(&svc, *id, *workspace, json),
        TypoCommands::Patch {
            id,
            workspace,
            event,
        } => patch_typo(&svc, *id, *workspace, *event, json),
        TypoCommands::Delete { id, workspace } => delete_typo(&svc, *id, *workspace, json),
        TypoCommands::Counts { workspace } => show_counts(&svc, *workspace, json),
        TypoCommands::Last { workspace } => show_last(&svc, *workspace, json),
    }
}

fn report_typo<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    report: TypoReport,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    let typo = svc.add_typo_report(report, workspace_id)?;
    if json {
        return print_json(&typo);
    }
    println!("Typo reported: {}", typo.id);
    println!("  Status: {}", typo.status);
    Ok(())
}

/// A page plus the derived counts, for `--json` output.
#[derive(Serialize)]
struct PageOutput<'a> {
    #[serde(flatten)]
    page: &'a Page<TypoResult>,
    total_pages: u64,
    number_of_elements: usize,
}

impl<'a> From<&'a Page<TypoResult>> for PageOutput<'a> {
    fn from(page: &'a Page<TypoResult>) -> Self {
        Self {
            page,
            total_pages: page.total_pages(),
            number_of_elements: page.number_of_elements(),
        }
    }
}

fn list_typos<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    request: &PageRequest,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    let page = svc.get_typo_page(request, workspace_id)?;
    if json {
        return print_json(&PageOutput::from(&page));
    }
    if page.is_empty() {
        println!("No typos found.");
        return Ok(());
    }

    println!("{:<8} {:<12} {:<24} {:<40}", "ID", "STATUS", "TEXT", "PAGE");
    println!("{}", "-".repeat(86));
    for t in &page.content {
        println!(
            "{:<8} {:<12} {:<24} {:<40}",
            t.id,
            t.status.to_string(),
            truncate(&t.report_text, 22),
            truncate(&t.page_url, 40),
        );
    }
    println!(
        "\nPage {} of {} ({} typo(s) total).",
        page.number + 1,
        page.total_pages().max(1),
        page.total_elements
    );
    Ok(())
}

fn find_in_workspace<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    id: i64,
    workspace_id: WorkspaceId,
) -> anyhow::Result<TypoResult> {
    svc.get_typo_by_id(id, workspace_id)?
        .ok_or_else(|| anyhow::anyhow!("typo {id} not found in workspace {workspace_id}"))
}

fn show_typo<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    id: i64,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    let typo = find_in_workspace(svc, id, workspace_id)?;
    if json {
        return print_json(&typo);
    }
    print_typo(&typo);
    Ok(())
}

fn patch_typo<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    id: i64,
    workspace_id: WorkspaceId,
    event: Option<TypoEvent>,
    json: bool,
) -> anyhow::Result<()> {
    find_in_workspace(svc, id, workspace_id)?;
    let (after, transition) = svc
        .update_typo_status_with_outcome(id, event)?
        .ok_or_else(|| anyhow::anyhow!("typo {id} was deleted"))?;

    if let Transition::Rejected { status, event } = transition {
        let allowed: Vec<String> = status
            .available_events()
            .iter()
            .map(|e| e.to_string())
            .collect();
        anyhow::bail!(
            "event {} not permitted from {} (allowed: {})",
            event,
            status,
            if allowed.is_empty() {
                "none".to_string()
            } else {
                allowed.join(", ")
            }
        );
    }

    if json {
        return print_json(&after);
    }
    match transition {
        Transition::Applied { from, to } => println!("Typo {}: {} -> {}", id, from, to),
        _ => println!("Typo {}: {}", id, after.status),
    }
    Ok(())
}

fn delete_typo<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    id: i64,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    let deleted = svc.delete_typo_in_workspace(id, workspace_id)?;
    if json {
        return print_json(&serde_json::json!({ "id": id, "deleted": deleted }));
    }
    if deleted == 0 {
        println!("Typo {} not found; nothing deleted.", id);
    } else {
        println!("Deleted typo {}.", id);
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusCount {
    status: TypoStatus,
    count: u64,
}

fn show_counts<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    let counts: Vec<StatusCount> = svc
        .get_count_typo_by_status_for_workspace_id(workspace_id)?
        .into_iter()
        .map(|(status, count)| StatusCount { status, count })
        .collect();
    if json {
        return print_json(&counts);
    }
    if counts.is_empty() {
        println!("No typos in workspace {}.", workspace_id);
        return Ok(());
    }
    for c in &counts {
        println!("{:<12} {}", c.status.to_string(), c.count);
    }
    Ok(())
}

fn show_last<S: TypoStore + ?Sized>(
    svc: &TypoService<S>,
    workspace_id: WorkspaceId,
    json: bool,
) -> anyhow::Result<()> {
    let last = svc.get_last_typo_by_workspace_id(workspace_id)?;
    if json {
        return print_json(&last);
    }
    match last {
        Some(typo) => print_typo(&typo),
        None => println!("No typos in workspace {}.", workspace_id),
    }
    Ok(())
}

fn print_typo(t: &TypoResult) {
    println!("Typo:      {}", t.id);
    println!("Workspace: {}", t.workspace_id);
    println!("Status:    {}", t.status);
    println!("Page:      {}", t.page_url);
    println!("Text:      {}", t.report_text);
    if !t.suggested_fix.is_empty() {
        println!("Fix:       {}", t.suggested_fix);
    }
    if !t.text_before.is_empty() || !t.text_after.is_empty() {
        println!("Context:   {}[{}]{}", t.text_before, t.report_text, t.text_after);
    }
    if !t.reporter_name.is_empty() {
        println!("Reporter:  {}", t.reporter_name);
    }
    if !t.reporter_comment.is_empty() {
        println!("Comment:   {}", t.reporter_comment);
    }
    println!("Created:   {}", t.created_at.to_rfc3339());
    println!("Updated:   {}", t.updated_at.to_rfc3339());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use tempfile::TempDir;
    use tr_typo::{MemoryTypoStore, NewTypo, Typo, TypoError, TypoId};

    /// Memory store where another writer starts the typo right after the
    /// first lookup by id.
    struct StartedElsewhere {
        inner: MemoryTypoStore,
        fired: AtomicBool,
    }

    impl TypoStore for StartedElsewhere {
        fn insert(&self, new: NewTypo) -> Result<Typo, TypoError> {
            self.inner.insert(new)
        }

        fn find_by_id(&self, id: TypoId) -> Result<Option<Typo>, TypoError> {
            let found = self.inner.find_by_id(id)?;
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.inner
                    .update_status(id, &mut |_| Some(TypoStatus::InProgress))?;
            }
            Ok(found)
        }

        fn find_page_by_workspace_id(
            &self,
            workspace_id: WorkspaceId,
            request: &PageRequest,
        ) -> Result<Page<Typo>, TypoError> {
            self.inner.find_page_by_workspace_id(workspace_id, request)
        }

        fn find_first_by_workspace_id(
            &self,
            workspace_id: WorkspaceId,
            direction: SortDirection,
        ) -> Result<Option<Typo>, TypoError> {
            self.inner.find_first_by_workspace_id(workspace_id, direction)
        }

        fn count_by_status(
            &self,
            workspace_id: WorkspaceId,
        ) -> Result<Vec<(TypoStatus, u64)>, TypoError> {
            self.inner.count_by_status(workspace_id)
        }

        fn update_status(
            &self,
            id: TypoId,
            decide: &mut dyn FnMut(TypoStatus) -> Option<TypoStatus>,
        ) -> Result<Option<Typo>, TypoError> {
            self.inner.update_status(id, decide)
        }

        fn delete_by_id(&self, id: TypoId) -> Result<u64, TypoError> {
            self.inner.delete_by_id(id)
        }
    }

    #[test]
    fn patch_fails_when_a_concurrent_writer_already_started_the_typo() {
        let inner = MemoryTypoStore::new();
        let id = inner
            .insert(NewTypo::reported(
                1,
                TypoReport::new("https://site.example/", "teh"),
            ))
            .unwrap()
            .id;
        let svc = TypoService::new(Arc::new(StartedElsewhere {
            inner,
            fired: AtomicBool::new(false),
        }));

        let result = patch_typo(&svc, id, 1, Some(TypoEvent::Start), false);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("not permitted from IN_PROGRESS"), "{err}");
    }

    #[test]
    fn list_json_carries_page_metadata() {
        let svc = TypoService::new(Arc::new(MemoryTypoStore::new()));
        for i in 0..7 {
            svc.add_typo_report(TypoReport::new("https://site.example/", format!("teh {i}")), 1)
                .unwrap();
        }
        let page = svc.get_typo_page(&PageRequest::of(2, 3), 1).unwrap();

        let value = serde_json::to_value(PageOutput::from(&page)).unwrap();
        assert_eq!(value["total_pages"], 3);
        assert_eq!(value["number_of_elements"], 1);
        assert_eq!(value["total_elements"], 7);
        assert_eq!(value["content"].as_array().unwrap().len(), 1);
    }

    fn project() -> (TempDir, ReporterConfig) {
        let dir = TempDir::new().unwrap();
        let config = ReporterConfig::for_project(dir.path()).unwrap();
        (dir, config)
    }

    #[test]
    fn report_then_patch_through_lifecycle() {
        let (_dir, config) = project();
        let db = config.open_database().unwrap();
        let svc = config.typo_service(&db);

        report_typo(
            &svc,
            TypoReport::new("https://site.example/docs", "teh"),
            101,
            false,
        )
        .unwrap();
        let id = svc
            .get_last_typo_by_workspace_id(101)
            .unwrap()
            .unwrap()
            .id;

        patch_typo(&svc, id, 101, Some(TypoEvent::Start), false).unwrap();
        assert!(patch_typo(&svc, id, 101, Some(TypoEvent::Start), false).is_err());
        patch_typo(&svc, id, 101, Some(TypoEvent::Resolve), false).unwrap();
        patch_typo(&svc, id, 101, None, false).unwrap();

        let typo = svc.get_typo_by_id(id, 101).unwrap().unwrap();
        assert_eq!(typo.status, TypoStatus::Resolved);
    }

    #[test]
    fn other_workspace_cannot_see_or_delete() {
        let (_dir, config) = project();
        let db = config.open_database().unwrap();
        let svc = config.typo_service(&db);
        let typo = svc
            .add_typo_report(TypoReport::new("https://site.example/", "adn"), 1)
            .unwrap();

        assert!(show_typo(&svc, typo.id, 2, false).is_err());
        assert!(patch_typo(&svc, typo.id, 2, Some(TypoEvent::Start), false).is_err());
        delete_typo(&svc, typo.id, 2, false).unwrap();
        assert!(svc.get_typo_by_id(typo.id, 1).unwrap().is_some());

        delete_typo(&svc, typo.id, 1, false).unwrap();
        assert!(svc.get_typo_by_id(typo.id, 1).unwrap().is_none());
    }

    #[test]
    fn activity_log_is_written_under_project() {
        let (dir, config) = project();
        let db = config.open_database().unwrap();
        let svc = config.typo_service(&db);
        report_typo(&svc, TypoReport::new("https://site.example/", "wierd"), 3, true).unwrap();

        let log = std::fs::read_to_string(dir.path().join(".tr/activity.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }
}
