//! Human-readable output for the catsync commands

use catalog_sync::engine::PruneReport;
use catalog_sync::store::{RunRecord, StoreCounts};
use catalog_sync::{OpCounts, SyncSummary, ValidatedBatch};
use colored::*;

fn print_counts(label: &str, counts: &OpCounts) {
    println!(
        "  {:<10} {} created, {} updated, {} unchanged, {} failed, {} skipped",
        label,
        counts.created.to_string().green(),
        counts.updated.to_string().cyan(),
        counts.unchanged,
        if counts.failed > 0 {
            counts.failed.to_string().red()
        } else {
            counts.failed.to_string().normal()
        },
        counts.skipped
    );
}

fn print_orphans(products: &[String], filters: &[String]) {
    for identity in products {
        println!("  {} product {}", "ORPHAN".yellow(), identity);
    }
    for key in filters {
        println!("  {} keyword {}", "ORPHAN".yellow(), key);
    }
}

pub fn print_sync_summary(summary: &SyncSummary, detailed: bool) {
    println!();
    if summary.dry_run {
        println!("{}", "Planned changes (nothing written):".bright_cyan());
    } else if let Some(run_id) = &summary.run_id {
        println!("{} {}", "Run".bright_cyan(), run_id);
    }
    println!("  {:<10} {}", "documents", summary.documents_read);
    print_counts("products", &summary.products);
    print_counts("keywords", &summary.filters);

    if summary.orphaned() > 0 {
        println!(
            "  {} {} stored item(s) no longer in the source tree (run `catsync prune` to delete)",
            "WARNING".yellow(),
            summary.orphaned()
        );
        if detailed {
            print_orphans(&summary.orphaned_products, &summary.orphaned_filters);
        }
    }

    if !summary.rejections.is_empty() {
        println!(
            "  {} {} file(s) rejected",
            "ERROR".red(),
            summary.rejected()
        );
        if detailed {
            for rejection in &summary.rejections {
                println!("    {}", rejection);
            }
        }
    }

    if !summary.failures.is_empty() {
        println!("  {} {} unit(s) failed", "ERROR".red(), summary.failed());
        for failure in &summary.failures {
            println!("    {}", failure);
        }
    }

    if detailed {
        for warning in &summary.warnings {
            println!("  {} {}", "WARNING".yellow(), warning);
        }
    } else if !summary.warnings.is_empty() {
        println!(
            "  {} {} warning(s), use --detailed to list them",
            "WARNING".yellow(),
            summary.warnings.len()
        );
    }

    if summary.unpersisted_changes > 0 {
        println!(
            "  {} {} change log entries could not be written",
            "WARNING".yellow(),
            summary.unpersisted_changes
        );
    }

    println!();
    if summary.cancelled {
        println!("{} Run cancelled", "CANCELLED".yellow());
    } else if summary.is_success() {
        println!("{} Catalog in sync", "SUCCESS".green());
    } else {
        println!("{} Run finished with errors", "FAILED".red());
    }
}

pub fn print_validation(batch: &ValidatedBatch, detailed: bool) {
    println!();
    println!("  {:<10} {}", "documents", batch.documents_read);
    println!("  {:<10} {}", "products", batch.products.len());
    println!("  {:<10} {}", "keywords", batch.filters.len());

    if detailed {
        for error in batch.parse_errors() {
            println!("  {} {}", "ERROR".red(), error);
        }
        for error in batch.validation_errors() {
            println!("  {} {}", "ERROR".red(), error);
        }
        for error in batch.duplicate_errors() {
            println!("  {} {}", "ERROR".red(), error);
        }
        for warning in &batch.warnings {
            println!("  {} {}", "WARNING".yellow(), warning);
        }
    } else {
        println!(
            "  {:<10} {} parse, {} invalid, {} duplicate",
            "errors",
            batch.parse_errors().count(),
            batch.validation_errors().count(),
            batch.duplicate_errors().count()
        );
        println!("  {:<10} {}", "warnings", batch.warnings.len());
    }

    println!();
    if batch.is_clean() {
        println!("{} Source tree is valid", "OK".green());
    } else {
        println!(
            "{} {} file(s) rejected",
            "ERROR".red(),
            batch.rejections.len()
        );
    }
}

pub fn print_status(database_url: &str, counts: &StoreCounts, runs: &[RunRecord]) {
    println!("{} {}", "Store".bright_cyan(), database_url.bright_yellow());
    println!(
        "  {:<16} {} ({} active)",
        "products", counts.products, counts.active_products
    );
    println!("  {:<16} {}", "aliases", counts.aliases);
    println!("  {:<16} {}", "fuzzy patterns", counts.fuzzy_patterns);
    println!("  {:<16} {}", "reject keywords", counts.reject_keywords);
    println!("  {:<16} {}", "boost keywords", counts.boost_keywords);

    println!();
    if runs.is_empty() {
        println!("{}", "No runs recorded".dimmed());
        return;
    }
    println!("{}", "Recent runs".bright_cyan());
    for run in runs {
        let status = match run.status.as_str() {
            "completed" => run.status.green(),
            "partial" => run.status.red(),
            "running" => run.status.cyan(),
            _ => run.status.yellow(),
        };
        println!(
            "  {} {:<6} {:<10} +{} ~{} ={} -{} !{} orphaned {} rejected {}",
            run.started_at,
            run.kind,
            status,
            run.created,
            run.updated,
            run.unchanged,
            run.deleted,
            run.failed,
            run.orphaned,
            run.rejected
        );
    }
}

pub fn print_prune(report: &PruneReport) {
    println!();
    if report.orphan_count() == 0 {
        println!("{} Nothing to prune", "OK".green());
        return;
    }

    print_orphans(&report.orphaned_products, &report.orphaned_filters);
    println!();

    if !report.confirmed {
        println!(
            "{} {} orphan(s) found, re-run with --confirm to delete them",
            "WARNING".yellow(),
            report.orphan_count()
        );
        return;
    }

    for failure in &report.failures {
        println!("  {} {}", "ERROR".red(), failure);
    }
    if report.skipped > 0 {
        println!("  {} {} skipped", "WARNING".yellow(), report.skipped);
    }

    if report.cancelled {
        println!("{} Prune cancelled after {} deletion(s)", "CANCELLED".yellow(), report.deleted);
    } else if report.is_success() {
        println!("{} Deleted {} item(s)", "SUCCESS".green(), report.deleted);
    } else {
        println!(
            "{} Deleted {} item(s), {} failed",
            "FAILED".red(),
            report.deleted,
            report.failures.len()
        );
    }
}
