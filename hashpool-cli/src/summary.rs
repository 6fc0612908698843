use std::io::{self, Write};

use hashpool_engine::RunReport;

/// Print the end-of-run summary to stdout.
pub fn print_summary(report: &RunReport) -> io::Result<()> {
    let stdout = io::stdout();
    write_summary(&mut stdout.lock(), report)
}

pub fn write_summary<W: Write>(out: &mut W, report: &RunReport) -> io::Result<()> {
    if let Some(e) = &report.walk_error {
        writeln!(out, "Walk error: {}", e)?;
    }

    writeln!(out)?;
    if report.cancelled {
        writeln!(out, "Processing interrupted")?;
    } else {
        writeln!(out, "Processing complete")?;
    }
    writeln!(out, "Files processed: {}", report.processed)?;
    writeln!(out, "Files failed: {}", report.failed)?;
    writeln!(
        out,
        "Workers: peak {} tracked, {} at finish",
        report.peak_tracked_workers, report.final_tracked_workers
    )?;
    writeln!(out, "Elapsed: {:.2?}", report.duration)?;

    if !report.errors.is_empty() {
        writeln!(out, "Some errors occurred:")?;
        for failure in &report.errors {
            writeln!(out, "- {}", failure)?;
        }
    }

    Ok(())
}
