use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use octo_config::EVENT_CHANNEL_CAPACITY;
use octo_core::{JobState, PrinterState, PrinterTempState, SyncPlan, Timelapse};
use octo_infra::OctoClient;
use octo_pipeline::{default_engine, SyncEvent, SyncReport, SyncRequest};
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::StateFormat;

pub async fn cmd_ls(client: &OctoClient) -> Result<()> {
    let (_config, files) = client
        .list_timelapses()
        .await
        .context("Error listing timelapses")?;
    let rows = timelapse_rows(client, &files)?;
    write_table(&mut io::stdout().lock(), &rows)?;
    Ok(())
}

/// One `name date size url` row per timelapse.
pub fn timelapse_rows(client: &OctoClient, files: &[Timelapse]) -> Result<Vec<Vec<String>>> {
    files
        .iter()
        .map(|tl| {
            let url = client
                .timelapse_url(tl)
                .with_context(|| format!("Bad download path for {}", tl.name))?;
            Ok(vec![
                tl.name.clone(),
                tl.date.clone(),
                tl.size_str.clone(),
                url.to_string(),
            ])
        })
        .collect()
}

/// Left-aligned columns separated by two spaces. The last column is not padded.
pub fn write_table<W: Write>(out: &mut W, rows: &[Vec<String>]) -> io::Result<()> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    for row in rows {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i + 1 == row.len() {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
            }
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

pub async fn cmd_dl(
    client: &OctoClient,
    dest: Utf8PathBuf,
    plan: SyncPlan,
    cancel: CancellationToken,
) -> Result<SyncReport> {
    println!(":: Mirroring timelapses...");
    println!("   Server: {}", client.base_url());
    println!("   Target: {}", dest);

    let engine = default_engine(client.clone());
    let items = engine.list().await.context("Error listing timelapses")?;

    let mut req = SyncRequest::new(dest, plan);
    req.cancel = cancel;

    let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let engine_handle = tokio::spawn(async move { engine.run(&items, &req, Some(tx)).await });

    let pb_main = ProgressBar::new(0);
    pb_main.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {bytes_per_sec} ETA {eta} {msg}",
        )?
        .progress_chars("=>-"),
    );

    let mut total_bytes = 0u64;
    let mut downloaded_bytes = 0u64;
    let mut files_done = 0u64;
    let mut files_total = 0u64;

    while let Some(ev) = rx.recv().await {
        match ev {
            SyncEvent::Started {
                total_bytes: size, ..
            } => {
                total_bytes = total_bytes.saturating_add(size);
                files_total = files_total.saturating_add(1);
                pb_main.set_length(total_bytes);
                pb_main.set_message(format!("Downloading {} files", files_total));
            }
            SyncEvent::Progress { bytes_delta, .. } => {
                downloaded_bytes = downloaded_bytes.saturating_add(bytes_delta);
                pb_main.set_position(downloaded_bytes);
            }
            SyncEvent::Finished { name, outcome } => {
                files_done = files_done.saturating_add(1);
                if outcome.is_failed() {
                    pb_main.println(format!("   {}: {}", name, outcome));
                }
                pb_main.set_message(format!("{} done", files_done));
            }
        }
    }

    let report = engine_handle.await.context("Sync task failed")?;
    pb_main.finish_with_message("Sync complete");

    println!("\n:: Sync Result");
    println!("   Downloaded:  {}", report.downloaded());
    println!("   Skipped:     {}", report.skipped());
    println!("   Deleted:     {}", report.deleted());
    println!("   Failed:      {}", report.failed());
    println!("   Transferred: {}", format_size(downloaded_bytes, DECIMAL));

    report.into_result().context("Error downloading")
}

pub async fn cmd_state(client: &OctoClient, history: usize, format: StateFormat) -> Result<()> {
    let st = client
        .printer_state(history)
        .await
        .context("Error getting state")?;

    let mut out = io::stdout().lock();
    match format {
        StateFormat::Plain => write_state_plain(&mut out, &st, Utc::now())?,
        StateFormat::Csv => write_state_csv(&mut out, &st)?,
    }
    Ok(())
}

fn write_temp<W: Write>(
    out: &mut W,
    prefix: &str,
    t: Option<&PrinterTempState>,
) -> io::Result<()> {
    match t {
        Some(t) => writeln!(out, "{}: {} (Target {})", prefix, t.actual, t.target),
        None => Ok(()),
    }
}

/// Human-readable state. History ages are measured from `now`.
pub fn write_state_plain<W: Write>(
    out: &mut W,
    st: &PrinterState,
    now: DateTime<Utc>,
) -> io::Result<()> {
    writeln!(out, "State: {}", st.state)?;
    let temps = &st.temperature;
    write_temp(out, "\tBed", temps.bed.as_ref())?;
    write_temp(out, "\tTool0", temps.tool0.as_ref())?;
    write_temp(out, "\tTool1", temps.tool1.as_ref())?;

    for e in &temps.history {
        match e.time() {
            Some(t) => writeln!(out, "\t\t{} ({} ago)", format_time(t), format_age(now - t))?,
            None => writeln!(out, "\t\t@{}", e.timestamp)?,
        }
        write_temp(out, "\t\t\tBed", e.bed.as_ref())?;
        write_temp(out, "\t\t\tTool0", e.tool0.as_ref())?;
        write_temp(out, "\t\t\tTool1", e.tool1.as_ref())?;
    }
    Ok(())
}

pub const CSV_HEADER: &str = "ts,bedtarget,bedactual,tool0target,tool0actual,tool1target,tool1actual";

/// One row per history sample; absent sensors are written as `0,0`.
pub fn write_state_csv<W: Write>(out: &mut W, st: &PrinterState) -> io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for e in &st.temperature.history {
        let ts = match e.time() {
            Some(t) => format_time(t),
            None => e.timestamp.to_string(),
        };
        let mut row = vec![ts];
        for t in [&e.bed, &e.tool0, &e.tool1] {
            match t {
                Some(t) => {
                    row.push(t.target.to_string());
                    row.push(t.actual.to_string());
                }
                None => row.extend(["0".to_string(), "0".to_string()]),
            }
        }
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

pub async fn cmd_job(client: &OctoClient) -> Result<()> {
    let job = client.job_state().await.context("Error getting job")?;
    write_job(&mut io::stdout().lock(), &job)?;
    Ok(())
}

pub fn write_job<W: Write>(out: &mut W, js: &JobState) -> io::Result<()> {
    writeln!(out, "State: {}", js.state)?;

    let file = &js.job.file;
    match (&file.name, &file.origin) {
        (Some(name), Some(origin)) => writeln!(out, "File: {} ({})", name, origin)?,
        (Some(name), None) => writeln!(out, "File: {}", name)?,
        _ => writeln!(out, "File: -")?,
    }
    if let Some(size) = file.size {
        writeln!(out, "Size: {}", format_size(size, DECIMAL))?;
    }

    let p = &js.progress;
    match p.completion {
        Some(c) => writeln!(out, "Completion: {:.1}%", c)?,
        None => writeln!(out, "Completion: -")?,
    }
    writeln!(out, "Print time: {}", seconds_or_dash(p.print_time))?;
    writeln!(out, "Time left: {}", seconds_or_dash(p.print_time_left))?;
    Ok(())
}

fn seconds_or_dash(secs: Option<u64>) -> String {
    match secs.and_then(|s| i64::try_from(s).ok()) {
        Some(s) => format_age(TimeDelta::seconds(s)),
        None => "-".to_string(),
    }
}

/// RFC 3339, with fractional seconds only when present.
pub fn format_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Compact `1h2m3s` rendering; negative spans clamp to `0s`.
pub fn format_age(d: TimeDelta) -> String {
    let total = d.num_seconds().max(0);
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}
