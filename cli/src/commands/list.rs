//! List command - print the current sockets once.

use anyhow::Result;
use portman_core::{Error, Process, ReadOptions, SystemEngine};

/// How `list` prints its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Plain,
}

const HEADERS: [&str; 7] = [
    "PID",
    "Process",
    "Port",
    "Protocol",
    "Status",
    "Local Address",
    "Remote Address",
];

/// Widest value the plain table gives the STATUS column ("LISTEN", "ACTIVE").
const PLAIN_STATUS_WIDTH: usize = 6;

const GUTTER: &str = "   ";

pub async fn run(options: &ReadOptions, format: OutputFormat) -> Result<()> {
    let engine = SystemEngine::system();
    // Only the requested protocols are polled.
    let processes = match engine.refresh_scoped(options).await {
        Ok(_) => engine.read(options),
        Err(Error::NoConnections) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&processes)? + "\n",
        OutputFormat::Markdown => render_markdown(&processes),
        OutputFormat::Plain => render_plain(&processes),
    };
    print!("{}", output);
    Ok(())
}

fn cells(process: &Process) -> [String; 7] {
    [
        process.pid.to_string(),
        process.display_name().to_string(),
        process.port.to_string(),
        process.protocol.to_string(),
        process.status.to_string(),
        process.local_addr.clone(),
        process.remote_addr.clone(),
    ]
}

/// Render a GitHub-flavored markdown table.
pub fn render_markdown(processes: &[Process]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", HEADERS.join(" | ")));
    let rule: Vec<String> = HEADERS.iter().map(|h| "-".repeat(h.len())).collect();
    out.push_str(&format!("|-{}-|\n", rule.join("-|-")));

    for process in processes {
        let row: Vec<String> = cells(process)
            .iter()
            .map(|cell| cell.replace('|', "\\|"))
            .collect();
        out.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    out
}

/// Render an aligned table without borders.
pub fn render_plain(processes: &[Process]) -> String {
    if processes.is_empty() {
        return "No processes found.\n".to_string();
    }

    let headers = HEADERS.map(|h| h.to_uppercase());
    let rows: Vec<[String; 7]> = processes.iter().map(cells).collect();

    let mut widths = headers.clone().map(|h| h.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths[4] = widths[4].min(PLAIN_STATUS_WIDTH);

    let mut out = String::new();
    push_row(&mut out, &headers, &widths);
    let rule = widths.map(|w| "-".repeat(w));
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect();
    out.push_str(line.join(GUTTER).trim_end());
    out.push('\n');
}
