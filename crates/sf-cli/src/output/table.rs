//! Plain aligned tables for terminal output.

#[derive(Clone, Copy, Debug)]
pub struct TableOptions {
    pub max_width: Option<usize>,
    pub color: bool,
}

/// Narrowest a column is squeezed to when the terminal is too small.
const MIN_COLUMN: usize = 6;

/// Render `rows` under `headers`, two spaces between columns.
#[must_use]
pub fn render(headers: &[&str], rows: &[Vec<String>], options: TableOptions) -> String {
    let mut widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .filter_map(|row| row.get(index))
                .map(|value| value.chars().count())
                .chain(std::iter::once(header.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    if let Some(max_width) = options.max_width {
        shrink_to_fit(&mut widths, max_width);
    }

    let header_line = join_cells(
        headers
            .iter()
            .zip(&widths)
            .map(|(header, width)| pad(&clip(header, *width), *width, None)),
    );
    let divider = "-".repeat(header_line.trim_end().chars().count());

    let mut lines = vec![header_line.trim_end().to_string(), divider];
    for row in rows {
        let line = join_cells(widths.iter().enumerate().map(|(index, width)| {
            let value = row.get(index).map_or("-", String::as_str);
            let clipped = clip(value, *width);
            let color = if options.color { status_color(&clipped) } else { None };
            pad(&clipped, *width, color)
        }));
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

fn join_cells(cells: impl Iterator<Item = String>) -> String {
    cells.collect::<Vec<_>>().join("  ")
}

/// Take one column from the widest until the row fits or nothing can shrink.
fn shrink_to_fit(widths: &mut [usize], max_width: usize) {
    let separators = widths.len().saturating_sub(1) * 2;
    while widths.iter().sum::<usize>() + separators > max_width {
        let widest = widths
            .iter_mut()
            .filter(|w| **w > MIN_COLUMN)
            .max_by_key(|w| **w);
        match widest {
            Some(width) => *width -= 1,
            None => break,
        }
    }
}

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn pad(value: &str, width: usize, color: Option<&str>) -> String {
    let fill = " ".repeat(width.saturating_sub(value.chars().count()));
    match color {
        Some(code) => format!("\u{1b}[{code}m{value}\u{1b}[0m{fill}"),
        None => format!("{value}{fill}"),
    }
}

/// ANSI color for sync statuses and navigation outcomes.
fn status_color(value: &str) -> Option<&'static str> {
    match value {
        "saved" | "proceed" | "succeeded" | "true" => Some("32"),
        "saving" | "queued" | "running" => Some("33"),
        "error" | "redirect" | "failed" | "false" => Some("31"),
        _ => None,
    }
}
