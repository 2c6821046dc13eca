use unicode_width::UnicodeWidthStr;

const COLUMN_GAP: &str = "  ";

/// Render rows as a left-aligned plain-text table. Column widths are measured
/// in terminal cells so CJK account titles line up.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| UnicodeWidthStr::width(*h)).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let width = UnicodeWidthStr::width(cell.as_str());
            match widths.get_mut(idx) {
                Some(current) => *current = (*current).max(width),
                None => widths.push(width),
            }
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header_cells, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let last = cells.len().saturating_sub(1);
    for (idx, cell) in cells.iter().enumerate() {
        out.push_str(cell);
        if idx < last {
            let pad = widths[idx].saturating_sub(UnicodeWidthStr::width(cell.as_str()));
            out.push_str(&" ".repeat(pad));
            out.push_str(COLUMN_GAP);
        }
    }
    out.push('\n');
}
