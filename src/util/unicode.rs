use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ELLIPSIS: char = '\u{2026}';

/// Collapse every run of whitespace (newlines, tabs) to one space so a
/// title always renders on a single line.
pub fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Terminal cells taken by `s`
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Shorten `s` to at most `max_cells` cells, ending in `…` when cut.
/// Graphemes are never split.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    let s = one_line(s);
    if display_width(&s) <= max_cells {
        return s;
    }
    let Some(budget) = max_cells.checked_sub(1) else {
        return String::new();
    };
    let mut used = 0;
    let mut out = String::with_capacity(s.len());
    for g in s.graphemes(true) {
        used += display_width(g);
        if used > budget {
            break;
        }
        out.push_str(g);
    }
    out.push(ELLIPSIS);
    out
}

/// Truncate or right-pad with spaces to exactly `cells` terminal cells.
pub fn fit_to_width(s: &str, cells: usize) -> String {
    let mut out = truncate_to_width(s, cells);
    let w = display_width(&out);
    if w < cells {
        out.push_str(&" ".repeat(cells - w));
    }
    out
}
