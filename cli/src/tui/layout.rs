//! Column sizing and horizontal scrolling for the process table.

/// A table column with a minimum width and a share of the spare space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub min_width: u16,
    /// Relative share of surplus width. Zero keeps the column at its minimum.
    pub weight: u16,
}

impl Column {
    pub const fn new(title: &'static str, min_width: u16, weight: u16) -> Self {
        Self {
            title,
            min_width,
            weight,
        }
    }
}

/// Columns of the interactive process table, in display order.
pub const PROCESS_COLUMNS: [Column; 7] = [
    Column::new("PID", 7, 0),
    Column::new("PROTOCOL", 8, 0),
    Column::new("PORT", 6, 0),
    Column::new("STATUS", 11, 1),
    Column::new("LOCAL ADDRESS", 15, 3),
    Column::new("REMOTE ADDRESS", 15, 3),
    Column::new("PROCESS", 15, 3),
];

/// Split `available` cells between `columns`.
///
/// Every column gets its minimum. When there is room to spare, nine tenths
/// of the surplus are shared out by weight and the cells lost to integer
/// division go one at a time to weighted columns, left to right. The last
/// tenth stays free as breathing room.
pub fn negotiate_widths(columns: &[Column], available: u16) -> Vec<u16> {
    let mut widths: Vec<u16> = columns.iter().map(|c| c.min_width).collect();

    let minimum: u32 = columns.iter().map(|c| u32::from(c.min_width)).sum();
    let total_weight: u32 = columns.iter().map(|c| u32::from(c.weight)).sum();
    let available = u32::from(available);
    if available <= minimum || total_weight == 0 {
        return widths;
    }

    let budget = (available - minimum) * 9 / 10;
    let mut handed_out = 0u32;
    for (width, column) in widths.iter_mut().zip(columns) {
        let extra = budget * u32::from(column.weight) / total_weight;
        *width = width.saturating_add(extra as u16);
        handed_out += extra;
    }

    let mut remainder = budget - handed_out;
    while remainder > 0 {
        for (width, column) in widths.iter_mut().zip(columns) {
            if remainder == 0 {
                break;
            }
            if column.weight > 0 {
                *width = width.saturating_add(1);
                remainder -= 1;
            }
        }
    }

    widths
}

/// Fixed-width window into `text`, starting `offset` characters in.
///
/// The offset is clamped so the window never runs past the end of the
/// text, and short text is padded with spaces to exactly `width`.
pub fn scroll_text(text: &str, offset: usize, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        let mut out: String = chars.into_iter().collect();
        out.extend(std::iter::repeat(' ').take(width - text.chars().count()));
        return out;
    }

    let start = offset.min(chars.len() - width);
    chars[start..start + width].iter().collect()
}
