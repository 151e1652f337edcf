//! Left-aligned text columns for the statistics block.

use crate::consts::MAX_CHANNEL_NAME_LENGTH;

/// Widest cell of each column across `rows`.
///
/// Rows shorter than the widest row contribute nothing to the missing
/// columns.
pub fn column_widths<S: AsRef<str>>(rows: &[Vec<S>]) -> Vec<usize> {
    let ncols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; ncols];
    for row in rows {
        for (col, cell) in row.iter().enumerate() {
            widths[col] = widths[col].max(cell.as_ref().chars().count());
        }
    }
    widths
}

/// Channel names longer than ten characters keep the first four and the
/// last three around an ellipsis.
pub fn truncate_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= MAX_CHANNEL_NAME_LENGTH {
        return name.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{head}...{tail}")
}

/// At most five significant characters for non-negative values. Negative
/// values always get three decimals.
pub fn format_float(v: f32) -> String {
    if v < 10.0 {
        format!("{v:.3}")
    } else if v < 100.0 {
        format!("{v:.2}")
    } else if v < 1000.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_name_keeps_last_three() {
        assert_eq!(truncate_name("R"), "R");
        assert_eq!(truncate_name("0123456789"), "0123456789");
        assert_eq!(truncate_name("diffuse.color.red"), "diff...red");
    }

    #[test]
    fn test_column_widths_take_the_widest_cell() {
        let rows = vec![vec!["R", "128"], vec!["alpha", "7"]];
        assert_eq!(column_widths(&rows), vec![5, 3]);
    }

    #[test]
    fn test_format_float_significant_characters() {
        assert_eq!(format_float(0.5), "0.500");
        assert_eq!(format_float(12.345), "12.35");
        assert_eq!(format_float(123.46), "123.5");
        assert_eq!(format_float(12345.6), "12346");
    }
}
