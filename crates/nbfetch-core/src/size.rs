//! Human-readable size parsing (listing "Size" column) and formatting.
//!
//! Unknown sizes are `None`, never zero: callers skip size verification
//! instead of expecting an empty file.

/// A size unit as displayed by directory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Bytes,
    KiB,
    MiB,
    GiB,
    KB,
    MB,
    GB,
}

/// Suffixes in match order: longest and most specific first so "KiB" never
/// falls through to "B".
const SUFFIXES: [(&str, SizeUnit); 7] = [
    ("GiB", SizeUnit::GiB),
    ("MiB", SizeUnit::MiB),
    ("KiB", SizeUnit::KiB),
    ("GB", SizeUnit::GB),
    ("MB", SizeUnit::MB),
    ("KB", SizeUnit::KB),
    ("B", SizeUnit::Bytes),
];

impl SizeUnit {
    /// Multiplier in bytes.
    pub fn multiplier(self) -> u64 {
        match self {
            SizeUnit::Bytes => 1,
            SizeUnit::KiB => 1 << 10,
            SizeUnit::MiB => 1 << 20,
            SizeUnit::GiB => 1 << 30,
            SizeUnit::KB => 1_000,
            SizeUnit::MB => 1_000_000,
            SizeUnit::GB => 1_000_000_000,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            SizeUnit::Bytes => "B",
            SizeUnit::KiB => "KiB",
            SizeUnit::MiB => "MiB",
            SizeUnit::GiB => "GiB",
            SizeUnit::KB => "KB",
            SizeUnit::MB => "MB",
            SizeUnit::GB => "GB",
        }
    }
}

/// Parses a size such as `"12.5MiB"`, `"3GB"`, `"812 B"` or `"4096"` into bytes.
///
/// Returns `None` for `"-"`, empty input, and anything that does not parse to
/// a finite non-negative number. A bare number is taken as bytes.
pub fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || text == "-" {
        return None;
    }

    let (number, unit) = SUFFIXES
        .iter()
        .find_map(|(suffix, unit)| text.strip_suffix(suffix).map(|n| (n, *unit)))
        .unwrap_or((text, SizeUnit::Bytes));

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let bytes = (value * unit.multiplier() as f64).round();
    if bytes > u64::MAX as f64 {
        return None;
    }
    Some(bytes as u64)
}

/// Formats `bytes` in `unit` with two decimals (e.g. `"12.50MiB"`).
pub fn format_size(bytes: u64, unit: SizeUnit) -> String {
    if unit == SizeUnit::Bytes {
        return format!("{}B", bytes);
    }
    format!(
        "{:.2}{}",
        bytes as f64 / unit.multiplier() as f64,
        unit.suffix()
    )
}

/// Picks the largest binary unit that keeps the value >= 1 (for progress lines).
pub fn format_binary(bytes: u64) -> String {
    let unit = if bytes >= SizeUnit::GiB.multiplier() {
        SizeUnit::GiB
    } else if bytes >= SizeUnit::MiB.multiplier() {
        SizeUnit::MiB
    } else if bytes >= SizeUnit::KiB.multiplier() {
        SizeUnit::KiB
    } else {
        SizeUnit::Bytes
    };
    format_size(bytes, unit)
}
