//! Size literals such as `10G`, `512MiB` or `1048576`.

const MIB: u64 = 1024 * 1024;

/// One GiB in bytes.
pub const GIB: u64 = 1024 * MIB;

/// Parses a size literal into bytes.
///
/// Accepts bare digits (bytes) or digits followed by `B`, `M`, `MB`,
/// `MiB`, `G`, `GB` or `GiB`. Units are powers of two. Returns `None` for
/// anything else, including an empty number or a zero-byte result.
#[must_use]
pub fn parse_size(literal: &str) -> Option<u64> {
    let literal = literal.trim();
    let split = literal.find(|c: char| !c.is_ascii_digit()).unwrap_or(literal.len());
    let (digits, unit) = literal.split_at(split);
    if digits.is_empty() {
        return None;
    }
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "" | "B" => 1,
        "M" | "MB" | "MiB" => MIB,
        "G" | "GB" | "GiB" => GIB,
        _ => return None,
    };
    value.checked_mul(multiplier).filter(|bytes| *bytes > 0)
}

/// Converts bytes to whole GiB, rounding up.
#[must_use]
pub fn to_gib_ceil(bytes: u64) -> u64 {
    bytes.div_ceil(GIB)
}
