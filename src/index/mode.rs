//! Access-mode bitfield for index records.
//!
//! Three R/W pairs (address-of, value, pointee) three bits apart, plus a
//! definition bit well clear of them. These integer values are persisted
//! in every record and must stay stable across releases.

use anyhow::{bail, Result};

pub const R_AOF: u32 = 0x001;
pub const W_AOF: u32 = 0x002;
pub const R_VAL: u32 = 0x008;
pub const W_VAL: u32 = 0x010;
pub const R_PTR: u32 = 0x040;
pub const W_PTR: u32 = 0x080;

/// Distance between consecutive triples.
pub const SHIFT: u32 = 3;

/// Definition marker; never combined with the R/W triples.
pub const DEF: u32 = 0x100 << SHIFT;

/// How a parsed mode mask is matched against stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFilter {
    /// `mode == value`; used for `---` (exactly no access) and `def`.
    Exact(u32),
    /// `(mode & mask) != 0`.
    Any(u32),
}

/// Parse a user-supplied mode string into a filter.
///
/// Accepts the 1-char shorthands `r`, `w`, `m`, `-` (expanded to `rrr`,
/// `ww-`, `mmm`, `---`), the literal `def`, or three characters out of
/// `r w m -` selecting bits of the AOF/VAL/PTR triples in that order.
pub fn parse_mask(value: &str) -> Result<ModeFilter> {
    let expanded = match value {
        "r" => "rrr",
        "w" => "ww-",
        "m" => "mmm",
        "-" => "---",
        "def" => return Ok(ModeFilter::Exact(DEF)),
        v if v.len() == 1 => bail!("unknown modificator: {}", v),
        v if v.len() == 3 => v,
        v => bail!("the length of mode value must be 1 or 3: {}", v),
    };

    let mut mask = 0;
    for (i, ch) in expanded.chars().enumerate() {
        let r = R_AOF << (SHIFT * i as u32);
        let w = W_AOF << (SHIFT * i as u32);
        match ch {
            'r' => mask |= r,
            'w' => mask |= w,
            'm' => mask |= r | w,
            '-' => {}
            c => bail!(
                "unknown modificator in the mode value (`r', `w', `m' or `-' expected): {}",
                c
            ),
        }
    }

    if mask == 0 {
        Ok(ModeFilter::Exact(0))
    } else {
        Ok(ModeFilter::Any(mask))
    }
}

/// Pretty-print a stored mode value: `def`, or one of `-rwm` per triple.
pub fn render(mode: u32) -> String {
    if mode == DEF {
        return "def".to_string();
    }
    (0..3)
        .map(|i| {
            let bits = (mode >> (SHIFT * i)) & 3;
            ['-', 'r', 'w', 'm'][bits as usize]
        })
        .collect()
}
