use crate::error::CodecError;

/// Number of nesting levels the separator table covers.
pub const MAX_LEVELS: usize = 8;

/// Depth-indexed delimiter table.
///
/// Levels 0-2 are Hive's historical `\001`, `\002`, `\003`; from level 3 on
/// the byte is `level + 1`. HCatalog does not expose per-table separators, so
/// the table is the same for every table definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators([u8; MAX_LEVELS]);

impl Separators {
    /// The Hive default table.
    pub const HIVE: Separators = Separators::hive();

    const fn hive() -> Self {
        let mut table = [0u8; MAX_LEVELS];
        table[0] = 0x01;
        table[1] = 0x02;
        table[2] = 0x03;
        let mut level = 3;
        while level < MAX_LEVELS {
            table[level] = (level + 1) as u8;
            level += 1;
        }
        Self(table)
    }

    /// Separator byte for `level`.
    pub fn get(&self, level: usize) -> Result<u8, CodecError> {
        self.0
            .get(level)
            .copied()
            .ok_or(CodecError::OutOfRange { level })
    }

    pub fn as_bytes(&self) -> &[u8; MAX_LEVELS] {
        &self.0
    }
}

impl Default for Separators {
    fn default() -> Self {
        Self::HIVE
    }
}

/// Separator byte for `level` in the Hive default table.
pub fn separator(level: usize) -> Result<u8, CodecError> {
    Separators::HIVE.get(level)
}
