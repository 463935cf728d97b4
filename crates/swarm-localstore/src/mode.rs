/// `spec.md` §4.3 Put modes, ordered by index-presence strength
/// (`Upload` ≻ `Sync` ≻ `Request`) so duplicate puts across modes can
/// upgrade a chunk's index presence instead of silently ignoring the
/// stronger mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PutMode {
    Request = 0,
    Sync = 1,
    Upload = 2,
}

impl PutMode {
    pub(crate) fn to_byte(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Request),
            1 => Some(Self::Sync),
            2 => Some(Self::Upload),
            _ => None,
        }
    }
}

/// `spec.md` §4.3 Get modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetMode {
    /// Plain lookup, no side effects.
    Lookup,
    /// Lookup that also performs `ModeSetAccess` in the same batch.
    Request,
}

/// `spec.md` §4.3 Set modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    Access,
    Sync,
    Remove,
}
