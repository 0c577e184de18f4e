//! Round state flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Combinable flags describing this node's progress in the current round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConsensusState(u8);

impl ConsensusState {
    pub const INITIAL: Self = Self(0x00);
    pub const PRIMARY: Self = Self(0x01);
    pub const BACKUP: Self = Self(0x02);
    pub const REQUEST_SENT: Self = Self(0x04);
    pub const REQUEST_RECEIVED: Self = Self(0x08);
    pub const SIGNATURE_SENT: Self = Self(0x10);
    pub const BLOCK_SENT: Self = Self(0x20);
    pub const VIEW_CHANGING: Self = Self(0x40);

    const NAMES: [(Self, &'static str); 7] = [
        (Self::PRIMARY, "Primary"),
        (Self::BACKUP, "Backup"),
        (Self::REQUEST_SENT, "RequestSent"),
        (Self::REQUEST_RECEIVED, "RequestReceived"),
        (Self::SIGNATURE_SENT, "SignatureSent"),
        (Self::BLOCK_SENT, "BlockSent"),
        (Self::VIEW_CHANGING, "ViewChanging"),
    ];

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `flag` is set. `INITIAL` is only "set" when no
    /// other flag is.
    pub const fn has_flag(self, flag: Self) -> bool {
        if flag.0 == 0 {
            return self.0 == 0;
        }
        self.0 & flag.0 == flag.0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    pub const fn is_initial(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ConsensusState {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ConsensusState {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for ConsensusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial() {
            return f.write_str("Initial");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.has_flag(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
