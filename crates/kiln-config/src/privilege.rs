/// Privilege level of the running process, as seen by the defaults step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Real user id 0.
    Superuser,
    /// Any other user id.
    Unprivileged,
}

impl Privilege {
    /// Inspects the real user id of the current process.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_uid(real_uid())
    }

    /// Classifies a raw user id.
    #[must_use]
    pub const fn from_uid(uid: u32) -> Self {
        if uid == 0 {
            Self::Superuser
        } else {
            Self::Unprivileged
        }
    }

    /// Returns `true` for [`Privilege::Superuser`].
    #[must_use]
    pub const fn is_superuser(self) -> bool {
        matches!(self, Self::Superuser)
    }
}

#[cfg(unix)]
fn real_uid() -> u32 {
    // SAFETY: `getuid` has no preconditions and cannot fail.
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
fn real_uid() -> u32 {
    u32::MAX
}
