use nix::unistd::{getegid, geteuid, getgid, getuid};

/// Why the process holds more privilege than the `CAP_NET_RAW` it needs.
#[derive(Debug, PartialEq, Eq)]
pub enum Excess {
    Setuid { uid: u32, euid: u32, gid: u32, egid: u32 },
    Root,
}

impl std::fmt::Display for Excess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Excess::Setuid { uid, euid, gid, egid } => {
                write!(f, "setuid detected: uids ({} vs {}), gids ({} vs {})", uid, euid, gid, egid)
            }
            Excess::Root => write!(f, "this program should not be run as root; grant it CAP_NET_RAW instead"),
        }
    }
}

pub fn check() -> Option<Excess> {
    classify(getuid().as_raw(), geteuid().as_raw(), getgid().as_raw(), getegid().as_raw())
}

fn classify(uid: u32, euid: u32, gid: u32, egid: u32) -> Option<Excess> {
    if uid != euid || gid != egid {
        Some(Excess::Setuid { uid, euid, gid, egid })
    } else if uid == 0 {
        Some(Excess::Root)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ids() {
        assert_eq!(classify(1000, 1000, 1000, 1000), None);
        assert_eq!(classify(0, 0, 0, 0), Some(Excess::Root));
        assert_eq!(classify(1000, 0, 1000, 1000), Some(Excess::Setuid { uid: 1000, euid: 0, gid: 1000, egid: 1000 }));
        assert!(matches!(classify(0, 0, 0, 5), Some(Excess::Setuid { .. })));
    }
}
