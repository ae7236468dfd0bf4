// The password gate in front of the dashboard.

use log::{info, warn};

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SessionStatus {
    /// No password has been entered yet.
    FirstRun,
    Incorrect,
    Authenticated,
}

/// Tracks whether the current session may see the data.
///
/// The attempted password is compared and dropped, it is never kept.
#[derive(Debug)]
pub struct Session {
    status: SessionStatus,
}

impl Session {
    pub fn new() -> Session {
        Session {
            status: SessionStatus::FirstRun,
        }
    }

    pub fn enter_password(&mut self, attempt: &str, secret: &str) -> bool {
        if attempt == secret {
            info!("enter_password: authenticated");
            self.status = SessionStatus::Authenticated;
        } else {
            warn!("enter_password: password incorrect");
            self.status = SessionStatus::Incorrect;
        }
        self.is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_gate() {
        let mut s = Session::new();
        assert_eq!(s.status(), SessionStatus::FirstRun);
        assert!(!s.is_authenticated());
        assert!(!s.enter_password("guess", "secret"));
        assert_eq!(s.status(), SessionStatus::Incorrect);
        assert!(s.enter_password("secret", "secret"));
        assert!(s.is_authenticated());
    }
}
