//! Session state shared by every request: the bearer credential and the
//! logout de-duplication latch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Credential and logout state for one client session.
///
/// Absence of a credential is not an error at this layer; some endpoints
/// are unauthenticated.
#[derive(Debug, Default)]
pub struct Session {
  token: RwLock<Option<String>>,
  logout_in_progress: AtomicBool,
}

impl Session {
  pub fn new() -> Self {
    Self::default()
  }

  /// The bearer token, if one is currently held.
  pub fn token(&self) -> Option<String> {
    self
      .token
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  pub fn has_token(&self) -> bool {
    self.token().is_some()
  }

  /// Store a freshly issued token. Successful re-authentication is the one
  /// place the logout latch resets.
  pub fn set_token(&self, token: String) {
    *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
    self.logout_in_progress.store(false, Ordering::SeqCst);
  }

  /// Drop the credential without touching the logout latch.
  pub fn clear_token(&self) {
    *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
  }

  /// Claim the logout latch.
  ///
  /// Returns `true` for the caller that initiated the logout; concurrent
  /// callers observe a logout already underway and must suppress their own
  /// logout side effects and notifications.
  pub fn begin_logout(&self) -> bool {
    !self.logout_in_progress.swap(true, Ordering::SeqCst)
  }

  pub fn logout_in_progress(&self) -> bool {
    self.logout_in_progress.load(Ordering::SeqCst)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn begin_logout_admits_exactly_one_caller() {
    let session = Session::new();

    let wins: Vec<bool> = (0..3).map(|_| session.begin_logout()).collect();

    assert_eq!(wins.iter().filter(|w| **w).count(), 1);
    assert!(wins[0]);
    assert!(session.logout_in_progress());
  }

  #[test]
  fn successful_reauth_resets_the_latch() {
    let session = Session::new();
    assert!(session.begin_logout());
    assert!(!session.begin_logout());

    session.set_token("fresh-token".to_string());

    assert!(!session.logout_in_progress());
    assert!(session.begin_logout());
  }

  #[test]
  fn clear_token_leaves_the_latch_alone() {
    let session = Session::new();
    session.set_token("t".to_string());
    assert!(session.begin_logout());

    session.clear_token();

    assert!(session.logout_in_progress());
    assert!(!session.has_token());
  }
}
