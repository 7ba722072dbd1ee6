//! Pending-verification ledger for OTP flows.
//!
//! One ledger instance maps emails to a single pending entry: the mailed
//! code, a flow payload, and an absolute expiry. `put` is last-write-wins,
//! lookups evict expired entries lazily, and the verify operations compare
//! and consume (or update) under one lock so a concurrent overwrite can
//! never be consumed with a stale code.

use secrecy::SecretString;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const OTP_TTL: Duration = Duration::from_secs(5 * 60);

/// Flow payload for a pending signup. Holds the raw password until the
/// code is verified; it is hashed before anything is persisted.
#[derive(Debug, Clone)]
pub struct PendingSignup {
    pub name: String,
    pub password: SecretString,
}

/// Flow payload for a pending password reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReset {
    pub verified: bool,
}

struct Entry<T> {
    code: String,
    payload: T,
    expires_at: Instant,
}

/// Outcome of matching a submitted code against the ledger.
#[derive(Debug)]
pub enum OtpMatch<T> {
    /// No pending entry for the email.
    Missing,
    /// The entry was past its TTL and has been evicted.
    Expired,
    /// The entry is live but the code differs. The entry is kept.
    Mismatch,
    /// The code matched.
    Matched(T),
}

/// In-process TTL map from email to one pending entry.
pub struct OtpLedger<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

impl<T> OtpLedger<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(OTP_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store a pending entry, replacing any prior one for the email.
    pub async fn put(&self, email: &str, code: String, payload: T) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| now < entry.expires_at);
        entries.insert(
            email.to_string(),
            Entry {
                code,
                payload,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Drop the pending entry for the email, if any. Idempotent.
    pub async fn remove(&self, email: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(email);
    }

    /// Read the payload without consuming it. An expired entry is evicted
    /// and reported as absent.
    pub async fn peek(&self, email: &str) -> Option<T>
    where
        T: Clone,
    {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(email)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        let payload = entry.payload.clone();
        entries.insert(email.to_string(), entry);
        Some(payload)
    }

    /// Compare the submitted code and consume the entry on a match.
    pub async fn verify_and_remove(&self, email: &str, code: &str) -> OtpMatch<T> {
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.remove(email) else {
            return OtpMatch::Missing;
        };
        if Instant::now() >= entry.expires_at {
            return OtpMatch::Expired;
        }
        if entry.code != code {
            entries.insert(email.to_string(), entry);
            return OtpMatch::Mismatch;
        }

        OtpMatch::Matched(entry.payload)
    }

    /// Compare the submitted code and, on a match, mutate the payload in
    /// place while keeping the entry and its expiry.
    pub async fn verify_and_update(
        &self,
        email: &str,
        code: &str,
        update: impl FnOnce(&mut T),
    ) -> OtpMatch<()> {
        let mut entries = self.entries.lock().await;
        let Some(mut entry) = entries.remove(email) else {
            return OtpMatch::Missing;
        };
        if Instant::now() >= entry.expires_at {
            return OtpMatch::Expired;
        }
        if entry.code != code {
            entries.insert(email.to_string(), entry);
            return OtpMatch::Mismatch;
        }

        update(&mut entry.payload);
        entries.insert(email.to_string(), entry);
        OtpMatch::Matched(())
    }

    pub(crate) async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl<T> Default for OtpLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset_ledger(ttl: Duration) -> OtpLedger<PendingReset> {
        OtpLedger::with_ttl(ttl)
    }

    #[tokio::test]
    async fn put_replaces_prior_entry_for_same_email() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "111111".to_string(), PendingReset { verified: false })
            .await;
        ledger
            .put("ann@x.com", "222222".to_string(), PendingReset { verified: false })
            .await;

        assert_eq!(ledger.len().await, 1);
        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "111111").await,
            OtpMatch::Missing | OtpMatch::Mismatch
        ));
    }

    #[tokio::test]
    async fn only_latest_code_verifies_after_overwrite() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "111111".to_string(), PendingReset { verified: false })
            .await;
        ledger
            .put("ann@x.com", "222222".to_string(), PendingReset { verified: false })
            .await;

        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "222222").await,
            OtpMatch::Matched(PendingReset { verified: false })
        ));
    }

    #[tokio::test]
    async fn verify_without_entry_reports_missing() {
        let ledger = reset_ledger(OTP_TTL);
        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "123456").await,
            OtpMatch::Missing
        ));
    }

    #[tokio::test]
    async fn expired_entry_reports_expired_not_mismatch() {
        let ledger = reset_ledger(Duration::ZERO);
        ledger
            .put("ann@x.com", "123456".to_string(), PendingReset { verified: false })
            .await;

        // Even a wrong code surfaces expiry first; the entry is evicted.
        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "000000").await,
            OtpMatch::Expired
        ));
        assert_eq!(ledger.len().await, 0);
    }

    #[tokio::test]
    async fn mismatch_keeps_entry_for_retry() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "123456".to_string(), PendingReset { verified: false })
            .await;

        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "654321").await,
            OtpMatch::Mismatch
        ));
        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "123456").await,
            OtpMatch::Matched(_)
        ));
    }

    #[tokio::test]
    async fn match_consumes_entry() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "123456".to_string(), PendingReset { verified: false })
            .await;

        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "123456").await,
            OtpMatch::Matched(_)
        ));
        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "123456").await,
            OtpMatch::Missing
        ));
    }

    #[tokio::test]
    async fn verify_and_update_flips_payload_in_place() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "123456".to_string(), PendingReset { verified: false })
            .await;

        assert!(matches!(
            ledger
                .verify_and_update("ann@x.com", "123456", |payload| payload.verified = true)
                .await,
            OtpMatch::Matched(())
        ));
        assert_eq!(
            ledger.peek("ann@x.com").await,
            Some(PendingReset { verified: true })
        );
    }

    #[tokio::test]
    async fn verify_and_update_mismatch_leaves_payload_untouched() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "123456".to_string(), PendingReset { verified: false })
            .await;

        assert!(matches!(
            ledger
                .verify_and_update("ann@x.com", "654321", |payload| payload.verified = true)
                .await,
            OtpMatch::Mismatch
        ));
        assert_eq!(
            ledger.peek("ann@x.com").await,
            Some(PendingReset { verified: false })
        );
    }

    #[tokio::test]
    async fn peek_evicts_expired_entries() {
        let ledger = reset_ledger(Duration::ZERO);
        ledger
            .put("ann@x.com", "123456".to_string(), PendingReset { verified: true })
            .await;

        assert_eq!(ledger.peek("ann@x.com").await, None);
        assert_eq!(ledger.len().await, 0);
    }

    #[tokio::test]
    async fn put_prunes_expired_entries_from_other_keys() {
        let ledger = reset_ledger(Duration::ZERO);
        ledger
            .put("old@x.com", "111111".to_string(), PendingReset { verified: false })
            .await;

        let ledger = transplant(ledger).await;
        ledger
            .put("new@x.com", "222222".to_string(), PendingReset { verified: false })
            .await;

        assert_eq!(ledger.len().await, 1);
    }

    // Rebuild the ledger with a long TTL while keeping its entries, so the
    // next put exercises pruning of the already-expired ones.
    async fn transplant(ledger: OtpLedger<PendingReset>) -> OtpLedger<PendingReset> {
        let entries = ledger.entries.into_inner();
        OtpLedger {
            ttl: OTP_TTL,
            entries: Mutex::new(entries),
        }
    }

    #[tokio::test]
    async fn entries_are_independent_across_emails() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "111111".to_string(), PendingReset { verified: false })
            .await;
        ledger
            .put("bob@x.com", "222222".to_string(), PendingReset { verified: false })
            .await;

        assert!(matches!(
            ledger.verify_and_remove("ann@x.com", "111111").await,
            OtpMatch::Matched(_)
        ));
        assert!(matches!(
            ledger.verify_and_remove("bob@x.com", "222222").await,
            OtpMatch::Matched(_)
        ));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let ledger = reset_ledger(OTP_TTL);
        ledger
            .put("ann@x.com", "123456".to_string(), PendingReset { verified: false })
            .await;

        ledger.remove("ann@x.com").await;
        ledger.remove("ann@x.com").await;
        assert_eq!(ledger.len().await, 0);
    }

    #[tokio::test]
    async fn signup_payload_keeps_raw_password_until_consumed() {
        use secrecy::ExposeSecret;

        let ledger: OtpLedger<PendingSignup> = OtpLedger::new();
        ledger
            .put(
                "ann@x.com",
                "123456".to_string(),
                PendingSignup {
                    name: "Ann".to_string(),
                    password: SecretString::from("pw123"),
                },
            )
            .await;

        match ledger.verify_and_remove("ann@x.com", "123456").await {
            OtpMatch::Matched(payload) => {
                assert_eq!(payload.name, "Ann");
                assert_eq!(payload.password.expose_secret(), "pw123");
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }
}
