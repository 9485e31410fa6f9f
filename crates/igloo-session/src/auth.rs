//! Password checks and the credential variant policy.
//!
//! Accounts are password-on-first-use: the first login with an unknown
//! name creates the account with whatever password was sent. After that,
//! the primary password or a stored alternate must match exactly.
//!
//! # Credential variants
//!
//! One family of legacy clients (Engine 2 builds that are not Engine 3)
//! transmits passwords in a different form than the others, so the same
//! player shows up with two different "passwords" depending on which
//! client they used. [`CredentialVariant::LearnsAlternate`] lets such a
//! client register its form as the account's alternate password the first
//! time it fails the primary check.

use crate::Account;

/// How a login's password is checked against an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialVariant {
    /// Primary or already stored alternate must match.
    #[default]
    Strict,
    /// As `Strict`, but when no alternate is stored yet the mismatched
    /// password becomes the alternate and the login succeeds.
    LearnsAlternate,
}

/// What a credential check decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CredentialCheck {
    Accepted,
    /// Accepted, and the password was stored as the alternate.
    Learned,
    Rejected,
}

/// `true` if `password` matches the primary or the alternate password.
pub(crate) fn matches(account: &Account, password: &str) -> bool {
    account.password == password
        || account.alternate_password.as_deref() == Some(password)
}

/// Checks `password` against `account` under `variant`, recording a
/// learned alternate on the account.
pub(crate) fn check(
    account: &mut Account,
    password: &str,
    variant: CredentialVariant,
) -> CredentialCheck {
    if matches(account, password) {
        return CredentialCheck::Accepted;
    }
    match variant {
        CredentialVariant::LearnsAlternate
            if account.alternate_password.is_none() =>
        {
            account.alternate_password = Some(password.to_string());
            CredentialCheck::Learned
        }
        _ => CredentialCheck::Rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_strict_rejects_mismatch() {
        let mut account = Account::new(1, "right", 0);
        assert_eq!(
            check(&mut account, "wrong", CredentialVariant::Strict),
            CredentialCheck::Rejected
        );
        assert!(account.alternate_password.is_none());
    }

    #[test]
    fn test_check_learns_alternate_once() {
        let mut account = Account::new(1, "right", 0);
        assert_eq!(
            check(&mut account, "hashed", CredentialVariant::LearnsAlternate),
            CredentialCheck::Learned
        );
        assert_eq!(
            check(&mut account, "hashed", CredentialVariant::Strict),
            CredentialCheck::Accepted
        );
        assert_eq!(
            check(&mut account, "other", CredentialVariant::LearnsAlternate),
            CredentialCheck::Rejected
        );
    }
}
