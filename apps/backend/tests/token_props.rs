mod common;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use api_starter::auth::claims::{Role, TokenPurpose};
use api_starter::auth::tokens::{TokenError, TokenService};
use api_starter::state::security_config::SecurityConfig;
use common::proptest_prelude::proptest_prelude_config;
use proptest::prelude::*;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

fn service(secret: &str) -> TokenService {
    TokenService::new(&SecurityConfig::new(secret.as_bytes()))
}

fn role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

fn email() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9.]{0,15}", "[a-z]{2,10}").prop_map(|(local, domain)| format!("{local}@{domain}.test"))
}

/// Fixed issue time so expiry arithmetic is exact.
fn issued_at() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_900_000_000)
}

proptest! {
    #![proptest_config(proptest_prelude_config())]

    #[test]
    fn session_round_trips(email in email(), role in role()) {
        let tokens = service("prop-secret-one");
        let token = tokens.issue_session(&email, role, issued_at()).unwrap();
        let (got_email, got_role) = tokens.verify_session_at(&token, issued_at()).unwrap();
        prop_assert_eq!(got_email, email);
        prop_assert_eq!(got_role, role);
    }

    #[test]
    fn any_single_character_change_is_rejected(
        email in email(),
        role in role(),
        position in any::<prop::sample::Index>(),
        replacement in any::<prop::sample::Index>(),
    ) {
        let tokens = service("prop-secret-one");
        let token = tokens.issue_session(&email, role, issued_at()).unwrap();

        let mut bytes = token.into_bytes();
        let candidates: Vec<usize> = bytes
            .iter()
            .enumerate()
            .filter(|(_, b)| **b != b'.')
            .map(|(i, _)| i)
            .collect();
        let at = candidates[position.index(candidates.len())];
        let mut new_byte = ALPHABET[replacement.index(ALPHABET.len())];
        if new_byte == bytes[at] {
            new_byte = if bytes[at] == b'A' { b'B' } else { b'A' };
        }
        bytes[at] = new_byte;
        let tampered = String::from_utf8(bytes).unwrap();

        prop_assert!(tokens.verify_at(&tampered, issued_at()).is_err());
    }

    #[test]
    fn other_secrets_never_verify(email in email(), role in role(), suffix in "[a-z0-9]{1,12}") {
        let token = service("prop-secret-one")
            .issue_session(&email, role, issued_at())
            .unwrap();
        let other = service(&format!("prop-secret-two-{suffix}"));
        prop_assert_eq!(
            other.verify_at(&token, issued_at()).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn expiry_is_exact(email in email(), seconds in 0u64..(24 * 60 * 60)) {
        let tokens = service("prop-secret-one");
        let token = tokens.issue_session(&email, Role::Operator, issued_at()).unwrap();
        let ttl = TokenPurpose::Session.ttl();

        prop_assert!(tokens.verify_at(&token, issued_at() + Duration::from_secs(seconds)).is_ok());
        prop_assert_eq!(
            tokens
                .verify_at(&token, issued_at() + ttl + Duration::from_secs(seconds))
                .unwrap_err(),
            TokenError::Expired
        );
    }
}
