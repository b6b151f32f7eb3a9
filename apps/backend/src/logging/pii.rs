//! Redaction for values that may carry personal data or credentials.
//!
//! Emails keep their first character and domain (`a***@example.test`),
//! long opaque runs such as JWT segments or hex digests become
//! `[REDACTED_TOKEN]`. Anything an operator could use to sign in as a user
//! must go through here before it reaches a log line.

use std::fmt;

use lazy_regex::{lazy_regex, Lazy, Regex};

static EMAIL: Lazy<Regex> = lazy_regex!(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{1,}\b");
// JWT segments are base64url, so `-` and `_` count as token characters.
static OPAQUE_TOKEN: Lazy<Regex> = lazy_regex!(r"[A-Za-z0-9+/_-]{16,}={0,2}");

fn mask_email(address: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) => format!("{first}***@{domain}"),
            None => format!("@{domain}"),
        },
        None => address.to_string(),
    }
}

/// Emails first, so the token pass never sees half-masked addresses.
pub fn redact(input: &str) -> String {
    let masked = EMAIL.replace_all(input, |caps: &lazy_regex::Captures| mask_email(&caps[0]));
    OPAQUE_TOKEN
        .replace_all(&masked, "[REDACTED_TOKEN]")
        .into_owned()
}

/// Formats its contents through [`redact`], for `%`/`?` fields in tracing macros.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
