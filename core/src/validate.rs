//! Pre-flight checks run before any request leaves the client.
//!
//! Each check returns the message of the first rule that fails. Messages are
//! part of the public contract: callers match on them.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Params;

/// Length of every entity id handed out by the service.
pub const ID_LENGTH: usize = 15;

/// Shortest mailbox password the service accepts.
pub const MIN_MAILBOX_PASSWORD: usize = 3;

const MAX_EMAIL_LENGTH: usize = 254;

pub const INVALID_ID: &str = "invalid id - must be a valid, existing id";
pub const INVALID_MAILBOX: &str = "invalid mailbox - must be a valid email address";
pub const INVALID_COLLECTION: &str = "invalid collection - must be a collection name";
pub const INVALID_HOST: &str = "invalid ip - must be an ip address or hostname";
pub const IDENTITY_REQUIRED: &str = "username and/or email required";
pub const PASSWORD_REQUIRED: &str = "password required";
pub const SHORT_PASSWORD: &str = "invalid password - must be at least 3 characters";
pub const INVALID_FORWARD: &str = "invalid forward - must be a valid email address";
pub const INVALID_TO: &str = "invalid to - must be a valid email address";
pub const INVALID_FROM: &str = "invalid from - must be a valid email address";
pub const SUBJECT_REQUIRED: &str = "subject required";
pub const MESSAGE_REQUIRED: &str = "message required";
pub const INVALID_FILE: &str = "invalid file - must be an existing local file";
pub const STORAGE_REQUIRED: &str = "storage required";

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$",
    )
    .expect("email pattern compiles")
});

/// Syntactic e-mail check. Does not resolve the domain.
pub fn is_email(value: &str) -> bool {
    value.len() <= MAX_EMAIL_LENGTH && EMAIL.is_match(value)
}

/// How an operation's identifier is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdRule {
    /// Exactly `ID_LENGTH` characters.
    Fixed,
    /// A mailbox address.
    Email,
    /// Any non-empty value; `&'static str` is the message when empty.
    NonEmpty(&'static str),
}

impl IdRule {
    pub fn check(&self, id: &str) -> Result<(), &'static str> {
        match self {
            IdRule::Fixed if id.chars().count() != ID_LENGTH => Err(INVALID_ID),
            IdRule::Email if !is_email(id) => Err(INVALID_MAILBOX),
            IdRule::NonEmpty(message) if id.trim().is_empty() => Err(*message),
            _ => Ok(()),
        }
    }
}

/// Parameter rules attached to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    None,
    /// `username` or `email`, plus `password`.
    Credentials,
    /// `username` or `email`.
    Identity,
    MailboxCreate,
    MailboxUpdate,
    EmailSend,
    /// `file` on disk plus a `storage` name.
    FileAndStorage,
    File,
}

impl Check {
    pub fn run(&self, params: &Params) -> Result<(), &'static str> {
        match self {
            Check::None => Ok(()),
            Check::Credentials => {
                identity(params)?;
                require(params, "password", PASSWORD_REQUIRED)
            }
            Check::Identity => identity(params),
            Check::MailboxCreate => {
                match params.get("mailbox") {
                    Some(mailbox) if is_email(mailbox) => {}
                    _ => return Err(INVALID_MAILBOX),
                }
                mailbox_password(params)
            }
            Check::MailboxUpdate => {
                mailbox_password(params)?;
                optional_email(params, "forward", INVALID_FORWARD)
            }
            Check::EmailSend => {
                email(params, "to", INVALID_TO)?;
                email(params, "from", INVALID_FROM)?;
                require(params, "subject", SUBJECT_REQUIRED)?;
                require(params, "message", MESSAGE_REQUIRED)
            }
            Check::FileAndStorage => {
                local_file(params)?;
                require(params, "storage", STORAGE_REQUIRED)
            }
            Check::File => local_file(params),
        }
    }
}

fn identity(params: &Params) -> Result<(), &'static str> {
    if params.non_empty("username").is_none() && params.non_empty("email").is_none() {
        return Err(IDENTITY_REQUIRED);
    }
    Ok(())
}

fn require(params: &Params, key: &str, message: &'static str) -> Result<(), &'static str> {
    params.non_empty(key).map(|_| ()).ok_or(message)
}

fn email(params: &Params, key: &str, message: &'static str) -> Result<(), &'static str> {
    match params.get(key) {
        Some(value) if is_email(value) => Ok(()),
        _ => Err(message),
    }
}

fn optional_email(params: &Params, key: &str, message: &'static str) -> Result<(), &'static str> {
    match params.get(key) {
        Some(value) if !is_email(value) => Err(message),
        _ => Ok(()),
    }
}

fn mailbox_password(params: &Params) -> Result<(), &'static str> {
    match params.get("password") {
        Some(password) if password.chars().count() < MIN_MAILBOX_PASSWORD => Err(SHORT_PASSWORD),
        _ => Ok(()),
    }
}

fn local_file(params: &Params) -> Result<(), &'static str> {
    match params.non_empty("file") {
        Some(path) if Path::new(path).is_file() => Ok(()),
        _ => Err(INVALID_FILE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");

    #[test]
    fn email_accepts_common_addresses() {
        assert!(is_email("jane@example.com"));
        assert!(is_email("jane.doe+tag@mail.example.co.uk"));
        assert!(is_email("a_b-c@sub-domain.io"));
    }

    #[test]
    fn email_rejects_malformed_addresses() {
        for bad in [
            "",
            "jane",
            "jane@",
            "@example.com",
            "jane@example",
            "jane@@example.com",
            "jane..doe@example.com",
            ".jane@example.com",
            "jane@-example.com",
            "jane doe@example.com",
        ] {
            assert!(!is_email(bad), "{bad} should be rejected");
        }
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(!is_email(&long));
    }

    #[test]
    fn fixed_id_must_be_fifteen_chars() {
        assert_eq!(IdRule::Fixed.check("abc123456789012"), Ok(()));
        assert_eq!(IdRule::Fixed.check("abc12345678901"), Err(INVALID_ID));
        assert_eq!(IdRule::Fixed.check("abc1234567890123"), Err(INVALID_ID));
        assert_eq!(IdRule::Fixed.check(""), Err(INVALID_ID));
    }

    #[test]
    fn email_id_rule_uses_mailbox_message() {
        assert_eq!(IdRule::Email.check("box@example.com"), Ok(()));
        assert_eq!(IdRule::Email.check("box"), Err(INVALID_MAILBOX));
    }

    #[test]
    fn non_empty_rule_reports_its_message() {
        let rule = IdRule::NonEmpty(INVALID_HOST);
        assert_eq!(rule.check("8.8.8.8"), Ok(()));
        assert_eq!(rule.check("  "), Err(INVALID_HOST));
    }

    #[test]
    fn credentials_need_identity_then_password() {
        let check = Check::Credentials;
        assert_eq!(check.run(&Params::new()), Err(IDENTITY_REQUIRED));
        assert_eq!(
            check.run(&Params::from([("password", "secret")])),
            Err(IDENTITY_REQUIRED)
        );
        assert_eq!(
            check.run(&Params::from([("username", "jane")])),
            Err(PASSWORD_REQUIRED)
        );
        assert_eq!(
            check.run(&Params::from([("email", "jane@example.com"), ("password", "")])),
            Err(PASSWORD_REQUIRED)
        );
        assert_eq!(
            check.run(&Params::from([("username", "jane"), ("password", "secret")])),
            Ok(())
        );
        assert_eq!(
            check.run(&Params::from([("email", "jane@example.com"), ("password", "x")])),
            Ok(())
        );
    }

    #[test]
    fn identity_accepts_either_field() {
        assert_eq!(Check::Identity.run(&Params::from([("email", "j@x.io")])), Ok(()));
        assert_eq!(Check::Identity.run(&Params::from([("username", "")])), Err(IDENTITY_REQUIRED));
    }

    #[test]
    fn mailbox_create_rules() {
        let check = Check::MailboxCreate;
        assert_eq!(check.run(&Params::new()), Err(INVALID_MAILBOX));
        assert_eq!(
            check.run(&Params::from([("mailbox", "not-an-address")])),
            Err(INVALID_MAILBOX)
        );
        assert_eq!(
            check.run(&Params::from([("mailbox", "box@example.com"), ("password", "ab")])),
            Err(SHORT_PASSWORD)
        );
        assert_eq!(
            check.run(&Params::from([("mailbox", "box@example.com"), ("password", "abc")])),
            Ok(())
        );
        assert_eq!(check.run(&Params::from([("mailbox", "box@example.com")])), Ok(()));
    }

    #[test]
    fn mailbox_update_checks_forward() {
        let check = Check::MailboxUpdate;
        assert_eq!(check.run(&Params::new()), Ok(()));
        assert_eq!(
            check.run(&Params::from([("forward", "elsewhere")])),
            Err(INVALID_FORWARD)
        );
        assert_eq!(
            check.run(&Params::from([("forward", "other@example.com"), ("password", "x")])),
            Err(SHORT_PASSWORD)
        );
        assert_eq!(
            check.run(&Params::from([("forward", "other@example.com")])),
            Ok(())
        );
    }

    #[test]
    fn email_send_requires_valid_from() {
        let full = Params::from([
            ("to", "to@example.com"),
            ("from", "from@example.com"),
            ("subject", "hi"),
            ("message", "hello"),
        ]);
        assert_eq!(Check::EmailSend.run(&full), Ok(()));

        let mut missing_from = Params::new();
        for (k, v) in full.iter().filter(|(k, _)| *k != "from") {
            missing_from.insert(k, v);
        }
        assert_eq!(Check::EmailSend.run(&missing_from), Err(INVALID_FROM));

        let bad_from = full.clone().with("from", "nobody");
        assert_eq!(Check::EmailSend.run(&bad_from), Err(INVALID_FROM));

        let bad_to = full.clone().with("to", "nobody");
        assert_eq!(Check::EmailSend.run(&bad_to), Err(INVALID_TO));

        let no_subject = full.clone().with("subject", "");
        assert_eq!(Check::EmailSend.run(&no_subject), Err(SUBJECT_REQUIRED));

        let no_message = full.with("message", "");
        assert_eq!(Check::EmailSend.run(&no_message), Err(MESSAGE_REQUIRED));
    }

    #[test]
    fn file_checks_hit_the_filesystem() {
        assert_eq!(Check::File.run(&Params::new()), Err(INVALID_FILE));
        assert_eq!(
            Check::File.run(&Params::from([("file", "/definitely/not/here.wav")])),
            Err(INVALID_FILE)
        );
        assert_eq!(
            Check::File.run(&Params::from([("file", env!("CARGO_MANIFEST_DIR"))])),
            Err(INVALID_FILE)
        );
        assert_eq!(Check::File.run(&Params::from([("file", EXISTING_FILE)])), Ok(()));
    }

    #[test]
    fn master_create_needs_storage_after_file() {
        let check = Check::FileAndStorage;
        assert_eq!(
            check.run(&Params::from([("storage", "s3")])),
            Err(INVALID_FILE)
        );
        assert_eq!(
            check.run(&Params::from([("file", EXISTING_FILE)])),
            Err(STORAGE_REQUIRED)
        );
        assert_eq!(
            check.run(&Params::from([("file", EXISTING_FILE), ("storage", "s3")])),
            Ok(())
        );
    }
}
