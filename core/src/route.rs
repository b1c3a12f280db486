//! The (service, operation) table that drives every façade method.
//!
//! # Design
//! Each supported pair maps to one `Route`: the HTTP verb, which path
//! segments follow the service base, how the identifier is checked and which
//! parameter rules run before dispatch. Adding an endpoint is a table row,
//! not a new method body.

use std::fmt;

use url::Url;

use crate::endpoint::Service;
use crate::error::TrestleError;
use crate::http::HttpMethod;
use crate::validate::{self, Check, IdRule};

/// Operation kinds understood by the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Info,
    Search,
    List,
    Login,
    Forgot,
    Resend,
    MasterCreate,
    MixCreate,
    ThumbCreate,
    Send,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Info => "info",
            Operation::Search => "search",
            Operation::List => "list",
            Operation::Login => "login",
            Operation::Forgot => "forgot",
            Operation::Resend => "resend",
            Operation::MasterCreate => "master create",
            Operation::MixCreate => "mix create",
            Operation::ThumbCreate => "thumb create",
            Operation::Send => "send",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a call addresses below the service base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Target<'a> {
    /// Object-storage collection; required by every object route.
    pub collection: Option<&'a str>,
    pub id: Option<&'a str>,
}

impl<'a> Target<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn id(id: &'a str) -> Self {
        Self {
            collection: None,
            id: Some(id),
        }
    }

    pub fn collection(collection: &'a str) -> Self {
        Self {
            collection: Some(collection),
            id: None,
        }
    }

    pub fn item(collection: &'a str, id: &'a str) -> Self {
        Self {
            collection: Some(collection),
            id: Some(id),
        }
    }
}

/// One row of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    /// Whether a collection segment precedes the id.
    pub scoped: bool,
    /// Present when the route addresses a single entity.
    pub id_rule: Option<IdRule>,
    /// Literal segment appended after the base or the id.
    pub suffix: Option<&'static str>,
    pub check: Check,
}

impl Route {
    const fn new(method: HttpMethod) -> Self {
        Self {
            method,
            scoped: false,
            id_rule: None,
            suffix: None,
            check: Check::None,
        }
    }

    const fn id(mut self, rule: IdRule) -> Self {
        self.id_rule = Some(rule);
        self
    }

    const fn suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    const fn check(mut self, check: Check) -> Self {
        self.check = check;
        self
    }

    const fn scoped(mut self) -> Self {
        self.scoped = true;
        self
    }

    /// Look up the route for a service/operation pair.
    pub fn lookup(service: Service, operation: Operation) -> Option<Route> {
        use HttpMethod::{Delete, Get, Post, Put};
        use Operation as Op;
        use Service as S;

        const FIXED: IdRule = IdRule::Fixed;
        let route = match (service, operation) {
            (S::User, Op::Create) => Route::new(Post).check(Check::Credentials),
            (S::User, Op::Update) => Route::new(Put).id(FIXED),
            (S::User, Op::Delete) => Route::new(Delete).id(FIXED),
            (S::User, Op::Info) => Route::new(Get).id(FIXED),
            (S::User, Op::Search) => Route::new(Get),
            (S::User, Op::Login) => Route::new(Post).suffix("login").check(Check::Credentials),
            (S::User, Op::Forgot) => Route::new(Post).suffix("forgot").check(Check::Identity),
            (S::User, Op::Resend) => Route::new(Post).id(FIXED).suffix("resend"),

            (S::Object, Op::Create) => Route::new(Post).scoped(),
            (S::Object, Op::Update) => Route::new(Put).scoped().id(FIXED),
            (S::Object, Op::Delete) => Route::new(Delete).scoped().id(FIXED),
            (S::Object, Op::Info) => Route::new(Get).scoped().id(FIXED),
            (S::Object, Op::Search) => Route::new(Get).scoped(),

            (S::Geo, Op::Info) => Route::new(Get).id(IdRule::NonEmpty(validate::INVALID_HOST)),

            (S::Audio, Op::MasterCreate) | (S::Image, Op::MasterCreate) => {
                Route::new(Post).check(Check::FileAndStorage)
            }
            (S::Audio, Op::MixCreate) => Route::new(Post).suffix("mix"),
            (S::Image, Op::ThumbCreate) => Route::new(Post).id(FIXED).suffix("thumb"),
            (S::Audio | S::Image | S::S3, Op::Update) => Route::new(Put).id(FIXED),
            (S::Audio | S::Image | S::S3, Op::Delete) => Route::new(Delete).id(FIXED),
            (S::Audio | S::Image | S::S3, Op::Info) => Route::new(Get).id(FIXED),
            (S::Audio | S::Image, Op::Search) => Route::new(Get),

            (S::Job, Op::Info) => Route::new(Get).id(IdRule::NonEmpty(validate::INVALID_ID)),
            (S::Job, Op::List) => Route::new(Get),

            (S::Mailbox, Op::Create) => Route::new(Post).check(Check::MailboxCreate),
            (S::Mailbox, Op::Update) => Route::new(Put)
                .id(IdRule::Email)
                .check(Check::MailboxUpdate),
            (S::Mailbox, Op::Delete) => Route::new(Delete).id(IdRule::Email),
            (S::Mailbox, Op::Info) => Route::new(Get).id(IdRule::Email),
            (S::Mailbox, Op::List) => Route::new(Get),

            (S::S3, Op::Create) => Route::new(Post).check(Check::File),
            (S::S3, Op::List) => Route::new(Get),

            (S::Stat, Op::Info) => Route::new(Get),

            (S::Email, Op::Send) => Route::new(Post).check(Check::EmailSend),

            _ => return None,
        };
        Some(route)
    }

    /// Check the target against this route and build the request URL.
    ///
    /// Returns `TrestleError::Validation` when the collection or identifier
    /// is unacceptable.
    pub fn url(&self, base: &str, target: &Target<'_>) -> Result<String, TrestleError> {
        let mut segments: Vec<&str> = Vec::with_capacity(3);

        if self.scoped {
            match target.collection {
                Some(collection) if !collection.trim().is_empty() => segments.push(collection),
                _ => return Err(TrestleError::Validation(validate::INVALID_COLLECTION.to_string())),
            }
        }

        if let Some(rule) = self.id_rule {
            let id = target.id.unwrap_or_default();
            rule.check(id)
                .map_err(|msg| TrestleError::Validation(msg.to_string()))?;
            segments.push(id);
        }

        if let Some(suffix) = self.suffix {
            segments.push(suffix);
        }

        let mut url = Url::parse(base)
            .map_err(|e| TrestleError::Config(format!("invalid endpoint '{base}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TrestleError::Config(format!("invalid endpoint '{base}': cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }
}
