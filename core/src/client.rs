//! The public façade: one method per service operation.
//!
//! # Design
//! Every method is a thin call into `invoke`, which looks the operation up
//! in the route table, runs the pre-flight checks, and hands the request to
//! the dispatcher. A failed check returns before the transport is touched.
//! Every failure is also appended to the client's `ErrorLog`, which is a
//! diagnostic trail only; the returned `Result` is authoritative.

use std::cell::RefCell;
use std::fmt;

use tracing::debug;

use crate::config::TrestleBuilder;
use crate::dispatch::Dispatcher;
use crate::endpoint::{Endpoints, Service};
use crate::error::{Result, TrestleError};
use crate::http::Transport;
use crate::route::{Operation, Route, Target};
use crate::types::{Credentials, Params, Payload, ReturnFormat};

/// Ordered record of failure messages produced by one client.
///
/// Never cleared automatically.
#[derive(Debug, Default)]
pub struct ErrorLog(RefCell<Vec<String>>);

impl ErrorLog {
    fn record(&self, err: &TrestleError) {
        self.0.borrow_mut().push(err.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.0.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Synchronous client for the Trestle REST services.
///
/// Not `Sync`: one instance serves one thread of calls at a time.
pub struct Trestle {
    dispatcher: Dispatcher,
    endpoints: Endpoints,
    format: ReturnFormat,
    errors: ErrorLog,
}

impl Trestle {
    /// Client for the public endpoints using the default blocking transport.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::from_parts(
            Credentials::new(key, secret),
            Endpoints::new(),
            ReturnFormat::default(),
            Box::new(crate::http::UreqTransport::new()),
        )
    }

    pub fn builder(key: impl Into<String>, secret: impl Into<String>) -> TrestleBuilder {
        TrestleBuilder::new(key, secret)
    }

    pub(crate) fn from_parts(
        credentials: Credentials,
        endpoints: Endpoints,
        format: ReturnFormat,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(credentials, transport),
            endpoints,
            format,
            errors: ErrorLog::default(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        self.dispatcher.credentials()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn return_format(&self) -> ReturnFormat {
        self.format
    }

    /// Applies to calls made after this one returns.
    pub fn set_return_format(&mut self, format: ReturnFormat) {
        self.format = format;
    }

    /// Messages of every failed call so far, oldest first.
    pub fn errors(&self) -> Vec<String> {
        self.errors.entries()
    }

    pub fn last_error(&self) -> Option<String> {
        self.errors.last()
    }

    pub fn clear_errors(&self) {
        self.errors.clear();
    }

    /// Run any operation in the route table.
    pub fn invoke(
        &self,
        service: Service,
        operation: Operation,
        target: Target<'_>,
        params: &Params,
    ) -> Result<Payload> {
        self.try_invoke(service, operation, &target, params)
            .map_err(|err| {
                self.errors.record(&err);
                err
            })
    }

    fn try_invoke(
        &self,
        service: Service,
        operation: Operation,
        target: &Target<'_>,
        params: &Params,
    ) -> Result<Payload> {
        let route = Route::lookup(service, operation).ok_or_else(|| {
            TrestleError::Validation(format!("{service} service does not support {operation}"))
        })?;

        let url = route.url(&self.endpoints.base(service), target).map_err(|e| {
            debug!(%service, %operation, error = %e, "rejected before dispatch");
            e
        })?;
        route.check.run(params).map_err(|msg| {
            debug!(%service, %operation, error = msg, "rejected before dispatch");
            TrestleError::Validation(msg.to_string())
        })?;

        self.dispatcher.dispatch(&url, route.method, params, self.format)
    }

    fn call(&self, service: Service, operation: Operation, target: Target<'_>) -> Result<Payload> {
        self.invoke(service, operation, target, &Params::new())
    }

    // --- user ---

    /// Requires `username` or `email`, and `password`.
    pub fn user_create(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::User, Operation::Create, Target::none(), params)
    }

    pub fn user_update(&self, user_id: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::User, Operation::Update, Target::id(user_id), params)
    }

    pub fn user_delete(&self, user_id: &str) -> Result<Payload> {
        self.call(Service::User, Operation::Delete, Target::id(user_id))
    }

    pub fn user_info(&self, user_id: &str) -> Result<Payload> {
        self.call(Service::User, Operation::Info, Target::id(user_id))
    }

    pub fn user_search(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::User, Operation::Search, Target::none(), params)
    }

    /// Requires `username` or `email`, and `password`.
    pub fn user_login(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::User, Operation::Login, Target::none(), params)
    }

    /// Requires `username` or `email`.
    pub fn user_forgot(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::User, Operation::Forgot, Target::none(), params)
    }

    /// Re-send the account verification message.
    pub fn user_resend(&self, user_id: &str) -> Result<Payload> {
        self.call(Service::User, Operation::Resend, Target::id(user_id))
    }

    // --- object ---

    pub fn object_create(&self, collection: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::Object, Operation::Create, Target::collection(collection), params)
    }

    pub fn object_update(&self, collection: &str, object_id: &str, params: &Params) -> Result<Payload> {
        self.invoke(
            Service::Object,
            Operation::Update,
            Target::item(collection, object_id),
            params,
        )
    }

    pub fn object_delete(&self, collection: &str, object_id: &str) -> Result<Payload> {
        self.call(Service::Object, Operation::Delete, Target::item(collection, object_id))
    }

    pub fn object_info(&self, collection: &str, object_id: &str) -> Result<Payload> {
        self.call(Service::Object, Operation::Info, Target::item(collection, object_id))
    }

    pub fn object_search(&self, collection: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::Object, Operation::Search, Target::collection(collection), params)
    }

    // --- geo ---

    /// Look up an IP address or hostname.
    pub fn geo_info(&self, ip: &str) -> Result<Payload> {
        self.call(Service::Geo, Operation::Info, Target::id(ip))
    }

    // --- audio ---

    /// Requires an existing local `file` and a `storage` name.
    pub fn audio_master_create(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Audio, Operation::MasterCreate, Target::none(), params)
    }

    pub fn audio_mix_create(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Audio, Operation::MixCreate, Target::none(), params)
    }

    pub fn audio_update(&self, audio_id: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::Audio, Operation::Update, Target::id(audio_id), params)
    }

    pub fn audio_delete(&self, audio_id: &str) -> Result<Payload> {
        self.call(Service::Audio, Operation::Delete, Target::id(audio_id))
    }

    pub fn audio_info(&self, audio_id: &str) -> Result<Payload> {
        self.call(Service::Audio, Operation::Info, Target::id(audio_id))
    }

    pub fn audio_search(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Audio, Operation::Search, Target::none(), params)
    }

    // --- image ---

    /// Requires an existing local `file` and a `storage` name.
    pub fn image_master_create(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Image, Operation::MasterCreate, Target::none(), params)
    }

    /// Derive a thumbnail from an existing master image.
    pub fn image_thumb_create(&self, image_id: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::Image, Operation::ThumbCreate, Target::id(image_id), params)
    }

    pub fn image_update(&self, image_id: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::Image, Operation::Update, Target::id(image_id), params)
    }

    pub fn image_delete(&self, image_id: &str) -> Result<Payload> {
        self.call(Service::Image, Operation::Delete, Target::id(image_id))
    }

    pub fn image_info(&self, image_id: &str) -> Result<Payload> {
        self.call(Service::Image, Operation::Info, Target::id(image_id))
    }

    pub fn image_search(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Image, Operation::Search, Target::none(), params)
    }

    // --- job ---

    pub fn job_info(&self, job_id: &str) -> Result<Payload> {
        self.call(Service::Job, Operation::Info, Target::id(job_id))
    }

    pub fn job_list(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Job, Operation::List, Target::none(), params)
    }

    // --- mailbox ---

    /// Requires a valid `mailbox` address; `password`, if given, must be at
    /// least three characters.
    pub fn mailbox_create(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Mailbox, Operation::Create, Target::none(), params)
    }

    pub fn mailbox_update(&self, mailbox: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::Mailbox, Operation::Update, Target::id(mailbox), params)
    }

    pub fn mailbox_delete(&self, mailbox: &str) -> Result<Payload> {
        self.call(Service::Mailbox, Operation::Delete, Target::id(mailbox))
    }

    pub fn mailbox_info(&self, mailbox: &str) -> Result<Payload> {
        self.call(Service::Mailbox, Operation::Info, Target::id(mailbox))
    }

    pub fn mailbox_list(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Mailbox, Operation::List, Target::none(), params)
    }

    // --- s3 ---

    /// Requires an existing local `file`.
    pub fn s3_create(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::S3, Operation::Create, Target::none(), params)
    }

    pub fn s3_update(&self, s3_id: &str, params: &Params) -> Result<Payload> {
        self.invoke(Service::S3, Operation::Update, Target::id(s3_id), params)
    }

    pub fn s3_delete(&self, s3_id: &str) -> Result<Payload> {
        self.call(Service::S3, Operation::Delete, Target::id(s3_id))
    }

    pub fn s3_info(&self, s3_id: &str) -> Result<Payload> {
        self.call(Service::S3, Operation::Info, Target::id(s3_id))
    }

    pub fn s3_list(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::S3, Operation::List, Target::none(), params)
    }

    // --- stat ---

    pub fn stat_info(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Stat, Operation::Info, Target::none(), params)
    }

    // --- email ---

    /// Requires valid `to` and `from` addresses and a non-empty `subject`
    /// and `message`.
    pub fn email_send(&self, params: &Params) -> Result<Payload> {
        self.invoke(Service::Email, Operation::Send, Target::none(), params)
    }
}

impl fmt::Debug for Trestle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trestle")
            .field("dispatcher", &self.dispatcher)
            .field("endpoints", &self.endpoints)
            .field("format", &self.format)
            .field("errors", &self.errors.len())
            .finish()
    }
}
