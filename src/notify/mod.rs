use std::sync::Arc;

use tracing::{debug, error};

use crate::config::model::GlobalConfig;
use crate::error::NotifyError;
use crate::report::Report;
use crate::types::Event;

pub mod email;
pub mod http;
pub mod template;

pub use email::EmailNotifier;
pub use http::HttpNotifier;

pub trait Notify {
    fn notify(&self, event: Event, report: &Report) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub enum Notifier {
    Email(Arc<EmailNotifier>),
    Http(Arc<HttpNotifier>),
}

impl Notifier {
    pub fn kind(&self) -> &'static str {
        match self {
            Notifier::Email(_) => "email",
            Notifier::Http(_) => "http",
        }
    }
}

impl Notify for Notifier {
    fn notify(&self, event: Event, report: &Report) -> Result<(), NotifyError> {
        match self {
            Notifier::Email(inner) => inner.notify(event, report),
            Notifier::Http(inner) => inner.notify(event, report),
        }
    }
}

/// Delivers `event` to every notifier, even after one fails. The last
/// failure is returned.
pub fn fire<N: Notify>(event: Event, notifiers: &[N], report: &Report) -> Result<(), NotifyError> {
    let mut last = None;
    for notifier in notifiers {
        if let Err(err) = notifier.notify(event, report) {
            error!("{} notification failed: {}", event, err);
            last = Some(err);
        }
    }
    match last {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Notifiers subscribed to each event. Each channel is built once and
/// shared between the events that name it.
#[derive(Debug, Clone, Default)]
pub struct NotifierSet {
    on_start: Vec<Notifier>,
    on_skip: Vec<Notifier>,
    on_success: Vec<Notifier>,
    on_failure: Vec<Notifier>,
}

impl NotifierSet {
    pub fn build(cfg: &GlobalConfig) -> Result<Self, NotifyError> {
        let mut email: Option<Arc<EmailNotifier>> = None;
        let mut http: Option<Arc<HttpNotifier>> = None;
        let mut set = NotifierSet::default();

        for event in Event::ALL {
            let channels = match event {
                Event::Start => &cfg.notifications.on_start,
                Event::Skip => &cfg.notifications.on_skip,
                Event::Success => &cfg.notifications.on_success,
                Event::Failure => &cfg.notifications.on_failure,
            };
            let mut notifiers: Vec<Notifier> = Vec::new();
            for channel in channels {
                let notifier = match channel.trim().to_ascii_lowercase().as_str() {
                    "email" => {
                        if email.is_none() {
                            let section = cfg.email.as_ref().ok_or_else(|| {
                                NotifyError::EmailConfig("no email section configured".to_string())
                            })?;
                            email = Some(Arc::new(EmailNotifier::new(section)?));
                        }
                        email.clone().map(Notifier::Email)
                    }
                    "http" => {
                        if http.is_none() {
                            let section = cfg.http.as_ref().ok_or_else(|| {
                                NotifyError::HttpConfig("no http section configured".to_string())
                            })?;
                            http = Some(Arc::new(HttpNotifier::new(section)?));
                        }
                        if let Some(inner) = &http {
                            inner.require_url(event)?;
                        }
                        http.clone().map(Notifier::Http)
                    }
                    _ => return Err(NotifyError::UnknownChannel(channel.clone())),
                };
                if let Some(notifier) = notifier {
                    if notifiers.iter().any(|n| n.kind() == notifier.kind()) {
                        debug!("{} listed twice for {}", notifier.kind(), event);
                        continue;
                    }
                    notifiers.push(notifier);
                }
            }
            *set.for_event_mut(event) = notifiers;
        }
        Ok(set)
    }

    pub fn for_event(&self, event: Event) -> &[Notifier] {
        match event {
            Event::Start => &self.on_start,
            Event::Skip => &self.on_skip,
            Event::Success => &self.on_success,
            Event::Failure => &self.on_failure,
        }
    }

    fn for_event_mut(&mut self, event: Event) -> &mut Vec<Notifier> {
        match event {
            Event::Start => &mut self.on_start,
            Event::Skip => &mut self.on_skip,
            Event::Success => &mut self.on_success,
            Event::Failure => &mut self.on_failure,
        }
    }

    pub fn has_failure_notifiers(&self) -> bool {
        !self.on_failure.is_empty()
    }

    pub fn fire(&self, event: Event, report: &Report) -> Result<(), NotifyError> {
        fire(event, self.for_event(event), report)
    }
}
