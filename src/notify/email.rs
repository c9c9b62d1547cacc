use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::model::EmailConfig;
use crate::error::NotifyError;
use crate::notify::Notify;
use crate::report::Report;
use crate::types::Event;

const IMPLICIT_TLS_PORT: u16 = 465;

/// SMTP notifier. Start mails carry the log text only; every other event
/// also carries the HTML statistics report.
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    from: Mailbox,
    to: Vec<Mailbox>,
    host: String,
    port: u16,
    credentials: Option<Credentials>,
    accept_invalid_certs: bool,
}

pub fn subject(event: Event, config_name: &str) -> String {
    match event {
        Event::Start => format!(
            "duplicacy-util: Backup started for configuration {}",
            config_name
        ),
        Event::Success => format!(
            "duplicacy-util: Backup results for configuration {} (success)",
            config_name
        ),
        Event::Skip => format!(
            "duplicacy-util: Backup results for configuration {} (skipped)",
            config_name
        ),
        Event::Failure => format!(
            "duplicacy-util: Backup results for configuration {} (FAILURE)",
            config_name
        ),
    }
}

fn parse_mailbox(field: &str, value: &str) -> Result<Mailbox, NotifyError> {
    value
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::EmailConfig(format!("{} {:?} is invalid: {}", field, value, e)))
}

impl EmailNotifier {
    pub fn new(cfg: &EmailConfig) -> Result<Self, NotifyError> {
        if cfg.from_address.trim().is_empty()
            || cfg.to_address.trim().is_empty()
            || cfg.server_hostname.trim().is_empty()
            || cfg.server_port == 0
        {
            return Err(NotifyError::EmailConfig(
                "fromAddress, toAddress, serverHostname and serverPort are required".to_string(),
            ));
        }
        let from = parse_mailbox("fromAddress", &cfg.from_address)?;
        let to = cfg
            .to_address
            .split(',')
            .filter(|addr| !addr.trim().is_empty())
            .map(|addr| parse_mailbox("toAddress", addr))
            .collect::<Result<Vec<_>, _>>()?;
        let credentials = if cfg.auth_username.is_empty() {
            None
        } else {
            Some(Credentials::new(
                cfg.auth_username.clone(),
                cfg.auth_password.clone(),
            ))
        };
        if cfg.accept_insecure_certs {
            warn!("email notifications accept invalid TLS certificates");
        }
        Ok(Self {
            from,
            to,
            host: cfg.server_hostname.trim().to_string(),
            port: cfg.server_port,
            credentials,
            accept_invalid_certs: cfg.accept_insecure_certs,
        })
    }

    pub fn build_message(&self, event: Event, report: &Report) -> Result<Message, NotifyError> {
        let builder = self
            .to
            .iter()
            .fold(Message::builder(), |msg, to| msg.to(to.clone()))
            .from(self.from.clone())
            .subject(subject(event, &report.config_name));
        let message = match event {
            Event::Start => builder
                .header(ContentType::TEXT_PLAIN)
                .body(report.text_body()),
            _ => builder.multipart(MultiPart::alternative_plain_html(
                report.text_body(),
                report.html_body(),
            )),
        };
        message.map_err(|e| NotifyError::EmailSend(format!("build message: {}", e)))
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let tls = TlsParameters::builder(self.host.clone())
            .dangerous_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(|e| NotifyError::EmailConfig(format!("TLS setup: {}", e)))?;
        let tls = if self.port == IMPLICIT_TLS_PORT {
            Tls::Wrapper(tls)
        } else {
            Tls::Opportunistic(tls)
        };
        let mut builder = SmtpTransport::builder_dangerous(self.host.as_str())
            .port(self.port)
            .tls(tls);
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(credentials.clone());
        }
        Ok(builder.build())
    }
}

impl Notify for EmailNotifier {
    fn notify(&self, event: Event, report: &Report) -> Result<(), NotifyError> {
        let message = self.build_message(event, report)?;
        info!(
            "sending {} email for {} via {}:{}",
            event, report.config_name, self.host, self.port
        );
        let response = self
            .transport()?
            .send(&message)
            .map_err(|e| NotifyError::EmailSend(e.to_string()))?;
        if !response.is_positive() {
            return Err(NotifyError::EmailSend(format!(
                "server answered {}",
                response.code()
            )));
        }
        Ok(())
    }
}
