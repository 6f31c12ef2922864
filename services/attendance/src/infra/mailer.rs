use std::future::Future;

use anyhow::Context as _;
use tracing::{debug, info};

use crate::domain::repository::Mailer;
use crate::domain::types::OtpDelivery;

/// Posts each delivery as JSON to an HTTP email API.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpMailer {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

impl Mailer for HttpMailer {
    fn send(&self, delivery: &OtpDelivery) -> impl Future<Output = anyhow::Result<()>> + Send {
        let mut request = self.client.post(&self.url).json(delivery);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        async move {
            request
                .send()
                .await
                .context("send email request")?
                .error_for_status()
                .context("email API rejected request")?;
            Ok(())
        }
    }
}

/// Stand-in used when no email API is configured.
#[derive(Clone, Copy, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, delivery: &OtpDelivery) -> anyhow::Result<()> {
        info!(
            role = %delivery.role,
            expires_in = %delivery.validity_window_label,
            "email API not configured, otp delivery logged only"
        );
        debug!(recipient = %delivery.recipient, code = %delivery.code, "otp delivery");
        Ok(())
    }
}

#[derive(Clone)]
pub enum EmailTransport {
    Http(HttpMailer),
    Log(LogMailer),
}

impl EmailTransport {
    pub fn from_config(url: Option<String>, api_key: Option<String>) -> Self {
        match url {
            Some(url) => Self::Http(HttpMailer::new(url, api_key)),
            None => Self::Log(LogMailer),
        }
    }
}

impl Mailer for EmailTransport {
    async fn send(&self, delivery: &OtpDelivery) -> anyhow::Result<()> {
        match self {
            Self::Http(m) => m.send(delivery).await,
            Self::Log(m) => m.send(delivery).await,
        }
    }
}
