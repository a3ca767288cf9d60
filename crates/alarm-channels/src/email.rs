//! SMTP send implementation (component J): tries the configured
//! authentication method, attaches recorded audio when present, and
//! classifies failures per the 4xx/5xx split.

use crate::context::SendContext;
use crate::login::{EmailLogin, SmtpAuth, SmtpSecurity};
use alarm_common::SendError;
use alarm_message::EmailPayload;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct EmailSender;

impl EmailSender {
    pub fn new() -> Self {
        Self
    }

    fn build_transport(
        &self,
        login: &EmailLogin,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let mut builder = match login.security {
            SmtpSecurity::Plain => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&login.smtp_host)
            }
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&login.smtp_host)
                    .map_err(|e| SendError::Fatal(format!("starttls setup failed: {e}")))?
            }
            SmtpSecurity::ImplicitTls => {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&login.smtp_host)
                    .map_err(|e| SendError::Fatal(format!("tls setup failed: {e}")))?
            }
        };
        builder = builder.port(login.smtp_port);

        match &login.auth {
            SmtpAuth::None => {}
            SmtpAuth::Plain { username, password } => {
                builder = builder
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .authentication(vec![Mechanism::Plain, Mechanism::Login]);
            }
            SmtpAuth::CramMd5 { username, password } => {
                // lettre has no CRAM-MD5 mechanism; negotiate LOGIN instead of
                // treating the password as an XOAUTH2 bearer token.
                builder = builder
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .authentication(vec![Mechanism::Login]);
            }
        }

        Ok(builder.build())
    }

    fn build_message(&self, payload: &EmailPayload, login: &EmailLogin, ctx: &SendContext) -> Result<Message, SendError> {
        let mut builder = Message::builder()
            .from(
                login
                    .from_address
                    .parse()
                    .map_err(|e| SendError::Fatal(format!("invalid from address: {e}")))?,
            )
            .subject(format!("Alarmierung {}", payload.alarm_id));

        for (_, address) in &payload.recipients {
            builder = builder.to(address
                .parse()
                .map_err(|e| SendError::Fatal(format!("invalid recipient address {address}: {e}")))?);
        }

        let body_part = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(payload.body.clone());

        let message = if let Some(audio) = &ctx.audio {
            let bytes = std::fs::read(&audio.path)
                .map_err(|e| SendError::Fatal(format!("could not read audio attachment: {e}")))?;
            let content_type = audio
                .media_type
                .parse()
                .map_err(|e| SendError::Fatal(format!("invalid audio media type: {e}")))?;
            let attachment = Attachment::new(
                audio
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "alarm.audio".to_string()),
            )
            .body(bytes, content_type);

            builder
                .multipart(MultiPart::mixed().singlepart(body_part).singlepart(attachment))
                .map_err(|e| SendError::Fatal(format!("could not assemble email: {e}")))?
        } else {
            builder
                .singlepart(body_part)
                .map_err(|e| SendError::Fatal(format!("could not assemble email: {e}")))?
        };

        Ok(message)
    }

    pub async fn send(
        &self,
        payload: &EmailPayload,
        login: &EmailLogin,
        ctx: &SendContext,
    ) -> Result<(), SendError> {
        let transport = self.build_transport(login)?;
        let message = self.build_message(payload, login, ctx)?;

        match transport.send(message).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.is_transient() || e.is_timeout() {
                    Err(SendError::Transient(e.to_string()))
                } else {
                    Err(SendError::Fatal(e.to_string()))
                }
            }
        }
    }
}

impl Default for EmailSender {
    fn default() -> Self {
        Self::new()
    }
}
