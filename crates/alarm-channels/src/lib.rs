//! Gateway login database and the three channel-specific send
//! implementations (component J): SMTP, HTTPS REST, external program.

pub mod context;
pub mod email;
pub mod external;
pub mod login;
pub mod rest;

pub use context::{AudioAttachment, SendContext};
pub use login::{EmailLogin, ExternalLogin, GatewayLogin, GatewayLoginDatabase, LoginData, RestLogin, RetryPolicy, SmtpAuth, SmtpSecurity};

use alarm_common::SendError;
use alarm_message::MessagePayload;

/// Sends one resolved payload through whichever channel its gateway kind
/// names, using the matching login record. `payload` must not be
/// [`MessagePayload::Empty`] — callers filter those out during routing.
/// `Infoalarm` is unwrapped to its inner payload; the decorator itself
/// carries no wire representation of its own.
pub async fn send_payload(
    payload: &MessagePayload,
    login: &LoginData,
    ctx: &SendContext,
) -> Result<(), SendError> {
    match (payload, login) {
        (MessagePayload::Email(email), LoginData::Email(login)) => {
            email::EmailSender::new().send(email, login, ctx).await
        }
        (MessagePayload::Rest(rest), LoginData::Rest(login)) => {
            rest::RestSender::new().send(rest, login, ctx).await
        }
        (MessagePayload::External(external), LoginData::External(login)) => {
            external::ExternalSender::new().send(external, login, ctx).await
        }
        (MessagePayload::Infoalarm(decorator), login) => {
            Box::pin(send_payload(decorator.inner(), login, ctx)).await
        }
        (MessagePayload::Empty, _) => Err(SendError::Fatal(
            "cannot send an empty payload".to_string(),
        )),
        _ => Err(SendError::Fatal(
            "payload's gateway kind does not match the supplied login".to_string(),
        )),
    }
}
