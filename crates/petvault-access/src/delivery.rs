//! Hand-off of one-time codes to the owner's notification channel.
//!
//! Delivery is fire-and-forget: a failed send is logged and never
//! rolls back the issued code.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

/// Everything an SMS/email sender needs to notify the owner.
#[derive(Clone)]
pub struct OtpMessage {
    /// Phone number or email address.
    pub channel: String,
    pub code: String,
    pub pet_name: String,
    pub clinic_name: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for OtpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpMessage")
            .field("channel", &mask_channel(&self.channel))
            .field("code", &"******")
            .field("pet_name", &self.pet_name)
            .field("clinic_name", &self.clinic_name)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error)]
#[error("otp delivery failed: {0}")]
pub struct DeliveryError(pub String);

pub trait OtpDelivery: Send + Sync {
    fn send_otp(
        &self,
        message: OtpMessage,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Keep the last four characters of a contact, mask the rest.
pub fn mask_channel(channel: &str) -> String {
    let chars: Vec<char> = channel.chars().collect();
    let keep = chars.len().min(4);
    let hidden = chars.len() - keep;
    std::iter::repeat_n('*', hidden)
        .chain(chars[hidden..].iter().copied())
        .collect()
}

/// Delivery that only records the hand-off in the log.
///
/// Used when no SMS/email gateway is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDelivery;

impl OtpDelivery for TracingDelivery {
    async fn send_otp(&self, message: OtpMessage) -> Result<(), DeliveryError> {
        info!(
            channel = %mask_channel(&message.channel),
            pet = %message.pet_name,
            clinic = %message.clinic_name,
            expires_at = %message.expires_at,
            "One-time code handed to delivery"
        );
        Ok(())
    }
}
