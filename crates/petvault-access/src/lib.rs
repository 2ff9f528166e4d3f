//! PetVault Access: OTP-gated clinic grants, relationship lookup
//! and the medical-record permission engine.

pub mod audit;
pub mod config;
pub mod delivery;
pub mod error;
pub mod grant;
pub mod membership;
pub mod otp;
pub mod permission;
pub mod sweep;

pub use audit::AuditAnnotator;
pub use config::AccessConfig;
pub use delivery::{DeliveryError, OtpDelivery, OtpMessage, TracingDelivery};
pub use error::AccessError;
pub use grant::{GrantLifecycleManager, GrantRequest};
pub use membership::MembershipResolver;
pub use otp::{IssuedOtp, OtpIssuer};
pub use permission::{Decision, DenyReason, GrantCheck, PermissionEngine};
pub use sweep::ExpirySweeper;
