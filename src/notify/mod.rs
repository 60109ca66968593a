// src/notify/mod.rs
pub mod email;
pub mod file;

use crate::errors::SendError;
use crate::render::RenderedDigest;

/// Delivery channel for a rendered digest.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, digest: &RenderedDigest) -> Result<(), SendError>;
    fn name(&self) -> &'static str;
}

pub use email::SmtpMailer;
pub use file::FileMailer;
