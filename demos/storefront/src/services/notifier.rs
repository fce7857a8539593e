// demos/storefront/src/services/notifier.rs
use crate::errors::{AppError, Result as AppResult};
use tracing::info;

#[derive(Debug)]
pub struct SentNotice {
  pub to: String,
  pub subject: String,
  pub message_id: String,
}

/// Mock email sender used by the order pipeline's background tasks.
#[derive(Debug, Clone)]
pub struct Notifier {
  sender: String,
}

impl Notifier {
  pub fn new(sender: impl Into<String>) -> Self {
    Self { sender: sender.into() }
  }

  pub async fn send(&self, to: &str, subject: &str) -> AppResult<SentNotice> {
    info!(
      "Simulating sending email: To='{}', From='{}', Subject='{}'",
      to, self.sender, subject
    );
    tokio::time::sleep(std::time::Duration::from_millis(20)).await; // Simulate network latency

    if to.ends_with("@invalid.test") {
      tracing::warn!("Simulated email failure for recipient: {}", to);
      return Err(AppError::Internal("Simulated email send failure".to_string()));
    }

    let message_id = format!("mock_email_{}", uuid::Uuid::new_v4());
    info!("Mock email sent successfully. Message ID: {}", message_id);
    Ok(SentNotice {
      to: to.to_string(),
      subject: subject.to_string(),
      message_id,
    })
  }
}
