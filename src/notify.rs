use crate::error::{Result, ScoutError};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Sends a run summary to a person
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(&self, message: &str) -> Result<()>;

    /// Who the message goes to, for logs
    fn recipient(&self) -> &str;
}

/// Text of the message sent after a run that wrote new listings
pub fn compose_message(eligible: usize, written: usize, duplicates: usize, store: &str) -> String {
    format!(
        "Rental scout: {eligible} eligible listings found, {written} new written to {store}, {duplicates} already known."
    )
}

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
    pub api_base: String,
}

/// SMS through the Twilio Messages API
pub struct TwilioNotifier {
    client: Client,
    options: TwilioOptions,
}

impl TwilioNotifier {
    pub fn new(options: TwilioOptions, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoutError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, options })
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn dispatch(&self, message: &str) -> Result<()> {
        let url = format!(
            "{base}/2010-04-01/Accounts/{sid}/Messages.json",
            base = self.options.api_base.trim_end_matches('/'),
            sid = self.options.account_sid
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", &self.options.to);
        form_body.insert("From", &self.options.from);
        form_body.insert("Body", message);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form_body)
            .send()
            .await
            .map_err(|e| ScoutError::notification(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!("Twilio error ({}): {}", status, error_body);
            return Err(ScoutError::notification(format!("Twilio returned {status}")));
        }

        debug!("Sent summary to {}", self.options.to);
        Ok(())
    }

    fn recipient(&self) -> &str {
        &self.options.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn options(api_base: String) -> TwilioOptions {
        TwilioOptions {
            account_sid: "AC123".to_string(),
            auth_token: "secret".to_string(),
            from: "+15550000001".to_string(),
            to: "+15550000002".to_string(),
            api_base,
        }
    }

    #[test]
    fn test_compose_message_carries_counts() {
        let message = compose_message(5, 3, 2, "listings.json");
        assert!(message.contains("5 eligible"));
        assert!(message.contains("3 new"));
        assert!(message.contains("2 already known"));
        assert!(message.contains("listings.json"));
    }

    #[tokio::test]
    async fn test_dispatch_posts_message_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("To".to_string(), "+15550000002".to_string()),
                Matcher::UrlEncoded("From".to_string(), "+15550000001".to_string()),
                Matcher::UrlEncoded("Body".to_string(), "hello".to_string()),
            ]))
            .with_status(201)
            .with_body(r#"{"sid": "SM1"}"#)
            .create_async()
            .await;

        let notifier = TwilioNotifier::new(options(server.url()), Duration::from_secs(5)).unwrap();
        notifier.dispatch("hello").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_dispatch_rejection_is_notification_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
            .with_status(401)
            .with_body(r#"{"message": "Authenticate"}"#)
            .create_async()
            .await;

        let notifier = TwilioNotifier::new(options(server.url()), Duration::from_secs(5)).unwrap();
        let err = notifier.dispatch("hello").await.unwrap_err();

        assert!(matches!(err, ScoutError::Notification(_)));
    }
}
