use std::time::Duration;

use common::OrderId;

/// Connection and templating settings for the payment gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL the `/v2/...` endpoints are resolved against.
    pub base_url: String,
    /// Bearer token sent on every request.
    pub api_token: String,
    /// ISO code of the currency invoices are displayed in.
    pub currency: String,
    /// Success redirect; `{vendor}` and `{order}` are substituted.
    pub callback_url: String,
    /// Failure redirect; `{vendor}` and `{order}` are substituted.
    pub error_url: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apitest.myfatoorah.com".to_string(),
            api_token: String::new(),
            currency: "KWD".to_string(),
            callback_url: "https://app.dev.anyaa.io/{vendor}/checkout/{order}/confirmation"
                .to_string(),
            error_url: "https://app.dev.anyaa.io/{vendor}/checkout/{order}/failure".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl GatewayConfig {
    pub fn callback_url_for(&self, vendor_slug: &str, order_id: OrderId) -> String {
        render_url(&self.callback_url, vendor_slug, order_id)
    }

    pub fn error_url_for(&self, vendor_slug: &str, order_id: OrderId) -> String {
        render_url(&self.error_url, vendor_slug, order_id)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn render_url(template: &str, vendor_slug: &str, order_id: OrderId) -> String {
    template
        .replace("{vendor}", vendor_slug)
        .replace("{order}", &order_id.to_string())
}
