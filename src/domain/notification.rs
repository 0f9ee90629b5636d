//! Rendering of outbound notification mail.

use serde::{Deserialize, Serialize};

use super::product::TrackedProduct;

const SHORT_TITLE_CHARS: usize = 20;

/// A rendered email ready to hand to a [`Notifier`](super::services::Notifier)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// First 20 characters of the title followed by `...` when it is longer.
pub fn shorten_title(title: &str) -> String {
    if title.chars().count() > SHORT_TITLE_CHARS {
        let head: String = title.chars().take(SHORT_TITLE_CHARS).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

/// Welcome mail sent once to each new watcher of a product.
///
/// Rendered from the committed product, so the price shown is the one that
/// was just persisted. Every scraped value is escaped, URLs included.
pub fn render_welcome(product: &TrackedProduct) -> EmailContent {
    let short_title = shorten_title(&product.title);
    let image = product
        .image
        .as_deref()
        .map(|src| {
            format!(
                r#"<img src="{}" alt="{}" style="max-width: 100%;" />"#,
                escape_html(src),
                escape_html(&product.title)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<div>
  <h2>Welcome to price tracking 🚀</h2>
  <p>You are now tracking <strong>{title}</strong>.</p>
  <div style="border: 1px solid #ccc; padding: 10px; background-color: #f8f8f8;">
    <h3>{title}</h3>
    {image}
    <p>Current price: <strong>{currency}{price:.2}</strong></p>
    <p>Lowest seen: {currency}{lowest:.2} · Highest seen: {currency}{highest:.2}</p>
    <a href="{url}" target="_blank" rel="noopener noreferrer">View the product</a>
  </div>
  <p>We will keep an eye on this product for you.</p>
</div>"#,
        title = escape_html(&product.title),
        image = image,
        currency = escape_html(&product.currency),
        price = product.current_price,
        lowest = product.lowest_price,
        highest = product.highest_price,
        url = escape_html(&product.url),
    );

    EmailContent {
        subject: format!("Welcome to Price Tracking for {short_title}"),
        body,
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
