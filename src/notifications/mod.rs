//! Stock alert notifications
//!
//! A store run that finds stock produces exactly one [`Alert`]: a header
//! naming the store followed by one block per available product. Alerts are
//! delivered through a [`Channel`]; the only production channel is
//! [`TelegramChannel`], which posts into a forum topic per store.
//!
//! ```text
//! 🔥 *Stock Alert: Vijay Sales* 🛍️
//!
//! [iPhone 17 Black 256GB](https://...)
//! 📦 Delivery: YES, 🏬 Pickup: NO
//! 📍 Pincode: 110016
//! ---
//! ...
//! ```

pub mod channels;

use serde::{Deserialize, Serialize};

use crate::models::StoreType;

pub use channels::telegram::TelegramChannel;
pub use channels::{Channel, ChannelError, ChannelResult, DeliveryStatus};

/// Separator placed between product blocks
pub const BLOCK_SEPARATOR: &str = "\n---\n";

/// A composed stock alert for one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub store: StoreType,
    /// Markdown message body
    pub text: String,
    /// Destination forum topic, as configured
    pub thread_id: Option<String>,
}

impl Alert {
    /// Compose the alert for a store from its product blocks
    ///
    /// Returns `None` when there is nothing to report.
    pub fn compose(store: StoreType, blocks: &[String], thread_id: Option<String>) -> Option<Self> {
        if blocks.is_empty() {
            return None;
        }

        let text = format!(
            "{}{}",
            Self::header(store),
            blocks.join(BLOCK_SEPARATOR)
        );

        Some(Self {
            store,
            text,
            thread_id,
        })
    }

    /// `🔥 *Stock Alert: <name>* <emoji>` followed by a blank line
    pub fn header(store: StoreType) -> String {
        format!(
            "🔥 *Stock Alert: {}* {}\n\n",
            store.display_name(),
            store.emoji()
        )
    }
}
