use crate::models::Tier;

/// Port supplying the current user's subscription tier. Read only.
pub trait SubscriptionProvider: Send + Sync {
    fn current_tier(&self) -> Tier;
}

/// A fixed tier, e.g. resolved once from configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSubscription(pub Tier);

impl SubscriptionProvider for StaticSubscription {
    fn current_tier(&self) -> Tier {
        self.0
    }
}
