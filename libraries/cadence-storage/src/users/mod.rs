use cadence_core::{
    error::Result,
    query::{decode, encode, Filter},
    RecordStore, Subscription, SubscriptionStatus, Table, UserDetails, UserId,
};

/// Profile row for `user_id`, if one exists
pub async fn details(store: &dyn RecordStore, user_id: &UserId) -> Result<Option<UserDetails>> {
    store
        .find_one(Table::Users, &Filter::new().eq("id", user_id.as_str()))
        .await?
        .map(decode)
        .transpose()
}

/// The user's subscription whose status grants entitlement, if any
pub async fn active_subscription(
    store: &dyn RecordStore,
    user_id: &UserId,
) -> Result<Option<Subscription>> {
    let filter = Filter::new().eq("user_id", user_id.as_str()).in_list(
        "status",
        SubscriptionStatus::ENTITLED.iter().map(|s| s.as_str()),
    );

    store
        .find_one(Table::Subscriptions, &filter)
        .await?
        .map(decode)
        .transpose()
}

/// Create or replace a profile row
pub async fn upsert_details(store: &dyn RecordStore, details: &UserDetails) -> Result<()> {
    store.upsert(Table::Users, encode(details)?).await
}

/// Create or replace a subscription row
pub async fn upsert_subscription(store: &dyn RecordStore, subscription: &Subscription) -> Result<()> {
    store
        .upsert(Table::Subscriptions, encode(subscription)?)
        .await
}
