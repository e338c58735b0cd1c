//! Member lookups and single-member creation
//!
//! Every lookup shapes its result as a [`MemberView`]: the subscriber summary
//! plus the account ids of all its providers in creation order.

use members_common::db::{NewSubscriber, Subscriber};
use members_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::db::{providers, subscribers};
use crate::services::upsert::{link_provider, resolve_subscriber, ProviderLink, SubscriberResolution};

/// Nested member + providers view returned by every lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub member: String,
    pub providers: Vec<String>,
}

/// Attach a subscriber's providers
pub async fn member_view(pool: &SqlitePool, subscriber: &Subscriber) -> Result<MemberView> {
    let providers = providers::list_for_subscriber(pool, subscriber.id)
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();

    Ok(MemberView {
        member: subscriber.to_string(),
        providers,
    })
}

async fn view_of(pool: &SqlitePool, subscriber: Option<Subscriber>) -> Result<Option<MemberView>> {
    match subscriber {
        Some(subscriber) => Ok(Some(member_view(pool, &subscriber).await?)),
        None => Ok(None),
    }
}

pub async fn by_id(pool: &SqlitePool, id: i64) -> Result<Option<MemberView>> {
    view_of(pool, subscribers::find_by_id(pool, id).await?).await
}

pub async fn by_phone(pool: &SqlitePool, phone_number: &str) -> Result<Option<MemberView>> {
    view_of(pool, subscribers::find_by_phone(pool, phone_number).await?).await
}

pub async fn by_client_id(pool: &SqlitePool, client_member_id: &str) -> Result<Option<MemberView>> {
    view_of(
        pool,
        subscribers::find_by_client_member_id(pool, client_member_id).await?,
    )
    .await
}

/// One view per distinct subscriber linked to the account, ordered by subscriber id
pub async fn by_account_id(pool: &SqlitePool, account_id: &str) -> Result<Vec<MemberView>> {
    let found = subscribers::find_by_account_id(pool, account_id).await?;

    let mut views = Vec::with_capacity(found.len());
    for subscriber in &found {
        views.push(member_view(pool, subscriber).await?);
    }
    Ok(views)
}

/// Account id as sent by clients: either a JSON string or a JSON number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AccountIdInput {
    Text(String),
    Number(serde_json::Number),
}

impl AccountIdInput {
    pub fn into_account_id(self) -> String {
        match self {
            AccountIdInput::Text(text) => text,
            AccountIdInput::Number(number) => number.to_string(),
        }
    }
}

/// `POST /api/create_member/` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub client_member_id: Option<String>,
    pub provider_info: Option<Vec<AccountIdInput>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberInputError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// A create request with every required field present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub subscriber: NewSubscriber,
    pub account_ids: Vec<String>,
}

impl CreateMemberRequest {
    /// Require the four subscriber fields; empty strings count as missing
    pub fn validate(self) -> std::result::Result<NewMember, MemberInputError> {
        fn required(
            value: Option<String>,
            name: &'static str,
        ) -> std::result::Result<String, MemberInputError> {
            value
                .filter(|v| !v.is_empty())
                .ok_or(MemberInputError::MissingField(name))
        }

        Ok(NewMember {
            subscriber: NewSubscriber {
                first_name: required(self.first_name, "first_name")?,
                last_name: required(self.last_name, "last_name")?,
                phone_number: required(self.phone_number, "phone_number")?,
                client_member_id: required(self.client_member_id, "client_member_id")?,
            },
            account_ids: self
                .provider_info
                .unwrap_or_default()
                .into_iter()
                .map(AccountIdInput::into_account_id)
                .collect(),
        })
    }
}

/// Resolve or create the subscriber, then link every requested account id
///
/// Returns [`Error::Conflict`] when another subscriber already holds the
/// phone number or client member id. Existing links are not errors.
pub async fn create_member(pool: &SqlitePool, new: NewMember) -> Result<MemberView> {
    let (subscriber, resolution) = resolve_subscriber(pool, &new.subscriber).await?;
    if resolution == SubscriberResolution::Created {
        info!(subscriber_id = subscriber.id, "Subscriber created");
    }

    for account_id in &new.account_ids {
        if account_id.is_empty() {
            continue;
        }
        if link_provider(pool, subscriber.id, account_id).await? == ProviderLink::Created {
            info!(subscriber_id = subscriber.id, account_id = %account_id, "Provider linked");
        }
    }

    member_view(pool, &subscriber).await
}
