//! Persistence of gigs and venues.
//!
//! [`GigStore`] is the capability the pipeline writes through. [`StrapiStore`]
//! implements it against a Strapi CMS (v4 or v5) over its REST API.
//!
//! # Deduplication
//!
//! - Venues are identified by exact, case-sensitive name. Lookups go through
//!   a process-lifetime cache before touching the CMS.
//! - Gigs are identified by exact title plus calendar day. There is no update
//!   path: an existing gig is left untouched.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::error::{ProviderError, check_status};
use crate::models::{EntityId, Gig, Venue};
use crate::retry::RetryPolicy;

const PROVIDER: &str = "strapi";

/// Venue and gig persistence.
#[async_trait]
pub trait GigStore: Send + Sync {
    /// Venue with exactly this name, if one exists.
    async fn find_venue_by_name(
        &self,
        name: &str,
    ) -> Result<Option<(EntityId, Venue)>, ProviderError>;

    /// Create a venue without checking for an existing one.
    async fn create_venue(&self, venue: &Venue) -> Result<EntityId, ProviderError>;

    /// Gig with exactly this title on the same calendar day as `date`.
    async fn find_gig(
        &self,
        title: &str,
        date: NaiveDateTime,
    ) -> Result<Option<EntityId>, ProviderError>;

    /// Create a gig linked to `venue_id` without checking for duplicates.
    async fn create_gig(&self, gig: &Gig, venue_id: EntityId) -> Result<EntityId, ProviderError>;

    /// Id of the venue named `name`, creating a name-only venue on a miss.
    async fn get_or_create_venue(&self, name: &str) -> Result<EntityId, ProviderError> {
        if let Some((id, _)) = self.find_venue_by_name(name).await? {
            return Ok(id);
        }
        self.create_venue(&Venue::named(name)).await
    }
}

/// `{"data": ..., "meta": ...}` as returned by every Strapi endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Data {
    Many(Vec<Entity>),
    One(Entity),
}

/// A Strapi entity. Strapi 4 nests fields under `attributes`; Strapi 5
/// returns them next to `id`.
#[derive(Debug, Deserialize)]
struct Entity {
    id: EntityId,
    #[serde(default)]
    attributes: Option<Map<String, Value>>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Entity {
    fn field(&self, name: &str) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|a| a.get(name))
            .or_else(|| self.fields.get(name))
            .and_then(Value::as_str)
    }

    fn to_venue(&self, fallback_name: &str) -> Venue {
        Venue {
            name: self.field("name").unwrap_or(fallback_name).to_string(),
            address: self.field("address").map(str::to_string),
            website: self.field("website").map(str::to_string),
        }
    }
}

/// Strapi REST client with a venue-name cache.
#[derive(Debug)]
pub struct StrapiStore {
    http: Client,
    base_url: String,
    token: String,
    retry: RetryPolicy,
    venues: DashMap<String, (EntityId, Venue)>,
}

impl StrapiStore {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry,
            venues: DashMap::new(),
        }
    }

    fn endpoint(&self, collection: &str) -> String {
        format!("{}/api/{}", self.base_url, collection)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;
        check_status(PROVIDER, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))
    }

    /// First entity matching `filters`, if any.
    async fn find_first(
        &self,
        operation: &str,
        collection: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<Entity>, ProviderError> {
        let url = self.endpoint(collection);
        let envelope: Envelope = self
            .retry
            .run(operation, || {
                let request = self
                    .http
                    .get(&url)
                    .query(filters)
                    .query(&[("pagination[pageSize]", "1")]);
                self.send(request)
            })
            .await?;

        Ok(match envelope.data {
            Some(Data::Many(entities)) => entities.into_iter().next(),
            Some(Data::One(entity)) => Some(entity),
            None => None,
        })
    }

    async fn create(
        &self,
        operation: &str,
        collection: &str,
        data: Value,
    ) -> Result<Entity, ProviderError> {
        let url = self.endpoint(collection);
        let body = json!({ "data": data });
        let envelope: Envelope = self
            .retry
            .run(operation, || self.send(self.http.post(&url).json(&body)))
            .await?;

        match envelope.data {
            Some(Data::One(entity)) => Ok(entity),
            _ => Err(ProviderError::parse(
                PROVIDER,
                format!("create {collection} did not return a single entity"),
            )),
        }
    }
}

/// `[day 00:00, next day 00:00)` as Strapi filter values.
fn day_window(day: NaiveDate) -> Result<(String, String), ProviderError> {
    let next = day
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ProviderError::fatal(PROVIDER, format!("date out of range: {day}")))?;
    Ok((format!("{day}T00:00:00"), format!("{next}T00:00:00")))
}

#[async_trait]
impl GigStore for StrapiStore {
    #[instrument(level = "debug", skip(self))]
    async fn find_venue_by_name(
        &self,
        name: &str,
    ) -> Result<Option<(EntityId, Venue)>, ProviderError> {
        if let Some(hit) = self.venues.get(name) {
            debug!(id = hit.0, "Venue cache hit");
            return Ok(Some(hit.value().clone()));
        }

        let filters = [("filters[name][$eq]", name.to_string())];
        let Some(entity) = self.find_first("strapi.find_venue", "venues", &filters).await? else {
            return Ok(None);
        };
        let found = (entity.id, entity.to_venue(name));
        self.venues.insert(name.to_string(), found.clone());
        Ok(Some(found))
    }

    #[instrument(level = "info", skip_all, fields(name = %venue.name))]
    async fn create_venue(&self, venue: &Venue) -> Result<EntityId, ProviderError> {
        let data = json!({
            "name": venue.name,
            "address": venue.address,
            "website": venue.website,
        });
        let entity = self.create("strapi.create_venue", "venues", data).await?;
        self.venues
            .insert(venue.name.clone(), (entity.id, venue.clone()));
        info!(id = entity.id, "Created venue");
        Ok(entity.id)
    }

    #[instrument(level = "debug", skip(self))]
    async fn find_gig(
        &self,
        title: &str,
        date: NaiveDateTime,
    ) -> Result<Option<EntityId>, ProviderError> {
        let (from, until) = day_window(date.date())?;
        let filters = [
            ("filters[title][$eq]", title.to_string()),
            ("filters[date][$gte]", from),
            ("filters[date][$lt]", until),
        ];
        let found = self.find_first("strapi.find_gig", "gigs", &filters).await?;
        Ok(found.map(|entity| entity.id))
    }

    #[instrument(level = "info", skip_all, fields(title = %gig.title, venue_id = venue_id))]
    async fn create_gig(&self, gig: &Gig, venue_id: EntityId) -> Result<EntityId, ProviderError> {
        let data = json!({
            "title": gig.title,
            "date": gig.date.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "venue": venue_id,
            "description": gig.description,
            "price": gig.price,
            "url": gig.source_url,
            "imageUrl": gig.image_url,
        });
        let entity = self.create("strapi.create_gig", "gigs", data).await?;
        info!(id = entity.id, "Created gig");
        Ok(entity.id)
    }
}
