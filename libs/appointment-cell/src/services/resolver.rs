// libs/appointment-cell/src/services/resolver.rs
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::models::{BookingError, EntityKind, Named, Professional, Resolution, Service};
use crate::store::{BookingStore, StoreError};

/// Upper bound on suggestion lists returned to callers.
pub const MAX_SUGGESTIONS: usize = 5;

/// Lowercased, accent-stripped form used for substring matching.
pub fn fold_name(raw: &str) -> String {
    raw.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

pub fn name_matches(name: &str, folded_query: &str) -> bool {
    fold_name(name).contains(folded_query)
}

/// Alphabetically-first candidate wins; at most `MAX_SUGGESTIONS` are kept.
pub fn substring_resolution<T: Named + Clone>(mut candidates: Vec<T>) -> Resolution<T> {
    candidates.sort_by(|a, b| {
        fold_name(a.name())
            .cmp(&fold_name(b.name()))
            .then_with(|| a.name().cmp(b.name()))
    });
    candidates.truncate(MAX_SUGGESTIONS);

    match candidates.first().cloned() {
        Some(primary) => Resolution::SubstringMatch { primary, candidates },
        None => Resolution::NoMatch { suggestions: Vec::new() },
    }
}

/// Per-entity store lookups behind the shared resolution tiers.
#[async_trait]
trait Catalog: Named + Clone + Send + Sync + Sized + 'static {
    const KIND: EntityKind;

    async fn by_id(store: &dyn BookingStore, business_id: Uuid, id: Uuid) -> Result<Option<Self>, StoreError>;
    async fn by_exact_name(store: &dyn BookingStore, business_id: Uuid, name: &str) -> Result<Option<Self>, StoreError>;
    async fn like(store: &dyn BookingStore, business_id: Uuid, folded: &str) -> Result<Vec<Self>, StoreError>;
    /// Alternatives offered when nothing matched.
    async fn fallback(store: &dyn BookingStore, business_id: Uuid) -> Result<Vec<Self>, StoreError>;
}

#[async_trait]
impl Catalog for Service {
    const KIND: EntityKind = EntityKind::Service;

    async fn by_id(store: &dyn BookingStore, business_id: Uuid, id: Uuid) -> Result<Option<Self>, StoreError> {
        store.find_service_by_id(business_id, id).await
    }

    async fn by_exact_name(store: &dyn BookingStore, business_id: Uuid, name: &str) -> Result<Option<Self>, StoreError> {
        store.find_service_by_exact_name(business_id, name).await
    }

    async fn like(store: &dyn BookingStore, business_id: Uuid, folded: &str) -> Result<Vec<Self>, StoreError> {
        store.find_services_like(business_id, folded).await
    }

    async fn fallback(store: &dyn BookingStore, business_id: Uuid) -> Result<Vec<Self>, StoreError> {
        store.list_services(business_id, Some(MAX_SUGGESTIONS)).await
    }
}

#[async_trait]
impl Catalog for Professional {
    const KIND: EntityKind = EntityKind::Professional;

    async fn by_id(store: &dyn BookingStore, business_id: Uuid, id: Uuid) -> Result<Option<Self>, StoreError> {
        store.find_professional_by_id(business_id, id).await
    }

    async fn by_exact_name(store: &dyn BookingStore, business_id: Uuid, name: &str) -> Result<Option<Self>, StoreError> {
        store.find_professional_by_exact_name(business_id, name).await
    }

    async fn like(store: &dyn BookingStore, business_id: Uuid, folded: &str) -> Result<Vec<Self>, StoreError> {
        store.find_professionals_like(business_id, folded).await
    }

    // Callers list professionals themselves when they want alternatives.
    async fn fallback(_store: &dyn BookingStore, _business_id: Uuid) -> Result<Vec<Self>, StoreError> {
        Ok(Vec::new())
    }
}

/// Turns a canonical id or a free-text name into a catalog record.
///
/// Tiers, first non-empty wins:
/// 1. a UUID-shaped reference is fetched by id and never name-matched
/// 2. exact, case-sensitive name
/// 3. case- and accent-insensitive substring, alphabetical-first
///
/// "Not found" is a `Resolution::NoMatch`, not an error; only store failures
/// produce `Err`.
#[derive(Clone)]
pub struct EntityResolver {
    store: Arc<dyn BookingStore>,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn resolve_service(&self, business_id: Uuid, reference: &str) -> Result<Resolution<Service>, BookingError> {
        self.resolve::<Service>(business_id, reference).await
    }

    pub async fn resolve_professional(
        &self,
        business_id: Uuid,
        reference: &str,
    ) -> Result<Resolution<Professional>, BookingError> {
        self.resolve::<Professional>(business_id, reference).await
    }

    async fn resolve<T: Catalog>(&self, business_id: Uuid, reference: &str) -> Result<Resolution<T>, BookingError> {
        let store = self.store.as_ref();
        let reference = reference.trim();

        if reference.is_empty() {
            return Ok(Resolution::NoMatch { suggestions: T::fallback(store, business_id).await? });
        }

        if let Ok(id) = Uuid::parse_str(reference) {
            return Ok(match T::by_id(store, business_id, id).await? {
                Some(found) => Resolution::Canonical(found),
                None => {
                    debug!("{} id {} does not exist in business {}", T::KIND, id, business_id);
                    Resolution::NoMatch { suggestions: T::fallback(store, business_id).await? }
                }
            });
        }

        if let Some(found) = T::by_exact_name(store, business_id, reference).await? {
            return Ok(Resolution::ExactMatch(found));
        }

        let folded = fold_name(reference);
        let candidates: Vec<T> = T::like(store, business_id, &folded)
            .await?
            .into_iter()
            .filter(|candidate| name_matches(candidate.name(), &folded))
            .collect();

        if !candidates.is_empty() {
            debug!("{} '{}' matched {} candidate(s) by substring", T::KIND, reference, candidates.len());
            return Ok(substring_resolution(candidates));
        }

        debug!("{} '{}' not found in business {}", T::KIND, reference, business_id);
        Ok(Resolution::NoMatch { suggestions: T::fallback(store, business_id).await? })
    }
}
