use std::collections::HashMap;

use tracing::{debug, warn};

use super::{encode, get, key, scan, Result, Store, StoreError, UpdateMode};
use crate::models::{Provider, ProviderInArea, ServiceArea, ServiceAreaPayload};

const ENTITY: &str = "ServiceArea";
const SEQUENCE: &str = "service_area";

impl Store {
    /// All service areas ordered by id
    pub async fn list_service_areas(&self) -> Result<Vec<ServiceArea>> {
        let _reader = self.index.read().await;
        scan(&self.service_areas)
    }

    pub async fn get_service_area(&self, id: u64) -> Result<ServiceArea> {
        let _reader = self.index.read().await;
        get(&self.service_areas, id)?.ok_or(StoreError::NotFound { entity: ENTITY, id })
    }

    pub async fn create_service_area(&self, payload: ServiceAreaPayload) -> Result<ServiceArea> {
        let mut index = self.index.write().await;

        let provider_known = self.payload_provider_exists(&payload)?;
        let fields = payload.validate(|_| provider_known)?;

        let area = fields.with_id(self.next_id(SEQUENCE)?);
        self.service_areas.insert(key(area.id), encode(&area)?)?;
        if !index.upsert(area.id, area.area.to_multi_polygon()) {
            warn!("Service area {} has an empty geometry, not indexed", area.id);
        }

        debug!(
            "Created service area {} ({}) for provider {}",
            area.id, area.name, area.provider
        );
        Ok(area)
    }

    pub async fn update_service_area(
        &self,
        id: u64,
        payload: ServiceAreaPayload,
        mode: UpdateMode,
    ) -> Result<ServiceArea> {
        let mut index = self.index.write().await;

        let existing: ServiceArea =
            get(&self.service_areas, id)?.ok_or(StoreError::NotFound { entity: ENTITY, id })?;

        let payload = match mode {
            UpdateMode::Replace => payload,
            UpdateMode::Partial => payload.or_existing(&existing),
        };
        let provider_known = self.payload_provider_exists(&payload)?;
        let area = payload.validate(|_| provider_known)?.with_id(id);

        self.service_areas.insert(key(id), encode(&area)?)?;
        if area.area != existing.area && !index.upsert(id, area.area.to_multi_polygon()) {
            warn!("Service area {} has an empty geometry, not indexed", id);
        }

        debug!("Updated service area {}", id);
        Ok(area)
    }

    pub async fn delete_service_area(&self, id: u64) -> Result<()> {
        let mut index = self.index.write().await;

        if self.service_areas.remove(key(id))?.is_none() {
            return Err(StoreError::NotFound { entity: ENTITY, id });
        }
        index.remove(id);

        debug!("Deleted service area {}", id);
        Ok(())
    }

    /// Every service area whose polygon contains the point, with the owning
    /// provider's name. Ordered by service area id.
    pub async fn providers_in_area(&self, lon: f64, lat: f64) -> Result<Vec<ProviderInArea>> {
        let index = self.index.read().await;
        let ids = index.lookup(lon, lat);

        debug!(
            "PIP lookup at ({}, {}): found {} service areas",
            lon,
            lat,
            ids.len()
        );

        let mut provider_names: HashMap<u64, String> = HashMap::new();
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(area) = get::<ServiceArea>(&self.service_areas, id)? else {
                warn!("Indexed service area {} has no stored row", id);
                continue;
            };

            if !provider_names.contains_key(&area.provider) {
                let Some(provider) = get::<Provider>(&self.providers, area.provider)? else {
                    warn!(
                        "Service area {} references missing provider {}",
                        id, area.provider
                    );
                    continue;
                };
                provider_names.insert(provider.id, provider.name);
            }

            if let Some(name) = provider_names.get(&area.provider) {
                results.push(ProviderInArea::new(&area, name));
            }
        }

        Ok(results)
    }

    fn payload_provider_exists(&self, payload: &ServiceAreaPayload) -> Result<bool> {
        match payload.provider_pk() {
            Some(id) => self.provider_exists(id),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderPayload;
    use serde_json::{json, Value};

    fn square(min: f64, max: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[min, min], [max, min], [max, max], [min, max], [min, min]]]
        })
    }

    fn area_payload(name: &str, provider: u64, area: Value) -> ServiceAreaPayload {
        ServiceAreaPayload {
            name: Some(Some(name.into())),
            price: Some(json!("25.00")),
            area: Some(area),
            provider: Some(json!(provider)),
        }
    }

    async fn store_with_provider(name: &str) -> (Store, u64) {
        let store = Store::temporary().unwrap();
        let provider = store
            .create_provider(ProviderPayload {
                name: Some(Some(name.into())),
                email: Some(Some("ops@example.com".into())),
                phone_number: Some(Some("+18338738237".into())),
                language: None,
                currency: None,
            })
            .await
            .unwrap();
        (store, provider.id)
    }

    #[tokio::test]
    async fn test_create_requires_existing_provider() {
        let (store, provider) = store_with_provider("Uber").await;
        let err = store
            .create_service_area(area_payload("A", provider + 1, square(0.0, 1.0)))
            .await
            .unwrap_err();
        match err {
            StoreError::Validation(errors) => assert!(errors.contains("provider")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.indexed_areas().await, 0);
    }

    #[tokio::test]
    async fn test_lookup_joins_provider_name() {
        let (store, provider) = store_with_provider("Uber").await;
        store
            .create_service_area(area_payload("Big", provider, square(0.0, 10.0)))
            .await
            .unwrap();
        store
            .create_service_area(area_payload("Small", provider, square(2.0, 3.0)))
            .await
            .unwrap();

        let rows = store.providers_in_area(2.5, 2.5).await.unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Big", "Small"]);
        assert!(rows.iter().all(|r| r.provider == "Uber"));

        assert_eq!(store.providers_in_area(5.0, 5.0).await.unwrap().len(), 1);
        assert!(store.providers_in_area(50.0, 50.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_moves_geometry() {
        let (store, provider) = store_with_provider("Uber").await;
        let area = store
            .create_service_area(area_payload("A", provider, square(0.0, 1.0)))
            .await
            .unwrap();

        let patch = ServiceAreaPayload {
            area: Some(square(5.0, 6.0)),
            ..ServiceAreaPayload::default()
        };
        store
            .update_service_area(area.id, patch, UpdateMode::Partial)
            .await
            .unwrap();

        assert!(store.providers_in_area(0.5, 0.5).await.unwrap().is_empty());
        assert_eq!(store.providers_in_area(5.5, 5.5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_from_index() {
        let (store, provider) = store_with_provider("Uber").await;
        let area = store
            .create_service_area(area_payload("A", provider, square(0.0, 1.0)))
            .await
            .unwrap();

        store.delete_service_area(area.id).await.unwrap();
        assert!(store.providers_in_area(0.5, 0.5).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_service_area(area.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_provider_delete_cascades() {
        let (store, uber) = store_with_provider("Uber").await;
        let lyft = store
            .create_provider(ProviderPayload {
                name: Some(Some("Lyft".into())),
                email: Some(Some("ops@lyft.example.com".into())),
                phone_number: Some(Some("18338738237".into())),
                language: None,
                currency: None,
            })
            .await
            .unwrap()
            .id;

        store
            .create_service_area(area_payload("U1", uber, square(0.0, 1.0)))
            .await
            .unwrap();
        store
            .create_service_area(area_payload("U2", uber, square(0.0, 2.0)))
            .await
            .unwrap();
        store
            .create_service_area(area_payload("L1", lyft, square(0.0, 3.0)))
            .await
            .unwrap();

        assert_eq!(store.delete_provider(uber).await.unwrap(), 2);

        let remaining: Vec<String> = store
            .list_service_areas()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(remaining, vec!["L1"]);

        let rows = store.providers_in_area(0.5, 0.5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provider, "Lyft");
    }

    #[tokio::test]
    async fn test_reopen_restores_rows_and_index() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = Store::open(dir.path()).unwrap();
            let provider = store
                .create_provider(ProviderPayload {
                    name: Some(Some("Uber".into())),
                    email: Some(Some("ops@example.com".into())),
                    phone_number: Some(Some("18338738237".into())),
                    language: None,
                    currency: None,
                })
                .await
                .unwrap();
            store
                .create_service_area(area_payload("A", provider.id, square(0.0, 1.0)))
                .await
                .unwrap();
            store.flush().await.unwrap();
        }

        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.counts(), (1, 1));
        assert_eq!(store.indexed_areas().await, 1);
        assert_eq!(store.providers_in_area(0.5, 0.5).await.unwrap().len(), 1);

        let area = store
            .create_service_area(area_payload("B", 1, square(0.0, 1.0)))
            .await
            .unwrap();
        assert_eq!(area.id, 2);
    }
}
