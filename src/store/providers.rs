use sled::transaction::{TransactionError, TransactionResult};
use sled::Transactional;
use tracing::debug;

use super::{decode, encode, get, key, scan, Result, Store, StoreError, UpdateMode};
use crate::models::{Provider, ProviderPayload, ServiceArea};

const ENTITY: &str = "Provider";
const SEQUENCE: &str = "provider";

impl Store {
    /// All providers ordered by id
    pub async fn list_providers(&self) -> Result<Vec<Provider>> {
        let _reader = self.index.read().await;
        scan(&self.providers)
    }

    pub async fn get_provider(&self, id: u64) -> Result<Provider> {
        let _reader = self.index.read().await;
        get(&self.providers, id)?.ok_or(StoreError::NotFound { entity: ENTITY, id })
    }

    pub(crate) fn provider_exists(&self, id: u64) -> Result<bool> {
        Ok(self.providers.contains_key(key(id))?)
    }

    pub async fn create_provider(&self, payload: ProviderPayload) -> Result<Provider> {
        let fields = payload.validate()?;

        let _writer = self.index.write().await;
        let provider = fields.with_id(self.next_id(SEQUENCE)?);
        self.providers.insert(key(provider.id), encode(&provider)?)?;

        debug!("Created provider {} ({})", provider.id, provider.name);
        Ok(provider)
    }

    pub async fn update_provider(
        &self,
        id: u64,
        payload: ProviderPayload,
        mode: UpdateMode,
    ) -> Result<Provider> {
        let _writer = self.index.write().await;

        let existing: Provider =
            get(&self.providers, id)?.ok_or(StoreError::NotFound { entity: ENTITY, id })?;

        let payload = match mode {
            UpdateMode::Replace => payload,
            UpdateMode::Partial => payload.or_existing(&existing),
        };
        let provider = payload.validate()?.with_id(id);
        self.providers.insert(key(id), encode(&provider)?)?;

        debug!("Updated provider {}", id);
        Ok(provider)
    }

    /// Delete a provider and every service area it owns.
    ///
    /// Returns the number of service areas removed with it.
    pub async fn delete_provider(&self, id: u64) -> Result<usize> {
        let mut index = self.index.write().await;

        if !self.provider_exists(id)? {
            return Err(StoreError::NotFound { entity: ENTITY, id });
        }

        let mut owned = Vec::new();
        for value in self.service_areas.iter().values() {
            let area: ServiceArea = decode(&value?)?;
            if area.provider == id {
                owned.push(area.id);
            }
        }

        // The provider row and its areas go together or not at all
        let removed: TransactionResult<(), sled::Error> = (&self.providers, &self.service_areas)
            .transaction(|(providers, service_areas)| {
                for area_id in &owned {
                    service_areas.remove(&key(*area_id)[..])?;
                }
                providers.remove(&key(id)[..])?;
                Ok(())
            });
        removed.map_err(|e| match e {
            TransactionError::Abort(e) | TransactionError::Storage(e) => StoreError::Sled(e),
        })?;

        for area_id in &owned {
            index.remove(*area_id);
        }

        debug!(
            "Deleted provider {} and {} service areas",
            id,
            owned.len()
        );
        Ok(owned.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceAreaPayload;
    use serde_json::json;

    fn payload(name: &str) -> ProviderPayload {
        ProviderPayload {
            name: Some(Some(name.into())),
            email: Some(Some("example@example.com".into())),
            phone_number: Some(Some("18338738237".into())),
            language: Some(Some("English".into())),
            currency: Some(Some("Dollar".into())),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = Store::temporary().unwrap();
        let created = store.create_provider(payload("Uber")).await.unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(store.get_provider(1).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_list_in_id_order() {
        let store = Store::temporary().unwrap();
        for name in ["Uber", "Lyft", "InDriver"] {
            store.create_provider(payload(name)).await.unwrap();
        }
        let names: Vec<String> = store
            .list_providers()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Uber", "Lyft", "InDriver"]);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_not_stored() {
        let store = Store::temporary().unwrap();
        let bad = ProviderPayload {
            email: None,
            ..payload("Uber")
        };
        assert!(matches!(
            store.create_provider(bad).await,
            Err(StoreError::Validation(_))
        ));
        assert!(store.list_providers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_provider() {
        let store = Store::temporary().unwrap();
        assert!(matches!(
            store
                .update_provider(30, payload("Uber"), UpdateMode::Replace)
                .await,
            Err(StoreError::NotFound { id: 30, .. })
        ));
    }

    #[tokio::test]
    async fn test_replace_requires_all_fields_partial_does_not() {
        let store = Store::temporary().unwrap();
        store.create_provider(payload("Uber")).await.unwrap();

        let patch = ProviderPayload {
            name: Some(Some("Lyft".into())),
            ..ProviderPayload::default()
        };
        assert!(matches!(
            store
                .update_provider(1, patch.clone(), UpdateMode::Replace)
                .await,
            Err(StoreError::Validation(_))
        ));

        let updated = store
            .update_provider(1, patch, UpdateMode::Partial)
            .await
            .unwrap();
        assert_eq!(updated.name, "Lyft");
        assert_eq!(updated.email, "example@example.com");
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let store = Store::temporary().unwrap();
        store.create_provider(payload("Uber")).await.unwrap();
        assert_eq!(store.delete_provider(1).await.unwrap(), 0);
        assert!(matches!(
            store.delete_provider(1).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cascade_delete_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = Store::open(dir.path()).unwrap();
            store.create_provider(payload("Uber")).await.unwrap();
            store.create_provider(payload("Lyft")).await.unwrap();
            for (name, provider) in [("U1", 1), ("L1", 2)] {
                store
                    .create_service_area(ServiceAreaPayload {
                        name: Some(Some(name.into())),
                        price: Some(json!("10.00")),
                        area: Some(json!({
                            "type": "Polygon",
                            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                        })),
                        provider: Some(json!(provider)),
                    })
                    .await
                    .unwrap();
            }
            assert_eq!(store.delete_provider(1).await.unwrap(), 1);
            store.flush().await.unwrap();
        }

        let store = Store::open(dir.path()).unwrap();
        assert_eq!(store.counts(), (1, 1));
        assert_eq!(store.indexed_areas().await, 1);
        assert!(matches!(
            store.get_provider(1).await,
            Err(StoreError::NotFound { id: 1, .. })
        ));
        assert_eq!(store.get_service_area(2).await.unwrap().provider, 2);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let store = Store::temporary().unwrap();
        store.create_provider(payload("Uber")).await.unwrap();
        store.delete_provider(1).await.unwrap();
        let next = store.create_provider(payload("Lyft")).await.unwrap();
        assert_eq!(next.id, 2);
    }
}
