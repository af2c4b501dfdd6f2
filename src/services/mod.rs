//! Service catalog operations.
//!
//! Reads are open to any authenticated principal; writes are admin-only.
//! Unlike the users surface, updates here check existence first.

pub mod model;

use std::sync::Arc;

use tracing::info;

use crate::auth::Principal;
use crate::error::{AppError, ErrorBoundary, Result};
use crate::rbac::{require_role, Role};
use crate::store::ServiceStore;

pub use model::{NewService, Service, ServiceCategory, ServiceChanges, UnknownCategory};

pub struct ServiceManager {
    services: Arc<dyn ServiceStore>,
}

impl ServiceManager {
    pub fn new(services: Arc<dyn ServiceStore>) -> Self {
        Self { services }
    }

    pub async fn create(&self, principal: &Principal, service: NewService) -> Result<Service> {
        let inner = async {
            require_role(principal, &[Role::Admin])?;
            let service = self.services.insert(service).await?;
            info!(service_id = service.id, "service created");
            Ok(service)
        };
        inner.await.or_internal("Error creating service")
    }

    pub async fn find_all(&self, principal: &Principal) -> Result<Vec<Service>> {
        let inner = async {
            require_role(principal, &[])?;
            self.services.find_all().await
        };
        inner.await.or_internal("Error fetching services")
    }

    pub async fn find_one(&self, principal: &Principal, id: i64) -> Result<Service> {
        let inner = async {
            require_role(principal, &[])?;
            self.services
                .find_by_id(id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Service with ID {id} not found."))
                })
        };
        inner.await.or_internal("Error fetching the service")
    }

    /// Update a service. Existence is checked before the write, so an
    /// absent id is reported instead of silently succeeding.
    pub async fn update(
        &self,
        principal: &Principal,
        id: i64,
        changes: ServiceChanges,
    ) -> Result<String> {
        let inner = async {
            require_role(principal, &[Role::Admin])?;
            if self.services.find_by_id(id).await?.is_none() {
                return Err(AppError::not_found(format!(
                    "Service with ID {id} not found"
                )));
            }
            self.services.update(id, changes).await?;
            Ok("Service updated successfully".to_string())
        };
        inner.await.or_internal("Error updating service")
    }

    pub async fn soft_delete(&self, principal: &Principal, id: i64) -> Result<String> {
        let inner = async {
            require_role(principal, &[Role::Admin])?;
            let affected = self.services.soft_delete(id).await?;
            if affected == 0 {
                return Err(AppError::not_found(format!(
                    "Service with ID {id} not found."
                )));
            }
            info!(service_id = id, "service soft deleted");
            Ok("Service deleted successfully".to_string())
        };
        inner.await.or_internal("Error deleting service")
    }

    pub async fn restore(&self, principal: &Principal, id: i64) -> Result<String> {
        let inner = async {
            require_role(principal, &[Role::Admin])?;
            let affected = self.services.restore(id).await?;
            if affected == 0 {
                return Err(AppError::not_found(format!(
                    "Service with ID {id} not found or not soft deleted."
                )));
            }
            info!(service_id = id, "service restored");
            Ok("Service restored successfully".to_string())
        };
        inner.await.or_internal("Error restoring service")
    }
}
