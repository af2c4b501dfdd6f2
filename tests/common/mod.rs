#![allow(dead_code)]

//! Shared fixtures for integration tests.

use std::sync::Arc;

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;

use servio::auth::Principal;
use servio::rbac::Role;
use servio::services::{NewService, Service, ServiceCategory, ServiceManager};
use servio::store::{InMemoryStore, ServiceStore};
use servio::users::{User, UserService};

pub const PASSWORD: &str = "Password1!";

pub struct TestEnv {
    pub store: Arc<InMemoryStore>,
    pub users: Arc<UserService>,
    pub catalog: Arc<ServiceManager>,
}

pub fn test_env() -> TestEnv {
    let store = Arc::new(InMemoryStore::new());
    TestEnv {
        users: Arc::new(UserService::new(store.clone(), store.clone())),
        catalog: Arc::new(ServiceManager::new(store.clone())),
        store,
    }
}

pub fn principal(id: i64, role: Role) -> Principal {
    Principal { id, role }
}

pub async fn create_user(env: &TestEnv, role: Role) -> User {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    env.users
        .create(name, email, PASSWORD, role)
        .await
        .expect("user creation failed")
}

pub async fn create_service(env: &TestEnv, name: &str) -> Service {
    ServiceStore::insert(
        env.store.as_ref(),
        NewService {
            name: name.to_string(),
            description: format!("{name} service"),
            cost: 49.99,
            category: ServiceCategory::Home,
        },
    )
    .await
    .expect("service creation failed")
}
