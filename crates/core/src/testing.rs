//! Shared fixtures for unit tests.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use egabank_shared::jwt::{JwtConfig, JwtService};
use egabank_shared::types::{CustomerId, PrincipalId};

use crate::access::{Principal, Role};
use crate::customer::{Customer, CustomerInput, NewCustomer, Sex};
use crate::store::{MemoryStore, Store};

pub(crate) const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub(crate) fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap()
}

pub(crate) fn customer_input(family: &str, given: &str, email: Option<&str>) -> CustomerInput {
    CustomerInput {
        family_name: family.to_string(),
        given_name: given.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
        sex: Sex::Male,
        address: Some("12 rue du Commerce, Lomé".to_string()),
        phone: Some("+22890123456".to_string()),
        email: email.map(str::to_string),
        nationality: Some("Togolaise".to_string()),
    }
}

pub(crate) fn memory_store() -> Arc<dyn Store> {
    Arc::new(MemoryStore::new())
}

pub(crate) fn jwt() -> Arc<JwtService> {
    Arc::new(JwtService::new(JwtConfig {
        secret: TEST_SECRET.to_string(),
        access_token_expires_secs: 3600,
        refresh_token_expires_secs: 7200,
    }))
}

pub(crate) fn admin() -> Principal {
    Principal {
        id: PrincipalId::new(1),
        username: "admin".to_string(),
        role: Role::Admin,
        customer_id: None,
    }
}

pub(crate) fn user_of(customer: CustomerId) -> Principal {
    Principal {
        id: PrincipalId::new(100 + customer.into_inner()),
        username: format!("user{customer}"),
        role: Role::User,
        customer_id: Some(customer),
    }
}

pub(crate) fn unlinked_user() -> Principal {
    Principal {
        id: PrincipalId::new(99),
        username: "drifter".to_string(),
        role: Role::User,
        customer_id: None,
    }
}

pub(crate) async fn seed_customer(store: &Arc<dyn Store>, family: &str, given: &str, email: Option<&str>) -> Customer {
    let mut tx = store.begin().await.unwrap();
    let customer = tx
        .insert_customer(NewCustomer {
            fields: customer_input(family, given, email),
            created_at: now(),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    customer
}
