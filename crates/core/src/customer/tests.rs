use std::sync::Arc;

use rust_decimal_macros::dec;

use egabank_shared::AppError;
use egabank_shared::types::{CustomerId, PageRequest};

use super::*;
use crate::account::{AccountKind, AccountService, OpenAccountInput};
use crate::auth::{NewPrincipal, hash_password};
use crate::access::Role;
use crate::ledger::{OperationInput, TransactionEngine};
use crate::store::Store;
use crate::testing::{admin, customer_input, memory_store, unlinked_user, user_of};

fn service(store: &Arc<dyn Store>) -> CustomerService {
    CustomerService::new(Arc::clone(store))
}

#[tokio::test]
async fn test_create_and_get() {
    let store = memory_store();
    let customers = service(&store);

    let created = customers
        .create(&admin(), customer_input("Dupont", "Jean", Some("j@x")))
        .await
        .unwrap();
    assert_eq!(created.account_count, 0);
    assert_eq!(created.customer.full_name(), "Jean Dupont");

    let fetched = customers.get(&admin(), created.customer.id).await.unwrap();
    assert_eq!(fetched.customer, created.customer);

    let err = customers.get(&admin(), CustomerId::new(999)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { resource: "Customer", .. }));
}

#[tokio::test]
async fn test_create_rejects_duplicate_email_and_bad_input() {
    let store = memory_store();
    let customers = service(&store);
    customers
        .create(&admin(), customer_input("Dupont", "Jean", Some("j@x")))
        .await
        .unwrap();

    let err = customers
        .create(&admin(), customer_input("Martin", "Paul", Some("j@x")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Duplicate { field: "email", .. }));

    let mut bad = customer_input("M", "Paul", None);
    bad.phone = Some("abc".into());
    let err = customers.create(&admin(), bad).await.unwrap_err();
    let fields = err.field_errors().unwrap();
    assert!(fields.contains_key("familyName"));
    assert!(fields.contains_key("phone"));
}

#[tokio::test]
async fn test_users_cannot_create_or_list() {
    let store = memory_store();
    let customers = service(&store);
    let user = user_of(CustomerId::new(1));

    let err = customers
        .create(&user, customer_input("Dupont", "Jean", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = customers.list(&user, PageRequest::default()).await.unwrap_err();
    assert_eq!(err.status_code(), 403);
    let err = customers
        .search(&unlinked_user(), "dup", PageRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[tokio::test]
async fn test_list_and_search_order() {
    let store = memory_store();
    let customers = service(&store);
    for (family, given, email) in [
        ("Martin", "Paul", Some("paul@bank.tg")),
        ("Dupont", "Jean", Some("j@x")),
        ("Dupont", "Alice", None),
    ] {
        customers
            .create(&admin(), customer_input(family, given, email))
            .await
            .unwrap();
    }

    let page = customers.list(&admin(), PageRequest::new(0, 2)).await.unwrap();
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);
    let names: Vec<_> = page.content.iter().map(|s| s.customer.full_name()).collect();
    assert_eq!(names, ["Alice Dupont", "Jean Dupont"]);

    let found = customers
        .search(&admin(), "dUp", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(found.total_elements, 2);

    let found = customers
        .search(&admin(), "BANK.tg", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(found.content.len(), 1);
    assert_eq!(found.content[0].customer.family_name, "Martin");

    let found = customers
        .search(&admin(), "paul", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(found.total_elements, 1);
}

#[tokio::test]
async fn test_update_by_owner_and_email_clash() {
    let store = memory_store();
    let customers = service(&store);
    let jean = customers
        .create(&admin(), customer_input("Dupont", "Jean", Some("j@x")))
        .await
        .unwrap()
        .customer;
    let paul = customers
        .create(&admin(), customer_input("Martin", "Paul", Some("p@x")))
        .await
        .unwrap()
        .customer;

    let mut input = customer_input("Dupont", "Jean-Marc", Some("j@x"));
    let updated = customers.update(&user_of(jean.id), jean.id, input.clone()).await.unwrap();
    assert_eq!(updated.customer.given_name, "Jean-Marc");

    input.email = Some("p@x".into());
    let err = customers.update(&admin(), jean.id, input.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::Duplicate { .. }));

    let err = customers.update(&user_of(jean.id), paul.id, input).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_get_with_accounts_for_owner() {
    let store = memory_store();
    let customers = service(&store);
    let accounts = AccountService::new(Arc::clone(&store));
    let jean = customers
        .create(&admin(), customer_input("Dupont", "Jean", None))
        .await
        .unwrap()
        .customer;
    for kind in [AccountKind::Current, AccountKind::Savings] {
        accounts
            .create(&admin(), OpenAccountInput { kind, client_id: jean.id })
            .await
            .unwrap();
    }

    let details = customers.get_with_accounts(&user_of(jean.id), jean.id).await.unwrap();
    let kinds: Vec<_> = details.accounts.iter().map(|a| a.kind).collect();
    assert_eq!(kinds, [AccountKind::Current, AccountKind::Savings]);
    assert_eq!(customers.get(&admin(), jean.id).await.unwrap().account_count, 2);

    let err = customers
        .get_with_accounts(&user_of(CustomerId::new(jean.id.into_inner() + 1)), jean.id)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[tokio::test]
async fn test_delete_refused_while_funded() {
    let store = memory_store();
    let customers = service(&store);
    let accounts = AccountService::new(Arc::clone(&store));
    let engine = TransactionEngine::new(Arc::clone(&store));
    let jean = customers
        .create(&admin(), customer_input("Dupont", "Jean", None))
        .await
        .unwrap()
        .customer;
    let account = accounts
        .create(&admin(), OpenAccountInput { kind: AccountKind::Current, client_id: jean.id })
        .await
        .unwrap()
        .account;
    engine
        .deposit(&admin(), &account.identifier, OperationInput { amount: dec!(5.00), description: None })
        .await
        .unwrap();

    let err = customers.delete(&admin(), jean.id).await.unwrap_err();
    assert!(matches!(err, AppError::OperationNotAllowed(_)));
    assert!(customers.get(&admin(), jean.id).await.is_ok());
}

#[tokio::test]
async fn test_delete_cascades() {
    let store = memory_store();
    let customers = service(&store);
    let accounts = AccountService::new(Arc::clone(&store));
    let engine = TransactionEngine::new(Arc::clone(&store));
    let jean = customers
        .create(&admin(), customer_input("Dupont", "Jean", None))
        .await
        .unwrap()
        .customer;
    let account = accounts
        .create(&admin(), OpenAccountInput { kind: AccountKind::Current, client_id: jean.id })
        .await
        .unwrap()
        .account;
    engine
        .deposit(&admin(), &account.identifier, OperationInput { amount: dec!(5.00), description: None })
        .await
        .unwrap();
    engine
        .withdraw(&admin(), &account.identifier, OperationInput { amount: dec!(5.00), description: None })
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.insert_principal(NewPrincipal {
        username: "jdupont".into(),
        email: "jd@x".into(),
        password_hash: hash_password("secret123").unwrap(),
        role: Role::User,
        enabled: true,
        customer_id: Some(jean.id),
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let err = customers.delete(&user_of(jean.id), jean.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    customers.delete(&admin(), jean.id).await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert!(tx.find_customer(jean.id).await.unwrap().is_none());
    assert!(tx.find_account(account.id).await.unwrap().is_none());
    assert!(tx.find_principal("jdupont").await.unwrap().is_none());
    assert_eq!(tx.count_entries(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_racing_deposit_never_drops_funds() {
    let store = memory_store();
    let customers = Arc::new(service(&store));
    let accounts = AccountService::new(Arc::clone(&store));
    let engine = Arc::new(TransactionEngine::new(Arc::clone(&store)));
    let jean = customers
        .create(&admin(), customer_input("Dupont", "Jean", None))
        .await
        .unwrap()
        .customer;
    let account = accounts
        .create(&admin(), OpenAccountInput { kind: AccountKind::Current, client_id: jean.id })
        .await
        .unwrap()
        .account;

    let deposit = {
        let engine = Arc::clone(&engine);
        let identifier = account.identifier.clone();
        tokio::spawn(async move {
            engine
                .deposit(&admin(), &identifier, OperationInput { amount: dec!(1000.00), description: None })
                .await
        })
    };
    let delete = {
        let customers = Arc::clone(&customers);
        tokio::spawn(async move { customers.delete(&admin(), jean.id).await })
    };
    let deposited = deposit.await.unwrap();
    let deleted = delete.await.unwrap();

    match (deposited, deleted) {
        (Ok(_), Err(err)) => {
            assert!(matches!(err, AppError::OperationNotAllowed(_)));
            let kept = accounts.get(&admin(), &account.identifier).await.unwrap();
            assert_eq!(kept.account.balance, dec!(1000.00));
        }
        (Err(err), Ok(())) => assert_eq!(err.status_code(), 404),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
