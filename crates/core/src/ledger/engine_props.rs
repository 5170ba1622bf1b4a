//! Property-based tests for the transaction engine.
//!
//! - Balances never go negative
//! - Entry arithmetic matches the entry kind
//! - Per-account history is chained
//! - Transfers conserve funds

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::*;
use crate::account::{AccountKind, AccountService, OpenAccountInput};
use crate::testing::{admin, memory_store, seed_customer};

#[derive(Debug, Clone)]
enum Op {
    Deposit(usize, Decimal),
    Withdraw(usize, Decimal),
    Transfer(usize, usize, Decimal),
}

/// Strategy to generate positive amounts (0.01 to 5,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..500_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..3, amount()).prop_map(|(a, x)| Op::Deposit(a, x)),
        (0usize..3, amount()).prop_map(|(a, x)| Op::Withdraw(a, x)),
        (0usize..3, 0usize..3, amount()).prop_map(|(a, b, x)| Op::Transfer(a, b, x)),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_ledger_matches_model(ops in prop::collection::vec(op(), 1..25)) {
        runtime().block_on(async {
            let store = memory_store();
            let accounts = AccountService::new(Arc::clone(&store));
            let engine = TransactionEngine::new(Arc::clone(&store));
            let owner = seed_customer(&store, "Dupont", "Jean", None).await.id;

            let mut identifiers = Vec::new();
            for _ in 0..3 {
                let opened = accounts
                    .create(&admin(), OpenAccountInput { kind: AccountKind::Current, client_id: owner })
                    .await
                    .unwrap();
                identifiers.push(opened.account.identifier);
            }

            let mut model = [Decimal::ZERO; 3];
            for op in ops {
                match op {
                    Op::Deposit(a, x) => {
                        let input = OperationInput { amount: x, description: None };
                        engine.deposit(&admin(), &identifiers[a], input).await.unwrap();
                        model[a] += x;
                    }
                    Op::Withdraw(a, x) => {
                        let input = OperationInput { amount: x, description: None };
                        let result = engine.withdraw(&admin(), &identifiers[a], input).await;
                        if model[a] >= x {
                            result.unwrap();
                            model[a] -= x;
                        } else {
                            assert!(result.is_err());
                        }
                    }
                    Op::Transfer(a, b, x) => {
                        let input = TransferInput {
                            source: identifiers[a].clone(),
                            dest: identifiers[b].clone(),
                            amount: x,
                            description: None,
                        };
                        let result = engine.transfer(&admin(), input).await;
                        if a != b && model[a] >= x {
                            result.unwrap();
                            model[a] -= x;
                            model[b] += x;
                        } else {
                            assert!(result.is_err());
                        }
                    }
                }
            }

            let mut transfer_delta = Decimal::ZERO;
            for (i, identifier) in identifiers.iter().enumerate() {
                let account = accounts.get(&admin(), identifier).await.unwrap().account;
                assert_eq!(account.balance, model[i]);
                assert!(account.balance >= Decimal::ZERO);

                let mut entries = engine.all_by_account(&admin(), identifier).await.unwrap();
                entries.reverse();
                let mut running = Decimal::ZERO;
                for entry in &entries {
                    assert!(entry.amount > Decimal::ZERO);
                    assert_eq!(entry.balance_before, running);
                    assert_eq!(entry.balance_after, entry.kind.apply(entry.balance_before, entry.amount));
                    running = entry.balance_after;
                    match entry.kind {
                        EntryKind::TransferOut => transfer_delta -= entry.amount,
                        EntryKind::TransferIn => transfer_delta += entry.amount,
                        EntryKind::Deposit | EntryKind::Withdrawal => {}
                    }
                }
                assert_eq!(running, account.balance);
            }
            assert_eq!(transfer_delta, Decimal::ZERO);
        });
    }
}
