//! PostgreSQL implementation of the core store traits.
//!
//! Each [`PgTx`] wraps one `DatabaseTransaction`. Account rows read through
//! [`StoreTx::lock_account`] are selected `FOR UPDATE`, so concurrent
//! mutations of the same account queue behind each other until commit.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Condition, Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
    TransactionTrait,
};
use tracing::error;

use egabank_core::account::{Account, NewAccount};
use egabank_core::auth::{NewPrincipal, PrincipalRecord};
use egabank_core::customer::{Customer, CustomerInput, NewCustomer};
use egabank_core::ledger::{LedgerEntry, NewLedgerEntry};
use egabank_core::store::{AccountTotals, Store, StoreTx};
use egabank_shared::types::{AccountId, CustomerId, LedgerEntryId, PageRequest, PrincipalId};
use egabank_shared::{AppError, AppResult};

use crate::entities::{accounts, clients, transactions, users};

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
}

impl PgStore {
    /// Creates a store over an established connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// One open database transaction.
pub struct PgTx {
    txn: DatabaseTransaction,
}

/// Maps a database error to the application error type.
///
/// Unique violations become `Conflict` so races that slip past the service
/// checks still surface as conflicts.
fn db(err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        let (resource, field) = if detail.contains("numero_compte") {
            ("Account", "identifier")
        } else if detail.contains("courriel") {
            ("Customer", "email")
        } else if detail.contains("username") {
            ("User", "username")
        } else {
            ("User", "email")
        };
        return AppError::conflict(resource, field);
    }
    error!(error = %err, "database error");
    AppError::Store(err.to_string())
}

fn corrupt(column: &str, detail: &str) -> AppError {
    AppError::Store(format!("invalid {column} value in database: {detail}"))
}

fn to_customer(model: clients::Model) -> AppResult<Customer> {
    let sex = model.sexe.parse().map_err(|e: String| corrupt("sexe", &e))?;
    Ok(Customer::from_input(
        CustomerId::new(model.id),
        CustomerInput {
            family_name: model.nom,
            given_name: model.prenom,
            birth_date: model.date_naissance,
            sex,
            address: model.adresse,
            phone: model.telephone,
            email: model.courriel,
            nationality: model.nationalite,
        },
        model.created_at,
    ))
}

fn to_account(model: accounts::Model) -> AppResult<Account> {
    let kind = model
        .type_compte
        .parse()
        .map_err(|e: String| corrupt("type_compte", &e))?;
    Ok(Account {
        id: AccountId::new(model.id),
        identifier: model.numero_compte,
        kind,
        balance: model.solde,
        active: model.actif,
        owner: CustomerId::new(model.client_id),
        created_at: model.date_creation,
        updated_at: model.updated_at,
    })
}

fn to_entry(model: transactions::Model, account_identifier: String) -> AppResult<LedgerEntry> {
    let kind = model
        .type_transaction
        .parse()
        .map_err(|e: String| corrupt("type_transaction", &e))?;
    Ok(LedgerEntry {
        id: LedgerEntryId::new(model.id),
        kind,
        amount: model.montant,
        occurred_at: model.date_transaction,
        description: model.description.unwrap_or_default(),
        counterparty: model.compte_destination,
        balance_before: model.solde_avant,
        balance_after: model.solde_apres,
        account_id: AccountId::new(model.account_id),
        account_identifier,
    })
}

fn to_principal(model: users::Model) -> AppResult<PrincipalRecord> {
    let role = model.role.parse().map_err(|e: String| corrupt("role", &e))?;
    Ok(PrincipalRecord {
        id: PrincipalId::new(model.id),
        username: model.username,
        email: model.email,
        password_hash: model.password,
        role,
        enabled: model.enabled,
        customer_id: model.client_id.map(CustomerId::new),
    })
}

/// Escapes `LIKE` metacharacters so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_ci(column: clients::Column, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(format!("%{}%", escape_like(needle))).escape('\\'))
}

fn lower(column: clients::Column) -> SimpleExpr {
    Func::lower(Expr::col(column)).into()
}

fn accounts_of_query(owner: CustomerId) -> Select<accounts::Entity> {
    accounts::Entity::find()
        .filter(accounts::Column::ClientId.eq(owner.into_inner()))
        .order_by_asc(accounts::Column::DateCreation)
        .order_by_asc(accounts::Column::Id)
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let txn = self.db.begin().await.map_err(db)?;
        Ok(Box::new(PgTx { txn }))
    }
}

impl PgTx {
    async fn identifier_of(&self, account: AccountId) -> AppResult<String> {
        accounts::Entity::find_by_id(account.into_inner())
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(|a| a.numero_compte)
            .ok_or_else(|| AppError::not_found("Account", "id", account))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    // ========== Customers ==========

    async fn insert_customer(&mut self, new: NewCustomer) -> AppResult<Customer> {
        let fields = new.fields;
        let model = clients::ActiveModel {
            id: NotSet,
            nom: Set(fields.family_name),
            prenom: Set(fields.given_name),
            date_naissance: Set(fields.birth_date),
            sexe: Set(fields.sex.as_str().to_string()),
            adresse: Set(fields.address),
            telephone: Set(fields.phone),
            courriel: Set(fields.email),
            nationalite: Set(fields.nationality),
            created_at: Set(new.created_at),
        }
        .insert(&self.txn)
        .await
        .map_err(db)?;
        to_customer(model)
    }

    async fn find_customer(&mut self, id: CustomerId) -> AppResult<Option<Customer>> {
        clients::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(to_customer)
            .transpose()
    }

    async fn lock_customer(&mut self, id: CustomerId) -> AppResult<Option<Customer>> {
        clients::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(to_customer)
            .transpose()
    }

    async fn update_customer(&mut self, customer: &Customer) -> AppResult<()> {
        clients::ActiveModel {
            id: Set(customer.id.into_inner()),
            nom: Set(customer.family_name.clone()),
            prenom: Set(customer.given_name.clone()),
            date_naissance: Set(customer.birth_date),
            sexe: Set(customer.sex.as_str().to_string()),
            adresse: Set(customer.address.clone()),
            telephone: Set(customer.phone.clone()),
            courriel: Set(customer.email.clone()),
            nationalite: Set(customer.nationality.clone()),
            created_at: NotSet,
        }
        .update(&self.txn)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn customer_email_taken(
        &mut self,
        email: &str,
        except: Option<CustomerId>,
    ) -> AppResult<bool> {
        let mut query = clients::Entity::find().filter(clients::Column::Courriel.eq(email));
        if let Some(id) = except {
            query = query.filter(clients::Column::Id.ne(id.into_inner()));
        }
        Ok(query.count(&self.txn).await.map_err(db)? > 0)
    }

    async fn list_customers(
        &mut self,
        term: Option<&str>,
        page: PageRequest,
    ) -> AppResult<(Vec<Customer>, u64)> {
        let mut query = clients::Entity::find();
        if let Some(term) = term.filter(|t| !t.is_empty()) {
            let needle = term.to_lowercase();
            query = query.filter(
                Condition::any()
                    .add(contains_ci(clients::Column::Nom, &needle))
                    .add(contains_ci(clients::Column::Prenom, &needle))
                    .add(contains_ci(clients::Column::Courriel, &needle)),
            );
        }
        let total = query.clone().count(&self.txn).await.map_err(db)?;
        let rows = query
            .order_by_asc(lower(clients::Column::Nom))
            .order_by_asc(lower(clients::Column::Prenom))
            .order_by_asc(clients::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.txn)
            .await
            .map_err(db)?;
        let customers = rows.into_iter().map(to_customer).collect::<AppResult<_>>()?;
        Ok((customers, total))
    }

    async fn count_customers(&mut self) -> AppResult<u64> {
        clients::Entity::find().count(&self.txn).await.map_err(db)
    }

    async fn delete_customer(&mut self, id: CustomerId) -> AppResult<()> {
        clients::Entity::delete_by_id(id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(())
    }

    // ========== Accounts ==========

    async fn insert_account(&mut self, new: NewAccount) -> AppResult<Account> {
        let model = accounts::ActiveModel {
            id: NotSet,
            numero_compte: Set(new.identifier),
            type_compte: Set(new.kind.as_str().to_string()),
            date_creation: Set(new.created_at),
            solde: Set(Decimal::ZERO),
            actif: Set(true),
            updated_at: Set(new.created_at),
            client_id: Set(new.owner.into_inner()),
        }
        .insert(&self.txn)
        .await
        .map_err(db)?;
        to_account(model)
    }

    async fn identifier_exists(&mut self, identifier: &str) -> AppResult<bool> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::NumeroCompte.eq(identifier))
            .count(&self.txn)
            .await
            .map_err(db)?;
        Ok(count > 0)
    }

    async fn find_account(&mut self, id: AccountId) -> AppResult<Option<Account>> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(to_account)
            .transpose()
    }

    async fn find_account_by_identifier(&mut self, identifier: &str) -> AppResult<Option<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::NumeroCompte.eq(identifier))
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(to_account)
            .transpose()
    }

    async fn lock_account(&mut self, identifier: &str) -> AppResult<Option<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::NumeroCompte.eq(identifier))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(to_account)
            .transpose()
    }

    async fn update_account(&mut self, account: &Account) -> AppResult<()> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Solde, Expr::value(account.balance))
            .col_expr(accounts::Column::Actif, Expr::value(account.active))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(account.updated_at))
            .filter(accounts::Column::Id.eq(account.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db)?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Account", "id", account.id));
        }
        Ok(())
    }

    async fn accounts_of(&mut self, owner: CustomerId) -> AppResult<Vec<Account>> {
        accounts_of_query(owner)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(to_account)
            .collect()
    }

    async fn lock_accounts_of(&mut self, owner: CustomerId) -> AppResult<Vec<Account>> {
        accounts_of_query(owner)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(to_account)
            .collect()
    }

    async fn list_accounts(&mut self, page: PageRequest) -> AppResult<(Vec<Account>, u64)> {
        let total = accounts::Entity::find().count(&self.txn).await.map_err(db)?;
        let accounts = accounts::Entity::find()
            .order_by_desc(accounts::Column::DateCreation)
            .order_by_desc(accounts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(to_account)
            .collect::<AppResult<_>>()?;
        Ok((accounts, total))
    }

    async fn account_totals(&mut self) -> AppResult<AccountTotals> {
        let accounts = accounts::Entity::find().count(&self.txn).await.map_err(db)?;
        let active = accounts::Entity::find()
            .filter(accounts::Column::Actif.eq(true))
            .count(&self.txn)
            .await
            .map_err(db)?;
        let balance: Option<Option<Decimal>> = accounts::Entity::find()
            .select_only()
            .column_as(Expr::col(accounts::Column::Solde).sum(), "total")
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(db)?;
        Ok(AccountTotals {
            accounts,
            active,
            balance: balance.flatten().unwrap_or(Decimal::ZERO),
        })
    }

    async fn delete_account(&mut self, id: AccountId) -> AppResult<()> {
        accounts::Entity::delete_by_id(id.into_inner())
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(())
    }

    // ========== Ledger ==========

    async fn append_entry(&mut self, new: NewLedgerEntry) -> AppResult<LedgerEntry> {
        let model = transactions::ActiveModel {
            id: NotSet,
            type_transaction: Set(new.kind.as_str().to_string()),
            montant: Set(new.amount),
            date_transaction: Set(new.occurred_at),
            description: Set(Some(new.description)),
            compte_destination: Set(new.counterparty),
            solde_avant: Set(new.balance_before),
            solde_apres: Set(new.balance_after),
            account_id: Set(new.account_id.into_inner()),
        }
        .insert(&self.txn)
        .await
        .map_err(db)?;
        to_entry(model, new.account_identifier)
    }

    async fn entries_of(
        &mut self,
        account: AccountId,
        range: Option<(NaiveDateTime, NaiveDateTime)>,
    ) -> AppResult<Vec<LedgerEntry>> {
        let identifier = self.identifier_of(account).await?;
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::AccountId.eq(account.into_inner()));
        if let Some((from, until)) = range {
            query = query.filter(transactions::Column::DateTransaction.between(from, until));
        }
        query
            .order_by_desc(transactions::Column::DateTransaction)
            .order_by_desc(transactions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(|model| to_entry(model, identifier.clone()))
            .collect()
    }

    async fn all_entries(&mut self) -> AppResult<Vec<LedgerEntry>> {
        transactions::Entity::find()
            .find_also_related(accounts::Entity)
            .order_by_desc(transactions::Column::DateTransaction)
            .order_by_desc(transactions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(db)?
            .into_iter()
            .map(|(model, account)| {
                to_entry(model, account.map(|a| a.numero_compte).unwrap_or_default())
            })
            .collect()
    }

    async fn count_entries(&mut self, accounts: Option<&[AccountId]>) -> AppResult<u64> {
        let mut query = transactions::Entity::find();
        if let Some(ids) = accounts {
            if ids.is_empty() {
                return Ok(0);
            }
            query = query.filter(
                transactions::Column::AccountId.is_in(ids.iter().map(|id| id.into_inner())),
            );
        }
        query.count(&self.txn).await.map_err(db)
    }

    async fn delete_entries_of(&mut self, account: AccountId) -> AppResult<()> {
        transactions::Entity::delete_many()
            .filter(transactions::Column::AccountId.eq(account.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(())
    }

    // ========== Principals ==========

    async fn insert_principal(&mut self, new: NewPrincipal) -> AppResult<PrincipalRecord> {
        let model = users::ActiveModel {
            id: NotSet,
            username: Set(new.username),
            email: Set(new.email),
            password: Set(new.password_hash),
            role: Set(new.role.as_str().to_string()),
            enabled: Set(new.enabled),
            client_id: Set(new.customer_id.map(CustomerId::into_inner)),
        }
        .insert(&self.txn)
        .await
        .map_err(db)?;
        to_principal(model)
    }

    async fn find_principal(&mut self, username: &str) -> AppResult<Option<PrincipalRecord>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.txn)
            .await
            .map_err(db)?
            .map(to_principal)
            .transpose()
    }

    async fn username_taken(&mut self, username: &str) -> AppResult<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .count(&self.txn)
            .await
            .map_err(db)?;
        Ok(count > 0)
    }

    async fn principal_email_taken(&mut self, email: &str) -> AppResult<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .count(&self.txn)
            .await
            .map_err(db)?;
        Ok(count > 0)
    }

    async fn count_principals(&mut self) -> AppResult<u64> {
        users::Entity::find().count(&self.txn).await.map_err(db)
    }

    async fn delete_principal_of(&mut self, customer: CustomerId) -> AppResult<()> {
        users::Entity::delete_many()
            .filter(users::Column::ClientId.eq(customer.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(db)?;
        Ok(())
    }

    // ========== Lifecycle ==========

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await.map_err(db)
    }
}
