//! Initial database migration.
//!
//! Creates the clients, accounts, transactions and users tables with their
//! constraints and indexes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(CLIENTS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const CLIENTS_SQL: &str = r"
CREATE TABLE clients (
    id BIGSERIAL PRIMARY KEY,
    nom VARCHAR(50) NOT NULL,
    prenom VARCHAR(50) NOT NULL,
    date_naissance DATE NOT NULL,
    sexe VARCHAR(10) NOT NULL CHECK (sexe IN ('MALE', 'FEMALE')),
    adresse VARCHAR(200),
    telephone VARCHAR(20),
    courriel VARCHAR(255) UNIQUE,
    nationalite VARCHAR(50),
    created_at TIMESTAMP NOT NULL DEFAULT now()
);

CREATE INDEX idx_clients_nom_prenom ON clients(nom, prenom);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id BIGSERIAL PRIMARY KEY,
    numero_compte VARCHAR(34) NOT NULL UNIQUE,
    type_compte VARCHAR(20) NOT NULL CHECK (type_compte IN ('CURRENT', 'SAVINGS')),
    date_creation TIMESTAMP NOT NULL DEFAULT now(),
    solde NUMERIC(19, 2) NOT NULL DEFAULT 0 CHECK (solde >= 0),
    actif BOOLEAN NOT NULL DEFAULT TRUE,
    updated_at TIMESTAMP NOT NULL DEFAULT now(),
    client_id BIGINT NOT NULL REFERENCES clients(id)
);

CREATE INDEX idx_accounts_client ON accounts(client_id);
CREATE INDEX idx_accounts_created ON accounts(date_creation DESC);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id BIGSERIAL PRIMARY KEY,
    type_transaction VARCHAR(20) NOT NULL
        CHECK (type_transaction IN ('DEPOSIT', 'WITHDRAWAL', 'TRANSFER_OUT', 'TRANSFER_IN')),
    montant NUMERIC(19, 2) NOT NULL CHECK (montant > 0),
    date_transaction TIMESTAMP NOT NULL,
    description VARCHAR(255),
    compte_destination VARCHAR(34),
    solde_avant NUMERIC(19, 2) NOT NULL,
    solde_apres NUMERIC(19, 2) NOT NULL CHECK (solde_apres >= 0),
    account_id BIGINT NOT NULL REFERENCES accounts(id)
);

CREATE INDEX idx_transaction_date ON transactions(date_transaction);
CREATE INDEX idx_transaction_compte ON transactions(account_id);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(50) NOT NULL UNIQUE,
    email VARCHAR(255) NOT NULL UNIQUE,
    password VARCHAR(255) NOT NULL,
    role VARCHAR(10) NOT NULL CHECK (role IN ('ADMIN', 'USER')),
    enabled BOOLEAN NOT NULL DEFAULT TRUE,
    client_id BIGINT UNIQUE REFERENCES clients(id)
);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS transactions;
DROP TABLE IF EXISTS accounts;
DROP TABLE IF EXISTS clients;
";
