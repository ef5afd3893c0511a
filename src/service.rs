//! The request entry point: authenticate, parse, execute.

use serde_json::Value as Json;
use tracing::{info, warn};

use crate::{
    command::Batch,
    error::{Error, Result},
    json,
    path::Path,
    query::{InsertBuilder, SelectBuilder, WhereBuilder},
    schema::{self, Value},
    storage::Storage,
};

/// A sales ledger over some storage.
pub struct Ledger<S> {
    storage: S,
}

impl<S: Storage> Ledger<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Whether an account with exactly these credentials exists.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<bool> {
        let mut clause = WhereBuilder::new();
        clause
            .component()
            .column(schema::ACCOUNTS_USERNAME)
            .equals()
            .value_string(username);
        clause
            .cmb_and()
            .component()
            .column(schema::ACCOUNTS_PASSWORD)
            .equals()
            .value_string(password);

        let sql = SelectBuilder::new()
            .wildcard()
            .from(schema::ACCOUNTS)
            .filter(clause.build()?)
            .build(&self.storage)?;
        Ok(!self.storage.execute(&sql)?.into_rows().is_empty())
    }

    fn check_credentials(&mut self, body: &Json) -> Result<()> {
        let credentials = body
            .get("authent")
            .and_then(Json::as_object)
            .and_then(|authent| {
                let username = authent.get("username")?.as_str()?;
                let password = authent.get("password")?.as_str()?;
                Some((username, password))
            });
        let authenticated = match credentials {
            Some((username, password)) => self.authenticate(username, password)?,
            None => false,
        };
        if !authenticated {
            warn!("rejected request with bad credentials");
            return Err(Error::Authentication);
        }
        Ok(())
    }

    /// Handles one request body.
    ///
    /// The body is authenticated and every request parsed before any of them
    /// runs; either failing is returned as an error. Requests then run in
    /// order, one response each. A request that fails contributes its error
    /// message as the last response, and later requests are skipped.
    pub fn handle(&mut self, body: &Json) -> Result<Vec<Json>> {
        json::object(body, Path::root())?;
        self.check_credentials(body)?;
        let batch = Batch::parse(body)?;
        info!(requests = batch.commands.len(), "running batch");

        let mut responses = Vec::with_capacity(batch.commands.len());
        for (i, command) in batch.commands.iter().enumerate() {
            match command.execute(&mut self.storage) {
                Ok(response) => responses.push(response),
                Err(err) => {
                    warn!(request = i, command = command.name(), error = %err, "request failed");
                    responses.push(Json::String(err.to_string()));
                    break;
                }
            }
        }
        Ok(responses)
    }

    /// Parses `text` as JSON and handles it.
    pub fn handle_str(&mut self, text: &str) -> Result<Vec<Json>> {
        let body: Json = serde_json::from_str(text)?;
        self.handle(&body)
    }

    pub fn add_account(&mut self, username: &str, password: &str) -> Result<()> {
        let sql = InsertBuilder::new(schema::ACCOUNTS)
            .columns([schema::ACCOUNTS_USERNAME, schema::ACCOUNTS_PASSWORD])
            .values([Value::from(username), Value::from(password)])
            .build(&self.storage)?;
        self.storage.execute(&sql)?;
        info!(%username, "account added");
        Ok(())
    }

    pub fn add_product(&mut self, name: &str, unit_value_cents: i64) -> Result<()> {
        let sql = InsertBuilder::new(schema::PRODUCTS)
            .columns([schema::PRODUCTS_NAME, schema::PRODUCTS_UNIT_VALUE])
            .values([Value::from(name), Value::Integer(unit_value_cents)])
            .build(&self.storage)?;
        self.storage.execute(&sql)?;
        info!(%name, unit_value_cents, "product added");
        Ok(())
    }
}
