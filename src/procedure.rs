//! Stored procedure invocation by parameter name.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::transaction::Transaction;
use crate::types::{fold_identifier, Value};

/// A stored procedure whose input parameters were read from the catalog.
///
/// Values are supplied by folded parameter name (`sp_in_1`); missing ones
/// are bound as NULL. Output keys are folded the same way.
#[derive(Debug)]
pub struct ProcedureCall<'conn> {
    connection: &'conn Connection,
    name: String,
    parameters: Vec<String>,
}

impl<'conn> ProcedureCall<'conn> {
    /// Read the input parameters of procedure `name`.
    pub async fn new(connection: &'conn Connection, name: &str) -> Result<Self> {
        let sql = format!(
            "SELECT RDB$PARAMETER_NAME FROM RDB$PROCEDURE_PARAMETERS WHERE \
             RDB$PROCEDURE_NAME='{}' and RDB$PARAMETER_TYPE = 0 ORDER BY RDB$PARAMETER_NUMBER",
            name.replace('\'', "''")
        );
        let mut parameters = Vec::new();
        connection
            .execute_each(&sql, &[], None, |row| {
                if let Some(param) = row.get(0usize).and_then(Value::as_str) {
                    parameters.push(fold_identifier(param));
                }
                Ok(())
            })
            .await?;

        if parameters.is_empty() {
            return Err(Error::UnknownProcedure {
                name: name.to_string(),
            });
        }
        tracing::debug!(procedure = name, ?parameters, "procedure described");
        Ok(Self {
            connection,
            name: name.to_string(),
            parameters,
        })
    }

    /// Procedure name as given.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Folded input parameter names in declaration order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Statement text with one placeholder per input parameter.
    pub fn call_sql(&self) -> String {
        if self.parameters.is_empty() {
            return format!("execute procedure {}", self.name);
        }
        let placeholders = vec!["?"; self.parameters.len()].join(",");
        format!("execute procedure {}({})", self.name, placeholders)
    }

    /// Call the procedure and return its output row.
    ///
    /// Runs in `transaction`, or in an anonymous committed one when `None`.
    /// A procedure without outputs yields an empty map.
    pub async fn execute(
        &self,
        values: &HashMap<String, Value>,
        transaction: Option<&Transaction>,
    ) -> Result<IndexMap<String, Value>> {
        let params: Vec<Value> = self
            .parameters
            .iter()
            .map(|p| values.get(p).cloned().unwrap_or(Value::Null))
            .collect();

        let mut outputs = IndexMap::new();
        self.connection
            .execute_each(&self.call_sql(), &params, transaction, |row| {
                for (key, value) in row.iter() {
                    outputs.insert(fold_identifier(key), value.clone());
                }
                Ok(())
            })
            .await?;
        Ok(outputs)
    }

    /// Statement text with the values inlined as literals.
    ///
    /// For diagnostics only; [`ProcedureCall::execute`] binds parameters.
    pub fn literal_sql(&self, values: &HashMap<String, Value>) -> String {
        let literals: Vec<String> = self
            .parameters
            .iter()
            .map(|p| Self::quote_value(values.get(p)))
            .collect();
        format!("execute procedure {}({})", self.name, literals.join(","))
    }

    /// Render one value as a SQL literal.
    pub fn quote_value(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => "NULL".to_string(),
            Some(v) => format!("'{}'", v.to_string().replace('\'', "''")),
        }
    }
}
