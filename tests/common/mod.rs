//! Scripted native client shared by the integration tests.
//!
//! Each SQL text is registered with a [`Script`] describing how the engine
//! would classify and answer it. The client records every close, commit and
//! rollback so tests can assert on resource handling.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::ready;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::BoxFuture;

use firebird_core::native::constants::*;
use firebird_core::{
    ColumnDescriptor, Connection, ConnectionHandle, ConnectionOptions, Error, ExecuteReply,
    NativeClient, NativeFetch, RawValue, Result, StatementHandle, TransactionHandle, Value,
};

/// How the scripted engine answers one SQL text.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub kind: i32,
    pub params: usize,
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<RawValue>>,
    pub affected: u64,
    pub prepare_error: Option<Error>,
    /// Fail the fetch at this zero-based row position.
    pub fetch_error_at: Option<usize>,
    /// On execute, replace the columns and rows of another script.
    pub alters: Option<(String, Vec<ColumnDescriptor>, Vec<Vec<RawValue>>)>,
}

impl Script {
    pub fn select(columns: Vec<ColumnDescriptor>, rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            kind: FB_STMT_SELECT,
            columns,
            rows,
            ..Default::default()
        }
    }

    pub fn dml(kind: i32, params: usize, affected: u64) -> Self {
        Self {
            kind,
            params,
            affected,
            ..Default::default()
        }
    }

    pub fn ddl() -> Self {
        Self {
            kind: FB_STMT_DDL,
            ..Default::default()
        }
    }

    pub fn procedure(params: usize, columns: Vec<ColumnDescriptor>, outputs: Vec<RawValue>) -> Self {
        Self {
            kind: FB_STMT_EXEC_PROCEDURE,
            params,
            columns,
            rows: vec![outputs],
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: usize) -> Self {
        self.params = params;
        self
    }

    pub fn failing_prepare(error: Error) -> Self {
        Self {
            prepare_error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_fetch_error_at(mut self, position: usize) -> Self {
        self.fetch_error_at = Some(position);
        self
    }

    pub fn altering(mut self, sql: &str, columns: Vec<ColumnDescriptor>, rows: Vec<Vec<RawValue>>) -> Self {
        self.alters = Some((sql.to_string(), columns, rows));
        self
    }
}

#[derive(Debug)]
struct PreparedState {
    sql: String,
    kind: i32,
    params: usize,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<RawValue>>,
    position: Option<usize>,
    fetch_error_at: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    scripts: Vec<(String, Script)>,
    next_handle: u32,
    statements: HashMap<u32, PreparedState>,
    active: HashSet<u32>,
    pub prepared: Vec<String>,
    pub executed: Vec<(String, Vec<Value>)>,
    pub closed_statements: Vec<String>,
    pub closed_cursors: Vec<String>,
    pub commits: Vec<u32>,
    pub rollbacks: Vec<u32>,
}

impl State {
    fn script(&self, sql: &str) -> Option<&Script> {
        self.scripts
            .iter()
            .find(|(key, _)| key == sql)
            .or_else(|| self.scripts.iter().find(|(key, _)| sql.contains(key.as_str())))
            .map(|(_, script)| script)
    }

    fn statement(&mut self, handle: StatementHandle) -> Result<&mut PreparedState> {
        self.statements
            .get_mut(&handle.0)
            .ok_or_else(|| Error::database(-904, format!("invalid statement handle {}", handle.0)))
    }
}

/// Native client answering from registered scripts.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    state: Mutex<State>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register the answer for a SQL text (or a fragment of one).
    pub fn script(&self, sql: &str, script: Script) {
        let mut state = self.state.lock().unwrap();
        state.scripts.retain(|(key, _)| key != sql);
        state.scripts.push((sql.to_string(), script));
    }

    pub fn prepared(&self) -> Vec<String> {
        self.state.lock().unwrap().prepared.clone()
    }

    pub fn prepare_count(&self, sql: &str) -> usize {
        self.prepared().iter().filter(|s| *s == sql).count()
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn closed_statements(&self) -> Vec<String> {
        self.state.lock().unwrap().closed_statements.clone()
    }

    pub fn closed_cursors(&self) -> Vec<String> {
        self.state.lock().unwrap().closed_cursors.clone()
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits.len()
    }

    pub fn rollbacks(&self) -> usize {
        self.state.lock().unwrap().rollbacks.len()
    }

    pub fn open_statements(&self) -> usize {
        self.state.lock().unwrap().statements.len()
    }

    pub fn active_transactions(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }

    fn next_handle(state: &mut State) -> u32 {
        state.next_handle += 1;
        state.next_handle
    }

    fn do_prepare(&self, transaction: TransactionHandle, sql: &str) -> Result<StatementHandle> {
        let mut state = self.state.lock().unwrap();
        if !state.active.contains(&transaction.0) {
            return Err(Error::database(-901, "invalid transaction handle"));
        }
        let script = state
            .script(sql)
            .cloned()
            .ok_or_else(|| Error::database(-104, format!("Token unknown: {}", sql)))?;
        if let Some(error) = script.prepare_error {
            return Err(error);
        }
        let handle = Self::next_handle(&mut state);
        state.prepared.push(sql.to_string());
        state.statements.insert(
            handle,
            PreparedState {
                sql: sql.to_string(),
                kind: script.kind,
                params: script.params,
                columns: script.columns,
                rows: script.rows,
                position: None,
                fetch_error_at: script.fetch_error_at,
            },
        );
        Ok(StatementHandle(handle))
    }

    fn do_execute(
        &self,
        statement: StatementHandle,
        transaction: TransactionHandle,
        params: &[Value],
    ) -> Result<ExecuteReply> {
        let mut state = self.state.lock().unwrap();
        if !state.active.contains(&transaction.0) {
            return Err(Error::database(-901, "invalid transaction handle"));
        }
        let sql = state.statement(statement)?.sql.clone();
        let script = state.script(&sql).cloned().unwrap_or_default();
        state.executed.push((sql, params.to_vec()));

        if let Some((target, columns, rows)) = script.alters {
            if let Some((_, altered)) = state.scripts.iter_mut().find(|(key, _)| *key == target) {
                altered.columns = columns;
                altered.rows = rows;
            }
        }

        let prepared = state.statement(statement)?;
        match prepared.kind {
            FB_STMT_SELECT | FB_STMT_SELECT_FOR_UPD => {
                prepared.position = None;
                Ok(ExecuteReply::CursorOpened)
            }
            FB_STMT_EXEC_PROCEDURE => {
                prepared.position = Some(0);
                Ok(ExecuteReply::Affected(0))
            }
            _ => Ok(ExecuteReply::Affected(script.affected)),
        }
    }

    fn do_fetch(&self, statement: StatementHandle) -> Result<NativeFetch> {
        let mut state = self.state.lock().unwrap();
        let prepared = state.statement(statement)?;
        let next = prepared.position.map_or(0, |p| p + 1);
        if prepared.fetch_error_at == Some(next) {
            return Err(Error::database(-902, "connection lost to database"));
        }
        prepared.position = Some(next);
        if next < prepared.rows.len() {
            Ok(NativeFetch::Row)
        } else {
            Ok(NativeFetch::Exhausted)
        }
    }

    fn do_decode(&self, statement: StatementHandle) -> Result<Vec<RawValue>> {
        let mut state = self.state.lock().unwrap();
        let prepared = state.statement(statement)?;
        prepared
            .position
            .and_then(|p| prepared.rows.get(p))
            .cloned()
            .ok_or_else(|| Error::database(-504, "cursor is not positioned on a row"))
    }
}

impl NativeClient for ScriptedClient {
    fn start_transaction<'a>(
        &'a self,
        _connections: &'a [ConnectionHandle],
    ) -> BoxFuture<'a, Result<TransactionHandle>> {
        let mut state = self.state.lock().unwrap();
        let handle = Self::next_handle(&mut state);
        state.active.insert(handle);
        Box::pin(ready(Ok(TransactionHandle(handle))))
    }

    fn commit(&self, transaction: TransactionHandle) -> BoxFuture<'_, Result<()>> {
        let mut state = self.state.lock().unwrap();
        state.active.remove(&transaction.0);
        state.commits.push(transaction.0);
        Box::pin(ready(Ok(())))
    }

    fn rollback(&self, transaction: TransactionHandle) -> BoxFuture<'_, Result<()>> {
        let mut state = self.state.lock().unwrap();
        state.active.remove(&transaction.0);
        state.rollbacks.push(transaction.0);
        Box::pin(ready(Ok(())))
    }

    fn prepare<'a>(
        &'a self,
        _connection: ConnectionHandle,
        transaction: TransactionHandle,
        sql: &'a str,
        _dialect: u16,
    ) -> BoxFuture<'a, Result<StatementHandle>> {
        Box::pin(ready(self.do_prepare(transaction, sql)))
    }

    fn describe_statement_type(&self, statement: StatementHandle) -> BoxFuture<'_, Result<i32>> {
        let mut state = self.state.lock().unwrap();
        Box::pin(ready(state.statement(statement).map(|s| s.kind)))
    }

    fn describe_output_columns(
        &self,
        statement: StatementHandle,
    ) -> BoxFuture<'_, Result<Vec<ColumnDescriptor>>> {
        let mut state = self.state.lock().unwrap();
        Box::pin(ready(state.statement(statement).map(|s| s.columns.clone())))
    }

    fn parameter_count(&self, statement: StatementHandle) -> BoxFuture<'_, Result<usize>> {
        let mut state = self.state.lock().unwrap();
        Box::pin(ready(state.statement(statement).map(|s| s.params)))
    }

    fn execute<'a>(
        &'a self,
        statement: StatementHandle,
        transaction: TransactionHandle,
        params: &'a [Value],
    ) -> BoxFuture<'a, Result<ExecuteReply>> {
        Box::pin(ready(self.do_execute(statement, transaction, params)))
    }

    fn fetch_next(&self, statement: StatementHandle) -> BoxFuture<'_, Result<NativeFetch>> {
        Box::pin(ready(self.do_fetch(statement)))
    }

    fn decode_current_row(&self, statement: StatementHandle) -> BoxFuture<'_, Result<Vec<RawValue>>> {
        Box::pin(ready(self.do_decode(statement)))
    }

    fn close_cursor(&self, statement: StatementHandle) -> BoxFuture<'_, Result<()>> {
        let mut state = self.state.lock().unwrap();
        let closed = state.statement(statement).map(|s| {
            s.position = None;
            s.sql.clone()
        });
        Box::pin(ready(closed.map(|sql| state.closed_cursors.push(sql))))
    }

    fn close_statement(&self, statement: StatementHandle) -> BoxFuture<'_, Result<()>> {
        let mut state = self.state.lock().unwrap();
        let closed = state
            .statements
            .remove(&statement.0)
            .map(|s| s.sql)
            .ok_or_else(|| Error::database(-904, format!("invalid statement handle {}", statement.0)));
        Box::pin(ready(closed.map(|sql| state.closed_statements.push(sql))))
    }

    fn plan(&self, statement: StatementHandle) -> BoxFuture<'_, Result<String>> {
        let mut state = self.state.lock().unwrap();
        Box::pin(ready(
            state.statement(statement).map(|_| "\nPLAN (TEST_TABLE NATURAL)".to_string()),
        ))
    }
}

pub fn column(name: &str, type_code: i16) -> ColumnDescriptor {
    typed_column(name, type_code, 0, 0)
}

pub fn typed_column(name: &str, type_code: i16, subtype: i16, scale: i16) -> ColumnDescriptor {
    ColumnDescriptor {
        name: format!("{:<31}", name),
        alias: format!("{:<31}", name),
        table: "TEST_TABLE".to_string(),
        type_code,
        subtype,
        scale,
    }
}

pub fn text(s: &str) -> RawValue {
    RawValue::Text(Bytes::copy_from_slice(s.as_bytes()))
}

/// Five rows of (ID INTEGER, NAME VARCHAR).
pub fn five_rows() -> Script {
    Script::select(
        vec![column("ID", FB_TYPE_INTEGER), column("NAME", FB_TYPE_VARCHAR)],
        (1..=5)
            .map(|i| vec![RawValue::Long(i), text(&format!("name{}", i))])
            .collect(),
    )
}

pub const SELECT_FIVE: &str = "SELECT ID, NAME FROM TEST_TABLE";

pub async fn attach(client: &Arc<ScriptedClient>) -> Connection {
    attach_with(client, ConnectionOptions::new()).await
}

pub async fn attach_with(client: &Arc<ScriptedClient>, options: ConnectionOptions) -> Connection {
    let native: Arc<dyn NativeClient> = client.clone();
    Connection::attach(native, ConnectionHandle(1), options)
        .await
        .expect("attach")
}
