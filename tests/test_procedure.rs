//! Integration tests for stored procedure calls.

mod common;

use std::collections::HashMap;

use common::*;
use firebird_core::native::constants::*;
use firebird_core::{Error, RawValue, Value};

const PARAMS_QUERY: &str = "FROM RDB$PROCEDURE_PARAMETERS";
const CALL: &str = "execute procedure TEST_PROC(?,?)";

fn scripted() -> std::sync::Arc<ScriptedClient> {
    let client = ScriptedClient::new();
    client.script(
        PARAMS_QUERY,
        Script::select(
            vec![typed_column("RDB$PARAMETER_NAME", FB_TYPE_CHAR, 0, 0)],
            vec![vec![text("SP_IN_1                        ")], vec![text("SP_IN_2")]],
        ),
    );
    client.script(
        CALL,
        Script::procedure(
            2,
            vec![column("SP_OUT_1", FB_TYPE_INTEGER), column("SP_OUT_2", FB_TYPE_VARCHAR)],
            vec![RawValue::Long(42), text("done")],
        ),
    );
    client
}

#[tokio::test]
async fn test_procedure_call_folds_keys() {
    let client = scripted();
    let conn = attach(&client).await;

    let call = conn.prepare_call("TEST_PROC").await.unwrap();
    assert_eq!(call.parameters(), ["sp_in_1".to_string(), "sp_in_2".to_string()]);
    assert_eq!(call.call_sql(), CALL);

    let mut values = HashMap::new();
    values.insert("sp_in_1".to_string(), Value::from(10));
    let outputs = call.execute(&values, None).await.unwrap();

    let keys: Vec<&str> = outputs.keys().map(String::as_str).collect();
    assert_eq!(keys, ["sp_out_1", "sp_out_2"]);
    assert_eq!(outputs["sp_out_1"], Value::Integer(42));
    assert_eq!(outputs["sp_out_2"], Value::from("done"));

    // Missing values are bound as NULL, in declaration order.
    let (sql, params) = client.executed().pop().unwrap();
    assert_eq!(sql, CALL);
    assert_eq!(params, vec![Value::Integer(10), Value::Null]);

    // Catalog read and call each committed their anonymous transaction.
    assert_eq!(client.commits(), 2);
    assert_eq!(client.active_transactions(), 0);
}

#[tokio::test]
async fn test_procedure_call_in_transaction() {
    let client = scripted();
    let conn = attach(&client).await;
    let tx = conn.start_transaction().await.unwrap();

    let outputs = conn
        .call_procedure("TEST_PROC", &HashMap::new(), Some(&tx))
        .await
        .unwrap();
    assert_eq!(outputs.len(), 2);
    assert!(tx.is_active());
    assert_eq!(client.commits(), 1);
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_unknown_procedure() {
    let client = ScriptedClient::new();
    client.script(
        PARAMS_QUERY,
        Script::select(vec![typed_column("RDB$PARAMETER_NAME", FB_TYPE_CHAR, 0, 0)], vec![]),
    );
    let conn = attach(&client).await;

    let err = conn.prepare_call("NO_SUCH_PROC").await.unwrap_err();
    assert_eq!(
        err,
        Error::UnknownProcedure {
            name: "NO_SUCH_PROC".to_string()
        }
    );
}

#[tokio::test]
async fn test_literal_sql() {
    let client = scripted();
    let conn = attach(&client).await;
    let call = conn.prepare_call("TEST_PROC").await.unwrap();

    let mut values = HashMap::new();
    values.insert("sp_in_2".to_string(), Value::from("O'Brien"));
    assert_eq!(
        call.literal_sql(&values),
        "execute procedure TEST_PROC(NULL,'O''Brien')"
    );
}
