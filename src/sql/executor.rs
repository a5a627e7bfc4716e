use std::time::Duration;

use rusqlite::{Batch, Connection, OpenFlags, Statement, types::Value};

use super::{Cell, Database, Error, QueryResponse};

const BUSY_TIMEOUT: Duration = Duration::from_secs(3);

/// Runs statements against the configured database, one connection per call.
#[derive(Clone, Debug)]
pub struct Executor {
    database: Database,
    read_only: bool,
    timeout: Duration,
}

impl Executor {
    pub fn new(database: Database, read_only: bool, timeout: Duration) -> Self {
        Self {
            database,
            read_only,
            timeout,
        }
    }

    /// Execute the statement verbatim and fetch the complete result set.
    ///
    /// The connection is closed whether or not the statement succeeds. When
    /// the timeout elapses, the running statement is interrupted so the
    /// blocking thread is released.
    pub async fn execute(&self, statement: &str) -> Result<QueryResponse, Error> {
        let database = self.database.clone();
        let statement = statement.to_owned();
        let read_only = self.read_only;
        let (interrupt_tx, interrupt_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::task::spawn_blocking(move || {
            let conn = open(&database, read_only)?;
            // the receiver is gone only when the caller stopped waiting
            let _ = interrupt_tx.send(conn.get_interrupt_handle());

            let response = query_all(&conn, &statement);
            let closed = conn.close().map_err(|(_, e)| Error::CloseConnection(e));

            let response = response?;
            closed?;
            Ok::<_, Error>(response)
        });
        let timeout_result = tokio::time::timeout(self.timeout, handle).await;

        match timeout_result {
            Err(_) => {
                if let Ok(interrupt) = interrupt_rx.await {
                    interrupt.interrupt();
                }
                Err(Error::QueryTimedOut)
            }
            Ok(Err(e)) => Err(Error::RetrieveResult(e)),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Ok(Ok(response))) => Ok(response),
        }
    }
}

fn open(database: &Database, read_only: bool) -> Result<Connection, Error> {
    let conn = match database {
        Database::File(path) => {
            let access = if read_only {
                OpenFlags::SQLITE_OPEN_READ_ONLY
            } else {
                OpenFlags::SQLITE_OPEN_READ_WRITE
            };
            Connection::open_with_flags(
                path,
                access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(Error::OpenConnection)?
        }
        Database::Memory { initial_sql } => {
            let conn = Connection::open_in_memory().map_err(Error::OpenConnection)?;
            conn.execute_batch(initial_sql)
                .map_err(Error::ExecuteInitialSql)?;
            if read_only {
                conn.pragma_update(None, "query_only", true)
                    .map_err(Error::OpenConnection)?;
            }
            conn
        }
    };
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(Error::OpenConnection)?;

    Ok(conn)
}

/// Run every statement in the text, in order, and keep the result set of the
/// last one. Text with no statements yields an empty response.
fn query_all(conn: &Connection, statements: &str) -> Result<QueryResponse, Error> {
    let mut batch = Batch::new(conn, statements);
    let mut response = QueryResponse::default();
    while let Some(mut stmt) = batch.next().map_err(Error::ExecuteQuery)? {
        response = query_statement(&mut stmt)?;
    }

    Ok(response)
}

fn query_statement(stmt: &mut Statement<'_>) -> Result<QueryResponse, Error> {
    let column_count = stmt.column_count();
    let rows = stmt
        .query_map((), |row| {
            let mut row_data = Vec::with_capacity(column_count);
            for i in 0..column_count {
                row_data.push(Cell::from(row.get::<_, Value>(i)?));
            }
            Ok(row_data)
        })
        .map_err(Error::ExecuteQuery)?
        .collect::<Result<Vec<Vec<Cell>>, rusqlite::Error>>()
        .map_err(Error::TransformQueryResult)?;
    let header = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<String>>();

    Ok(QueryResponse { header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::schema;

    const TEST_SCHEMA: &str = r#"
        CREATE TABLE test (
            id INTEGER PRIMARY KEY,
            name TEXT
        );

        INSERT INTO test (name) VALUES ('Alice');
        INSERT INTO test (name) VALUES ('Bob');
    "#;

    fn memory(initial_sql: &str, read_only: bool) -> Executor {
        Executor::new(
            Database::Memory {
                initial_sql: initial_sql.to_string(),
            },
            read_only,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_with_valid_query() {
        let response = memory(TEST_SCHEMA, true)
            .execute("SELECT * FROM test;")
            .await
            .expect("no error");
        assert_eq!(response.header, vec!["id", "name"]);
        assert_eq!(
            response.rows,
            vec![
                vec![Cell::Integer(1), Cell::Text("Alice".to_string())],
                vec![Cell::Integer(2), Cell::Text("Bob".to_string())]
            ]
        );
    }

    #[tokio::test]
    async fn test_count_matches_seeded_rows() {
        let mut initial_sql = schema::ATTENDANCE_DDL.to_string();
        for i in 0..7 {
            initial_sql.push_str(&format!(
                "INSERT INTO AttendanceData (EmployeeID, EventTime, Pincode, EmployeeName, DeptName, Designation) \
                 VALUES ({i}, '2024-01-01 09:00:00', '560001', 'E{i}', 'HR', 'Clerk');"
            ));
        }

        let response = memory(&initial_sql, true)
            .execute("SELECT COUNT(*) FROM AttendanceData;")
            .await
            .expect("no error");
        assert_eq!(response.rows, vec![vec![Cell::Integer(7)]]);
    }

    #[tokio::test]
    async fn test_with_no_query() {
        let response = memory(TEST_SCHEMA, false)
            .execute("")
            .await
            .expect("no error");
        assert_eq!(response.header.len(), 0, "header should be empty");
        assert_eq!(response.rows.len(), 0, "rows should be empty");
    }

    #[tokio::test]
    async fn test_with_update_query() {
        let response = memory(TEST_SCHEMA, false)
            .execute("UPDATE test SET name = 'Charlie' WHERE id = 1;")
            .await
            .expect("no error");
        assert_eq!(response.header.len(), 0, "header should be empty");
        assert_eq!(response.rows.len(), 0, "rows should be empty");
    }

    #[tokio::test]
    async fn test_with_multiple_queries_returns_last() {
        let response = memory(TEST_SCHEMA, false)
            .execute("SELECT COUNT(*) FROM test; SELECT 42 AS answer;")
            .await
            .expect("no error");
        assert_eq!(response.header, vec!["answer"]);
        assert_eq!(response.rows, vec![vec![Cell::Integer(42)]]);
    }

    #[tokio::test]
    async fn test_with_multiple_writes_runs_all() {
        let response = memory(TEST_SCHEMA, false)
            .execute(
                "INSERT INTO test (name) VALUES ('Carol');\n\
                 INSERT INTO test (name) VALUES ('Dave');\n\
                 SELECT COUNT(*) FROM test; -- trailing comment",
            )
            .await
            .expect("no error");
        assert_eq!(response.rows, vec![vec![Cell::Integer(4)]]);
    }

    #[tokio::test]
    async fn test_with_failing_later_statement() {
        let response = memory(TEST_SCHEMA, false)
            .execute("SELECT * FROM test; SELECT * FROM unknown_table;")
            .await;
        assert!(matches!(response, Err(Error::ExecuteQuery(_))));
    }

    #[tokio::test]
    async fn test_with_update_returning_query() {
        let response = memory(TEST_SCHEMA, false)
            .execute("UPDATE test SET name = 'Charlie' WHERE id = 1 RETURNING *;")
            .await
            .expect("no error");
        assert_eq!(response.header, vec!["id", "name"]);
        assert_eq!(
            response.rows,
            vec![vec![Cell::Integer(1), Cell::Text("Charlie".to_string())]]
        );
    }

    #[tokio::test]
    async fn test_read_only_memory_rejects_update() {
        let response = memory(TEST_SCHEMA, true)
            .execute("UPDATE test SET name = 'Charlie' WHERE id = 1;")
            .await;
        assert!(matches!(
            response,
            Err(Error::ExecuteQuery(_) | Error::TransformQueryResult(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_with_dos_query() {
        let executor = Executor::new(
            Database::Memory {
                initial_sql: TEST_SCHEMA.to_string(),
            },
            true,
            Duration::from_millis(500),
        );
        let response = executor
            .execute(
                r#"
                WITH RECURSIVE cte (n) AS (
                    SELECT 1
                    UNION ALL
                    SELECT n + 1 FROM cte
                )
                SELECT * FROM cte;
            "#,
            )
            .await;

        assert!(matches!(response, Err(Error::QueryTimedOut)));
    }

    #[tokio::test]
    async fn test_with_malformed_query() {
        let response = memory(TEST_SCHEMA, true)
            .execute("SELECT * FROM unknown_table;")
            .await;
        assert!(matches!(response, Err(Error::ExecuteQuery(_))));
    }

    #[tokio::test]
    async fn test_with_invalid_schema() {
        let initial_sql = r#"
            CREATE TABLE test (
                id INTEGER PRIMARY KEY,
                name TEXT
            );

            ABCDEFG;
        "#;
        let response = memory(initial_sql, true).execute("SELECT * FROM test;").await;
        assert!(matches!(response, Err(Error::ExecuteInitialSql(_))));
    }

    #[tokio::test]
    async fn test_with_nil_return() {
        let initial_sql = r#"
            CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT);
            INSERT INTO test VALUES (1, NULL);
        "#;
        let response = memory(initial_sql, true)
            .execute("SELECT * FROM test;")
            .await
            .expect("no error");
        assert_eq!(response.rows, vec![vec![Cell::Integer(1), Cell::Null]]);
    }

    #[tokio::test]
    async fn test_with_real_number() {
        let initial_sql = r#"
            CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT);
            INSERT INTO test VALUES (1, 1.23);
        "#;
        let response = memory(initial_sql, true)
            .execute("SELECT * FROM test;")
            .await
            .expect("no error");
        // TEXT affinity turns the real into text on insert
        assert_eq!(
            response.rows,
            vec![vec![Cell::Integer(1), Cell::Text("1.23".to_string())]]
        );

        let response = memory(initial_sql, true)
            .execute("SELECT 1.5 AS r;")
            .await
            .expect("no error");
        assert_eq!(response.rows, vec![vec![Cell::Real(1.5)]]);
    }

    #[tokio::test]
    async fn test_with_blob() {
        let initial_sql = r#"
            CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT);
            INSERT INTO test VALUES (1, x'68656c6c6f');
        "#;
        let response = memory(initial_sql, true)
            .execute("SELECT * FROM test;")
            .await
            .expect("no error");
        assert_eq!(
            response.rows,
            vec![vec![Cell::Integer(1), Cell::Blob(b"hello".to_vec())]]
        );
    }

    #[tokio::test]
    async fn test_file_database_read_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("attendance.db");
        schema::initialize(&path, true).await.expect("initialize");

        let executor = Executor::new(Database::File(path.clone()), true, Duration::from_secs(5));
        let response = executor
            .execute("SELECT COUNT(*) FROM AttendanceData;")
            .await
            .expect("no error");
        assert_eq!(
            response.rows,
            vec![vec![Cell::Integer(schema::SAMPLE_ROWS as i64)]]
        );

        let response = executor.execute("DELETE FROM AttendanceData;").await;
        assert!(matches!(
            response,
            Err(Error::ExecuteQuery(_) | Error::TransformQueryResult(_))
        ));

        let writable = Executor::new(Database::File(path), false, Duration::from_secs(5));
        writable
            .execute("DELETE FROM AttendanceData;")
            .await
            .expect("writes allowed");
        let response = executor
            .execute("SELECT COUNT(*) FROM AttendanceData;")
            .await
            .expect("no error");
        assert_eq!(response.rows, vec![vec![Cell::Integer(0)]]);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.db");

        let executor = Executor::new(Database::File(path.clone()), false, Duration::from_secs(5));
        let response = executor.execute("SELECT 1;").await;

        assert!(matches!(response, Err(Error::OpenConnection(_))));
        assert!(!path.exists());
    }
}
