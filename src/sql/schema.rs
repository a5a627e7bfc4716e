//! The attendance table the instructional template describes.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};

use super::Error;

pub const ATTENDANCE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS AttendanceData (
    EmployeeID INTEGER NOT NULL,
    EventTime TEXT NOT NULL,
    Pincode TEXT,
    EmployeeName TEXT,
    DeptName TEXT,
    Designation TEXT
);
"#;

const SAMPLE_DATA: &str = r#"
INSERT INTO AttendanceData (EmployeeID, EventTime, Pincode, EmployeeName, DeptName, Designation) VALUES
    (101, '2024-03-04 09:02:11', '560001', 'Asha Rao', 'HR', 'Manager'),
    (101, '2024-03-04 17:45:09', '560001', 'Asha Rao', 'HR', 'Manager'),
    (102, '2024-03-04 09:15:40', '560034', 'Vikram Shah', 'HR', 'Recruiter'),
    (102, '2024-03-04 18:01:22', '560034', 'Vikram Shah', 'HR', 'Recruiter'),
    (201, '2024-03-04 08:55:03', '560103', 'Meera Iyer', 'IT', 'Engineer'),
    (201, '2024-03-04 19:10:47', '560103', 'Meera Iyer', 'IT', 'Engineer'),
    (301, '2024-03-04 10:05:30', '560076', 'Rahul Verma', 'Finance', 'Analyst'),
    (301, '2024-03-04 16:30:00', '560076', 'Rahul Verma', 'Finance', 'Analyst');
"#;

/// Number of rows [initialize] inserts when asked for sample data.
pub const SAMPLE_ROWS: usize = 8;

/// Create the attendance table in the database file, creating the file when
/// missing. Sample rows are only inserted into an empty table.
pub async fn initialize(path: &Path, sample: bool) -> Result<(), Error> {
    let path: PathBuf = path.to_owned();

    tokio::task::spawn_blocking(move || {
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(Error::OpenConnection)?;

        conn.execute_batch(ATTENDANCE_DDL)
            .map_err(Error::ExecuteInitialSql)?;

        if sample {
            let existing: i64 = conn
                .query_row("SELECT COUNT(*) FROM AttendanceData", (), |row| row.get(0))
                .map_err(Error::ExecuteQuery)?;
            if existing == 0 {
                conn.execute_batch(SAMPLE_DATA)
                    .map_err(Error::ExecuteInitialSql)?;
                tracing::info!(rows = SAMPLE_ROWS, "inserted sample attendance data");
            }
        }

        conn.close().map_err(|(_, e)| Error::CloseConnection(e))
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("attendance.db");

        initialize(&path, true).await.expect("first run");
        initialize(&path, true).await.expect("second run");

        let conn = Connection::open(&path).expect("open");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM AttendanceData", (), |row| row.get(0))
            .expect("count");
        assert_eq!(count, SAMPLE_ROWS as i64);
    }

    #[tokio::test]
    async fn test_initialize_without_sample() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("attendance.db");

        initialize(&path, false).await.expect("initialize");

        let conn = Connection::open(&path).expect("open");
        let columns = conn
            .prepare("SELECT * FROM AttendanceData")
            .expect("prepare")
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert_eq!(
            columns,
            vec![
                "EmployeeID",
                "EventTime",
                "Pincode",
                "EmployeeName",
                "DeptName",
                "Designation"
            ]
        );
    }
}
