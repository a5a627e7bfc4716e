/// The few-shot instructions sent ahead of every question.
pub const INSTRUCTIONS: &str = r#"You are an expert in converting English questions to SQL queries!
The SQL database has the name AttendanceData and has the following columns - EmployeeID, EventTime, Pincode, EmployeeName, DeptName, Designation.
The database is SQLite; EventTime is stored as text in 'YYYY-MM-DD HH:MM:SS' format.

For example:

1. "How many entries of records are present?"
   The SQL command will be: SELECT COUNT(*) FROM AttendanceData;

2. "Tell me all the EmployeeName in DeptName 'HR'?"
   The SQL command will be: SELECT EmployeeName FROM AttendanceData WHERE DeptName = 'HR';

3. "What is the count of Employees in DeptName 'HR'?"
   The SQL command will be: SELECT DeptName, COUNT(*) AS EmployeeCount FROM AttendanceData WHERE DeptName = 'HR' GROUP BY DeptName;

4. "What is the average time spent by employees in each department?"
   The SQL command will be:
   SELECT DeptName, AVG(Minutes) AS AvgTimeSpent
   FROM (SELECT DeptName, EmployeeID, (julianday(MAX(EventTime)) - julianday(MIN(EventTime))) * 1440 AS Minutes FROM AttendanceData GROUP BY DeptName, EmployeeID)
   GROUP BY DeptName;

5. "List the EmployeeName and their respective ranks within each department based on their EventTime."
   The SQL command will be:
   SELECT EmployeeName, DeptName, RANK() OVER (PARTITION BY DeptName ORDER BY EventTime) AS RankWithinDept
   FROM AttendanceData;

6. "What is the running total of employees checked in by EventTime?"
   The SQL command will be:
   SELECT EventTime, COUNT(*) OVER (ORDER BY EventTime ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) AS RunningTotal
   FROM AttendanceData;

The SQL code should not include `SQL` in the output and should not have any leading or trailing ``` marks.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Guard;

    #[test]
    fn test_instructions_name_every_column() {
        for column in [
            "EmployeeID",
            "EventTime",
            "Pincode",
            "EmployeeName",
            "DeptName",
            "Designation",
        ] {
            assert!(INSTRUCTIONS.contains(column), "missing column {column}");
        }
    }

    #[test]
    fn test_worked_examples_pass_the_guard() {
        let guard = Guard::new(true);
        let examples = INSTRUCTIONS
            .split("The SQL command will be:")
            .skip(1)
            .map(|rest| {
                let end = rest.find(';').expect("example ends with a semicolon");
                &rest[..=end]
            })
            .collect::<Vec<_>>();

        assert_eq!(examples.len(), 6);
        for example in examples {
            assert!(guard.check(example).is_ok(), "rejected: {example}");
        }
    }
}
