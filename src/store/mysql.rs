use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySqlPool};

use crate::model::employee::Employee;
use crate::model::grade::Grade;
use crate::model::leave_request::{
    LeaveRequest, NewLeaveRequest, RequestLog, RequestStatus,
};
use crate::model::vehicle_booking::{BookingStatus, NewVehicleBooking, VehicleBooking};
use crate::store::{Correction, LeaveStore, PresenceUpdate, RequestFilter};

const REQUEST_COLUMNS: &str = r#"
    lr.id, lr.employee_id, lr.leave_type, lr.start_time, lr.end_time, lr.reason,
    lr.status, lr.overtime_hours, lr.meal_allowance, lr.transport_mode,
    lr.approval_level, lr.created_at
"#;

const EMPLOYEE_COLUMNS: &str = r#"
    id, full_name, department, job_title, grade, role, hire_date,
    annual_leave_quota, sick_leave_quota, personal_leave_quota,
    current_status, location_detail, expected_return
"#;

const BOOKING_COLUMNS: &str = r#"
    vb.id, vb.vehicle_id, vb.leave_request_id, vb.employee_id,
    e.full_name AS booker_name, vb.start_time, vb.end_time, vb.purpose, vb.status
"#;

fn parse<T: std::str::FromStr>(column: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("unexpected {column} value in database: {value:?}"))
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    full_name: String,
    department: String,
    job_title: Option<String>,
    /// NULL on rows imported before grades existed.
    grade: Option<String>,
    role: String,
    hire_date: Option<NaiveDate>,
    annual_leave_quota: Option<f64>,
    sick_leave_quota: Option<f64>,
    personal_leave_quota: Option<f64>,
    current_status: String,
    location_detail: Option<String>,
    expected_return: Option<NaiveDateTime>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = anyhow::Error;

    fn try_from(row: EmployeeRow) -> Result<Self> {
        let grade = match row.grade.as_deref() {
            Some(grade) => parse("grade", grade)?,
            None => Grade::from_job_title(row.job_title.as_deref().unwrap_or_default()),
        };
        Ok(Employee {
            id: row.id,
            full_name: row.full_name,
            department: row.department,
            job_title: row.job_title,
            grade,
            role: parse("role", &row.role)?,
            hire_date: row.hire_date,
            annual_leave_quota: row.annual_leave_quota,
            sick_leave_quota: row.sick_leave_quota,
            personal_leave_quota: row.personal_leave_quota,
            current_status: parse("current_status", &row.current_status)?,
            location_detail: row.location_detail,
            expected_return: row.expected_return,
        })
    }
}

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    leave_type: String,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    reason: String,
    status: String,
    overtime_hours: Option<f64>,
    meal_allowance: bool,
    transport_mode: Option<String>,
    approval_level: String,
    created_at: NaiveDateTime,
}

impl RequestRow {
    fn into_request(self, logs: Vec<RequestLog>) -> Result<LeaveRequest> {
        Ok(LeaveRequest {
            id: self.id,
            employee_id: self.employee_id,
            leave_type: parse("leave_type", &self.leave_type)?,
            start_time: self.start_time,
            end_time: self.end_time,
            reason: self.reason,
            status: parse("status", &self.status)?,
            overtime_hours: self.overtime_hours,
            meal_allowance: self.meal_allowance,
            transport_mode: self
                .transport_mode
                .as_deref()
                .map(|mode| parse("transport_mode", mode))
                .transpose()?,
            approval_level: parse("approval_level", &self.approval_level)?,
            logs,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct LogRow {
    leave_request_id: u64,
    action: String,
    actor_name: String,
    logged_at: NaiveDateTime,
    comment: Option<String>,
}

#[derive(FromRow)]
struct BookingRow {
    id: u64,
    vehicle_id: u64,
    leave_request_id: Option<u64>,
    employee_id: u64,
    booker_name: Option<String>,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    purpose: Option<String>,
    status: String,
}

impl TryFrom<BookingRow> for VehicleBooking {
    type Error = anyhow::Error;

    fn try_from(row: BookingRow) -> Result<Self> {
        Ok(VehicleBooking {
            id: row.id,
            vehicle_id: row.vehicle_id,
            leave_request_id: row.leave_request_id,
            employee_id: row.employee_id,
            booker_name: row.booker_name,
            start_time: row.start_time,
            end_time: row.end_time,
            purpose: row.purpose,
            status: parse("status", &row.status)?,
        })
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    I32(i32),
    Str(String),
}

/// `WHERE` clause and its bind values for a request listing.
fn filter_clause(filter: &RequestFilter) -> (String, Vec<FilterValue>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(employee_id) = filter.employee_id {
        where_sql.push_str(" AND lr.employee_id = ?");
        args.push(FilterValue::U64(employee_id));
    }
    if let Some(status) = filter.status {
        where_sql.push_str(" AND lr.status = ?");
        args.push(FilterValue::Str(status.to_string()));
    }
    if let Some(department) = filter.department.as_deref() {
        where_sql.push_str(" AND TRIM(e.department) = ?");
        args.push(FilterValue::Str(department.trim().to_string()));
    }
    if let Some(year) = filter.year {
        where_sql.push_str(" AND YEAR(lr.start_time) = ?");
        args.push(FilterValue::I32(year));
    }
    (where_sql, args)
}

/// `LeaveStore` over the MySQL schema in `migrations/`.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Loads the log entries of `rows` in one query and builds the requests.
    async fn with_logs(&self, rows: Vec<RequestRow>) -> Result<Vec<LeaveRequest>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; rows.len()].join(", ");
        let sql = format!(
            r#"
            SELECT leave_request_id, action, actor_name, logged_at, comment
            FROM leave_request_logs
            WHERE leave_request_id IN ({placeholders})
            ORDER BY id ASC
            "#
        );
        let mut query = sqlx::query_as::<_, LogRow>(&sql);
        for row in &rows {
            query = query.bind(row.id);
        }
        let log_rows = query
            .fetch_all(&self.pool)
            .await
            .context("failed to load request logs")?;

        rows.into_iter()
            .map(|row| {
                let logs = log_rows
                    .iter()
                    .filter(|log| log.leave_request_id == row.id)
                    .map(|log| {
                        Ok(RequestLog {
                            action: parse("action", &log.action)?,
                            actor_name: log.actor_name.clone(),
                            timestamp: log.logged_at,
                            comment: log.comment.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                row.into_request(logs)
            })
            .collect()
    }

    async fn append_log(
        tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
        leave_request_id: u64,
        log: &RequestLog,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO leave_request_logs
                (leave_request_id, action, actor_name, logged_at, comment)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(leave_request_id)
        .bind(log.action.to_string())
        .bind(&log.actor_name)
        .bind(log.timestamp)
        .bind(log.comment.as_deref())
        .execute(&mut **tx)
        .await
        .context("failed to append request log")?;
        Ok(())
    }

    async fn apply_presence(
        tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
        update: &PresenceUpdate,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET current_status = ?, location_detail = ?, expected_return = ?
            WHERE id = ?
            "#,
        )
        .bind(update.status.to_string())
        .bind(update.location_detail.as_deref())
        .bind(update.expected_return)
        .bind(update.employee_id)
        .execute(&mut **tx)
        .await
        .context("failed to update employee status")?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("employee {} missing", update.employee_id));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaveStore for MySqlStore {
    async fn employee(&self, id: u64) -> Result<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?");
        sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load employee")?
            .map(Employee::try_from)
            .transpose()
    }

    async fn employees(&self, department: Option<&str>) -> Result<Vec<Employee>> {
        let rows = match department {
            Some(department) => {
                let sql = format!(
                    "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE TRIM(department) = ? ORDER BY id"
                );
                sqlx::query_as::<_, EmployeeRow>(&sql)
                    .bind(department.trim())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id");
                sqlx::query_as::<_, EmployeeRow>(&sql)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("failed to list employees")?;

        rows.into_iter().map(Employee::try_from).collect()
    }

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM leave_requests lr WHERE lr.id = ?");
        let row = sqlx::query_as::<_, RequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load leave request")?;

        match row {
            Some(row) => Ok(self.with_logs(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn requests(&self, filter: &RequestFilter) -> Result<Vec<LeaveRequest>> {
        let (where_sql, args) = filter_clause(filter);
        let page_sql = if filter.limit.is_some() {
            "LIMIT ? OFFSET ?"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT {REQUEST_COLUMNS}
            FROM leave_requests lr
            JOIN employees e ON e.id = lr.employee_id
            {where_sql}
            ORDER BY lr.created_at DESC, lr.id DESC
            {page_sql}
            "#
        );

        let mut query = sqlx::query_as::<_, RequestRow>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::I32(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit).bind(filter.offset.unwrap_or(0));
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("failed to list leave requests")?;
        self.with_logs(rows).await
    }

    async fn count_requests(&self, filter: &RequestFilter) -> Result<i64> {
        let (where_sql, args) = filter_clause(filter);
        let sql = format!(
            "SELECT COUNT(*) FROM leave_requests lr JOIN employees e ON e.id = lr.employee_id{where_sql}"
        );

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for arg in args {
            query = match arg {
                FilterValue::U64(v) => query.bind(v),
                FilterValue::I32(v) => query.bind(v),
                FilterValue::Str(s) => query.bind(s),
            };
        }
        query
            .fetch_one(&self.pool)
            .await
            .context("failed to count leave requests")
    }

    async fn insert_request(
        &self,
        request: NewLeaveRequest,
        booking: Option<NewVehicleBooking>,
        presence: Option<PresenceUpdate>,
    ) -> Result<LeaveRequest> {
        let mut tx = self.pool.begin().await.context("failed to open transaction")?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, leave_type, start_time, end_time, reason, status,
                 overtime_hours, meal_allowance, transport_mode, approval_level, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.leave_type.to_string())
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(&request.reason)
        .bind(request.status.to_string())
        .bind(request.overtime_hours)
        .bind(request.meal_allowance)
        .bind(request.transport_mode.map(|mode| mode.to_string()))
        .bind(request.approval_level.to_string())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .context("failed to insert leave request")?;

        let id = result.last_insert_id();
        Self::append_log(&mut tx, id, &request.log).await?;

        if let Some(booking) = booking {
            sqlx::query(
                r#"
                INSERT INTO vehicle_bookings
                    (vehicle_id, leave_request_id, employee_id, start_time, end_time, purpose, status)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(booking.vehicle_id)
            .bind(id)
            .bind(request.employee_id)
            .bind(request.start_time)
            .bind(request.end_time)
            .bind(&booking.purpose)
            .bind(BookingStatus::from(request.status).to_string())
            .execute(&mut *tx)
            .await
            .context("failed to insert vehicle booking")?;
        }

        if let Some(update) = &presence {
            Self::apply_presence(&mut tx, update).await?;
        }

        tx.commit().await.context("failed to commit leave request")?;

        Ok(LeaveRequest {
            id,
            employee_id: request.employee_id,
            leave_type: request.leave_type,
            start_time: request.start_time,
            end_time: request.end_time,
            reason: request.reason,
            status: request.status,
            overtime_hours: request.overtime_hours,
            meal_allowance: request.meal_allowance,
            transport_mode: request.transport_mode,
            approval_level: request.approval_level,
            logs: vec![request.log],
            created_at: request.created_at,
        })
    }

    async fn update_status(
        &self,
        id: u64,
        from: RequestStatus,
        to: RequestStatus,
        log: RequestLog,
        presence: Option<PresenceUpdate>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("failed to open transaction")?;

        let result = sqlx::query("UPDATE leave_requests SET status = ? WHERE id = ? AND status = ?")
            .bind(to.to_string())
            .bind(id)
            .bind(from.to_string())
            .execute(&mut *tx)
            .await
            .context("failed to update leave status")?;

        if result.rows_affected() == 0 {
            tx.rollback().await.context("failed to roll back status update")?;
            return Ok(false);
        }

        Self::append_log(&mut tx, id, &log).await?;

        sqlx::query("UPDATE vehicle_bookings SET status = ? WHERE leave_request_id = ?")
            .bind(BookingStatus::from(to).to_string())
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to sync vehicle booking status")?;

        if let Some(update) = &presence {
            Self::apply_presence(&mut tx, update).await?;
        }

        tx.commit().await.context("failed to commit status update")?;
        Ok(true)
    }

    async fn correct_request(
        &self,
        id: u64,
        correction: Correction,
        log: RequestLog,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.context("failed to open transaction")?;

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET start_time = ?, end_time = ?, overtime_hours = ?, meal_allowance = ?,
                approval_level = ?
            WHERE id = ?
            "#,
        )
        .bind(correction.start_time)
        .bind(correction.end_time)
        .bind(correction.overtime_hours)
        .bind(correction.meal_allowance)
        .bind(correction.approval_level.to_string())
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to correct leave request")?;

        Self::append_log(&mut tx, id, &log).await?;

        sqlx::query(
            "UPDATE vehicle_bookings SET start_time = ?, end_time = ? WHERE leave_request_id = ?",
        )
        .bind(correction.start_time)
        .bind(correction.end_time)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("failed to move vehicle booking")?;

        tx.commit().await.context("failed to commit correction")?;
        Ok(())
    }

    async fn vehicle_bookings(&self, vehicle_id: u64) -> Result<Vec<VehicleBooking>> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM vehicle_bookings vb
            LEFT JOIN employees e ON e.id = vb.employee_id
            WHERE vb.vehicle_id = ?
            ORDER BY vb.start_time
            "#
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await
            .context("failed to load vehicle bookings")?
            .into_iter()
            .map(VehicleBooking::try_from)
            .collect()
    }

    async fn booking_for_request(&self, leave_request_id: u64) -> Result<Option<VehicleBooking>> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM vehicle_bookings vb
            LEFT JOIN employees e ON e.id = vb.employee_id
            WHERE vb.leave_request_id = ?
            "#
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(leave_request_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load linked vehicle booking")?
            .map(VehicleBooking::try_from)
            .transpose()
    }
}
