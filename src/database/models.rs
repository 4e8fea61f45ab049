// Database Models
//
// Records as stored in PostgreSQL or the in-memory store, plus the partial
// update and insert shapes handed to the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::auth::Role;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error>
    where
        Self: Sized;
}

/// Stored user account. Keyed by `email`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub fuel_card_no: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(
        email: String,
        name: String,
        password_hash: String,
        fuel_card_no: String,
        role: Role,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            fuel_card_no,
            role,
            created_at: Utc::now(),
        }
    }

    /// Apply a partial update, returning whether any field actually changed.
    pub fn apply(&mut self, update: &UserUpdate) -> bool {
        let mut changed = false;
        if let Some(name) = &update.name {
            if *name != self.name {
                self.name = name.clone();
                changed = true;
            }
        }
        if let Some(fuel_card_no) = &update.fuel_card_no {
            if *fuel_card_no != self.fuel_card_no {
                self.fuel_card_no = fuel_card_no.clone();
                changed = true;
            }
        }
        if let Some(role) = update.role {
            if role != self.role {
                self.role = role;
                changed = true;
            }
        }
        changed
    }
}

impl FromRow for UserRecord {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            password_hash: row.try_get("password_hash")?,
            fuel_card_no: row.try_get("fuel_card_no")?,
            // The column carries a CHECK constraint on the two known roles
            role: Role::parse(&role).unwrap_or_default(),
            created_at: row.try_get("created_at")?,
        })
    }
}

/// User as returned over HTTP. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub fuel_card_no: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email,
            name: record.name,
            fuel_card_no: record.fuel_card_no,
            role: record.role,
            created_at: record.created_at,
        }
    }
}

/// Partial user update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub fuel_card_no: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.fuel_card_no.is_none() && self.role.is_none()
    }
}

/// Odometer-based travel entry belonging to one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TravelLog {
    pub id: Uuid,
    pub user_email: String,
    pub date: DateTime<Utc>,
    pub meter_start: f64,
    pub meter_end: f64,
    pub total_km: f64,
    pub official_km: f64,
    pub private_km: f64,
    pub remarks: String,
}

impl TravelLog {
    pub fn new(new: NewTravelLog) -> Self {
        Self {
            id: Uuid::new_v4(),
            total_km: new.meter_end - new.meter_start,
            user_email: new.user_email,
            date: new.date,
            meter_start: new.meter_start,
            meter_end: new.meter_end,
            official_km: new.official_km,
            private_km: new.private_km,
            remarks: new.remarks,
        }
    }
}

impl FromRow for TravelLog {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_email: row.try_get("user_email")?,
            date: row.try_get("date")?,
            meter_start: row.try_get("meter_start")?,
            meter_end: row.try_get("meter_end")?,
            total_km: row.try_get("total_km")?,
            official_km: row.try_get("official_km")?,
            private_km: row.try_get("private_km")?,
            remarks: row.try_get("remarks")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTravelLog {
    pub user_email: String,
    pub date: DateTime<Utc>,
    pub meter_start: f64,
    pub meter_end: f64,
    pub official_km: f64,
    pub private_km: f64,
    pub remarks: String,
}
