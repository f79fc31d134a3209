// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User lookup persistence.
//!
//! Lookups are append-only: every fetch inserts a new row, so the table
//! doubles as a history of what the profile looked like over time.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;

use volley_core::{UserInfoRecord, VolleyError};

use crate::database::Database;

/// Insert the result of one user lookup.
pub async fn insert_user_info(db: &Database, record: &UserInfoRecord) -> Result<(), VolleyError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_info
                     (remote_id, username, first_name, last_name, is_bot, dc_id,
                      account_created_at, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.remote_id,
                    record.username,
                    record.first_name,
                    record.last_name,
                    record.is_bot,
                    record.dc_id,
                    record
                        .account_created_at
                        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
                    record.fetched_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recently fetched record for a remote user id.
pub async fn latest_for_remote_id(
    db: &Database,
    remote_id: i64,
) -> Result<Option<UserInfoRecord>, VolleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT remote_id, username, first_name, last_name, is_bot, dc_id,
                        account_created_at, fetched_at
                 FROM user_info WHERE remote_id = ?1
                 ORDER BY id DESC LIMIT 1",
                )
                .map_err(|e| crate::database::map_tr_err(e.into()))?;
            let result = stmt.query_row(params![remote_id], |row| {
                Ok(RawUserInfo {
                    remote_id: row.get(0)?,
                    username: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    is_bot: row.get(4)?,
                    dc_id: row.get(5)?,
                    account_created_at: row.get(6)?,
                    fetched_at: row.get(7)?,
                })
            });
            match result {
                Ok(raw) => Ok(Some(raw.into_record()?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(crate::database::map_tr_err(e.into())),
            }
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(e) => e,
            e => VolleyError::Storage {
                source: Box::new(e),
            },
        })
}

struct RawUserInfo {
    remote_id: i64,
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    is_bot: bool,
    dc_id: Option<u32>,
    account_created_at: Option<String>,
    fetched_at: String,
}

impl RawUserInfo {
    fn into_record(self) -> Result<UserInfoRecord, VolleyError> {
        let account_created_at = self
            .account_created_at
            .map(|s| parse_timestamp(&s))
            .transpose()?;
        Ok(UserInfoRecord {
            remote_id: self.remote_id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            is_bot: self.is_bot,
            dc_id: self.dc_id,
            account_created_at,
            fetched_at: parse_timestamp(&self.fetched_at)?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, VolleyError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| VolleyError::Storage {
            source: Box::new(e),
        })
}
