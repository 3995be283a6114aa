use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Role, User};

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Skapa ny användare med roller
    pub fn create(&self, user: &mut User) -> Result<i64> {
        user.validate()?;

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let created_at = user.created_at.unwrap_or_else(Utc::now);
        tx.execute(
            "INSERT INTO users (username, first_name, last_name, email, is_staff, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.username,
                user.first_name,
                user.last_name,
                user.email,
                user.is_staff,
                created_at,
            ],
        )?;

        let id = tx.last_insert_rowid();
        Self::replace_roles_in(&tx, id, &user.roles)?;
        tx.commit()?;

        user.id = Some(id);
        user.created_at = Some(created_at);
        Ok(id)
    }

    /// Uppdatera användare och roller
    pub fn update(&self, user: &User) -> Result<()> {
        let id = user.id.ok_or_else(|| anyhow!("Användare har inget ID"))?;
        user.validate()?;

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        let rows = tx.execute(
            "UPDATE users SET username = ?1, first_name = ?2, last_name = ?3, email = ?4, is_staff = ?5
             WHERE id = ?6",
            params![
                user.username,
                user.first_name,
                user.last_name,
                user.email,
                user.is_staff,
                id,
            ],
        )?;

        if rows == 0 {
            return Err(anyhow!("Användare med ID {} hittades inte", id));
        }

        Self::replace_roles_in(&tx, id, &user.roles)?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM users WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(anyhow!("Användare med ID {} hittades inte", id));
        }

        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = lock(&self.conn)?;
        Self::find_by_id_in(&conn, id)
    }

    pub fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = lock(&self.conn)?;
        let user = conn
            .query_row(
                "SELECT id, username, first_name, last_name, email, is_staff, created_at
                 FROM users WHERE username = ?",
                [username],
                Self::row_to_user,
            )
            .optional()?;

        match user {
            Some(mut user) => {
                user.roles = Self::roles_in(&conn, user.id.unwrap_or_default())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub fn find_all(&self) -> Result<Vec<User>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, username, first_name, last_name, email, is_staff, created_at
             FROM users ORDER BY username",
        )?;

        let mut users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for user in &mut users {
            user.roles = Self::roles_in(&conn, user.id.unwrap_or_default())?;
        }

        Ok(users)
    }

    pub(crate) fn find_by_id_in(conn: &Connection, id: i64) -> Result<Option<User>> {
        let user = conn
            .query_row(
                "SELECT id, username, first_name, last_name, email, is_staff, created_at
                 FROM users WHERE id = ?",
                [id],
                Self::row_to_user,
            )
            .optional()?;

        match user {
            Some(mut user) => {
                user.roles = Self::roles_in(conn, id)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn exists_in(conn: &Connection, id: i64) -> Result<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn roles_in(conn: &Connection, user_id: i64) -> Result<HashSet<Role>> {
        let mut stmt = conn.prepare("SELECT role FROM user_roles WHERE user_id = ?")?;
        let roles = stmt
            .query_map([user_id], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|s| Role::from_db_str(&s))
            .collect();
        Ok(roles)
    }

    fn replace_roles_in(conn: &Connection, user_id: i64, roles: &HashSet<Role>) -> Result<()> {
        conn.execute("DELETE FROM user_roles WHERE user_id = ?", [user_id])?;
        let mut stmt = conn.prepare("INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)")?;
        for role in roles {
            stmt.execute(params![user_id, role.as_str()])?;
        }
        Ok(())
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            is_staff: row.get(5)?,
            roles: HashSet::new(),
            created_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();

        let mut user = User::new("procuser").with_role(Role::Cliente);
        user.first_name = Some("Proc".into());
        let id = db.users().create(&mut user).unwrap();
        assert!(id > 0);

        let found = db.users().find_by_id(id).unwrap().unwrap();
        assert_eq!(found.username, "procuser");
        assert!(found.roles.contains(&Role::Cliente));
        assert!(found.created_at.is_some());

        let by_name = db.users().find_by_username("procuser").unwrap();
        assert_eq!(by_name.and_then(|u| u.id), Some(id));
    }

    #[test]
    fn test_empty_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.users().create(&mut User::new("  ")).is_err());
    }

    #[test]
    fn test_duplicate_username_fails() {
        let db = Database::open_in_memory().unwrap();
        db.users().create(&mut User::new("dupuser")).unwrap();
        assert!(db.users().create(&mut User::new("dupuser")).is_err());
    }

    #[test]
    fn test_update_replaces_roles() {
        let db = Database::open_in_memory().unwrap();
        let mut user = User::new("staff").with_role(Role::PersonalTecnicoApoyo);
        db.users().create(&mut user).unwrap();

        user.roles.clear();
        user.roles.insert(Role::Gerente);
        db.users().update(&user).unwrap();

        let found = db.users().find_by_id(user.id.unwrap()).unwrap().unwrap();
        assert_eq!(found.roles.len(), 1);
        assert!(found.roles.contains(&Role::Gerente));
    }
}
