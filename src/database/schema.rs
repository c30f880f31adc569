use sqlx::PgPool;

use super::manager::DatabaseError;

/// Serializes concurrent bootstraps (several servers starting against one database)
const BOOTSTRAP_LOCK_KEY: i64 = 0x5343_484f_4f4c;

/// Tables in dependency order. `accounts` keeps every permission variant in
/// one row; the CHECK constraints pin which nullable columns each level uses.
pub const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS schools (
        id BIGSERIAL PRIMARY KEY,
        school_id TEXT NOT NULL UNIQUE,
        region_id TEXT NOT NULL,
        school_name TEXT NOT NULL,
        region_name TEXT NOT NULL,
        organization_email_only BOOLEAN NOT NULL DEFAULT FALSE,
        email_domain TEXT,
        CONSTRAINT schools_domain_required CHECK (NOT organization_email_only OR email_domain IS NOT NULL)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS accounts (
        id BIGSERIAL PRIMARY KEY,
        user_id UUID NOT NULL UNIQUE,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        password BYTEA NOT NULL,
        permission_level SMALLINT NOT NULL CHECK (permission_level BETWEEN 0 AND 3),
        school_id TEXT REFERENCES schools (school_id),
        timetable_entries BIGINT[],
        timetable_is_public BOOLEAN,
        grade SMALLINT CHECK (grade > 0),
        class SMALLINT CHECK (class > 0),
        number SMALLINT CHECK (number > 0),
        checklist_id BIGINT,
        friends UUID[],
        CONSTRAINT accounts_email_key UNIQUE (email),
        CONSTRAINT accounts_student_columns CHECK (
            permission_level <> 1 OR (
                school_id IS NOT NULL AND timetable_entries IS NOT NULL
                AND timetable_is_public IS NOT NULL AND grade IS NOT NULL
                AND class IS NOT NULL AND number IS NOT NULL AND friends IS NOT NULL
            )
        ),
        CONSTRAINT accounts_non_student_columns CHECK (
            permission_level = 1 OR (
                timetable_entries IS NULL AND timetable_is_public IS NULL AND grade IS NULL
                AND class IS NULL AND number IS NULL AND checklist_id IS NULL AND friends IS NULL
            )
        ),
        CONSTRAINT accounts_school_columns CHECK (
            (permission_level IN (1, 2)) = (school_id IS NOT NULL)
        )
    )"#,
    r#"CREATE TABLE IF NOT EXISTS timetables (
        id BIGSERIAL PRIMARY KEY,
        teacher_id UUID NOT NULL REFERENCES accounts (user_id) ON DELETE CASCADE,
        location TEXT NOT NULL,
        day TEXT NOT NULL,
        period TEXT NOT NULL,
        subject TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS checklists (
        id BIGSERIAL PRIMARY KEY,
        student_id UUID NOT NULL REFERENCES accounts (user_id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        CONSTRAINT checklists_student_id_key UNIQUE (student_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS checklist_items (
        checklist_id BIGINT NOT NULL REFERENCES checklists (id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        text TEXT NOT NULL,
        complete BOOLEAN NOT NULL DEFAULT FALSE,
        is_public BOOLEAN NOT NULL DEFAULT FALSE,
        shared_with UUID[] NOT NULL DEFAULT '{}',
        PRIMARY KEY (checklist_id, position)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cafeteria_menus (
        id BIGSERIAL PRIMARY KEY,
        school_id TEXT NOT NULL REFERENCES schools (school_id),
        meal_name TEXT NOT NULL,
        date DATE NOT NULL,
        CONSTRAINT cafeteria_menus_meal_key UNIQUE (school_id, date, meal_name)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cafeteria_menu_items (
        menu_id BIGINT NOT NULL REFERENCES cafeteria_menus (id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        name TEXT NOT NULL,
        contents TEXT NOT NULL DEFAULT '',
        allergies SMALLINT[] NOT NULL DEFAULT '{}',
        PRIMARY KEY (menu_id, position)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS schoolevents (
        id BIGSERIAL PRIMARY KEY,
        school_id TEXT NOT NULL REFERENCES schools (school_id),
        month SMALLINT NOT NULL CHECK (month BETWEEN 1 AND 12),
        events JSONB NOT NULL DEFAULT '[]',
        CONSTRAINT schoolevents_month_key UNIQUE (school_id, month)
    )"#,
];

pub async fn bootstrap(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(BOOTSTRAP_LOCK_KEY)
        .execute(&mut *tx)
        .await?;
    for statement in STATEMENTS {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for statement in STATEMENTS {
            assert!(statement.trim_start().starts_with("CREATE TABLE IF NOT EXISTS"));
        }
    }

    #[test]
    fn tables_are_created_before_they_are_referenced() {
        let position = |table: &str| {
            STATEMENTS
                .iter()
                .position(|s| s.contains(&format!("IF NOT EXISTS {} (", table)))
                .unwrap()
        };
        assert!(position("schools") < position("accounts"));
        assert!(position("accounts") < position("timetables"));
        assert!(position("checklists") < position("checklist_items"));
        assert!(position("cafeteria_menus") < position("cafeteria_menu_items"));
    }
}
