use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use launchpad_types::models::{
    Application, ApplicationAnswer, ApplicationReview, ApplicationStatus, ForumComment, ForumPost, PlatformCounts,
    PlatformStats, Program, Role, RoleCount, Startup, StatusCount, User,
};

use crate::models::{
    AnswerRow, ApplicationRow, CommentRow, PostRow, ProgramRow, QuestionRow, ReviewRow, StartupRow, UserRow,
    now_timestamp,
};
use crate::repository::{
    ApplicationFilter, ApplicationRepository, Decision, NewApplication, NewComment, NewPost, NewProgram, NewReview,
    NewStartup, NewUser, PostRepository, ProgramRepository, StartupChanges, StartupRepository, StatsRepository,
    StoredUser, UserRepository,
};
use crate::{Database, DbError};

const USER_COLUMNS: &str = "id, email, name, password, role, is_active, created_at";
const STARTUP_COLUMNS: &str =
    "id, user_id, name, description, industry, stage, website, founded_year, created_at";
const PROGRAM_COLUMNS: &str = "id, name, description, is_active, created_at";
const APPLICATION_COLUMNS: &str = "id, startup_id, program_id, status, feedback_note, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, application_id, reviewer_id, rating, comment, created_at";
const POST_COLUMNS: &str = "id, author_id, title, content, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, author_id, content, created_at";

// -- Users --

impl UserRepository for Database {
    fn create_user(&self, user: &NewUser) -> Result<User, DbError> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, password, role, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                params![
                    id,
                    user.email.trim().to_lowercase(),
                    user.name,
                    user.password_hash,
                    user.role.as_str(),
                    now_timestamp()
                ],
            )?;
            required(query_user(conn, "id", &id)?)?.into_user()
        })
    }

    fn user_by_id(&self, id: Uuid) -> Result<Option<StoredUser>, DbError> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string())?.map(UserRow::into_stored).transpose())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<StoredUser>, DbError> {
        let email = email.trim().to_lowercase();
        self.with_conn(|conn| query_user(conn, "email", &email)?.map(UserRow::into_stored).transpose())
    }

    fn list_users(&self) -> Result<Vec<User>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"))?;
            let rows = stmt
                .query_map([], user_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(UserRow::into_user).collect()
        })
    }

    fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, DbError> {
        let id = id.to_string();
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET role = ?1 WHERE id = ?2", params![role.as_str(), id])?;
            query_user(conn, "id", &id)?.map(UserRow::into_user).transpose()
        })
    }

    fn replace_password(&self, id: Uuid, current_hash: &str, new_hash: &str) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2 AND password = ?3",
                params![new_hash, id.to_string(), current_hash],
            )?;
            Ok(changed == 1)
        })
    }

    fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>, DbError> {
        let id = id.to_string();
        self.with_conn(|conn| {
            conn.execute("UPDATE users SET is_active = ?1 WHERE id = ?2", params![active, id])?;
            query_user(conn, "id", &id)?.map(UserRow::into_user).transpose()
        })
    }
}

fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// `column` is always a literal from this module.
fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"))?;
    Ok(stmt.query_row([value], user_row).optional()?)
}

// -- Startups --

impl StartupRepository for Database {
    fn create_startup(&self, startup: &NewStartup) -> Result<Startup, DbError> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO startups (id, user_id, name, description, industry, stage, website, founded_year, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    startup.user_id.to_string(),
                    startup.name,
                    startup.description,
                    startup.industry,
                    startup.stage,
                    startup.website,
                    startup.founded_year,
                    now_timestamp()
                ],
            )?;
            required(query_startup(conn, "id", &id)?)?.into_startup()
        })
    }

    fn startup_by_id(&self, id: Uuid) -> Result<Option<Startup>, DbError> {
        self.with_conn(|conn| {
            query_startup(conn, "id", &id.to_string())?
                .map(StartupRow::into_startup)
                .transpose()
        })
    }

    fn startup_by_owner(&self, user_id: Uuid) -> Result<Option<Startup>, DbError> {
        self.with_conn(|conn| {
            query_startup(conn, "user_id", &user_id.to_string())?
                .map(StartupRow::into_startup)
                .transpose()
        })
    }

    fn update_startup(&self, id: Uuid, changes: &StartupChanges) -> Result<Option<Startup>, DbError> {
        let id = id.to_string();
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE startups SET
                    name = COALESCE(?1, name),
                    description = COALESCE(?2, description),
                    industry = COALESCE(?3, industry),
                    stage = COALESCE(?4, stage),
                    website = COALESCE(?5, website),
                    founded_year = COALESCE(?6, founded_year)
                 WHERE id = ?7",
                params![
                    changes.name,
                    changes.description,
                    changes.industry,
                    changes.stage,
                    changes.website,
                    changes.founded_year,
                    id
                ],
            )?;
            query_startup(conn, "id", &id)?
                .map(StartupRow::into_startup)
                .transpose()
        })
    }

    fn delete_startup(&self, id: Uuid) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM startups WHERE id = ?1", [id.to_string()])?;
            Ok(deleted == 1)
        })
    }
}

fn query_startup(conn: &Connection, column: &str, value: &str) -> Result<Option<StartupRow>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {STARTUP_COLUMNS} FROM startups WHERE {column} = ?1"))?;
    let row = stmt
        .query_row([value], |row| {
            Ok(StartupRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                industry: row.get(4)?,
                stage: row.get(5)?,
                website: row.get(6)?,
                founded_year: row.get(7)?,
                created_at: row.get(8)?,
            })
        })
        .optional()?;
    Ok(row)
}

// -- Programs --

impl ProgramRepository for Database {
    fn create_program(&self, program: &NewProgram) -> Result<Program, DbError> {
        let id = Uuid::new_v4().to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO programs (id, name, description, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, program.name, program.description, program.active, now_timestamp()],
            )?;
            for (position, (question, required)) in program.questions.iter().enumerate() {
                tx.execute(
                    "INSERT INTO application_questions (id, program_id, question, required, position)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![Uuid::new_v4().to_string(), id, question, required, position as i64],
                )?;
            }
            tx.commit()?;

            required(query_program(conn, &id)?)
        })
    }

    fn program_by_id(&self, id: Uuid) -> Result<Option<Program>, DbError> {
        self.with_conn(|conn| query_program(conn, &id.to_string()))
    }

    fn list_programs(&self, active_only: bool) -> Result<Vec<Program>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROGRAM_COLUMNS} FROM programs WHERE (?1 = 0 OR is_active = 1) ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map([active_only], program_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|row| {
                    let questions = query_questions(conn, &row.id)?;
                    row.into_program(questions)
                })
                .collect()
        })
    }
}

fn program_row(row: &Row<'_>) -> rusqlite::Result<ProgramRow> {
    Ok(ProgramRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_program(conn: &Connection, id: &str) -> Result<Option<Program>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {PROGRAM_COLUMNS} FROM programs WHERE id = ?1"))?;
    let Some(row) = stmt.query_row([id], program_row).optional()? else {
        return Ok(None);
    };
    let questions = query_questions(conn, id)?;
    row.into_program(questions).map(Some)
}

fn query_questions(conn: &Connection, program_id: &str) -> Result<Vec<QuestionRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, program_id, question, required FROM application_questions
         WHERE program_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map([program_id], |row| {
            Ok(QuestionRow {
                id: row.get(0)?,
                program_id: row.get(1)?,
                question: row.get(2)?,
                required: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// -- Applications & reviews --

impl ApplicationRepository for Database {
    fn application_by_id(&self, id: Uuid) -> Result<Option<Application>, DbError> {
        self.with_conn(|conn| query_application(conn, &id.to_string()))
    }

    fn application_for(&self, startup_id: Uuid, program_id: Uuid) -> Result<Option<Application>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM applications WHERE startup_id = ?1 AND program_id = ?2"
            ))?;
            stmt.query_row(params![startup_id.to_string(), program_id.to_string()], application_row)
                .optional()?
                .map(ApplicationRow::into_application)
                .transpose()
        })
    }

    fn insert_application(&self, application: &NewApplication) -> Result<Application, DbError> {
        let id = Uuid::new_v4().to_string();
        self.with_conn_mut(|conn| {
            let now = now_timestamp();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO applications (id, startup_id, program_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'PENDING', ?4, ?4)",
                params![
                    id,
                    application.startup_id.to_string(),
                    application.program_id.to_string(),
                    now
                ],
            )?;
            for answer in &application.answers {
                tx.execute(
                    "INSERT INTO application_answers (id, application_id, question_id, answer) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        Uuid::new_v4().to_string(),
                        id,
                        answer.question_id.to_string(),
                        answer.answer
                    ],
                )?;
            }
            tx.commit()?;

            required(query_application(conn, &id)?)
        })
    }

    fn list_applications(&self, filter: ApplicationFilter) -> Result<Vec<Application>, DbError> {
        let startup_id = filter.startup_id.map(|id| id.to_string());
        let status = filter.status.map(|s| s.as_str());
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM applications
                 WHERE (?1 IS NULL OR startup_id = ?1) AND (?2 IS NULL OR status = ?2)
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map(params![startup_id, status], application_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(ApplicationRow::into_application).collect()
        })
    }

    fn answers_for(&self, application_id: Uuid) -> Result<Vec<ApplicationAnswer>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.application_id, a.question_id, a.answer
                 FROM application_answers a
                 LEFT JOIN application_questions q ON q.id = a.question_id
                 WHERE a.application_id = ?1
                 ORDER BY q.position",
            )?;
            let rows = stmt
                .query_map([application_id.to_string()], |row| {
                    Ok(AnswerRow {
                        application_id: row.get(0)?,
                        question_id: row.get(1)?,
                        answer: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(AnswerRow::into_answer).collect()
        })
    }

    fn decide_application(
        &self,
        id: Uuid,
        status: ApplicationStatus,
        feedback_note: Option<&str>,
    ) -> Result<Decision, DbError> {
        let id = id.to_string();
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE applications SET status = ?1, feedback_note = ?2, updated_at = ?3
                 WHERE id = ?4 AND status = 'PENDING'",
                params![status.as_str(), feedback_note, now_timestamp(), id],
            )?;

            Ok(match (changed, query_application(conn, &id)?) {
                (_, None) => Decision::Missing,
                (1, Some(application)) => Decision::Decided(application),
                (_, Some(application)) => Decision::AlreadyDecided(application),
            })
        })
    }

    fn review_by(&self, application_id: Uuid, reviewer_id: Uuid) -> Result<Option<ApplicationReview>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM application_reviews WHERE application_id = ?1 AND reviewer_id = ?2"
            ))?;
            stmt.query_row(
                params![application_id.to_string(), reviewer_id.to_string()],
                review_row,
            )
            .optional()?
            .map(ReviewRow::into_review)
            .transpose()
        })
    }

    fn insert_review(&self, review: &NewReview) -> Result<ApplicationReview, DbError> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO application_reviews (id, application_id, reviewer_id, rating, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    review.application_id.to_string(),
                    review.reviewer_id.to_string(),
                    review.rating,
                    review.comment,
                    now_timestamp()
                ],
            )?;
            let mut stmt = conn.prepare(&format!("SELECT {REVIEW_COLUMNS} FROM application_reviews WHERE id = ?1"))?;
            stmt.query_row([&id], review_row)?.into_review()
        })
    }

    fn reviews_for(&self, application_id: Uuid) -> Result<Vec<ApplicationReview>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM application_reviews WHERE application_id = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt
                .query_map([application_id.to_string()], review_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(ReviewRow::into_review).collect()
        })
    }
}

fn application_row(row: &Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        startup_id: row.get(1)?,
        program_id: row.get(2)?,
        status: row.get(3)?,
        feedback_note: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn query_application(conn: &Connection, id: &str) -> Result<Option<Application>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1"))?;
    stmt.query_row([id], application_row)
        .optional()?
        .map(ApplicationRow::into_application)
        .transpose()
}

fn review_row(row: &Row<'_>) -> rusqlite::Result<ReviewRow> {
    Ok(ReviewRow {
        id: row.get(0)?,
        application_id: row.get(1)?,
        reviewer_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// -- Forum --

impl PostRepository for Database {
    fn create_post(&self, post: &NewPost) -> Result<ForumPost, DbError> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO forum_posts (id, author_id, title, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id, post.author_id.to_string(), post.title, post.content, now],
            )?;
            required(query_post(conn, &id)?)
        })
    }

    fn post_by_id(&self, id: Uuid) -> Result<Option<ForumPost>, DbError> {
        self.with_conn(|conn| query_post(conn, &id.to_string()))
    }

    fn update_post(&self, id: Uuid, title: Option<&str>, content: Option<&str>) -> Result<Option<ForumPost>, DbError> {
        let id = id.to_string();
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE forum_posts SET
                    title = COALESCE(?1, title),
                    content = COALESCE(?2, content),
                    updated_at = ?3
                 WHERE id = ?4",
                params![title, content, now_timestamp(), id],
            )?;
            query_post(conn, &id)
        })
    }

    fn delete_post(&self, id: Uuid) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM forum_posts WHERE id = ?1", [id.to_string()])?;
            Ok(deleted == 1)
        })
    }

    fn create_comment(&self, comment: &NewComment) -> Result<ForumComment, DbError> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO forum_comments (id, post_id, author_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    comment.post_id.to_string(),
                    comment.author_id.to_string(),
                    comment.content,
                    now_timestamp()
                ],
            )?;
            let mut stmt = conn.prepare(&format!("SELECT {COMMENT_COLUMNS} FROM forum_comments WHERE id = ?1"))?;
            stmt.query_row([&id], comment_row)?.into_comment()
        })
    }

    fn comments_for(&self, post_id: Uuid) -> Result<Vec<ForumComment>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM forum_comments WHERE post_id = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt
                .query_map([post_id.to_string()], comment_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(CommentRow::into_comment).collect()
        })
    }
}

fn comment_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<ForumPost>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {POST_COLUMNS} FROM forum_posts WHERE id = ?1"))?;
    stmt.query_row([id], |row| {
        Ok(PostRow {
            id: row.get(0)?,
            author_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    })
    .optional()?
    .map(PostRow::into_post)
    .transpose()
}

// -- Stats --

impl StatsRepository for Database {
    fn platform_stats(&self, recent: usize) -> Result<PlatformStats, DbError> {
        let limit = recent as i64;
        self.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, DbError> {
                let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(n.max(0) as u64)
            };

            let counts = PlatformCounts {
                total_users: count("SELECT COUNT(*) FROM users")?,
                total_startups: count("SELECT COUNT(*) FROM startups")?,
                total_mentors: count("SELECT COUNT(*) FROM users WHERE role = 'MENTOR'")?,
                total_investors: count("SELECT COUNT(*) FROM users WHERE role = 'INVESTOR'")?,
                total_applications: count("SELECT COUNT(*) FROM applications")?,
                pending_applications: count("SELECT COUNT(*) FROM applications WHERE status = 'PENDING'")?,
                total_posts: count("SELECT COUNT(*) FROM forum_posts")?,
                total_comments: count("SELECT COUNT(*) FROM forum_comments")?,
            };

            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT ?1"))?;
            let recent_users = stmt
                .query_map([limit], user_row)?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(UserRow::into_user)
                .collect::<Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {APPLICATION_COLUMNS} FROM applications ORDER BY created_at DESC LIMIT ?1"
            ))?;
            let recent_applications = stmt
                .query_map([limit], application_row)?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(ApplicationRow::into_application)
                .collect::<Result<Vec<_>, _>>()?;

            let user_roles = grouped(conn, "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role")?
                .into_iter()
                .map(|(role, count)| {
                    let role = role.parse::<Role>().map_err(|e| DbError::corrupt("user", &role, e))?;
                    Ok(RoleCount { role, count })
                })
                .collect::<Result<Vec<_>, DbError>>()?;

            let application_status = grouped(
                conn,
                "SELECT status, COUNT(*) FROM applications GROUP BY status ORDER BY status",
            )?
            .into_iter()
            .map(|(status, count)| {
                let status = status
                    .parse::<ApplicationStatus>()
                    .map_err(|e| DbError::corrupt("application", &status, e))?;
                Ok(StatusCount { status, count })
            })
            .collect::<Result<Vec<_>, DbError>>()?;

            Ok(PlatformStats {
                counts,
                recent_users,
                recent_applications,
                user_roles,
                application_status,
            })
        })
    }
}

/// `(value, count)` pairs from a `GROUP BY` query.
fn grouped(conn: &Connection, sql: &str) -> Result<Vec<(String, u64)>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|(value, n)| (value, n.max(0) as u64)).collect())
}

/// A row we just wrote in the same critical section must exist.
fn required<T>(value: Option<T>) -> Result<T, DbError> {
    value.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn user(db: &Database, email: &str, role: Role) -> User {
        db.create_user(&NewUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            password_hash: "hash".to_string(),
            role,
        })
        .unwrap()
    }

    fn startup(db: &Database, owner: Uuid) -> Startup {
        db.create_startup(&NewStartup {
            user_id: owner,
            name: "Acme".to_string(),
            description: "Rockets for everyone".to_string(),
            industry: "Aerospace".to_string(),
            stage: "Seed".to_string(),
            website: None,
            founded_year: Some(2021),
        })
        .unwrap()
    }

    fn program(db: &Database, questions: &[(&str, bool)]) -> Program {
        db.create_program(&NewProgram {
            name: "Spring Batch".to_string(),
            description: "Twelve weeks".to_string(),
            active: true,
            questions: questions.iter().map(|(q, r)| (q.to_string(), *r)).collect(),
        })
        .unwrap()
    }

    #[test]
    fn email_is_unique_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        let created = user(&db, "A@X.com", Role::Startup);
        assert_eq!(created.email, "a@x.com");

        let err = db
            .create_user(&NewUser {
                email: "a@x.COM".to_string(),
                name: "Dup".to_string(),
                password_hash: "hash".to_string(),
                role: Role::Mentor,
            })
            .unwrap_err();
        assert!(err.is_unique_violation());

        let found = db.user_by_email("  A@x.Com ").unwrap().unwrap();
        assert_eq!(found.user.id, created.id);
        assert_eq!(found.password_hash, "hash");
    }

    #[test]
    fn one_startup_per_user() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@x.com", Role::Startup);
        startup(&db, owner.id);

        let err = db
            .create_startup(&NewStartup {
                user_id: owner.id,
                name: "Second".to_string(),
                description: "Another one".to_string(),
                industry: "Fintech".to_string(),
                stage: "Idea".to_string(),
                website: None,
                founded_year: None,
            })
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn startup_with_applications_cannot_be_deleted() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@x.com", Role::Startup);
        let startup = startup(&db, owner.id);
        let program = program(&db, &[]);
        let application = db
            .insert_application(&NewApplication {
                startup_id: startup.id,
                program_id: program.id,
                answers: vec![],
            })
            .unwrap();

        let err = db.delete_startup(startup.id).unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(db.application_by_id(application.id).unwrap().is_some());
        assert!(db.startup_by_id(startup.id).unwrap().is_some());

        let other_owner = user(&db, "b@x.com", Role::Startup);
        let empty = db
            .create_startup(&NewStartup {
                user_id: other_owner.id,
                name: "Empty".to_string(),
                description: "No applications".to_string(),
                industry: "Retail".to_string(),
                stage: "Idea".to_string(),
                website: None,
                founded_year: None,
            })
            .unwrap();
        assert!(db.delete_startup(empty.id).unwrap());
    }

    #[test]
    fn program_questions_keep_their_order() {
        let db = Database::open_in_memory().unwrap();
        let created = program(&db, &[("Team?", true), ("Traction?", false)]);

        let loaded = db.program_by_id(created.id).unwrap().unwrap();
        let texts: Vec<_> = loaded.questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(texts, vec!["Team?", "Traction?"]);
        assert!(!loaded.questions[1].required);
    }

    #[test]
    fn application_and_answers_are_atomic() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@x.com", Role::Startup);
        let startup = startup(&db, owner.id);
        let program = program(&db, &[("Team?", true)]);

        let err = db
            .insert_application(&NewApplication {
                startup_id: startup.id,
                program_id: program.id,
                answers: vec![
                    ApplicationAnswer {
                        question_id: program.questions[0].id,
                        answer: "Two founders".to_string(),
                    },
                    ApplicationAnswer {
                        question_id: Uuid::new_v4(),
                        answer: "dangling".to_string(),
                    },
                ],
            })
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
        assert!(db.application_for(startup.id, program.id).unwrap().is_none());

        let application = db
            .insert_application(&NewApplication {
                startup_id: startup.id,
                program_id: program.id,
                answers: vec![ApplicationAnswer {
                    question_id: program.questions[0].id,
                    answer: "Two founders".to_string(),
                }],
            })
            .unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(db.answers_for(application.id).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_duplicate_applications_resolve_to_one() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let owner = user(&db, "a@x.com", Role::Startup);
        let startup = startup(&db, owner.id);
        let program = program(&db, &[]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                thread::spawn(move || {
                    db.insert_application(&NewApplication {
                        startup_id: startup.id,
                        program_id: program.id,
                        answers: vec![],
                    })
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(DbError::is_unique_violation)
        );
        let all = db
            .list_applications(ApplicationFilter {
                startup_id: Some(startup.id),
                status: None,
            })
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn one_review_per_reviewer() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@x.com", Role::Startup);
        let mentor = user(&db, "m@x.com", Role::Mentor);
        let startup = startup(&db, owner.id);
        let program = program(&db, &[]);
        let application = db
            .insert_application(&NewApplication {
                startup_id: startup.id,
                program_id: program.id,
                answers: vec![],
            })
            .unwrap();

        let review = NewReview {
            application_id: application.id,
            reviewer_id: mentor.id,
            rating: 4,
            comment: "Strong team".to_string(),
        };
        db.insert_review(&review).unwrap();
        assert!(db.insert_review(&review).unwrap_err().is_unique_violation());
        assert_eq!(db.reviews_for(application.id).unwrap().len(), 1);
        assert!(db.review_by(application.id, mentor.id).unwrap().is_some());
    }

    #[test]
    fn rating_out_of_range_violates_check() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@x.com", Role::Startup);
        let mentor = user(&db, "m@x.com", Role::Mentor);
        let startup = startup(&db, owner.id);
        let program = program(&db, &[]);
        let application = db
            .insert_application(&NewApplication {
                startup_id: startup.id,
                program_id: program.id,
                answers: vec![],
            })
            .unwrap();

        let err = db
            .insert_review(&NewReview {
                application_id: application.id,
                reviewer_id: mentor.id,
                rating: 6,
                comment: "Too good".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[test]
    fn decisions_happen_once() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@x.com", Role::Startup);
        let startup = startup(&db, owner.id);
        let program = program(&db, &[]);
        let application = db
            .insert_application(&NewApplication {
                startup_id: startup.id,
                program_id: program.id,
                answers: vec![],
            })
            .unwrap();

        match db
            .decide_application(application.id, ApplicationStatus::Approved, Some("Great fit"))
            .unwrap()
        {
            Decision::Decided(app) => {
                assert_eq!(app.status, ApplicationStatus::Approved);
                assert_eq!(app.feedback_note.as_deref(), Some("Great fit"));
            }
            other => panic!("unexpected {other:?}"),
        }

        match db
            .decide_application(application.id, ApplicationStatus::Rejected, None)
            .unwrap()
        {
            Decision::AlreadyDecided(app) => assert_eq!(app.status, ApplicationStatus::Approved),
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(
            db.decide_application(Uuid::new_v4(), ApplicationStatus::Rejected, None)
                .unwrap(),
            Decision::Missing
        ));
    }

    #[test]
    fn role_and_active_flag_updates() {
        let db = Database::open_in_memory().unwrap();
        let created = user(&db, "a@x.com", Role::Startup);

        let updated = db.update_role(created.id, Role::Admin).unwrap().unwrap();
        assert_eq!(updated.role, Role::Admin);

        let deactivated = db.set_active(created.id, false).unwrap().unwrap();
        assert!(!deactivated.active);

        assert!(db.replace_password(created.id, "hash", "new-hash").unwrap());
        assert_eq!(db.user_by_id(created.id).unwrap().unwrap().password_hash, "new-hash");
        assert!(db.update_role(Uuid::new_v4(), Role::Admin).unwrap().is_none());
    }

    #[test]
    fn password_replacement_needs_the_current_hash() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let created = user(&db, "a@x.com", Role::Startup);

        assert!(!db.replace_password(created.id, "stale", "other").unwrap());
        assert!(!db.replace_password(Uuid::new_v4(), "hash", "other").unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                thread::spawn(move || db.replace_password(created.id, "hash", &format!("hash-{i}")))
            })
            .collect();
        let won = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .filter(|changed| *changed)
            .count();
        assert_eq!(won, 1);
        assert_ne!(db.user_by_id(created.id).unwrap().unwrap().password_hash, "hash");
    }

    #[test]
    fn posts_update_partially_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "a@x.com", Role::Investor);
        let post = db
            .create_post(&NewPost {
                author_id: author.id,
                title: "Hello".to_string(),
                content: "First post".to_string(),
            })
            .unwrap();

        let updated = db.update_post(post.id, None, Some("Edited")).unwrap().unwrap();
        assert_eq!(updated.title, "Hello");
        assert_eq!(updated.content, "Edited");

        assert!(db.delete_post(post.id).unwrap());
        assert!(db.post_by_id(post.id).unwrap().is_none());
        assert!(!db.delete_post(post.id).unwrap());
    }

    #[test]
    fn comments_follow_their_post() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "a@x.com", Role::Investor);
        let commenter = user(&db, "m@x.com", Role::Mentor);
        let post = db
            .create_post(&NewPost {
                author_id: author.id,
                title: "Hello".to_string(),
                content: "First post".to_string(),
            })
            .unwrap();

        for text in ["First!", "Welcome"] {
            db.create_comment(&NewComment {
                post_id: post.id,
                author_id: commenter.id,
                content: text.to_string(),
            })
            .unwrap();
        }
        let comments = db.comments_for(post.id).unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["First!", "Welcome"]);

        let err = db
            .create_comment(&NewComment {
                post_id: Uuid::new_v4(),
                author_id: commenter.id,
                content: "Orphan".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        assert!(db.delete_post(post.id).unwrap());
        assert!(db.comments_for(post.id).unwrap().is_empty());
    }

    #[test]
    fn stats_count_and_group() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "a@x.com", Role::Startup);
        user(&db, "m@x.com", Role::Mentor);
        user(&db, "n@x.com", Role::Mentor);
        let startup = startup(&db, owner.id);
        let first = program(&db, &[]);
        let second = program(&db, &[]);
        for program in [&first, &second] {
            db.insert_application(&NewApplication {
                startup_id: startup.id,
                program_id: program.id,
                answers: vec![],
            })
            .unwrap();
        }
        let decided = db.application_for(startup.id, first.id).unwrap().unwrap();
        db.decide_application(decided.id, ApplicationStatus::Rejected, None).unwrap();

        let stats = db.platform_stats(2).unwrap();
        assert_eq!(stats.counts.total_users, 3);
        assert_eq!(stats.counts.total_startups, 1);
        assert_eq!(stats.counts.total_mentors, 2);
        assert_eq!(stats.counts.total_investors, 0);
        assert_eq!(stats.counts.total_applications, 2);
        assert_eq!(stats.counts.pending_applications, 1);
        assert_eq!(stats.counts.total_comments, 0);
        assert_eq!(stats.recent_users.len(), 2);
        assert_eq!(stats.recent_applications.len(), 2);

        assert!(stats.user_roles.contains(&RoleCount { role: Role::Mentor, count: 2 }));
        assert!(!stats.user_roles.iter().any(|r| r.role == Role::Investor));
        assert!(stats.application_status.contains(&StatusCount {
            status: ApplicationStatus::Rejected,
            count: 1
        }));
    }
}
