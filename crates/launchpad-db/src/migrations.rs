use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name        TEXT NOT NULL,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL CHECK (role IN ('STARTUP', 'MENTOR', 'INVESTOR', 'ADMIN')),
            is_active   INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT NOT NULL
        );

        -- One startup per user
        CREATE TABLE IF NOT EXISTS startups (
            id            TEXT PRIMARY KEY,
            user_id       TEXT NOT NULL UNIQUE REFERENCES users(id),
            name          TEXT NOT NULL,
            description   TEXT NOT NULL,
            industry      TEXT NOT NULL,
            stage         TEXT NOT NULL,
            website       TEXT,
            founded_year  INTEGER,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS programs (
            id           TEXT PRIMARY KEY,
            name         TEXT NOT NULL,
            description  TEXT NOT NULL,
            is_active    INTEGER NOT NULL DEFAULT 1,
            created_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS application_questions (
            id          TEXT PRIMARY KEY,
            program_id  TEXT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
            question    TEXT NOT NULL,
            required    INTEGER NOT NULL DEFAULT 1,
            position    INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_questions_program
            ON application_questions(program_id, position);

        -- No cascade from startups: a startup with applications cannot be deleted
        CREATE TABLE IF NOT EXISTS applications (
            id             TEXT PRIMARY KEY,
            startup_id     TEXT NOT NULL REFERENCES startups(id),
            program_id     TEXT NOT NULL REFERENCES programs(id),
            status         TEXT NOT NULL DEFAULT 'PENDING'
                           CHECK (status IN ('PENDING', 'APPROVED', 'REJECTED')),
            feedback_note  TEXT,
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            UNIQUE(startup_id, program_id)
        );

        CREATE INDEX IF NOT EXISTS idx_applications_status
            ON applications(status, created_at);

        CREATE TABLE IF NOT EXISTS application_answers (
            id              TEXT PRIMARY KEY,
            application_id  TEXT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            question_id     TEXT NOT NULL REFERENCES application_questions(id),
            answer          TEXT NOT NULL,
            UNIQUE(application_id, question_id)
        );

        CREATE TABLE IF NOT EXISTS application_reviews (
            id              TEXT PRIMARY KEY,
            application_id  TEXT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            reviewer_id     TEXT NOT NULL REFERENCES users(id),
            rating          INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comment         TEXT NOT NULL CHECK (length(comment) > 0),
            created_at      TEXT NOT NULL,
            UNIQUE(application_id, reviewer_id)
        );

        CREATE TABLE IF NOT EXISTS forum_posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS forum_comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES forum_posts(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON forum_comments(post_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
