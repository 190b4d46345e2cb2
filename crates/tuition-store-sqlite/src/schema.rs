//! SQL schema for the tuition SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Every "no duplicates while Live" rule is a partial UNIQUE index, so a
//! concurrent writer that slips past a pre-check still hits a constraint.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Catalog ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS grades (
    grade_id    TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    status      TEXT NOT NULL CHECK (status IN ('live', 'archive')),
    version     INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS grades_live_name_idx
    ON grades(name) WHERE status = 'live';

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    description TEXT,
    status      TEXT NOT NULL CHECK (status IN ('live', 'archive')),
    version     INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS subjects_live_name_idx
    ON subjects(name) WHERE status = 'live';

-- ── Curriculum ───────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS grade_subjects (
    grade_subject_id TEXT PRIMARY KEY,
    grade_id         TEXT NOT NULL REFERENCES grades(grade_id),
    subject_id       TEXT NOT NULL REFERENCES subjects(subject_id),
    status           TEXT NOT NULL CHECK (status IN ('live', 'archive')),
    version          INTEGER NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS grade_subjects_live_pair_idx
    ON grade_subjects(grade_id, subject_id) WHERE status = 'live';

-- ── Roster ───────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS teachers (
    teacher_id    TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    contact       TEXT NOT NULL DEFAULT '{}',   -- JSON Contact
    qualification TEXT,
    status        TEXT NOT NULL CHECK (status IN ('live', 'archive')),
    version       INTEGER NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parents (
    parent_id  TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    contact    TEXT NOT NULL DEFAULT '{}',
    status     TEXT NOT NULL CHECK (status IN ('live', 'archive')),
    version    INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS students (
    student_id TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    contact    TEXT NOT NULL DEFAULT '{}',
    parent_id  TEXT NOT NULL REFERENCES parents(parent_id),
    grade_id   TEXT NOT NULL REFERENCES grades(grade_id),
    status     TEXT NOT NULL CHECK (status IN ('live', 'archive')),
    version    INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS students_grade_idx  ON students(grade_id);
CREATE INDEX IF NOT EXISTS students_parent_idx ON students(parent_id);

-- ── Enrollment ───────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS student_subjects (
    enrollment_id    TEXT PRIMARY KEY,
    student_id       TEXT NOT NULL REFERENCES students(student_id),
    subject_id       TEXT NOT NULL REFERENCES subjects(subject_id),
    teacher_id       TEXT NOT NULL REFERENCES teachers(teacher_id),
    grade_subject_id TEXT NOT NULL REFERENCES grade_subjects(grade_subject_id),
    status           TEXT NOT NULL CHECK (status IN ('live', 'archive')),
    version          INTEGER NOT NULL,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS student_subjects_live_triple_idx
    ON student_subjects(student_id, subject_id, teacher_id) WHERE status = 'live';
CREATE INDEX IF NOT EXISTS student_subjects_teacher_idx ON student_subjects(teacher_id);

-- ── Fees ─────────────────────────────────────────────────────────────────

-- Rates are immutable; a change is a new row with a later valid_from.
CREATE TABLE IF NOT EXISTS fees (
    fee_id     TEXT PRIMARY KEY,
    grade_id   TEXT NOT NULL REFERENCES grades(grade_id),
    subject_id TEXT NOT NULL REFERENCES subjects(subject_id),
    teacher_id TEXT NOT NULL REFERENCES teachers(teacher_id),
    amount     INTEGER NOT NULL CHECK (amount > 0),
    valid_from TEXT NOT NULL,   -- YYYY-MM-DD
    created_at TEXT NOT NULL,
    UNIQUE (grade_id, subject_id, teacher_id, valid_from)
);

CREATE TRIGGER IF NOT EXISTS fees_immutable
BEFORE UPDATE ON fees
BEGIN
    SELECT RAISE(ABORT, 'fees are immutable');
END;

-- ── Remittances ──────────────────────────────────────────────────────────

-- Append-only. Rows are removed only by an audited void.
CREATE TABLE IF NOT EXISTS fee_remittances (
    remittance_id  TEXT PRIMARY KEY,
    student_id     TEXT NOT NULL REFERENCES students(student_id),
    fee_id         TEXT NOT NULL REFERENCES fees(fee_id),
    parent_id      TEXT NOT NULL REFERENCES parents(parent_id),
    enrollment_id  TEXT NOT NULL REFERENCES student_subjects(enrollment_id),
    amount_paid    INTEGER NOT NULL CHECK (amount_paid > 0),
    payment_date   TEXT NOT NULL,
    receipt_number TEXT NOT NULL UNIQUE,
    recorded_by    TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (student_id, fee_id)
);

CREATE TRIGGER IF NOT EXISTS fee_remittances_immutable
BEFORE UPDATE ON fee_remittances
BEGIN
    SELECT RAISE(ABORT, 'remittances are immutable');
END;

CREATE TABLE IF NOT EXISTS audit_log (
    audit_id    TEXT PRIMARY KEY,
    entity      TEXT NOT NULL,
    entity_id   TEXT NOT NULL,
    action      TEXT NOT NULL,
    reason      TEXT NOT NULL,
    actor       TEXT NOT NULL,
    snapshot    TEXT NOT NULL,   -- JSON of the removed record
    recorded_at TEXT NOT NULL
);

PRAGMA user_version = 1;
";
